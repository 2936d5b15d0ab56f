use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::ResolveError;

pub fn api_client(timeout: Duration) -> Result<Client, ResolveError> {
    build_client(
        &format!("bookshelf-resolver/{}", env!("CARGO_PKG_VERSION")),
        timeout,
    )
}

pub fn build_client(user_agent: &str, timeout: Duration) -> Result<Client, ResolveError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent).map_err(|err| ResolveError::HttpClient(err.to_string()))?,
    );
    Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|err| ResolveError::HttpClient(err.to_string()))
}

pub fn handle_status(provider: &str, response: Response) -> Result<Response, ResolveError> {
    if response.status().is_success() {
        return Ok(response);
    }
    Err(ResolveError::SourceStatus {
        provider: provider.to_string(),
        status: response.status().as_u16(),
    })
}

pub fn read_json(provider: &str, response: Response) -> Result<serde_json::Value, ResolveError> {
    let body = response
        .text()
        .map_err(|err| ResolveError::unreachable(provider, err))?;
    serde_json::from_str(&body).map_err(|err| ResolveError::malformed(provider, err))
}
