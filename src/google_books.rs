use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use crate::domain::Isbn;
use crate::error::ResolveError;
use crate::http::{api_client, handle_status, read_json};

pub const GOOGLE_BOOKS: &str = "Google Books";

const VOLUMES_URL: &str = "https://www.googleapis.com/books/v1/volumes";

pub trait GoogleBooksClient: Send + Sync {
    fn lookup_isbn(&self, isbn: &Isbn) -> Result<Option<Value>, ResolveError>;
    fn search(&self, query: &str, max_results: usize) -> Result<Vec<Value>, ResolveError>;
}

impl<T: GoogleBooksClient + ?Sized> GoogleBooksClient for std::sync::Arc<T> {
    fn lookup_isbn(&self, isbn: &Isbn) -> Result<Option<Value>, ResolveError> {
        (**self).lookup_isbn(isbn)
    }

    fn search(&self, query: &str, max_results: usize) -> Result<Vec<Value>, ResolveError> {
        (**self).search(query, max_results)
    }
}

#[derive(Clone)]
pub struct GoogleBooksHttpClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GoogleBooksHttpClient {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, ResolveError> {
        Ok(Self {
            client: api_client(timeout)?,
            base_url: VOLUMES_URL.to_string(),
            api_key,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn volumes(&self, query: &str, max_results: Option<usize>) -> Result<Value, ResolveError> {
        let mut request = self.client.get(&self.base_url).query(&[("q", query)]);
        if let Some(max_results) = max_results {
            request = request.query(&[("maxResults", max_results.clamp(1, 40).to_string())]);
        }
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }
        debug!(provider = GOOGLE_BOOKS, query, "querying volumes");
        let response = request
            .send()
            .map_err(|err| ResolveError::unreachable(GOOGLE_BOOKS, err))?;
        let response = handle_status(GOOGLE_BOOKS, response)?;
        let body = read_json(GOOGLE_BOOKS, response)?;
        if !body.is_object() {
            return Err(ResolveError::malformed(
                GOOGLE_BOOKS,
                "volumes response is not a JSON object",
            ));
        }
        Ok(body)
    }
}

impl GoogleBooksClient for GoogleBooksHttpClient {
    fn lookup_isbn(&self, isbn: &Isbn) -> Result<Option<Value>, ResolveError> {
        let body = self.volumes(&format!("isbn:{}", isbn.as_str()), None)?;
        Ok(first_volume_info(&body))
    }

    fn search(&self, query: &str, max_results: usize) -> Result<Vec<Value>, ResolveError> {
        let body = self.volumes(query, Some(max_results))?;
        Ok(volume_items(&body).into_iter().take(max_results).collect())
    }
}

pub fn first_volume_info(body: &Value) -> Option<Value> {
    body.get("items")
        .and_then(|items| items.as_array())
        .and_then(|items| items.first())
        .and_then(|item| item.get("volumeInfo"))
        .filter(|info| info.is_object())
        .cloned()
}

pub fn volume_items(body: &Value) -> Vec<Value> {
    body.get("items")
        .and_then(|items| items.as_array())
        .cloned()
        .unwrap_or_default()
}
