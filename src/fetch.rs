use std::io::{Read, Write};
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use crate::error::ResolveError;
use crate::http::{build_client, handle_status};

pub const COVER_HOST: &str = "cover host";

pub trait CoverFetcher: Send + Sync {
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64, ResolveError>;
}

impl<T: CoverFetcher + ?Sized> CoverFetcher for std::sync::Arc<T> {
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64, ResolveError> {
        (**self).fetch(url, sink)
    }
}

#[derive(Clone)]
pub struct HttpCoverFetcher {
    client: Client,
    max_bytes: u64,
}

impl HttpCoverFetcher {
    pub fn new(user_agent: &str, timeout: Duration, max_bytes: u64) -> Result<Self, ResolveError> {
        Ok(Self {
            client: build_client(user_agent, timeout)?,
            max_bytes,
        })
    }
}

impl CoverFetcher for HttpCoverFetcher {
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64, ResolveError> {
        debug!(url, "downloading cover");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| ResolveError::unreachable(COVER_HOST, err))?;
        let response = handle_status(COVER_HOST, response)?;
        if response.status().as_u16() != 200 {
            return Err(ResolveError::SourceStatus {
                provider: COVER_HOST.to_string(),
                status: response.status().as_u16(),
            });
        }
        let mut limited = response.take(self.max_bytes.saturating_add(1));
        let written = std::io::copy(&mut limited, sink)
            .map_err(|err| ResolveError::unreachable(COVER_HOST, err))?;
        if written > self.max_bytes {
            return Err(ResolveError::malformed(
                COVER_HOST,
                format!("body exceeds {} bytes", self.max_bytes),
            ));
        }
        Ok(written)
    }
}
