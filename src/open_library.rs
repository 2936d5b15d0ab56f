use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_LENGTH;
use serde_json::Value;
use tracing::debug;

use crate::domain::Isbn;
use crate::error::ResolveError;
use crate::http::{api_client, build_client, handle_status, read_json};

pub const OPEN_LIBRARY: &str = "Open Library";
pub const OPEN_LIBRARY_COVERS: &str = "Open Library Covers";

/// Open Library answers unknown covers with a 1x1 GIF well under this size.
pub const PLACEHOLDER_MAX_BYTES: u64 = 1000;

const BOOKS_URL: &str = "https://openlibrary.org/api/books";
const COVERS_URL: &str = "https://covers.openlibrary.org/b/isbn";
const COVER_SIZES: [&str; 3] = ["L", "M", "S"];

pub trait OpenLibraryClient: Send + Sync {
    fn lookup_isbn(&self, isbn: &Isbn) -> Result<Option<Value>, ResolveError>;
}

pub trait CoverProbe: Send + Sync {
    fn probe(&self, isbn: &Isbn) -> Result<Option<String>, ResolveError>;
}

impl<T: OpenLibraryClient + ?Sized> OpenLibraryClient for std::sync::Arc<T> {
    fn lookup_isbn(&self, isbn: &Isbn) -> Result<Option<Value>, ResolveError> {
        (**self).lookup_isbn(isbn)
    }
}

impl<T: CoverProbe + ?Sized> CoverProbe for std::sync::Arc<T> {
    fn probe(&self, isbn: &Isbn) -> Result<Option<String>, ResolveError> {
        (**self).probe(isbn)
    }
}

#[derive(Clone)]
pub struct OpenLibraryHttpClient {
    client: Client,
    base_url: String,
}

impl OpenLibraryHttpClient {
    pub fn new(timeout: Duration) -> Result<Self, ResolveError> {
        Ok(Self {
            client: api_client(timeout)?,
            base_url: BOOKS_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

impl OpenLibraryClient for OpenLibraryHttpClient {
    fn lookup_isbn(&self, isbn: &Isbn) -> Result<Option<Value>, ResolveError> {
        let bibkey = bibkey(isbn);
        debug!(provider = OPEN_LIBRARY, bibkey, "querying books api");
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("bibkeys", bibkey.as_str()),
                ("format", "json"),
                ("jscmd", "data"),
            ])
            .send()
            .map_err(|err| ResolveError::unreachable(OPEN_LIBRARY, err))?;
        let response = handle_status(OPEN_LIBRARY, response)?;
        let body = read_json(OPEN_LIBRARY, response)?;
        extract_record(&body, isbn)
    }
}

pub fn bibkey(isbn: &Isbn) -> String {
    format!("ISBN:{}", isbn.as_str())
}

pub fn extract_record(body: &Value, isbn: &Isbn) -> Result<Option<Value>, ResolveError> {
    let map = body.as_object().ok_or_else(|| {
        ResolveError::malformed(OPEN_LIBRARY, "books response is not a JSON object")
    })?;
    Ok(map.get(&bibkey(isbn)).filter(|record| record.is_object()).cloned())
}

#[derive(Clone)]
pub struct OpenLibraryCoverProbe {
    client: Client,
    base_url: String,
}

impl OpenLibraryCoverProbe {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, ResolveError> {
        Ok(Self {
            client: build_client(user_agent, timeout)?,
            base_url: COVERS_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn cover_url(&self, isbn: &Isbn, size: &str) -> String {
        format!("{}/{}-{}.jpg", self.base_url, isbn.as_str(), size)
    }
}

impl CoverProbe for OpenLibraryCoverProbe {
    fn probe(&self, isbn: &Isbn) -> Result<Option<String>, ResolveError> {
        let mut last_error = None;
        let mut answered = false;
        for size in COVER_SIZES {
            let url = self.cover_url(isbn, size);
            let response = match self.client.head(&url).send() {
                Ok(response) => response,
                Err(err) => {
                    debug!(url, error = %err, "cover probe failed");
                    last_error = Some(ResolveError::unreachable(OPEN_LIBRARY_COVERS, err));
                    continue;
                }
            };
            answered = true;
            let status = response.status().as_u16();
            let content_length = response
                .headers()
                .get(CONTENT_LENGTH)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok());
            debug!(url, status, ?content_length, "cover probe response");
            if accept_probe(status, content_length) {
                return Ok(Some(url));
            }
        }
        match last_error {
            Some(err) if !answered => Err(err),
            _ => Ok(None),
        }
    }
}

pub fn accept_probe(status: u16, content_length: Option<u64>) -> bool {
    status == 200 && content_length.is_some_and(|length| length > PLACEHOLDER_MAX_BYTES)
}
