use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Isbn(String);

impl Isbn {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Isbn {
    type Err = ResolveError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value
            .chars()
            .filter(|ch| !matches!(ch, '-' | ' '))
            .collect::<String>()
            .to_uppercase();
        if !normalized.is_ascii() {
            return Err(ResolveError::InvalidIsbn(value.to_string()));
        }
        let is_valid = match normalized.len() {
            10 => {
                let (body, check) = normalized.split_at(9);
                body.chars().all(|ch| ch.is_ascii_digit())
                    && check.chars().all(|ch| ch.is_ascii_digit() || ch == 'X')
            }
            13 => normalized.chars().all(|ch| ch.is_ascii_digit()),
            _ => false,
        };
        if !is_valid {
            return Err(ResolveError::InvalidIsbn(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BookMetadata {
    pub title: String,
    pub subtitle: Option<String>,
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub publish_year: String,
    pub isbn: String,
    pub page_count: u32,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub source_name: String,
    pub cover_url: Option<String>,
    pub cover_fallback_urls: Vec<String>,
}

impl BookMetadata {
    pub fn is_resolved(&self) -> bool {
        !self.title.trim().is_empty()
    }

    pub fn author_line(&self) -> String {
        self.authors.join(", ")
    }

    pub fn cover_urls(&self) -> impl Iterator<Item = &str> {
        self.cover_url
            .iter()
            .chain(self.cover_fallback_urls.iter())
            .map(String::as_str)
    }

    pub fn cover_candidates(&self) -> Vec<CoverCandidate> {
        self.cover_urls()
            .enumerate()
            .map(|(index, url)| CoverCandidate::new(url, &self.source_name, index as u32 + 1))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverCandidate {
    pub url: String,
    pub source_name: String,
    pub priority: u32,
}

impl CoverCandidate {
    pub fn new(url: &str, source_name: &str, priority: u32) -> Self {
        Self {
            url: url.to_string(),
            source_name: source_name.to_string(),
            priority,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CoverQuery {
    pub isbn: Option<Isbn>,
    pub title: Option<String>,
    pub author: Option<String>,
}

impl CoverQuery {
    pub fn new(isbn: Option<Isbn>, title: Option<&str>, author: Option<&str>) -> Self {
        Self {
            isbn,
            title: non_blank(title),
            author: non_blank(author),
        }
    }

    pub fn from_isbn(isbn: Isbn) -> Self {
        Self {
            isbn: Some(isbn),
            ..Self::default()
        }
    }

    pub fn search_text(&self) -> Option<String> {
        let title = self.title.as_deref()?;
        match self.author.as_deref() {
            Some(author) => Some(format!("{title} {author}")),
            None => Some(title.to_string()),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredImage {
    /// Storage-relative, always `/`-separated.
    pub relative_path: String,
    pub width: u32,
    pub height: u32,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub metadata: BookMetadata,
    pub isbn: Option<Isbn>,
}
