use tracing::{debug, warn};

use crate::domain::{BookMetadata, Isbn};
use crate::error::ResolveError;
use crate::google_books::{GOOGLE_BOOKS, GoogleBooksClient};
use crate::normalize::{from_google_volume, from_open_library};
use crate::open_library::{OPEN_LIBRARY, OpenLibraryClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataSource {
    GoogleBooks,
    OpenLibrary,
}

impl MetadataSource {
    pub const PRIORITY: [MetadataSource; 2] =
        [MetadataSource::GoogleBooks, MetadataSource::OpenLibrary];

    pub fn name(&self) -> &'static str {
        match self {
            MetadataSource::GoogleBooks => GOOGLE_BOOKS,
            MetadataSource::OpenLibrary => OPEN_LIBRARY,
        }
    }
}

pub struct MetadataResolver<G: GoogleBooksClient, O: OpenLibraryClient> {
    google: G,
    open_library: O,
}

impl<G: GoogleBooksClient, O: OpenLibraryClient> MetadataResolver<G, O> {
    pub fn new(google: G, open_library: O) -> Self {
        Self {
            google,
            open_library,
        }
    }

    pub fn resolve(&self, isbn: &Isbn) -> Option<BookMetadata> {
        MetadataSource::PRIORITY
            .iter()
            .find_map(|source| self.try_source(*source, isbn))
    }

    fn try_source(&self, source: MetadataSource, isbn: &Isbn) -> Option<BookMetadata> {
        match self.lookup(source, isbn) {
            Ok(Some(metadata)) if metadata.is_resolved() => {
                debug!(provider = source.name(), %isbn, title = %metadata.title, "metadata resolved");
                Some(metadata)
            }
            Ok(_) => {
                debug!(provider = source.name(), %isbn, "no usable record");
                None
            }
            Err(err) => {
                warn!(provider = source.name(), %isbn, error = %err, "metadata source failed");
                None
            }
        }
    }

    fn lookup(
        &self,
        source: MetadataSource,
        isbn: &Isbn,
    ) -> Result<Option<BookMetadata>, ResolveError> {
        let metadata = match source {
            MetadataSource::GoogleBooks => self
                .google
                .lookup_isbn(isbn)?
                .map(|info| from_google_volume(&info, isbn.as_str())),
            MetadataSource::OpenLibrary => self
                .open_library
                .lookup_isbn(isbn)?
                .map(|record| from_open_library(&record, isbn.as_str())),
        };
        Ok(metadata)
    }
}
