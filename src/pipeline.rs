use std::sync::Arc;

use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::collector::CoverCandidateCollector;
use crate::config::PipelineConfig;
use crate::domain::{BookMetadata, CoverCandidate, CoverQuery, Isbn, SearchHit, StoredImage};
use crate::downloader::CoverDownloader;
use crate::error::ResolveError;
use crate::fetch::{CoverFetcher, HttpCoverFetcher};
use crate::google_books::{GOOGLE_BOOKS, GoogleBooksClient, GoogleBooksHttpClient};
use crate::imaging::{ImageNormalizer, NormalizeOptions};
use crate::normalize::google_search_hit;
use crate::open_library::{
    CoverProbe, OpenLibraryClient, OpenLibraryCoverProbe, OpenLibraryHttpClient,
};
use crate::resolver::MetadataResolver;
use crate::store::LocalImageStore;

#[derive(Debug, Serialize)]
pub struct MetadataResolution {
    pub metadata: BookMetadata,
    pub cover: Option<StoredImage>,
    /// Set when the cover could not be stored at all, e.g. an unusable upload root.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_cover_error"
    )]
    pub cover_error: Option<ResolveError>,
}

fn serialize_cover_error<S: Serializer>(
    error: &Option<ResolveError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(err) => serializer.serialize_some(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

pub type HttpPipeline = Pipeline<
    GoogleBooksHttpClient,
    OpenLibraryHttpClient,
    OpenLibraryCoverProbe,
    HttpCoverFetcher,
>;

pub struct Pipeline<G, O, P, F>
where
    G: GoogleBooksClient,
    O: OpenLibraryClient,
    P: CoverProbe,
    F: CoverFetcher,
{
    google: Arc<G>,
    resolver: MetadataResolver<Arc<G>, Arc<O>>,
    collector: CoverCandidateCollector<Arc<G>, Arc<O>, P>,
    downloader: CoverDownloader<F>,
}

impl HttpPipeline {
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ResolveError> {
        let google = GoogleBooksHttpClient::new(
            config.google_api_key.clone(),
            config.content_timeout(),
        )?;
        let open_library = OpenLibraryHttpClient::new(config.content_timeout())?;
        let probe = OpenLibraryCoverProbe::new(&config.user_agent, config.probe_timeout())?;
        let fetcher = HttpCoverFetcher::new(
            &config.user_agent,
            config.content_timeout(),
            config.max_download_bytes,
        )?;
        Ok(Pipeline::new(
            google,
            open_library,
            probe,
            fetcher,
            config,
        ))
    }
}

impl<G, O, P, F> Pipeline<G, O, P, F>
where
    G: GoogleBooksClient,
    O: OpenLibraryClient,
    P: CoverProbe,
    F: CoverFetcher,
{
    pub fn new(google: G, open_library: O, probe: P, fetcher: F, config: &PipelineConfig) -> Self {
        let google = Arc::new(google);
        let open_library = Arc::new(open_library);
        let store = LocalImageStore::new(config.upload_root.clone(), &config.relative_prefix);
        let normalizer = ImageNormalizer::new(NormalizeOptions::from(config));
        Self {
            google: Arc::clone(&google),
            resolver: MetadataResolver::new(Arc::clone(&google), Arc::clone(&open_library)),
            collector: CoverCandidateCollector::new(
                google,
                open_library,
                probe,
                config.search_results,
            ),
            downloader: CoverDownloader::new(fetcher, normalizer, store),
        }
    }

    pub fn store(&self) -> &LocalImageStore {
        self.downloader.store()
    }

    pub fn resolve_metadata(&self, isbn: &str) -> Result<Option<MetadataResolution>, ResolveError> {
        let isbn: Isbn = isbn.parse()?;
        let Some(metadata) = self.resolver.resolve(&isbn) else {
            debug!(%isbn, "metadata not found");
            return Ok(None);
        };
        let (cover, cover_error) =
            match self.downloader.download_best_cover(metadata.cover_candidates()) {
                Ok(cover) => (cover, None),
                Err(err) => {
                    warn!(%isbn, error = %err, "cover could not be stored");
                    (None, Some(err))
                }
            };
        Ok(Some(MetadataResolution {
            metadata,
            cover,
            cover_error,
        }))
    }

    pub fn lookup_metadata(&self, isbn: &str) -> Result<Option<BookMetadata>, ResolveError> {
        let isbn: Isbn = isbn.parse()?;
        Ok(self.resolver.resolve(&isbn))
    }

    pub fn collect_candidates(&self, query: &CoverQuery) -> Vec<CoverCandidate> {
        self.collector.collect(query)
    }

    pub fn resolve_cover(
        &self,
        isbn: Option<&str>,
        title: Option<&str>,
        author: Option<&str>,
    ) -> Result<Option<StoredImage>, ResolveError> {
        let isbn = isbn
            .map(str::trim)
            .filter(|isbn| !isbn.is_empty())
            .map(str::parse::<Isbn>)
            .transpose()?;
        let query = CoverQuery::new(isbn, title, author);
        if query.isbn.is_none() && query.title.is_none() {
            debug!("cover query has neither ISBN nor title");
            return Ok(None);
        }
        let candidates = self.collector.collect(&query);
        self.downloader.download_best_cover(candidates)
    }

    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }
        match self.google.search(query, limit) {
            Ok(items) => items.iter().filter_map(google_search_hit).collect(),
            Err(err) => {
                warn!(provider = GOOGLE_BOOKS, query, error = %err, "book search failed");
                Vec::new()
            }
        }
    }

    pub fn store_upload(&self, raw: &[u8]) -> Result<StoredImage, ResolveError> {
        self.downloader.store_bytes(raw)
    }
}
