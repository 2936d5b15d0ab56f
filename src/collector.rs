use tracing::{debug, warn};

use crate::domain::{CoverCandidate, CoverQuery, Isbn};
use crate::google_books::{GOOGLE_BOOKS, GoogleBooksClient};
use crate::normalize::{from_google_volume, from_open_library, google_search_hit};
use crate::open_library::{CoverProbe, OPEN_LIBRARY, OPEN_LIBRARY_COVERS, OpenLibraryClient};

pub const PRIORITY_PROBE: u32 = 1;
pub const PRIORITY_GOOGLE_ISBN: u32 = 2;
pub const PRIORITY_OPEN_LIBRARY_ISBN: u32 = 3;
/// Search hit `i` uses `SEARCH_PROBE_BASE + 2i` and `SEARCH_COVER_BASE + 2i`.
pub const SEARCH_PROBE_BASE: u32 = 4;
pub const SEARCH_COVER_BASE: u32 = 5;

pub struct CoverCandidateCollector<G, O, P>
where
    G: GoogleBooksClient,
    O: OpenLibraryClient,
    P: CoverProbe,
{
    google: G,
    open_library: O,
    probe: P,
    search_results: usize,
}

impl<G, O, P> CoverCandidateCollector<G, O, P>
where
    G: GoogleBooksClient,
    O: OpenLibraryClient,
    P: CoverProbe,
{
    pub fn new(google: G, open_library: O, probe: P, search_results: usize) -> Self {
        Self {
            google,
            open_library,
            probe,
            search_results,
        }
    }

    pub fn collect(&self, query: &CoverQuery) -> Vec<CoverCandidate> {
        let mut candidates = Vec::new();

        if let Some(isbn) = &query.isbn {
            self.collect_for_isbn(isbn, &mut candidates);
        }
        if let Some(text) = query.search_text() {
            self.collect_from_search(&text, query.isbn.as_ref(), &mut candidates);
        }

        candidates.retain(|candidate| candidate.url.starts_with("https://"));
        candidates.sort_by_key(|candidate| candidate.priority);
        debug!(count = candidates.len(), "cover candidates collected");
        candidates
    }

    fn collect_for_isbn(&self, isbn: &Isbn, candidates: &mut Vec<CoverCandidate>) {
        let probed = self.probe_isbn(isbn);
        if let Some(url) = &probed {
            candidates.push(CoverCandidate::new(url, OPEN_LIBRARY_COVERS, PRIORITY_PROBE));
        }

        match self.google.lookup_isbn(isbn) {
            Ok(Some(info)) => {
                if let Some(url) = from_google_volume(&info, isbn.as_str()).cover_url {
                    candidates.push(CoverCandidate::new(&url, GOOGLE_BOOKS, PRIORITY_GOOGLE_ISBN));
                }
            }
            Ok(None) => {}
            Err(err) => warn!(provider = GOOGLE_BOOKS, %isbn, error = %err, "cover lookup failed"),
        }

        match self.open_library.lookup_isbn(isbn) {
            Ok(Some(record)) => {
                let cover_url = from_open_library(&record, isbn.as_str()).cover_url;
                if let Some(url) = cover_url.filter(|url| Some(url) != probed.as_ref()) {
                    candidates.push(CoverCandidate::new(
                        &url,
                        OPEN_LIBRARY,
                        PRIORITY_OPEN_LIBRARY_ISBN,
                    ));
                }
            }
            Ok(None) => {}
            Err(err) => warn!(provider = OPEN_LIBRARY, %isbn, error = %err, "cover lookup failed"),
        }
    }

    fn collect_from_search(
        &self,
        text: &str,
        primary: Option<&Isbn>,
        candidates: &mut Vec<CoverCandidate>,
    ) {
        let items = match self.google.search(text, self.search_results) {
            Ok(items) => items,
            Err(err) => {
                warn!(provider = GOOGLE_BOOKS, query = text, error = %err, "cover search failed");
                return;
            }
        };
        let hits = items
            .iter()
            .filter_map(google_search_hit)
            .take(self.search_results);
        for (index, hit) in hits.enumerate() {
            let offset = 2 * index as u32;
            if let (Some(primary), Some(isbn)) = (primary, hit.isbn.as_ref()) {
                if isbn != primary {
                    if let Some(url) = self.probe_isbn(isbn) {
                        candidates.push(CoverCandidate::new(
                            &url,
                            OPEN_LIBRARY_COVERS,
                            SEARCH_PROBE_BASE + offset,
                        ));
                    }
                }
            }
            if let Some(url) = &hit.metadata.cover_url {
                candidates.push(CoverCandidate::new(
                    url,
                    GOOGLE_BOOKS,
                    SEARCH_COVER_BASE + offset,
                ));
            }
        }
    }

    fn probe_isbn(&self, isbn: &Isbn) -> Option<String> {
        match self.probe.probe(isbn) {
            Ok(url) => url,
            Err(err) => {
                warn!(provider = OPEN_LIBRARY_COVERS, %isbn, error = %err, "cover probe failed");
                None
            }
        }
    }
}
