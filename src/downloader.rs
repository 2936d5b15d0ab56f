use std::fs;
use std::io::Write;

use tracing::{debug, info, warn};

use crate::domain::{CoverCandidate, StoredImage};
use crate::error::ResolveError;
use crate::fetch::CoverFetcher;
use crate::imaging::ImageNormalizer;
use crate::store::LocalImageStore;

pub struct CoverDownloader<F: CoverFetcher> {
    fetcher: F,
    normalizer: ImageNormalizer,
    store: LocalImageStore,
}

impl<F: CoverFetcher> CoverDownloader<F> {
    pub fn new(fetcher: F, normalizer: ImageNormalizer, store: LocalImageStore) -> Self {
        Self {
            fetcher,
            normalizer,
            store,
        }
    }

    pub fn store(&self) -> &LocalImageStore {
        &self.store
    }

    /// Only an unusable upload root is returned as an error.
    pub fn download_best_cover(
        &self,
        mut candidates: Vec<CoverCandidate>,
    ) -> Result<Option<StoredImage>, ResolveError> {
        if candidates.is_empty() {
            debug!("no cover candidates");
            return Ok(None);
        }
        self.store.ensure_root()?;
        candidates.sort_by_key(|candidate| candidate.priority);

        for (attempt, candidate) in candidates.iter().enumerate() {
            match self.attempt(candidate, attempt) {
                Ok(stored) => {
                    info!(
                        url = %candidate.url,
                        provider = %candidate.source_name,
                        priority = candidate.priority,
                        path = %stored.relative_path,
                        "cover stored"
                    );
                    return Ok(Some(stored));
                }
                Err(err) if err.is_recoverable() => {
                    warn!(
                        url = %candidate.url,
                        provider = %candidate.source_name,
                        priority = candidate.priority,
                        error = %err,
                        "cover candidate failed"
                    );
                }
                Err(err) => return Err(err),
            }
        }
        debug!(tried = candidates.len(), "every cover candidate failed");
        Ok(None)
    }

    pub fn store_bytes(&self, raw: &[u8]) -> Result<StoredImage, ResolveError> {
        self.store.ensure_root()?;
        let normalized = self.normalizer.normalize(raw)?;
        let relative_path = self.store.store(&normalized.bytes, 0)?;
        Ok(StoredImage {
            relative_path,
            width: normalized.width,
            height: normalized.height,
            source_url: None,
        })
    }

    fn attempt(
        &self,
        candidate: &CoverCandidate,
        attempt: usize,
    ) -> Result<StoredImage, ResolveError> {
        let storage_err = |err: std::io::Error| ResolveError::ImageStorageFailed(err.to_string());

        let mut scratch = self.store.scratch_file()?;
        let written = self.fetcher.fetch(&candidate.url, scratch.as_file_mut())?;
        if written == 0 {
            return Err(ResolveError::ImageDecodeFailed("empty body".to_string()));
        }
        scratch.as_file_mut().flush().map_err(storage_err)?;
        let raw = fs::read(scratch.path()).map_err(storage_err)?;

        let normalized = self.normalizer.normalize(&raw)?;
        let relative_path = self.store.store(&normalized.bytes, attempt)?;
        Ok(StoredImage {
            relative_path,
            width: normalized.width,
            height: normalized.height,
            source_url: Some(candidate.url.clone()),
        })
    }
}
