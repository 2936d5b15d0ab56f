use std::io::{self, Write};

use serde::Serialize;

use crate::domain::{CoverCandidate, SearchHit, StoredImage};
use crate::pipeline::MetadataResolution;
use crate::store::OrphanedImage;

#[derive(Debug, Clone, Serialize)]
pub struct CoverResult {
    pub found: bool,
    pub cover: Option<StoredImage>,
}

#[derive(Debug, Serialize)]
pub struct MetadataResult {
    pub found: bool,
    pub author: Option<String>,
    #[serde(flatten)]
    pub resolution: Option<MetadataResolution>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrphanResult {
    pub orphans: Vec<OrphanedImage>,
    pub total_bytes: u64,
    pub deleted: usize,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_metadata(resolution: Option<MetadataResolution>) -> io::Result<()> {
        let result = MetadataResult {
            found: resolution.is_some(),
            author: resolution
                .as_ref()
                .map(|resolution| resolution.metadata.author_line()),
            resolution,
        };
        Self::print_json(&result)
    }

    pub fn print_cover(cover: Option<StoredImage>) -> io::Result<()> {
        Self::print_json(&CoverResult {
            found: cover.is_some(),
            cover,
        })
    }

    pub fn print_candidates(candidates: &[CoverCandidate]) -> io::Result<()> {
        Self::print_json(&candidates)
    }

    pub fn print_search(hits: &[SearchHit]) -> io::Result<()> {
        Self::print_json(&hits)
    }

    pub fn print_orphans(result: &OrphanResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
