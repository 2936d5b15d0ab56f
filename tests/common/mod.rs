#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Write};
use std::sync::Mutex;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde_json::Value;

use bookshelf_resolver::domain::Isbn;
use bookshelf_resolver::error::ResolveError;
use bookshelf_resolver::fetch::CoverFetcher;
use bookshelf_resolver::google_books::{GoogleBooksClient, first_volume_info, volume_items};
use bookshelf_resolver::open_library::{CoverProbe, OpenLibraryClient, extract_record};

pub fn fixture(name: &str) -> Value {
    let raw = fs::read_to_string(format!("tests/fixtures/{name}")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[derive(Default)]
pub struct StubGoogle {
    pub volume: Option<Value>,
    pub search_items: Vec<Value>,
    pub fail: bool,
    pub lookups: Mutex<usize>,
    pub searches: Mutex<Vec<String>>,
}

impl StubGoogle {
    pub fn with_volumes_response(body: &Value) -> Self {
        Self {
            volume: first_volume_info(body),
            ..Self::default()
        }
    }

    pub fn with_search_response(body: &Value) -> Self {
        Self {
            search_items: volume_items(body),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn lookup_count(&self) -> usize {
        *self.lookups.lock().unwrap()
    }

    pub fn search_queries(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }
}

impl GoogleBooksClient for StubGoogle {
    fn lookup_isbn(&self, _isbn: &Isbn) -> Result<Option<Value>, ResolveError> {
        *self.lookups.lock().unwrap() += 1;
        if self.fail {
            return Err(ResolveError::unreachable("Google Books", "connection refused"));
        }
        Ok(self.volume.clone())
    }

    fn search(&self, query: &str, max_results: usize) -> Result<Vec<Value>, ResolveError> {
        self.searches.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(ResolveError::SourceStatus {
                provider: "Google Books".to_string(),
                status: 503,
            });
        }
        Ok(self.search_items.iter().take(max_results).cloned().collect())
    }
}

#[derive(Default)]
pub struct StubOpenLibrary {
    pub record: Option<Value>,
    pub fail: bool,
    pub lookups: Mutex<usize>,
}

impl StubOpenLibrary {
    pub fn with_books_response(body: &Value, isbn: &str) -> Self {
        let isbn: Isbn = isbn.parse().unwrap();
        Self {
            record: extract_record(body, &isbn).unwrap(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn lookup_count(&self) -> usize {
        *self.lookups.lock().unwrap()
    }
}

impl OpenLibraryClient for StubOpenLibrary {
    fn lookup_isbn(&self, _isbn: &Isbn) -> Result<Option<Value>, ResolveError> {
        *self.lookups.lock().unwrap() += 1;
        if self.fail {
            return Err(ResolveError::malformed("Open Library", "expected value at line 1"));
        }
        Ok(self.record.clone())
    }
}

/// Answers probes from a fixed ISBN -> URL table.
#[derive(Default)]
pub struct StubProbe {
    pub hits: HashMap<String, String>,
    pub probed: Mutex<Vec<String>>,
}

impl StubProbe {
    pub fn hit(mut self, isbn: &str, url: &str) -> Self {
        self.hits.insert(isbn.to_string(), url.to_string());
        self
    }

    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

impl CoverProbe for StubProbe {
    fn probe(&self, isbn: &Isbn) -> Result<Option<String>, ResolveError> {
        self.probed.lock().unwrap().push(isbn.to_string());
        Ok(self.hits.get(isbn.as_str()).cloned())
    }
}

/// Serves canned bodies per URL; anything else is a 404.
#[derive(Default)]
pub struct StubFetcher {
    pub bodies: HashMap<String, Vec<u8>>,
    pub calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn serve(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CoverFetcher for StubFetcher {
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64, ResolveError> {
        self.calls.lock().unwrap().push(url.to_string());
        let Some(body) = self.bodies.get(url) else {
            return Err(ResolveError::SourceStatus {
                provider: "cover host".to_string(),
                status: 404,
            });
        };
        sink.write_all(body)
            .map_err(|err| ResolveError::ImageStorageFailed(err.to_string()))?;
        Ok(body.len() as u64)
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255]));
    encode_png(&DynamicImage::ImageRgba8(image))
}

pub fn encode_png(image: &DynamicImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// Inserts an `eXIf` chunk carrying `orientation` right after IHDR.
pub fn with_exif_orientation(png: &[u8], orientation: u16) -> Vec<u8> {
    let mut exif = Vec::new();
    exif.extend_from_slice(b"MM\x00\x2a");
    exif.extend_from_slice(&8u32.to_be_bytes());
    exif.extend_from_slice(&1u16.to_be_bytes());
    exif.extend_from_slice(&0x0112u16.to_be_bytes());
    exif.extend_from_slice(&3u16.to_be_bytes());
    exif.extend_from_slice(&1u32.to_be_bytes());
    exif.extend_from_slice(&orientation.to_be_bytes());
    exif.extend_from_slice(&[0, 0]);
    exif.extend_from_slice(&0u32.to_be_bytes());

    let mut chunk = Vec::new();
    chunk.extend_from_slice(&(exif.len() as u32).to_be_bytes());
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(b"eXIf");
    hasher.update(&exif);
    chunk.extend_from_slice(b"eXIf");
    chunk.extend_from_slice(&exif);
    chunk.extend_from_slice(&hasher.finalize().to_be_bytes());

    // 8-byte signature + IHDR (4 length + 4 type + 13 data + 4 crc).
    let ihdr_end = 8 + 25;
    let mut out = png[..ihdr_end].to_vec();
    out.extend_from_slice(&chunk);
    out.extend_from_slice(&png[ihdr_end..]);
    out
}

/// Entry names directly under `root`, hidden scratch files included.
pub fn files_in(root: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(root)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
