use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use serde_json::Value;

use crate::domain::{BookMetadata, Isbn, SearchHit};
use crate::google_books::GOOGLE_BOOKS;
use crate::open_library::OPEN_LIBRARY;

pub const GOOGLE_IMAGE_RANK: [&str; 5] = ["extraLarge", "large", "medium", "small", "thumbnail"];

const OPEN_LIBRARY_COVER_RANK: [&str; 3] = ["large", "medium", "small"];
const GENRE_SUBJECT_LIMIT: usize = 3;

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9])([0-9]{4})(?:[^0-9]|$)").expect("year pattern is valid")
});

pub fn from_google_volume(info: &Value, isbn: &str) -> BookMetadata {
    let mut covers = google_image_links(info);
    let cover_url = (!covers.is_empty()).then(|| covers.remove(0));
    BookMetadata {
        title: text(info, "title").unwrap_or_default(),
        subtitle: text(info, "subtitle"),
        authors: string_list(info.get("authors")),
        publisher: text(info, "publisher"),
        publish_year: info
            .get("publishedDate")
            .and_then(Value::as_str)
            .map(extract_year)
            .unwrap_or_default(),
        isbn: isbn.to_string(),
        page_count: page_count(info.get("pageCount")),
        description: text(info, "description"),
        genre: join_non_empty(string_list(info.get("categories"))),
        source_name: GOOGLE_BOOKS.to_string(),
        cover_url,
        cover_fallback_urls: covers,
    }
}

pub fn google_search_hit(item: &Value) -> Option<SearchHit> {
    let info = item.get("volumeInfo")?;
    let isbn = google_isbn(info);
    let metadata = from_google_volume(
        info,
        isbn.as_ref().map(Isbn::as_str).unwrap_or_default(),
    );
    metadata.is_resolved().then_some(SearchHit { metadata, isbn })
}

pub fn google_isbn(info: &Value) -> Option<Isbn> {
    let identifiers = info.get("industryIdentifiers")?.as_array()?;
    let find = |kind: &str| {
        identifiers.iter().find_map(|identifier| {
            if identifier.get("type").and_then(Value::as_str) != Some(kind) {
                return None;
            }
            identifier
                .get("identifier")
                .and_then(Value::as_str)
                .and_then(|value| value.parse::<Isbn>().ok())
        })
    };
    find("ISBN_13").or_else(|| find("ISBN_10"))
}

pub fn google_image_links(info: &Value) -> Vec<String> {
    let Some(links) = info.get("imageLinks") else {
        return Vec::new();
    };
    let mut urls = Vec::new();
    for key in GOOGLE_IMAGE_RANK {
        if let Some(url) = links.get(key).and_then(Value::as_str) {
            let cleaned = clean_cover_url(url);
            if !cleaned.is_empty() && !urls.contains(&cleaned) {
                urls.push(cleaned);
            }
        }
    }
    urls
}

pub fn from_open_library(record: &Value, isbn: &str) -> BookMetadata {
    let authors = record
        .get("authors")
        .and_then(Value::as_array)
        .map(|authors| authors.iter().filter_map(named).collect())
        .unwrap_or_default();
    let publishers = record
        .get("publishers")
        .and_then(Value::as_array)
        .map(|publishers| publishers.iter().filter_map(named).collect())
        .unwrap_or_default();
    let subjects = record
        .get("subjects")
        .and_then(Value::as_array)
        .map(|subjects| {
            subjects
                .iter()
                .filter_map(named)
                .take(GENRE_SUBJECT_LIMIT)
                .collect()
        })
        .unwrap_or_default();

    let mut covers = Vec::new();
    if let Some(cover) = record.get("cover") {
        for key in OPEN_LIBRARY_COVER_RANK {
            if let Some(url) = cover.get(key).and_then(Value::as_str) {
                let cleaned = clean_cover_url(url);
                if !cleaned.is_empty() && !covers.contains(&cleaned) {
                    covers.push(cleaned);
                }
            }
        }
    }
    let cover_url = (!covers.is_empty()).then(|| covers.remove(0));

    BookMetadata {
        title: text(record, "title").unwrap_or_default(),
        subtitle: text(record, "subtitle"),
        authors,
        publisher: join_non_empty(publishers),
        publish_year: record
            .get("publish_date")
            .and_then(Value::as_str)
            .map(extract_year)
            .unwrap_or_default(),
        isbn: isbn.to_string(),
        page_count: page_count(record.get("number_of_pages")),
        description: record.get("notes").and_then(named),
        genre: join_non_empty(subjects),
        source_name: OPEN_LIBRARY.to_string(),
        cover_url,
        cover_fallback_urls: covers,
    }
}

/// First standalone 4-digit run in a free-form date, or empty.
pub fn extract_year(date: &str) -> String {
    YEAR_RE
        .captures(date)
        .and_then(|captures| captures.get(1))
        .map(|year| year.as_str().to_string())
        .unwrap_or_default()
}

pub fn clean_cover_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let upgraded = match trimmed.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => trimmed.to_string(),
    };
    let Ok(mut url) = Url::parse(&upgraded) else {
        return upgraded;
    };
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "zoom" && key != "edge")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    url.to_string()
}

fn text(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn named(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => Some(text.as_str()),
        Value::Object(map) => map
            .get("name")
            .or_else(|| map.get("value"))
            .and_then(Value::as_str),
        _ => None,
    }?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn page_count(value: Option<&Value>) -> u32 {
    match value {
        Some(Value::Number(number)) => number
            .as_u64()
            .and_then(|count| u32::try_from(count).ok())
            .unwrap_or(0),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn join_non_empty(items: Vec<String>) -> Option<String> {
    (!items.is_empty()).then(|| items.join(", "))
}
