pub mod collector;
pub mod config;
pub mod domain;
pub mod downloader;
pub mod error;
pub mod fetch;
pub mod google_books;
pub mod http;
pub mod imaging;
pub mod normalize;
pub mod open_library;
pub mod output;
pub mod pipeline;
pub mod resolver;
pub mod store;
