//! Core modules: extraction, downloads, Instagram, retries, progress

pub mod downloader;
pub mod extractor;
pub mod instagram;
pub mod progress;
pub mod retry;
