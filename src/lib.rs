//! content-downloader library
//!
//! Core functionality for the content-downloader CLI.

pub mod core;
pub mod error;
pub mod storage;
pub mod types;
pub mod ui;
pub mod utils;
