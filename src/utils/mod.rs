//! Utilities: file names, links, logging, paths

pub mod filename;
pub mod links;
pub mod logging;
pub mod paths;
