//! Terminal interaction: line input and the session controller

pub mod controller;
pub mod prompt;
