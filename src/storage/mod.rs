//! Storage modules: config, pending queue, sessions

pub mod config;
pub mod queue;
pub mod session;
