//! Transport layer: HTTP API and one-shot CLI commands

pub mod cli;
pub mod http;
