//! airchat: natural-language chat over Airtable through MCP tools
//!
//! This library provides:
//! - A model gateway for OpenAI chat completions with function calling
//! - A tool gateway that discovers and runs tools on an MCP server
//! - The orchestrator that bridges the two for a single chat request
//! - An HTTP API (`/chat`, `/validate-keys`) for a browser client

pub mod agent;
pub mod config;
pub mod llm;
pub mod mcp;
pub mod tools;
pub mod transport;

pub use config::Config;
