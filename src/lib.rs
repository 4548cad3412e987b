//! GitLab Documentation MCP Service
//!
//! This crate provides a Model Context Protocol (MCP) service for searching a
//! locally indexed copy of the GitLab documentation. An offline build step
//! turns the documentation markdown tree into a JSON corpus; the server loads
//! that corpus and answers search, page and section-listing requests.
//!
//! # Features
//!
//! - Index build with front matter, title extraction and chunking of very large pages
//! - Prefix full-text search with field-weighted relevance scoring and excerpts
//! - Bounded LRU cache of rendered pages with TTL expiry
//! - MCP server over stdio or SSE
//!
//! # Modules
//!
//! - [`build`]: Index build from a markdown tree
//! - [`cache`]: Bounded content cache
//! - [`chunker`]: Splitting of oversized pages
//! - [`config`]: Command line and environment settings
//! - [`mcp`]: MCP server implementation and tool handlers
//! - [`search`]: Loaded corpus and search operation

pub mod build;
pub mod cache;
pub mod chunker;
pub mod config;
pub mod error;
pub mod markdown;
pub mod mcp;
pub mod metrics;
pub mod models;
pub mod scoring;
pub mod search;
pub mod text_index;
pub mod tree;
