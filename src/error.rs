//! Error type shared by the index, search and server layers.

use std::path::PathBuf;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum DocsError {
    #[error("Index not found at {}. Run `build-index` to create it.", .0.display())]
    IndexNotFound(PathBuf),

    #[error("Failed to load index: {message}")]
    IndexLoad {
        message: String,
        #[source]
        source: BoxError,
    },

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Invalid search query: {0}")]
    InvalidSearchQuery(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Full-text index error: {0}")]
    TextIndex(#[from] tantivy::TantivyError),
}

impl DocsError {
    pub fn index_load(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::IndexLoad {
            message: message.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DocsError>;
