//! Wire and storage types of the documentation corpus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Base URL of the published documentation site.
pub const DOCS_BASE_URL: &str = "https://docs.gitlab.com/";

/// Open key/value metadata carried by a document (front matter, chunk flags).
pub type Metadata = Map<String, Value>;

/// Public URL of a documentation page.
pub fn page_url(path: &str) -> String {
    format!("{}{}", DOCS_BASE_URL, path)
}

/// A single searchable page of the corpus.
///
/// `id` is the path relative to the documentation root, or that path plus a
/// `#fragment` for chunks of a split page. `section` is always the first
/// path segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub path: String,
    pub title: String,
    pub section: String,
    pub content: String,
    pub version: String,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Contents of `index_meta.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexMeta {
    pub version: String,
    pub document_count: usize,
    pub created_at: DateTime<Utc>,
    pub source_repo: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub path: String,
    pub url: String,
    pub excerpt: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocPageResponse {
    pub title: String,
    pub path: String,
    pub url: String,
    pub content: String,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocSection {
    pub name: String,
    pub path: String,
    pub page_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsections: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListSectionsResponse {
    pub sections: Vec<DocSection>,
    pub total: usize,
}
