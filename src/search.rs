//! The loaded corpus and query execution over it.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tokio::fs;

use crate::error::{DocsError, Result};
use crate::models::{page_url, Document, IndexMeta, SearchResponse, SearchResult};
use crate::scoring::{self, DEFAULT_EXCERPT_LENGTH};
use crate::text_index::{FullTextIndex, IndexedFields, TantivyTextIndex};

pub const INDEX_META_FILE: &str = "index_meta.json";
pub const INDEX_DOCS_FILE: &str = "documents.json";

pub const DEFAULT_MAX_RESULTS: usize = 10;
pub const MAX_ALLOWED_RESULTS: usize = 50;
pub const MIN_SEARCH_SCORE: f64 = 0.0;

/// Documents by id plus the full-text index built over them.
#[derive(Debug)]
pub struct SearchIndex<I = TantivyTextIndex> {
    documents: HashMap<String, Document>,
    /// Ids in insertion order.
    order: Vec<String>,
    /// First document id seen for each path.
    by_path: HashMap<String, String>,
    text: I,
    meta: Option<IndexMeta>,
}

impl SearchIndex<TantivyTextIndex> {
    pub fn new() -> Result<Self> {
        Ok(Self::with_text_index(TantivyTextIndex::new()?))
    }

    /// Indexes `documents` with a fresh in-memory engine.
    pub fn with_documents(documents: impl IntoIterator<Item = Document>) -> Result<Self> {
        Self::from_documents(TantivyTextIndex::new()?, documents)
    }

    /// Loads `index_meta.json` and `documents.json` from `dir`.
    pub async fn load(dir: &Path) -> Result<Self> {
        Self::load_with(dir, TantivyTextIndex::new()?).await
    }
}

impl<I: FullTextIndex> SearchIndex<I> {
    pub fn with_text_index(text: I) -> Self {
        Self {
            documents: HashMap::new(),
            order: Vec::new(),
            by_path: HashMap::new(),
            text,
            meta: None,
        }
    }

    /// Indexes all `documents` and commits once at the end.
    pub fn from_documents(text: I, documents: impl IntoIterator<Item = Document>) -> Result<Self> {
        let mut index = Self::with_text_index(text);
        for doc in documents {
            index.stage(doc)?;
        }
        index.text.commit()?;
        Ok(index)
    }

    /// Loads a persisted corpus into `text`.
    ///
    /// Fails with [`DocsError::IndexNotFound`] when either file is missing and
    /// with [`DocsError::IndexLoad`] when one cannot be read or parsed.
    pub async fn load_with(dir: &Path, text: I) -> Result<Self> {
        let meta_path = dir.join(INDEX_META_FILE);
        let docs_path = dir.join(INDEX_DOCS_FILE);

        if !fs::try_exists(&meta_path).await.unwrap_or(false)
            || !fs::try_exists(&docs_path).await.unwrap_or(false)
        {
            return Err(DocsError::IndexNotFound(dir.to_path_buf()));
        }

        let raw_meta = fs::read_to_string(&meta_path)
            .await
            .map_err(|e| DocsError::index_load(format!("Failed to read {}", INDEX_META_FILE), e))?;
        let meta: IndexMeta = serde_json::from_str(&raw_meta)
            .map_err(|e| DocsError::index_load(format!("Failed to parse {}", INDEX_META_FILE), e))?;

        let raw_docs = fs::read_to_string(&docs_path)
            .await
            .map_err(|e| DocsError::index_load(format!("Failed to read {}", INDEX_DOCS_FILE), e))?;
        let documents: Vec<Document> = serde_json::from_str(&raw_docs)
            .map_err(|e| DocsError::index_load(format!("Failed to parse {}", INDEX_DOCS_FILE), e))?;

        if meta.document_count != documents.len() {
            tracing::warn!(
                "Index metadata lists {} documents but {} were found in {}",
                meta.document_count,
                documents.len(),
                INDEX_DOCS_FILE
            );
        }

        let mut index = Self::from_documents(text, documents)?;
        index.meta = Some(meta);
        tracing::info!("Loaded {} documents from {:?}", index.document_count(), dir);
        Ok(index)
    }

    /// Adds a document to both the id map and the full-text index and makes
    /// it searchable. A document with the same id is replaced.
    pub fn insert(&mut self, doc: Document) -> Result<()> {
        self.stage(doc)?;
        self.text.commit()
    }

    fn stage(&mut self, doc: Document) -> Result<()> {
        self.text.add(IndexedFields::from(&doc))?;
        self.by_path
            .entry(doc.path.clone())
            .or_insert_with(|| doc.id.clone());

        let id = doc.id.clone();
        match self.documents.insert(id.clone(), doc) {
            Some(previous) => {
                tracing::warn!("Duplicate document id {}, keeping the last one", id);
                let moved = self.documents.get(&id).is_some_and(|d| d.path != previous.path);
                if moved && self.by_path.get(&previous.path) == Some(&id) {
                    self.by_path.remove(&previous.path);
                }
            }
            None => self.order.push(id),
        }
        Ok(())
    }

    /// Runs `query` and returns up to `max_results` scored results.
    ///
    /// Candidates are visited in the order the full-text index reports them
    /// and collection stops once `max_results` results have passed the
    /// filters; only that subset is sorted by score. `total` counts every
    /// distinct candidate before the section and score filters.
    pub fn search(
        &self,
        query: &str,
        max_results: usize,
        section: Option<&str>,
        min_score: f64,
    ) -> Result<SearchResponse> {
        let mut seen = HashSet::new();
        let candidates: Vec<String> = self
            .text
            .search(query)?
            .into_iter()
            .flat_map(|hits| hits.ids)
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let section = section.filter(|s| !s.is_empty());
        let mut results = Vec::new();

        for id in &candidates {
            if results.len() >= max_results {
                break;
            }
            let Some(doc) = self.documents.get(id) else {
                continue;
            };
            if section.is_some_and(|s| doc.section != s) {
                continue;
            }

            let score = scoring::score(query, doc);
            if score < min_score {
                continue;
            }

            results.push(SearchResult {
                title: doc.title.clone(),
                path: doc.path.clone(),
                url: page_url(&doc.path),
                excerpt: scoring::excerpt(query, &doc.content, DEFAULT_EXCERPT_LENGTH),
                score,
            });
        }

        results.sort_by(|a, b| b.score.total_cmp(&a.score));

        tracing::debug!(
            "Search {:?}: {} candidates, {} results",
            query,
            candidates.len(),
            results.len()
        );

        Ok(SearchResponse {
            results,
            total: candidates.len(),
        })
    }

    pub fn document(&self, id: &str) -> Option<&Document> {
        self.documents.get(id)
    }

    /// The document stored under exactly `path`.
    pub fn find_by_path(&self, path: &str) -> Option<&Document> {
        self.by_path.get(path).and_then(|id| self.documents.get(id))
    }

    /// All documents in insertion order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.order.iter().filter_map(|id| self.documents.get(id))
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn is_ready(&self) -> bool {
        !self.documents.is_empty()
    }

    pub fn meta(&self) -> Option<&IndexMeta> {
        self.meta.as_ref()
    }
}
