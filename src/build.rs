//! Offline construction of the persisted corpus from a documentation checkout.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use itertools::Itertools;
use serde_json::Value;
use walkdir::WalkDir;

use crate::chunker::{Chunk, DocumentChunker};
use crate::error::Result;
use crate::markdown::MarkdownNormalizer;
use crate::models::{Document, IndexMeta, Metadata};
use crate::search::{INDEX_DOCS_FILE, INDEX_META_FILE};

pub const INDEX_VERSION: &str = "1.0.0";
pub const GITLAB_DOCS_REPO: &str = "https://gitlab.com/gitlab-org/gitlab-docs";
pub const DEFAULT_DOCS_REPO_PATH: &str = "data/gitlab-docs-repo/doc";

/// Counters reported at the end of a build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub files: usize,
    pub skipped: usize,
    pub chunked: usize,
    pub documents: usize,
    pub sections: usize,
}

#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    normalizer: MarkdownNormalizer,
    chunker: DocumentChunker,
}

impl IndexBuilder {
    pub fn new(chunker: DocumentChunker) -> Self {
        Self {
            normalizer: MarkdownNormalizer::new(),
            chunker,
        }
    }

    /// Markdown files under `root`, in a stable order.
    pub fn collect_sources(&self, root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping unreadable directory entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "md"))
            .map(|entry| entry.into_path())
            .collect()
    }

    /// Turns one markdown file into its documents: the page itself, or a
    /// summary page followed by its chunks.
    pub fn process_file(&self, relative: &str, raw: &str) -> Vec<Document> {
        let front_matter = self.normalizer.extract_front_matter(raw);
        let content = self.normalizer.strip_markdown(&front_matter.content);
        let section = relative.split('/').next().unwrap_or(relative).to_string();
        let title = front_matter
            .get_str("title")
            .map(str::to_string)
            .or_else(|| self.normalizer.extract_title(&front_matter.content))
            .unwrap_or_else(|| relative.to_string());
        let version = front_matter.get_str("version").unwrap_or("latest").to_string();
        let last_updated = Utc::now();

        if !self.chunker.should_chunk(relative, &content) {
            return vec![Document {
                id: relative.to_string(),
                path: relative.to_string(),
                title,
                section,
                content,
                version,
                last_updated,
                metadata: front_matter.data,
            }];
        }

        let chunks = self.chunker.chunk(relative, &title, &content);
        tracing::info!("Split {} into {} chunks", relative, chunks.len());

        let mut summary_metadata = front_matter.data.clone();
        summary_metadata.insert("chunked".to_string(), Value::Bool(true));
        summary_metadata.insert("totalChunks".to_string(), Value::from(chunks.len()));

        let mut documents = Vec::with_capacity(chunks.len() + 1);
        documents.push(Document {
            id: relative.to_string(),
            path: relative.to_string(),
            content: self.chunker.create_summary(relative, &title, &chunks),
            title,
            section: section.clone(),
            version: version.clone(),
            last_updated,
            metadata: summary_metadata,
        });

        documents.extend(chunks.into_iter().map(|chunk| Document {
            id: chunk.path.clone(),
            metadata: chunk_metadata(&front_matter.data, relative, &chunk),
            path: chunk.path,
            title: chunk.title,
            section: section.clone(),
            content: chunk.content,
            version: version.clone(),
            last_updated,
        }));

        documents
    }

    /// Reads every markdown file under `source`. Files that cannot be read
    /// are logged and skipped.
    pub fn build(&self, source: &Path) -> Result<(Vec<Document>, BuildReport)> {
        if !source.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Source path not found: {}", source.display()),
            )
            .into());
        }

        let files = self.collect_sources(source);
        tracing::info!("Found {} markdown files in {:?}", files.len(), source);

        let mut report = BuildReport {
            files: files.len(),
            ..BuildReport::default()
        };
        let mut documents = Vec::new();

        for file in &files {
            let Some(relative) = relative_path(source, file) else {
                tracing::error!("Cannot derive a relative path for {:?}, skipping", file);
                report.skipped += 1;
                continue;
            };

            let raw = match fs::read_to_string(file) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::error!("Error processing {:?}: {}", file, e);
                    report.skipped += 1;
                    continue;
                }
            };

            let produced = self.process_file(&relative, &raw);
            if produced.len() > 1 {
                report.chunked += 1;
            }
            documents.extend(produced);

            if documents.len() % 100 == 0 {
                tracing::info!("Processed {} documents...", documents.len());
            }
        }

        report.documents = documents.len();
        report.sections = documents.iter().map(|d| d.section.as_str()).unique().count();
        Ok((documents, report))
    }

    /// Builds from `source` and persists the corpus into `output`.
    pub fn build_and_write(&self, source: &Path, output: &Path) -> Result<BuildReport> {
        let (documents, report) = self.build(source)?;
        write_index(output, &documents, GITLAB_DOCS_REPO)?;
        tracing::info!(
            "Index build complete: {} documents, {} sections, {} skipped",
            report.documents,
            report.sections,
            report.skipped
        );
        Ok(report)
    }
}

/// Writes `documents.json` and `index_meta.json` into `dir`.
pub fn write_index(dir: &Path, documents: &[Document], source_repo: &str) -> Result<IndexMeta> {
    fs::create_dir_all(dir)?;

    let docs_path = dir.join(INDEX_DOCS_FILE);
    fs::write(&docs_path, serde_json::to_string_pretty(documents)?)?;
    tracing::info!("Wrote {} documents to {:?}", documents.len(), docs_path);

    let meta = IndexMeta {
        version: INDEX_VERSION.to_string(),
        document_count: documents.len(),
        created_at: Utc::now(),
        source_repo: source_repo.to_string(),
    };
    let meta_path = dir.join(INDEX_META_FILE);
    fs::write(&meta_path, serde_json::to_string_pretty(&meta)?)?;
    tracing::info!("Wrote metadata to {:?}", meta_path);

    Ok(meta)
}

fn chunk_metadata(base: &Metadata, parent: &str, chunk: &Chunk) -> Metadata {
    let mut metadata = base.clone();
    metadata.insert("isChunk".to_string(), Value::Bool(true));
    metadata.insert("chunkIndex".to_string(), Value::from(chunk.chunk_index));
    metadata.insert("totalChunks".to_string(), Value::from(chunk.total_chunks));
    metadata.insert("parentPath".to_string(), Value::String(parent.to_string()));
    metadata
}

/// `/`-separated path of `file` below `root`.
fn relative_path(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Option<_>>()?;
    (!parts.is_empty()).then(|| parts.join("/"))
}
