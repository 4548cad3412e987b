//! GitLab documentation MCP implementation.
//!
//! Exposes the loaded corpus as three tools: full-text search, page
//! retrieval and a section listing.
//!
//! # Main Components
//!
//! - [`DocsContext`]: the loaded index, section tree, page cache and timings
//! - [`DocsServer`]: the MCP tool handler serving a shared context
//!
//! # Example
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use gitlab_docs_mcp::cache::CacheOptions;
//! use gitlab_docs_mcp::mcp::{DocsContext, DocsServer};
//! use gitlab_docs_mcp::search::SearchIndex;
//!
//! async fn example() -> gitlab_docs_mcp::error::Result<()> {
//!     let index = SearchIndex::load(Path::new("data/gitlab-docs")).await?;
//!     let context = Arc::new(DocsContext::new(index, CacheOptions::default(), 0.0));
//!     let _server = DocsServer::new(context);
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use rmcp::model::{Content, Implementation, IntoContents, ProtocolVersion, ServerCapabilities, ServerInfo};
use rmcp::{ServerHandler, schemars, tool};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::cache::{CacheOptions, ContentCache};
use crate::error::{DocsError, Result as DocsResult};
use crate::markdown::MarkdownNormalizer;
use crate::metrics::{OperationStats, PerformanceMonitor};
use crate::models::{DocPageResponse, ListSectionsResponse, SearchResponse, page_url};
use crate::search::{DEFAULT_MAX_RESULTS, MAX_ALLOWED_RESULTS, SearchIndex};
use crate::tree::DocumentTree;

pub const SERVER_NAME: &str = "gitlab-docs-mcp";

const PAGE_CACHE_PREFIX: &str = "doc:";

/// Pretty-printed JSON returned as the text of a tool result.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonPayload(pub String);

impl JsonPayload {
    fn pretty<T: serde::Serialize>(value: &T) -> DocsResult<Self> {
        Ok(Self(serde_json::to_string_pretty(value)?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl IntoContents for JsonPayload {
    fn into_contents(self) -> Vec<Content> {
        vec![Content::text(self.0)]
    }
}

impl IntoContents for DocsError {
    fn into_contents(self) -> Vec<Content> {
        vec![Content::text(format!("Error: {}", self))]
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchDocsParams {
    #[schemars(description = "Search query")]
    pub query: String,

    #[schemars(description = "Maximum number of results to return (1-50, default 10)")]
    pub max_results: Option<i64>,

    #[schemars(description = "Only return pages from this top-level section, e.g. \"ci\" or \"api\"")]
    pub section: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetDocPageParams {
    #[schemars(description = "Document path relative to the docs root, e.g. \"ci/yaml/_index.md\"")]
    pub path: String,
}

/// Everything a request handler needs, built once at startup.
#[derive(Debug)]
pub struct DocsContext {
    pub index: SearchIndex,
    pub tree: DocumentTree,
    pub normalizer: MarkdownNormalizer,
    pub cache: Mutex<ContentCache>,
    pub monitor: Mutex<PerformanceMonitor>,
    pub min_score: f64,
}

impl DocsContext {
    pub fn new(index: SearchIndex, cache: CacheOptions, min_score: f64) -> Self {
        let tree = DocumentTree::from_documents(index.documents());
        Self {
            index,
            tree,
            normalizer: MarkdownNormalizer::new(),
            cache: Mutex::new(ContentCache::new(cache)),
            monitor: Mutex::new(PerformanceMonitor::default()),
            min_score,
        }
    }

    pub async fn performance_summary(&self) -> BTreeMap<String, OperationStats> {
        self.monitor.lock().await.summary()
    }
}

/// MCP handler over a shared [`DocsContext`].
#[derive(Debug, Clone)]
pub struct DocsServer {
    context: Arc<DocsContext>,
}

#[tool(tool_box)]
impl DocsServer {
    pub fn new(context: Arc<DocsContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &DocsContext {
        &self.context
    }

    /// Searches the indexed documentation.
    ///
    /// # Arguments
    /// * `params` - Query text, optional `maxResults` (1-50) and optional section filter
    ///
    /// # Returns
    /// * `Ok(JsonPayload)` - A pretty-printed [`SearchResponse`]
    /// * `Err(DocsError::InvalidSearchQuery)` - If the query is blank or `maxResults` is out of range
    #[tool(description = "Search the GitLab documentation. Returns matching pages ranked by relevance with a short excerpt.")]
    pub async fn search_gitlab_docs(
        &self,
        #[tool(aggr)] params: SearchDocsParams,
    ) -> DocsResult<JsonPayload> {
        let started = Instant::now();
        let result = self.run_search(&params).and_then(|response| JsonPayload::pretty(&response));
        self.record("search", started, result.is_err()).await;
        result
    }

    /// Fetches one page by its exact path.
    ///
    /// The rendered page is looked up in the content cache first and stored
    /// there after a miss.
    ///
    /// # Arguments
    /// * `params` - Path of the page relative to the docs root
    ///
    /// # Returns
    /// * `Ok(JsonPayload)` - A pretty-printed [`DocPageResponse`]
    /// * `Err(DocsError::DocumentNotFound)` - If no document has that path
    #[tool(description = "Get the full content of a GitLab documentation page by its path.")]
    pub async fn get_doc_page(&self, #[tool(aggr)] params: GetDocPageParams) -> DocsResult<JsonPayload> {
        let started = Instant::now();
        let result = self.fetch_page(&params.path).await;
        self.record("get-page", started, result.is_err()).await;
        result
    }

    /// Lists the top-level sections sorted by name.
    ///
    /// # Returns
    /// * `Ok(JsonPayload)` - A pretty-printed [`ListSectionsResponse`]
    #[tool(description = "List the top-level sections of the GitLab documentation with their page counts.")]
    pub async fn list_doc_sections(&self) -> DocsResult<JsonPayload> {
        let sections = self.context.tree.sections();
        JsonPayload::pretty(&ListSectionsResponse {
            total: sections.len(),
            sections,
        })
    }
}

impl DocsServer {
    fn run_search(&self, params: &SearchDocsParams) -> DocsResult<SearchResponse> {
        let query = params.query.trim();
        if query.is_empty() {
            return Err(DocsError::InvalidSearchQuery("query must not be empty".to_string()));
        }

        let max_results = match params.max_results {
            None => DEFAULT_MAX_RESULTS,
            Some(n) if (1..=MAX_ALLOWED_RESULTS as i64).contains(&n) => n as usize,
            Some(n) => {
                return Err(DocsError::InvalidSearchQuery(format!(
                    "maxResults must be between 1 and {}, got {}",
                    MAX_ALLOWED_RESULTS, n
                )));
            }
        };

        tracing::debug!("Searching for {:?} (max {}, section {:?})", query, max_results, params.section);
        self.context.index.search(
            query,
            max_results,
            params.section.as_deref(),
            self.context.min_score,
        )
    }

    async fn fetch_page(&self, path: &str) -> DocsResult<JsonPayload> {
        let key = format!("{}{}", PAGE_CACHE_PREFIX, path);

        let cached = self.context.cache.lock().await.get(&key);
        if let Some(cached) = cached {
            tracing::debug!("Cache hit for {}", path);
            return Ok(JsonPayload(cached));
        }
        tracing::debug!("Cache miss for {}", path);

        let doc = self
            .context
            .index
            .find_by_path(path)
            .ok_or_else(|| DocsError::DocumentNotFound(path.to_string()))?;

        let page = JsonPayload::pretty(&DocPageResponse {
            title: doc.title.clone(),
            path: doc.path.clone(),
            url: page_url(&doc.path),
            content: self.context.normalizer.render(&doc.content).await,
            metadata: doc.metadata.clone(),
        })?;

        self.context.cache.lock().await.set(key, page.0.clone());
        Ok(page)
    }

    async fn record(&self, operation: &str, started: Instant, failed: bool) {
        let elapsed = started.elapsed();
        if failed {
            tracing::warn!("{} failed after {:?}", operation, elapsed);
        }
        self.context.monitor.lock().await.record(operation, elapsed, failed);
    }
}

#[tool(tool_box)]
impl ServerHandler for DocsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(
                "This server provides search over a local copy of the GitLab documentation. \
                Use 'search_gitlab_docs' to find pages, 'get_doc_page' to read a page by its path \
                and 'list_doc_sections' to browse the top-level sections."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;
    use chrono::Utc;
    use serde_json::Value;

    fn doc(path: &str, title: &str, content: &str) -> Document {
        Document {
            id: path.to_string(),
            path: path.to_string(),
            title: title.to_string(),
            section: path.split('/').next().unwrap_or_default().to_string(),
            content: content.to_string(),
            version: "latest".to_string(),
            last_updated: Utc::now(),
            metadata: Default::default(),
        }
    }

    fn setup_server(cache: CacheOptions) -> DocsServer {
        let index = SearchIndex::with_documents(vec![
            doc("ci/runners/_index.md", "Runners", "Runners execute CI/CD jobs.\n\n\n\nRegister one first."),
            doc("ci/yaml/_index.md", "CI/CD YAML syntax reference", "Keywords for pipelines and runners."),
            doc("api/users.md", "Users API", "List and manage users."),
            doc("user/project/_index.md", "Projects", "Projects hold repositories."),
        ])
        .unwrap();
        DocsServer::new(Arc::new(DocsContext::new(index, cache, 0.0)))
    }

    fn search_params(query: &str, max_results: Option<i64>, section: Option<&str>) -> SearchDocsParams {
        SearchDocsParams {
            query: query.to_string(),
            max_results,
            section: section.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_search_tool() {
        let server = setup_server(CacheOptions::default());
        let result = server.search_gitlab_docs(search_params("runners", None, None)).await.unwrap();

        let response: SearchResponse = serde_json::from_str(result.as_str()).unwrap();
        assert!(!response.results.is_empty());
        assert_eq!(response.results[0].title, "Runners");
        assert_eq!(response.results[0].url, "https://docs.gitlab.com/ci/runners/_index.md");
        assert!(response.results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_search_tool_section_filter() {
        let server = setup_server(CacheOptions::default());
        let result = server.search_gitlab_docs(search_params("users", None, Some("api"))).await.unwrap();
        let response: SearchResponse = serde_json::from_str(result.as_str()).unwrap();
        assert!(response.results.iter().all(|r| r.path.starts_with("api/")));

        let result = server.search_gitlab_docs(search_params("users", None, Some("ci"))).await.unwrap();
        let response: SearchResponse = serde_json::from_str(result.as_str()).unwrap();
        assert!(response.results.is_empty());
    }

    #[tokio::test]
    async fn test_search_tool_validation() {
        let server = setup_server(CacheOptions::default());

        for params in [
            search_params("", None, None),
            search_params("   ", None, None),
            search_params("runners", Some(0), None),
            search_params("runners", Some(51), None),
            search_params("runners", Some(-3), None),
        ] {
            let err = server.search_gitlab_docs(params).await.unwrap_err();
            assert!(matches!(err, DocsError::InvalidSearchQuery(_)), "unexpected error: {err}");
        }

        assert!(server.search_gitlab_docs(search_params("runners", Some(50), None)).await.is_ok());
    }

    #[tokio::test]
    async fn test_get_doc_page_caches_rendered_page() {
        let server = setup_server(CacheOptions::default());
        let key = "doc:ci/runners/_index.md";
        assert!(!server.context().cache.lock().await.has(key));

        let first = server
            .get_doc_page(GetDocPageParams { path: "ci/runners/_index.md".to_string() })
            .await
            .unwrap();
        assert!(server.context().cache.lock().await.has(key));

        let page: Value = serde_json::from_str(first.as_str()).unwrap();
        assert_eq!(page["title"], "Runners");
        assert_eq!(page["url"], "https://docs.gitlab.com/ci/runners/_index.md");
        assert_eq!(page["content"], "Runners execute CI/CD jobs.\n\nRegister one first.\n");

        let second = server
            .get_doc_page(GetDocPageParams { path: "ci/runners/_index.md".to_string() })
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_get_doc_page_not_found() {
        let server = setup_server(CacheOptions::default());
        let err = server
            .get_doc_page(GetDocPageParams { path: "missing/page.md".to_string() })
            .await
            .unwrap_err();

        assert!(matches!(err, DocsError::DocumentNotFound(ref p) if p == "missing/page.md"));
        let contents = err.into_contents();
        assert_eq!(
            contents[0].as_text().unwrap().text,
            "Error: Document not found: missing/page.md"
        );
    }

    #[tokio::test]
    async fn test_page_cache_is_bounded() {
        let server = setup_server(CacheOptions::new(1, 2, 60));
        for path in ["ci/runners/_index.md", "ci/yaml/_index.md", "api/users.md"] {
            server.get_doc_page(GetDocPageParams { path: path.to_string() }).await.unwrap();
        }

        let cache = server.context().cache.lock().await;
        assert_eq!(cache.size(), 2);
        assert!(!cache.has("doc:ci/runners/_index.md"));
        assert!(cache.has("doc:api/users.md"));
    }

    #[tokio::test]
    async fn test_list_doc_sections() {
        let server = setup_server(CacheOptions::default());
        let result = server.list_doc_sections().await.unwrap();

        let response: ListSectionsResponse = serde_json::from_str(result.as_str()).unwrap();
        assert_eq!(response.total, 3);
        let names: Vec<&str> = response.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["api", "ci", "user"]);
        assert_eq!(response.sections[1].page_count, 2);
        assert_eq!(
            response.sections[1].subsections,
            Some(vec!["runners".to_string(), "yaml".to_string()])
        );
    }

    #[tokio::test]
    async fn test_operations_are_timed() {
        let server = setup_server(CacheOptions::default());
        server.search_gitlab_docs(search_params("runners", None, None)).await.unwrap();
        let _ = server.search_gitlab_docs(search_params("", None, None)).await;
        let _ = server.get_doc_page(GetDocPageParams { path: "nope.md".to_string() }).await;

        let summary = server.context().performance_summary().await;
        assert_eq!(summary["search"].count, 2);
        assert_eq!(summary["search"].failures, 1);
        assert_eq!(summary["get-page"].failures, 1);
    }

    #[test]
    fn test_server_info() {
        let server = setup_server(CacheOptions::default());
        let info = server.get_info();
        assert_eq!(info.server_info.name, SERVER_NAME);
        assert!(info.capabilities.tools.is_some());
    }
}
