//! Runtime settings shared by the server and index builder binaries.

use std::path::PathBuf;

use clap::Args;

use crate::cache::{CacheOptions, DEFAULT_CACHE_ENTRIES, DEFAULT_CACHE_SIZE_MB, DEFAULT_CACHE_TTL_MINUTES};
use crate::scoring::SCORE_MAX;
use crate::search::MIN_SEARCH_SCORE;

pub const DEFAULT_INDEX_PATH: &str = "data/gitlab-docs";

#[derive(Args, Debug, Clone, PartialEq)]
pub struct DocsConfig {
    /// Directory holding index_meta.json and documents.json
    #[arg(long, env = "GITLAB_DOCS_INDEX_PATH", default_value = DEFAULT_INDEX_PATH)]
    pub index_path: PathBuf,

    /// Minimum relevance score a search result must reach (0-10)
    #[arg(long, env = "GITLAB_DOCS_MIN_SCORE", default_value_t = MIN_SEARCH_SCORE, value_parser = parse_min_score)]
    pub min_score: f64,

    /// Content cache size limit in megabytes
    #[arg(long, env = "GITLAB_DOCS_CACHE_SIZE_MB", default_value_t = DEFAULT_CACHE_SIZE_MB,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub cache_size_mb: u64,

    /// Maximum number of cached pages
    #[arg(long, env = "GITLAB_DOCS_CACHE_ENTRIES", default_value_t = DEFAULT_CACHE_ENTRIES,
          value_parser = parse_positive)]
    pub cache_entries: usize,

    /// Minutes a cached page stays valid after its last access
    #[arg(long, env = "GITLAB_DOCS_CACHE_TTL_MIN", default_value_t = DEFAULT_CACHE_TTL_MINUTES,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub cache_ttl_minutes: u64,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from(DEFAULT_INDEX_PATH),
            min_score: MIN_SEARCH_SCORE,
            cache_size_mb: DEFAULT_CACHE_SIZE_MB,
            cache_entries: DEFAULT_CACHE_ENTRIES,
            cache_ttl_minutes: DEFAULT_CACHE_TTL_MINUTES,
        }
    }
}

impl DocsConfig {
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions::new(self.cache_size_mb, self.cache_entries, self.cache_ttl_minutes)
    }
}

fn parse_min_score(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if (0.0..=SCORE_MAX).contains(&value) {
        Ok(value)
    } else {
        Err(format!("min score must be between 0 and {SCORE_MAX}"))
    }
}

fn parse_positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("value must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("`{s}` is not a positive integer")),
    }
}
