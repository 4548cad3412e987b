//! Markdown handling for the index build and page-fetch paths.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::models::Metadata;

static FRONT_MATTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A---[ \t]*\r?\n((?s).*?)\r?\n---[ \t]*(?:\r?\n|\z)").unwrap());
static HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]+").unwrap());
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*(.+?)\*").unwrap());
static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(.+?)\]\(.+?\)").unwrap());
static CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`{1,3}(.+?)`{1,3}").unwrap());
static LIST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*[-*+][ \t]+").unwrap());
static TITLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#[ \t]+(.+)$").unwrap());
static BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^([ \t]*)[*+]([ \t]+)").unwrap());
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Front matter split off a markdown file.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontMatter {
    pub data: Metadata,
    pub content: String,
}

impl FrontMatter {
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str).filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MarkdownNormalizer;

impl MarkdownNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Separates a leading `---` block of `key: value` lines from the body.
    ///
    /// Only flat string values are understood; everything after the first
    /// colon is the value.
    pub fn extract_front_matter(&self, content: &str) -> FrontMatter {
        let Some(captures) = FRONT_MATTER.captures(content) else {
            return FrontMatter {
                data: Metadata::new(),
                content: content.to_string(),
            };
        };

        let mut data = Metadata::new();
        for line in captures[1].lines() {
            if let Some((key, value)) = line.split_once(':') {
                let key = key.trim();
                if !key.is_empty() {
                    data.insert(key.to_string(), Value::String(value.trim().to_string()));
                }
            }
        }

        let body_start = captures.get(0).map_or(0, |m| m.end());
        FrontMatter {
            data,
            content: content[body_start..].to_string(),
        }
    }

    /// Plain text used for indexing and scoring.
    pub fn strip_markdown(&self, content: &str) -> String {
        let text = HEADER.replace_all(content, "");
        let text = BOLD.replace_all(&text, "$1");
        let text = ITALIC.replace_all(&text, "$1");
        let text = LINK.replace_all(&text, "$1");
        let text = CODE.replace_all(&text, "$1");
        let text = LIST.replace_all(&text, "");
        text.trim().to_string()
    }

    /// Text of the first level-one heading.
    pub fn extract_title(&self, markdown: &str) -> Option<String> {
        TITLE
            .captures(markdown)
            .map(|c| c[1].trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Normalizes page content for display.
    ///
    /// Yields to the runtime first so a long page does not hold up other
    /// work queued on the same task.
    pub async fn render(&self, content: &str) -> String {
        tokio::task::yield_now().await;

        let text = BULLET.replace_all(content, "$1-$2");
        let trimmed: Vec<&str> = text.lines().map(str::trim_end).collect();
        let joined = trimmed.join("\n");
        let mut rendered = BLANK_RUN.replace_all(joined.trim(), "\n\n").into_owned();
        rendered.push('\n');
        rendered
    }
}
