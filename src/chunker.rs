//! Splitting of oversized reference pages into addressable chunks.
//!
//! Only one page of the documentation (the generated GraphQL reference) is
//! large enough to need this. It is cut at known section headings; any
//! section that is still too large, or a page without any headings at all,
//! falls back to fixed-size windows that prefer paragraph boundaries and
//! carry a short overlap from the previous window.
//!
//! All sizes are byte lengths of UTF-8 text. Every cut is moved onto a char
//! boundary.

use std::collections::HashMap;

/// The only page that is ever chunked.
pub const GRAPHQL_REFERENCE_PATH: &str = "api/graphql/reference/_index.md";

/// Headings of the generated GraphQL reference, in declaration order.
pub const GRAPHQL_SECTION_MARKERS: [&str; 7] = [
    "Query type",
    "Mutation type",
    "Object types",
    "Enumeration types",
    "Scalar types",
    "Abstract types",
    "Input types",
];

#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Relative path of the page eligible for chunking.
    pub chunk_path: String,
    /// Pages at or below this length are never chunked.
    pub threshold: usize,
    /// Nominal size of a size-based chunk.
    pub max_chunk_size: usize,
    /// Bytes copied from before a window start into each size-based chunk.
    pub overlap_size: usize,
    /// How far around a window end to look for a paragraph break.
    pub boundary_window: usize,
    /// Lines that start a new chunk when they appear on their own.
    pub section_markers: Vec<String>,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_path: GRAPHQL_REFERENCE_PATH.to_string(),
            threshold: 500_000,
            max_chunk_size: 500_000,
            overlap_size: 1_000,
            boundary_window: 100,
            section_markers: GRAPHQL_SECTION_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// A contiguous slice of a source page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Source path plus a `#fragment`.
    pub path: String,
    pub title: String,
    pub content: String,
    /// 1-based position among the chunks of the same page.
    pub chunk_index: usize,
    pub total_chunks: usize,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentChunker {
    config: ChunkConfig,
}

impl DocumentChunker {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Whether `content` at `path` must be split before indexing.
    pub fn should_chunk(&self, path: &str, content: &str) -> bool {
        path == self.config.chunk_path && content.len() > self.config.threshold
    }

    /// Splits a page into ordered chunks.
    ///
    /// Section markers are located anywhere in `content` and sorted by
    /// offset; each chunk runs from one marker to the next. Text before the
    /// first marker belongs to no chunk.
    pub fn chunk(&self, path: &str, title: &str, content: &str) -> Vec<Chunk> {
        let markers = self.find_markers(content);

        if markers.is_empty() {
            tracing::warn!("No section markers found in {}, using size-based chunking", path);
            let mut chunks: Vec<Chunk> = self
                .split_by_size(content)
                .into_iter()
                .enumerate()
                .map(|(i, piece)| Chunk {
                    path: format!("{}#chunk-{}", path, i + 1),
                    title: format!("{} (Part {})", title, i + 1),
                    content: piece.to_string(),
                    chunk_index: 0,
                    total_chunks: 0,
                })
                .collect();
            number_chunks(&mut chunks);
            return chunks;
        }

        tracing::info!("Found {} sections in {}, creating semantic chunks", markers.len(), path);

        let mut chunks = Vec::new();
        let mut fragments: HashMap<String, usize> = HashMap::new();

        for (i, (start, marker)) in markers.iter().enumerate() {
            let end = markers.get(i + 1).map_or(content.len(), |(next, _)| *next);
            let body = &content[*start..end];
            let fragment = unique_fragment(&mut fragments, sanitize_slug(marker));
            let chunk_path = format!("{}#{}", path, fragment);
            let chunk_title = format!("{} - {}", title, marker);

            // Over 1.5x the nominal size: split this section further.
            if body.len() * 2 > self.config.max_chunk_size * 3 {
                for (n, piece) in self.split_by_size(body).into_iter().enumerate() {
                    chunks.push(Chunk {
                        path: format!("{}-chunk-{}", chunk_path, n + 1),
                        title: format!("{} (Part {})", chunk_title, n + 1),
                        content: piece.to_string(),
                        chunk_index: 0,
                        total_chunks: 0,
                    });
                }
            } else {
                chunks.push(Chunk {
                    path: chunk_path,
                    title: chunk_title,
                    content: body.to_string(),
                    chunk_index: 0,
                    total_chunks: 0,
                });
            }
        }

        number_chunks(&mut chunks);
        chunks
    }

    /// Builds the index page stored in place of a chunked page.
    pub fn create_summary(&self, path: &str, title: &str, chunks: &[Chunk]) -> String {
        let mut lines = vec![
            format!("# {}", title),
            String::new(),
            format!(
                "> **Note:** `{}` has been split into multiple sections for better performance.",
                path
            ),
            String::new(),
            "## Available Sections".to_string(),
            String::new(),
        ];

        lines.extend(chunks.iter().map(|chunk| format!("- [{}]({})", chunk.title, chunk.path)));

        lines.extend(
            [
                "",
                "## About This Reference",
                "",
                "This is the auto-generated GraphQL API reference for GitLab. Each section contains detailed information about:",
                "",
                "- **Query types**: Top-level entry points for read operations",
                "- **Mutation types**: Entry points for write operations",
                "- **Object types**: Resource representations in the API",
                "- **Enumeration types**: Predefined value sets",
                "- **Scalar types**: Basic data types",
                "- **Abstract types**: Unions and interfaces",
                "- **Input types**: Arguments for mutations and queries",
                "",
                "Use the interactive GraphQL explorer to test queries, or generate a machine-readable schema in IDL or JSON formats.",
            ]
            .iter()
            .map(|line| line.to_string()),
        );

        lines.join("\n")
    }

    /// Offsets of every line that is exactly one of the markers once trimmed,
    /// sorted ascending.
    fn find_markers<'a>(&'a self, content: &str) -> Vec<(usize, &'a str)> {
        let lines = line_spans(content);
        let mut found = Vec::new();

        for marker in &self.config.section_markers {
            for (offset, line) in &lines {
                if line.trim() == marker.as_str() {
                    found.push((*offset, marker.as_str()));
                }
            }
        }

        found.sort_by_key(|(offset, _)| *offset);
        found
    }

    fn split_by_size<'c>(&self, content: &'c str) -> Vec<&'c str> {
        let max = self.config.max_chunk_size.max(1);
        let window = self.config.boundary_window;
        let len = content.len();
        let mut pieces = Vec::new();
        let mut position = 0;

        while position < len {
            let mut end = floor_char_boundary(content, (position + max).min(len));
            if end <= position {
                end = ceil_char_boundary(content, position + 1);
            }

            let mut chunk_end = end;
            if end < len {
                let from = floor_char_boundary(content, end.saturating_sub(window));
                let to = ceil_char_boundary(content, (end + window + 1).min(len));
                if let Some(found) = content[from..to].find("\n\n") {
                    let candidate = from + found;
                    if candidate > position && candidate < end + window {
                        chunk_end = candidate;
                    }
                }
            }

            let start = floor_char_boundary(content, position.saturating_sub(self.config.overlap_size));
            pieces.push(&content[start..chunk_end]);
            position = chunk_end;
        }

        pieces
    }
}

/// Turns a marker into a path fragment: lower-case, whitespace runs become
/// `-`, anything outside `[a-z0-9-]` is dropped.
pub fn sanitize_slug(marker: &str) -> String {
    marker
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// Second pass: indices and totals are only known once every chunk exists.
fn number_chunks(chunks: &mut [Chunk]) {
    let total = chunks.len();
    for (i, chunk) in chunks.iter_mut().enumerate() {
        chunk.chunk_index = i + 1;
        chunk.total_chunks = total;
    }
}

fn unique_fragment(seen: &mut HashMap<String, usize>, slug: String) -> String {
    let slug = if slug.is_empty() { "section".to_string() } else { slug };
    let count = seen.entry(slug.clone()).or_insert(0);
    *count += 1;
    if *count == 1 { slug } else { format!("{}-{}", slug, count) }
}

fn line_spans(content: &str) -> Vec<(usize, &str)> {
    let mut offset = 0;
    content
        .split_inclusive('\n')
        .map(|line| {
            let span = (offset, line);
            offset += line.len();
            span
        })
        .collect()
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(s: &str, mut index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(index) {
        index += 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(max_chunk_size: usize, overlap_size: usize, boundary_window: usize) -> ChunkConfig {
        ChunkConfig {
            max_chunk_size,
            overlap_size,
            boundary_window,
            ..ChunkConfig::default()
        }
    }

    fn assert_numbering(chunks: &[Chunk]) {
        let total = chunks.len();
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i + 1);
            assert_eq!(chunk.total_chunks, total);
        }
    }

    #[test]
    fn test_should_chunk_large_graphql_reference() {
        let chunker = DocumentChunker::default();
        assert!(chunker.should_chunk(GRAPHQL_REFERENCE_PATH, &"x".repeat(600_000)));
    }

    #[test]
    fn test_should_not_chunk_small_graphql_reference() {
        let chunker = DocumentChunker::default();
        assert!(!chunker.should_chunk(GRAPHQL_REFERENCE_PATH, &"x".repeat(100_000)));
        assert!(!chunker.should_chunk(GRAPHQL_REFERENCE_PATH, &"x".repeat(500_000)));
    }

    #[test]
    fn test_should_not_chunk_other_large_pages() {
        let chunker = DocumentChunker::default();
        assert!(!chunker.should_chunk("some/other/doc.md", &"x".repeat(600_000)));
    }

    #[test]
    fn test_chunk_by_section_markers() {
        let content = "Query type\nA.\n\nMutation type\nB.\n\nObject types\nC.";
        let chunks = DocumentChunker::default().chunk(GRAPHQL_REFERENCE_PATH, "GraphQL Reference", content);

        let titles: Vec<&str> = chunks.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "GraphQL Reference - Query type",
                "GraphQL Reference - Mutation type",
                "GraphQL Reference - Object types",
            ]
        );
        assert_eq!(chunks[0].path, "api/graphql/reference/_index.md#query-type");
        assert_eq!(chunks[2].path, "api/graphql/reference/_index.md#object-types");
        assert_eq!(chunks[0].content, "Query type\nA.\n\n");
        assert_eq!(chunks[2].content, "Object types\nC.");
        assert!(chunks.iter().all(|c| c.total_chunks == 3));
        assert_numbering(&chunks);
    }

    #[test]
    fn test_markers_ordered_by_position_not_declaration() {
        let content = "Input types\none\nScalar types\ntwo\nQuery type\nthree\n";
        let chunks = DocumentChunker::default().chunk("p.md", "T", content);

        let titles: Vec<&str> = chunks.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["T - Input types", "T - Scalar types", "T - Query type"]);
        assert_numbering(&chunks);
    }

    #[test]
    fn test_marker_must_be_whole_line() {
        let content = "The Query type is special.\nQuery type  \nbody\n";
        let chunks = DocumentChunker::default().chunk("p.md", "T", content);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Query type  \nbody\n");
    }

    #[test]
    fn test_repeated_markers_get_unique_paths() {
        let content = "Object types\na\nObject types\nb\n";
        let chunks = DocumentChunker::default().chunk("p.md", "T", content);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].path, "p.md#object-types");
        assert_eq!(chunks[1].path, "p.md#object-types-2");
    }

    #[test]
    fn test_size_fallback_without_markers() {
        let content = "x".repeat(600_000);
        let chunks = DocumentChunker::default().chunk("some/doc.md", "Some Document", &content);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].title, "Some Document (Part 1)");
        assert_eq!(chunks[1].title, "Some Document (Part 2)");
        assert_eq!(chunks[0].path, "some/doc.md#chunk-1");
        assert_eq!(chunks[0].content.len(), 500_000);
        // Second chunk starts 1,000 bytes early.
        assert_eq!(chunks[1].content.len(), 101_000);
        assert_numbering(&chunks);
    }

    #[test]
    fn test_size_fallback_snaps_to_paragraphs() {
        let chunker = DocumentChunker::new(small_config(10, 0, 4));
        let content = "aaaaaaaa\n\nbbbbbbbb\n\ncc";
        let chunks = chunker.chunk("p.md", "T", content);

        assert_eq!(chunks[0].content, "aaaaaaaa");
        let joined: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(joined, content);
        assert_numbering(&chunks);
    }

    #[test]
    fn test_size_fallback_respects_char_boundaries() {
        let chunker = DocumentChunker::new(small_config(7, 3, 2));
        let content = "ééééééééééééééé";
        let chunks = chunker.chunk("p.md", "T", content);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| !c.content.is_empty()));
    }

    #[test]
    fn test_oversized_section_is_split_in_place() {
        let chunker = DocumentChunker::new(small_config(20, 0, 5));
        let content = format!("Query type\n{}\nMutation type\nshort\n", "word ".repeat(20));
        let chunks = chunker.chunk("p.md", "T", &content);

        assert!(chunks.len() > 2);
        assert_eq!(chunks[0].path, "p.md#query-type-chunk-1");
        assert_eq!(chunks[0].title, "T - Query type (Part 1)");
        let last = chunks.last().unwrap();
        assert_eq!(last.path, "p.md#mutation-type");
        assert_eq!(last.content, "Mutation type\nshort\n");
        assert_numbering(&chunks);
    }

    #[test]
    fn test_sanitize_slug() {
        assert_eq!(sanitize_slug("Query type"), "query-type");
        assert_eq!(sanitize_slug("  Abstract   types! "), "abstract-types");
        assert_eq!(sanitize_slug("Émoji ✓ types"), "moji--types");
    }

    #[test]
    fn test_sanitize_slug_is_idempotent() {
        for marker in GRAPHQL_SECTION_MARKERS.iter().chain(["Weird  (Case) 42", "a-b c"].iter()) {
            let once = sanitize_slug(marker);
            assert_eq!(sanitize_slug(&once), once);
        }
    }

    #[test]
    fn test_create_summary_links_every_chunk() {
        let chunker = DocumentChunker::default();
        let chunks = chunker.chunk(
            GRAPHQL_REFERENCE_PATH,
            "GraphQL Reference",
            "Query type\nContent here.\n\nMutation type\nMore content.",
        );

        let summary = chunker.create_summary(GRAPHQL_REFERENCE_PATH, "GraphQL Reference", &chunks);

        assert!(summary.starts_with("# GraphQL Reference"));
        assert!(summary.contains("split into multiple sections"));
        assert!(summary.contains(
            "[GraphQL Reference - Query type](api/graphql/reference/_index.md#query-type)"
        ));
        assert!(summary.contains(
            "[GraphQL Reference - Mutation type](api/graphql/reference/_index.md#mutation-type)"
        ));
        assert!(summary.contains("About This Reference"));
    }
}
