//! Section listing of the loaded corpus.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::models::{DocSection, Document};

/// Section listing derived from the loaded corpus.
#[derive(Debug, Clone, Default)]
pub struct DocumentTree {
    sections: BTreeMap<String, DocSection>,
}

impl DocumentTree {
    /// Groups document paths by section. A path with more than two segments
    /// contributes its second segment as a subsection.
    pub fn from_documents<'a>(documents: impl IntoIterator<Item = &'a Document>) -> Self {
        let mut paths: BTreeMap<&str, HashSet<&str>> = BTreeMap::new();
        for doc in documents {
            paths.entry(doc.section.as_str()).or_default().insert(doc.path.as_str());
        }

        let sections: BTreeMap<String, DocSection> = paths
            .into_iter()
            .map(|(section, paths)| {
                let subsections: BTreeSet<String> = paths
                    .iter()
                    .filter_map(|path| {
                        let parts: Vec<&str> = path.split('/').collect();
                        (parts.len() > 2).then(|| parts[1].to_string())
                    })
                    .collect();

                let entry = DocSection {
                    name: section.to_string(),
                    path: section.to_string(),
                    page_count: paths.len(),
                    subsections: (!subsections.is_empty()).then(|| subsections.into_iter().collect()),
                };
                (section.to_string(), entry)
            })
            .collect();

        tracing::info!("Built document tree: {} sections", sections.len());
        Self { sections }
    }

    /// All sections sorted by name.
    pub fn sections(&self) -> Vec<DocSection> {
        self.sections.values().cloned().collect()
    }

    pub fn section(&self, name: &str) -> Option<&DocSection> {
        self.sections.get(name)
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn doc(path: &str) -> Document {
        Document {
            id: path.to_string(),
            path: path.to_string(),
            title: path.to_string(),
            section: path.split('/').next().unwrap_or_default().to_string(),
            content: String::new(),
            version: "latest".to_string(),
            last_updated: Utc::now(),
            metadata: Default::default(),
        }
    }

    #[test]
    fn test_groups_by_section() {
        let docs: Vec<Document> = [
            "ci/pipelines/_index.md",
            "ci/runners/_index.md",
            "ci/runners/configure.md",
            "ci/_index.md",
            "api/users.md",
        ]
        .into_iter()
        .map(doc)
        .collect();

        let tree = DocumentTree::from_documents(&docs);

        assert_eq!(tree.section_count(), 2);
        let names: Vec<String> = tree.sections().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["api", "ci"]);

        let ci = tree.section("ci").unwrap();
        assert_eq!(ci.page_count, 4);
        assert_eq!(ci.subsections, Some(vec!["pipelines".to_string(), "runners".to_string()]));

        let api = tree.section("api").unwrap();
        assert_eq!(api.page_count, 1);
        assert_eq!(api.subsections, None);
        assert!(tree.section("user").is_none());
    }

    #[test]
    fn test_empty_corpus() {
        let tree = DocumentTree::from_documents(&Vec::<Document>::new());
        assert_eq!(tree.section_count(), 0);
        assert!(tree.sections().is_empty());
    }
}
