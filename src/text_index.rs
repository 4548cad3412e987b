//! Full-text candidate lookup.
//!
//! [`FullTextIndex`] is the narrow capability the search layer needs from a
//! text engine: add, update and remove documents of a fixed shape, and return
//! candidate ids per field for a query. Ranking beyond field order is left to
//! [`crate::scoring`].
//!
//! [`TantivyTextIndex`] is the live engine: an in-memory tantivy index with
//! one text field per searchable field, queried per field with prefix terms.

use std::collections::HashSet;
use std::fmt;

use itertools::Itertools;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, FuzzyTermQuery, Query};
use tantivy::schema::{IndexRecordOption, STORED, STRING, Schema, TextFieldIndexing, TextOptions, Value};
use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer, TokenStream};
use tantivy::{Index, IndexReader, IndexWriter, TantivyDocument, Term, doc};

use crate::error::Result;
use crate::models::Document;

const TOKENIZER: &str = "docs_words";
const WRITER_MEMORY_BYTES: usize = 50_000_000;

/// Fields of the index, heaviest first (title 3, section 2, content 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Section,
    Content,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Title, Field::Section, Field::Content];

    pub fn name(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Section => "section",
            Field::Content => "content",
        }
    }
}

/// The shape every indexed document is reduced to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedFields {
    pub id: String,
    pub path: String,
    pub title: String,
    pub section: String,
    pub content: String,
}

impl From<&Document> for IndexedFields {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            path: doc.path.clone(),
            title: doc.title.clone(),
            section: doc.section.clone(),
            content: doc.content.clone(),
        }
    }
}

/// Candidate ids matched in one field, best first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldHits {
    pub field: Field,
    pub ids: Vec<String>,
}

pub trait FullTextIndex: Send + Sync {
    /// Indexes a document. An existing document with the same id is replaced.
    /// The change is visible to `search` after the next `commit`.
    fn add(&mut self, doc: IndexedFields) -> Result<()>;
    fn update(&mut self, doc: IndexedFields) -> Result<()>;
    /// Returns whether a document was removed.
    fn remove(&mut self, id: &str) -> Result<bool>;
    /// Publishes pending changes to searchers.
    fn commit(&mut self) -> Result<()> {
        Ok(())
    }
    /// Hits per field, heaviest field first. Fields without hits are omitted.
    fn search(&self, query: &str) -> Result<Vec<FieldHits>>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Shorter query words are ignored.
    pub min_token_length: usize,
    /// Maximum number of ids returned per field.
    pub candidate_limit: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            min_token_length: 2,
            candidate_limit: 100,
        }
    }
}

#[derive(Clone, Copy)]
struct SchemaFields {
    id: tantivy::schema::Field,
    path: tantivy::schema::Field,
    title: tantivy::schema::Field,
    section: tantivy::schema::Field,
    content: tantivy::schema::Field,
}

impl SchemaFields {
    fn text(&self, field: Field) -> tantivy::schema::Field {
        match field {
            Field::Title => self.title,
            Field::Section => self.section,
            Field::Content => self.content,
        }
    }
}

fn build_schema() -> (Schema, SchemaFields) {
    let mut builder = Schema::builder();
    let indexing = TextFieldIndexing::default()
        .set_tokenizer(TOKENIZER)
        .set_index_option(IndexRecordOption::Basic);
    let text = TextOptions::default().set_indexing_options(indexing);

    let fields = SchemaFields {
        id: builder.add_text_field("id", STRING | STORED),
        path: builder.add_text_field("path", STRING | STORED),
        title: builder.add_text_field(Field::Title.name(), text.clone()),
        section: builder.add_text_field(Field::Section.name(), text.clone()),
        content: builder.add_text_field(Field::Content.name(), text),
    };
    (builder.build(), fields)
}

fn word_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(64))
        .filter(LowerCaser)
        .build()
}

/// In-memory tantivy index. Words are lower-cased on both sides and every
/// query word matches as a prefix, so `run` finds `runners`. A document
/// matches a field when every query word matches in that field.
pub struct TantivyTextIndex {
    options: IndexOptions,
    writer: IndexWriter,
    reader: IndexReader,
    fields: SchemaFields,
    analyzer: TextAnalyzer,
    ids: HashSet<String>,
}

impl fmt::Debug for TantivyTextIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TantivyTextIndex")
            .field("options", &self.options)
            .field("documents", &self.ids.len())
            .finish_non_exhaustive()
    }
}

impl TantivyTextIndex {
    pub fn new() -> Result<Self> {
        Self::with_options(IndexOptions::default())
    }

    pub fn with_options(options: IndexOptions) -> Result<Self> {
        let (schema, fields) = build_schema();
        let index = Index::create_in_ram(schema);
        index.tokenizers().register(TOKENIZER, word_analyzer());

        let writer: IndexWriter = index.writer_with_num_threads(1, WRITER_MEMORY_BYTES)?;
        let reader = index.reader()?;

        Ok(Self {
            options,
            writer,
            reader,
            fields,
            analyzer: word_analyzer(),
            ids: HashSet::new(),
        })
    }

    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    fn query_terms(&self, query: &str) -> Vec<String> {
        let mut analyzer = self.analyzer.clone();
        let mut stream = analyzer.token_stream(query);
        let mut terms = Vec::new();
        while stream.advance() {
            terms.push(stream.token().text.clone());
        }

        terms
            .into_iter()
            .filter(|term| term.chars().count() >= self.options.min_token_length)
            .unique()
            .collect()
    }

    fn search_field(&self, field: Field, terms: &[String]) -> Result<Vec<String>> {
        let target = self.fields.text(field);
        let clauses: Vec<Box<dyn Query>> = terms
            .iter()
            .map(|term| {
                Box::new(FuzzyTermQuery::new_prefix(Term::from_field_text(target, term), 0, true))
                    as Box<dyn Query>
            })
            .collect();
        let query = BooleanQuery::intersection(clauses);

        let searcher = self.reader.searcher();
        let top_docs = searcher.search(&query, &TopDocs::with_limit(self.options.candidate_limit))?;

        let mut ids = Vec::with_capacity(top_docs.len());
        for (_score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address)?;
            if let Some(id) = doc.get_first(self.fields.id).and_then(|v| v.as_str()) {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }
}

impl FullTextIndex for TantivyTextIndex {
    fn add(&mut self, doc: IndexedFields) -> Result<()> {
        let IndexedFields {
            id,
            path,
            title,
            section,
            content,
        } = doc;
        if self.ids.contains(&id) {
            self.writer.delete_term(Term::from_field_text(self.fields.id, &id));
        }

        self.writer.add_document(doc!(
            self.fields.id => id.clone(),
            self.fields.path => path,
            self.fields.title => title,
            self.fields.section => section,
            self.fields.content => content,
        ))?;
        self.ids.insert(id);
        Ok(())
    }

    fn update(&mut self, doc: IndexedFields) -> Result<()> {
        self.add(doc)
    }

    fn remove(&mut self, id: &str) -> Result<bool> {
        if !self.ids.remove(id) {
            return Ok(false);
        }
        self.writer.delete_term(Term::from_field_text(self.fields.id, id));
        Ok(true)
    }

    fn commit(&mut self) -> Result<()> {
        self.writer.commit()?;
        self.reader.reload()?;
        tracing::debug!("Committed full-text index with {} documents", self.ids.len());
        Ok(())
    }

    fn search(&self, query: &str) -> Result<Vec<FieldHits>> {
        let terms = self.query_terms(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits = Vec::new();
        for field in Field::ALL {
            let ids = self.search_field(field, &terms)?;
            if !ids.is_empty() {
                hits.push(FieldHits { field, ids });
            }
        }
        Ok(hits)
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}
