//! Document retrieval fallback
//!
//! Answers finance questions that did not parse into a calculation, using
//! CSV-derived context chunks and the LLM router.

use crate::llm::LlmRouter;
use crate::Result;
use async_trait::async_trait;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_CHUNK_ROWS: usize = 12;

const CHUNK_PREFIX: &str = "Financial data from a CSV:";

pub const SYSTEM_PROMPT: &str = "You are Momentum AI, a helpful and friendly assistant.\n\
Your goal is to provide accurate, conversational, and engaging answers to a wide range of questions.\n\
If a question is unclear, ask for clarification.\n\
If you don't know the answer to a question, say so honestly.\n\
You can also assist with financial calculations and provide comprehensive, easy-to-understand explanations of the results.";

/// Retrieval collaborator used when extraction fails on a finance question
#[async_trait]
pub trait DocumentAnswerer: Send + Sync {
    async fn answer_from_documents(&self, question: &str) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub content: String,
    /// Zero-based index of the first data row in this chunk
    pub start_row: usize,
}

/// In-memory document set, immutable after load
#[derive(Debug, Default, Clone)]
pub struct DocumentContext {
    documents: Vec<Document>,
}

impl DocumentContext {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load and chunk a CSV file. A missing file yields an empty context.
    pub fn from_csv(path: impl AsRef<Path>, chunk_rows: usize) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "Document CSV not found, retrieval context is empty");
            return Ok(Self::empty());
        }

        let file = std::fs::File::open(path)?;
        let context = Self::from_reader(file, chunk_rows)?;

        info!(
            path = %path.display(),
            chunks = context.len(),
            "Loaded retrieval documents"
        );

        Ok(context)
    }

    /// Split CSV data into chunks of `chunk_rows` rows, each rendered as a
    /// table that repeats the header.
    pub fn from_reader<R: Read>(reader: R, chunk_rows: usize) -> Result<Self> {
        let chunk_rows = chunk_rows.max(1);
        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let header: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            rows.push(record?.iter().map(str::to_string).collect::<Vec<_>>());
        }

        let documents = rows
            .chunks(chunk_rows)
            .enumerate()
            .map(|(i, chunk)| Document {
                content: format!("{}\n{}", CHUNK_PREFIX, render_table(&header, chunk)),
                start_row: i * chunk_rows,
            })
            .collect();

        Ok(Self { documents })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Single best chunk by case-insensitive term overlap; ties keep the
    /// earlier chunk. `None` when nothing overlaps.
    pub fn best_match(&self, question: &str) -> Option<&Document> {
        let terms = query_terms(question);
        if terms.is_empty() {
            return None;
        }

        let mut best: Option<(&Document, usize)> = None;
        for doc in &self.documents {
            let lowered = doc.content.to_lowercase();
            let score = terms.iter().filter(|t| lowered.contains(t.as_str())).count();
            if score > 0 && best.map_or(true, |(_, s)| score > s) {
                best = Some((doc, score));
            }
        }

        best.map(|(doc, _)| doc)
    }
}

fn query_terms(question: &str) -> Vec<String> {
    let mut terms: Vec<String> = question
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 3)
        .map(str::to_string)
        .collect();
    terms.sort();
    terms.dedup();
    terms
}

fn render_table(header: &[String], rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).chain([header.len()]).max().unwrap_or(0);

    let cell = |row: &[String], i: usize| row.get(i).map(String::as_str).unwrap_or("").to_string();

    let widths: Vec<usize> = (0..columns)
        .map(|i| {
            rows.iter()
                .map(|r| cell(r.as_slice(), i).len())
                .chain([cell(header, i).len()])
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |row: &[String]| {
        (0..columns)
            .map(|i| format!("{:>width$}", cell(row, i), width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ")
    };

    std::iter::once(line(header))
        .chain(rows.iter().map(|r| line(r.as_slice())))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_retrieval_prompt(context: &str, question: &str) -> String {
    format!(
        "{}\n\nContext: {}\n\nQuestion: {}\n\nAnswer:",
        SYSTEM_PROMPT,
        context,
        question.trim()
    )
}

pub struct RetrievalAnswerer {
    router: Arc<LlmRouter>,
    context: Arc<DocumentContext>,
}

impl RetrievalAnswerer {
    pub fn new(router: Arc<LlmRouter>, context: Arc<DocumentContext>) -> Self {
        Self { router, context }
    }
}

#[async_trait]
impl DocumentAnswerer for RetrievalAnswerer {
    async fn answer_from_documents(&self, question: &str) -> Result<String> {
        let context = match self.context.best_match(question) {
            Some(doc) => {
                debug!(start_row = doc.start_row, "Retrieved context chunk");
                doc.content.as_str()
            }
            None => {
                debug!("No matching context chunk");
                ""
            }
        };

        self.router
            .invoke(&build_retrieval_prompt(context, question))
            .await
    }
}
