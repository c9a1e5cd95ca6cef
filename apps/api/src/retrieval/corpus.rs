use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::ContextRetriever;

const EMBEDDED_CORPUS: &str = include_str!("../../data/corpus.json");

#[derive(Debug, Deserialize)]
struct CorpusFile {
    courses: Vec<Course>,
    job_samples: Vec<JobSample>,
}

#[derive(Debug, Deserialize)]
struct Course {
    skill: String,
    resource_name: String,
    provider: String,
    url: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct JobSample {
    role: String,
    skills: Vec<String>,
    description: String,
}

type TermVector = BTreeMap<String, f64>;

struct Document {
    line: String,
    terms: TermVector,
    norm: f64,
}

/// In-memory nearest-neighbour lookup over courses and sample job postings.
///
/// Documents are term-frequency vectors; a query returns the `k` documents
/// with the highest cosine similarity, ties broken by corpus order.
pub struct StaticCorpus {
    documents: Vec<Document>,
    course_count: usize,
    job_sample_count: usize,
}

impl StaticCorpus {
    /// Corpus compiled into the binary from `data/corpus.json`.
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_CORPUS)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: CorpusFile =
            serde_json::from_str(json).context("Reference corpus is not valid JSON")?;

        let mut documents = Vec::with_capacity(file.courses.len() + file.job_samples.len());
        for course in &file.courses {
            documents.push(Document::new(
                format!(
                    "Course: {} ({}) for {}: {}",
                    course.resource_name, course.provider, course.skill, course.url
                ),
                &format!(
                    "{} {} {} {}",
                    course.skill, course.skill, course.resource_name, course.description
                ),
            ));
        }
        for sample in &file.job_samples {
            let skills = sample.skills.join(", ");
            documents.push(Document::new(
                format!("Similar role: {}, skills: {}", sample.role, skills),
                &format!("{} {} {} {}", sample.role, sample.role, skills, sample.description),
            ));
        }

        Ok(Self {
            documents,
            course_count: file.courses.len(),
            job_sample_count: file.job_samples.len(),
        })
    }

    pub fn course_count(&self) -> usize {
        self.course_count
    }

    pub fn job_sample_count(&self) -> usize {
        self.job_sample_count
    }

    pub fn search(&self, query: &str, k: usize) -> Vec<String> {
        let query = term_vector(query);
        let query_norm = norm(&query);
        if query_norm == 0.0 || k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f64)> = self
            .documents
            .iter()
            .enumerate()
            .map(|(i, doc)| (i, cosine(&query, query_norm, doc)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        scored
            .into_iter()
            .take(k)
            .map(|(i, _)| self.documents[i].line.clone())
            .collect()
    }
}

#[async_trait]
impl ContextRetriever for StaticCorpus {
    async fn retrieve_context(&self, query: &str, k: usize) -> Result<Vec<String>> {
        Ok(self.search(query, k))
    }
}

impl Document {
    fn new(line: String, text: &str) -> Self {
        let terms = term_vector(text);
        let norm = norm(&terms);
        Self { line, terms, norm }
    }
}

fn term_vector(text: &str) -> TermVector {
    let mut terms = TermVector::new();
    for token in text
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(t))
    {
        *terms.entry(token.to_string()).or_insert(0.0) += 1.0;
    }
    terms
}

fn norm(terms: &TermVector) -> f64 {
    terms.values().map(|v| v * v).sum::<f64>().sqrt()
}

fn cosine(query: &TermVector, query_norm: f64, doc: &Document) -> f64 {
    if doc.norm == 0.0 {
        return 0.0;
    }
    let dot: f64 = query
        .iter()
        .filter_map(|(term, q)| doc.terms.get(term).map(|d| q * d))
        .sum();
    dot / (query_norm * doc.norm)
}

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of",
    "on", "or", "the", "to", "we", "with", "you", "your", "our", "will", "role", "requiring",
];
