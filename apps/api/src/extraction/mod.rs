//! Fallback-aware structured extraction.
//!
//! One pipeline serves every agent. An agent is an [`ExtractionTask`]: a schema,
//! a prompt template, and a deterministic fallback rule. The pipeline makes one
//! generation attempt, coerces the raw text against the schema, and substitutes
//! the fallback on any failure. It never returns an error.

pub mod coercer;
pub mod schema;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::llm_client::{GenerationRequest, LlmClient};
use crate::retrieval::ContextRetriever;
use schema::Schema;

const RAW_EXCERPT_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Generated,
    Fallback,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Generated => "generated",
            Provenance::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutcome<T> {
    pub value: T,
    pub provenance: Provenance,
}

impl<T> ExtractionOutcome<T> {
    pub fn is_fallback(&self) -> bool {
        self.provenance == Provenance::Fallback
    }
}

/// Schema, prompt template and fallback rule for one kind of extraction.
pub trait ExtractionTask: Send + Sync {
    type Input: Send + Sync;
    type Output: DeserializeOwned + Serialize + Send;

    /// Short name used in logs and persisted analysis rows.
    fn kind(&self) -> &'static str;

    fn schema(&self) -> &'static Schema;

    fn system_prompt(&self) -> &'static str;

    fn build_prompt(&self, input: &Self::Input) -> String;

    /// Query for the retrieval collaborator, if this task uses reference material.
    fn retrieval_query(&self, _input: &Self::Input) -> Option<String> {
        None
    }

    /// Deterministic heuristic result. Must always satisfy `schema()`.
    fn fallback(&self, input: &Self::Input) -> Self::Output;
}

#[derive(Clone)]
pub struct ExtractionPipeline {
    llm: LlmClient,
    retriever: Arc<dyn ContextRetriever>,
    top_k: usize,
}

impl ExtractionPipeline {
    pub fn new(llm: LlmClient, retriever: Arc<dyn ContextRetriever>, top_k: usize) -> Self {
        Self {
            llm,
            retriever,
            top_k,
        }
    }

    pub fn llm(&self) -> &LlmClient {
        &self.llm
    }

    /// One generation attempt, then coercion, then fallback on any failure.
    pub async fn extract<T: ExtractionTask>(
        &self,
        task: &T,
        input: &T::Input,
    ) -> ExtractionOutcome<T::Output> {
        let context = match task.retrieval_query(input) {
            Some(query) => self.retrieve(task.kind(), &query).await,
            None => Vec::new(),
        };

        let request = GenerationRequest::new(
            task.system_prompt(),
            task.build_prompt(input),
            task.schema(),
        )
        .with_context(context);

        let raw = match self.llm.generate(&request).await {
            Ok(raw) => raw,
            Err(failure) => {
                warn!(
                    task = task.kind(),
                    kind = %failure.kind,
                    "Generation failed, using fallback: {}",
                    failure.message
                );
                return fallback(task, input);
            }
        };

        match coercer::parse_as::<T::Output>(&raw, task.schema()) {
            Ok(value) => {
                debug!(task = task.kind(), "Structured output accepted");
                ExtractionOutcome {
                    value,
                    provenance: Provenance::Generated,
                }
            }
            Err(e) => {
                let excerpt: String = raw.chars().take(RAW_EXCERPT_CHARS).collect();
                warn!(
                    task = task.kind(),
                    error = %e,
                    raw = %excerpt,
                    "Generated text failed coercion, using fallback"
                );
                fallback(task, input)
            }
        }
    }

    async fn retrieve(&self, task: &str, query: &str) -> Vec<String> {
        match self.retriever.retrieve_context(query, self.top_k).await {
            Ok(lines) => lines,
            Err(e) => {
                warn!(task = task, "Context retrieval failed, continuing without: {e}");
                Vec::new()
            }
        }
    }
}

fn fallback<T: ExtractionTask>(task: &T, input: &T::Input) -> ExtractionOutcome<T::Output> {
    ExtractionOutcome {
        value: task.fallback(input),
        provenance: Provenance::Fallback,
    }
}
