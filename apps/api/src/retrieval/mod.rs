//! Reference-material lookup used to enrich prompts.
//!
//! Retrieved lines are opaque text appended to a prompt. The extraction core
//! never validates them and treats a retrieval error as "no context".

mod corpus;

pub use corpus::StaticCorpus;

use async_trait::async_trait;

#[async_trait]
pub trait ContextRetriever: Send + Sync {
    /// Up to `k` lines of reference material relevant to `query`.
    async fn retrieve_context(&self, query: &str, k: usize) -> anyhow::Result<Vec<String>>;
}
