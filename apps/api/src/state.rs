use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::extraction::ExtractionPipeline;
use crate::retrieval::StaticCorpus;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub pipeline: ExtractionPipeline,
    /// Same corpus the pipeline retrieves from; read directly for dashboard counts.
    pub corpus: Arc<StaticCorpus>,
    pub config: Config,
}
