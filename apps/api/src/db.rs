use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::extraction::Provenance;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Creates the `analyses` table if it does not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analyses (
            id          UUID PRIMARY KEY,
            kind        TEXT NOT NULL,
            provenance  TEXT NOT NULL,
            input       JSONB NOT NULL,
            output      JSONB NOT NULL,
            created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS analyses_kind_idx ON analyses (kind, provenance)")
        .execute(pool)
        .await?;

    info!("Database schema ready");
    Ok(())
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AnalysisRow {
    pub id: Uuid,
    pub kind: String,
    pub provenance: String,
    pub input: serde_json::Value,
    pub output: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AnalysisCount {
    pub kind: String,
    pub provenance: String,
    pub count: i64,
}

/// Stores one extraction outcome and returns its id.
pub async fn record_analysis(
    pool: &PgPool,
    kind: &str,
    provenance: Provenance,
    input: &serde_json::Value,
    output: &serde_json::Value,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO analyses (id, kind, provenance, input, output, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(id)
    .bind(kind)
    .bind(provenance.as_str())
    .bind(input)
    .bind(output)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn get_analysis(pool: &PgPool, id: Uuid) -> Result<Option<AnalysisRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM analyses WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Row counts grouped by kind and provenance, ordered by kind.
pub async fn analysis_counts(pool: &PgPool) -> Result<Vec<AnalysisCount>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT kind, provenance, COUNT(*) AS count
        FROM analyses
        GROUP BY kind, provenance
        ORDER BY kind, provenance
        "#,
    )
    .fetch_all(pool)
    .await
}
