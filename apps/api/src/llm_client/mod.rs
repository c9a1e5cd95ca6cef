/// LLM Client: the single point of entry for all text-generation calls.
///
/// ARCHITECTURAL RULE: No other module may call the generation backend directly.
/// All generation goes through `LlmClient::generate`, which owns model selection,
/// the per-call timeout, and failure classification.
///
/// Every error path yields a typed `GenerationFailure`; nothing here retries inline.
/// Recovering from failure is the extraction pipeline's job.
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::extraction::schema::Schema;

pub mod backend;
pub mod prompts;
pub mod registry;
#[cfg(test)]
pub mod testing;

pub use backend::{GenerationBackend, GeminiBackend};
pub use registry::ModelRegistry;

/// Classified reason a generation call produced no text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Invalid or missing credentials. Not worth retrying.
    Auth,
    QuotaExceeded,
    Timeout,
    NoModelAvailable,
    /// Backend answered, but with no usable text.
    MalformedResponse,
    /// The selected model is gone or rejected the request as invalid.
    ModelUnavailable,
    ContentBlocked,
    /// Transport failure or backend 5xx.
    Network,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Auth => "auth",
            FailureKind::QuotaExceeded => "quota_exceeded",
            FailureKind::Timeout => "timeout",
            FailureKind::NoModelAvailable => "no_model_available",
            FailureKind::MalformedResponse => "malformed_response",
            FailureKind::ModelUnavailable => "model_unavailable",
            FailureKind::ContentBlocked => "content_blocked",
            FailureKind::Network => "network",
        }
    }

    /// Failures tied to the selected model. These clear the cached selection
    /// so the next call rediscovers.
    pub fn is_model_specific(&self) -> bool {
        matches!(
            self,
            FailureKind::ModelUnavailable | FailureKind::QuotaExceeded
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct GenerationFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl GenerationFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Raw generator text, or the classified reason there is none.
pub type GenerationResult = Result<String, GenerationFailure>;

/// One prompt bound to the schema its answer must satisfy.
/// Built once per extraction and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    system: &'static str,
    prompt: String,
    schema: &'static Schema,
    context: Vec<String>,
}

impl GenerationRequest {
    pub fn new(system: &'static str, prompt: String, schema: &'static Schema) -> Self {
        Self {
            system,
            prompt,
            schema,
            context: Vec::new(),
        }
    }

    /// Attaches retrieved reference material, appended verbatim to the prompt.
    pub fn with_context(self, context: Vec<String>) -> Self {
        Self { context, ..self }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// The full text sent to the backend.
    pub fn render(&self) -> String {
        let mut text = format!("{}\n\n{}", self.system, self.prompt);

        if !self.context.is_empty() {
            text.push_str("\n\nReference material:\n");
            for line in &self.context {
                text.push_str("- ");
                text.push_str(line);
                text.push('\n');
            }
        }

        let required: Vec<&str> = self.schema.required_fields().collect();
        text.push_str("\n\n");
        text.push_str(prompts::JSON_ONLY_INSTRUCTION);
        text.push_str(&format!(
            "\nRequired top-level fields: {}.",
            required.join(", ")
        ));
        text
    }
}

/// The single generation client. Cheap to clone; clones share the backend and
/// the process-wide model registry.
#[derive(Clone)]
pub struct LlmClient {
    backend: Arc<dyn GenerationBackend>,
    registry: Arc<ModelRegistry>,
    generation_timeout: Duration,
}

impl LlmClient {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        registry: Arc<ModelRegistry>,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            registry,
            generation_timeout,
        }
    }

    /// Currently cached model, if discovery has run and not been invalidated.
    pub fn selected_model(&self) -> Option<String> {
        self.registry.selected()
    }

    /// Issues one generation call against the selected model.
    ///
    /// A model-specific failure invalidates the cached selection and is returned
    /// as-is; the next call pays for rediscovery.
    pub async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        let model = self.registry.resolve(&self.backend).await?;
        let prompt = request.render();

        let result = match tokio::time::timeout(
            self.generation_timeout,
            self.backend
                .generate_text(&model, &prompt, self.generation_timeout),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(GenerationFailure::new(
                FailureKind::Timeout,
                format!(
                    "{model} did not answer within {}s",
                    self.generation_timeout.as_secs()
                ),
            )),
        };

        match result {
            Ok(text) if text.trim().is_empty() => Err(GenerationFailure::new(
                FailureKind::MalformedResponse,
                format!("{model} returned empty text"),
            )),
            Ok(text) => {
                debug!(
                    model = %model,
                    schema = request.schema().name,
                    chars = text.len(),
                    "Generation succeeded"
                );
                Ok(text)
            }
            Err(failure) => {
                if failure.kind.is_model_specific() {
                    warn!(model = %model, kind = %failure.kind, "Invalidating selected model");
                    self.registry.invalidate(&model);
                }
                Err(failure)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{client_for, ScriptedBackend};
    use super::*;
    use crate::extraction::schema::{Field, FieldType};

    const SCHEMA: Schema = Schema {
        name: "RoleSummary",
        fields: &[
            Field::required("role", FieldType::Text),
            Field::optional("notes", FieldType::Text),
        ],
    };

    fn request() -> GenerationRequest {
        GenerationRequest::new("You are terse.", "Say hi.".to_string(), &SCHEMA)
    }

    #[test]
    fn test_render_includes_system_prompt_context_and_required_fields() {
        let rendered = request()
            .with_context(vec!["Course: SQL Basics".to_string()])
            .render();
        assert!(rendered.starts_with("You are terse.\n\nSay hi."));
        assert!(rendered.contains("Reference material:\n- Course: SQL Basics"));
        assert!(rendered.contains("Required top-level fields: role."));
    }

    #[test]
    fn test_render_without_context_has_no_reference_block() {
        assert!(!request().render().contains("Reference material"));
    }

    #[test]
    fn test_model_specific_kinds() {
        assert!(FailureKind::ModelUnavailable.is_model_specific());
        assert!(FailureKind::QuotaExceeded.is_model_specific());
        assert!(!FailureKind::Timeout.is_model_specific());
        assert!(!FailureKind::Auth.is_model_specific());
    }

    #[tokio::test]
    async fn test_generate_returns_text_and_caches_model() {
        let backend = Arc::new(ScriptedBackend::replying("{\"role\": \"x\"}"));
        let client = client_for(backend.clone());

        let first = client.generate(&request()).await.unwrap();
        let second = client.generate(&request()).await.unwrap();

        assert_eq!(first, "{\"role\": \"x\"}");
        assert_eq!(second, first);
        assert_eq!(backend.discovery_calls(), 1);
        assert_eq!(client.selected_model().as_deref(), Some("gemini-1.5-flash"));
    }

    #[tokio::test]
    async fn test_prompt_sent_to_backend_is_rendered_request() {
        let backend = Arc::new(ScriptedBackend::replying("{}"));
        let client = client_for(backend.clone());

        client.generate(&request()).await.unwrap();

        assert_eq!(backend.last_prompt(), Some(request().render()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_backend_times_out() {
        let backend = Arc::new(
            ScriptedBackend::replying("{}").with_generation_delay(Duration::from_secs(60)),
        );
        let client = client_for(backend.clone());

        let failure = client.generate(&request()).await.unwrap_err();

        assert_eq!(failure.kind, FailureKind::Timeout);
        // Timeouts are not model-specific; the selection survives.
        assert!(client.selected_model().is_some());
    }

    #[tokio::test]
    async fn test_blank_text_is_malformed() {
        let backend = Arc::new(ScriptedBackend::replying("   \n"));
        let client = client_for(backend);

        let failure = client.generate(&request()).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_model_failure_clears_selection_without_inline_retry() {
        let backend = Arc::new(
            ScriptedBackend::replying("{}")
                .then(Err(GenerationFailure::new(FailureKind::ModelUnavailable, "gone"))),
        );
        let client = client_for(backend.clone());

        let failure = client.generate(&request()).await.unwrap_err();

        assert_eq!(failure.kind, FailureKind::ModelUnavailable);
        assert_eq!(backend.generation_calls(), 1);
        assert!(client.selected_model().is_none());

        client.generate(&request()).await.unwrap();
        assert_eq!(backend.discovery_calls(), 2);
    }

    #[tokio::test]
    async fn test_auth_failure_keeps_selection() {
        let backend = Arc::new(ScriptedBackend::failing(FailureKind::Auth));
        let client = client_for(backend.clone());

        let failure = client.generate(&request()).await.unwrap_err();

        assert_eq!(failure.kind, FailureKind::Auth);
        assert!(client.selected_model().is_some());
    }

    #[tokio::test]
    async fn test_discovery_failure_surfaces_as_no_model_available() {
        let backend = Arc::new(
            ScriptedBackend::replying("{}").with_discovery_failure(FailureKind::Network),
        );
        let client = client_for(backend.clone());

        let failure = client.generate(&request()).await.unwrap_err();

        assert_eq!(failure.kind, FailureKind::NoModelAvailable);
        assert_eq!(backend.generation_calls(), 0);
    }
}
