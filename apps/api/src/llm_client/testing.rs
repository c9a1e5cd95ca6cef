//! Scripted generation backend for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{FailureKind, GenerationBackend, GenerationFailure, LlmClient, ModelRegistry};

/// Backend double: replays queued responses first, then a default reply.
/// Counts calls and remembers the last prompt.
pub struct ScriptedBackend {
    models: Vec<String>,
    discovery_failure: Option<FailureKind>,
    discovery_delay: Duration,
    generation_delay: Duration,
    queued: Mutex<VecDeque<Result<String, GenerationFailure>>>,
    default_reply: Result<String, GenerationFailure>,
    discovery_calls: AtomicUsize,
    generation_calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl ScriptedBackend {
    fn with_default(default_reply: Result<String, GenerationFailure>) -> Self {
        Self {
            models: vec!["gemini-1.5-flash".to_string(), "gemini-1.5-pro".to_string()],
            discovery_failure: None,
            discovery_delay: Duration::ZERO,
            generation_delay: Duration::ZERO,
            queued: Mutex::new(VecDeque::new()),
            default_reply,
            discovery_calls: AtomicUsize::new(0),
            generation_calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::with_default(Ok(text.to_string()))
    }

    pub fn failing(kind: FailureKind) -> Self {
        Self::with_default(Err(GenerationFailure::new(kind, "scripted failure")))
    }

    pub fn with_models(mut self, models: &[&str]) -> Self {
        self.models = models.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn with_discovery_failure(mut self, kind: FailureKind) -> Self {
        self.discovery_failure = Some(kind);
        self
    }

    pub fn with_discovery_delay(mut self, delay: Duration) -> Self {
        self.discovery_delay = delay;
        self
    }

    pub fn with_generation_delay(mut self, delay: Duration) -> Self {
        self.generation_delay = delay;
        self
    }

    /// Queues a one-shot response, served before the default reply.
    pub fn then(self, response: Result<String, GenerationFailure>) -> Self {
        self.queued.lock().unwrap().push_back(response);
        self
    }

    pub fn discovery_calls(&self) -> usize {
        self.discovery_calls.load(Ordering::SeqCst)
    }

    pub fn generation_calls(&self) -> usize {
        self.generation_calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn list_models(&self) -> Result<Vec<String>, GenerationFailure> {
        self.discovery_calls.fetch_add(1, Ordering::SeqCst);
        if !self.discovery_delay.is_zero() {
            tokio::time::sleep(self.discovery_delay).await;
        }
        match self.discovery_failure {
            Some(kind) => Err(GenerationFailure::new(kind, "scripted discovery failure")),
            None => Ok(self.models.clone()),
        }
    }

    async fn generate_text(
        &self,
        _model: &str,
        prompt: &str,
        _timeout: Duration,
    ) -> Result<String, GenerationFailure> {
        self.generation_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        if !self.generation_delay.is_zero() {
            tokio::time::sleep(self.generation_delay).await;
        }
        let queued = self.queued.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| self.default_reply.clone())
    }
}

/// Client over `backend` with default preferences and timeouts.
pub fn client_for(backend: Arc<ScriptedBackend>) -> LlmClient {
    LlmClient::new(
        backend,
        Arc::new(ModelRegistry::with_preferred(None, Duration::from_secs(10))),
        Duration::from_secs(20),
    )
}
