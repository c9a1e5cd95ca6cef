//! Process-wide model selection cache with coalesced discovery.
//!
//! The registry remembers which backend model generation calls should use.
//! It starts empty; the first caller triggers discovery, and every caller that
//! arrives while discovery is in flight awaits the same shared future instead of
//! issuing its own `list_models` call. The mutex guards only in-memory reads and
//! writes; discovery itself runs outside it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{info, warn};

use super::{FailureKind, GenerationBackend, GenerationFailure};

/// Preference order when no model is configured explicitly: fast and cheap
/// first, then the more capable tiers.
pub const DEFAULT_MODEL_PREFERENCES: &[&str] = &[
    "gemini-1.5-flash",
    "gemini-1.5-flash-latest",
    "gemini-1.5-pro",
    "gemini-1.5-pro-latest",
    "gemini-pro",
];

type Discovery = Shared<BoxFuture<'static, Result<String, GenerationFailure>>>;

#[derive(Default)]
struct RegistryState {
    selected: Option<String>,
    /// Discovery currently running, tagged with the epoch that started it.
    in_flight: Option<(u64, Discovery)>,
    epoch: u64,
}

pub struct ModelRegistry {
    state: Mutex<RegistryState>,
    preferences: Arc<[String]>,
    discovery_timeout: Duration,
}

impl ModelRegistry {
    pub fn new(preferences: Vec<String>, discovery_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            preferences: preferences.into(),
            discovery_timeout,
        }
    }

    /// Default preference list, with `preferred` (if any) tried first.
    pub fn with_preferred(preferred: Option<&str>, discovery_timeout: Duration) -> Self {
        let mut preferences: Vec<String> = preferred
            .filter(|m| !m.trim().is_empty())
            .map(|m| m.trim().trim_start_matches("models/").to_string())
            .into_iter()
            .collect();
        for model in DEFAULT_MODEL_PREFERENCES {
            if !preferences.iter().any(|p| p == model) {
                preferences.push((*model).to_string());
            }
        }
        Self::new(preferences, discovery_timeout)
    }

    pub fn selected(&self) -> Option<String> {
        self.lock().selected.clone()
    }

    /// Returns the cached model, or joins (or starts) the single in-flight
    /// discovery and returns its result.
    pub async fn resolve(
        &self,
        backend: &Arc<dyn GenerationBackend>,
    ) -> Result<String, GenerationFailure> {
        let (epoch, discovery) = {
            let mut state = self.lock();
            if let Some(model) = &state.selected {
                return Ok(model.clone());
            }
            match &state.in_flight {
                Some((epoch, discovery)) => (*epoch, discovery.clone()),
                None => {
                    state.epoch += 1;
                    let epoch = state.epoch;
                    let discovery = discover(
                        Arc::clone(backend),
                        Arc::clone(&self.preferences),
                        self.discovery_timeout,
                    )
                    .boxed()
                    .shared();
                    state.in_flight = Some((epoch, discovery.clone()));
                    (epoch, discovery)
                }
            }
        };

        let outcome = discovery.await;

        // Only the first waiter of this epoch swaps the result in.
        let mut state = self.lock();
        if matches!(&state.in_flight, Some((current, _)) if *current == epoch) {
            state.in_flight = None;
            if let Ok(model) = &outcome {
                info!(model = %model, "Selected generation model");
                state.selected = Some(model.clone());
            }
        }
        outcome
    }

    /// Clears the selection if `model` is still the selected one. A failure
    /// reported against an already-replaced model is ignored.
    pub fn invalidate(&self, model: &str) {
        let mut state = self.lock();
        if state.selected.as_deref() == Some(model) {
            warn!(model = %model, "Cleared cached model selection");
            state.selected = None;
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        // State is only ever swapped whole, so a poisoned guard is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn discover(
    backend: Arc<dyn GenerationBackend>,
    preferences: Arc<[String]>,
    timeout: Duration,
) -> Result<String, GenerationFailure> {
    let models = match tokio::time::timeout(timeout, backend.list_models()).await {
        Ok(Ok(models)) => models,
        Ok(Err(failure)) => {
            warn!(kind = %failure.kind, "Model discovery failed: {}", failure.message);
            return Err(GenerationFailure::new(
                FailureKind::NoModelAvailable,
                format!("model discovery failed ({}): {}", failure.kind, failure.message),
            ));
        }
        Err(_) => {
            warn!("Model discovery timed out after {}s", timeout.as_secs());
            return Err(GenerationFailure::new(
                FailureKind::NoModelAvailable,
                format!("model discovery timed out after {}s", timeout.as_secs()),
            ));
        }
    };

    select_model(&models, &preferences).ok_or_else(|| {
        GenerationFailure::new(
            FailureKind::NoModelAvailable,
            "backend reported no text-generation models",
        )
    })
}

/// Picks a model: first preference present, then any "flash" model, then any
/// "pro" model, then whatever was discovered first.
pub fn select_model(available: &[String], preferences: &[String]) -> Option<String> {
    preferences
        .iter()
        .find(|p| available.iter().any(|m| m == *p))
        .or_else(|| available.iter().find(|m| m.contains("flash")))
        .or_else(|| available.iter().find(|m| m.contains("pro")))
        .or_else(|| available.first())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::ScriptedBackend;

    fn names(models: &[&str]) -> Vec<String> {
        models.iter().map(|m| m.to_string()).collect()
    }

    fn defaults() -> Vec<String> {
        names(DEFAULT_MODEL_PREFERENCES)
    }

    #[test]
    fn test_select_prefers_listed_order() {
        let available = names(&["gemini-1.5-pro", "gemini-1.5-flash"]);
        assert_eq!(
            select_model(&available, &defaults()).as_deref(),
            Some("gemini-1.5-flash")
        );
    }

    #[test]
    fn test_select_falls_back_to_flash_then_pro_then_first() {
        let flash = names(&["text-embedding-004", "gemini-2.0-flash"]);
        assert_eq!(
            select_model(&flash, &defaults()).as_deref(),
            Some("gemini-2.0-flash")
        );

        let pro = names(&["aqa", "gemini-2.5-pro"]);
        assert_eq!(
            select_model(&pro, &defaults()).as_deref(),
            Some("gemini-2.5-pro")
        );

        let other = names(&["aqa", "gemma-3"]);
        assert_eq!(select_model(&other, &defaults()).as_deref(), Some("aqa"));
    }

    #[test]
    fn test_select_empty_is_none() {
        assert!(select_model(&[], &defaults()).is_none());
    }

    #[test]
    fn test_with_preferred_puts_configured_model_first() {
        let registry =
            ModelRegistry::with_preferred(Some("models/gemini-1.5-pro"), Duration::from_secs(1));
        assert_eq!(registry.preferences[0], "gemini-1.5-pro");
        assert_eq!(
            registry
                .preferences
                .iter()
                .filter(|p| *p == "gemini-1.5-pro")
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_invalidate_ignores_stale_model() {
        let backend: Arc<dyn GenerationBackend> = Arc::new(ScriptedBackend::replying("{}"));
        let registry = ModelRegistry::with_preferred(None, Duration::from_secs(5));

        let model = registry.resolve(&backend).await.unwrap();
        registry.invalidate("some-older-model");
        assert_eq!(registry.selected(), Some(model.clone()));

        registry.invalidate(&model);
        assert!(registry.selected().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_resolves_share_one_discovery() {
        let scripted = Arc::new(
            ScriptedBackend::replying("{}").with_discovery_delay(Duration::from_millis(50)),
        );
        let backend: Arc<dyn GenerationBackend> = scripted.clone();
        let registry = ModelRegistry::with_preferred(None, Duration::from_secs(5));

        let results =
            futures::future::join_all((0..8).map(|_| registry.resolve(&backend))).await;

        assert!(results.iter().all(|r| r.as_deref() == Ok("gemini-1.5-flash")));
        assert_eq!(scripted.discovery_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_discovery_is_not_cached() {
        let scripted =
            Arc::new(ScriptedBackend::replying("{}").with_discovery_failure(FailureKind::Auth));
        let backend: Arc<dyn GenerationBackend> = scripted.clone();
        let registry = ModelRegistry::with_preferred(None, Duration::from_secs(5));

        let first = registry.resolve(&backend).await.unwrap_err();
        let second = registry.resolve(&backend).await.unwrap_err();

        assert_eq!(first.kind, FailureKind::NoModelAvailable);
        assert!(first.message.contains("auth"));
        assert_eq!(second.kind, FailureKind::NoModelAvailable);
        assert_eq!(scripted.discovery_calls(), 2);
        assert!(registry.selected().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_discovery_times_out() {
        let scripted = Arc::new(
            ScriptedBackend::replying("{}").with_discovery_delay(Duration::from_secs(30)),
        );
        let backend: Arc<dyn GenerationBackend> = scripted;
        let registry = ModelRegistry::with_preferred(None, Duration::from_secs(2));

        let failure = registry.resolve(&backend).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::NoModelAvailable);
        assert!(failure.message.contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_waiter_does_not_strand_discovery() {
        let scripted = Arc::new(
            ScriptedBackend::replying("{}").with_discovery_delay(Duration::from_millis(50)),
        );
        let backend: Arc<dyn GenerationBackend> = scripted.clone();
        let registry = ModelRegistry::with_preferred(None, Duration::from_secs(5));

        // Start a discovery and abandon it before it completes.
        let abandoned =
            tokio::time::timeout(Duration::from_millis(10), registry.resolve(&backend)).await;
        assert!(abandoned.is_err());

        let model = registry.resolve(&backend).await.unwrap();
        assert_eq!(model, "gemini-1.5-flash");
        assert_eq!(scripted.discovery_calls(), 1);
        assert_eq!(registry.selected().as_deref(), Some("gemini-1.5-flash"));
    }
}
