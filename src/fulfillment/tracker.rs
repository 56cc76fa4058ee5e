//! Per line item generation state machine

use serde::Serialize;
use std::fmt;
use std::sync::Mutex;

use crate::configuration::ConfigSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationState {
    Resolving,
    Rendering,
    Succeeded,
    Failed,
}

impl GenerationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationState::Succeeded | GenerationState::Failed)
    }

    fn can_advance_to(&self, next: GenerationState) -> bool {
        use GenerationState::*;
        matches!(
            (self, next),
            (Resolving, Rendering) | (Resolving, Failed) | (Rendering, Succeeded) | (Rendering, Failed)
        )
    }
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GenerationState::Resolving => "resolving",
            GenerationState::Rendering => "rendering",
            GenerationState::Succeeded => "succeeded",
            GenerationState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
struct Progress {
    state: GenerationState,
    history: Vec<GenerationState>,
    source: Option<ConfigSource>,
    config_id: Option<String>,
}

/// Tracks one line item through `Resolving -> Rendering -> Succeeded | Failed`.
///
/// Also remembers what resolution produced, so the failure path still knows
/// the config id after the pipeline future has been dropped.
#[derive(Debug)]
pub struct GenerationTracker {
    order_id: u64,
    line_item_id: u64,
    progress: Mutex<Progress>,
}

impl GenerationTracker {
    pub fn new(order_id: u64, line_item_id: u64) -> Self {
        Self {
            order_id,
            line_item_id,
            progress: Mutex::new(Progress {
                state: GenerationState::Resolving,
                history: vec![GenerationState::Resolving],
                source: None,
                config_id: None,
            }),
        }
    }

    pub fn state(&self) -> GenerationState {
        self.lock().state
    }

    pub fn history(&self) -> Vec<GenerationState> {
        self.lock().history.clone()
    }

    pub fn config_id(&self) -> Option<String> {
        self.lock().config_id.clone()
    }

    pub fn source(&self) -> Option<ConfigSource> {
        self.lock().source
    }

    /// Resolution finished; rendering starts
    pub fn rendering(&self, source: ConfigSource, config_id: Option<&str>) -> bool {
        let mut progress = self.lock();
        progress.source = Some(source);
        progress.config_id = config_id.map(str::to_string);
        self.advance(&mut progress, GenerationState::Rendering)
    }

    pub fn succeeded(&self) -> bool {
        let mut progress = self.lock();
        self.advance(&mut progress, GenerationState::Succeeded)
    }

    pub fn failed(&self) -> bool {
        let mut progress = self.lock();
        self.advance(&mut progress, GenerationState::Failed)
    }

    fn advance(&self, progress: &mut Progress, next: GenerationState) -> bool {
        if !progress.state.can_advance_to(next) {
            tracing::warn!(
                order_id = self.order_id,
                line_item_id = self.line_item_id,
                from = %progress.state,
                to = %next,
                "Ignoring invalid generation state transition"
            );
            return false;
        }
        tracing::debug!(
            order_id = self.order_id,
            line_item_id = self.line_item_id,
            from = %progress.state,
            to = %next,
            "Generation state changed"
        );
        progress.state = next;
        progress.history.push(next);
        true
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Progress> {
        self.progress.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let tracker = GenerationTracker::new(1, 2);
        assert!(tracker.rendering(ConfigSource::JsonFile, Some("cfg_1")));
        assert!(tracker.succeeded());
        assert_eq!(
            tracker.history(),
            vec![
                GenerationState::Resolving,
                GenerationState::Rendering,
                GenerationState::Succeeded
            ]
        );
        assert_eq!(tracker.config_id().as_deref(), Some("cfg_1"));
        assert!(tracker.state().is_terminal());
    }

    #[test]
    fn test_failure_during_resolution() {
        let tracker = GenerationTracker::new(1, 2);
        assert!(tracker.failed());
        assert_eq!(tracker.state(), GenerationState::Failed);
        assert!(tracker.config_id().is_none());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let tracker = GenerationTracker::new(1, 2);
        assert!(!tracker.succeeded());
        assert!(tracker.failed());
        assert!(!tracker.succeeded());
        assert!(!tracker.failed());
        assert_eq!(tracker.history().len(), 2);
    }
}
