use std::collections::BTreeSet;

use bevy::log::{error, info, warn};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::config::{PuzzleConfig, PuzzleDefinition};
use crate::storage::ProgressStore;

/// Ids of every puzzle solved at least once. Only grows, except through [`ProgressionTracker::reset`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressionState {
    completed: BTreeSet<u32>,
}

impl ProgressionState {
    pub fn contains(&self, id: u32) -> bool {
        self.completed.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.completed.iter().copied()
    }

    /// Returns false when `id` was already recorded.
    pub fn insert(&mut self, id: u32) -> bool {
        self.completed.insert(id)
    }
}

impl FromIterator<u32> for ProgressionState {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self {
            completed: iter.into_iter().collect(),
        }
    }
}

/// What the player may do after a solved puzzle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ProgressionOutcome {
    /// Fewer than the required puzzles are solved.
    MustContinue,
    /// The requirement is met and unsolved puzzles remain.
    MayContinueOrFinish,
    /// Every configured puzzle is solved.
    AllComplete,
}

/// Index of the first definition not yet completed, wrapping to the first one once all
/// are done. `None` only when there are no definitions.
pub fn next_definition(definitions: &[PuzzleDefinition], state: &ProgressionState) -> Option<usize> {
    if definitions.is_empty() {
        return None;
    }
    definitions
        .iter()
        .position(|definition| !state.contains(definition.id))
        .or(Some(0))
}

pub fn meets_minimum_requirement(state: &ProgressionState, required: usize) -> bool {
    state.len() >= required
}

pub fn has_more_content(state: &ProgressionState, total: usize) -> bool {
    state.len() < total
}

pub fn decide(state: &ProgressionState, required: usize, total: usize) -> ProgressionOutcome {
    if !meets_minimum_requirement(state, required) {
        ProgressionOutcome::MustContinue
    } else if has_more_content(state, total) {
        ProgressionOutcome::MayContinueOrFinish
    } else {
        ProgressionOutcome::AllComplete
    }
}

/// Owns the configured puzzle order and the persisted set of completed ids.
pub struct ProgressionTracker<S: ProgressStore> {
    definitions: Vec<PuzzleDefinition>,
    required_count: usize,
    storage_key: String,
    state: ProgressionState,
    store: S,
}

impl<S: ProgressStore> ProgressionTracker<S> {
    /// Loads the persisted state. Missing or unreadable data starts from an empty state.
    pub fn load(config: &PuzzleConfig, store: S) -> Self {
        let state = match store.load(&config.storage_key) {
            Ok(Some(text)) => serde_json::from_str(&text).unwrap_or_else(|err| {
                warn!("Discarding unreadable puzzle progress: {err}");
                ProgressionState::default()
            }),
            Ok(None) => ProgressionState::default(),
            Err(err) => {
                warn!("Could not load puzzle progress: {err}");
                ProgressionState::default()
            }
        };
        info!("Loaded puzzle progress: {} completed", state.len());

        Self {
            definitions: config.definitions.clone(),
            required_count: config.required_count,
            storage_key: config.storage_key.clone(),
            state,
            store,
        }
    }

    pub const fn state(&self) -> &ProgressionState {
        &self.state
    }

    pub fn definitions(&self) -> &[PuzzleDefinition] {
        &self.definitions
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn required_count(&self) -> usize {
        self.required_count
    }

    pub fn total(&self) -> usize {
        self.definitions.len()
    }

    pub fn completed_count(&self) -> usize {
        self.state.len()
    }

    pub fn next_definition(&self) -> Option<(usize, &PuzzleDefinition)> {
        let index = next_definition(&self.definitions, &self.state)?;
        self.definitions.get(index).map(|definition| (index, definition))
    }

    /// Adds `id` and saves right away. Recording an id twice changes nothing.
    pub fn record_completion(&mut self, id: u32) -> bool {
        if !self.state.insert(id) {
            return false;
        }
        self.persist();
        true
    }

    pub fn meets_minimum_requirement(&self) -> bool {
        meets_minimum_requirement(&self.state, self.required_count)
    }

    pub fn has_more_content(&self) -> bool {
        has_more_content(&self.state, self.total())
    }

    pub fn outcome(&self) -> ProgressionOutcome {
        decide(&self.state, self.required_count, self.total())
    }

    /// Forgets every completed puzzle, in memory and in storage.
    pub fn reset(&mut self) {
        self.state = ProgressionState::default();
        if let Err(err) = self.store.remove(&self.storage_key) {
            error!("Failed to clear puzzle progress: {err}");
        }
        info!("Puzzle progress reset");
    }

    fn persist(&mut self) {
        let result = serde_json::to_string(&self.state)
            .map_err(Into::into)
            .and_then(|text| self.store.save(&self.storage_key, &text));
        if let Err(err) = result {
            error!("Failed to save puzzle progress: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StoreError};

    struct BrokenStore;

    impl ProgressStore for BrokenStore {
        fn load(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable)
        }

        fn save(&mut self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Backend("disk full".to_owned()))
        }

        fn remove(&mut self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable)
        }
    }

    fn config_with(total: usize, required: usize) -> PuzzleConfig {
        let template = PuzzleConfig::default();
        let definitions = (1..=total as u32)
            .filter_map(|id| {
                template.definitions.first().map(|definition| PuzzleDefinition {
                    id,
                    ..definition.clone()
                })
            })
            .collect();
        PuzzleConfig {
            required_count: required,
            definitions,
            ..template
        }
    }

    #[test]
    fn record_completion_is_idempotent() {
        let config = PuzzleConfig::default();
        let mut tracker = ProgressionTracker::load(&config, MemoryStore::default());
        assert!(tracker.record_completion(2));
        let once = tracker.state().clone();
        assert!(!tracker.record_completion(2));
        assert_eq!(tracker.state(), &once);
        assert_eq!(tracker.completed_count(), 1);
    }

    #[test]
    fn persisted_state_reloads_equal() {
        let config = PuzzleConfig::default();
        let mut tracker = ProgressionTracker::load(&config, MemoryStore::default());
        tracker.record_completion(3);
        tracker.record_completion(1);
        assert_eq!(tracker.store().get(&config.storage_key), Some("[1,3]"));

        let reloaded = ProgressionTracker::load(&config, tracker.store().clone());
        assert_eq!(reloaded.state(), tracker.state());
    }

    #[test]
    fn corrupt_or_failing_storage_degrades_to_empty() {
        let config = PuzzleConfig::default();
        let mut store = MemoryStore::default();
        store
            .save(&config.storage_key, "{ not an id list")
            .expect("memory store never fails");
        let tracker = ProgressionTracker::load(&config, store);
        assert!(tracker.state().is_empty());

        let mut tracker = ProgressionTracker::load(&config, BrokenStore);
        assert!(tracker.state().is_empty());
        assert!(tracker.record_completion(1), "in-memory state stays authoritative");
        assert!(tracker.state().contains(1));
        tracker.reset();
        assert!(tracker.state().is_empty());
    }

    #[test]
    fn next_definition_skips_completed_and_wraps() {
        let config = PuzzleConfig::default();
        let mut tracker = ProgressionTracker::load(&config, MemoryStore::default());
        assert_eq!(tracker.next_definition().map(|(index, _)| index), Some(0));

        tracker.record_completion(1);
        tracker.record_completion(3);
        assert_eq!(tracker.next_definition().map(|(_, definition)| definition.id), Some(2));

        tracker.record_completion(2);
        assert_eq!(tracker.next_definition().map(|(index, _)| index), Some(0));
        assert_eq!(next_definition(&[], tracker.state()), None);
    }

    #[test]
    fn outcome_when_required_equals_total() {
        let config = config_with(3, 3);
        let mut tracker = ProgressionTracker::load(&config, MemoryStore::default());
        tracker.record_completion(1);
        assert_eq!(tracker.outcome(), ProgressionOutcome::MustContinue);
        tracker.record_completion(2);
        assert_eq!(tracker.outcome(), ProgressionOutcome::MustContinue);
        tracker.record_completion(3);
        assert_eq!(tracker.outcome(), ProgressionOutcome::AllComplete);
        assert!(!tracker.has_more_content());
    }

    #[test]
    fn outcome_with_more_content_than_required() {
        let config = config_with(6, 3);
        let mut tracker = ProgressionTracker::load(&config, MemoryStore::default());
        for id in 1..=3 {
            tracker.record_completion(id);
        }
        assert!(tracker.meets_minimum_requirement());
        assert_eq!(tracker.outcome(), ProgressionOutcome::MayContinueOrFinish);
        for id in 4..=6 {
            tracker.record_completion(id);
        }
        assert_eq!(tracker.outcome(), ProgressionOutcome::AllComplete);
    }

    #[test]
    fn reset_clears_storage() {
        let config = PuzzleConfig::default();
        let mut tracker = ProgressionTracker::load(&config, MemoryStore::default());
        tracker.record_completion(1);
        tracker.reset();
        assert!(tracker.state().is_empty());
        assert_eq!(tracker.store().get(&config.storage_key), None);
    }
}
