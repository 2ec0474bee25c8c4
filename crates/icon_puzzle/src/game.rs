use bevy::log::{info, warn};
use bevy::prelude::*;
use thiserror::Error;

use crate::config::{PuzzleConfig, PuzzleDefinition};
use crate::progression::{ProgressionOutcome, ProgressionTracker};
use crate::session::{DragError, PuzzleSession, ReleaseOutcome, SessionPhase};
use crate::storage::ProgressStore;

/// Result reported to the host when the mini-game ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiniGameResult {
    pub passed: bool,
    /// Distinct puzzles solved.
    pub score: usize,
    pub total_definitions: usize,
}

/// The surroundings the puzzle runs in.
pub trait SessionHost {
    /// Whether the player has started the mini-game. No tiles are dealt before that.
    fn can_start(&self) -> bool;
    /// Called once per solved puzzle, before the continue/finish decision.
    fn on_puzzle_solved(&mut self, id: u32, title: &str, story: &str);
    fn on_session_finished(&mut self, result: MiniGameResult);
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameError {
    #[error("The puzzle has not been started")]
    NotStarted,

    #[error("The solved puzzle must be acknowledged first")]
    AwaitingAcknowledgement,

    #[error("The current puzzle is not solved")]
    NotSolved,

    #[error("Not enough puzzles solved to finish")]
    RequirementNotMet,

    #[error(transparent)]
    Drag(#[from] DragError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Waiting for the host to open the gate.
    Waiting,
    Playing,
    /// Solved, the description is on screen.
    Solved,
    /// The description was closed; the outcome says what is allowed next.
    Decided(ProgressionOutcome),
    Finished,
}

/// Drives puzzle after puzzle for one play session.
pub struct IconPuzzleGame<S: ProgressStore> {
    config: PuzzleConfig,
    tracker: ProgressionTracker<S>,
    session: Option<PuzzleSession>,
    current_index: usize,
    /// Bumped whenever a new board is dealt.
    serial: u64,
    phase: GamePhase,
    /// The host has been told the session is over.
    reported: bool,
    rng: fastrand::Rng,
}

impl<S: ProgressStore> IconPuzzleGame<S> {
    pub fn new(config: PuzzleConfig, store: S) -> Self {
        Self::with_rng(config, store, fastrand::Rng::new())
    }

    pub fn with_rng(config: PuzzleConfig, store: S, rng: fastrand::Rng) -> Self {
        let tracker = ProgressionTracker::load(&config, store);
        Self {
            config,
            tracker,
            session: None,
            current_index: 0,
            serial: 0,
            phase: GamePhase::Waiting,
            reported: false,
            rng,
        }
    }

    pub const fn config(&self) -> &PuzzleConfig {
        &self.config
    }

    pub const fn tracker(&self) -> &ProgressionTracker<S> {
        &self.tracker
    }

    pub const fn session(&self) -> Option<&PuzzleSession> {
        self.session.as_ref()
    }

    pub const fn phase(&self) -> GamePhase {
        self.phase
    }

    pub const fn serial(&self) -> u64 {
        self.serial
    }

    /// Position of the current puzzle in the configured order.
    pub const fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn session_phase(&self) -> Option<SessionPhase> {
        self.session.as_ref().map(PuzzleSession::phase)
    }

    pub fn current_definition(&self) -> Option<&PuzzleDefinition> {
        self.session.as_ref().map(PuzzleSession::definition)
    }

    pub fn move_count(&self) -> u32 {
        self.session.as_ref().map_or(0, PuzzleSession::move_count)
    }

    /// Deals the first puzzle once the host lets play begin. Returns whether play is on.
    pub fn try_start(&mut self, host: &impl SessionHost) -> bool {
        if self.phase != GamePhase::Waiting {
            return true;
        }
        if !host.can_start() {
            return false;
        }
        self.present_next()
    }

    pub fn begin_drag(&mut self, tile_id: usize) -> Result<(), GameError> {
        self.playing_session()?.begin_drag(tile_id)?;
        Ok(())
    }

    pub fn drag_to(&mut self, offset: Vec2) -> Result<(), GameError> {
        self.playing_session()?.drag_to(offset)?;
        Ok(())
    }

    /// Ends the active drag `offset` away from where it began.
    pub fn release(
        &mut self,
        offset: Vec2,
        host: &mut impl SessionHost,
    ) -> Result<ReleaseOutcome, GameError> {
        let outcome = self.playing_session()?.release(offset)?;
        self.after_release(outcome, host);
        Ok(outcome)
    }

    /// Ends the active drag where the pointer was last seen.
    pub fn cancel_drag(&mut self, host: &mut impl SessionHost) -> Result<ReleaseOutcome, GameError> {
        let outcome = self.playing_session()?.cancel_drag()?;
        self.after_release(outcome, host);
        Ok(outcome)
    }

    /// Closes the description of the solved puzzle and decides what comes next.
    ///
    /// Reaching [`ProgressionOutcome::AllComplete`] ends the session right away.
    pub fn acknowledge(
        &mut self,
        host: &mut impl SessionHost,
    ) -> Result<ProgressionOutcome, GameError> {
        match self.phase {
            GamePhase::Solved => {}
            GamePhase::Waiting => return Err(GameError::NotStarted),
            _ => return Err(GameError::NotSolved),
        }
        let outcome = self.tracker.outcome();
        info!("Progression after solve: {outcome}");
        self.phase = GamePhase::Decided(outcome);
        if outcome == ProgressionOutcome::AllComplete {
            self.end_session(host);
        }
        Ok(outcome)
    }

    /// Deals the next unsolved puzzle, or the first one once all are solved.
    pub fn next_puzzle(&mut self) -> Result<(), GameError> {
        match self.phase {
            GamePhase::Decided(_) | GamePhase::Finished => {}
            GamePhase::Waiting => return Err(GameError::NotStarted),
            GamePhase::Solved => return Err(GameError::AwaitingAcknowledgement),
            GamePhase::Playing => return Err(GameError::NotSolved),
        }
        self.present_next();
        Ok(())
    }

    /// Stops playing and reports the result. Only allowed once enough puzzles are solved.
    pub fn finish(&mut self, host: &mut impl SessionHost) -> Result<MiniGameResult, GameError> {
        match self.phase {
            GamePhase::Waiting => return Err(GameError::NotStarted),
            GamePhase::Solved => return Err(GameError::AwaitingAcknowledgement),
            GamePhase::Finished => return Ok(self.result()),
            GamePhase::Playing | GamePhase::Decided(_) => {}
        }
        if !self.tracker.meets_minimum_requirement() {
            return Err(GameError::RequirementNotMet);
        }
        Ok(self.end_session(host))
    }

    /// The host closed the mini-game itself, so it is not notified again.
    pub fn end_by_host(&mut self) -> MiniGameResult {
        let result = self.result();
        info!(
            "Icon puzzle ended by host: {}/{} solved",
            result.score, result.total_definitions
        );
        self.phase = GamePhase::Finished;
        self.reported = true;
        result
    }

    /// Reshuffles the current puzzle and starts counting moves from zero.
    pub fn reset_puzzle(&mut self) -> Result<(), GameError> {
        let definition = self
            .current_definition()
            .cloned()
            .ok_or(GameError::NotStarted)?;
        self.deal(definition);
        Ok(())
    }

    /// Clears every recorded completion.
    pub fn reset_progress(&mut self) {
        self.tracker.reset();
    }

    pub fn result(&self) -> MiniGameResult {
        MiniGameResult {
            passed: self.tracker.meets_minimum_requirement(),
            score: self.tracker.completed_count(),
            total_definitions: self.tracker.total(),
        }
    }

    pub fn has_any_progress(&self) -> bool {
        !self.tracker.state().is_empty()
    }

    pub fn progress_text(&self) -> String {
        format!(
            "{} / {} Icons Completed",
            self.tracker.completed_count(),
            self.tracker.total()
        )
    }

    pub fn requirement_text(&self) -> String {
        let completed = self.tracker.completed_count();
        if completed < self.tracker.required_count() {
            format!(
                "{completed} / {} Required (Minimum)",
                self.tracker.required_count()
            )
        } else {
            format!("{completed} / {} Total", self.tracker.total())
        }
    }

    fn playing_session(&mut self) -> Result<&mut PuzzleSession, GameError> {
        match self.phase {
            GamePhase::Playing => {}
            GamePhase::Waiting => return Err(GameError::NotStarted),
            GamePhase::Solved => return Err(GameError::AwaitingAcknowledgement),
            _ => return Err(DragError::PuzzleSolved.into()),
        }
        self.session.as_mut().ok_or(GameError::NotStarted)
    }

    fn after_release(&mut self, outcome: ReleaseOutcome, host: &mut impl SessionHost) {
        if !outcome.solved {
            return;
        }
        let Some(definition) = self.current_definition().cloned() else {
            return;
        };
        info!(
            "Puzzle {} solved in {} moves",
            definition.id, outcome.move_count
        );
        self.tracker.record_completion(definition.id);
        self.phase = GamePhase::Solved;
        host.on_puzzle_solved(definition.id, &definition.title, &definition.story);
    }

    fn present_next(&mut self) -> bool {
        let Some((index, definition)) = self.tracker.next_definition() else {
            warn!("No puzzle definitions to present");
            return false;
        };
        let definition = definition.clone();
        self.current_index = index;
        self.deal(definition);
        true
    }

    fn deal(&mut self, definition: PuzzleDefinition) {
        info!(
            "Starting puzzle {} ({}x{}, {})",
            definition.id, definition.grid_size, definition.grid_size, definition.difficulty
        );
        let session = PuzzleSession::new(definition, self.config.board_size, &mut self.rng);
        self.session = Some(session);
        self.serial += 1;
        self.phase = GamePhase::Playing;
    }

    fn end_session(&mut self, host: &mut impl SessionHost) -> MiniGameResult {
        let result = self.result();
        info!(
            "Icon puzzle finished: {}/{} solved, passed: {}",
            result.score, result.total_definitions, result.passed
        );
        self.phase = GamePhase::Finished;
        // Replays after the end keep the first report.
        if !self.reported {
            self.reported = true;
            host.on_session_finished(result);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[derive(Default)]
    struct RecordingHost {
        open: bool,
        solved: Vec<u32>,
        finished: Vec<MiniGameResult>,
    }

    impl SessionHost for RecordingHost {
        fn can_start(&self) -> bool {
            self.open
        }

        fn on_puzzle_solved(&mut self, id: u32, _title: &str, _story: &str) {
            self.solved.push(id);
        }

        fn on_session_finished(&mut self, result: MiniGameResult) {
            self.finished.push(result);
        }
    }

    fn game() -> IconPuzzleGame<MemoryStore> {
        IconPuzzleGame::with_rng(
            PuzzleConfig::default(),
            MemoryStore::default(),
            fastrand::Rng::with_seed(11),
        )
    }

    #[test]
    fn gate_keeps_board_empty() {
        let mut game = game();
        let mut host = RecordingHost::default();
        assert!(!game.try_start(&host));
        assert!(game.session().is_none());
        assert_eq!(game.begin_drag(0), Err(GameError::NotStarted));

        host.open = true;
        assert!(game.try_start(&host));
        assert_eq!(game.phase(), GamePhase::Playing);
        assert_eq!(game.serial(), 1);
        assert!(game.try_start(&host), "starting twice is harmless");
        assert_eq!(game.serial(), 1);
        assert_eq!(game.current_index(), 0);
    }

    #[test]
    fn finish_requires_minimum() {
        let mut game = game();
        let mut host = RecordingHost {
            open: true,
            ..RecordingHost::default()
        };
        game.try_start(&host);
        assert_eq!(game.finish(&mut host), Err(GameError::RequirementNotMet));
        assert_eq!(game.acknowledge(&mut host), Err(GameError::NotSolved));
        assert_eq!(game.next_puzzle(), Err(GameError::NotSolved));
        assert!(host.finished.is_empty());
    }

    #[test]
    fn texts_follow_progress() {
        let mut game = game();
        assert_eq!(game.progress_text(), "0 / 3 Icons Completed");
        assert_eq!(game.requirement_text(), "0 / 3 Required (Minimum)");
        assert!(!game.has_any_progress());

        game.tracker.record_completion(1);
        game.tracker.record_completion(2);
        game.tracker.record_completion(3);
        assert_eq!(game.requirement_text(), "3 / 3 Total");
        assert!(game.has_any_progress());

        game.reset_progress();
        assert_eq!(game.progress_text(), "0 / 3 Icons Completed");
    }

    #[test]
    fn reset_puzzle_redeals_same_icon() {
        let mut game = game();
        let host = RecordingHost {
            open: true,
            ..RecordingHost::default()
        };
        assert_eq!(game.reset_puzzle(), Err(GameError::NotStarted));
        game.try_start(&host);
        let id = game.current_definition().map(|definition| definition.id);
        game.begin_drag(0).expect("tile 0 exists");
        game.reset_puzzle().expect("puzzle in progress");
        assert_eq!(game.current_definition().map(|definition| definition.id), id);
        assert_eq!(game.move_count(), 0);
        assert_eq!(game.serial(), 2);
        assert_eq!(game.session_phase(), Some(SessionPhase::Playing));
        assert!(game.session().and_then(PuzzleSession::drag).is_none());
    }

    fn single_tile_game() -> IconPuzzleGame<MemoryStore> {
        let mut config = PuzzleConfig::default();
        for definition in &mut config.definitions {
            definition.grid_size = 1;
        }
        IconPuzzleGame::with_rng(config, MemoryStore::default(), fastrand::Rng::with_seed(4))
    }

    fn solve_single_tile(game: &mut IconPuzzleGame<MemoryStore>, host: &mut RecordingHost) {
        game.begin_drag(0).expect("the only tile");
        let outcome = game.release(Vec2::ZERO, host).expect("drag active");
        assert!(outcome.solved, "a one-tile board solves on any drop");
    }

    #[test]
    fn host_end_mid_puzzle_allows_replay() {
        let mut game = game();
        let mut host = RecordingHost {
            open: true,
            ..RecordingHost::default()
        };
        game.try_start(&host);
        game.begin_drag(3).expect("tile 3 exists");

        let result = game.end_by_host();
        assert!(!result.passed);
        assert_eq!(game.phase(), GamePhase::Finished);
        assert!(host.finished.is_empty(), "the host ended it and needs no report");

        game.next_puzzle().expect("replay after the host ended the game");
        assert_eq!(game.phase(), GamePhase::Playing);
        assert_eq!(game.move_count(), 0);
        assert_eq!(game.finish(&mut host), Err(GameError::RequirementNotMet));
        assert!(host.finished.is_empty());
    }

    #[test]
    fn host_end_before_start_still_deals_on_replay() {
        let mut game = game();
        game.end_by_host();
        assert!(game.session().is_none());
        game.next_puzzle().expect("replay deals the first puzzle");
        assert_eq!(game.current_definition().map(|definition| definition.id), Some(1));
    }

    #[test]
    fn replay_after_all_complete_reports_once() {
        let mut game = single_tile_game();
        let mut host = RecordingHost {
            open: true,
            ..RecordingHost::default()
        };
        game.try_start(&host);
        for _ in 0..3 {
            solve_single_tile(&mut game, &mut host);
            if game.acknowledge(&mut host) == Ok(ProgressionOutcome::MustContinue) {
                game.next_puzzle().expect("more puzzles remain");
            }
        }
        assert_eq!(game.phase(), GamePhase::Finished);
        assert_eq!(host.finished.len(), 1);

        game.next_puzzle().expect("replay");
        solve_single_tile(&mut game, &mut host);
        assert_eq!(
            game.acknowledge(&mut host),
            Ok(ProgressionOutcome::AllComplete)
        );
        assert_eq!(host.solved.len(), 4);
        assert_eq!(host.finished.len(), 1, "the end is reported once");
    }
}
