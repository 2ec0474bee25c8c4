use bevy::log::debug;
use bevy::prelude::*;
use thiserror::Error;

use crate::completion::{is_solved, misplaced_count};
use crate::config::PuzzleDefinition;
use crate::grid::{same_position, Board, GridCell};
use crate::placement::{resolve_release, DragContext, PlacementEffect};
use crate::tiles::{build_tiles, shuffle_and_place, Tile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Playing,
    Solved,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragError {
    #[error("A drag is already in progress for tile {0}")]
    AlreadyDragging(usize),

    #[error("No drag is in progress")]
    NoActiveDrag,

    #[error("There is no tile {0} on this board")]
    UnknownTile(usize),

    #[error("The puzzle is already solved")]
    PuzzleSolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseOutcome {
    pub effect: PlacementEffect,
    pub move_count: u32,
    /// True only on the release that solved the puzzle.
    pub solved: bool,
}

/// One attempt at one puzzle.
#[derive(Debug, Clone)]
pub struct PuzzleSession {
    definition: PuzzleDefinition,
    board: Board,
    tiles: Vec<Tile>,
    move_count: u32,
    phase: SessionPhase,
    drag: Option<DragContext>,
}

impl PuzzleSession {
    /// Builds the tiles of `definition` and deals them onto a shuffled board.
    pub fn new(definition: PuzzleDefinition, board_size: f32, rng: &mut fastrand::Rng) -> Self {
        let board = Board::new(definition.grid_size, board_size);
        let placement = shuffle_and_place(&board, build_tiles(&board), rng);
        debug!("Dealt puzzle {}:\n{placement}", definition.id);

        Self {
            definition,
            board,
            tiles: placement.tiles,
            move_count: 0,
            phase: SessionPhase::Playing,
            drag: None,
        }
    }

    /// Starts a session from a known arrangement instead of a shuffle.
    pub fn with_tiles(definition: PuzzleDefinition, board_size: f32, tiles: Vec<Tile>) -> Self {
        Self {
            board: Board::new(definition.grid_size, board_size),
            definition,
            tiles,
            move_count: 0,
            phase: SessionPhase::Playing,
            drag: None,
        }
    }

    pub const fn definition(&self) -> &PuzzleDefinition {
        &self.definition
    }

    pub const fn board(&self) -> &Board {
        &self.board
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tile(&self, id: usize) -> Option<&Tile> {
        self.tiles.iter().find(|tile| tile.id == id)
    }

    pub const fn move_count(&self) -> u32 {
        self.move_count
    }

    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub const fn drag(&self) -> Option<&DragContext> {
        self.drag.as_ref()
    }

    /// Id of the tile resting on the cell under `point`, in board coordinates.
    pub fn tile_at(&self, point: Vec2) -> Option<usize> {
        let cell = self.board.cell_containing(point)?;
        self.tiles
            .iter()
            .find(|tile| same_position(tile.position, cell.origin))
            .map(|tile| tile.id)
    }

    /// Board cells with their current occupants.
    pub fn cells(&self) -> Vec<GridCell> {
        self.board
            .cells()
            .into_iter()
            .map(|mut cell| {
                cell.occupant = self
                    .tiles
                    .iter()
                    .find(|tile| same_position(tile.position, cell.origin))
                    .map(|tile| tile.id);
                cell
            })
            .collect()
    }

    /// Where the tile should be drawn right now: its resting position, plus the pointer
    /// travel while it is being dragged.
    pub fn display_position(&self, id: usize) -> Option<Vec2> {
        let tile = self.tile(id)?;
        Some(match self.drag {
            Some(drag) if drag.tile_id == id => drag.release_point(),
            _ => tile.position,
        })
    }

    pub fn begin_drag(&mut self, tile_id: usize) -> Result<(), DragError> {
        if self.phase == SessionPhase::Solved {
            return Err(DragError::PuzzleSolved);
        }
        if let Some(drag) = self.drag {
            return Err(DragError::AlreadyDragging(drag.tile_id));
        }
        let tile = self
            .tiles
            .iter_mut()
            .find(|tile| tile.id == tile_id)
            .ok_or(DragError::UnknownTile(tile_id))?;
        tile.is_being_dragged = true;
        self.drag = Some(DragContext::new(tile_id, tile.position));
        Ok(())
    }

    /// Tracks pointer travel since the drag began.
    pub fn drag_to(&mut self, offset: Vec2) -> Result<(), DragError> {
        let drag = self.drag.as_mut().ok_or(DragError::NoActiveDrag)?;
        drag.offset = offset;
        Ok(())
    }

    /// Ends the drag at `offset` from its start and snaps the tile onto the board.
    ///
    /// Every release counts as a move, even one that puts the tile back where it was.
    pub fn release(&mut self, offset: Vec2) -> Result<ReleaseOutcome, DragError> {
        self.drag_to(offset)?;
        self.finish_drag()
    }

    /// Ends the drag at the last tracked offset, for a pointer that was lost mid-drag.
    pub fn cancel_drag(&mut self) -> Result<ReleaseOutcome, DragError> {
        self.finish_drag()
    }

    fn finish_drag(&mut self) -> Result<ReleaseOutcome, DragError> {
        let drag = self.drag.take().ok_or(DragError::NoActiveDrag)?;
        let effect = resolve_release(&self.board, &mut self.tiles, drag.tile_id, drag.release_point())
            .ok_or(DragError::UnknownTile(drag.tile_id))?;
        self.move_count += 1;

        let solved = self.check_completion();
        debug!(
            "Move {}: {effect:?}, {} tiles misplaced",
            self.move_count,
            misplaced_count(&self.board, &self.tiles)
        );
        Ok(ReleaseOutcome {
            effect,
            move_count: self.move_count,
            solved,
        })
    }

    /// Moves to `Solved` when every tile is home. Returns true only on that transition.
    ///
    /// Does nothing while a drag is in progress or once solved.
    pub fn check_completion(&mut self) -> bool {
        if self.phase == SessionPhase::Solved || self.drag.is_some() {
            return false;
        }
        if is_solved(&self.board, &self.tiles) {
            self.phase = SessionPhase::Solved;
            return true;
        }
        false
    }
}
