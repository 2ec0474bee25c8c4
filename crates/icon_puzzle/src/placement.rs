use bevy::prelude::*;

use crate::grid::{same_position, Board};
use crate::tiles::Tile;

/// Bookkeeping for the one drag that may be active at a time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragContext {
    pub tile_id: usize,
    /// Resting position of the tile when the drag began.
    pub start: Vec2,
    /// Pointer travel since the drag began, in board units. Purely visual until release.
    pub offset: Vec2,
}

impl DragContext {
    pub const fn new(tile_id: usize, start: Vec2) -> Self {
        Self {
            tile_id,
            start,
            offset: Vec2::ZERO,
        }
    }

    /// Where the tile would land if the pointer were released now.
    pub fn release_point(&self) -> Vec2 {
        self.start + self.offset
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementEffect {
    /// The target cell was free and the tile moved there.
    Moved { tile: usize, row: usize, col: usize },
    /// The target cell was taken and both tiles exchanged positions.
    Swapped {
        tile: usize,
        other: usize,
        row: usize,
        col: usize,
    },
}

impl PlacementEffect {
    pub const fn tile(&self) -> usize {
        match *self {
            Self::Moved { tile, .. } | Self::Swapped { tile, .. } => tile,
        }
    }
}

/// Drops `dragged` at `release` and snaps it onto the nearest cell.
///
/// When another tile already rests on that cell the two tiles exchange positions,
/// otherwise the dragged tile simply moves. Returns `None` when `dragged` is not a tile
/// of `tiles`.
pub fn resolve_release(
    board: &Board,
    tiles: &mut [Tile],
    dragged: usize,
    release: Vec2,
) -> Option<PlacementEffect> {
    let dragged_index = tiles.iter().position(|tile| tile.id == dragged)?;
    let target = board.nearest_cell(release);

    let occupant_index = tiles
        .iter()
        .position(|tile| tile.id != dragged && same_position(tile.position, target.origin));

    let effect = match occupant_index {
        Some(occupant_index) => {
            let dragged_position = tiles.get(dragged_index)?.position;
            let occupant = tiles.get_mut(occupant_index)?;
            let occupant_position = occupant.position;
            occupant.position = dragged_position;
            let other = occupant.id;

            tiles.get_mut(dragged_index)?.position = occupant_position;
            PlacementEffect::Swapped {
                tile: dragged,
                other,
                row: target.row,
                col: target.col,
            }
        }
        None => {
            tiles.get_mut(dragged_index)?.position = target.origin;
            PlacementEffect::Moved {
                tile: dragged,
                row: target.row,
                col: target.col,
            }
        }
    };

    if let Some(tile) = tiles.get_mut(dragged_index) {
        tile.is_being_dragged = false;
    }
    Some(effect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::DEFAULT_BOARD_SIZE;
    use crate::tiles::build_tiles;

    fn position_of(tiles: &[Tile], id: usize) -> Option<Vec2> {
        tiles.iter().find(|tile| tile.id == id).map(|tile| tile.position)
    }

    #[test]
    fn release_onto_occupied_cell_swaps() {
        let board = Board::new(3, DEFAULT_BOARD_SIZE);
        let mut tiles = build_tiles(&board);
        let before = tiles.clone();
        let a = board.cell_at(0, 0).origin;
        let b = board.cell_at(1, 2).origin;

        let effect = resolve_release(&board, &mut tiles, 0, b + Vec2::new(20., -30.));
        assert_eq!(
            effect,
            Some(PlacementEffect::Swapped {
                tile: 0,
                other: 5,
                row: 1,
                col: 2
            })
        );
        assert_eq!(position_of(&tiles, 0), Some(b));
        assert_eq!(position_of(&tiles, 5), Some(a));
        for (after, before) in tiles.iter().zip(&before) {
            if after.id != 0 && after.id != 5 {
                assert_eq!(after.position, before.position, "tile {} moved", after.id);
            }
        }
    }

    #[test]
    fn release_onto_free_cell_moves() {
        let board = Board::new(2, 200.);
        let mut tiles = build_tiles(&board);
        tiles.retain(|tile| tile.id != 3);

        let effect = resolve_release(&board, &mut tiles, 0, Vec2::new(130., 90.));
        assert_eq!(
            effect,
            Some(PlacementEffect::Moved {
                tile: 0,
                row: 1,
                col: 1
            })
        );
        assert_eq!(position_of(&tiles, 0), Some(Vec2::new(100., 100.)));
    }

    #[test]
    fn release_on_own_cell_is_a_move_in_place() {
        let board = Board::new(3, DEFAULT_BOARD_SIZE);
        let mut tiles = build_tiles(&board);
        if let Some(tile) = tiles.get_mut(4) {
            tile.is_being_dragged = true;
        }
        let effect = resolve_release(&board, &mut tiles, 4, Vec2::new(104., 96.));
        assert_eq!(effect.map(|effect| effect.tile()), Some(4));
        assert!(matches!(effect, Some(PlacementEffect::Moved { .. })));
        assert_eq!(position_of(&tiles, 4), Some(Vec2::new(100., 100.)));
        assert!(tiles.iter().all(|tile| !tile.is_being_dragged), "drag flag cleared");
    }

    #[test]
    fn release_far_outside_board_clamps() {
        let board = Board::new(3, DEFAULT_BOARD_SIZE);
        let mut tiles = build_tiles(&board);
        let effect = resolve_release(&board, &mut tiles, 4, Vec2::new(9_000., -9_000.));
        assert_eq!(
            effect,
            Some(PlacementEffect::Swapped {
                tile: 4,
                other: 2,
                row: 0,
                col: 2
            })
        );
    }

    #[test]
    fn unknown_tile_is_ignored() {
        let board = Board::new(3, DEFAULT_BOARD_SIZE);
        let mut tiles = build_tiles(&board);
        assert_eq!(resolve_release(&board, &mut tiles, 42, Vec2::ZERO), None);
    }

    #[test]
    fn drag_context_accumulates_offset() {
        let mut drag = DragContext::new(3, Vec2::new(0., 100.));
        drag.offset = Vec2::new(55., -20.);
        assert_eq!(drag.release_point(), Vec2::new(55., 80.));
    }
}
