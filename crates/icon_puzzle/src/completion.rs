use crate::grid::Board;
use crate::tiles::Tile;

/// True when every tile rests on its own cell.
///
/// A board with a tile in mid-drag is never reported solved; the caller should only ask
/// once the drag has been resolved.
pub fn is_solved(board: &Board, tiles: &[Tile]) -> bool {
    !tiles.is_empty()
        && tiles
            .iter()
            .all(|tile| !tile.is_being_dragged && tile.is_home(board))
}

/// Tiles that still rest away from their own cell.
pub fn misplaced_count(board: &Board, tiles: &[Tile]) -> usize {
    tiles.iter().filter(|tile| !tile.is_home(board)).count()
}

#[cfg(test)]
mod tests {
    use bevy::prelude::*;

    use super::*;
    use crate::grid::DEFAULT_BOARD_SIZE;
    use crate::tiles::build_tiles;

    #[test]
    fn home_board_is_solved() {
        let board = Board::new(3, DEFAULT_BOARD_SIZE);
        let tiles = build_tiles(&board);
        assert!(is_solved(&board, &tiles));
        assert_eq!(misplaced_count(&board, &tiles), 0);
    }

    #[test]
    fn one_displaced_tile_breaks_solution() {
        let board = Board::new(3, DEFAULT_BOARD_SIZE);
        let mut tiles = build_tiles(&board);
        if let Some(tile) = tiles.get_mut(8) {
            tile.position = Vec2::new(300., 300.);
        }
        assert!(!is_solved(&board, &tiles));
        assert_eq!(misplaced_count(&board, &tiles), 1);
    }

    #[test]
    fn tolerance_absorbs_float_noise() {
        let board = Board::new(3, DEFAULT_BOARD_SIZE);
        let mut tiles = build_tiles(&board);
        if let Some(tile) = tiles.get_mut(4) {
            tile.position += Vec2::new(0.4, -0.6);
        }
        assert!(is_solved(&board, &tiles));
    }

    #[test]
    fn dragging_board_is_not_solved() {
        let board = Board::new(2, DEFAULT_BOARD_SIZE);
        let mut tiles = build_tiles(&board);
        if let Some(tile) = tiles.first_mut() {
            tile.is_being_dragged = true;
        }
        assert!(!is_solved(&board, &tiles));
    }

    #[test]
    fn empty_board_is_not_solved() {
        let board = Board::new(3, DEFAULT_BOARD_SIZE);
        assert!(!is_solved(&board, &[]));
    }
}
