use std::fmt::{self, Display, Formatter};

use bevy::prelude::*;

use crate::grid::{same_position, Board, GridCell};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    /// Row-major index at creation, stable for the whole attempt.
    pub id: usize,
    pub correct_row: usize,
    pub correct_col: usize,
    /// Canonical resting position in board coordinates. Always a cell origin.
    pub position: Vec2,
    pub is_being_dragged: bool,
}

impl Tile {
    pub const fn correct_position(&self, grid_size: usize) -> usize {
        self.correct_row * grid_size + self.correct_col
    }

    pub fn correct_origin(&self, board: &Board) -> Vec2 {
        board.cell_at(self.correct_row, self.correct_col).origin
    }

    pub fn is_home(&self, board: &Board) -> bool {
        same_position(self.position, self.correct_origin(board))
    }

    /// Area of the source image this tile shows, in image pixels.
    pub fn source_rect(&self, image_size: Vec2, grid_size: usize) -> Rect {
        let piece = image_size / grid_size.max(1) as f32;
        let min = Vec2::new(
            self.correct_col as f32 * piece.x,
            self.correct_row as f32 * piece.y,
        );
        Rect::from_corners(min, min + piece)
    }
}

/// One tile per cell, each sitting on its own correct cell.
pub fn build_tiles(board: &Board) -> Vec<Tile> {
    board
        .cells()
        .into_iter()
        .map(|cell| Tile {
            id: cell.index(board.grid_size()),
            correct_row: cell.row,
            correct_col: cell.col,
            position: cell.origin,
            is_being_dragged: false,
        })
        .collect()
}

/// Tiles together with the cells they were dealt onto.
#[derive(Debug, Clone)]
pub struct Placement {
    pub board: Board,
    pub tiles: Vec<Tile>,
    pub cells: Vec<GridCell>,
}

impl Placement {
    /// Tile ids read cell by cell in row-major order.
    pub fn occupants(&self) -> Vec<Option<usize>> {
        self.cells.iter().map(|cell| cell.occupant).collect()
    }
}

/// Deals `tiles` onto a uniformly random permutation of the board cells.
pub fn shuffle_and_place(board: &Board, mut tiles: Vec<Tile>, rng: &mut fastrand::Rng) -> Placement {
    let mut cells = board.cells();
    let mut order: Vec<usize> = (0..cells.len()).collect();
    rng.shuffle(&mut order);

    for (tile, &cell_index) in tiles.iter_mut().zip(&order) {
        if let Some(cell) = cells.get_mut(cell_index) {
            tile.position = cell.origin;
            tile.is_being_dragged = false;
            cell.occupant = Some(tile.id);
        }
    }

    let mut placement = Placement {
        board: *board,
        tiles,
        cells,
    };
    ensure_solvable(&mut placement);
    placement
}

/// Number of pairs `(i < j)` whose correct positions are out of order when the tiles are
/// read cell by cell.
pub fn inversion_count(placement: &Placement) -> usize {
    let grid_size = placement.board.grid_size();
    let sequence: Vec<usize> = placement
        .occupants()
        .into_iter()
        .flatten()
        .filter_map(|id| placement.tiles.iter().find(|tile| tile.id == id))
        .map(|tile| tile.correct_position(grid_size))
        .collect();

    sequence
        .iter()
        .enumerate()
        .map(|(i, a)| sequence.iter().skip(i + 1).filter(|b| a > *b).count())
        .sum()
}

/// On odd grids an odd inversion count is made even by exchanging the first two tiles.
fn ensure_solvable(placement: &mut Placement) {
    if placement.board.grid_size() % 2 == 0 || inversion_count(placement) % 2 == 0 {
        return;
    }
    let [first, second, ..] = placement.tiles.as_mut_slice() else {
        return;
    };
    std::mem::swap(&mut first.position, &mut second.position);
    let (first_id, second_id) = (first.id, second.id);

    for cell in &mut placement.cells {
        cell.occupant = match cell.occupant {
            Some(id) if id == first_id => Some(second_id),
            Some(id) if id == second_id => Some(first_id),
            other => other,
        };
    }
}

impl Display for Placement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let grid_size = self.board.grid_size();
        for (index, cell) in self.cells.iter().enumerate() {
            match cell.occupant {
                Some(id) => write!(f, "{id:>02} ")?,
                None => write!(f, "   ")?,
            }
            if (index + 1) % grid_size == 0 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
