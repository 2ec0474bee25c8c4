use bevy::prelude::*;

/// Side length of the square board in board units.
pub const DEFAULT_BOARD_SIZE: f32 = 300.;

/// Two positions closer than this on both axes are the same grid slot.
pub const POSITION_TOLERANCE: f32 = 1.;

/// Returns true when `a` and `b` denote the same slot on the board.
pub fn same_position(a: Vec2, b: Vec2) -> bool {
    (a.x - b.x).abs() < POSITION_TOLERANCE && (a.y - b.y).abs() < POSITION_TOLERANCE
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
    /// Top-left corner in board coordinates (y grows downwards).
    pub origin: Vec2,
    pub occupant: Option<usize>,
}

impl GridCell {
    pub const fn index(&self, grid_size: usize) -> usize {
        self.row * grid_size + self.col
    }
}

/// Geometry of a `grid_size` x `grid_size` board.
///
/// Cells are derived values: they are recomputed from the grid size and the board size
/// whenever they are needed and never stored alongside the tiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Board {
    grid_size: usize,
    board_size: f32,
    tile_size: f32,
}

impl Board {
    pub fn new(grid_size: usize, board_size: f32) -> Self {
        let grid_size = grid_size.max(1);
        Self {
            grid_size,
            board_size,
            tile_size: board_size / grid_size as f32,
        }
    }

    pub const fn grid_size(&self) -> usize {
        self.grid_size
    }

    pub const fn board_size(&self) -> f32 {
        self.board_size
    }

    pub const fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub const fn cell_count(&self) -> usize {
        self.grid_size * self.grid_size
    }

    pub fn cell_at(&self, row: usize, col: usize) -> GridCell {
        GridCell {
            row,
            col,
            origin: Vec2::new(col as f32 * self.tile_size, row as f32 * self.tile_size),
            occupant: None,
        }
    }

    /// Cell for a row-major index, if it lies on the board.
    pub fn cell_by_index(&self, index: usize) -> Option<GridCell> {
        (index < self.cell_count()).then(|| self.cell_at(index / self.grid_size, index % self.grid_size))
    }

    /// Every cell of the board in row-major order, all unoccupied.
    pub fn cells(&self) -> Vec<GridCell> {
        (0..self.cell_count())
            .filter_map(|index| self.cell_by_index(index))
            .collect()
    }

    /// Snaps a release point to the closest cell.
    ///
    /// The point is clamped into the range of valid cell origins before rounding, so any
    /// point, including one far outside the board, resolves to a cell.
    pub fn nearest_cell(&self, point: Vec2) -> GridCell {
        let max_origin = (self.board_size - self.tile_size).max(0.);
        let last = (self.grid_size - 1) as f32;
        let x = point.x.clamp(0., max_origin);
        let y = point.y.clamp(0., max_origin);

        let col = (x / self.tile_size).round().clamp(0., last) as usize;
        let row = (y / self.tile_size).round().clamp(0., last) as usize;
        self.cell_at(row, col)
    }

    /// Cell whose area `[origin, origin + tile_size)` contains `point`.
    pub fn cell_containing(&self, point: Vec2) -> Option<GridCell> {
        if !(0. ..self.board_size).contains(&point.x) || !(0. ..self.board_size).contains(&point.y) {
            return None;
        }
        let col = ((point.x / self.tile_size) as usize).min(self.grid_size - 1);
        let row = ((point.y / self.tile_size) as usize).min(self.grid_size - 1);
        Some(self.cell_at(row, col))
    }

    /// Converts a cell origin in board space to the world position of the cell center.
    ///
    /// Board space has its origin at the top-left corner with y pointing down; the world
    /// is centered on the board with y pointing up.
    pub fn origin_to_world(&self, origin: Vec2) -> Vec2 {
        let half_board = self.board_size / 2.;
        let half_tile = self.tile_size / 2.;
        Vec2::new(
            origin.x + half_tile - half_board,
            half_board - origin.y - half_tile,
        )
    }

    /// Converts a world position to board space.
    pub fn world_to_board(&self, world: Vec2) -> Vec2 {
        let half_board = self.board_size / 2.;
        Vec2::new(world.x + half_board, half_board - world.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_partition_the_board() {
        for grid_size in 2..=6 {
            let board = Board::new(grid_size, DEFAULT_BOARD_SIZE);
            let cells = board.cells();
            assert_eq!(cells.len(), grid_size * grid_size, "one cell per slot");

            let step = DEFAULT_BOARD_SIZE / 60.;
            for ix in 0..60 {
                for iy in 0..60 {
                    let point = Vec2::new(ix as f32 * step + 0.1, iy as f32 * step + 0.1);
                    let owners = cells
                        .iter()
                        .filter(|cell| {
                            let max = cell.origin + Vec2::splat(board.tile_size());
                            point.x >= cell.origin.x
                                && point.x < max.x
                                && point.y >= cell.origin.y
                                && point.y < max.y
                        })
                        .count();
                    assert_eq!(owners, 1, "{point} must belong to exactly one cell");
                    let containing = board.cell_containing(point);
                    assert!(containing.is_some(), "{point} is on the board");
                }
            }
        }
    }

    #[test]
    fn cell_origin_follows_tile_size() {
        let board = Board::new(3, 300.);
        let cell = board.cell_at(2, 1);
        assert_eq!(cell.origin, Vec2::new(100., 200.));
        assert_eq!(cell.index(3), 7);
        assert_eq!(board.cell_by_index(7), Some(cell));
        assert_eq!(board.cell_by_index(9), None);
    }

    #[test]
    fn nearest_cell_rounds_to_closest() {
        let board = Board::new(3, 300.);
        let cell = board.nearest_cell(Vec2::new(149., 51.));
        assert_eq!((cell.row, cell.col), (1, 1));
        let cell = board.nearest_cell(Vec2::new(40., 160.));
        assert_eq!((cell.row, cell.col), (2, 0));
    }

    #[test]
    fn nearest_cell_clamps_outside_points() {
        let board = Board::new(3, 300.);
        let cell = board.nearest_cell(Vec2::new(-500., 10_000.));
        assert_eq!((cell.row, cell.col), (2, 0));
        let cell = board.nearest_cell(Vec2::new(290., -3.));
        assert_eq!((cell.row, cell.col), (0, 2));
    }

    #[test]
    fn single_cell_board_does_not_panic() {
        let board = Board::new(1, 300.);
        let cell = board.nearest_cell(Vec2::new(120., 80.));
        assert_eq!((cell.row, cell.col), (0, 0));
        assert_eq!(board.cells().len(), 1);
    }

    #[test]
    fn cell_containing_rejects_points_off_board() {
        let board = Board::new(3, 300.);
        assert!(board.cell_containing(Vec2::new(-1., 5.)).is_none());
        assert!(board.cell_containing(Vec2::new(5., 300.)).is_none());
    }

    #[test]
    fn world_conversion_round_trips() {
        let board = Board::new(3, 300.);
        let origin = board.cell_at(0, 2).origin;
        let world = board.origin_to_world(origin);
        assert_eq!(world, Vec2::new(100., 100.));
        let center = board.world_to_board(world);
        assert_eq!(board.cell_containing(center).map(|cell| (cell.row, cell.col)), Some((0, 2)));
    }
}
