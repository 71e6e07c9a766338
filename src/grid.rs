//! Grid model: rows × cols slots, each holding a tile or nothing. Row 0 is the bottom row.

use crate::arena::TileId;
use crate::color::GemColor;

/// A cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    #[inline]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl std::fmt::Display for CellPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Cardinal swap direction. `Up` points towards higher rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// (row delta, col delta).
    pub fn offset(self) -> (isize, isize) {
        match self {
            Self::Up => (1, 0),
            Self::Down => (-1, 0),
            Self::Left => (0, -1),
            Self::Right => (0, 1),
        }
    }
}

/// A gem sitting in a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub id: TileId,
    pub color: GemColor,
}

/// The board array. Out-of-bounds reads return `None`; out-of-bounds writes are ignored.
#[derive(Debug, Clone)]
pub struct Grid {
    rows: usize,
    cols: usize,
    /// cells[row * cols + col]
    cells: Vec<Option<Tile>>,
}

impl Grid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![None; rows * cols],
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn in_bounds(&self, pos: CellPos) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    /// Signed bounds check, for coordinates that may have walked off the board.
    #[inline]
    pub fn in_bounds_signed(&self, row: isize, col: isize) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.rows && (col as usize) < self.cols
    }

    /// Neighbour of `pos` in `dir`, if it is on the board.
    pub fn neighbor(&self, pos: CellPos, dir: Direction) -> Option<CellPos> {
        let (dr, dc) = dir.offset();
        let row = pos.row as isize + dr;
        let col = pos.col as isize + dc;
        self.in_bounds_signed(row, col)
            .then(|| CellPos::new(row as usize, col as usize))
    }

    #[inline]
    fn index(&self, pos: CellPos) -> usize {
        pos.row * self.cols + pos.col
    }

    #[inline]
    pub fn tile_at(&self, pos: CellPos) -> Option<Tile> {
        if !self.in_bounds(pos) {
            return None;
        }
        self.cells[self.index(pos)]
    }

    /// Colour at `pos`, or `None` for an empty or off-board cell.
    #[inline]
    pub fn color_at(&self, pos: CellPos) -> Option<GemColor> {
        self.tile_at(pos).map(|t| t.color)
    }

    #[inline]
    pub fn set_tile(&mut self, pos: CellPos, tile: Option<Tile>) {
        if self.in_bounds(pos) {
            let i = self.index(pos);
            self.cells[i] = tile;
        }
    }

    /// Empty the slot, returning what was there.
    pub fn take(&mut self, pos: CellPos) -> Option<Tile> {
        if !self.in_bounds(pos) {
            return None;
        }
        let i = self.index(pos);
        self.cells[i].take()
    }

    /// Recolour the tile in place. Returns false if the slot is empty.
    pub fn set_color(&mut self, pos: CellPos, color: GemColor) -> bool {
        if !self.in_bounds(pos) {
            return false;
        }
        let i = self.index(pos);
        match self.cells[i].as_mut() {
            Some(tile) => {
                tile.color = color;
                true
            }
            None => false,
        }
    }

    pub fn swap(&mut self, a: CellPos, b: CellPos) {
        if self.in_bounds(a) && self.in_bounds(b) {
            let (ia, ib) = (self.index(a), self.index(b));
            self.cells.swap(ia, ib);
        }
    }

    /// All cell coordinates, row-major from the bottom row.
    pub fn positions(&self) -> impl Iterator<Item = CellPos> + use<> {
        let (rows, cols) = (self.rows, self.cols);
        (0..rows).flat_map(move |row| (0..cols).map(move |col| CellPos::new(row, col)))
    }

    /// Occupied cells with their tiles.
    pub fn tiles(&self) -> impl Iterator<Item = (CellPos, Tile)> + '_ {
        self.positions()
            .filter_map(|pos| self.tile_at(pos).map(|t| (pos, t)))
    }

    pub fn empty_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_none()).count()
    }

    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::TileArena;

    #[test]
    fn bounds_and_slots() {
        let mut arena = TileArena::new();
        let mut grid = Grid::new(3, 4);
        assert!(grid.in_bounds(CellPos::new(2, 3)));
        assert!(!grid.in_bounds(CellPos::new(3, 0)));
        assert!(!grid.in_bounds_signed(-1, 0));

        let tile = Tile {
            id: arena.alloc(),
            color: GemColor::Red,
        };
        grid.set_tile(CellPos::new(1, 2), Some(tile));
        assert_eq!(grid.tile_at(CellPos::new(1, 2)), Some(tile));

        // Ignored, not a panic.
        grid.set_tile(CellPos::new(9, 9), Some(tile));
        assert_eq!(grid.tile_at(CellPos::new(9, 9)), None);

        assert_eq!(grid.take(CellPos::new(1, 2)), Some(tile));
        assert_eq!(grid.empty_count(), 12);
    }

    #[test]
    fn neighbours_respect_edges() {
        let grid = Grid::new(8, 8);
        let corner = CellPos::new(0, 0);
        assert_eq!(grid.neighbor(corner, Direction::Down), None);
        assert_eq!(grid.neighbor(corner, Direction::Left), None);
        assert_eq!(
            grid.neighbor(corner, Direction::Up),
            Some(CellPos::new(1, 0))
        );
        assert_eq!(
            grid.neighbor(CellPos::new(2, 2), Direction::Right),
            Some(CellPos::new(2, 3))
        );
    }

    #[test]
    fn swap_and_recolour() {
        let mut arena = TileArena::new();
        let mut grid = Grid::new(2, 2);
        let a = CellPos::new(0, 0);
        let b = CellPos::new(0, 1);
        grid.set_tile(
            a,
            Some(Tile {
                id: arena.alloc(),
                color: GemColor::Blue,
            }),
        );
        grid.swap(a, b);
        assert_eq!(grid.color_at(a), None);
        assert_eq!(grid.color_at(b), Some(GemColor::Blue));
        assert!(grid.set_color(b, GemColor::None));
        assert!(!grid.set_color(a, GemColor::None));
        assert_eq!(grid.color_at(b), Some(GemColor::None));
    }
}
