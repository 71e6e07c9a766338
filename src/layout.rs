//! Cell ↔ world coordinates. World x grows with columns, y grows with rows.

use crate::grid::CellPos;

/// Position in board-local world units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unclamped linear interpolation.
    #[inline]
    pub fn lerp(self, to: Self, t: f32) -> Self {
        Self {
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
        }
    }

    #[inline]
    pub fn distance_sq(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Board geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardLayout {
    pub rows: usize,
    pub cols: usize,
    pub cell_size: f32,
    pub spacing: f32,
}

impl BoardLayout {
    /// Distance between neighbouring cell centres.
    #[inline]
    pub fn pitch(&self) -> f32 {
        self.cell_size + self.spacing
    }

    pub fn cell_to_world(&self, pos: CellPos) -> Point {
        self.slot_to_world(pos.row, pos.col)
    }

    /// Like `cell_to_world` but accepts rows past the top edge.
    pub fn slot_to_world(&self, row: usize, col: usize) -> Point {
        let pitch = self.pitch();
        Point::new(col as f32 * pitch, row as f32 * pitch)
    }

    /// Nearest cell to a world point, or `None` when it falls off the board.
    pub fn world_to_cell(&self, point: Point) -> Option<CellPos> {
        let pitch = self.pitch();
        let col = (point.x / pitch + 0.5).floor();
        let row = (point.y / pitch + 0.5).floor();
        if row < 0.0 || col < 0.0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        (row < self.rows && col < self.cols).then(|| CellPos::new(row, col))
    }

    /// Where the `slot`-th refill tile of a column starts, stacked above the top row.
    pub fn spawn_point(&self, col: usize, slot: usize) -> Point {
        self.slot_to_world(self.rows + slot, col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn layout() -> BoardLayout {
        BoardLayout {
            rows: 8,
            cols: 8,
            cell_size: 1.0,
            spacing: 0.05,
        }
    }

    #[test]
    fn cell_to_world_uses_pitch() {
        let p = layout().cell_to_world(CellPos::new(2, 3));
        assert_relative_eq!(p.x, 3.15, epsilon = 1e-5);
        assert_relative_eq!(p.y, 2.10, epsilon = 1e-5);
    }

    #[test]
    fn world_to_cell_rounds_to_nearest() {
        let l = layout();
        assert_eq!(
            l.world_to_cell(Point::new(3.4, 1.5)),
            Some(CellPos::new(1, 3))
        );
        assert_eq!(
            l.world_to_cell(Point::new(-0.3, 0.2)),
            Some(CellPos::new(0, 0))
        );
        assert_eq!(l.world_to_cell(Point::new(-0.9, 0.0)), None);
        assert_eq!(l.world_to_cell(Point::new(0.0, 8.3)), None);
    }

    #[test]
    fn roundtrips_every_cell() {
        let l = layout();
        for row in 0..l.rows {
            for col in 0..l.cols {
                let pos = CellPos::new(row, col);
                assert_eq!(l.world_to_cell(l.cell_to_world(pos)), Some(pos));
            }
        }
    }

    #[test]
    fn spawn_points_stack_above_board() {
        let l = layout();
        let first = l.spawn_point(4, 0);
        let second = l.spawn_point(4, 1);
        assert_relative_eq!(first.y, 8.0 * 1.05, epsilon = 1e-5);
        assert_relative_eq!(second.y - first.y, 1.05, epsilon = 1e-5);
        assert_eq!(l.world_to_cell(first), None);
    }
}
