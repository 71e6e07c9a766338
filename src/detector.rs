//! Run detection: maximal same-colour runs of 3+ along rows and columns.
//!
//! Each qualifying run becomes its own `MatchGroup`. A tile at the crossing of a horizontal
//! and a vertical run belongs to both groups; the groups are never merged.

use crate::arena::TileId;
use crate::color::{GemColor, MatchTier};
use crate::grid::{CellPos, Grid};
use std::collections::BTreeSet;

/// Shortest run that counts as a match.
pub const MIN_RUN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// One qualifying run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchGroup {
    pub color: GemColor,
    pub orientation: Orientation,
    /// Cells in scan order (left to right, or bottom to top).
    pub cells: Vec<CellPos>,
    /// Tiles in the same order as `cells`.
    pub tiles: Vec<TileId>,
}

impl MatchGroup {
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn tier(&self) -> MatchTier {
        MatchTier::from_run_len(self.len())
    }
}

/// Scan the whole grid. Horizontal groups come first (bottom row up), then vertical groups
/// (left column first).
pub fn find_groups(grid: &Grid) -> Vec<MatchGroup> {
    let mut groups = Vec::new();
    for row in 0..grid.rows() {
        scan_line(
            grid,
            (0..grid.cols()).map(|col| CellPos::new(row, col)),
            Orientation::Horizontal,
            &mut groups,
        );
    }
    for col in 0..grid.cols() {
        scan_line(
            grid,
            (0..grid.rows()).map(|row| CellPos::new(row, col)),
            Orientation::Vertical,
            &mut groups,
        );
    }
    groups
}

fn scan_line(
    grid: &Grid,
    line: impl Iterator<Item = CellPos>,
    orientation: Orientation,
    out: &mut Vec<MatchGroup>,
) {
    let mut run: Option<MatchGroup> = None;
    for pos in line {
        let tile = grid.tile_at(pos).filter(|t| t.color.is_matchable());
        match (run.as_mut(), tile) {
            (Some(current), Some(tile)) if current.color == tile.color => {
                current.cells.push(pos);
                current.tiles.push(tile.id);
            }
            (_, tile) => {
                flush(run.take(), out);
                run = tile.map(|tile| MatchGroup {
                    color: tile.color,
                    orientation,
                    cells: vec![pos],
                    tiles: vec![tile.id],
                });
            }
        }
    }
    flush(run, out);
}

#[inline]
fn flush(run: Option<MatchGroup>, out: &mut Vec<MatchGroup>) {
    if let Some(run) = run.filter(|r| r.len() >= MIN_RUN) {
        out.push(run);
    }
}

/// Union of every group's cells.
pub fn matched_cells(groups: &[MatchGroup]) -> BTreeSet<CellPos> {
    groups.iter().flat_map(|g| g.cells.iter().copied()).collect()
}

/// How far a colour reaches when placed at a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reach {
    /// Only already-generated neighbours: left and below.
    Behind,
    /// Both directions on each axis.
    Both,
}

/// Count same-coloured neighbours of `pos` walking by `(dr, dc)`, ignoring `pos` itself.
fn count_from(grid: &Grid, pos: CellPos, color: GemColor, dr: isize, dc: isize) -> usize {
    let mut count = 0;
    let (mut row, mut col) = (pos.row as isize + dr, pos.col as isize + dc);
    while grid.in_bounds_signed(row, col)
        && grid.color_at(CellPos::new(row as usize, col as usize)) == Some(color)
    {
        count += 1;
        row += dr;
        col += dc;
    }
    count
}

/// Would a tile of `color` at `pos` sit inside a run of 3+?
/// The current occupant of `pos` is ignored.
pub fn would_match(grid: &Grid, pos: CellPos, color: GemColor, reach: Reach) -> bool {
    if !color.is_matchable() {
        return false;
    }
    let (horizontal, vertical) = match reach {
        Reach::Behind => (
            count_from(grid, pos, color, 0, -1),
            count_from(grid, pos, color, -1, 0),
        ),
        Reach::Both => (
            count_from(grid, pos, color, 0, -1) + count_from(grid, pos, color, 0, 1),
            count_from(grid, pos, color, -1, 0) + count_from(grid, pos, color, 1, 0),
        ),
    };
    horizontal + 1 >= MIN_RUN || vertical + 1 >= MIN_RUN
}

/// Does the tile currently at `pos` take part in a run of 3+?
pub fn has_match_at(grid: &Grid, pos: CellPos) -> bool {
    grid.color_at(pos)
        .is_some_and(|color| would_match(grid, pos, color, Reach::Both))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::TileArena;
    use crate::grid::Tile;
    use GemColor::{Blue as B, Green as G, None as N, Red as R, Yellow as Y};

    /// Rows are listed top first, the way they read on screen.
    fn grid_from(rows_top_first: &[&[GemColor]]) -> Grid {
        let mut arena = TileArena::new();
        let rows = rows_top_first.len();
        let cols = rows_top_first[0].len();
        let mut grid = Grid::new(rows, cols);
        for (i, line) in rows_top_first.iter().enumerate() {
            for (col, &color) in line.iter().enumerate() {
                let id = arena.alloc();
                grid.set_tile(CellPos::new(rows - 1 - i, col), Some(Tile { id, color }));
            }
        }
        grid
    }

    #[test]
    fn empty_result_for_quiet_grid() {
        let grid = grid_from(&[&[R, G, B], &[G, B, R], &[B, R, G]]);
        assert!(find_groups(&grid).is_empty());
    }

    #[test]
    fn maximal_run_is_one_group() {
        let grid = grid_from(&[&[G, B, G, B, G], &[R, R, R, R, B]]);
        let groups = find_groups(&grid);
        assert_eq!(groups.len(), 1);
        let g = &groups[0];
        assert_eq!(g.color, R);
        assert_eq!(g.orientation, Orientation::Horizontal);
        assert_eq!(g.len(), 4);
        assert_eq!(g.tier(), MatchTier::Four);
        assert_eq!(g.cells[0], CellPos::new(0, 0));
        assert_eq!(g.cells[3], CellPos::new(0, 3));
    }

    #[test]
    fn l_shape_yields_two_groups() {
        let grid = grid_from(&[
            &[R, G, B, G], //
            &[R, B, G, B],
            &[R, R, R, G],
        ]);
        let groups = find_groups(&grid);
        assert_eq!(groups.len(), 2);
        let corner = CellPos::new(0, 0);
        assert!(groups.iter().all(|g| g.cells.contains(&corner)));
        assert_eq!(groups[0].orientation, Orientation::Horizontal);
        assert_eq!(groups[1].orientation, Orientation::Vertical);
        assert_eq!(groups[0].tiles[0], groups[1].tiles[0]);
        assert_eq!(matched_cells(&groups).len(), 5);
    }

    #[test]
    fn sentinel_and_gaps_end_runs() {
        let grid = grid_from(&[&[N, N, N, R, R, Y, R]]);
        assert!(find_groups(&grid).is_empty());

        let mut arena = TileArena::new();
        let mut sparse = Grid::new(1, 5);
        for col in [0, 1, 3, 4] {
            sparse.set_tile(
                CellPos::new(0, col),
                Some(Tile {
                    id: arena.alloc(),
                    color: R,
                }),
            );
        }
        assert!(find_groups(&sparse).is_empty());
    }

    #[test]
    fn union_equals_cells_in_runs() {
        let grid = grid_from(&[
            &[Y, Y, Y, B, G],
            &[G, B, R, B, G],
            &[R, R, R, B, G],
        ]);
        let groups = find_groups(&grid);
        assert!(groups.iter().all(|g| g.len() >= MIN_RUN));
        let expected: BTreeSet<CellPos> = grid
            .positions()
            .filter(|&p| has_match_at(&grid, p))
            .collect();
        assert_eq!(matched_cells(&groups), expected);
        assert_eq!(groups.len(), 4);
    }

    #[test]
    fn point_queries() {
        let grid = grid_from(&[&[G, R, G], &[R, G, R], &[R, R, B]]);
        // Bottom row is R R B; the cell above the left R is R too.
        assert!(!has_match_at(&grid, CellPos::new(0, 0)));
        assert!(would_match(&grid, CellPos::new(0, 2), R, Reach::Both));
        assert!(would_match(&grid, CellPos::new(0, 2), R, Reach::Behind));
        assert!(would_match(&grid, CellPos::new(2, 0), R, Reach::Behind));
        assert!(!would_match(&grid, CellPos::new(2, 0), G, Reach::Behind));
        assert!(!would_match(&grid, CellPos::new(0, 2), N, Reach::Both));
    }
}
