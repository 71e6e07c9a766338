//! The board: owns the grid and drives swaps, cascades and cell disabling.
//!
//! Nothing here waits on animation. Every tile move goes out to the [`TileMover`] with a
//! ticket from the [`MovementGate`]; the board only moves on once the last ticket of a batch
//! comes back (through [`Board::tick`] or [`Board::on_move_complete`]).

use crate::arena::{TileArena, TileId, TileState};
use crate::clock::TimeScale;
use crate::color::{self, GemColor};
use crate::config::{BoardConfig, RefillPolicy};
use crate::detector::{self, Reach};
use crate::error::{BoardError, SwapError};
use crate::events::{BoardEvent, EventBus, SubscriptionId};
use crate::gate::{GateSignal, MoveTicket, MovementGate};
use crate::grid::{CellPos, Direction, Grid, Tile};
use crate::layout::{BoardLayout, Point};
use crate::mover::{MoveKind, MoveRequest, TileMover};
use crate::tracker::PendingGroups;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::mpsc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// What the board is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not initialised, or shut down.
    Stopped,
    /// At rest; swaps are accepted.
    Idle,
    /// A player swap is animating. Validated once it settles.
    Swapping { from: CellPos, to: CellPos },
    /// A rejected swap is being put back.
    Reverting,
    /// Removal, gravity, refill (or the initial spawn) is animating.
    Cascading,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    tile: TileId,
    kind: MoveKind,
}

pub struct Board<M, R> {
    config: BoardConfig,
    layout: BoardLayout,
    palette: &'static [GemColor],
    grid: Grid,
    arena: TileArena,
    tracker: PendingGroups,
    gate: MovementGate,
    mover: M,
    rng: R,
    events: EventBus,
    clock: TimeScale,
    phase: Phase,
    busy: bool,
    in_flight: HashMap<MoveTicket, InFlight>,
    /// Resolve passes that found groups since the cascade started.
    passes: u32,
}

impl<M: TileMover> Board<M, StdRng> {
    /// Board with its RNG seeded from `config.seed`.
    pub fn seeded(config: BoardConfig, mover: M) -> Result<Self, BoardError> {
        let rng = StdRng::seed_from_u64(config.seed);
        Self::new(config, mover, rng)
    }
}

impl<M: TileMover, R: Rng> Board<M, R> {
    /// An empty, stopped board. Call [`Board::init`] to fill it.
    pub fn new(config: BoardConfig, mover: M, rng: R) -> Result<Self, BoardError> {
        config.validate()?;
        Ok(Self {
            layout: config.layout(),
            palette: color::palette(config.palette_size),
            grid: Grid::new(config.rows, config.cols),
            config,
            arena: TileArena::new(),
            tracker: PendingGroups::new(),
            gate: MovementGate::new(),
            mover,
            rng,
            events: EventBus::new(),
            clock: TimeScale::default(),
            phase: Phase::Stopped,
            busy: false,
            in_flight: HashMap::new(),
            passes: 0,
        })
    }

    /// A board at rest holding exactly `rows_top_first` (rows listed top first, the way they
    /// read on screen). Rejects layouts that already contain a run.
    pub fn from_layout(
        config: BoardConfig,
        mover: M,
        rng: R,
        rows_top_first: &[&[GemColor]],
    ) -> Result<Self, BoardError> {
        let mut board = Self::new(config, mover, rng)?;
        let (rows, cols) = (board.config.rows, board.config.cols);
        let layout_cols = rows_top_first.first().map_or(0, |r| r.len());
        if rows_top_first.len() != rows || rows_top_first.iter().any(|r| r.len() != cols) {
            return Err(BoardError::LayoutSize {
                rows: rows_top_first.len(),
                cols: layout_cols,
                expected_rows: rows,
                expected_cols: cols,
            });
        }
        for (i, line) in rows_top_first.iter().enumerate() {
            for (col, &color) in line.iter().enumerate() {
                let id = board.arena.alloc();
                board
                    .grid
                    .set_tile(CellPos::new(rows - 1 - i, col), Some(Tile { id, color }));
            }
        }
        if let Some(group) = detector::find_groups(&board.grid).first() {
            return Err(BoardError::InitialMatch(group.cells[0]));
        }
        board.phase = Phase::Idle;
        Ok(board)
    }

    /// Generate a fresh match-free board and spawn it in from above. Anything already on the
    /// board is discarded first.
    pub fn init(&mut self) -> Result<(), BoardError> {
        self.discard_all();
        self.phase = Phase::Stopped;
        self.generate()?;
        self.phase = Phase::Cascading;
        self.settle_if_quiet();
        Ok(())
    }

    /// Throw the current board away and spawn a new one. Groups still waiting on absorption
    /// are abandoned and never report.
    pub fn regenerate(&mut self) -> Result<(), BoardError> {
        debug!(target: "board", "regenerate");
        self.init()
    }

    /// Cancel every move, abandon pending groups and drop all subscribers.
    pub fn shutdown(&mut self) {
        self.discard_all();
        self.events.clear();
        self.phase = Phase::Stopped;
        debug!(target: "board", "shutdown");
    }

    fn generate(&mut self) -> Result<(), BoardError> {
        let attempts = self.config.spawn_attempts;
        for pos in self.grid.positions() {
            let Some(color) = pick_color(
                &self.grid,
                pos,
                &mut self.rng,
                self.palette,
                attempts,
                Reach::Behind,
            ) else {
                self.grid.clear();
                self.arena.clear();
                return Err(BoardError::GenerationStuck {
                    row: pos.row,
                    col: pos.col,
                    attempts,
                });
            };
            let id = self.arena.alloc();
            self.grid.set_tile(pos, Some(Tile { id, color }));
        }
        for (pos, tile) in self.grid.tiles().collect::<Vec<_>>() {
            let from = self.layout.spawn_point(pos.col, pos.row);
            let to = self.layout.cell_to_world(pos);
            self.issue_move(tile.id, from, to, MoveKind::Spawn);
        }
        debug!(target: "board", rows = self.grid.rows(), cols = self.grid.cols(), "board_generated");
        Ok(())
    }

    /// Cancel all moves with their completions, and empty grid, tracker and arena.
    fn discard_all(&mut self) {
        let cancelled = self.mover.clear_all();
        let expected = self.in_flight.len();
        if cancelled.len() != expected {
            warn!(target: "gate", cancelled = cancelled.len(), expected, "mover_dropped_tickets");
        }
        for (ticket, _) in self.in_flight.drain() {
            self.gate.complete(ticket);
        }
        self.tracker.abandon_all();
        self.grid.clear();
        self.arena.clear();
        self.passes = 0;
    }

    /// Feed one frame of real time through the clock to the mover.
    pub fn tick(&mut self, real_dt: Duration) {
        let dt = self.clock.scaled(real_dt);
        let done = self.mover.advance(dt);
        for ticket in done {
            self.on_move_complete(ticket);
        }
    }

    /// Completion call-in for one move. Unknown or repeated tickets are ignored.
    pub fn on_move_complete(&mut self, ticket: MoveTicket) {
        let Some(flight) = self.in_flight.remove(&ticket) else {
            warn!(target: "gate", %ticket, "late_ticket");
            return;
        };
        if flight.kind == MoveKind::Absorb {
            self.absorbed(flight.tile);
        }
        if self.gate.complete(ticket) == GateSignal::Settled {
            self.on_settled();
        }
    }

    fn absorbed(&mut self, tile: TileId) {
        debug_assert_eq!(self.arena.state(tile), Some(TileState::InFlight));
        for done in self.tracker.notify_absorbed(tile) {
            self.events.emit(BoardEvent::GroupAbsorbed {
                color: done.color,
                tier: done.tier,
            });
        }
        self.arena.release(tile);
    }

    fn on_settled(&mut self) {
        match self.phase {
            Phase::Swapping { from, to } => {
                if detector::has_match_at(&self.grid, from) || detector::has_match_at(&self.grid, to)
                {
                    debug!(target: "board", %from, %to, "swap_accepted");
                    self.phase = Phase::Cascading;
                    self.passes = 0;
                    self.resolve_pass();
                } else {
                    debug!(target: "board", %from, %to, "swap_reverted");
                    self.phase = Phase::Reverting;
                    self.swap_tiles(from, to);
                    self.events.emit(BoardEvent::SwapReverted { from, to });
                    self.settle_if_quiet();
                }
            }
            Phase::Reverting => self.phase = Phase::Idle,
            Phase::Cascading => self.resolve_pass(),
            Phase::Idle | Phase::Stopped => {}
        }
    }

    /// Re-run `on_settled` for a batch that issued no moves at all.
    fn settle_if_quiet(&mut self) {
        if self.gate.is_settled() {
            self.on_settled();
        }
    }

    /// Detect, register, remove, drop and refill. With nothing detected the cascade ends.
    fn resolve_pass(&mut self) {
        let groups = detector::find_groups(&self.grid);
        if groups.is_empty() {
            let passes = std::mem::take(&mut self.passes);
            self.phase = Phase::Idle;
            debug!(target: "cascade", passes, "cascade_settled");
            self.events.emit(BoardEvent::CascadeSettled { passes });
            return;
        }
        self.passes += 1;
        for group in &groups {
            self.events.emit(BoardEvent::MatchFound {
                color: group.color,
                tier: group.tier(),
            });
        }
        self.tracker.register(&groups);

        let cells = detector::matched_cells(&groups);
        for &pos in &cells {
            if let Some(tile) = self.grid.take(pos) {
                self.arena.set_state(tile.id, TileState::InFlight);
                let at = self.layout.cell_to_world(pos);
                self.issue_move(tile.id, at, at, MoveKind::Absorb);
            }
        }
        let fallen = self.apply_gravity();
        let spawned = self.refill();
        debug!(
            target: "cascade",
            pass = self.passes,
            groups = groups.len(),
            removed = cells.len(),
            fallen,
            spawned,
            "cascade_pass"
        );
        self.phase = Phase::Cascading;
        self.settle_if_quiet();
    }

    /// Compact every column downwards. Returns how many tiles moved.
    fn apply_gravity(&mut self) -> usize {
        let mut moved = 0;
        for col in 0..self.grid.cols() {
            let mut write = 0;
            for row in 0..self.grid.rows() {
                let pos = CellPos::new(row, col);
                let Some(tile) = self.grid.tile_at(pos) else {
                    continue;
                };
                if row != write {
                    let dst = CellPos::new(write, col);
                    let falling = self.grid.take(pos);
                    self.grid.set_tile(dst, falling);
                    let (from, to) = (self.layout.cell_to_world(pos), self.layout.cell_to_world(dst));
                    self.issue_move(tile.id, from, to, MoveKind::Fall);
                    moved += 1;
                }
                write += 1;
            }
        }
        moved
    }

    /// Spawn a tile into every empty slot, stacked above its column. Returns how many.
    fn refill(&mut self) -> usize {
        let mut spawned = 0;
        for col in 0..self.grid.cols() {
            let mut slot = 0;
            for row in 0..self.grid.rows() {
                let pos = CellPos::new(row, col);
                if self.grid.tile_at(pos).is_some() {
                    continue;
                }
                let color = self.spawn_color(pos);
                let id = self.arena.alloc();
                self.grid.set_tile(pos, Some(Tile { id, color }));
                let from = self.layout.spawn_point(col, slot);
                self.issue_move(id, from, self.layout.cell_to_world(pos), MoveKind::Spawn);
                slot += 1;
                spawned += 1;
            }
        }
        spawned
    }

    fn spawn_color(&mut self, pos: CellPos) -> GemColor {
        match self.config.refill {
            RefillPolicy::AllowCascades => color::random_color(&mut self.rng, self.palette),
            RefillPolicy::AvoidImmediateMatches => pick_color(
                &self.grid,
                pos,
                &mut self.rng,
                self.palette,
                self.config.spawn_attempts,
                Reach::Both,
            )
            .unwrap_or_else(|| {
                warn!(target: "cascade", %pos, "refill_match_unavoidable");
                color::random_color(&mut self.rng, self.palette)
            }),
        }
    }

    fn issue_move(&mut self, tile: TileId, from: Point, to: Point, kind: MoveKind) {
        let ticket = self.gate.issue();
        self.in_flight.insert(ticket, InFlight { tile, kind });
        self.mover.enqueue(MoveRequest {
            ticket,
            tile,
            from: Some(from),
            to,
            kind,
        });
    }

    /// Exchange two slots and animate whatever they hold.
    fn swap_tiles(&mut self, a: CellPos, b: CellPos) {
        self.grid.swap(a, b);
        for (src, dst) in [(a, b), (b, a)] {
            if let Some(tile) = self.grid.tile_at(dst) {
                let (from, to) = (self.layout.cell_to_world(src), self.layout.cell_to_world(dst));
                self.issue_move(tile.id, from, to, MoveKind::Swap);
            }
        }
    }

    /// Swap the tile at `pos` with its neighbour in `dir`. `Ok` only means the swap started;
    /// a swap that makes no match is put back once it settles.
    pub fn request_swap(&mut self, pos: CellPos, dir: Direction) -> Result<(), SwapError> {
        if self.busy {
            trace!(target: "board", %pos, "swap_ignored_busy");
            return Err(SwapError::Busy);
        }
        match self.phase {
            Phase::Idle => {}
            Phase::Stopped => return Err(SwapError::Stopped),
            _ => return Err(SwapError::Resolving),
        }
        let to = self
            .grid
            .in_bounds(pos)
            .then(|| self.grid.neighbor(pos, dir))
            .flatten()
            .ok_or(SwapError::OutOfBounds { from: pos })?;
        debug!(target: "board", from = %pos, %to, "swap_requested");
        self.phase = Phase::Swapping { from: pos, to };
        self.swap_tiles(pos, to);
        self.settle_if_quiet();
        Ok(())
    }

    /// Resolve whatever the grid holds right now. Returns false (and does nothing) unless the
    /// board is idle with at least one run on it.
    pub fn request_resolve(&mut self) -> bool {
        if self.phase != Phase::Idle || detector::find_groups(&self.grid).is_empty() {
            return false;
        }
        self.passes = 0;
        self.phase = Phase::Cascading;
        self.resolve_pass();
        true
    }

    /// Turn each target's tile inert in place. Cells that hold no live colour (already inert,
    /// or emptied mid-cascade) come back in the returned list. Any out-of-bounds target
    /// rejects the whole call before anything changes.
    pub fn disable_cells(&mut self, cells: &[CellPos]) -> Result<Vec<CellPos>, BoardError> {
        if let Some(&bad) = cells.iter().find(|&&pos| !self.grid.in_bounds(pos)) {
            return Err(BoardError::out_of_bounds(bad));
        }
        let (failed, count) = self.disable_in_bounds(cells);
        if count > 0 {
            self.events.emit(BoardEvent::CellsDisabled { count });
        }
        Ok(failed)
    }

    fn disable_in_bounds(&mut self, cells: &[CellPos]) -> (Vec<CellPos>, usize) {
        let mut failed = Vec::new();
        let mut count = 0;
        for &pos in cells {
            match self.grid.color_at(pos) {
                Some(c) if c.is_matchable() => {
                    self.grid.set_color(pos, GemColor::None);
                    count += 1;
                }
                _ => failed.push(pos),
            }
        }
        (failed, count)
    }

    /// Disable `count` random cells, re-picking only the misses, for at most `attempts`
    /// rounds. Returns how many cells were disabled; falling short is not an error.
    pub fn disable_random(&mut self, count: usize, attempts: u32) -> usize {
        let positions: Vec<CellPos> = self.grid.positions().collect();
        let mut remaining = count;
        let mut disabled = 0;
        for _ in 0..attempts {
            if remaining == 0 {
                break;
            }
            let picks: Vec<CellPos> = positions
                .choose_multiple(&mut self.rng, remaining)
                .copied()
                .collect();
            let (failed, done) = self.disable_in_bounds(&picks);
            disabled += done;
            remaining = failed.len();
        }
        if remaining > 0 {
            warn!(target: "board", requested = count, disabled, "disable_budget_exhausted");
        }
        if disabled > 0 {
            self.events.emit(BoardEvent::CellsDisabled { count: disabled });
        }
        disabled
    }

    /// While busy, swaps are rejected. Cascades already running carry on.
    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
        debug!(target: "board", busy, "busy_set");
    }

    #[inline]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// World position of a cell centre, or `None` off the board.
    pub fn cell_to_world(&self, pos: CellPos) -> Option<Point> {
        self.grid
            .in_bounds(pos)
            .then(|| self.layout.cell_to_world(pos))
    }

    pub fn world_to_cell(&self, point: Point) -> Option<CellPos> {
        self.layout.world_to_cell(point)
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&BoardEvent) + 'static,
    {
        self.events.subscribe(listener)
    }

    pub fn channel(&mut self) -> (SubscriptionId, mpsc::Receiver<BoardEvent>) {
        self.events.channel()
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    #[inline]
    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    #[inline]
    pub fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// Moves issued and not yet reported back.
    #[inline]
    pub fn pending_moves(&self) -> usize {
        self.gate.pending()
    }

    #[inline]
    pub fn tracker(&self) -> &PendingGroups {
        &self.tracker
    }

    /// Live tiles: resident in the grid plus those still absorbing.
    #[inline]
    pub fn live_tiles(&self) -> usize {
        self.arena.len()
    }

    /// Tiles that have left the grid and are still playing their absorb animation.
    pub fn absorbing_tiles(&self) -> usize {
        self.arena.count_in(TileState::InFlight)
    }

    #[inline]
    pub fn mover(&self) -> &M {
        &self.mover
    }

    /// Tickets taken out of the mover directly must be handed back through
    /// [`Board::on_move_complete`].
    #[inline]
    pub fn mover_mut(&mut self) -> &mut M {
        &mut self.mover
    }

    #[inline]
    pub fn time_scale(&self) -> &TimeScale {
        &self.clock
    }

    #[inline]
    pub fn time_scale_mut(&mut self) -> &mut TimeScale {
        &mut self.clock
    }
}

/// Random colour for `pos` that does not complete a run within `reach`, re-rolled to a
/// different colour each miss. `None` once `attempts` colours have all matched.
fn pick_color<R: Rng + ?Sized>(
    grid: &Grid,
    pos: CellPos,
    rng: &mut R,
    palette: &[GemColor],
    attempts: u32,
    reach: Reach,
) -> Option<GemColor> {
    let mut color = color::random_color(rng, palette);
    for _ in 0..attempts {
        if !detector::would_match(grid, pos, color, reach) {
            return Some(color);
        }
        color = color::random_color_except(rng, palette, color).unwrap_or(color);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mover::{MoverConfig, Tweener};
    use GemColor::{Blue as B, Green as G, Red as R, Yellow as Y};

    fn quiet_3x3() -> Board<Tweener, StdRng> {
        let config = BoardConfig {
            rows: 3,
            cols: 3,
            ..BoardConfig::default()
        };
        Board::from_layout(
            config,
            Tweener::new(MoverConfig::default()),
            StdRng::seed_from_u64(7),
            &[&[R, G, B], &[G, B, Y], &[B, Y, R]],
        )
        .unwrap()
    }

    #[test]
    fn pick_color_gives_up_when_boxed_in() {
        let mut arena = crate::arena::TileArena::new();
        let mut grid = Grid::new(3, 3);
        for (pos, color) in [
            (CellPos::new(2, 0), R),
            (CellPos::new(2, 1), R),
            (CellPos::new(0, 2), G),
            (CellPos::new(1, 2), G),
        ] {
            grid.set_tile(
                pos,
                Some(Tile {
                    id: arena.alloc(),
                    color,
                }),
            );
        }
        let mut rng = StdRng::seed_from_u64(1);
        let two = color::palette(2);
        let stuck = pick_color(&grid, CellPos::new(2, 2), &mut rng, two, 100, Reach::Behind);
        assert_eq!(stuck, None);

        let free = pick_color(&grid, CellPos::new(1, 1), &mut rng, two, 100, Reach::Behind);
        assert!(free.is_some());
    }

    #[test]
    fn generation_spawns_a_quiet_board_from_above() {
        let mut board = Board::seeded(BoardConfig::default(), Tweener::new(MoverConfig::default()))
            .unwrap();
        board.init().unwrap();
        assert_eq!(board.phase(), Phase::Cascading);
        assert_eq!(board.grid().empty_count(), 0);
        assert!(detector::find_groups(board.grid()).is_empty());
        assert_eq!(board.pending_moves(), 64);

        for _ in 0..60 {
            board.tick(Duration::from_millis(16));
        }
        assert_eq!(board.phase(), Phase::Idle);
        assert_eq!(board.pending_moves(), 0);
    }

    #[test]
    fn swap_rejections() {
        let mut board = quiet_3x3();
        assert_eq!(
            board.request_swap(CellPos::new(0, 2), Direction::Right),
            Err(SwapError::OutOfBounds {
                from: CellPos::new(0, 2)
            })
        );
        board.set_busy(true);
        assert_eq!(
            board.request_swap(CellPos::new(0, 0), Direction::Up),
            Err(SwapError::Busy)
        );
        board.set_busy(false);
        board.request_swap(CellPos::new(0, 0), Direction::Up).unwrap();
        assert_eq!(
            board.request_swap(CellPos::new(1, 1), Direction::Up),
            Err(SwapError::Resolving)
        );
        board.shutdown();
        assert_eq!(
            board.request_swap(CellPos::new(1, 1), Direction::Up),
            Err(SwapError::Stopped)
        );
    }

    #[test]
    fn layout_with_a_run_is_refused() {
        let config = BoardConfig {
            rows: 3,
            cols: 3,
            ..BoardConfig::default()
        };
        let result = Board::from_layout(
            config,
            Tweener::new(MoverConfig::default()),
            StdRng::seed_from_u64(7),
            &[&[R, G, B], &[G, B, Y], &[R, R, R]],
        );
        assert!(matches!(result, Err(BoardError::InitialMatch(p)) if p == CellPos::new(0, 0)));
    }

    #[test]
    fn coordinates_round_trip_on_board_only() {
        let board = quiet_3x3();
        let p = board.cell_to_world(CellPos::new(2, 1)).unwrap();
        assert_eq!(board.world_to_cell(p), Some(CellPos::new(2, 1)));
        assert_eq!(board.cell_to_world(CellPos::new(3, 0)), None);
        assert_eq!(board.world_to_cell(Point::new(-5.0, 0.0)), None);
    }
}
