//! Tile movement: the contract the board drives, and a tick-driven tweener implementing it.
//!
//! Every `enqueue`d request must come back as exactly one ticket, from `advance` when the
//! move finishes or from `clear`/`clear_all` when it is cancelled. The board counts on that
//! to know when the grid has settled.

use crate::arena::TileId;
use crate::gate::MoveTicket;
use crate::layout::Point;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;
use tracing::trace;

/// Why a tile is moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveKind {
    /// Player swap or its revert.
    Swap,
    /// Dropping into a lower slot after gravity.
    Fall,
    /// New tile entering from above the board.
    Spawn,
    /// Removal animation of a matched tile. The tile is gone once it completes.
    Absorb,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveRequest {
    pub ticket: MoveTicket,
    pub tile: TileId,
    /// Starting point for tiles the mover has not seen yet (spawns).
    pub from: Option<Point>,
    pub to: Point,
    pub kind: MoveKind,
}

/// The movement collaborator.
pub trait TileMover {
    /// Queue a move behind any moves already queued for the same tile.
    fn enqueue(&mut self, request: MoveRequest);

    /// Step animations by `dt`; returns the tickets of every move that finished.
    fn advance(&mut self, dt: Duration) -> Vec<MoveTicket>;

    /// Cancel every queued and running move of one tile, returning all their tickets.
    fn clear(&mut self, tile: TileId) -> Vec<MoveTicket>;

    /// Cancel everything, returning all outstanding tickets.
    fn clear_all(&mut self) -> Vec<MoveTicket>;
}

/// Tween timings per move kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoverConfig {
    pub swap: Duration,
    pub fall: Duration,
    pub spawn: Duration,
    pub absorb: Duration,
    /// Snap to the target once this close (world units).
    pub epsilon: f32,
}

impl Default for MoverConfig {
    fn default() -> Self {
        Self {
            swap: Duration::from_millis(200),
            fall: Duration::from_millis(200),
            spawn: Duration::from_millis(200),
            absorb: Duration::from_millis(350),
            epsilon: 0.01,
        }
    }
}

/// Shortest tween; keeps a zero duration from dividing by zero.
const MIN_STEP_SECS: f32 = 0.01;

impl MoverConfig {
    fn seconds(&self, kind: MoveKind) -> f32 {
        let d = match kind {
            MoveKind::Swap => self.swap,
            MoveKind::Fall => self.fall,
            MoveKind::Spawn => self.spawn,
            MoveKind::Absorb => self.absorb,
        };
        d.as_secs_f32().max(MIN_STEP_SECS)
    }
}

#[derive(Debug, Clone, Copy)]
struct Step {
    ticket: MoveTicket,
    to: Point,
    kind: MoveKind,
    secs: f32,
}

#[derive(Debug, Clone, Copy)]
struct ActiveStep {
    step: Step,
    start: Point,
    t: f32,
}

#[derive(Debug, Clone)]
struct Track {
    position: Point,
    queue: VecDeque<Step>,
    active: Option<ActiveStep>,
}

impl Track {
    fn is_idle(&self) -> bool {
        self.active.is_none() && self.queue.is_empty()
    }

    fn drain_tickets(&mut self) -> Vec<MoveTicket> {
        self.active
            .take()
            .map(|a| a.step.ticket)
            .into_iter()
            .chain(self.queue.drain(..).map(|s| s.ticket))
            .collect()
    }
}

/// What a renderer needs for one tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileView {
    pub position: Point,
    /// 0..1 while the absorb animation runs.
    pub absorbing: Option<f32>,
}

/// FIFO tweener: one queue per tile, quadratic ease-in, epsilon snap.
#[derive(Debug, Default)]
pub struct Tweener {
    config: MoverConfig,
    tracks: BTreeMap<TileId, Track>,
}

impl Tweener {
    pub fn new(config: MoverConfig) -> Self {
        Self {
            config,
            tracks: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &MoverConfig {
        &self.config
    }

    pub fn position(&self, tile: TileId) -> Option<Point> {
        self.tracks.get(&tile).map(|t| t.position)
    }

    pub fn is_moving(&self, tile: TileId) -> bool {
        self.tracks.get(&tile).is_some_and(|t| !t.is_idle())
    }

    /// Queued plus running moves for a tile.
    pub fn pending_count(&self, tile: TileId) -> usize {
        self.tracks
            .get(&tile)
            .map(|t| t.queue.len() + usize::from(t.active.is_some()))
            .unwrap_or(0)
    }

    pub fn view(&self, tile: TileId) -> Option<TileView> {
        self.tracks.get(&tile).map(Self::view_of)
    }

    fn view_of(track: &Track) -> TileView {
        let absorbing = match track.active {
            Some(a) if a.step.kind == MoveKind::Absorb => Some(a.t.clamp(0.0, 1.0)),
            _ if track.queue.front().is_some_and(|s| s.kind == MoveKind::Absorb) => Some(0.0),
            _ => None,
        };
        TileView {
            position: track.position,
            absorbing,
        }
    }

    /// Every tile the tweener knows, in id order.
    pub fn views(&self) -> impl Iterator<Item = (TileId, TileView)> + '_ {
        self.tracks.iter().map(|(&id, t)| (id, Self::view_of(t)))
    }

    /// Run one track for `secs`; pushes finished tickets. Returns true when the track
    /// should be dropped (its absorb finished).
    fn step_track(
        config: &MoverConfig,
        track: &mut Track,
        mut secs: f32,
        done: &mut Vec<MoveTicket>,
    ) -> bool {
        loop {
            if track.active.is_none() {
                let Some(step) = track.queue.pop_front() else {
                    return false;
                };
                track.active = Some(ActiveStep {
                    step,
                    start: track.position,
                    t: 0.0,
                });
            }
            let Some(active) = track.active.as_mut() else {
                return false;
            };
            let needed = (1.0 - active.t) * active.step.secs;
            active.t += secs / active.step.secs;
            let u = active.t * active.t;
            track.position = active.start.lerp(active.step.to, u.min(1.0));

            let (t, step) = (active.t, active.step);
            let close = step.kind != MoveKind::Absorb
                && track.position.distance_sq(step.to) < config.epsilon * config.epsilon;
            if t < 1.0 && !close {
                return false;
            }

            track.position = step.to;
            track.active = None;
            done.push(step.ticket);
            if step.kind == MoveKind::Absorb {
                return true;
            }
            // Time left over after landing carries into the next queued move.
            secs = if t >= 1.0 { (secs - needed).max(0.0) } else { 0.0 };
            if secs <= 0.0 {
                return false;
            }
        }
    }
}

impl TileMover for Tweener {
    fn enqueue(&mut self, request: MoveRequest) {
        let secs = self.config.seconds(request.kind);
        let track = self.tracks.entry(request.tile).or_insert_with(|| Track {
            position: request.from.unwrap_or(request.to),
            queue: VecDeque::new(),
            active: None,
        });
        if let Some(from) = request.from {
            if track.is_idle() {
                track.position = from;
            }
        }
        trace!(target: "mover", tile = %request.tile, ticket = %request.ticket, kind = ?request.kind, "enqueue");
        track.queue.push_back(Step {
            ticket: request.ticket,
            to: request.to,
            kind: request.kind,
            secs,
        });
    }

    fn advance(&mut self, dt: Duration) -> Vec<MoveTicket> {
        let secs = dt.as_secs_f32();
        let mut done = Vec::new();
        let config = self.config;
        self.tracks
            .retain(|_, track| !Self::step_track(&config, track, secs, &mut done));
        done
    }

    fn clear(&mut self, tile: TileId) -> Vec<MoveTicket> {
        let Some(track) = self.tracks.get_mut(&tile) else {
            return Vec::new();
        };
        let absorbing = track
            .active
            .map(|a| a.step.kind == MoveKind::Absorb)
            .unwrap_or(false)
            || track.queue.iter().any(|s| s.kind == MoveKind::Absorb);
        let tickets = track.drain_tickets();
        if absorbing {
            self.tracks.remove(&tile);
        }
        tickets
    }

    fn clear_all(&mut self) -> Vec<MoveTicket> {
        let tickets = self
            .tracks
            .values_mut()
            .flat_map(Track::drain_tickets)
            .collect();
        self.tracks.clear();
        tickets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::TileArena;
    use crate::gate::MovementGate;
    use approx::assert_relative_eq;

    fn request(
        gate: &mut MovementGate,
        tile: TileId,
        from: Option<Point>,
        to: Point,
        kind: MoveKind,
    ) -> MoveRequest {
        MoveRequest {
            ticket: gate.issue(),
            tile,
            from,
            to,
            kind,
        }
    }

    #[test]
    fn eases_in_and_lands_exactly() {
        let mut arena = TileArena::new();
        let mut gate = MovementGate::new();
        let tile = arena.alloc();
        let mut tw = Tweener::new(MoverConfig::default());
        let req = request(
            &mut gate,
            tile,
            Some(Point::new(0.0, 4.0)),
            Point::new(0.0, 0.0),
            MoveKind::Spawn,
        );
        tw.enqueue(req);

        assert!(tw.advance(Duration::from_millis(100)).is_empty());
        // Quadratic ease-in: a quarter of the way at half time.
        let p = tw.position(tile).unwrap();
        assert_relative_eq!(p.y, 3.0, epsilon = 1e-3);

        let done = tw.advance(Duration::from_millis(150));
        assert_eq!(done, vec![req.ticket]);
        assert_eq!(tw.position(tile), Some(Point::new(0.0, 0.0)));
        assert!(!tw.is_moving(tile));
    }

    #[test]
    fn moves_on_one_tile_run_in_order() {
        let mut arena = TileArena::new();
        let mut gate = MovementGate::new();
        let tile = arena.alloc();
        let mut tw = Tweener::new(MoverConfig::default());
        let first = request(
            &mut gate,
            tile,
            Some(Point::new(0.0, 0.0)),
            Point::new(1.0, 0.0),
            MoveKind::Swap,
        );
        let second = request(&mut gate, tile, None, Point::new(0.0, 0.0), MoveKind::Swap);
        tw.enqueue(first);
        tw.enqueue(second);
        assert_eq!(tw.pending_count(tile), 2);

        let mut finished = Vec::new();
        for _ in 0..40 {
            finished.extend(tw.advance(Duration::from_millis(16)));
        }
        assert_eq!(finished, vec![first.ticket, second.ticket]);
        assert_eq!(tw.position(tile), Some(Point::new(0.0, 0.0)));
    }

    #[test]
    fn absorb_completes_and_drops_tile() {
        let mut arena = TileArena::new();
        let mut gate = MovementGate::new();
        let tile = arena.alloc();
        let mut tw = Tweener::new(MoverConfig::default());
        let at = Point::new(2.0, 2.0);
        let req = request(&mut gate, tile, Some(at), at, MoveKind::Absorb);
        tw.enqueue(req);

        assert!(tw.advance(Duration::from_millis(100)).is_empty());
        let view = tw.view(tile).unwrap();
        assert!(view.absorbing.is_some_and(|p| p > 0.0 && p < 1.0));

        assert_eq!(tw.advance(Duration::from_millis(300)), vec![req.ticket]);
        assert_eq!(tw.position(tile), None);
    }

    #[test]
    fn clearing_fires_every_ticket() {
        let mut arena = TileArena::new();
        let mut gate = MovementGate::new();
        let a = arena.alloc();
        let b = arena.alloc();
        let mut tw = Tweener::new(MoverConfig::default());
        let r1 = request(&mut gate, a, Some(Point::new(0.0, 9.0)), Point::default(), MoveKind::Spawn);
        let r2 = request(&mut gate, a, None, Point::new(1.0, 0.0), MoveKind::Fall);
        let r3 = request(&mut gate, b, Some(Point::new(1.0, 9.0)), Point::new(1.0, 0.0), MoveKind::Spawn);
        tw.enqueue(r1);
        tw.enqueue(r2);
        tw.enqueue(r3);
        tw.advance(Duration::from_millis(50));

        let mut cleared = tw.clear(a);
        cleared.sort();
        assert_eq!(cleared, vec![r1.ticket, r2.ticket]);
        assert!(tw.clear(a).is_empty());
        assert!(tw.position(a).is_some());

        assert_eq!(tw.clear_all(), vec![r3.ticket]);
        assert!(tw.views().next().is_none());
    }
}
