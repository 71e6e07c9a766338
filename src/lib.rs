//! gemfall: a match-3 board engine whose tile moves finish asynchronously.
//!
//! The [`Board`] owns the grid and runs swaps and cascades; it hands every tile move to a
//! [`TileMover`] and carries on only when the mover reports the moves back. [`Tweener`] is
//! a frame-driven mover for hosts that just want positions to draw.

pub mod arena;
pub mod board;
pub mod clock;
pub mod color;
pub mod config;
pub mod detector;
pub mod error;
pub mod events;
pub mod gate;
pub mod grid;
pub mod layout;
pub mod mover;
pub mod tracker;

pub use arena::TileId;
pub use board::{Board, Phase};
pub use clock::TimeScale;
pub use color::{GemColor, MatchTier};
pub use config::{BoardConfig, RefillPolicy};
pub use error::{BoardError, SwapError};
pub use events::{BoardEvent, SubscriptionId};
pub use gate::MoveTicket;
pub use grid::{CellPos, Direction, Grid, Tile};
pub use layout::{BoardLayout, Point};
pub use mover::{MoveKind, MoveRequest, MoverConfig, TileMover, TileView, Tweener};
