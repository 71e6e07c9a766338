//! Board configuration.

use crate::error::BoardError;
use crate::layout::BoardLayout;

/// What refill does about a spawned tile that would complete a run immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefillPolicy {
    /// Spawn any colour; incidental cascades are part of play.
    #[default]
    AllowCascades,
    /// Re-roll the colour (bounded by `spawn_attempts`) when it would line up with
    /// neighbours already in place. Gives up quietly when attempts run out.
    AvoidImmediateMatches,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardConfig {
    pub rows: usize,
    pub cols: usize,
    pub cell_size: f32,
    pub spacing: f32,
    /// How many of the playable colours are in use (3..=4). With two colours a cell can be
    /// boxed in by a pair on each axis, and generation gets stuck.
    pub palette_size: usize,
    pub seed: u64,
    /// Re-rolls allowed per cell before generation gives up.
    pub spawn_attempts: u32,
    pub refill: RefillPolicy,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            rows: 8,
            cols: 8,
            cell_size: 1.0,
            spacing: 0.05,
            palette_size: 4,
            seed: 12345,
            spawn_attempts: 100,
            refill: RefillPolicy::AllowCascades,
        }
    }
}

impl BoardConfig {
    pub fn validate(&self) -> Result<(), BoardError> {
        let invalid = |msg: String| Err(BoardError::InvalidConfig(msg));
        if self.rows < 3 || self.cols < 3 {
            return invalid(format!(
                "board must be at least 3x3, got {}x{}",
                self.rows, self.cols
            ));
        }
        if !(3..=4).contains(&self.palette_size) {
            return invalid(format!(
                "palette size must be 3..=4, got {}",
                self.palette_size
            ));
        }
        if !(self.cell_size > 0.0) {
            return invalid(format!("cell size must be positive, got {}", self.cell_size));
        }
        if !(self.spacing >= 0.0) {
            return invalid(format!("spacing must not be negative, got {}", self.spacing));
        }
        if self.spawn_attempts == 0 {
            return invalid("spawn attempts must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn layout(&self) -> BoardLayout {
        BoardLayout {
            rows: self.rows,
            cols: self.cols,
            cell_size: self.cell_size,
            spacing: self.spacing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(BoardConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let small = BoardConfig {
            rows: 2,
            ..BoardConfig::default()
        };
        assert!(matches!(small.validate(), Err(BoardError::InvalidConfig(_))));

        let mono = BoardConfig {
            palette_size: 1,
            ..BoardConfig::default()
        };
        assert!(mono.validate().is_err());

        let two = BoardConfig {
            palette_size: 2,
            ..BoardConfig::default()
        };
        assert!(matches!(two.validate(), Err(BoardError::InvalidConfig(m)) if m.contains("3..=4")));

        let three = BoardConfig {
            palette_size: 3,
            ..BoardConfig::default()
        };
        assert!(three.validate().is_ok());

        let nan = BoardConfig {
            cell_size: f32::NAN,
            ..BoardConfig::default()
        };
        assert!(nan.validate().is_err());
    }
}
