//! Gem colours, the inert sentinel, and match tiers.

use rand::Rng;
use rand::seq::IteratorRandom;

/// Colour of a gem. `None` is the inert sentinel: it never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GemColor {
    None,
    Red,
    Green,
    Blue,
    Yellow,
}

impl GemColor {
    /// Every colour a gem can spawn with, in palette order.
    pub const PLAYABLE: [Self; 4] = [Self::Red, Self::Green, Self::Blue, Self::Yellow];

    /// True for every colour except the inert sentinel.
    #[inline]
    pub fn is_matchable(self) -> bool {
        self != Self::None
    }

    /// Index into `PLAYABLE` (0..4); `None` for the sentinel.
    pub fn palette_index(self) -> Option<usize> {
        Self::PLAYABLE.iter().position(|&c| c == self)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Yellow => "yellow",
        }
    }
}

impl std::fmt::Display for GemColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// First `size` playable colours (clamped to 1..=4).
pub fn palette(size: usize) -> &'static [GemColor] {
    &GemColor::PLAYABLE[..size.clamp(1, GemColor::PLAYABLE.len())]
}

/// Uniformly random colour from `palette`.
pub fn random_color<R: Rng + ?Sized>(rng: &mut R, palette: &[GemColor]) -> GemColor {
    palette
        .iter()
        .copied()
        .choose(rng)
        .unwrap_or(GemColor::None)
}

/// Uniformly random colour from `palette` other than `exclude`.
/// Returns `None` when the palette has nothing else to offer.
pub fn random_color_except<R: Rng + ?Sized>(
    rng: &mut R,
    palette: &[GemColor],
    exclude: GemColor,
) -> Option<GemColor> {
    palette.iter().copied().filter(|&c| c != exclude).choose(rng)
}

/// Size class of a match: 3, 4, or 5+ gems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchTier {
    Three = 3,
    Four = 4,
    Five = 5,
}

impl MatchTier {
    /// Tier for a run of `len` gems, clamped into 3..=5.
    pub fn from_run_len(len: usize) -> Self {
        match len {
            0..=3 => Self::Three,
            4 => Self::Four,
            _ => Self::Five,
        }
    }

    #[inline]
    pub fn size(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn tier_is_clamped() {
        assert_eq!(MatchTier::from_run_len(3), MatchTier::Three);
        assert_eq!(MatchTier::from_run_len(4), MatchTier::Four);
        assert_eq!(MatchTier::from_run_len(5), MatchTier::Five);
        assert_eq!(MatchTier::from_run_len(8), MatchTier::Five);
        assert_eq!(MatchTier::Four.size(), 4);
    }

    #[test]
    fn random_except_never_returns_excluded() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let c = random_color_except(&mut rng, palette(4), GemColor::Red);
            assert!(matches!(
                c,
                Some(GemColor::Green | GemColor::Blue | GemColor::Yellow)
            ));
        }
    }

    #[test]
    fn random_except_on_single_colour_palette() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(
            random_color_except(&mut rng, palette(1), GemColor::Red),
            None
        );
    }

    #[test]
    fn sentinel_is_not_matchable() {
        assert!(!GemColor::None.is_matchable());
        assert!(GemColor::Blue.is_matchable());
        assert_eq!(GemColor::None.palette_index(), None);
        assert_eq!(GemColor::Yellow.palette_index(), Some(3));
    }
}
