//! Colours for the board and sidebar. Theme files use btop's `theme[key]="#hex"` lines.

use crate::Palette;
use gemfall::GemColor;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Theme {
    /// One per `GemColor::PLAYABLE` entry.
    pub gems: [Color; 4],
    pub inert: Color,
    pub bg: Color,
    /// Borders.
    pub div_line: Color,
    pub main_fg: Color,
    pub title: Color,
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("cannot read theme file: {0}")]
    Read(#[from] std::io::Error),
    #[error("bad colour {0:?}")]
    BadColor(String),
}

const fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

impl Theme {
    /// One Dark.
    pub const ONE_DARK: Self = Self {
        gems: [rgb(0xE06C75), rgb(0x98C379), rgb(0x61AFEF), rgb(0xE5C07B)],
        inert: rgb(0x5C6370),
        bg: rgb(0x282C34),
        div_line: rgb(0x3F444F),
        main_fg: rgb(0xABB2BF),
        title: rgb(0xE5C07B),
        inactive_fg: rgb(0x5C6370),
    };

    /// One Dark overlaid with `path` when given and present, then `palette`'s gem colours.
    pub fn load(path: Option<&Path>, palette: Palette) -> Result<Self, ThemeError> {
        let mut theme = match path.filter(|p| p.exists()) {
            Some(path) => Self::from_entries(&std::fs::read_to_string(path)?),
            None => Self::ONE_DARK,
        };
        if let Some(gems) = palette_gems(palette) {
            theme.gems = gems;
        }
        Ok(theme)
    }

    /// Unknown keys and unparsable colours fall back to One Dark.
    fn from_entries(text: &str) -> Self {
        let entries: HashMap<&str, &str> = theme_entries(text).collect();
        let pick = |keys: &[&str], fallback: Color| {
            keys.iter()
                .filter_map(|k| entries.get(k))
                .find_map(|v| parse_hex(v).ok())
                .unwrap_or(fallback)
        };
        let base = Self::ONE_DARK;
        Self {
            gems: [
                pick(&["cpu_end", "temp_end"], base.gems[0]),
                pick(&["mem_box", "cpu_start"], base.gems[1]),
                pick(&["cpu_box"], base.gems[2]),
                pick(&["title", "cpu_mid"], base.gems[3]),
            ],
            inert: pick(&["inactive_fg"], base.inert),
            bg: pick(&["main_bg", "meter_bg"], base.bg),
            div_line: pick(&["div_line"], base.div_line),
            main_fg: pick(&["main_fg"], base.main_fg),
            title: pick(&["title"], base.title),
            inactive_fg: pick(&["inactive_fg"], base.inactive_fg),
        }
    }

    pub fn gem_color(&self, gem: GemColor) -> Color {
        gem.palette_index()
            .and_then(|i| self.gems.get(i).copied())
            .unwrap_or(self.inert)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::ONE_DARK
    }
}

/// Gem colours that replace the theme's, if any.
fn palette_gems(palette: Palette) -> Option<[Color; 4]> {
    match palette {
        Palette::Normal => None,
        Palette::HighContrast => Some([rgb(0xFF0000), rgb(0x00FF00), rgb(0x0088FF), rgb(0xFFFF00)]),
        // Paul Tol's vivid set: no red/green pair.
        Palette::Colorblind => Some([rgb(0xCC3311), rgb(0x009988), rgb(0x0077BB), rgb(0xEE7733)]),
    }
}

/// `(key, value)` for every `theme[key]="value"` (or single-quoted) line with a value.
fn theme_entries(text: &str) -> impl Iterator<Item = (&str, &str)> {
    text.lines().filter_map(|line| {
        let rest = line.trim().strip_prefix("theme[")?;
        let (key, rest) = rest.split_once(']')?;
        let (_, value) = rest.split_once('=')?;
        let value = value.trim().trim_matches(|c: char| c == '"' || c == '\'');
        (!value.is_empty()).then_some((key.trim(), value))
    })
}

/// `#RRGGBB` or `#RGB`.
pub fn parse_hex(text: &str) -> Result<Color, ThemeError> {
    let digits = text.trim().trim_start_matches('#');
    let bad = || ThemeError::BadColor(text.to_string());
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(bad());
    }
    let value = u32::from_str_radix(digits, 16).map_err(|_| bad())?;
    match digits.len() {
        6 => Ok(rgb(value)),
        3 => {
            let nibble = |shift: u32| ((value >> shift) & 0xF) as u8 * 17;
            Ok(Color::Rgb(nibble(8), nibble(4), nibble(0)))
        }
        _ => Err(bad()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_long_and_short_forms() {
        assert_eq!(parse_hex("#98C379").unwrap(), Color::Rgb(0x98, 0xC3, 0x79));
        assert_eq!(parse_hex(" #FFF ").unwrap(), Color::Rgb(255, 255, 255));
        assert_eq!(parse_hex("#f80").unwrap(), Color::Rgb(0xFF, 0x88, 0x00));
    }

    #[test]
    fn hex_rejects_wrong_length_and_digits() {
        assert!(parse_hex("#FFFF").is_err());
        assert!(parse_hex("#GG0000").is_err());
        assert!(parse_hex("").is_err());
    }

    #[test]
    fn entries_skip_comments_and_empty_values() {
        let text = "# comment\ntheme[meter_bg]=\"#31353F\"\ntheme[title]=''\nnot a theme line\n";
        let entries: Vec<_> = theme_entries(text).collect();
        assert_eq!(entries, vec![("meter_bg", "#31353F")]);
    }

    #[test]
    fn file_overrides_gems_and_falls_back() {
        let theme = Theme::from_entries("theme[cpu_end]=\"#112233\"\ntheme[main_fg]='#FFF'\ntheme[cpu_box]=\"oops\"\n");
        assert_eq!(theme.gem_color(GemColor::Red), Color::Rgb(0x11, 0x22, 0x33));
        assert_eq!(theme.gem_color(GemColor::Blue), Theme::ONE_DARK.gems[2]);
        assert_eq!(theme.main_fg, Color::Rgb(255, 255, 255));
        assert_eq!(theme.gem_color(GemColor::None), theme.inert);
    }

    #[test]
    fn missing_file_keeps_one_dark_with_palette() {
        let theme = Theme::load(Some(Path::new("/nonexistent/gemfall.theme")), Palette::Colorblind)
            .unwrap();
        assert_eq!(theme.bg, Theme::ONE_DARK.bg);
        assert_eq!(theme.gems[0], rgb(0xCC3311));
    }
}
