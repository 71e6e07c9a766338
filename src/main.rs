//! gemfall: match-3 gem board in the terminal.

mod app;
mod input;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use gemfall::{BoardConfig, MoverConfig, RefillPolicy};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;

/// Host settings that are not part of the board itself.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub frame_rate: f64,
    /// Cells the disable key tries to turn inert.
    pub disable_count: usize,
    /// Rounds `disable_random` may retry misses.
    pub disable_attempts: u32,
    pub no_animation: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = configure_logging(&args.log_file)?;
    install_panic_hook();

    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        tracing::warn!(target: "board", error = %e, "theme_fallback");
        theme::Theme::default()
    });
    let board = BoardConfig {
        rows: args.rows,
        cols: args.cols,
        palette_size: args.colors,
        seed: args.seed,
        refill: args.refill.into(),
        ..BoardConfig::default()
    };
    let mover = MoverConfig {
        swap: Duration::from_millis(args.move_ms),
        fall: Duration::from_millis(args.move_ms),
        spawn: Duration::from_millis(args.move_ms),
        absorb: Duration::from_millis(args.absorb_ms),
        ..MoverConfig::default()
    };
    let host = HostConfig {
        frame_rate: args.frame_rate.clamp(1.0, 240.0),
        disable_count: args.disable_count,
        disable_attempts: args.disable_attempts,
        no_animation: args.no_animation,
    };
    tracing::info!(target: "board", rows = board.rows, cols = board.cols, seed = board.seed, "startup");
    let mut app = App::new(board, mover, host, theme).context("board generation failed")?;
    app.run()?;
    Ok(())
}

/// Logs go to a file; the terminal belongs to the UI.
fn configure_logging(path: &Path) -> Result<Option<WorkerGuard>> {
    let (writer, guard) = tracing_appender::non_blocking(open_log_file(path)?);
    let installed = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    // Another subscriber already owns the process; let the writer shut down.
    Ok(installed.is_ok().then_some(guard))
}

/// Each run starts a fresh log.
fn open_log_file(path: &Path) -> Result<File> {
    File::create(path).with_context(|| format!("cannot open log file {}", path.display()))
}

fn install_panic_hook() {
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = crossterm::terminal::disable_raw_mode();
        let _ = crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen);
        tracing::error!(target: "runtime.panic", ?info, "panic");
        default_panic(info);
    }));
}

/// Match-3 gem board in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "gemfall",
    version,
    about = "Match-3 gem board in the terminal. Swap neighbouring gems to line up three or more.",
    long_about = "gemfall is a match-3 board running in the terminal.\n\n\
        Move the cursor, pick a gem, then pick a neighbour to swap with. Runs of three or more \
        gems of one colour are absorbed, the columns above drop down and new gems fall in from \
        the top. A swap that lines nothing up is put back.\n\n\
        CONTROLS (normal):\n  Arrows      Move cursor   Enter/Space Select / swap   Esc  Cancel\n  \
        D  Disable random gems   S  Slow motion   B  Toggle busy   R  Regenerate\n  P  Pause   Q  Quit\n\n\
        CONTROLS (vim):\n  h/j/k/l     Move cursor   Space       Select / swap\n\n\
        Logs are written to --log-file; set RUST_LOG (e.g. RUST_LOG=cascade=debug) to see them."
)]
pub struct Args {
    /// Board height in cells.
    #[arg(long, default_value = "8", value_name = "ROWS")]
    pub rows: usize,

    /// Board width in cells.
    #[arg(long, default_value = "8", value_name = "COLS")]
    pub cols: usize,

    /// Seed for board generation and refills.
    #[arg(long, default_value = "12345", value_name = "SEED")]
    pub seed: u64,

    /// Number of gem colours in play (3-4).
    #[arg(long, default_value = "4", value_name = "N")]
    pub colors: usize,

    /// What refill does about gems that would line up the moment they land.
    #[arg(long, default_value = "allow-cascades")]
    pub refill: RefillArg,

    /// Duration of swap, fall and spawn moves in ms.
    #[arg(long, default_value = "200", value_name = "MS")]
    pub move_ms: u64,

    /// Duration of the absorb animation in ms.
    #[arg(long, default_value = "350", value_name = "MS")]
    pub absorb_ms: u64,

    /// Gems the disable key tries to turn inert.
    #[arg(long, default_value = "3", value_name = "N")]
    pub disable_count: usize,

    /// Rounds the disable key may retry gems that were already inert.
    #[arg(long, default_value = "10", value_name = "N")]
    pub disable_attempts: u32,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Where to write logs.
    #[arg(long, default_value = "gemfall.log", value_name = "FILE")]
    pub log_file: PathBuf,

    /// Target render frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Disable the match flash effect.
    #[arg(long)]
    pub no_animation: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RefillArg {
    #[default]
    AllowCascades,
    #[value(alias = "avoid")]
    AvoidMatches,
}

impl From<RefillArg> for RefillPolicy {
    fn from(arg: RefillArg) -> Self {
        match arg {
            RefillArg::AllowCascades => Self::AllowCascades,
            RefillArg::AvoidMatches => Self::AvoidImmediateMatches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_is_truncated_not_removed() {
        let path = std::env::temp_dir().join(format!("gemfall-log-{}.log", std::process::id()));
        std::fs::write(&path, "previous run\n").unwrap();
        let file = open_log_file(&path).unwrap();
        assert_eq!(file.metadata().unwrap().len(), 0);
        drop(file);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn unopenable_log_file_is_an_error() {
        let err = open_log_file(&std::env::temp_dir()).unwrap_err();
        assert!(err.to_string().contains("cannot open log file"));
    }

    #[test]
    fn two_colours_are_refused() {
        let args = Args::parse_from(["gemfall", "--colors", "2"]);
        let config = BoardConfig {
            palette_size: args.colors,
            ..BoardConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
