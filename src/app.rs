//! App: terminal init, main loop, board ticking and key handling.

use crate::HostConfig;
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use gemfall::{
    Board, BoardConfig, BoardEvent, CellPos, Direction, MatchTier, MoverConfig, Tweener,
};
use rand::rngs::StdRng;
use ratatui::DefaultTerminal;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};
use tachyonfx::Effect;
use tracing::{debug, info};

/// Slow-motion key: quarter speed for two seconds of real time.
const SLOW_MOTION_SCALE: f32 = 0.25;
const SLOW_MOTION_FOR: Duration = Duration::from_secs(2);
/// Frames longer than this (a suspended terminal, a debugger) are clamped.
const MAX_FRAME: Duration = Duration::from_millis(100);

pub type HostBoard = Board<Tweener, StdRng>;

/// Running tallies of what the board reported.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    /// Groups found, per tier (3, 4, 5+).
    pub matches: [u32; 3],
    /// Groups fully absorbed, per gem colour.
    pub absorbed: [u32; 4],
    pub cascades: u32,
    pub best_chain: u32,
    pub reverted: u32,
    pub disabled: usize,
}

impl Stats {
    fn record(&mut self, event: &BoardEvent) {
        match *event {
            BoardEvent::MatchFound { tier, .. } => self.matches[tier_slot(tier)] += 1,
            BoardEvent::GroupAbsorbed { color, .. } => {
                if let Some(i) = color.palette_index() {
                    self.absorbed[i] += 1;
                }
            }
            BoardEvent::SwapReverted { .. } => self.reverted += 1,
            BoardEvent::CascadeSettled { passes } => {
                if passes > 0 {
                    self.cascades += 1;
                    self.best_chain = self.best_chain.max(passes);
                }
            }
            BoardEvent::CellsDisabled { count } => self.disabled += count,
        }
    }
}

fn tier_slot(tier: MatchTier) -> usize {
    match tier {
        MatchTier::Three => 0,
        MatchTier::Four => 1,
        MatchTier::Five => 2,
    }
}

pub struct App {
    board: HostBoard,
    host: HostConfig,
    theme: Theme,
    events: Receiver<BoardEvent>,
    stats: Stats,
    cursor: CellPos,
    /// Gem picked as the first half of a swap.
    selected: Option<CellPos>,
    paused: bool,
    status: String,
    last_frame: Instant,
    /// Cells under the current match flash.
    flash_cells: Vec<CellPos>,
    /// TachyonFX fade over `flash_cells` (created by the UI on first draw).
    flash_effect: Option<Effect>,
    /// Last time we processed the flash effect (for delta).
    flash_process_time: Option<Instant>,
}

impl App {
    pub fn new(config: BoardConfig, mover: MoverConfig, host: HostConfig, theme: Theme) -> Result<Self> {
        let mut board = Board::seeded(config, Tweener::new(mover))?;
        let (_, events) = board.channel();
        board.init()?;
        let cursor = CellPos::new(board.grid().rows() / 2, board.grid().cols() / 2);
        Ok(Self {
            board,
            host,
            theme,
            events,
            stats: Stats::default(),
            cursor,
            selected: None,
            paused: false,
            status: String::new(),
            last_frame: Instant::now(),
            flash_cells: Vec::new(),
            flash_effect: None,
            flash_process_time: None,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let _ = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        );

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;
        self.board.shutdown();
        info!(target: "board", cascades = self.stats.cascades, best_chain = self.stats.best_chain, "exit");

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.host.frame_rate);
        self.last_frame = Instant::now();
        loop {
            let now = Instant::now();
            let dt = now.saturating_duration_since(self.last_frame).min(MAX_FRAME);
            self.last_frame = now;
            self.board.tick(dt);
            self.drain_events();

            terminal.draw(|f| {
                let area = f.area();
                let view = crate::ui::View {
                    board: &self.board,
                    theme: &self.theme,
                    stats: &self.stats,
                    cursor: self.cursor,
                    selected: self.selected,
                    paused: self.paused,
                    status: &self.status,
                };
                crate::ui::draw(f, &view, area);
                if !self.host.no_animation && !self.flash_cells.is_empty() {
                    crate::ui::apply_match_flash(
                        f,
                        &view,
                        area,
                        &self.flash_cells,
                        &mut self.flash_effect,
                        &mut self.flash_process_time,
                        now,
                    );
                }
            })?;

            if self.flash_effect.as_ref().is_some_and(|e| e.done()) {
                self.flash_cells.clear();
                self.flash_effect = None;
                self.flash_process_time = None;
            }

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if !self.handle(key_to_action(key))? {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    fn drain_events(&mut self) {
        let mut matched = false;
        while let Ok(event) = self.events.try_recv() {
            debug!(target: "board", ?event, "host_event");
            self.stats.record(&event);
            match event {
                BoardEvent::MatchFound { .. } => matched = true,
                BoardEvent::SwapReverted { .. } => self.status = "No match".to_string(),
                BoardEvent::CascadeSettled { passes } if passes > 1 => {
                    self.status = format!("Chain x{passes}");
                }
                _ => {}
            }
        }
        if matched {
            self.start_flash();
        }
    }

    /// Flash the cells whose tiles just started absorbing.
    fn start_flash(&mut self) {
        let layout = *self.board.layout();
        self.flash_cells = self
            .board
            .mover()
            .views()
            .filter(|(_, v)| v.absorbing.is_some())
            .filter_map(|(_, v)| layout.world_to_cell(v.position))
            .collect();
        self.flash_effect = None;
        self.flash_process_time = None;
    }

    /// Returns false to quit.
    fn handle(&mut self, action: Action) -> Result<bool> {
        if self.paused {
            match action {
                Action::Pause => self.set_paused(false),
                Action::Quit => return Ok(false),
                _ => {}
            }
            return Ok(true);
        }
        match action {
            Action::Quit => return Ok(false),
            Action::Pause => self.set_paused(true),
            Action::Cursor(dir) => {
                if let Some(next) = self.board.grid().neighbor(self.cursor, dir) {
                    self.cursor = next;
                }
            }
            Action::Select => self.select(),
            Action::Cancel => self.selected = None,
            Action::DisableRandom => {
                let n = self
                    .board
                    .disable_random(self.host.disable_count, self.host.disable_attempts);
                self.status = format!("Disabled {n}");
            }
            Action::SlowMotion => {
                self.board
                    .time_scale_mut()
                    .set_scale(SLOW_MOTION_SCALE, SLOW_MOTION_FOR);
                self.status = "Slow motion".to_string();
            }
            Action::ToggleBusy => {
                let busy = !self.board.is_busy();
                self.board.set_busy(busy);
                self.status = if busy { "Busy" } else { "Ready" }.to_string();
            }
            Action::Regenerate => {
                self.board.regenerate()?;
                self.selected = None;
                self.flash_cells.clear();
                self.flash_effect = None;
                self.status = "New board".to_string();
            }
            Action::None => {}
        }
        Ok(true)
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        self.board.time_scale_mut().set_paused(paused);
    }

    /// First press picks a gem; a press on a neighbour swaps, anywhere else re-picks.
    fn select(&mut self) {
        let Some(from) = self.selected else {
            self.selected = Some(self.cursor);
            return;
        };
        if from == self.cursor {
            self.selected = None;
            return;
        }
        let Some(dir) = direction_between(&self.board, from, self.cursor) else {
            self.selected = Some(self.cursor);
            return;
        };
        self.selected = None;
        match self.board.request_swap(from, dir) {
            Ok(()) => self.status.clear(),
            Err(e) => {
                debug!(target: "board", %from, error = %e, "swap_rejected");
                self.status = e.to_string();
            }
        }
    }
}

fn direction_between(board: &HostBoard, from: CellPos, to: CellPos) -> Option<Direction> {
    Direction::ALL
        .into_iter()
        .find(|&d| board.grid().neighbor(from, d) == Some(to))
}
