//! Layout and drawing: board, sidebar stats, pause overlay, match flash.

use crate::app::{HostBoard, Stats};
use crate::theme::Theme;
use gemfall::{CellPos, GemColor, Phase, Point, TileView};
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Terminal cells per board cell: a 2×2 gem with a one-column margin either side.
const CELL_WIDTH: u16 = 4;
const CELL_HEIGHT: u16 = 2;

const SIDEBAR_WIDTH: u16 = 28;

/// Duration of the match flash (TachyonFX) in ms.
const MATCH_FLASH_MS: u32 = 300;

/// Everything a frame needs, borrowed from the app.
pub struct View<'a> {
    pub board: &'a HostBoard,
    pub theme: &'a Theme,
    pub stats: &'a Stats,
    pub cursor: CellPos,
    pub selected: Option<CellPos>,
    pub paused: bool,
    pub status: &'a str,
}

/// Board size in terminal cells including the border.
fn board_pixel_size(view: &View) -> (u16, u16) {
    let grid = view.board.grid();
    (
        grid.cols() as u16 * CELL_WIDTH + 2,
        grid.rows() as u16 * CELL_HEIGHT + 2,
    )
}

/// Board outer rect and sidebar rect, centred in `area`.
fn split_screen(view: &View, area: Rect) -> (Rect, Rect) {
    let (bw, bh) = board_pixel_size(view);
    let total_w = bw + SIDEBAR_WIDTH;
    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(bh),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(bw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    (inner[0], inner[1])
}

/// Inner rect of the board (no border).
fn board_rect(view: &View, area: Rect) -> Rect {
    let (outer, _) = split_screen(view, area);
    Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: outer.width.saturating_sub(2),
        height: outer.height.saturating_sub(2),
    }
}

/// Top-left terminal cell of a (possibly fractional) board position. Row 0 is drawn at the
/// bottom. `None` once the position is above the top row or off the drawable area.
fn screen_origin(view: &View, rect: Rect, at: Point) -> Option<(u16, u16)> {
    let pitch = view.board.layout().pitch();
    let rows = view.board.grid().rows() as f32;
    let col = at.x / pitch;
    let row = at.y / pitch;
    if row > rows - 1.0 + 0.25 || row < -0.25 || col < -0.25 {
        return None;
    }
    let x = (col * f32::from(CELL_WIDTH)).round() as u16;
    let y = ((rows - 1.0 - row) * f32::from(CELL_HEIGHT)).round().max(0.0) as u16;
    let (x, y) = (rect.x + x, rect.y + y);
    (x + CELL_WIDTH <= rect.x + rect.width && y + CELL_HEIGHT <= rect.y + rect.height)
        .then_some((x, y))
}

fn cell_origin(view: &View, rect: Rect, pos: CellPos) -> Option<(u16, u16)> {
    screen_origin(view, rect, view.board.layout().cell_to_world(pos))
}

/// Draw the whole screen.
pub fn draw(frame: &mut Frame, view: &View, area: Rect) {
    let (board_area, sidebar_area) = split_screen(view, area);
    draw_board(frame, view, board_area);
    draw_sidebar(frame, view, sidebar_area);
    if view.paused {
        draw_pause_overlay(frame, view, area);
    }
}

fn draw_board(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let title = if view.status.is_empty() {
        " gemfall ".to_string()
    } else {
        format!(" gemfall | {} ", view.status)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, theme.title));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let buf = frame.buffer_mut();
    for y in inner.top()..inner.bottom() {
        for x in inner.left()..inner.right() {
            buf[(x, y)].set_symbol(" ").set_style(Style::default().bg(theme.bg));
        }
    }

    // Tiles go where the tweener has them, not where the grid says.
    for (pos, tile) in view.board.grid().tiles() {
        let origin = match view.board.mover().position(tile.id) {
            Some(at) => screen_origin(view, inner, at),
            None => cell_origin(view, inner, pos),
        };
        if let Some(origin) = origin {
            draw_gem(buf, theme, origin, tile.color);
        }
    }
    // Absorbing tiles have left the grid but still have a track.
    for (_, tile_view) in view.board.mover().views() {
        if tile_view.absorbing.is_none() {
            continue;
        }
        if let Some(origin) = screen_origin(view, inner, tile_view.position) {
            draw_absorbing(buf, theme, origin, tile_view);
        }
    }

    if let Some(origin) = cell_origin(view, inner, view.cursor) {
        draw_brackets(buf, origin, ("[", "]"), Style::default().fg(theme.main_fg));
    }
    if let Some(origin) = view.selected.and_then(|p| cell_origin(view, inner, p)) {
        let style = Style::default().fg(theme.title).add_modifier(Modifier::BOLD);
        draw_brackets(buf, origin, ("»", "«"), style);
    }
}

fn draw_gem(buf: &mut Buffer, theme: &Theme, (x, y): (u16, u16), color: GemColor) {
    let symbol = if color.is_matchable() { "█" } else { "▒" };
    let style = Style::default().fg(theme.gem_color(color)).bg(theme.bg);
    for dy in 0..CELL_HEIGHT {
        for dx in 1..CELL_WIDTH - 1 {
            buf[(x + dx, y + dy)].set_symbol(symbol).set_style(style);
        }
    }
}

/// Absorbing tiles thin out as the animation runs.
fn draw_absorbing(buf: &mut Buffer, theme: &Theme, (x, y): (u16, u16), view: TileView) {
    let progress = view.absorbing.unwrap_or(1.0);
    let symbol = match progress {
        p if p < 0.33 => "▓",
        p if p < 0.66 => "▒",
        _ => "░",
    };
    let style = Style::default().fg(theme.main_fg).bg(theme.bg);
    for dy in 0..CELL_HEIGHT {
        for dx in 1..CELL_WIDTH - 1 {
            buf[(x + dx, y + dy)].set_symbol(symbol).set_style(style);
        }
    }
}

fn draw_brackets(buf: &mut Buffer, (x, y): (u16, u16), (open, close): (&str, &str), style: Style) {
    for dy in 0..CELL_HEIGHT {
        buf[(x, y + dy)].set_symbol(open).set_style(style);
        buf[(x + CELL_WIDTH - 1, y + dy)]
            .set_symbol(close)
            .set_style(style);
    }
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Stopped => "stopped",
        Phase::Idle => "idle",
        Phase::Swapping { .. } => "swapping",
        Phase::Reverting => "reverting",
        Phase::Cascading => "cascading",
    }
}

fn draw_sidebar(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let dim_style = Style::default().fg(theme.inactive_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);
    let stats = view.stats;
    let board = view.board;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Matches by tier
            Constraint::Length(6), // Absorbed per colour
            Constraint::Length(7), // Board state
            Constraint::Fill(1),   // Keys
        ])
        .split(area);

    let stat = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(label, title_style),
            Span::styled(value, fg_style),
        ])
    };

    let matches = vec![
        stat("Three: ", stats.matches[0].to_string()),
        stat("Four:  ", stats.matches[1].to_string()),
        stat("Five+: ", stats.matches[2].to_string()),
        stat("Best chain: ", stats.best_chain.to_string()),
    ];
    boxed(frame, chunks[0], "Matches", matches, border_style, title_style);

    let absorbed = GemColor::PLAYABLE
        .iter()
        .zip(stats.absorbed)
        .map(|(&gem, n)| {
            Line::from(vec![
                Span::styled("██ ", Style::default().fg(theme.gem_color(gem))),
                Span::styled(format!("{:<7}", gem.name()), fg_style),
                Span::styled(n.to_string(), fg_style),
            ])
        })
        .collect();
    boxed(frame, chunks[1], "Absorbed", absorbed, border_style, title_style);

    let scale = board.time_scale().current();
    let state = vec![
        stat("Phase: ", phase_label(board.phase()).to_string()),
        stat("Moves: ", board.pending_moves().to_string()),
        stat(
            "Groups: ",
            format!(
                "{} ({} absorbing)",
                board.tracker().pending_groups(),
                board.absorbing_tiles()
            ),
        ),
        stat("Speed: ", format!("{scale:.2}x")),
        Line::from(vec![
            Span::styled("Busy: ", title_style),
            Span::styled(
                if board.is_busy() { "yes" } else { "no" },
                if board.is_busy() {
                    Style::default().fg(Color::Yellow)
                } else {
                    fg_style
                },
            ),
            Span::styled(
                format!("  Inert: {}", stats.disabled),
                dim_style,
            ),
        ]),
    ];
    boxed(frame, chunks[2], "Board", state, border_style, title_style);

    let keys = [
        ("Arrows/hjkl", "cursor"),
        ("Enter/Space", "pick/swap"),
        ("D", "disable gems"),
        ("S", "slow motion"),
        ("B", "busy"),
        ("R", "new board"),
        ("P / Q", "pause / quit"),
    ]
    .into_iter()
    .map(|(k, what)| {
        Line::from(vec![
            Span::styled(format!("{k:<12}"), fg_style),
            Span::styled(what, dim_style),
        ])
    })
    .collect();
    boxed(frame, chunks[3], "Keys", keys, border_style, title_style);
}

fn boxed(
    frame: &mut Frame,
    area: Rect,
    title: &'static str,
    lines: Vec<Line<'static>>,
    border_style: Style,
    title_style: Style,
) {
    Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(Span::styled(title, title_style)),
        )
        .render(area, frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, view: &View, area: Rect) {
    let popup_w = 28u16;
    let popup_h = 5u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P: Resume    Q: Quit ",
            Style::default().fg(view.theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(view.theme.div_line).bg(view.theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

/// Buffer positions covered by the given board cells.
fn flash_positions(view: &View, rect: Rect, cells: &[CellPos]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &pos in cells {
        let Some((x0, y0)) = cell_origin(view, rect, pos) else {
            continue;
        };
        for x in x0..x0 + CELL_WIDTH {
            for y in y0..y0 + CELL_HEIGHT {
                set.insert((x, y));
            }
        }
    }
    set
}

/// Create or update the match flash and process it (TachyonFX: fade matched cells out to bg).
pub fn apply_match_flash(
    frame: &mut Frame,
    view: &View,
    area: Rect,
    cells: &[CellPos],
    effect: &mut Option<Effect>,
    process_time: &mut Option<Instant>,
    now: Instant,
) {
    let rect = board_rect(view, area);
    let delta = process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    let tfx_delta = TfxDuration::from_millis(delta_ms);
    *process_time = Some(now);

    if effect.is_none() {
        let positions = flash_positions(view, rect, cells);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            positions.contains(&(pos.x, pos.y))
        }));
        let bg = view.theme.bg;
        let flash = fx::fade_to(view.theme.title, bg, (MATCH_FLASH_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(rect);
        *effect = Some(flash);
    }

    if let Some(effect) = effect {
        frame.render_effect(effect, rect, tfx_delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemfall::{Board, BoardConfig, MoverConfig, Tweener};

    #[test]
    fn row_zero_is_drawn_at_the_bottom() {
        let board = Board::seeded(BoardConfig::default(), Tweener::new(MoverConfig::default()))
            .unwrap();
        let theme = Theme::default();
        let stats = Stats::default();
        let view = View {
            board: &board,
            theme: &theme,
            stats: &stats,
            cursor: CellPos::new(0, 0),
            selected: None,
            paused: false,
            status: "",
        };
        let rect = Rect::new(0, 0, 8 * CELL_WIDTH, 8 * CELL_HEIGHT);
        assert_eq!(cell_origin(&view, rect, CellPos::new(0, 0)), Some((0, 14)));
        assert_eq!(cell_origin(&view, rect, CellPos::new(7, 7)), Some((28, 0)));
        // Above the top row: still spawning, not drawn.
        let above = board.layout().spawn_point(0, 1);
        assert_eq!(screen_origin(&view, rect, above), None);
    }
}
