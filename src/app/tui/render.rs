use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Cell, Clear, Padding, Paragraph, Row, Table, Wrap,
};

use super::super::catalog::SongCategory;
use super::super::selection::SelectedSong;
use super::super::truncate;
use super::actions::visible_songs;
use super::{CatalogState, Pane, TuiState};

const ACCENT: Color = Color::Rgb(110, 170, 255);
const MUTED: Color = Color::Rgb(185, 195, 210);

pub(super) fn draw_tui(frame: &mut Frame, state: &mut TuiState, listed: &[SelectedSong]) {
    let bg = Block::default().style(Style::default().bg(Color::Black));
    frame.render_widget(bg, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    frame.render_widget(header(state, listed.len()), chunks[0]);

    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(58), Constraint::Percentage(42)])
        .split(chunks[1]);
    draw_catalog(frame, state, listed, body_chunks[0]);
    draw_worship_list(frame, state, listed, body_chunks[1]);

    let command_bar = Paragraph::new(controls_line(state))
        .alignment(Alignment::Center)
        .block(panel_block("Controls".to_string(), false));
    frame.render_widget(command_bar, chunks[2]);

    let status_widget = Paragraph::new(state.status.clone())
        .style(status_style(&state.status))
        .block(panel_block("Status".to_string(), false));
    frame.render_widget(status_widget, chunks[3]);

    if state.confirm_clear {
        let popup_text = format!(
            "Clear the worship list?\n\n{} song{} will be removed.\n\n[y / Enter] Clear   [n / Esc] Cancel",
            listed.len(),
            if listed.len() == 1 { "" } else { "s" }
        );
        let popup_area = popup_rect_for_text(frame.area(), &popup_text);
        render_popup_shadow(frame, popup_area);
        frame.render_widget(Clear, popup_area);
        let popup = Paragraph::new(popup_text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(modal_block("Confirm Clear"));
        frame.render_widget(popup, popup_area);
    }
}

fn header(state: &TuiState, listed: usize) -> Paragraph<'static> {
    let mut spans = vec![
        Span::styled(
            "WORSHIPLIST",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled("   ", Style::default()),
    ];
    for category in SongCategory::ALL {
        let style = if category == state.category {
            pill_active()
        } else {
            pill_inactive()
        };
        spans.push(Span::styled(format!(" {} ", category.label()), style));
        spans.push(Span::styled(" ", Style::default()));
    }
    spans.push(Span::styled(
        format!("  {listed} selected"),
        Style::default().fg(MUTED),
    ));
    Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(panel_block("Worship Set Builder".to_string(), false))
}

fn draw_catalog(frame: &mut Frame, state: &mut TuiState, listed: &[SelectedSong], area: Rect) {
    let focused = state.pane == Pane::Catalog;
    let mut title = catalog_title(state);

    let placeholder = match state.current_catalog() {
        None | Some(CatalogState::Loading { stale: None }) => {
            Some(format!("Loading {}...", state.category.label()))
        }
        Some(catalog) if catalog.songs().is_empty() => Some(match catalog.warning() {
            Some(warning) => format!("Could not load songs.\n\n{warning}\n\nPress r to retry."),
            None => "No songs in this category yet.".to_string(),
        }),
        _ => None,
    };
    if let Some(text) = placeholder {
        let widget = Paragraph::new(text)
            .style(Style::default().fg(MUTED))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(panel_block(title, focused));
        frame.render_widget(widget, area);
        return;
    }
    if state.current_catalog().is_some_and(CatalogState::is_loading) {
        title.push_str("  (refreshing)");
    }

    let rows: Vec<Row> = visible_songs(state)
        .into_iter()
        .map(|song| {
            let listed_at = listed.iter().position(|item| item.song_id == song.song_id);
            Row::new(vec![
                Cell::from(listed_at.map(|idx| format!("#{}", idx + 1)).unwrap_or_default()),
                Cell::from(song.title.clone()),
                Cell::from(truncate(&song.song_id, 14)),
            ])
            .style(if listed_at.is_some() {
                Style::default().fg(Color::Rgb(150, 220, 170))
            } else {
                Style::default().fg(Color::Rgb(230, 230, 230))
            })
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Min(20),
            Constraint::Length(14),
        ],
    )
    .header(table_header(vec!["", "Title", "Song ID"]))
    .block(panel_block(title, focused))
    .row_highlight_style(highlight_style(focused))
    .highlight_symbol("▸ ");
    frame.render_stateful_widget(table, area, &mut state.catalog_table);
}

fn catalog_title(state: &TuiState) -> String {
    let mut title = state.category.label().to_string();
    if state.editing_search || !state.search.is_empty() {
        let cursor = if state.editing_search { "_" } else { "" };
        title.push_str(&format!("  /{}{cursor}", state.search));
    }
    title
}

fn draw_worship_list(frame: &mut Frame, state: &mut TuiState, listed: &[SelectedSong], area: Rect) {
    let focused = state.pane == Pane::List;
    let title = format!("Worship List ({})", listed.len());
    if listed.is_empty() {
        let widget = Paragraph::new(
            "No songs selected yet.\n\nPick songs from the catalog with Enter.",
        )
        .style(Style::default().fg(MUTED))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(panel_block(title, focused));
        frame.render_widget(widget, area);
        return;
    }

    let rows: Vec<Row> = listed
        .iter()
        .enumerate()
        .map(|(idx, song)| {
            Row::new(vec![
                Cell::from(format!("{}.", idx + 1)),
                Cell::from(song.title.clone()),
            ])
        })
        .collect();
    let table = Table::new(rows, [Constraint::Length(4), Constraint::Min(12)])
        .header(table_header(vec!["#", "Title"]))
        .block(panel_block(title, focused))
        .row_highlight_style(highlight_style(focused))
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(table, area, &mut state.list_table);
}

fn table_header(labels: Vec<&'static str>) -> Row<'static> {
    Row::new(labels).style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))
}

fn highlight_style(focused: bool) -> Style {
    if focused {
        Style::default()
            .bg(ACCENT)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().bg(Color::Rgb(50, 58, 70))
    }
}

fn controls_line(state: &TuiState) -> Line<'static> {
    let hints = if state.editing_search {
        "type to filter  Enter keep  Esc clear"
    } else {
        match state.pane {
            Pane::Catalog => {
                "↑/↓ move  ←/→ category  Enter add/remove  / search  r refresh  Tab list  c clear  q quit"
            }
            Pane::List => "↑/↓ move  K/J reorder  d remove  Tab catalog  c clear  q quit",
        }
    };
    Line::from(Span::styled(hints, Style::default().fg(MUTED)))
}

fn panel_block(title: String, focused: bool) -> Block<'static> {
    let border = if focused {
        Style::default().fg(ACCENT)
    } else {
        Style::default().fg(Color::Rgb(125, 135, 150))
    };
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(border)
        .title(title)
}

fn modal_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(
            Style::default()
                .fg(Color::Rgb(160, 190, 235))
                .add_modifier(Modifier::BOLD),
        )
        .title(title)
        .padding(Padding::new(2, 2, 1, 1))
}

fn pill_active() -> Style {
    Style::default()
        .bg(ACCENT)
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD)
}

fn pill_inactive() -> Style {
    Style::default()
        .bg(Color::Rgb(72, 82, 96))
        .fg(Color::Rgb(230, 235, 242))
}

fn status_style(status: &str) -> Style {
    if status.starts_with("ERROR:") {
        Style::default()
            .fg(Color::Rgb(255, 145, 120))
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Rgb(205, 165, 255))
    }
}

fn render_popup_shadow(frame: &mut Frame, popup_area: Rect) {
    let area = frame.area();
    let shadow = Rect::new(
        (popup_area.x + 1).min(area.x + area.width.saturating_sub(1)),
        (popup_area.y + 1).min(area.y + area.height.saturating_sub(1)),
        popup_area.width.saturating_sub(1),
        popup_area.height.saturating_sub(1),
    );
    if shadow.width == 0 || shadow.height == 0 {
        return;
    }
    let shadow_block = Block::default().style(Style::default().bg(Color::Rgb(14, 16, 24)));
    frame.render_widget(shadow_block, shadow);
}

fn popup_rect_for_text(area: Rect, text: &str) -> Rect {
    let widest = text
        .lines()
        .map(|line| line.chars().count() as u16)
        .max()
        .unwrap_or(0);
    let width = widest
        .saturating_add(8)
        .clamp(40.min(area.width), 64.min(area.width));
    let height = (text.lines().count() as u16)
        .saturating_add(4)
        .min(area.height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width, height)
}
