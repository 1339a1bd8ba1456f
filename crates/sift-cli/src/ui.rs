//! Launcher rendering: input line, result list and status bar.

use crate::app::{App, StatusKind, item_label};
use crate::colors;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};
use serde_json::Value;

/// Everything a frame shows that lives on the router side
pub struct View<'a> {
    pub results: &'a [Value],
    pub hint: &'a str,
    pub builtin: bool,
}

#[allow(clippy::cast_possible_truncation)]
pub fn render(f: &mut Frame, app: &mut App, view: &View<'_>) {
    f.render_widget(
        Block::default().style(Style::default().bg(colors::BG)),
        f.area(),
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    let title = if view.builtin || app.active_plugin.is_empty() {
        " sift ".to_string()
    } else {
        format!(" {} ", app.active_plugin)
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .style(Style::default().bg(colors::SURFACE))
        .border_style(Style::default().fg(if app.entry_focused {
            colors::PRIMARY
        } else {
            colors::OUTLINE
        }));

    let input_text = if app.text.is_empty() {
        let placeholder = if view.hint.is_empty() {
            "Type to search, :command for plugins"
        } else {
            view.hint
        };
        Span::styled(placeholder, Style::default().fg(colors::OUTLINE))
    } else {
        Span::styled(app.text.as_str(), Style::default().fg(colors::ON_SURFACE))
    };
    f.render_widget(Paragraph::new(input_text).block(input_block), chunks[0]);

    if app.entry_focused {
        let width = app.text.chars().count() as u16;
        f.set_cursor_position((chunks[0].x + width + 1, chunks[0].y + 1));
    }

    let items: Vec<ListItem> = view
        .results
        .iter()
        .map(|item| {
            let (title, detail) = item_label(item);
            let mut spans = vec![Span::styled(title, Style::default().fg(colors::ON_SURFACE))];
            if let Some(detail) = detail {
                spans.push(Span::raw("  "));
                spans.push(Span::styled(detail, Style::default().fg(colors::SUBTEXT)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", view.results.len()))
                .border_style(Style::default().fg(colors::OUTLINE)),
        )
        .highlight_style(
            Style::default()
                .bg(colors::SURFACE_HIGH)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    f.render_stateful_widget(list, chunks[1], &mut app.list_state);

    let status = match &app.status {
        Some(status) => {
            let color = match status.kind {
                StatusKind::Info => colors::SUBTEXT,
                StatusKind::Warning => colors::WARNING,
                StatusKind::Error => colors::ERROR,
            };
            Span::styled(status.message.as_str(), Style::default().fg(color))
        }
        None => Span::styled(
            "Enter activate  Tab complete  Esc close",
            Style::default().fg(colors::OUTLINE),
        ),
    };
    f.render_widget(Paragraph::new(status), chunks[2]);
}
