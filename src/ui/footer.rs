use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::{App, Focus, Mode};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();

    match (&app.mode, app.focus) {
        (Mode::Moving { .. }, _) => {
            spans.push(hint("←↑↓→", "choose cell"));
            spans.push(hint("enter", "drop"));
            spans.push(hint("esc", "cancel"));
        }
        (Mode::Editing { .. }, _) => {}
        (Mode::Normal, Focus::Grid) => {
            spans.push(hint("←↑↓→", "navigate"));
            spans.push(hint("tab", "issues"));
            spans.push(hint("n", "new"));
            spans.push(hint("e", "edit"));
            spans.push(hint("d", "delete"));
            spans.push(hint("p", "priority"));
            spans.push(hint("m", "move"));
            spans.push(hint("r", "reload"));
            spans.push(hint("q", "quit"));
        }
        (Mode::Normal, Focus::Issues) => {
            spans.push(hint("↑↓", "navigate"));
            spans.push(hint("tab", "grid"));
            if app.show_hidden {
                spans.push(hint("u", "unhide"));
                spans.push(hint("H", "issues"));
            } else {
                spans.push(hint("m", "place"));
                spans.push(hint("h", "hide"));
                spans.push(hint("H", "hidden"));
            }
            spans.push(hint("R", "refresh"));
            spans.push(hint("q", "quit"));
        }
    }

    // Save indicator
    spans.push(Span::raw("  "));
    if app.saving > 0 {
        spans.push(Span::styled(
            " SAVING ",
            Style::default()
                .fg(ratatui::style::Color::Black)
                .bg(ratatui::style::Color::Yellow),
        ));
    } else {
        spans.push(Span::styled(
            " SAVED ",
            Style::default()
                .fg(ratatui::style::Color::Black)
                .bg(ratatui::style::Color::DarkGray),
        ));
    }

    if let Some(at) = app.last_refreshed {
        spans.push(Span::styled(
            format!("  issues @ {}", at.format("%Y-%m-%d %H:%M")),
            Style::default().fg(ratatui::style::Color::DarkGray),
        ));
    }

    // Flash message
    if let Some((msg, _)) = &app.flash_message {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            msg,
            Style::default().fg(ratatui::style::Color::Yellow),
        ));
    }

    let line = Line::from(spans);
    let paragraph = Paragraph::new(line);
    f.render_widget(paragraph, area);
}

fn hint(key: &str, desc: &str) -> Span<'static> {
    Span::styled(
        format!(" {key}:{desc} "),
        Style::default().fg(ratatui::style::Color::DarkGray),
    )
}
