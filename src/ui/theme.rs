use ratatui::style::{Color, Modifier, Style};

use crate::model::card::{Card, Column};

pub fn column_color(column: Column) -> Color {
    match column {
        Column::Now => Color::Rgb(0x81, 0xC7, 0x84),
        Column::Next => Color::Rgb(0x4F, 0xC3, 0xF7),
        Column::Later => Color::Rgb(0xCE, 0x93, 0xD8),
    }
}

pub fn issue_color() -> Color {
    Color::White
}

pub fn priority_color() -> Color {
    Color::Red
}

/// Border of a pane or cell: yellow while carrying a card, cyan when focused.
pub fn border_style(focused: bool, moving: bool) -> Style {
    match (focused, moving) {
        (true, true) => Style::default().fg(Color::Yellow),
        (true, false) => Style::default().fg(Color::Cyan),
        _ => Style::default().fg(Color::DarkGray),
    }
}

pub fn card_style(card: &Card, selected: bool) -> Style {
    let mut style = if card.is_accent {
        Style::default().fg(Color::Rgb(0xFF, 0x70, 0x43))
    } else if card.source_issue_ref.is_some() {
        Style::default().fg(issue_color())
    } else {
        Style::default()
    };
    if card.is_high_priority {
        style = style.add_modifier(Modifier::BOLD);
    }
    if selected {
        style = style.add_modifier(Modifier::REVERSED);
    }
    style
}
