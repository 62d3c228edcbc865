use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, Mode};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let Mode::Editing { buffer, .. } = &app.mode else {
        return;
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ratatui::style::Color::Yellow))
        .title(" Card text (enter: save, esc: cancel) ");

    let paragraph = Paragraph::new(Line::from(Span::raw(buffer.clone()))).block(block);
    f.render_widget(paragraph, area);

    // Position cursor
    let x = area.x + 1 + buffer.chars().count() as u16;
    let y = area.y + 1;
    f.set_cursor_position((x.min(area.x + area.width.saturating_sub(2)), y));
}
