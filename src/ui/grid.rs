use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Focus, Mode};
use crate::model::card::Column;
use crate::reconciler::is_temp_id;
use crate::ui::theme::{border_style, card_style, column_color, priority_color};

const LABEL_WIDTH: u16 = 28;

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let moving = matches!(app.mode, Mode::Moving { .. });
    let title = match &app.mode {
        Mode::Moving { label, .. } => format!(" Roadmap (moving: {label}) "),
        _ => " Roadmap ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app.focus == Focus::Grid, moving))
        .title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    if app.objectives.is_empty() {
        return;
    }

    let mut row_constraints = vec![Constraint::Length(1)];
    row_constraints.extend(
        app.objectives
            .iter()
            .map(|_| Constraint::Ratio(1, app.objectives.len() as u32)),
    );
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(row_constraints)
        .split(inner);

    let header = split_columns(rows[0]);
    for (i, column) in Column::ALL.iter().enumerate() {
        let heading = Paragraph::new(Span::styled(
            column.display_name(),
            Style::default()
                .fg(column_color(*column))
                .add_modifier(Modifier::BOLD),
        ));
        f.render_widget(heading, header[i + 1]);
    }

    for (row, objective) in app.objectives.iter().enumerate() {
        let cells = split_columns(rows[row + 1]);

        let label = Paragraph::new(objective.plain_label())
            .style(Style::default().fg(ratatui::style::Color::Gray))
            .wrap(Wrap { trim: true });
        f.render_widget(label, cells[0]);

        for (col, column) in Column::ALL.iter().enumerate() {
            let at_cursor = app.focus == Focus::Grid && row == app.cursor_row && col == app.cursor_col;
            let lines: Vec<Line> = app
                .board
                .cards_at(&objective.id, *column)
                .into_iter()
                .enumerate()
                .map(|(slot, card)| {
                    let selected = at_cursor && !moving && slot == app.cursor_slot;
                    let mut spans = Vec::new();
                    // Not yet acknowledged by the server
                    if is_temp_id(&card.id) {
                        spans.push(Span::styled(
                            "* ",
                            Style::default().fg(ratatui::style::Color::DarkGray),
                        ));
                    }
                    if card.is_high_priority {
                        spans.push(Span::styled("! ", Style::default().fg(priority_color())));
                    }
                    if let Some(number) = card.issue_number() {
                        spans.push(Span::styled(
                            format!("#{number} "),
                            Style::default().fg(ratatui::style::Color::DarkGray),
                        ));
                    }
                    let text = if card.text.is_empty() { "…" } else { card.text.as_str() };
                    spans.push(Span::styled(text.to_string(), card_style(card, selected)));
                    Line::from(spans)
                })
                .collect();

            let cell = Paragraph::new(lines)
                .wrap(Wrap { trim: true })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(border_style(at_cursor, moving)),
                );
            f.render_widget(cell, cells[col + 1]);
        }
    }
}

fn split_columns(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(LABEL_WIDTH),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area)
}
