pub mod editor;
pub mod footer;
pub mod grid;
pub mod issue_list;
pub mod theme;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use crate::app::{App, Mode};

pub fn render(f: &mut Frame, app: &App) {
    let size = f.area();
    let editing = matches!(app.mode, Mode::Editing { .. });

    // Bottom bar: editor (3) while editing, else footer (1)
    let bottom_height = if editing { 3 } else { 1 };

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(bottom_height)])
        .split(size);

    // Grid (72%) + issues (28%)
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(72), Constraint::Percentage(28)])
        .split(vertical[0]);

    grid::render(f, horizontal[0], app);
    issue_list::render(f, horizontal[1], app);

    if editing {
        editor::render(f, vertical[1], app);
    } else {
        footer::render(f, vertical[1], app);
    }
}
