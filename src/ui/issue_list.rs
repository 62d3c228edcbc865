use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

use crate::app::{App, Focus};
use crate::ui::theme::{border_style, issue_color};

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus == Focus::Issues;
    let max_title = area.width.saturating_sub(10) as usize;

    let entries: Vec<(Option<u64>, &str)> = if app.show_hidden {
        app.board
            .hidden_cards()
            .into_iter()
            .map(|c| (c.issue_number(), c.text.as_str()))
            .collect()
    } else {
        app.board
            .issues()
            .iter()
            .map(|i| (Some(i.number), i.title.as_str()))
            .collect()
    };

    let items: Vec<ListItem> = entries
        .iter()
        .enumerate()
        .map(|(i, (number, title))| {
            let selected = focused && i == app.selected_issue;
            let number_span = Span::styled(
                number.map(|n| format!("#{n} ")).unwrap_or_default(),
                Style::default().fg(ratatui::style::Color::DarkGray),
            );
            let title: String = title.chars().take(max_title).collect();
            let title_style = if selected {
                Style::default()
                    .fg(ratatui::style::Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(issue_color())
            };
            ListItem::new(Line::from(vec![number_span, Span::styled(title, title_style)]))
        })
        .collect();

    let title = match (app.show_hidden, app.loading) {
        (true, _) => format!(" Hidden ({}) ", entries.len()),
        (false, true) => " Issues (loading...) ".to_string(),
        (false, false) => format!(" Issues ({}) ", entries.len()),
    };

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(focused, false))
            .title(title),
    );

    f.render_widget(list, area);
}
