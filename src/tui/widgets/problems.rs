use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::{importance_color, status_color};
use crate::truncate;
use crate::tui::App;

const HEADER: Style = Style::new().fg(Color::DarkGray).add_modifier(Modifier::BOLD);

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let title = match &app.filter {
        Some(search) => format!(" Problems (search: {}) ", search),
        None => format!(" Problems ({}) ", app.problems.items.len()),
    };

    let items: Vec<ListItem> = app
        .problems
        .items
        .iter()
        .map(|p| {
            let status = app.status_of(p);
            let last = p
                .days_since_attempt(app.today)
                .map(|d| format!("{}d ago", d))
                .unwrap_or_else(|| "-".to_string());

            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<7}", p.lc_num), Style::default().fg(Color::DarkGray)),
                Span::styled(
                    format!("{:<32}", truncate(&p.title, 30)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:<8}", p.importance.as_str()),
                    Style::default().fg(importance_color(p.importance)),
                ),
                Span::styled(format!("{:<10}", last), Style::default().fg(Color::Gray)),
                Span::styled(
                    format!("{:<16}", truncate(&status.label(), 15)),
                    Style::default().fg(status_color(&status)),
                ),
                Span::styled(p.tag_list(), Style::default().fg(Color::Cyan)),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().fg(Color::Cyan));

    // Indented to line up past the highlight symbol
    let header = Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("{:<7}", "Num"), HEADER),
        Span::styled(format!("{:<32}", "Title"), HEADER),
        Span::styled(format!("{:<8}", "Tier"), HEADER),
        Span::styled(format!("{:<10}", "Attempt"), HEADER),
        Span::styled(format!("{:<16}", "Review"), HEADER),
        Span::styled("Tags", HEADER),
    ]);

    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    let list = List::new(items)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.problems.selected);

    f.render_widget(Paragraph::new(header), rows[0]);
    f.render_stateful_widget(list, rows[1], &mut state);
}
