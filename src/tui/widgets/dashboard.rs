use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::{importance_color, sparkline, status_color};
use crate::trends::TrendBucket;
use crate::truncate;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(10), // Stats + due queue
            Constraint::Min(0),     // Trends
        ])
        .split(area);

    let top_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[0]);

    draw_stats(f, app, top_chunks[0]);
    draw_due_queue(f, app, top_chunks[1]);
    draw_trends(f, app, chunks[1]);
}

fn stat<'a>(label: &'a str, value: String, color: Color) -> Line<'a> {
    Line::from(vec![
        Span::styled(label, Style::default().fg(Color::Gray)),
        Span::styled(value, Style::default().fg(color)),
    ])
}

fn draw_stats(f: &mut Frame, app: &App, area: Rect) {
    let s = &app.summary;

    let importance: Vec<Span> = s
        .importance
        .iter()
        .flat_map(|c| {
            [
                Span::styled(
                    format!("{} ", c.importance.as_str()),
                    Style::default().fg(importance_color(c.importance)),
                ),
                Span::raw(format!("{}  ", c.count)),
            ]
        })
        .collect();

    let top_tags = if s.top_tags.is_empty() {
        "-".to_string()
    } else {
        s.top_tags
            .iter()
            .map(|t| format!("{} {}", t.name, t.count))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let text = vec![
        Line::from(vec![
            Span::styled("Problems: ", Style::default().fg(Color::Gray)),
            Span::styled(
                s.totals.problems.to_string(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("  Attempts: ", Style::default().fg(Color::Gray)),
            Span::raw(s.totals.attempts.to_string()),
            Span::styled("  Reviews: ", Style::default().fg(Color::Gray)),
            Span::raw(s.totals.reviews.to_string()),
        ]),
        stat(
            "Due now: ",
            s.due.due_now.to_string(),
            if s.due.due_now > 0 {
                Color::Red
            } else {
                Color::White
            },
        ),
        stat("Due soon: ", s.due.due_soon.to_string(), Color::Yellow),
        stat("Snoozed: ", s.due.snoozed.to_string(), Color::DarkGray),
        stat(
            "Streak: ",
            format!("{} day(s)", s.activity.current_streak),
            Color::Green,
        ),
        stat(
            "Active (7d/30d): ",
            format!("{}/{}", s.activity.active_days_7, s.activity.active_days_30),
            Color::Cyan,
        ),
        Line::from(importance),
        stat("Top tags: ", truncate(&top_tags, 40), Color::Magenta),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Stats ")
        .title_style(Style::default().fg(Color::Cyan));

    f.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_due_queue(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Due ({}) ", app.summary.due.due_now))
        .title_style(Style::default().fg(Color::Yellow));

    if app.due.items.is_empty() {
        let empty = Paragraph::new("Nothing due. Come back tomorrow!")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = app
        .due
        .items
        .iter()
        .map(|p| {
            let status = app.status_of(p);
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<6}", p.lc_num), Style::default().fg(Color::DarkGray)),
                Span::styled(
                    format!("{:<28}", truncate(&p.title, 26)),
                    Style::default().fg(importance_color(p.importance)),
                ),
                Span::styled(status.label(), Style::default().fg(status_color(&status))),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.due.selected);
    f.render_stateful_widget(list, area, &mut state);
}

fn trend_line<'a>(label: &'a str, buckets: &[TrendBucket]) -> Line<'a> {
    let counts: Vec<usize> = buckets.iter().map(|b| b.count).collect();
    let total: usize = counts.iter().sum();
    Line::from(vec![
        Span::styled(format!("{:<10}", label), Style::default().fg(Color::Gray)),
        Span::styled(sparkline(&counts), Style::default().fg(Color::Green)),
        Span::styled(format!("  {}", total), Style::default().fg(Color::White)),
    ])
}

fn draw_trends(f: &mut Frame, app: &App, area: Rect) {
    let trends = &app.summary.trends;

    let first_month = trends
        .last_12_months
        .first()
        .map(|b| b.key.as_str())
        .unwrap_or("");

    let text = vec![
        trend_line("7 days", &trends.last_7_days),
        trend_line("30 days", &trends.last_30_days),
        trend_line("12 months", &trends.last_12_months),
        Line::from(""),
        Line::from(Span::styled(
            format!("Distinct problems per day, monthly from {}", first_month),
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Activity ")
        .title_style(Style::default().fg(Color::Magenta));

    f.render_widget(Paragraph::new(text).block(block), area);
}
