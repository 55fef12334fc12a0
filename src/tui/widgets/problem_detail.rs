use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use super::{importance_color, status_color};
use crate::models::{Grade, Problem};
use crate::truncate;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let Some(problem) = &app.selected_problem else {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Problem Detail ");
        let paragraph = Paragraph::new("No problem selected").block(block);
        f.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Header
            Constraint::Min(0),    // Attempts + reviews
        ])
        .split(area);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(chunks[1]);

    draw_header(f, app, problem, chunks[0]);
    draw_attempts(f, app, bottom[0]);
    draw_reviews(f, app, bottom[1]);
}

fn format_day(day: Option<chrono::NaiveDate>) -> String {
    day.map(|d| d.format("%b %d, %Y").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn draw_header(f: &mut Frame, app: &App, problem: &Problem, area: Rect) {
    let status = app.status_of(problem);

    let text = vec![
        Line::from(vec![
            Span::styled("Importance: ", Style::default().fg(Color::Gray)),
            Span::styled(
                problem.importance.as_str(),
                Style::default().fg(importance_color(problem.importance)),
            ),
            Span::styled("  Reviews passed: ", Style::default().fg(Color::Gray)),
            Span::styled(
                problem.review_count.to_string(),
                Style::default().fg(Color::White),
            ),
            Span::styled("  Next: ", Style::default().fg(Color::Gray)),
            Span::styled(status.label(), Style::default().fg(status_color(&status))),
        ]),
        Line::from(vec![
            Span::styled("Last attempt: ", Style::default().fg(Color::Gray)),
            Span::raw(format_day(problem.last_attempt_at)),
            Span::styled("  Last review: ", Style::default().fg(Color::Gray)),
            Span::raw(format_day(problem.last_review_at)),
            Span::styled("  Added: ", Style::default().fg(Color::Gray)),
            Span::raw(format_day(problem.created_at)),
        ]),
        Line::from(vec![
            Span::styled("Tags: ", Style::default().fg(Color::Gray)),
            Span::styled(problem.tag_list(), Style::default().fg(Color::Cyan)),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {}. {} ", problem.lc_num, problem.title))
        .title_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn draw_attempts(f: &mut Frame, app: &App, area: Rect) {
    let width = area.width.saturating_sub(16) as usize;
    let items: Vec<ListItem> = app
        .selected_attempts
        .iter()
        .map(|a| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<12}", a.attempt_at),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(truncate(&a.notes, width), Style::default().fg(Color::White)),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Attempts ({}) ", app.selected_attempts.len()))
        .title_style(Style::default().fg(Color::Cyan));

    if items.is_empty() {
        let paragraph = Paragraph::new("No attempts recorded.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(paragraph, area);
    } else {
        f.render_widget(List::new(items).block(block), area);
    }
}

fn draw_reviews(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .selected_reviews
        .iter()
        .map(|r| {
            let color = match r.grade {
                Grade::Again => Color::Red,
                Grade::Good => Color::Green,
                Grade::Easy => Color::Cyan,
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<12}", r.reviewed_at),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(r.grade.as_str(), Style::default().fg(color)),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Reviews ({}) ", app.selected_reviews.len()))
        .title_style(Style::default().fg(Color::Magenta));

    if items.is_empty() {
        let paragraph = Paragraph::new("Not reviewed yet.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(paragraph, area);
    } else {
        f.render_widget(List::new(items).block(block), area);
    }
}
