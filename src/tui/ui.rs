use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use super::widgets::{dashboard, problem_detail, problems};
use super::{App, View};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Help bar
        ])
        .split(f.area());

    draw_tabs(f, app, chunks[0]);
    draw_content(f, app, chunks[1]);
    draw_help_bar(f, app, chunks[2]);
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let selected = match app.view {
        View::Dashboard => 0,
        View::Problems | View::ProblemDetail => 1,
    };

    let tabs = Tabs::new(vec!["Dashboard", "Problems"])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" lctrack  {} ", app.today)),
        )
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(tabs, area);
}

fn draw_content(f: &mut Frame, app: &App, area: Rect) {
    match app.view {
        View::Dashboard => dashboard::draw(f, app, area),
        View::Problems => problems::draw(f, app, area),
        View::ProblemDetail => problem_detail::draw(f, app, area),
    }
}

fn key(label: &str) -> Span<'_> {
    Span::styled(label, Style::default().fg(Color::Cyan))
}

fn draw_help_bar(f: &mut Frame, app: &App, area: Rect) {
    let help_text = if app.filter_mode {
        vec![
            Span::styled("/", Style::default().fg(Color::Yellow)),
            Span::raw(app.filter_input.as_str()),
            Span::styled("█", Style::default().fg(Color::Yellow)),
            Span::raw(" | "),
            key("<CR>"),
            Span::raw(" Apply  "),
            key("<Esc>"),
            Span::raw(" Cancel"),
        ]
    } else if let Some(message) = &app.message {
        vec![Span::styled(
            message.as_str(),
            Style::default().fg(Color::Green),
        )]
    } else {
        let mut spans = vec![key("h/l"), Span::raw(" Views  ")];

        match app.view {
            View::Dashboard => {
                spans.extend(vec![
                    key("j/k"),
                    Span::raw(" Nav  "),
                    key("a/g/e"),
                    Span::raw(" Again/Good/Easy  "),
                    key("s"),
                    Span::raw(" Snooze 1d  "),
                    key("^r"),
                    Span::raw(" Refresh  "),
                ]);
            }
            View::Problems => {
                spans.extend(vec![
                    key("j/k"),
                    Span::raw(" Nav  "),
                    key("g/G"),
                    Span::raw(" Top/Bot  "),
                    key("l/<CR>"),
                    Span::raw(" Open  "),
                    key("/"),
                    Span::raw(" Search  "),
                ]);
                if app.filter.is_some() {
                    spans.extend(vec![key("<Esc>"), Span::raw(" Clear  ")]);
                }
            }
            View::ProblemDetail => {
                spans.extend(vec![
                    key("h/<Esc>"),
                    Span::raw(" Back  "),
                    key("^r"),
                    Span::raw(" Refresh  "),
                ]);
            }
        }

        spans.extend(vec![key("q"), Span::raw(" Quit")]);
        spans
    };

    let help = Paragraph::new(Line::from(help_text)).style(Style::default().bg(Color::DarkGray));

    f.render_widget(help, area);
}
