mod ui;
mod widgets;

use std::io;
use std::time::Duration;

use chrono::NaiveDate;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::dashboard::DashboardSummary;
use crate::dates;
use crate::db::Database;
use crate::error::Result;
use crate::models::{Attempt, Grade, Problem, ReviewEvent};
use crate::scheduler::{DueStatus, MAX_DUE_LIMIT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Problems,
    ProblemDetail,
}

impl View {
    fn next(&self) -> Self {
        match self {
            View::Dashboard => View::Problems,
            View::Problems => View::Dashboard,
            View::ProblemDetail => View::Problems,
        }
    }

    fn prev(&self) -> Self {
        match self {
            View::Dashboard => View::Problems,
            View::Problems => View::Dashboard,
            View::ProblemDetail => View::Problems,
        }
    }
}

pub struct StatefulList<T> {
    pub items: Vec<T>,
    pub selected: Option<usize>,
}

impl<T> StatefulList<T> {
    fn with_items(items: Vec<T>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    // Keep the cursor near where it was after the list is reloaded.
    fn replace(&mut self, items: Vec<T>) {
        let selected = match (self.selected, items.len()) {
            (_, 0) => None,
            (Some(i), len) => Some(i.min(len - 1)),
            (None, _) => Some(0),
        };
        self.items = items;
        self.selected = selected;
    }

    fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) if i + 1 < self.items.len() => i + 1,
            _ => 0,
        };
        self.selected = Some(i);
    }

    fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.selected = Some(i);
    }

    fn selected_item(&self) -> Option<&T> {
        self.selected.and_then(|i| self.items.get(i))
    }
}

pub struct App<'a> {
    db: &'a Database,
    pub today: NaiveDate,
    pub view: View,
    pub summary: DashboardSummary,
    pub due: StatefulList<Problem>,
    pub problems: StatefulList<Problem>,
    pub selected_problem: Option<Problem>,
    pub selected_attempts: Vec<Attempt>,
    pub selected_reviews: Vec<ReviewEvent>,
    pub filter: Option<String>,
    pub filter_input: String,
    pub filter_mode: bool,
    pub message: Option<String>,
    /// Set once a grade or snooze has been written.
    pub changed: bool,
    pub should_quit: bool,
}

impl<'a> App<'a> {
    pub fn new(db: &'a Database, today: NaiveDate) -> Result<Self> {
        Ok(Self {
            summary: db.get_dashboard_summary(today)?,
            due: StatefulList::with_items(db.get_due_reviews(MAX_DUE_LIMIT, today)?),
            problems: StatefulList::with_items(db.list_problems()?),
            db,
            today,
            view: View::Dashboard,
            selected_problem: None,
            selected_attempts: Vec::new(),
            selected_reviews: Vec::new(),
            filter: None,
            filter_input: String::new(),
            filter_mode: false,
            message: None,
            changed: false,
            should_quit: false,
        })
    }

    pub fn refresh_data(&mut self) -> Result<()> {
        self.summary = self.db.get_dashboard_summary(self.today)?;
        self.due
            .replace(self.db.get_due_reviews(MAX_DUE_LIMIT, self.today)?);
        self.load_problems()?;
        if let Some(id) = self.selected_problem.as_ref().map(|p| p.id) {
            self.open_problem(id)?;
        }
        Ok(())
    }

    pub fn status_of(&self, problem: &Problem) -> DueStatus {
        self.db.scheduler().status(problem, self.today)
    }

    fn load_problems(&mut self) -> Result<()> {
        let search = self.filter.as_deref().unwrap_or("");
        self.problems.replace(self.db.get_problems(search, &[])?);
        Ok(())
    }

    fn apply_filter(&mut self) -> Result<()> {
        let input = self.filter_input.trim();
        self.filter = if input.is_empty() {
            None
        } else {
            Some(input.to_string())
        };
        self.problems = StatefulList::with_items(Vec::new());
        self.load_problems()
    }

    fn open_problem(&mut self, id: i64) -> Result<()> {
        match self.db.get_problem(id)? {
            Some(problem) => {
                self.selected_attempts = self.db.get_attempts(id)?;
                self.selected_reviews = self.db.get_review_events(id)?;
                self.selected_problem = Some(problem);
            }
            None => {
                self.selected_problem = None;
                if self.view == View::ProblemDetail {
                    self.view = View::Problems;
                }
            }
        }
        Ok(())
    }

    fn select_problem(&mut self) -> Result<()> {
        if let Some(id) = self.problems.selected_item().map(|p| p.id) {
            self.open_problem(id)?;
            self.view = View::ProblemDetail;
        }
        Ok(())
    }

    fn grade_selected(&mut self, grade: Grade) -> Result<()> {
        let Some(id) = self.due.selected_item().map(|p| p.id) else {
            return Ok(());
        };
        if let Some(problem) = self.db.mark_review(id, grade, self.today)? {
            self.changed = true;
            let status = self.status_of(&problem);
            self.message = Some(format!(
                "{} graded {}, next review {}",
                problem.lc_num,
                grade.as_str(),
                status.label()
            ));
        }
        self.refresh_data()
    }

    fn snooze_selected(&mut self) -> Result<()> {
        let Some(id) = self.due.selected_item().map(|p| p.id) else {
            return Ok(());
        };
        let until = dates::add_days(self.today, 1);
        if self.db.snooze(id, until)? {
            self.changed = true;
            self.message = Some(format!("Snoozed until {}", until));
        }
        self.refresh_data()
    }

    fn back_to_list(&mut self) {
        self.view = View::Problems;
        self.selected_problem = None;
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> Result<()> {
        if self.filter_mode {
            match key {
                KeyCode::Esc => {
                    self.filter_mode = false;
                    self.filter_input.clear();
                }
                KeyCode::Enter => {
                    self.filter_mode = false;
                    self.apply_filter()?;
                }
                KeyCode::Backspace => {
                    self.filter_input.pop();
                }
                KeyCode::Char(c) => {
                    self.filter_input.push(c);
                }
                _ => {}
            }
            return Ok(());
        }

        self.message = None;

        match key {
            KeyCode::Char('q') => self.should_quit = true,

            KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.refresh_data()?;
            }

            KeyCode::Char('/') if self.view == View::Problems => {
                self.filter_mode = true;
                self.filter_input.clear();
            }

            // Grading and snoozing act on the due queue
            KeyCode::Char('a') if self.view == View::Dashboard => {
                self.grade_selected(Grade::Again)?
            }
            KeyCode::Char('g') if self.view == View::Dashboard => {
                self.grade_selected(Grade::Good)?
            }
            KeyCode::Char('e') if self.view == View::Dashboard => {
                self.grade_selected(Grade::Easy)?
            }
            KeyCode::Char('s') if self.view == View::Dashboard => self.snooze_selected()?,

            KeyCode::Esc => match self.view {
                View::ProblemDetail => self.back_to_list(),
                View::Problems if self.filter.is_some() => {
                    self.filter_input.clear();
                    self.apply_filter()?;
                }
                _ => {}
            },

            KeyCode::Char('h') | KeyCode::Left => match self.view {
                View::ProblemDetail => self.back_to_list(),
                _ => self.view = self.view.prev(),
            },
            KeyCode::Char('l') | KeyCode::Right => match self.view {
                View::Problems => self.select_problem()?,
                _ => self.view = self.view.next(),
            },

            KeyCode::Tab => self.view = self.view.next(),
            KeyCode::BackTab => self.view = self.view.prev(),

            KeyCode::Char('j') | KeyCode::Down => match self.view {
                View::Dashboard => self.due.next(),
                View::Problems => self.problems.next(),
                View::ProblemDetail => {}
            },
            KeyCode::Char('k') | KeyCode::Up => match self.view {
                View::Dashboard => self.due.previous(),
                View::Problems => self.problems.previous(),
                View::ProblemDetail => {}
            },

            KeyCode::Char('g') if !self.problems.items.is_empty() => {
                self.problems.selected = Some(0);
            }
            KeyCode::Char('G') if !self.problems.items.is_empty() => {
                self.problems.selected = Some(self.problems.items.len() - 1);
            }

            KeyCode::Enter if self.view == View::Problems => self.select_problem()?,

            _ => {}
        }
        Ok(())
    }
}

/// Returns whether the session wrote to the database.
pub fn run(db: &Database) -> Result<bool> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = App::new(db, dates::today())
        .and_then(|mut app| run_app(&mut terminal, &mut app).map(|()| app.changed));

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key.code, key.modifiers)?;
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
