mod backup;
mod config;
mod dashboard;
mod dates;
mod db;
mod error;
mod logging;
mod models;
mod scheduler;
mod trends;
mod tui;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::warn;

use config::Config;
use db::Database;
use error::{Error, Result};
use logging::LogTarget;
use models::{Grade, Importance, JsonOutput};
use scheduler::{Scheduler, DEFAULT_DUE_LIMIT};

#[derive(Parser)]
#[command(name = "lctrack")]
#[command(about = "Track practice problems and review them on an importance-weighted schedule")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database and seed default tags
    Init,

    /// Record an attempt, creating the problem on first sight
    Add {
        /// Problem number
        lc_num: String,

        /// Problem title
        title: String,

        /// What you did and what tripped you up
        #[arg(long, short)]
        notes: String,

        /// Comma-separated tags (replaces existing when given)
        #[arg(long, short)]
        tags: Option<String>,

        /// Importance: low, medium, high (critical)
        #[arg(long, short)]
        importance: Option<String>,

        /// Attempt date, YYYY-MM-DD (default today)
        #[arg(long, short)]
        date: Option<String>,
    },

    /// Manage problems
    #[command(subcommand)]
    Problem(ProblemCommands),

    /// Manage attempts
    #[command(subcommand)]
    Attempt(AttemptCommands),

    /// Manage tags
    #[command(subcommand)]
    Tag(TagCommands),

    /// Show problems due for review
    Due {
        /// Maximum problems to show (1-5)
        #[arg(long, short, default_value_t = DEFAULT_DUE_LIMIT)]
        limit: usize,
    },

    /// Record a review for a problem
    Review {
        /// Problem ID
        id: i64,

        /// Grade: again, good, easy
        #[arg(long, short)]
        grade: Option<String>,
    },

    /// Hide a problem from the review queue until a date
    Snooze {
        /// Problem ID
        id: i64,

        /// Date, YYYY-MM-DD
        #[arg(long, short)]
        until: String,
    },

    /// Show progress summary
    Dashboard,

    /// Launch interactive terminal UI
    Tui,
}

#[derive(Subcommand)]
enum ProblemCommands {
    /// List problems
    List {
        /// Match number, title or tag
        #[arg(long, short)]
        search: Option<String>,

        /// Comma-separated tags, any of which must match
        #[arg(long, short)]
        tags: Option<String>,
    },

    /// Show problem details
    Show {
        /// Problem ID
        id: i64,
    },

    /// Delete a problem and its history
    Delete {
        /// Problem ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum AttemptCommands {
    /// Replace an attempt's notes
    Edit {
        /// Attempt ID
        id: i64,

        #[arg(long, short)]
        notes: String,
    },

    /// Delete an attempt
    Delete {
        /// Attempt ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum TagCommands {
    /// List all tags
    List,

    /// Add a tag
    Add { name: String },

    /// Rename a tag
    Rename { old: String, new: String },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env()?;
    let log_target = match cli.command {
        Commands::Tui => LogTarget::File(&config.tui_log_path),
        _ => LogTarget::Stderr,
    };
    logging::init_tracing(&config.log_filter, cli.verbose, log_target);

    config.ensure_db_dir()?;
    let db = Database::open(&config.db_path)?
        .with_scheduler(Scheduler::new(config.intervals.clone()));
    let seed: &[String] = if matches!(cli.command, Commands::Init) {
        &config.default_tags
    } else {
        &[]
    };
    db.init(seed)?;

    let changed = execute(&db, &config, cli.command, cli.json, dates::today())?;

    if changed {
        if let Err(e) = backup::backup_database(&config.db_path, &config.backup_dir, config.backup_keep) {
            warn!(error = %e, "backup failed");
        }
    }

    Ok(())
}

/// Run one command. Returns whether it wrote to the database.
fn execute(db: &Database, config: &Config, command: Commands, json: bool, today: NaiveDate) -> Result<bool> {
    let changed = match command {
        Commands::Init => {
            if json {
                print_json(&JsonOutput::<()>::ok(()))?;
            } else {
                println!("Database initialized at: {}", config.db_path.display());
            }
            false
        }

        Commands::Add {
            lc_num,
            title,
            notes,
            tags,
            importance,
            date,
        } => {
            require("problem number", &lc_num)?;
            require("title", &title)?;
            require("notes", &notes)?;
            let attempt_at = match date {
                Some(d) => parse_date(&d)?,
                None => today,
            };
            let importance = Importance::normalize(importance.as_deref());
            let tag_list = split_tags(tags.as_deref());

            let id = db.add_attempt(&lc_num, &title, &tag_list, importance, &notes, attempt_at)?;

            if json {
                print_json(&JsonOutput::ok(serde_json::json!({
                    "id": id,
                    "lc_num": lc_num.trim(),
                    "importance": importance,
                })))?;
            } else {
                println!(
                    "Recorded attempt for {} ({}) on {}, problem ID: {}",
                    lc_num.trim(),
                    importance.as_str(),
                    attempt_at,
                    id
                );
            }
            true
        }

        Commands::Problem(cmd) => match cmd {
            ProblemCommands::List { search, tags } => {
                let problems =
                    db.get_problems(search.as_deref().unwrap_or(""), &split_tags(tags.as_deref()))?;
                if json {
                    print_json(&JsonOutput::ok(&problems))?;
                } else if problems.is_empty() {
                    println!("No problems found.");
                } else {
                    println!(
                        "{:<5} {:<7} {:<36} {:<7} {:<10} {:<16} TAGS",
                        "ID", "NUM", "TITLE", "IMP", "LAST", "STATUS"
                    );
                    println!("{}", "-".repeat(100));
                    for p in problems {
                        let status = db.scheduler().status(&p, today);
                        println!(
                            "{:<5} {:<7} {:<36} {:<7} {:<10} {:<16} {}",
                            p.id,
                            truncate(&p.lc_num, 7),
                            truncate(&p.title, 34),
                            p.importance.as_str(),
                            p.last_attempt_at.map(dates::format_day).unwrap_or_else(|| "-".into()),
                            status.label(),
                            p.tag_list()
                        );
                    }
                }
                false
            }

            ProblemCommands::Show { id } => {
                if let Some(problem) = db.get_problem(id)? {
                    let attempts = db.get_attempts(id)?;
                    let reviews = db.get_review_events(id)?;
                    let status = db.scheduler().status(&problem, today);

                    if json {
                        print_json(&JsonOutput::ok(serde_json::json!({
                            "problem": problem,
                            "status": status,
                            "attempts": attempts,
                            "reviews": reviews,
                        })))?;
                    } else {
                        println!("Problem: {} {}", problem.lc_num, problem.title);
                        println!("ID: {}", problem.id);
                        println!("Importance: {}", problem.importance.as_str());
                        println!("Tags: {}", problem.tag_list());
                        println!("Reviews passed: {}", problem.review_count);
                        println!("Status: {}", status.label());
                        if let Some(last) = problem.last_attempt_at {
                            println!("Last attempt: {}", last);
                        }
                        if let Some(last) = problem.last_review_at {
                            println!("Last review: {}", last);
                        }

                        println!();
                        println!("--- Attempts ({}) ---", attempts.len());
                        for a in &attempts {
                            println!("[{}] {}  {}", a.id, a.attempt_at, a.notes);
                        }

                        if !reviews.is_empty() {
                            println!();
                            println!("--- Reviews ({}) ---", reviews.len());
                            for r in &reviews {
                                println!("{}  {}", r.reviewed_at, r.grade.as_str());
                            }
                        }
                    }
                } else {
                    not_found(json, "Problem")?;
                }
                false
            }

            ProblemCommands::Delete { id } => {
                let deleted = db.delete_problem(id)?;
                if deleted {
                    if json {
                        print_json(&JsonOutput::<()>::ok(()))?;
                    } else {
                        println!("Problem {} deleted.", id);
                    }
                } else {
                    not_found(json, "Problem")?;
                }
                deleted
            }
        },

        Commands::Attempt(cmd) => match cmd {
            AttemptCommands::Edit { id, notes } => {
                require("notes", &notes)?;
                let updated = db.update_attempt(id, &notes)?;
                if updated {
                    if json {
                        print_json(&JsonOutput::<()>::ok(()))?;
                    } else {
                        println!("Attempt {} updated.", id);
                    }
                } else {
                    not_found(json, "Attempt")?;
                }
                updated
            }

            AttemptCommands::Delete { id } => {
                let deleted = db.delete_attempt(id)?;
                if deleted {
                    if json {
                        print_json(&JsonOutput::<()>::ok(()))?;
                    } else {
                        println!("Attempt {} deleted.", id);
                    }
                } else {
                    not_found(json, "Attempt")?;
                }
                deleted
            }
        },

        Commands::Tag(cmd) => match cmd {
            TagCommands::List => {
                let tags = db.list_tags()?;
                if json {
                    print_json(&JsonOutput::ok(&tags))?;
                } else if tags.is_empty() {
                    println!("No tags found.");
                } else {
                    println!("{:<5} {:<30} PROBLEMS", "ID", "TAG");
                    println!("{}", "-".repeat(50));
                    for tag in tags {
                        println!("{:<5} {:<30} {}", tag.id, tag.name, tag.problem_count);
                    }
                }
                false
            }

            TagCommands::Add { name } => {
                require("tag name", &name)?;
                let added = db.add_tag(&name)?;
                if json {
                    print_json(&JsonOutput::<()>::ok(()))?;
                } else if added {
                    println!("Tag '{}' added.", name.trim());
                } else {
                    println!("Tag '{}' already exists.", name.trim());
                }
                added
            }

            TagCommands::Rename { old, new } => {
                let renamed = db.rename_tag(&old, &new)?;
                if renamed {
                    if json {
                        print_json(&JsonOutput::<()>::ok(()))?;
                    } else {
                        println!("Renamed tag '{}' to '{}'.", old.trim(), new.trim());
                    }
                } else if json {
                    print_json(&JsonOutput::<()>::err("Tag not renamed"))?;
                } else {
                    println!("Tag not renamed: source missing, target taken, or names blank.");
                }
                renamed
            }
        },

        Commands::Due { limit } => {
            let due = db.get_due_reviews(limit, today)?;
            if json {
                print_json(&JsonOutput::ok(&due))?;
            } else if due.is_empty() {
                println!("Nothing due. Come back tomorrow!");
            } else {
                println!("=== Due for review ({}) ===", today);
                for p in &due {
                    let status = db.scheduler().status(p, today);
                    println!(
                        "[{}] {} {}  ({}, {})",
                        p.id,
                        p.lc_num,
                        truncate(&p.title, 40),
                        p.importance.as_str(),
                        status.label()
                    );
                }
                println!();
                println!("Record a review with:");
                println!("  lctrack review <id> --grade <again|good|easy>");
            }
            false
        }

        Commands::Review { id, grade } => {
            let grade = Grade::parse(grade.as_deref());
            match db.mark_review(id, grade, today)? {
                Some(problem) => {
                    let status = db.scheduler().status(&problem, today);
                    if json {
                        print_json(&JsonOutput::ok(serde_json::json!({
                            "problem": problem,
                            "status": status,
                        })))?;
                    } else {
                        println!(
                            "Review recorded for {} ({}).",
                            problem.lc_num,
                            grade.as_str()
                        );
                        println!("Reviews passed: {}", problem.review_count);
                        println!("Next review: {}", status.label());
                    }
                    true
                }
                None => {
                    not_found(json, "Problem")?;
                    false
                }
            }
        }

        Commands::Snooze { id, until } => {
            let until = parse_date(&until)?;
            let snoozed = db.snooze(id, until)?;
            if snoozed {
                if json {
                    print_json(&JsonOutput::<()>::ok(()))?;
                } else if until <= today {
                    println!("Snooze for problem {} set to {}, which has already passed.", id, until);
                } else {
                    println!("Problem {} snoozed until {}.", id, until);
                }
            } else {
                not_found(json, "Problem")?;
            }
            snoozed
        }

        Commands::Dashboard => {
            let summary = db.get_dashboard_summary(today)?;
            if json {
                print_json(&JsonOutput::ok(&summary))?;
            } else {
                print_dashboard(&summary);
            }
            false
        }

        Commands::Tui => tui::run(db)?,
    };

    Ok(changed)
}

fn print_dashboard(summary: &dashboard::DashboardSummary) {
    println!("=== Dashboard ({}) ===", summary.today);
    println!(
        "Problems: {}  Attempts: {}  Reviews: {}  Tags: {}",
        summary.totals.problems, summary.totals.attempts, summary.totals.reviews, summary.totals.tags
    );
    println!(
        "Due now: {}  Due soon: {}  Snoozed: {}",
        summary.due.due_now, summary.due.due_soon, summary.due.snoozed
    );
    println!(
        "Streak: {} day(s)  Active days (7/30): {}/{}  Problems this week: {}",
        summary.activity.current_streak,
        summary.activity.active_days_7,
        summary.activity.active_days_30,
        summary.activity.problems_touched_7
    );

    let importance: Vec<String> = summary
        .importance
        .iter()
        .map(|c| format!("{} {}", c.importance.as_str(), c.count))
        .collect();
    println!("Importance: {}", importance.join("  "));

    if !summary.top_tags.is_empty() {
        let tags: Vec<String> = summary
            .top_tags
            .iter()
            .map(|t| format!("{} ({})", t.name, t.count))
            .collect();
        println!("Top tags: {}", tags.join(", "));
    }

    println!();
    println!("Last 7 days:");
    for bucket in &summary.trends.last_7_days {
        println!("  {}  {}", bucket.key, "#".repeat(bucket.count));
    }
}

fn print_json<T: serde::Serialize>(output: &JsonOutput<T>) -> Result<()> {
    println!("{}", serde_json::to_string(output)?);
    Ok(())
}

fn not_found(json: bool, what: &str) -> Result<()> {
    if json {
        print_json(&JsonOutput::<()>::err(format!("{} not found", what)))?;
    } else {
        println!("{} not found.", what);
    }
    Ok(())
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    dates::parse_day(value).ok_or_else(|| Error::InvalidDate(value.to_string()))
}

fn split_tags(tags: Option<&str>) -> Vec<String> {
    tags.map(|t| {
        t.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
