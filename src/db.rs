use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::dashboard::{self, DashboardSummary, Totals};
use crate::dates;
use crate::models::{Attempt, Grade, Importance, Problem, ReviewEvent, Tag};
use crate::scheduler::Scheduler;
use crate::trends::ActivityEvent;

const PROBLEM_SELECT: &str = r#"
    SELECT p.id, p.lc_num, p.title, p.importance, p.created_at,
           p.last_attempt_at, p.last_review_at, p.snooze_until, p.review_count,
           (SELECT COUNT(*) FROM attempts a WHERE a.problem_id = p.id) AS attempt_count
    FROM problems p
"#;

pub struct Database {
    conn: Connection,
    scheduler: Scheduler,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn,
            scheduler: Scheduler::default(),
        })
    }

    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn init(&self, default_tags: &[String]) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS problems (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                lc_num TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                importance TEXT NOT NULL DEFAULT 'Medium',
                created_at TEXT NOT NULL,
                last_attempt_at TEXT,
                last_review_at TEXT,
                review_count INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS problem_tags (
                problem_id INTEGER NOT NULL,
                tag_id INTEGER NOT NULL,
                PRIMARY KEY (problem_id, tag_id),
                FOREIGN KEY (problem_id) REFERENCES problems(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS attempts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                problem_id INTEGER NOT NULL,
                attempt_at TEXT NOT NULL,
                notes TEXT NOT NULL,
                FOREIGN KEY (problem_id) REFERENCES problems(id) ON DELETE CASCADE
            );

            -- Review history, one row per graded review
            CREATE TABLE IF NOT EXISTS review_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                problem_id INTEGER NOT NULL,
                reviewed_at TEXT NOT NULL,
                grade TEXT NOT NULL CHECK(grade IN ('again', 'good', 'easy')),
                FOREIGN KEY (problem_id) REFERENCES problems(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_problem_tags_problem ON problem_tags(problem_id);
            CREATE INDEX IF NOT EXISTS idx_problem_tags_tag ON problem_tags(tag_id);
            CREATE INDEX IF NOT EXISTS idx_attempts_problem ON attempts(problem_id);
            CREATE INDEX IF NOT EXISTS idx_review_events_problem ON review_events(problem_id);
            "#,
        )?;

        self.migrate()?;

        for tag in default_tags {
            self.get_or_create_tag(tag)?;
        }

        Ok(())
    }

    fn problem_columns(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("PRAGMA table_info(problems)")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
        rows.collect()
    }

    // Older databases call the tier `frequency` and predate snoozing
    fn migrate(&self) -> Result<()> {
        let columns = self.problem_columns()?;
        let has = |name: &str| columns.iter().any(|c| c == name);

        if !has("importance") {
            if has("frequency") {
                info!("migrating problems table: renaming frequency to importance");
                self.conn.execute_batch(
                    "ALTER TABLE problems RENAME COLUMN frequency TO importance;",
                )?;
            } else {
                info!("migrating problems table: adding importance");
                self.conn.execute_batch(
                    "ALTER TABLE problems ADD COLUMN importance TEXT NOT NULL DEFAULT 'Medium';",
                )?;
            }
        }

        if !has("snooze_until") {
            info!("migrating problems table: adding snooze_until");
            self.conn
                .execute_batch("ALTER TABLE problems ADD COLUMN snooze_until TEXT;")?;
        }

        if !has("review_count") {
            info!("migrating problems table: adding review_count");
            self.conn.execute_batch(
                "ALTER TABLE problems ADD COLUMN review_count INTEGER NOT NULL DEFAULT 0;",
            )?;
        }

        Ok(())
    }

    fn problem_from_row(row: &Row) -> Result<Problem> {
        let id: i64 = row.get(0)?;
        let importance: Option<String> = row.get(3)?;
        let review_count: i64 = row.get(8)?;

        let created: Option<String> = row.get(4)?;
        let attempted: Option<String> = row.get(5)?;
        let reviewed: Option<String> = row.get(6)?;

        // The newest stored activity date decides the clock, readable or not
        let unreadable_base = [&reviewed, &attempted, &created]
            .into_iter()
            .flatten()
            .find(|raw| !raw.trim().is_empty())
            .is_some_and(|raw| dates::parse_day(raw).is_none());

        Ok(Problem {
            id,
            lc_num: row.get(1)?,
            title: row.get(2)?,
            importance: Importance::normalize(importance.as_deref()),
            tags: vec![],
            created_at: stored_day(id, "created_at", created),
            last_attempt_at: stored_day(id, "last_attempt_at", attempted),
            last_review_at: stored_day(id, "last_review_at", reviewed),
            snooze_until: stored_day(id, "snooze_until", row.get(7)?),
            review_count: review_count.clamp(0, u32::MAX as i64) as u32,
            attempt_count: row.get(9)?,
            unreadable_base,
        })
    }

    // Problem operations
    pub fn add_attempt(
        &self,
        lc_num: &str,
        title: &str,
        tags: &[String],
        importance: Importance,
        notes: &str,
        attempt_at: NaiveDate,
    ) -> Result<i64> {
        let lc_num = lc_num.trim();
        let day = dates::format_day(attempt_at);

        let tx = self.conn.unchecked_transaction()?;

        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM problems WHERE lc_num = ?1",
                params![lc_num],
                |row| row.get(0),
            )
            .optional()?;

        let problem_id = match existing {
            Some(id) => {
                self.conn.execute(
                    r#"
                    UPDATE problems
                    SET title = ?1, importance = ?2, last_attempt_at = ?3,
                        last_review_at = ?3, snooze_until = NULL
                    WHERE id = ?4
                    "#,
                    params![title.trim(), importance.as_str(), day, id],
                )?;
                id
            }
            None => {
                self.conn.execute(
                    r#"
                    INSERT INTO problems
                        (lc_num, title, importance, created_at, last_attempt_at, last_review_at)
                    VALUES (?1, ?2, ?3, ?4, ?4, ?4)
                    "#,
                    params![lc_num, title.trim(), importance.as_str(), day],
                )?;
                self.conn.last_insert_rowid()
            }
        };

        let cleaned: Vec<String> = tags
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if !cleaned.is_empty() {
            self.update_problem_tags(problem_id, &cleaned)?;
        }

        self.conn.execute(
            "INSERT INTO attempts (problem_id, attempt_at, notes) VALUES (?1, ?2, ?3)",
            params![problem_id, day, notes.trim()],
        )?;

        tx.commit()?;

        debug!(problem_id, lc_num, "attempt recorded");
        Ok(problem_id)
    }

    pub fn get_problem(&self, id: i64) -> Result<Option<Problem>> {
        let query = format!("{} WHERE p.id = ?1", PROBLEM_SELECT);
        let problem = self
            .conn
            .query_row(&query, params![id], Self::problem_from_row)
            .optional()?;

        match problem {
            Some(mut p) => {
                p.tags = self.get_problem_tags(id)?;
                Ok(Some(p))
            }
            None => Ok(None),
        }
    }

    pub fn list_problems(&self) -> Result<Vec<Problem>> {
        self.get_problems("", &[])
    }

    /// Problems matching `search` (number, title or tag name) and carrying
    /// any of `tags`, most recently attempted first.
    pub fn get_problems(&self, search: &str, tags: &[String]) -> Result<Vec<Problem>> {
        let mut conditions: Vec<String> = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        let search = search.trim();
        if !search.is_empty() {
            let like = format!("%{}%", search);
            conditions.push(
                r#"(p.lc_num LIKE ? OR p.title LIKE ? OR EXISTS (
                    SELECT 1 FROM problem_tags pt JOIN tags t ON pt.tag_id = t.id
                    WHERE pt.problem_id = p.id AND t.name LIKE ?))"#
                    .to_string(),
            );
            for _ in 0..3 {
                params_vec.push(Box::new(like.clone()));
            }
        }

        let tag_values: Vec<&str> = tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty() && *t != "All")
            .collect();
        if !tag_values.is_empty() {
            let placeholders = vec!["?"; tag_values.len()].join(", ");
            conditions.push(format!(
                r#"EXISTS (SELECT 1 FROM problem_tags pt2 JOIN tags t2 ON pt2.tag_id = t2.id
                    WHERE pt2.problem_id = p.id AND t2.name IN ({}))"#,
                placeholders
            ));
            for tag in tag_values {
                params_vec.push(Box::new(tag.to_string()));
            }
        }

        let mut query = PROBLEM_SELECT.to_string();
        if !conditions.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&conditions.join(" AND "));
        }
        query.push_str(" ORDER BY p.last_attempt_at DESC, p.id ASC");

        let mut stmt = self.conn.prepare(&query)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();
        let rows = stmt.query_map(params_refs.as_slice(), Self::problem_from_row)?;
        let mut problems = rows.collect::<Result<Vec<_>>>()?;

        for problem in &mut problems {
            problem.tags = self.get_problem_tags(problem.id)?;
        }

        Ok(problems)
    }

    pub fn delete_problem(&self, id: i64) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        self.conn
            .execute("DELETE FROM problem_tags WHERE problem_id = ?1", params![id])?;
        self.conn
            .execute("DELETE FROM attempts WHERE problem_id = ?1", params![id])?;
        self.conn
            .execute("DELETE FROM review_events WHERE problem_id = ?1", params![id])?;
        let rows = self
            .conn
            .execute("DELETE FROM problems WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(rows > 0)
    }

    fn update_problem_tags(&self, problem_id: i64, tags: &[String]) -> Result<()> {
        self.conn.execute(
            "DELETE FROM problem_tags WHERE problem_id = ?1",
            params![problem_id],
        )?;

        for tag in tags {
            if let Some(tag_id) = self.get_or_create_tag(tag)? {
                self.conn.execute(
                    "INSERT OR IGNORE INTO problem_tags (problem_id, tag_id) VALUES (?1, ?2)",
                    params![problem_id, tag_id],
                )?;
            }
        }

        Ok(())
    }

    // Attempt operations
    pub fn get_attempts(&self, problem_id: i64) -> Result<Vec<Attempt>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, problem_id, attempt_at, notes
            FROM attempts
            WHERE problem_id = ?1
            ORDER BY attempt_at DESC, id DESC
            "#,
        )?;

        let rows = stmt.query_map(params![problem_id], |row| {
            Ok(Attempt {
                id: row.get(0)?,
                problem_id: row.get(1)?,
                attempt_at: row.get(2)?,
                notes: row.get(3)?,
            })
        })?;

        rows.collect()
    }

    pub fn update_attempt(&self, attempt_id: i64, notes: &str) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE attempts SET notes = ?1 WHERE id = ?2",
            params![notes.trim(), attempt_id],
        )?;
        Ok(rows > 0)
    }

    pub fn delete_attempt(&self, attempt_id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM attempts WHERE id = ?1", params![attempt_id])?;
        Ok(rows > 0)
    }

    // Tag operations
    fn get_or_create_tag(&self, name: &str) -> Result<Option<i64>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }

        let existing: Option<i64> = self
            .conn
            .query_row("SELECT id FROM tags WHERE name = ?1", params![name], |row| {
                row.get(0)
            })
            .optional()?;

        match existing {
            Some(id) => Ok(Some(id)),
            None => {
                self.conn
                    .execute("INSERT INTO tags (name) VALUES (?1)", params![name])?;
                Ok(Some(self.conn.last_insert_rowid()))
            }
        }
    }

    fn get_problem_tags(&self, problem_id: i64) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT t.name
            FROM tags t
            JOIN problem_tags pt ON t.id = pt.tag_id
            WHERE pt.problem_id = ?1
            ORDER BY t.name COLLATE NOCASE
            "#,
        )?;

        let rows = stmt.query_map(params![problem_id], |row| row.get(0))?;
        rows.collect::<Result<Vec<String>>>()
    }

    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT t.id, t.name, COUNT(pt.problem_id) as problem_count
            FROM tags t
            LEFT JOIN problem_tags pt ON t.id = pt.tag_id
            GROUP BY t.id, t.name
            ORDER BY t.name COLLATE NOCASE
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
                problem_count: row.get(2)?,
            })
        })?;

        rows.collect()
    }

    /// Returns false for a blank name or one that already exists.
    pub fn add_tag(&self, name: &str) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(false);
        }
        let rows = self
            .conn
            .execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", params![name])?;
        Ok(rows > 0)
    }

    pub fn rename_tag(&self, old: &str, new: &str) -> Result<bool> {
        let (old, new) = (old.trim(), new.trim());
        if old.is_empty() || new.is_empty() || old == new {
            return Ok(false);
        }

        let taken: Option<i64> = self
            .conn
            .query_row("SELECT id FROM tags WHERE name = ?1", params![new], |row| {
                row.get(0)
            })
            .optional()?;
        if taken.is_some() {
            return Ok(false);
        }

        let rows = self.conn.execute(
            "UPDATE tags SET name = ?1 WHERE name = ?2",
            params![new, old],
        )?;
        Ok(rows > 0)
    }

    // Review state
    pub fn update_review_state(
        &self,
        problem_id: i64,
        last_review_at: NaiveDate,
        review_count: u32,
        clear_snooze: bool,
    ) -> Result<bool> {
        let rows = self.conn.execute(
            r#"
            UPDATE problems
            SET last_review_at = ?1,
                review_count = ?2,
                snooze_until = CASE WHEN ?3 THEN NULL ELSE snooze_until END
            WHERE id = ?4
            "#,
            params![
                dates::format_day(last_review_at),
                review_count,
                clear_snooze,
                problem_id
            ],
        )?;
        Ok(rows > 0)
    }

    pub fn append_review_event(&self, problem_id: i64, date: NaiveDate, grade: Grade) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO review_events (problem_id, reviewed_at, grade) VALUES (?1, ?2, ?3)",
            params![problem_id, dates::format_day(date), grade.as_str()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn set_snooze(&self, problem_id: i64, until: NaiveDate) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE problems SET snooze_until = ?1 WHERE id = ?2",
            params![dates::format_day(until), problem_id],
        )?;
        Ok(rows > 0)
    }

    pub fn get_review_events(&self, problem_id: i64) -> Result<Vec<ReviewEvent>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT problem_id, reviewed_at, grade
            FROM review_events
            WHERE problem_id = ?1
            ORDER BY reviewed_at DESC, id DESC
            "#,
        )?;

        let rows = stmt.query_map(params![problem_id], |row| {
            let reviewed_at: String = row.get(1)?;
            let grade: String = row.get(2)?;
            Ok((row.get::<_, i64>(0)?, reviewed_at, grade))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (problem_id, reviewed_at, grade) = row?;
            if let Some(day) = stored_day(problem_id, "reviewed_at", Some(reviewed_at)) {
                events.push(ReviewEvent {
                    problem_id,
                    reviewed_at: day,
                    grade: Grade::parse(Some(&grade)),
                });
            }
        }
        Ok(events)
    }

    // Scheduling
    pub fn get_due_reviews(&self, limit: usize, today: NaiveDate) -> Result<Vec<Problem>> {
        let problems = self.list_problems()?;
        let due = self
            .scheduler
            .due_set(&problems, today, limit)
            .into_iter()
            .cloned()
            .collect();
        Ok(due)
    }

    /// Grade a review. Returns the updated problem, or `None` (and changes
    /// nothing) when the problem does not exist.
    pub fn mark_review(&self, problem_id: i64, grade: Grade, today: NaiveDate) -> Result<Option<Problem>> {
        let Some(mut problem) = self.get_problem(problem_id)? else {
            debug!(problem_id, "review for unknown problem ignored");
            return Ok(None);
        };

        let event = self.scheduler.record_review(&mut problem, grade, today);

        let tx = self.conn.unchecked_transaction()?;
        self.update_review_state(problem.id, today, problem.review_count, true)?;
        self.append_review_event(event.problem_id, event.reviewed_at, event.grade)?;
        tx.commit()?;

        info!(
            problem_id,
            grade = grade.as_str(),
            review_count = problem.review_count,
            "review recorded"
        );
        Ok(Some(problem))
    }

    /// Hide a problem from the due set until `until`. A date on or before
    /// today is stored but has no effect.
    pub fn snooze(&self, problem_id: i64, until: NaiveDate) -> Result<bool> {
        let Some(mut problem) = self.get_problem(problem_id)? else {
            debug!(problem_id, "snooze for unknown problem ignored");
            return Ok(false);
        };

        self.scheduler.snooze(&mut problem, until);
        debug!(problem_id, until = %until, "problem snoozed");
        self.set_snooze(problem.id, until)
    }

    // Stats
    pub fn get_totals(&self) -> Result<Totals> {
        let count = |table: &str| -> Result<i64> {
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        };

        Ok(Totals {
            problems: count("problems")?,
            attempts: count("attempts")?,
            reviews: count("review_events")?,
            tags: count("tags")?,
        })
    }

    /// Every attempt and review with a readable date.
    pub fn activity_events(&self) -> Result<Vec<ActivityEvent>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT problem_id, attempt_at FROM attempts
            UNION ALL
            SELECT problem_id, reviewed_at FROM review_events
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (problem_id, date) = row?;
            if let Some(date) = stored_day(problem_id, "activity", Some(date)) {
                events.push(ActivityEvent { problem_id, date });
            }
        }
        Ok(events)
    }

    pub fn get_dashboard_summary(&self, today: NaiveDate) -> Result<DashboardSummary> {
        let problems = self.list_problems()?;
        let events = self.activity_events()?;
        let totals = self.get_totals()?;

        Ok(dashboard::build_summary(
            &self.scheduler,
            &problems,
            &events,
            totals,
            today,
        ))
    }
}

// Parse a stored day, logging rather than failing on garbage.
fn stored_day(problem_id: i64, field: &str, value: Option<String>) -> Option<NaiveDate> {
    let raw = value?;
    let day = dates::parse_day(&raw);
    if day.is_none() && !raw.trim().is_empty() {
        warn!(problem_id, field, value = %raw, "ignoring malformed stored date");
    }
    day
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        let db = Database::open(":memory:").expect("Failed to create in-memory database");
        db.init(&[]).expect("Failed to initialize database");
        db
    }

    fn day(s: &str) -> NaiveDate {
        dates::parse_day(s).unwrap()
    }

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn add(db: &Database, lc_num: &str, importance: Importance, on: &str) -> i64 {
        db.add_attempt(lc_num, &format!("Problem {}", lc_num), &[], importance, "notes", day(on))
            .unwrap()
    }

    mod init_tests {
        use super::*;

        #[test]
        fn init_creates_tables() {
            let db = setup_db();
            for table in ["tags", "problems", "problem_tags", "attempts", "review_events"] {
                let count: i64 = db
                    .conn
                    .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
                    .unwrap_or_else(|_| panic!("{} table should exist", table));
                assert_eq!(count, 0);
            }
        }

        #[test]
        fn init_seeds_default_tags() {
            let db = Database::open(":memory:").unwrap();
            db.init(&tags(&["Array", "DP"])).unwrap();
            let names: Vec<String> = db.list_tags().unwrap().into_iter().map(|t| t.name).collect();
            assert_eq!(names, vec!["Array", "DP"]);
        }

        #[test]
        fn init_is_idempotent() {
            let db = Database::open(":memory:").unwrap();
            db.init(&tags(&["Array"])).unwrap();
            add(&db, "1", Importance::Medium, "2024-01-01");

            db.init(&tags(&["Array"])).expect("Re-init should succeed");

            assert_eq!(db.list_problems().unwrap().len(), 1);
            assert_eq!(db.list_tags().unwrap().len(), 1);
        }

        #[test]
        fn init_migrates_missing_snooze_column() {
            let db = Database::open(":memory:").unwrap();
            db.conn
                .execute_batch(
                    r#"
                    CREATE TABLE problems (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        lc_num TEXT NOT NULL UNIQUE,
                        title TEXT NOT NULL,
                        importance TEXT NOT NULL DEFAULT 'Medium',
                        created_at TEXT NOT NULL,
                        last_attempt_at TEXT,
                        last_review_at TEXT,
                        review_count INTEGER NOT NULL DEFAULT 0
                    );
                    INSERT INTO problems (lc_num, title, created_at) VALUES ('1', 'Old', '2023-05-01');
                    "#,
                )
                .unwrap();

            db.init(&[]).unwrap();

            let problem = db.get_problem(1).unwrap().unwrap();
            assert_eq!(problem.title, "Old");
            assert!(problem.snooze_until.is_none());
        }

        #[test]
        fn init_migrates_frequency_column() {
            let db = Database::open(":memory:").unwrap();
            db.conn
                .execute_batch(
                    r#"
                    CREATE TABLE tags (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        name TEXT UNIQUE NOT NULL
                    );
                    CREATE TABLE problems (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        lc_num TEXT UNIQUE NOT NULL,
                        title TEXT NOT NULL,
                        tag_id INTEGER,
                        frequency TEXT NOT NULL,
                        created_at TEXT NOT NULL,
                        last_attempt_at TEXT,
                        last_review_at TEXT,
                        review_count INTEGER NOT NULL DEFAULT 0,
                        FOREIGN KEY (tag_id) REFERENCES tags (id)
                    );
                    INSERT INTO problems (lc_num, title, frequency, created_at, last_attempt_at, review_count)
                    VALUES ('1', 'Two Sum', 'Low', '2023-05-01', '2023-05-02', 2);
                    "#,
                )
                .unwrap();

            db.init(&[]).unwrap();

            let problems = db.list_problems().unwrap();
            assert_eq!(problems.len(), 1);
            assert_eq!(problems[0].importance, Importance::Low);
            assert_eq!(problems[0].review_count, 2);
            assert!(problems[0].snooze_until.is_none());

            // the migrated table still takes new problems
            add(&db, "70", Importance::High, "2024-01-01");
            assert_eq!(db.list_problems().unwrap().len(), 2);

            db.init(&[]).expect("Re-init after migration should succeed");
        }
    }

    mod attempt_tests {
        use super::*;

        #[test]
        fn add_attempt_creates_problem() {
            let db = setup_db();
            let id = db
                .add_attempt(
                    " 1 ",
                    " Two Sum ",
                    &tags(&["Array", " HashMap ", ""]),
                    Importance::High,
                    "  used a map  ",
                    day("2024-02-01"),
                )
                .unwrap();

            let p = db.get_problem(id).unwrap().unwrap();
            assert_eq!(p.lc_num, "1");
            assert_eq!(p.title, "Two Sum");
            assert_eq!(p.importance, Importance::High);
            assert_eq!(p.tags, vec!["Array", "HashMap"]);
            assert_eq!(p.created_at, Some(day("2024-02-01")));
            assert_eq!(p.last_attempt_at, Some(day("2024-02-01")));
            assert_eq!(p.last_review_at, Some(day("2024-02-01")));
            assert_eq!(p.review_count, 0);
            assert_eq!(p.attempt_count, 1);

            let attempts = db.get_attempts(id).unwrap();
            assert_eq!(attempts[0].notes, "used a map");
        }

        #[test]
        fn repeat_attempt_updates_existing_problem() {
            let db = setup_db();
            let id = db
                .add_attempt("1", "Two Sum", &tags(&["Array"]), Importance::Low, "a", day("2024-02-01"))
                .unwrap();
            db.snooze(id, day("2024-12-01")).unwrap();
            db.mark_review(id, Grade::Easy, day("2024-02-05")).unwrap();

            let again = db
                .add_attempt("1", "Two Sum II", &[], Importance::High, "b", day("2024-03-01"))
                .unwrap();
            assert_eq!(again, id);

            let p = db.get_problem(id).unwrap().unwrap();
            assert_eq!(p.title, "Two Sum II");
            assert_eq!(p.importance, Importance::High);
            assert_eq!(p.created_at, Some(day("2024-02-01")));
            assert_eq!(p.last_attempt_at, Some(day("2024-03-01")));
            assert_eq!(p.last_review_at, Some(day("2024-03-01")));
            assert!(p.snooze_until.is_none());
            // review progress survives a new attempt
            assert_eq!(p.review_count, 2);
            // empty tag list keeps old tags
            assert_eq!(p.tags, vec!["Array"]);
            assert_eq!(p.attempt_count, 2);
        }

        #[test]
        fn repeat_attempt_replaces_tags_when_given() {
            let db = setup_db();
            let id = db
                .add_attempt("1", "T", &tags(&["Array"]), Importance::Medium, "a", day("2024-02-01"))
                .unwrap();
            db.add_attempt("1", "T", &tags(&["DP", "Greedy"]), Importance::Medium, "b", day("2024-02-02"))
                .unwrap();
            assert_eq!(db.get_problem(id).unwrap().unwrap().tags, vec!["DP", "Greedy"]);
        }

        #[test]
        fn attempts_newest_first() {
            let db = setup_db();
            let id = add(&db, "1", Importance::Medium, "2024-01-01");
            db.add_attempt("1", "T", &[], Importance::Medium, "second", day("2024-01-05"))
                .unwrap();

            let attempts = db.get_attempts(id).unwrap();
            assert_eq!(attempts.len(), 2);
            assert_eq!(attempts[0].attempt_at, "2024-01-05");
            assert_eq!(attempts[1].attempt_at, "2024-01-01");
        }

        #[test]
        fn update_and_delete_attempt() {
            let db = setup_db();
            let id = add(&db, "1", Importance::Medium, "2024-01-01");
            let attempt_id = db.get_attempts(id).unwrap()[0].id;

            assert!(db.update_attempt(attempt_id, " better notes ").unwrap());
            assert_eq!(db.get_attempts(id).unwrap()[0].notes, "better notes");

            assert!(db.delete_attempt(attempt_id).unwrap());
            assert!(db.get_attempts(id).unwrap().is_empty());

            assert!(!db.update_attempt(999, "x").unwrap());
            assert!(!db.delete_attempt(999).unwrap());
        }

        #[test]
        fn delete_problem_removes_history() {
            let db = setup_db();
            let id = db
                .add_attempt("1", "T", &tags(&["Array"]), Importance::High, "a", day("2024-01-01"))
                .unwrap();
            db.mark_review(id, Grade::Good, day("2024-01-03")).unwrap();

            assert!(db.delete_problem(id).unwrap());
            assert!(db.get_problem(id).unwrap().is_none());
            assert!(db.get_attempts(id).unwrap().is_empty());
            assert!(db.get_review_events(id).unwrap().is_empty());
            assert_eq!(db.list_tags().unwrap()[0].problem_count, 0);

            assert!(!db.delete_problem(id).unwrap());
        }

        #[test]
        fn failed_attempt_insert_leaves_nothing_behind() {
            let db = setup_db();
            db.conn
                .execute_batch(
                    r#"
                    CREATE TRIGGER reject_attempts BEFORE INSERT ON attempts
                    BEGIN SELECT RAISE(ABORT, 'attempts are read-only'); END;
                    "#,
                )
                .unwrap();

            let result = db.add_attempt("1", "Two Sum", &tags(&["Array"]), Importance::High, "n", day("2024-01-01"));
            assert!(result.is_err());

            assert!(db.list_problems().unwrap().is_empty());
            assert!(db.list_tags().unwrap().is_empty());
        }

        #[test]
        fn failed_delete_keeps_history() {
            let db = setup_db();
            let id = db
                .add_attempt("1", "T", &tags(&["Array"]), Importance::High, "a", day("2024-01-01"))
                .unwrap();
            db.conn
                .execute_batch(
                    r#"
                    CREATE TRIGGER keep_problems BEFORE DELETE ON problems
                    BEGIN SELECT RAISE(ABORT, 'problems are permanent'); END;
                    "#,
                )
                .unwrap();

            assert!(db.delete_problem(id).is_err());

            let p = db.get_problem(id).unwrap().unwrap();
            assert_eq!(p.tags, vec!["Array"]);
            assert_eq!(db.get_attempts(id).unwrap().len(), 1);
        }
    }

    mod query_tests {
        use super::*;

        fn seed(db: &Database) {
            db.add_attempt("1", "Two Sum", &tags(&["Array", "HashMap"]), Importance::High, "n", day("2024-01-03"))
                .unwrap();
            db.add_attempt("70", "Climbing Stairs", &tags(&["DP"]), Importance::Medium, "n", day("2024-01-05"))
                .unwrap();
            db.add_attempt("200", "Number of Islands", &tags(&["Graph"]), Importance::Low, "n", day("2024-01-01"))
                .unwrap();
        }

        #[test]
        fn list_ordered_by_last_attempt_desc() {
            let db = setup_db();
            seed(&db);
            let nums: Vec<String> = db.list_problems().unwrap().into_iter().map(|p| p.lc_num).collect();
            assert_eq!(nums, vec!["70", "1", "200"]);
        }

        #[test]
        fn search_matches_number_title_and_tag() {
            let db = setup_db();
            seed(&db);

            let by_num = db.get_problems("200", &[]).unwrap();
            assert_eq!(by_num.len(), 1);
            assert_eq!(by_num[0].title, "Number of Islands");

            let by_title = db.get_problems("stairs", &[]).unwrap();
            assert_eq!(by_title.len(), 1);
            assert_eq!(by_title[0].lc_num, "70");

            let by_tag = db.get_problems("Hash", &[]).unwrap();
            assert_eq!(by_tag.len(), 1);
            // matching on one tag still reports all of them
            assert_eq!(by_tag[0].tags, vec!["Array", "HashMap"]);
        }

        #[test]
        fn tag_filter_matches_any() {
            let db = setup_db();
            seed(&db);

            let filtered = db.get_problems("", &tags(&["DP", "Graph"])).unwrap();
            assert_eq!(filtered.len(), 2);

            let all = db.get_problems("", &tags(&["All"])).unwrap();
            assert_eq!(all.len(), 3);

            let none = db.get_problems("", &tags(&["Trie"])).unwrap();
            assert!(none.is_empty());
        }

        #[test]
        fn search_and_tag_filter_combine() {
            let db = setup_db();
            seed(&db);
            assert!(db.get_problems("Two", &tags(&["DP"])).unwrap().is_empty());
            assert_eq!(db.get_problems("Two", &tags(&["Array"])).unwrap().len(), 1);
        }

        #[test]
        fn get_problem_not_found() {
            let db = setup_db();
            assert!(db.get_problem(999).unwrap().is_none());
        }

        #[test]
        fn malformed_stored_dates_read_as_absent() {
            let db = setup_db();
            let id = add(&db, "1", Importance::Medium, "2024-01-01");
            db.conn
                .execute(
                    "UPDATE problems SET last_review_at = 'soon', snooze_until = '2024-13-01', importance = 'critical' WHERE id = ?1",
                    params![id],
                )
                .unwrap();

            let p = db.get_problem(id).unwrap().unwrap();
            assert!(p.last_review_at.is_none());
            assert!(p.snooze_until.is_none());
            assert_eq!(p.last_attempt_at, Some(day("2024-01-01")));
            assert_eq!(p.importance, Importance::High);
            assert!(p.unreadable_base);

            // an unreadable last review restarts the clock instead of
            // falling back to the older attempt
            assert!(db.get_due_reviews(3, day("2024-02-01")).unwrap().is_empty());
        }

        #[test]
        fn blank_review_date_falls_back_to_attempt() {
            let db = setup_db();
            let id = add(&db, "1", Importance::High, "2024-01-01");
            db.conn
                .execute("UPDATE problems SET last_review_at = '' WHERE id = ?1", params![id])
                .unwrap();

            assert!(!db.get_problem(id).unwrap().unwrap().unreadable_base);
            assert_eq!(db.get_due_reviews(3, day("2024-02-01")).unwrap().len(), 1);
        }
    }

    mod tag_tests {
        use super::*;

        #[test]
        fn list_tags_with_counts() {
            let db = setup_db();
            db.add_attempt("1", "A", &tags(&["common"]), Importance::Medium, "n", day("2024-01-01"))
                .unwrap();
            db.add_attempt("2", "B", &tags(&["common", "rare"]), Importance::Medium, "n", day("2024-01-01"))
                .unwrap();

            let all = db.list_tags().unwrap();
            let common = all.iter().find(|t| t.name == "common").unwrap();
            assert_eq!(common.problem_count, 2);
            let rare = all.iter().find(|t| t.name == "rare").unwrap();
            assert_eq!(rare.problem_count, 1);
        }

        #[test]
        fn list_tags_case_insensitive_order() {
            let db = setup_db();
            db.add_tag("beta").unwrap();
            db.add_tag("Alpha").unwrap();
            db.add_tag("gamma").unwrap();
            let names: Vec<String> = db.list_tags().unwrap().into_iter().map(|t| t.name).collect();
            assert_eq!(names, vec!["Alpha", "beta", "gamma"]);
        }

        #[test]
        fn add_tag_trims_and_dedupes() {
            let db = setup_db();
            assert!(db.add_tag(" Trie ").unwrap());
            assert!(!db.add_tag("Trie").unwrap());
            assert!(!db.add_tag("   ").unwrap());
            assert_eq!(db.list_tags().unwrap().len(), 1);
        }

        #[test]
        fn rename_tag_rules() {
            let db = setup_db();
            db.add_tag("DP").unwrap();
            db.add_tag("Graph").unwrap();

            assert!(!db.rename_tag("", "X").unwrap());
            assert!(!db.rename_tag("DP", " ").unwrap());
            assert!(!db.rename_tag("DP", "DP").unwrap());
            assert!(!db.rename_tag("DP", "Graph").unwrap());
            assert!(!db.rename_tag("Missing", "New").unwrap());

            assert!(db.rename_tag(" DP ", "Dynamic Programming").unwrap());
            let names: Vec<String> = db.list_tags().unwrap().into_iter().map(|t| t.name).collect();
            assert_eq!(names, vec!["Dynamic Programming", "Graph"]);
        }

        #[test]
        fn rename_keeps_problem_links() {
            let db = setup_db();
            let id = db
                .add_attempt("1", "A", &tags(&["dp"]), Importance::Medium, "n", day("2024-01-01"))
                .unwrap();
            db.rename_tag("dp", "DP").unwrap();
            assert_eq!(db.get_problem(id).unwrap().unwrap().tags, vec!["DP"]);
        }
    }

    mod review_tests {
        use super::*;

        #[test]
        fn mark_review_good_advances_and_logs() {
            let db = setup_db();
            let id = add(&db, "1", Importance::High, "2024-01-01");

            let p = db.mark_review(id, Grade::Good, day("2024-01-03")).unwrap().unwrap();
            assert_eq!(p.review_count, 1);
            assert_eq!(p.last_review_at, Some(day("2024-01-03")));

            let stored = db.get_problem(id).unwrap().unwrap();
            assert_eq!(stored.review_count, 1);
            assert_eq!(stored.last_review_at, Some(day("2024-01-03")));

            let events = db.get_review_events(id).unwrap();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].grade, Grade::Good);
            assert_eq!(events[0].reviewed_at, day("2024-01-03"));
        }

        #[test]
        fn mark_review_easy_then_again() {
            let db = setup_db();
            let id = add(&db, "1", Importance::High, "2024-01-01");

            db.mark_review(id, Grade::Easy, day("2024-01-02")).unwrap();
            db.mark_review(id, Grade::Easy, day("2024-01-05")).unwrap();
            assert_eq!(db.get_problem(id).unwrap().unwrap().review_count, 4);

            db.mark_review(id, Grade::Again, day("2024-01-20")).unwrap();
            assert_eq!(db.get_problem(id).unwrap().unwrap().review_count, 0);

            let events = db.get_review_events(id).unwrap();
            let grades: Vec<Grade> = events.iter().map(|e| e.grade).collect();
            assert_eq!(grades, vec![Grade::Again, Grade::Easy, Grade::Easy]);
        }

        #[test]
        fn mark_review_clears_snooze() {
            let db = setup_db();
            let id = add(&db, "1", Importance::High, "2024-01-01");
            db.snooze(id, day("2024-06-01")).unwrap();

            db.mark_review(id, Grade::Good, day("2024-01-03")).unwrap();
            assert!(db.get_problem(id).unwrap().unwrap().snooze_until.is_none());
        }

        #[test]
        fn mark_review_unknown_problem_is_noop() {
            let db = setup_db();
            assert!(db.mark_review(42, Grade::Good, day("2024-01-03")).unwrap().is_none());
            assert_eq!(db.get_totals().unwrap().reviews, 0);
        }

        #[test]
        fn snooze_unknown_problem_is_noop() {
            let db = setup_db();
            assert!(!db.snooze(42, day("2024-01-03")).unwrap());
        }

        #[test]
        fn update_review_state_can_keep_snooze() {
            let db = setup_db();
            let id = add(&db, "1", Importance::High, "2024-01-01");
            db.set_snooze(id, day("2024-02-01")).unwrap();

            assert!(db.update_review_state(id, day("2024-01-10"), 3, false).unwrap());
            let p = db.get_problem(id).unwrap().unwrap();
            assert_eq!(p.review_count, 3);
            assert_eq!(p.snooze_until, Some(day("2024-02-01")));

            assert!(db.update_review_state(id, day("2024-01-11"), 4, true).unwrap());
            assert!(db.get_problem(id).unwrap().unwrap().snooze_until.is_none());
        }
    }

    mod due_tests {
        use super::*;
        use crate::scheduler::IntervalTable;

        #[test]
        fn due_reviews_oldest_first() {
            let db = setup_db();
            add(&db, "a", Importance::High, "2024-01-01");
            add(&db, "c", Importance::High, "2024-01-03");
            add(&db, "b", Importance::High, "2024-01-02");

            let due = db.get_due_reviews(5, day("2024-02-01")).unwrap();
            let nums: Vec<&str> = due.iter().map(|p| p.lc_num.as_str()).collect();
            assert_eq!(nums, vec!["a", "b", "c"]);
        }

        #[test]
        fn due_reviews_limit_clamped() {
            let db = setup_db();
            for i in 0..7 {
                add(&db, &i.to_string(), Importance::High, "2024-01-01");
            }
            let today = day("2024-02-01");
            assert_eq!(db.get_due_reviews(0, today).unwrap().len(), 1);
            assert_eq!(db.get_due_reviews(50, today).unwrap().len(), 5);
        }

        #[test]
        fn snoozed_problem_not_due() {
            let db = setup_db();
            let id = add(&db, "1", Importance::High, "2024-01-01");
            let today = day("2024-02-01");

            db.snooze(id, day("2024-02-02")).unwrap();
            assert!(db.get_due_reviews(3, today).unwrap().is_empty());

            db.snooze(id, day("2024-01-31")).unwrap();
            assert_eq!(db.get_due_reviews(3, today).unwrap().len(), 1);
        }

        #[test]
        fn review_resets_clock() {
            let db = setup_db();
            let id = add(&db, "1", Importance::Medium, "2024-01-01");
            let today = day("2024-02-01");
            assert_eq!(db.get_due_reviews(3, today).unwrap().len(), 1);

            db.mark_review(id, Grade::Good, today).unwrap();
            assert!(db.get_due_reviews(3, today).unwrap().is_empty());
            // Medium stage 1 is four days
            assert!(db.get_due_reviews(3, day("2024-02-04")).unwrap().is_empty());
            assert_eq!(db.get_due_reviews(3, day("2024-02-05")).unwrap().len(), 1);
        }

        #[test]
        fn custom_interval_table() {
            let table = IntervalTable::new(vec![30], vec![30], vec![10, 20]).unwrap();
            let db = setup_db().with_scheduler(Scheduler::new(table));
            let id = add(&db, "1", Importance::High, "2024-01-01");

            assert!(db.get_due_reviews(3, day("2024-01-10")).unwrap().is_empty());
            assert_eq!(db.get_due_reviews(3, day("2024-01-11")).unwrap().len(), 1);

            db.mark_review(id, Grade::Easy, day("2024-01-11")).unwrap();
            // past the end of the sequence, the last interval repeats
            assert!(db.get_due_reviews(3, day("2024-01-30")).unwrap().is_empty());
            assert_eq!(db.get_due_reviews(3, day("2024-01-31")).unwrap().len(), 1);
        }

        #[test]
        fn unparseable_dates_fall_back_to_today() {
            let db = setup_db();
            let id = add(&db, "1", Importance::High, "2024-01-01");
            db.conn
                .execute(
                    "UPDATE problems SET created_at = 'x', last_attempt_at = NULL, last_review_at = 'y' WHERE id = ?1",
                    params![id],
                )
                .unwrap();

            let today = day("2024-02-01");
            assert!(db.get_due_reviews(3, today).unwrap().is_empty());
            let summary = db.get_dashboard_summary(today).unwrap();
            assert_eq!(summary.due.due_now, 0);
            assert_eq!(summary.due.due_soon, 1);
        }
    }

    mod dashboard_tests {
        use super::*;

        #[test]
        fn summary_on_empty_db() {
            let db = setup_db();
            let summary = db.get_dashboard_summary(day("2024-02-01")).unwrap();
            assert_eq!(summary.totals, Totals::default());
            assert_eq!(summary.due.due_now, 0);
            assert_eq!(summary.trends.last_7_days.len(), 7);
            assert!(summary.trends.last_7_days.iter().all(|b| b.count == 0));
            assert!(summary.top_tags.is_empty());
        }

        #[test]
        fn summary_counts_attempts_and_reviews() {
            let db = setup_db();
            let a = db
                .add_attempt("1", "A", &tags(&["Array"]), Importance::High, "n", day("2024-01-30"))
                .unwrap();
            db.add_attempt("2", "B", &tags(&["Array", "DP"]), Importance::Low, "n", day("2024-01-31"))
                .unwrap();
            db.mark_review(a, Grade::Good, day("2024-02-01")).unwrap();

            let today = day("2024-02-01");
            let summary = db.get_dashboard_summary(today).unwrap();

            assert_eq!(
                summary.totals,
                Totals {
                    problems: 2,
                    attempts: 2,
                    reviews: 1,
                    tags: 2,
                }
            );
            assert_eq!(summary.activity.current_streak, 3);
            assert_eq!(summary.activity.problems_touched_7, 2);
            assert_eq!(summary.top_tags[0].name, "Array");
            assert_eq!(summary.top_tags[0].count, 2);

            let week: Vec<usize> = summary.trends.last_7_days.iter().map(|b| b.count).collect();
            assert_eq!(week, vec![0, 0, 0, 0, 1, 1, 1]);
            assert_eq!(summary.trends.last_12_months[10].key, "2024-01");
            assert_eq!(summary.trends.last_12_months[10].count, 2);
            assert_eq!(summary.trends.last_12_months[11].count, 1);
        }

        #[test]
        fn activity_events_skip_bad_dates() {
            let db = setup_db();
            let id = add(&db, "1", Importance::High, "2024-01-01");
            db.conn
                .execute(
                    "INSERT INTO attempts (problem_id, attempt_at, notes) VALUES (?1, 'someday', 'x')",
                    params![id],
                )
                .unwrap();

            let events = db.activity_events().unwrap();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].date, day("2024-01-01"));
        }
    }
}
