//! Review-due scheduling.
//!
//! Each importance tier owns a strictly increasing sequence of day intervals.
//! A problem's review count selects the stage in that sequence; once the
//! sequence is exhausted the last interval repeats forever. A problem is due
//! when the days elapsed since its last activity reach the stage interval.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::dates;
use crate::error::{Error, Result};
use crate::models::{Grade, Importance, Problem, ReviewEvent};

pub const MIN_DUE_LIMIT: usize = 1;
pub const MAX_DUE_LIMIT: usize = 5;
pub const DEFAULT_DUE_LIMIT: usize = 3;
pub const DUE_SOON_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalTable {
    low: Vec<u32>,
    medium: Vec<u32>,
    high: Vec<u32>,
}

impl Default for IntervalTable {
    fn default() -> Self {
        Self {
            low: vec![4, 8, 15, 30, 60, 120, 180],
            medium: vec![2, 4, 7, 15, 30, 60, 90],
            high: vec![1, 2, 4, 7, 15, 30, 60],
        }
    }
}

impl IntervalTable {
    pub fn new(low: Vec<u32>, medium: Vec<u32>, high: Vec<u32>) -> Result<Self> {
        Self::validate(Importance::Low, &low)?;
        Self::validate(Importance::Medium, &medium)?;
        Self::validate(Importance::High, &high)?;
        Ok(Self { low, medium, high })
    }

    fn validate(tier: Importance, sequence: &[u32]) -> Result<()> {
        if sequence.is_empty() {
            return Err(Error::InvalidIntervals {
                tier,
                reason: "sequence is empty".to_string(),
            });
        }
        if sequence.contains(&0) {
            return Err(Error::InvalidIntervals {
                tier,
                reason: "intervals must be positive".to_string(),
            });
        }
        if sequence.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::InvalidIntervals {
                tier,
                reason: "intervals must be strictly increasing".to_string(),
            });
        }
        Ok(())
    }

    pub fn sequence(&self, tier: Importance) -> &[u32] {
        match tier {
            Importance::Low => &self.low,
            Importance::Medium => &self.medium,
            Importance::High => &self.high,
        }
    }

    pub fn stage(&self, tier: Importance, review_count: u32) -> usize {
        let len = self.sequence(tier).len();
        (review_count as usize).min(len - 1)
    }

    pub fn required_days(&self, tier: Importance, review_count: u32) -> i64 {
        let sequence = self.sequence(tier);
        sequence[self.stage(tier, review_count)] as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DueStatus {
    Snoozed { until: NaiveDate },
    DueNow { overdue_days: i64 },
    DueSoon { remaining_days: i64 },
    Later { remaining_days: i64 },
}

impl DueStatus {
    pub fn is_due(&self) -> bool {
        matches!(self, DueStatus::DueNow { .. })
    }

    pub fn label(&self) -> String {
        match self {
            DueStatus::Snoozed { until } => format!("snoozed until {}", until),
            DueStatus::DueNow { overdue_days: 0 } => "due today".to_string(),
            DueStatus::DueNow { overdue_days } => format!("overdue {}d", overdue_days),
            DueStatus::DueSoon { remaining_days } | DueStatus::Later { remaining_days } => {
                format!("in {}d", remaining_days)
            }
        }
    }
}

pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(MIN_DUE_LIMIT, MAX_DUE_LIMIT)
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    intervals: IntervalTable,
}

impl Scheduler {
    pub fn new(intervals: IntervalTable) -> Self {
        Self { intervals }
    }

    /// Active snooze, if any. A snooze on or before `today` has expired.
    pub fn snoozed_until(&self, problem: &Problem, today: NaiveDate) -> Option<NaiveDate> {
        problem.snooze_until.filter(|until| *until > today)
    }

    /// Last review, else last attempt, else creation. The first of those
    /// that is stored decides: if it is unreadable, or none is stored, the
    /// problem is treated as freshly active.
    pub fn base_date(&self, problem: &Problem, today: NaiveDate) -> NaiveDate {
        if problem.unreadable_base {
            debug!(problem_id = problem.id, "unreadable activity date, using today");
            return today;
        }
        match problem
            .last_review_at
            .or(problem.last_attempt_at)
            .or(problem.created_at)
        {
            Some(day) => day,
            None => {
                debug!(problem_id = problem.id, "no valid activity date, using today");
                today
            }
        }
    }

    pub fn required_days(&self, problem: &Problem) -> i64 {
        self.intervals
            .required_days(problem.importance, problem.review_count)
    }

    pub fn status(&self, problem: &Problem, today: NaiveDate) -> DueStatus {
        if let Some(until) = self.snoozed_until(problem, today) {
            return DueStatus::Snoozed { until };
        }

        let elapsed = dates::days_between(self.base_date(problem, today), today);
        let required = self.required_days(problem);

        if elapsed >= required {
            DueStatus::DueNow {
                overdue_days: elapsed - required,
            }
        } else {
            let remaining_days = required - elapsed;
            if remaining_days <= DUE_SOON_DAYS {
                DueStatus::DueSoon { remaining_days }
            } else {
                DueStatus::Later { remaining_days }
            }
        }
    }

    /// Due problems, oldest base date first, capped at the clamped limit.
    pub fn due_set<'a>(
        &self,
        problems: &'a [Problem],
        today: NaiveDate,
        limit: usize,
    ) -> Vec<&'a Problem> {
        let mut due: Vec<(&Problem, NaiveDate)> = problems
            .iter()
            .filter(|p| self.status(p, today).is_due())
            .map(|p| (p, self.base_date(p, today)))
            .collect();

        // sort_by_key is stable, equal base dates keep input order
        due.sort_by_key(|(_, base)| *base);

        due.into_iter()
            .take(clamp_limit(limit))
            .map(|(p, _)| p)
            .collect()
    }

    /// Apply a review to the in-memory problem and return the event to log.
    pub fn record_review(&self, problem: &mut Problem, grade: Grade, today: NaiveDate) -> ReviewEvent {
        problem.review_count = grade.apply(problem.review_count);
        problem.last_review_at = Some(today);
        problem.snooze_until = None;

        ReviewEvent {
            problem_id: problem.id,
            reviewed_at: today,
            grade,
        }
    }

    pub fn snooze(&self, problem: &mut Problem, until: NaiveDate) {
        problem.snooze_until = Some(until);
    }
}
