use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::dates;
use crate::models::{Importance, Problem};
use crate::scheduler::{DueStatus, Scheduler};
use crate::trends::{build_trend, ActivityEvent, TrendBucket, TrendWindow};

pub const TOP_TAGS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub problems: i64,
    pub attempts: i64,
    pub reviews: i64,
    pub tags: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DueCounts {
    pub due_now: usize,
    pub due_soon: usize,
    pub snoozed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityStats {
    pub current_streak: u32,
    pub active_days_7: usize,
    pub active_days_30: usize,
    pub problems_touched_7: usize,
    pub last_active: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportanceCount {
    pub importance: Importance,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trends {
    pub last_7_days: Vec<TrendBucket>,
    pub last_30_days: Vec<TrendBucket>,
    pub last_12_months: Vec<TrendBucket>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub today: NaiveDate,
    pub totals: Totals,
    pub due: DueCounts,
    pub activity: ActivityStats,
    pub importance: Vec<ImportanceCount>,
    pub top_tags: Vec<TagCount>,
    pub trends: Trends,
}

pub fn build_summary(
    scheduler: &Scheduler,
    problems: &[Problem],
    events: &[ActivityEvent],
    totals: Totals,
    today: NaiveDate,
) -> DashboardSummary {
    DashboardSummary {
        today,
        totals,
        due: due_counts(scheduler, problems, today),
        activity: activity_stats(events, today),
        importance: importance_histogram(problems),
        top_tags: top_tags(problems, TOP_TAGS),
        trends: Trends {
            last_7_days: build_trend(events, TrendWindow::Last7Days, today),
            last_30_days: build_trend(events, TrendWindow::Last30Days, today),
            last_12_months: build_trend(events, TrendWindow::Last12Months, today),
        },
    }
}

// Uses the same status function as the review queue, so a problem with no
// usable dates is counted exactly as the queue treats it.
pub fn due_counts(scheduler: &Scheduler, problems: &[Problem], today: NaiveDate) -> DueCounts {
    let mut counts = DueCounts::default();
    for problem in problems {
        match scheduler.status(problem, today) {
            DueStatus::DueNow { .. } => counts.due_now += 1,
            DueStatus::DueSoon { .. } => counts.due_soon += 1,
            DueStatus::Snoozed { .. } => counts.snoozed += 1,
            DueStatus::Later { .. } => {}
        }
    }
    counts
}

pub fn activity_stats(events: &[ActivityEvent], today: NaiveDate) -> ActivityStats {
    let active: HashSet<NaiveDate> = events
        .iter()
        .map(|e| e.date)
        .filter(|d| *d <= today)
        .collect();

    let within = |days: i64, date: NaiveDate| {
        let age = dates::days_between(date, today);
        (0..days).contains(&age)
    };

    // A streak survives until the end of today even if nothing is logged yet.
    let mut cursor = if active.contains(&today) {
        today
    } else {
        dates::add_days(today, -1)
    };
    let mut current_streak = 0;
    while active.contains(&cursor) {
        current_streak += 1;
        cursor = dates::add_days(cursor, -1);
    }

    let problems_touched_7 = events
        .iter()
        .filter(|e| within(7, e.date))
        .map(|e| e.problem_id)
        .collect::<HashSet<_>>()
        .len();

    ActivityStats {
        current_streak,
        active_days_7: active.iter().filter(|d| within(7, **d)).count(),
        active_days_30: active.iter().filter(|d| within(30, **d)).count(),
        problems_touched_7,
        last_active: active.iter().max().copied(),
    }
}

pub fn importance_histogram(problems: &[Problem]) -> Vec<ImportanceCount> {
    Importance::ALL
        .iter()
        .map(|tier| ImportanceCount {
            importance: *tier,
            count: problems.iter().filter(|p| p.importance == *tier).count(),
        })
        .collect()
}

/// Most used tags, by problem count then name.
pub fn top_tags(problems: &[Problem], limit: usize) -> Vec<TagCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for problem in problems {
        for tag in &problem.tags {
            *counts.entry(tag.as_str()).or_default() += 1;
        }
    }

    let mut tags: Vec<TagCount> = counts
        .into_iter()
        .map(|(name, count)| TagCount {
            name: name.to_string(),
            count,
        })
        .collect();
    // BTreeMap already ordered by name; a stable sort keeps that on ties
    tags.sort_by(|a, b| b.count.cmp(&a.count));
    tags.truncate(limit);
    tags
}
