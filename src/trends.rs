use std::collections::{HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::dates;

/// A problem was touched (attempted or reviewed) on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityEvent {
    pub problem_id: i64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendWindow {
    Last7Days,
    Last30Days,
    Last12Months,
}

impl TrendWindow {
    pub fn buckets(&self) -> usize {
        match self {
            TrendWindow::Last7Days => 7,
            TrendWindow::Last30Days => 30,
            TrendWindow::Last12Months => 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendBucket {
    pub key: String,
    pub count: usize,
}

// Months since year 0, so month arithmetic carries into the year.
fn month_index(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

fn month_key(index: i32) -> String {
    format!("{:04}-{:02}", index.div_euclid(12), index.rem_euclid(12) + 1)
}

/// Distinct problems touched per bucket, oldest bucket first, ending at
/// `today` (or the current month). Every bucket in the window is present.
pub fn build_trend(events: &[ActivityEvent], window: TrendWindow, today: NaiveDate) -> Vec<TrendBucket> {
    match window {
        TrendWindow::Last7Days | TrendWindow::Last30Days => daily(events, window.buckets(), today),
        TrendWindow::Last12Months => monthly(events, window.buckets(), today),
    }
}

fn daily(events: &[ActivityEvent], days: usize, today: NaiveDate) -> Vec<TrendBucket> {
    let mut touched: HashMap<NaiveDate, HashSet<i64>> = HashMap::new();
    for event in events {
        touched.entry(event.date).or_default().insert(event.problem_id);
    }

    (0..days as i64)
        .rev()
        .map(|offset| {
            let day = dates::add_days(today, -offset);
            TrendBucket {
                key: dates::format_day(day),
                count: touched.get(&day).map_or(0, HashSet::len),
            }
        })
        .collect()
}

fn monthly(events: &[ActivityEvent], months: usize, today: NaiveDate) -> Vec<TrendBucket> {
    let mut touched: HashMap<i32, HashSet<i64>> = HashMap::new();
    for event in events {
        touched
            .entry(month_index(event.date))
            .or_default()
            .insert(event.problem_id);
    }

    let current = month_index(today);
    (0..months as i32)
        .rev()
        .map(|offset| {
            let index = current - offset;
            TrendBucket {
                key: month_key(index),
                count: touched.get(&index).map_or(0, HashSet::len),
            }
        })
        .collect()
}
