use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates;

// Importance tier of a problem. Governs how quickly review intervals grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Importance {
    Low,
    #[default]
    Medium,
    High,
}

impl Importance {
    pub const ALL: [Importance; 3] = [Importance::Low, Importance::Medium, Importance::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::Low => "Low",
            Importance::Medium => "Medium",
            Importance::High => "High",
        }
    }

    /// Total normalization of free-form input. Used both when a tier is
    /// written and when it is read back for scheduling, so the two always
    /// agree. Anything unrecognized (including nothing at all) is `Medium`.
    pub fn normalize(value: Option<&str>) -> Self {
        let Some(raw) = value else {
            return Importance::Medium;
        };
        match raw.trim().to_lowercase().as_str() {
            "high" | "critical" | "crit" => Importance::High,
            "low" => Importance::Low,
            _ => Importance::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Again,
    #[default]
    Good,
    Easy,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::Again => "again",
            Grade::Good => "good",
            Grade::Easy => "easy",
        }
    }

    // Unknown or missing grades count as a plain successful review.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("again") | Some("a") => Grade::Again,
            Some("easy") | Some("e") => Grade::Easy,
            _ => Grade::Good,
        }
    }

    /// New review count after a review with this grade.
    pub fn apply(&self, review_count: u32) -> u32 {
        match self {
            Grade::Again => 0,
            Grade::Good => review_count.saturating_add(1),
            Grade::Easy => review_count.saturating_add(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub id: i64,
    pub lc_num: String,
    pub title: String,
    pub importance: Importance,
    pub tags: Vec<String>,
    pub created_at: Option<NaiveDate>,
    pub last_attempt_at: Option<NaiveDate>,
    pub last_review_at: Option<NaiveDate>,
    pub snooze_until: Option<NaiveDate>,
    pub review_count: u32,
    pub attempt_count: i64,
    /// The newest stored activity date is present but unreadable.
    #[serde(skip)]
    pub unreadable_base: bool,
}

impl Problem {
    pub fn days_since_attempt(&self, today: NaiveDate) -> Option<i64> {
        self.last_attempt_at
            .map(|last| dates::days_between(last, today))
    }

    pub fn tag_list(&self) -> String {
        if self.tags.is_empty() {
            String::from("-")
        } else {
            self.tags.join(", ")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub problem_id: i64,
    pub attempt_at: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub problem_id: i64,
    pub reviewed_at: NaiveDate,
    pub grade: Grade,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub problem_count: i64,
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
