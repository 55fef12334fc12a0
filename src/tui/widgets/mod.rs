pub mod dashboard;
pub mod problem_detail;
pub mod problems;

use ratatui::style::Color;

use crate::models::Importance;
use crate::scheduler::DueStatus;

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// One block character per value, scaled to the largest. Zero is a space.
pub fn sparkline(values: &[usize]) -> String {
    let max = values.iter().copied().max().unwrap_or(0);
    values
        .iter()
        .map(|&v| {
            if v == 0 || max == 0 {
                ' '
            } else {
                let level = (v * (SPARK_LEVELS.len() - 1) + max - 1) / max;
                SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)]
            }
        })
        .collect()
}

pub fn importance_color(importance: Importance) -> Color {
    match importance {
        Importance::High => Color::Red,
        Importance::Medium => Color::Yellow,
        Importance::Low => Color::Green,
    }
}

pub fn status_color(status: &DueStatus) -> Color {
    match status {
        DueStatus::DueNow { .. } => Color::Red,
        DueStatus::DueSoon { .. } => Color::Yellow,
        DueStatus::Snoozed { .. } => Color::DarkGray,
        DueStatus::Later { .. } => Color::White,
    }
}
