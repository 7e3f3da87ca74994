// src/stats.rs

use crate::models::{
    Difficulty, DifficultyCounts, PlanStatus, Problem, ProblemFilter, StudyPlanEntry,
};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeSet;

// Everything here is recomputed on each call; the catalog is a few hundred
// rows at most.

pub fn solved_count(problems: &[Problem]) -> usize {
    problems.iter().filter(|p| p.is_solved()).count()
}

pub fn solved_by_difficulty(problems: &[Problem]) -> DifficultyCounts {
    let mut counts = DifficultyCounts::default();
    for p in problems.iter().filter(|p| p.is_solved()) {
        match p.difficulty {
            Difficulty::Easy => counts.easy += 1,
            Difficulty::Medium => counts.medium += 1,
            Difficulty::Hard => counts.hard += 1,
        }
    }
    counts
}

pub fn solved_by_topic(problems: &[Problem], topic: &str) -> usize {
    problems
        .iter()
        .filter(|p| p.topic == topic && p.is_solved())
        .count()
}

pub fn total_by_topic(problems: &[Problem], topic: &str) -> usize {
    problems.iter().filter(|p| p.topic == topic).count()
}

/// Consecutive-day solve streak ending today, or ending yesterday when
/// nothing has been solved yet today.
pub fn streak(problems: &[Problem], today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = problems
        .iter()
        .filter(|p| p.is_solved())
        .filter_map(|p| p.date_solved)
        .collect();

    let yesterday = today - Duration::days(1);
    let anchor = if days.contains(&today) {
        today
    } else if days.contains(&yesterday) {
        yesterday
    } else {
        return 0;
    };

    // Walk backwards from the anchor while each day is exactly one before the last
    let mut count = 1;
    let mut prev = anchor;
    for day in days.range(..anchor).rev() {
        if prev - *day == Duration::days(1) {
            count += 1;
            prev = *day;
        } else {
            break;
        }
    }
    count
}

/// Most recently solved problems, newest first.
pub fn recent_activity(problems: &[Problem], limit: usize) -> Vec<&Problem> {
    let mut solved: Vec<&Problem> = problems
        .iter()
        .filter(|p| p.is_solved() && p.date_solved.is_some())
        .collect();
    // Stable sort keeps catalog order for same-day solves
    solved.sort_by(|a, b| b.date_solved.cmp(&a.date_solved));
    solved.truncate(limit);
    solved
}

/// Problems matching every filter that is set.
pub fn filtered_problems<'a>(problems: &'a [Problem], filter: &ProblemFilter) -> Vec<&'a Problem> {
    let needle = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    problems
        .iter()
        .filter(|p| filter.topic.as_ref().map_or(true, |t| &p.topic == t))
        .filter(|p| filter.difficulty.map_or(true, |d| p.difficulty == d))
        .filter(|p| filter.status.map_or(true, |s| p.status == s))
        .filter(|p| filter.priority.map_or(true, |pr| p.priority == Some(pr)))
        .filter(|p| filter.pattern.as_ref().map_or(true, |pt| &p.pattern == pt))
        .filter(|p| needle.as_ref().map_or(true, |q| haystack(p).contains(q.as_str())))
        .collect()
}

fn haystack(p: &Problem) -> String {
    format!(
        "{} {} {} {} {} {}",
        p.name, p.lc_number, p.pattern, p.topic, p.key_insight, p.notes
    )
    .to_lowercase()
}

/// (completed, total) study-plan sessions.
pub fn study_plan_progress(plan: &[StudyPlanEntry]) -> (usize, usize) {
    let completed = plan
        .iter()
        .filter(|e| e.status == PlanStatus::Completed)
        .count();
    (completed, plan.len())
}
