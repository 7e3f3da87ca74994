// tests/common/mod.rs

#![allow(dead_code)]

use chrono::NaiveDate;
use dsa_tracker::catalog::build_dataset;
use dsa_tracker::models::{
    Dataset, Difficulty, Priority, Problem, ProblemStatus, StudyPlanEntry,
};
use dsa_tracker::{LocalCache, MemoryRemoteStore, ProgressStore, RemoteStore};
use std::sync::Arc;
use std::time::Duration;

pub const DEBOUNCE: Duration = Duration::from_millis(2000);

pub fn problem(id: i64, name: &str, topic: &str, difficulty: Difficulty, priority: Priority) -> Problem {
    Problem {
        id,
        lc_number: (100 + id).to_string(),
        name: name.to_string(),
        link: format!("https://leetcode.com/problems/{}", name.to_lowercase().replace(' ', "-")),
        difficulty,
        topic: topic.to_string(),
        pattern: format!("{} basics", topic),
        priority: Some(priority),
        key_insight: String::new(),
        status: ProblemStatus::Unsolved,
        date_solved: None,
        notes: String::new(),
    }
}

pub fn catalog() -> Dataset {
    let problems = vec![
        problem(1, "Two Sum", "Arrays", Difficulty::Easy, Priority::MustDo),
        problem(2, "Three Sum", "Arrays", Difficulty::Medium, Priority::MustDo),
        problem(3, "Course Schedule", "Graphs", Difficulty::Medium, Priority::GoodPractice),
        problem(4, "Word Ladder", "Graphs", Difficulty::Hard, Priority::HardPractice),
        problem(5, "Climbing Stairs", "DP", Difficulty::Easy, Priority::MustDo),
    ];
    let plan = (1..=3)
        .map(|day| StudyPlanEntry {
            week: "Week 1".into(),
            day: format!("Day {}", day),
            problems: day.to_string(),
            goal: "Warm up".into(),
            ..StudyPlanEntry::default()
        })
        .collect();
    build_dataset(problems, plan)
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// In-memory store over `remote`, debounced at [`DEBOUNCE`], with "today"
/// pinned to 2024-03-10.
pub fn store_with(remote: &Arc<MemoryRemoteStore>) -> ProgressStore {
    store_on(LocalCache::in_memory().unwrap(), remote)
}

pub fn store_on(cache: LocalCache, remote: &Arc<MemoryRemoteStore>) -> ProgressStore {
    let remote: Arc<dyn RemoteStore> = remote.clone();
    ProgressStore::new(cache, remote)
        .with_debounce(DEBOUNCE)
        .with_clock(|| day(2024, 3, 10))
}

pub fn online_remote() -> Arc<MemoryRemoteStore> {
    Arc::new(MemoryRemoteStore::new().with_catalog(catalog()))
}
