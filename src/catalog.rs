// src/catalog.rs

use crate::constants::{DIFFICULTIES, UPLOAD_CHUNK_SIZE};
use crate::models::{Dataset, Difficulty, Metadata, Problem, StudyPlanEntry, TopicSummary};
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};

/// Assembles a full catalog payload, deriving the topic summaries and
/// metadata from the problem list.
pub fn build_dataset(problems: Vec<Problem>, study_plan: Vec<StudyPlanEntry>) -> Dataset {
    let topic_summary = derive_topic_summaries(&problems);
    let metadata = derive_metadata(&problems);
    Dataset {
        problems,
        study_plan,
        topic_summary,
        metadata,
    }
}

pub fn derive_metadata(problems: &[Problem]) -> Metadata {
    let mut topics = BTreeSet::new();
    let mut priorities = BTreeSet::new();
    let mut patterns = BTreeSet::new();
    let (mut easy, mut medium, mut hard) = (0, 0, 0);

    for p in problems {
        topics.insert(p.topic.clone());
        if let Some(priority) = p.priority {
            priorities.insert(priority.as_str().to_string());
        }
        if !p.pattern.is_empty() {
            patterns.insert(p.pattern.clone());
        }
        match p.difficulty {
            Difficulty::Easy => easy += 1,
            Difficulty::Medium => medium += 1,
            Difficulty::Hard => hard += 1,
        }
    }

    Metadata {
        total_problems: problems.len(),
        total_easy: easy,
        total_medium: medium,
        total_hard: hard,
        topics: topics.into_iter().collect(),
        difficulties: DIFFICULTIES.iter().map(|d| d.to_string()).collect(),
        priorities: priorities.into_iter().collect(),
        patterns: patterns.into_iter().collect(),
        generated_at: Some(Utc::now().to_rfc3339()),
        uploaded_at: None,
    }
}

/// One row per topic, in first-seen catalog order. Key patterns are the
/// distinct patterns of the topic joined with ", ".
pub fn derive_topic_summaries(problems: &[Problem]) -> Vec<TopicSummary> {
    let mut order: Vec<&str> = Vec::new();
    let mut rows: BTreeMap<&str, (TopicSummary, Vec<&str>)> = BTreeMap::new();

    for p in problems {
        let (row, patterns) = rows.entry(p.topic.as_str()).or_insert_with(|| {
            order.push(p.topic.as_str());
            (
                TopicSummary {
                    topic: p.topic.clone(),
                    ..TopicSummary::default()
                },
                Vec::new(),
            )
        });
        row.total += 1;
        match p.difficulty {
            Difficulty::Easy => row.easy += 1,
            Difficulty::Medium => row.medium += 1,
            Difficulty::Hard => row.hard += 1,
        }
        if !p.pattern.is_empty() && !patterns.contains(&p.pattern.as_str()) {
            patterns.push(p.pattern.as_str());
        }
    }

    order
        .into_iter()
        .filter_map(|topic| rows.remove(topic))
        .map(|(mut row, patterns)| {
            row.key_patterns = patterns.join(", ");
            row
        })
        .collect()
}

/// Splits the catalog into upload-sized chunks.
pub fn chunk_problems(problems: &[Problem]) -> Vec<&[Problem]> {
    problems.chunks(UPLOAD_CHUNK_SIZE).collect()
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn metadata_counts_by_difficulty() {
        let ds = small_dataset();
        assert_eq!(ds.metadata.total_problems, 4);
        assert_eq!(ds.metadata.total_easy, 2);
        assert_eq!(ds.metadata.total_medium, 1);
        assert_eq!(ds.metadata.total_hard, 1);
        assert_eq!(ds.metadata.topics, vec!["Arrays", "Graphs"]);
        assert_eq!(ds.metadata.difficulties, vec!["Easy", "Medium", "Hard"]);
        assert_eq!(ds.metadata.priorities, vec!["Must Do"]);
    }

    #[test]
    fn topic_summaries_keep_catalog_order() {
        let problems = vec![
            problem(1, "Trees", Difficulty::Hard),
            problem(2, "Arrays", Difficulty::Easy),
            problem(3, "Trees", Difficulty::Easy),
        ];
        let rows = derive_topic_summaries(&problems);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].topic, "Trees");
        assert_eq!((rows[0].total, rows[0].easy, rows[0].hard), (2, 1, 1));
        assert_eq!(rows[0].key_patterns, "Trees pattern");
        assert_eq!(rows[1].topic, "Arrays");
    }

    #[test]
    fn chunks_split_at_upload_size() {
        let problems: Vec<Problem> = (0..450)
            .map(|i| problem(i, "Arrays", Difficulty::Easy))
            .collect();
        let chunks = chunk_problems(&problems);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 50);
    }
}
