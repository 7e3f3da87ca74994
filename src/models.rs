// src/models.rs

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// --- Catalog Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "Must Do")]
    MustDo,
    #[serde(rename = "Good Practice")]
    GoodPractice,
    #[serde(rename = "Revision")]
    Revision,
    #[serde(rename = "Hard Practice")]
    HardPractice,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::MustDo => "Must Do",
            Priority::GoodPractice => "Good Practice",
            Priority::Revision => "Revision",
            Priority::HardPractice => "Hard Practice",
        }
    }
}

impl FromStr for Priority {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "Must Do", "must-do" and "mustdo" all name the same bucket
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "mustdo" => Ok(Priority::MustDo),
            "goodpractice" => Ok(Priority::GoodPractice),
            "revision" => Ok(Priority::Revision),
            "hardpractice" => Ok(Priority::HardPractice),
            _ => Err(format!("unknown priority '{}'", s)),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Overlay Enums ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemStatus {
    #[default]
    Unsolved,
    Solved,
}

impl ProblemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemStatus::Unsolved => "unsolved",
            ProblemStatus::Solved => "solved",
        }
    }
}

impl FromStr for ProblemStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unsolved" => Ok(ProblemStatus::Unsolved),
            "solved" => Ok(ProblemStatus::Solved),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    #[default]
    Pending,
    Completed,
}

impl PlanStatus {
    pub fn toggled(self) -> Self {
        match self {
            PlanStatus::Pending => PlanStatus::Completed,
            PlanStatus::Completed => PlanStatus::Pending,
        }
    }
}

// --- Base Dataset ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub id: i64,
    #[serde(default)]
    pub lc_number: String,
    pub name: String,
    #[serde(default)]
    pub link: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub pattern: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub key_insight: String,

    // Overlay fields, reset before every reconciliation
    #[serde(default)]
    pub status: ProblemStatus,
    #[serde(default, deserialize_with = "lenient_date")]
    pub date_solved: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

impl Problem {
    pub fn is_solved(&self) -> bool {
        self.status == ProblemStatus::Solved
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlanEntry {
    #[serde(default)]
    pub week: String,
    #[serde(default)]
    pub day: String,
    #[serde(default)]
    pub date_range: String,
    #[serde(default)]
    pub topic_focus: String,
    #[serde(default)]
    pub problems: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub status: PlanStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSummary {
    pub topic: String,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub easy: u32,
    #[serde(default)]
    pub medium: u32,
    #[serde(default)]
    pub hard: u32,
    #[serde(default)]
    pub key_patterns: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    pub total_problems: usize,
    pub total_easy: usize,
    pub total_medium: usize,
    pub total_hard: usize,
    pub topics: Vec<String>,
    pub difficulties: Vec<String>,
    pub priorities: Vec<String>,
    pub patterns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<String>,
}

/// The catalog payload shared by the remote store, the cache snapshot and
/// the bundled fallback. Once reconciled it doubles as the working model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub problems: Vec<Problem>,
    #[serde(default)]
    pub study_plan: Vec<StudyPlanEntry>,
    #[serde(default)]
    pub topic_summary: Vec<TopicSummary>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Dataset {
    pub fn problem(&self, id: i64) -> Option<&Problem> {
        self.problems.iter().find(|p| p.id == id)
    }

    pub fn problem_mut(&mut self, id: i64) -> Option<&mut Problem> {
        self.problems.iter_mut().find(|p| p.id == id)
    }
}

// --- Overlays ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
    #[serde(default)]
    pub status: Option<ProblemStatus>,
    #[serde(default, rename = "dateSolved", deserialize_with = "lenient_date")]
    pub date_solved: Option<NaiveDate>,
}

pub type StatusOverlay = BTreeMap<i64, StatusEntry>;
pub type NotesOverlay = BTreeMap<i64, String>;
pub type StudyPlanOverlay = BTreeMap<usize, PlanStatus>;

/// Per-user progress. Always pushed whole, never as a diff.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    #[serde(default)]
    pub status: StatusOverlay,
    #[serde(default)]
    pub notes: NotesOverlay,
    #[serde(default, rename = "studyPlan")]
    pub study_plan: StudyPlanOverlay,
}

impl Overlay {
    pub fn is_empty(&self) -> bool {
        self.status.is_empty() && self.notes.is_empty() && self.study_plan.is_empty()
    }
}

// --- Export / Import ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: u32,
    pub exported_at: String,
    pub status: StatusOverlay,
    pub notes: NotesOverlay,
    pub study_plan: StudyPlanOverlay,
    pub theme: String,
}

/// Inbound backup. Only `version` is mandatory; sections that are present
/// must be well-formed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDocument {
    pub version: u32,
    #[serde(default)]
    pub status: Option<StatusOverlay>,
    #[serde(default)]
    pub notes: Option<NotesOverlay>,
    #[serde(default)]
    pub study_plan: Option<StudyPlanOverlay>,
    #[serde(default)]
    pub theme: Option<String>,
}

// --- Identity ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>) -> Self {
        Identity {
            uid: uid.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

// --- Query Models ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProblemFilter {
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub status: Option<ProblemStatus>,
    pub priority: Option<Priority>,
    pub pattern: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DifficultyCounts {
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
}

// --- Serde Helpers ---

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<Priority>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Accepts `YYYY-MM-DD`, a timestamp starting with one, or the legacy
/// placeholders `"None"`/`"null"` (read as absent).
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") | Some("None") | Some("null") => Ok(None),
        Some(s) => {
            let day = s.get(..10).unwrap_or(s);
            NaiveDate::parse_from_str(day, "%Y-%m-%d")
                .map(Some)
                .map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn problem_parses_catalog_shape() {
        let json = r#"{
            "id": 7, "topic": "Arrays", "lcNumber": "1", "name": "Two Sum",
            "difficulty": "Easy", "pattern": "Hash Map", "priority": "Must Do",
            "link": "https://leetcode.com/problems/two-sum", "keyInsight": "complement lookup",
            "status": "unsolved", "dateSolved": null, "notes": ""
        }"#;
        let p: Problem = serde_json::from_str(json).unwrap();
        assert_eq!(p.id, 7);
        assert_eq!(p.difficulty, Difficulty::Easy);
        assert_eq!(p.priority, Some(Priority::MustDo));
        assert!(p.date_solved.is_none());
    }

    #[test]
    fn empty_priority_is_none() {
        let json = r#"{"id": 1, "name": "x", "difficulty": "Hard", "priority": ""}"#;
        let p: Problem = serde_json::from_str(json).unwrap();
        assert_eq!(p.priority, None);
    }

    #[test]
    fn unknown_difficulty_is_rejected() {
        let json = r#"{"id": 1, "name": "x", "difficulty": "Extreme"}"#;
        assert!(serde_json::from_str::<Problem>(json).is_err());
    }

    #[test]
    fn status_entry_tolerates_legacy_dates() {
        let e: StatusEntry =
            serde_json::from_str(r#"{"status": "solved", "dateSolved": "None"}"#).unwrap();
        assert_eq!(e.date_solved, None);

        let e: StatusEntry =
            serde_json::from_str(r#"{"status": "solved", "dateSolved": "2024-01-05 00:00:00"}"#)
                .unwrap();
        assert_eq!(e.date_solved, NaiveDate::from_ymd_opt(2024, 1, 5));
    }

    #[test]
    fn overlay_uses_string_keys_on_the_wire() {
        let mut overlay = Overlay::default();
        overlay.notes.insert(12, "sliding window".into());
        overlay.study_plan.insert(3, PlanStatus::Completed);

        let json = serde_json::to_value(&overlay).unwrap();
        assert_eq!(json["notes"]["12"], "sliding window");
        assert_eq!(json["studyPlan"]["3"], "completed");

        let back: Overlay = serde_json::from_value(json).unwrap();
        assert_eq!(back, overlay);
    }

    #[test]
    fn priority_parse_ignores_spacing_and_case() {
        assert_eq!("must-do".parse::<Priority>(), Ok(Priority::MustDo));
        assert_eq!("Hard Practice".parse::<Priority>(), Ok(Priority::HardPractice));
        assert!("whenever".parse::<Priority>().is_err());
    }
}
