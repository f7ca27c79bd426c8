//! Hunk review entities and value objects

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reviewer verdict for a single hunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Apply,
    Ignore,
    Rework,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Apply => "apply",
            Decision::Ignore => "ignore",
            Decision::Rework => "rework",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One per-hunk decision as returned by the reviewer model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HunkReview {
    /// Index of the hunk in the diff. Starts from 1.
    pub number: usize,
    /// Reason for applying or ignoring this hunk, or for asking for it to be reworked.
    pub reason: String,
    /// Whether to apply this hunk, rework, or ignore it.
    pub decision: Decision,
}

/// Structured review of a whole diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReviewChanges {
    pub hunks: Vec<HunkReview>,
    /// Additional review notes (optional, can be empty).
    #[serde(default)]
    pub review_notes: String,
}

impl ReviewChanges {
    /// Number of distinct hunk indices in `1..=expected` covered by this review.
    pub fn reviewed_count(&self, expected: usize) -> usize {
        let mut numbers: Vec<usize> = self
            .hunks
            .iter()
            .map(|h| h.number)
            .filter(|n| (1..=expected).contains(n))
            .collect();
        numbers.sort_unstable();
        numbers.dedup();
        numbers.len()
    }

    /// First hunk number that does not exist in a diff of `expected` hunks.
    pub fn out_of_range(&self, expected: usize) -> Option<usize> {
        self.hunks
            .iter()
            .map(|h| h.number)
            .find(|n| !(1..=expected).contains(n))
    }

    /// Latest decision given for hunk `number`.
    pub fn decision_for(&self, number: usize) -> Option<&HunkReview> {
        self.hunks.iter().rev().find(|h| h.number == number)
    }
}

/// A contiguous diff region, annotated once reviewed (Entity)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// 1-based position in the diff
    pub index: usize,
    /// Unified diff text, header included
    pub text: String,
    pub decision: Option<Decision>,
    pub reason: Option<String>,
}

impl Hunk {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            decision: None,
            reason: None,
        }
    }

    pub fn is(&self, decision: Decision) -> bool {
        self.decision == Some(decision)
    }
}

/// Phase of one file-change review cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    Pending,
    Reviewing,
    Converged,
    AcceptedUnconditionally,
}

impl ReviewState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewState::Pending => "pending",
            ReviewState::Reviewing => "reviewing",
            ReviewState::Converged => "converged",
            ReviewState::AcceptedUnconditionally => "accepted_unconditionally",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReviewState::Converged | ReviewState::AcceptedUnconditionally
        )
    }
}

impl std::fmt::Display for ReviewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(numbers: &[usize]) -> ReviewChanges {
        ReviewChanges {
            hunks: numbers
                .iter()
                .map(|n| HunkReview {
                    number: *n,
                    reason: format!("hunk {n}"),
                    decision: Decision::Apply,
                })
                .collect(),
            review_notes: String::new(),
        }
    }

    #[test]
    fn test_reviewed_count_ignores_duplicates() {
        assert_eq!(review(&[1, 2, 2, 3]).reviewed_count(3), 3);
        assert_eq!(review(&[]).reviewed_count(3), 0);
    }

    #[test]
    fn test_reviewed_count_ignores_unknown_hunks() {
        let changes = review(&[1, 7, 0]);
        assert_eq!(changes.reviewed_count(2), 1);
        assert_eq!(changes.out_of_range(2), Some(7));
        assert_eq!(review(&[1, 2]).out_of_range(2), None);
    }

    #[test]
    fn test_decision_for_prefers_latest() {
        let mut changes = review(&[1]);
        changes.hunks.push(HunkReview {
            number: 1,
            reason: "changed my mind".to_string(),
            decision: Decision::Rework,
        });
        assert_eq!(changes.decision_for(1).unwrap().decision, Decision::Rework);
        assert!(changes.decision_for(2).is_none());
    }

    #[test]
    fn test_deserialize_review() {
        let raw = r#"{"hunks":[{"number":1,"reason":"ok","decision":"ignore"}]}"#;
        let parsed: ReviewChanges = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.hunks[0].decision, Decision::Ignore);
        assert!(parsed.review_notes.is_empty());
    }

    #[test]
    fn test_unknown_decision_rejected() {
        let raw = r#"{"hunks":[{"number":1,"reason":"ok","decision":"maybe"}],"review_notes":""}"#;
        assert!(serde_json::from_str::<ReviewChanges>(raw).is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(ReviewState::Converged.is_terminal());
        assert!(ReviewState::AcceptedUnconditionally.is_terminal());
        assert!(!ReviewState::Reviewing.is_terminal());
    }
}
