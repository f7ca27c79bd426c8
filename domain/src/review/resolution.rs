//! Turning a reviewer verdict into an outcome

use super::hunk::{Decision, Hunk, ReviewChanges};

/// How well a review covers the diff it was asked about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    /// Exactly one decision per hunk
    Converged,
    TooFew { reviewed: usize, expected: usize },
    TooMany { reviewed: usize, expected: usize },
    /// A decision names a hunk the diff does not have
    OutOfRange { number: usize, expected: usize },
}

impl Convergence {
    pub fn check(review: &ReviewChanges, expected: usize) -> Self {
        if let Some(number) = review.out_of_range(expected) {
            return Convergence::OutOfRange { number, expected };
        }
        let reviewed = review.reviewed_count(expected);
        match reviewed.cmp(&expected) {
            std::cmp::Ordering::Equal => Convergence::Converged,
            std::cmp::Ordering::Less => Convergence::TooFew { reviewed, expected },
            std::cmp::Ordering::Greater => Convergence::TooMany { reviewed, expected },
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, Convergence::Converged)
    }

    /// Message asking the reviewer to fix its answer.
    pub fn correction(&self) -> Option<String> {
        match self {
            Convergence::Converged => None,
            Convergence::TooFew { .. } => Some(
                "Not all hunks have been reviewed. Please review all hunks and add 'apply', \
                 'ignore' or 'rework' decision for each."
                    .to_string(),
            ),
            Convergence::TooMany { reviewed, expected } => Some(format!(
                "Your review contains more hunks ({reviewed}) than in the original diff \
                 ({expected}). Note that one hunk may have multiple changed lines."
            )),
            Convergence::OutOfRange { number, expected } => Some(format!(
                "Your review contains hunk {number}, but the diff only has hunks 1 to \
                 {expected}. Please review exactly these hunks and add 'apply', 'ignore' or \
                 'rework' decision for each."
            )),
        }
    }
}

/// What to do with the proposed content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Every hunk approved; take the new content as is.
    AcceptNew,
    /// Nothing approved and nothing to rework; keep the old content.
    Reject,
    /// Nothing approved; keep the old content and ask for another attempt.
    Rework { feedback: String },
    /// Apply the approved hunks to the old content.
    Partial {
        apply: Vec<String>,
        feedback: Option<String>,
    },
}

/// Attach the reviewer's decisions to the diff hunks.
pub fn annotate(hunk_texts: &[String], review: &ReviewChanges) -> Vec<Hunk> {
    hunk_texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let mut hunk = Hunk::new(i + 1, text.clone());
            if let Some(verdict) = review.decision_for(i + 1) {
                hunk.decision = Some(verdict.decision);
                hunk.reason = Some(verdict.reason.clone());
            }
            hunk
        })
        .collect()
}

/// Decide the outcome for annotated hunks.
pub fn resolve(hunks: &[Hunk], review_notes: &str) -> Resolution {
    let apply: Vec<String> = hunks
        .iter()
        .filter(|h| h.is(Decision::Apply))
        .map(|h| h.text.clone())
        .collect();
    let rework: Vec<&Hunk> = hunks.iter().filter(|h| h.is(Decision::Rework)).collect();
    let feedback = (!rework.is_empty()).then(|| rework_feedback(&rework, review_notes));

    if apply.len() == hunks.len() {
        Resolution::AcceptNew
    } else if apply.is_empty() {
        match feedback {
            Some(feedback) => Resolution::Rework { feedback },
            None => Resolution::Reject,
        }
    } else {
        Resolution::Partial { apply, feedback }
    }
}

/// Feedback text handed back to the coder for rework hunks.
pub fn rework_feedback(rework: &[&Hunk], review_notes: &str) -> String {
    let changes: Vec<String> = rework
        .iter()
        .map(|h| {
            format!(
                "## Change\n```{}```\nReviewer feedback:\n{}",
                h.text,
                h.reason.as_deref().unwrap_or_default()
            )
        })
        .collect();
    format!("{}\n\nReview notes:\n{}", changes.join("\n\n"), review_notes)
}
