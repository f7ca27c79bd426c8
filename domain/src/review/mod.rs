//! Code review domain
//!
//! Splitting a proposed rewrite into hunks, classifying them, and patching the
//! approved ones back onto the original content.

pub mod diff;
pub mod hunk;
pub mod patch;
pub mod resolution;

pub use diff::{NO_EOL, diff_hunks};
pub use hunk::{Decision, Hunk, HunkReview, ReviewChanges, ReviewState};
pub use patch::{PatchDirection, PatchError, apply_hunks, apply_patch};
pub use resolution::{Convergence, Resolution, annotate, resolve, rework_feedback};

/// Coding attempts after which a change is accepted without review
pub const MAX_CODING_ATTEMPTS: u32 = 3;

/// Re-prompts allowed when a review does not cover every hunk
pub const MAX_REVIEW_RETRIES: u32 = 2;
