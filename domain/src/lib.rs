//! Domain layer for xpilot
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Conversation
//!
//! An ordered message history handed to an LLM. Conversations are values:
//! forking one yields an independent copy, so retries never leak into the
//! caller's history.
//!
//! ## Review
//!
//! A proposed file rewrite is split into unified-diff hunks. A reviewer model
//! classifies each hunk (**apply**, **ignore**, **rework**) and the approved
//! hunks are patched back onto the original content by [`review::apply_hunks`].
//!
//! ## Planning
//!
//! Projects are planned into **epics**, each broken down into **tasks** that
//! move through `todo -> in_progress -> review -> done`.

pub mod conversation;
pub mod core;
pub mod llm;
pub mod planning;
pub mod prompt;
pub mod providers;
pub mod review;

// Re-export commonly used types
pub use conversation::{Conversation, Message, PromptLogEntry, Role};
pub use core::{error::DomainError, model::Model};
pub use llm::{JsonParser, ParseError, RawText, RequestLog, RequestStatus, ResponseParser};
pub use planning::{
    Complexity, DevelopmentPlan, Epic, EpicPlan, EpicSpec, PlanPhase, ProjectState, Task,
    TaskSpec, TaskStatus, UpdatedDevelopmentPlan,
};
pub use prompt::PromptTemplate;
pub use providers::{EndpointConfig, LlmConfig, ProviderConfig, ProviderKind};
pub use review::{
    Convergence, Decision, Hunk, HunkReview, PatchDirection, PatchError, Resolution,
    ReviewChanges, ReviewState, apply_hunks, diff_hunks,
};
