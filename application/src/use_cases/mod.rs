//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod invoke_llm;
pub mod plan_project;
pub mod review_change;
pub(crate) mod shared;

#[cfg(test)]
mod testing;
