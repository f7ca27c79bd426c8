//! Core domain concepts shared across all subdomains.
//!
//! - [`model::Model`]: known LLM models and their capabilities
//! - [`error::DomainError`]: domain-level errors

pub mod error;
pub mod model;
