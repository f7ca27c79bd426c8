//! Application-level configuration.
//!
//! - [`ExecutionParams`]: retry and attempt budgets for the use cases

pub mod execution_params;

pub use execution_params::ExecutionParams;
