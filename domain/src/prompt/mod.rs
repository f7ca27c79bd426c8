//! Prompt domain
//!
//! Named templates used to build planning and review conversations.

mod template;

pub use template::PromptTemplate;
