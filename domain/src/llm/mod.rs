//! LLM request domain
//!
//! Request telemetry records and typed response parsing.

pub mod parser;
pub mod request_log;

pub use parser::{JsonParser, ParseError, RawText, ResponseParser, strip_code_fence};
pub use request_log::{RequestLog, RequestStatus};
