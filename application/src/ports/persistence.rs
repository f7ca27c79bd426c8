//! File persistence port

use async_trait::async_trait;
use thiserror::Error;

/// Marker the coder leaves where a human has to step in
pub const INPUT_REQUIRED_MARKER: &str = "INPUT_REQUIRED";

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Refusing to write outside the project root: {0}")]
    OutsideRoot(String),
}

#[async_trait]
pub trait FilePersistence: Send + Sync {
    async fn save_file(&self, path: &str, content: &str) -> Result<(), PersistenceError>;

    /// 1-based line numbers that ask for human input.
    fn input_required(&self, content: &str) -> Vec<usize> {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| line.contains(INPUT_REQUIRED_MARKER))
            .map(|(i, _)| i + 1)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Discard;

    #[async_trait]
    impl FilePersistence for Discard {
        async fn save_file(&self, _path: &str, _content: &str) -> Result<(), PersistenceError> {
            Ok(())
        }
    }

    #[test]
    fn test_input_required_lines() {
        let content = "fn main() {\n    // INPUT_REQUIRED: set the API key\n    let key = \"\";\n}\n// INPUT_REQUIRED\n";
        assert_eq!(Discard.input_required(content), vec![2, 5]);
        assert!(Discard.input_required("nothing here").is_empty());
    }
}
