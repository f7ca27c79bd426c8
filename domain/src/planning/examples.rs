//! Built-in example projects with predefined plans

use super::entities::{Complexity, Epic, Task};

/// A seed project whose plan is known up front.
#[derive(Debug, Clone, Copy)]
pub struct ExampleProject {
    pub name: &'static str,
    pub description: &'static str,
    pub complexity: Complexity,
    pub tasks: &'static [&'static str],
}

impl ExampleProject {
    /// Single-epic plan for this example, every task TODO.
    pub fn to_epic(&self) -> Epic {
        let mut epic = Epic::new(self.description, self.complexity).with_name("Initial Project");
        epic.tasks = self.tasks.iter().map(|t| Task::new(*t)).collect();
        epic
    }
}

pub const EXAMPLE_PROJECTS: &[ExampleProject] = &[ExampleProject {
    name: "example-project",
    description: "A simple command-line todo list manager. Users can add a todo item \
                  with a title, list all items with their completion state, mark an item \
                  as done by its number and delete items. Items are stored in a JSON file \
                  in the user's home directory so they persist between runs.",
    complexity: Complexity::Simple,
    tasks: &[
        "Set up the project skeleton with an entry point that parses the add, list, done and delete subcommands and prints usage on invalid input",
        "Implement loading and saving the todo list as JSON in the user's home directory, creating the file on first use",
        "Implement the add and list commands, numbering items in insertion order and showing their completion state",
        "Implement the done and delete commands, reporting an error for item numbers that do not exist",
    ],
}];

/// Look up a built-in example by name
pub fn find_example(name: &str) -> Option<&'static ExampleProject> {
    EXAMPLE_PROJECTS.iter().find(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning::entities::TaskStatus;

    #[test]
    fn test_find_example() {
        assert!(find_example("example-project").is_some());
        assert!(find_example("missing").is_none());
    }

    #[test]
    fn test_example_epic() {
        let epic = find_example("example-project").unwrap().to_epic();
        assert_eq!(epic.name, "Initial Project");
        assert_eq!(epic.complexity, Complexity::Simple);
        assert_eq!(epic.tasks.len(), 4);
        assert!(epic.tasks.iter().all(|t| t.status == TaskStatus::Todo));
    }
}
