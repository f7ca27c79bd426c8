//! Prompt templates for planning and code review
//!
//! Templates are addressed by name. Placeholders use `{{name}}` and may reach
//! into objects with dotted paths (`{{task.description}}`).

/// Templates for generating prompts at each stage
pub struct PromptTemplate;

impl PromptTemplate {
    pub const CREATE_PLAN: &'static str = "create_plan";
    pub const BREAK_DOWN_EPIC: &'static str = "break_down_epic";
    pub const UPDATE_PLAN: &'static str = "update_plan";
    pub const REVIEW_CHANGES: &'static str = "review_changes";
    pub const BREAKDOWN: &'static str = "breakdown";

    pub const ALL: [&'static str; 5] = [
        Self::CREATE_PLAN,
        Self::BREAK_DOWN_EPIC,
        Self::UPDATE_PLAN,
        Self::REVIEW_CHANGES,
        Self::BREAKDOWN,
    ];

    /// Fixed prompt for the connectivity self-check
    pub fn api_check() -> &'static str {
        "This is a connection test. If you can see this, please respond only with 'START' and nothing else."
    }

    /// Built-in source text for the named template
    pub fn source(name: &str) -> Option<&'static str> {
        match name {
            Self::CREATE_PLAN => Some(CREATE_PLAN),
            Self::BREAK_DOWN_EPIC => Some(BREAK_DOWN_EPIC),
            Self::UPDATE_PLAN => Some(UPDATE_PLAN),
            Self::REVIEW_CHANGES => Some(REVIEW_CHANGES),
            Self::BREAKDOWN => Some(BREAKDOWN),
            _ => None,
        }
    }
}

const CREATE_PLAN: &str = r#"You are an experienced tech lead. Split the following project into epics.

Project description:
{{project_description}}

Each epic should be a coherent, independently testable slice of functionality.
Order the epics so that each one only builds on the ones before it.
Respond with JSON: {"plan": [{"description": "..."}]}"#;

const BREAK_DOWN_EPIC: &str = r#"You are an experienced tech lead. Break the following epic into small development tasks.

Epic:
{{epic_description}}

For every task give a description, a proposed solution and a short review of that solution.
Respond with JSON: {"plan": [{"description": "...", "solution": "...", "review": "..."}]}"#;

const UPDATE_PLAN: &str = r#"You are an experienced tech lead. Work on the current epic has progressed.

Current epic:
{{epic.description}}

Files modified so far:
{{modified_files}}

Describe what has actually been implemented for this epic, then list the tasks that still remain.
Respond with JSON: {"updated_current_epic": {"description": "..."}, "plan": [{"description": "..."}]}"#;

const REVIEW_CHANGES: &str = r#"A developer changed the file `{{file_name}}` following these instructions:

{{instructions}}

Original content of the file:
```
{{old_content}}
```

The change is split into the following hunks:

{{hunks}}

Review every hunk. For each one decide whether to "apply" it, "ignore" it, or send it back to "rework", and give the reason.
Hunks that are correct and needed for the task should be applied. Hunks that are unnecessary should be ignored.
Hunks that are needed but wrong should be reworked."#;

const BREAKDOWN: &str = r#"You are working on a software project. Here is the task you need to implement (task #{{current_task_index}}):

{{task.description}}

Proposed solution:
{{task.solution}}"#;
