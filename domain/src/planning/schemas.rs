//! Structured responses expected from the planning prompts

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EpicSpec {
    /// Description of an epic.
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaskSpec {
    /// Description of a task.
    pub description: String,
    /// Proposed solution for the task.
    #[serde(default)]
    pub solution: String,
    /// Review of the proposed solution.
    #[serde(default)]
    pub review: String,
}

/// Answer to `create_plan`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DevelopmentPlan {
    /// List of epics that need to be done to implement the entire plan.
    pub plan: Vec<EpicSpec>,
}

/// Answer to `break_down_epic`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EpicPlan {
    /// List of tasks that need to be done to implement the entire epic.
    pub plan: Vec<TaskSpec>,
}

/// Answer to `update_plan`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UpdatedDevelopmentPlan {
    /// Updated description of what was implemented while working on the current epic.
    pub updated_current_epic: EpicSpec,
    /// List of unfinished tasks.
    pub plan: Vec<TaskSpec>,
}
