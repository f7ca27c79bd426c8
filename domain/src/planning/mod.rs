//! Planning domain
//!
//! Epics, tasks and the project snapshot the tech lead plans over, plus the
//! structured answers the planning prompts ask for.

pub mod entities;
pub mod examples;
pub mod schemas;

pub use entities::{Complexity, Epic, PlanPhase, ProjectState, Task, TaskStatus, new_id};
pub use examples::{EXAMPLE_PROJECTS, ExampleProject, find_example};
pub use schemas::{DevelopmentPlan, EpicPlan, EpicSpec, TaskSpec, UpdatedDevelopmentPlan};
