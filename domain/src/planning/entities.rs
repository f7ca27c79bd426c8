//! Planning domain entities

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fresh hex identifier for epics and tasks
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started yet
    #[default]
    Todo,
    /// Being implemented
    InProgress,
    /// Implementation accepted, awaiting review
    Review,
    /// Finished
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Review => "review",
            TaskStatus::Done => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }

    /// Whether a task may move from `self` to `next`.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Todo, InProgress)
                | (InProgress, Review)
                | (InProgress, Done)
                | (Review, Done)
                | (Review, InProgress)
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Estimated project complexity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    #[default]
    Moderate,
    Hard,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Moderate => "moderate",
            Complexity::Hard => "hard",
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Complexity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simple" => Ok(Complexity::Simple),
            "moderate" => Ok(Complexity::Moderate),
            "hard" => Ok(Complexity::Hard),
            other => Err(format!("unknown complexity: {other}")),
        }
    }
}

/// A unit of work inside an epic (Entity)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl Task {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            description: description.into(),
            solution: None,
            review: None,
            status: TaskStatus::Todo,
            instructions: None,
        }
    }

    pub fn with_solution(mut self, solution: impl Into<String>) -> Self {
        self.solution = Some(solution.into());
        self
    }

    pub fn with_review(mut self, review: impl Into<String>) -> Self {
        self.review = Some(review.into());
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    /// Move to `next`, rejecting illegal transitions.
    pub fn transition(&mut self, next: TaskStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                task: self.id.clone(),
                from: self.status.as_str(),
                to: next.as_str(),
            });
        }
        self.status = next;
        Ok(())
    }
}

/// A coarse-grained unit of project work (Entity)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Epic {
    pub id: String,
    pub name: String,
    pub description: String,
    pub completed: bool,
    pub tasks: Vec<Task>,
    pub complexity: Complexity,
}

impl Epic {
    /// New epic named after its description, with no tasks.
    pub fn new(description: impl Into<String>, complexity: Complexity) -> Self {
        let description = description.into();
        Self {
            id: new_id(),
            name: description.clone(),
            description,
            completed: false,
            tasks: Vec::new(),
            complexity,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// First task that is not finished.
    pub fn current_task(&self) -> Option<&Task> {
        self.tasks.iter().find(|t| !t.is_done())
    }

    pub fn finished_tasks(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.is_done()).collect()
    }

    /// Replace every unfinished task with `tasks`, keeping finished ones.
    pub fn replace_unfinished(&mut self, tasks: Vec<Task>) {
        self.tasks.retain(Task::is_done);
        self.tasks.extend(tasks);
        self.refresh_completed();
    }

    /// Recompute `completed` from task statuses.
    pub fn refresh_completed(&mut self) {
        self.completed = !self.tasks.is_empty() && self.tasks.iter().all(Task::is_done);
    }
}

/// Phase of the planning state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanPhase {
    #[default]
    NoPlan,
    EpicsPlanned,
    TasksBrokenDown,
    InProgress,
    EpicUpdated,
    Done,
}

impl PlanPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanPhase::NoPlan => "no_plan",
            PlanPhase::EpicsPlanned => "epics_planned",
            PlanPhase::TasksBrokenDown => "tasks_broken_down",
            PlanPhase::InProgress => "in_progress",
            PlanPhase::EpicUpdated => "epic_updated",
            PlanPhase::Done => "done",
        }
    }
}

impl std::fmt::Display for PlanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of a project's plan and progress.
///
/// The planning state machine consumes a snapshot and returns the next one;
/// callers never share a mutable instance between concurrent invocations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectState {
    pub description: String,
    pub complexity: Complexity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_project: Option<String>,
    pub epics: Vec<Epic>,
    #[serde(default)]
    pub modified_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default)]
    pub phase: PlanPhase,
}

impl ProjectState {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_example_project(mut self, name: impl Into<String>) -> Self {
        self.example_project = Some(name.into());
        self
    }

    /// Index of the first epic that is not completed.
    pub fn current_epic_index(&self) -> Option<usize> {
        self.epics.iter().position(|e| !e.completed)
    }

    pub fn current_epic(&self) -> Option<&Epic> {
        self.current_epic_index().map(|i| &self.epics[i])
    }

    pub fn current_epic_mut(&mut self) -> Option<&mut Epic> {
        let index = self.current_epic_index()?;
        self.epics.get_mut(index)
    }

    pub fn current_task(&self) -> Option<&Task> {
        self.current_epic().and_then(Epic::current_task)
    }

    /// Finished tasks of the current epic
    pub fn finished_tasks(&self) -> Vec<&Task> {
        self.current_epic()
            .map(Epic::finished_tasks)
            .unwrap_or_default()
    }

    fn task_mut(&mut self, id: &str) -> Result<&mut Task, DomainError> {
        self.epics
            .iter_mut()
            .flat_map(|e| e.tasks.iter_mut())
            .find(|t| t.id == id)
            .ok_or_else(|| DomainError::TaskNotFound(id.to_string()))
    }

    /// TODO -> IN_PROGRESS
    pub fn start_task(&mut self, id: &str) -> Result<(), DomainError> {
        self.task_mut(id)?.transition(TaskStatus::InProgress)?;
        self.phase = PlanPhase::InProgress;
        Ok(())
    }

    /// Start the first TODO task of the current epic, returning its id.
    pub fn start_next_task(&mut self) -> Result<Option<String>, DomainError> {
        let next = self
            .current_epic()
            .ok_or(DomainError::NoCurrentEpic)?
            .tasks
            .iter()
            .find(|t| t.status == TaskStatus::Todo)
            .map(|t| t.id.clone());
        if let Some(id) = &next {
            self.start_task(id)?;
        }
        Ok(next)
    }

    /// IN_PROGRESS -> REVIEW
    pub fn submit_for_review(&mut self, id: &str) -> Result<(), DomainError> {
        self.task_mut(id)?.transition(TaskStatus::Review)
    }

    /// Mark the coding step of the current task finished.
    ///
    /// Moves the in-progress task of the current epic to REVIEW and returns
    /// its id, or `None` when no task is in progress.
    pub fn complete_current_step(&mut self) -> Result<Option<String>, DomainError> {
        let Some(epic) = self.current_epic() else {
            return Ok(None);
        };
        let Some(id) = epic
            .tasks
            .iter()
            .find(|t| t.status == TaskStatus::InProgress)
            .map(|t| t.id.clone())
        else {
            return Ok(None);
        };
        self.submit_for_review(&id)?;
        Ok(Some(id))
    }

    /// -> DONE, completing the epic and project as they run out of work.
    pub fn complete_task(&mut self, id: &str) -> Result<(), DomainError> {
        self.task_mut(id)?.transition(TaskStatus::Done)?;
        for epic in &mut self.epics {
            if epic.tasks.iter().any(|t| t.id == id) {
                epic.refresh_completed();
            }
        }
        if !self.epics.is_empty() && self.epics.iter().all(|e| e.completed) {
            self.phase = PlanPhase::Done;
        }
        Ok(())
    }

    pub fn record_modified_file(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.modified_files.contains(&path) {
            self.modified_files.push(path);
        }
    }

    pub fn all_tasks(&self) -> impl Iterator<Item = &Task> {
        self.epics.iter().flat_map(|e| e.tasks.iter())
    }
}
