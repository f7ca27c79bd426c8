//! Planning use case.
//!
//! [`TechLead`] drives the project plan through its phases:
//!
//! ```text
//! NoPlan -> EpicsPlanned -> TasksBrokenDown -> InProgress -> EpicUpdated -> ... -> Done
//! ```
//!
//! Each call takes a [`ProjectState`] snapshot and returns the next one.

use crate::ports::template::{TemplateError, TemplateRenderer};
use crate::use_cases::invoke_llm::{ApiError, InvokeOptions, LlmClient};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use xpilot_domain::planning::find_example;
use xpilot_domain::{
    Complexity, Conversation, DevelopmentPlan, DomainError, Epic, EpicPlan, JsonParser, PlanPhase,
    ProjectState, PromptTemplate, Task, TaskSpec, UpdatedDevelopmentPlan,
};

#[derive(Error, Debug)]
pub enum PlanningError {
    #[error("LLM request failed: {0}")]
    Api(#[from] ApiError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Project state error: {0}")]
    Domain(#[from] DomainError),
}

/// Use case producing and updating development plans.
pub struct TechLead {
    llm: Arc<LlmClient>,
    templates: Arc<dyn TemplateRenderer>,
}

impl TechLead {
    pub fn new(llm: Arc<LlmClient>, templates: Arc<dyn TemplateRenderer>) -> Self {
        Self { llm, templates }
    }

    /// Advance `state` by one planning step.
    ///
    /// An epic that already has tasks gets updated; otherwise a plan is
    /// created, either from the example catalog or by the LLM.
    pub async fn run(&self, mut state: ProjectState) -> Result<ProjectState, PlanningError> {
        let has_tasks = state.current_epic().is_some_and(|e| !e.tasks.is_empty());
        if has_tasks {
            let modified_files = state.modified_files.clone();
            let Some(epic) = state.current_epic_mut() else {
                return Err(DomainError::NoCurrentEpic.into());
            };
            let finished = epic.finished_tasks().len();
            let (description, tasks) = self.update_epic(epic, &modified_files).await?;
            epic.description = description;
            epic.replace_unfinished(tasks);
            info!(
                epic = %epic.id,
                finished,
                remaining = epic.tasks.len() - finished,
                "Development plan updated"
            );
            state.phase = PlanPhase::EpicUpdated;
            state.action = Some("Development plan updated".to_string());
            return Ok(state);
        }

        state.epics = match state.example_project.as_deref() {
            Some(name) => vec![self.plan_example_project(name)?],
            None => {
                self.plan_project(&state.description, state.complexity)
                    .await?
            }
        };
        state.phase = PlanPhase::TasksBrokenDown;
        state.action = Some("Project plan created".to_string());
        Ok(state)
    }

    /// Split a project into epics and break each one down into tasks.
    pub async fn plan_project(
        &self,
        description: &str,
        complexity: Complexity,
    ) -> Result<Vec<Epic>, PlanningError> {
        let mut convo = Conversation::new();
        self.templates.render_into(
            &mut convo,
            PromptTemplate::CREATE_PLAN,
            json!({ "project_description": description }),
        )?;
        let plan: DevelopmentPlan = self
            .ask(&mut convo, |p: &DevelopmentPlan| {
                non_empty(&p.plan, "The plan must contain at least one epic.")
            })
            .await?;

        let mut epics: Vec<Epic> = plan
            .plan
            .into_iter()
            .map(|spec| Epic::new(spec.description, complexity))
            .collect();
        info!(epics = epics.len(), phase = %PlanPhase::EpicsPlanned, "Project plan created");

        self.break_down_epics(&mut epics).await?;
        Ok(epics)
    }

    /// Ask for the task list of every epic.
    pub async fn break_down_epics(&self, epics: &mut [Epic]) -> Result<(), PlanningError> {
        for epic in epics.iter_mut() {
            let mut convo = Conversation::new();
            self.templates.render_into(
                &mut convo,
                PromptTemplate::BREAK_DOWN_EPIC,
                json!({ "epic_description": epic.description }),
            )?;
            let plan: EpicPlan = self
                .ask(&mut convo, |p: &EpicPlan| {
                    non_empty(&p.plan, "Every epic needs at least one task.")
                })
                .await?;
            epic.tasks = plan.plan.into_iter().map(new_task).collect();
            debug!(epic = %epic.id, tasks = epic.tasks.len(), "Epic broken down");
        }
        Ok(())
    }

    /// Revise an epic in progress.
    ///
    /// Returns the updated epic description and the tasks that replace the
    /// epic's unfinished ones.
    pub async fn update_epic(
        &self,
        epic: &Epic,
        modified_files: &[String],
    ) -> Result<(String, Vec<Task>), PlanningError> {
        let mut convo = Conversation::new();
        self.templates.render_into(
            &mut convo,
            PromptTemplate::UPDATE_PLAN,
            json!({
                "epic": epic,
                "finished_tasks": epic.finished_tasks(),
                "modified_files": modified_files,
            }),
        )?;
        let update: UpdatedDevelopmentPlan = self.ask(&mut convo, |_| Ok(())).await?;
        let tasks = update.plan.into_iter().map(new_task).collect();
        Ok((update.updated_current_epic.description, tasks))
    }

    /// Predefined plan from the example catalog. No LLM calls.
    pub fn plan_example_project(&self, name: &str) -> Result<Epic, PlanningError> {
        let example =
            find_example(name).ok_or_else(|| DomainError::UnknownExampleProject(name.to_string()))?;
        debug!(example = %name, tasks = example.tasks.len(), "Loaded example project plan");
        Ok(example.to_epic())
    }

    async fn ask<T, F>(&self, convo: &mut Conversation, validate: F) -> Result<T, PlanningError>
    where
        T: DeserializeOwned + JsonSchema + Send + 'static,
        F: Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    {
        convo.require_schema(JsonParser::<T>::schema());
        let parser = JsonParser::<T>::new().with_validator(validate);
        let (output, _) = self
            .llm
            .invoke(convo, &parser, InvokeOptions::default().with_json_mode())
            .await?;
        Ok(output)
    }
}

fn new_task(spec: TaskSpec) -> Task {
    Task::new(spec.description)
        .with_solution(spec.solution)
        .with_review(spec.review)
}

fn non_empty<T>(items: &[T], message: &str) -> Result<(), String> {
    if items.is_empty() {
        return Err(message.to_string());
    }
    Ok(())
}
