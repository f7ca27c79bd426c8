//! Code review use case.
//!
//! [`CodeReviewer`] decides what happens to a proposed file rewrite:
//!
//! - no previous content, no change, or too many attempts: accept as is
//! - otherwise the diff is split into hunks and a reviewer model classifies
//!   each one; approved hunks are patched onto the old content and rework
//!   requests are turned into feedback for the next coding attempt
//!
//! Accepted content is saved through [`FilePersistence`] and the current task
//! moves on to review.

use crate::config::ExecutionParams;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::persistence::{FilePersistence, PersistenceError};
use crate::ports::template::{TemplateError, TemplateRenderer};
use crate::use_cases::invoke_llm::{ApiError, InvokeOptions, LlmClient};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use xpilot_domain::review::{Convergence, Resolution, annotate, resolve};
use xpilot_domain::{
    Conversation, DomainError, JsonParser, PatchDirection, ProjectState, PromptTemplate,
    ReviewChanges, ReviewState, apply_hunks, diff_hunks,
};

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("LLM request failed: {0}")]
    Api(#[from] ApiError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Project state error: {0}")]
    Domain(#[from] DomainError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A proposed change to one file
#[derive(Debug, Clone)]
pub struct ReviewRequest {
    pub path: String,
    /// Instructions the coder was following
    pub instructions: String,
    /// `None` for a new file
    pub old_content: Option<String>,
    pub new_content: String,
    /// Coding attempts made so far for this change
    pub attempt: u32,
}

impl ReviewRequest {
    pub fn new(
        path: impl Into<String>,
        old_content: Option<String>,
        new_content: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            instructions: String::new(),
            old_content,
            new_content: new_content.into(),
            attempt: 1,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }
}

/// A spot in a saved file that needs a human
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRequired {
    pub file: String,
    pub line: usize,
}

/// Result of running the reviewer on a change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentResponse {
    /// Content accepted and saved.
    Done,
    /// Content saved, but it contains markers asking for human input.
    InputRequired(Vec<InputRequired>),
    /// Some hunks need rework; nothing was saved.
    CodeReviewFeedback {
        new_content: String,
        approved_content: String,
        feedback: String,
        attempt: u32,
    },
}

/// Content after review plus optional rework feedback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub content: String,
    pub feedback: Option<String>,
    pub state: ReviewState,
}

impl ReviewOutcome {
    fn converged(content: impl Into<String>, feedback: Option<String>) -> Self {
        Self {
            content: content.into(),
            feedback,
            state: ReviewState::Converged,
        }
    }

    fn unconditional(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            feedback: None,
            state: ReviewState::AcceptedUnconditionally,
        }
    }
}

/// Use case reviewing proposed file changes hunk by hunk.
pub struct CodeReviewer {
    llm: Arc<LlmClient>,
    templates: Arc<dyn TemplateRenderer>,
    persistence: Arc<dyn FilePersistence>,
    conversation_logger: Arc<dyn ConversationLogger>,
    params: ExecutionParams,
}

impl CodeReviewer {
    pub fn new(
        llm: Arc<LlmClient>,
        templates: Arc<dyn TemplateRenderer>,
        persistence: Arc<dyn FilePersistence>,
    ) -> Self {
        Self {
            llm,
            templates,
            persistence,
            conversation_logger: Arc::new(NoConversationLogger),
            params: ExecutionParams::default(),
        }
    }

    pub fn with_params(mut self, params: ExecutionParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    /// Review `request` in the context of `state`'s current task.
    pub async fn run(
        &self,
        request: ReviewRequest,
        state: &mut ProjectState,
    ) -> Result<AgentResponse, ReviewError> {
        if self.accepts_unconditionally(&request) {
            debug!(
                path = %request.path,
                attempt = request.attempt,
                "Accepting change without review"
            );
            return self
                .accept_changes(&request.path, &request.new_content, state)
                .await;
        }

        let old_content = request.old_content.as_deref().unwrap_or_default();
        let base = self.task_conversation(state)?;
        let outcome = self
            .review_change_in(
                &base,
                &request.path,
                &request.instructions,
                old_content,
                &request.new_content,
            )
            .await?;

        match outcome.feedback {
            Some(feedback) => Ok(AgentResponse::CodeReviewFeedback {
                new_content: request.new_content,
                approved_content: outcome.content,
                feedback,
                attempt: request.attempt,
            }),
            None => {
                self.accept_changes(&request.path, &outcome.content, state)
                    .await
            }
        }
    }

    /// New files, unchanged content and changes past the coding-attempt
    /// budget skip the hunk review.
    pub fn accepts_unconditionally(&self, request: &ReviewRequest) -> bool {
        let old_content = request.old_content.as_deref().unwrap_or_default();
        old_content.is_empty()
            || request.new_content == old_content
            || request.attempt >= self.params.max_coding_attempts
    }

    /// Review `request` without task context or saving anything.
    pub async fn review_request(
        &self,
        request: &ReviewRequest,
    ) -> Result<ReviewOutcome, ReviewError> {
        if self.accepts_unconditionally(request) {
            debug!(
                path = %request.path,
                attempt = request.attempt,
                "Accepting change without review"
            );
            return Ok(ReviewOutcome::unconditional(request.new_content.as_str()));
        }
        self.review_change(
            &request.path,
            &request.instructions,
            request.old_content.as_deref().unwrap_or_default(),
            &request.new_content,
        )
        .await
    }

    /// Save accepted content and advance the current task.
    pub async fn accept_changes(
        &self,
        path: &str,
        content: &str,
        state: &mut ProjectState,
    ) -> Result<AgentResponse, ReviewError> {
        self.persistence.save_file(path, content).await?;
        state.record_modified_file(path);
        if let Some(task) = state.complete_current_step()? {
            debug!(task = %task, "Coding step complete, task moved to review");
        }

        let lines = self.persistence.input_required(content);
        if lines.is_empty() {
            return Ok(AgentResponse::Done);
        }
        info!(path = %path, "Accepted content asks for human input on {} line(s)", lines.len());
        Ok(AgentResponse::InputRequired(
            lines
                .into_iter()
                .map(|line| InputRequired {
                    file: path.to_string(),
                    line,
                })
                .collect(),
        ))
    }

    /// Review a change without any task context.
    pub async fn review_change(
        &self,
        file_name: &str,
        instructions: &str,
        old_content: &str,
        new_content: &str,
    ) -> Result<ReviewOutcome, ReviewError> {
        self.review_change_in(
            &Conversation::new(),
            file_name,
            instructions,
            old_content,
            new_content,
        )
        .await
    }

    /// Review a change, building the review prompt on top of `base`.
    pub async fn review_change_in(
        &self,
        base: &Conversation,
        file_name: &str,
        instructions: &str,
        old_content: &str,
        new_content: &str,
    ) -> Result<ReviewOutcome, ReviewError> {
        let hunks = diff_hunks(old_content, new_content);
        if hunks.is_empty() {
            return Ok(ReviewOutcome::converged(old_content, None));
        }

        let numbered: Vec<String> = hunks
            .iter()
            .enumerate()
            .map(|(i, hunk)| format!("## Hunk {}\n```\n{}\n```", i + 1, hunk))
            .collect();
        let mut convo = base.fork();
        self.templates.render_into(
            &mut convo,
            PromptTemplate::REVIEW_CHANGES,
            json!({
                "instructions": instructions,
                "file_name": file_name,
                "old_content": old_content,
                "hunks": numbered,
            }),
        )?;
        convo.require_schema(JsonParser::<ReviewChanges>::schema());

        let parser = JsonParser::<ReviewChanges>::new();
        let options = InvokeOptions::default().with_temperature(0.0);
        debug!(file = %file_name, state = %ReviewState::Reviewing, "Requesting review of {} hunk(s)", hunks.len());
        let (mut review, _) = self.llm.invoke(&convo, &parser, options.clone()).await?;

        let mut reprompts = 0;
        loop {
            let convergence = Convergence::check(&review, hunks.len());
            let Some(correction) = convergence.correction() else {
                break;
            };
            if reprompts == self.params.max_review_retries {
                warn!(
                    file = %file_name,
                    "Review did not cover every hunk after {} re-prompts; accepting the change as is",
                    reprompts
                );
                return Ok(ReviewOutcome::unconditional(new_content));
            }
            reprompts += 1;
            debug!(file = %file_name, ?convergence, "Re-prompting reviewer");
            convo
                .assistant(serde_json::to_string(&review)?)
                .user(correction);
            review = self.llm.invoke(&convo, &parser, options.clone()).await?.0;
        }

        let annotated = annotate(&hunks, &review);
        let resolution = resolve(&annotated, &review.review_notes);
        self.conversation_logger.log(ConversationEvent::review_outcome(
            file_name,
            hunks.len(),
            &review,
        ));

        let outcome = match resolution {
            Resolution::AcceptNew => {
                info!("Applying entire change to {}", file_name);
                ReviewOutcome::converged(new_content, None)
            }
            Resolution::Reject => {
                info!(
                    "Rejecting entire change to {} with reason: {}",
                    file_name, review.review_notes
                );
                ReviewOutcome::converged(old_content, None)
            }
            Resolution::Rework { feedback } => {
                info!("Requesting rework for changes to {} (0 hunks to apply)", file_name);
                ReviewOutcome::converged(old_content, Some(feedback))
            }
            Resolution::Partial { apply, feedback } => {
                debug!("Applying {} of {} hunks to {}", apply.len(), hunks.len(), file_name);
                let content = match apply_hunks(old_content, &apply, PatchDirection::Forward) {
                    Ok(content) => content,
                    Err(err) => {
                        warn!(
                            "Error applying diff to {}: {}; hoping all changes are valid",
                            file_name, err
                        );
                        new_content.to_string()
                    }
                };
                if feedback.is_some() {
                    info!("Requesting further rework for changes to {}", file_name);
                }
                ReviewOutcome::converged(content, feedback)
            }
        };
        Ok(outcome)
    }

    /// Conversation describing the task currently being implemented.
    pub fn task_conversation(&self, state: &ProjectState) -> Result<Conversation, ReviewError> {
        let mut convo = Conversation::new();
        let Some(epic) = state.current_epic() else {
            return Ok(convo);
        };
        let Some((index, task)) = epic.tasks.iter().enumerate().find(|(_, t)| !t.is_done())
        else {
            return Ok(convo);
        };

        self.templates.render_into(
            &mut convo,
            PromptTemplate::BREAKDOWN,
            json!({
                "task": {
                    "description": task.description,
                    "solution": task.solution.as_deref().unwrap_or_default(),
                },
                "current_task_index": index + 1,
            }),
        )?;
        if let Some(instructions) = &task.instructions {
            convo.assistant(instructions.clone());
        }
        Ok(convo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::testing::{EchoTemplates, MemoryPersistence, ScriptedProvider};
    use xpilot_domain::{Complexity, Epic, Model, Task, TaskStatus};

    struct Fixture {
        provider: Arc<ScriptedProvider>,
        persistence: Arc<MemoryPersistence>,
        reviewer: CodeReviewer,
    }

    fn fixture(provider: ScriptedProvider) -> Fixture {
        let provider = Arc::new(provider);
        let persistence = Arc::new(MemoryPersistence::default());
        let llm = Arc::new(LlmClient::new(provider.clone()).with_stream(false));
        let reviewer = CodeReviewer::new(llm, Arc::new(EchoTemplates), persistence.clone());
        Fixture {
            provider,
            persistence,
            reviewer,
        }
    }

    fn review_json(decisions: &[(usize, &str)]) -> String {
        let hunks: Vec<_> = decisions
            .iter()
            .map(|(n, d)| json!({"number": n, "reason": format!("reason for {n}"), "decision": d}))
            .collect();
        json!({"hunks": hunks, "review_notes": "looks mostly fine"}).to_string()
    }

    fn numbered_lines(edits: &[(usize, &str)]) -> String {
        (1..=20)
            .map(|i| {
                edits
                    .iter()
                    .find(|(n, _)| *n == i)
                    .map(|(_, text)| format!("{text}\n"))
                    .unwrap_or_else(|| format!("line {i}\n"))
            })
            .collect()
    }

    fn state_in_progress() -> ProjectState {
        let mut epic = Epic::new("Epic", Complexity::Simple);
        epic.tasks = vec![Task::new("Write the code").with_instructions("Edit main.rs")];
        let mut state = ProjectState::new("project");
        state.epics.push(epic);
        state.start_next_task().unwrap();
        state
    }

    #[tokio::test]
    async fn test_identical_content_returns_old_without_llm() {
        let f = fixture(ScriptedProvider::new(Model::Gpt4o));
        let outcome = f
            .reviewer
            .review_change("a.txt", "", "same\n", "same\n")
            .await
            .unwrap();

        assert_eq!(outcome.content, "same\n");
        assert!(outcome.feedback.is_none());
        assert_eq!(f.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_single_hunk_applied() {
        let f = fixture(ScriptedProvider::new(Model::Gpt4o).reply(review_json(&[(1, "apply")])));
        let outcome = f
            .reviewer
            .review_change("a.txt", "capitalize b", "a\nb\nc\n", "a\nB\nc\n")
            .await
            .unwrap();

        assert_eq!(outcome.content, "a\nB\nc\n");
        assert!(outcome.feedback.is_none());
        assert_eq!(outcome.state, ReviewState::Converged);

        let request = &f.provider.requests()[0];
        assert_eq!(request.temperature, Some(0.0));
        let prompt = &request.messages[0].content;
        assert!(prompt.starts_with("<review_changes>"));
        assert!(prompt.contains("## Hunk 1"));
        assert!(
            request.messages[1]
                .content
                .starts_with("IMPORTANT: Your response MUST conform to this JSON schema")
        );
    }

    #[tokio::test]
    async fn test_apply_and_rework_merges_and_returns_feedback() {
        let old = numbered_lines(&[]);
        let new = numbered_lines(&[(2, "LINE TWO"), (18, "LINE EIGHTEEN")]);
        let f = fixture(
            ScriptedProvider::new(Model::Gpt4o).reply(review_json(&[(1, "apply"), (2, "rework")])),
        );
        let outcome = f
            .reviewer
            .review_change("list.txt", "rename", &old, &new)
            .await
            .unwrap();

        assert_eq!(outcome.content, numbered_lines(&[(2, "LINE TWO")]));
        let feedback = outcome.feedback.unwrap();
        assert!(feedback.contains("reason for 2"));
        assert!(feedback.contains("+LINE EIGHTEEN"));
        assert!(feedback.ends_with("Review notes:\nlooks mostly fine"));
    }

    #[tokio::test]
    async fn test_all_ignored_keeps_old_silently() {
        let f = fixture(ScriptedProvider::new(Model::Gpt4o).reply(review_json(&[(1, "ignore")])));
        let outcome = f
            .reviewer
            .review_change("a.txt", "", "a\nb\nc\n", "a\nB\nc\n")
            .await
            .unwrap();
        assert_eq!(outcome.content, "a\nb\nc\n");
        assert!(outcome.feedback.is_none());
    }

    #[tokio::test]
    async fn test_too_few_decisions_reprompted_then_converges() {
        let old = numbered_lines(&[]);
        let new = numbered_lines(&[(2, "two"), (18, "eighteen")]);
        let f = fixture(
            ScriptedProvider::new(Model::Gpt4o)
                .reply(review_json(&[(1, "apply")]))
                .reply(review_json(&[(1, "apply"), (2, "apply")])),
        );
        let outcome = f
            .reviewer
            .review_change("list.txt", "", &old, &new)
            .await
            .unwrap();

        assert_eq!(outcome.content, new);
        let second = &f.provider.requests()[1].messages;
        assert!(
            second
                .last()
                .unwrap()
                .content
                .starts_with("Not all hunks have been reviewed.")
        );
    }

    #[tokio::test]
    async fn test_unknown_hunk_number_reprompted() {
        let old = numbered_lines(&[]);
        let new = numbered_lines(&[(2, "two"), (18, "eighteen")]);
        let f = fixture(
            ScriptedProvider::new(Model::Gpt4o)
                .reply(review_json(&[(1, "apply"), (7, "apply")]))
                .reply(review_json(&[(1, "apply"), (2, "apply")])),
        );
        let outcome = f
            .reviewer
            .review_change("list.txt", "", &old, &new)
            .await
            .unwrap();

        assert_eq!(f.provider.call_count(), 2);
        assert_eq!(outcome.state, ReviewState::Converged);
        assert!(outcome.content.contains("eighteen"));
        let second = &f.provider.requests()[1].messages;
        assert!(
            second
                .last()
                .unwrap()
                .content
                .starts_with("Your review contains hunk 7")
        );
    }

    #[tokio::test]
    async fn test_non_converging_review_falls_back_to_new_content() {
        let too_many = review_json(&[(1, "ignore"), (2, "ignore")]);
        let f = fixture(
            ScriptedProvider::new(Model::Gpt4o)
                .reply(too_many.clone())
                .reply(too_many.clone())
                .reply(too_many.clone())
                .reply(too_many),
        );
        let outcome = f
            .reviewer
            .review_change("a.txt", "", "a\nb\nc\n", "a\nB\nc\n")
            .await
            .unwrap();

        assert_eq!(outcome.content, "a\nB\nc\n");
        assert_eq!(outcome.state, ReviewState::AcceptedUnconditionally);
        assert_eq!(f.provider.call_count(), 3);
        let last = f.provider.requests()[2].messages.last().unwrap().content.clone();
        assert_eq!(
            last,
            "Your review contains more hunks (2) than in the original diff (1). \
             Note that one hunk may have multiple changed lines."
        );
    }

    #[tokio::test]
    async fn test_run_accepts_new_file_unconditionally() {
        let f = fixture(ScriptedProvider::new(Model::Gpt4o));
        let mut state = state_in_progress();
        let response = f
            .reviewer
            .run(ReviewRequest::new("src/new.rs", None, "fn new() {}\n"), &mut state)
            .await
            .unwrap();

        assert_eq!(response, AgentResponse::Done);
        assert_eq!(f.persistence.file("src/new.rs").unwrap(), "fn new() {}\n");
        assert_eq!(state.epics[0].tasks[0].status, TaskStatus::Review);
        assert_eq!(state.modified_files, vec!["src/new.rs"]);
        assert_eq!(f.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_review_request_skips_llm_for_new_file_and_last_attempt() {
        let f = fixture(ScriptedProvider::new(Model::Gpt4o));

        let new_file = ReviewRequest::new("src/new.rs", None, "fn new() {}\n");
        let outcome = f.reviewer.review_request(&new_file).await.unwrap();
        assert_eq!(outcome.state, ReviewState::AcceptedUnconditionally);
        assert_eq!(outcome.content, "fn new() {}\n");
        assert!(outcome.feedback.is_none());

        let last_attempt =
            ReviewRequest::new("a.txt", Some("a\nb\nc\n".to_string()), "a\nB\nc\n").with_attempt(3);
        let outcome = f.reviewer.review_request(&last_attempt).await.unwrap();
        assert_eq!(outcome.state, ReviewState::AcceptedUnconditionally);
        assert_eq!(outcome.content, "a\nB\nc\n");

        assert_eq!(f.provider.call_count(), 0);
        assert!(f.persistence.file("src/new.rs").is_none());
    }

    #[tokio::test]
    async fn test_review_request_reviews_ordinary_change() {
        let f = fixture(ScriptedProvider::new(Model::Gpt4o).reply(review_json(&[(1, "apply")])));
        let request = ReviewRequest::new("a.txt", Some("a\nb\nc\n".to_string()), "a\nB\nc\n");

        let outcome = f.reviewer.review_request(&request).await.unwrap();

        assert_eq!(f.provider.call_count(), 1);
        assert_eq!(outcome.state, ReviewState::Converged);
        assert_eq!(outcome.content, "a\nB\nc\n");
    }

    #[tokio::test]
    async fn test_run_accepts_after_max_attempts() {
        let f = fixture(ScriptedProvider::new(Model::Gpt4o));
        let mut state = state_in_progress();
        let request = ReviewRequest::new("a.txt", Some("a\n".to_string()), "b\n").with_attempt(3);
        let response = f.reviewer.run(request, &mut state).await.unwrap();

        assert_eq!(response, AgentResponse::Done);
        assert_eq!(f.persistence.file("a.txt").unwrap(), "b\n");
        assert_eq!(f.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_run_returns_feedback_without_saving() {
        let f = fixture(ScriptedProvider::new(Model::Gpt4o).reply(review_json(&[(1, "rework")])));
        let mut state = state_in_progress();
        let request = ReviewRequest::new("a.txt", Some("a\nb\nc\n".to_string()), "a\nB\nc\n")
            .with_instructions("capitalize")
            .with_attempt(1);
        let response = f.reviewer.run(request, &mut state).await.unwrap();

        let AgentResponse::CodeReviewFeedback {
            new_content,
            approved_content,
            feedback,
            attempt,
        } = response
        else {
            panic!("expected feedback");
        };
        assert_eq!(new_content, "a\nB\nc\n");
        assert_eq!(approved_content, "a\nb\nc\n");
        assert!(feedback.contains("reason for 1"));
        assert_eq!(attempt, 1);
        assert!(f.persistence.file("a.txt").is_none());
        assert_eq!(state.epics[0].tasks[0].status, TaskStatus::InProgress);

        let messages = &f.provider.requests()[0].messages;
        assert!(messages[0].content.starts_with("<breakdown>"));
        assert_eq!(messages[1].content, "Edit main.rs");
        assert!(messages[2].content.starts_with("<review_changes>"));
    }

    #[tokio::test]
    async fn test_run_reports_input_required_markers() {
        let f = fixture(ScriptedProvider::new(Model::Gpt4o));
        let mut state = state_in_progress();
        let content = "key = \"\"  # INPUT_REQUIRED: add your key\nother = 1\n";
        let response = f
            .reviewer
            .run(ReviewRequest::new("config.py", None, content), &mut state)
            .await
            .unwrap();

        assert_eq!(
            response,
            AgentResponse::InputRequired(vec![InputRequired {
                file: "config.py".to_string(),
                line: 1,
            }])
        );
        assert!(f.persistence.file("config.py").is_some());
    }
}
