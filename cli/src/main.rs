//! CLI entrypoint for xpilot
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod cli;
mod console;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cli::{Cli, Command};
use console::{ConsoleErrorHandler, ConsoleStreamSink};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use xpilot_application::{
    AgentResponse, CodeReviewer, ConversationLogger, FilePersistence, LlmClient,
    NoConversationLogger, ReviewRequest, TechLead, TemplateRenderer,
};
use xpilot_domain::{Complexity, ProjectState};
use xpilot_infrastructure::{
    BuiltinTemplates, ConfigLoader, FileConfig, JsonlConversationLogger, LocalFileStore,
    Severity, create_provider,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose, cli.log_dir.as_deref());

    info!("Starting xpilot");

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())?
    };
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            Severity::Error => eprintln!("config error: {issue}"),
            Severity::Warning => warn!("{}", issue),
        }
    }
    if FileConfig::has_errors(&issues) {
        bail!("Invalid configuration");
    }

    // === Dependency Injection ===
    let llm_config = config.llm_config();
    let providers = config.provider_config();
    let adapter = create_provider(
        llm_config.provider,
        providers.endpoint(llm_config.provider),
        llm_config.model.clone(),
    )?;

    let logger: Arc<dyn ConversationLogger> = match &config.logging.request_log {
        Some(path) => match JsonlConversationLogger::open(path) {
            Some(logger) => Arc::new(logger),
            None => Arc::new(NoConversationLogger),
        },
        None => Arc::new(NoConversationLogger),
    };

    let cancellation = CancellationToken::new();
    {
        let token = cancellation.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        });
    }

    let mut client = LlmClient::new(adapter)
        .with_config(&llm_config)
        .with_error_handler(Arc::new(ConsoleErrorHandler::new(!cli.non_interactive)))
        .with_conversation_logger(logger.clone())
        .with_cancellation(cancellation);
    client = if cli.no_stream {
        client.with_stream(false)
    } else {
        client.with_stream_sink(Arc::new(ConsoleStreamSink))
    };
    let llm = Arc::new(client);
    let templates: Arc<dyn TemplateRenderer> = Arc::new(BuiltinTemplates::new());

    match cli.command {
        Command::Check => {
            if !llm.api_check().await {
                bail!(
                    "{} did not answer with model {}",
                    llm_config.provider,
                    llm_config.model
                );
            }
            println!("{} / {}: OK", llm_config.provider, llm_config.model);
        }

        Command::Plan {
            description,
            complexity,
            example,
            state,
            state_out,
        } => {
            let state = match state {
                Some(path) => read_state(&path).await?,
                None => new_state(description, complexity, example)?,
            };
            let state = TechLead::new(llm, templates).run(state).await?;
            print_plan(&state);
            if let Some(path) = state_out {
                write_state(&path, &state).await?;
            }
        }

        Command::Review {
            path,
            new,
            old,
            instructions,
            attempt,
            root,
            state,
        } => {
            let new_content = tokio::fs::read_to_string(&new)
                .await
                .with_context(|| format!("reading {}", new.display()))?;
            let old_content = match old {
                Some(old) => Some(
                    tokio::fs::read_to_string(&old)
                        .await
                        .with_context(|| format!("reading {}", old.display()))?,
                ),
                None => tokio::fs::read_to_string(root.join(&path)).await.ok(),
            };

            let persistence = Arc::new(LocalFileStore::new(root));
            let reviewer = CodeReviewer::new(llm, templates, persistence.clone())
                .with_params(config.execution_params())
                .with_conversation_logger(logger);

            let request = ReviewRequest::new(path, old_content, new_content)
                .with_instructions(instructions)
                .with_attempt(attempt);
            match state {
                Some(state_path) => {
                    let mut project = read_state(&state_path).await?;
                    let response = reviewer.run(request, &mut project).await?;
                    write_state(&state_path, &project).await?;
                    report(&response);
                }
                None => {
                    let outcome = reviewer.review_request(&request).await?;
                    match outcome.feedback {
                        Some(feedback) => {
                            println!("Changes need rework:\n\n{feedback}");
                        }
                        None => {
                            persistence
                                .save_file(&request.path, &outcome.content)
                                .await?;
                            println!("Saved {} ({})", request.path, outcome.state.as_str());
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

/// Console logging from the `-v` count, plus an optional rotated log file.
fn init_tracing(verbose: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let console = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match log_dir {
        Some(dir) => {
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "xpilot.log"));
            tracing_subscriber::registry()
                .with(EnvFilter::new(level))
                .with(console)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(EnvFilter::new(level))
                .with(console)
                .init();
            None
        }
    }
}

fn new_state(
    description: Option<String>,
    complexity: Complexity,
    example: Option<String>,
) -> Result<ProjectState> {
    let state = match (description, example) {
        (description, Some(example)) => ProjectState::new(description.unwrap_or_default())
            .with_example_project(example),
        (Some(description), None) => ProjectState::new(description),
        (None, None) => bail!("A project description is required unless --example or --state is given"),
    };
    Ok(state.with_complexity(complexity))
}

async fn read_state(path: &Path) -> Result<ProjectState> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading project state {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing project state {}", path.display()))
}

async fn write_state(path: &Path, state: &ProjectState) -> Result<()> {
    let json = serde_json::to_string_pretty(state)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("writing project state {}", path.display()))
}

fn print_plan(state: &ProjectState) {
    if let Some(action) = &state.action {
        println!("{action}");
    }
    let done = state.all_tasks().filter(|t| t.is_done()).count();
    println!("{done}/{} tasks done", state.all_tasks().count());
    for (i, epic) in state.epics.iter().enumerate() {
        println!();
        println!("Epic {}: {}", i + 1, epic.description);
        for task in &epic.tasks {
            println!("  [{}] {}", task.status.as_str(), task.description);
        }
    }
}

fn report(response: &AgentResponse) {
    match response {
        AgentResponse::Done => println!("Changes accepted"),
        AgentResponse::InputRequired(spots) => {
            println!("Changes accepted; human input required at:");
            for spot in spots {
                println!("  {}:{}", spot.file, spot.line);
            }
        }
        AgentResponse::CodeReviewFeedback {
            feedback, attempt, ..
        } => {
            println!("Attempt {attempt} needs rework:\n\n{feedback}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_requires_description_or_example() {
        assert!(new_state(None, Complexity::Simple, None).is_err());

        let state = new_state(Some("A todo app".into()), Complexity::Hard, None).unwrap();
        assert_eq!(state.description, "A todo app");
        assert_eq!(state.complexity, Complexity::Hard);

        let state = new_state(None, Complexity::Moderate, Some("example-project".into())).unwrap();
        assert_eq!(state.example_project.as_deref(), Some("example-project"));
    }
}
