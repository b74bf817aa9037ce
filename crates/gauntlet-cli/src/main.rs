//! Gauntlet - multi-stage elimination tournament CLI
//!
//! ## Commands
//!
//! - `create`: Open a session for an event
//! - `layer`: Execute one layer of a session
//! - `run`: Execute every remaining layer
//! - `status`: Show a session
//! - `results`: Show layer results or the final ranking
//! - `reset`: Soft-reset or delete a session
//! - `list`: List sessions

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gauntlet_core::{EngineConfig, GithubRepoChecker, Project, StaticProjectSource};
use gauntlet_engine::{LayerExecutor, LayerOutcome, ResetMode};
use gauntlet_state::{
    DbTarget, EligibilityCriteria, SessionId, SessionRecord, SessionStore, SurrealSessionStore,
};
use serde::Serialize;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "gauntlet")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-stage elimination tournament engine", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Output format for command results
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Database target: `mem://`, a SurrealDB URL, or a local path
    /// (default: SURREALDB_* environment, then .gauntlet/db)
    #[arg(long, global = true)]
    db: Option<String>,

    /// Engine configuration file (TOML)
    #[arg(long, global = true, env = "GAUNTLET_CONFIG")]
    config: Option<PathBuf>,

    /// Project catalog: JSON object mapping event id to its projects
    #[arg(long, global = true, env = "GAUNTLET_PROJECTS")]
    projects: Option<PathBuf>,

    /// GitHub token for repository checks
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a session for an event
    Create {
        /// Event whose projects compete
        #[arg(short, long)]
        event: String,

        /// Require a submission timestamp
        #[arg(long)]
        submission_deadline: bool,

        /// Require the repository to be reachable
        #[arg(long)]
        repository_accessible: bool,

        /// Require the repository to be public
        #[arg(long)]
        repository_public: bool,
    },

    /// Execute one layer (1-4) of a session
    Layer {
        session: String,

        layer: u8,
    },

    /// Execute every remaining layer of a session
    Run { session: String },

    /// Show a session
    Status { session: String },

    /// Show results of one layer, or the final ranking
    Results {
        session: String,

        /// Layer to show (default: final ranking)
        #[arg(short, long)]
        layer: Option<u8>,
    },

    /// Reset a session back to PENDING
    Reset {
        session: String,

        /// Delete the session instead
        #[arg(long)]
        hard: bool,
    },

    /// List sessions
    List {
        /// Only sessions of this event
        #[arg(short, long)]
        event: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    gauntlet_core::init_tracing(cli.json, level);

    let needs_projects = matches!(
        cli.command,
        Commands::Create { .. } | Commands::Layer { .. } | Commands::Run { .. }
    );
    if needs_projects && cli.projects.is_none() {
        bail!("--projects (or GAUNTLET_PROJECTS) is required for this command");
    }

    let config = EngineConfig::load(cli.config.as_deref())
        .context("Failed to load engine configuration")?;

    let target = match cli.db.as_deref() {
        Some(value) => DbTarget::parse(value),
        None => DbTarget::from_env(),
    };
    let store = Arc::new(
        SurrealSessionStore::connect(&target)
            .await
            .with_context(|| format!("Failed to connect to database at {target}"))?
            .with_insert_chunk_size(config.insert_chunk_size),
    );

    let source = match cli.projects.as_deref() {
        Some(path) => load_projects(path)?,
        None => StaticProjectSource::new(),
    };

    let mut checker = GithubRepoChecker::new(config.repo_check_timeout())
        .context("Failed to build repository checker")?;
    if let Some(token) = cli.github_token {
        checker = checker.with_token(token);
    }

    let executor = LayerExecutor::new(store.clone(), Arc::new(source), Arc::new(checker), config);
    let out = Output(cli.format);

    match cli.command {
        Commands::Create {
            event,
            submission_deadline,
            repository_accessible,
            repository_public,
        } => {
            let criteria = EligibilityCriteria {
                submission_deadline,
                repository_accessible,
                repository_public,
            };
            cmd_create(&executor, out, &event, criteria).await
        }
        Commands::Layer { session, layer } => cmd_layer(&executor, out, &session, layer).await,
        Commands::Run { session } => cmd_run(&executor, out, &session).await,
        Commands::Status { session } => cmd_status(&executor, out, &session).await,
        Commands::Results { session, layer } => {
            cmd_results(&executor, out, &session, layer).await
        }
        Commands::Reset { session, hard } => cmd_reset(&executor, out, &session, hard).await,
        Commands::List { event } => cmd_list(store.as_ref(), out, event.as_deref()).await,
    }
}

/// Read a project catalog: `{ "<event id>": [project, ...], ... }`.
fn load_projects(path: &Path) -> Result<StaticProjectSource> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read project catalog {}", path.display()))?;
    let events: HashMap<String, Vec<Project>> = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid project catalog {}", path.display()))?;

    let source = StaticProjectSource::new();
    for (event_id, projects) in events {
        info!(event_id = %event_id, projects = projects.len(), "loaded projects");
        source.insert_event(event_id, projects);
    }
    Ok(source)
}

#[derive(Clone, Copy)]
struct Output(OutputFormat);

impl Output {
    fn json(self) -> bool {
        self.0 == OutputFormat::Json
    }

    fn emit<T: Serialize>(self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

fn print_session(session: &SessionRecord) {
    println!("session   {}", session.session_id);
    println!("event     {}", session.event_id);
    println!("status    {}", session.status);
    println!("layer     {}", session.current_layer);
    println!(
        "projects  {} total, {} eliminated, {} remaining",
        session.total_projects,
        session.eliminated_projects,
        session.remaining_projects()
    );
    if let Some(reason) = &session.failure_reason {
        println!("failure   {reason}");
    }
}

fn print_outcome(outcome: &LayerOutcome) {
    println!(
        "Layer {}: {} processed, {} eliminated, {} advanced",
        outcome.layer, outcome.processed, outcome.eliminated, outcome.advanced
    );
    if let Some(finals) = &outcome.final_results {
        println!(
            "Session completed: {} winners across {} categories",
            finals.total_winners, finals.category_count
        );
    }
}

async fn cmd_create(
    executor: &LayerExecutor,
    out: Output,
    event: &str,
    criteria: EligibilityCriteria,
) -> Result<()> {
    let session = executor
        .create_session(event, criteria)
        .await
        .context(format!("Failed to create session for event {event}"))?;

    if out.json() {
        return out.emit(&session);
    }
    println!("Created session {}", session.session_id);
    println!("  {} projects", session.total_projects);
    Ok(())
}

async fn cmd_layer(executor: &LayerExecutor, out: Output, session: &str, layer: u8) -> Result<()> {
    let outcome = executor
        .execute_layer(&SessionId::from(session), layer)
        .await
        .context(format!("Layer {layer} failed for session {session}"))?;

    if out.json() {
        return out.emit(&outcome);
    }
    print_outcome(&outcome);
    Ok(())
}

async fn cmd_run(executor: &LayerExecutor, out: Output, session: &str) -> Result<()> {
    let outcomes = executor
        .run_remaining(&SessionId::from(session))
        .await
        .context(format!("Run failed for session {session}"))?;

    if out.json() {
        return out.emit(&outcomes);
    }
    if outcomes.is_empty() {
        println!("Session {session} has no layers left to run");
    }
    for outcome in &outcomes {
        print_outcome(outcome);
    }
    Ok(())
}

async fn cmd_status(executor: &LayerExecutor, out: Output, session: &str) -> Result<()> {
    let record = executor
        .session(&SessionId::from(session))
        .await
        .context(format!("Session not found: {session}"))?;

    if out.json() {
        return out.emit(&record);
    }
    print_session(&record);
    Ok(())
}

async fn cmd_results(
    executor: &LayerExecutor,
    out: Output,
    session: &str,
    layer: Option<u8>,
) -> Result<()> {
    let sid = SessionId::from(session);

    let Some(layer) = layer else {
        let finals = executor
            .final_results(&sid)
            .await
            .context(format!("No final results for session {session}"))?;
        if out.json() {
            return out.emit(&finals);
        }
        for (category, winners) in &finals.winners {
            println!("{category}");
            for (rank, project_id) in winners.iter().enumerate() {
                println!("  {}. {project_id}", rank + 1);
            }
        }
        println!(
            "{} winners, generated {}",
            finals.total_winners,
            finals.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        return Ok(());
    };

    let results = executor
        .layer_results(&sid, Some(layer))
        .await
        .context(format!("Failed to read layer {layer} results"))?;
    if out.json() {
        return out.emit(&results);
    }
    if results.is_empty() {
        println!("No results for layer {layer}");
    }
    for r in &results {
        let verdict = if r.eliminated { "OUT" } else { "in " };
        println!("{verdict} {:>5.1}  {}  {}", r.score, r.project_id, r.reason);
    }
    Ok(())
}

async fn cmd_reset(executor: &LayerExecutor, out: Output, session: &str, hard: bool) -> Result<()> {
    let mode = if hard { ResetMode::Hard } else { ResetMode::Soft };
    let reset = executor
        .reset_session(&SessionId::from(session), mode)
        .await
        .context(format!("Failed to reset session {session}"))?;

    match reset {
        Some(record) if out.json() => out.emit(&record),
        Some(record) => {
            println!("Session {} reset to {}", record.session_id, record.status);
            Ok(())
        }
        None if out.json() => out.emit(&serde_json::json!({ "deleted": session })),
        None => {
            println!("Session {session} deleted");
            Ok(())
        }
    }
}

async fn cmd_list(store: &dyn SessionStore, out: Output, event: Option<&str>) -> Result<()> {
    let sessions = store
        .list_sessions(event)
        .await
        .context("Failed to list sessions")?;

    if out.json() {
        return out.emit(&sessions);
    }
    if sessions.is_empty() {
        println!("No sessions found");
    }
    for s in &sessions {
        println!(
            "{}  {:<24} {:<22} layer {}",
            s.session_id, s.event_id, s.status, s.current_layer
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use gauntlet_state::ProjectSource;
    use std::io::Write;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_layer_and_reset_commands() {
        let cli = Cli::try_parse_from(["gauntlet", "--format", "json", "layer", "s-1", "2"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Layer { layer: 2, .. }));

        let cli = Cli::try_parse_from(["gauntlet", "reset", "s-1", "--hard"]).unwrap();
        assert!(matches!(cli.command, Commands::Reset { hard: true, .. }));
    }

    #[tokio::test]
    async fn loads_project_catalog_by_event() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"hack-1": [{{"id": "p-1", "categoryId": "defi"}}, {{"id": "p-2", "categoryId": "gaming"}}]}}"#
        )
        .unwrap();

        let source = load_projects(file.path()).unwrap();
        let projects = source.fetch_projects("hack-1").await.unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[1].category_id, "gaming");
        assert!(source.fetch_projects("other").await.unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_catalog() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2, 3]").unwrap();
        assert!(load_projects(file.path()).is_err());
    }
}
