//! CLI definition and command dispatch for hnk.
//!
//! This module defines the command-line interface using `clap` and provides
//! the `run()` function that dispatches commands to the engine.
//!
//! ## Configuration Precedence
//!
//! Configuration is resolved with the following precedence (highest to lowest):
//! 1. CLI flags (e.g., `--config`, `--verbose`)
//! 2. Environment variables (`HNK_CONFIG`, `HNK_VERBOSE`)
//! 3. Config file (`~/.hnk/config.yaml` or path from `--config`/`HNK_CONFIG`)
//! 4. Built-in defaults

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::ui::table::{render_catalog_table, render_options_table, render_sessions_table, OptionRow, SessionRow};
use crate::ui::{ColorMode, MessageType, Style};

use hnk_core::{HnkEngine, HnkError, TurnOutcome, Workspace};

// ============================================================================
// CLI Definition
// ============================================================================

/// Version string including git commit hash
const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

/// Hierarchical Narrowing Kernel - corpus question routing engine
#[derive(Parser, Debug)]
#[command(name = "hnk")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, env = "HNK_VERBOSE")]
    pub verbose: bool,

    /// Path to configuration file (default: ~/.hnk/config.yaml)
    #[arg(long, global = true, env = "HNK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Color output mode: always, never, or auto (default: auto)
    #[arg(long, global = true, env = "HNK_COLOR", default_value = "auto")]
    pub color: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize HNK structures for the current workspace
    #[command(after_help = r#"EXAMPLES:
    # Initialize HNK in the corpus directory
    hnk init

    # Typical first-time workflow
    hnk init && hnk load descriptors/ && hnk ask "Where is the Q3 budget summary?"
"#)]
    Init,

    /// Load finished descriptor records (JSONL) into the workspace catalog
    #[command(after_help = r#"EXAMPLES:
    # Load descriptors produced by the ingestion pipeline
    hnk load descriptors/

    # Tag the catalog with an explicit corpus version
    hnk load descriptors/ --corpus-version 2026-08-01

    # Machine-readable load report
    hnk load descriptors/ --json
"#)]
    Load {
        /// Directory containing projects.jsonl / documents.jsonl / sections.jsonl
        dir: PathBuf,

        /// Corpus version label recorded in the catalog metadata
        #[arg(long)]
        corpus_version: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Ask one question (or answer an outstanding clarification)
    #[command(after_help = r#"EXAMPLES:
    # Ask within a session
    hnk ask --session support-7 "Where are the termination rules?"

    # Answer the clarifying question the previous turn returned
    hnk ask --session support-7 "the contract"

    # Inline session commands
    hnk ask --session support-7 "/lock atlas"
    hnk ask --session support-7 "/unlock"
    hnk ask --session support-7 "/clear"

    # Machine-readable outcome
    hnk ask --session support-7 --json "Where are the termination rules?"
"#)]
    Ask {
        /// Session id carrying narrowing state across turns
        #[arg(short, long, default_value = "default")]
        session: String,

        /// The question, clarification answer, or /command
        message: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Inspect session state
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Show workspace status (catalog, sessions)
    #[command(after_help = r#"EXAMPLES:
    # Show current status
    hnk status

    # Get status as JSON for scripting
    hnk status --json | jq '.catalog.corpusVersion'
"#)]
    Status {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

/// Session inspection subcommands
#[derive(Subcommand, Debug)]
pub enum SessionAction {
    /// List known sessions
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show one session's narrowing state
    Show {
        /// Session id
        session: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

// ============================================================================
// Entry point
// ============================================================================

/// Run the CLI.
///
/// # Returns
///
/// Returns `ExitCode::SUCCESS` on success, or `ExitCode::FAILURE` on error.
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    // - Always show warnings (config issues, phraser fallbacks, etc.)
    // - Show debug info only when --verbose is set
    let log_level = if cli.verbose { "debug" } else { "warn" };
    let filter = format!(
        "hnk_core={},hnk_store={},hnk_embed={},hnk_cli={}",
        log_level, log_level, log_level, log_level
    );

    tracing_subscriber::fmt()
        .with_env_filter(&filter)
        .with_target(false)
        .init();

    let color_mode = ColorMode::from_flag(&cli.color).unwrap_or(ColorMode::Auto);
    let style = Style::new(color_mode);

    // Create engine with configuration
    // Priority: --config flag > HNK_CONFIG env > ~/.hnk/config.yaml
    let engine = match &cli.config {
        Some(config_path) => HnkEngine::with_config(config_path),
        None => HnkEngine::with_defaults(),
    };
    let engine = match engine {
        Ok(engine) => engine,
        Err(e) => {
            let hint = if let Some(path) = &cli.config {
                format!("Check your config at {}", path.display())
            } else {
                "Check your global config at ~/.hnk/config.yaml".to_string()
            };
            eprintln!(
                "{}",
                style.error_with_context(
                    "Failed to initialize HNK engine",
                    Some(&e.to_string()),
                    Some(&hint),
                )
            );
            return ExitCode::FAILURE;
        }
    };

    // Resolve workspace from current directory
    let workspace = match engine.resolve_workspace(Path::new(".")) {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!(
                "{}",
                style.message(MessageType::Err, &format!("Failed to resolve workspace: {}", e))
            );
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Init => handle_init(&style, &engine, workspace),
        Command::Load {
            dir,
            corpus_version,
            json,
        } => handle_load(&style, &engine, &workspace, &dir, corpus_version, json),
        Command::Ask {
            session,
            message,
            json,
        } => handle_ask(&style, &engine, &workspace, &session, &message, json),
        Command::Session { action } => match action {
            SessionAction::List { json } => handle_session_list(&style, &engine, &workspace, json),
            SessionAction::Show { session, json } => {
                handle_session_show(&style, &engine, &workspace, &session, json)
            }
        },
        Command::Status { json } => handle_status(&style, &engine, &workspace, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&style, &e);
            ExitCode::FAILURE
        }
    }
}

/// Print an error with an actionable hint where one exists.
fn report_error(style: &Style, error: &HnkError) {
    let hint = match error {
        HnkError::NotInitialized => Some("Run `hnk init` in the corpus directory."),
        HnkError::CorpusNotLoaded => Some("Run `hnk load <descriptor-dir>` first."),
        HnkError::ClarificationExhausted { .. } => {
            Some("Pick a candidate manually with `/lock <project-id>` or `/clear` to start over.")
        }
        HnkError::EmbeddingUnavailable { retryable: true, .. } => {
            Some("The embedding service did not respond; retry the same turn.")
        }
        _ => None,
    };
    eprintln!(
        "{}",
        style.error_with_context(&error.to_string(), None, hint)
    );
}

// ============================================================================
// Command handlers
// ============================================================================

fn handle_init(
    style: &Style,
    engine: &HnkEngine,
    mut workspace: Workspace,
) -> Result<(), HnkError> {
    let created = engine.init_workspace(&mut workspace)?;
    if created {
        println!(
            "{}",
            style.message(
                MessageType::Ok,
                &format!("Initialized HNK workspace at {}", workspace.root().display()),
            )
        );
        println!();
        println!("{}", style.message(MessageType::Hint, "Next steps:"));
        println!("  1. Load descriptors:  hnk load <descriptor-dir>");
        println!("  2. Ask a question:    hnk ask \"Where is the Q3 budget summary?\"");
    } else {
        println!(
            "{}",
            style.message(
                MessageType::Info,
                &format!(
                    "HNK workspace already initialized at {}",
                    workspace.root().display()
                ),
            )
        );
    }
    Ok(())
}

fn handle_load(
    style: &Style,
    engine: &HnkEngine,
    workspace: &Workspace,
    dir: &Path,
    corpus_version: Option<String>,
    json: bool,
) -> Result<(), HnkError> {
    let report = engine.load_corpus(workspace, dir, corpus_version)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{}",
        style.message(
            MessageType::Ok,
            &format!("Loaded descriptor corpus (version {})", report.corpus_version),
        )
    );
    println!(
        "{}",
        style.message_detail(
            "Records",
            &format!(
                "{} projects, {} documents, {} sections",
                report.projects, report.documents, report.sections
            ),
        )
    );
    if report.embedded > 0 {
        println!(
            "{}",
            style.message_detail("Embedded", &format!("{} records at load time", report.embedded))
        );
    }
    Ok(())
}

fn handle_ask(
    style: &Style,
    engine: &HnkEngine,
    workspace: &Workspace,
    session: &str,
    message: &str,
    json: bool,
) -> Result<(), HnkError> {
    let reply = engine.handle_turn(workspace, session, message)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reply)?);
        return Ok(());
    }

    match &reply.outcome {
        TurnOutcome::Question { question, options, .. } => {
            println!("{}", style.message(MessageType::Ask, question));
            let rows: Vec<OptionRow> = options
                .iter()
                .map(|o| OptionRow {
                    id: o.id.clone(),
                    value: o.value.clone(),
                })
                .collect();
            let table = render_options_table(&rows);
            if !table.is_empty() {
                println!();
                println!("{}", table);
            }
            println!();
            println!(
                "{}",
                style.message(
                    MessageType::Hint,
                    &format!("Answer with: hnk ask --session {} \"<answer>\"", session),
                )
            );
        }
        TurnOutcome::Final {
            project_id,
            document_id,
            section_id,
            title,
            page_start,
            page_end,
            excerpt,
        } => {
            println!(
                "{}",
                style.message(
                    MessageType::Ok,
                    &format!(
                        "Resolved to section {} ({})",
                        style.ident(section_id),
                        crate::ui::format::format_pages(*page_start, *page_end),
                    ),
                )
            );
            println!("{}", style.message_detail("Project", project_id));
            println!("{}", style.message_detail("Document", document_id));
            println!("{}", style.message_detail("Title", title));
            if !excerpt.is_empty() {
                println!(
                    "{}",
                    style.message_detail("Excerpt", &crate::ui::format::truncate_str(excerpt, 200))
                );
            }
        }
        TurnOutcome::Partial {
            project_ids,
            document_id,
            status,
        } => {
            println!(
                "{}",
                style.message(
                    MessageType::Warn,
                    &format!("Document {} found, but {}", style.ident(document_id), status),
                )
            );
            println!("{}", style.message_detail("Project", &project_ids.join(", ")));
        }
        TurnOutcome::NoMatch {
            layer,
            project_ids,
            document_id,
        } => {
            println!(
                "{}",
                style.message(
                    MessageType::Warn,
                    &format!("Nothing in the corpus matched at the {} layer", layer),
                )
            );
            if let Some(projects) = project_ids {
                println!("{}", style.message_detail("Project scope", &projects.join(", ")));
            }
            if let Some(document) = document_id {
                println!("{}", style.message_detail("Document scope", document));
            }
        }
        TurnOutcome::Notice { message } => {
            println!("{}", style.message(MessageType::Info, message));
        }
    }
    Ok(())
}

fn handle_session_list(
    style: &Style,
    engine: &HnkEngine,
    workspace: &Workspace,
    json: bool,
) -> Result<(), HnkError> {
    let status = engine.status(workspace)?;

    let mut states = Vec::new();
    for session_id in &status.sessions {
        if let Some(state) = engine.session_state(workspace, session_id)? {
            states.push(state);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&states)?);
        return Ok(());
    }

    if states.is_empty() {
        println!("{}", style.message(MessageType::Info, "No sessions yet."));
        return Ok(());
    }

    let rows: Vec<SessionRow> = states
        .iter()
        .map(|state| SessionRow {
            id: state.session_id.clone(),
            stage: format!("{:?}", state.stage),
            project_lock: state.project_lock.as_ref().map(|ids| ids.join(", ")),
            updated_at: state.updated_at,
        })
        .collect();
    println!("{}", render_sessions_table(&rows));
    Ok(())
}

fn handle_session_show(
    style: &Style,
    engine: &HnkEngine,
    workspace: &Workspace,
    session: &str,
    json: bool,
) -> Result<(), HnkError> {
    let Some(state) = engine.session_state(workspace, session)? else {
        println!(
            "{}",
            style.message(MessageType::Info, &format!("No session `{}`.", session))
        );
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    println!("{}", style.section("SESSION"));
    println!();
    println!("  {}", style.key_value("Id", &state.session_id));
    println!("  {}", style.key_value("Stage", &format!("{:?}", state.stage)));
    println!(
        "  {}",
        style.key_value(
            "Project lock",
            &state
                .project_lock
                .as_ref()
                .map(|ids| ids.join(", "))
                .unwrap_or_else(|| "(none)".to_string()),
        )
    );
    println!(
        "  {}",
        style.key_value(
            "Document lock",
            state.document_lock.as_deref().unwrap_or("(none)"),
        )
    );
    if let Some(pending) = &state.pending {
        println!(
            "  {}",
            style.key_value("Pending question", &pending.question)
        );
    }
    if let Some(query) = &state.original_query {
        println!("  {}", style.key_value("Query", query));
    }
    if !state.refinements.is_empty() {
        println!(
            "  {}",
            style.key_value("Refinements", &state.refinements.join(" | "))
        );
    }
    Ok(())
}

fn handle_status(
    style: &Style,
    engine: &HnkEngine,
    workspace: &Workspace,
    json: bool,
) -> Result<(), HnkError> {
    let status = engine.status(workspace)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", style.section("STATUS"));
    println!();
    println!(
        "  {}",
        style.key_value("Workspace", &status.workspace_root.display().to_string())
    );
    println!(
        "  {}",
        style.key_value("Initialized", if status.initialized { "yes" } else { "no" })
    );

    match &status.catalog {
        Some(meta) => {
            println!(
                "  {}",
                style.key_value(
                    "Catalog",
                    &format!(
                        "version {} ({} / dim {})",
                        meta.corpus_version, meta.embedding_model_id, meta.dimension
                    ),
                )
            );
            println!();
            println!(
                "{}",
                render_catalog_table(&[
                    ("projects", meta.project_count),
                    ("documents", meta.document_count),
                    ("sections", meta.section_count),
                ])
            );
        }
        None => {
            println!("  {}", style.key_value("Catalog", "(not loaded)"));
        }
    }

    println!();
    println!(
        "  {}",
        style.key_value("Sessions", &status.sessions.len().to_string())
    );
    Ok(())
}
