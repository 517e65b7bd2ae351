use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use legal_case_analysis::config::{Config, LogFormat};
use legal_case_analysis::error::AppError;
use legal_case_analysis::service::AnalysisClient;
use legal_case_analysis::stages::{FINAL_STAGE_INDEX, STAGES};
use legal_case_analysis::store::{CaseStore, SqliteStore};
use legal_case_analysis::transfer;
use legal_case_analysis::workflow::{RunStageParams, StageOrchestrator};

#[derive(Parser)]
#[command(name = "legal-case-analysis", version, about = "Staged legal-text analysis with locally persisted cases")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage the stored API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
    /// List the stage catalog
    Stages,
    /// Run one analysis stage (creates the case on first use)
    Analyze {
        /// Stage index (0-based)
        #[arg(long)]
        stage: i32,
        /// Case to append to; omit to create a new case
        #[arg(long)]
        case: Option<String>,
        /// Name for a newly created case
        #[arg(long)]
        name: Option<String>,
        /// Read the case text from a file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
        /// One-off API key override
        #[arg(long)]
        api_key: Option<String>,
        /// Case text; falls back to --file, then stdin
        text: Option<String>,
    },
    /// Synthesize the final petition for a case
    Finalize {
        case: String,
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Ask a free-form question about a case
    Ask {
        case: String,
        question: String,
        #[arg(long)]
        api_key: Option<String>,
    },
    /// List all cases
    Cases,
    /// Show one case with its stages and chat log
    Show { case: String },
    /// Rename a case
    Rename { case: String, name: String },
    /// Delete a case
    Delete { case: String },
    /// Delete one stage record from a case
    DeleteStage { case: String, stage_id: String },
    /// Export the case collection to a JSON file
    Export { path: PathBuf },
    /// Import a JSON file, skipping cases whose id already exists
    Import { path: PathBuf },
    /// Delete the entire case collection (the API key is kept)
    Erase {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum KeyAction {
    /// Store the API key
    Set { value: String },
    /// Show whether a key is stored
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(cli, config).await {
        eprintln!("{}", user_message(&e));
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli, config: Config) -> Result<(), AppError> {
    let store = Arc::new(SqliteStore::new(&config.database).await?);
    info!(path = %config.database.path.display(), "Case store opened");

    match cli.command {
        Command::Key { action } => match action {
            KeyAction::Set { value } => {
                store.save_api_key(&value).await?;
                println!("API key saved");
            }
            KeyAction::Show => {
                let key = store.load_api_key().await?;
                if key.is_empty() {
                    println!("No API key stored");
                } else {
                    println!("API key stored ({} characters)", key.chars().count());
                }
            }
        },
        Command::Stages => {
            for stage in STAGES {
                println!("[{:>2}] {}", stage.index, stage.label);
                println!("     {}", stage.description);
            }
        }
        Command::Analyze {
            stage,
            case,
            name,
            file,
            api_key,
            text,
        } => {
            let input = read_input(text, file)?;
            let orchestrator = build_orchestrator(&config, store.clone())?;
            let outcome = orchestrator
                .run_stage(RunStageParams {
                    case_id: case,
                    stage_index: stage,
                    input,
                    case_name: name,
                    api_key,
                })
                .await?;
            println!("case: {}", outcome.case_id);
            println!("{}", outcome.stage.stage_label);
            println!();
            println!("{}", outcome.stage.output);
        }
        Command::Finalize { case, api_key } => {
            let orchestrator = build_orchestrator(&config, store.clone())?;
            let outcome = orchestrator.run_final(&case, api_key.as_deref()).await?;
            println!("{}", outcome.stage.output);
        }
        Command::Ask {
            case,
            question,
            api_key,
        } => {
            let orchestrator = build_orchestrator(&config, store.clone())?;
            let chat = orchestrator
                .ask(&case, &question, api_key.as_deref())
                .await?;
            println!("{}", chat.answer);
        }
        Command::Cases => {
            let cases = store.get_all_cases().await?;
            if cases.is_empty() {
                println!("No cases stored yet");
            }
            for case in cases {
                println!(
                    "{}  {}  ({} stages)  {}",
                    case.id,
                    case.name,
                    case.stages.len(),
                    case.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Command::Show { case } => {
            let Some(case) = store.get_case(&case).await? else {
                eprintln!("Case not found: {}", case);
                std::process::exit(1);
            };
            println!("{}  ({})", case.name, case.created_at.format("%Y-%m-%d %H:%M"));
            for stage in &case.stages {
                let tag = if stage.stage_index == FINAL_STAGE_INDEX {
                    "final".to_string()
                } else {
                    format!("{:>2}", stage.stage_index)
                };
                println!();
                println!("[{}] {} ({})", tag, stage.stage_label, stage.id);
                println!("{}", stage.output);
            }
            for chat in &case.chats {
                println!();
                println!("Q: {}", chat.question);
                println!("A: {}", chat.answer);
            }
        }
        Command::Rename { case, name } => {
            let Some(mut found) = store.get_case(&case).await? else {
                eprintln!("Case not found: {}", case);
                std::process::exit(1);
            };
            found.name = name;
            store.update_case(&found).await?;
            println!("Renamed");
        }
        Command::Delete { case } => {
            store.delete_case(&case).await?;
            println!("Deleted");
        }
        Command::DeleteStage { case, stage_id } => {
            store.delete_stage_from_case(&case, &stage_id).await?;
            println!("Deleted");
        }
        Command::Export { path } => {
            transfer::export_to_path(store.as_ref(), &path).await?;
            println!("Exported to {}", path.display());
        }
        Command::Import { path } => {
            let summary = transfer::import_from_path(store.as_ref(), &path).await?;
            println!(
                "Imported {} case(s), skipped {} existing",
                summary.imported, summary.skipped
            );
        }
        Command::Erase { yes } => {
            if !yes {
                eprintln!("Refusing to erase without --yes");
                std::process::exit(1);
            }
            store.clear_all_cases().await?;
            println!("All cases erased");
        }
    }
    Ok(())
}

fn build_orchestrator(config: &Config, store: Arc<SqliteStore>) -> Result<StageOrchestrator, AppError> {
    let client = AnalysisClient::new(&config.service, &config.request)?;
    Ok(StageOrchestrator::new(store, client))
}

/// Resolve the case text: positional argument, then --file, then stdin.
fn read_input(text: Option<String>, file: Option<PathBuf>) -> Result<String, AppError> {
    if let Some(text) = text {
        return Ok(text);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(&path).map_err(|e| AppError::Internal {
            message: format!("Could not read {}: {}", path.display(), e),
        });
    }
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| AppError::Internal {
            message: format!("Could not read stdin: {}", e),
        })?;
    Ok(buffer)
}

/// One inline line per failure; service errors carry their specific guidance.
fn user_message(err: &AppError) -> String {
    match err {
        AppError::Service(e) => e.user_message(),
        other => other.to_string(),
    }
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
