//! # Notebook RAG CLI (`nrag`)
//!
//! ## Usage
//!
//! ```bash
//! nrag --config ./config/nrag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `nrag init` | Create the SQLite database and schema |
//! | `nrag session create --user U` | Start a study session |
//! | `nrag document add FILE --user U --session S` | Chunk, embed, and store extracted text |
//! | `nrag session attach S D` | Add an existing document to a session |
//! | `nrag ask S "question"` | Retrieve context and print the assembled bundle |
//! | `nrag history append S --sender user --message M` | Record a conversation turn |
//! | `nrag history show S` | Print the transcript |
//!
//! Logs go to stderr. `RUST_LOG` sets the filter (default `warn`);
//! `--verbose` forces `debug`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use notebook_rag::{ask, config, history, ingest, migrate, session};
use notebook_rag_core::models::Sender;

/// Notebook RAG: session-scoped retrieval for study notebooks.
#[derive(Parser)]
#[command(
    name = "nrag",
    about = "Notebook RAG: session-scoped retrieval for study notebooks",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/nrag.toml")]
    config: PathBuf,

    /// Log at debug level regardless of RUST_LOG.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Manage study sessions.
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Add documents.
    Document {
        #[command(subcommand)]
        action: DocumentAction,
    },

    /// Retrieve context for a question in a session.
    ///
    /// Prints the context bundle a generator would receive. Pass `-` as
    /// the question to read questions line by line from stdin.
    Ask {
        /// Session ID.
        session: String,

        /// The question, or `-` for stdin.
        question: String,

        /// Number of chunks to retrieve (overrides `retrieval.top_k`).
        #[arg(long)]
        k: Option<usize>,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Record and view conversation turns.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Create a new session.
    Create {
        #[arg(long)]
        user: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Attach an existing document to a session.
    Attach { session: String, document: String },
    /// Show a session's documents and counts.
    Show { session: String },
    /// List a user's sessions.
    List {
        #[arg(long)]
        user: String,
    },
}

#[derive(Subcommand)]
enum DocumentAction {
    /// Chunk, embed, and store a plain-text file.
    Add {
        /// UTF-8 file holding the document's extracted text.
        file: PathBuf,
        #[arg(long)]
        user: String,
        /// Defaults to the file name without extension.
        #[arg(long)]
        title: Option<String>,
        /// Attach the new document to this session.
        #[arg(long)]
        session: Option<String>,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Append a turn.
    Append {
        session: String,
        /// `user` or `bot` (aliases: human, student, assistant, tutor, ...).
        #[arg(long)]
        sender: Sender,
        #[arg(long)]
        message: String,
        /// Unix seconds. Defaults to now.
        #[arg(long)]
        timestamp: Option<i64>,
    },
    /// Print the transcript, oldest first.
    Show {
        session: String,
        /// Only the most recent N turns.
        #[arg(long)]
        last: Option<usize>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Session { action } => match action {
            SessionAction::Create { user, name } => {
                session::run_create(&cfg, &user, name).await?;
            }
            SessionAction::Attach { session, document } => {
                session::run_attach(&cfg, &session, &document).await?;
            }
            SessionAction::Show { session } => {
                session::run_show(&cfg, &session).await?;
            }
            SessionAction::List { user } => {
                session::run_list(&cfg, &user).await?;
            }
        },
        Commands::Document { action } => match action {
            DocumentAction::Add {
                file,
                user,
                title,
                session,
            } => {
                ingest::run_add(&cfg, &file, &user, title, session.as_deref()).await?;
            }
        },
        Commands::Ask {
            session,
            question,
            k,
            json,
        } => {
            ask::run_ask(&cfg, &session, &question, k, json).await?;
        }
        Commands::History { action } => match action {
            HistoryAction::Append {
                session,
                sender,
                message,
                timestamp,
            } => {
                history::run_append(&cfg, &session, sender, &message, timestamp).await?;
            }
            HistoryAction::Show { session, last } => {
                history::run_show(&cfg, &session, last).await?;
            }
        },
    }

    Ok(())
}
