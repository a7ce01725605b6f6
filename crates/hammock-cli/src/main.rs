//! hammock CLI: validate questions, grade answers, and simulate attempts.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "hammock", version, about = "Question validation and attempt runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate question JSON files
    Validate {
        /// Path to a question file or a directory of them
        #[arg(long)]
        question: PathBuf,
    },

    /// Grade a set of answers against a question
    Grade {
        /// Path to the question JSON
        #[arg(long)]
        question: PathBuf,

        /// Comma-separated answers, one per part (e.g. "a,-,b{value=3}")
        #[arg(long)]
        responses: String,
    },

    /// Drive attempts against an in-memory host
    Simulate {
        /// Path to the question JSON (defaults to the configured asset)
        #[arg(long)]
        question: Option<PathBuf>,

        /// Semicolon-separated steps: "submit a,b; reset; reopen; submit c"
        #[arg(long)]
        script: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and example question
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hammock=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { question } => commands::validate::execute(question),
        Commands::Grade {
            question,
            responses,
        } => commands::grade::execute(question, responses),
        Commands::Simulate {
            question,
            script,
            config,
        } => commands::simulate::execute(question, script, config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
