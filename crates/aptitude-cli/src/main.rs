//! aptitude CLI: the administrator's command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "aptitude",
    version,
    about = "Skills test question allocation and scoring"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create starter config and sample catalog
    Init,

    /// Validate a catalog TOML file
    Validate {
        /// Path to catalog file
        #[arg(long)]
        catalog: PathBuf,
    },

    /// Import a catalog into the data directory
    Import {
        /// Path to catalog file
        #[arg(long)]
        catalog: PathBuf,
    },

    /// Show or replace the quota table
    Quota {
        /// Bucket quotas as category:type=count (replaces the whole table)
        #[arg(long = "set")]
        set: Vec<String>,
    },

    /// Assign questions to a candidate (only the first call draws)
    Assign {
        /// Candidate id
        #[arg(long)]
        candidate: String,
    },

    /// Grade and submit a candidate's answers
    Submit {
        /// Candidate id
        #[arg(long)]
        candidate: String,

        /// JSON file mapping question id to answer
        #[arg(long)]
        answers: PathBuf,
    },

    /// Print a candidate's rank
    Rank {
        /// Candidate id
        #[arg(long)]
        candidate: String,
    },

    /// Show the ranked leaderboard
    Leaderboard {
        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show how each of a candidate's answers was graded
    Review {
        /// Candidate id
        #[arg(long)]
        candidate: String,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Delete a department and detach it from every question
    DeleteDepartment {
        /// Department id
        #[arg(long)]
        id: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aptitude=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { catalog } => commands::validate::execute(catalog),
        Commands::Import { catalog } => commands::import::execute(config, catalog).await,
        Commands::Quota { set } => commands::quota::execute(config, set).await,
        Commands::Assign { candidate } => commands::assign::execute(config, candidate).await,
        Commands::Submit { candidate, answers } => {
            commands::submit::execute(config, candidate, answers).await
        }
        Commands::Rank { candidate } => commands::rank::execute(config, candidate).await,
        Commands::Leaderboard { format } => commands::leaderboard::execute(config, format).await,
        Commands::Review { candidate, format } => {
            commands::review::execute(config, candidate, format).await
        }
        Commands::DeleteDepartment { id } => {
            commands::delete_department::execute(config, id).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
