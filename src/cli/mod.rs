pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "srag")]
#[command(about = "SRAG CLI - load DataSUS CSV exports and inspect the case table")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Ingest every CSV file of the directory, even if the table has data")]
    Ingest {
        #[arg(long, help = "CSV directory (defaults to INGESTION_CSV_DIR)")]
        dir: Option<PathBuf>,
        #[arg(long, help = "Parse and batch into memory without touching the database")]
        dry_run: bool,
    },

    #[command(about = "Ingest only when the table is empty")]
    Init {
        #[arg(long, help = "CSV directory (defaults to INGESTION_CSV_DIR)")]
        dir: Option<PathBuf>,
    },

    #[command(about = "Print the number of stored records")]
    Count,

    #[command(about = "Mint a bearer token for the protected API")]
    Token {
        #[arg(help = "Token subject")]
        subject: String,
        #[arg(long, help = "Lifetime in hours (defaults to SECURITY_JWT_EXPIRY_HOURS)")]
        hours: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Ingest { dir, dry_run } => commands::ingest::ingest(dir, dry_run, output_format).await,
        Commands::Init { dir } => commands::ingest::init(dir, output_format).await,
        Commands::Count => commands::count::handle(output_format).await,
        Commands::Token { subject, hours } => commands::token::handle(subject, hours, output_format),
    }
}
