//! Bankfront CLI

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::logs;

#[derive(Parser)]
#[command(name = "bankfront", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web frontend
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: String,
        /// Serve from an in-memory demo bank instead of the backend services
        #[arg(long)]
        demo: bool,
        /// JSON settings file (environment variables override it)
        #[arg(long, value_name = "FILE")]
        settings: Option<PathBuf>,
    },

    /// Print fresh idempotency tokens
    Token {
        /// How many tokens to print
        #[arg(long, short = 'n', default_value = "1")]
        count: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the form validator on a set of field values
    Validate {
        /// Form to validate: login, signup, payment or deposit
        form: String,
        /// Field values as FIELD=VALUE
        #[arg(value_name = "FIELD=VALUE")]
        fields: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve { addr, demo, settings } => commands::serve::run(&addr, demo, settings.as_deref()),
        Commands::Token { count, json } => commands::token::run(count, json),
        Commands::Validate { form, fields, json } => commands::validate::run(&form, &fields, json),
        Commands::Logs { command } => logs::run(command),
    }
}
