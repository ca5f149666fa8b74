pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::query::QueryArgs;

#[derive(Debug, Parser)]
#[command(
    name = "productmaster",
    about = "ProductMaster operator CLI",
    long_about = "Operate the ProductMaster catalog: migrations, demo data, config inspection, \
                  readiness checks and one-off pipeline queries.",
    after_help = "Examples:\n  productmaster doctor --json\n  productmaster seed\n  \
                  productmaster query \"low risk bond products\" --limit 5"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo catalog (idempotent upsert)")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, model client, DB connectivity and prompt coverage")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run one request through the query pipeline and print the envelope")]
    Query {
        #[arg(help = "Natural-language request, passed through unchanged")]
        text: String,
        #[arg(long, default_value = "search_products", help = "Tool (operation) to run")]
        tool: String,
        #[arg(long, help = "Maximum number of products to return")]
        limit: Option<u32>,
        #[arg(long, help = "Correlation identifier echoed in the trace")]
        request_id: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Query { text, tool, limit, request_id } => {
            commands::query::run(&QueryArgs { tool, text, limit, request_id })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
