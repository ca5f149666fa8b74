//! ProductMaster MCP Server Binary
//!
//! Speaks newline-delimited JSON-RPC on stdin/stdout. Logs go to stderr.
//!
//! ## Usage
//!
//! ```bash
//! # Run with productmaster.toml / PRODUCTMASTER_* settings
//! productmaster-mcp
//!
//! # Run against a specific database and config file
//! PRODUCTMASTER_DATABASE_URL=sqlite://catalog.db productmaster-mcp --config ./productmaster.toml
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use productmaster_core::config::{AppConfig, LoadOptions, LogFormat};
use tracing::{info, Level};

fn init_logging(config: &AppConfig) {
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(log_level);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "productmaster-mcp",
    about = "ProductMaster MCP server over newline-delimited JSON-RPC on stdio"
)]
struct Args {
    #[arg(long, value_name = "PATH", help = "Config file to load; it must exist when given")]
    config: Option<PathBuf>,
}

fn load_options(args: Args) -> LoadOptions {
    LoadOptions { require_file: args.config.is_some(), config_path: args.config, ..Default::default() }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load(load_options(Args::parse()))?;
    init_logging(&config);

    info!(event_name = "mcp.starting", "Starting ProductMaster MCP Server");
    let app = productmaster_mcp::bootstrap::bootstrap_with_config(config).await?;
    app.mcp.run_stdio().await?;
    app.db_pool.close().await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use super::{load_options, Args};

    #[test]
    fn config_flag_requires_the_named_file() {
        let args = Args::try_parse_from(["productmaster-mcp", "--config", "./productmaster.toml"])
            .expect("parse args");
        let options = load_options(args);

        assert_eq!(options.config_path, Some(PathBuf::from("./productmaster.toml")));
        assert!(options.require_file);
    }

    #[test]
    fn running_without_flags_uses_default_discovery() {
        let options = load_options(Args::try_parse_from(["productmaster-mcp"]).expect("parse args"));

        assert_eq!(options.config_path, None);
        assert!(!options.require_file);
    }

    #[test]
    fn unknown_flags_and_missing_values_are_rejected() {
        assert!(Args::try_parse_from(["productmaster-mcp", "--verbose"]).is_err());
        assert!(Args::try_parse_from(["productmaster-mcp", "--config"]).is_err());
    }
}
