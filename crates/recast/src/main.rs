//! Recast CLI - convert a directory tree of images to a single format.
//!
//! Every supported image under the source directory (camera raw DNG, HEIC,
//! JPEG, PNG, BMP, TIFF, WebP) is decoded and written to the destination
//! directory with the target extension. Existing files are never replaced;
//! name clashes get a numeric suffix.
//!
//! # Usage
//!
//! ```bash
//! # Convert everything under ./camera to JPEG
//! recast jpg ./camera ./converted
//!
//! # Same, with a per-file report
//! recast .png ~/Pictures/raw ~/Pictures/png --report report.jsonl --report-format jsonl
//!
//! # View configuration
//! recast config show
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// Recast - batch image format conversion, camera raw included.
#[derive(Parser, Debug)]
#[command(name = "recast")]
#[command(author, version, about, long_about = None)]
#[command(subcommand_negates_reqs = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "RECAST_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    convert: cli::convert::ConvertArgs,
}

/// Commands other than the default conversion.
#[derive(Subcommand, Debug)]
enum Commands {
    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings use eprintln.
    let config = match &cli.config {
        Some(path) => recast_core::Config::load_from(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => match recast_core::Config::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load config: {e}\n  \
                     Using default configuration. Check your config file with `recast config path`."
                );
                recast_core::Config::default()
            }
        },
    };
    logging::init_from_config(&config.logging, cli.verbose, cli.json_logs);

    tracing::debug!("Recast v{}", recast_core::VERSION);
    let codecs = recast_core::codecs::register();
    tracing::debug!("HEIC support: {}", codecs.heif);

    match cli.command {
        Some(Commands::Config(args)) => cli::config::execute(args, &config, cli.config.as_deref()),
        None => cli::convert::execute(cli.convert, config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_positional_conversion() {
        let cli = Cli::try_parse_from(["recast", ".JPG", "in", "out", "--jpeg-quality", "80"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.convert.extension.as_deref(), Some(".JPG"));
        assert_eq!(cli.convert.from_dir, Some(PathBuf::from("in")));
        assert_eq!(cli.convert.to_dir, Some(PathBuf::from("out")));
        assert_eq!(cli.convert.jpeg_quality, Some(80));
    }

    #[test]
    fn test_missing_positionals_are_rejected() {
        assert!(Cli::try_parse_from(["recast", "jpg", "in"]).is_err());
        assert!(Cli::try_parse_from(["recast", "jpg", "in", "out", "--jpeg-quality", "0"]).is_err());
    }

    #[test]
    fn test_config_subcommand() {
        let cli = Cli::try_parse_from(["recast", "config", "path"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Config(_))));
    }
}
