//! Exposes the command line application.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use phasemeta::config::{Config, FileSourceConfig, HttpSourceConfig, SourceConfig};
use phasemeta::sources::ConfiguredSource;
use phasemeta::{LazyFetchCell, PhaseIndexBuilder, logging, metrics};

use crate::output;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Outputs a table.
    Table,
    /// Outputs a JSON array.
    Json,
}

/// Phasemeta commands.
#[derive(Clone, Copy, Debug, Subcommand)]
enum Command {
    /// Print the fetched metadata records in source order.
    Records,
    /// Print the distinct phases.
    ///
    /// Records sharing a phase id are collapsed into one phase, the last record wins.
    Phases,
}

/// Fetches and prints the phase metadata.
///
/// The metadata source is taken from `--file` or `--url`, or from the `source` section of the
/// configuration file.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about)]
struct Cli {
    /// Path to your configuration file.
    #[arg(long, short, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Read the metadata from a local JSON file instead of the configured source.
    #[arg(long, global = true, value_name = "PATH", conflicts_with = "url")]
    file: Option<PathBuf>,

    /// Fetch the metadata from this URL instead of the configured source.
    #[arg(long, global = true, value_name = "URL")]
    url: Option<String>,

    /// The output format.
    #[arg(long, short, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    /// Returns the path to the configuration file.
    fn config(&self) -> Option<&Path> {
        self.config.as_deref()
    }

    /// Returns the source given on the command line.
    fn source(&self) -> Option<SourceConfig> {
        if let Some(path) = &self.file {
            return Some(SourceConfig::File(FileSourceConfig { path: path.clone() }));
        }
        self.url
            .as_deref()
            .map(|url| SourceConfig::Http(HttpSourceConfig::new(url)))
    }
}

/// Runs the main application.
pub fn execute() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::get(cli.config()).context("failed loading config")?;
    if let Some(source) = cli.source() {
        config.source = Some(source);
    }

    logging::init_logging(&config.logging);
    if let Some(ref statsd) = config.metrics.statsd {
        metrics::configure_statsd(
            &config.metrics.prefix,
            statsd.as_str(),
            config.metrics.custom_tags.clone(),
        )
        .context("failed to configure metrics")?;
    }

    let source = config
        .source
        .as_ref()
        .context("no metadata source configured, pass `--file` or `--url`")?;
    let source = ConfiguredSource::from_config(source).context("invalid metadata source")?;
    let builder = PhaseIndexBuilder::new(LazyFetchCell::with_config(source, config.fetch));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the runtime")?;

    runtime.block_on(run(cli.command, cli.format, &builder))
}

async fn run(
    command: Command,
    format: OutputFormat,
    builder: &PhaseIndexBuilder<ConfiguredSource>,
) -> Result<()> {
    match command {
        Command::Records => {
            let records = builder
                .cell()
                .get_or_fetch()
                .await
                .context("failed to fetch phase metadata")?;
            output::print_records(&records, format)
        }
        Command::Phases => {
            let index = builder
                .build_default_index::<()>()
                .await
                .context("failed to fetch phase metadata")?;

            let mut phases: Vec<_> = index.into_keys().collect();
            phases.sort_by_key(|phase| phase.phase_id);
            tracing::debug!(phases = phases.len(), "Built phase index");

            output::print_phases(&phases, format)
        }
    }
}
