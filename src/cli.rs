use crate::config::{ConfigError, GatewayConfig};
use crate::configurer::ConfigurerRegistry;
use crate::destination::Destination;
use crate::processor::ProcessorDeclaration;
use crate::sizing::{CollectorGatewaySettings, GatewaySizing};
use crate::synthesis::{ConfigSynthesizer, SynthesisError};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("could not read gateway config: {0}")]
    Config(#[from] ConfigError),
    #[error("could not read `{0}`: {1}")]
    ReadInput(PathBuf, std::io::Error),
    #[error("invalid render input `{0}`: {1}")]
    ParseInput(PathBuf, serde_yaml::Error),
    #[error("{0}")]
    Synthesis(#[from] SynthesisError),
    #[error("serializing output: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)] // Read from `Cargo.toml`
pub struct Cli {
    /// Gateway configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Prints the effective configuration and exits
    #[arg(long, default_value_t = false)]
    print_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Command {
    /// Runs the gateway controller (default)
    Run,
    /// Prints the collector configuration synthesized from a file of destinations and processors
    Render {
        #[arg(short, long)]
        input: PathBuf,
    },
}

/// What the binary is asked to do.
#[derive(Debug)]
pub enum CliCommand {
    /// Normal operation, run the controller with the given configuration.
    Run(GatewayConfig),
    /// Operation performed once, the process exits afterwards.
    OneShot(OneShotCommand),
}

#[derive(Debug)]
pub enum OneShotCommand {
    PrintConfig(GatewayConfig),
    Render(PathBuf),
}

impl Cli {
    /// Parses command line arguments and loads the configuration when needed.
    pub fn init() -> Result<CliCommand, CliError> {
        Self::parse().command()
    }

    fn command(self) -> Result<CliCommand, CliError> {
        if self.print_config {
            let config = GatewayConfig::load(self.config.as_deref())?;
            return Ok(CliCommand::OneShot(OneShotCommand::PrintConfig(config)));
        }

        match self.command.unwrap_or(Command::Run) {
            Command::Render { input } => Ok(CliCommand::OneShot(OneShotCommand::Render(input))),
            Command::Run => Ok(CliCommand::Run(GatewayConfig::load(
                self.config.as_deref(),
            )?)),
        }
    }
}

impl OneShotCommand {
    /// Performs the operation and returns what has to be printed.
    pub fn run_one_shot(&self) -> Result<String, CliError> {
        match self {
            OneShotCommand::PrintConfig(config) => Ok(serde_yaml::to_string(config)?),
            OneShotCommand::Render(input) => render(input),
        }
    }
}

/// Offline synthesis input, the same data the controller reads from the cluster.
#[derive(Debug, Default, Deserialize)]
struct RenderInput {
    #[serde(default)]
    destinations: Vec<Destination>,
    #[serde(default)]
    processors: Vec<ProcessorDeclaration>,
    #[serde(default)]
    settings: CollectorGatewaySettings,
}

fn render(input: &Path) -> Result<String, CliError> {
    let content = std::fs::read_to_string(input)
        .map_err(|err| CliError::ReadInput(input.to_path_buf(), err))?;
    let input_data: RenderInput = serde_yaml::from_str(&content)
        .map_err(|err| CliError::ParseInput(input.to_path_buf(), err))?;

    let sizing = GatewaySizing::from_settings(&input_data.settings);
    let config = ConfigSynthesizer::new(Arc::new(ConfigurerRegistry::default()))
        .with_memory_limiter(sizing.memory_limiter())
        .synthesize(&input_data.destinations, &input_data.processors)?;

    Ok(config.to_yaml()?)
}
