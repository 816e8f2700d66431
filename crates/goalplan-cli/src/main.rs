mod config;
mod probe_cmd;
mod serve_cmd;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use goalplan_core::generator::OllamaGenerator;

use config::{CliOverrides, GoalplanConfig};

#[derive(Parser)]
#[command(
    name = "goalplan",
    about = "Turn a free-text goal into a structured project plan using a local LLM"
)]
struct Cli {
    /// Path to the ollama executable (overrides GOALPLAN_OLLAMA_BIN env var)
    #[arg(long, global = true)]
    ollama_bin: Option<PathBuf>,

    /// Model identifier passed to `ollama run` (overrides GOALPLAN_MODEL env var)
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a goalplan config file with default settings
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Start the HTTP plan service
    Serve {
        /// Address to bind (overrides GOALPLAN_BIND env var)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides GOALPLAN_PORT env var)
        #[arg(long)]
        port: Option<u16>,
        /// Do not warm the model before accepting requests
        #[arg(long)]
        skip_warmup: bool,
    },
    /// Run the model once and print its raw output
    Probe {
        /// Prompt to send (defaults to a one-sentence reply request)
        #[arg(long)]
        prompt: Option<String>,
        /// Timeout in seconds
        #[arg(long, default_value_t = 600)]
        timeout: u64,
    },
}

/// Execute the `goalplan init` command: write config file.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile::default();
    config::save_config(&cfg, &path)?;

    println!("Config written to {}", path.display());
    println!("  server = {}:{}", cfg.server.bind, cfg.server.port);
    println!("  model.name = {}", cfg.model.name);
    println!();
    println!("Next: run `goalplan probe` to check the model, then `goalplan serve`.");

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut overrides = CliOverrides {
        binary: cli.ollama_bin,
        model: cli.model,
        ..CliOverrides::default()
    };

    match cli.command {
        Commands::Init { force } => cmd_init(force)?,
        Commands::Serve {
            bind,
            port,
            skip_warmup,
        } => {
            overrides.bind = bind;
            overrides.port = port;
            let resolved = GoalplanConfig::resolve(&overrides)?;
            serve_cmd::run_serve(&resolved, skip_warmup).await?;
        }
        Commands::Probe { prompt, timeout } => {
            let resolved = GoalplanConfig::resolve(&overrides)?;
            let generator = OllamaGenerator::new(&resolved.binary, &resolved.model);
            let prompt = prompt.as_deref().unwrap_or(probe_cmd::DEFAULT_PROBE_PROMPT);
            probe_cmd::run_probe(&generator, prompt, Duration::from_secs(timeout.max(1))).await?;
        }
    }

    Ok(())
}
