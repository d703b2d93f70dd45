//! taskbridge CLI - Linear issue actions for AI agents.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use taskbridge_core::config::ENV_LINEAR_API_KEY;
use taskbridge_core::{CallEnvelope, Config, Registry};
use taskbridge_linear::{LinearContext, LinearSettings, ReqwestHttp};
use taskbridge_mcp::McpServer;
use taskbridge_storage::{
    mask_secret, resolve_token, token_key, CredentialStore, KeychainStore, TokenSource,
};
use tracing_subscriber::EnvFilter;

const PROVIDER: &str = "linear";

#[derive(Parser)]
#[command(name = "taskbridge")]
#[command(author, version, about = "taskbridge - Linear issue actions for AI agents", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server on stdin/stdout
    Serve,

    /// Print the available operations as JSON
    Tools,

    /// Dispatch a single operation and print the response envelope
    Call {
        /// Operation name (e.g. search_issues)
        name: String,

        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Manage the Linear API key
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set a value (e.g. `linear.api_url`, `linear.timeout_secs`)
    Set { key: String, value: String },

    /// Print a value
    Get { key: String },

    /// Show the effective configuration
    Show,

    /// Print the config file location
    Path,
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Store an API key in the OS keychain
    Login {
        /// Linear personal API key
        #[arg(long)]
        token: String,
    },

    /// Remove the stored API key
    Logout,

    /// Show where the API key would be taken from
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Serve) => {
            let registry = linear_registry(api_key()?)?;
            McpServer::new(Arc::new(registry)).run_stdio().await?;
        }
        Some(Commands::Tools) => {
            // Discovery never reaches the network, so no key is needed.
            let registry = linear_registry(String::new())?;
            println!("{}", serde_json::to_string_pretty(&registry.discovery())?);
        }
        Some(Commands::Call { name, args }) => {
            let args: serde_json::Value =
                serde_json::from_str(&args).context("--args must be valid JSON")?;
            let registry = linear_registry(api_key()?)?;

            let envelope = registry.dispatch(CallEnvelope::new(name, args)).await;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            if envelope.is_error() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Some(Commands::Config { command }) => run_config(command)?,
        Some(Commands::Auth { command }) => run_auth(command)?,
        None => {
            println!("taskbridge - Linear issue actions for AI agents");
            println!("Run with --help for usage information");
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Logs go to stderr; stdout carries protocol frames and command output.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config() -> anyhow::Result<Config> {
    let mut config = Config::load()?;
    config.apply_env()?;
    Ok(config)
}

fn api_key() -> anyhow::Result<String> {
    let store = KeychainStore::new();
    let (key, source) = resolve_token(
        PROVIDER,
        ENV_LINEAR_API_KEY,
        std::env::var(ENV_LINEAR_API_KEY).ok(),
        &store,
    )?;
    tracing::debug!(source = ?source, "Resolved Linear API key");
    Ok(key)
}

fn linear_registry(api_key: String) -> anyhow::Result<Registry> {
    let linear = load_config()?.linear_or_default();
    tracing::debug!(url = %linear.api_url, timeout_secs = linear.timeout_secs, "Linear settings");

    let http = Arc::new(ReqwestHttp::new(linear.timeout())?);
    let settings = LinearSettings::new(api_key).with_api_url(linear.api_url);
    let registry = taskbridge_linear::build_registry(Arc::new(LinearContext::new(http, settings)))?;
    Ok(registry)
}

fn run_config(command: ConfigCommands) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            println!("Set {} = {}", key, value);
        }
        ConfigCommands::Get { key } => match Config::load()?.get(&key)? {
            Some(value) => println!("{}", value),
            None => println!("(not set)"),
        },
        ConfigCommands::Show => {
            let linear = load_config()?.linear_or_default();
            println!("Config file: {}", Config::config_path()?.display());
            println!();
            println!("[linear]");
            println!("api_url = {}", linear.api_url);
            println!("timeout_secs = {}", linear.timeout_secs);
        }
        ConfigCommands::Path => println!("{}", Config::config_path()?.display()),
    }
    Ok(())
}

fn run_auth(command: AuthCommands) -> anyhow::Result<()> {
    let store = KeychainStore::new();
    let key = token_key(PROVIDER);

    match command {
        AuthCommands::Login { token } => {
            let token = token.trim();
            if token.is_empty() {
                anyhow::bail!("API key must not be empty");
            }
            store.store(&key, token)?;
            println!("Saved Linear API key {} to the OS keychain", mask_secret(token));
        }
        AuthCommands::Logout => {
            store.delete(&key)?;
            println!("Removed Linear API key from the OS keychain");
        }
        AuthCommands::Status => {
            match resolve_token(
                PROVIDER,
                ENV_LINEAR_API_KEY,
                std::env::var(ENV_LINEAR_API_KEY).ok(),
                &store,
            ) {
                Ok((token, TokenSource::Environment)) => {
                    println!("Using {} from environment: {}", ENV_LINEAR_API_KEY, mask_secret(&token))
                }
                Ok((token, TokenSource::Keychain)) => {
                    println!("Using API key from OS keychain: {}", mask_secret(&token))
                }
                Err(e) => println!("Not logged in. {}", e),
            }
        }
    }
    Ok(())
}
