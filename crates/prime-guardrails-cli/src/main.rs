//! Command line front-end for the security agent
//!
//! Screens text from an argument or stdin:
//!   prime-guard input "User's message here"
//!   echo "$LLM_RESPONSE" | prime-guard output --reference-doc context.txt
//!
//! Exit status is 0 when the text is safe, 2 when it was blocked, 1 on error.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use prime_guardrails::config::API_KEY_ENV;
use prime_guardrails::{AgentConfig, BackendMode, GuardResult, SecurityAgent};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// Exit status for blocked content
const EXIT_BLOCKED: u8 = 2;

/// Screen LLM inputs and outputs with the guardrail security agent
#[derive(Parser, Debug)]
#[command(name = "prime-guard")]
#[command(version, about = "Screen LLM inputs and outputs for safety")]
struct Cli {
    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// API key for the guard service
    #[arg(long, env = API_KEY_ENV, hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Guard service base URL
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Run the checks in-process instead of calling the guard service
    #[arg(long, global = true)]
    local: bool,

    /// Print the full verdict as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Screen untrusted input before it reaches the model
    Input(TextArg),
    /// Screen model output before returning it
    Output {
        #[command(flatten)]
        text: TextArg,

        /// File holding a reference document (repeatable)
        #[arg(long = "reference-doc", value_name = "PATH")]
        reference_docs: Vec<PathBuf>,

        /// Inline reference text (repeatable)
        #[arg(long = "reference", value_name = "TEXT")]
        references: Vec<String>,
    },
}

#[derive(Args, Debug)]
struct TextArg {
    /// Text to screen; read from stdin when omitted
    text: Option<String>,
}

impl TextArg {
    fn resolve(self) -> Result<String> {
        match self.text {
            Some(text) => Ok(text),
            None => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read text from stdin")?;
                Ok(buf)
            }
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(cli: &Cli) -> Result<AgentConfig> {
    let config = match &cli.config {
        Some(path) => AgentConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AgentConfig::default(),
    };
    let mut config = config.apply_env();

    if let Some(key) = &cli.api_key {
        config.api_key = Some(key.clone());
    }
    if let Some(endpoint) = &cli.endpoint {
        config.remote.endpoint = endpoint.clone();
    }
    if cli.local {
        config.mode = BackendMode::Local;
    }
    Ok(config)
}

fn read_reference_docs(paths: &[PathBuf], inline: Vec<String>) -> Result<Vec<String>> {
    let mut docs = Vec::with_capacity(paths.len() + inline.len());
    for path in paths {
        let doc = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read reference doc {}", path.display()))?;
        docs.push(doc);
    }
    docs.extend(inline);
    Ok(docs)
}

/// Print the verdict; returns whether the text was safe
fn report(result: &GuardResult, original: &str, json: bool) -> Result<bool> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else if result.is_safe {
        println!("{}", result.content_or(original));
    } else {
        eprintln!(
            "Blocked: {} ({})",
            result.reason.as_deref().unwrap_or("no reason given"),
            result
                .category
                .map(|c| c.to_string())
                .unwrap_or_else(|| "uncategorized".to_string())
        );
    }

    Ok(result.is_safe)
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = build_config(&cli)?;
    let agent = SecurityAgent::from_config(config).context("Failed to create security agent")?;
    debug!(backend = agent.backend_name(), "Agent ready");

    let safe = match cli.command {
        Command::Input(text) => {
            let text = text.resolve()?;
            let result = agent.guard_input(&text).await?;
            report(&result, &text, cli.json)
        }
        Command::Output {
            text,
            reference_docs,
            references,
        } => {
            let text = text.resolve()?;
            let docs = read_reference_docs(&reference_docs, references)?;
            let result = agent.guard_output(&text, &docs).await?;
            report(&result, &text, cli.json)
        }
    }?;

    Ok(if safe {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_BLOCKED)
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
