//! # vizcraft CLI
//!
//! Asks a model to make a Manim video inside a Docker sandbox and prints
//! the conversation as it happens.
//!
//! Usage:
//!   vizcraft [PROMPT]
//!
//! Examples:
//!   vizcraft
//!   vizcraft "Animate the derivative of x^2 as the slope of a tangent line"
//!
//! Both `OPENAI_API_KEY` and `ANTHROPIC_API_KEY` must be set (a `.env` file
//! in the working directory is read). Logs go to stderr, filtered by
//! `RUST_LOG`.

mod config;
mod session;

use clap::Parser;
use config::Settings;
use session::{run_session, supervise};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vizcraft_agent::{Agent, DEFAULT_PROMPT};
use vizcraft_error::Result;
use vizcraft_llm::{LlmProvider, Provider, ProviderType};
use vizcraft_sandbox::{DockerSandbox, SandboxTools};

#[derive(Parser)]
#[command(name = "vizcraft")]
#[command(author, version, about = "Generate explainer videos with Manim and a tool-calling model")]
struct Cli {
    /// Description of the video to make
    prompt: Option<String>,
}

impl Cli {
    fn prompt(&self) -> &str {
        match self.prompt.as_deref() {
            Some(prompt) if !prompt.is_empty() => prompt,
            _ => DEFAULT_PROMPT,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// A missing `.env` is fine; a broken one is only worth a warning.
fn log_dotenv(result: std::result::Result<std::path::PathBuf, dotenvy::Error>) {
    match result {
        Ok(path) => info!("loaded environment from {}", path.display()),
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("failed to load .env file: {}", e),
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Credentials first: nothing else happens without them.
    let settings = Settings::from_env()?;
    let output_dir = settings.prepare_output_dir()?;

    let provider_config = settings.provider_config();
    let provider_name = match provider_config.provider_type {
        ProviderType::OpenAI => "openai",
        ProviderType::Anthropic => "anthropic",
    };
    let provider = Provider::from_config(provider_config).map_err(|e| e.into_error(provider_name))?;
    info!(provider = provider.name(), output = %output_dir.display(), "starting session");

    let sandbox = DockerSandbox::start(settings.sandbox_config(&output_dir)).await?;

    let agent = Agent::with_config(provider, settings.agent_config());
    let tools = SandboxTools::new(&sandbox, &output_dir);
    let outcome = supervise(run_session(&agent, &tools, cli.prompt(), std::io::stdout())).await;

    let teardown = sandbox.shutdown().await;
    if let Err(e) = &teardown {
        warn!("sandbox teardown failed: {}", e);
    }

    outcome.and(teardown)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let dotenv = dotenvy::dotenv();
    init_tracing();
    log_dotenv(dotenv);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
