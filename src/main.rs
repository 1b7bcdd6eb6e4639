//! Vertex Failover CLI
//!
//! Runs one prompt through the region failover client and prints the answer

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use tracing::{info, warn};
use vertex_failover::config::{ClientFile, Settings};
use vertex_failover::{Attachment, GenerationOptions, GenerationOutput, GenerationRequest, RegionFailoverClient};

/// Send a prompt to Vertex AI Gemini with region failover
#[derive(Debug, Parser)]
#[command(name = "vertex-failover", version, about)]
struct Cli {
    /// Prompt text; read from stdin when neither this nor --prompt-file is given
    prompt: Option<String>,

    /// Read the prompt from a file
    #[arg(long, conflicts_with = "prompt")]
    prompt_file: Option<PathBuf>,

    /// Attach an image sent ahead of the prompt
    #[arg(long)]
    image: Option<PathBuf>,

    /// MIME type of the attached image
    #[arg(long, default_value = "image/jpeg")]
    image_mime: String,

    /// Ask the model for JSON output
    #[arg(long)]
    json: bool,

    /// Print the full structured result as JSON
    #[arg(long)]
    full: bool,

    /// Project id (overrides GCP_PROJECT)
    #[arg(long)]
    project: Option<String>,

    /// Client configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    temperature: Option<f32>,

    #[arg(long)]
    max_output_tokens: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::new().context("Failed to load settings")?;
    init_logging(&settings);

    if cli.project.is_some() {
        settings.vertex.project_id = cli.project.clone();
    }

    let file = match &cli.config {
        Some(path) => Some(ClientFile::load(path)?),
        None => ClientFile::load_default().context("Failed to load client configuration")?,
    };
    if file.is_some() {
        info!("📁 Client configuration loaded");
    }

    let client = RegionFailoverClient::from_settings(&settings, file.as_ref())?;
    let request = build_request(&cli)?;

    match client.generate(&request).await? {
        GenerationOutput::Text(text) => println!("{}", text),
        GenerationOutput::Full(result) => {
            if result.is_truncated() {
                warn!("Answer may be incomplete: {}", result.finish_reason);
            }
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

fn build_request(cli: &Cli) -> Result<GenerationRequest> {
    let prompt = match (&cli.prompt, &cli.prompt_file) {
        (Some(prompt), _) => prompt.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt file: {:?}", path))?,
        (None, None) => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read prompt from stdin")?;
            buf
        }
    };

    let mut request = match &cli.image {
        Some(path) => {
            let data = std::fs::read(path).with_context(|| format!("Failed to read image: {:?}", path))?;
            GenerationRequest::with_attachment(Attachment::new(cli.image_mime.clone(), data), prompt)
        }
        None => GenerationRequest::text(prompt),
    };

    if cli.temperature.is_some() || cli.max_output_tokens.is_some() {
        request = request.options(GenerationOptions {
            temperature: cli.temperature,
            max_output_tokens: cli.max_output_tokens,
            ..Default::default()
        });
    }
    if cli.json {
        request = request.response_mime_type("application/json");
    }
    if cli.full {
        request = request.full_response();
    }

    Ok(request)
}

/// Initialize logging system
fn init_logging(settings: &Settings) {
    let log_level = settings.logging.level.clone();

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if settings.logging.format == "json" {
        // JSON format logs (production environment)
        Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(log_level)
                .with_writer(std::io::stderr)
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .finish(),
        )
    } else {
        // Human readable format (development environment)
        Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(log_level)
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .finish(),
        )
    };

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Logging was already initialized");
    }
}
