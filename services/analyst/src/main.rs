//! Analyst Service - Generates the narrative analysis for an audit session
//!
//! Responsibilities:
//! - Load a stored session
//! - Build the analysis prompt from building info, averages and warnings
//! - Call the hosted language model (generateContent)
//! - Store the returned text as the session's analysis
//!
//! Usage:
//!   cargo run --bin analyst -- --session-id <uuid>
//!   cargo run --bin analyst -- --session-id <uuid> --dry-run

use anyhow::{Context, Result};
use clap::Parser;
use energy_ingest::config::StoreSettings;
use energy_ingest::prompt::session_prompt;
use energy_ingest::{AnyStore, SessionStore};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "analyst", about = "Generates the energy analysis for an audit session")]
struct Args {
    /// Session id to analyze (UUID)
    #[arg(long)]
    session_id: String,

    /// Dry run - print the prompt, don't call the model
    #[arg(long, default_value = "false")]
    dry_run: bool,

    /// Re-analyze even if the session already has an analysis
    #[arg(long, default_value = "false")]
    force: bool,

    /// Model collection base URL
    #[arg(
        long,
        env = "ANALYST_API_URL",
        default_value = "https://generativelanguage.googleapis.com/v1beta/models"
    )]
    api_url: String,

    #[arg(long, env = "ANALYST_MODEL", default_value = "gemini-1.5-pro-002")]
    model: String,

    #[arg(long, env = "ANALYST_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 120)]
    timeout_secs: u64,
}

impl Args {
    /// generateContent endpoint, without the key
    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.api_url.trim_end_matches('/'),
            self.model
        )
    }
}

// =============================================================================
// generateContent wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateRequest {
    fn from_prompt(prompt: String) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: Some(prompt) }],
            }],
        }
    }
}

/// Text of the first candidate, parts concatenated
fn extract_text(resp: &GenerateResponse) -> Option<String> {
    let content = resp.candidates.first()?.content.as_ref()?;
    let text: String = content
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

async fn generate(
    client: &reqwest::Client,
    args: &Args,
    api_key: &str,
    prompt: String,
) -> Result<String> {
    let url = args.endpoint();
    println!("  Calling: {}", url);

    let resp: GenerateResponse = client
        .post(&url)
        .query(&[("key", api_key)])
        .json(&GenerateRequest::from_prompt(prompt))
        .send()
        .await?
        .error_for_status()
        .context("Model request failed")?
        .json()
        .await
        .context("Unexpected model response")?;

    extract_text(&resp).context("Model returned no text")
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let session_id: Uuid = args.session_id.parse().context("Invalid session_id UUID")?;

    println!("=== Energy Audit Analyst ===");
    println!("Session ID: {}", session_id);
    println!("Model: {}", args.model);
    println!("Mode: {}", if args.dry_run { "dry-run" } else { "live" });

    let settings = StoreSettings::from_env().context("Invalid store configuration")?;
    let store = AnyStore::open(&settings)
        .await
        .context("Failed to open session store")?;

    let mut session = store
        .get(session_id)
        .await
        .context("Failed to load session")?;

    println!("Building: {}", session.building.name);
    println!("Records: {}", session.ingestion.records.len());
    println!("Warnings: {}", session.ingestion.warnings.len());

    if session.analysis.is_some() && !args.force {
        println!("Session already analyzed. Use --force to regenerate.");
        return Ok(());
    }

    let prompt = session_prompt(&session);
    debug!("prompt is {} bytes", prompt.len());

    if args.dry_run {
        println!("\n--- Prompt ---\n{}", prompt);
        println!("[dry-run] Model not called");
        return Ok(());
    }

    let api_key = args
        .api_key
        .as_deref()
        .context("ANALYST_API_KEY env var missing (or pass --api-key)")?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout_secs))
        .user_agent(concat!("EnergyAudit/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let analysis = generate(&client, &args, api_key, prompt).await?;
    println!("\nReceived {} characters of analysis", analysis.len());

    session.record_analysis(analysis);
    store
        .put(&session)
        .await
        .context("Failed to save analysis")?;

    info!("stored analysis for session {}", session.id);
    println!("Analysis saved");

    Ok(())
}
