//! Ingest CLI - Loads a consumption CSV into a stored audit session
//!
//! Responsibilities:
//! - Read the CSV and describe the building from flags
//! - Run the ingestion pipeline (header, rows, series, aggregates)
//! - Skip files that were already ingested (same content hash)
//! - Persist the session to the configured store
//!
//! Same CSV + same options = same records, summary and warnings.

use anyhow::{Context, Result};
use clap::Parser;
use energy_ingest::config::StoreSettings;
use energy_ingest::session::content_hash;
use energy_ingest::{
    AnyStore, AuditSession, BuildingInfo, BuildingType, CanonicalField, IngestOptions,
    ResolveMode, SessionStore, UsageBuckets,
};
use std::path::PathBuf;
use tokio::fs;
use tracing_subscriber::EnvFilter;

/// Warnings echoed to the console; the rest stay in the session
const WARNINGS_SHOWN: usize = 5;

#[derive(Parser, Debug)]
#[command(name = "ingest", about = "Ingests an energy consumption CSV into an audit session")]
struct Args {
    /// Path to the consumption CSV
    #[arg(long)]
    csv: PathBuf,

    /// Building name
    #[arg(long)]
    name: String,

    /// residential | commercial | industrial
    #[arg(long)]
    building_type: BuildingType,

    /// Floor area in square feet
    #[arg(long)]
    size: f64,

    #[arg(long)]
    location: String,

    #[arg(long)]
    year_built: Option<i32>,

    #[arg(long)]
    floors: Option<u32>,

    /// Average occupancy, 0-100
    #[arg(long)]
    occupancy: Option<f64>,

    /// Accept CSVs with missing columns (absent fields read as 0)
    #[arg(long, default_value = "false")]
    lenient: bool,

    /// Leave the "Other" remainder out of usage by area
    #[arg(long, default_value = "false")]
    no_other: bool,

    /// Dry run - don't save the session
    #[arg(long, default_value = "false")]
    dry_run: bool,

    /// Ingest even if this exact file was ingested before
    #[arg(long, default_value = "false")]
    force: bool,

    /// Print the full session as JSON
    #[arg(long, default_value = "false")]
    json: bool,
}

impl Args {
    fn building(&self) -> BuildingInfo {
        BuildingInfo {
            name: self.name.clone(),
            building_type: self.building_type,
            size_sq_ft: self.size,
            location: self.location.clone(),
            year_built: self.year_built,
            number_of_floors: self.floors,
            occupancy_percentage: self.occupancy,
        }
    }

    fn options(&self) -> IngestOptions {
        IngestOptions {
            mode: if self.lenient {
                ResolveMode::Lenient
            } else {
                ResolveMode::Strict
            },
            buckets: if self.no_other {
                UsageBuckets::SystemsOnly
            } else {
                UsageBuckets::WithOther
            },
        }
    }
}

fn print_session(session: &AuditSession) {
    let ingestion = &session.ingestion;
    println!("\nSession: {}", session.id);
    println!("Records: {}", ingestion.summary.record_count);

    if let (Some(first), Some(last)) = (ingestion.records.first(), ingestion.records.last()) {
        println!("Period: {} .. {}", first.label, last.label);
    }

    println!("\nAverages:");
    for field in CanonicalField::NUMERIC {
        println!(
            "  {:<28} {:>12.2} {}",
            field.display_name(),
            ingestion.summary.mean(field),
            field.unit()
        );
    }

    println!("\nUsage by area:");
    for u in &ingestion.usage_by_area {
        println!("  {:<10} {:>12.2} kWh", u.area.to_string(), u.usage);
    }

    if !ingestion.warnings.is_empty() {
        println!("\nWarnings: {}", ingestion.warnings.len());
        for w in ingestion.warnings.iter().take(WARNINGS_SHOWN) {
            println!("  {}", w);
        }
        if ingestion.warnings.len() > WARNINGS_SHOWN {
            println!("  ... and {} more", ingestion.warnings.len() - WARNINGS_SHOWN);
        }
    }
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

    println!("=== Energy Audit Ingest ===");
    println!("File: {}", args.csv.display());
    println!("Building: {} ({})", args.name, args.building_type);
    println!("Mode: {}", if args.dry_run { "dry-run" } else { "live" });

    let content = fs::read_to_string(&args.csv)
        .await
        .with_context(|| format!("Failed to read {}", args.csv.display()))?;
    let hash = content_hash(&content);
    println!("Content size: {} bytes", content.len());
    println!("Hash: {}", hash);

    let store = if args.dry_run {
        None
    } else {
        let settings = StoreSettings::from_env().context("Invalid store configuration")?;
        let store = AnyStore::open(&settings)
            .await
            .context("Failed to open session store")?;
        println!("Store: {}", store.describe());
        Some(store)
    };

    if let Some(store) = &store {
        if !args.force {
            if let Some(existing) = store.find_by_hash(&hash).await? {
                println!(
                    "\nFile already ingested as session {} ({}). Use --force to ingest again.",
                    existing.id, existing.building.name
                );
                return Ok(());
            }
        }
    }

    let session = AuditSession::start(args.building(), &content, &args.options())
        .context("Ingestion failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else {
        print_session(&session);
    }

    match &store {
        Some(store) => {
            store.put(&session).await.context("Failed to save session")?;
            println!("\nSaved session {}", session.id);
        }
        None => println!("\n[dry-run] Session not saved"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec![
            "ingest",
            "--csv",
            "data.csv",
            "--name",
            "Main Office",
            "--building-type",
            "commercial",
            "--size",
            "25000",
            "--location",
            "Austin, TX",
        ];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.building_type, BuildingType::Commercial);
        assert!(!args.dry_run);
        let options = args.options();
        assert_eq!(options.mode, ResolveMode::Strict);
        assert_eq!(options.buckets, UsageBuckets::WithOther);
        let building = args.building();
        assert_eq!(building.size_sq_ft, 25000.0);
        assert!(building.year_built.is_none());
    }

    #[test]
    fn test_flags() {
        let args = parse(&["--lenient", "--no-other", "--floors", "3", "--occupancy", "80"]);
        let options = args.options();
        assert_eq!(options.mode, ResolveMode::Lenient);
        assert_eq!(options.buckets, UsageBuckets::SystemsOnly);
        assert_eq!(args.building().number_of_floors, Some(3));
        assert_eq!(args.building().occupancy_percentage, Some(80.0));
    }

    #[test]
    fn test_rejects_unknown_building_type() {
        let result = Args::try_parse_from([
            "ingest",
            "--csv",
            "data.csv",
            "--name",
            "X",
            "--building-type",
            "castle",
            "--size",
            "1",
            "--location",
            "Y",
        ]);
        assert!(result.is_err());
    }
}
