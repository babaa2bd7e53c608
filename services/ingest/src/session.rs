//! Audit session - the explicit result object of one ingestion
//!
//! A new upload always creates a new session; sessions are never merged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{IngestError, Result};
use crate::series::{ingest, IngestOptions, Ingestion};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildingType {
    Residential,
    Commercial,
    Industrial,
}

impl BuildingType {
    pub fn as_str(self) -> &'static str {
        match self {
            BuildingType::Residential => "residential",
            BuildingType::Commercial => "commercial",
            BuildingType::Industrial => "industrial",
        }
    }
}

impl fmt::Display for BuildingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildingType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "residential" => Ok(BuildingType::Residential),
            "commercial" => Ok(BuildingType::Commercial),
            "industrial" => Ok(BuildingType::Industrial),
            other => Err(format!(
                "unknown building type '{}', expected residential, commercial or industrial",
                other
            )),
        }
    }
}

/// Building metadata entered alongside the CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub building_type: BuildingType,
    /// Square feet
    #[serde(rename = "size")]
    pub size_sq_ft: f64,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_built: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_floors: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupancy_percentage: Option<f64>,
}

impl BuildingInfo {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(IngestError::InvalidBuilding("Building name is required".into()));
        }
        if self.location.trim().is_empty() {
            return Err(IngestError::InvalidBuilding("Location is required".into()));
        }
        if !(self.size_sq_ft.is_finite() && self.size_sq_ft > 0.0) {
            return Err(IngestError::InvalidBuilding("Size must be greater than 0".into()));
        }
        if let Some(pct) = self.occupancy_percentage {
            if !(0.0..=100.0).contains(&pct) {
                return Err(IngestError::InvalidBuilding(
                    "Occupancy must be between 0 and 100".into(),
                ));
            }
        }
        Ok(())
    }
}

/// `sha256:<hex>` of the raw CSV text
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("sha256:{:x}", hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub building: BuildingInfo,
    pub content_hash: String,
    pub ingestion: Ingestion,
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub analyzed_at: Option<DateTime<Utc>>,
}

impl AuditSession {
    /// Validate the building, run the pipeline, open a fresh session
    pub fn start(building: BuildingInfo, csv: &str, options: &IngestOptions) -> Result<Self> {
        building.validate()?;
        let ingestion = ingest(csv, options)?;

        Ok(Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            building,
            content_hash: content_hash(csv),
            ingestion,
            analysis: None,
            analyzed_at: None,
        })
    }

    /// Attach (or replace) the generated narrative
    pub fn record_analysis(&mut self, text: String) {
        self.analysis = Some(text);
        self.analyzed_at = Some(Utc::now());
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            building_name: self.building.name.clone(),
            created_at: self.created_at,
            record_count: self.ingestion.records.len(),
            warning_count: self.ingestion.warnings.len(),
            analyzed: self.analysis.is_some(),
        }
    }
}

/// Listing entry for a stored session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    pub building_name: String,
    pub created_at: DateTime<Utc>,
    pub record_count: usize,
    pub warning_count: usize,
    pub analyzed: bool,
}
