//! Time-series builder - whole CSV text in, ordered records out
//!
//! Record order is file order; it drives the chart x-axis.
//! Blank lines are not rows. Row numbers are physical line numbers.

use csv::StringRecord;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregate::{summarize, usage_by_area, AggregateSummary, AreaUsage, UsageBuckets};
use crate::error::{IngestError, Result};
use crate::header::{resolve_headers, ResolveMode};
use crate::row::{validate_row, CellWarning};
use crate::schema::Readings;

/// One normalized row: a label (usually the date) plus every numeric field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRecord {
    pub label: String,
    #[serde(flatten)]
    pub readings: Readings,
}

/// Ordered records plus every recovered cell, in row order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub records: Vec<TimeSeriesRecord>,
    pub warnings: Vec<CellWarning>,
}

/// Caller choices for one ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    pub mode: ResolveMode,
    pub buckets: UsageBuckets,
}

/// Full pipeline output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingestion {
    pub records: Vec<TimeSeriesRecord>,
    pub summary: AggregateSummary,
    pub usage_by_area: Vec<AreaUsage>,
    pub warnings: Vec<CellWarning>,
}

/// Split CSV text into (line number, record) pairs.
///
/// One record per physical line; quoted cells cannot span lines.
/// Lines that are empty or whitespace-only are skipped but still counted.
fn read_records(content: &str) -> Result<Vec<(u64, StringRecord)>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut rows = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(line.as_bytes());

        if let Some(record) = reader.records().next() {
            rows.push((idx as u64 + 1, record?));
        }
    }
    Ok(rows)
}

/// Header + data rows -> ordered `TimeSeries`.
///
/// Fails with `EmptyDataset` before looking at the header, then
/// `SchemaMismatch`, then the first `RowShape`.
pub fn build_series(content: &str, mode: ResolveMode) -> Result<TimeSeries> {
    let rows = read_records(content)?;
    if rows.len() < 2 {
        return Err(IngestError::EmptyDataset);
    }

    let header: Vec<&str> = rows[0].1.iter().collect();
    let headers = resolve_headers(&header, mode)?;
    debug!(columns = headers.width(), "header resolved");

    let mut series = TimeSeries::default();
    for (line, record) in &rows[1..] {
        let tokens: Vec<&str> = record.iter().collect();
        let validated = validate_row(&tokens, *line, &headers)?;
        series.records.push(validated.record);
        series.warnings.extend(validated.warnings);
    }

    Ok(series)
}

/// Run the whole pipeline on one CSV text
pub fn ingest(content: &str, options: &IngestOptions) -> Result<Ingestion> {
    let series = build_series(content, options.mode)?;
    let summary = summarize(&series.records);
    let usage_by_area = usage_by_area(&summary, options.buckets);

    info!(
        records = series.records.len(),
        warnings = series.warnings.len(),
        "ingestion complete"
    );

    Ok(Ingestion {
        records: series.records,
        summary,
        usage_by_area,
        warnings: series.warnings,
    })
}
