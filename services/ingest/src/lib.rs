//! Energy Ingest - Turns a utility consumption CSV into an audit session
//!
//! Pipeline (strictly forward, no intermediate state kept):
//! - Resolve the free-form header row to the canonical schema
//! - Validate every data row (shape is fatal, bad cells are recovered)
//! - Build the ordered time series
//! - Aggregate per-field means and usage by area
//!
//! Everything past the header resolver works on `CanonicalField` only.
//! Same CSV text + same options = same output.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod header;
pub mod prompt;
pub mod report;
pub mod row;
pub mod schema;
pub mod series;
pub mod session;
pub mod store;
pub mod template;

pub use aggregate::{summarize, usage_by_area, AggregateSummary, Area, AreaUsage, UsageBuckets};
pub use error::{IngestError, Result, StoreError};
pub use header::{resolve_headers, HeaderMap, ResolveMode};
pub use row::{validate_row, CellValue, CellWarning, ValidatedRow};
pub use schema::{CanonicalField, Readings};
pub use series::{build_series, ingest, IngestOptions, Ingestion, TimeSeries, TimeSeriesRecord};
pub use session::{AuditSession, BuildingInfo, BuildingType, SessionSummary};
pub use store::{AnyStore, FsStore, PgStore, SessionStore};
