//! Row validator - one data line in, one `TimeSeriesRecord` out
//!
//! Shape errors are fatal. A cell that is not a finite number is not: it
//! becomes 0 tagged with a `CellWarning`, so callers decide whether to
//! surface it.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::error::{IngestError, Result};
use crate::header::HeaderMap;
use crate::schema::{CanonicalField, Readings};
use crate::series::TimeSeriesRecord;

/// A numeric cell that could not be read and was replaced with 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellWarning {
    pub field: CanonicalField,
    /// 1-based line in the source file (header = 1)
    pub row: u64,
    /// Original cell text, trimmed
    pub raw: String,
}

impl fmt::Display for CellWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid number for {} in row {}: '{}', using 0",
            self.field, self.row, self.raw
        )
    }
}

/// Outcome of reading one numeric cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Parsed(f64),
    Recovered { value: f64, warning: CellWarning },
}

impl CellValue {
    pub fn value(&self) -> f64 {
        match self {
            CellValue::Parsed(v) => *v,
            CellValue::Recovered { value, .. } => *value,
        }
    }

    pub fn warning(&self) -> Option<&CellWarning> {
        match self {
            CellValue::Parsed(_) => None,
            CellValue::Recovered { warning, .. } => Some(warning),
        }
    }

    pub fn into_parts(self) -> (f64, Option<CellWarning>) {
        match self {
            CellValue::Parsed(v) => (v, None),
            CellValue::Recovered { value, warning } => (value, Some(warning)),
        }
    }
}

/// Parse one numeric cell. Empty, malformed and non-finite text recovers to 0.
pub fn parse_cell(raw: &str, field: CanonicalField, row: u64) -> CellValue {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => CellValue::Parsed(v),
        _ => CellValue::Recovered {
            value: 0.0,
            warning: CellWarning {
                field,
                row,
                raw: trimmed.to_string(),
            },
        },
    }
}

/// A validated row plus every cell it had to recover
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRow {
    pub record: TimeSeriesRecord,
    pub warnings: Vec<CellWarning>,
}

/// Validate one data row against the header.
///
/// `row` is the 1-based line number, used for labels and messages.
pub fn validate_row<S: AsRef<str>>(
    tokens: &[S],
    row: u64,
    headers: &HeaderMap,
) -> Result<ValidatedRow> {
    if tokens.len() != headers.width() {
        return Err(IngestError::RowShape {
            row,
            expected: headers.width(),
            found: tokens.len(),
        });
    }

    let label = headers
        .column(CanonicalField::Date)
        .map(|idx| tokens[idx].as_ref().trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Row {}", row));

    let mut readings = Readings::default();
    let mut warnings = Vec::new();

    for field in CanonicalField::NUMERIC {
        // Absent column: silently 0
        let Some(idx) = headers.column(field) else {
            continue;
        };

        let (value, warning) = parse_cell(tokens[idx].as_ref(), field, row).into_parts();
        if let Some(w) = warning {
            warn!(field = field.key(), row, raw = %w.raw, "invalid number, using 0");
            warnings.push(w);
        }
        readings.set(field, value);
    }

    Ok(ValidatedRow {
        record: TimeSeriesRecord { label, readings },
        warnings,
    })
}

/// Validate a raw line (plain comma split, no quoting)
pub fn validate_line(line: &str, row: u64, headers: &HeaderMap) -> Result<ValidatedRow> {
    let tokens: Vec<&str> = line.split(',').collect();
    validate_row(&tokens, row, headers)
}
