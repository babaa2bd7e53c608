//! Header resolver - maps a free-form header row to canonical columns
//!
//! Matching per field, first hit wins:
//! 1. exact: token equals the template label or one of the synonyms
//! 2. substring: token contains one of the synonyms
//!
//! The exact pass keeps a column like "Gas/Water Meter" from shadowing a
//! properly labelled "Water (gallons)" further right.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::schema::CanonicalField;

/// What to do when a canonical field has no column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveMode {
    /// Missing fields fail with `SchemaMismatch`
    #[default]
    Strict,
    /// Missing fields read as 0 in every row
    Lenient,
}

/// Canonical field -> zero-based source column. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMap {
    columns: [Option<usize>; 13],
    width: usize,
}

impl HeaderMap {
    /// Column index for `field`, `None` when not found (lenient mode only)
    pub fn column(&self, field: CanonicalField) -> Option<usize> {
        self.columns[field.index()]
    }

    /// Number of columns in the header row
    pub fn width(&self) -> usize {
        self.width
    }

    /// Fields without a column, in canonical order
    pub fn missing(&self) -> Vec<CanonicalField> {
        CanonicalField::ALL
            .into_iter()
            .filter(|f| self.column(*f).is_none())
            .collect()
    }

    /// Resolve a raw header line (plain comma split, no quoting)
    pub fn from_line(line: &str, mode: ResolveMode) -> Result<Self> {
        let tokens: Vec<&str> = line.split(',').collect();
        resolve_headers(&tokens, mode)
    }
}

/// Trim, drop a UTF-8 BOM, lower-case
pub fn normalize_token(raw: &str) -> String {
    raw.trim().trim_start_matches('\u{feff}').trim().to_lowercase()
}

/// Find the column for one field in already-normalized tokens
fn find_column(tokens: &[String], field: CanonicalField) -> Option<usize> {
    let label = field.template_label().to_lowercase();
    let synonyms = field.synonyms();

    tokens
        .iter()
        .position(|t| *t == label || synonyms.contains(&t.as_str()))
        .or_else(|| {
            tokens
                .iter()
                .position(|t| synonyms.iter().any(|s| t.contains(s)))
        })
}

/// Build a `HeaderMap` from the header row's cells
pub fn resolve_headers<S: AsRef<str>>(header: &[S], mode: ResolveMode) -> Result<HeaderMap> {
    let tokens: Vec<String> = header.iter().map(|h| normalize_token(h.as_ref())).collect();

    let mut columns = [None; 13];
    for field in CanonicalField::ALL {
        columns[field.index()] = find_column(&tokens, field);
    }

    let map = HeaderMap {
        columns,
        width: tokens.len(),
    };

    for field in CanonicalField::ALL {
        match map.column(field) {
            Some(idx) => debug!(field = field.key(), column = idx, header = %tokens[idx], "header resolved"),
            None => debug!(field = field.key(), "header not found"),
        }
    }

    let missing = map.missing();
    if !missing.is_empty() && mode == ResolveMode::Strict {
        return Err(IngestError::SchemaMismatch { missing });
    }

    Ok(map)
}
