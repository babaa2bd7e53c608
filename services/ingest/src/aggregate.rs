//! Aggregator - per-field means and usage by area
//!
//! Plain f64 arithmetic, no rounding (formatting is the caller's job).
//! An empty series yields all zeros.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::{CanonicalField, Readings};
use crate::series::TimeSeriesRecord;

/// Arithmetic mean of every numeric field across a series
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSummary {
    pub record_count: usize,
    #[serde(flatten)]
    pub means: Readings,
}

impl AggregateSummary {
    pub fn mean(&self, field: CanonicalField) -> f64 {
        self.means.get(field)
    }
}

/// Mean of each numeric field, `sum / count`, 0 for an empty series.
///
/// A sum that overflows falls back to summing `x / count`, so finite
/// readings always give a finite mean.
pub fn summarize(records: &[TimeSeriesRecord]) -> AggregateSummary {
    if records.is_empty() {
        return AggregateSummary::default();
    }

    let mut sums = Readings::default();
    for record in records {
        sums.accumulate(&record.readings);
    }

    let count = records.len() as f64;
    let mut means = Readings::default();
    for field in CanonicalField::NUMERIC {
        let sum = sums.get(field);
        let mean = if sum.is_finite() {
            sum / count
        } else {
            records.iter().map(|r| r.readings.get(field) / count).sum()
        };
        means.set(field, mean);
    }

    AggregateSummary {
        record_count: records.len(),
        means,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Area {
    #[serde(rename = "HVAC")]
    Hvac,
    Lighting,
    Equipment,
    Other,
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Area::Hvac => "HVAC",
            Area::Lighting => "Lighting",
            Area::Equipment => "Equipment",
            Area::Other => "Other",
        };
        f.write_str(label)
    }
}

/// One bar of the usage-by-area chart
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaUsage {
    pub area: Area,
    pub usage: f64,
}

/// Whether usage by area carries the "Other" remainder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageBuckets {
    #[default]
    WithOther,
    SystemsOnly,
}

/// HVAC, Lighting, Equipment means, plus Other = electricity minus the
/// three, clamped at 0.
pub fn usage_by_area(summary: &AggregateSummary, buckets: UsageBuckets) -> Vec<AreaUsage> {
    let m = &summary.means;
    let mut usage = vec![
        AreaUsage {
            area: Area::Hvac,
            usage: m.hvac,
        },
        AreaUsage {
            area: Area::Lighting,
            usage: m.lighting,
        },
        AreaUsage {
            area: Area::Equipment,
            usage: m.equipment,
        },
    ];

    if buckets == UsageBuckets::WithOther {
        let other = (m.electricity - m.hvac - m.lighting - m.equipment).max(0.0);
        usage.push(AreaUsage {
            area: Area::Other,
            usage: other,
        });
    }

    usage
}
