//! Canonical schema - the fixed set of fields the pipeline understands
//!
//! Column names in uploaded files are free-form. The header resolver is the
//! only place that looks at them; everything downstream uses these types.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CanonicalField {
    Date,
    Electricity,
    Gas,
    Water,
    Hvac,
    Lighting,
    Equipment,
    PeakDemand,
    Occupancy,
    Temperature,
    Humidity,
    RenewableEnergy,
    EnergyCost,
}

impl CanonicalField {
    /// All fields, in canonical order
    pub const ALL: [CanonicalField; 13] = [
        CanonicalField::Date,
        CanonicalField::Electricity,
        CanonicalField::Gas,
        CanonicalField::Water,
        CanonicalField::Hvac,
        CanonicalField::Lighting,
        CanonicalField::Equipment,
        CanonicalField::PeakDemand,
        CanonicalField::Occupancy,
        CanonicalField::Temperature,
        CanonicalField::Humidity,
        CanonicalField::RenewableEnergy,
        CanonicalField::EnergyCost,
    ];

    /// Every field except `Date`
    pub const NUMERIC: [CanonicalField; 12] = [
        CanonicalField::Electricity,
        CanonicalField::Gas,
        CanonicalField::Water,
        CanonicalField::Hvac,
        CanonicalField::Lighting,
        CanonicalField::Equipment,
        CanonicalField::PeakDemand,
        CanonicalField::Occupancy,
        CanonicalField::Temperature,
        CanonicalField::Humidity,
        CanonicalField::RenewableEnergy,
        CanonicalField::EnergyCost,
    ];

    /// Position in `ALL`
    pub fn index(self) -> usize {
        self as usize
    }

    /// Serialized key (matches serde)
    pub fn key(self) -> &'static str {
        match self {
            CanonicalField::Date => "date",
            CanonicalField::Electricity => "electricity",
            CanonicalField::Gas => "gas",
            CanonicalField::Water => "water",
            CanonicalField::Hvac => "hvac",
            CanonicalField::Lighting => "lighting",
            CanonicalField::Equipment => "equipment",
            CanonicalField::PeakDemand => "peakDemand",
            CanonicalField::Occupancy => "occupancy",
            CanonicalField::Temperature => "temperature",
            CanonicalField::Humidity => "humidity",
            CanonicalField::RenewableEnergy => "renewableEnergy",
            CanonicalField::EnergyCost => "energyCost",
        }
    }

    /// Lower-case substrings accepted in a header column for this field
    pub fn synonyms(self) -> &'static [&'static str] {
        match self {
            CanonicalField::Date => &["date"],
            CanonicalField::Electricity => &["electricity", "electric"],
            CanonicalField::Gas => &["gas", "natural gas"],
            CanonicalField::Water => &["water"],
            CanonicalField::Hvac => &["hvac"],
            CanonicalField::Lighting => &["lighting"],
            CanonicalField::Equipment => &["equipment"],
            CanonicalField::PeakDemand => &["peak demand", "demand"],
            CanonicalField::Occupancy => &["occupancy"],
            CanonicalField::Temperature => &["temperature", "temp"],
            CanonicalField::Humidity => &["humidity"],
            CanonicalField::RenewableEnergy => &["renewable"],
            CanonicalField::EnergyCost => &["cost", "energy cost"],
        }
    }

    /// Column label used by the downloadable CSV template
    pub fn template_label(self) -> &'static str {
        match self {
            CanonicalField::Date => "Date",
            CanonicalField::Electricity => "Electricity (kWh)",
            CanonicalField::Gas => "Gas (therms)",
            CanonicalField::Water => "Water (gallons)",
            CanonicalField::Hvac => "HVAC (kWh)",
            CanonicalField::Lighting => "Lighting (kWh)",
            CanonicalField::Equipment => "Equipment (kWh)",
            CanonicalField::PeakDemand => "Peak Demand (kW)",
            CanonicalField::Occupancy => "Occupancy (%)",
            CanonicalField::Temperature => "Outside Temperature (F)",
            CanonicalField::Humidity => "Humidity (%)",
            CanonicalField::RenewableEnergy => "Renewable Energy (kWh)",
            CanonicalField::EnergyCost => "Energy Cost ($)",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            CanonicalField::Date => "Date",
            CanonicalField::Electricity => "Electricity",
            CanonicalField::Gas => "Gas",
            CanonicalField::Water => "Water",
            CanonicalField::Hvac => "HVAC",
            CanonicalField::Lighting => "Lighting",
            CanonicalField::Equipment => "Equipment",
            CanonicalField::PeakDemand => "Peak Demand",
            CanonicalField::Occupancy => "Occupancy",
            CanonicalField::Temperature => "Temperature",
            CanonicalField::Humidity => "Humidity",
            CanonicalField::RenewableEnergy => "Renewable Energy",
            CanonicalField::EnergyCost => "Energy Cost",
        }
    }

    /// Presentation unit ("" for the date label)
    pub fn unit(self) -> &'static str {
        match self {
            CanonicalField::Date => "",
            CanonicalField::Electricity
            | CanonicalField::Hvac
            | CanonicalField::Lighting
            | CanonicalField::Equipment
            | CanonicalField::RenewableEnergy => "kWh",
            CanonicalField::Gas => "therms",
            CanonicalField::Water => "gallons",
            CanonicalField::PeakDemand => "kW",
            CanonicalField::Occupancy | CanonicalField::Humidity => "%",
            CanonicalField::Temperature => "°F",
            CanonicalField::EnergyCost => "$",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One value per numeric field. Serializes as a flat key/value object,
/// the shape chart components consume directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Readings {
    pub electricity: f64,
    pub gas: f64,
    pub water: f64,
    pub hvac: f64,
    pub lighting: f64,
    pub equipment: f64,
    pub peak_demand: f64,
    pub occupancy: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub renewable_energy: f64,
    pub energy_cost: f64,
}

impl Readings {
    fn slot(&self, field: CanonicalField) -> Option<&f64> {
        match field {
            CanonicalField::Date => None,
            CanonicalField::Electricity => Some(&self.electricity),
            CanonicalField::Gas => Some(&self.gas),
            CanonicalField::Water => Some(&self.water),
            CanonicalField::Hvac => Some(&self.hvac),
            CanonicalField::Lighting => Some(&self.lighting),
            CanonicalField::Equipment => Some(&self.equipment),
            CanonicalField::PeakDemand => Some(&self.peak_demand),
            CanonicalField::Occupancy => Some(&self.occupancy),
            CanonicalField::Temperature => Some(&self.temperature),
            CanonicalField::Humidity => Some(&self.humidity),
            CanonicalField::RenewableEnergy => Some(&self.renewable_energy),
            CanonicalField::EnergyCost => Some(&self.energy_cost),
        }
    }

    fn slot_mut(&mut self, field: CanonicalField) -> Option<&mut f64> {
        match field {
            CanonicalField::Date => None,
            CanonicalField::Electricity => Some(&mut self.electricity),
            CanonicalField::Gas => Some(&mut self.gas),
            CanonicalField::Water => Some(&mut self.water),
            CanonicalField::Hvac => Some(&mut self.hvac),
            CanonicalField::Lighting => Some(&mut self.lighting),
            CanonicalField::Equipment => Some(&mut self.equipment),
            CanonicalField::PeakDemand => Some(&mut self.peak_demand),
            CanonicalField::Occupancy => Some(&mut self.occupancy),
            CanonicalField::Temperature => Some(&mut self.temperature),
            CanonicalField::Humidity => Some(&mut self.humidity),
            CanonicalField::RenewableEnergy => Some(&mut self.renewable_energy),
            CanonicalField::EnergyCost => Some(&mut self.energy_cost),
        }
    }

    /// Value for a numeric field. `Date` carries no reading and yields 0.
    pub fn get(&self, field: CanonicalField) -> f64 {
        self.slot(field).copied().unwrap_or_default()
    }

    /// Sets a numeric field. Setting `Date` is a no-op.
    pub fn set(&mut self, field: CanonicalField, value: f64) {
        if let Some(slot) = self.slot_mut(field) {
            *slot = value;
        }
    }

    /// Adds `other` field by field
    pub fn accumulate(&mut self, other: &Readings) {
        for field in CanonicalField::NUMERIC {
            self.set(field, self.get(field) + other.get(field));
        }
    }
}
