//! Analysis prompt - aggregates interpolated into the text sent to the
//! generative-AI service. The service protocol lives in the analyst.

use crate::aggregate::AggregateSummary;
use crate::row::CellWarning;
use crate::schema::CanonicalField;
use crate::session::{AuditSession, BuildingInfo};

const MAX_WARNING_LINES: usize = 20;

fn or_na<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "N/A".to_string())
}

/// "1234.50 kWh", "$125.50", "72.00°F", "85.00%"
fn format_mean(field: CanonicalField, value: f64) -> String {
    match field.unit() {
        "$" => format!("${:.2}", value),
        "%" | "°F" => format!("{:.2}{}", value, field.unit()),
        unit => format!("{:.2} {}", value, unit),
    }
}

/// Build the analysis request text.
///
/// Recovered cells are listed under "Data quality notes" so the narrative
/// does not silently rest on substituted zeros.
pub fn analysis_prompt(
    building: &BuildingInfo,
    summary: &AggregateSummary,
    warnings: &[CellWarning],
) -> String {
    let mean = |f: CanonicalField| format_mean(f, summary.mean(f));

    let mut lines = vec![
        format!(
            "Analyze the energy consumption patterns for building {}, a comprehensive energy audit analysis:",
            building.name
        ),
        String::new(),
        "Building Information:".to_string(),
        format!("- Name: {}", building.name),
        format!("- Type: {}", building.building_type),
        format!("- Size: {} sq ft", building.size_sq_ft),
        format!("- Location: {}", building.location),
        format!("- Year Built: {}", or_na(building.year_built)),
        format!("- Number of Floors: {}", or_na(building.number_of_floors)),
        format!(
            "- Occupancy: {}",
            or_na(building.occupancy_percentage.map(|p| format!("{}%", p)))
        ),
        String::new(),
        format!("Energy Consumption Averages ({} records):", summary.record_count),
        format!("- Average Electricity Usage: {}", mean(CanonicalField::Electricity)),
        format!("- Average Gas Usage: {}", mean(CanonicalField::Gas)),
        format!("- Average Water Usage: {}", mean(CanonicalField::Water)),
        format!("- Average Peak Demand: {}", mean(CanonicalField::PeakDemand)),
        format!("- Average Occupancy: {}", mean(CanonicalField::Occupancy)),
        format!("- Average Energy Cost: {}", mean(CanonicalField::EnergyCost)),
        format!("- Renewable Energy Generation: {}", mean(CanonicalField::RenewableEnergy)),
        String::new(),
        "System-Specific Usage:".to_string(),
        format!("- HVAC: {}", mean(CanonicalField::Hvac)),
        format!("- Lighting: {}", mean(CanonicalField::Lighting)),
        format!("- Equipment: {}", mean(CanonicalField::Equipment)),
        String::new(),
        "Environmental Conditions:".to_string(),
        format!("- Average Temperature: {}", mean(CanonicalField::Temperature)),
        format!("- Average Humidity: {}", mean(CanonicalField::Humidity)),
    ];

    if !warnings.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "Data quality notes ({} unreadable cells were treated as 0):",
            warnings.len()
        ));
        lines.extend(warnings.iter().take(MAX_WARNING_LINES).map(|w| format!("- {}", w)));
        if warnings.len() > MAX_WARNING_LINES {
            lines.push(format!("- ... and {} more", warnings.len() - MAX_WARNING_LINES));
        }
    }

    lines.extend(
        [
            "",
            "Please provide a detailed analysis including:",
            "1. Energy consumption patterns and trends",
            "2. Peak demand analysis",
            "3. System performance evaluation",
            "4. Cost analysis and potential savings",
            "5. Environmental impact assessment",
            "6. Recommendations for optimization",
        ]
        .map(String::from),
    );

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Prompt for a stored session
pub fn session_prompt(session: &AuditSession) -> String {
    analysis_prompt(
        &session.building,
        &session.ingestion.summary,
        &session.ingestion.warnings,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{ingest, IngestOptions};
    use crate::session::BuildingType;

    fn building() -> BuildingInfo {
        BuildingInfo {
            name: "Main Office".to_string(),
            building_type: BuildingType::Commercial,
            size_sq_ft: 25000.0,
            location: "Denver, CO".to_string(),
            year_built: Some(1998),
            number_of_floors: None,
            occupancy_percentage: None,
        }
    }

    const CSV: &str = "Date,Electricity (kWh),Gas (therms),Water (gallons),HVAC (kWh),Lighting (kWh),Equipment (kWh),Peak Demand (kW),Occupancy (%),Outside Temperature (F),Humidity (%),Renewable Energy (kWh),Energy Cost ($)\n\
                       2024-01-01,1000,50,5000,400,300,300,150,85,72,45,0,125.50\n";

    #[test]
    fn test_prompt_contains_two_decimal_means() {
        let result = ingest(CSV, &IngestOptions::default()).unwrap();
        let prompt = analysis_prompt(&building(), &result.summary, &result.warnings);

        assert!(prompt.contains("building Main Office"));
        assert!(prompt.contains("- Average Electricity Usage: 1000.00 kWh"));
        assert!(prompt.contains("- Average Gas Usage: 50.00 therms"));
        assert!(prompt.contains("- Average Energy Cost: $125.50"));
        assert!(prompt.contains("- Average Temperature: 72.00°F"));
        assert!(prompt.contains("- Average Occupancy: 85.00%"));
        assert!(prompt.contains("- HVAC: 400.00 kWh"));
        assert!(prompt.contains("6. Recommendations for optimization"));
    }

    #[test]
    fn test_prompt_missing_building_fields_are_na() {
        let result = ingest(CSV, &IngestOptions::default()).unwrap();
        let prompt = analysis_prompt(&building(), &result.summary, &result.warnings);
        assert!(prompt.contains("- Year Built: 1998"));
        assert!(prompt.contains("- Number of Floors: N/A"));
        assert!(prompt.contains("- Occupancy: N/A\n"));
        assert!(!prompt.contains("N/A%"));

        let mut b = building();
        b.occupancy_percentage = Some(90.0);
        let prompt = analysis_prompt(&b, &result.summary, &result.warnings);
        assert!(prompt.contains("- Occupancy: 90%\n"));
    }

    #[test]
    fn test_prompt_without_warnings_has_no_quality_section() {
        let result = ingest(CSV, &IngestOptions::default()).unwrap();
        let prompt = analysis_prompt(&building(), &result.summary, &result.warnings);
        assert!(!prompt.contains("Data quality notes"));
    }

    #[test]
    fn test_prompt_lists_warnings_with_cap() {
        let warnings: Vec<CellWarning> = (0..25)
            .map(|i| CellWarning {
                field: CanonicalField::Gas,
                row: i + 2,
                raw: "x".to_string(),
            })
            .collect();
        let prompt = analysis_prompt(&building(), &AggregateSummary::default(), &warnings);
        assert!(prompt.contains("Data quality notes (25 unreadable cells were treated as 0):"));
        assert!(prompt.contains("- Invalid number for gas in row 2: 'x', using 0"));
        assert!(prompt.contains("- ... and 5 more"));
        assert!(!prompt.contains("in row 26:"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let result = ingest(CSV, &IngestOptions::default()).unwrap();
        let a = analysis_prompt(&building(), &result.summary, &result.warnings);
        let b = analysis_prompt(&building(), &result.summary, &result.warnings);
        assert_eq!(a, b);
    }
}
