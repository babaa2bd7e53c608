//! Downloadable CSV template - the documented upload contract

use crate::schema::CanonicalField;

const SAMPLE_ROWS: [&str; 7] = [
    "2023-01-01,1000,50,5000,400,300,300,150,85,72,45,0,125.50",
    "2023-01-02,950,48,4800,380,290,280,142,82,70,47,12,119.25",
    "2023-01-03,1100,52,5200,420,330,350,165,90,68,50,8,138.00",
    "2023-01-04,980,49,4900,390,295,295,148,84,71,44,15,122.75",
    "2023-01-05,1050,51,5100,410,315,325,158,88,74,42,20,131.40",
    "2023-01-06,900,47,4700,360,270,270,135,60,75,40,25,112.60",
    "2023-01-07,850,45,4500,340,255,255,128,55,73,41,30,106.30",
];

/// Header row of the template, template labels in canonical order
pub fn template_header() -> String {
    CanonicalField::ALL
        .iter()
        .map(|f| f.template_label())
        .collect::<Vec<_>>()
        .join(",")
}

/// Header plus one week of sample rows
pub fn csv_template() -> String {
    let mut out = template_header();
    for row in SAMPLE_ROWS {
        out.push('\n');
        out.push_str(row);
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::ResolveMode;
    use crate::series::build_series;

    #[test]
    fn test_header_matches_documented_contract() {
        assert_eq!(
            template_header(),
            "Date,Electricity (kWh),Gas (therms),Water (gallons),HVAC (kWh),Lighting (kWh),Equipment (kWh),Peak Demand (kW),Occupancy (%),Outside Temperature (F),Humidity (%),Renewable Energy (kWh),Energy Cost ($)"
        );
    }

    #[test]
    fn test_template_ingests_cleanly() {
        let series = build_series(&csv_template(), ResolveMode::Strict).unwrap();
        assert_eq!(series.records.len(), SAMPLE_ROWS.len());
        assert!(series.warnings.is_empty());
        assert_eq!(series.records[0].label, "2023-01-01");
        assert_eq!(series.records[6].readings.energy_cost, 106.3);
    }
}
