//! Report structuring - turns an analyzed session into titled sections.
//! Page layout (PDF) is left to the renderer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::AreaUsage;
use crate::row::CellWarning;
use crate::session::{AuditSession, BuildingInfo};

/// One block of the generated narrative
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSection {
    pub text: String,
    pub is_header: bool,
}

/// Split narrative text on blank lines. Blocks containing `**` are headers
/// (markers removed); empty blocks are dropped.
pub fn analysis_sections(text: &str) -> Vec<AnalysisSection> {
    let normalized = text.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .filter_map(|block| {
            let is_header = block.contains("**");
            let text = if is_header {
                block.replace("**", "").trim().to_string()
            } else {
                block.trim().to_string()
            };
            (!text.is_empty()).then_some(AnalysisSection { text, is_header })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub title: String,
    /// YYYY-MM-DD of the analysis
    pub generated_on: String,
    pub building: BuildingInfo,
    pub analysis: Vec<AnalysisSection>,
    pub usage_by_area: Vec<AreaUsage>,
    pub data_quality: Vec<CellWarning>,
}

impl Report {
    /// `None` until the session has an analysis
    pub fn from_session(session: &AuditSession) -> Option<Self> {
        let analysis = session.analysis.as_deref()?;
        let generated_on = session
            .analyzed_at
            .unwrap_or(session.created_at)
            .format("%Y-%m-%d")
            .to_string();

        Some(Self {
            id: session.id,
            title: format!("Energy Audit Report - {}", session.building.name),
            generated_on,
            building: session.building.clone(),
            analysis: analysis_sections(analysis),
            usage_by_area: session.ingestion.usage_by_area.clone(),
            data_quality: session.ingestion.warnings.clone(),
        })
    }

    /// Plain-text rendering
    pub fn to_text(&self) -> String {
        let b = &self.building;
        let mut out = Vec::new();

        out.push(self.title.clone());
        out.push(format!("Generated on: {}", self.generated_on));
        out.push(String::new());

        out.push("Executive Summary".to_string());
        out.push(format!(
            "This report presents a comprehensive energy audit analysis for {}, a {} sq ft {} building located in {}.",
            b.name, b.size_sq_ft, b.building_type, b.location
        ));
        out.push(String::new());

        out.push("Building Information".to_string());
        out.push(format!("Building Name: {}", b.name));
        out.push(format!("Type: {}", b.building_type));
        out.push(format!("Size: {} sq ft", b.size_sq_ft));
        out.push(format!("Location: {}", b.location));
        if let Some(year) = b.year_built {
            out.push(format!("Year Built: {}", year));
        }
        if let Some(floors) = b.number_of_floors {
            out.push(format!("Number of Floors: {}", floors));
        }
        if let Some(pct) = b.occupancy_percentage {
            out.push(format!("Occupancy: {}%", pct));
        }
        out.push(String::new());

        if !self.usage_by_area.is_empty() {
            out.push("Average Usage by Area".to_string());
            for u in &self.usage_by_area {
                out.push(format!("{}: {:.2} kWh", u.area, u.usage));
            }
            out.push(String::new());
        }

        out.push("Energy Analysis Results".to_string());
        for section in &self.analysis {
            if section.is_header {
                out.push(String::new());
                out.push(section.text.to_uppercase());
            } else {
                out.push(section.text.clone());
            }
        }

        if !self.data_quality.is_empty() {
            out.push(String::new());
            out.push("Data Quality".to_string());
            for w in &self.data_quality {
                out.push(format!("- {}", w));
            }
        }

        let mut text = out.join("\n");
        text.push('\n');
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CanonicalField;
    use crate::series::IngestOptions;
    use crate::session::BuildingType;
    use crate::template::csv_template;

    fn session() -> AuditSession {
        let building = BuildingInfo {
            name: "Warehouse 7".to_string(),
            building_type: BuildingType::Industrial,
            size_sq_ft: 80000.0,
            location: "Reno, NV".to_string(),
            year_built: None,
            number_of_floors: Some(1),
            occupancy_percentage: None,
        };
        AuditSession::start(building, &csv_template(), &IngestOptions::default()).unwrap()
    }

    #[test]
    fn test_sections_headers_and_body() {
        let text = "**Consumption Patterns**\n\nUsage peaks mid-week.\n\n\n\n**Recommendations**\n\nSwap to LED.";
        let sections = analysis_sections(text);
        assert_eq!(sections.len(), 4);
        assert_eq!(sections[0], AnalysisSection { text: "Consumption Patterns".into(), is_header: true });
        assert_eq!(sections[1], AnalysisSection { text: "Usage peaks mid-week.".into(), is_header: false });
        assert!(sections[2].is_header);
        assert_eq!(sections[3].text, "Swap to LED.");
    }

    #[test]
    fn test_sections_crlf() {
        let sections = analysis_sections("**A**\r\n\r\nbody");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].text, "A");
    }

    #[test]
    fn test_no_report_without_analysis() {
        assert!(Report::from_session(&session()).is_none());
    }

    #[test]
    fn test_report_from_analyzed_session() {
        let mut s = session();
        s.record_analysis("**Summary**\n\nEfficient overall.".to_string());
        let report = Report::from_session(&s).unwrap();

        assert_eq!(report.id, s.id);
        assert_eq!(report.title, "Energy Audit Report - Warehouse 7");
        assert_eq!(report.generated_on.len(), 10);
        assert_eq!(report.analysis.len(), 2);
        assert_eq!(report.usage_by_area.len(), 4);
        assert!(report.data_quality.is_empty());
    }

    #[test]
    fn test_report_text() {
        let mut s = session();
        s.record_analysis("**Summary**\n\nEfficient overall.".to_string());
        let text = Report::from_session(&s).unwrap().to_text();

        assert!(text.starts_with("Energy Audit Report - Warehouse 7\n"));
        assert!(text.contains("80000 sq ft industrial building located in Reno, NV"));
        assert!(text.contains("Number of Floors: 1"));
        assert!(text.contains("Average Usage by Area\nHVAC: "));
        assert!(!text.contains("Year Built"));
        assert!(text.contains("SUMMARY\nEfficient overall."));
        assert!(!text.contains("Data Quality"));
    }

    #[test]
    fn test_report_text_lists_data_quality() {
        let mut s = session();
        s.ingestion.warnings.push(CellWarning {
            field: CanonicalField::Water,
            row: 4,
            raw: "--".to_string(),
        });
        s.record_analysis("Fine.".to_string());
        let text = Report::from_session(&s).unwrap().to_text();
        assert!(text.contains("Data Quality\n- Invalid number for water in row 4: '--', using 0"));
    }
}
