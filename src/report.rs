//! Display model for an analysis result.
//!
//! Mirrors what the web page renders: percent-suffixed coverage figures, a
//! two-decimal carbon mass, inline data URIs for the overlays, and the
//! three-slice coverage pie. Kept as pure functions so the rendering rules
//! stay testable without a browser.

use crate::pipeline::AnalysisResult;
use serde::Serialize;

/// Legend text color used by the dark-theme pie chart.
pub const LEGEND_COLOR: &str = "#e6ffff";

pub const PIE_LABELS: [&str; 3] = ["Seagrass", "White Sand", "Other"];

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub seagrass_pct_text: String,
    pub white_pct_text: String,
    pub blue_carbon_text: String,
    pub overlay_seagrass_uri: String,
    pub overlay_white_uri: String,
    pub pie: PieChart,
}

/// Data for one labeled pie chart; values index-align with labels.
#[derive(Debug, Clone, Serialize)]
pub struct PieChart {
    pub labels: [&'static str; 3],
    pub values: [f64; 3],
    pub legend_color: &'static str,
}

impl AnalysisReport {
    pub fn from_result(result: &AnalysisResult) -> Self {
        Self {
            seagrass_pct_text: format!("{}%", result.seagrass_pct),
            white_pct_text: format!("{}%", result.white_pct),
            blue_carbon_text: format!("{:.2}", result.blue_carbon_g),
            overlay_seagrass_uri: data_uri(&result.overlay_seagrass_b64),
            overlay_white_uri: data_uri(&result.overlay_white_b64),
            pie: PieChart {
                labels: PIE_LABELS,
                values: pie_values(result.seagrass_pct, result.white_pct),
                legend_color: LEGEND_COLOR,
            },
        }
    }
}

fn data_uri(b64: &str) -> String {
    format!("data:image/png;base64,{}", b64)
}

/// Seagrass, white sand, and the derived remainder. The remainder clamps at
/// zero so inconsistent server data can never produce a negative slice.
pub fn pie_values(seagrass_pct: f64, white_pct: f64) -> [f64; 3] {
    let other = (100.0 - seagrass_pct - white_pct).max(0.0);
    [seagrass_pct, white_pct, other]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(seagrass: f64, white: f64, carbon: f64) -> AnalysisResult {
        AnalysisResult {
            seagrass_pct: seagrass,
            white_pct: white,
            blue_carbon_g: carbon,
            overlay_seagrass_b64: "QUJD".to_string(),
            overlay_white_b64: "REVG".to_string(),
        }
    }

    #[test]
    fn derived_slice_fills_remainder() {
        assert_eq!(pie_values(61.0, 33.0), [61.0, 33.0, 6.0]);
    }

    #[test]
    fn derived_slice_clamps_at_zero() {
        // Masks can overlap-correct into a sum past 100; never go negative
        assert_eq!(pie_values(70.0, 50.0), [70.0, 50.0, 0.0]);
    }

    #[test]
    fn report_formats_for_display() {
        let report = AnalysisReport::from_result(&sample(61.0, 33.0, 12.345));
        assert_eq!(report.seagrass_pct_text, "61%");
        assert_eq!(report.white_pct_text, "33%");
        assert_eq!(report.blue_carbon_text, "12.35");
        assert_eq!(
            report.overlay_seagrass_uri,
            "data:image/png;base64,QUJD"
        );
        assert_eq!(report.pie.labels, ["Seagrass", "White Sand", "Other"]);
        assert_eq!(report.pie.values, [61.0, 33.0, 6.0]);
        assert_eq!(report.pie.legend_color, "#e6ffff");
    }

    #[test]
    fn carbon_always_shows_two_decimals() {
        let report = AnalysisReport::from_result(&sample(100.0, 0.0, 25.0));
        assert_eq!(report.blue_carbon_text, "25.00");
    }
}
