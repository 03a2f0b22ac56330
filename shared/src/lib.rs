use serde::{Deserialize, Serialize};
use std::fmt;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use uuid::Uuid;

/// Skin types the classifier was trained on, in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString, Serialize, Deserialize)]
pub enum SkinType {
    #[strum(serialize = "Dry Skin")]
    #[serde(rename = "Dry Skin")]
    Dry,
    #[strum(serialize = "Acne Skin")]
    #[serde(rename = "Acne Skin")]
    Acne,
    #[strum(serialize = "Oily Skin")]
    #[serde(rename = "Oily Skin")]
    Oily,
    #[strum(serialize = "Normal Skin")]
    #[serde(rename = "Normal Skin")]
    Normal,
}

impl SkinType {
    pub fn labels() -> Vec<String> {
        SkinType::iter().map(|t| t.to_string()).collect()
    }
}

pub const RECOMMENDATION: &str = "Consult dermatologist for validation";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ClassConfidence {
    pub label: String,
    pub percentage: f32,
}

impl ClassConfidence {
    pub fn display(&self) -> String {
        format!("{}: {}", self.label, format_percentage(self.percentage))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DiagnosisResult {
    pub primary_index: usize,
    pub primary: ClassConfidence,
    pub breakdown: Vec<ClassConfidence>,
}

impl fmt::Display for DiagnosisResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Primary Diagnosis: {} {}",
            self.primary.label,
            format_percentage(self.primary.percentage)
        )?;
        for entry in &self.breakdown {
            writeln!(f, "  {}", entry.display())?;
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AnalyzeResponse {
    pub request_id: Uuid,
    pub diagnosis: DiagnosisResult,
    pub primary_display: String,
    pub breakdown_display: Vec<String>,
    pub recommendation: String,
}

impl AnalyzeResponse {
    pub fn new(diagnosis: DiagnosisResult) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            primary_display: format_percentage(diagnosis.primary.percentage),
            breakdown_display: diagnosis.breakdown.iter().map(ClassConfidence::display).collect(),
            recommendation: RECOMMENDATION.to_string(),
            diagnosis,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ModelStatus {
    Pending,
    Ready,
    Unavailable { reason: String },
}

/// Percentage rendered with one decimal place, e.g. `70.0%`.
pub fn format_percentage(percentage: f32) -> String {
    format!("{:.1}%", percentage)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DiagnosisResult {
        let breakdown = vec![
            ClassConfidence { label: "Dry Skin".into(), percentage: 70.0 },
            ClassConfidence { label: "Acne Skin".into(), percentage: 10.0 },
            ClassConfidence { label: "Oily Skin".into(), percentage: 12.345 },
            ClassConfidence { label: "Normal Skin".into(), percentage: 7.655 },
        ];
        DiagnosisResult { primary_index: 0, primary: breakdown[0].clone(), breakdown }
    }

    #[test]
    fn labels_follow_model_output_order() {
        assert_eq!(
            SkinType::labels(),
            vec!["Dry Skin", "Acne Skin", "Oily Skin", "Normal Skin"]
        );
        assert_eq!("Oily Skin".parse::<SkinType>().unwrap(), SkinType::Oily);
    }

    #[test]
    fn percentages_use_one_decimal() {
        assert_eq!(format_percentage(70.0), "70.0%");
        assert_eq!(format_percentage(12.345), "12.3%");
        assert_eq!(format_percentage(0.0), "0.0%");
    }

    #[test]
    fn report_lists_primary_then_every_label() {
        let text = sample().to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Primary Diagnosis: Dry Skin 70.0%");
        assert_eq!(lines[1], "  Dry Skin: 70.0%");
        assert_eq!(lines[3], "  Oily Skin: 12.3%");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn analyze_response_carries_display_strings() {
        let response = AnalyzeResponse::new(sample());
        assert_eq!(response.primary_display, "70.0%");
        assert_eq!(response.breakdown_display[1], "Acne Skin: 10.0%");
        assert_eq!(response.recommendation, RECOMMENDATION);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["diagnosis"]["primary"]["label"], "Dry Skin");
    }

    #[test]
    fn model_status_is_tagged() {
        let json = serde_json::to_value(ModelStatus::Unavailable { reason: "missing".into() }).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["reason"], "missing");
    }
}
