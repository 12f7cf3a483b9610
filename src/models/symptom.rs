use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

/// One candidate condition suggested by the analysis
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ConditionGuess {
    pub name: String,
    /// "high", "moderate" or "low"
    pub likelihood: String,
}

/// Structured result of a symptom analysis (AI or fallback)
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SymptomAnalysis {
    pub possible_conditions: Vec<ConditionGuess>,
    pub recommendations: Vec<String>,
    /// "low", "moderate", "high" or "emergency"
    pub urgency: String,
    #[serde(default)]
    pub see_doctor: bool,
    #[serde(default = "default_disclaimer")]
    pub disclaimer: String,
}

pub fn default_disclaimer() -> String {
    "This is not a medical diagnosis. Consult a qualified doctor for any health concern.".to_string()
}

/// Persisted symptom report (collection "symptom_reports")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomReport {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub user_id: String,

    pub symptoms: Vec<String>,
    pub duration_days: u32,
    /// Self-reported severity, 1 (mild) to 10 (worst imaginable)
    pub severity: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_notes: Option<String>,

    pub analysis: SymptomAnalysis,
    /// "gemini" or "fallback"
    pub source: String,

    pub created_at: Option<BsonDateTime>,
}

/// Report shape returned by the history endpoint
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SymptomReportResponse {
    pub id: String,
    pub symptoms: Vec<String>,
    pub duration_days: u32,
    pub severity: u8,
    pub additional_notes: Option<String>,
    pub analysis: SymptomAnalysis,
    pub source: String,
    /// Epoch millis
    pub created_at: i64,
}

impl From<SymptomReport> for SymptomReportResponse {
    fn from(r: SymptomReport) -> Self {
        SymptomReportResponse {
            id: r.id.map(|id| id.to_hex()).unwrap_or_default(),
            symptoms: r.symptoms,
            duration_days: r.duration_days,
            severity: r.severity,
            additional_notes: r.additional_notes,
            analysis: r.analysis,
            source: r.source,
            created_at: r.created_at.map(|t| t.timestamp_millis()).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_parses_with_missing_optional_fields() {
        let raw = r#"{
            "possible_conditions": [{"name": "Viral fever", "likelihood": "high"}],
            "recommendations": ["Rest and hydrate"],
            "urgency": "low"
        }"#;

        let analysis: SymptomAnalysis = serde_json::from_str(raw).unwrap();
        assert!(!analysis.see_doctor);
        assert!(analysis.disclaimer.contains("not a medical diagnosis"));
    }

    #[test]
    fn test_analysis_rejects_missing_urgency() {
        let raw = r#"{"possible_conditions": [], "recommendations": []}"#;
        assert!(serde_json::from_str::<SymptomAnalysis>(raw).is_err());
    }
}
