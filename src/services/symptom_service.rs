/// Symptom analysis: Gemini-backed triage with a hardcoded fallback so the
/// endpoint keeps answering when the AI is unavailable.
use crate::database::MongoDB;
use crate::models::{ConditionGuess, SymptomAnalysis, SymptomReport, SymptomReportResponse};
use crate::services::gemini_service;
use crate::utils::cache;
use crate::utils::error::AppError;
use mongodb::bson::{doc, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

/// Severity at or above this value always escalates to "emergency"
pub const EMERGENCY_SEVERITY_THRESHOLD: u8 = 8;

pub const ANALYSIS_CACHE_TTL_SECONDS: u64 = 3600;

pub const DEFAULT_HISTORY_LIMIT: i64 = 20;
pub const MAX_HISTORY_LIMIT: i64 = 100;

const EMERGENCY_ADVICE: &str =
    "Call 108 or go to the nearest emergency room immediately. Do not wait for an online consultation.";

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AnalyzeRequest {
    pub symptoms: Vec<String>,
    pub duration_days: u32,
    /// Self-rated severity, 1 (mild) to 10 (worst imaginable)
    pub severity: u8,
    pub additional_notes: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AnalyzeResponse {
    /// Persisted report id, when saving succeeded
    pub report_id: Option<String>,
    /// "gemini" or "fallback"
    pub source: String,
    pub cached: bool,
    pub analysis: SymptomAnalysis,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct EmergencyRequest {
    pub severity: u8,
    #[serde(default)]
    pub symptoms: Vec<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct EmergencyAssessment {
    pub is_emergency: bool,
    pub severity: u8,
    pub threshold: u8,
    pub reported_symptoms: Vec<String>,
    pub advice: Vec<String>,
}

/// Cache entry: analysis plus where it came from
#[derive(Debug, Serialize, Deserialize)]
struct CachedAnalysis {
    source: String,
    analysis: SymptomAnalysis,
}

fn validate_analyze_request(request: &AnalyzeRequest) -> Vec<String> {
    let mut errors = Vec::new();

    if request.symptoms.iter().all(|s| s.trim().is_empty()) {
        errors.push("symptoms must contain at least one entry".to_string());
    }
    if !(1..=10).contains(&request.severity) {
        errors.push("severity must be between 1 and 10".to_string());
    }

    errors
}

/// Deterministic cache key: order and casing of symptoms must not matter.
fn analysis_cache_key(request: &AnalyzeRequest) -> String {
    let mut symptoms: Vec<String> = request
        .symptoms
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    symptoms.sort();
    symptoms.dedup();

    format!(
        "symptoms:{}:{}:{}",
        symptoms.join(","),
        request.duration_days,
        request.severity
    )
}

fn build_prompt(request: &AnalyzeRequest) -> String {
    let symptoms: Vec<&str> = request
        .symptoms
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    let mut prompt = format!(
        "You are a cautious medical triage assistant for an Indian telemedicine app.\n\
         A patient reports:\n\
         - Symptoms: {}\n\
         - Duration: {} day(s)\n\
         - Self-rated severity: {}/10\n",
        symptoms.join(", "),
        request.duration_days,
        request.severity
    );

    if let Some(notes) = &request.additional_notes {
        if !notes.trim().is_empty() {
            prompt.push_str(&format!("- Additional notes: {}\n", notes.trim()));
        }
    }

    prompt.push_str(
        "\nRespond with ONLY a JSON object, no markdown, in exactly this shape:\n\
         {\"possible_conditions\":[{\"name\":\"...\",\"likelihood\":\"high|moderate|low\"}],\
         \"recommendations\":[\"...\"],\"urgency\":\"low|moderate|high|emergency\",\
         \"see_doctor\":true,\"disclaimer\":\"...\"}\n\
         Suggest at most 3 conditions. Prefer common conditions unless the symptoms \
         clearly indicate something urgent. Never prescribe prescription-only medication.",
    );

    prompt
}

/// Static analysis used whenever Gemini is unavailable or unparseable.
pub fn fallback_analysis() -> SymptomAnalysis {
    SymptomAnalysis {
        possible_conditions: vec![
            ConditionGuess {
                name: "Common viral infection".to_string(),
                likelihood: "moderate".to_string(),
            },
            ConditionGuess {
                name: "Seasonal allergy".to_string(),
                likelihood: "low".to_string(),
            },
        ],
        recommendations: vec![
            "Rest and stay well hydrated".to_string(),
            "Monitor your temperature twice a day".to_string(),
            "Consult a doctor if symptoms persist beyond 3 days or worsen".to_string(),
        ],
        urgency: "moderate".to_string(),
        see_doctor: true,
        disclaimer: crate::models::symptom::default_disclaimer(),
    }
}

/// High self-rated severity always wins over whatever the model said.
fn apply_emergency_override(analysis: &mut SymptomAnalysis, severity: u8) {
    if severity >= EMERGENCY_SEVERITY_THRESHOLD {
        analysis.urgency = "emergency".to_string();
        analysis.see_doctor = true;
        if !analysis.recommendations.iter().any(|r| r.contains("108")) {
            analysis
                .recommendations
                .insert(0, EMERGENCY_ADVICE.to_string());
        }
    }
}

fn parse_analysis(reply: &str) -> Option<SymptomAnalysis> {
    let block = gemini_service::extract_json_block(reply)?;
    serde_json::from_str(&block).ok()
}

async fn run_analysis(request: &AnalyzeRequest) -> (SymptomAnalysis, String) {
    let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
    if api_key.is_empty() {
        log::warn!("⚠️ GEMINI_API_KEY not set - using fallback analysis");
        return (fallback_analysis(), "fallback".to_string());
    }

    let model = gemini_service::model_from_env();
    let prompt = build_prompt(request);

    match gemini_service::generate_content(&api_key, &model, &prompt).await {
        Ok(reply) => match parse_analysis(&reply) {
            Some(analysis) => {
                log::info!("🤖 Gemini analysis ready (model: {})", model);
                (analysis, "gemini".to_string())
            }
            None => {
                log::warn!("⚠️ Gemini reply was not parseable JSON - using fallback analysis");
                (fallback_analysis(), "fallback".to_string())
            }
        },
        Err(e) => {
            log::warn!("⚠️ Gemini call failed: {} - using fallback analysis", e);
            (fallback_analysis(), "fallback".to_string())
        }
    }
}

/// Persistence is best effort: a failed insert is logged, never fatal.
async fn persist_report(
    db: &MongoDB,
    user_id: &str,
    request: &AnalyzeRequest,
    analysis: &SymptomAnalysis,
    source: &str,
) -> Option<String> {
    let report = SymptomReport {
        id: None,
        user_id: user_id.to_string(),
        symptoms: request
            .symptoms
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        duration_days: request.duration_days,
        severity: request.severity,
        additional_notes: request.additional_notes.clone(),
        analysis: analysis.clone(),
        source: source.to_string(),
        created_at: Some(BsonDateTime::now()),
    };

    match db
        .collection::<SymptomReport>("symptom_reports")
        .insert_one(&report)
        .await
    {
        Ok(result) => result.inserted_id.as_object_id().map(|id| id.to_hex()),
        Err(e) => {
            log::error!("❌ Failed to persist symptom report: {}", e);
            None
        }
    }
}

/// Full analysis pipeline: validate, serve from cache if possible, call
/// Gemini (fallback on any failure), apply the emergency override, persist.
pub async fn analyze(
    db: &MongoDB,
    user_id: &str,
    request: &AnalyzeRequest,
) -> Result<AnalyzeResponse, AppError> {
    let errors = validate_analyze_request(request);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let cache_key = analysis_cache_key(request);

    if let Some(raw) = cache::get_cached(&cache_key, ANALYSIS_CACHE_TTL_SECONDS) {
        if let Ok(cached) = serde_json::from_str::<CachedAnalysis>(&raw) {
            log::info!("⚡ Symptom analysis served from cache");
            let report_id = persist_report(db, user_id, request, &cached.analysis, &cached.source).await;
            return Ok(AnalyzeResponse {
                report_id,
                source: cached.source,
                cached: true,
                analysis: cached.analysis,
            });
        }
    }

    let (mut analysis, source) = run_analysis(request).await;
    apply_emergency_override(&mut analysis, request.severity);

    if let Ok(serialized) = serde_json::to_string(&CachedAnalysis {
        source: source.clone(),
        analysis: analysis.clone(),
    }) {
        cache::set_cache(cache_key, serialized);
    }

    let report_id = persist_report(db, user_id, request, &analysis, &source).await;

    Ok(AnalyzeResponse {
        report_id,
        source,
        cached: false,
        analysis,
    })
}

/// Most recent reports first.
pub async fn history(
    db: &MongoDB,
    user_id: &str,
    limit: Option<i64>,
) -> Result<Vec<SymptomReportResponse>, AppError> {
    let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT);

    let collection = db.collection::<SymptomReport>("symptom_reports");

    let mut cursor = collection
        .find(doc! { "user_id": user_id })
        .sort(doc! { "created_at": -1 })
        .limit(limit)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Database error: {}", e)))?;

    let mut reports = Vec::new();

    use futures::stream::StreamExt;

    while let Some(result) = cursor.next().await {
        match result {
            Ok(report) => reports.push(SymptomReportResponse::from(report)),
            Err(e) => {
                log::error!("Error reading symptom report: {}", e);
            }
        }
    }

    Ok(reports)
}

/// Pure threshold check. No external calls, usable even when everything
/// else is down.
pub fn emergency_check(request: &EmergencyRequest) -> EmergencyAssessment {
    let is_emergency = request.severity >= EMERGENCY_SEVERITY_THRESHOLD;

    let advice = if is_emergency {
        vec![
            EMERGENCY_ADVICE.to_string(),
            "Keep the patient still and warm while help is on the way".to_string(),
        ]
    } else {
        vec![
            "Your reported severity is below the emergency threshold".to_string(),
            "Use the symptom analysis endpoint for a detailed assessment".to_string(),
        ]
    };

    EmergencyAssessment {
        is_emergency,
        severity: request.severity,
        threshold: EMERGENCY_SEVERITY_THRESHOLD,
        reported_symptoms: request.symptoms.clone(),
        advice,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> AnalyzeRequest {
        AnalyzeRequest {
            symptoms: vec!["Fever".to_string(), "cough ".to_string()],
            duration_days: 3,
            severity: 5,
            additional_notes: None,
        }
    }

    #[test]
    fn test_validation_rejects_empty_symptoms() {
        let request = AnalyzeRequest {
            symptoms: vec!["  ".to_string()],
            duration_days: 1,
            severity: 5,
            additional_notes: None,
        };
        let errors = validate_analyze_request(&request);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("symptoms"));
    }

    #[test]
    fn test_validation_rejects_severity_out_of_range() {
        let mut request = sample_request();
        request.severity = 0;
        assert!(!validate_analyze_request(&request).is_empty());
        request.severity = 11;
        assert!(!validate_analyze_request(&request).is_empty());
        request.severity = 10;
        assert!(validate_analyze_request(&request).is_empty());
    }

    #[test]
    fn test_cache_key_ignores_order_case_and_duplicates() {
        let a = AnalyzeRequest {
            symptoms: vec!["Fever".to_string(), "cough".to_string(), "FEVER".to_string()],
            duration_days: 3,
            severity: 5,
            additional_notes: None,
        };
        let b = AnalyzeRequest {
            symptoms: vec!["cough".to_string(), "fever".to_string()],
            duration_days: 3,
            severity: 5,
            additional_notes: Some("irrelevant for the key".to_string()),
        };
        assert_eq!(analysis_cache_key(&a), analysis_cache_key(&b));
    }

    #[test]
    fn test_cache_key_differs_on_severity() {
        let a = sample_request();
        let mut b = sample_request();
        b.severity = 9;
        assert_ne!(analysis_cache_key(&a), analysis_cache_key(&b));
    }

    #[test]
    fn test_prompt_contains_patient_details() {
        let mut request = sample_request();
        request.additional_notes = Some("diabetic".to_string());
        let prompt = build_prompt(&request);
        assert!(prompt.contains("Fever, cough"));
        assert!(prompt.contains("3 day(s)"));
        assert!(prompt.contains("5/10"));
        assert!(prompt.contains("diabetic"));
        assert!(prompt.contains("ONLY a JSON object"));
    }

    #[test]
    fn test_parse_analysis_accepts_fenced_reply() {
        let reply = "```json\n{\"possible_conditions\":[{\"name\":\"Migraine\",\"likelihood\":\"high\"}],\"recommendations\":[\"Rest in a dark room\"],\"urgency\":\"low\",\"see_doctor\":false,\"disclaimer\":\"Not a diagnosis.\"}\n```";
        let analysis = parse_analysis(reply).unwrap();
        assert_eq!(analysis.possible_conditions[0].name, "Migraine");
        assert_eq!(analysis.urgency, "low");
    }

    #[test]
    fn test_parse_analysis_rejects_prose() {
        assert!(parse_analysis("I think you have a cold, rest well!").is_none());
    }

    #[test]
    fn test_emergency_override_forces_urgency() {
        let mut analysis = fallback_analysis();
        analysis.urgency = "low".to_string();
        analysis.see_doctor = false;

        apply_emergency_override(&mut analysis, 8);

        assert_eq!(analysis.urgency, "emergency");
        assert!(analysis.see_doctor);
        assert!(analysis.recommendations[0].contains("108"));
    }

    #[test]
    fn test_emergency_override_noop_below_threshold() {
        let mut analysis = fallback_analysis();
        let before = analysis.recommendations.len();

        apply_emergency_override(&mut analysis, 7);

        assert_eq!(analysis.urgency, "moderate");
        assert_eq!(analysis.recommendations.len(), before);
    }

    #[test]
    fn test_emergency_override_does_not_duplicate_advice() {
        let mut analysis = fallback_analysis();
        apply_emergency_override(&mut analysis, 9);
        apply_emergency_override(&mut analysis, 9);

        let count = analysis
            .recommendations
            .iter()
            .filter(|r| r.contains("108"))
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_emergency_check_boundaries() {
        let below = emergency_check(&EmergencyRequest { severity: 7, symptoms: vec![] });
        assert!(!below.is_emergency);

        let at = emergency_check(&EmergencyRequest { severity: 8, symptoms: vec![] });
        assert!(at.is_emergency);
        assert!(at.advice[0].contains("108"));

        let above = emergency_check(&EmergencyRequest { severity: 10, symptoms: vec![] });
        assert!(above.is_emergency);
    }

    #[test]
    fn test_fallback_is_cautious() {
        let analysis = fallback_analysis();
        assert!(analysis.see_doctor);
        assert!(!analysis.possible_conditions.is_empty());
        assert!(!analysis.recommendations.is_empty());
    }
}
