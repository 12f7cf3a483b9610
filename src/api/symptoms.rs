use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::api::metrics;
use crate::database::MongoDB;
use crate::services::auth_service::Claims;
use crate::services::symptom_service::{self, AnalyzeRequest, AnalyzeResponse, EmergencyRequest};
use crate::utils::error::AppError;

#[derive(Deserialize)]
pub struct HistoryQuery {
    limit: Option<i64>,
}

#[utoipa::path(
    post,
    path = "/api/v1/symptoms/analyze",
    tag = "Symptoms",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Symptom analysis", body = AnalyzeResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn analyze(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    request: web::Json<AnalyzeRequest>,
) -> HttpResponse {
    metrics::increment_request_count();
    log::info!(
        "🩺 POST /symptoms/analyze - user: {}, severity: {}",
        user.sub,
        request.severity
    );

    match symptom_service::analyze(&db, &user.sub, &request).await {
        Ok(response) => {
            metrics::increment_analyses_count();
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Symptom analysis complete",
                "data": response
            }))
        }
        Err(e) => {
            metrics::increment_error_count();
            log::warn!("❌ Symptom analysis failed for {}: {}", user.sub, e);
            e.to_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/symptoms/history",
    tag = "Symptoms",
    params(
        ("limit" = Option<i64>, Query, description = "Max reports to return (1-100, default 20)")
    ),
    responses(
        (status = 200, description = "Past symptom reports, newest first"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn history(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    query: web::Query<HistoryQuery>,
) -> HttpResponse {
    metrics::increment_request_count();
    log::info!("📋 GET /symptoms/history - user: {}", user.sub);

    match symptom_service::history(&db, &user.sub, query.limit).await {
        Ok(reports) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Symptom history retrieved",
            "data": reports
        })),
        Err(e) => {
            metrics::increment_error_count();
            log::error!("❌ Failed to load history for {}: {}", user.sub, e);
            e.to_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/symptoms/emergency",
    tag = "Symptoms",
    request_body = EmergencyRequest,
    responses(
        (status = 200, description = "Emergency assessment"),
        (status = 400, description = "Severity out of range"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn emergency(
    user: web::ReqData<Claims>,
    request: web::Json<EmergencyRequest>,
) -> HttpResponse {
    metrics::increment_request_count();
    log::info!(
        "🚨 POST /symptoms/emergency - user: {}, severity: {}",
        user.sub,
        request.severity
    );

    if !(1..=10).contains(&request.severity) {
        metrics::increment_error_count();
        return AppError::Validation(vec!["severity must be between 1 and 10".to_string()])
            .to_response();
    }

    let assessment = symptom_service::emergency_check(&request);

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Emergency assessment complete",
        "data": assessment
    }))
}
