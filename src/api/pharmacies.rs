use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::api::metrics;
use crate::database::MongoDB;
use crate::services::auth_service::Claims;
use crate::services::pharmacy_service::{self, AllocateRequest, AllocationPlan, ConfirmRequest};
use crate::utils::error::AppError;

#[derive(Deserialize)]
pub struct NearbyQuery {
    lat: Option<f64>,
    lng: Option<f64>,
    limit: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/api/v1/pharmacies",
    tag = "Pharmacies",
    responses(
        (status = 200, description = "All active pharmacies")
    )
)]
pub async fn list(db: web::Data<MongoDB>) -> HttpResponse {
    metrics::increment_request_count();
    log::info!("🏪 GET /pharmacies");

    match pharmacy_service::list_pharmacies(&db).await {
        Ok(pharmacies) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Pharmacies retrieved",
            "data": pharmacies
        })),
        Err(e) => {
            metrics::increment_error_count();
            log::error!("❌ Failed to list pharmacies: {}", e);
            e.to_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/pharmacies/nearby",
    tag = "Pharmacies",
    params(
        ("lat" = f64, Query, description = "Caller latitude"),
        ("lng" = f64, Query, description = "Caller longitude"),
        ("limit" = Option<usize>, Query, description = "Max results (1-20, default 5)")
    ),
    responses(
        (status = 200, description = "Active pharmacies ranked by distance"),
        (status = 400, description = "Missing or out-of-range coordinates")
    )
)]
pub async fn nearby(db: web::Data<MongoDB>, query: web::Query<NearbyQuery>) -> HttpResponse {
    metrics::increment_request_count();

    let (lat, lng) = match (query.lat, query.lng) {
        (Some(lat), Some(lng)) => (lat, lng),
        _ => {
            metrics::increment_error_count();
            return AppError::Validation(vec![
                "lat and lng query parameters are required".to_string(),
            ])
            .to_response();
        }
    };

    log::info!("📍 GET /pharmacies/nearby - lat: {}, lng: {}", lat, lng);

    match pharmacy_service::nearby(&db, lat, lng, query.limit).await {
        Ok(pharmacies) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Nearby pharmacies retrieved",
            "data": pharmacies
        })),
        Err(e) => {
            metrics::increment_error_count();
            log::warn!("❌ Nearby lookup failed: {}", e);
            e.to_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/pharmacies/allocate",
    tag = "Pharmacies",
    request_body = AllocateRequest,
    responses(
        (status = 200, description = "Allocation plan", body = AllocationPlan),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn allocate(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    request: web::Json<AllocateRequest>,
) -> HttpResponse {
    metrics::increment_request_count();
    log::info!(
        "💊 POST /pharmacies/allocate - user: {}, items: {}",
        user.sub,
        request.items.len()
    );

    match pharmacy_service::allocate(&db, &request).await {
        Ok(plan) => {
            if !plan.unavailable.is_empty() {
                log::warn!(
                    "⚠️ Allocation for {} left {} item(s) unfilled",
                    user.sub,
                    plan.unavailable.len()
                );
            }
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Allocation planned",
                "data": plan
            }))
        }
        Err(e) => {
            metrics::increment_error_count();
            log::warn!("❌ Allocation failed for {}: {}", user.sub, e);
            e.to_response()
        }
    }
}

pub async fn confirm(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    request: web::Json<ConfirmRequest>,
) -> HttpResponse {
    metrics::increment_request_count();
    log::info!(
        "🧾 POST /pharmacies/allocations/confirm - user: {}, lines: {}",
        user.sub,
        request.allocations.len()
    );

    match pharmacy_service::confirm_allocation(&db, &request).await {
        Ok(outcome) => {
            if let Some(failure) = &outcome.failed {
                metrics::increment_error_count();

                // Best-effort semantics: earlier lines stay decremented, the
                // response spells out both sides
                let mut errors = vec![format!(
                    "failed: {} x{} at {} ({})",
                    failure.line.medicine,
                    failure.line.quantity,
                    failure.line.pharmacy_id,
                    failure.reason
                )];
                for line in &outcome.applied {
                    errors.push(format!(
                        "applied: {} x{} at {}",
                        line.medicine, line.quantity, line.pharmacy_id
                    ));
                }

                return HttpResponse::Conflict().json(serde_json::json!({
                    "success": false,
                    "message": "Allocation could not be fully applied",
                    "errors": errors
                }));
            }

            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Allocation confirmed",
                "data": outcome
            }))
        }
        Err(e) => {
            metrics::increment_error_count();
            log::warn!("❌ Allocation confirm failed for {}: {}", user.sub, e);
            e.to_response()
        }
    }
}
