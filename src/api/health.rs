use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::database::{MongoDB, RedisStore};

const PING_BUDGET: Duration = Duration::from_secs(2);

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: i64,
    pub mongo: bool,
    pub redis: bool,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service health with dependency checks", body = HealthResponse)
    )
)]
pub async fn health_check(
    db: web::Data<MongoDB>,
    redis: web::Data<RedisStore>,
) -> impl Responder {
    let (mongo_ping, redis_ping) = tokio::join!(
        tokio::time::timeout(PING_BUDGET, db.ping()),
        tokio::time::timeout(PING_BUDGET, redis.ping()),
    );

    let mongo = matches!(mongo_ping, Ok(Ok(())));
    let redis_up = matches!(redis_ping, Ok(Ok(())));

    let status = if mongo && redis_up {
        "healthy"
    } else {
        log::warn!("⚠️ Health degraded - mongo: {}, redis: {}", mongo, redis_up);
        "degraded"
    };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        service: "telemed-service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().timestamp(),
        mongo,
        redis: redis_up,
    })
}
