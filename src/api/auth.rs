use actix_web::{web, HttpRequest, HttpResponse};

use crate::api::metrics;
use crate::database::{MongoDB, RedisStore};
use crate::services::auth_service::{
    self, AuthResponse, LoginRequest, OtpSentResponse, RegisterRequest, RegisterResponse,
    SendOtpRequest, VerifyOtpRequest,
};
use crate::services::sms_service::SmsSender;
use crate::utils::otp::mask_mobile;

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, OTP sent", body = RegisterResponse),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Mobile number already registered")
    )
)]
pub async fn register(
    db: web::Data<MongoDB>,
    redis: web::Data<RedisStore>,
    sms: web::Data<dyn SmsSender>,
    request: web::Json<RegisterRequest>,
) -> HttpResponse {
    metrics::increment_request_count();
    log::info!(
        "📝 POST /auth/register - mobile: {}",
        mask_mobile(&request.mobile_number)
    );

    match auth_service::register(&db, &redis, sms.get_ref(), &request).await {
        Ok(response) => {
            metrics::increment_otp_sent_count();
            HttpResponse::Created().json(serde_json::json!({
                "success": true,
                "message": "Registration received. Verify the OTP sent to your mobile",
                "data": response
            }))
        }
        Err(e) => {
            metrics::increment_error_count();
            log::warn!("❌ Registration failed: {}", e);
            e.to_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/otp/send",
    tag = "Auth",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "OTP sent", body = OtpSentResponse),
        (status = 400, description = "Cooldown active or account already verified"),
        (status = 404, description = "Mobile number not registered")
    )
)]
pub async fn send_otp(
    db: web::Data<MongoDB>,
    redis: web::Data<RedisStore>,
    sms: web::Data<dyn SmsSender>,
    request: web::Json<SendOtpRequest>,
) -> HttpResponse {
    metrics::increment_request_count();
    log::info!(
        "📨 POST /auth/otp/send - mobile: {}",
        mask_mobile(&request.mobile_number)
    );

    match auth_service::send_otp(&db, &redis, sms.get_ref(), &request).await {
        Ok(response) => {
            metrics::increment_otp_sent_count();
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "OTP sent",
                "data": response
            }))
        }
        Err(e) => {
            metrics::increment_error_count();
            log::warn!("❌ OTP send failed: {}", e);
            e.to_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/otp/verify",
    tag = "Auth",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Mobile verified, tokens issued", body = AuthResponse),
        (status = 400, description = "Wrong, expired or locked-out OTP"),
        (status = 404, description = "Mobile number not registered")
    )
)]
pub async fn verify_otp(
    db: web::Data<MongoDB>,
    redis: web::Data<RedisStore>,
    request: web::Json<VerifyOtpRequest>,
) -> HttpResponse {
    metrics::increment_request_count();
    log::info!(
        "🔍 POST /auth/otp/verify - mobile: {}",
        mask_mobile(&request.mobile_number)
    );

    match auth_service::verify_otp(&db, &redis, &request).await {
        Ok(response) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Mobile number verified",
            "data": response
        })),
        Err(e) => {
            metrics::increment_error_count();
            log::warn!("❌ OTP verification failed: {}", e);
            e.to_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials or unverified mobile")
    )
)]
pub async fn login(
    db: web::Data<MongoDB>,
    request: web::Json<LoginRequest>,
) -> HttpResponse {
    metrics::increment_request_count();
    log::info!(
        "🔐 POST /auth/login - mobile: {}",
        mask_mobile(&request.mobile_number)
    );

    match auth_service::login(&db, &request).await {
        Ok(response) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Login successful",
            "data": response
        })),
        Err(e) => {
            metrics::increment_error_count();
            log::warn!(
                "❌ Login failed: {} - {}",
                mask_mobile(&request.mobile_number),
                e
            );
            e.to_response()
        }
    }
}

pub async fn refresh_token(
    db: web::Data<MongoDB>,
    request: web::Json<auth_service::RefreshTokenRequest>,
) -> HttpResponse {
    metrics::increment_request_count();
    log::info!("🔄 POST /auth/refresh");

    match auth_service::refresh_token(&db, &request).await {
        Ok(response) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Token refreshed",
            "data": response
        })),
        Err(e) => {
            metrics::increment_error_count();
            log::warn!("❌ Token refresh failed: {}", e);
            e.to_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user profile"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(db: web::Data<MongoDB>, req: HttpRequest) -> HttpResponse {
    metrics::increment_request_count();
    log::info!("👤 GET /auth/me");

    let auth_header = req.headers().get("Authorization");

    if let Some(auth_value) = auth_header {
        if let Ok(auth_str) = auth_value.to_str() {
            if auth_str.starts_with("Bearer ") {
                let token = &auth_str[7..];

                match auth_service::verify_token(token) {
                    Ok(claims) => {
                        return match auth_service::get_current_user(&db, &claims.sub).await {
                            Ok(user) => HttpResponse::Ok().json(serde_json::json!({
                                "success": true,
                                "message": "User retrieved",
                                "data": user
                            })),
                            Err(e) => {
                                metrics::increment_error_count();
                                log::error!("❌ Failed to load user {}: {}", claims.sub, e);
                                e.to_response()
                            }
                        };
                    }
                    Err(e) => {
                        metrics::increment_error_count();
                        log::warn!("❌ Invalid token: {}", e);
                        return crate::utils::error::AppError::Unauthorized(
                            "Invalid or expired token".to_string(),
                        )
                        .to_response();
                    }
                }
            }
        }
    }

    metrics::increment_error_count();
    crate::utils::error::AppError::Unauthorized("Missing authorization token".to_string())
        .to_response()
}

/// Deletes the account and every symptom report linked to it.
pub async fn delete_account(db: web::Data<MongoDB>, req: HttpRequest) -> HttpResponse {
    metrics::increment_request_count();
    log::info!("🗑️ DELETE /auth/account");

    let auth_header = req.headers().get("Authorization");

    if let Some(auth_value) = auth_header {
        if let Ok(auth_str) = auth_value.to_str() {
            if auth_str.starts_with("Bearer ") {
                let token = &auth_str[7..];

                match auth_service::verify_token(token) {
                    Ok(claims) => {
                        return match auth_service::delete_user_account(&db, &claims.sub).await {
                            Ok(_) => HttpResponse::Ok().json(serde_json::json!({
                                "success": true,
                                "message": "Account deleted successfully"
                            })),
                            Err(e) => {
                                metrics::increment_error_count();
                                log::error!("❌ Failed to delete account {}: {}", claims.sub, e);
                                e.to_response()
                            }
                        };
                    }
                    Err(e) => {
                        metrics::increment_error_count();
                        log::warn!("❌ Invalid token: {}", e);
                        return crate::utils::error::AppError::Unauthorized(
                            "Invalid or expired token".to_string(),
                        )
                        .to_response();
                    }
                }
            }
        }
    }

    metrics::increment_error_count();
    crate::utils::error::AppError::Unauthorized("Missing authorization token".to_string())
        .to_response()
}
