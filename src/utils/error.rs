use actix_web::HttpResponse;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    DatabaseError(String),
    RedisError(String),
    SmsError(String),
    NotFound(String),
    InvalidRequest(String),
    Validation(Vec<String>),
    Conflict(String),
    Unauthorized(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::RedisError(msg) => write!(f, "Redis error: {}", msg),
            AppError::SmsError(msg) => write!(f, "SMS error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            AppError::Validation(errors) => write!(f, "Validation failed: {}", errors.join(", ")),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Maps the error onto the response envelope used by every endpoint.
    pub fn to_response(&self) -> HttpResponse {
        match self {
            AppError::Validation(errors) => HttpResponse::BadRequest().json(json!({
                "success": false,
                "message": "Validation failed",
                "errors": errors
            })),
            AppError::InvalidRequest(msg) => HttpResponse::BadRequest().json(json!({
                "success": false,
                "message": msg,
                "errors": [msg]
            })),
            AppError::Unauthorized(msg) => HttpResponse::Unauthorized().json(json!({
                "success": false,
                "message": msg,
                "errors": [msg]
            })),
            AppError::NotFound(msg) => HttpResponse::NotFound().json(json!({
                "success": false,
                "message": msg,
                "errors": [msg]
            })),
            AppError::Conflict(msg) => HttpResponse::Conflict().json(json!({
                "success": false,
                "message": msg,
                "errors": [msg]
            })),
            AppError::DatabaseError(msg)
            | AppError::RedisError(msg)
            | AppError::SmsError(msg)
            | AppError::Internal(msg) => HttpResponse::InternalServerError().json(json!({
                "success": false,
                "message": msg,
                "errors": [msg]
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::NotFound("user".to_string()).to_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Conflict("exists".to_string()).to_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Validation(vec!["bad".to_string()]).to_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::RedisError("down".to_string()).to_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_display_includes_context() {
        let err = AppError::Unauthorized("bad token".to_string());
        assert_eq!(format!("{}", err), "Unauthorized: bad token");
    }
}
