use crate::database::{MongoDB, RedisStore};
use crate::models::{User, UserInfo};
use crate::services::otp_service;
use crate::services::sms_service::SmsSender;
use crate::utils::error::AppError;
use crate::utils::otp::{
    mask_mobile, normalize_mobile, validate_aadhaar, validate_dob, validate_gender, validate_pin,
    OTP_LENGTH,
};
use crate::utils::thread_pool::spawn_hash_blocking;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,            // user_id
    pub mobile_number: String,
    pub name: String,
    pub is_verified: bool,
    pub iat: usize,             // issued at
    pub exp: usize,             // expiration
    pub jti: String,            // JWT ID
    pub aud: String,            // audience
    pub iss: String,            // issuer
}

// Request/Response structures
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub mobile_number: String,
    pub pin: String,
    pub name: String,
    /// YYYY-MM-DD
    pub dob: String,
    /// "male", "female" or "other"
    pub gender: String,
    pub aadhaar_id: Option<String>,
    pub device_id: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub mobile_number: String,
    pub pin: String,
    pub device_id: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SendOtpRequest {
    pub mobile_number: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct VerifyOtpRequest {
    pub mobile_number: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: Option<String>,
    pub user: UserInfo,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RegisterResponse {
    pub user_id: String,
    pub mobile_number: String,
    pub otp_channel: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct OtpSentResponse {
    pub mobile_number: String,
    pub otp_channel: String,
    pub expires_in_seconds: u64,
}

fn get_jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "default-secret-change-me".to_string())
}

fn get_jwt_issuer() -> String {
    std::env::var("JWT_ISSUER").unwrap_or_else(|_| "telemed-service".to_string())
}

fn get_jwt_audience() -> String {
    std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "telemed-api".to_string())
}

// Generate JWT token
pub fn generate_jwt(user: &User) -> Result<String, String> {
    let iat = Utc::now().timestamp() as usize;
    let exp = (Utc::now() + Duration::hours(24)).timestamp() as usize;
    let jti = Uuid::new_v4().to_string();

    let claims = Claims {
        sub: user.user_id.clone(),
        mobile_number: user.mobile_number.clone(),
        name: user.name.clone(),
        is_verified: user.is_verified,
        iat,
        exp,
        jti,
        aud: get_jwt_audience(),
        iss: get_jwt_issuer(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(get_jwt_secret().as_ref()),
    )
    .map_err(|e| format!("Failed to generate token: {}", e))
}

// Generate refresh token (longer expiry)
pub fn generate_refresh_token(user_id: &str) -> Result<String, String> {
    let iat = Utc::now().timestamp() as usize;
    let exp = (Utc::now() + Duration::days(30)).timestamp() as usize;
    let jti = Uuid::new_v4().to_string();

    let claims = Claims {
        sub: user_id.to_string(),
        mobile_number: String::new(),
        name: String::new(),
        is_verified: true,
        iat,
        exp,
        jti,
        aud: get_jwt_audience(),
        iss: get_jwt_issuer(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(get_jwt_secret().as_ref()),
    )
    .map_err(|e| format!("Failed to generate refresh token: {}", e))
}

// Verify JWT token
pub fn verify_token(token: &str) -> Result<Claims, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[get_jwt_audience()]);

    let mut issuers = HashSet::new();
    issuers.insert(get_jwt_issuer());
    validation.iss = Some(issuers);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(get_jwt_secret().as_ref()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))
}

/// Validates a registration payload. Returns the normalized mobile number
/// on success, or every field error at once.
fn validate_register(request: &RegisterRequest) -> Result<String, Vec<String>> {
    let mut errors = Vec::new();

    let mobile = normalize_mobile(&request.mobile_number);
    if mobile.is_none() {
        errors.push("mobile_number must be a valid 10-digit Indian mobile number".to_string());
    }
    if !validate_pin(&request.pin) {
        errors.push("pin must be 4 to 6 digits".to_string());
    }
    if request.name.trim().is_empty() {
        errors.push("name must not be empty".to_string());
    }
    if !validate_dob(&request.dob) {
        errors.push("dob must be a past date in YYYY-MM-DD format".to_string());
    }
    if !validate_gender(&request.gender) {
        errors.push("gender must be one of male, female or other".to_string());
    }
    if let Some(aadhaar) = &request.aadhaar_id {
        if !validate_aadhaar(aadhaar) {
            errors.push("aadhaar_id must be exactly 12 digits".to_string());
        }
    }

    match (mobile, errors.is_empty()) {
        (Some(m), true) => Ok(m),
        _ => Err(errors),
    }
}

async fn hash_pin(pin: String) -> Result<String, AppError> {
    spawn_hash_blocking(move || hash(&pin, DEFAULT_COST))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Failed to hash PIN: {}", e)))
}

async fn verify_pin(pin: String, pin_hash: String) -> Result<bool, AppError> {
    spawn_hash_blocking(move || verify(&pin, &pin_hash))
        .await
        .map_err(|e| AppError::Internal(format!("PIN verification task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("PIN verification error: {}", e)))
}

/// User registration. Creates (or refreshes) an unverified account and
/// dispatches an OTP to the mobile number. No tokens are issued until the
/// number is verified.
pub async fn register(
    db: &MongoDB,
    redis: &RedisStore,
    sms: &dyn SmsSender,
    request: &RegisterRequest,
) -> Result<RegisterResponse, AppError> {
    let mobile = validate_register(request).map_err(AppError::Validation)?;

    let collection = db.collection::<User>("users");

    let existing = collection
        .find_one(doc! { "mobile_number": &mobile })
        .await
        .map_err(|e| AppError::DatabaseError(format!("Database error: {}", e)))?;

    if let Some(user) = &existing {
        if user.is_verified {
            return Err(AppError::Conflict(
                "An account with this mobile number already exists".to_string(),
            ));
        }
    }

    let pin_hash = hash_pin(request.pin.clone()).await?;

    let user_id = match existing {
        Some(user) => {
            // Unverified re-registration replaces the pending profile
            let update = doc! {
                "$set": {
                    "pin_hash": &pin_hash,
                    "name": request.name.trim(),
                    "dob": &request.dob,
                    "gender": request.gender.to_lowercase(),
                    "aadhaar_id": request.aadhaar_id.clone(),
                    "device_id": request.device_id.clone(),
                    "updated_at": BsonDateTime::now(),
                }
            };

            collection
                .update_one(doc! { "user_id": &user.user_id }, update)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to update pending registration: {}", e)))?;

            log::info!("♻️ Pending registration refreshed for {}", mask_mobile(&mobile));
            user.user_id
        }
        None => {
            let new_user_id = ObjectId::new().to_hex();

            let new_user = User {
                id: None,
                user_id: new_user_id.clone(),
                mobile_number: mobile.clone(),
                pin_hash,
                name: request.name.trim().to_string(),
                dob: request.dob.clone(),
                gender: request.gender.to_lowercase(),
                aadhaar_id: request.aadhaar_id.clone(),
                device_id: request.device_id.clone(),
                is_verified: false,
                created_at: Some(BsonDateTime::now()),
                updated_at: Some(BsonDateTime::now()),
                last_login: None,
            };

            collection
                .insert_one(&new_user)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to create user: {}", e)))?;

            log::info!(
                "✅ User registered (pending verification): {}",
                mask_mobile(&mobile)
            );
            new_user_id
        }
    };

    let delivery = otp_service::issue_otp(redis, sms, &mobile).await?;

    Ok(RegisterResponse {
        user_id,
        mobile_number: mobile,
        otp_channel: delivery.channel.to_string(),
    })
}

/// Resends an OTP to a registered but not yet verified mobile number.
pub async fn send_otp(
    db: &MongoDB,
    redis: &RedisStore,
    sms: &dyn SmsSender,
    request: &SendOtpRequest,
) -> Result<OtpSentResponse, AppError> {
    let mobile = normalize_mobile(&request.mobile_number).ok_or_else(|| {
        AppError::Validation(vec![
            "mobile_number must be a valid 10-digit Indian mobile number".to_string(),
        ])
    })?;

    let collection = db.collection::<User>("users");

    let user = collection
        .find_one(doc! { "mobile_number": &mobile })
        .await
        .map_err(|e| AppError::DatabaseError(format!("Database error: {}", e)))?
        .ok_or_else(|| {
            AppError::NotFound("No account registered for this mobile number".to_string())
        })?;

    if user.is_verified {
        return Err(AppError::InvalidRequest(
            "Account is already verified. Please login".to_string(),
        ));
    }

    let delivery = otp_service::issue_otp(redis, sms, &mobile).await?;

    Ok(OtpSentResponse {
        mobile_number: mask_mobile(&mobile),
        otp_channel: delivery.channel.to_string(),
        expires_in_seconds: otp_service::OTP_TTL_SECONDS,
    })
}

/// Confirms the OTP, marks the account verified and issues the first
/// token pair.
pub async fn verify_otp(
    db: &MongoDB,
    redis: &RedisStore,
    request: &VerifyOtpRequest,
) -> Result<AuthResponse, AppError> {
    let mobile = normalize_mobile(&request.mobile_number).ok_or_else(|| {
        AppError::Validation(vec![
            "mobile_number must be a valid 10-digit Indian mobile number".to_string(),
        ])
    })?;

    if request.otp.len() != OTP_LENGTH || !request.otp.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(vec![
            "otp must be a 6-digit numeric code".to_string(),
        ]));
    }

    let collection = db.collection::<User>("users");

    let mut user = collection
        .find_one(doc! { "mobile_number": &mobile })
        .await
        .map_err(|e| AppError::DatabaseError(format!("Database error: {}", e)))?
        .ok_or_else(|| {
            AppError::NotFound("No account registered for this mobile number".to_string())
        })?;

    if user.is_verified {
        return Err(AppError::InvalidRequest(
            "Account is already verified. Please login".to_string(),
        ));
    }

    otp_service::verify_otp(redis, &mobile, &request.otp).await?;

    let now = BsonDateTime::now();
    collection
        .update_one(
            doc! { "user_id": &user.user_id },
            doc! { "$set": { "is_verified": true, "last_login": now, "updated_at": now } },
        )
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to mark user verified: {}", e)))?;

    user.is_verified = true;
    user.last_login = Some(now);

    let token = generate_jwt(&user).map_err(AppError::Internal)?;
    let refresh_token = generate_refresh_token(&user.user_id).map_err(AppError::Internal)?;

    log::info!("✅ Mobile number verified: {}", mask_mobile(&mobile));

    Ok(AuthResponse {
        token,
        refresh_token: Some(refresh_token),
        user: UserInfo::from(user),
    })
}

/// User login with mobile number + PIN. Only verified accounts may log in.
pub async fn login(db: &MongoDB, request: &LoginRequest) -> Result<AuthResponse, AppError> {
    // A malformed mobile can never match an account
    let mobile = normalize_mobile(&request.mobile_number)
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    let collection = db.collection::<User>("users");

    let user = collection
        .find_one(doc! { "mobile_number": &mobile })
        .await
        .map_err(|e| AppError::DatabaseError(format!("Database error: {}", e)))?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    let valid = verify_pin(request.pin.clone(), user.pin_hash.clone()).await?;

    if !valid {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    if !user.is_verified {
        return Err(AppError::Unauthorized(
            "Mobile number not verified. Please complete OTP verification".to_string(),
        ));
    }

    let now = BsonDateTime::now();
    let mut fields = doc! { "last_login": now, "updated_at": now };
    if let Some(device_id) = &request.device_id {
        fields.insert("device_id", device_id.as_str());
    }

    collection
        .update_one(doc! { "user_id": &user.user_id }, doc! { "$set": fields })
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to update last login: {}", e)))?;

    let token = generate_jwt(&user).map_err(AppError::Internal)?;
    let refresh_token = generate_refresh_token(&user.user_id).map_err(AppError::Internal)?;

    log::info!("🔓 Login: {}", mask_mobile(&user.mobile_number));

    Ok(AuthResponse {
        token,
        refresh_token: Some(refresh_token),
        user: UserInfo::from(user),
    })
}

// Refresh token
pub async fn refresh_token(
    db: &MongoDB,
    request: &RefreshTokenRequest,
) -> Result<AuthResponse, AppError> {
    let claims = verify_token(&request.refresh_token).map_err(AppError::Unauthorized)?;

    let collection = db.collection::<User>("users");

    let user = collection
        .find_one(doc! { "user_id": &claims.sub })
        .await
        .map_err(|e| AppError::DatabaseError(format!("Database error: {}", e)))?
        .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))?;

    if !user.is_verified {
        return Err(AppError::Unauthorized(
            "Mobile number not verified".to_string(),
        ));
    }

    let token = generate_jwt(&user).map_err(AppError::Internal)?;
    let new_refresh_token = generate_refresh_token(&user.user_id).map_err(AppError::Internal)?;

    Ok(AuthResponse {
        token,
        refresh_token: Some(new_refresh_token),
        user: UserInfo::from(user),
    })
}

// Get current user
pub async fn get_current_user(db: &MongoDB, user_id: &str) -> Result<UserInfo, AppError> {
    let collection = db.collection::<User>("users");

    let user = collection
        .find_one(doc! { "user_id": user_id })
        .await
        .map_err(|e| AppError::DatabaseError(format!("Database error: {}", e)))?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(UserInfo::from(user))
}

/// 🗑️ Delete user account and all associated data
pub async fn delete_user_account(db: &MongoDB, user_id: &str) -> Result<(), AppError> {
    log::info!("🗑️ Deleting account for user_id: {}", user_id);

    // 1. Delete the user itself
    let users_collection = db.database().collection::<User>("users");
    let delete_user_result = users_collection
        .delete_one(doc! { "user_id": user_id })
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to delete user: {}", e)))?;

    if delete_user_result.deleted_count == 0 {
        log::warn!("⚠️ User {} not found in database", user_id);
        return Err(AppError::NotFound(format!("User {} not found", user_id)));
    }

    log::info!("✅ User {} deleted from users collection", user_id);

    // 2. Delete every symptom report linked to this user
    let reports_collection = db
        .database()
        .collection::<mongodb::bson::Document>("symptom_reports");
    let delete_reports_result = reports_collection
        .delete_many(doc! { "user_id": user_id })
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to delete symptom reports: {}", e)))?;

    log::info!(
        "✅ Deleted {} symptom reports for user {}",
        delete_reports_result.deleted_count,
        user_id
    );

    log::info!("🎉 Account and all data successfully deleted for user {}", user_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: None,
            user_id: "64f000000000000000000001".to_string(),
            mobile_number: "9876543210".to_string(),
            pin_hash: "$2b$12$hash".to_string(),
            name: "Ravi Kumar".to_string(),
            dob: "1988-11-02".to_string(),
            gender: "male".to_string(),
            aadhaar_id: Some("123456789012".to_string()),
            device_id: None,
            is_verified: true,
            created_at: None,
            updated_at: None,
            last_login: None,
        }
    }

    #[test]
    fn test_jwt_roundtrip() {
        let user = sample_user();
        let token = generate_jwt(&user).unwrap();
        let claims = verify_token(&token).unwrap();

        assert_eq!(claims.sub, user.user_id);
        assert_eq!(claims.mobile_number, user.mobile_number);
        assert!(claims.is_verified);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_tampered_token_rejected() {
        let user = sample_user();
        let token = generate_jwt(&user).unwrap();

        let mut tampered = token.clone();
        // flip the final signature character
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        assert!(verify_token(&tampered).is_err());
    }

    #[test]
    fn test_refresh_token_carries_user_id() {
        let token = generate_refresh_token("64f000000000000000000001").unwrap();
        let claims = verify_token(&token).unwrap();

        assert_eq!(claims.sub, "64f000000000000000000001");
        assert!(claims.mobile_number.is_empty());
    }

    #[test]
    fn test_validate_register_normalizes_mobile() {
        // mixed-case gender is accepted, storage lowercases it
        let request = RegisterRequest {
            mobile_number: "+91 98765 43210".to_string(),
            pin: "1234".to_string(),
            name: "Asha".to_string(),
            dob: "1991-02-03".to_string(),
            gender: "Female".to_string(),
            aadhaar_id: None,
            device_id: None,
        };

        assert_eq!(validate_register(&request).unwrap(), "9876543210");
    }

    #[test]
    fn test_validate_register_collects_all_errors() {
        let request = RegisterRequest {
            mobile_number: "12345".to_string(),
            pin: "12".to_string(),
            name: "  ".to_string(),
            dob: "tomorrow".to_string(),
            gender: "unknown".to_string(),
            aadhaar_id: Some("12".to_string()),
            device_id: None,
        };

        let errors = validate_register(&request).unwrap_err();
        assert_eq!(errors.len(), 6);
    }
}
