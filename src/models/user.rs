use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

/// Patient account (stored in the "users" collection)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String, // PRIMARY IDENTIFIER - hex ObjectId string
    /// Normalized 10-digit Indian mobile number
    pub mobile_number: String,
    /// Bcrypt hash of the login PIN
    pub pin_hash: String,
    pub name: String,
    /// Date of birth, YYYY-MM-DD
    pub dob: String,
    /// "male", "female" or "other"
    pub gender: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aadhaar_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Set once the mobile number has been confirmed via OTP
    #[serde(default)]
    pub is_verified: bool,
    pub created_at: Option<BsonDateTime>,
    pub updated_at: Option<BsonDateTime>,
    pub last_login: Option<BsonDateTime>,
}

/// Public profile shape returned by the API (never exposes the PIN hash)
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserInfo {
    pub id: String,
    pub mobile_number: String,
    pub name: String,
    pub dob: String,
    pub gender: String,
    pub aadhaar_id: Option<String>,
    pub is_verified: bool,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        UserInfo {
            id: user.user_id,
            mobile_number: user.mobile_number,
            name: user.name,
            dob: user.dob,
            gender: user.gender,
            aadhaar_id: user.aadhaar_id,
            is_verified: user.is_verified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_info_never_carries_pin_hash() {
        let user = User {
            id: None,
            user_id: "64f000000000000000000001".to_string(),
            mobile_number: "9876543210".to_string(),
            pin_hash: "$2b$12$secret".to_string(),
            name: "Asha".to_string(),
            dob: "1991-02-03".to_string(),
            gender: "female".to_string(),
            aadhaar_id: None,
            device_id: Some("android-123".to_string()),
            is_verified: true,
            created_at: None,
            updated_at: None,
            last_login: None,
        };

        let info = UserInfo::from(user);
        let json = serde_json::to_string(&info).unwrap();
        assert!(!json.contains("pin_hash"));
        assert!(!json.contains("$2b$"));
        assert_eq!(info.id, "64f000000000000000000001");
    }
}
