pub mod auth_service;
pub mod otp_service;
pub mod sms_service;
pub mod gemini_service;
pub mod symptom_service;
pub mod pharmacy_service;

pub use otp_service::*;
pub use sms_service::*;
pub use gemini_service::*;
pub use symptom_service::*;
pub use pharmacy_service::*;
