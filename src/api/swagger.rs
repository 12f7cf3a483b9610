use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Telemed Service API",
        version = "1.0.0",
        description = "API documentation for the telemedicine backend. \n\n**Authentication:** Mobile number + OTP registration, then JWT Bearer tokens.\n\n**Features:**\n- Mobile OTP registration and login (PIN based)\n- AI symptom analysis with rule-based fallback\n- Emergency severity screening\n- Nearby pharmacy lookup and medicine allocation\n- Health monitoring and metrics",
        contact(
            name = "Telemed Service Team",
            email = "support@telemed-service.com"
        )
    ),
    paths(
        // Auth endpoints
        crate::api::auth::register,
        crate::api::auth::send_otp,
        crate::api::auth::verify_otp,
        crate::api::auth::login,
        crate::api::auth::get_me,

        // Symptoms
        crate::api::symptoms::analyze,
        crate::api::symptoms::history,
        crate::api::symptoms::emergency,

        // Pharmacies
        crate::api::pharmacies::list,
        crate::api::pharmacies::nearby,
        crate::api::pharmacies::allocate,

        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,
    ),
    components(
        schemas(
            // Auth
            crate::services::auth_service::RegisterRequest,
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::SendOtpRequest,
            crate::services::auth_service::VerifyOtpRequest,
            crate::services::auth_service::AuthResponse,
            crate::services::auth_service::RegisterResponse,
            crate::services::auth_service::OtpSentResponse,
            crate::models::user::UserInfo,

            // Symptoms
            crate::services::symptom_service::AnalyzeRequest,
            crate::services::symptom_service::AnalyzeResponse,
            crate::services::symptom_service::EmergencyRequest,
            crate::services::symptom_service::EmergencyAssessment,
            crate::models::symptom::SymptomAnalysis,
            crate::models::symptom::ConditionGuess,
            crate::models::symptom::SymptomReportResponse,

            // Pharmacies
            crate::models::pharmacy::MedicineStock,
            crate::models::pharmacy::PharmacyInfo,
            crate::models::pharmacy::NearbyPharmacy,
            crate::services::pharmacy_service::PrescriptionItem,
            crate::services::pharmacy_service::AllocateRequest,
            crate::services::pharmacy_service::AllocationLine,
            crate::services::pharmacy_service::PharmacyAllocation,
            crate::services::pharmacy_service::UnavailableItem,
            crate::services::pharmacy_service::AllocationPlan,
            crate::services::pharmacy_service::ConfirmLine,
            crate::services::pharmacy_service::ConfirmRequest,

            // Health & Metrics
            crate::api::health::HealthResponse,
            crate::api::metrics::MetricsResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Mobile OTP registration, verification, login and account management."),
        (name = "Symptoms", description = "AI-backed symptom analysis, consultation history and emergency screening."),
        (name = "Pharmacies", description = "Pharmacy catalog, proximity search and prescription allocation."),
        (name = "Health", description = "Health check and system metrics endpoints for monitoring service status."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Enter your JWT token"))
                        .build()
                ),
            );
        }
    }
}
