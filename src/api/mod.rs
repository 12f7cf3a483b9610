pub mod auth;
pub mod health;
pub mod metrics;
pub mod pharmacies;
pub mod swagger;
pub mod symptoms;
