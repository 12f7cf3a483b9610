use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

/// One medicine line in a pharmacy's inventory
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MedicineStock {
    pub medicine: String,
    pub quantity: u32,
    /// Unit price in INR
    pub price: f64,
}

/// Partner pharmacy (stored in the "pharmacies" collection)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pharmacy {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Stable business identifier, unique across the collection
    pub pharmacy_id: String,

    pub name: String,
    pub address: String,

    /// WGS84 coordinates used for nearest-first ranking
    pub lat: f64,
    pub lng: f64,

    pub phone: String,

    /// Inactive pharmacies are skipped by listing and allocation
    #[serde(default = "default_is_active")]
    pub is_active: bool,

    pub inventory: Vec<MedicineStock>,

    pub created_at: Option<BsonDateTime>,
    pub updated_at: Option<BsonDateTime>,
}

fn default_is_active() -> bool {
    true
}

/// Pharmacy shape returned by the listing endpoints
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PharmacyInfo {
    pub pharmacy_id: String,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub phone: String,
    pub inventory: Vec<MedicineStock>,
}

impl From<Pharmacy> for PharmacyInfo {
    fn from(p: Pharmacy) -> Self {
        PharmacyInfo {
            pharmacy_id: p.pharmacy_id,
            name: p.name,
            address: p.address,
            lat: p.lat,
            lng: p.lng,
            phone: p.phone,
            inventory: p.inventory,
        }
    }
}

/// Pharmacy plus its distance from the caller, for /nearby
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct NearbyPharmacy {
    #[serde(flatten)]
    pub pharmacy: PharmacyInfo,
    pub distance_km: f64,
}
