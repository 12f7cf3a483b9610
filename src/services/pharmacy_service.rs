/// Pharmacy discovery and the nearest-first medicine allocation heuristic.
use crate::database::MongoDB;
use crate::models::{NearbyPharmacy, Pharmacy, PharmacyInfo};
use crate::utils::error::AppError;
use mongodb::bson::{doc, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

pub const DEFAULT_NEARBY_LIMIT: usize = 5;
pub const MAX_NEARBY_LIMIT: usize = 20;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two WGS84 points.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn valid_coords(lat: f64, lng: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct PrescriptionItem {
    pub medicine: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AllocateRequest {
    pub lat: f64,
    pub lng: f64,
    pub items: Vec<PrescriptionItem>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AllocationLine {
    /// Medicine name exactly as the pharmacy stocks it
    pub medicine: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub subtotal: f64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PharmacyAllocation {
    pub pharmacy_id: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub distance_km: f64,
    pub items: Vec<AllocationLine>,
    pub subtotal: f64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UnavailableItem {
    pub medicine: String,
    pub quantity: u32,
    pub reason: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AllocationPlan {
    pub allocations: Vec<PharmacyAllocation>,
    pub unavailable: Vec<UnavailableItem>,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ConfirmLine {
    pub pharmacy_id: String,
    /// Must match the inventory entry exactly, as returned by the planner
    pub medicine: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ConfirmRequest {
    pub allocations: Vec<ConfirmLine>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ConfirmFailure {
    pub line: ConfirmLine,
    pub reason: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ConfirmOutcome {
    pub applied: Vec<ConfirmLine>,
    pub failed: Option<ConfirmFailure>,
}

/// Collapses duplicate medicines (case-insensitive) into single lines,
/// keeping the first-seen spelling.
fn merge_items(items: &[PrescriptionItem]) -> Vec<PrescriptionItem> {
    let mut merged: Vec<PrescriptionItem> = Vec::new();

    for item in items {
        let name = item.medicine.trim();
        if name.is_empty() {
            continue;
        }
        match merged
            .iter_mut()
            .find(|m| m.medicine.eq_ignore_ascii_case(name))
        {
            // saturate rather than overflow on absurd requested quantities
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => merged.push(PrescriptionItem {
                medicine: name.to_string(),
                quantity: item.quantity,
            }),
        }
    }

    merged
}

fn validate_allocate(request: &AllocateRequest) -> Vec<String> {
    let mut errors = Vec::new();

    if !valid_coords(request.lat, request.lng) {
        errors.push("lat/lng must be valid coordinates".to_string());
    }
    if !request.items.iter().any(|i| !i.medicine.trim().is_empty()) {
        errors.push("items must contain at least one medicine".to_string());
    }
    if request.items.iter().any(|i| i.quantity == 0) {
        errors.push("item quantities must be greater than zero".to_string());
    }

    errors
}

/// Greedy nearest-first planner. Each merged item goes whole to the
/// closest active pharmacy holding the full quantity; items are never
/// split across pharmacies. Pure function, touches no stock.
pub fn plan_allocation(
    pharmacies: &[Pharmacy],
    lat: f64,
    lng: f64,
    items: &[PrescriptionItem],
) -> AllocationPlan {
    let mut ranked: Vec<(f64, &Pharmacy)> = pharmacies
        .iter()
        .filter(|p| p.is_active)
        .map(|p| (haversine_km(lat, lng, p.lat, p.lng), p))
        .collect();
    ranked.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut allocations: Vec<PharmacyAllocation> = Vec::new();
    let mut unavailable: Vec<UnavailableItem> = Vec::new();

    for item in merge_items(items) {
        let mut placed = false;

        for (distance, pharmacy) in &ranked {
            let stock = pharmacy.inventory.iter().find(|s| {
                s.medicine.eq_ignore_ascii_case(&item.medicine) && s.quantity >= item.quantity
            });

            if let Some(stock) = stock {
                let line_subtotal = round2(stock.price * f64::from(item.quantity));
                let line = AllocationLine {
                    medicine: stock.medicine.clone(),
                    quantity: item.quantity,
                    unit_price: stock.price,
                    subtotal: line_subtotal,
                };

                match allocations
                    .iter_mut()
                    .find(|a| a.pharmacy_id == pharmacy.pharmacy_id)
                {
                    Some(allocation) => {
                        allocation.items.push(line);
                        allocation.subtotal = round2(allocation.subtotal + line_subtotal);
                    }
                    None => allocations.push(PharmacyAllocation {
                        pharmacy_id: pharmacy.pharmacy_id.clone(),
                        name: pharmacy.name.clone(),
                        address: pharmacy.address.clone(),
                        phone: pharmacy.phone.clone(),
                        distance_km: round2(*distance),
                        items: vec![line],
                        subtotal: line_subtotal,
                    }),
                }

                placed = true;
                break;
            }
        }

        if !placed {
            unavailable.push(UnavailableItem {
                medicine: item.medicine.clone(),
                quantity: item.quantity,
                reason: "No active pharmacy holds the full quantity".to_string(),
            });
        }
    }

    let total = round2(allocations.iter().map(|a| a.subtotal).sum());

    AllocationPlan {
        allocations,
        unavailable,
        total,
    }
}

async fn load_active_pharmacies(db: &MongoDB) -> Result<Vec<Pharmacy>, AppError> {
    let collection = db.collection::<Pharmacy>("pharmacies");

    let mut cursor = collection
        .find(doc! { "is_active": true })
        .await
        .map_err(|e| AppError::DatabaseError(format!("Database error: {}", e)))?;

    let mut pharmacies = Vec::new();

    use futures::stream::StreamExt;

    while let Some(result) = cursor.next().await {
        match result {
            Ok(pharmacy) => pharmacies.push(pharmacy),
            Err(e) => {
                log::error!("Error reading pharmacy document: {}", e);
            }
        }
    }

    Ok(pharmacies)
}

/// All active pharmacies, unranked.
pub async fn list_pharmacies(db: &MongoDB) -> Result<Vec<PharmacyInfo>, AppError> {
    let pharmacies = load_active_pharmacies(db).await?;
    Ok(pharmacies.into_iter().map(PharmacyInfo::from).collect())
}

/// Active pharmacies ranked by distance from the caller.
pub async fn nearby(
    db: &MongoDB,
    lat: f64,
    lng: f64,
    limit: Option<usize>,
) -> Result<Vec<NearbyPharmacy>, AppError> {
    if !valid_coords(lat, lng) {
        return Err(AppError::Validation(vec![
            "lat/lng must be valid coordinates".to_string(),
        ]));
    }

    let limit = limit.unwrap_or(DEFAULT_NEARBY_LIMIT).clamp(1, MAX_NEARBY_LIMIT);

    let pharmacies = load_active_pharmacies(db).await?;

    let mut ranked: Vec<NearbyPharmacy> = pharmacies
        .into_iter()
        .map(|p| {
            let distance_km = round2(haversine_km(lat, lng, p.lat, p.lng));
            NearbyPharmacy {
                pharmacy: PharmacyInfo::from(p),
                distance_km,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.distance_km
            .partial_cmp(&b.distance_km)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(limit);

    Ok(ranked)
}

/// Plans an allocation against current stock without mutating anything.
pub async fn allocate(db: &MongoDB, request: &AllocateRequest) -> Result<AllocationPlan, AppError> {
    let errors = validate_allocate(request);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let pharmacies = load_active_pharmacies(db).await?;

    Ok(plan_allocation(
        &pharmacies,
        request.lat,
        request.lng,
        &request.items,
    ))
}

/// Decrements stock line by line. Each decrement is guarded so it only
/// matches while enough stock remains. Already-applied lines stay applied
/// when a later line fails; the caller reports both sides.
pub async fn confirm_allocation(
    db: &MongoDB,
    request: &ConfirmRequest,
) -> Result<ConfirmOutcome, AppError> {
    if request.allocations.is_empty() {
        return Err(AppError::Validation(vec![
            "allocations must not be empty".to_string(),
        ]));
    }
    if request
        .allocations
        .iter()
        .any(|l| l.quantity == 0 || l.medicine.trim().is_empty() || l.pharmacy_id.trim().is_empty())
    {
        return Err(AppError::Validation(vec![
            "every allocation needs a pharmacy_id, a medicine and a positive quantity".to_string(),
        ]));
    }

    let collection = db.collection::<Pharmacy>("pharmacies");
    let mut applied: Vec<ConfirmLine> = Vec::new();

    for line in &request.allocations {
        let filter = doc! {
            "pharmacy_id": &line.pharmacy_id,
            "is_active": true,
            "inventory": {
                "$elemMatch": {
                    "medicine": &line.medicine,
                    "quantity": { "$gte": i64::from(line.quantity) }
                }
            }
        };

        let update = doc! {
            "$inc": { "inventory.$.quantity": -i64::from(line.quantity) },
            "$set": { "updated_at": BsonDateTime::now() }
        };

        let result = collection
            .update_one(filter, update)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to decrement stock: {}", e)))?;

        if result.modified_count == 0 {
            log::warn!(
                "⚠️ Stock confirmation stopped at {}: {} x{}",
                line.pharmacy_id,
                line.medicine,
                line.quantity
            );
            return Ok(ConfirmOutcome {
                applied,
                failed: Some(ConfirmFailure {
                    line: line.clone(),
                    reason: "Insufficient stock, or unknown pharmacy/medicine".to_string(),
                }),
            });
        }

        applied.push(line.clone());
    }

    log::info!("🧾 Allocation confirmed: {} line(s) decremented", applied.len());

    Ok(ConfirmOutcome {
        applied,
        failed: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MedicineStock;

    fn stock(name: &str, quantity: u32, price: f64) -> MedicineStock {
        MedicineStock {
            medicine: name.to_string(),
            quantity,
            price,
        }
    }

    fn pharmacy(id: &str, lat: f64, lng: f64, inventory: Vec<MedicineStock>) -> Pharmacy {
        Pharmacy {
            id: None,
            pharmacy_id: id.to_string(),
            name: format!("Pharmacy {}", id),
            address: "Test Road".to_string(),
            lat,
            lng,
            phone: "+914000000000".to_string(),
            is_active: true,
            inventory,
            created_at: None,
            updated_at: None,
        }
    }

    fn item(name: &str, quantity: u32) -> PrescriptionItem {
        PrescriptionItem {
            medicine: name.to_string(),
            quantity,
        }
    }

    #[test]
    fn test_haversine_zero_distance() {
        assert!(haversine_km(17.4, 78.4, 17.4, 78.4) < 1e-9);
    }

    #[test]
    fn test_haversine_known_distance() {
        // Hyderabad to New Delhi is roughly 1255 km
        let d = haversine_km(17.385, 78.4867, 28.6139, 77.209);
        assert!((1200.0..1320.0).contains(&d), "got {}", d);
    }

    #[test]
    fn test_nearest_pharmacy_wins() {
        let near = pharmacy("near", 17.401, 78.401, vec![stock("Paracetamol 500mg", 10, 2.0)]);
        let far = pharmacy("far", 17.9, 78.9, vec![stock("Paracetamol 500mg", 10, 1.0)]);

        let plan = plan_allocation(&[far, near], 17.4, 78.4, &[item("paracetamol 500mg", 3)]);

        assert_eq!(plan.allocations.len(), 1);
        assert_eq!(plan.allocations[0].pharmacy_id, "near");
        // name comes back in inventory casing
        assert_eq!(plan.allocations[0].items[0].medicine, "Paracetamol 500mg");
        assert_eq!(plan.allocations[0].subtotal, 6.0);
        assert!(plan.unavailable.is_empty());
    }

    #[test]
    fn test_whole_item_falls_through_to_stocked_pharmacy() {
        // Near pharmacy has some stock, but not enough for the full item
        let near = pharmacy("near", 17.401, 78.401, vec![stock("Cetirizine 10mg", 2, 3.0)]);
        let far = pharmacy("far", 17.5, 78.5, vec![stock("Cetirizine 10mg", 20, 3.5)]);

        let plan = plan_allocation(&[near, far], 17.4, 78.4, &[item("Cetirizine 10mg", 5)]);

        assert_eq!(plan.allocations.len(), 1);
        assert_eq!(plan.allocations[0].pharmacy_id, "far");
        assert_eq!(plan.allocations[0].items[0].quantity, 5);
    }

    #[test]
    fn test_unavailable_when_no_pharmacy_has_enough() {
        let a = pharmacy("a", 17.41, 78.41, vec![stock("Insulin", 1, 300.0)]);
        let b = pharmacy("b", 17.42, 78.42, vec![]);

        let plan = plan_allocation(&[a, b], 17.4, 78.4, &[item("Insulin", 5)]);

        assert!(plan.allocations.is_empty());
        assert_eq!(plan.unavailable.len(), 1);
        assert_eq!(plan.unavailable[0].medicine, "Insulin");
        assert_eq!(plan.unavailable[0].quantity, 5);
        assert_eq!(plan.total, 0.0);
    }

    #[test]
    fn test_duplicate_items_are_merged_case_insensitively() {
        let p = pharmacy("p", 17.401, 78.401, vec![stock("ORS Sachet", 10, 15.0)]);

        let plan = plan_allocation(
            &[p],
            17.4,
            78.4,
            &[item("ors sachet", 2), item("ORS SACHET", 3)],
        );

        assert_eq!(plan.allocations.len(), 1);
        assert_eq!(plan.allocations[0].items.len(), 1);
        assert_eq!(plan.allocations[0].items[0].quantity, 5);
        assert_eq!(plan.allocations[0].subtotal, 75.0);
    }

    #[test]
    fn test_merged_quantity_larger_than_any_single_stock_is_unavailable() {
        let p = pharmacy("p", 17.401, 78.401, vec![stock("ORS Sachet", 4, 15.0)]);

        let plan = plan_allocation(
            &[p],
            17.4,
            78.4,
            &[item("ors sachet", 2), item("ORS Sachet", 3)],
        );

        assert!(plan.allocations.is_empty());
        assert_eq!(plan.unavailable[0].quantity, 5);
    }

    #[test]
    fn test_merged_quantities_saturate_at_u32_max() {
        let p = pharmacy("p", 17.401, 78.401, vec![stock("ORS Sachet", 10, 15.0)]);

        let plan = plan_allocation(
            &[p],
            17.4,
            78.4,
            &[item("ORS Sachet", u32::MAX), item("ors sachet", 2)],
        );

        assert!(plan.allocations.is_empty());
        assert_eq!(plan.unavailable[0].quantity, u32::MAX);
    }

    #[test]
    fn test_lines_group_per_pharmacy() {
        let near = pharmacy(
            "near",
            17.401,
            78.401,
            vec![stock("Paracetamol 500mg", 10, 2.0), stock("Cetirizine 10mg", 10, 3.0)],
        );
        let far = pharmacy("far", 17.6, 78.6, vec![stock("Metformin 500mg", 10, 4.0)]);

        let plan = plan_allocation(
            &[near, far],
            17.4,
            78.4,
            &[
                item("Paracetamol 500mg", 2),
                item("Cetirizine 10mg", 1),
                item("Metformin 500mg", 3),
            ],
        );

        assert_eq!(plan.allocations.len(), 2);

        let near_alloc = plan.allocations.iter().find(|a| a.pharmacy_id == "near").unwrap();
        assert_eq!(near_alloc.items.len(), 2);
        assert_eq!(near_alloc.subtotal, 7.0);

        let far_alloc = plan.allocations.iter().find(|a| a.pharmacy_id == "far").unwrap();
        assert_eq!(far_alloc.items.len(), 1);
        assert_eq!(far_alloc.subtotal, 12.0);

        assert_eq!(plan.total, 19.0);
    }

    #[test]
    fn test_inactive_pharmacies_are_skipped() {
        let mut closed = pharmacy("closed", 17.401, 78.401, vec![stock("Ibuprofen 400mg", 50, 5.0)]);
        closed.is_active = false;
        let open = pharmacy("open", 17.45, 78.45, vec![stock("Ibuprofen 400mg", 50, 6.0)]);

        let plan = plan_allocation(&[closed, open], 17.4, 78.4, &[item("Ibuprofen 400mg", 2)]);

        assert_eq!(plan.allocations.len(), 1);
        assert_eq!(plan.allocations[0].pharmacy_id, "open");
    }

    #[test]
    fn test_validate_allocate() {
        let bad = AllocateRequest {
            lat: 120.0,
            lng: 78.4,
            items: vec![item("", 0)],
        };
        let errors = validate_allocate(&bad);
        assert_eq!(errors.len(), 3);

        let good = AllocateRequest {
            lat: 17.4,
            lng: 78.4,
            items: vec![item("Paracetamol 500mg", 1)],
        };
        assert!(validate_allocate(&good).is_empty());
    }
}
