use crate::database::MongoDB;
use crate::models::{MedicineStock, Pharmacy};
use mongodb::bson::{doc, DateTime as BsonDateTime};

/// Seeds the partner pharmacy network into MongoDB.
/// Only inserts when the collection is empty so restarts never clobber
/// live stock levels.
pub async fn seed_default_pharmacies(db: &MongoDB) {
    let collection = db.collection::<Pharmacy>("pharmacies");

    let count = collection.count_documents(doc! {}).await.unwrap_or(0);

    if count > 0 {
        log::info!(
            "🏪 Pharmacies: {} already in DB — skipping seed",
            count
        );
        return;
    }

    log::info!("🏪 Pharmacies: seeding 6 partner pharmacies into MongoDB...");

    let now = BsonDateTime::now();
    let pharmacies = build_default_pharmacies(now);

    match collection.insert_many(&pharmacies).await {
        Ok(result) => {
            log::info!(
                "   ✅ Inserted {} pharmacies into pharmacies collection",
                result.inserted_ids.len()
            );
        }
        Err(e) => {
            log::error!("   ❌ Failed to seed pharmacies: {}", e);
        }
    }
}

fn stock(medicine: &str, quantity: u32, price: f64) -> MedicineStock {
    MedicineStock {
        medicine: medicine.to_string(),
        quantity,
        price,
    }
}

/// The Hyderabad partner network. Inventories deliberately overlap only
/// partially so allocation exercises fallback between branches.
fn build_default_pharmacies(now: BsonDateTime) -> Vec<Pharmacy> {
    vec![
        Pharmacy {
            id: None,
            pharmacy_id: "PH-HYD-001".into(),
            name: "Apollo Pharmacy Banjara Hills".into(),
            address: "Road No. 1, Banjara Hills, Hyderabad 500034".into(),
            lat: 17.4126,
            lng: 78.4482,
            phone: "+914023555001".into(),
            is_active: true,
            inventory: vec![
                stock("Paracetamol 500mg", 120, 2.5),
                stock("Azithromycin 500mg", 40, 18.0),
                stock("Cetirizine 10mg", 80, 1.8),
                stock("Omeprazole 20mg", 60, 4.2),
                stock("ORS Sachets", 150, 14.0),
            ],
            created_at: Some(now),
            updated_at: Some(now),
        },
        Pharmacy {
            id: None,
            pharmacy_id: "PH-HYD-002".into(),
            name: "MedPlus Madhapur".into(),
            address: "Ayyappa Society Main Road, Madhapur, Hyderabad 500081".into(),
            lat: 17.4483,
            lng: 78.3915,
            phone: "+914023555002".into(),
            is_active: true,
            inventory: vec![
                stock("Paracetamol 500mg", 200, 2.2),
                stock("Ibuprofen 400mg", 90, 3.5),
                stock("Amoxicillin 250mg", 50, 6.5),
                stock("Vitamin D3 60000 IU", 35, 28.0),
                stock("Cetirizine 10mg", 40, 1.9),
            ],
            created_at: Some(now),
            updated_at: Some(now),
        },
        Pharmacy {
            id: None,
            pharmacy_id: "PH-HYD-003".into(),
            name: "Wellness Forever Gachibowli".into(),
            address: "DLF Road, Gachibowli, Hyderabad 500032".into(),
            lat: 17.4401,
            lng: 78.3489,
            phone: "+914023555003".into(),
            is_active: true,
            inventory: vec![
                stock("Metformin 500mg", 100, 3.1),
                stock("Amlodipine 5mg", 75, 2.8),
                stock("Paracetamol 500mg", 60, 2.6),
                stock("ORS Sachets", 90, 15.0),
            ],
            created_at: Some(now),
            updated_at: Some(now),
        },
        Pharmacy {
            id: None,
            pharmacy_id: "PH-HYD-004".into(),
            name: "NetMeds Pharmacy Kukatpally".into(),
            address: "KPHB Phase 1, Kukatpally, Hyderabad 500072".into(),
            lat: 17.4849,
            lng: 78.4138,
            phone: "+914023555004".into(),
            is_active: true,
            inventory: vec![
                stock("Azithromycin 500mg", 25, 17.5),
                stock("Ibuprofen 400mg", 110, 3.2),
                stock("Omeprazole 20mg", 45, 4.0),
                stock("Vitamin D3 60000 IU", 20, 27.0),
            ],
            created_at: Some(now),
            updated_at: Some(now),
        },
        Pharmacy {
            id: None,
            pharmacy_id: "PH-HYD-005".into(),
            name: "Apollo Pharmacy Secunderabad".into(),
            address: "SD Road, Secunderabad, Hyderabad 500003".into(),
            lat: 17.4399,
            lng: 78.4983,
            phone: "+914023555005".into(),
            is_active: true,
            inventory: vec![
                stock("Paracetamol 500mg", 80, 2.4),
                stock("Amoxicillin 250mg", 70, 6.8),
                stock("Metformin 500mg", 55, 3.0),
                stock("Cetirizine 10mg", 100, 1.7),
                stock("Amlodipine 5mg", 30, 2.9),
            ],
            created_at: Some(now),
            updated_at: Some(now),
        },
        Pharmacy {
            id: None,
            pharmacy_id: "PH-HYD-006".into(),
            name: "MedPlus Begumpet".into(),
            address: "Prakash Nagar, Begumpet, Hyderabad 500016".into(),
            lat: 17.4440,
            lng: 78.4664,
            phone: "+914023555006".into(),
            is_active: true,
            inventory: vec![
                stock("ORS Sachets", 200, 13.5),
                stock("Ibuprofen 400mg", 40, 3.6),
                stock("Omeprazole 20mg", 30, 4.5),
                stock("Azithromycin 500mg", 15, 18.5),
            ],
            created_at: Some(now),
            updated_at: Some(now),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_covers_six_distinct_pharmacies() {
        let pharmacies = build_default_pharmacies(BsonDateTime::now());
        assert_eq!(pharmacies.len(), 6);

        let mut ids: Vec<&str> = pharmacies.iter().map(|p| p.pharmacy_id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 6);

        for pharmacy in &pharmacies {
            assert!(pharmacy.is_active);
            assert!(!pharmacy.inventory.is_empty());
            // All branches sit inside the Hyderabad metro area
            assert!((17.2..17.6).contains(&pharmacy.lat));
            assert!((78.2..78.6).contains(&pharmacy.lng));
        }
    }

    #[test]
    fn test_paracetamol_not_stocked_everywhere() {
        let pharmacies = build_default_pharmacies(BsonDateTime::now());
        let stocked = pharmacies
            .iter()
            .filter(|p| {
                p.inventory
                    .iter()
                    .any(|s| s.medicine == "Paracetamol 500mg")
            })
            .count();
        assert!(stocked > 0 && stocked < pharmacies.len());
    }
}
