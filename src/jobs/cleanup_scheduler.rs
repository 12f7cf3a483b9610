// ==================== STALE ACCOUNT CLEANUP SCHEDULER ====================
// Hourly job that removes accounts which never finished OTP verification
// and evicts expired in-memory analysis cache entries

use crate::database::MongoDB;
use crate::models::User;
use crate::services::symptom_service::ANALYSIS_CACHE_TTL_SECONDS;
use crate::utils::cache;
use chrono::Utc;
use mongodb::bson::{doc, DateTime as BsonDateTime};
use tokio::time::{interval, Duration};

/// Unverified accounts older than this are fair game for deletion.
pub const STALE_UNVERIFIED_HOURS: i64 = 24;

pub async fn start_cleanup_scheduler(db: MongoDB) {
    log::info!("🧹 Starting cleanup scheduler (runs every hour)");

    tokio::spawn(async move {
        log::info!("🚀 Running initial cleanup on startup...");
        run_cleanup_cycle(&db).await;

        let mut interval = interval(Duration::from_secs(3600));

        loop {
            interval.tick().await;
            run_cleanup_cycle(&db).await;
        }
    });

    log::info!("✅ Cleanup scheduler started successfully");
}

async fn run_cleanup_cycle(db: &MongoDB) {
    match purge_stale_unverified(db).await {
        Ok(removed) if removed > 0 => {
            log::info!("🗑️ Cleanup removed {} stale unverified account(s)", removed);
        }
        Ok(_) => {
            log::debug!("✅ Cleanup cycle: no stale unverified accounts");
        }
        Err(e) => {
            log::error!("❌ Cleanup cycle failed: {}", e);
        }
    }

    let evicted = cache::purge_expired(ANALYSIS_CACHE_TTL_SECONDS);
    if evicted > 0 {
        log::debug!("♻️ Evicted {} expired analysis cache entries", evicted);
    }
}

async fn purge_stale_unverified(db: &MongoDB) -> Result<u64, String> {
    let cutoff = Utc::now() - chrono::Duration::hours(STALE_UNVERIFIED_HOURS);
    let cutoff = BsonDateTime::from_millis(cutoff.timestamp_millis());

    let collection = db.collection::<User>("users");

    let result = collection
        .delete_many(doc! {
            "is_verified": false,
            "created_at": { "$lt": cutoff }
        })
        .await
        .map_err(|e| format!("Failed to delete stale users: {}", e))?;

    Ok(result.deleted_count)
}
