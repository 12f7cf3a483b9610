use mongodb::{Client, Collection, Database};
use std::error::Error;

pub mod redis;

pub use redis::{OtpStore, RedisStore};

#[derive(Clone)]
pub struct MongoDB {
    client: Client,
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        // Connection pool tuned for a small API instance
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        // Fail fast when the database is unreachable
        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // Extract database name from URI or use default
        let db_name = uri
            .split('/')
            .last()
            .and_then(|s| s.split('?').next())
            .filter(|s| !s.is_empty())
            .unwrap_or("telemed");

        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { client, db };

        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the indexes the query paths rely on
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        use mongodb::bson::doc;
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let users = self.database().collection::<mongodb::bson::Document>("users");

        // Unique compound index: one account per (mobile_number, pin_hash) pair
        let user_identity_index = IndexModel::builder()
            .keys(doc! { "mobile_number": 1, "pin_hash": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        match users.create_index(user_identity_index).await {
            Ok(_) => log::info!("   ✅ Index created: users(mobile_number, pin_hash) [unique]"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // Index: users(mobile_number) - login and OTP lookups
        let user_mobile_index = IndexModel::builder()
            .keys(doc! { "mobile_number": 1 })
            .build();

        match users.create_index(user_mobile_index).await {
            Ok(_) => log::info!("   ✅ Index created: users(mobile_number)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // Index: symptom_reports(user_id) - history queries
        let reports = self
            .database()
            .collection::<mongodb::bson::Document>("symptom_reports");

        let reports_user_index = IndexModel::builder()
            .keys(doc! { "user_id": 1 })
            .build();

        match reports.create_index(reports_user_index).await {
            Ok(_) => log::info!("   ✅ Index created: symptom_reports(user_id)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // Unique index: pharmacies(pharmacy_id) - allocation confirm targets
        let pharmacies = self
            .database()
            .collection::<mongodb::bson::Document>("pharmacies");

        let pharmacy_id_index = IndexModel::builder()
            .keys(doc! { "pharmacy_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        match pharmacies.create_index(pharmacy_id_index).await {
            Ok(_) => log::info!("   ✅ Index created: pharmacies(pharmacy_id) [unique]"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    /// Round-trip ping used by the health endpoint
    pub async fn ping(&self) -> Result<(), String> {
        use mongodb::bson::doc;

        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(|e| format!("MongoDB ping failed: {}", e))
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}
