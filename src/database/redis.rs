/// Redis-backed OTP state: active codes, failed-attempt counters and
/// resend cooldowns, all with server-side expiry.
use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands;
use std::time::Duration;

const KEY_PREFIX: &str = "telemed";

/// Storage operations the OTP flows depend on.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Stores a fresh OTP with TTL and resets the attempt counter.
    async fn store_otp(&self, mobile: &str, code: &str, ttl_secs: u64) -> Result<(), String>;

    /// Returns the active OTP, or None when expired / never sent.
    async fn fetch_otp(&self, mobile: &str) -> Result<Option<String>, String>;

    /// Removes the OTP and every counter tied to it.
    async fn clear_otp(&self, mobile: &str) -> Result<(), String>;

    /// Increments the failed-attempt counter and returns the new total.
    /// The counter expires on its own so it can never outlive a retry cycle.
    async fn record_failed_attempt(&self, mobile: &str, ttl_secs: u64) -> Result<i64, String>;

    /// Marks the mobile as recently served so resends can be throttled.
    async fn set_cooldown(&self, mobile: &str, ttl_secs: u64) -> Result<(), String>;

    async fn in_cooldown(&self, mobile: &str) -> Result<bool, String>;
}

#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    pub async fn new(redis_url: &str) -> Result<Self, String> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| format!("Failed to create Redis client: {}", e))?;

        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(3)
            .set_connection_timeout(Duration::from_secs(5))
            .set_response_timeout(Duration::from_secs(3));

        let manager = ConnectionManager::new_with_config(client, config)
            .await
            .map_err(|e| format!("Failed to connect to Redis: {}", e))?;

        Ok(Self { manager })
    }

    fn otp_key(mobile: &str) -> String {
        format!("{}:otp:{}", KEY_PREFIX, mobile)
    }

    fn attempts_key(mobile: &str) -> String {
        format!("{}:otp:attempts:{}", KEY_PREFIX, mobile)
    }

    fn cooldown_key(mobile: &str) -> String {
        format!("{}:otp:cooldown:{}", KEY_PREFIX, mobile)
    }

    /// Round-trip ping used by the health endpoint
    pub async fn ping(&self) -> Result<(), String> {
        let mut conn = self.manager.clone();

        let reply: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| format!("Redis ping failed: {}", e))?;

        if reply == "PONG" {
            Ok(())
        } else {
            Err(format!("Unexpected Redis ping reply: {}", reply))
        }
    }
}

#[async_trait]
impl OtpStore for RedisStore {
    async fn store_otp(&self, mobile: &str, code: &str, ttl_secs: u64) -> Result<(), String> {
        let mut conn = self.manager.clone();

        conn.set_ex::<_, _, ()>(Self::otp_key(mobile), code, ttl_secs)
            .await
            .map_err(|e| format!("Failed to store OTP: {}", e))?;

        conn.del::<_, ()>(Self::attempts_key(mobile))
            .await
            .map_err(|e| format!("Failed to reset OTP attempts: {}", e))?;

        Ok(())
    }

    async fn fetch_otp(&self, mobile: &str) -> Result<Option<String>, String> {
        let mut conn = self.manager.clone();

        conn.get(Self::otp_key(mobile))
            .await
            .map_err(|e| format!("Failed to read OTP: {}", e))
    }

    async fn clear_otp(&self, mobile: &str) -> Result<(), String> {
        let mut conn = self.manager.clone();

        let keys = vec![
            Self::otp_key(mobile),
            Self::attempts_key(mobile),
            Self::cooldown_key(mobile),
        ];

        conn.del::<_, ()>(keys)
            .await
            .map_err(|e| format!("Failed to clear OTP state: {}", e))
    }

    async fn record_failed_attempt(&self, mobile: &str, ttl_secs: u64) -> Result<i64, String> {
        let mut conn = self.manager.clone();
        let key = Self::attempts_key(mobile);

        let attempts: i64 = conn
            .incr(&key, 1i64)
            .await
            .map_err(|e| format!("Failed to count OTP attempt: {}", e))?;

        if attempts == 1 {
            conn.expire::<_, ()>(&key, ttl_secs as i64)
                .await
                .map_err(|e| format!("Failed to expire attempt counter: {}", e))?;
        }

        Ok(attempts)
    }

    async fn set_cooldown(&self, mobile: &str, ttl_secs: u64) -> Result<(), String> {
        let mut conn = self.manager.clone();

        conn.set_ex::<_, _, ()>(Self::cooldown_key(mobile), 1, ttl_secs)
            .await
            .map_err(|e| format!("Failed to set resend cooldown: {}", e))
    }

    async fn in_cooldown(&self, mobile: &str) -> Result<bool, String> {
        let mut conn = self.manager.clone();

        conn.exists(Self::cooldown_key(mobile))
            .await
            .map_err(|e| format!("Failed to check resend cooldown: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(RedisStore::otp_key("9876543210"), "telemed:otp:9876543210");
        assert_eq!(
            RedisStore::attempts_key("9876543210"),
            "telemed:otp:attempts:9876543210"
        );
        assert_eq!(
            RedisStore::cooldown_key("9876543210"),
            "telemed:otp:cooldown:9876543210"
        );
    }
}
