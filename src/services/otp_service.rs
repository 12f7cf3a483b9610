/// OTP lifecycle: issue with TTL and resend cooldown, verify with a capped
/// number of attempts.
use crate::database::OtpStore;
use crate::services::sms_service::{SmsDelivery, SmsSender};
use crate::utils::error::AppError;
use crate::utils::otp::{generate_otp, mask_mobile};

pub const OTP_TTL_SECONDS: u64 = 300;
pub const RESEND_COOLDOWN_SECONDS: u64 = 60;
pub const MAX_VERIFY_ATTEMPTS: i64 = 5;

/// Generates, stores and dispatches a fresh OTP for the mobile number.
/// Rejects the request while a resend cooldown is active; the cooldown
/// starts only once the send succeeds, so a failed dispatch leaves the
/// number free to retry immediately.
pub async fn issue_otp(
    store: &dyn OtpStore,
    sms: &dyn SmsSender,
    mobile: &str,
) -> Result<SmsDelivery, AppError> {
    if store.in_cooldown(mobile).await.map_err(AppError::RedisError)? {
        return Err(AppError::InvalidRequest(
            "An OTP was sent recently. Please wait a minute before requesting another".to_string(),
        ));
    }

    let code = generate_otp();

    store
        .store_otp(mobile, &code, OTP_TTL_SECONDS)
        .await
        .map_err(AppError::RedisError)?;

    let delivery = sms.send_otp(mobile, &code).await.map_err(AppError::SmsError)?;

    store
        .set_cooldown(mobile, RESEND_COOLDOWN_SECONDS)
        .await
        .map_err(AppError::RedisError)?;

    log::info!(
        "🔐 OTP issued for {} (ttl: {}s, channel: {})",
        mask_mobile(mobile),
        OTP_TTL_SECONDS,
        delivery.channel
    );

    Ok(delivery)
}

/// Checks a submitted code against the stored one. Wrong codes burn an
/// attempt; the limit invalidates the OTP entirely.
pub async fn verify_otp(store: &dyn OtpStore, mobile: &str, submitted: &str) -> Result<(), AppError> {
    let stored = store.fetch_otp(mobile).await.map_err(AppError::RedisError)?;

    let code = match stored {
        Some(code) => code,
        None => {
            return Err(AppError::InvalidRequest(
                "OTP expired or not requested. Please request a new one".to_string(),
            ))
        }
    };

    if code != submitted {
        let attempts = store
            .record_failed_attempt(mobile, OTP_TTL_SECONDS)
            .await
            .map_err(AppError::RedisError)?;

        if attempts >= MAX_VERIFY_ATTEMPTS {
            store.clear_otp(mobile).await.map_err(AppError::RedisError)?;
            log::warn!(
                "🚫 OTP invalidated for {} after {} failed attempts",
                mask_mobile(mobile),
                attempts
            );
            return Err(AppError::InvalidRequest(
                "Too many incorrect attempts. Please request a new OTP".to_string(),
            ));
        }

        return Err(AppError::InvalidRequest(format!(
            "Incorrect OTP. {} attempts remaining",
            MAX_VERIFY_ATTEMPTS - attempts
        )));
    }

    store.clear_otp(mobile).await.map_err(AppError::RedisError)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::sms_service::ConsoleSms;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// In-memory store so the flows run without a Redis instance.
    /// TTLs are ignored; expiry is not what these tests exercise.
    #[derive(Default)]
    struct MemoryStore {
        state: Mutex<MemoryState>,
    }

    #[derive(Default)]
    struct MemoryState {
        codes: HashMap<String, String>,
        attempts: HashMap<String, i64>,
        cooldowns: HashSet<String>,
    }

    #[async_trait]
    impl OtpStore for MemoryStore {
        async fn store_otp(&self, mobile: &str, code: &str, _ttl_secs: u64) -> Result<(), String> {
            let mut state = self.state.lock().unwrap();
            state.codes.insert(mobile.to_string(), code.to_string());
            state.attempts.remove(mobile);
            Ok(())
        }

        async fn fetch_otp(&self, mobile: &str) -> Result<Option<String>, String> {
            Ok(self.state.lock().unwrap().codes.get(mobile).cloned())
        }

        async fn clear_otp(&self, mobile: &str) -> Result<(), String> {
            let mut state = self.state.lock().unwrap();
            state.codes.remove(mobile);
            state.attempts.remove(mobile);
            state.cooldowns.remove(mobile);
            Ok(())
        }

        async fn record_failed_attempt(&self, mobile: &str, _ttl_secs: u64) -> Result<i64, String> {
            let mut state = self.state.lock().unwrap();
            let attempts = state.attempts.entry(mobile.to_string()).or_insert(0);
            *attempts += 1;
            Ok(*attempts)
        }

        async fn set_cooldown(&self, mobile: &str, _ttl_secs: u64) -> Result<(), String> {
            self.state.lock().unwrap().cooldowns.insert(mobile.to_string());
            Ok(())
        }

        async fn in_cooldown(&self, mobile: &str) -> Result<bool, String> {
            Ok(self.state.lock().unwrap().cooldowns.contains(mobile))
        }
    }

    /// Sender standing in for an unreachable provider.
    struct FailingSms;

    #[async_trait]
    impl SmsSender for FailingSms {
        async fn send_otp(&self, _mobile: &str, _code: &str) -> Result<SmsDelivery, String> {
            Err("Twilio API error: HTTP 500".to_string())
        }
    }

    const MOBILE: &str = "9876543210";

    #[tokio::test]
    async fn test_failed_send_leaves_no_cooldown() {
        let store = MemoryStore::default();

        let result = issue_otp(&store, &FailingSms, MOBILE).await;
        assert!(matches!(result, Err(AppError::SmsError(_))));
        assert!(!store.in_cooldown(MOBILE).await.unwrap());

        // the immediate retry must go through
        let delivery = issue_otp(&store, &ConsoleSms, MOBILE).await.unwrap();
        assert_eq!(delivery.channel, "console");
        assert!(store.in_cooldown(MOBILE).await.unwrap());
    }

    #[tokio::test]
    async fn test_resend_inside_cooldown_rejected() {
        let store = MemoryStore::default();

        issue_otp(&store, &ConsoleSms, MOBILE).await.unwrap();

        match issue_otp(&store, &ConsoleSms, MOBILE).await {
            Err(AppError::InvalidRequest(message)) => {
                assert!(message.contains("wait"), "got: {}", message)
            }
            other => panic!("expected cooldown rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wrong_code_lockout_invalidates_otp() {
        let store = MemoryStore::default();
        store.store_otp(MOBILE, "123456", OTP_TTL_SECONDS).await.unwrap();

        for used in 1..MAX_VERIFY_ATTEMPTS {
            match verify_otp(&store, MOBILE, "000000").await {
                Err(AppError::InvalidRequest(message)) => {
                    let remaining = MAX_VERIFY_ATTEMPTS - used;
                    assert!(
                        message.contains(&format!("{} attempts remaining", remaining)),
                        "got: {}",
                        message
                    );
                }
                other => panic!("expected incorrect-code error, got {:?}", other),
            }
        }

        // the final wrong attempt burns the OTP entirely
        match verify_otp(&store, MOBILE, "000000").await {
            Err(AppError::InvalidRequest(message)) => {
                assert!(message.contains("Too many"), "got: {}", message)
            }
            other => panic!("expected lockout error, got {:?}", other),
        }

        assert!(store.fetch_otp(MOBILE).await.unwrap().is_none());

        // even the right code is useless now
        let result = verify_otp(&store, MOBILE, "123456").await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_correct_code_clears_all_state() {
        let store = MemoryStore::default();

        issue_otp(&store, &ConsoleSms, MOBILE).await.unwrap();
        let code = store.fetch_otp(MOBILE).await.unwrap().unwrap();

        verify_otp(&store, MOBILE, &code).await.unwrap();

        assert!(store.fetch_otp(MOBILE).await.unwrap().is_none());
        assert!(!store.in_cooldown(MOBILE).await.unwrap());
    }
}
