/// SMS delivery for OTP codes. Uses Twilio when credentials are configured,
/// otherwise falls back to echoing codes into the log for local development.
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::utils::otp::mask_mobile;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

#[derive(Debug, Clone)]
pub struct SmsDelivery {
    /// "sms" or "console"
    pub channel: &'static str,
    pub provider_sid: Option<String>,
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_otp(&self, mobile: &str, code: &str) -> Result<SmsDelivery, String>;
}

pub fn build_otp_message(code: &str) -> String {
    format!("{} is your Telemed verification code. Valid for 5 minutes.", code)
}

/// Twilio Programmable Messaging client
pub struct TwilioSms {
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioSms {
    pub fn new(account_sid: String, auth_token: String, from_number: String) -> Self {
        Self {
            account_sid,
            auth_token,
            from_number,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TwilioMessageResponse {
    sid: Option<String>,
}

#[async_trait]
impl SmsSender for TwilioSms {
    async fn send_otp(&self, mobile: &str, code: &str) -> Result<SmsDelivery, String> {
        let url = format!("{}/Accounts/{}/Messages.json", TWILIO_API_BASE, self.account_sid);
        let to = format!("+91{}", mobile);
        let body = build_otp_message(code);

        let credentials = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.account_sid, self.auth_token));

        let client = reqwest::Client::new();
        let response = client
            .post(&url)
            .header("Authorization", format!("Basic {}", credentials))
            .form(&[
                ("To", to.as_str()),
                ("From", self.from_number.as_str()),
                ("Body", body.as_str()),
            ])
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| format!("Failed to reach Twilio: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("Twilio API error: HTTP {}", response.status()));
        }

        let message: TwilioMessageResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse Twilio response: {}", e))?;

        log::info!(
            "📨 OTP SMS queued for {} (sid: {})",
            mask_mobile(mobile),
            message.sid.as_deref().unwrap_or("unknown")
        );

        Ok(SmsDelivery {
            channel: "sms",
            provider_sid: message.sid,
        })
    }
}

/// Development sender: prints the code instead of dispatching it
pub struct ConsoleSms;

#[async_trait]
impl SmsSender for ConsoleSms {
    async fn send_otp(&self, mobile: &str, code: &str) -> Result<SmsDelivery, String> {
        log::warn!("📱 [console SMS] OTP for {}: {}", mask_mobile(mobile), code);
        Ok(SmsDelivery {
            channel: "console",
            provider_sid: None,
        })
    }
}

/// Picks the sender from TWILIO_* environment variables.
pub fn from_env() -> Arc<dyn SmsSender> {
    let sid = std::env::var("TWILIO_ACCOUNT_SID").unwrap_or_default();
    let token = std::env::var("TWILIO_AUTH_TOKEN").unwrap_or_default();
    let from = std::env::var("TWILIO_FROM_NUMBER").unwrap_or_default();

    if !sid.is_empty() && !token.is_empty() && !from.is_empty() {
        log::info!("📨 Twilio SMS sender configured (from: {})", from);
        Arc::new(TwilioSms::new(sid, token, from))
    } else {
        log::warn!("⚠️ Twilio credentials not set - OTP codes will be echoed to the log");
        Arc::new(ConsoleSms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_message_contains_code_and_validity() {
        let message = build_otp_message("482910");
        assert!(message.starts_with("482910"));
        assert!(message.contains("5 minutes"));
    }

    #[tokio::test]
    async fn test_console_sender_always_succeeds() {
        let delivery = ConsoleSms.send_otp("9876543210", "123456").await.unwrap();
        assert_eq!(delivery.channel, "console");
        assert!(delivery.provider_sid.is_none());
    }
}
