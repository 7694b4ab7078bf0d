use crate::error::AppResult;
use crate::utils::{mask_email, mask_phone};
use async_trait::async_trait;

/// Outbound channel that delivers a code to a destination.
#[async_trait]
pub trait OtpSender: Send + Sync {
    async fn send(&self, destination: &str, code: &str, ttl_secs: i64) -> AppResult<()>;
}

/// Human-readable validity window, e.g. "2 minutes" or "90 seconds".
pub fn validity_phrase(ttl_secs: i64) -> String {
    match ttl_secs {
        60 => "1 minute".to_string(),
        s if s > 0 && s % 60 == 0 => format!("{} minutes", s / 60),
        1 => "1 second".to_string(),
        s => format!("{s} seconds"),
    }
}

pub fn sms_body(code: &str, ttl_secs: i64) -> String {
    format!(
        "Your NRIDesiKart verification code is: {code}. Valid for {}. Do not share this code.",
        validity_phrase(ttl_secs)
    )
}

/// Stand-in used when no provider is configured. Logs that a code went out,
/// never the code itself.
#[derive(Debug, Clone)]
pub struct LogSender {
    label: &'static str,
}

impl LogSender {
    pub fn email() -> Self {
        Self { label: "email" }
    }

    pub fn sms() -> Self {
        Self { label: "sms" }
    }
}

#[async_trait]
impl OtpSender for LogSender {
    async fn send(&self, destination: &str, _code: &str, ttl_secs: i64) -> AppResult<()> {
        let masked = if destination.contains('@') {
            mask_email(destination)
        } else {
            mask_phone(destination)
        };
        log::warn!(
            "No {} provider configured; code for {masked} (valid {ttl_secs}s) was not delivered",
            self.label
        );
        Ok(())
    }
}
