use crate::config::EmailConfig;
use crate::error::{AppError, AppResult};
use crate::external::sender::{OtpSender, validity_phrase};
use crate::utils::mask_email;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Clone)]
pub struct ResendEmailSender {
    client: Client,
    api_key: String,
    from: String,
    endpoint: String,
}

#[derive(Serialize)]
struct ResendReq<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

impl ResendEmailSender {
    pub fn new(config: &EmailConfig) -> Self {
        Self::with_endpoint(config, RESEND_ENDPOINT)
    }

    pub fn with_endpoint(config: &EmailConfig, endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: config.resend_api_key.clone(),
            from: config.from_address.clone(),
            endpoint: endpoint.to_string(),
        }
    }
}

pub fn email_text(code: &str, ttl_secs: i64) -> String {
    format!(
        "Your NRIDesiKart verification code is: {code}\n\n\
         This code is valid for {}. If you did not request it, you can ignore this email.",
        validity_phrase(ttl_secs)
    )
}

#[async_trait]
impl OtpSender for ResendEmailSender {
    async fn send(&self, to: &str, code: &str, ttl_secs: i64) -> AppResult<()> {
        let text = email_text(code, ttl_secs);
        let body = ResendReq {
            from: &self.from,
            to: [to],
            subject: "Your verification code",
            text: &text,
        };

        self.client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                log::error!("Verification email failed: {}, Error: {e}", mask_email(to));
                AppError::DeliveryError(format!("Email sending failed: {e}"))
            })?;

        log::info!("Verification email sent: {}", mask_email(to));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_text_mentions_code_and_window() {
        let text = email_text("987654", 120);
        assert!(text.contains("987654"));
        assert!(text.contains("2 minutes"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_delivery_error() {
        let sender = ResendEmailSender::with_endpoint(
            &EmailConfig {
                resend_api_key: "re_test".to_string(),
                from_address: "noreply@example.com".to_string(),
            },
            "http://127.0.0.1:9/emails",
        );
        let err = sender.send("a@x.com", "123456", 120).await.unwrap_err();
        assert!(matches!(err, AppError::DeliveryError(_)));
    }
}
