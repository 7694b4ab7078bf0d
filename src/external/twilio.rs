use crate::config::TwilioConfig;
use crate::error::{AppError, AppResult};
use crate::external::sender::{OtpSender, sms_body};
use crate::utils::mask_phone;
use async_trait::async_trait;
use reqwest::Client;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

#[derive(Clone)]
pub struct TwilioSmsSender {
    client: Client,
    config: TwilioConfig,
    base_url: String,
}

impl TwilioSmsSender {
    pub fn new(config: TwilioConfig) -> Self {
        Self::with_base_url(config, TWILIO_API_BASE)
    }

    pub fn with_base_url(config: TwilioConfig, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            config,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.base_url, self.config.account_sid
        )
    }
}

#[async_trait]
impl OtpSender for TwilioSmsSender {
    async fn send(&self, phone: &str, code: &str, ttl_secs: i64) -> AppResult<()> {
        let body = sms_body(code, ttl_secs);

        let params = [
            ("To", phone),
            ("From", self.config.from_phone.as_str()),
            ("Body", body.as_str()),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::DeliveryError(format!("SMS request failed: {e}")))?;

        if response.status().is_success() {
            log::info!("Verification SMS sent: {}", mask_phone(phone));
            Ok(())
        } else {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!(
                "Verification SMS failed: {}, HTTP {status}, Error: {error_text}",
                mask_phone(phone)
            );
            Err(AppError::DeliveryError(format!(
                "SMS sending failed: HTTP {status}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_url() {
        let sender = TwilioSmsSender::new(TwilioConfig {
            account_sid: "AC123".to_string(),
            auth_token: "token".to_string(),
            from_phone: "+15550001111".to_string(),
        });
        assert_eq!(
            sender.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_delivery_error() {
        let sender = TwilioSmsSender::with_base_url(
            TwilioConfig {
                account_sid: "AC123".to_string(),
                auth_token: "token".to_string(),
                from_phone: "+15550001111".to_string(),
            },
            "http://127.0.0.1:9",
        );
        let err = sender.send("+15551234567", "123456", 120).await.unwrap_err();
        assert!(matches!(err, AppError::DeliveryError(_)));
    }
}
