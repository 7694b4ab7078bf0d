use chrono::Duration;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::external::OtpSender;
use crate::models::{SendOtpResponse, VerifyOtpResponse};
use crate::store::{Channel, IssuedCode, OtpStore, RetryAfter};
use crate::utils::*;

/// Permission to return raw codes in issuance responses.
///
/// Only obtainable from a non-production configuration; the service never
/// looks at the environment itself.
#[derive(Debug, Clone, Copy)]
pub struct CodeEcho(());

impl CodeEcho {
    pub fn from_config(config: &Config) -> Option<Self> {
        config.code_echo_enabled().then_some(CodeEcho(()))
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        CodeEcho(())
    }
}

/// Canonicalizes targets, drives the store and hands codes to the outbound
/// senders.
#[derive(Clone)]
pub struct VerificationService {
    store: Arc<OtpStore>,
    email_sender: Arc<dyn OtpSender>,
    sms_sender: Arc<dyn OtpSender>,
    email_format: EmailFormat,
    phone_format: Arc<dyn PhoneFormat>,
    resend_cooldown: Duration,
    code_echo: Option<CodeEcho>,
}

impl VerificationService {
    pub fn new(
        store: Arc<OtpStore>,
        email_sender: Arc<dyn OtpSender>,
        sms_sender: Arc<dyn OtpSender>,
    ) -> Self {
        Self {
            store,
            email_sender,
            sms_sender,
            email_format: EmailFormat::default(),
            phone_format: Arc::new(UsPhoneFormat),
            resend_cooldown: Duration::zero(),
            code_echo: None,
        }
    }

    pub fn with_email_format(mut self, email_format: EmailFormat) -> Self {
        self.email_format = email_format;
        self
    }

    pub fn with_phone_format(mut self, phone_format: Arc<dyn PhoneFormat>) -> Self {
        self.phone_format = phone_format;
        self
    }

    pub fn with_resend_cooldown(mut self, cooldown: Duration) -> Self {
        self.resend_cooldown = cooldown;
        self
    }

    pub fn with_code_echo(mut self, echo: Option<CodeEcho>) -> Self {
        self.code_echo = echo;
        self
    }

    pub fn store(&self) -> &Arc<OtpStore> {
        &self.store
    }

    pub async fn send_email_code(&self, raw_email: &str) -> AppResult<SendOtpResponse> {
        let email = self.email_format.canonicalize(raw_email)?;
        let issued = self.issue(Channel::Email, &email).await?;

        log::info!("Email code issued for {}", mask_email(&email));
        self.email_sender
            .send(&email, &issued.code, self.store.ttl().num_seconds())
            .await?;

        Ok(self.send_response(issued, None))
    }

    pub async fn send_phone_code(&self, raw_phone: &str) -> AppResult<SendOtpResponse> {
        let phone = self.phone_format.canonicalize(raw_phone)?;
        let issued = self.issue(Channel::Phone, &phone).await?;

        log::info!("SMS code issued for {}", mask_phone(&phone));
        self.sms_sender
            .send(&phone, &issued.code, self.store.ttl().num_seconds())
            .await?;

        Ok(self.send_response(issued, Some(phone)))
    }

    pub async fn verify_email_code(&self, raw_email: &str, otp: &str) -> AppResult<VerifyOtpResponse> {
        validate_otp_shape(otp)?;
        let email = self.email_format.canonicalize(raw_email)?;
        self.consume(Channel::Email, &email, otp).await?;

        log::info!("Email verified for {}", mask_email(&email));
        Ok(VerifyOtpResponse {
            verified: true,
            target: email,
        })
    }

    pub async fn verify_phone_code(&self, raw_phone: &str, otp: &str) -> AppResult<VerifyOtpResponse> {
        validate_otp_shape(otp)?;
        let phone = self.phone_format.canonicalize(raw_phone)?;
        self.consume(Channel::Phone, &phone, otp).await?;

        log::info!("Phone verified for {}", mask_phone(&phone));
        Ok(VerifyOtpResponse {
            verified: true,
            target: phone,
        })
    }

    async fn issue(&self, channel: Channel, target: &str) -> AppResult<IssuedCode> {
        if self.resend_cooldown <= Duration::zero() {
            return Ok(self.store.issue(channel, target).await);
        }

        self.store
            .issue_throttled(channel, target, self.resend_cooldown)
            .await
            .map_err(|RetryAfter(wait)| {
                let secs = (wait.num_milliseconds() + 999) / 1000;
                AppError::TooManyRequests(secs.max(1))
            })
    }

    async fn consume(&self, channel: Channel, target: &str, otp: &str) -> AppResult<()> {
        if self.store.verify(channel, target, otp).await {
            Ok(())
        } else {
            log::warn!("Rejected {channel} code");
            Err(AppError::InvalidOrExpiredCode)
        }
    }

    fn send_response(&self, issued: IssuedCode, phone_number: Option<String>) -> SendOtpResponse {
        SendOtpResponse {
            expires_in: self.store.ttl().num_seconds(),
            phone_number,
            otp: self.code_echo.map(|_| issued.code),
        }
    }
}

fn validate_otp_shape(otp: &str) -> AppResult<()> {
    if !is_six_digit_code(otp) {
        return Err(AppError::ValidationError("Invalid OTP format".to_string()));
    }
    Ok(())
}
