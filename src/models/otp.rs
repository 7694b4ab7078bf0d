use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Fields are optional so a missing value gets a specific message instead of
// a generic deserialization error.

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailOtpRequest {
    #[schema(example = "user@example.com")]
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendSmsOtpRequest {
    #[schema(example = "(555) 123-4567")]
    pub phone_number: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailOtpRequest {
    #[schema(example = "user@example.com")]
    pub email: Option<String>,
    #[schema(example = "123456")]
    pub otp: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifySmsOtpRequest {
    #[schema(example = "+15551234567")]
    pub phone_number: Option<String>,
    #[schema(example = "123456")]
    pub otp: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpResponse {
    /// Seconds until the issued code expires.
    pub expires_in: i64,
    /// Canonical number the code was bound to (SMS only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Raw code; present only when diagnostic echo is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponse {
    pub verified: bool,
    /// Canonical target that was verified.
    pub target: String,
}
