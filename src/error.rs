use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    /// Absent, expired, consumed and mismatched codes all land here.
    #[error("Invalid or expired OTP")]
    InvalidOrExpiredCode,

    #[error("Too many requests, retry after {0}s")]
    TooManyRequests(i64),

    #[error("Delivery error: {0}")]
    DeliveryError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidOrExpiredCode => {
                StatusCode::BAD_REQUEST
            }
            AppError::AuthError(_) | AppError::JwtError(_) => StatusCode::UNAUTHORIZED,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::DeliveryError(_) | AppError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (error_code, message) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                ("VALIDATION_ERROR", msg.clone())
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                ("AUTH_ERROR", msg.clone())
            }
            AppError::JwtError(err) => {
                log::warn!("Session token rejected: {err}");
                ("AUTH_ERROR", "Unauthorized".to_string())
            }
            AppError::InvalidOrExpiredCode => ("INVALID_OTP", self.to_string()),
            AppError::TooManyRequests(secs) => {
                log::warn!("Code resend throttled, retry after {secs}s");
                (
                    "TOO_MANY_REQUESTS",
                    format!("Please wait {secs} seconds before requesting a new code"),
                )
            }
            AppError::DeliveryError(msg) => {
                log::error!("Delivery error: {msg}");
                ("DELIVERY_ERROR", "Failed to send OTP".to_string())
            }
            AppError::ConfigError(_) => {
                log::error!("Internal error: {self}");
                ("INTERNAL_ERROR", "Internal server error".to_string())
            }
        };

        let mut builder = HttpResponse::build(self.status_code());
        if let AppError::TooManyRequests(secs) = self {
            builder.insert_header(("Retry-After", secs.to_string()));
        }
        builder.json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::ValidationError("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InvalidOrExpiredCode.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::AuthError("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::TooManyRequests(30).status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::DeliveryError("smtp down".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_throttle_response_sets_retry_after() {
        let resp = AppError::TooManyRequests(42).error_response();
        assert_eq!(resp.headers().get("Retry-After").unwrap(), "42");
    }

    #[actix_web::test]
    async fn test_config_error_hides_details() {
        let resp = AppError::ConfigError("otp.ttl_secs out of range".into()).error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(body["error"]["message"], "Internal server error");
    }
}
