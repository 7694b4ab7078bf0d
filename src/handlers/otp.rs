use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

use crate::error::AppError;
use crate::middlewares::current_user;
use crate::models::*;
use crate::services::VerificationService;

fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Codes are passed through as submitted; padding fails the format check.
fn required_code(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// The middleware already rejects anonymous callers; this keeps the handlers
/// from ever reaching the store without an identity.
fn require_identity(req: &HttpRequest) -> Result<String, AppError> {
    current_user(req)
        .map(|u| u.user_id)
        .ok_or_else(|| AppError::AuthError("Unauthorized".to_string()))
}

#[utoipa::path(
    post,
    path = "/auth/send-email-otp",
    tag = "otp",
    request_body = SendEmailOtpRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "OTP sent", body = SendOtpResponse),
        (status = 400, description = "Invalid email format"),
        (status = 401, description = "Unauthorized"),
        (status = 429, description = "Code requested too recently"),
        (status = 500, description = "Failed to send OTP")
    )
)]
pub async fn send_email_otp(
    service: web::Data<VerificationService>,
    req: HttpRequest,
    request: web::Json<SendEmailOtpRequest>,
) -> Result<HttpResponse> {
    let user_id = match require_identity(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    let Some(email) = required(&request.email) else {
        return Ok(AppError::ValidationError("Email is required".to_string()).error_response());
    };

    log::debug!("Email OTP requested by {user_id}");
    match service.send_email_code(email).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            response, "OTP sent",
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/send-sms-otp",
    tag = "otp",
    request_body = SendSmsOtpRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "OTP sent", body = SendOtpResponse),
        (status = 400, description = "Invalid US phone number format"),
        (status = 401, description = "Unauthorized"),
        (status = 429, description = "Code requested too recently"),
        (status = 500, description = "Failed to send OTP")
    )
)]
pub async fn send_sms_otp(
    service: web::Data<VerificationService>,
    req: HttpRequest,
    request: web::Json<SendSmsOtpRequest>,
) -> Result<HttpResponse> {
    let user_id = match require_identity(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    let Some(phone) = required(&request.phone_number) else {
        return Ok(
            AppError::ValidationError("Phone number is required".to_string()).error_response(),
        );
    };

    log::debug!("SMS OTP requested by {user_id}");
    match service.send_phone_code(phone).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            response, "OTP sent",
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/verify-email-otp",
    tag = "otp",
    request_body = VerifyEmailOtpRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Email verified", body = VerifyOtpResponse),
        (status = 400, description = "Invalid format, or invalid or expired OTP"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn verify_email_otp(
    service: web::Data<VerificationService>,
    req: HttpRequest,
    request: web::Json<VerifyEmailOtpRequest>,
) -> Result<HttpResponse> {
    let user_id = match require_identity(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    let (Some(email), Some(otp)) = (required(&request.email), required_code(&request.otp))
    else {
        return Ok(
            AppError::ValidationError("Email and OTP are required".to_string()).error_response(),
        );
    };

    match service.verify_email_code(email, otp).await {
        Ok(response) => {
            log::info!("Email verified for user {user_id}");
            Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(response, "verified")))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/verify-sms-otp",
    tag = "otp",
    request_body = VerifySmsOtpRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Phone number verified", body = VerifyOtpResponse),
        (status = 400, description = "Invalid format, or invalid or expired OTP"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn verify_sms_otp(
    service: web::Data<VerificationService>,
    req: HttpRequest,
    request: web::Json<VerifySmsOtpRequest>,
) -> Result<HttpResponse> {
    let user_id = match require_identity(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    let (Some(phone), Some(otp)) = (
        required(&request.phone_number),
        required_code(&request.otp),
    ) else {
        return Ok(AppError::ValidationError(
            "Phone number and OTP are required".to_string(),
        )
        .error_response());
    };

    match service.verify_phone_code(phone, otp).await {
        Ok(response) => {
            log::info!("Phone verified for user {user_id}");
            Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(response, "verified")))
        }
        Err(e) => Ok(e.error_response()),
    }
}

/// Malformed JSON bodies get the same envelope as every other client error.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        AppError::ValidationError(format!("Invalid request body: {err}")).into()
    })
}

pub fn otp_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .app_data(json_config())
            .route("/send-email-otp", web::post().to(send_email_otp))
            .route("/send-sms-otp", web::post().to(send_sms_otp))
            .route("/verify-email-otp", web::post().to(verify_email_otp))
            .route("/verify-sms-otp", web::post().to(verify_sms_otp)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middlewares::AuthMiddleware;
    use crate::services::CodeEcho;
    use crate::services::verification_service::test_senders::{FailingSender, RecordingSender};
    use crate::store::OtpStore;
    use crate::utils::SessionVerifier;
    use crate::utils::jwt::test_tokens::mint;
    use actix_web::{App, http::StatusCode, test};
    use serde_json::{Value, json};
    use std::sync::Arc;

    const SECRET: &str = "handler-secret";

    struct Fixture {
        service: VerificationService,
        email: Arc<RecordingSender>,
        sms: Arc<RecordingSender>,
    }

    fn fixture() -> Fixture {
        let email = Arc::new(RecordingSender::default());
        let sms = Arc::new(RecordingSender::default());
        let service =
            VerificationService::new(Arc::new(OtpStore::default()), email.clone(), sms.clone());
        Fixture { service, email, sms }
    }

    fn bearer() -> (&'static str, String) {
        let token = mint(SECRET, "user_test", None, chrono::Duration::minutes(5));
        ("Authorization", format!("Bearer {token}"))
    }

    macro_rules! app {
        ($service:expr) => {
            test::init_service(
                App::new()
                    .wrap(AuthMiddleware::new(SessionVerifier::with_secret(SECRET)))
                    .app_data(web::Data::new($service))
                    .service(web::scope("/api").configure(otp_config)),
            )
            .await
        };
    }

    macro_rules! post {
        ($app:expr, $uri:expr, $body:expr) => {{
            let req = test::TestRequest::post()
                .uri($uri)
                .insert_header(bearer())
                .set_json($body)
                .to_request();
            let resp = test::call_service(&$app, req).await;
            let status = resp.status();
            let body: Value = test::read_body_json(resp).await;
            (status, body)
        }};
    }

    #[actix_web::test]
    async fn test_email_flow_verifies_once() {
        let f = fixture();
        let app = app!(f.service.clone());

        let (status, body) = post!(
            app,
            "/api/auth/send-email-otp",
            json!({ "email": "user@example.com" })
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "OTP sent");
        assert_eq!(body["data"]["expiresIn"], 120);
        assert!(body["data"].get("otp").is_none());

        let code = f.email.last_code_for("user@example.com").unwrap();
        let (status, body) = post!(
            app,
            "/api/auth/verify-email-otp",
            json!({ "email": "user@example.com", "otp": code })
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "verified");
        assert_eq!(body["data"]["verified"], true);

        let (status, body) = post!(
            app,
            "/api/auth/verify-email-otp",
            json!({ "email": "user@example.com", "otp": code })
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_OTP");
        assert_eq!(body["error"]["message"], "Invalid or expired OTP");
    }

    #[actix_web::test]
    async fn test_sms_flow_returns_canonical_number() {
        let f = fixture();
        let app = app!(f.service.clone());

        let (status, body) = post!(
            app,
            "/api/auth/send-sms-otp",
            json!({ "phoneNumber": "(555) 123-4567" })
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["phoneNumber"], "+15551234567");

        let code = f.sms.last_code_for("+15551234567").unwrap();
        let (status, _) = post!(
            app,
            "/api/auth/verify-sms-otp",
            json!({ "phoneNumber": "+15551234567", "otp": code })
        );
        assert_eq!(status, StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_padded_code_is_rejected_and_stays_valid() {
        let f = fixture();
        let app = app!(f.service.clone());

        post!(app, "/api/auth/send-email-otp", json!({ "email": "a@x.com" }));
        let code = f.email.last_code_for("a@x.com").unwrap();

        let (status, body) = post!(
            app,
            "/api/auth/verify-email-otp",
            json!({ "email": "a@x.com", "otp": format!(" {code} ") })
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Invalid OTP format");

        post!(
            app,
            "/api/auth/send-sms-otp",
            json!({ "phoneNumber": "5551234567" })
        );
        let sms_code = f.sms.last_code_for("+15551234567").unwrap();
        let (status, body) = post!(
            app,
            "/api/auth/verify-sms-otp",
            json!({ "phoneNumber": "5551234567", "otp": format!("{sms_code}\n") })
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Invalid OTP format");

        let (status, _) = post!(
            app,
            "/api/auth/verify-email-otp",
            json!({ "email": "a@x.com", "otp": code })
        );
        assert_eq!(status, StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_validation_errors() {
        let f = fixture();
        let app = app!(f.service.clone());

        let (status, body) = post!(app, "/api/auth/send-email-otp", json!({}));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Email is required");

        let (status, body) = post!(
            app,
            "/api/auth/send-email-otp",
            json!({ "email": "nope" })
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Invalid email format");

        let (status, body) = post!(
            app,
            "/api/auth/send-sms-otp",
            json!({ "phoneNumber": "555-1234" })
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Invalid US phone number format");

        let (status, body) = post!(
            app,
            "/api/auth/verify-sms-otp",
            json!({ "phoneNumber": "5551234567" })
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Phone number and OTP are required");

        let (status, body) = post!(
            app,
            "/api/auth/verify-email-otp",
            json!({ "email": "a@x.com", "otp": "12345" })
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Invalid OTP format");

        assert_eq!(f.email.count() + f.sms.count(), 0);
    }

    #[actix_web::test]
    async fn test_malformed_json_is_validation_error() {
        let f = fixture();
        let app = app!(f.service.clone());

        let req = test::TestRequest::post()
            .uri("/api/auth/send-email-otp")
            .insert_header(bearer())
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[actix_web::test]
    async fn test_unauthenticated_request_never_reaches_store() {
        let f = fixture();
        let app = app!(f.service.clone());

        let req = test::TestRequest::post()
            .uri("/api/auth/send-email-otp")
            .set_json(json!({ "email": "user@example.com" }))
            .to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(
            err.as_response_error().status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(f.email.count(), 0);
        assert!(f.service.store().is_empty().await);
    }

    #[actix_web::test]
    async fn test_handler_without_identity_is_unauthorized() {
        let f = fixture();
        // no middleware: handlers still refuse to run anonymously
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(f.service.clone()))
                .service(web::scope("/api").configure(otp_config)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/auth/send-sms-otp")
            .set_json(json!({ "phoneNumber": "5551234567" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(f.service.store().is_empty().await);
    }

    #[actix_web::test]
    async fn test_delivery_failure_is_server_error() {
        let failing = Arc::new(FailingSender::default());
        let service = VerificationService::new(
            Arc::new(OtpStore::default()),
            failing.clone(),
            Arc::new(RecordingSender::default()),
        );
        let app = app!(service.clone());

        let (status, body) = post!(
            app,
            "/api/auth/send-email-otp",
            json!({ "email": "user@example.com" })
        );
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "DELIVERY_ERROR");

        // issued code survives the failed send
        let code = failing.inner.last_code_for("user@example.com").unwrap();
        let (status, _) = post!(
            app,
            "/api/auth/verify-email-otp",
            json!({ "email": "user@example.com", "otp": code })
        );
        assert_eq!(status, StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_code_echo_in_diagnostic_mode() {
        let f = fixture();
        let service = f.service.clone().with_code_echo(Some(CodeEcho::for_tests()));
        let app = app!(service);

        let (status, body) = post!(
            app,
            "/api/auth/send-email-otp",
            json!({ "email": "user@example.com" })
        );
        assert_eq!(status, StatusCode::OK);
        let echoed = body["data"]["otp"].as_str().unwrap().to_string();
        assert_eq!(Some(echoed), f.email.last_code_for("user@example.com"));
    }
}
