use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use desikart_backend::{
    config::Config,
    external::{LogSender, OtpSender, ResendEmailSender, TwilioSmsSender},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::{CodeEcho, VerificationService},
    store::OtpStore,
    swagger::swagger_config,
    tasks,
    utils::{EmailFormat, SessionVerifier},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration");

    let verifier =
        SessionVerifier::from_config(&config.identity).expect("Invalid identity configuration");

    let store = Arc::new(OtpStore::new(chrono::Duration::seconds(config.otp.ttl_secs)));

    let email_sender: Arc<dyn OtpSender> = if config.email.is_configured() {
        Arc::new(ResendEmailSender::new(&config.email))
    } else {
        log::warn!("Email provider not configured; email codes will not be delivered");
        Arc::new(LogSender::email())
    };
    let sms_sender: Arc<dyn OtpSender> = if config.twilio.is_configured() {
        Arc::new(TwilioSmsSender::new(config.twilio.clone()))
    } else {
        log::warn!("Twilio not configured; SMS codes will not be delivered");
        Arc::new(LogSender::sms())
    };

    let code_echo = CodeEcho::from_config(&config);
    if code_echo.is_some() {
        log::warn!(
            "Diagnostic code echo enabled ({} environment)",
            config.app.environment
        );
    } else if config.diagnostics.echo_codes {
        log::warn!("Ignoring diagnostics.echo_codes in production");
    }

    let verification_service = VerificationService::new(store.clone(), email_sender, sms_sender)
        .with_email_format(EmailFormat {
            case_fold: config.otp.case_fold_email,
        })
        .with_resend_cooldown(chrono::Duration::seconds(config.otp.resend_cooldown_secs))
        .with_code_echo(code_echo);

    tasks::spawn_all(
        store.clone(),
        std::time::Duration::from_secs(config.otp.sweep_interval_secs),
    );

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let allowed_origins = config.identity.authorized_parties.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(AuthMiddleware::new(verifier.clone()))
            .wrap(create_cors(&allowed_origins))
            .wrap(Logger::default())
            .app_data(web::Data::new(verification_service.clone()))
            .configure(swagger_config)
            .service(web::scope("/api").configure(handlers::otp_config))
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
