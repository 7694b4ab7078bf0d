use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{AppError, AppResult};

/// Upper bound for code lifetimes and resend cooldowns.
pub const MAX_OTP_WINDOW_SECS: i64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub otp: OtpConfig,
    #[serde(default)]
    pub twilio: TwilioConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// "production" disables every diagnostic capability regardless of other flags.
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "production".to_string(),
        }
    }
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

/// Session token verification for the external identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IdentityConfig {
    /// PEM encoded RSA public key (RS256).
    #[serde(default)]
    pub jwt_public_key: Option<String>,
    /// Shared secret (HS256), for local development only.
    #[serde(default)]
    pub jwt_secret: Option<String>,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub authorized_parties: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpConfig {
    pub ttl_secs: i64,
    pub sweep_interval_secs: u64,
    /// 0 disables the resend throttle.
    pub resend_cooldown_secs: i64,
    pub case_fold_email: bool,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 120,
            sweep_interval_secs: 300,
            resend_cooldown_secs: 0,
            case_fold_email: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TwilioConfig {
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub from_phone: String,
}

impl TwilioConfig {
    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.from_phone.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EmailConfig {
    #[serde(default)]
    pub resend_api_key: String,
    #[serde(default)]
    pub from_address: String,
}

impl EmailConfig {
    pub fn is_configured(&self) -> bool {
        !self.resend_api_key.is_empty() && !self.from_address.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DiagnosticsConfig {
    /// Echo issued codes in API responses. Ignored in production.
    #[serde(default)]
    pub echo_codes: bool,
}

fn get_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse::<T>().ok())
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("{config_path} not found, configuring from environment");
                Config::default()
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn parse(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        toml::from_str(config_str).map_err(|e| format!("Failed to parse config file: {e}").into())
    }

    /// Environment variables win over file values.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = get_env("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(p) = get_env_parse("SERVER_PORT") {
            self.server.port = p;
        }
        if let Some(v) = get_env("APP_ENV") {
            self.app.environment = v;
        }

        if let Some(v) = get_env("IDENTITY_JWT_PUBLIC_KEY") {
            self.identity.jwt_public_key = Some(v);
        }
        if let Some(v) = get_env("IDENTITY_JWT_SECRET") {
            self.identity.jwt_secret = Some(v);
        }
        if let Some(v) = get_env("IDENTITY_ISSUER") {
            self.identity.issuer = Some(v);
        }
        if let Some(v) = get_env("IDENTITY_AUTHORIZED_PARTIES") {
            self.identity.authorized_parties = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Some(n) = get_env_parse("OTP_TTL_SECS") {
            self.otp.ttl_secs = n;
        }
        if let Some(n) = get_env_parse("OTP_SWEEP_INTERVAL_SECS") {
            self.otp.sweep_interval_secs = n;
        }
        if let Some(n) = get_env_parse("OTP_RESEND_COOLDOWN_SECS") {
            self.otp.resend_cooldown_secs = n;
        }
        if let Some(b) = get_env_parse("OTP_CASE_FOLD_EMAIL") {
            self.otp.case_fold_email = b;
        }

        if let Some(v) = get_env("TWILIO_ACCOUNT_SID") {
            self.twilio.account_sid = v;
        }
        if let Some(v) = get_env("TWILIO_AUTH_TOKEN") {
            self.twilio.auth_token = v;
        }
        if let Some(v) = get_env("TWILIO_FROM_PHONE") {
            self.twilio.from_phone = v;
        }

        if let Some(v) = get_env("RESEND_API_KEY") {
            self.email.resend_api_key = v;
        }
        if let Some(v) = get_env("EMAIL_FROM_ADDRESS") {
            self.email.from_address = v;
        }

        if let Some(b) = get_env_parse("DIAGNOSTICS_ECHO_CODES") {
            self.diagnostics.echo_codes = b;
        }
    }

    /// Rejects OTP timings that would make every code unusable or overflow
    /// timestamp arithmetic.
    pub fn validate(&self) -> AppResult<()> {
        let otp = &self.otp;
        if !(1..=MAX_OTP_WINDOW_SECS).contains(&otp.ttl_secs) {
            return Err(AppError::ConfigError(format!(
                "otp.ttl_secs must be between 1 and {MAX_OTP_WINDOW_SECS}, got {}",
                otp.ttl_secs
            )));
        }
        if !(0..=MAX_OTP_WINDOW_SECS).contains(&otp.resend_cooldown_secs) {
            return Err(AppError::ConfigError(format!(
                "otp.resend_cooldown_secs must be between 0 and {MAX_OTP_WINDOW_SECS}, got {}",
                otp.resend_cooldown_secs
            )));
        }
        if otp.sweep_interval_secs == 0 {
            return Err(AppError::ConfigError(
                "otp.sweep_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether issued codes may be echoed back to API callers.
    pub fn code_echo_enabled(&self) -> bool {
        self.diagnostics.echo_codes && !self.app.is_production()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            app: AppConfig::default(),
            identity: IdentityConfig::default(),
            otp: OtpConfig::default(),
            twilio: TwilioConfig::default(),
            email: EmailConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}
