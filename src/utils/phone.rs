use crate::error::{AppError, AppResult};
use regex::Regex;
use std::sync::OnceLock;

/// Turns user-entered phone numbers into the single string used as a store key.
///
/// Issuance and verification must go through the same implementation, or
/// lookups miss silently.
pub trait PhoneFormat: Send + Sync {
    fn canonicalize(&self, raw: &str) -> AppResult<String>;
}

/// US numbers only: `+1` followed by ten digits.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsPhoneFormat;

fn us_phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+1\d{10}$").expect("static regex"))
}

impl PhoneFormat for UsPhoneFormat {
    fn canonicalize(&self, raw: &str) -> AppResult<String> {
        let formatted = format_us_phone(raw);
        validate_us_phone(&formatted)?;
        Ok(formatted)
    }
}

/// Accepts only the canonical `+1XXXXXXXXXX` form.
pub fn validate_us_phone(phone: &str) -> AppResult<()> {
    if !us_phone_regex().is_match(phone) {
        return Err(AppError::ValidationError(
            "Invalid US phone number format".to_string(),
        ));
    }

    Ok(())
}

/// Strips punctuation and prefixes `+1` when the digit count allows it.
pub fn format_us_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() == 11 && digits.starts_with('1') {
        format!("+{digits}")
    } else if digits.len() == 10 {
        format!("+1{digits}")
    } else {
        phone.trim().to_string()
    }
}
