use crate::error::{AppError, AppResult};
use regex::Regex;
use std::sync::OnceLock;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex"))
}

pub fn validate_email(email: &str) -> AppResult<()> {
    if !email_regex().is_match(email) {
        return Err(AppError::ValidationError("Invalid email format".to_string()));
    }
    Ok(())
}

/// Trims and validates an email target; lowercases it when `case_fold` is set.
#[derive(Debug, Clone, Copy)]
pub struct EmailFormat {
    pub case_fold: bool,
}

impl Default for EmailFormat {
    fn default() -> Self {
        Self { case_fold: true }
    }
}

impl EmailFormat {
    pub fn canonicalize(&self, raw: &str) -> AppResult<String> {
        let trimmed = raw.trim();
        validate_email(trimmed)?;
        if self.case_fold {
            Ok(trimmed.to_lowercase())
        } else {
            Ok(trimmed.to_string())
        }
    }
}
