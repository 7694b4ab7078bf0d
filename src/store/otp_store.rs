//! In-process store for short-lived, single-use verification codes.
//!
//! Two namespaces (email, phone) each sit behind their own mutex. Every
//! operation is a handful of map calls under one lock acquisition, so
//! check-and-delete in [`OtpStore::verify`] is atomic and two racing
//! verifications of the same code cannot both succeed. Nothing here performs
//! I/O; delivery happens in the caller after `issue` returns.
//!
//! Records live in process memory only and are lost on restart. Running more
//! than one instance needs a shared backend to keep one live code per target.

use chrono::{DateTime, Duration, Utc};
use constant_time_eq::constant_time_eq;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::utils::generate_six_digit_code;

pub const DEFAULT_OTP_TTL_SECS: i64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Email,
    Phone,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Email, Channel::Phone];
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Email => write!(f, "email"),
            Channel::Phone => write!(f, "phone"),
        }
    }
}

/// Time source for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct VerificationRecord {
    pub target: String,
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl VerificationRecord {
    /// Valid up to and including `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct IssuedCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Rejected by the resend throttle; holds the wait until the next issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAfter(pub Duration);

type Namespace = Mutex<HashMap<String, VerificationRecord>>;

pub struct OtpStore {
    email: Namespace,
    phone: Namespace,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl OtpStore {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            email: Mutex::new(HashMap::new()),
            phone: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn namespace(&self, channel: Channel) -> &Namespace {
        match channel {
            Channel::Email => &self.email,
            Channel::Phone => &self.phone,
        }
    }

    fn new_record(&self, target: &str) -> VerificationRecord {
        let issued_at = self.clock.now();
        VerificationRecord {
            target: target.to_string(),
            code: generate_six_digit_code(),
            issued_at,
            expires_at: issued_at + self.ttl,
        }
    }

    /// Issues a fresh code for `target`, replacing any earlier one.
    ///
    /// `target` must already be canonical; the store keys on exact string
    /// equality and does not re-validate.
    pub async fn issue(&self, channel: Channel, target: &str) -> IssuedCode {
        let record = self.new_record(target);
        let issued = IssuedCode {
            code: record.code.clone(),
            expires_at: record.expires_at,
        };

        let mut map = self.namespace(channel).lock().await;
        map.insert(target.to_string(), record);
        issued
    }

    /// Like [`issue`](Self::issue), but refuses while the live code for
    /// `target` is younger than `cooldown`. Expired records never block.
    pub async fn issue_throttled(
        &self,
        channel: Channel,
        target: &str,
        cooldown: Duration,
    ) -> Result<IssuedCode, RetryAfter> {
        let mut map = self.namespace(channel).lock().await;
        let now = self.clock.now();

        if let Some(existing) = map.get(target)
            && !existing.is_expired(now)
        {
            let ready_at = existing.issued_at + cooldown;
            if now < ready_at {
                return Err(RetryAfter(ready_at - now));
            }
        }

        let record = self.new_record(target);
        let issued = IssuedCode {
            code: record.code.clone(),
            expires_at: record.expires_at,
        };
        map.insert(target.to_string(), record);
        Ok(issued)
    }

    /// Checks `code` against the live record for `target`.
    ///
    /// Returns `true` exactly once per issued code. Absent, expired and
    /// mismatched codes all return `false`. Expired records are removed on
    /// touch; a mismatch keeps the record and its expiry untouched.
    pub async fn verify(&self, channel: Channel, target: &str, code: &str) -> bool {
        let mut map = self.namespace(channel).lock().await;
        let now = self.clock.now();

        let Some(record) = map.get(target) else {
            return false;
        };

        if record.is_expired(now) {
            map.remove(target);
            return false;
        }

        if !constant_time_eq(record.code.as_bytes(), code.as_bytes()) {
            return false;
        }

        map.remove(target);
        true
    }

    /// Drops every expired record in both namespaces. Returns how many went.
    pub async fn sweep(&self) -> usize {
        let mut removed = 0;
        for channel in Channel::ALL {
            let mut map = self.namespace(channel).lock().await;
            let now = self.clock.now();
            let before = map.len();
            map.retain(|_, record| !record.is_expired(now));
            removed += before - map.len();
        }
        removed
    }

    /// Records held for `channel`, including expired ones not yet swept.
    pub async fn len(&self, channel: Channel) -> usize {
        self.namespace(channel).lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len(Channel::Email).await == 0 && self.len(Channel::Phone).await == 0
    }
}

impl Default for OtpStore {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_OTP_TTL_SECS))
    }
}
