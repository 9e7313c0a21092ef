//! crates/care_training_core/src/validation.rs
//!
//! Field validators for the public forms and the anti-bot screening that runs
//! before any field is looked at.

use std::net::IpAddr;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

use crate::domain::SubmissionMetadata;

//=========================================================================================
// Field Validation
//=========================================================================================

/// A user-facing message explaining why a field was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type FieldResult<T> = Result<T, ValidationError>;

const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 100;
const NAME_MAX_SPECIAL_RATIO: f64 = 0.3;
const EMAIL_MAX_CHARS: usize = 254;

fn phone_separators() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s\-().]").expect("static regex"))
}

fn uk_phone_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^0[1-9]\d{8,9}$").expect("static regex"))
}

fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
        )
        .expect("static regex")
    })
}

/// Validates a UK landline or mobile number and returns it normalised to national digits.
///
/// `+44` / `0044` prefixes are rewritten to a leading `0`, so `+44 7123 456789` becomes
/// `07123456789`.
pub fn validate_uk_phone(value: &str) -> FieldResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("Phone number is required."));
    }

    let mut compact = phone_separators().replace_all(trimmed, "").into_owned();
    let international = compact
        .strip_prefix("+44")
        .or_else(|| compact.strip_prefix("0044"))
        .map(|rest| format!("0{}", rest.trim_start_matches('0')));
    if let Some(national) = international {
        compact = national;
    }

    let digits: String = compact.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 10 && digits.len() != 11 {
        return Err(ValidationError::new(
            "Please enter a valid UK phone number with 10 or 11 digits, e.g. 01622 123456 or 07123 456789.",
        ));
    }

    let mut chars = digits.chars();
    let first = chars.next();
    let second = chars.next();
    if first != Some('0') || second == Some('0') {
        if first != Some('0') && digits.len() == 10 {
            return Err(ValidationError::new(format!(
                "UK phone numbers should start with 0. Did you mean 0{}?",
                digits
            )));
        }
        return Err(ValidationError::new(
            "Please enter a valid UK phone number starting with 0, e.g. 01622 123456 or 07123 456789.",
        ));
    }

    if !uk_phone_pattern().is_match(&digits) {
        return Err(ValidationError::new("Please enter a valid UK phone number."));
    }

    let rest = &digits[1..];
    if rest.chars().all(|c| Some(c) == rest.chars().next()) {
        return Err(ValidationError::new("Please enter a real phone number."));
    }

    Ok(digits)
}

/// Validates a person's name and returns it trimmed.
pub fn validate_name(value: &str) -> FieldResult<String> {
    let name = value.trim();
    if name.is_empty() {
        return Err(ValidationError::new("Name is required."));
    }

    let length = name.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&length) {
        return Err(ValidationError::new(format!(
            "Name must be between {} and {} characters.",
            NAME_MIN_CHARS, NAME_MAX_CHARS
        )));
    }

    if name.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new("Name cannot be only numbers."));
    }

    let special = name
        .chars()
        .filter(|c| !(c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '\''))
        .count();
    if special as f64 / length as f64 > NAME_MAX_SPECIAL_RATIO {
        return Err(ValidationError::new("Name contains too many special characters."));
    }

    Ok(name.to_string())
}

/// Validates an email address. An empty value is only accepted when the field is optional.
pub fn validate_email(value: &str, required: bool) -> FieldResult<Option<String>> {
    let email = value.trim();
    if email.is_empty() {
        if required {
            return Err(ValidationError::new("Email address is required."));
        }
        return Ok(None);
    }

    if email.len() > EMAIL_MAX_CHARS || !email_pattern().is_match(email) {
        return Err(ValidationError::new("Please enter a valid email address."));
    }

    Ok(Some(email.to_string()))
}

//=========================================================================================
// Anti-Bot Screening
//=========================================================================================

/// Timing limits for a human filling in a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AntiBotPolicy {
    pub min_seconds: i64,
    pub max_seconds: i64,
}

impl Default for AntiBotPolicy {
    fn default() -> Self {
        Self {
            min_seconds: 3,
            max_seconds: 3600,
        }
    }
}

/// The hidden fields every public form carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AntiBotFields {
    /// Honeypot; people never see it, so it must stay empty.
    pub website: String,
    /// Unix timestamp written when the form was rendered; `0` when unknown.
    pub form_loaded_at: i64,
}

/// Request metadata as seen by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub x_forwarded_for: Option<String>,
    pub client_ip: Option<String>,
    pub remote_addr: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

impl RequestContext {
    /// Best-effort client IP: first `X-Forwarded-For` hop, then `Client-Ip`, then the peer
    /// address. Only syntactically valid addresses are trusted.
    pub fn client_ip(&self) -> String {
        let forwarded = self
            .x_forwarded_for
            .as_deref()
            .and_then(|list| list.split(',').next());
        [forwarded, self.client_ip.as_deref(), self.remote_addr.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|candidate| candidate.parse::<IpAddr>().is_ok())
            .unwrap_or("0.0.0.0")
            .to_string()
    }
}

/// Why a submission was treated as automated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AntiBotRejection {
    #[error("honeypot field was filled in")]
    Honeypot,
    #[error("form submitted {elapsed}s after loading")]
    TooFast { elapsed: i64 },
    #[error("form was loaded {elapsed}s ago")]
    Stale { elapsed: i64 },
}

/// Screens a submission for bots. On success returns the metadata to store with it.
pub fn validate_anti_bot(
    fields: &AntiBotFields,
    request: &RequestContext,
    policy: &AntiBotPolicy,
    now: DateTime<Utc>,
) -> Result<SubmissionMetadata, AntiBotRejection> {
    if !fields.website.trim().is_empty() {
        return Err(AntiBotRejection::Honeypot);
    }

    let time_taken = if fields.form_loaded_at > 0 {
        let elapsed = now.timestamp() - fields.form_loaded_at;
        if elapsed < policy.min_seconds {
            return Err(AntiBotRejection::TooFast { elapsed });
        }
        if elapsed > policy.max_seconds {
            return Err(AntiBotRejection::Stale { elapsed });
        }
        Some(elapsed)
    } else {
        None
    };

    Ok(SubmissionMetadata {
        ip: request.client_ip(),
        user_agent: request.user_agent.clone().unwrap_or_default(),
        referrer: request.referrer.clone().unwrap_or_default(),
        time_taken,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn phone_accepts_national_and_international_formats() {
        assert_eq!(validate_uk_phone("+447123456789").unwrap(), "07123456789");
        assert_eq!(validate_uk_phone("0044 (0)7123 456789").unwrap(), "07123456789");
        assert_eq!(validate_uk_phone("01622 123-456").unwrap(), "01622123456");
        assert_eq!(validate_uk_phone(" 020.7946.0958 ").unwrap(), "02079460958");
    }

    #[test]
    fn phone_missing_leading_zero_gets_a_hint() {
        let err = validate_uk_phone("7123456789").unwrap_err();
        assert!(err.message.contains("should start with 0"), "{}", err);
    }

    #[test]
    fn phone_rejects_bad_shapes() {
        assert!(validate_uk_phone("").is_err());
        assert!(validate_uk_phone("12345").is_err());
        assert!(validate_uk_phone("00123456789").is_err());
        assert!(validate_uk_phone("71234567890").is_err());
        assert!(validate_uk_phone("01111111111").is_err());
        assert!(validate_uk_phone("0111111111").is_err());
    }

    #[test]
    fn names() {
        assert_eq!(validate_name("  O'Brien-Smith ").unwrap(), "O'Brien-Smith");
        assert_eq!(validate_name("Zoë Ndiaye").unwrap(), "Zoë Ndiaye");
        assert!(validate_name("12345").is_err());
        assert!(validate_name("A").is_err());
        assert!(validate_name("").is_err());
        assert!(validate_name(&"a".repeat(101)).is_err());
        assert!(validate_name("$$$ cash $$$").is_err());
    }

    #[test]
    fn emails() {
        assert_eq!(validate_email("", false).unwrap(), None);
        assert!(validate_email("", true).is_err());
        assert!(validate_email("not-an-email", true).is_err());
        assert!(validate_email("jo@localhost", true).is_err());
        assert_eq!(
            validate_email(" jo.bloggs+care@example.co.uk ", true).unwrap().as_deref(),
            Some("jo.bloggs+care@example.co.uk")
        );
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(validate_email(&long, true).is_err());
    }

    fn request() -> RequestContext {
        RequestContext {
            x_forwarded_for: Some("203.0.113.9, 10.0.0.1".into()),
            client_ip: None,
            remote_addr: Some("10.0.0.1".into()),
            user_agent: Some("Mozilla/5.0".into()),
            referrer: Some("https://example.com/contact".into()),
        }
    }

    #[test]
    fn honeypot_rejects_regardless_of_timing() {
        let now = Utc::now();
        let fields = AntiBotFields {
            website: "http://spam.example".into(),
            form_loaded_at: (now - Duration::seconds(30)).timestamp(),
        };
        assert_eq!(
            validate_anti_bot(&fields, &request(), &AntiBotPolicy::default(), now),
            Err(AntiBotRejection::Honeypot)
        );
    }

    #[test]
    fn timing_window() {
        let now = Utc::now();
        let policy = AntiBotPolicy::default();
        let loaded = |secs: i64| AntiBotFields {
            website: String::new(),
            form_loaded_at: (now - Duration::seconds(secs)).timestamp(),
        };

        assert!(matches!(
            validate_anti_bot(&loaded(1), &request(), &policy, now),
            Err(AntiBotRejection::TooFast { .. })
        ));
        assert!(matches!(
            validate_anti_bot(&loaded(3601), &request(), &policy, now),
            Err(AntiBotRejection::Stale { .. })
        ));

        let metadata = validate_anti_bot(&loaded(10), &request(), &policy, now).unwrap();
        assert_eq!(metadata.time_taken, Some(10));
        assert_eq!(metadata.ip, "203.0.113.9");
        assert_eq!(metadata.user_agent, "Mozilla/5.0");
    }

    #[test]
    fn missing_timestamp_skips_timing_check() {
        let metadata = validate_anti_bot(
            &AntiBotFields::default(),
            &RequestContext::default(),
            &AntiBotPolicy::default(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(metadata.time_taken, None);
        assert_eq!(metadata.ip, "0.0.0.0");
    }

    #[test]
    fn client_ip_skips_invalid_candidates() {
        let ctx = RequestContext {
            x_forwarded_for: Some("unknown".into()),
            client_ip: Some("not-an-ip".into()),
            remote_addr: Some("2001:db8::1".into()),
            ..Default::default()
        };
        assert_eq!(ctx.client_ip(), "2001:db8::1");
    }
}
