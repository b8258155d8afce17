//! Test data generators.
//!
//! Plain functions produce run-specific values for the fixture catalog;
//! the `*_strategy` functions are reusable proptest generators.

use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use proptest::prelude::*;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Serialize;
use uuid::Uuid;

/// A 1x1 PNG, base64 encoded.
pub const TINY_PNG_BASE64: &str = concat!(
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk",
    "YPhfDwAChwGA60e6kgAAAABJRU5ErkJggg=="
);

/// Signing key of forged tokens; never a server secret.
const FORGERY_KEY: &[u8] = b"forged-signing-key-not-known-to-the-server";

/// Short id unique to a run.
#[must_use]
pub fn run_id() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

/// Email address unique across runs.
#[must_use]
pub fn unique_email(tag: &str) -> String {
    format!("{tag}.{}@example.com", Uuid::new_v4().simple())
}

/// Random alphanumeric password; always contains a digit.
#[must_use]
pub fn random_password(len: usize) -> String {
    let len = len.max(8);
    let mut rng = rand::thread_rng();
    let mut password: String = (&mut rng)
        .sample_iter(&Alphanumeric)
        .take(len - 1)
        .map(char::from)
        .collect();
    password.push(char::from(b'0' + rng.gen_range(0..10u8)));
    password
}

/// Random 24-character hex object id.
#[must_use]
pub fn object_id() -> String {
    let mut rng = rand::thread_rng();
    (0..24)
        .map(|_| char::from_digit(rng.gen_range(0..16), 16).unwrap_or('0'))
        .collect()
}

/// Date `days` ahead of today as `YYYY-MM-DD`.
#[must_use]
pub fn future_date(days: i64) -> String {
    (Utc::now().date_naive() + Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}

#[derive(Serialize)]
struct ForgedClaims<'a> {
    sub: &'a str,
    role: &'a str,
    iat: i64,
    exp: i64,
}

/// Well-formed HS256 token for `subject` signed with a foreign key.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn forged_token(subject: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = ForgedClaims {
        sub: subject,
        role: "ADMIN",
        iat: now,
        exp: now + 3600,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(FORGERY_KEY))
}

/// Generate valid email addresses.
pub fn email_strategy() -> impl Strategy<Value = String> {
    ("[a-z][a-z0-9._]{0,15}", "[a-z]{2,10}", prop_oneof![Just("com"), Just("org"), Just("net")])
        .prop_map(|(local, domain, tld)| format!("{local}@{domain}.{tld}"))
}

/// Generate strings that are not email addresses.
pub fn malformed_email_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,12}",
        "[a-z]{1,8}@",
        "@[a-z]{1,8}\\.com",
        "[a-z]{1,8}@[a-z]{1,8}",
        "[a-z]{1,5} [a-z]{1,5}@[a-z]{2,6}\\.com",
    ]
}

/// Generate 24-character hex object ids.
pub fn object_id_strategy() -> impl Strategy<Value = String> {
    "[0-9a-f]{24}"
}

/// Generate valid calendar dates as `YYYY-MM-DD`.
pub fn booking_date_strategy() -> impl Strategy<Value = String> {
    (2025i32..2035, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| format!("{y:04}-{m:02}-{d:02}"))
}

/// Generate dates in formats other than `YYYY-MM-DD`.
pub fn malformed_date_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        (1u32..=28, 1u32..=12, 2025i32..2035).prop_map(|(d, m, y)| format!("{d:02}-{m:02}-{y}")),
        (2025i32..2035, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| format!("{y}/{m:02}/{d:02}")),
        (2025i32..2035, 13u32..=99, 1u32..=28).prop_map(|(y, m, d)| format!("{y}-{m}-{d:02}")),
        Just("tomorrow".to_string()),
    ]
}

/// Generate valid `HH:MM` times.
pub fn time_strategy() -> impl Strategy<Value = String> {
    (0u32..24, 0u32..60).prop_map(|(h, m)| format!("{h:02}:{m:02}"))
}

/// Generate injection payloads.
pub fn injection_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("' OR '1'='1' --".to_string()),
        Just("'; DROP TABLE users; --".to_string()),
        Just("<script>alert('xss')</script>".to_string()),
        Just("<img src=x onerror=alert(1)>".to_string()),
        "<svg onload=alert\\([0-9]{1,3}\\)>",
    ]
}

/// Generate profile names within documented limits.
pub fn name_strategy() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{1,20}"
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use chrono::NaiveDate;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn test_object_id_format() {
        for _ in 0..10 {
            let id = object_id();
            assert_eq!(id.len(), 24);
            assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn test_random_password() {
        let password = random_password(4);
        assert_eq!(password.len(), 8);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(password.chars().any(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_unique_values() {
        assert_ne!(unique_email("signup"), unique_email("signup"));
        assert_ne!(run_id(), run_id());
        assert_eq!(run_id().len(), 12);
    }

    #[test]
    fn test_future_date() {
        let date = NaiveDate::parse_from_str(&future_date(7), "%Y-%m-%d").unwrap();
        assert!(date > Utc::now().date_naive());
    }

    #[test]
    fn test_forged_token_shape() {
        let token = forged_token("jhon_smith@example.com").unwrap();
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_tiny_png_decodes() {
        let bytes = STANDARD.decode(TINY_PNG_BASE64).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn test_booking_date_strategy_parses() {
        let mut runner = TestRunner::default();
        for _ in 0..10 {
            let value = booking_date_strategy().new_tree(&mut runner).unwrap().current();
            assert!(NaiveDate::parse_from_str(&value, "%Y-%m-%d").is_ok());
        }
    }
}
