//! Run configuration for the contract harness.
//!
//! The configuration is constructed once at suite start and handed to every
//! client and fixture constructor. Values come from environment variables
//! (optionally through a `.env` file) or from an injected lookup function.

use crate::{HarnessError, HarnessResult, HttpConfig, RetryConfig, TracingConfig};
use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Default base URL of the system under test.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Credentials of the pre-provisioned test user.
#[derive(Debug, Clone)]
pub struct TestCredentials {
    /// Signin email
    pub email: String,
    /// Signin password
    pub password: SecretString,
    /// Profile first name
    pub first_name: String,
    /// Profile last name
    pub last_name: String,
}

impl TestCredentials {
    /// Create credentials with the default profile names.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
            first_name: "John".to_string(),
            last_name: "Smith".to_string(),
        }
    }

    /// Set the profile names.
    #[must_use]
    pub fn with_names(
        mut self,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }

    /// Expose the password for a signin payload.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl Default for TestCredentials {
    fn default() -> Self {
        Self::new("jhon_smith@example.com", "Y2kjqKHX")
    }
}

/// Harness configuration.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Base URL of the system under test
    pub base_url: Url,
    /// HTTP client settings
    pub http: HttpConfig,
    /// Connect retry settings
    pub retry: RetryConfig,
    /// Test user credentials
    pub credentials: TestCredentials,
    /// Tracing settings
    pub tracing: TracingConfig,
    /// Run resource scopes concurrently
    pub parallel: bool,
}

impl HarnessConfig {
    /// Create a configuration with defaults for the given base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not an absolute http(s) URL.
    pub fn for_base_url(base_url: &str) -> HarnessResult<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            http: HttpConfig::default(),
            retry: RetryConfig::default(),
            credentials: TestCredentials::default(),
            tracing: TracingConfig::default(),
            parallel: false,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an invalid value.
    pub fn from_env() -> HarnessResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through a lookup function.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first variable with an invalid value.
    pub fn from_lookup<F>(lookup: F) -> HarnessResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("RESTAURANT_API_BASE_URL")
            .or_else(|| lookup("BASE_URL"))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut config = Self::for_base_url(&base_url)?;

        config.http = config
            .http
            .with_timeout(parse_secs(&lookup, "HARNESS_TIMEOUT_SECS", 10)?)
            .with_connect_timeout(parse_secs(&lookup, "HARNESS_CONNECT_TIMEOUT_SECS", 5)?);
        config.retry = config
            .retry
            .with_max_retries(parse_var(&lookup, "HARNESS_CONNECT_RETRIES", 1)?);

        let defaults = TestCredentials::default();
        let password =
            lookup("TEST_USER_PASSWORD").unwrap_or_else(|| defaults.password().to_string());
        config.credentials = TestCredentials::new(
            lookup("TEST_USER_EMAIL").unwrap_or(defaults.email),
            password,
        )
        .with_names(
            lookup("TEST_USER_FIRST_NAME").unwrap_or(defaults.first_name),
            lookup("TEST_USER_LAST_NAME").unwrap_or(defaults.last_name),
        );

        let mut tracing = TracingConfig::default()
            .with_log_level(lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()));
        match lookup("LOG_FORMAT").as_deref() {
            None | Some("text") => {}
            Some("json") => tracing = tracing.with_json_output(),
            Some(other) => {
                return Err(HarnessError::config(format!("Invalid LOG_FORMAT: {other}")));
            }
        }
        config.tracing = tracing;
        config.parallel = parse_var(&lookup, "SUITE_PARALLEL", false)?;

        Ok(config)
    }

    /// Replace the test credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: TestCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Replace the HTTP settings.
    #[must_use]
    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    /// Replace the retry settings.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url_str(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Resolve an API path (with optional query) against the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the result is not a valid URL.
    pub fn url_for(&self, path: &str) -> HarnessResult<Url> {
        let joined = if path.starts_with('/') {
            format!("{}{path}", self.base_url_str())
        } else {
            format!("{}/{path}", self.base_url_str())
        };
        Url::parse(&joined)
            .map_err(|e| HarnessError::config(format!("Invalid request URL {joined}: {e}")))
    }
}

fn parse_base_url(raw: &str) -> HarnessResult<Url> {
    let url = Url::parse(raw)
        .map_err(|e| HarnessError::config(format!("Invalid base URL {raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
        return Err(HarnessError::config(format!(
            "Base URL must be an absolute http(s) URL: {raw}"
        )));
    }
    Ok(url)
}

/// Parse a variable with a default value.
fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> HarnessResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|e| HarnessError::config(format!("Invalid {name}: {e}"))),
        None => Ok(default),
    }
}

/// Parse a positive number of seconds.
fn parse_secs<F>(lookup: &F, name: &str, default: u64) -> HarnessResult<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_var(lookup, name, default)? {
        0 => Err(HarnessError::config(format!("Invalid {name}: must be greater than 0"))),
        secs => Ok(Duration::from_secs(secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.base_url_str(), DEFAULT_BASE_URL);
        assert_eq!(config.http.timeout, Duration::from_secs(10));
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.credentials.email, "jhon_smith@example.com");
        assert_eq!(config.credentials.password(), "Y2kjqKHX");
        assert!(!config.parallel);
    }

    #[test]
    fn test_overrides() {
        let config = HarnessConfig::from_lookup(lookup_from(&[
            ("BASE_URL", "http://fallback:1"),
            ("RESTAURANT_API_BASE_URL", "https://staging.example.com/api/"),
            ("HARNESS_TIMEOUT_SECS", "3"),
            ("HARNESS_CONNECT_RETRIES", "4"),
            ("TEST_USER_EMAIL", "qa@example.com"),
            ("TEST_USER_PASSWORD", "s3cretPass"),
            ("LOG_FORMAT", "json"),
            ("SUITE_PARALLEL", "true"),
        ]))
        .unwrap();

        assert_eq!(config.base_url_str(), "https://staging.example.com/api");
        assert_eq!(config.http.timeout, Duration::from_secs(3));
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.credentials.email, "qa@example.com");
        assert_eq!(config.credentials.password(), "s3cretPass");
        assert!(config.tracing.json_output);
        assert!(config.parallel);
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = HarnessConfig::from_lookup(lookup_from(&[("HARNESS_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("HARNESS_TIMEOUT_SECS"));

        let err =
            HarnessConfig::from_lookup(lookup_from(&[("RESTAURANT_API_BASE_URL", "ftp://x")]))
                .unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        for name in ["HARNESS_TIMEOUT_SECS", "HARNESS_CONNECT_TIMEOUT_SECS"] {
            let err = HarnessConfig::from_lookup(lookup_from(&[(name, "0")])).unwrap_err();
            assert!(matches!(err, HarnessError::Config(_)));
            assert!(err.to_string().contains(name), "{err}");
        }
        let lookup = lookup_from(&[("HARNESS_CONNECT_TIMEOUT_SECS", "1")]);
        let config = HarnessConfig::from_lookup(lookup).unwrap();
        assert_eq!(config.http.connect_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_url_for_keeps_base_path() {
        let config = HarnessConfig::for_base_url("http://localhost:8080/api").unwrap();
        let url = config.url_for("/bookings/tables?guests=4").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/bookings/tables?guests=4");
        assert_eq!(config.url_for("/").unwrap().as_str(), "http://localhost:8080/api/");
    }

    #[test]
    fn test_password_not_in_debug() {
        let creds = TestCredentials::new("a@example.com", "hunter2-secret");
        assert!(!format!("{creds:?}").contains("hunter2-secret"));
    }
}
