//! Centralized error types for the contract harness.
//!
//! Every failure the harness can observe falls into one of three kinds, and the
//! kind decides how the runner reports it:
//! - setup failures ([`EnvironmentError`], configuration errors) abort the rest
//!   of their scope,
//! - assertion failures ([`ContractViolation`]) are reported per test,
//! - transport failures ([`TransportError`]) are reported per test.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;

/// The sub-check of an expected contract that rejected a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubCheck {
    /// Status code not admitted by the contract
    Status,
    /// Required header missing or with an unexpected value
    Header,
    /// Required field missing or of the wrong type
    Schema,
    /// A field that must never be exposed is present
    ForbiddenField,
    /// Error body does not have the documented shape
    ErrorShape,
    /// An injected payload is echoed back unescaped
    Reflection,
    /// Error body leaks internal error details
    Leak,
}

impl SubCheck {
    /// Short name used in reports.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Header => "header",
            Self::Schema => "schema",
            Self::ForbiddenField => "forbidden-field",
            Self::ErrorShape => "error-shape",
            Self::Reflection => "reflection",
            Self::Leak => "leak",
        }
    }
}

impl fmt::Display for SubCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response did not match its expected contract.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("[{check}] {context}: {detail}")]
pub struct ContractViolation {
    /// The sub-check that failed
    pub check: SubCheck,
    /// What was expected and what was observed
    pub detail: String,
    /// Request context, e.g. `POST /auth/signup [auth.signup.valid]`
    pub context: String,
}

impl ContractViolation {
    /// Create a violation without request context.
    #[must_use]
    pub fn new(check: SubCheck, detail: impl Into<String>) -> Self {
        Self {
            check,
            detail: detail.into(),
            context: String::new(),
        }
    }

    /// Attach the request context.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

/// The environment the suite runs against is not usable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentError {
    /// Server could not be reached before any response was received
    #[error("server unreachable at {base_url}: {reason}")]
    Unreachable {
        /// Configured base URL
        base_url: String,
        /// Underlying connect failure
        reason: String,
    },

    /// Signin during fixture setup failed
    #[error("signin failed for {email}: {reason}")]
    SigninFailed {
        /// Identity used for the signin
        email: String,
        /// Status or transport failure
        reason: String,
    },

    /// A listing used to resolve seed ids is empty
    #[error("no seed data available from {listing}")]
    NoSeedData {
        /// Listing endpoint
        listing: String,
    },

    /// A listing used to resolve seed ids did not answer with success
    #[error("seed listing {listing} failed: {reason}")]
    SeedListingFailed {
        /// Listing endpoint
        listing: String,
        /// Status or transport failure
        reason: String,
    },

    /// A listing answered but its elements carry no usable id
    #[error("seed data from {listing} is unusable: {reason}")]
    InvalidSeedData {
        /// Listing endpoint
        listing: String,
        /// What is wrong with the element
        reason: String,
    },
}

/// A request failed below the HTTP layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No response within the configured timeout
    #[error("request to {url} timed out")]
    Timeout {
        /// Request URL
        url: String,
    },

    /// Connection could not be established
    #[error("connection to {url} failed: {reason}")]
    Connect {
        /// Request URL
        url: String,
        /// Underlying failure
        reason: String,
    },

    /// Connection reset, broken body or other request failure
    #[error("request to {url} failed: {reason}")]
    Request {
        /// Request URL
        url: String,
        /// Underlying failure
        reason: String,
    },
}

impl TransportError {
    /// Classify a reqwest error.
    #[must_use]
    pub fn from_reqwest(url: impl Into<String>, err: &reqwest::Error) -> Self {
        let url = url.into();
        if err.is_timeout() {
            Self::Timeout { url }
        } else if err.is_connect() {
            Self::Connect {
                url,
                reason: err.to_string(),
            }
        } else {
            Self::Request {
                url,
                reason: err.to_string(),
            }
        }
    }

    /// Check if this is a connection-establishment failure.
    #[must_use]
    pub const fn is_connect(&self) -> bool {
        matches!(self, Self::Connect { .. })
    }
}

/// How a failure is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Environment or configuration is broken; aborts the scope
    Setup,
    /// The system under test broke its contract
    Assertion,
    /// Timeout or connection failure during a test
    Transport,
}

/// Common error type for harness operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HarnessError {
    /// Environment is not usable
    #[error("environment error: {0}")]
    Environment(#[from] EnvironmentError),

    /// Response broke its contract
    #[error("contract violation: {0}")]
    Contract(#[from] ContractViolation),

    /// Request failed below HTTP
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Invalid configuration or fixture definition
    #[error("configuration error: {0}")]
    Config(String),
}

impl HarnessError {
    /// Classify this error for reporting.
    ///
    /// # Examples
    ///
    /// ```
    /// use harness_common::{EnvironmentError, FailureKind, HarnessError};
    ///
    /// let err = HarnessError::from(EnvironmentError::NoSeedData {
    ///     listing: "GET /locations".to_string(),
    /// });
    /// assert_eq!(err.kind(), FailureKind::Setup);
    /// assert!(err.is_fail_fast());
    /// ```
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Environment(_) | Self::Config(_) => FailureKind::Setup,
            Self::Contract(_) => FailureKind::Assertion,
            Self::Transport(_) => FailureKind::Transport,
        }
    }

    /// Check if this error aborts the remaining tests of its scope.
    #[must_use]
    pub const fn is_fail_fast(&self) -> bool {
        matches!(self.kind(), FailureKind::Setup)
    }

    /// Check if this error may be retried.
    ///
    /// Only connection-establishment failures qualify; the client further
    /// restricts retries to the period before its first response.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(t) if t.is_connect())
    }

    /// Create a configuration error with the given message.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a contract violation for the given sub-check.
    #[must_use]
    pub fn violation(check: SubCheck, detail: impl Into<String>) -> Self {
        Self::Contract(ContractViolation::new(check, detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kinds() {
        let setup = HarnessError::from(EnvironmentError::SigninFailed {
            email: "a@example.com".to_string(),
            reason: "status 500".to_string(),
        });
        assert_eq!(setup.kind(), FailureKind::Setup);
        assert!(setup.is_fail_fast());

        let assertion = HarnessError::violation(SubCheck::Status, "expected 201, got 400");
        assert_eq!(assertion.kind(), FailureKind::Assertion);
        assert!(!assertion.is_fail_fast());

        let transport = HarnessError::from(TransportError::Timeout {
            url: "http://localhost:8080/health".to_string(),
        });
        assert_eq!(transport.kind(), FailureKind::Transport);
        assert!(!transport.is_fail_fast());

        assert!(HarnessError::config("bad").is_fail_fast());
    }

    #[test]
    fn test_only_connect_failures_are_retryable() {
        let connect = HarnessError::from(TransportError::Connect {
            url: "http://localhost:1".to_string(),
            reason: "refused".to_string(),
        });
        assert!(connect.is_retryable());

        let timeout = HarnessError::from(TransportError::Timeout {
            url: "http://localhost:1".to_string(),
        });
        assert!(!timeout.is_retryable());
        assert!(!HarnessError::violation(SubCheck::Schema, "missing id").is_retryable());
    }

    #[test]
    fn test_violation_display_names_sub_check() {
        let err = ContractViolation::new(SubCheck::ForbiddenField, "field `password` present")
            .with_context("GET /users/profile [profile.view.valid]");
        assert_eq!(
            err.to_string(),
            "[forbidden-field] GET /users/profile [profile.view.valid]: field `password` present"
        );
    }
}
