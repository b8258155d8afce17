//! Shared library for cross-cutting concerns of the restaurant API contract harness.
//!
//! This crate provides centralized implementations for:
//! - The harness error taxonomy (setup, assertion and transport failures)
//! - HTTP client configuration and building
//! - Connect retry policy with exponential backoff
//! - Run configuration loaded from the environment
//! - Tracing subscriber setup

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod http;
pub mod retry;
pub mod tracing_config;

pub use config::{HarnessConfig, TestCredentials};
pub use error::{
    ContractViolation, EnvironmentError, FailureKind, HarnessError, HarnessResult, SubCheck,
    TransportError,
};
pub use http::{HttpConfig, build_http_client};
pub use retry::{RetryConfig, RetryPolicy};
pub use tracing_config::{TracingConfig, init_tracing};
