//! Session provider and fixture execution for the Restaurant API contract suite.
//!
//! Provides anonymous and authenticated clients bound to one base URL,
//! signin bootstrap, seed id resolution from listings, and a scope that
//! runs cases, records their outcomes and aborts after a setup failure.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod client;
pub mod executor;
pub mod resolver;
pub mod session;

pub use auth::Credential;
pub use client::{ApiClient, SessionContext};
pub use executor::{execute, execute_with};
pub use resolver::ResourceResolver;
pub use session::SessionScope;
