//! Fixture catalog and test data for the Restaurant API contract suite.
//!
//! This crate provides:
//! - The fixture catalog: valid, invalid-shape and adversarial requests per
//!   resource category, each paired with its expected contract
//! - Generators for run-specific data and proptest strategies
//! - An in-process mock of the Restaurant API for hermetic runs

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod definitions;
pub mod generators;
pub mod mocks;

pub use catalog::{
    AuthMode, CatalogError, FixtureCatalog, FixtureContext, FixtureRecord, HttpMethod, Payload,
    PolicyClass, ProbeKind, RequestTemplate, Resource, RuleKind, SeedKind, ValidationRule,
};
pub use mocks::{MockOptions, MockRestaurantApi};
