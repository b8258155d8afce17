//! Expected contract model for the Restaurant API.
//!
//! Provides the declarative descriptors fixtures are paired with, the
//! structural verification of observed responses against them, and the
//! per-case suite report.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod contract;
pub mod report;
pub mod verification;

pub use contract::{
    CollectionSpec, DefinitionError, ErrorShape, ExpectedContract, FieldSpec, FieldType,
    StatusExpectation,
};
pub use report::{CaseOutcome, SuiteReport, Verdict};
pub use verification::{ObservedResponse, verify};
