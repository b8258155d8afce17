//! Expected contract types.
//!
//! An [`ExpectedContract`] is a declarative description of the response a
//! request must produce. Contracts are built once, next to the fixture they
//! belong to, and never mutated afterwards.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Statuses accepted for a request rejected by input validation.
pub const VALIDATION_STATUSES: [u16; 2] = [400, 422];

/// Statuses accepted for a request without usable credentials.
pub const UNAUTHORIZED_STATUSES: [u16; 2] = [401, 403];

/// Keys that may carry the human-readable message of an error body.
pub const DEFAULT_MESSAGE_KEYS: [&str; 3] = ["message", "detail", "error"];

/// Keys that may carry the machine-readable code of an error body.
pub const DEFAULT_CODE_KEYS: [&str; 3] = ["code", "errorCode", "error"];

/// Allowed status codes of a response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StatusExpectation {
    /// Exactly this status
    Exact(u16),
    /// Any status of the set (idempotent deletes, alternative rejections)
    AnyOf(Vec<u16>),
}

impl StatusExpectation {
    /// Check if the status is admitted.
    #[must_use]
    pub fn admits(&self, status: u16) -> bool {
        match self {
            Self::Exact(code) => *code == status,
            Self::AnyOf(codes) => codes.contains(&status),
        }
    }

    /// All admitted status codes.
    #[must_use]
    pub fn codes(&self) -> &[u16] {
        match self {
            Self::Exact(code) => std::slice::from_ref(code),
            Self::AnyOf(codes) => codes,
        }
    }

    /// Check if at least one 2xx status is admitted.
    #[must_use]
    pub fn admits_success(&self) -> bool {
        self.codes().iter().any(|c| (200..300).contains(c))
    }

    /// Check if every admitted status is a 2xx.
    #[must_use]
    pub fn is_success_only(&self) -> bool {
        !self.codes().is_empty() && self.codes().iter().all(|c| (200..300).contains(c))
    }

    /// Check if every admitted status is a 4xx.
    #[must_use]
    pub fn is_client_error_only(&self) -> bool {
        !self.codes().is_empty() && self.codes().iter().all(|c| (400..500).contains(c))
    }

    /// Check if any 5xx status is admitted.
    #[must_use]
    pub fn admits_server_error(&self) -> bool {
        self.codes().iter().any(|c| *c >= 500)
    }
}

impl fmt::Display for StatusExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(code) => write!(f, "{code}"),
            Self::AnyOf(codes) => {
                let joined: Vec<String> = codes.iter().map(ToString::to_string).collect();
                write!(f, "one of [{}]", joined.join(", "))
            }
        }
    }
}

/// Expected JSON type of a response field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum FieldType {
    /// Present with any value, including null
    Any,
    /// A string
    String,
    /// A string with at least one non-whitespace character
    NonEmptyString,
    /// An integral number
    Integer,
    /// Any number
    Number,
    /// A boolean
    Boolean,
    /// An array
    Array,
    /// An object
    Object,
    /// A compact JWT whose header decodes to a JSON object
    Jwt,
    /// A string matching the regular expression
    Matches(String),
    /// A string equal to one of the values
    OneOf(Vec<String>),
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any value"),
            Self::String => f.write_str("string"),
            Self::NonEmptyString => f.write_str("non-empty string"),
            Self::Integer => f.write_str("integer"),
            Self::Number => f.write_str("number"),
            Self::Boolean => f.write_str("boolean"),
            Self::Array => f.write_str("array"),
            Self::Object => f.write_str("object"),
            Self::Jwt => f.write_str("JWT"),
            Self::Matches(pattern) => write!(f, "string matching /{pattern}/"),
            Self::OneOf(values) => write!(f, "one of {values:?}"),
        }
    }
}

/// A required response field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldSpec {
    /// Dot path into the body, e.g. `user.email` or `content.0.id`
    pub path: String,
    /// Alternative paths accepted in place of `path`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Expected type
    pub ty: FieldType,
}

impl FieldSpec {
    /// Create a field spec.
    #[must_use]
    pub fn new(path: impl Into<String>, ty: FieldType) -> Self {
        Self {
            path: path.into(),
            aliases: Vec::new(),
            ty,
        }
    }

    /// Field present with any value.
    #[must_use]
    pub fn present(path: impl Into<String>) -> Self {
        Self::new(path, FieldType::Any)
    }

    /// Non-empty string field.
    #[must_use]
    pub fn text(path: impl Into<String>) -> Self {
        Self::new(path, FieldType::NonEmptyString)
    }

    /// Accept an alternative path.
    #[must_use]
    pub fn or(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// The primary path followed by its aliases.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.path.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Element schema of a list response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionSpec {
    /// Path of the list; `None` accepts a bare array or a paginated `content` array
    pub path: Option<String>,
    /// Fields every element must carry
    pub item_fields: Vec<FieldSpec>,
}

impl CollectionSpec {
    /// Collection at the body root (bare array or `content`).
    #[must_use]
    pub fn of(item_fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        Self {
            path: None,
            item_fields: item_fields.into_iter().collect(),
        }
    }

    /// Collection at an explicit path.
    #[must_use]
    pub fn at(path: impl Into<String>, item_fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        Self {
            path: Some(path.into()),
            item_fields: item_fields.into_iter().collect(),
        }
    }
}

/// Documented shape of an error body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorShape {
    /// Keys one of which must carry a non-empty message
    pub message_keys: Vec<String>,
    /// Keys one of which carries the error code
    pub code_keys: Vec<String>,
    /// Whether a code is mandatory
    pub require_code: bool,
    /// Request field the body must identify
    pub mentions: Option<String>,
    /// Pattern the message must match
    pub message_pattern: Option<String>,
}

impl Default for ErrorShape {
    fn default() -> Self {
        Self {
            message_keys: DEFAULT_MESSAGE_KEYS.iter().map(ToString::to_string).collect(),
            code_keys: DEFAULT_CODE_KEYS.iter().map(ToString::to_string).collect(),
            require_code: false,
            mentions: None,
            message_pattern: None,
        }
    }
}

impl ErrorShape {
    /// Error body that identifies the offending request field.
    #[must_use]
    pub fn mentioning(field: impl Into<String>) -> Self {
        Self {
            mentions: Some(field.into()),
            ..Self::default()
        }
    }

    /// Require a code next to the message.
    #[must_use]
    pub const fn with_required_code(mut self) -> Self {
        self.require_code = true;
        self
    }

    /// Require the message to match a pattern.
    #[must_use]
    pub fn with_message_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.message_pattern = Some(pattern.into());
        self
    }
}

/// Declarative description of an expected response.
///
/// # Examples
///
/// ```
/// use restaurant_contract::{ExpectedContract, FieldSpec, FieldType};
///
/// let contract = ExpectedContract::created()
///     .with_field(FieldSpec::new("token", FieldType::Jwt).or("accessToken"))
///     .forbid("password");
/// assert!(contract.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExpectedContract {
    /// Allowed statuses
    pub status: StatusExpectation,
    /// Fields a 2xx body must carry
    #[serde(default)]
    pub required_fields: Vec<FieldSpec>,
    /// Field names that must not appear at any depth
    #[serde(default)]
    pub forbidden_fields: Vec<String>,
    /// Element schema of a 2xx list body
    #[serde(default)]
    pub collection: Option<CollectionSpec>,
    /// Headers as (lowercase name, expected substring); an empty substring checks presence
    #[serde(default)]
    pub required_headers: Vec<(String, String)>,
    /// Shape of a 4xx/5xx body
    #[serde(default)]
    pub error: Option<ErrorShape>,
    /// Payloads that must not be echoed back unescaped
    #[serde(default)]
    pub no_reflection: Vec<String>,
    /// Reject error bodies that leak internal error details
    pub forbid_leaks: bool,
}

impl ExpectedContract {
    /// Contract admitting the given statuses.
    #[must_use]
    pub const fn with_status(status: StatusExpectation) -> Self {
        Self {
            status,
            required_fields: Vec::new(),
            forbidden_fields: Vec::new(),
            collection: None,
            required_headers: Vec::new(),
            error: None,
            no_reflection: Vec::new(),
            forbid_leaks: true,
        }
    }

    /// `200 OK`.
    #[must_use]
    pub const fn ok() -> Self {
        Self::with_status(StatusExpectation::Exact(200))
    }

    /// `201 Created`.
    #[must_use]
    pub const fn created() -> Self {
        Self::with_status(StatusExpectation::Exact(201))
    }

    /// Any of the given statuses.
    #[must_use]
    pub fn any_of(codes: &[u16]) -> Self {
        Self::with_status(StatusExpectation::AnyOf(codes.to_vec()))
    }

    /// Validation rejection identifying `field`.
    #[must_use]
    pub fn validation_error(field: impl Into<String>) -> Self {
        Self::any_of(&VALIDATION_STATUSES).with_error(ErrorShape::mentioning(field))
    }

    /// `404 Not Found` with a documented error body.
    #[must_use]
    pub fn not_found() -> Self {
        Self::with_status(StatusExpectation::Exact(404)).with_error(ErrorShape::default())
    }

    /// Rejection of a request without usable credentials.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::any_of(&UNAUTHORIZED_STATUSES)
    }

    /// Require a field in a 2xx body.
    #[must_use]
    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.required_fields.push(field);
        self
    }

    /// Require several fields in a 2xx body.
    #[must_use]
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        self.required_fields.extend(fields);
        self
    }

    /// Forbid a field name at any depth.
    #[must_use]
    pub fn forbid(mut self, field: impl Into<String>) -> Self {
        self.forbidden_fields.push(field.into());
        self
    }

    /// Require a list body with the given element schema.
    #[must_use]
    pub fn with_collection(mut self, collection: CollectionSpec) -> Self {
        self.collection = Some(collection);
        self
    }

    /// Require a header whose value contains `contains`.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, contains: impl Into<String>) -> Self {
        self.required_headers
            .push((name.into().to_ascii_lowercase(), contains.into()));
        self
    }

    /// Require a JSON content type.
    #[must_use]
    pub fn with_json_content(self) -> Self {
        self.with_header("content-type", "application/json")
    }

    /// Declare the error body shape.
    #[must_use]
    pub fn with_error(mut self, error: ErrorShape) -> Self {
        self.error = Some(error);
        self
    }

    /// Forbid unescaped echo of a payload.
    #[must_use]
    pub fn no_reflection_of(mut self, payload: impl Into<String>) -> Self {
        self.no_reflection.push(payload.into());
        self
    }

    /// Disable the leak check.
    #[must_use]
    pub const fn without_leak_check(mut self) -> Self {
        self.forbid_leaks = false;
        self
    }

    /// Check that the contract is internally consistent.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let codes = self.status.codes();
        if codes.is_empty() {
            return Err(DefinitionError::EmptyStatusSet);
        }
        if let Some(code) = codes.iter().find(|c| !(100..=599).contains(*c)) {
            return Err(DefinitionError::StatusOutOfRange(*code));
        }
        if self.error.is_some() && self.status.is_success_only() {
            return Err(DefinitionError::SuccessWithErrorShape(self.status.to_string()));
        }
        let forbidden = |p: &str| {
            self.forbidden_fields
                .iter()
                .any(|f| last_segment(p) == f.as_str())
        };
        for field in &self.required_fields {
            if field.paths().any(forbidden) {
                return Err(DefinitionError::RequiredAndForbidden(field.path.clone()));
            }
        }

        let item_fields = self.collection.iter().flat_map(|c| c.item_fields.iter());
        for field in self.required_fields.iter().chain(item_fields) {
            if let FieldType::Matches(pattern) = &field.ty {
                check_pattern(pattern)?;
            }
        }
        if let Some(pattern) = self.error.as_ref().and_then(|e| e.message_pattern.as_ref()) {
            check_pattern(pattern)?;
        }
        if self.error.as_ref().is_some_and(|e| e.message_keys.is_empty()) {
            return Err(DefinitionError::NoMessageKeys);
        }
        Ok(())
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

fn check_pattern(pattern: &str) -> Result<(), DefinitionError> {
    Regex::new(pattern).map(|_| ()).map_err(|e| DefinitionError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// An expected contract contradicts itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// No status is admitted
    #[error("contract admits no status")]
    EmptyStatusSet,

    /// Status code outside 100..=599
    #[error("status {0} is not a valid HTTP status")]
    StatusOutOfRange(u16),

    /// Success-only status paired with an error shape
    #[error("contract expects {0} but declares an error body")]
    SuccessWithErrorShape(String),

    /// Field both required and forbidden
    #[error("field `{0}` is both required and forbidden")]
    RequiredAndForbidden(String),

    /// Error shape without message keys
    #[error("error shape declares no message keys")]
    NoMessageKeys,

    /// Pattern does not compile
    #[error("invalid pattern /{pattern}/: {reason}")]
    InvalidPattern {
        /// The pattern
        pattern: String,
        /// Compiler message
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_expectation() {
        let delete = StatusExpectation::AnyOf(vec![200, 204, 404]);
        assert!(delete.admits(204));
        assert!(!delete.admits(500));
        assert!(delete.admits_success());
        assert!(!delete.is_success_only());
        assert_eq!(delete.to_string(), "one of [200, 204, 404]");

        let created = StatusExpectation::Exact(201);
        assert!(created.is_success_only());
        assert!(!created.admits_server_error());
    }

    #[test]
    fn test_validation_error_contract() {
        let contract = ExpectedContract::validation_error("email");
        assert!(contract.status.is_client_error_only());
        assert_eq!(contract.error.as_ref().and_then(|e| e.mentions.as_deref()), Some("email"));
        assert!(contract.validate().is_ok());
    }

    #[test]
    fn test_success_with_error_shape_is_rejected() {
        let contract = ExpectedContract::created().with_error(ErrorShape::mentioning("email"));
        assert_eq!(
            contract.validate(),
            Err(DefinitionError::SuccessWithErrorShape("201".to_string()))
        );
    }

    #[test]
    fn test_required_and_forbidden_is_rejected() {
        let contract = ExpectedContract::ok()
            .with_field(FieldSpec::text("user.password"))
            .forbid("password");
        assert_eq!(
            contract.validate(),
            Err(DefinitionError::RequiredAndForbidden("user.password".to_string()))
        );
    }

    #[test]
    fn test_invalid_statuses_are_rejected() {
        assert_eq!(ExpectedContract::any_of(&[]).validate(), Err(DefinitionError::EmptyStatusSet));
        assert_eq!(
            ExpectedContract::any_of(&[200, 99]).validate(),
            Err(DefinitionError::StatusOutOfRange(99))
        );
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let contract = ExpectedContract::ok()
            .with_field(FieldSpec::new("date", FieldType::Matches("(".to_string())));
        assert!(matches!(contract.validate(), Err(DefinitionError::InvalidPattern { .. })));
    }

    #[test]
    fn test_contract_serialization() {
        let contract = ExpectedContract::ok()
            .with_json_content()
            .with_collection(CollectionSpec::of([
                FieldSpec::text("id"),
                FieldSpec::text("address"),
            ]));

        let json = serde_json::to_string(&contract).unwrap();
        let restored: ExpectedContract = serde_json::from_str(&json).unwrap();
        assert_eq!(contract, restored);
    }
}
