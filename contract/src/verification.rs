//! Structural verification of observed responses.
//!
//! Sub-checks run in a fixed order (status, headers, schema, forbidden
//! fields, error shape, reflection, leak) and the first failing one is
//! reported, so a wrong status is never reported as a missing field.

use crate::contract::{CollectionSpec, ErrorShape, ExpectedContract, FieldSpec, FieldType};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use harness_common::{ContractViolation, SubCheck};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Substrings that identify internal error details in an error body.
pub const LEAK_MARKERS: [&str; 9] = [
    "Traceback (most recent call last)",
    "Exception in thread",
    "stack trace",
    "\tat java.",
    "NullPointerException",
    "SQLSTATE",
    "syntax error at or near",
    "ORA-",
    "psycopg2.",
];

/// A response as observed by the harness.
#[derive(Debug, Clone, Serialize)]
pub struct ObservedResponse {
    /// Request method
    pub method: String,
    /// Request path including query
    pub path: String,
    /// Response status
    pub status: u16,
    /// Headers keyed by lowercase name
    pub headers: BTreeMap<String, String>,
    /// Raw body
    pub body_text: String,
    /// Body parsed as JSON, if it parses
    pub body: Option<Value>,
}

impl ObservedResponse {
    /// Create an observed response, parsing the body as JSON when possible.
    #[must_use]
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        status: u16,
        headers: impl IntoIterator<Item = (String, String)>,
        body_text: impl Into<String>,
    ) -> Self {
        let body_text = body_text.into();
        let body = serde_json::from_str(&body_text).ok();
        Self {
            method: method.into(),
            path: path.into(),
            status,
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v))
                .collect(),
            body_text,
            body,
        }
    }

    /// Header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// `METHOD path`, used as violation context.
    #[must_use]
    pub fn context(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    /// Check if the status is a 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Check if the status is a 4xx or 5xx.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.status >= 400
    }
}

/// Verify an observed response against its contract.
///
/// # Errors
///
/// Returns the first failing sub-check with the request context attached.
///
/// # Examples
///
/// ```
/// use harness_common::SubCheck;
/// use restaurant_contract::{ExpectedContract, ObservedResponse, verify};
///
/// let observed = ObservedResponse::new("GET", "/health", 503, [], "{}");
/// let err = verify(&ExpectedContract::ok(), &observed).unwrap_err();
/// assert_eq!(err.check, SubCheck::Status);
/// ```
pub fn verify(
    contract: &ExpectedContract,
    observed: &ObservedResponse,
) -> Result<(), ContractViolation> {
    check_status(contract, observed)
        .and_then(|()| check_headers(contract, observed))
        .and_then(|()| check_schema(contract, observed))
        .and_then(|()| check_forbidden(contract, observed))
        .and_then(|()| check_error_shape(contract, observed))
        .and_then(|()| check_reflection(contract, observed))
        .and_then(|()| check_leaks(contract, observed))
        .map_err(|v| v.with_context(observed.context()))
}

fn check_status(
    contract: &ExpectedContract,
    observed: &ObservedResponse,
) -> Result<(), ContractViolation> {
    if contract.status.admits(observed.status) {
        return Ok(());
    }
    let mut detail = format!("expected status {}, got {}", contract.status, observed.status);
    if observed.status >= 500 {
        detail.push_str(" (server error)");
    }
    Err(ContractViolation::new(SubCheck::Status, detail))
}

fn check_headers(
    contract: &ExpectedContract,
    observed: &ObservedResponse,
) -> Result<(), ContractViolation> {
    for (name, contains) in &contract.required_headers {
        match observed.header(name) {
            None => {
                return Err(ContractViolation::new(
                    SubCheck::Header,
                    format!("missing header `{name}`"),
                ));
            }
            Some(value) if !value.contains(contains.as_str()) => {
                return Err(ContractViolation::new(
                    SubCheck::Header,
                    format!("header `{name}` is `{value}`, expected it to contain `{contains}`"),
                ));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

fn check_schema(
    contract: &ExpectedContract,
    observed: &ObservedResponse,
) -> Result<(), ContractViolation> {
    if !observed.is_success() || observed.status == 204 {
        return Ok(());
    }
    if contract.required_fields.is_empty() && contract.collection.is_none() {
        return Ok(());
    }
    let Some(body) = &observed.body else {
        return Err(ContractViolation::new(SubCheck::Schema, "response body is not JSON"));
    };

    check_fields(body, &contract.required_fields, "")?;
    if let Some(collection) = &contract.collection {
        check_collection(body, collection)?;
    }
    Ok(())
}

fn check_fields(
    value: &Value,
    fields: &[FieldSpec],
    prefix: &str,
) -> Result<(), ContractViolation> {
    for spec in fields {
        let Some(found) = spec.paths().find_map(|p| lookup(value, p)) else {
            return Err(ContractViolation::new(
                SubCheck::Schema,
                format!("missing field `{prefix}{}`", spec.path),
            ));
        };
        if !matches_type(found, &spec.ty) {
            return Err(ContractViolation::new(
                SubCheck::Schema,
                format!(
                    "field `{prefix}{}` expected {}, got {}",
                    spec.path,
                    spec.ty,
                    describe(found)
                ),
            ));
        }
    }
    Ok(())
}

fn check_collection(body: &Value, collection: &CollectionSpec) -> Result<(), ContractViolation> {
    let list = match &collection.path {
        Some(path) => lookup(body, path),
        None if body.is_array() => Some(body),
        None => body.get("content"),
    };
    let Some(items) = list.and_then(Value::as_array) else {
        let location = collection.path.as_deref().unwrap_or("body or `content`");
        return Err(ContractViolation::new(
            SubCheck::Schema,
            format!("expected a list at {location}"),
        ));
    };
    for (i, item) in items.iter().enumerate() {
        check_fields(item, &collection.item_fields, &format!("[{i}]."))?;
    }
    Ok(())
}

fn check_forbidden(
    contract: &ExpectedContract,
    observed: &ObservedResponse,
) -> Result<(), ContractViolation> {
    let Some(body) = &observed.body else {
        return Ok(());
    };
    for field in &contract.forbidden_fields {
        if let Some(location) = find_key(body, field, "") {
            return Err(ContractViolation::new(
                SubCheck::ForbiddenField,
                format!("forbidden field `{field}` present at `{location}`"),
            ));
        }
    }
    Ok(())
}

fn check_error_shape(
    contract: &ExpectedContract,
    observed: &ObservedResponse,
) -> Result<(), ContractViolation> {
    let Some(shape) = &contract.error else {
        return Ok(());
    };
    if !observed.is_error() {
        return Ok(());
    }
    let Some(body) = observed.body.as_ref().filter(|b| b.is_object()) else {
        return Err(ContractViolation::new(SubCheck::ErrorShape, "error body is not a JSON object"));
    };
    verify_error_body(shape, body)
}

fn verify_error_body(shape: &ErrorShape, body: &Value) -> Result<(), ContractViolation> {
    let message = shape
        .message_keys
        .iter()
        .filter_map(|k| body.get(k))
        .find(|v| is_meaningful(v))
        .ok_or_else(|| {
            ContractViolation::new(
                SubCheck::ErrorShape,
                format!("error body has no message under any of {:?}", shape.message_keys),
            )
        })?;

    let has_code = shape
        .code_keys
        .iter()
        .any(|k| body.get(k).is_some_and(is_meaningful));
    if shape.require_code && !has_code {
        return Err(ContractViolation::new(
            SubCheck::ErrorShape,
            format!("error body has no code under any of {:?}", shape.code_keys),
        ));
    }

    if let Some(field) = &shape.mentions {
        if !mentions(body, field) {
            return Err(ContractViolation::new(
                SubCheck::ErrorShape,
                format!("error body does not identify field `{field}`"),
            ));
        }
    }

    if let Some(pattern) = &shape.message_pattern {
        let re = Regex::new(pattern).map_err(|e| {
            ContractViolation::new(SubCheck::ErrorShape, format!("invalid pattern: {e}"))
        })?;
        let text = message.as_str().map_or_else(|| message.to_string(), ToString::to_string);
        if !re.is_match(&text) {
            return Err(ContractViolation::new(
                SubCheck::ErrorShape,
                format!("error message `{text}` does not match /{pattern}/"),
            ));
        }
    }
    Ok(())
}

fn check_reflection(
    contract: &ExpectedContract,
    observed: &ObservedResponse,
) -> Result<(), ContractViolation> {
    // A 2xx JSON body may store the value verbatim; anywhere else it must not appear.
    if observed.is_success() && observed.body.is_some() {
        return Ok(());
    }
    for payload in &contract.no_reflection {
        if !payload.is_empty() && observed.body_text.contains(payload.as_str()) {
            return Err(ContractViolation::new(
                SubCheck::Reflection,
                format!("payload `{}` echoed back unescaped", truncate(payload, 60)),
            ));
        }
    }
    Ok(())
}

fn check_leaks(
    contract: &ExpectedContract,
    observed: &ObservedResponse,
) -> Result<(), ContractViolation> {
    if !contract.forbid_leaks || !observed.is_error() {
        return Ok(());
    }
    match LEAK_MARKERS.iter().find(|m| observed.body_text.contains(**m)) {
        Some(marker) => Err(ContractViolation::new(
            SubCheck::Leak,
            format!("error body leaks internal details (`{}`)", marker.trim()),
        )),
        None => Ok(()),
    }
}

/// Resolve a dot path; numeric segments index arrays.
#[must_use]
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Check a value against an expected type.
#[must_use]
pub fn matches_type(value: &Value, ty: &FieldType) -> bool {
    match ty {
        FieldType::Any => true,
        FieldType::String => value.is_string(),
        FieldType::NonEmptyString => value.as_str().is_some_and(|s| !s.trim().is_empty()),
        FieldType::Integer => value.is_i64() || value.is_u64(),
        FieldType::Number => value.is_number(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Array => value.is_array(),
        FieldType::Object => value.is_object(),
        FieldType::Jwt => value.as_str().is_some_and(is_jwt),
        FieldType::Matches(pattern) => value
            .as_str()
            .is_some_and(|s| Regex::new(pattern).is_ok_and(|re| re.is_match(s))),
        FieldType::OneOf(values) => value.as_str().is_some_and(|s| values.iter().any(|v| v == s)),
    }
}

/// Check that a string is a compact JWT with a JSON object header.
#[must_use]
pub fn is_jwt(token: &str) -> bool {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments[..2].iter().any(|s| s.is_empty()) {
        return false;
    }
    URL_SAFE_NO_PAD
        .decode(segments[0].trim_end_matches('='))
        .ok()
        .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok())
        .is_some_and(|header| header.is_object())
}

fn find_key(value: &Value, key: &str, at: &str) -> Option<String> {
    match value {
        Value::Object(map) => map.iter().find_map(|(k, v)| {
            let here = if at.is_empty() { k.clone() } else { format!("{at}.{k}") };
            if k == key { Some(here) } else { find_key(v, key, &here) }
        }),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, v)| find_key(v, key, &format!("{at}[{i}]"))),
        _ => None,
    }
}

fn mentions(value: &Value, field: &str) -> bool {
    match value {
        Value::String(s) => s.contains(field),
        Value::Object(map) => map.iter().any(|(k, v)| k == field || mentions(v, field)),
        Value::Array(items) => items.iter().any(|v| mentions(v, field)),
        _ => false,
    }
}

fn is_meaningful(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Number(_) => true,
        _ => false,
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string \"{}\"", truncate(s, 40)),
        Value::Array(items) => format!("array of {}", items.len()),
        Value::Object(_) => "object".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{head}...")
    }
}
