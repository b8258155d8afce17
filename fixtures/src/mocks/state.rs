//! Mutable state of the mock API and the rules its handlers enforce.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{NaiveDate, NaiveTime, Utc};
use harness_common::TestCredentials;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use wiremock::{Request, ResponseTemplate};

use crate::generators;

/// Seeded location id.
pub const LOCATION_ID: &str = "672846d5c951184d705b65d7";
/// Seeded dish id.
pub const DISH_ID: &str = "322846d5c951184d705b65d2";
/// Seeded reservation id of the pre-provisioned user.
pub const RESERVATION_ID: &str = "672846d5c951184d705b65d8";

/// Request bodies above this size are rejected with 413.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

const SIGNING_KEY: &[u8] = b"mock-restaurant-api-signing-key";
const LOCATION_ADDRESS: &str = "48 Rustaveli Avenue";

pub(super) const DISH_TYPES: [&str; 3] = ["APPETIZERS", "MAIN_COURSE", "DESSERTS"];
pub(super) const FEEDBACK_TYPES: [&str; 2] = ["SERVICE_QUALITY", "CUISINE_EXPERIENCE"];
pub(super) const CLIENT_TYPES: [&str; 2] = ["CUSTOMER", "VISITOR"];
pub(super) const PREORDER_STATES: [&str; 3] = ["SUBMITTED", "CANCELLED", "IN_PROGRESS"];

/// A response the handler bails out with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Rejection {
    status: u16,
    code: &'static str,
    message: String,
    field: Option<String>,
}

impl Rejection {
    pub(super) fn validation(field: &str, message: impl Into<String>) -> Self {
        Self {
            status: 400,
            code: "VALIDATION_ERROR",
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    pub(super) fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: 404,
            code: "NOT_FOUND",
            message: message.into(),
            field: None,
        }
    }

    pub(super) fn unknown_reference(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.to_string()),
            ..Self::not_found(message)
        }
    }

    pub(super) fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: 401,
            code: "UNAUTHORIZED",
            message: message.into(),
            field: None,
        }
    }

    pub(super) fn conflict(field: &str, message: impl Into<String>) -> Self {
        Self {
            status: 409,
            code: "CONFLICT",
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    pub(super) fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: 400,
            code,
            message: message.into(),
            field: None,
        }
    }

    pub(super) fn too_large() -> Self {
        Self {
            status: 413,
            code: "PAYLOAD_TOO_LARGE",
            message: format!("Request body exceeds {MAX_BODY_BYTES} bytes"),
            field: None,
        }
    }

    pub(super) fn internal() -> Self {
        Self {
            status: 500,
            code: "INTERNAL_ERROR",
            message: "Internal server error".to_string(),
            field: None,
        }
    }

    pub(super) const fn status(&self) -> u16 {
        self.status
    }

    pub(super) fn into_response(self) -> ResponseTemplate {
        let mut body = json!({"code": self.code, "message": self.message});
        if let Some(field) = self.field {
            body["field"] = Value::String(field);
        }
        ResponseTemplate::new(self.status).set_body_json(body)
    }
}

pub(super) type Outcome = Result<ResponseTemplate, Rejection>;

#[derive(Debug, Clone)]
pub(super) struct User {
    pub(super) first_name: String,
    pub(super) last_name: String,
    pub(super) password: String,
    pub(super) image_url: String,
}

#[derive(Debug, Clone)]
pub(super) struct Reservation {
    pub(super) id: String,
    pub(super) owner: String,
    pub(super) table: i64,
    pub(super) date: String,
    pub(super) time_slot: String,
    pub(super) guests: String,
    pub(super) customer: Option<String>,
}

impl Reservation {
    /// Check if both reservations hold the same table at the same time.
    pub(super) fn occupies_same_slot(&self, other: &Self) -> bool {
        self.table == other.table && self.date == other.date && self.time_slot == other.time_slot
    }

    pub(super) fn to_json(&self) -> Value {
        let mut body = json!({
            "id": self.id,
            "status": "Reserved",
            "locationAddress": LOCATION_ADDRESS,
            "date": self.date,
            "timeSlot": self.time_slot,
            "preOrder": "",
            "guestsNumber": self.guests,
            "feedbackId": "",
        });
        if let Some(customer) = &self.customer {
            body["userInfo"] = Value::String(format!("Customer {customer}"));
        }
        body
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Everything the mock API remembers between requests.
#[derive(Debug, Default)]
pub(super) struct Store {
    pub(super) users: HashMap<String, User>,
    pub(super) reservations: Vec<Reservation>,
    pub(super) preorders: Vec<Value>,
    pub(super) feedbacks: Vec<Value>,
    pub(super) reports: Vec<Value>,
}

/// Shared state behind the mounted routes.
#[derive(Debug)]
pub struct MockState {
    store: Mutex<Store>,
    seeded: bool,
    broken_signin: bool,
}

impl MockState {
    pub(super) fn new(credentials: &TestCredentials, seeded: bool, broken_signin: bool) -> Self {
        let mut store = Store::default();
        store.users.insert(
            credentials.email.clone(),
            User {
                first_name: credentials.first_name.clone(),
                last_name: credentials.last_name.clone(),
                password: credentials.password().to_string(),
                image_url: String::new(),
            },
        );
        if seeded {
            let date = generators::future_date(3);
            store.reservations.push(Reservation {
                id: RESERVATION_ID.to_string(),
                owner: credentials.email.clone(),
                table: 3,
                date: date.clone(),
                time_slot: "18:00 - 20:00".to_string(),
                guests: "2".to_string(),
                customer: None,
            });
            store.preorders.push(json!({
                "id": generators::object_id(),
                "reservationId": RESERVATION_ID,
                "address": LOCATION_ADDRESS,
                "date": date,
                "timeSlot": "18:00 - 20:00",
                "state": "SUBMITTED",
                "dishItems": [],
            }));
            store.reports.push(json!({
                "id": generators::object_id(),
                "name": "Monthly staff performance",
                "description": "Waiter ratings and served tables",
                "fromDateTime": "2024-01-01",
                "toDateTime": "2024-01-31",
                "location": LOCATION_ADDRESS,
                "waiterId": generators::object_id(),
                "downloadLink": "https://example.com/reports/staff.xlsx",
            }));
        }
        Self {
            store: Mutex::new(store),
            seeded,
            broken_signin,
        }
    }

    pub(super) fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) const fn seeded(&self) -> bool {
        self.seeded
    }

    pub(super) const fn broken_signin(&self) -> bool {
        self.broken_signin
    }

    /// Issue a bearer token for `email`.
    pub(super) fn issue_token(email: &str) -> Result<String, Rejection> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: email.to_string(),
            iat: now,
            exp: now + 3600,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(SIGNING_KEY))
            .map_err(|_| Rejection::internal())
    }

    /// Email of the user the request's bearer token belongs to.
    pub(super) fn authenticate(&self, request: &Request) -> Result<String, Rejection> {
        let token = request
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| Rejection::unauthorized("Missing bearer token"))?;
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(SIGNING_KEY),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| Rejection::unauthorized("Invalid or expired token"))?;
        if self.store().users.contains_key(&data.claims.sub) {
            Ok(data.claims.sub)
        } else {
            Err(Rejection::unauthorized("Unknown user"))
        }
    }

    /// Current password of a user.
    #[must_use]
    pub fn password_of(&self, email: &str) -> Option<String> {
        self.store().users.get(email).map(|u| u.password.clone())
    }

    /// Number of registered users.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.store().users.len()
    }

    /// Number of live reservations.
    #[must_use]
    pub fn reservation_count(&self) -> usize {
        self.store().reservations.len()
    }
}

/// Parse a JSON object body.
pub(super) fn json_body(request: &Request) -> Result<Map<String, Value>, Rejection> {
    if request.body.len() > MAX_BODY_BYTES {
        return Err(Rejection::too_large());
    }
    match serde_json::from_slice::<Value>(&request.body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Rejection::bad_request(
            "MALFORMED_JSON",
            "Request body must be a JSON object",
        )),
        Err(_) => Err(Rejection::bad_request("MALFORMED_JSON", "Request body is not valid JSON")),
    }
}

/// Query parameter by name.
pub(super) fn query(request: &Request, name: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Path segment by index, ignoring the leading slash.
pub(super) fn segment(request: &Request, index: usize) -> String {
    request
        .url
        .path_segments()
        .and_then(|mut s| s.nth(index))
        .unwrap_or_default()
        .to_string()
}

/// Required string field.
pub(super) fn required_str<'a>(
    body: &'a Map<String, Value>,
    field: &str,
) -> Result<&'a str, Rejection> {
    match body.get(field) {
        None | Some(Value::Null) => {
            Err(Rejection::validation(field, format!("{field} is required")))
        }
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(Rejection::validation(field, format!("{field} must be a string"))),
    }
}

/// Optional string field.
pub(super) fn optional_str<'a>(
    body: &'a Map<String, Value>,
    field: &str,
) -> Result<Option<&'a str>, Rejection> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(Rejection::validation(field, format!("{field} must be a string"))),
    }
}

/// Name of 1 to 50 characters without markup.
pub(super) fn check_name(field: &str, value: &str) -> Result<(), Rejection> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(Rejection::validation(field, format!("{field} must not be empty")));
    }
    if len > 50 {
        return Err(Rejection::validation(field, format!("{field} must be at most 50 characters")));
    }
    if value.contains(['<', '>']) {
        return Err(Rejection::validation(field, format!("{field} contains invalid characters")));
    }
    Ok(())
}

pub(super) fn check_email(value: &str) -> Result<(), Rejection> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    let valid = EMAIL
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(value));
    if value.len() > 254 || !valid {
        return Err(Rejection::validation("email", "email has an invalid format"));
    }
    Ok(())
}

pub(super) fn check_password(field: &str, value: &str) -> Result<(), Rejection> {
    if !(8..=64).contains(&value.chars().count()) {
        return Err(Rejection::validation(
            field,
            format!("{field} must be between 8 and 64 characters"),
        ));
    }
    Ok(())
}

pub(super) fn check_date(field: &str, value: &str) -> Result<(), Rejection> {
    if value.len() != 10 || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
        return Err(Rejection::validation(
            field,
            format!("{field} must be a date in YYYY-MM-DD format"),
        ));
    }
    Ok(())
}

pub(super) fn check_time(field: &str, value: &str) -> Result<(), Rejection> {
    if value.len() != 5 || NaiveTime::parse_from_str(value, "%H:%M").is_err() {
        return Err(Rejection::validation(field, format!("{field} must be a time in HH:MM format")));
    }
    Ok(())
}

pub(super) fn check_choice(field: &str, value: &str, allowed: &[&str]) -> Result<(), Rejection> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(Rejection::validation(field, format!("{field} must be one of {}", allowed.join(", "))))
    }
}

pub(super) fn is_object_id(value: &str) -> bool {
    value.len() == 24 && value.chars().all(|c| c.is_ascii_hexdigit())
}

pub(super) fn check_object_id(field: &str, value: &str) -> Result<(), Rejection> {
    if is_object_id(value) {
        Ok(())
    } else {
        Err(Rejection::validation(field, format!("{field} must be a valid id")))
    }
}

/// Integer given as a JSON number or a numeric string, within `range`.
pub(super) fn bounded_int(
    body: &Map<String, Value>,
    field: &str,
    range: std::ops::RangeInclusive<i64>,
) -> Result<i64, Rejection> {
    let value = match body.get(field) {
        None | Some(Value::Null) => {
            return Err(Rejection::validation(field, format!("{field} is required")));
        }
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        Some(_) => None,
    }
    .ok_or_else(|| Rejection::validation(field, format!("{field} must be a number")))?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(Rejection::validation(
            field,
            format!("{field} must be between {} and {}", range.start(), range.end()),
        ))
    }
}

pub(super) fn check_image(value: &str) -> Result<(), Rejection> {
    STANDARD
        .decode(value)
        .map(|_| ())
        .map_err(|_| {
            Rejection::validation("base64encodedImage", "base64encodedImage must be base64 encoded")
        })
}

pub(super) fn location_json() -> Value {
    json!({
        "id": LOCATION_ID,
        "address": LOCATION_ADDRESS,
        "description": "Old town restaurant with a terrace",
        "totalCapacity": "40",
        "averageOccupancy": "65%",
        "imageUrl": "https://example.com/images/rustaveli.png",
        "rating": "4.8",
    })
}

pub(super) const fn location_address() -> &'static str {
    LOCATION_ADDRESS
}

pub(super) fn dish_card() -> Value {
    json!({
        "name": "Grilled Salmon",
        "price": "12.50",
        "weight": "350 g",
        "imageUrl": "https://example.com/images/salmon.png",
    })
}

pub(super) fn dish_summary() -> Value {
    json!({
        "id": DISH_ID,
        "name": "Grilled Salmon",
        "previewImageUrl": "https://example.com/images/salmon-preview.png",
        "price": "12.50",
        "state": "Available",
        "weight": "350 g",
    })
}

pub(super) fn dish_detail() -> Value {
    json!({
        "id": DISH_ID,
        "name": "Grilled Salmon",
        "description": "Atlantic salmon with lemon butter",
        "price": "12.50",
        "weight": "350 g",
        "imageUrl": "https://example.com/images/salmon.png",
        "calories": "420 kcal",
        "proteins": "34 g",
        "fats": "22 g",
        "carbohydrates": "8 g",
        "vitamins": "B12, D",
        "dishType": "MAIN_COURSE",
        "state": "Available",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::{email_strategy, malformed_email_strategy};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_email_check_matches_generators(
            malformed in malformed_email_strategy(),
            valid in email_strategy(),
        ) {
            prop_assert!(check_email(&malformed).is_err(), "{malformed} accepted");
            prop_assert!(check_email(&valid).is_ok(), "{valid} rejected");
        }
    }

    #[test]
    fn test_validation_rejection_names_field() {
        let rejection = Rejection::validation("email", "email is required");
        assert_eq!(rejection.status(), 400);
        assert_eq!(rejection.field.as_deref(), Some("email"));
    }

    #[test]
    fn test_format_checks() {
        assert!(check_email("jhon_smith@example.com").is_ok());
        assert!(check_email("invalid-email").is_err());
        assert!(check_email("' OR '1'='1' --").is_err());
        assert!(check_date("date", "2030-08-01").is_ok());
        assert!(check_date("date", "01-08-2030").is_err());
        assert!(check_date("date", "2030/08/01").is_err());
        assert!(check_time("timeFrom", "12:00").is_ok());
        assert!(check_time("time", "25:99").is_err());
        assert!(check_name("firstName", "").is_err());
        assert!(check_name("lastName", &"b".repeat(51)).is_err());
        assert!(check_name("lastName", "<script>").is_err());
        assert!(check_object_id("id", LOCATION_ID).is_ok());
        assert!(check_object_id("id", "abc").is_err());
    }

    #[test]
    fn test_bounded_int_accepts_numeric_strings() {
        let body = json!({"a": "4", "b": 4, "c": true, "d": "0"});
        let map = body.as_object().unwrap();
        assert_eq!(bounded_int(map, "a", 1..=10).unwrap(), 4);
        assert_eq!(bounded_int(map, "b", 1..=10).unwrap(), 4);
        assert!(bounded_int(map, "c", 1..=10).is_err());
        assert!(bounded_int(map, "d", 1..=10).is_err());
        assert!(bounded_int(map, "missing", 1..=10).is_err());
    }

    #[test]
    fn test_token_round_trip() {
        let state = MockState::new(&TestCredentials::default(), true, false);
        let token = MockState::issue_token("jhon_smith@example.com").unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(state.reservation_count(), 1);
        assert_eq!(state.password_of("jhon_smith@example.com").as_deref(), Some("Y2kjqKHX"));
    }
}
