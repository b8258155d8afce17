//! Fixture definitions per resource category.

mod account;
mod auth;
mod bookings;
mod menu;

pub use account::preorder_body;
pub use auth::{signup_body, signup_contract};
pub use bookings::{booking_body, booking_contract};

use crate::catalog::{FixtureContext, FixtureRecord};
use restaurant_contract::{ErrorShape, ExpectedContract};
use serde_json::Value;

/// A well-formed id no seeded resource has.
pub const MISSING_ID: &str = "000000000000000000000000";

/// Placeholder for the reservation created by the booking scenario.
pub const CREATED_RESERVATION: &str = "created_reservation_id";

/// Placeholder for the temporary password of the rotation scenario.
pub const ROTATED_PASSWORD: &str = "rotated_password";

/// Classic tautology injection.
pub const SQL_TAUTOLOGY: &str = "' OR '1'='1' --";

/// Statement-terminating injection.
pub const SQL_DROP_TABLE: &str = "'; DROP TABLE users; --";

/// Script tag injection.
pub const SCRIPT_TAG: &str = "<script>alert('xss')</script>";

/// Event handler injection.
pub const IMG_ONERROR: &str = "<img src=x onerror=alert(1)>";

/// All fixtures in run order.
#[must_use]
pub fn all(context: &FixtureContext) -> Vec<FixtureRecord> {
    let mut records = Vec::new();
    records.extend(menu::health());
    records.extend(auth::fixtures(context));
    records.extend(menu::dishes());
    records.extend(menu::locations());
    records.extend(bookings::bookings(context));
    records.extend(bookings::reservations());
    records.extend(account::cart(context));
    records.extend(account::profile(context));
    records.extend(account::feedback());
    records.extend(account::reports());
    records
}

/// Probe contract: any of the rejection statuses, no echo of the payload.
pub(crate) fn rejects(codes: &[u16], payload: &str) -> ExpectedContract {
    ExpectedContract::any_of(codes)
        .with_error(ErrorShape::default())
        .no_reflection_of(payload)
}

/// Probe contract: rejected, or accepted with the value stored verbatim.
pub(crate) fn tolerates(success: u16, payload: &str) -> ExpectedContract {
    ExpectedContract::any_of(&[success, 400, 422])
        .with_error(ErrorShape::default())
        .no_reflection_of(payload)
}

/// Copy of an object body without `field`.
pub(crate) fn without(body: &Value, field: &str) -> Value {
    let mut copy = body.clone();
    if let Some(map) = copy.as_object_mut() {
        map.remove(field);
    }
    copy
}

/// Copy of an object body with `field` replaced.
pub(crate) fn replacing(body: &Value, field: &str, value: impl Into<Value>) -> Value {
    let mut copy = body.clone();
    if let Some(map) = copy.as_object_mut() {
        map.insert(field.to_string(), value.into());
    }
    copy
}
