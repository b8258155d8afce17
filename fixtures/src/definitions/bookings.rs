//! `/bookings/*` and `/reservations/*` fixtures.

use super::menu::dish_summary;
use super::{CREATED_RESERVATION, MISSING_ID, SQL_TAUTOLOGY, rejects, replacing, without};
use crate::catalog::{FixtureContext, FixtureRecord, ProbeKind, RequestTemplate, Resource, RuleKind};
use restaurant_contract::{CollectionSpec, ErrorShape, ExpectedContract, FieldSpec, FieldType};
use serde_json::{Value, json};

/// Body of a client booking for the resolved location.
#[must_use]
pub fn booking_body(context: &FixtureContext) -> Value {
    json!({
        "locationId": "{location_id}",
        "tableNumber": "1",
        "date": context.booking_date,
        "guestsNumber": "4",
        "timeFrom": "12:00",
        "timeTo": "14:00",
    })
}

/// Fields of a reservation as returned by bookings and listings.
fn reservation_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::text("id"),
        FieldSpec::text("status"),
        FieldSpec::text("locationAddress"),
        FieldSpec::new("date", FieldType::Matches(r"^\d{4}-\d{2}-\d{2}".to_string())),
        FieldSpec::text("timeSlot"),
        FieldSpec::present("guestsNumber"),
    ]
}

/// Contract of a successful client booking.
#[must_use]
pub fn booking_contract() -> ExpectedContract {
    ExpectedContract::created()
        .with_json_content()
        .with_fields(reservation_fields())
        .with_fields([FieldSpec::present("preOrder"), FieldSpec::present("feedbackId")])
}

/// Table search with every parameter valid except the overridden ones.
fn table_search(context: &FixtureContext, overrides: &[(&str, &str)]) -> RequestTemplate {
    let valid = [
        ("locationId", "{location_id}"),
        ("date", context.booking_date.as_str()),
        ("time", "12:00"),
        ("guests", "4"),
    ];
    valid
        .into_iter()
        .fold(RequestTemplate::get("/bookings/tables"), |template, (name, value)| {
            let value = overrides
                .iter()
                .find(|(n, _)| *n == name)
                .map_or(value, |(_, v)| *v);
            template.query(name, value)
        })
}

pub(super) fn bookings(context: &FixtureContext) -> Vec<FixtureRecord> {
    let r = Resource::Bookings;
    let client = || RequestTemplate::post("/bookings/client").authenticated();
    let waiter = || RequestTemplate::post("/bookings/waiter").authenticated();
    let body = booking_body(context);
    let waiter_body = {
        let mut b = replacing(&body, "clientType", "CUSTOMER");
        b = replacing(&b, "customerName", "Jane Doe");
        replacing(&b, "tableNumber", "2")
    };

    vec![
        FixtureRecord::valid(
            "bookings.tables.valid",
            r,
            table_search(context, &[]),
            ExpectedContract::ok().with_json_content().with_collection(CollectionSpec::of([
                FieldSpec::text("locationId"),
                FieldSpec::text("locationAddress"),
                FieldSpec::present("tableNumber"),
                FieldSpec::present("capacity"),
                FieldSpec::new("availableSlots", FieldType::Array),
            ])),
        ),
        FixtureRecord::invalid(
            "bookings.tables.malformed_date",
            r,
            table_search(context, &[("date", "2024/08/01")]),
            "date",
            RuleKind::MalformedDate,
        ),
        FixtureRecord::invalid(
            "bookings.tables.malformed_time",
            r,
            table_search(context, &[("time", "25:99")]),
            "time",
            RuleKind::MalformedTime,
        ),
        FixtureRecord::invalid(
            "bookings.tables.guests_out_of_range",
            r,
            table_search(context, &[("guests", "0")]),
            "guests",
            RuleKind::OutOfRange,
        ),
        FixtureRecord::adversarial(
            "bookings.tables.sql_injection",
            r,
            table_search(context, &[("locationId", SQL_TAUTOLOGY)]),
            ProbeKind::SqlInjection,
            rejects(&[200, 400, 404, 422], SQL_TAUTOLOGY),
        ),
        FixtureRecord::valid(
            "bookings.client.valid",
            r,
            client().json(body.clone()),
            booking_contract(),
        )
        .sequenced(),
        FixtureRecord::invalid(
            "bookings.client.missing_date",
            r,
            client().json(without(&body, "date")),
            "date",
            RuleKind::MissingField,
        ),
        FixtureRecord::invalid(
            "bookings.client.malformed_date",
            r,
            client().json(replacing(&body, "date", "01-08-2024")),
            "date",
            RuleKind::MalformedDate,
        ),
        FixtureRecord::invalid(
            "bookings.client.malformed_time",
            r,
            client().json(replacing(&body, "timeFrom", "noon")),
            "timeFrom",
            RuleKind::MalformedTime,
        ),
        FixtureRecord::invalid(
            "bookings.client.guests_out_of_range",
            r,
            client().json(replacing(&body, "guestsNumber", "0")),
            "guestsNumber",
            RuleKind::OutOfRange,
        ),
        FixtureRecord::invalid(
            "bookings.client.wrong_type_guests",
            r,
            client().json(replacing(&body, "guestsNumber", true)),
            "guestsNumber",
            RuleKind::WrongType,
        ),
        FixtureRecord::invalid(
            "bookings.client.unknown_location",
            r,
            client().json(replacing(&body, "locationId", MISSING_ID)),
            "locationId",
            RuleKind::UnknownReference,
        )
        .with_contract(
            ExpectedContract::any_of(&[400, 404])
                .with_error(ErrorShape::mentioning("locationId")),
        ),
        FixtureRecord::missing_token(
            "bookings.client.missing_token",
            r,
            client().json(body.clone()),
        ),
        FixtureRecord::valid(
            "bookings.waiter.valid",
            r,
            waiter().json(waiter_body.clone()),
            ExpectedContract::created()
                .with_json_content()
                .with_fields(reservation_fields())
                .with_field(FieldSpec::new("userInfo", FieldType::Matches("Jane Doe".to_string()))),
        )
        .sequenced(),
        FixtureRecord::invalid(
            "bookings.waiter.invalid_client_type",
            r,
            waiter().json(replacing(&waiter_body, "clientType", "ALIEN")),
            "clientType",
            RuleKind::InvalidChoice,
        ),
        FixtureRecord::invalid(
            "bookings.waiter.missing_customer_name",
            r,
            waiter().json(without(&waiter_body, "customerName")),
            "customerName",
            RuleKind::MissingField,
        ),
        FixtureRecord::missing_token(
            "bookings.waiter.missing_token",
            r,
            waiter().json(waiter_body),
        ),
    ]
}

pub(super) fn reservations() -> Vec<FixtureRecord> {
    let r = Resource::Reservations;
    let cancel_created = || {
        RequestTemplate::delete(format!("/reservations/{{{CREATED_RESERVATION}}}")).authenticated()
    };
    vec![
        FixtureRecord::valid(
            "reservations.list.valid",
            r,
            RequestTemplate::get("/reservations").authenticated(),
            ExpectedContract::ok().with_json_content().with_collection(CollectionSpec::of(
                reservation_fields()
                    .into_iter()
                    .chain([FieldSpec::present("preOrder"), FieldSpec::present("feedbackId")]),
            )),
        ),
        FixtureRecord::missing_token(
            "reservations.list.missing_token",
            r,
            RequestTemplate::get("/reservations"),
        ),
        FixtureRecord::unknown_reference(
            "reservations.cancel.unknown",
            r,
            RequestTemplate::delete(format!("/reservations/{MISSING_ID}")).authenticated(),
            "id",
        ),
        FixtureRecord::adversarial(
            "reservations.cancel.sql_injection",
            r,
            RequestTemplate::delete(format!("/reservations/{SQL_TAUTOLOGY}")).authenticated(),
            ProbeKind::SqlInjection,
            rejects(&[400, 404], SQL_TAUTOLOGY),
        ),
        FixtureRecord::valid(
            "reservations.cancel.created",
            r,
            cancel_created(),
            ExpectedContract::any_of(&[200, 204]),
        )
        .sequenced(),
        FixtureRecord::valid(
            "reservations.cancel.repeat",
            r,
            cancel_created(),
            ExpectedContract::any_of(&[200, 204, 404]),
        )
        .sequenced(),
        FixtureRecord::valid(
            "reservations.available_dishes.valid",
            r,
            RequestTemplate::get("/reservations/{reservation_id}/available-dishes").authenticated(),
            ExpectedContract::ok()
                .with_json_content()
                .with_collection(CollectionSpec::at("content", dish_summary())),
        ),
        FixtureRecord::unknown_reference(
            "reservations.available_dishes.unknown",
            r,
            RequestTemplate::get(format!("/reservations/{MISSING_ID}/available-dishes"))
                .authenticated(),
            "id",
        ),
        FixtureRecord::valid(
            "reservations.order.valid",
            r,
            RequestTemplate::post("/reservations/{reservation_id}/order/{dish_id}").authenticated(),
            ExpectedContract::any_of(&[200, 201]).with_json_content(),
        ),
        FixtureRecord::unknown_reference(
            "reservations.order.unknown_dish",
            r,
            RequestTemplate::post(format!("/reservations/{{reservation_id}}/order/{MISSING_ID}"))
                .authenticated(),
            "dishId",
        ),
    ]
}
