//! `/cart`, `/users/profile/*`, `/feedbacks/*` and `/reports` fixtures.

use super::{
    MISSING_ID, ROTATED_PASSWORD, SCRIPT_TAG, SQL_DROP_TABLE, SQL_TAUTOLOGY, rejects, replacing,
    tolerates, without,
};
use crate::catalog::{
    AuthMode, FixtureContext, FixtureRecord, ProbeKind, RequestTemplate, Resource, RuleKind,
};
use crate::generators::TINY_PNG_BASE64;
use restaurant_contract::{CollectionSpec, ErrorShape, ExpectedContract, FieldSpec, FieldType};
use serde_json::{Value, json};

fn one_of(values: &[&str]) -> FieldType {
    FieldType::OneOf(values.iter().map(ToString::to_string).collect())
}

fn dish_item() -> Value {
    json!({
        "dishId": "{dish_id}",
        "dishName": "Grilled Salmon",
        "dishPrice": "$12.50",
        "dishQuantity": 2,
        "dishImageUrl": "https://example.com/images/salmon.png",
    })
}

/// Pre-order body for the seeded reservation.
#[must_use]
pub fn preorder_body(context: &FixtureContext) -> Value {
    json!({
        "reservationId": "{reservation_id}",
        "address": "48 Rustaveli Avenue",
        "date": context.booking_date,
        "timeSlot": "12:00 - 14:00",
        "dishItems": [dish_item()],
        "state": "SUBMITTED",
    })
}

pub(super) fn cart(context: &FixtureContext) -> Vec<FixtureRecord> {
    let r = Resource::Cart;
    let view = || RequestTemplate::get("/cart").authenticated();
    let submit = || RequestTemplate::put("/cart").authenticated();
    let body = preorder_body(context);
    let with_quantity = |quantity: Value| {
        let mut item = dish_item();
        item["dishQuantity"] = quantity;
        replacing(&body, "dishItems", json!([item]))
    };

    vec![
        FixtureRecord::valid(
            "cart.view.valid",
            r,
            view(),
            ExpectedContract::ok().with_json_content().with_collection(CollectionSpec::at(
                "content",
                [
                    FieldSpec::text("id"),
                    FieldSpec::text("reservationId"),
                    FieldSpec::text("address"),
                    FieldSpec::text("date"),
                    FieldSpec::text("timeSlot"),
                    FieldSpec::text("state"),
                    FieldSpec::new("dishItems", FieldType::Array),
                ],
            )),
        ),
        FixtureRecord::missing_token("cart.view.missing_token", r, view()),
        FixtureRecord::valid(
            "cart.submit.valid",
            r,
            submit().json(body.clone()),
            ExpectedContract::ok().with_json_content().with_fields([
                FieldSpec::text("id"),
                FieldSpec::new("state", one_of(&["SUBMITTED", "CANCELLED", "IN_PROGRESS"])),
                FieldSpec::new("dishItems", FieldType::Array),
            ]),
        ),
        FixtureRecord::invalid(
            "cart.submit.missing_reservation",
            r,
            submit().json(without(&body, "reservationId")),
            "reservationId",
            RuleKind::MissingField,
        ),
        FixtureRecord::invalid(
            "cart.submit.wrong_type_items",
            r,
            submit().json(replacing(&body, "dishItems", "lots")),
            "dishItems",
            RuleKind::WrongType,
        ),
        FixtureRecord::invalid(
            "cart.submit.quantity_out_of_range",
            r,
            submit().json(with_quantity(json!(0))),
            "dishQuantity",
            RuleKind::OutOfRange,
        ),
        FixtureRecord::invalid(
            "cart.submit.invalid_state",
            r,
            submit().json(replacing(&body, "state", "TELEPORTED")),
            "state",
            RuleKind::InvalidChoice,
        ),
        FixtureRecord::adversarial(
            "cart.submit.oversized",
            r,
            submit().json(replacing(&body, "dishItems", vec![dish_item(); 500])),
            ProbeKind::Oversized,
            ExpectedContract::any_of(&[400, 413, 422]).with_error(ErrorShape::default()),
        ),
        FixtureRecord::adversarial(
            "cart.submit.script_injection",
            r,
            submit().json({
                let mut item = dish_item();
                item["dishName"] = json!(SCRIPT_TAG);
                replacing(&body, "dishItems", json!([item]))
            }),
            ProbeKind::ScriptInjection,
            tolerates(200, SCRIPT_TAG),
        ),
        FixtureRecord::missing_token("cart.submit.missing_token", r, submit().json(body)),
    ]
}

pub(super) fn profile(context: &FixtureContext) -> Vec<FixtureRecord> {
    let r = Resource::Profile;
    let view = || RequestTemplate::get("/users/profile").authenticated();
    let update = || RequestTemplate::put("/users/profile").authenticated();
    let password = || RequestTemplate::put("/users/profile/password").authenticated();
    let current = context.credentials.password().to_string();
    let update_body = json!({
        "firstName": context.credentials.first_name,
        "lastName": context.credentials.last_name,
        "base64encodedImage": TINY_PNG_BASE64,
    });
    let change = json!({"oldPassword": current, "newPassword": context.signup_password});
    let rotated = format!("{{{ROTATED_PASSWORD}}}");

    vec![
        FixtureRecord::valid(
            "profile.view.valid",
            r,
            view(),
            ExpectedContract::ok()
                .with_json_content()
                .with_fields([
                    FieldSpec::text("firstName"),
                    FieldSpec::text("lastName"),
                    FieldSpec::new("imageUrl", FieldType::String),
                ])
                .forbid("password")
                .forbid("passwordHash"),
        ),
        FixtureRecord::missing_token("profile.view.missing_token", r, view()),
        FixtureRecord::adversarial(
            "profile.view.tampered_token",
            r,
            view().with_auth(AuthMode::TamperedCredential),
            ProbeKind::TamperedToken,
            ExpectedContract::unauthorized(),
        ),
        FixtureRecord::valid(
            "profile.update.valid",
            r,
            update().json(update_body.clone()),
            ExpectedContract::ok().with_json_content().forbid("password"),
        ),
        FixtureRecord::invalid(
            "profile.update.empty_first_name",
            r,
            update().json(replacing(&update_body, "firstName", "")),
            "firstName",
            RuleKind::Empty,
        ),
        FixtureRecord::invalid(
            "profile.update.long_last_name",
            r,
            update().json(replacing(&update_body, "lastName", "b".repeat(1000))),
            "lastName",
            RuleKind::Length,
        ),
        FixtureRecord::invalid(
            "profile.update.invalid_image",
            r,
            update().json(replacing(&update_body, "base64encodedImage", "not base64 at all!")),
            "base64encodedImage",
            RuleKind::WrongType,
        ),
        FixtureRecord::adversarial(
            "profile.update.script_injection",
            r,
            update().json(replacing(&update_body, "firstName", SCRIPT_TAG)),
            ProbeKind::ScriptInjection,
            ExpectedContract::any_of(&[200, 400])
                .with_error(ErrorShape::default())
                .no_reflection_of(SCRIPT_TAG),
        ),
        FixtureRecord::adversarial(
            "profile.password.wrong_old",
            r,
            password().json(replacing(&change, "oldPassword", "WrongPassword123")),
            ProbeKind::CredentialGuess,
            ExpectedContract::any_of(&[400, 401, 403])
                .with_error(ErrorShape::default())
                .no_reflection_of("WrongPassword123"),
        ),
        FixtureRecord::invalid(
            "profile.password.short_new",
            r,
            password().json(replacing(&change, "newPassword", "123")),
            "newPassword",
            RuleKind::Length,
        ),
        FixtureRecord::invalid(
            "profile.password.missing_new",
            r,
            password().json(without(&change, "newPassword")),
            "newPassword",
            RuleKind::MissingField,
        ),
        FixtureRecord::valid(
            "profile.password.rotate",
            r,
            password().json(json!({"oldPassword": current, "newPassword": rotated})),
            ExpectedContract::ok(),
        )
        .sequenced(),
        FixtureRecord::valid(
            "profile.password.restore",
            r,
            password().json(json!({"oldPassword": rotated, "newPassword": current})),
            ExpectedContract::ok(),
        )
        .sequenced(),
    ]
}

pub(super) fn feedback() -> Vec<FixtureRecord> {
    let r = Resource::Feedback;
    let create = || RequestTemplate::post("/feedbacks/").authenticated();
    let visitor = || RequestTemplate::get("/feedbacks/visitor");
    let body = json!({
        "reservationId": "{reservation_id}",
        "serviceRating": "5",
        "comments": "Great service and a quiet table.",
        "cuisineRating": "4",
    });

    vec![
        FixtureRecord::valid(
            "feedback.create.valid",
            r,
            create().json(body.clone()),
            ExpectedContract::created().with_json_content().with_field(FieldSpec::text("id")),
        ),
        FixtureRecord::invalid(
            "feedback.create.rating_out_of_range",
            r,
            create().json(replacing(&body, "serviceRating", "6")),
            "serviceRating",
            RuleKind::OutOfRange,
        ),
        FixtureRecord::invalid(
            "feedback.create.missing_reservation",
            r,
            create().json(without(&body, "reservationId")),
            "reservationId",
            RuleKind::MissingField,
        ),
        FixtureRecord::invalid(
            "feedback.create.unknown_reservation",
            r,
            create().json(replacing(&body, "reservationId", MISSING_ID)),
            "reservationId",
            RuleKind::UnknownReference,
        )
        .with_contract(
            ExpectedContract::any_of(&[400, 404])
                .with_error(ErrorShape::mentioning("reservationId")),
        ),
        FixtureRecord::adversarial(
            "feedback.create.script_injection",
            r,
            create().json(replacing(&body, "comments", SCRIPT_TAG)),
            ProbeKind::ScriptInjection,
            tolerates(201, SCRIPT_TAG),
        ),
        FixtureRecord::missing_token("feedback.create.missing_token", r, create().json(body)),
        FixtureRecord::valid(
            "feedback.visitor.valid",
            r,
            visitor().query("reservationId", "{reservation_id}"),
            ExpectedContract::ok().with_json_content().with_fields([
                FieldSpec::new("accessToken", FieldType::Jwt),
                FieldSpec::text("reservationId"),
                FieldSpec::present("serviceRating"),
                FieldSpec::new("waiterImageUrl", FieldType::String),
                FieldSpec::text("waiterName"),
            ]),
        ),
        FixtureRecord::invalid(
            "feedback.visitor.missing_reservation",
            r,
            visitor(),
            "reservationId",
            RuleKind::MissingField,
        ),
    ]
}

pub(super) fn reports() -> Vec<FixtureRecord> {
    let r = Resource::Reports;
    let list = || RequestTemplate::get("/reports").authenticated();
    let create = || RequestTemplate::post("/reports").authenticated();
    let create_body = json!({
        "locationId": "{location_id}",
        "fromDateTime": "2024-01-01",
        "toDateTime": "2024-01-31",
    });

    vec![
        FixtureRecord::valid(
            "reports.list.valid",
            r,
            list(),
            ExpectedContract::ok().with_json_content().with_collection(CollectionSpec::at(
                "content",
                [
                    FieldSpec::text("id"),
                    FieldSpec::text("name"),
                    FieldSpec::new("description", FieldType::String),
                    FieldSpec::text("fromDateTime"),
                    FieldSpec::text("toDateTime"),
                    FieldSpec::text("location"),
                    FieldSpec::present("waiterId"),
                    FieldSpec::new("downloadLink", FieldType::String),
                ],
            )),
        ),
        FixtureRecord::valid(
            "reports.list.filtered",
            r,
            list()
                .query("fromDateTime", "2024-01-01")
                .query("toDateTime", "2024-12-31")
                .query("locationId", "{location_id}"),
            ExpectedContract::ok()
                .with_json_content()
                .with_collection(CollectionSpec::at("content", [FieldSpec::text("id")])),
        ),
        FixtureRecord::invalid(
            "reports.list.malformed_date",
            r,
            list()
                .query("fromDateTime", "2024/01/01")
                .query("toDateTime", "2024-12-31")
                .query("locationId", "{location_id}"),
            "fromDateTime",
            RuleKind::MalformedDate,
        ),
        FixtureRecord::adversarial(
            "reports.list.sql_injection",
            r,
            list().query("waiterId", SQL_DROP_TABLE),
            ProbeKind::SqlInjection,
            rejects(&[200, 400, 422], SQL_DROP_TABLE),
        ),
        FixtureRecord::missing_token("reports.list.missing_token", r, list()),
        FixtureRecord::valid(
            "reports.create.valid",
            r,
            create().json(create_body.clone()),
            ExpectedContract::any_of(&[200, 201, 202])
                .with_json_content()
                .with_field(FieldSpec::present("reportId").or("message").or("status")),
        ),
        FixtureRecord::adversarial(
            "reports.create.sql_injection",
            r,
            create().json(replacing(&create_body, "locationId", SQL_TAUTOLOGY)),
            ProbeKind::SqlInjection,
            rejects(&[400, 404, 422], SQL_TAUTOLOGY),
        ),
        FixtureRecord::missing_token("reports.create.missing_token", r, create().json(create_body)),
    ]
}
