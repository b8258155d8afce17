//! Health, `/dishes/*` and `/locations/*` fixtures.

use super::{MISSING_ID, SCRIPT_TAG, SQL_TAUTOLOGY, rejects, tolerates};
use crate::catalog::{FixtureRecord, ProbeKind, RequestTemplate, Resource, RuleKind};
use restaurant_contract::{CollectionSpec, ExpectedContract, FieldSpec, FieldType};

fn json_ok() -> ExpectedContract {
    ExpectedContract::ok().with_json_content()
}

fn one_of(values: &[&str]) -> FieldType {
    FieldType::OneOf(values.iter().map(ToString::to_string).collect())
}

fn dish_card() -> Vec<FieldSpec> {
    ["name", "price", "weight", "imageUrl"]
        .into_iter()
        .map(FieldSpec::text)
        .collect()
}

/// Fields of a dish in paginated dish listings.
pub(crate) fn dish_summary() -> Vec<FieldSpec> {
    ["id", "name", "previewImageUrl", "price", "state", "weight"]
        .into_iter()
        .map(FieldSpec::text)
        .collect()
}

pub(super) fn health() -> Vec<FixtureRecord> {
    let r = Resource::Health;
    vec![
        FixtureRecord::valid(
            "health.check.valid",
            r,
            RequestTemplate::get("/health"),
            json_ok().with_field(FieldSpec::new("status", one_of(&["ok"]))),
        ),
        FixtureRecord::valid(
            "health.root.valid",
            r,
            RequestTemplate::get("/"),
            json_ok().with_field(FieldSpec::text("message")),
        ),
    ]
}

pub(super) fn dishes() -> Vec<FixtureRecord> {
    let r = Resource::Dishes;
    let list = || RequestTemplate::get("/dishes");
    vec![
        FixtureRecord::valid(
            "dishes.popular.valid",
            r,
            RequestTemplate::get("/dishes/popular"),
            json_ok().with_collection(CollectionSpec::of(dish_card())),
        ),
        FixtureRecord::valid(
            "dishes.list.valid",
            r,
            list(),
            json_ok().with_collection(CollectionSpec::at("content", dish_summary())),
        ),
        FixtureRecord::valid(
            "dishes.list.filtered",
            r,
            list().query("dishType", "MAIN_COURSE").query("sort", "price,asc"),
            json_ok().with_collection(CollectionSpec::at("content", dish_summary())),
        ),
        FixtureRecord::invalid(
            "dishes.list.invalid_type",
            r,
            list().query("dishType", "INVALID_TYPE").query("sort", "price,asc"),
            "dishType",
            RuleKind::InvalidChoice,
        ),
        FixtureRecord::invalid(
            "dishes.list.invalid_sort",
            r,
            list().query("dishType", "MAIN_COURSE").query("sort", "invalid,sort"),
            "sort",
            RuleKind::InvalidChoice,
        ),
        FixtureRecord::adversarial(
            "dishes.list.script_injection",
            r,
            list().query("dishType", SCRIPT_TAG),
            ProbeKind::ScriptInjection,
            tolerates(200, SCRIPT_TAG),
        ),
        FixtureRecord::valid(
            "dishes.detail.valid",
            r,
            RequestTemplate::get("/dishes/{dish_id}"),
            json_ok()
                .with_fields(
                    [
                        "id",
                        "name",
                        "description",
                        "price",
                        "weight",
                        "imageUrl",
                        "calories",
                        "proteins",
                        "fats",
                        "carbohydrates",
                        "vitamins",
                        "state",
                    ]
                    .into_iter()
                    .map(FieldSpec::text),
                )
                .with_field(FieldSpec::new(
                    "dishType",
                    one_of(&["APPETIZERS", "MAIN_COURSE", "DESSERTS"]),
                )),
        ),
        FixtureRecord::unknown_reference(
            "dishes.detail.unknown",
            r,
            RequestTemplate::get(format!("/dishes/{MISSING_ID}")),
            "id",
        ),
        FixtureRecord::adversarial(
            "dishes.detail.sql_injection",
            r,
            RequestTemplate::get(format!("/dishes/{SQL_TAUTOLOGY}")),
            ProbeKind::SqlInjection,
            rejects(&[400, 404, 422], SQL_TAUTOLOGY),
        ),
    ]
}

pub(super) fn locations() -> Vec<FixtureRecord> {
    let r = Resource::Locations;
    let feedbacks = || RequestTemplate::get("/locations/{location_id}/feedbacks");
    vec![
        FixtureRecord::valid(
            "locations.list.valid",
            r,
            RequestTemplate::get("/locations"),
            json_ok().with_collection(CollectionSpec::of([
                FieldSpec::text("id"),
                FieldSpec::text("address"),
                FieldSpec::new("description", FieldType::String),
                FieldSpec::present("totalCapacity"),
                FieldSpec::present("averageOccupancy"),
                FieldSpec::new("imageUrl", FieldType::String),
                FieldSpec::present("rating"),
            ])),
        ),
        FixtureRecord::valid(
            "locations.options.valid",
            r,
            RequestTemplate::get("/locations/select-options"),
            json_ok().with_collection(CollectionSpec::of([
                FieldSpec::text("id"),
                FieldSpec::text("address"),
            ])),
        ),
        FixtureRecord::valid(
            "locations.speciality.valid",
            r,
            RequestTemplate::get("/locations/{location_id}/speciality-dishes"),
            json_ok().with_collection(CollectionSpec::of(dish_card())),
        ),
        FixtureRecord::unknown_reference(
            "locations.speciality.unknown",
            r,
            RequestTemplate::get(format!("/locations/{MISSING_ID}/speciality-dishes")),
            "id",
        ),
        FixtureRecord::valid(
            "locations.feedbacks.valid",
            r,
            feedbacks()
                .query("type", "SERVICE_QUALITY")
                .query("page", "0")
                .query("size", "10"),
            json_ok()
                .with_fields([
                    FieldSpec::new("totalPages", FieldType::Integer),
                    FieldSpec::new("totalElements", FieldType::Integer),
                    FieldSpec::new("size", FieldType::Integer),
                    FieldSpec::new("number", FieldType::Integer),
                    FieldSpec::new("numberOfElements", FieldType::Integer),
                    FieldSpec::new("first", FieldType::Boolean),
                    FieldSpec::new("last", FieldType::Boolean),
                    FieldSpec::new("empty", FieldType::Boolean),
                ])
                .with_collection(CollectionSpec::at(
                    "content",
                    [
                        "id",
                        "rate",
                        "comment",
                        "userName",
                        "userAvatarUrl",
                        "date",
                        "type",
                        "locationId",
                    ]
                    .into_iter()
                    .map(FieldSpec::present),
                )),
        ),
        FixtureRecord::invalid(
            "locations.feedbacks.invalid_type",
            r,
            feedbacks()
                .query("type", "INVALID_TYPE")
                .query("page", "0")
                .query("size", "10"),
            "type",
            RuleKind::InvalidChoice,
        ),
        FixtureRecord::adversarial(
            "locations.feedbacks.script_injection",
            r,
            feedbacks().query("type", SCRIPT_TAG),
            ProbeKind::ScriptInjection,
            tolerates(200, SCRIPT_TAG),
        ),
    ]
}
