//! `/auth/*` fixtures.

use super::{SCRIPT_TAG, SQL_TAUTOLOGY, rejects, replacing, tolerates, without};
use crate::catalog::{
    AuthMode, FixtureContext, FixtureRecord, ProbeKind, RequestTemplate, Resource, RuleKind,
};
use restaurant_contract::{ErrorShape, ExpectedContract, FieldSpec, FieldType};
use serde_json::{Value, json};

const R: Resource = Resource::Auth;

/// Signup body for a fresh identity of this run.
#[must_use]
pub fn signup_body(context: &FixtureContext, tag: &str) -> Value {
    json!({
        "firstName": context.credentials.first_name,
        "lastName": context.credentials.last_name,
        "email": context.unique_email(tag),
        "password": context.signup_password,
    })
}

/// Contract of a successful signup.
#[must_use]
pub fn signup_contract() -> ExpectedContract {
    ExpectedContract::created()
        .with_json_content()
        .with_field(FieldSpec::new("token", FieldType::Jwt).or("accessToken"))
        .forbid("password")
}

fn signup() -> RequestTemplate {
    RequestTemplate::post("/auth/signup")
}

fn signin() -> RequestTemplate {
    RequestTemplate::post("/auth/signin")
}

fn validate() -> RequestTemplate {
    RequestTemplate::get("/auth/validate")
}

pub(super) fn fixtures(context: &FixtureContext) -> Vec<FixtureRecord> {
    let body = signup_body(context, "signup");
    let credentials = json!({
        "email": context.credentials.email,
        "password": context.credentials.password(),
    });

    vec![
        FixtureRecord::valid(
            "auth.signup.valid",
            R,
            signup().json(body.clone()),
            signup_contract(),
        ),
        FixtureRecord::invalid(
            "auth.signup.missing_email",
            R,
            signup().json(without(&body, "email")),
            "email",
            RuleKind::MissingField,
        ),
        FixtureRecord::invalid(
            "auth.signup.missing_password",
            R,
            signup().json(without(&body, "password")),
            "password",
            RuleKind::MissingField,
        ),
        FixtureRecord::invalid(
            "auth.signup.missing_first_name",
            R,
            signup().json(without(&body, "firstName")),
            "firstName",
            RuleKind::MissingField,
        ),
        FixtureRecord::invalid(
            "auth.signup.malformed_email",
            R,
            signup().json(replacing(&body, "email", "invalid-email")),
            "email",
            RuleKind::MalformedEmail,
        ),
        FixtureRecord::invalid(
            "auth.signup.wrong_type_email",
            R,
            signup().json(replacing(&body, "email", 12345)),
            "email",
            RuleKind::WrongType,
        ),
        FixtureRecord::invalid(
            "auth.signup.short_password",
            R,
            signup().json(replacing(&body, "password", "123")),
            "password",
            RuleKind::Length,
        ),
        FixtureRecord::invalid(
            "auth.signup.empty_first_name",
            R,
            signup().json(replacing(&body, "firstName", "")),
            "firstName",
            RuleKind::Empty,
        ),
        FixtureRecord::invalid(
            "auth.signup.long_last_name",
            R,
            signup().json(replacing(&body, "lastName", "b".repeat(1000))),
            "lastName",
            RuleKind::Length,
        ),
        FixtureRecord::invalid(
            "auth.signup.duplicate_email",
            R,
            signup().json(replacing(&body, "email", context.credentials.email.clone())),
            "email",
            RuleKind::Duplicate,
        )
        .with_contract(
            ExpectedContract::any_of(&[400, 409]).with_error(ErrorShape::mentioning("email")),
        ),
        FixtureRecord::adversarial(
            "auth.signup.sql_injection",
            R,
            signup().json(replacing(&body, "email", SQL_TAUTOLOGY)),
            ProbeKind::SqlInjection,
            rejects(&[400, 422], SQL_TAUTOLOGY),
        ),
        FixtureRecord::adversarial(
            "auth.signup.script_injection",
            R,
            signup().json(replacing(
                &signup_body(context, "xss"),
                "lastName",
                SCRIPT_TAG,
            )),
            ProbeKind::ScriptInjection,
            tolerates(201, SCRIPT_TAG).forbid("password"),
        ),
        FixtureRecord::adversarial(
            "auth.signup.oversized",
            R,
            signup().json(json!({
                "firstName": "a".repeat(10_000),
                "lastName": "b".repeat(10_000),
                "email": format!("{}@example.com", "c".repeat(10_000)),
                "password": "d".repeat(10_000),
            })),
            ProbeKind::Oversized,
            ExpectedContract::any_of(&[400, 413, 422]).with_error(ErrorShape::default()),
        ),
        FixtureRecord::adversarial(
            "auth.signup.malformed_json",
            R,
            signup().raw(r#"{"email": "broken@example.com", "password": "#),
            ProbeKind::MalformedJson,
            ExpectedContract::any_of(&[400, 422]).with_error(ErrorShape::default()),
        ),
        FixtureRecord::valid(
            "auth.signin.valid",
            R,
            signin().json(credentials.clone()),
            ExpectedContract::ok()
                .with_json_content()
                .with_field(FieldSpec::new("accessToken", FieldType::Jwt).or("token"))
                .forbid("password"),
        ),
        FixtureRecord::invalid(
            "auth.signin.missing_email",
            R,
            signin().json(without(&credentials, "email")),
            "email",
            RuleKind::MissingField,
        ),
        FixtureRecord::invalid(
            "auth.signin.missing_password",
            R,
            signin().json(without(&credentials, "password")),
            "password",
            RuleKind::MissingField,
        ),
        FixtureRecord::adversarial(
            "auth.signin.wrong_password",
            R,
            signin().json(replacing(&credentials, "password", "WrongPassword123")),
            ProbeKind::CredentialGuess,
            ExpectedContract::any_of(&[400, 401])
                .with_error(ErrorShape::default())
                .no_reflection_of("WrongPassword123"),
        ),
        FixtureRecord::adversarial(
            "auth.signin.sql_injection",
            R,
            signin().json(json!({"email": SQL_TAUTOLOGY, "password": SQL_TAUTOLOGY})),
            ProbeKind::SqlInjection,
            rejects(&[400, 401, 422], SQL_TAUTOLOGY),
        ),
        FixtureRecord::valid(
            "auth.validate.valid",
            R,
            validate().authenticated(),
            ExpectedContract::ok().with_json_content(),
        ),
        FixtureRecord::missing_token("auth.validate.missing_token", R, validate()),
        FixtureRecord::adversarial(
            "auth.validate.tampered_token",
            R,
            validate().with_auth(AuthMode::TamperedCredential),
            ProbeKind::TamperedToken,
            ExpectedContract::unauthorized(),
        ),
        FixtureRecord::adversarial(
            "auth.validate.forged_token",
            R,
            validate().with_auth(AuthMode::Bearer(context.forged_token.clone())),
            ProbeKind::ForgedToken,
            ExpectedContract::unauthorized(),
        ),
        FixtureRecord::adversarial(
            "auth.validate.malformed_token",
            R,
            validate().with_auth(AuthMode::Bearer("not-a-jwt".to_string())),
            ProbeKind::MalformedToken,
            ExpectedContract::unauthorized().no_reflection_of("not-a-jwt"),
        ),
    ]
}
