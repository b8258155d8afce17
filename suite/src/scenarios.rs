//! Multi-step scenarios that chain several requests.
//!
//! Scenarios run in their own scope after the per-resource cases. Each one
//! is a single case of that scope, so a setup failure in one aborts the
//! scenarios that follow it.

use harness_common::{ContractViolation, HarnessConfig, HarnessError, HarnessResult, SubCheck};
use restaurant_contract::{CaseOutcome, verify};
use restaurant_fixtures::definitions::{
    CREATED_RESERVATION, ROTATED_PASSWORD, signup_body, signup_contract,
};
use restaurant_fixtures::generators::random_password;
use restaurant_fixtures::{
    AuthMode, FixtureCatalog, FixtureContext, FixtureRecord, HttpMethod, Payload, RequestTemplate,
    Resource, SeedKind,
};
use restaurant_harness::{Credential, SessionScope, execute, execute_with};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, warn};

/// Scope name of the scenarios in reports.
pub const SCOPE: &str = "scenarios";

/// Run every scenario.
///
/// Password rotation runs last so the other scenarios sign in with the
/// configured password.
///
/// # Errors
///
/// Returns a configuration error if the scope cannot be opened.
pub async fn run(
    config: &HarnessConfig,
    catalog: &FixtureCatalog,
    context: &FixtureContext,
) -> HarnessResult<Vec<CaseOutcome>> {
    let scope = SessionScope::new(SCOPE, config)?;
    scope
        .run("signup_then_validate", signup_then_validate(&scope, catalog, context))
        .await;
    scope
        .run("authenticated_derivation_idempotent", derivation_idempotent(&scope, catalog))
        .await;
    scope
        .run("book_then_cancel_twice", book_then_cancel_twice(&scope, catalog))
        .await;
    scope
        .run("waiter_booking_then_cancel", waiter_booking_then_cancel(&scope, catalog))
        .await;
    scope
        .run("resolver_deterministic", resolver_deterministic(&scope))
        .await;
    scope
        .run("password_rotation", password_rotation(&scope, catalog))
        .await;
    Ok(scope.finish())
}

/// Sign up a fresh identity and validate the returned token.
pub async fn signup_then_validate(
    scope: &SessionScope,
    catalog: &FixtureCatalog,
    context: &FixtureContext,
) -> HarnessResult<()> {
    let body = signup_body(context, "scenario");
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let signup = FixtureRecord::valid(
        "scenario.signup",
        Resource::Auth,
        RequestTemplate::post("/auth/signup").json(body),
        signup_contract(),
    );
    let observed = execute(scope, &signup).await?;
    let credential = Credential::from_response_body(email, &observed.body_text).ok_or_else(|| {
        HarnessError::from(
            ContractViolation::new(SubCheck::Schema, "signup response carries no token")
                .with_context(observed.context()),
        )
    })?;

    let mut validate = required(catalog, "auth.validate.valid")?;
    validate.request = validate
        .request
        .with_auth(AuthMode::Bearer(credential.expose_token().to_string()));
    execute(scope, &validate).await?;
    info!(email = credential.email(), "fresh identity validated");
    Ok(())
}

/// Derive two authenticated clients and reach the profile with both.
pub async fn derivation_idempotent(
    scope: &SessionScope,
    catalog: &FixtureCatalog,
) -> HarnessResult<()> {
    let profile = required(catalog, "profile.view.valid")?;
    let contract = &profile.contract;
    let mut emails = Vec::with_capacity(2);
    for _ in 0..2 {
        let client = scope.anonymous().authenticate(scope.credentials()).await?;
        let observed = client
            .send(HttpMethod::Get, "/users/profile", &Payload::Empty)
            .await?;
        verify(contract, &observed)
            .map_err(|v| v.with_context(format!("{} [scenario]", observed.context())))?;
        emails.push(observed.body.and_then(|b| b.get("email").cloned()).unwrap_or(Value::Null));
    }
    if emails[0] != emails[1] {
        return Err(HarnessError::violation(
            SubCheck::Schema,
            format!("derived clients see different profiles: {} and {}", emails[0], emails[1]),
        ));
    }
    Ok(())
}

/// Book a table, cancel the created reservation and cancel it again.
pub async fn book_then_cancel_twice(
    scope: &SessionScope,
    catalog: &FixtureCatalog,
) -> HarnessResult<()> {
    let bindings = book(scope, catalog, "bookings.client.valid").await?;
    execute_with(scope, &required(catalog, "reservations.cancel.created")?, &bindings).await?;
    execute_with(scope, &required(catalog, "reservations.cancel.repeat")?, &bindings).await?;
    Ok(())
}

/// Book a table on behalf of a customer and cancel it.
pub async fn waiter_booking_then_cancel(
    scope: &SessionScope,
    catalog: &FixtureCatalog,
) -> HarnessResult<()> {
    let bindings = book(scope, catalog, "bookings.waiter.valid").await?;
    execute_with(scope, &required(catalog, "reservations.cancel.created")?, &bindings).await?;
    Ok(())
}

/// Run a booking fixture and bind the created reservation id.
async fn book(
    scope: &SessionScope,
    catalog: &FixtureCatalog,
    name: &str,
) -> HarnessResult<HashMap<String, String>> {
    let booked = execute(scope, &required(catalog, name)?).await?;
    let id = booked
        .body
        .as_ref()
        .and_then(|b| b.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            HarnessError::violation(SubCheck::Schema, "booking response carries no id")
        })?;
    Ok(HashMap::from([(CREATED_RESERVATION.to_string(), id)]))
}

/// Two fresh resolutions of every seed kind agree.
pub async fn resolver_deterministic(scope: &SessionScope) -> HarnessResult<()> {
    for kind in SeedKind::ALL {
        let client = if kind.requires_auth() {
            scope.authenticated().await?
        } else {
            scope.anonymous()
        };
        let first = scope.resolver().resolve_fresh(kind, client).await?;
        let second = scope.resolver().resolve_fresh(kind, client).await?;
        if first != second {
            return Err(HarnessError::violation(
                SubCheck::Schema,
                format!("GET {} is not stable: {first} then {second}", kind.listing()),
            ));
        }
    }
    Ok(())
}

/// Rotate the test user's password and restore it.
pub async fn password_rotation(
    scope: &SessionScope,
    catalog: &FixtureCatalog,
) -> HarnessResult<()> {
    let bindings = HashMap::from([(ROTATED_PASSWORD.to_string(), random_password(12))]);
    execute_with(scope, &required(catalog, "profile.password.rotate")?, &bindings).await?;
    let restore = required(catalog, "profile.password.restore")?;
    let restored = execute_with(scope, &restore, &bindings).await;
    if let Err(err) = &restored {
        warn!(email = %scope.credentials().email, error = %err, "password left rotated");
    }
    restored.map(drop)
}

fn required(catalog: &FixtureCatalog, name: &str) -> HarnessResult<FixtureRecord> {
    catalog
        .require(name)
        .cloned()
        .map_err(|e| HarnessError::config(e.to_string()))
}
