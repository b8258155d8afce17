//! Property-based tests for the restaurant contract library.
//!
//! Tests validate:
//! - Property 1: Status check precedes every other sub-check
//! - Property 2: Server errors never satisfy a contract that does not admit them
//! - Property 3: Forbidden fields are found at any depth
//! - Property 4: Injected payloads are never accepted in error bodies
//! - Property 5: Report exit code reflects the worst failure kind

use harness_common::{EnvironmentError, HarnessError, SubCheck, TransportError};
use proptest::prelude::*;
use restaurant_contract::{
    CaseOutcome, CollectionSpec, ErrorShape, ExpectedContract, FieldSpec, ObservedResponse,
    SuiteReport, verify,
};
use serde_json::{Value, json};

// Strategy for generating JSON field names
fn field_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z]{2,12}"
}

// Strategy for generating injection payloads
fn injection_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("<script>alert(1)</script>".to_string()),
        Just("<img src=x onerror=alert(1)>".to_string()),
        Just("' OR '1'='1".to_string()),
        Just("'; DROP TABLE users; --".to_string()),
        "<svg onload=[a-z]{3,8}>",
    ]
}

fn observed(status: u16, body: &Value) -> ObservedResponse {
    ObservedResponse::new(
        "POST",
        "/auth/signup",
        status,
        [("content-type".to_string(), "application/json".to_string())],
        body.to_string(),
    )
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Pass,
    Violation,
    Transport,
    Setup,
}

fn outcome_strategy() -> impl Strategy<Value = Outcome> {
    prop_oneof![
        Just(Outcome::Pass),
        Just(Outcome::Violation),
        Just(Outcome::Transport),
        Just(Outcome::Setup),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 1: Status check precedes every other sub-check**
    /// *For any* response whose status is not admitted, the reported
    /// sub-check SHALL be the status check, whatever the body contains.
    #[test]
    fn prop_status_reported_first(
        status in 100u16..600,
        field in field_name_strategy(),
    ) {
        prop_assume!(status != 201);
        let contract = ExpectedContract::created()
            .with_json_content()
            .with_field(FieldSpec::text(&field))
            .forbid("password");
        let body = json!({"password": "leaked"});

        let err = verify(&contract, &observed(status, &body)).unwrap_err();
        prop_assert_eq!(err.check, SubCheck::Status);
    }

    /// **Property 2: Server errors never satisfy a contract that does not admit them**
    #[test]
    fn prop_server_errors_rejected(
        status in 500u16..600,
        admitted in prop::collection::vec(200u16..500, 1..5),
    ) {
        let contract = ExpectedContract::any_of(&admitted);
        let result = verify(&contract, &observed(status, &json!({"message": "boom"})));
        prop_assert!(result.is_err());
    }

    /// **Property 3: Forbidden fields are found at any depth**
    #[test]
    fn prop_forbidden_field_at_any_depth(
        path in prop::collection::vec(field_name_strategy(), 0..4),
    ) {
        let mut body = json!({"password": "$2b$12$abcdefghijklmnopqrstuv"});
        for segment in path.iter().rev() {
            body = json!({ segment.clone(): body });
        }
        let contract = ExpectedContract::ok().forbid("password");
        let mut response = observed(200, &body);
        response.method = "GET".to_string();

        let err = verify(&contract, &response).unwrap_err();
        prop_assert_eq!(err.check, SubCheck::ForbiddenField);
    }

    /// **Property 4: Injected payloads are never accepted in error bodies**
    #[test]
    fn prop_reflection_in_errors_rejected(
        payload in injection_strategy(),
        status in 400u16..500,
    ) {
        let contract = ExpectedContract::any_of(&[status])
            .with_error(ErrorShape::default())
            .no_reflection_of(&payload);
        let body = json!({"message": format!("invalid value: {payload}")});

        let err = verify(&contract, &observed(status, &body)).unwrap_err();
        prop_assert_eq!(err.check, SubCheck::Reflection);
    }

    /// Property: collection items are validated individually
    #[test]
    fn prop_collection_reports_first_bad_item(
        good in 0usize..5,
        field in field_name_strategy(),
    ) {
        let mut items: Vec<Value> = (0..good)
            .map(|i| json!({ field.clone(): format!("v{i}") }))
            .collect();
        items.push(json!({}));
        let contract = ExpectedContract::ok()
            .with_collection(CollectionSpec::of([FieldSpec::text(&field)]));

        let err = verify(&contract, &observed(200, &Value::Array(items))).unwrap_err();
        prop_assert_eq!(err.check, SubCheck::Schema);
        let expected_path = format!("`[{good}].{field}`");
        prop_assert!(err.detail.contains(&expected_path));
    }

    /// **Property 5: Report exit code reflects the worst failure kind**
    #[test]
    fn prop_exit_code_reflects_worst_failure(
        outcomes in prop::collection::vec(outcome_strategy(), 1..20),
    ) {
        let cases: Vec<CaseOutcome> = outcomes
            .iter()
            .enumerate()
            .map(|(i, o)| {
                let result = match o {
                    Outcome::Pass => Ok(()),
                    Outcome::Violation => {
                        Err(HarnessError::violation(SubCheck::Schema, "missing id"))
                    }
                    Outcome::Transport => Err(HarnessError::from(TransportError::Timeout {
                        url: "u".to_string(),
                    })),
                    Outcome::Setup => Err(HarnessError::from(EnvironmentError::NoSeedData {
                        listing: "l".to_string(),
                    })),
                };
                CaseOutcome::from_result(format!("case.{i}"), "scope", &result)
            })
            .collect();
        let report = SuiteReport::from_outcomes(cases);

        let expected = if outcomes.iter().any(|o| matches!(o, Outcome::Setup)) {
            2
        } else if outcomes.iter().all(|o| matches!(o, Outcome::Pass)) {
            0
        } else {
            1
        };
        prop_assert_eq!(report.exit_code(), expected);
        prop_assert_eq!(report.outcomes.len(), outcomes.len());
    }
}

#[test]
fn test_signup_example_contract() {
    let contract = ExpectedContract::created()
        .with_field(FieldSpec::new("token", restaurant_contract::FieldType::Jwt).or("accessToken"))
        .forbid("password");
    assert!(contract.validate().is_ok());

    let body = json!({"token": "eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiJhIn0.c2ln"});
    assert!(verify(&contract, &observed(201, &body)).is_ok());
}

#[test]
fn test_missing_email_example_contract() {
    let contract = ExpectedContract::validation_error("email");
    let body = json!({
        "code": "VALIDATION_ERROR",
        "message": "Email is required",
        "field": "email",
    });
    assert!(verify(&contract, &observed(400, &body)).is_ok());
}
