//! Fixture catalog types.
//!
//! A [`FixtureRecord`] pairs a request template with the contract its
//! response must satisfy. The [`FixtureCatalog`] checks every record for
//! internal consistency when it is built, so a contradictory fixture fails
//! at collection time instead of producing a misleading test result.

use harness_common::TestCredentials;
use restaurant_contract::{DefinitionError, ExpectedContract};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;
use url::form_urlencoded;

use crate::definitions;
use crate::generators;

/// Resource category of a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// `/health` and `/`
    Health,
    /// `/auth/*`
    Auth,
    /// `/dishes/*`
    Dishes,
    /// `/locations/*`
    Locations,
    /// `/bookings/*`
    Bookings,
    /// `/reservations/*`
    Reservations,
    /// `/cart`
    Cart,
    /// `/users/profile/*`
    Profile,
    /// `/feedbacks/*`
    Feedback,
    /// `/reports`
    Reports,
}

impl Resource {
    /// Every resource category in run order.
    pub const ALL: [Self; 10] = [
        Self::Health,
        Self::Auth,
        Self::Dishes,
        Self::Locations,
        Self::Bookings,
        Self::Reservations,
        Self::Cart,
        Self::Profile,
        Self::Feedback,
        Self::Reports,
    ];

    /// Name used for scopes and reports.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Auth => "auth",
            Self::Dishes => "dishes",
            Self::Locations => "locations",
            Self::Bookings => "bookings",
            Self::Reservations => "reservations",
            Self::Cart => "cart",
            Self::Profile => "profile",
            Self::Feedback => "feedback",
            Self::Reports => "reports",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy class of a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyClass {
    /// Satisfies every validation rule
    Valid,
    /// Violates exactly one validation rule
    InvalidShape,
    /// Injection, oversized or token-tampering probe
    Adversarial,
}

/// Kind of validation rule an invalid-shape fixture violates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Required field absent
    MissingField,
    /// Field of the wrong JSON type
    WrongType,
    /// String too short or too long
    Length,
    /// Empty string
    Empty,
    /// Date not in `YYYY-MM-DD`
    MalformedDate,
    /// Time not in `HH:MM`
    MalformedTime,
    /// Email without a valid address form
    MalformedEmail,
    /// Number outside its allowed range
    OutOfRange,
    /// Value outside an enumeration
    InvalidChoice,
    /// Unique value already taken
    Duplicate,
    /// Id of a resource that does not exist
    UnknownReference,
}

/// The single rule an invalid-shape fixture violates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRule {
    /// Offending request field
    pub field: String,
    /// Rule kind
    pub kind: RuleKind,
}

impl ValidationRule {
    /// Create a rule.
    #[must_use]
    pub fn new(field: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }
}

/// Kind of adversarial probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    /// SQL injection string
    SqlInjection,
    /// Script or markup injection
    ScriptInjection,
    /// Payload far above documented limits
    Oversized,
    /// Body that is not valid JSON
    MalformedJson,
    /// Valid token with a modified payload
    TamperedToken,
    /// Token signed with a foreign key
    ForgedToken,
    /// Value that is not a token at all
    MalformedToken,
    /// Protected endpoint without a token
    MissingToken,
    /// Wrong credentials
    CredentialGuess,
}

impl ProbeKind {
    /// Check if the probe targets the bearer token.
    #[must_use]
    pub const fn is_token_probe(&self) -> bool {
        matches!(
            self,
            Self::TamperedToken | Self::ForgedToken | Self::MalformedToken | Self::MissingToken
        )
    }
}

/// A pre-existing resource a fixture refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedKind {
    /// A restaurant location
    Location,
    /// A dish
    Dish,
    /// A reservation of the test user
    Reservation,
}

impl SeedKind {
    /// Every seed kind.
    pub const ALL: [Self; 3] = [Self::Location, Self::Dish, Self::Reservation];

    /// Placeholder name used in templates.
    #[must_use]
    pub const fn placeholder(&self) -> &'static str {
        match self {
            Self::Location => "location_id",
            Self::Dish => "dish_id",
            Self::Reservation => "reservation_id",
        }
    }

    /// Listing the seed id is resolved from.
    #[must_use]
    pub const fn listing(&self) -> &'static str {
        match self {
            Self::Location => "/locations",
            Self::Dish => "/dishes",
            Self::Reservation => "/reservations",
        }
    }

    /// Check if the listing needs the authenticated client.
    #[must_use]
    pub const fn requires_auth(&self) -> bool {
        matches!(self, Self::Reservation)
    }

    fn from_placeholder(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.placeholder() == name)
    }
}

/// HTTP method of a request template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Method name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which client sends a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthMode {
    /// No authorization header
    Anonymous,
    /// The scope's authenticated client
    Authenticated,
    /// The scope's credential with a modified payload segment
    TamperedCredential,
    /// An explicit bearer value
    Bearer(String),
}

/// Request body of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// No body
    Empty,
    /// JSON body
    Json(Value),
    /// Raw body sent as-is with a JSON content type
    Raw(String),
}

/// A request with optional `{placeholder}` tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTemplate {
    /// Method
    pub method: HttpMethod,
    /// Path relative to the base URL
    pub path: String,
    /// Query parameters in order
    pub query: Vec<(String, String)>,
    /// Client selection
    pub auth: AuthMode,
    /// Body
    pub payload: Payload,
}

impl RequestTemplate {
    /// Create a template.
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            auth: AuthMode::Anonymous,
            payload: Payload::Empty,
        }
    }

    /// GET template.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// POST template.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// PUT template.
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    /// DELETE template.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Add a query parameter.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Send through the authenticated client.
    #[must_use]
    pub fn authenticated(self) -> Self {
        self.with_auth(AuthMode::Authenticated)
    }

    /// Select the client.
    #[must_use]
    pub fn with_auth(mut self, auth: AuthMode) -> Self {
        self.auth = auth;
        self
    }

    /// JSON body.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.payload = Payload::Json(body);
        self
    }

    /// Raw body.
    #[must_use]
    pub fn raw(mut self, body: impl Into<String>) -> Self {
        self.payload = Payload::Raw(body.into());
        self
    }

    /// Path with the encoded query string.
    #[must_use]
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("{}?{query}", self.path)
    }

    /// Every `{name}` placeholder in path, query and payload.
    #[must_use]
    pub fn placeholders(&self) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        collect_placeholders(&self.path, &mut found);
        for (_, value) in &self.query {
            collect_placeholders(value, &mut found);
        }
        match &self.payload {
            Payload::Empty => {}
            Payload::Raw(raw) => collect_placeholders(raw, &mut found),
            Payload::Json(body) => {
                visit_strings(body, &mut |s| collect_placeholders(s, &mut found));
            }
        }
        found
    }

    /// Seed ids the template refers to.
    #[must_use]
    pub fn seeds(&self) -> BTreeSet<SeedKind> {
        self.placeholders()
            .iter()
            .filter_map(|p| SeedKind::from_placeholder(p))
            .collect()
    }

    /// Substitute placeholders; unknown placeholders are left untouched.
    #[must_use]
    pub fn bind(&self, bindings: &HashMap<String, String>) -> Self {
        let payload = match &self.payload {
            Payload::Empty => Payload::Empty,
            Payload::Raw(raw) => Payload::Raw(substitute(raw, bindings)),
            Payload::Json(body) => Payload::Json(bind_value(body, bindings)),
        };
        Self {
            method: self.method,
            path: substitute(&self.path, bindings),
            query: self
                .query
                .iter()
                .map(|(k, v)| (k.clone(), substitute(v, bindings)))
                .collect(),
            auth: self.auth.clone(),
            payload,
        }
    }
}

fn collect_placeholders(text: &str, found: &mut BTreeSet<String>) {
    let mut rest = text;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) if is_placeholder_name(&after[..end]) => {
                found.insert(after[..end].to_string());
                rest = &after[end + 1..];
            }
            _ => rest = after,
        }
    }
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_lowercase() || c == '_')
}

fn substitute(text: &str, bindings: &HashMap<String, String>) -> String {
    bindings.iter().fold(text.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{name}}}"), value)
    })
}

fn bind_value(value: &Value, bindings: &HashMap<String, String>) -> Value {
    match value {
        Value::String(s) => Value::String(substitute(s, bindings)),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| bind_value(v, bindings)).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), bind_value(v, bindings)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn visit_strings(value: &Value, f: &mut impl FnMut(&str)) {
    match value {
        Value::String(s) => f(s),
        Value::Array(items) => items.iter().for_each(|v| visit_strings(v, f)),
        Value::Object(map) => map.values().for_each(|v| visit_strings(v, f)),
        _ => {}
    }
}

/// A named request paired with its expected contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureRecord {
    /// Unique name, e.g. `auth.signup.missing_email`
    pub name: String,
    /// Definition version
    pub version: u32,
    /// Resource category
    pub resource: Resource,
    /// Policy class
    pub class: PolicyClass,
    /// Request template
    pub request: RequestTemplate,
    /// Violated rule of an invalid-shape fixture
    pub violation: Option<ValidationRule>,
    /// Probe kind of an adversarial fixture
    pub probe: Option<ProbeKind>,
    /// Expected response
    pub contract: ExpectedContract,
    /// Whether the fixture runs on its own; sequenced steps run only inside scenarios
    pub independent: bool,
}

impl FixtureRecord {
    fn build(
        name: impl Into<String>,
        resource: Resource,
        class: PolicyClass,
        request: RequestTemplate,
        contract: ExpectedContract,
    ) -> Self {
        Self {
            name: name.into(),
            version: 1,
            resource,
            class,
            request,
            violation: None,
            probe: None,
            contract,
            independent: true,
        }
    }

    /// Valid fixture.
    #[must_use]
    pub fn valid(
        name: impl Into<String>,
        resource: Resource,
        request: RequestTemplate,
        contract: ExpectedContract,
    ) -> Self {
        Self::build(name, resource, PolicyClass::Valid, request, contract)
    }

    /// Invalid-shape fixture expecting a validation error naming the field.
    #[must_use]
    pub fn invalid(
        name: impl Into<String>,
        resource: Resource,
        request: RequestTemplate,
        field: &str,
        kind: RuleKind,
    ) -> Self {
        let mut record = Self::build(
            name,
            resource,
            PolicyClass::InvalidShape,
            request,
            ExpectedContract::validation_error(field),
        );
        record.violation = Some(ValidationRule::new(field, kind));
        record
    }

    /// Invalid-shape fixture for an id that does not exist.
    #[must_use]
    pub fn unknown_reference(
        name: impl Into<String>,
        resource: Resource,
        request: RequestTemplate,
        field: &str,
    ) -> Self {
        Self::invalid(name, resource, request, field, RuleKind::UnknownReference)
            .with_contract(ExpectedContract::not_found())
    }

    /// Adversarial fixture.
    #[must_use]
    pub fn adversarial(
        name: impl Into<String>,
        resource: Resource,
        request: RequestTemplate,
        probe: ProbeKind,
        contract: ExpectedContract,
    ) -> Self {
        let mut record = Self::build(name, resource, PolicyClass::Adversarial, request, contract);
        record.probe = Some(probe);
        record
    }

    /// Protected endpoint called without a token.
    #[must_use]
    pub fn missing_token(
        name: impl Into<String>,
        resource: Resource,
        request: RequestTemplate,
    ) -> Self {
        Self::adversarial(
            name,
            resource,
            request.with_auth(AuthMode::Anonymous),
            ProbeKind::MissingToken,
            ExpectedContract::unauthorized(),
        )
    }

    /// Replace the contract.
    #[must_use]
    pub fn with_contract(mut self, contract: ExpectedContract) -> Self {
        self.contract = contract;
        self
    }

    /// Mark as a sequenced step run only by scenarios.
    #[must_use]
    pub const fn sequenced(mut self) -> Self {
        self.independent = false;
        self
    }

    fn check(&self) -> Result<(), CatalogError> {
        self.contract.validate().map_err(|source| CatalogError::InvalidContract {
            name: self.name.clone(),
            source,
        })?;

        let status = &self.contract.status;
        match self.class {
            PolicyClass::Valid => {
                if self.violation.is_some() || self.probe.is_some() {
                    return Err(self.inconsistent("valid fixture declares a violation or probe"));
                }
                if !status.admits_success() {
                    return Err(self.inconsistent("valid fixture admits no 2xx status"));
                }
            }
            PolicyClass::InvalidShape => {
                let Some(rule) = &self.violation else {
                    return Err(
                        self.inconsistent("invalid-shape fixture declares no violated rule")
                    );
                };
                if self.probe.is_some() {
                    return Err(self.inconsistent("invalid-shape fixture declares a probe"));
                }
                if !status.is_client_error_only() {
                    return Err(
                        self.inconsistent("invalid-shape fixture must admit only 4xx statuses")
                    );
                }
                let mentions = self.contract.error.as_ref().and_then(|e| e.mentions.as_deref());
                let identified = mentions == Some(rule.field.as_str())
                    || (rule.kind == RuleKind::UnknownReference && status.admits(404));
                if !identified {
                    return Err(self.inconsistent(format!(
                        "error body is not required to identify field `{}`",
                        rule.field
                    )));
                }
            }
            PolicyClass::Adversarial => {
                if self.probe.is_none() {
                    return Err(self.inconsistent("adversarial fixture declares no probe"));
                }
                if self.violation.is_some() {
                    return Err(self.inconsistent("adversarial fixture declares a violated rule"));
                }
                if status.admits_server_error() {
                    return Err(self.inconsistent("adversarial fixture admits a 5xx status"));
                }
            }
        }
        Ok(())
    }

    fn inconsistent(&self, reason: impl Into<String>) -> CatalogError {
        CatalogError::Inconsistent {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }
}

/// Run-specific values fixtures are generated from.
#[derive(Debug, Clone)]
pub struct FixtureContext {
    /// Pre-provisioned test user
    pub credentials: TestCredentials,
    /// Short id unique to this run
    pub run_id: String,
    /// Password for identities created by this run
    pub signup_password: String,
    /// A future date for bookings (`YYYY-MM-DD`)
    pub booking_date: String,
    /// Token signed with a key the server does not know
    pub forged_token: String,
}

impl FixtureContext {
    /// Create a context with fresh run-specific values.
    ///
    /// # Errors
    ///
    /// Returns an error if the forged token cannot be encoded.
    pub fn new(credentials: TestCredentials) -> Result<Self, CatalogError> {
        let forged_token = generators::forged_token(&credentials.email)
            .map_err(|e| CatalogError::Generator(e.to_string()))?;
        Ok(Self {
            credentials,
            run_id: generators::run_id(),
            signup_password: generators::random_password(12),
            booking_date: generators::future_date(7),
            forged_token,
        })
    }

    /// An email address no other run uses.
    #[must_use]
    pub fn unique_email(&self, tag: &str) -> String {
        format!("{tag}.{}@example.com", self.run_id)
    }
}

/// Fixtures keyed by name.
#[derive(Debug, Clone)]
pub struct FixtureCatalog {
    records: Vec<FixtureRecord>,
    index: HashMap<String, usize>,
}

impl FixtureCatalog {
    /// Build a catalog, checking every record.
    ///
    /// # Errors
    ///
    /// Returns the first duplicate name or inconsistent record.
    pub fn new(records: Vec<FixtureRecord>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            record.check()?;
            if index.insert(record.name.clone(), i).is_some() {
                return Err(CatalogError::DuplicateName(record.name.clone()));
            }
        }
        Ok(Self { records, index })
    }

    /// The full catalog for every resource category.
    ///
    /// # Errors
    ///
    /// Returns an error if a definition is inconsistent.
    pub fn standard(context: &FixtureContext) -> Result<Self, CatalogError> {
        Self::new(definitions::all(context))
    }

    /// Fixture by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FixtureRecord> {
        self.index.get(name).map(|&i| &self.records[i])
    }

    /// Fixture by name, failing with a catalog error.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownFixture`] if no fixture has the name.
    pub fn require(&self, name: &str) -> Result<&FixtureRecord, CatalogError> {
        self.get(name)
            .ok_or_else(|| CatalogError::UnknownFixture(name.to_string()))
    }

    /// Contract of a fixture.
    #[must_use]
    pub fn contract(&self, name: &str) -> Option<&ExpectedContract> {
        self.get(name).map(|r| &r.contract)
    }

    /// Fixtures of a resource category.
    pub fn by_resource(&self, resource: Resource) -> impl Iterator<Item = &FixtureRecord> {
        self.records.iter().filter(move |r| r.resource == resource)
    }

    /// Fixtures of a policy class.
    pub fn by_class(&self, class: PolicyClass) -> impl Iterator<Item = &FixtureRecord> {
        self.records.iter().filter(move |r| r.class == class)
    }

    /// Independent fixtures of a resource category.
    pub fn independent(&self, resource: Resource) -> impl Iterator<Item = &FixtureRecord> {
        self.by_resource(resource).filter(|r| r.independent)
    }

    /// All fixtures in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &FixtureRecord> {
        self.records.iter()
    }

    /// Number of fixtures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A fixture definition is unusable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Two fixtures share a name
    #[error("duplicate fixture name `{0}`")]
    DuplicateName(String),

    /// The fixture's contract contradicts itself
    #[error("fixture `{name}` has an inconsistent contract: {source}")]
    InvalidContract {
        /// Fixture name
        name: String,
        /// Contract error
        source: DefinitionError,
    },

    /// The fixture contradicts its policy class
    #[error("fixture `{name}` is inconsistent: {reason}")]
    Inconsistent {
        /// Fixture name
        name: String,
        /// What is wrong
        reason: String,
    },

    /// No fixture has the name
    #[error("unknown fixture `{0}`")]
    UnknownFixture(String),

    /// A run-specific value could not be generated
    #[error("fixture generation failed: {0}")]
    Generator(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use restaurant_contract::{ErrorShape, FieldSpec};
    use serde_json::json;

    fn context() -> FixtureContext {
        FixtureContext::new(TestCredentials::default()).unwrap()
    }

    #[test]
    fn test_standard_catalog_is_consistent() {
        let catalog = FixtureCatalog::standard(&context()).unwrap();
        assert!(!catalog.is_empty());
        for resource in Resource::ALL {
            assert!(catalog.by_resource(resource).count() > 0, "no fixtures for {resource}");
        }
        assert!(catalog.by_class(PolicyClass::Adversarial).count() > 0);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let record = FixtureRecord::valid(
            "health.check.valid",
            Resource::Health,
            RequestTemplate::get("/health"),
            ExpectedContract::ok(),
        );
        let err = FixtureCatalog::new(vec![record.clone(), record]).unwrap_err();
        assert_eq!(err, CatalogError::DuplicateName("health.check.valid".to_string()));
    }

    #[test]
    fn test_valid_fixture_must_admit_success() {
        let record = FixtureRecord::valid(
            "dishes.detail.valid",
            Resource::Dishes,
            RequestTemplate::get("/dishes/{dish_id}"),
            ExpectedContract::not_found(),
        );
        assert!(matches!(
            FixtureCatalog::new(vec![record]),
            Err(CatalogError::Inconsistent { .. })
        ));
    }

    #[test]
    fn test_invalid_shape_must_identify_field() {
        let record = FixtureRecord::invalid(
            "auth.signup.missing_email",
            Resource::Auth,
            RequestTemplate::post("/auth/signup"),
            "email",
            RuleKind::MissingField,
        )
        .with_contract(ExpectedContract::any_of(&[400]).with_error(ErrorShape::default()));
        let err = FixtureCatalog::new(vec![record]).unwrap_err();
        assert!(err.to_string().contains("`email`"));
    }

    #[test]
    fn test_invalid_shape_rejects_success_status() {
        let record = FixtureRecord::invalid(
            "auth.signup.missing_email",
            Resource::Auth,
            RequestTemplate::post("/auth/signup"),
            "email",
            RuleKind::MissingField,
        )
        .with_contract(
            ExpectedContract::any_of(&[201, 400]).with_error(ErrorShape::mentioning("email")),
        );
        assert!(FixtureCatalog::new(vec![record]).is_err());
    }

    #[test]
    fn test_adversarial_must_not_admit_server_error() {
        let record = FixtureRecord::adversarial(
            "profile.update.script_injection",
            Resource::Profile,
            RequestTemplate::put("/users/profile").authenticated(),
            ProbeKind::ScriptInjection,
            ExpectedContract::any_of(&[200, 400, 500]),
        );
        assert!(FixtureCatalog::new(vec![record]).is_err());
    }

    #[test]
    fn test_contradictory_contract_rejected() {
        let record = FixtureRecord::valid(
            "profile.view.valid",
            Resource::Profile,
            RequestTemplate::get("/users/profile"),
            ExpectedContract::ok().with_field(FieldSpec::text("password")).forbid("password"),
        );
        assert!(matches!(
            FixtureCatalog::new(vec![record]),
            Err(CatalogError::InvalidContract { .. })
        ));
    }

    #[test]
    fn test_placeholders_and_binding() {
        let template = RequestTemplate::post("/reservations/{reservation_id}/order/{dish_id}")
            .query("note", "{rotated_password}")
            .json(json!({"items": [{"dishId": "{dish_id}"}], "count": 2}));

        let seeds = template.seeds();
        assert!(seeds.contains(&SeedKind::Dish));
        assert!(seeds.contains(&SeedKind::Reservation));
        assert!(!seeds.contains(&SeedKind::Location));
        assert!(template.placeholders().contains("rotated_password"));

        let bindings = HashMap::from([
            ("dish_id".to_string(), "d1".to_string()),
            ("reservation_id".to_string(), "r1".to_string()),
        ]);
        let bound = template.bind(&bindings);
        assert_eq!(bound.path, "/reservations/r1/order/d1");
        assert_eq!(bound.payload, Payload::Json(json!({"items": [{"dishId": "d1"}], "count": 2})));
        assert_eq!(bound.query[0].1, "{rotated_password}");
    }

    #[test]
    fn test_path_and_query_encoding() {
        let template =
            RequestTemplate::get("/dishes").query("dishType", "<script>alert('xss')</script>");
        let rendered = template.path_and_query();
        assert!(rendered.starts_with("/dishes?dishType="));
        assert!(!rendered.contains('<'));
        assert_eq!(RequestTemplate::get("/health").path_and_query(), "/health");
    }

    #[test]
    fn test_raw_payload_braces_are_not_placeholders() {
        let template = RequestTemplate::post("/auth/signup").raw(r#"{"email": "a@example.com", "#);
        assert!(template.placeholders().is_empty());
    }

    #[test]
    fn test_lookups() {
        let catalog = FixtureCatalog::standard(&context()).unwrap();
        let signup = catalog.get("auth.signup.valid").unwrap();
        assert_eq!(signup.class, PolicyClass::Valid);
        assert!(catalog.contract("auth.signup.missing_email").is_some());
        assert!(catalog.require("no.such.fixture").is_err());
        assert!(catalog.independent(Resource::Reservations).all(|r| r.independent));
        assert!(catalog.by_resource(Resource::Reservations).any(|r| !r.independent));
    }

    #[test]
    fn test_reservation_creating_fixtures_are_sequenced() {
        let catalog = FixtureCatalog::standard(&context()).unwrap();
        let creating: Vec<&FixtureRecord> = catalog
            .by_class(PolicyClass::Valid)
            .filter(|r| r.request.method == HttpMethod::Post)
            .filter(|r| r.request.path.starts_with("/bookings/"))
            .collect();
        assert_eq!(creating.len(), 2);
        assert!(creating.iter().all(|r| !r.independent));
    }
}
