//! Resource ID resolution from listing endpoints.
//!
//! Tests that need an existing location, dish or reservation ask the
//! resolver instead of hardcoding an id. The first element of the listing is
//! selected, so repeated resolutions against a stable listing agree.

use crate::client::ApiClient;
use harness_common::{EnvironmentError, HarnessError, HarnessResult};
use restaurant_fixtures::{HttpMethod, Payload, SeedKind};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, instrument};

/// Resolves seed ids and caches them for the lifetime of a scope.
#[derive(Debug, Default)]
pub struct ResourceResolver {
    cache: Mutex<HashMap<SeedKind, String>>,
}

impl ResourceResolver {
    /// Create an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve an id, reusing an earlier resolution.
    ///
    /// # Errors
    ///
    /// See [`ResourceResolver::resolve_fresh`].
    pub async fn resolve(&self, kind: SeedKind, client: &ApiClient) -> HarnessResult<String> {
        if let Some(id) = self.cached(kind) {
            return Ok(id);
        }
        let id = self.resolve_fresh(kind, client).await?;
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, id.clone());
        Ok(id)
    }

    /// Query the listing again, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::NoSeedData`] for an empty listing,
    /// [`EnvironmentError::SeedListingFailed`] if the listing does not answer
    /// with success and [`EnvironmentError::InvalidSeedData`] if its first
    /// element has no usable id.
    #[instrument(skip(self, client))]
    pub async fn resolve_fresh(&self, kind: SeedKind, client: &ApiClient) -> HarnessResult<String> {
        let listing = format!("GET {}", kind.listing());
        let observed = client
            .send(HttpMethod::Get, kind.listing(), &Payload::Empty)
            .await
            .map_err(|err| match err {
                HarnessError::Environment(_) => err,
                other => EnvironmentError::SeedListingFailed {
                    listing: listing.clone(),
                    reason: other.to_string(),
                }
                .into(),
            })?;

        if !observed.is_success() {
            return Err(EnvironmentError::SeedListingFailed {
                listing,
                reason: format!("status {}", observed.status),
            }
            .into());
        }
        let body = observed.body.ok_or_else(|| EnvironmentError::InvalidSeedData {
            listing: listing.clone(),
            reason: "body is not JSON".to_string(),
        })?;

        let id = first_id(&body).map_err(|reason| match reason {
            SelectError::Empty => EnvironmentError::NoSeedData {
                listing: listing.clone(),
            },
            SelectError::Invalid(reason) => EnvironmentError::InvalidSeedData {
                listing: listing.clone(),
                reason,
            },
        })?;
        debug!(%id, "seed id resolved");
        Ok(id)
    }

    fn cached(&self, kind: SeedKind) -> Option<String> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SelectError {
    Empty,
    Invalid(String),
}

/// Select the `id` of the first element of a bare array or a paginated
/// `content` array.
fn first_id(body: &Value) -> Result<String, SelectError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("content") {
            Some(Value::Array(items)) => items,
            _ => return Err(SelectError::Invalid("listing is not an array".to_string())),
        },
        _ => return Err(SelectError::Invalid("listing is not an array".to_string())),
    };
    let first = items.first().ok_or(SelectError::Empty)?;
    match first.get("id") {
        Some(Value::String(id)) if is_path_safe(id) => Ok(id.clone()),
        Some(Value::String(id)) => Err(SelectError::Invalid(format!(
            "id `{id}` cannot be used in a path"
        ))),
        Some(_) => Err(SelectError::Invalid("id is not a string".to_string())),
        None => Err(SelectError::Invalid("first element has no id".to_string())),
    }
}

fn is_path_safe(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use harness_common::{HarnessConfig, RetryConfig};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ApiClient {
        let config = HarnessConfig::for_base_url(&server.uri())
            .unwrap()
            .with_retry(RetryConfig::default().with_initial_delay(Duration::from_millis(10)));
        ApiClient::new(&config).unwrap()
    }

    async fn listing(server: &MockServer, at: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[test]
    fn test_first_id_shapes() {
        assert_eq!(first_id(&json!([{"id": "a1"}, {"id": "b2"}])), Ok("a1".to_string()));
        assert_eq!(first_id(&json!({"content": [{"id": "c3"}]})), Ok("c3".to_string()));
        assert_eq!(first_id(&json!([])), Err(SelectError::Empty));
        assert_eq!(first_id(&json!({"content": []})), Err(SelectError::Empty));
        assert!(matches!(first_id(&json!([{"name": "x"}])), Err(SelectError::Invalid(_))));
        assert!(matches!(first_id(&json!([{"id": 7}])), Err(SelectError::Invalid(_))));
        assert!(matches!(first_id(&json!([{"id": "../admin"}])), Err(SelectError::Invalid(_))));
        assert!(matches!(first_id(&json!({"items": []})), Err(SelectError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_resolve_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/locations"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"id": "672846d5c951184d705b65d7"}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let resolver = ResourceResolver::new();
        let first = resolver.resolve(SeedKind::Location, &client).await.unwrap();
        let second = resolver.resolve(SeedKind::Location, &client).await.unwrap();
        assert_eq!(first, "672846d5c951184d705b65d7");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_empty_listing_is_no_seed_data() {
        let server = MockServer::start().await;
        listing(&server, "/dishes", json!([])).await;

        let client = client_for(&server);
        let err = ResourceResolver::new()
            .resolve(SeedKind::Dish, &client)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            HarnessError::Environment(EnvironmentError::NoSeedData {
                listing: "GET /dishes".to_string()
            })
        );
        assert!(err.is_fail_fast());
    }

    #[tokio::test]
    async fn test_failed_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reservations"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = ResourceResolver::new()
            .resolve_fresh(SeedKind::Reservation, &client)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HarnessError::Environment(EnvironmentError::SeedListingFailed { .. })
        ));
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_unusable_listing() {
        let server = MockServer::start().await;
        listing(&server, "/locations", json!([{"address": "48 Rustaveli Avenue"}])).await;

        let client = client_for(&server);
        let err = ResourceResolver::new()
            .resolve(SeedKind::Location, &client)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HarnessError::Environment(EnvironmentError::InvalidSeedData { .. })
        ));
    }
}
