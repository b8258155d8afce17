//! In-process rendition of the Restaurant API.
//!
//! [`MockRestaurantApi`] mounts every documented endpoint on a `wiremock`
//! server and enforces the documented validation rules, bearer-token checks
//! and seed data. It lets the complete suite run without a deployed backend.

mod routes;
mod state;

use harness_common::{HarnessConfig, HarnessResult, TestCredentials};
use std::sync::Arc;
use wiremock::MockServer;

pub use state::{DISH_ID, LOCATION_ID, MAX_BODY_BYTES, MockState, RESERVATION_ID};

/// Startup options of the mock API.
#[derive(Debug, Clone)]
pub struct MockOptions {
    /// Pre-provisioned user
    pub credentials: TestCredentials,
    /// Whether locations, dishes and a reservation exist
    pub seeded: bool,
    /// Answer every signin with a 500
    pub broken_signin: bool,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            credentials: TestCredentials::default(),
            seeded: true,
            broken_signin: false,
        }
    }
}

impl MockOptions {
    /// Set the pre-provisioned user.
    #[must_use]
    pub fn with_credentials(mut self, credentials: TestCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Start without seed data.
    #[must_use]
    pub const fn unseeded(mut self) -> Self {
        self.seeded = false;
        self
    }

    /// Fail every signin.
    #[must_use]
    pub const fn with_broken_signin(mut self) -> Self {
        self.broken_signin = true;
        self
    }
}

/// A running mock Restaurant API.
pub struct MockRestaurantApi {
    server: MockServer,
    state: Arc<MockState>,
    credentials: TestCredentials,
}

impl MockRestaurantApi {
    /// Start a seeded mock with the default test user.
    pub async fn start() -> Self {
        Self::start_with(MockOptions::default()).await
    }

    /// Start a mock with explicit options.
    pub async fn start_with(options: MockOptions) -> Self {
        let server = MockServer::start().await;
        let state = Arc::new(MockState::new(
            &options.credentials,
            options.seeded,
            options.broken_signin,
        ));
        routes::mount_all(&server, &state).await;
        tracing::debug!(
            uri = %server.uri(),
            seeded = options.seeded,
            "mock restaurant API started"
        );
        Self {
            server,
            state,
            credentials: options.credentials,
        }
    }

    /// Base URL of the mock.
    #[must_use]
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Harness configuration pointing at the mock.
    ///
    /// # Errors
    ///
    /// Returns an error if the server URI does not parse.
    pub fn config(&self) -> HarnessResult<HarnessConfig> {
        Ok(HarnessConfig::for_base_url(&self.uri())?.with_credentials(self.credentials.clone()))
    }

    /// Credentials of the pre-provisioned user.
    #[must_use]
    pub const fn credentials(&self) -> &TestCredentials {
        &self.credentials
    }

    /// Server-side state, for assertions.
    #[must_use]
    pub fn state(&self) -> &MockState {
        &self.state
    }

    /// Number of requests the mock has received.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }
}
