//! Scoped acquisition of clients and per-case outcome recording.

use crate::client::ApiClient;
use crate::resolver::ResourceResolver;
use harness_common::{HarnessConfig, HarnessResult, TestCredentials};
use restaurant_contract::{CaseOutcome, Verdict};
use restaurant_fixtures::SeedKind;
use std::sync::{Mutex, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Clients, seed ids and outcomes of one test scope.
///
/// The anonymous client is built when the scope opens; the authenticated
/// client is derived on first use and at most once. Connection pools are
/// released when the scope is dropped, whatever the outcome of its cases.
/// After the first setup failure the remaining cases of the scope are not
/// run and are recorded as aborted.
pub struct SessionScope {
    name: String,
    credentials: TestCredentials,
    anonymous: ApiClient,
    authenticated: OnceCell<ApiClient>,
    resolver: ResourceResolver,
    outcomes: Mutex<Vec<CaseOutcome>>,
    abort_cause: Mutex<Option<String>>,
}

impl SessionScope {
    /// Open a scope.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(name: impl Into<String>, config: &HarnessConfig) -> HarnessResult<Self> {
        let name = name.into();
        let anonymous = ApiClient::new(config)?;
        debug!(scope = %name, base_url = %config.base_url, "session scope opened");
        Ok(Self {
            name,
            credentials: config.credentials.clone(),
            anonymous,
            authenticated: OnceCell::new(),
            resolver: ResourceResolver::new(),
            outcomes: Mutex::new(Vec::new()),
            abort_cause: Mutex::new(None),
        })
    }

    /// Scope name used in reports.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Credentials the authenticated client signs in with.
    #[must_use]
    pub const fn credentials(&self) -> &TestCredentials {
        &self.credentials
    }

    /// The anonymous client.
    #[must_use]
    pub const fn anonymous(&self) -> &ApiClient {
        &self.anonymous
    }

    /// The authenticated client, signing in on first use.
    ///
    /// # Errors
    ///
    /// Returns the signin failure; a later call retries the signin.
    pub async fn authenticated(&self) -> HarnessResult<&ApiClient> {
        self.authenticated
            .get_or_try_init(|| self.anonymous.authenticate(&self.credentials))
            .await
    }

    /// Resolver of this scope.
    #[must_use]
    pub const fn resolver(&self) -> &ResourceResolver {
        &self.resolver
    }

    /// Resolve a seed id with the client its listing requires.
    ///
    /// # Errors
    ///
    /// Returns a setup error if the listing is unusable or signin fails.
    pub async fn seed(&self, kind: SeedKind) -> HarnessResult<String> {
        let client = if kind.requires_auth() {
            self.authenticated().await?
        } else {
            &self.anonymous
        };
        self.resolver.resolve(kind, client).await
    }

    /// Cause of the setup failure that aborted this scope.
    #[must_use]
    pub fn abort_cause(&self) -> Option<String> {
        self.abort_cause
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run a case and record its outcome.
    ///
    /// The case is not polled if the scope was already aborted.
    pub async fn run<F>(&self, name: impl Into<String>, case: F) -> Verdict
    where
        F: Future<Output = HarnessResult<()>>,
    {
        let name = name.into();
        let outcome = if let Some(cause) = self.abort_cause() {
            CaseOutcome::aborted(name, &self.name, cause)
        } else {
            let result = case.await;
            if let Err(err) = &result {
                if err.is_fail_fast() {
                    warn!(
                        scope = %self.name,
                        case = %name,
                        error = %err,
                        "setup failure, aborting scope"
                    );
                    *self.abort_cause.lock().unwrap_or_else(PoisonError::into_inner) =
                        Some(err.to_string());
                } else {
                    debug!(scope = %self.name, case = %name, error = %err, "case failed");
                }
            }
            CaseOutcome::from_result(name, &self.name, &result)
        };

        let verdict = outcome.verdict.clone();
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(outcome);
        verdict
    }

    /// Outcomes recorded so far, releasing the scope.
    #[must_use]
    pub fn finish(mut self) -> Vec<CaseOutcome> {
        std::mem::take(self.outcomes.get_mut().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Drop for SessionScope {
    fn drop(&mut self) {
        let cases = self
            .outcomes
            .get_mut()
            .map_or(0, |outcomes| outcomes.len());
        info!(
            scope = %self.name,
            authenticated = self.authenticated.initialized(),
            cases,
            "session scope released"
        );
    }
}
