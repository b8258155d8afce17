//! Contract suite runner for the Restaurant API.
//!
//! Runs every independent fixture of the catalog in one scope per resource
//! category, then the sequenced scenarios, and collects a [`SuiteReport`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod scenarios;

use harness_common::{HarnessConfig, HarnessError, HarnessResult};
use restaurant_contract::{CaseOutcome, SuiteReport};
use restaurant_fixtures::{CatalogError, FixtureCatalog, FixtureContext, Resource};
use restaurant_harness::{SessionScope, execute};
use std::sync::Arc;
use tracing::{info, instrument};

/// Run the complete suite.
///
/// With `config.parallel` every resource scope runs in its own task with its
/// own clients and credential; otherwise scopes run one after another. The
/// scenarios always run last, on their own.
///
/// # Errors
///
/// Returns a configuration error if the catalog is inconsistent or a client
/// cannot be built. Failures of the system under test are recorded in the
/// report instead.
pub async fn run_suite(config: &HarnessConfig) -> HarnessResult<SuiteReport> {
    let context = FixtureContext::new(config.credentials.clone()).map_err(catalog_error)?;
    let catalog = Arc::new(FixtureCatalog::standard(&context).map_err(catalog_error)?);
    info!(
        fixtures = catalog.len(),
        base_url = %config.base_url,
        parallel = config.parallel,
        "fixture catalog built"
    );

    let mut outcomes = Vec::with_capacity(catalog.len());
    if config.parallel {
        let handles: Vec<_> = Resource::ALL
            .into_iter()
            .map(|resource| {
                let config = config.clone();
                let catalog = Arc::clone(&catalog);
                tokio::spawn(async move { run_resource(&config, &catalog, resource).await })
            })
            .collect();
        for handle in handles {
            let scope_outcomes = handle
                .await
                .map_err(|e| HarnessError::config(format!("scope task failed: {e}")))??;
            outcomes.extend(scope_outcomes);
        }
    } else {
        for resource in Resource::ALL {
            outcomes.extend(run_resource(config, &catalog, resource).await?);
        }
    }
    outcomes.extend(scenarios::run(config, &catalog, &context).await?);

    let report = SuiteReport::from_outcomes(outcomes);
    info!(
        passed = report.passed,
        failed = report.failed,
        transport_failures = report.transport_failures,
        setup_failures = report.setup_failures,
        aborted = report.aborted,
        "suite finished"
    );
    Ok(report)
}

/// Run the independent fixtures of one resource category in a fresh scope.
///
/// # Errors
///
/// Returns a configuration error if the scope cannot be opened.
#[instrument(skip(config, catalog))]
pub async fn run_resource(
    config: &HarnessConfig,
    catalog: &FixtureCatalog,
    resource: Resource,
) -> HarnessResult<Vec<CaseOutcome>> {
    let scope = SessionScope::new(resource.as_str(), config)?;
    for record in catalog.independent(resource) {
        scope
            .run(record.name.clone(), async { execute(&scope, record).await.map(drop) })
            .await;
    }
    Ok(scope.finish())
}

fn catalog_error(err: CatalogError) -> HarnessError {
    HarnessError::config(err.to_string())
}
