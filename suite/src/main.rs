use anyhow::Context;
use harness_common::{HarnessConfig, init_tracing};
use restaurant_api_suite::run_suite;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = HarnessConfig::from_env().context("invalid suite configuration")?;
    init_tracing(&config.tracing);

    info!(base_url = %config.base_url, "Starting Restaurant API contract suite");

    let report = match run_suite(&config).await {
        Ok(report) => report,
        Err(err) => {
            error!(error = %err, "suite could not start");
            eprintln!("setup error: {err}");
            std::process::exit(2);
        }
    };

    println!("{report}");
    std::process::exit(report.exit_code());
}
