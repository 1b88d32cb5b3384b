//! Anonymous usage beacon
//!
//! One best-effort GET per run. Its outcome never reaches the main flow.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

const COLLECTOR_URL: &str = "https://collector.stitchdata.com/i";
const BEACON_TIMEOUT: Duration = Duration::from_secs(10);

/// Send the beacon on a background task
pub fn spawn_usage_beacon() -> JoinHandle<()> {
    info!(
        "Sending version information to stitchdata.com. To disable sending anonymous usage data, \
         set the config parameter \"disable_collection\" to true"
    );

    tokio::spawn(async {
        match send_usage_stats(COLLECTOR_URL, env!("CARGO_PKG_VERSION")).await {
            Ok(status) => debug!(status, "Usage beacon sent"),
            Err(e) => debug!(error = %e, "Usage beacon failed"),
        }
    })
}

async fn send_usage_stats(url: &str, version: &str) -> Result<u16, reqwest::Error> {
    let client = reqwest::Client::builder().timeout(BEACON_TIMEOUT).build()?;
    let response = client
        .get(url)
        .query(&[
            ("e", "se"),
            ("aid", "singer"),
            ("se_ca", "target-magentobi"),
            ("se_ac", "open"),
            ("se_la", version),
        ])
        .send()
        .await?;

    Ok(response.status().as_u16())
}
