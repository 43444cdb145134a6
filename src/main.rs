//! # Managed ServiceAccount Agent
//!
//! Binary entry point. See the library crate for an overview.

use anyhow::Result;
use managed_serviceaccount_agent::runtime::initialization::initialize;
use managed_serviceaccount_agent::runtime::watch_loop::run_watch_loop;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the agent runtime
    let init_result = initialize().await?;

    // Run the watch loop until shutdown
    run_watch_loop(
        init_result.declarations,
        init_result.reconciler,
        init_result.server_state,
    )
    .await
}
