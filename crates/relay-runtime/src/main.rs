//! Relay executable. See the library docs for the startup sequence.

use anyhow::{Context, Result};
use pr_01_onchain_gateway::InMemoryLedger;
use registry_telemetry::{init_telemetry, TelemetryConfig};
use relay_runtime::{RelayRuntime, RuntimeConfig};
use shared_types::Address;
use tracing::{error, info, warn};

/// Owner and signer of the development ledger.
const DEV_RELAY_ADDRESS: Address = Address([0x0d; 20]);

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    let dotenv = dotenvy::dotenv();

    let _telemetry = init_telemetry(TelemetryConfig::from_env()).context("Failed to initialize telemetry")?;
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    let config = RuntimeConfig::from_env().context("Invalid configuration")?;

    let runtime = match config.ledger.clone() {
        #[cfg(feature = "evm")]
        Some(ledger) => {
            use pr_01_onchain_gateway::{EvmBackend, EvmConfig};

            let backend = EvmBackend::connect(EvmConfig {
                rpc_url: ledger.rpc_url,
                private_key: ledger.private_key,
                chain_id: None,
                registry_address: ledger.registry_address,
                token_address: ledger.token_address,
            })
            .await
            .context("Failed to connect to the ledger")?;
            RelayRuntime::start(config, backend).await?
        }
        #[cfg(not(feature = "evm"))]
        Some(_) => anyhow::bail!("LEDGER_RPC_URL is set but this build lacks the evm feature"),
        None => {
            warn!("LEDGER_RPC_URL not set, using the in-memory ledger (development only)");
            RelayRuntime::start(config, InMemoryLedger::new(DEV_RELAY_ADDRESS)).await?
        }
    };

    info!("Relay is running. Press Ctrl+C to stop.");
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
        }
        info!("Initiating graceful shutdown...");
    };

    runtime.run(shutdown).await?;
    info!("Shutdown complete");
    Ok(())
}
