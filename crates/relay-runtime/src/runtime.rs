//! Component wiring for the relay process.

use crate::config::RuntimeConfig;
use anyhow::{Context, Result};
use pr_01_onchain_gateway::{LedgerBackend, OnChainGateway};
use pr_03_relay_service::{RelayListener, RelayService};
use pr_04_relay_api::RelayApi;
use shared_bus::{Dispatcher, DispatcherConfig, InMemoryTransport, Transport};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// A started relay: dispatchers running, handlers attached, HTTP bound.
pub struct RelayRuntime {
    _listener: RelayListener,
    dispatchers: Vec<Dispatcher>,
    api: RelayApi,
    http: TcpListener,
}

impl RelayRuntime {
    /// Wire `backend` into the gateway, relay, dispatchers and HTTP API.
    pub async fn start<B>(config: RuntimeConfig, backend: B) -> Result<Self>
    where
        B: LedgerBackend + 'static,
    {
        info!("===========================================");
        info!("  Personhood Relay v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let signer = backend.signer();
        let gateway = OnChainGateway::new(backend, config.gateway.clone())
            .context("Invalid gateway configuration")?;
        let relay = Arc::new(
            RelayService::new(Arc::new(gateway), config.relay.clone())
                .context("Invalid relay configuration")?,
        );

        let transport = build_transport(&config)?;
        let mut bus_config = DispatcherConfig::default();
        if let Some(key) = &config.signing_key {
            bus_config = bus_config.with_signing_key(key.clone());
        }
        let registration = Dispatcher::new(
            config.relay.registration_topic.clone(),
            Arc::clone(&transport),
            bus_config.clone(),
        )
        .context("Failed to create registration dispatcher")?;
        let mint = Dispatcher::new(config.relay.mint_topic.clone(), transport, bus_config)
            .context("Failed to create mint dispatcher")?;

        let listener = RelayListener::attach(Arc::clone(&relay), registration.clone(), mint.clone());
        for dispatcher in [&registration, &mint] {
            dispatcher
                .start()
                .await
                .with_context(|| format!("Failed to subscribe to {}", dispatcher.topic()))?;
        }

        let api = RelayApi::new(config.api.clone(), relay).context("Invalid API configuration")?;
        let http = api.bind().await.context("Failed to bind HTTP listener")?;

        info!(%signer, "Relay identity");
        info!(topic = %config.relay.registration_topic, "Registration channel");
        info!(topic = %config.relay.mint_topic, "Mint channel");

        Ok(Self {
            _listener: listener,
            dispatchers: vec![registration, mint],
            api,
            http,
        })
    }

    pub fn http_addr(&self) -> Result<SocketAddr> {
        Ok(self.http.local_addr()?)
    }

    /// Serve until `shutdown` resolves, then stop the dispatchers.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let result = self.api.serve(self.http, shutdown).await;
        for dispatcher in &self.dispatchers {
            dispatcher.stop().await;
        }
        result.context("HTTP server failed")
    }
}

fn build_transport(config: &RuntimeConfig) -> Result<Arc<dyn Transport>> {
    match &config.waku_rest_url {
        #[cfg(feature = "waku-rest")]
        Some(url) => {
            let transport = shared_bus::WakuRestTransport::new(url)
                .with_context(|| format!("Invalid WAKU_REST_URL {url}"))?;
            info!(%url, "Using Waku REST transport");
            Ok(Arc::new(transport))
        }
        #[cfg(not(feature = "waku-rest"))]
        Some(_) => anyhow::bail!("WAKU_REST_URL is set but this build lacks the waku-rest feature"),
        None => {
            warn!("WAKU_REST_URL not set, using in-process transport");
            Ok(Arc::new(InMemoryTransport::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pr_01_onchain_gateway::InMemoryLedger;
    use shared_types::Address;
    use std::net::{IpAddr, Ipv4Addr};

    #[tokio::test]
    async fn test_starts_in_development_mode() {
        let mut config = RuntimeConfig::default();
        config.api.host = IpAddr::V4(Ipv4Addr::LOCALHOST);
        config.api.port = 0;

        let runtime = RelayRuntime::start(config, InMemoryLedger::new(Address([1; 20])))
            .await
            .unwrap();
        assert_ne!(runtime.http_addr().unwrap().port(), 0);
        runtime.run(async {}).await.unwrap();
    }

    #[tokio::test]
    async fn test_clashing_topics_fail_startup() {
        let mut config = RuntimeConfig::default();
        config.api.port = 0;
        config.relay.mint_topic = config.relay.registration_topic.clone();
        let err = RelayRuntime::start(config, InMemoryLedger::new(Address([1; 20])))
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("relay configuration"));
    }
}
