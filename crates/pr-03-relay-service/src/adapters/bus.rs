//! # Relay Listener
//!
//! Subscribes a [`RelayService`] to the registration and mint dispatchers.
//! Each request is answered on the topic it arrived on, echoing its
//! correlation id. Responses are published ephemeral.

use crate::service::RelayService;
use pr_01_onchain_gateway::{RegistryGateway, TokenGateway};
use shared_bus::{
    handler_fn, DispatchEvent, Dispatcher, EventName, HandlerId, PublishOptions, SubscribeOptions,
};
use std::sync::Arc;
use tracing::debug;

pub struct RelayListener {
    registration: Dispatcher,
    mint: Dispatcher,
    handlers: Vec<(Dispatcher, HandlerId)>,
}

impl RelayListener {
    /// Attach `service` to both dispatchers. Starting them stays with the
    /// caller.
    pub fn attach<G>(service: Arc<RelayService<G>>, registration: Dispatcher, mint: Dispatcher) -> Self
    where
        G: RegistryGateway + TokenGateway + 'static,
    {
        let mut publish = PublishOptions::ephemeral();
        if service.config().sign_responses {
            publish = publish.with_signature();
        }

        let register_id = {
            let service = Arc::clone(&service);
            let responder = registration.clone();
            registration.subscribe(
                EventName::Register,
                handler_fn(move |envelope| {
                    let service = Arc::clone(&service);
                    let responder = responder.clone();
                    async move {
                        let DispatchEvent::Register(request) = envelope.event else {
                            return Ok(());
                        };
                        debug!(correlation_id = %request.correlation_id, "Registration request received");
                        let response = service.handle_registration(&request).await;
                        responder
                            .publish(&DispatchEvent::RegisterResponse(response), publish)
                            .await?;
                        Ok(())
                    }
                }),
                SubscribeOptions::default(),
            )
        };

        let mint_id = {
            let service = Arc::clone(&service);
            let responder = mint.clone();
            mint.subscribe(
                EventName::Mint,
                handler_fn(move |envelope| {
                    let service = Arc::clone(&service);
                    let responder = responder.clone();
                    async move {
                        let DispatchEvent::Mint(request) = envelope.event else {
                            return Ok(());
                        };
                        debug!(correlation_id = %request.correlation_id, "Mint request received");
                        let response = service.handle_mint(&request).await;
                        responder
                            .publish(&DispatchEvent::MintResponse(response), publish)
                            .await?;
                        Ok(())
                    }
                }),
                SubscribeOptions::default(),
            )
        };

        Self {
            handlers: vec![(registration.clone(), register_id), (mint.clone(), mint_id)],
            registration,
            mint,
        }
    }

    pub fn registration_dispatcher(&self) -> &Dispatcher {
        &self.registration
    }

    pub fn mint_dispatcher(&self) -> &Dispatcher {
        &self.mint
    }
}

impl Drop for RelayListener {
    fn drop(&mut self) {
        for (dispatcher, id) in self.handlers.drain(..) {
            dispatcher.unsubscribe(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::RelayConfig;
    use pr_01_onchain_gateway::{GatewayConfig, InMemoryLedger, OnChainGateway};
    use shared_bus::{
        topics, DispatcherConfig, InMemoryTransport, MintRequest, RegistrationRequest,
        RelayResponse,
    };
    use shared_types::{Address, ErrorKind, IdCommitment, ProofVerificationParams, U256};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn params(identifier: u8) -> ProofVerificationParams {
        ProofVerificationParams {
            vkey_hash: [0u8; 32],
            proof: vec![1],
            public_inputs: vec![[identifier; 32]],
            committed_inputs: vec![],
            committed_input_counts: vec![],
            validity_period_in_seconds: 60,
            domain: "localhost".into(),
            scope: "personhood".into(),
            dev_mode: true,
        }
    }

    struct Harness {
        ledger: InMemoryLedger,
        client_register: Dispatcher,
        client_mint: Dispatcher,
        responses: mpsc::UnboundedReceiver<RelayResponse>,
        _listener: RelayListener,
    }

    async fn harness(config: RelayConfig) -> Harness {
        let transport = Arc::new(InMemoryTransport::new());
        let bus = |topic: &str, config: DispatcherConfig| {
            Dispatcher::new(topic.to_string(), transport.clone(), config).unwrap()
        };
        let key = DispatcherConfig::default().with_signing_key(b"relay-key".to_vec());

        let ledger = InMemoryLedger::new(Address([0xAA; 20]));
        let gateway = OnChainGateway::new(
            ledger.clone(),
            GatewayConfig {
                poll_interval: Duration::from_millis(5),
                ..GatewayConfig::default()
            },
        )
        .unwrap();
        let service = Arc::new(RelayService::new(Arc::new(gateway), config).unwrap());

        let relay_register = bus(topics::REGISTRATION, key.clone());
        let relay_mint = bus(topics::MINT, key.clone());
        let client_register = bus(topics::REGISTRATION, key.clone());
        let client_mint = bus(topics::MINT, key);
        let listener = RelayListener::attach(service, relay_register.clone(), relay_mint.clone());

        let (tx, responses) = mpsc::unbounded_channel();
        for (client, event) in [
            (&client_register, EventName::RegisterResponse),
            (&client_mint, EventName::MintResponse),
        ] {
            let tx = tx.clone();
            client.subscribe(
                event,
                handler_fn(move |envelope| {
                    let tx = tx.clone();
                    async move {
                        if let DispatchEvent::RegisterResponse(r) | DispatchEvent::MintResponse(r) =
                            envelope.event
                        {
                            let _ = tx.send(r);
                        }
                        Ok(())
                    }
                }),
                SubscribeOptions::default(),
            );
        }

        for d in [&relay_register, &relay_mint, &client_register, &client_mint] {
            d.start().await.unwrap();
        }

        Harness {
            ledger,
            client_register,
            client_mint,
            responses,
            _listener: listener,
        }
    }

    async fn next(responses: &mut mpsc::UnboundedReceiver<RelayResponse>) -> RelayResponse {
        tokio::time::timeout(Duration::from_secs(2), responses.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_registration_is_answered_with_hash() {
        let mut h = harness(RelayConfig::default()).await;
        let request = RegistrationRequest::new(params(9), IdCommitment::from(77));
        h.client_register
            .publish(&DispatchEvent::Register(request.clone()), PublishOptions::ephemeral())
            .await
            .unwrap();

        let response = next(&mut h.responses).await;
        assert_eq!(response.correlation_id, request.correlation_id);
        assert!(response.success);
        assert_eq!(h.ledger.registered_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_is_answered_not_dropped() {
        let mut h = harness(RelayConfig::default()).await;
        for commitment in [1u64, 2] {
            let request = RegistrationRequest::new(params(4), IdCommitment::from(commitment));
            h.client_register
                .publish(&DispatchEvent::Register(request), PublishOptions::ephemeral())
                .await
                .unwrap();
        }

        let first = next(&mut h.responses).await;
        let second = next(&mut h.responses).await;
        assert_ne!(first.success, second.success);
        let failed = if first.success { second } else { first };
        assert_eq!(failed.error_kind, Some(ErrorKind::DuplicateIdentifier));
    }

    #[tokio::test]
    async fn test_mint_is_answered() {
        let mut h = harness(RelayConfig::default()).await;
        let to = Address([0x11; 20]);
        let request = MintRequest::new(to, Some(U256::from(3)));
        h.client_mint
            .publish(&DispatchEvent::Mint(request.clone()), PublishOptions::ephemeral())
            .await
            .unwrap();

        let response = next(&mut h.responses).await;
        assert_eq!(response.correlation_id, request.correlation_id);
        assert!(response.success);
        assert_eq!(h.ledger.balance_of(&to), U256::from(3));
    }

    #[tokio::test]
    async fn test_signed_responses() {
        let mut h = harness(RelayConfig {
            sign_responses: true,
            ..RelayConfig::default()
        })
        .await;
        let request = MintRequest::new(Address([0x12; 20]), None);
        h.client_mint
            .publish(&DispatchEvent::Mint(request), PublishOptions::ephemeral())
            .await
            .unwrap();
        assert!(next(&mut h.responses).await.success);
    }
}
