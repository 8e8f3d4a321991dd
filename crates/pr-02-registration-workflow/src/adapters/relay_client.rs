//! # Relay Client
//!
//! Client side of the request/response exchange with a relay over a
//! [`Dispatcher`]. Requests carry a fresh correlation id; only the response
//! echoing it completes the request, and the wait is bounded.
//!
//! The dispatcher's lifecycle stays with the caller: start it before
//! sending requests or responses will never be received.

use crate::adapters::pending::PendingResponses;
use crate::ports::outbound::{RelaySubmitter, RelayTicket};
use async_trait::async_trait;
use futures::FutureExt;
use shared_bus::{
    handler_fn, DispatchEvent, Dispatcher, EventName, HandlerId, MintRequest, PublishOptions,
    RegistrationRequest, SubscribeOptions,
};
use shared_types::{
    Address, IdCommitment, ProofVerificationParams, RegistryError, TxHash, U256,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct RelayClient {
    dispatcher: Dispatcher,
    pending: Arc<PendingResponses>,
    timeout: Duration,
    publish_options: PublishOptions,
    handlers: Vec<HandlerId>,
}

impl RelayClient {
    /// Subscribe to responses on `dispatcher`'s topic.
    pub fn attach(dispatcher: Dispatcher, timeout: Duration) -> Self {
        let pending = Arc::new(PendingResponses::new());
        let handlers = [EventName::RegisterResponse, EventName::MintResponse]
            .into_iter()
            .map(|event| {
                let store = Arc::clone(&pending);
                dispatcher.subscribe(
                    event,
                    handler_fn(move |envelope| {
                        let store = Arc::clone(&store);
                        async move {
                            if let DispatchEvent::RegisterResponse(response)
                            | DispatchEvent::MintResponse(response) = envelope.event
                            {
                                store.complete(response);
                            }
                            Ok(())
                        }
                    }),
                    SubscribeOptions::default(),
                )
            })
            .collect();

        Self {
            dispatcher,
            pending,
            timeout,
            publish_options: PublishOptions::ephemeral(),
            handlers,
        }
    }

    /// Sign outgoing requests with the dispatcher's key.
    #[must_use]
    pub fn with_signed_requests(mut self) -> Self {
        self.publish_options = self.publish_options.with_signature();
        self
    }

    pub fn pending(&self) -> &PendingResponses {
        &self.pending
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Ask the relay to mint to `recipient` and wait for the outcome.
    pub async fn request_mint(
        &self,
        recipient: Address,
        amount: Option<U256>,
    ) -> Result<TxHash, RegistryError> {
        let ticket = self
            .send(DispatchEvent::Mint(MintRequest::new(recipient, amount)))
            .await?;
        let result = ticket.wait().await;
        if let Ok(tx_hash) = &result {
            info!(%recipient, %tx_hash, "Tokens minted");
        }
        result
    }

    async fn send(&self, event: DispatchEvent) -> Result<RelayTicket, RegistryError> {
        let correlation_id = event.correlation_id();
        // Registered before publishing so a fast response is not lost
        let rx = self.pending.register(correlation_id, event.name());

        if let Err(e) = self.dispatcher.publish(&event, self.publish_options).await {
            self.pending.cancel(&correlation_id);
            return Err(e.into());
        }
        debug!(%correlation_id, event = %event.name(), "Relay request published");

        let pending = Arc::clone(&self.pending);
        let timeout = self.timeout;
        let response = async move {
            match tokio::time::timeout(timeout, rx).await {
                Ok(Ok(response)) => response.into_result(),
                Ok(Err(_)) => Err(RegistryError::transport("relay request was dropped")),
                Err(_) => {
                    pending.expire(&correlation_id);
                    Err(RegistryError::timeout(format!(
                        "no relay response within {}s",
                        timeout.as_secs_f64()
                    )))
                }
            }
        }
        .boxed();

        Ok(RelayTicket {
            correlation_id,
            response,
        })
    }
}

impl Drop for RelayClient {
    fn drop(&mut self) {
        for id in self.handlers.drain(..) {
            self.dispatcher.unsubscribe(id);
        }
    }
}

#[async_trait]
impl RelaySubmitter for RelayClient {
    async fn publish_registration(
        &self,
        params: &ProofVerificationParams,
        commitment: &IdCommitment,
    ) -> Result<RelayTicket, RegistryError> {
        let request = RegistrationRequest::new(params.clone(), *commitment);
        self.send(DispatchEvent::Register(request)).await
    }
}
