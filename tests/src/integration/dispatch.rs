//! # Dispatch Over the Transport
//!
//! At-least-once transport, at-most-once handler invocation per message id,
//! and every relayed request answered exactly once.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use shared_bus::{
        handler_fn, topics, DispatchEvent, Dispatcher, EventName, PublishOptions,
        RegistrationRequest, RelayResponse, SubscribeOptions,
    };
    use shared_types::{ErrorKind, IdCommitment};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    /// Collect every `register_response` seen on the registration topic.
    /// Receiving stops when the returned dispatcher is dropped.
    async fn response_sink(
        network: &Network,
    ) -> (Dispatcher, mpsc::UnboundedReceiver<RelayResponse>) {
        let bus = Network::dispatcher(&network.transport, topics::REGISTRATION);
        let (tx, rx) = mpsc::unbounded_channel();
        bus.subscribe(
            EventName::RegisterResponse,
            handler_fn(move |envelope| {
                let tx = tx.clone();
                async move {
                    if let DispatchEvent::RegisterResponse(response) = envelope.event {
                        let _ = tx.send(response);
                    }
                    Ok(())
                }
            }),
            SubscribeOptions::default(),
        );
        bus.start().await.unwrap();
        (bus, rx)
    }

    #[tokio::test]
    async fn test_double_publish_is_delivered_once() {
        let network = Network::start().await;
        let invocations = Arc::new(AtomicUsize::new(0));
        {
            let invocations = Arc::clone(&invocations);
            network.relay_bus.subscribe(
                EventName::Register,
                handler_fn(move |_| {
                    let invocations = Arc::clone(&invocations);
                    async move {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }),
                SubscribeOptions::default(),
            );
        }
        let (_sink, mut responses) = response_sink(&network).await;

        // Transport redelivers, and the sender publishes twice
        network.transport.set_redelivery(1);
        let client = Network::dispatcher(&network.transport, topics::REGISTRATION);
        let event = DispatchEvent::Register(RegistrationRequest::new(
            artifact(21).params,
            IdCommitment::from(2121),
        ));
        let first = client.publish(&event, PublishOptions::ephemeral()).await.unwrap();
        let second = client.publish(&event, PublishOptions::ephemeral()).await.unwrap();
        assert_eq!(first, second);

        let response = tokio::time::timeout(WAIT, responses.recv()).await.unwrap().unwrap();
        assert!(response.success);

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        assert_eq!(network.ledger.submitted_count(), 1);
        assert!(network.relay_bus.stats().duplicates >= 3);
        assert!(responses.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stale_request_gets_duplicate_response() {
        let network = Network::start().await;
        let (_sink, mut responses) = response_sink(&network).await;
        let client = Network::dispatcher(&network.transport, topics::REGISTRATION);

        // Same identifier, different commitments: two distinct messages
        for commitment in [31u64, 32] {
            let event = DispatchEvent::Register(RegistrationRequest::new(
                artifact(3).params,
                IdCommitment::from(commitment),
            ));
            client.publish(&event, PublishOptions::ephemeral()).await.unwrap();
        }

        let mut outcomes = Vec::new();
        for _ in 0..2 {
            outcomes.push(tokio::time::timeout(WAIT, responses.recv()).await.unwrap().unwrap());
        }
        assert_eq!(outcomes.iter().filter(|r| r.success).count(), 1);
        let failed = outcomes.iter().find(|r| !r.success).unwrap();
        assert_eq!(failed.error_kind, Some(ErrorKind::DuplicateIdentifier));
        assert_eq!(network.ledger.registered_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_bytes_do_not_stop_the_relay() {
        let network = Network::start().await;
        let (_sink, mut responses) = response_sink(&network).await;

        network.transport.inject(topics::REGISTRATION, b"{not json".to_vec());
        network
            .transport
            .inject(topics::REGISTRATION, br#"{"version":1,"event":"bogus"}"#.to_vec());

        let client = Network::dispatcher(&network.transport, topics::REGISTRATION);
        let event = DispatchEvent::Register(RegistrationRequest::new(
            artifact(41).params,
            IdCommitment::from(41),
        ));
        client.publish(&event, PublishOptions::ephemeral()).await.unwrap();

        let response = tokio::time::timeout(WAIT, responses.recv()).await.unwrap().unwrap();
        assert!(response.success);
    }
}
