//! Outbound presence queue between the actor and the delivery sink.

use std::future::Future;

use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    domain::presence::PresenceSignal,
    usecases::contracts::{PresenceSendError, PresenceTransport},
};

const PRESENCE_DELIVERY_FAILED: &str = "PRESENCE_DELIVERY_FAILED";
const PRESENCE_OUTBOUND_STOPPED: &str = "PRESENCE_OUTBOUND_STOPPED";

/// Asynchronous delivery of a presence signal over the wire.
pub trait PresenceSink: Send + 'static {
    fn deliver(
        &mut self,
        signal: &PresenceSignal,
    ) -> impl Future<Output = Result<(), PresenceSendError>> + Send;
}

/// Transport handed to the registry. Sending only enqueues; delivery and
/// its outcome happen on the outbound task.
#[derive(Debug, Clone)]
pub struct OutboundTransport {
    tx: mpsc::UnboundedSender<PresenceSignal>,
}

impl OutboundTransport {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PresenceSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl PresenceTransport for OutboundTransport {
    fn send_presence(&self, signal: &PresenceSignal) -> Result<(), PresenceSendError> {
        self.tx
            .send(signal.clone())
            .map_err(|_| PresenceSendError::Unavailable)
    }
}

/// Starts the outbound task draining into `sink`.
pub fn spawn_outbound<K: PresenceSink>(sink: K) -> (OutboundTransport, JoinHandle<()>) {
    let (transport, rx) = OutboundTransport::channel();
    let task = tokio::spawn(run_outbound(sink, rx));
    (transport, task)
}

async fn run_outbound<K: PresenceSink>(
    mut sink: K,
    mut rx: mpsc::UnboundedReceiver<PresenceSignal>,
) {
    while let Some(signal) = rx.recv().await {
        match sink.deliver(&signal).await {
            Ok(()) => tracing::debug!(
                conversation = %signal.conversation,
                action = signal.action.as_label(),
                "presence signal delivered"
            ),
            Err(error) => tracing::warn!(
                code = PRESENCE_DELIVERY_FAILED,
                reason = error.code(),
                conversation = %signal.conversation,
                action = signal.action.as_label(),
                "presence signal delivery failed"
            ),
        }
    }

    tracing::info!(code = PRESENCE_OUTBOUND_STOPPED, "presence outbound queue stopped");
}

/// Sink for the driver binary. There is no network peer, so delivery is
/// only recorded in the log; the driver prints signals in engine order.
#[derive(Debug, Default)]
pub struct LogSink;

impl PresenceSink for LogSink {
    async fn deliver(&mut self, signal: &PresenceSignal) -> Result<(), PresenceSendError> {
        tracing::info!(
            conversation = %signal.conversation,
            action = signal.action.as_label(),
            "presence signal sent"
        );
        Ok(())
    }
}
