//! The presence actor: a single task owning the typing registry.
//!
//! Every request from a [`PresenceHandle`] and every elapsed timer is a
//! message to this task, so coordinator state is only ever touched from one
//! place and in submission order.

use std::sync::mpsc as std_mpsc;

use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    domain::{
        events::{LocalInput, RemoteEvent, TypingStateChanged},
        ids::{ConversationId, EndpointId, SenderId},
        timer::TimerToken,
    },
    service::scheduler::TokioScheduler,
    usecases::{
        contracts::PresenceTransport,
        typing_registry::{
            ChangeObserver, RegistrySettings, RegistryStats, RouteError, TypingRegistry,
        },
    },
};

const PRESENCE_SERVICE_STARTED: &str = "PRESENCE_SERVICE_STARTED";
const PRESENCE_SERVICE_STOPPED: &str = "PRESENCE_SERVICE_STOPPED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("presence service is not running")]
    Closed,
    #[error(transparent)]
    Route(#[from] RouteError),
}

enum PresenceRequest {
    Local {
        conversation: String,
        input: LocalInput,
        reply_tx: oneshot::Sender<Result<(), RouteError>>,
    },
    Remote {
        endpoint: EndpointId,
        event: RemoteEvent,
    },
    IsTyping {
        sender: SenderId,
        reply_tx: oneshot::Sender<bool>,
    },
    TypingIn {
        conversation: ConversationId,
        reply_tx: oneshot::Sender<Vec<SenderId>>,
    },
    SetEnabled(bool),
    Attach {
        observer: Box<dyn ChangeObserver>,
        reply_tx: oneshot::Sender<()>,
    },
    Shutdown,
}

/// Cloneable client of the presence actor.
#[derive(Debug, Clone)]
pub struct PresenceHandle {
    tx: mpsc::Sender<PresenceRequest>,
}

impl std::fmt::Debug for PresenceRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Local { .. } => "Local",
            Self::Remote { .. } => "Remote",
            Self::IsTyping { .. } => "IsTyping",
            Self::TypingIn { .. } => "TypingIn",
            Self::SetEnabled(_) => "SetEnabled",
            Self::Attach { .. } => "Attach",
            Self::Shutdown => "Shutdown",
        };
        f.write_str(name)
    }
}

impl PresenceHandle {
    pub async fn input_was_typed(&self, conversation: &str) -> Result<(), ServiceError> {
        self.local(conversation, LocalInput::InputTyped).await
    }

    pub async fn message_was_sent(&self, conversation: &str) -> Result<(), ServiceError> {
        self.local(conversation, LocalInput::MessageSent).await
    }

    pub async fn did_receive_typing_started(
        &self,
        endpoint: EndpointId,
        conversation: Option<ConversationId>,
    ) -> Result<(), ServiceError> {
        self.remote(endpoint, RemoteEvent::TypingStarted { conversation })
            .await
    }

    pub async fn did_receive_typing_stopped(
        &self,
        endpoint: EndpointId,
    ) -> Result<(), ServiceError> {
        self.remote(endpoint, RemoteEvent::TypingStopped).await
    }

    pub async fn did_receive_ordinary_message(
        &self,
        endpoint: EndpointId,
    ) -> Result<(), ServiceError> {
        self.remote(endpoint, RemoteEvent::OrdinaryMessage).await
    }

    pub async fn is_typing_visible(&self, sender: SenderId) -> Result<bool, ServiceError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(PresenceRequest::IsTyping { sender, reply_tx })
            .await?;
        reply_rx.await.map_err(|_| ServiceError::Closed)
    }

    pub async fn typing_senders_in(
        &self,
        conversation: ConversationId,
    ) -> Result<Vec<SenderId>, ServiceError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(PresenceRequest::TypingIn {
            conversation,
            reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| ServiceError::Closed)
    }

    pub async fn set_enabled(&self, enabled: bool) -> Result<(), ServiceError> {
        self.request(PresenceRequest::SetEnabled(enabled)).await
    }

    /// Returns a receiver of every typing transition from now on.
    #[cfg_attr(not(test), allow(dead_code))]
    pub async fn subscribe(
        &self,
    ) -> Result<std_mpsc::Receiver<TypingStateChanged>, ServiceError> {
        let (tx, rx) = std_mpsc::channel();
        self.forward_changes(tx).await?;
        Ok(rx)
    }

    /// Forwards every typing transition from now on into `tx`, converted to
    /// the caller's own message type.
    pub async fn forward_changes<E>(&self, tx: std_mpsc::Sender<E>) -> Result<(), ServiceError>
    where
        E: From<TypingStateChanged> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(PresenceRequest::Attach {
            observer: Box::new(tx),
            reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| ServiceError::Closed)
    }

    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        self.request(PresenceRequest::Shutdown).await
    }

    async fn local(&self, conversation: &str, input: LocalInput) -> Result<(), ServiceError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(PresenceRequest::Local {
            conversation: conversation.to_owned(),
            input,
            reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| ServiceError::Closed)??;
        Ok(())
    }

    async fn remote(&self, endpoint: EndpointId, event: RemoteEvent) -> Result<(), ServiceError> {
        self.request(PresenceRequest::Remote { endpoint, event })
            .await
    }

    async fn request(&self, request: PresenceRequest) -> Result<(), ServiceError> {
        self.tx.send(request).await.map_err(|_| ServiceError::Closed)
    }
}

/// Spawns the presence actor on the current tokio runtime.
///
/// The returned task resolves with the registry's final stats once the
/// actor stops, either on [`PresenceHandle::shutdown`] or when every handle
/// has been dropped.
pub fn spawn_presence_service<T>(
    settings: RegistrySettings,
    transport: T,
    mailbox_capacity: usize,
) -> (PresenceHandle, JoinHandle<RegistryStats>)
where
    T: PresenceTransport + Send + 'static,
{
    let (tx, rx) = mpsc::channel(mailbox_capacity.max(1));
    let (timer_tx, timer_rx) = mpsc::unbounded_channel();
    let registry = TypingRegistry::new(TokioScheduler::new(timer_tx), transport, settings);

    tracing::info!(
        code = PRESENCE_SERVICE_STARTED,
        enabled = registry.is_enabled(),
        mailbox_capacity,
        "presence service started"
    );

    let task = tokio::spawn(run_actor(registry, rx, timer_rx));
    (PresenceHandle { tx }, task)
}

async fn run_actor<T: PresenceTransport>(
    mut registry: TypingRegistry<TokioScheduler, T>,
    mut rx: mpsc::Receiver<PresenceRequest>,
    mut timer_rx: mpsc::UnboundedReceiver<TimerToken>,
) -> RegistryStats {
    loop {
        tokio::select! {
            // The registry owns a timer sender, so this channel never closes
            // while the loop runs.
            Some(token) = timer_rx.recv() => registry.on_timer_fired(token),
            request = rx.recv() => match request {
                Some(PresenceRequest::Shutdown) | None => break,
                Some(request) => handle_request(&mut registry, request),
            },
        }
    }

    let stats = registry.stats();
    tracing::info!(
        code = PRESENCE_SERVICE_STOPPED,
        conversations = stats.conversations,
        endpoints = stats.endpoints,
        typing_endpoints = stats.typing_endpoints,
        "presence service stopped"
    );
    stats
}

fn handle_request<T: PresenceTransport>(
    registry: &mut TypingRegistry<TokioScheduler, T>,
    request: PresenceRequest,
) {
    match request {
        PresenceRequest::Local {
            conversation,
            input,
            reply_tx,
        } => {
            let _ = reply_tx.send(registry.route_input(&conversation, input));
        }
        PresenceRequest::Remote { endpoint, event } => registry.route_incoming(endpoint, event),
        PresenceRequest::IsTyping { sender, reply_tx } => {
            let _ = reply_tx.send(registry.query_is_typing(&sender));
        }
        PresenceRequest::TypingIn {
            conversation,
            reply_tx,
        } => {
            let _ = reply_tx.send(registry.typing_senders_in(&conversation));
        }
        PresenceRequest::SetEnabled(enabled) => registry.set_enabled(enabled),
        PresenceRequest::Attach { observer, reply_tx } => {
            registry.attach(observer);
            let _ = reply_tx.send(());
        }
        PresenceRequest::Shutdown => {}
    }
}
