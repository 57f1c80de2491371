//! Owns every typing coordinator and routes events to them.
//!
//! Outgoing coordinators are keyed by conversation, incoming ones by sender
//! and then device. Both tables grow lazily and are never evicted. All
//! mutation happens through `&mut self`, so the owner decides how calls are
//! serialized (the presence service runs the registry on a single actor).

use std::{collections::HashMap, sync::mpsc};

use thiserror::Error;

use crate::{
    domain::{
        events::{LocalInput, RemoteEvent, TypingStateChanged},
        ids::{ConversationId, DeviceId, EndpointId, IdError, SenderId},
        incoming_typing::IncomingCoordinator,
        outgoing_typing::OutgoingCoordinator,
        presence::PresenceSignal,
        timer::{Scheduler, TimerOwner, TimerToken},
        timings::TypingTimings,
    },
    usecases::contracts::PresenceTransport,
};

const TYPING_INPUT_DROPPED: &str = "TYPING_INPUT_DROPPED";
const PRESENCE_SEND_FAILED: &str = "PRESENCE_SEND_FAILED";

/// Receiver of typing transitions. Returning `false` unregisters it.
pub trait ChangeObserver: Send {
    fn observe(&self, change: &TypingStateChanged) -> bool;
}

impl<E> ChangeObserver for mpsc::Sender<E>
where
    E: From<TypingStateChanged> + Send,
{
    fn observe(&self, change: &TypingStateChanged) -> bool {
        self.send(E::from(change.clone())).is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("local input dropped: {0}")]
    InvalidConversation(IdError),
}

impl RouteError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidConversation(error) => error.code(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySettings {
    pub timings: TypingTimings,
    /// User-level switch for sending and showing typing indicators.
    pub enabled: bool,
    /// Events from this sender (the local user's linked devices) are ignored.
    pub local_sender: Option<SenderId>,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            timings: TypingTimings::default(),
            enabled: true,
            local_sender: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    pub conversations: usize,
    pub endpoints: usize,
    pub typing_endpoints: usize,
}

pub struct TypingRegistry<S, T>
where
    S: Scheduler,
    T: PresenceTransport,
{
    scheduler: S,
    transport: T,
    settings: RegistrySettings,
    outgoing: HashMap<ConversationId, OutgoingCoordinator>,
    incoming: HashMap<SenderId, HashMap<DeviceId, IncomingCoordinator>>,
    subscribers: Vec<Box<dyn ChangeObserver>>,
}

impl<S, T> TypingRegistry<S, T>
where
    S: Scheduler,
    T: PresenceTransport,
{
    pub fn new(scheduler: S, transport: T, settings: RegistrySettings) -> Self {
        Self {
            scheduler,
            transport,
            settings,
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            subscribers: Vec::new(),
        }
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Registers an observer of typing transitions.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn subscribe(&mut self) -> mpsc::Receiver<TypingStateChanged> {
        let (tx, rx) = mpsc::channel();
        self.attach(Box::new(tx));
        rx
    }

    /// Registers an observer that is not a plain change channel.
    pub fn attach(&mut self, observer: Box<dyn ChangeObserver>) {
        self.subscribers.push(observer);
    }

    /// Dispatches a local composition event to its conversation.
    ///
    /// A malformed conversation id drops the event without touching any
    /// state and is reported back to the caller.
    pub fn route_input(&mut self, conversation: &str, input: LocalInput) -> Result<(), RouteError> {
        let conversation = match ConversationId::parse(conversation) {
            Ok(conversation) => conversation,
            Err(error) => {
                tracing::warn!(
                    code = TYPING_INPUT_DROPPED,
                    reason = error.code(),
                    input = ?input,
                    "dropping local input with malformed conversation id"
                );
                return Err(RouteError::InvalidConversation(error));
            }
        };

        if !self.settings.enabled {
            tracing::trace!(%conversation, input = ?input, "typing indicators disabled; input ignored");
            return Ok(());
        }

        let signal = match input {
            LocalInput::InputTyped => self
                .outgoing
                .entry(conversation.clone())
                .or_insert_with(|| OutgoingCoordinator::new(conversation))
                .input_was_typed(&mut self.scheduler, &self.settings.timings),
            LocalInput::MessageSent => {
                // Nothing to cancel if nobody ever typed here.
                if let Some(coordinator) = self.outgoing.get_mut(&conversation) {
                    coordinator.message_was_sent(&mut self.scheduler);
                }
                None
            }
        };

        if let Some(signal) = signal {
            self.send(&signal);
        }

        Ok(())
    }

    /// Dispatches an event received from a remote endpoint.
    pub fn route_incoming(&mut self, endpoint: EndpointId, event: RemoteEvent) {
        if self.settings.local_sender.as_ref() == Some(endpoint.sender()) {
            tracing::trace!(%endpoint, kind = event.kind(), "ignoring event from local sender");
            return;
        }

        if !self.settings.enabled && matches!(event, RemoteEvent::TypingStarted { .. }) {
            tracing::trace!(%endpoint, "typing indicators disabled; started ignored");
            return;
        }

        let coordinator = self
            .incoming
            .entry(endpoint.sender().clone())
            .or_default()
            .entry(endpoint.device().clone())
            .or_insert_with(|| IncomingCoordinator::new(endpoint.clone()));

        let changed = match event {
            RemoteEvent::TypingStarted { conversation } => coordinator.on_received_started(
                &mut self.scheduler,
                &self.settings.timings,
                conversation,
            ),
            RemoteEvent::TypingStopped => coordinator.on_received_stopped(&mut self.scheduler),
            RemoteEvent::OrdinaryMessage => {
                coordinator.on_received_ordinary_message(&mut self.scheduler)
            }
        };

        if changed {
            let is_typing = coordinator.is_typing();
            self.notify(TypingStateChanged {
                endpoint,
                is_typing,
            });
        }
    }

    /// Delivers an elapsed timer to the coordinator that armed it.
    pub fn on_timer_fired(&mut self, token: TimerToken) {
        match &token.owner {
            TimerOwner::Outgoing(conversation) => {
                let Some(coordinator) = self.outgoing.get_mut(conversation) else {
                    return;
                };
                let signal =
                    coordinator.on_timer_fired(&token, &mut self.scheduler, &self.settings.timings);
                match signal {
                    Some(signal) => self.send(&signal),
                    None => tracing::trace!(
                        %conversation,
                        kind = token.kind.as_label(),
                        "stale outgoing timer ignored"
                    ),
                }
            }
            TimerOwner::Incoming(endpoint) => {
                let expired = self
                    .incoming
                    .get_mut(endpoint.sender())
                    .and_then(|devices| devices.get_mut(endpoint.device()))
                    .is_some_and(|coordinator| coordinator.on_timer_fired(&token));

                if expired {
                    self.notify(TypingStateChanged {
                        endpoint: endpoint.clone(),
                        is_typing: false,
                    });
                }
            }
        }
    }

    /// True iff any device of `sender` is currently typing.
    pub fn query_is_typing(&self, sender: &SenderId) -> bool {
        if !self.settings.enabled {
            return false;
        }

        self.incoming
            .get(sender)
            .is_some_and(|devices| devices.values().any(IncomingCoordinator::is_typing))
    }

    /// Senders currently typing in `conversation`, sorted.
    pub fn typing_senders_in(&self, conversation: &ConversationId) -> Vec<SenderId> {
        if !self.settings.enabled {
            return Vec::new();
        }

        let mut senders: Vec<SenderId> = self
            .incoming
            .iter()
            .filter(|(_, devices)| {
                devices.values().any(|coordinator| {
                    coordinator.is_typing() && coordinator.typing_in() == Some(conversation)
                })
            })
            .map(|(sender, _)| sender.clone())
            .collect();
        senders.sort();
        senders
    }

    /// Flips the typing-indicator switch.
    ///
    /// Disabling drops every outgoing timer without signalling and hides
    /// every remote that is currently shown as typing.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.settings.enabled == enabled {
            return;
        }

        self.settings.enabled = enabled;
        tracing::info!(enabled, "typing indicators switched");
        if enabled {
            return;
        }

        for coordinator in self.outgoing.values_mut() {
            coordinator.reset(&mut self.scheduler);
        }

        let mut hidden = Vec::new();
        for coordinator in self.incoming.values_mut().flat_map(HashMap::values_mut) {
            if coordinator.on_received_stopped(&mut self.scheduler) {
                hidden.push(coordinator.endpoint().clone());
            }
        }
        hidden.sort();

        for endpoint in hidden {
            self.notify(TypingStateChanged {
                endpoint,
                is_typing: false,
            });
        }
    }

    pub fn stats(&self) -> RegistryStats {
        let endpoints = self.incoming.values().flat_map(HashMap::values);
        RegistryStats {
            conversations: self.outgoing.len(),
            endpoints: endpoints.clone().count(),
            typing_endpoints: endpoints.filter(|c| c.is_typing()).count(),
        }
    }

    fn send(&self, signal: &PresenceSignal) {
        tracing::debug!(
            conversation = %signal.conversation,
            action = signal.action.as_label(),
            "sending presence signal"
        );

        if let Err(error) = self.transport.send_presence(signal) {
            tracing::warn!(
                code = PRESENCE_SEND_FAILED,
                reason = error.code(),
                conversation = %signal.conversation,
                action = signal.action.as_label(),
                "presence signal send failed; typing state kept"
            );
        }
    }

    fn notify(&mut self, change: TypingStateChanged) {
        tracing::debug!(
            endpoint = %change.endpoint,
            is_typing = change.is_typing,
            "typing state changed"
        );
        self.subscribers
            .retain(|subscriber| subscriber.observe(&change));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        domain::presence::PresenceAction,
        test_support::{advance, ManualScheduler, RecordingTransport},
    };

    type TestRegistry = TypingRegistry<ManualScheduler, RecordingTransport>;

    fn registry() -> TestRegistry {
        TypingRegistry::new(
            ManualScheduler::default(),
            RecordingTransport::default(),
            RegistrySettings::default(),
        )
    }

    fn endpoint(sender: &str, device: &str) -> EndpointId {
        EndpointId::parse(sender, device).expect("endpoint should parse")
    }

    fn sender(raw: &str) -> SenderId {
        SenderId::parse(raw).expect("sender should parse")
    }

    fn started() -> RemoteEvent {
        RemoteEvent::TypingStarted { conversation: None }
    }

    fn started_in(conversation: &str) -> RemoteEvent {
        RemoteEvent::TypingStarted {
            conversation: Some(ConversationId::parse(conversation).expect("id should parse")),
        }
    }

    fn drain(rx: &mpsc::Receiver<TypingStateChanged>) -> Vec<(String, bool)> {
        rx.try_iter()
            .map(|change| (change.endpoint.to_string(), change.is_typing))
            .collect()
    }

    #[test]
    fn burst_of_input_sends_one_started_then_one_stopped() {
        let mut registry = registry();

        for _ in 0..5 {
            registry
                .route_input("c1", LocalInput::InputTyped)
                .expect("input should route");
            advance(&mut registry, Duration::from_millis(900));
        }
        advance(&mut registry, Duration::from_millis(4_000));
        assert_eq!(
            registry.transport().actions(),
            vec![("c1".to_owned(), PresenceAction::Started)]
        );

        advance(&mut registry, Duration::from_millis(200));
        assert_eq!(
            registry.transport().actions(),
            vec![
                ("c1".to_owned(), PresenceAction::Started),
                ("c1".to_owned(), PresenceAction::Stopped),
            ]
        );
        assert_eq!(registry.scheduler().pending_count(), 0);
    }

    #[test]
    fn message_sent_leaves_no_timers_and_no_later_signals() {
        let mut registry = registry();

        registry
            .route_input("c1", LocalInput::InputTyped)
            .expect("input should route");
        registry
            .route_input("c1", LocalInput::MessageSent)
            .expect("message sent should route");
        advance(&mut registry, Duration::from_secs(60));

        assert_eq!(registry.scheduler().pending_count(), 0);
        assert_eq!(registry.transport().sent().len(), 1);
    }

    #[test]
    fn conversations_are_debounced_independently() {
        let mut registry = registry();

        registry
            .route_input("c1", LocalInput::InputTyped)
            .expect("input should route");
        registry
            .route_input("c2", LocalInput::InputTyped)
            .expect("input should route");
        registry
            .route_input("c1", LocalInput::MessageSent)
            .expect("message sent should route");
        advance(&mut registry, Duration::from_secs(6));

        assert_eq!(
            registry.transport().actions(),
            vec![
                ("c1".to_owned(), PresenceAction::Started),
                ("c2".to_owned(), PresenceAction::Started),
                ("c2".to_owned(), PresenceAction::Stopped),
            ]
        );
        assert_eq!(registry.stats().conversations, 2);
    }

    #[test]
    fn malformed_conversation_is_reported_and_mutates_nothing() {
        let mut registry = registry();

        let result = registry.route_input("  ", LocalInput::InputTyped);

        assert_eq!(
            result,
            Err(RouteError::InvalidConversation(IdError::EmptyConversation))
        );
        assert_eq!(
            result.map_err(|error| error.code()),
            Err("ID_EMPTY_CONVERSATION")
        );
        assert_eq!(registry.stats(), RegistryStats::default());
        assert!(registry.transport().sent().is_empty());
        assert_eq!(registry.scheduler().pending_count(), 0);
    }

    #[test]
    fn failed_send_keeps_timer_state() {
        let mut registry = TypingRegistry::new(
            ManualScheduler::default(),
            RecordingTransport::failing(),
            RegistrySettings::default(),
        );

        registry
            .route_input("c1", LocalInput::InputTyped)
            .expect("input should route");
        registry
            .route_input("c1", LocalInput::InputTyped)
            .expect("input should route");

        assert_eq!(registry.transport().sent().len(), 1);
        assert_eq!(registry.scheduler().pending_count(), 2);
    }

    #[test]
    fn refreshed_remote_stays_typing_and_notifies_once() {
        let mut registry = registry();
        let rx = registry.subscribe();
        let alice = endpoint("alice", "1");

        registry.route_incoming(alice.clone(), started());
        advance(&mut registry, Duration::from_secs(14));
        assert!(registry.query_is_typing(&sender("alice")));
        registry.route_incoming(alice.clone(), started());
        advance(&mut registry, Duration::from_secs(14));

        assert!(registry.query_is_typing(&sender("alice")));
        assert_eq!(drain(&rx), vec![("alice.1".to_owned(), true)]);
    }

    #[test]
    fn silent_remote_expires_with_single_notification() {
        let mut registry = registry();
        let rx = registry.subscribe();

        registry.route_incoming(endpoint("alice", "1"), started());
        advance(&mut registry, Duration::from_secs(16));

        assert!(!registry.query_is_typing(&sender("alice")));
        assert_eq!(
            drain(&rx),
            vec![("alice.1".to_owned(), true), ("alice.1".to_owned(), false)]
        );
    }

    #[test]
    fn double_started_notifies_once() {
        let mut registry = registry();
        let rx = registry.subscribe();

        registry.route_incoming(endpoint("alice", "1"), started());
        registry.route_incoming(endpoint("alice", "1"), started());

        assert_eq!(drain(&rx), vec![("alice.1".to_owned(), true)]);
    }

    #[test]
    fn stopped_without_typing_does_not_notify() {
        let mut registry = registry();
        let rx = registry.subscribe();

        registry.route_incoming(endpoint("alice", "1"), RemoteEvent::TypingStopped);
        registry.route_incoming(endpoint("alice", "1"), RemoteEvent::OrdinaryMessage);

        assert!(drain(&rx).is_empty());
        assert_eq!(registry.stats().endpoints, 1);
    }

    #[test]
    fn sender_is_typing_while_any_device_types() {
        let mut registry = registry();
        let alice = sender("alice");

        registry.route_incoming(endpoint("alice", "phone"), started());
        registry.route_incoming(endpoint("alice", "laptop"), started());
        registry.route_incoming(endpoint("alice", "laptop"), RemoteEvent::TypingStopped);
        assert!(registry.query_is_typing(&alice));

        registry.route_incoming(endpoint("alice", "phone"), RemoteEvent::OrdinaryMessage);
        assert!(!registry.query_is_typing(&alice));
    }

    #[test]
    fn unknown_sender_is_not_typing() {
        let registry = registry();

        assert!(!registry.query_is_typing(&sender("nobody")));
    }

    #[test]
    fn lists_typing_senders_per_conversation() {
        let mut registry = registry();
        let c1 = ConversationId::parse("c1").expect("id should parse");

        registry.route_incoming(endpoint("bob", "1"), started_in("c1"));
        registry.route_incoming(endpoint("alice", "1"), started_in("c1"));
        registry.route_incoming(endpoint("alice", "2"), started_in("c1"));
        registry.route_incoming(endpoint("carol", "1"), started_in("c2"));
        registry.route_incoming(endpoint("dave", "1"), started());

        assert_eq!(registry.typing_senders_in(&c1), vec![sender("alice"), sender("bob")]);
    }

    #[test]
    fn local_sender_devices_are_ignored() {
        let mut registry = TypingRegistry::new(
            ManualScheduler::default(),
            RecordingTransport::default(),
            RegistrySettings {
                local_sender: Some(sender("me")),
                ..RegistrySettings::default()
            },
        );
        let rx = registry.subscribe();

        registry.route_incoming(endpoint("me", "2"), started());

        assert!(!registry.query_is_typing(&sender("me")));
        assert!(drain(&rx).is_empty());
        assert_eq!(registry.stats().endpoints, 0);
    }

    #[test]
    fn disabling_clears_outgoing_silently_and_hides_remotes() {
        let mut registry = registry();
        let rx = registry.subscribe();

        registry
            .route_input("c1", LocalInput::InputTyped)
            .expect("input should route");
        registry.route_incoming(endpoint("bob", "1"), started());
        registry.route_incoming(endpoint("alice", "1"), started());
        let _ = drain(&rx);

        registry.set_enabled(false);

        assert_eq!(registry.scheduler().pending_count(), 0);
        assert_eq!(registry.transport().sent().len(), 1);
        assert_eq!(
            drain(&rx),
            vec![("alice.1".to_owned(), false), ("bob.1".to_owned(), false)]
        );
    }

    #[test]
    fn disabled_registry_ignores_input_and_started() {
        let mut registry = registry();
        registry.set_enabled(false);

        registry
            .route_input("c1", LocalInput::InputTyped)
            .expect("disabled input is not an error");
        registry.route_incoming(endpoint("alice", "1"), started());

        assert!(registry.transport().sent().is_empty());
        assert!(!registry.query_is_typing(&sender("alice")));
        assert_eq!(registry.stats(), RegistryStats::default());

        registry.set_enabled(true);
        registry
            .route_input("c1", LocalInput::InputTyped)
            .expect("input should route");
        assert_eq!(registry.transport().sent().len(), 1);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut registry = registry();
        let kept = registry.subscribe();
        drop(registry.subscribe());

        registry.route_incoming(endpoint("alice", "1"), started());

        assert_eq!(registry.subscribers.len(), 1);
        assert_eq!(drain(&kept).len(), 1);
    }

    #[test]
    fn attached_channel_receives_converted_changes() {
        #[derive(Debug, PartialEq, Eq)]
        enum Line {
            Change(TypingStateChanged),
        }

        impl From<TypingStateChanged> for Line {
            fn from(change: TypingStateChanged) -> Self {
                Self::Change(change)
            }
        }

        let mut registry = registry();
        let (tx, rx) = mpsc::channel::<Line>();
        registry.attach(Box::new(tx));

        registry.route_incoming(endpoint("alice", "1"), started());
        registry.route_incoming(endpoint("alice", "1"), RemoteEvent::OrdinaryMessage);

        let change = |is_typing| {
            Line::Change(TypingStateChanged {
                endpoint: endpoint("alice", "1"),
                is_typing,
            })
        };
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![change(true), change(false)]);

        drop(rx);
        registry.route_incoming(endpoint("alice", "1"), started());
        assert!(registry.subscribers.is_empty());
    }

    #[test]
    fn stats_count_tracked_and_typing_endpoints() {
        let mut registry = registry();

        registry.route_incoming(endpoint("alice", "1"), started());
        registry.route_incoming(endpoint("alice", "2"), RemoteEvent::TypingStopped);
        registry
            .route_input("c1", LocalInput::InputTyped)
            .expect("input should route");

        assert_eq!(
            registry.stats(),
            RegistryStats {
                conversations: 1,
                endpoints: 2,
                typing_endpoints: 1,
            }
        );
    }
}
