//! Receiver-side expiry state machine for one remote endpoint.

use crate::domain::{
    ids::{ConversationId, EndpointId},
    timer::{Scheduler, TimerKind, TimerOwner, TimerSlot, TimerToken},
    timings::TypingTimings,
};

#[derive(Debug)]
pub struct IncomingCoordinator {
    endpoint: EndpointId,
    display_timer: TimerSlot,
    /// Conversation announced by the STARTED that opened the current episode.
    typing_in: Option<ConversationId>,
}

impl IncomingCoordinator {
    pub fn new(endpoint: EndpointId) -> Self {
        Self {
            display_timer: TimerSlot::new(
                TimerOwner::Incoming(endpoint.clone()),
                TimerKind::Display,
            ),
            endpoint,
            typing_in: None,
        }
    }

    pub fn endpoint(&self) -> &EndpointId {
        &self.endpoint
    }

    pub fn is_typing(&self) -> bool {
        self.display_timer.is_armed()
    }

    pub fn typing_in(&self) -> Option<&ConversationId> {
        self.typing_in.as_ref()
    }

    /// Restarts the display window. Returns `true` on a false -> true edge.
    #[must_use]
    pub fn on_received_started(
        &mut self,
        scheduler: &mut dyn Scheduler,
        timings: &TypingTimings,
        conversation: Option<ConversationId>,
    ) -> bool {
        let was_typing = self.is_typing();
        self.display_timer.arm(scheduler, timings.display);
        if conversation.is_some() {
            self.typing_in = conversation;
        }
        !was_typing
    }

    /// Returns `true` on a true -> false edge.
    #[must_use]
    pub fn on_received_stopped(&mut self, scheduler: &mut dyn Scheduler) -> bool {
        let was_typing = self.is_typing();
        self.display_timer.cancel(scheduler);
        self.typing_in = None;
        was_typing
    }

    /// An ordinary message from this endpoint ends the episode like STOPPED.
    #[must_use]
    pub fn on_received_ordinary_message(&mut self, scheduler: &mut dyn Scheduler) -> bool {
        self.on_received_stopped(scheduler)
    }

    /// Returns `true` when the token expired a live episode.
    #[must_use]
    pub fn on_timer_fired(&mut self, token: &TimerToken) -> bool {
        if !self.display_timer.accept(token) {
            return false;
        }

        tracing::debug!(endpoint = %self.endpoint, "typing display window expired");
        self.typing_in = None;
        true
    }
}
