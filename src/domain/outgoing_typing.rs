//! Sender-side debounce state machine for one conversation.
//!
//! Two independent timers drive it. The pause timer detects that the local
//! user stopped typing; the refresh timer re-asserts STARTED so the remote's
//! display window never lapses during a long session. Only a sent message
//! (or a pause timeout) clears both.

use crate::domain::{
    ids::ConversationId,
    presence::PresenceSignal,
    timer::{Scheduler, TimerKind, TimerOwner, TimerSlot, TimerToken},
    timings::TypingTimings,
};

#[derive(Debug)]
pub struct OutgoingCoordinator {
    conversation: ConversationId,
    refresh_timer: TimerSlot,
    pause_timer: TimerSlot,
}

impl OutgoingCoordinator {
    pub fn new(conversation: ConversationId) -> Self {
        let owner = TimerOwner::Outgoing(conversation.clone());
        Self {
            refresh_timer: TimerSlot::new(owner.clone(), TimerKind::Refresh),
            pause_timer: TimerSlot::new(owner, TimerKind::Pause),
            conversation,
        }
    }

    /// True while a STARTED is considered fresh on the remote end.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn is_started(&self) -> bool {
        self.refresh_timer.is_armed()
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn has_pending_timers(&self) -> bool {
        self.refresh_timer.is_armed() || self.pause_timer.is_armed()
    }

    /// Handles one local composition-input event.
    ///
    /// Returns the STARTED signal to send when no episode is in flight.
    pub fn input_was_typed(
        &mut self,
        scheduler: &mut dyn Scheduler,
        timings: &TypingTimings,
    ) -> Option<PresenceSignal> {
        let signal = if self.refresh_timer.is_armed() {
            None
        } else {
            self.refresh_timer.arm(scheduler, timings.refresh);
            Some(PresenceSignal::started(self.conversation.clone()))
        };

        self.pause_timer.arm(scheduler, timings.pause);
        signal
    }

    /// The composed message went out; it conveys completion on its own.
    pub fn message_was_sent(&mut self, scheduler: &mut dyn Scheduler) {
        self.reset(scheduler);
    }

    /// Drops both timers without signalling the remote.
    pub fn reset(&mut self, scheduler: &mut dyn Scheduler) {
        self.refresh_timer.cancel(scheduler);
        self.pause_timer.cancel(scheduler);
    }

    /// Dispatches a fired timer. Stale tokens yield `None` and change nothing.
    pub fn on_timer_fired(
        &mut self,
        token: &TimerToken,
        scheduler: &mut dyn Scheduler,
        timings: &TypingTimings,
    ) -> Option<PresenceSignal> {
        match token.kind {
            TimerKind::Pause if self.pause_timer.accept(token) => {
                Some(self.on_pause_timeout(scheduler))
            }
            TimerKind::Refresh if self.refresh_timer.accept(token) => {
                Some(self.on_refresh_timeout(scheduler, timings))
            }
            _ => None,
        }
    }

    fn on_pause_timeout(&mut self, scheduler: &mut dyn Scheduler) -> PresenceSignal {
        self.reset(scheduler);
        PresenceSignal::stopped(self.conversation.clone())
    }

    fn on_refresh_timeout(
        &mut self,
        scheduler: &mut dyn Scheduler,
        timings: &TypingTimings,
    ) -> PresenceSignal {
        self.refresh_timer.arm(scheduler, timings.refresh);
        PresenceSignal::started(self.conversation.clone())
    }
}
