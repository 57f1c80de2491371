use std::{cell::RefCell, time::Duration};

use crate::{
    domain::{
        presence::{PresenceAction, PresenceSignal},
        timer::{Scheduler, TimerHandle, TimerToken},
    },
    usecases::{
        contracts::{PresenceSendError, PresenceTransport},
        typing_registry::TypingRegistry,
    },
};

/// Virtual-clock scheduler. Timers fire only when a test pops them.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now: Duration,
    next_id: u64,
    pending: Vec<(Duration, TimerHandle, TimerToken)>,
}

impl ManualScheduler {
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn set_now(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Pending tokens ordered by due time, then scheduling order.
    pub fn pending_tokens(&self) -> Vec<TimerToken> {
        let mut pending = self.pending.clone();
        pending.sort_by_key(|(due, handle, _)| (*due, *handle));
        pending.into_iter().map(|(_, _, token)| token).collect()
    }

    /// Removes the earliest timer due at or before `until` and moves the
    /// clock to its due time.
    pub fn pop_due(&mut self, until: Duration) -> Option<TimerToken> {
        let index = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, (due, _, _))| *due <= until)
            .min_by_key(|(_, (due, handle, _))| (*due, *handle))
            .map(|(index, _)| index)?;

        let (due, _, token) = self.pending.remove(index);
        self.set_now(due);
        Some(token)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration, token: TimerToken) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.pending.push((self.now + delay, handle, token));
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.pending.retain(|(_, pending, _)| *pending != handle);
    }
}

/// Transport that records every signal and can be switched to failing.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: RefCell<Vec<PresenceSignal>>,
    failing: bool,
}

impl RecordingTransport {
    pub fn failing() -> Self {
        Self {
            sent: RefCell::default(),
            failing: true,
        }
    }

    pub fn sent(&self) -> Vec<PresenceSignal> {
        self.sent.borrow().clone()
    }

    pub fn actions(&self) -> Vec<(String, PresenceAction)> {
        self.sent
            .borrow()
            .iter()
            .map(|signal| (signal.conversation.as_str().to_owned(), signal.action))
            .collect()
    }
}

impl PresenceTransport for RecordingTransport {
    fn send_presence(&self, signal: &PresenceSignal) -> Result<(), PresenceSendError> {
        self.sent.borrow_mut().push(signal.clone());
        if self.failing {
            return Err(PresenceSendError::Unavailable);
        }
        Ok(())
    }
}

/// Moves the registry's virtual clock forward by `by`, firing due timers in
/// order on the way.
pub fn advance<T: PresenceTransport>(
    registry: &mut TypingRegistry<ManualScheduler, T>,
    by: Duration,
) {
    let until = registry.scheduler().now() + by;
    while let Some(token) = registry.scheduler_mut().pop_due(until) {
        registry.on_timer_fired(token);
    }
    registry.scheduler_mut().set_now(until);
}
