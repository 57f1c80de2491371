//! Timer bookkeeping for the typing state machines.
//!
//! Each coordinator owns one [`TimerSlot`] per timer kind. Arming a slot
//! bumps its generation and cancels whatever was armed before, so at most one
//! timer per kind is ever live. A fired timer reaches its coordinator as a
//! [`TimerToken`]; the slot accepts it only if the generation still matches
//! and the slot is armed. A callback that raced with a cancel is a no-op.

use std::time::Duration;

use crate::domain::ids::{ConversationId, EndpointId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Local inactivity window after the last keystroke.
    Pause,
    /// Keep-alive window after a STARTED was sent.
    Refresh,
    /// Expiry window after a remote STARTED was received.
    Display,
}

impl TimerKind {
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Refresh => "refresh",
            Self::Display => "display",
        }
    }
}

/// Coordinator a timer belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerOwner {
    Outgoing(ConversationId),
    Incoming(EndpointId),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimerToken {
    pub owner: TimerOwner,
    pub kind: TimerKind,
    pub generation: u64,
}

/// Opaque handle returned by a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

/// Schedule-once capability supplied by the surrounding runtime.
///
/// When a scheduled timer elapses, the runtime must deliver its token back to
/// the owning registry on the same serialized context as every other
/// operation. `cancel` must be idempotent.
pub trait Scheduler {
    fn schedule(&mut self, delay: Duration, token: TimerToken) -> TimerHandle;
    fn cancel(&mut self, handle: TimerHandle);
}

#[derive(Debug)]
pub struct TimerSlot {
    owner: TimerOwner,
    kind: TimerKind,
    generation: u64,
    armed: Option<TimerHandle>,
}

impl TimerSlot {
    pub fn new(owner: TimerOwner, kind: TimerKind) -> Self {
        Self {
            owner,
            kind,
            generation: 0,
            armed: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Cancels any live timer of this kind and schedules a fresh one.
    pub fn arm(&mut self, scheduler: &mut dyn Scheduler, delay: Duration) {
        self.cancel(scheduler);
        let token = TimerToken {
            owner: self.owner.clone(),
            kind: self.kind,
            generation: self.generation,
        };
        self.armed = Some(scheduler.schedule(delay, token));
    }

    /// Cancels the live timer, if any. Outstanding tokens become stale.
    pub fn cancel(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some(handle) = self.armed.take() {
            scheduler.cancel(handle);
        }
        self.generation += 1;
    }

    /// Consumes a fired token. Returns `false` for stale or foreign tokens,
    /// which must be ignored by the caller.
    pub fn accept(&mut self, token: &TimerToken) -> bool {
        if token.kind != self.kind
            || token.owner != self.owner
            || token.generation != self.generation
            || self.armed.is_none()
        {
            return false;
        }

        self.armed = None;
        self.generation += 1;
        true
    }
}
