use thiserror::Error;

use crate::domain::presence::PresenceSignal;

/// Errors a transport may report for a presence send.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresenceSendError {
    /// The conversation cannot receive presence signals right now.
    #[cfg_attr(not(test), allow(dead_code))]
    #[error("conversation is not reachable")]
    Unreachable,
    /// The transport is shutting down or temporarily unavailable.
    #[error("presence transport unavailable")]
    Unavailable,
}

impl PresenceSendError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unreachable => "PRESENCE_SEND_UNREACHABLE",
            Self::Unavailable => "PRESENCE_SEND_UNAVAILABLE",
        }
    }
}

/// Delivers presence signals to a conversation.
///
/// Sends are fire-and-forget from the typing state machines' point of view:
/// a returned error is logged by the caller and never rolls back or retries
/// timer state.
pub trait PresenceTransport {
    fn send_presence(&self, signal: &PresenceSignal) -> Result<(), PresenceSendError>;
}
