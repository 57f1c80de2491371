use crate::domain::ids::{ConversationId, EndpointId};

/// Local composition events for one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalInput {
    InputTyped,
    MessageSent,
}

/// Events received from one remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEvent {
    TypingStarted { conversation: Option<ConversationId> },
    TypingStopped,
    OrdinaryMessage,
}

impl RemoteEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TypingStarted { .. } => "typing_started",
            Self::TypingStopped => "typing_stopped",
            Self::OrdinaryMessage => "ordinary_message",
        }
    }
}

/// Broadcast once per real typing transition of a remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingStateChanged {
    pub endpoint: EndpointId,
    pub is_typing: bool,
}
