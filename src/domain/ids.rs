//! Identity types for conversations and remote endpoints.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("conversation id must not be empty")]
    EmptyConversation,
    #[error("sender id must not be empty")]
    EmptySender,
    #[error("device id must not be empty")]
    EmptyDevice,
}

impl IdError {
    pub fn code(self) -> &'static str {
        match self {
            Self::EmptyConversation => "ID_EMPTY_CONVERSATION",
            Self::EmptySender => "ID_EMPTY_SENDER",
            Self::EmptyDevice => "ID_EMPTY_DEVICE",
        }
    }
}

/// Stable identifier of a conversation. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn parse(raw: &str) -> Result<Self, IdError> {
        non_empty(raw).map(Self).ok_or(IdError::EmptyConversation)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a remote participant, independent of the device they use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SenderId(String);

impl SenderId {
    pub fn parse(raw: &str) -> Result<Self, IdError> {
        non_empty(raw).map(Self).ok_or(IdError::EmptySender)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn parse(raw: &str) -> Result<Self, IdError> {
        non_empty(raw).map(Self).ok_or(IdError::EmptyDevice)
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One client instance of a remote sender.
///
/// Incoming typing state is tracked per endpoint because a sender may type
/// on several devices independently. Both parts are validated on
/// construction, so an `EndpointId` is always well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId {
    sender: SenderId,
    device: DeviceId,
}

impl EndpointId {
    pub fn new(sender: SenderId, device: DeviceId) -> Self {
        Self { sender, device }
    }

    pub fn parse(sender: &str, device: &str) -> Result<Self, IdError> {
        Ok(Self::new(SenderId::parse(sender)?, DeviceId::parse(device)?))
    }

    pub fn sender(&self) -> &SenderId {
        &self.sender
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.sender, self.device)
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}
