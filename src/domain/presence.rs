//! Presence-signal vocabulary shared with the transport collaborator.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::ids::ConversationId;

/// The two actions peers exchange to bracket a typing episode.
///
/// The labels `STARTED` and `STOPPED` are the externally visible vocabulary
/// and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresenceAction {
    Started,
    Stopped,
}

impl PresenceAction {
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Started => "STARTED",
            Self::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for PresenceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// A presence signal addressed to one conversation.
///
/// Constructed fresh for every send; never persisted or retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceSignal {
    #[serde(with = "conversation_as_str")]
    pub conversation: ConversationId,
    pub action: PresenceAction,
}

impl PresenceSignal {
    pub fn started(conversation: ConversationId) -> Self {
        Self {
            conversation,
            action: PresenceAction::Started,
        }
    }

    pub fn stopped(conversation: ConversationId) -> Self {
        Self {
            conversation,
            action: PresenceAction::Stopped,
        }
    }
}

mod conversation_as_str {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use crate::domain::ids::ConversationId;

    pub fn serialize<S: Serializer>(id: &ConversationId, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(id.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<ConversationId, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ConversationId::parse(&raw).map_err(D::Error::custom)
    }
}
