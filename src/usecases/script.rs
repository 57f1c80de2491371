//! Line-oriented event script understood by the driver binary.
//!
//! ```text
//! type <conversation>            local keystroke
//! sent <conversation>            local message sent
//! started <sender> <device> [conversation]
//! stopped <sender> <device>
//! message <sender> <device>      ordinary message received
//! query <sender>                 is the sender shown typing?
//! who <conversation>             senders typing in a conversation
//! wait <millis>
//! enable | disable
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::time::Duration;

use thiserror::Error;

use crate::domain::ids::{ConversationId, EndpointId, IdError, SenderId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCommand {
    /// The conversation id stays raw; the registry validates and reports it.
    Type(String),
    Sent(String),
    Started {
        endpoint: EndpointId,
        conversation: Option<ConversationId>,
    },
    Stopped(EndpointId),
    Message(EndpointId),
    Query(SenderId),
    Who(ConversationId),
    Wait(Duration),
    Enable,
    Disable,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("`{command}` expects {expected}")]
    Arity {
        command: &'static str,
        expected: &'static str,
    },
    #[error("invalid wait duration `{0}` (expected milliseconds)")]
    InvalidWait(String),
    #[error(transparent)]
    InvalidId(#[from] IdError),
}

impl ScriptError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownCommand(_) => "SCRIPT_UNKNOWN_COMMAND",
            Self::Arity { .. } => "SCRIPT_ARITY",
            Self::InvalidWait(_) => "SCRIPT_INVALID_WAIT",
            Self::InvalidId(error) => error.code(),
        }
    }
}

/// Parses one script line. `Ok(None)` means there is nothing to execute.
pub fn parse_line(line: &str) -> Result<Option<ScriptCommand>, ScriptError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let parsed = match (command, args.as_slice()) {
        ("type", [conversation]) => ScriptCommand::Type((*conversation).to_owned()),
        ("type", _) => return Err(arity("type", "<conversation>")),
        ("sent", [conversation]) => ScriptCommand::Sent((*conversation).to_owned()),
        ("sent", _) => return Err(arity("sent", "<conversation>")),
        ("started", [sender, device]) => ScriptCommand::Started {
            endpoint: EndpointId::parse(sender, device)?,
            conversation: None,
        },
        ("started", [sender, device, conversation]) => ScriptCommand::Started {
            endpoint: EndpointId::parse(sender, device)?,
            conversation: Some(ConversationId::parse(conversation)?),
        },
        ("started", _) => {
            return Err(arity("started", "<sender> <device> [conversation]"));
        }
        ("stopped", [sender, device]) => {
            ScriptCommand::Stopped(EndpointId::parse(sender, device)?)
        }
        ("stopped", _) => return Err(arity("stopped", "<sender> <device>")),
        ("message", [sender, device]) => {
            ScriptCommand::Message(EndpointId::parse(sender, device)?)
        }
        ("message", _) => return Err(arity("message", "<sender> <device>")),
        ("query", [sender]) => ScriptCommand::Query(SenderId::parse(sender)?),
        ("query", _) => return Err(arity("query", "<sender>")),
        ("who", [conversation]) => ScriptCommand::Who(ConversationId::parse(conversation)?),
        ("who", _) => return Err(arity("who", "<conversation>")),
        ("wait", [millis]) => ScriptCommand::Wait(parse_wait(millis)?),
        ("wait", _) => return Err(arity("wait", "<millis>")),
        ("enable", []) => ScriptCommand::Enable,
        ("disable", []) => ScriptCommand::Disable,
        ("enable" | "disable", _) => {
            return Err(ScriptError::Arity {
                command: if command == "enable" { "enable" } else { "disable" },
                expected: "no arguments",
            });
        }
        (other, _) => return Err(ScriptError::UnknownCommand(other.to_owned())),
    };

    Ok(Some(parsed))
}

fn arity(command: &'static str, expected: &'static str) -> ScriptError {
    ScriptError::Arity { command, expected }
}

fn parse_wait(raw: &str) -> Result<Duration, ScriptError> {
    raw.parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ScriptError::InvalidWait(raw.to_owned()))
}
