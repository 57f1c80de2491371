use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AppConfig {
    pub logging: LogConfig,
    pub typing: TypingConfig,
    pub service: ServiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypingConfig {
    pub enabled: bool,
    pub pause_ms: u64,
    pub refresh_ms: u64,
    pub display_ms: u64,
    /// Sender id of the local user; its linked devices are never shown typing.
    pub local_sender: Option<String>,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pause_ms: 5_000,
            refresh_ms: 10_000,
            display_ms: 15_000,
            local_sender: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceConfig {
    pub mailbox_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 256,
        }
    }
}
