use serde::Deserialize;

use crate::infra::config::{AppConfig, LogConfig, ServiceConfig, TypingConfig};

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub logging: Option<FileLogConfig>,
    pub typing: Option<FileTypingConfig>,
    pub service: Option<FileServiceConfig>,
}

impl FileConfig {
    pub fn merge_into(self, config: &mut AppConfig) {
        if let Some(logging) = self.logging {
            logging.merge_into(&mut config.logging);
        }

        if let Some(typing) = self.typing {
            typing.merge_into(&mut config.typing);
        }

        if let Some(service) = self.service {
            service.merge_into(&mut config.service);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLogConfig {
    pub level: Option<String>,
}

impl FileLogConfig {
    fn merge_into(self, config: &mut LogConfig) {
        if let Some(level) = self.level {
            config.level = level;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileTypingConfig {
    pub enabled: Option<bool>,
    pub pause_ms: Option<u64>,
    pub refresh_ms: Option<u64>,
    pub display_ms: Option<u64>,
    pub local_sender: Option<String>,
}

impl FileTypingConfig {
    fn merge_into(self, config: &mut TypingConfig) {
        if let Some(enabled) = self.enabled {
            config.enabled = enabled;
        }

        if let Some(pause_ms) = self.pause_ms {
            config.pause_ms = pause_ms;
        }

        if let Some(refresh_ms) = self.refresh_ms {
            config.refresh_ms = refresh_ms;
        }

        if let Some(display_ms) = self.display_ms {
            config.display_ms = display_ms;
        }

        if let Some(local_sender) = self.local_sender {
            config.local_sender = Some(local_sender);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileServiceConfig {
    pub mailbox_capacity: Option<usize>,
}

impl FileServiceConfig {
    fn merge_into(self, config: &mut ServiceConfig) {
        if let Some(capacity) = self.mailbox_capacity {
            config.mailbox_capacity = capacity;
        }
    }
}
