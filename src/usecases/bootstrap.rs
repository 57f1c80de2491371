use std::{path::Path, time::Duration};

use crate::{
    domain::{ids::SenderId, timings::TypingTimings},
    infra::{
        self,
        config::{FileConfigAdapter, TypingConfig},
        contracts::ConfigAdapter,
        error::AppError,
    },
    usecases::{context::AppContext, typing_registry::RegistrySettings},
};

const TYPING_DISPLAY_NOT_LONGER_THAN_REFRESH: &str = "TYPING_DISPLAY_NOT_LONGER_THAN_REFRESH";

pub fn bootstrap(config_path: Option<&Path>) -> Result<AppContext, AppError> {
    let adapter = FileConfigAdapter::new(config_path);
    let context = build_context(&adapter)?;
    infra::logging::init(&context.config.logging)?;

    tracing::debug!(source = adapter.source(), "configuration loaded");
    if !context.settings.timings.display_outlasts_refresh() {
        tracing::warn!(
            code = TYPING_DISPLAY_NOT_LONGER_THAN_REFRESH,
            refresh_ms = context.config.typing.refresh_ms,
            display_ms = context.config.typing.display_ms,
            "remote peers may see typing flicker off between refreshes"
        );
    }

    Ok(context)
}

fn build_context(adapter: &dyn ConfigAdapter) -> Result<AppContext, AppError> {
    let config = adapter.load()?;
    let settings = registry_settings(&config.typing)?;

    Ok(AppContext::new(config, settings))
}

pub fn registry_settings(config: &TypingConfig) -> Result<RegistrySettings, AppError> {
    let timings = TypingTimings {
        pause: positive_ms("typing.pause_ms", config.pause_ms)?,
        refresh: positive_ms("typing.refresh_ms", config.refresh_ms)?,
        display: positive_ms("typing.display_ms", config.display_ms)?,
    };

    let local_sender = config
        .local_sender
        .as_deref()
        .map(SenderId::parse)
        .transpose()
        .map_err(|error| AppError::ConfigInvalid {
            field: "typing.local_sender",
            details: error.to_string(),
        })?;

    Ok(RegistrySettings {
        timings,
        enabled: config.enabled,
        local_sender,
    })
}

fn positive_ms(field: &'static str, millis: u64) -> Result<Duration, AppError> {
    if millis == 0 {
        return Err(AppError::ConfigInvalid {
            field,
            details: "must be greater than zero".to_owned(),
        });
    }

    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{config::AppConfig, stubs::StubConfigAdapter};

    #[test]
    fn builds_context_with_default_settings() {
        let context =
            build_context(&StubConfigAdapter::default()).expect("context should build");

        assert_eq!(context.config, AppConfig::default());
        assert_eq!(context.settings, RegistrySettings::default());
    }

    #[test]
    fn maps_typing_config_into_registry_settings() {
        let config = TypingConfig {
            enabled: false,
            pause_ms: 1_000,
            refresh_ms: 2_000,
            display_ms: 3_000,
            local_sender: Some("me".to_owned()),
        };

        let settings = registry_settings(&config).expect("settings should map");

        assert!(!settings.enabled);
        assert_eq!(settings.timings.pause, Duration::from_secs(1));
        assert_eq!(settings.timings.refresh, Duration::from_secs(2));
        assert_eq!(settings.timings.display, Duration::from_secs(3));
        assert_eq!(
            settings.local_sender.as_ref().map(SenderId::as_str),
            Some("me")
        );
    }

    #[test]
    fn rejects_zero_windows() {
        let config = TypingConfig {
            refresh_ms: 0,
            ..TypingConfig::default()
        };

        let error = registry_settings(&config).expect_err("zero refresh must fail");

        assert!(matches!(
            error,
            AppError::ConfigInvalid {
                field: "typing.refresh_ms",
                ..
            }
        ));
    }

    #[test]
    fn rejects_blank_local_sender() {
        let mut adapter = StubConfigAdapter::default();
        adapter.config.typing.local_sender = Some("  ".to_owned());

        let error = build_context(&adapter).expect_err("blank sender must fail");

        assert!(matches!(
            error,
            AppError::ConfigInvalid {
                field: "typing.local_sender",
                ..
            }
        ));
    }
}
