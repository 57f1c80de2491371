use crate::{infra::config::AppConfig, usecases::typing_registry::RegistrySettings};

#[derive(Debug)]
pub struct AppContext {
    pub config: AppConfig,
    pub settings: RegistrySettings,
}

impl AppContext {
    pub fn new(config: AppConfig, settings: RegistrySettings) -> Self {
        Self { config, settings }
    }
}
