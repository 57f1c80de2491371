#[cfg(test)]
use crate::infra::{config::AppConfig, contracts::ConfigAdapter, error::AppError};

#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct StubConfigAdapter {
    pub config: AppConfig,
}

#[cfg(test)]
impl ConfigAdapter for StubConfigAdapter {
    fn load(&self) -> Result<AppConfig, AppError> {
        Ok(self.config.clone())
    }

    fn source(&self) -> String {
        "stub".to_owned()
    }
}
