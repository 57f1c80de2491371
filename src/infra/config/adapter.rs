use std::path::{Path, PathBuf};

use crate::infra::{
    config::{load, loader::resolve_path, AppConfig},
    contracts::ConfigAdapter,
    error::AppError,
};

/// Loads configuration from a TOML file, falling back to defaults.
#[derive(Debug, Clone, Default)]
pub struct FileConfigAdapter {
    path: Option<PathBuf>,
}

impl FileConfigAdapter {
    pub fn new(path: Option<&Path>) -> Self {
        Self {
            path: path.map(Path::to_path_buf),
        }
    }
}

impl ConfigAdapter for FileConfigAdapter {
    fn load(&self) -> Result<AppConfig, AppError> {
        load(self.path.as_deref())
    }

    fn source(&self) -> String {
        resolve_path(self.path.as_deref()).display().to_string()
    }
}
