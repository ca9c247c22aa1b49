use crate::{
    domain::{Environment, Person},
    ports::{AppConfig, ConfigError, ConfigResult, ConfigStore},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    environment: Option<String>,
    store_path: Option<PathBuf>,
    current_user: Option<String>,
}

pub struct FileConfigStore {
    config_path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> ConfigResult<Self> {
        let config_dir = Self::app_dir()?;
        Ok(Self::with_path(config_dir.join("config.json")))
    }

    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Directory holding the config file and, by default, the local store.
    pub fn app_dir() -> ConfigResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            ConfigError::ReadError("Cannot determine config directory".to_string())
        })?;
        Ok(config_dir.join("maint"))
    }

    async fn ensure_config_dir(&self) -> ConfigResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn load_config(&self) -> ConfigResult<AppConfig> {
        let config_file = match fs::read_to_string(&self.config_path).await {
            Ok(content) => serde_json::from_str::<ConfigFile>(&content)
                .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?,
            // No config yet, start from defaults
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ConfigFile::default(),
            Err(e) => return Err(ConfigError::ReadError(e.to_string())),
        };

        let environment = match config_file.environment {
            Some(env) => env
                .parse::<Environment>()
                .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?,
            None => Environment::default(),
        };

        let current_user = config_file
            .current_user
            .filter(|user| !user.trim().is_empty())
            .map(Person);

        Ok(AppConfig {
            environment,
            store_path: config_file.store_path,
            current_user,
        })
    }

    async fn save_config(&self, config: &AppConfig) -> ConfigResult<()> {
        self.ensure_config_dir().await?;

        let config_file = ConfigFile {
            environment: Some(config.environment.to_string()),
            store_path: config.store_path.clone(),
            current_user: config.current_user.as_ref().map(|p| p.0.clone()),
        };

        let content = serde_json::to_string_pretty(&config_file)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        fs::write(&self.config_path, content)
            .await
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        tracing::debug!("Saved configuration to {}", self.config_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("maint").join("config.json"));

        let config = AppConfig {
            environment: Environment::Production,
            store_path: Some(dir.path().join("store.json")),
            current_user: Some(Person::from("carla")),
        };
        store.save_config(&config).await.unwrap();

        let loaded = store.load_config().await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));

        let loaded = store.load_config().await.unwrap();
        assert_eq!(loaded, AppConfig::default());
    }

    #[tokio::test]
    async fn test_unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, [0xff, 0xfe, 0x00]).await.unwrap();

        let err = FileConfigStore::with_path(path.clone())
            .load_config()
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::ReadError(_)));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), vec![0xff, 0xfe, 0x00]);
    }

    #[tokio::test]
    async fn test_rejects_unknown_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, r#"{"environment": "staging"}"#)
            .await
            .unwrap();

        let err = FileConfigStore::with_path(path).load_config().await.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFormat(_)));
    }
}
