//! Configuration Loader
//!
//! Конфигурация контейнера собирается из нескольких источников:
//! - значения по умолчанию
//! - TOML файл (явный путь или поиск по стандартным директориям)
//! - переменные окружения с префиксом `INJECTOR_`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Имя конфигурационного файла при поиске по директориям
pub const CONFIG_FILE_NAME: &str = "injector.toml";

/// Конфигурация DI контейнера
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectorConfig {
    /// Имя контейнера, используется в диагностике
    pub name: String,
    /// Создавать eager singleton'ы сразу после регистрации module group
    pub eager_instantiation: bool,
    /// Уровень логирования
    pub log_level: String,
    /// JSON логи
    pub json_logs: bool,
    /// Неизвестные переменные окружения с нашим префиксом
    #[serde(skip)]
    pub env_overrides: HashMap<String, String>,
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            eager_instantiation: true,
            log_level: "info".to_string(),
            json_logs: false,
            env_overrides: HashMap::new(),
        }
    }
}

impl InjectorConfig {
    /// Конфигурация для тестов: без eager создания, подробные логи
    pub fn for_tests(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            eager_instantiation: false,
            log_level: "debug".to_string(),
            ..Self::default()
        }
    }
}

/// Configuration loader with support for TOML files and environment variables
pub struct ConfigLoader {
    /// Configuration search paths
    search_paths: Vec<PathBuf>,
    /// Environment variable prefix
    env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader with default settings
    pub fn new() -> Self {
        let mut search_paths = Vec::new();

        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join("injector"));
        }
        search_paths.push(PathBuf::from("."));

        Self {
            search_paths,
            env_prefix: "INJECTOR".to_string(),
        }
    }

    pub fn add_search_path<P: AsRef<Path>>(&mut self, path: P) -> &mut Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn env_prefix<S: Into<String>>(&mut self, prefix: S) -> &mut Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Defaults, then the first config file found on the search paths, then environment
    pub fn load(&self) -> Result<InjectorConfig> {
        let mut config = match self.find_configuration_file() {
            Some(path) => self.load_from_file(&path)?,
            None => InjectorConfig::default(),
        };

        self.apply_environment_variables(&mut config)?;
        Ok(config)
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<InjectorConfig> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;

        debug!("Loading injector configuration from {}", path.display());
        self.load_from_toml(&content)
            .with_context(|| format!("Invalid configuration file {}", path.display()))
    }

    pub fn load_from_toml(&self, content: &str) -> Result<InjectorConfig> {
        let config: InjectorConfig = toml::from_str(content)?;
        Ok(config)
    }

    fn find_configuration_file(&self) -> Option<PathBuf> {
        self.search_paths
            .iter()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find(|candidate| candidate.is_file())
    }

    /// Apply environment variables to configuration
    pub fn apply_environment_variables(&self, config: &mut InjectorConfig) -> Result<()> {
        let prefix = format!("{}_", self.env_prefix);

        for (key, value) in env::vars() {
            if !key.starts_with(&prefix) {
                continue;
            }

            let config_key = key.trim_start_matches(&prefix);
            self.apply_env_var(config, config_key, &value)?;
        }

        Ok(())
    }

    fn apply_env_var(&self, config: &mut InjectorConfig, key: &str, value: &str) -> Result<()> {
        match key.to_uppercase().as_str() {
            "NAME" => {
                config.name = value.to_string();
            }
            "EAGER" => {
                config.eager_instantiation = value
                    .parse()
                    .with_context(|| format!("INJECTOR_EAGER expects true/false, got '{value}'"))?;
            }
            "LOG_LEVEL" => {
                config.log_level = value.to_lowercase();
            }
            "JSON_LOGS" => {
                config.json_logs = value
                    .parse()
                    .with_context(|| format!("INJECTOR_JSON_LOGS expects true/false, got '{value}'"))?;
            }
            _ => {
                config
                    .env_overrides
                    .insert(key.to_string(), value.to_string());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_toml() -> Result<()> {
        let loader = ConfigLoader::new();

        let config = loader.load_from_toml(
            r#"
            name = "rot13"
            eager_instantiation = false
            log_level = "debug"
            "#,
        )?;

        assert_eq!(config.name, "rot13");
        assert!(!config.eager_instantiation);
        assert_eq!(config.log_level, "debug");
        assert!(!config.json_logs);

        Ok(())
    }

    #[test]
    fn test_missing_fields_use_defaults() -> Result<()> {
        let config = ConfigLoader::new().load_from_toml("name = \"partial\"")?;
        assert_eq!(config.name, "partial");
        assert!(config.eager_instantiation);
        assert_eq!(config.log_level, "info");
        Ok(())
    }

    #[test]
    fn test_load_from_search_path() -> Result<()> {
        let dir = TempDir::new()?;
        let mut file = fs::File::create(dir.path().join(CONFIG_FILE_NAME))?;
        writeln!(file, "name = \"from_file\"")?;

        let mut loader = ConfigLoader {
            search_paths: Vec::new(),
            env_prefix: String::new(),
        };
        loader.env_prefix("INJECTOR_SEARCH_TEST");
        loader.add_search_path(dir.path());

        let config = loader.load()?;
        assert_eq!(config.name, "from_file");

        Ok(())
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "eager_instantiation = \"maybe\"").expect("write config");

        let err = ConfigLoader::new()
            .load_from_file(&path)
            .expect_err("string is not a bool");
        assert!(format!("{err:#}").contains(CONFIG_FILE_NAME));
    }

    #[test]
    #[serial]
    fn test_environment_variables() -> Result<()> {
        env::set_var("INJECTOR_NAME", "env_container");
        env::set_var("INJECTOR_EAGER", "false");
        env::set_var("INJECTOR_LOG_LEVEL", "TRACE");
        env::set_var("INJECTOR_SOMETHING_ELSE", "kept");

        let loader = ConfigLoader::new();
        let mut config = InjectorConfig::default();
        let result = loader.apply_environment_variables(&mut config);

        env::remove_var("INJECTOR_NAME");
        env::remove_var("INJECTOR_EAGER");
        env::remove_var("INJECTOR_LOG_LEVEL");
        env::remove_var("INJECTOR_SOMETHING_ELSE");

        result?;
        assert_eq!(config.name, "env_container");
        assert!(!config.eager_instantiation);
        assert_eq!(config.log_level, "trace");
        assert_eq!(
            config.env_overrides.get("SOMETHING_ELSE").map(String::as_str),
            Some("kept")
        );

        Ok(())
    }

    #[test]
    #[serial]
    fn test_invalid_eager_env_is_an_error() {
        env::set_var("INJECTOR_EAGER", "sometimes");

        let mut config = InjectorConfig::default();
        let result = ConfigLoader::new().apply_environment_variables(&mut config);

        env::remove_var("INJECTOR_EAGER");
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_invalid_json_logs_env_is_an_error() {
        env::set_var("INJECTOR_JSON_LOGS", "yes please");

        let mut config = InjectorConfig::default();
        let result = ConfigLoader::new().apply_environment_variables(&mut config);

        env::remove_var("INJECTOR_JSON_LOGS");
        let err = result.expect_err("not a bool");
        assert!(format!("{err:#}").contains("INJECTOR_JSON_LOGS"));
        assert!(!config.json_logs);
    }
}
