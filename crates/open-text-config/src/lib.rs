use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Overrides the default config location. Shell variables and `~` are expanded.
pub const CONFIG_PATH_ENV: &str = "OPEN_TEXT_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value for `{field}` in {config_path}: {reason}")]
    InvalidValue {
        config_path: PathBuf,
        field: &'static str,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeConfig {
    /// Narrowest width in pixels an image or table can be dragged to.
    pub node_min_width: f64,
    /// Narrowest width in pixels a table column can be dragged to.
    pub column_min_width: f64,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            node_min_width: 50.0,
            column_min_width: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub default_rows: usize,
    pub default_cols: usize,
    /// Inline style given to every cell the editor creates.
    pub cell_style: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            default_rows: 3,
            default_cols: 3,
            cell_style: "border: 1px solid #d1d5db; padding: 8px; min-width: 30px;".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub placeholder: String,
    pub resize: ResizeConfig,
    pub table: TableConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            placeholder: "Start typing...".to_string(),
            resize: ResizeConfig::default(),
            table: TableConfig::default(),
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;
        config.validate(config_path)?;

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    /// `$OPEN_TEXT_CONFIG` if set, otherwise `~/.config/open-text-editor/config.toml`.
    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            return Self::expand_path(&path).unwrap_or(path);
        }
        let config_dir = shellexpand::tilde("~/.config/open-text-editor");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }

    fn validate(&self, config_path: &Path) -> Result<(), ConfigError> {
        let invalid = |field, reason| ConfigError::InvalidValue {
            config_path: config_path.to_path_buf(),
            field,
            reason,
        };
        if self.resize.node_min_width.is_nan() || self.resize.node_min_width <= 0.0 {
            return Err(invalid("resize.node_min_width", "must be greater than zero"));
        }
        if self.resize.column_min_width.is_nan() || self.resize.column_min_width <= 0.0 {
            return Err(invalid("resize.column_min_width", "must be greater than zero"));
        }
        if self.table.default_rows == 0 {
            return Err(invalid("table.default_rows", "must be at least 1"));
        }
        if self.table.default_cols == 0 {
            return Err(invalid("table.default_cols", "must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        // Should not contain tilde anymore
        assert!(!path_str.starts_with('~'));
        if env::var_os(CONFIG_PATH_ENV).is_none() {
            assert!(path_str.ends_with(".config/open-text-editor/config.toml"));
        }
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut original = Config::default();
        original.table.default_cols = 5;
        original.resize.node_min_width = 80.0;

        let toml_str = toml::to_string(&original).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config_content = r#"
placeholder = "Write something"

[table]
default_rows = 2
"#;

        let config: Config = toml::from_str(config_content).unwrap();

        assert_eq!(config.placeholder, "Write something");
        assert_eq!(config.table.default_rows, 2);
        assert_eq!(config.table.default_cols, 3);
        assert_eq!(config.resize, ResizeConfig::default());
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test/path");
        let expanded = Config::expand_path(&path);

        assert!(expanded.is_some());
        let expanded = expanded.unwrap();
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_with_env_var() {
        unsafe {
            env::set_var("OPEN_TEXT_TEST_VAR", "/test/env/path");
        }

        let path = PathBuf::from("$OPEN_TEXT_TEST_VAR/config.toml");
        let expanded = Config::expand_path(&path);

        assert_eq!(expanded, Some(PathBuf::from("/test/env/path/config.toml")));

        unsafe {
            env::remove_var("OPEN_TEXT_TEST_VAR");
        }
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested/config.toml");
        let mut test_config = Config::default();
        test_config.table.cell_style = "padding: 4px;".to_string();

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }

    #[test]
    fn test_malformed_config_is_a_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "placeholder = [").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();

        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
    }

    #[test]
    fn test_zero_floor_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "[resize]\ncolumn_min_width = 0\n").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();

        match err {
            ConfigError::InvalidValue { field, .. } => {
                assert_eq!(field, "resize.column_min_width")
            }
            other => panic!("expected invalid value, got {other}"),
        }
    }

    #[test]
    fn test_zero_table_size_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "[table]\ndefault_cols = 0\n").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();

        assert!(err.to_string().contains("table.default_cols"));
    }
}
