use crate::utils::error::{Result, TabuladorError};
use serde::Deserialize;

/// Optional TOML settings file so desktop installs don't need flags on every
/// run. Only the service parameters live here; the credential never does.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub api: Option<ApiSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiSection {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| TabuladorError::ConfigError {
            message: format!("invalid settings file: {e}"),
        })
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_api_section() {
        let config = FileConfig::from_str(
            r#"
[api]
endpoint = "http://localhost:8080/v1"
model = "gpt-4o-mini"
temperature = 0.2
timeout_secs = 120
"#,
        )
        .unwrap();

        let api = config.api.unwrap();
        assert_eq!(api.endpoint.as_deref(), Some("http://localhost:8080/v1"));
        assert_eq!(api.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(api.temperature, Some(0.2));
        assert_eq!(api.timeout_secs, Some(120));
    }

    #[test]
    fn missing_fields_stay_unset() {
        let config = FileConfig::from_str("[api]\nmodel = \"gpt-4o\"\n").unwrap();
        let api = config.api.unwrap();
        assert_eq!(api.model.as_deref(), Some("gpt-4o"));
        assert!(api.endpoint.is_none());
        assert!(api.temperature.is_none());
    }

    #[test]
    fn empty_file_is_valid() {
        let config = FileConfig::from_str("").unwrap();
        assert!(config.api.is_none());
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = FileConfig::from_str("[api\nmodel=").unwrap_err();
        assert!(matches!(err, TabuladorError::ConfigError { .. }));
    }

    #[test]
    fn absent_path_falls_back_to_defaults() {
        let config = FileConfig::load(None).unwrap();
        assert!(config.api.is_none());
    }
}
