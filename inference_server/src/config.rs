use config::{Config, ConfigError, Environment, File, FileFormat};
use feature_processing::FEATURE_NAMES;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
    pub model_type: String,
    pub label_output: String,
    pub probability_output: String,
    pub intra_threads: usize,
    /// Feature names the model was trained on, checked against the fixed
    /// feature order at startup when present.
    pub expected_features: Option<Vec<String>>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("model/random_forest_model.onnx"),
            model_type: "RandomForestClassifier".to_string(),
            label_output: "output_label".to_string(),
            probability_output: "output_probability".to_string(),
            intra_threads: 1,
            expected_features: None,
        }
    }
}

impl ModelConfig {
    pub fn check_feature_order(&self) -> Result<(), String> {
        match &self.expected_features {
            Some(expected) if !expected.iter().map(String::as_str).eq(FEATURE_NAMES) => Err(format!(
                "model expects features {:?}, pipeline produces {:?}",
                expected, FEATURE_NAMES
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model: ModelConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model: ModelConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads `server.toml` if present, then `SERVER__*` environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Path::new("server.toml"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let cfg = Config::builder()
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("SERVER").separator("__"))
            .build()?;
        cfg.try_deserialize()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let cfg = ServerConfig::load(Path::new("/nonexistent/server.toml")).unwrap();
        assert_eq!(cfg.bind_address(), "0.0.0.0:8000");
        assert_eq!(cfg.model.probability_output, "output_probability");
    }

    #[test]
    fn matching_feature_list_passes() {
        let model = ModelConfig {
            expected_features: Some(FEATURE_NAMES.iter().map(|s| s.to_string()).collect()),
            ..ModelConfig::default()
        };
        assert!(model.check_feature_order().is_ok());
        assert!(ModelConfig::default().check_feature_order().is_ok());
    }

    #[test]
    fn reordered_feature_list_is_rejected() {
        let mut names: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        names.swap(0, 1);
        let model = ModelConfig {
            expected_features: Some(names),
            ..ModelConfig::default()
        };
        assert!(model.check_feature_order().is_err());
    }
}
