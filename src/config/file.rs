//! File-based configuration loading
//!
//! Loads optional client overrides (regions, model, default generation options) from a JSON file

use super::settings::Settings;
use crate::models::GenerationOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Client configuration loaded from JSON file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientFile {
    /// Project identifier
    #[serde(rename = "projectId", default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Publisher model name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Endpoint base, may contain `{region}`
    #[serde(rename = "baseUrl", default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Regions in fallback order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<String>,

    /// Default generation options layered over the built-in defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<GenerationOptions>,
}

impl ClientFile {
    /// Load configuration from JSON file
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading client configuration from: {:?}", path);

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let file: ClientFile = serde_json::from_str(&content)
            .with_context(|| "Failed to parse config JSON")?;

        file.validate()?;

        debug!("Loaded {} region overrides", file.regions.len());
        Ok(file)
    }

    /// Candidate locations, in search order:
    /// 1. ~/.config/vertex-failover/client.json
    /// 2. ./vertex-failover.json
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("vertex-failover").join("client.json"));
        }
        paths.push(PathBuf::from("vertex-failover.json"));
        paths
    }

    /// Load from the first default location that exists.
    ///
    /// The file is optional; `Ok(None)` means none was found.
    pub fn load_default() -> Result<Option<Self>> {
        for path in Self::default_paths() {
            if path.exists() {
                return Self::load(&path).map(Some);
            }
        }
        Ok(None)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.regions.iter().any(|r| r.trim().is_empty()) {
            anyhow::bail!("Region names cannot be empty");
        }

        if let Some(model) = &self.model {
            if model.trim().is_empty() {
                anyhow::bail!("Model name cannot be empty");
            }
        }

        if let Some(base_url) = &self.base_url {
            if !base_url.starts_with("http") {
                anyhow::bail!("Invalid base URL: {}", base_url);
            }
        }

        if let Some(generation) = &self.generation {
            if let Some(temperature) = generation.temperature {
                if !(0.0..=2.0).contains(&temperature) {
                    anyhow::bail!("Temperature must be between 0 and 2, got {}", temperature);
                }
            }
            if let Some(top_p) = generation.top_p {
                if !(0.0..=1.0).contains(&top_p) {
                    anyhow::bail!("topP must be between 0 and 1, got {}", top_p);
                }
            }
        }

        Ok(())
    }

    /// Overlay file values on environment settings.
    ///
    /// The environment always wins: a file value is used only for fields the
    /// environment left unset (`GCP_PROJECT`, `VERTEX_MODEL`, `VERTEX_BASE_URL`,
    /// `VERTEX_REGIONS`).
    pub fn apply_to(&self, settings: &mut Settings) {
        if settings.vertex.project_id.is_none() {
            settings.vertex.project_id = self.project_id.clone();
        }
        if let Some(model) = &self.model {
            if !settings.explicit.model {
                settings.vertex.model = model.clone();
            }
        }
        if self.base_url.is_some() && !settings.explicit.base_url {
            settings.vertex.base_url = self.base_url.clone();
        }
        if !self.regions.is_empty() && !settings.explicit.regions {
            settings.vertex.regions = self.regions.clone();
        }
    }

    /// Default generation options with the file's values layered on top
    pub fn generation_defaults(&self) -> GenerationOptions {
        let defaults = GenerationOptions::defaults();
        match &self.generation {
            Some(generation) => generation.merge_over(&defaults),
            None => defaults,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_config() -> String {
        r#"{
            "projectId": "review-insights",
            "model": "gemini-1.5-pro-002",
            "regions": ["europe-west3", "us-east5"],
            "generation": {
                "temperature": 0.7,
                "responseMimeType": "application/json",
                "extra": {"topK": 32}
            }
        }"#
        .to_string()
    }

    #[test]
    fn test_load_config() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(create_test_config().as_bytes()).unwrap();

        let config = ClientFile::load(file.path()).unwrap();

        assert_eq!(config.project_id.as_deref(), Some("review-insights"));
        assert_eq!(config.regions, vec!["europe-west3", "us-east5"]);

        let generation = config.generation_defaults();
        assert_eq!(generation.temperature, Some(0.7));
        assert_eq!(generation.max_output_tokens, Some(8192));
        assert_eq!(generation.extra["topK"], 32);
    }

    #[test]
    fn test_apply_to_settings() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(create_test_config().as_bytes()).unwrap();
        let config = ClientFile::load(file.path()).unwrap();

        let mut settings = Settings::default();
        settings.vertex.project_id = Some("from-env".to_string());
        config.apply_to(&mut settings);

        assert_eq!(settings.vertex.project_id.as_deref(), Some("from-env"));
        assert_eq!(settings.vertex.model, "gemini-1.5-pro-002");
        assert_eq!(settings.vertex.regions.len(), 2);
    }

    #[test]
    fn test_environment_values_beat_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(create_test_config().as_bytes()).unwrap();
        let config = ClientFile::load(file.path()).unwrap();

        let mut settings = Settings::default();
        settings.vertex.model = "gemini-1.5-flash-002".to_string();
        settings.vertex.regions = vec!["asia-south1".to_string()];
        settings.explicit.model = true;
        settings.explicit.regions = true;
        config.apply_to(&mut settings);

        assert_eq!(settings.vertex.model, "gemini-1.5-flash-002");
        assert_eq!(settings.vertex.regions, vec!["asia-south1"]);
        assert_eq!(settings.vertex.project_id.as_deref(), Some("review-insights"));
    }

    #[test]
    fn test_validation_invalid_temperature() {
        let config_str = r#"{"generation": {"temperature": 5.0}}"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(config_str.as_bytes()).unwrap();

        assert!(ClientFile::load(file.path()).is_err());
    }

    #[test]
    fn test_validation_blank_region() {
        let config_str = r#"{"regions": ["us-east5", " "]}"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(config_str.as_bytes()).unwrap();

        assert!(ClientFile::load(file.path()).is_err());
    }
}
