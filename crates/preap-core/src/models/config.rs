//! Configuration structures for the PREAP pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{PreapError, Result};

/// Environment variable holding the analysis service endpoint.
pub const ENDPOINT_VAR: &str = "DOCUMENTINTELLIGENCE_ENDPOINT";

/// Environment variable holding the analysis service key.
pub const API_KEY_VAR: &str = "DOCUMENTINTELLIGENCE_API_KEY";

/// Main configuration for the preap pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreapConfig {
    /// Document analysis service configuration.
    pub analyzer: AnalyzerConfig,

    /// Folder sweep configuration.
    pub batch: BatchConfig,

    /// Upload server configuration.
    pub server: ServerConfig,

    /// Envelope output configuration.
    pub output: OutputConfig,
}

/// Document analysis service configuration.
///
/// The API key is never stored here; it comes from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Service endpoint (overridden by `DOCUMENTINTELLIGENCE_ENDPOINT`).
    pub endpoint: Option<String>,

    /// Prebuilt model to run.
    pub model_id: String,

    /// REST API version.
    pub api_version: String,

    /// Delay between result polls, in milliseconds.
    pub poll_interval_ms: u64,

    /// Maximum number of result polls before giving up.
    pub max_polls: u32,

    /// Per-request timeout, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model_id: "prebuilt-invoice".to_string(),
            api_version: "2024-11-30".to_string(),
            poll_interval_ms: 1000,
            max_polls: 120,
            request_timeout_secs: 120,
        }
    }
}

/// Endpoint and key for the analysis service.
#[derive(Clone)]
pub struct Credentials {
    pub endpoint: String,
    pub api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl AnalyzerConfig {
    /// Resolve credentials from the process environment.
    pub fn credentials(&self) -> Result<Credentials> {
        self.credentials_from(|name| std::env::var(name).ok())
    }

    /// Resolve credentials through `lookup`; the looked-up endpoint wins
    /// over the configured one. Every missing variable is reported.
    pub fn credentials_from(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<Credentials> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let endpoint = non_empty(ENDPOINT_VAR).or_else(|| self.endpoint.clone());
        let api_key = non_empty(API_KEY_VAR);

        match (endpoint, api_key) {
            (Some(endpoint), Some(api_key)) => Ok(Credentials { endpoint, api_key }),
            (endpoint, api_key) => {
                let mut missing = Vec::new();
                if endpoint.is_none() {
                    missing.push(ENDPOINT_VAR);
                }
                if api_key.is_none() {
                    missing.push(API_KEY_VAR);
                }
                Err(PreapError::Config(format!(
                    "missing required environment variables: {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

/// Folder sweep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Summary file written into the output directory.
    pub summary_file: String,

    /// Skip inputs whose envelope already exists.
    pub skip_existing: bool,

    /// File pattern matched inside the input directory.
    pub pattern: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            summary_file: "processing_summary.json".to_string(),
            skip_existing: true,
            pattern: "*.pdf".to_string(),
        }
    }
}

/// Upload server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub addr: String,

    /// Directory uploaded files are stored in.
    pub upload_dir: PathBuf,

    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: usize,

    /// Origins allowed by CORS.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8000".to_string(),
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: 10 * 1024 * 1024,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
        }
    }
}

/// Envelope output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Pretty-print JSON written to stdout.
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl PreapConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PreapConfig::default();
        assert_eq!(config.analyzer.model_id, "prebuilt-invoice");
        assert_eq!(config.batch.summary_file, "processing_summary.json");
        assert_eq!(config.server.max_upload_bytes, 10 * 1024 * 1024);
        assert!(config.output.pretty);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: PreapConfig =
            serde_json::from_str(r#"{ "server": { "addr": "127.0.0.1:9000" } }"#).unwrap();
        assert_eq!(config.server.addr, "127.0.0.1:9000");
        assert_eq!(config.server.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.analyzer.api_version, "2024-11-30");
    }

    #[test]
    fn test_credentials_env_endpoint_wins() {
        let config = AnalyzerConfig {
            endpoint: Some("https://configured.example".into()),
            ..Default::default()
        };
        let creds = config
            .credentials_from(env(&[
                (ENDPOINT_VAR, "https://env.example"),
                (API_KEY_VAR, "secret"),
            ]))
            .unwrap();
        assert_eq!(creds.endpoint, "https://env.example");
        assert!(!format!("{creds:?}").contains("secret"));

        let creds = config.credentials_from(env(&[(API_KEY_VAR, "secret")])).unwrap();
        assert_eq!(creds.endpoint, "https://configured.example");
    }

    #[test]
    fn test_credentials_report_all_missing() {
        let err = AnalyzerConfig::default()
            .credentials_from(env(&[(API_KEY_VAR, "  ")]))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains(ENDPOINT_VAR));
        assert!(message.contains(API_KEY_VAR));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = PreapConfig::default();
        config.batch.skip_existing = false;
        config.save(&path).unwrap();

        let loaded = PreapConfig::from_file(&path).unwrap();
        assert!(!loaded.batch.skip_existing);
    }
}
