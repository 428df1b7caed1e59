use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";
const DEFAULT_SESSION_CHECK_TIMEOUT_MS: u64 = 5_000;

/// Client configuration, loadable from a camelCase JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreConfig {
    /// Directory holding `preferences.json`
    pub data_dir: PathBuf,

    pub api_base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Transport timeout for mutation calls. None = reqwest default (no timeout).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,

    #[serde(default = "default_session_check_timeout_ms")]
    pub session_check_timeout_ms: u64,

    /// Offset applied when formatting chat display times
    #[serde(default)]
    pub display_utc_offset_minutes: i32,
}

fn default_session_check_timeout_ms() -> u64 {
    DEFAULT_SESSION_CHECK_TIMEOUT_MS
}

impl CoreConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_token: None,
            request_timeout_ms: None,
            session_check_timeout_ms: DEFAULT_SESSION_CHECK_TIMEOUT_MS,
            display_utc_offset_minutes: 0,
        }
    }

    /// Load config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to deserialize config")
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir.join("preferences.json")
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn session_check_timeout(&self) -> Duration {
        Duration::from_millis(self.session_check_timeout_ms)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .map(|dir| dir.join("huddle"))
            .unwrap_or_else(|| PathBuf::from("huddle_data"));
        Self::new(data_dir)
    }
}
