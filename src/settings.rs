use std::{fs, path::PathBuf, sync::RwLock};

use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_ANALYSIS_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_EDIT_MODEL: &str = "gemini-2.5-flash-image";

const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];
const ANALYSIS_MODEL_ENV: &str = "NANOLENS_ANALYSIS_MODEL";
const EDIT_MODEL_ENV: &str = "NANOLENS_EDIT_MODEL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackendSettings {
    /// Stored key; the environment wins when both are present.
    pub api_key: Option<String>,
    pub base_url: String,
    pub analysis_model: String,
    pub edit_model: String,
    /// Requests run without a deadline unless this is set.
    pub timeout_secs: Option<u64>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.into(),
            analysis_model: DEFAULT_ANALYSIS_MODEL.into(),
            edit_model: DEFAULT_EDIT_MODEL.into(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptureSettings {
    pub jpeg_quality: u8,
    /// Ceiling applied on top of whatever zoom the camera reports.
    pub max_zoom: f32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            jpeg_quality: 90,
            max_zoom: 10.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserSettings {
    pub backend: BackendSettings,
    pub capture: CaptureSettings,
}

/// Backend settings after environment overrides, ready for the HTTP client.
#[derive(Debug, Clone)]
pub struct ResolvedBackend {
    pub api_key: String,
    pub base_url: String,
    pub analysis_model: String,
    pub edit_model: String,
    pub timeout_secs: Option<u64>,
}

impl BackendSettings {
    pub fn resolve(&self) -> Result<ResolvedBackend> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    fn resolve_with(&self, env: impl Fn(&str) -> Option<String>) -> Result<ResolvedBackend> {
        let api_key = API_KEY_ENV_VARS
            .iter()
            .find_map(|name| env(name))
            .or_else(|| self.api_key.clone())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                anyhow!("no Gemini API key configured; set GEMINI_API_KEY or save one in settings")
            })?;

        Ok(ResolvedBackend {
            api_key,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            analysis_model: env(ANALYSIS_MODEL_ENV).unwrap_or_else(|| self.analysis_model.clone()),
            edit_model: env(EDIT_MODEL_ENV).unwrap_or_else(|| self.edit_model.clone()),
            timeout_secs: self.timeout_secs,
        })
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring unreadable settings file {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn snapshot(&self) -> UserSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update(&self, settings: UserSettings) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
