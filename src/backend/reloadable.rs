use std::sync::{Arc, RwLock};

use anyhow::{anyhow, Result};
use log::{info, warn};

use crate::settings::BackendSettings;

use super::{GeminiClient, GenerateContentRequest, GenerateContentResponse, GenerativeBackend, ModelRole};

/// Gemini client that can be rebuilt when settings change.
///
/// Starts empty when no API key is configured; requests then fail and the
/// vision layer falls back to its placeholder content.
#[derive(Default)]
pub struct ReloadableGemini {
    current: RwLock<Option<Arc<GeminiClient>>>,
}

impl ReloadableGemini {
    pub fn from_settings(settings: &BackendSettings) -> Self {
        let backend = Self::default();
        backend.reload(settings);
        backend
    }

    /// Rebuilds the client. Returns whether a usable client is now installed.
    pub fn reload(&self, settings: &BackendSettings) -> bool {
        let next = match settings.resolve().and_then(|resolved| GeminiClient::new(&resolved)) {
            Ok(client) => {
                info!(
                    "Gemini client ready (analysis: {}, edit: {})",
                    client.model_for(ModelRole::Vision),
                    client.model_for(ModelRole::ImageEdit)
                );
                Some(Arc::new(client))
            }
            Err(err) => {
                warn!("Gemini client unavailable: {err:#}");
                None
            }
        };
        let ready = next.is_some();
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
        ready
    }

    pub fn is_configured(&self) -> bool {
        self.client().is_some()
    }

    fn client(&self) -> Option<Arc<GeminiClient>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl GenerativeBackend for ReloadableGemini {
    async fn generate(
        &self,
        role: ModelRole,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let client = self
            .client()
            .ok_or_else(|| anyhow!("no Gemini API key configured"))?;
        client.generate(role, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_backend_fails_requests() {
        let backend = ReloadableGemini::default();
        assert!(!backend.is_configured());
        let err = backend
            .generate(
                ModelRole::Vision,
                GenerateContentRequest::media_with_instruction("image/jpeg", "AAAA", "hi"),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn reload_installs_client_with_stored_key() {
        let backend = ReloadableGemini::default();
        let settings = BackendSettings {
            api_key: Some("stored-key".into()),
            ..BackendSettings::default()
        };
        assert!(backend.reload(&settings));
        assert!(backend.is_configured());
    }
}
