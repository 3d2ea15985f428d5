use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use reqwest::Client;

use crate::settings::ResolvedBackend;

use super::{GenerateContentRequest, GenerateContentResponse, GenerativeBackend, ModelRole};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Longest slice of an error body kept in error messages.
const ERROR_BODY_LIMIT: usize = 500;

/// REST client for `models/{model}:generateContent`.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    vision_model: String,
    edit_model: String,
}

impl GeminiClient {
    pub fn new(config: &ResolvedBackend) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            vision_model: config.analysis_model.clone(),
            edit_model: config.edit_model.clone(),
        })
    }

    pub fn model_for(&self, role: ModelRole) -> &str {
        match role {
            ModelRole::Vision => &self.vision_model,
            ModelRole::ImageEdit => &self.edit_model,
        }
    }

    pub fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }
}

impl GenerativeBackend for GeminiClient {
    async fn generate(
        &self,
        role: ModelRole,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let model = self.model_for(role);
        let url = self.endpoint(model);
        let started = Instant::now();

        log_debug!("Sending generateContent request to {model}");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("failed to reach Gemini model {model}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            log_warn!("Gemini {model} returned HTTP {status}");
            bail!("Gemini API error (HTTP {status}): {body}");
        }

        let decoded: GenerateContentResponse = response
            .json()
            .await
            .context("failed to decode Gemini response")?;

        log_debug!(
            "Gemini {model} answered with {} candidate(s) in {}ms",
            decoded.candidates.len(),
            started.elapsed().as_millis()
        );

        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ResolvedBackend {
        ResolvedBackend {
            api_key: "key".into(),
            base_url: "https://example.test".into(),
            analysis_model: "vision-m".into(),
            edit_model: "edit-m".into(),
            timeout_secs: None,
        }
    }

    #[test]
    fn routes_roles_to_models() {
        let client = GeminiClient::new(&config()).unwrap();
        assert_eq!(client.model_for(ModelRole::Vision), "vision-m");
        assert_eq!(client.model_for(ModelRole::ImageEdit), "edit-m");
        assert_eq!(
            client.endpoint("vision-m"),
            "https://example.test/v1beta/models/vision-m:generateContent"
        );
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        let mut config = config();
        config.base_url = "http://127.0.0.1:9".into();
        config.timeout_secs = Some(2);
        let client = GeminiClient::new(&config).unwrap();

        let request = GenerateContentRequest::media_with_instruction("image/png", "AAAA", "hi");
        assert!(client.generate(ModelRole::Vision, request).await.is_err());
    }
}
