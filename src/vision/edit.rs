//! Image regeneration.
//!
//! Unlike analysis, failures are returned to the caller untouched.

use anyhow::Result;

use crate::backend::{
    types::GenerateContentResponse, GenerateContentRequest, GenerationConfig, GenerativeBackend,
    ModelRole,
};
use crate::models::EditResult;

pub async fn edit_image<B: GenerativeBackend>(
    backend: &B,
    raw_data: &str,
    mime_type: &str,
    instruction: &str,
) -> Result<EditResult> {
    let request = GenerateContentRequest::media_with_instruction(mime_type, raw_data, instruction)
        .with_config(GenerationConfig {
            response_modalities: Some(vec!["TEXT".into(), "IMAGE".into()]),
            ..Default::default()
        });

    let response = backend.generate(ModelRole::ImageEdit, request).await?;
    Ok(collect_edit_result(&response))
}

/// Walks the first candidate's parts; the last image and the last text win.
pub fn collect_edit_result(response: &GenerateContentResponse) -> EditResult {
    let mut result = EditResult::default();
    for part in response.parts() {
        if let Some(inline) = &part.inline_data {
            result.image_data = Some(inline.data.clone());
        } else if let Some(text) = &part.text {
            result.text_response = Some(text.clone());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::testing::ScriptedBackend;

    #[tokio::test]
    async fn image_and_text_parts_are_collected() {
        let backend = ScriptedBackend::replying(
            serde_json::from_value(serde_json::json!({
                "candidates": [{ "content": { "parts": [
                    { "text": "Here you go" },
                    { "inlineData": { "mimeType": "image/png", "data": "NEW" } }
                ]}}]
            }))
            .unwrap(),
        );

        let result = edit_image(&backend, "OLD", "image/jpeg", "make it blue")
            .await
            .unwrap();
        assert_eq!(result.image_data.as_deref(), Some("NEW"));
        assert_eq!(result.text_response.as_deref(), Some("Here you go"));

        let (role, request) = &backend.requests()[0];
        assert_eq!(*role, ModelRole::ImageEdit);
        assert_eq!(
            request.contents[0].parts[1].text.as_deref(),
            Some("make it blue")
        );
        let modalities = request
            .generation_config
            .as_ref()
            .and_then(|c| c.response_modalities.clone())
            .unwrap();
        assert_eq!(modalities, vec!["TEXT", "IMAGE"]);
    }

    #[tokio::test]
    async fn empty_reply_is_an_empty_result() {
        let backend = ScriptedBackend::replying(GenerateContentResponse::default());
        let result = edit_image(&backend, "OLD", "image/jpeg", "x").await.unwrap();
        assert_eq!(result, EditResult::default());
    }

    #[tokio::test]
    async fn failures_propagate() {
        let backend = ScriptedBackend::failing("quota exceeded");
        let err = edit_image(&backend, "OLD", "image/jpeg", "x").await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }
}
