//! Structured analysis and free-text chat.
//!
//! Neither call ever fails from the caller's point of view: transport and
//! decoding problems are logged and replaced with fixed placeholder content.
//! A degraded answer therefore looks like a sparse successful one.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::backend::{
    types::GenerateContentResponse, GenerateContentRequest, GenerationConfig, GenerativeBackend,
    ModelRole,
};
use crate::models::{AnalysisResult, BoundingBox, DetectedObject, MediaKind, ReferenceLink};

use super::prompts::{
    analysis_schema, chat_instruction, CHAT_EMPTY_REPLY, CHAT_FAILURE_REPLY,
    IMAGE_ANALYSIS_INSTRUCTION, IMAGE_FAILURE_OBSERVATIONS, IMAGE_MISSING_OBSERVATIONS,
    VIDEO_ANALYSIS_INSTRUCTION, VIDEO_FAILURE_OBSERVATIONS, VIDEO_MISSING_OBSERVATIONS,
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisPayload {
    #[serde(default)]
    points: Option<Vec<String>>,
    #[serde(default)]
    detected_objects: Option<Vec<RawObject>>,
}

#[derive(Debug, Deserialize)]
struct RawObject {
    #[serde(default)]
    label: String,
    #[serde(default)]
    box_2d: Vec<f64>,
}

pub fn instruction_for(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Image => IMAGE_ANALYSIS_INSTRUCTION,
        MediaKind::Video => VIDEO_ANALYSIS_INSTRUCTION,
    }
}

/// Observations for a reply that decoded but lacked the list.
fn missing_filler(kind: MediaKind) -> &'static [&'static str; 3] {
    match kind {
        MediaKind::Image => &IMAGE_MISSING_OBSERVATIONS,
        MediaKind::Video => &VIDEO_MISSING_OBSERVATIONS,
    }
}

pub fn failure_result(kind: MediaKind) -> AnalysisResult {
    match kind {
        MediaKind::Image => AnalysisResult::placeholder(&IMAGE_FAILURE_OBSERVATIONS),
        MediaKind::Video => AnalysisResult::placeholder(&VIDEO_FAILURE_OBSERVATIONS),
    }
}

/// Analyzes a payload, substituting the failure placeholders on any error.
pub async fn analyze<B: GenerativeBackend>(
    backend: &B,
    raw_data: &str,
    mime_type: &str,
    kind: MediaKind,
) -> AnalysisResult {
    match try_analyze(backend, raw_data, mime_type, kind).await {
        Ok(result) => {
            log_info!(
                "{} analysis returned {} object(s)",
                kind.as_str(),
                result.detected_objects.len()
            );
            result
        }
        Err(err) => {
            log_error!("{} analysis failed: {err:#}", kind.as_str());
            failure_result(kind)
        }
    }
}

pub async fn try_analyze<B: GenerativeBackend>(
    backend: &B,
    raw_data: &str,
    mime_type: &str,
    kind: MediaKind,
) -> Result<AnalysisResult> {
    let request =
        GenerateContentRequest::media_with_instruction(mime_type, raw_data, instruction_for(kind))
            .with_config(GenerationConfig {
                response_mime_type: Some("application/json".into()),
                response_schema: Some(analysis_schema()),
                response_modalities: None,
            });

    let response = backend.generate(ModelRole::Vision, request).await?;
    parse_analysis(&response, kind)
}

pub fn parse_analysis(response: &GenerateContentResponse, kind: MediaKind) -> Result<AnalysisResult> {
    let text = response.text().unwrap_or_else(|| "{}".to_string());
    let payload: AnalysisPayload = serde_json::from_str(strip_code_fence(&text))
        .context("analysis reply is not the expected JSON object")?;

    let objects = payload
        .detected_objects
        .unwrap_or_default()
        .into_iter()
        .filter_map(into_detected_object)
        .collect();

    let mut result = AnalysisResult::with_observations(
        payload.points.unwrap_or_default(),
        missing_filler(kind),
        objects,
    );
    result.reference_links = reference_links(response);

    Ok(result)
}

fn into_detected_object(raw: RawObject) -> Option<DetectedObject> {
    let label = raw.label.trim();
    if label.is_empty() {
        return None;
    }
    let coords: Vec<i64> = raw.box_2d.iter().map(|v| v.round() as i64).collect();
    Some(DetectedObject {
        label: label.to_string(),
        bounding_box: BoundingBox::from_slice(&coords)?,
    })
}

fn reference_links(response: &GenerateContentResponse) -> Option<Vec<ReferenceLink>> {
    let chunks = &response
        .first_candidate()?
        .grounding_metadata
        .as_ref()?
        .grounding_chunks;

    let links: Vec<ReferenceLink> = chunks
        .iter()
        .filter_map(|chunk| chunk.web.as_ref())
        .filter_map(|web| {
            let uri = web.uri.clone()?;
            let title = web.title.clone().unwrap_or_else(|| uri.clone());
            Some(ReferenceLink { uri, title })
        })
        .collect();

    (!links.is_empty()).then_some(links)
}

/// Tolerates a reply wrapped in a Markdown code fence.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Answers a free-form question about the payload. Never fails.
pub async fn ask<B: GenerativeBackend>(
    backend: &B,
    raw_data: &str,
    mime_type: &str,
    question: &str,
) -> String {
    let request = GenerateContentRequest::media_with_instruction(
        mime_type,
        raw_data,
        chat_instruction(question),
    );

    match backend.generate(ModelRole::Vision, request).await {
        Ok(response) => response.text().unwrap_or_else(|| CHAT_EMPTY_REPLY.to_string()),
        Err(err) => {
            log_error!("General chat failed: {err:#}");
            CHAT_FAILURE_REPLY.to_string()
        }
    }
}
