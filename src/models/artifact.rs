use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{time::time_derived_id, DataUrl};

use super::AnalysisResult;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type.starts_with("video") {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

/// A captured or imported media item plus everything the backend has said
/// about it.
///
/// Only `analysis` and `conversation` change after creation; the media fields
/// are private so an edit can never overwrite the archived payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    id: String,
    preview_data: String,
    raw_data: String,
    mime_type: String,
    created_at: DateTime<Utc>,
    kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    analysis: Option<AnalysisResult>,
    #[serde(default)]
    conversation: Vec<ChatTurn>,
}

impl Artifact {
    /// Builds an artifact from a bare base64 payload.
    pub fn from_payload(
        raw_data: impl Into<String>,
        mime_type: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let url = DataUrl::new(mime_type, raw_data);
        Self {
            id: time_derived_id(created_at),
            preview_data: url.to_string(),
            kind: MediaKind::from_mime(&url.mime_type),
            raw_data: url.payload,
            mime_type: url.mime_type,
            created_at,
            analysis: None,
            conversation: Vec::new(),
        }
    }

    pub fn from_data_url(data_url: &str, created_at: DateTime<Utc>) -> Result<Self> {
        let url = DataUrl::parse(data_url)?;
        Ok(Self::from_payload(url.payload, url.mime_type, created_at))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn preview_data(&self) -> &str {
        &self.preview_data
    }

    pub fn raw_data(&self) -> &str {
        &self.raw_data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn conversation(&self) -> &[ChatTurn] {
        &self.conversation
    }

    pub fn with_analysis(mut self, analysis: AnalysisResult) -> Self {
        self.analysis = Some(analysis);
        self
    }

    /// Records one question/answer exchange.
    pub fn push_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.conversation.push(ChatTurn {
            role: ChatRole::User,
            text: question.into(),
        });
        self.conversation.push(ChatTurn {
            role: ChatRole::Model,
            text: answer.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_import_splits_preview_and_raw() {
        let artifact = Artifact::from_data_url("data:image/png;base64,AAAA", Utc::now()).unwrap();
        assert_eq!(artifact.raw_data(), "AAAA");
        assert_eq!(artifact.preview_data(), "data:image/png;base64,AAAA");
        assert_eq!(artifact.mime_type(), "image/png");
        assert_eq!(artifact.kind(), MediaKind::Image);
        assert!(artifact.analysis().is_none());
    }

    #[test]
    fn video_mime_types_become_video_artifacts() {
        let artifact = Artifact::from_payload("AAAA", "video/webm", Utc::now());
        assert!(artifact.is_video());
        assert_eq!(MediaKind::from_mime("application/octet-stream"), MediaKind::Image);
    }

    #[test]
    fn exchanges_append_user_then_model() {
        let mut artifact = Artifact::from_payload("AAAA", "image/jpeg", Utc::now());
        artifact.push_exchange("what is this?", "a cat");
        let roles: Vec<ChatRole> = artifact.conversation().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![ChatRole::User, ChatRole::Model]);
    }

    #[test]
    fn serialized_shape_uses_camel_case() {
        let artifact = Artifact::from_payload("AAAA", "image/jpeg", Utc::now());
        let json = serde_json::to_value(&artifact).unwrap();
        assert_eq!(json["rawData"], "AAAA");
        assert_eq!(json["kind"], "image");
        assert!(json.get("analysis").is_none());
        let back: Artifact = serde_json::from_value(json).unwrap();
        assert_eq!(back, artifact);
    }
}
