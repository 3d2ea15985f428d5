use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::models::Artifact;
use crate::utils::DataUrl;
use crate::vision::EditSource;

/// Mime type of images produced by the edit model.
pub const EDITED_IMAGE_MIME: &str = "image/png";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
    #[error("video artifacts cannot be edited")]
    VideoEditUnsupported,
    #[error("{0} must not be empty")]
    EmptyInput(&'static str),
    #[error("no history entry with id {0}")]
    UnknownHistoryItem(String),
    #[error("invalid media: {0}")]
    InvalidMedia(String),
    #[error("camera: {0}")]
    Camera(String),
}

/// Where the session is, with exactly the data that state needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "status",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum SessionState {
    Idle,
    Recording {
        started_at: DateTime<Utc>,
    },
    Analyzing {
        artifact: Artifact,
        edited_image: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        question: Option<String>,
    },
    Viewing {
        artifact: Artifact,
        edited_image: Option<String>,
    },
    Editing {
        artifact: Artifact,
        edited_image: Option<String>,
        instruction: String,
    },
    Error {
        reason: String,
    },
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Idle
    }
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Recording { .. } => "recording",
            SessionState::Analyzing { .. } => "analyzing",
            SessionState::Viewing { .. } => "viewing",
            SessionState::Editing { .. } => "editing",
            SessionState::Error { .. } => "error",
        }
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            SessionState::Analyzing { artifact, .. }
            | SessionState::Viewing { artifact, .. }
            | SessionState::Editing { artifact, .. } => Some(artifact),
            _ => None,
        }
    }

    /// Latest edit of the current artifact as a data URL.
    pub fn edited_image(&self) -> Option<&str> {
        match self {
            SessionState::Analyzing { edited_image, .. }
            | SessionState::Viewing { edited_image, .. }
            | SessionState::Editing { edited_image, .. } => edited_image.as_deref(),
            _ => None,
        }
    }

    /// What the user sees: the edited image when there is one.
    pub fn displayed_image(&self) -> Option<&str> {
        self.edited_image()
            .or_else(|| self.artifact().map(|a| a.preview_data()))
    }

    /// A backend call is outstanding.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SessionState::Analyzing { .. } | SessionState::Editing { .. }
        )
    }

    pub fn wants_camera(&self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Recording { .. })
    }

    pub fn is_analyzing(&self, id: &str) -> bool {
        matches!(self, SessionState::Analyzing { artifact, .. } if artifact.id() == id)
    }

    /// Analyzing `id` on behalf of this exact chat question.
    pub fn is_answering(&self, id: &str, question: &str) -> bool {
        matches!(
            self,
            SessionState::Analyzing { artifact, question: Some(pending), .. }
                if artifact.id() == id && pending == question
        )
    }

    pub fn is_editing(&self, id: &str) -> bool {
        matches!(self, SessionState::Editing { artifact, .. } if artifact.id() == id)
    }

    fn reject(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            action,
            state: self.name(),
        }
    }

    pub fn ensure_idle(&self, action: &'static str) -> Result<(), SessionError> {
        match self {
            SessionState::Idle => Ok(()),
            other => Err(other.reject(action)),
        }
    }

    /// Idle, Viewing or Error into Analyzing a fresh artifact.
    pub fn begin_analysis(&self, artifact: Artifact) -> Result<SessionState, SessionError> {
        match self {
            SessionState::Idle | SessionState::Viewing { .. } | SessionState::Error { .. } => {
                Ok(SessionState::Analyzing {
                    artifact,
                    edited_image: None,
                    question: None,
                })
            }
            other => Err(other.reject("analyze")),
        }
    }

    /// Manual import is the recovery path, so it is allowed from Error too.
    pub fn begin_import(&self, artifact: Artifact) -> Result<SessionState, SessionError> {
        match self {
            SessionState::Idle | SessionState::Error { .. } => self.begin_analysis(artifact),
            other => Err(other.reject("import media")),
        }
    }

    pub fn start_recording(&self, now: DateTime<Utc>) -> Result<SessionState, SessionError> {
        self.ensure_idle("start recording")?;
        Ok(SessionState::Recording { started_at: now })
    }

    pub fn finish_recording(&self, artifact: Artifact) -> Result<SessionState, SessionError> {
        if !artifact.is_video() {
            return Err(SessionError::InvalidMedia("recordings must be video".into()));
        }
        match self {
            SessionState::Recording { .. } => Ok(SessionState::Analyzing {
                artifact,
                edited_image: None,
                question: None,
            }),
            other => Err(other.reject("finish recording")),
        }
    }

    pub fn cancel_recording(&self) -> Result<SessionState, SessionError> {
        match self {
            SessionState::Recording { .. } => Ok(SessionState::Idle),
            other => Err(other.reject("cancel recording")),
        }
    }

    /// Viewing into Analyzing with a pending chat question.
    pub fn begin_question(&self, question: &str) -> Result<SessionState, SessionError> {
        let question = question.trim();
        match self {
            SessionState::Viewing {
                artifact,
                edited_image,
            } => {
                if question.is_empty() {
                    return Err(SessionError::EmptyInput("question"));
                }
                Ok(SessionState::Analyzing {
                    artifact: artifact.clone(),
                    edited_image: edited_image.clone(),
                    question: Some(question.to_string()),
                })
            }
            other => Err(other.reject("ask a question")),
        }
    }

    /// Viewing into Editing, plus the image the edit should start from.
    pub fn begin_edit(&self, instruction: &str) -> Result<(SessionState, EditSource), SessionError> {
        let instruction = instruction.trim();
        match self {
            SessionState::Viewing {
                artifact,
                edited_image,
            } => {
                if artifact.is_video() {
                    return Err(SessionError::VideoEditUnsupported);
                }
                if instruction.is_empty() {
                    return Err(SessionError::EmptyInput("edit instruction"));
                }
                let source = edit_source(artifact, edited_image.as_deref());
                Ok((
                    SessionState::Editing {
                        artifact: artifact.clone(),
                        edited_image: edited_image.clone(),
                        instruction: instruction.to_string(),
                    },
                    source,
                ))
            }
            other => Err(other.reject("edit")),
        }
    }

    /// Editing back to Viewing. `None` keeps whatever was displayed before.
    pub fn finish_edit(&self, new_image: Option<String>) -> Option<SessionState> {
        match self {
            SessionState::Editing {
                artifact,
                edited_image,
                ..
            } => Some(SessionState::Viewing {
                artifact: artifact.clone(),
                edited_image: new_image.or_else(|| edited_image.clone()),
            }),
            _ => None,
        }
    }

    pub fn open(&self, artifact: Artifact) -> Result<SessionState, SessionError> {
        match self {
            SessionState::Idle | SessionState::Viewing { .. } | SessionState::Error { .. } => {
                Ok(SessionState::Viewing {
                    artifact,
                    edited_image: None,
                })
            }
            other => Err(other.reject("open a history item")),
        }
    }
}

/// Chains from the latest edit when there is one, else from the archived
/// payload.
fn edit_source(artifact: &Artifact, edited_image: Option<&str>) -> EditSource {
    if let Some(url) = edited_image.and_then(|image| DataUrl::parse(image).ok()) {
        return EditSource {
            data: url.payload,
            mime_type: url.mime_type,
        };
    }
    EditSource {
        data: artifact.raw_data().to_string(),
        mime_type: artifact.mime_type().to_string(),
    }
}
