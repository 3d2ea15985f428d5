use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::{watch, Mutex};

use crate::capture::{CameraStatus, CaptureController};
use crate::history::HistoryStore;
use crate::models::{Artifact, EditResult, MediaKind};
use crate::settings::CaptureSettings;
use crate::utils::DataUrl;
use crate::vision::prompts::CHAT_FAILURE_REPLY;
use crate::vision::VisionService;
use crate::{log_error, log_info, log_warn};

use super::state::{SessionError, SessionState, EDITED_IMAGE_MIME};

const ENABLE_LOGS: bool = true;

/// Container assumed for recordings that arrive without a mime type.
pub const DEFAULT_RECORDING_MIME: &str = "video/webm";

/// Everything the UI needs to redraw after a transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub camera: CameraStatus,
}

/// Drives the session through capture, analysis, chat and edits.
///
/// The state mutex is never held across a backend call. Locks are always
/// taken in the order state, capture; history is only locked on its own.
pub struct SessionController<V> {
    state: Arc<Mutex<SessionState>>,
    history: Arc<Mutex<HistoryStore>>,
    vision: Arc<V>,
    capture: Arc<Mutex<CaptureController>>,
    snapshots: Arc<watch::Sender<SessionSnapshot>>,
}

impl<V> Clone for SessionController<V> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            history: self.history.clone(),
            vision: self.vision.clone(),
            capture: self.capture.clone(),
            snapshots: self.snapshots.clone(),
        }
    }
}

impl<V: VisionService> SessionController<V> {
    pub fn new(vision: V, history: HistoryStore, capture: CaptureController) -> Self {
        let initial = SessionSnapshot {
            state: SessionState::Idle,
            camera: capture.status(),
        };
        let (snapshots, _) = watch::channel(initial);

        Self {
            state: Arc::new(Mutex::new(SessionState::Idle)),
            history: Arc::new(Mutex::new(history)),
            vision: Arc::new(vision),
            capture: Arc::new(Mutex::new(capture)),
            snapshots: Arc::new(snapshots),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn vision(&self) -> &V {
        &self.vision
    }

    /// Acquires the camera for the initial Idle state.
    pub async fn start(&self) -> SessionSnapshot {
        let mut state = self.state.lock().await;
        let current = state.clone();
        self.commit(&mut state, current).await
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        let capture = self.capture.lock().await;
        SessionSnapshot {
            state: state.clone(),
            camera: capture.status(),
        }
    }

    /// Installs `next`, holding the camera only in states that show it. A
    /// camera that cannot be acquired turns the new state into Error.
    async fn commit(&self, state: &mut SessionState, next: SessionState) -> SessionSnapshot {
        let mut capture = self.capture.lock().await;
        let next = if next.wants_camera() {
            match capture.acquire() {
                Ok(()) => next,
                Err(err) => SessionState::Error {
                    reason: format!("{err:#}"),
                },
            }
        } else {
            capture.release();
            next
        };

        if state.name() != next.name() {
            log_info!("Session {} -> {}", state.name(), next.name());
        }
        *state = next;

        let snapshot = SessionSnapshot {
            state: state.clone(),
            camera: capture.status(),
        };
        self.snapshots.send_replace(snapshot.clone());
        snapshot
    }

    /// Takes a still from the live camera and analyzes it. Without a frame
    /// the session simply stays Idle.
    pub async fn capture(&self) -> Result<SessionSnapshot> {
        let mut state = self.state.lock().await;
        state.ensure_idle("capture")?;

        let still = self.capture.lock().await.capture_still(Utc::now());
        let Some(artifact) = still else {
            log_info!("No camera frame available, staying idle");
            drop(state);
            return Ok(self.snapshot().await);
        };

        let next = state.begin_analysis(artifact.clone())?;
        self.commit(&mut state, next).await;
        drop(state);

        Ok(self.run_analysis(artifact).await)
    }

    pub async fn submit_analysis(&self, artifact: Artifact) -> Result<SessionSnapshot> {
        {
            let mut state = self.state.lock().await;
            let next = state.begin_analysis(artifact.clone())?;
            self.commit(&mut state, next).await;
        }
        Ok(self.run_analysis(artifact).await)
    }

    /// Manual import from Idle or Error, given a bare base64 payload.
    pub async fn import_media(&self, raw_data: &str, mime_type: &str) -> Result<SessionSnapshot> {
        let raw_data = raw_data.trim();
        if raw_data.is_empty() {
            return Err(SessionError::InvalidMedia("payload is empty".into()).into());
        }
        if mime_type.trim().is_empty() {
            return Err(SessionError::InvalidMedia("mime type is missing".into()).into());
        }
        let artifact = Artifact::from_payload(raw_data, mime_type.trim(), Utc::now());
        self.import_artifact(artifact).await
    }

    pub async fn import_data_url(&self, data_url: &str) -> Result<SessionSnapshot> {
        let artifact = Artifact::from_data_url(data_url, Utc::now())
            .map_err(|err| SessionError::InvalidMedia(format!("{err:#}")))?;
        self.import_artifact(artifact).await
    }

    async fn import_artifact(&self, artifact: Artifact) -> Result<SessionSnapshot> {
        {
            let mut state = self.state.lock().await;
            let next = state.begin_import(artifact.clone())?;
            self.commit(&mut state, next).await;
        }
        Ok(self.run_analysis(artifact).await)
    }

    pub async fn start_recording(&self) -> Result<SessionSnapshot> {
        let mut state = self.state.lock().await;
        let next = state.start_recording(Utc::now())?;
        Ok(self.commit(&mut state, next).await)
    }

    /// Hands the recorded clip over for analysis. Browsers may leave the
    /// recorder's mime type blank, which is read as WebM.
    pub async fn finish_recording(&self, raw_data: &str, mime_type: &str) -> Result<SessionSnapshot> {
        if raw_data.trim().is_empty() {
            return Err(SessionError::InvalidMedia("recording is empty".into()).into());
        }
        let mime_type = match mime_type.trim() {
            "" => DEFAULT_RECORDING_MIME,
            mime if MediaKind::from_mime(mime) == MediaKind::Video => mime,
            other => {
                return Err(SessionError::InvalidMedia(format!(
                    "recording has non-video mime type {other}"
                ))
                .into())
            }
        };
        let artifact = Artifact::from_payload(raw_data.trim(), mime_type, Utc::now());
        {
            let mut state = self.state.lock().await;
            let next = state.finish_recording(artifact.clone())?;
            self.commit(&mut state, next).await;
        }
        Ok(self.run_analysis(artifact).await)
    }

    pub async fn cancel_recording(&self) -> Result<SessionSnapshot> {
        let mut state = self.state.lock().await;
        let next = state.cancel_recording()?;
        Ok(self.commit(&mut state, next).await)
    }

    async fn run_analysis(&self, artifact: Artifact) -> SessionSnapshot {
        let id = artifact.id().to_string();

        let artifact = match self.vision.analyze(&artifact).await {
            Ok(result) => {
                let analyzed = artifact.with_analysis(result);
                if let Err(err) = self.history.lock().await.append(analyzed.clone()).await {
                    log_error!("Failed to persist history: {err:#}");
                }
                analyzed
            }
            Err(err) => {
                log_warn!("Analysis failed for {id}, showing it unanalyzed: {err:#}");
                artifact
            }
        };

        let mut state = self.state.lock().await;
        if !state.is_analyzing(&id) {
            log_info!("Session moved on while analyzing {id}, result kept in history only");
            drop(state);
            return self.snapshot().await;
        }
        let next = SessionState::Viewing {
            artifact,
            edited_image: None,
        };
        self.commit(&mut state, next).await
    }

    /// Free-text question about the artifact on screen. The exchange is
    /// recorded on the artifact and in history.
    pub async fn ask(&self, question: &str) -> Result<SessionSnapshot> {
        let (artifact, question) = {
            let mut state = self.state.lock().await;
            let next = state.begin_question(question)?;
            let pending = match &next {
                SessionState::Analyzing {
                    artifact,
                    question: Some(question),
                    ..
                } => Some((artifact.clone(), question.clone())),
                _ => None,
            };
            self.commit(&mut state, next).await;
            match pending {
                Some(pending) => pending,
                None => return Ok(self.snapshot_of(&state).await),
            }
        };

        let id = artifact.id().to_string();
        let answer = match self.vision.ask(&artifact, &question).await {
            Ok(answer) => answer,
            Err(err) => {
                log_warn!("Chat request failed: {err:#}");
                CHAT_FAILURE_REPLY.to_string()
            }
        };

        let mut local = artifact;
        local.push_exchange(question.clone(), answer.clone());
        let archived = match self
            .history
            .lock()
            .await
            .record_exchange(&id, &question, &answer)
            .await
        {
            Ok(archived) => archived,
            Err(err) => {
                log_error!("Failed to persist conversation: {err:#}");
                None
            }
        };
        // The archived entry may hold exchanges this session never saw.
        let updated = archived.unwrap_or(local);

        let mut state = self.state.lock().await;
        if !state.is_answering(&id, &question) {
            log_info!("Session moved on while answering about {id}");
            return Ok(self.snapshot_of(&state).await);
        }
        let next = SessionState::Viewing {
            artifact: updated,
            edited_image: state.edited_image().map(str::to_string),
        };
        Ok(self.commit(&mut state, next).await)
    }

    /// Regenerates the displayed image. Failures leave the previous image in
    /// place and are only logged.
    pub async fn submit_edit(&self, instruction: &str) -> Result<SessionSnapshot> {
        let (id, source, instruction) = {
            let mut state = self.state.lock().await;
            let (next, source) = state.begin_edit(instruction)?;
            let id = next.artifact().map(|a| a.id().to_string()).unwrap_or_default();
            let instruction = instruction.trim().to_string();
            self.commit(&mut state, next).await;
            (id, source, instruction)
        };

        let new_image = match self.vision.edit(&source, &instruction).await {
            Ok(EditResult {
                image_data: Some(data),
                text_response,
            }) => {
                if let Some(text) = text_response {
                    log_info!("Edit commentary: {text}");
                }
                Some(DataUrl::new(EDITED_IMAGE_MIME, data).to_string())
            }
            Ok(_) => {
                log_warn!("Edit returned no image, keeping the current one");
                None
            }
            Err(err) => {
                log_warn!("Edit failed: {err:#}");
                None
            }
        };

        let mut state = self.state.lock().await;
        if !state.is_editing(&id) {
            log_info!("Session moved on while editing {id}, dropping the edit");
            return Ok(self.snapshot_of(&state).await);
        }
        match state.finish_edit(new_image) {
            Some(next) => Ok(self.commit(&mut state, next).await),
            None => Ok(self.snapshot_of(&state).await),
        }
    }

    /// Back to the live camera from anywhere.
    pub async fn reset(&self) -> SessionSnapshot {
        let mut state = self.state.lock().await;
        self.commit(&mut state, SessionState::Idle).await
    }

    pub async fn open_history_item(&self, id: &str) -> Result<SessionSnapshot> {
        let artifact = self
            .history
            .lock()
            .await
            .log()
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownHistoryItem(id.to_string()))?;

        let mut state = self.state.lock().await;
        let next = state.open(artifact)?;
        Ok(self.commit(&mut state, next).await)
    }

    pub async fn set_zoom(&self, level: f32) -> Result<SessionSnapshot> {
        let state = self.state.lock().await;
        state.ensure_idle("zoom")?;
        self.capture
            .lock()
            .await
            .set_zoom(level)
            .map_err(|err| SessionError::Camera(format!("{err:#}")))?;
        Ok(self.publish(&state).await)
    }

    /// Re-checks the camera after the device reported a change.
    pub async fn refresh_camera(&self) -> SessionSnapshot {
        let mut state = self.state.lock().await;
        if state.wants_camera() {
            let current = state.clone();
            self.commit(&mut state, current).await
        } else {
            self.publish(&state).await
        }
    }

    pub async fn update_capture_settings(&self, settings: CaptureSettings) -> SessionSnapshot {
        let state = self.state.lock().await;
        self.capture.lock().await.set_settings(settings);
        self.publish(&state).await
    }

    pub async fn history_items(&self) -> Vec<Artifact> {
        self.history.lock().await.log().items().to_vec()
    }

    pub async fn remove_history_item(&self, id: &str) -> Result<bool> {
        let removed = self.history.lock().await.remove(id).await?;
        Ok(removed.is_some())
    }

    pub async fn clear_history(&self) -> Result<()> {
        self.history.lock().await.clear().await
    }

    async fn snapshot_of(&self, state: &SessionState) -> SessionSnapshot {
        SessionSnapshot {
            state: state.clone(),
            camera: self.capture.lock().await.status(),
        }
    }

    async fn publish(&self, state: &SessionState) -> SessionSnapshot {
        let snapshot = self.snapshot_of(state).await;
        self.snapshots.send_replace(snapshot.clone());
        snapshot
    }
}
