use tauri::State;

use crate::session::SessionSnapshot;
use crate::vision::prompts::find_preset;
use crate::{AppState, LiveSession};

fn session_from_state(state: &State<'_, AppState>) -> LiveSession {
    state.session.clone()
}

#[tauri::command]
pub async fn get_session_state(state: State<'_, AppState>) -> Result<SessionSnapshot, String> {
    Ok(session_from_state(&state).snapshot().await)
}

#[tauri::command]
pub async fn capture_photo(state: State<'_, AppState>) -> Result<SessionSnapshot, String> {
    let session = session_from_state(&state);
    session.capture().await.map_err(|e| e.to_string())
}

/// Accepts either a full data URL or a bare payload plus `mime_type`.
#[tauri::command]
pub async fn import_media(
    state: State<'_, AppState>,
    data: String,
    mime_type: Option<String>,
) -> Result<SessionSnapshot, String> {
    let session = session_from_state(&state);
    let result = match mime_type {
        Some(mime_type) => session.import_media(&data, &mime_type).await,
        None => session.import_data_url(&data).await,
    };
    result.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn start_recording(state: State<'_, AppState>) -> Result<SessionSnapshot, String> {
    let session = session_from_state(&state);
    session.start_recording().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn finish_recording(
    state: State<'_, AppState>,
    data: String,
    mime_type: String,
) -> Result<SessionSnapshot, String> {
    let session = session_from_state(&state);
    session
        .finish_recording(&data, &mime_type)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn cancel_recording(state: State<'_, AppState>) -> Result<SessionSnapshot, String> {
    let session = session_from_state(&state);
    session.cancel_recording().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn ask_question(
    state: State<'_, AppState>,
    question: String,
) -> Result<SessionSnapshot, String> {
    let session = session_from_state(&state);
    session.ask(&question).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn submit_edit(
    state: State<'_, AppState>,
    instruction: String,
) -> Result<SessionSnapshot, String> {
    let session = session_from_state(&state);
    session.submit_edit(&instruction).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn apply_edit_preset(
    state: State<'_, AppState>,
    label: String,
) -> Result<SessionSnapshot, String> {
    let preset = find_preset(&label).ok_or_else(|| format!("unknown edit preset: {label}"))?;
    let session = session_from_state(&state);
    session
        .submit_edit(preset.prompt)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn reset_session(state: State<'_, AppState>) -> Result<SessionSnapshot, String> {
    Ok(session_from_state(&state).reset().await)
}

#[tauri::command]
pub async fn open_history_item(
    state: State<'_, AppState>,
    id: String,
) -> Result<SessionSnapshot, String> {
    let session = session_from_state(&state);
    session.open_history_item(&id).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn set_zoom(state: State<'_, AppState>, level: f32) -> Result<SessionSnapshot, String> {
    let session = session_from_state(&state);
    session.set_zoom(level).await.map_err(|e| e.to_string())
}
