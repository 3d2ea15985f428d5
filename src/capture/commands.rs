use tauri::State;

use crate::capture::ZoomRange;
use crate::session::SessionSnapshot;
use crate::AppState;

/// Called by the webview after it asked the browser for a camera stream.
#[tauri::command]
pub async fn report_camera(
    state: State<'_, AppState>,
    available: bool,
    zoom_range: Option<ZoomRange>,
) -> Result<SessionSnapshot, String> {
    state.feed.report_device(available, zoom_range);
    Ok(state.session.refresh_camera().await)
}

/// Latest preview frame as a data URL. Returns whether it was kept.
#[tauri::command]
pub fn push_camera_frame(state: State<'_, AppState>, frame: String) -> Result<bool, String> {
    state.feed.push_data_url(&frame).map_err(|e| e.to_string())
}

#[tauri::command]
pub fn get_requested_zoom(state: State<'_, AppState>) -> Option<f32> {
    state.feed.requested_zoom()
}
