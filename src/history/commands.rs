use tauri::State;

use crate::models::Artifact;
use crate::AppState;

#[tauri::command]
pub async fn list_history(state: State<'_, AppState>) -> Result<Vec<Artifact>, String> {
    Ok(state.session.history_items().await)
}

#[tauri::command]
pub async fn remove_history_item(state: State<'_, AppState>, id: String) -> Result<bool, String> {
    state
        .session
        .remove_history_item(&id)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn clear_history(state: State<'_, AppState>) -> Result<(), String> {
    state.session.clear_history().await.map_err(|e| e.to_string())
}
