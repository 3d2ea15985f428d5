pub mod backend;
pub mod capture;
pub mod db;
pub mod history;
pub mod models;
pub mod report;
pub mod session;
pub mod settings;
pub mod utils;
pub mod vision;

#[cfg(feature = "desktop")]
pub use desktop::run;

#[cfg(feature = "desktop")]
pub(crate) use desktop::{AppState, LiveSession};

#[cfg(feature = "desktop")]
mod desktop {
    use std::path::PathBuf;
    use std::sync::Arc;

    use chrono::Utc;
    use log::{info, warn};
    use tauri::{Emitter, Manager, State};

    use crate::backend::ReloadableGemini;
    use crate::capture::{
        commands::{get_requested_zoom, push_camera_frame, report_camera},
        CaptureController, FrameFeed,
    };
    use crate::db::Database;
    use crate::history::{
        commands::{clear_history, list_history, remove_history_item},
        HistoryStore,
    };
    use crate::report::{save_displayed_image as write_displayed_image, AnalysisReport};
    use crate::session::{
        commands::{
            apply_edit_preset, ask_question, cancel_recording, capture_photo, finish_recording,
            get_session_state, import_media, open_history_item, reset_session, set_zoom,
            start_recording, submit_edit,
        },
        SessionController,
    };
    use crate::settings::{SettingsStore, UserSettings};
    use crate::vision::prompts::{EditPreset, EDIT_PRESETS};
    use crate::vision::VisionClient;

    pub const SESSION_STATE_EVENT: &str = "session-state-changed";

    pub(crate) type LiveSession = SessionController<VisionClient<ReloadableGemini>>;

    pub(crate) struct AppState {
        pub(crate) session: LiveSession,
        pub(crate) feed: FrameFeed,
        pub(crate) settings: SettingsStore,
        pub(crate) export_dir: PathBuf,
    }

    #[tauri::command]
    fn get_settings(state: State<AppState>) -> Result<UserSettings, String> {
        Ok(state.settings.snapshot())
    }

    #[tauri::command]
    async fn set_settings(state: State<'_, AppState>, settings: UserSettings) -> Result<bool, String> {
        state
            .settings
            .update(settings.clone())
            .map_err(|e| e.to_string())?;

        let ready = state.session.vision().backend().reload(&settings.backend);
        state.session.update_capture_settings(settings.capture).await;
        Ok(ready)
    }

    #[tauri::command]
    fn is_backend_configured(state: State<AppState>) -> bool {
        state.session.vision().backend().is_configured()
    }

    #[tauri::command]
    fn list_edit_presets() -> Vec<EditPreset> {
        EDIT_PRESETS.to_vec()
    }

    #[tauri::command]
    async fn export_report(state: State<'_, AppState>) -> Result<AnalysisReport, String> {
        let snapshot = state.session.snapshot().await;
        AnalysisReport::from_state(&snapshot.state).ok_or_else(|| "nothing to export".to_string())
    }

    #[tauri::command]
    async fn export_report_markdown(state: State<'_, AppState>) -> Result<String, String> {
        let snapshot = state.session.snapshot().await;
        AnalysisReport::from_state(&snapshot.state)
            .map(|report| report.to_markdown())
            .ok_or_else(|| "nothing to export".to_string())
    }

    /// Share fallback: drops the displayed image into the export folder.
    #[tauri::command]
    async fn save_displayed_image(state: State<'_, AppState>) -> Result<String, String> {
        let snapshot = state.session.snapshot().await;
        let displayed = snapshot
            .state
            .displayed_image()
            .ok_or_else(|| "no image on screen".to_string())?;
        let path = write_displayed_image(&state.export_dir, displayed, Utc::now())
            .map_err(|e| e.to_string())?;
        Ok(path.display().to_string())
    }

    #[cfg_attr(mobile, tauri::mobile_entry_point)]
    pub fn run() {
        // Initialize logging (reads RUST_LOG env var)
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();

        info!("NanoLens starting up...");

        tauri::Builder::default()
            .plugin(tauri_plugin_opener::init())
            .setup(|app| {
                let result = (|| -> anyhow::Result<()> {
                    let app_data_dir = app
                        .path()
                        .app_data_dir()
                        .map_err(|err| anyhow::anyhow!(err))?;
                    std::fs::create_dir_all(&app_data_dir)?;

                    let export_dir = app
                        .path()
                        .download_dir()
                        .unwrap_or_else(|_| app_data_dir.join("exports"));

                    let db_path = app_data_dir.join("nanolens.sqlite3");
                    let database = Database::new(db_path)?;

                    let settings_path = app_data_dir.join("settings.json");
                    let settings_store = SettingsStore::new(settings_path)?;
                    let settings = settings_store.snapshot();

                    let backend = ReloadableGemini::from_settings(&settings.backend);
                    if !backend.is_configured() {
                        warn!("Starting without a Gemini client; analysis will use placeholders");
                    }

                    let feed = FrameFeed::new();
                    let capture = CaptureController::new(Arc::new(feed.clone()), settings.capture);

                    let session = tauri::async_runtime::block_on(async {
                        let history = HistoryStore::load(database).await;
                        let session =
                            SessionController::new(VisionClient::new(backend), history, capture);
                        session.start().await;
                        session
                    });

                    let mut snapshots = session.subscribe();
                    let handle = app.handle().clone();
                    tauri::async_runtime::spawn(async move {
                        while snapshots.changed().await.is_ok() {
                            let snapshot = snapshots.borrow_and_update().clone();
                            if let Err(err) = handle.emit(SESSION_STATE_EVENT, &snapshot) {
                                warn!("Failed to emit session state: {err}");
                            }
                        }
                    });

                    app.manage(AppState {
                        session,
                        feed,
                        settings: settings_store,
                        export_dir,
                    });

                    Ok(())
                })();

                result.map_err(|err| err.into())
            })
            .invoke_handler(tauri::generate_handler![
                get_session_state,
                capture_photo,
                import_media,
                start_recording,
                finish_recording,
                cancel_recording,
                ask_question,
                submit_edit,
                apply_edit_preset,
                reset_session,
                open_history_item,
                set_zoom,
                list_history,
                remove_history_item,
                clear_history,
                report_camera,
                push_camera_frame,
                get_requested_zoom,
                get_settings,
                set_settings,
                is_backend_configured,
                list_edit_presets,
                export_report,
                export_report_markdown,
                save_displayed_image,
            ])
            .run(tauri::generate_context!())
            .expect("error while running tauri application");
    }
}
