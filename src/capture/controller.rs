use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Artifact;
use crate::settings::CaptureSettings;
use crate::{log_info, log_warn};

use super::encode::frame_to_artifact;
use super::{CameraDevice, CameraStream, ZoomRange};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CameraStatus {
    pub active: bool,
    pub zoom: f32,
    pub zoom_range: Option<ZoomRange>,
    pub error: Option<String>,
}

/// Holds the camera while the session wants it and turns frames into
/// artifacts.
pub struct CaptureController {
    device: Arc<dyn CameraDevice>,
    stream: Option<Box<dyn CameraStream>>,
    settings: CaptureSettings,
    zoom: f32,
    camera_error: Option<String>,
}

impl CaptureController {
    pub fn new(device: Arc<dyn CameraDevice>, settings: CaptureSettings) -> Self {
        Self {
            device,
            stream: None,
            settings,
            zoom: 1.0,
            camera_error: None,
        }
    }

    /// Opens the camera if it is not already held. Failures are remembered so
    /// the UI can explain why the preview is missing.
    pub fn acquire(&mut self) -> Result<()> {
        if let Some(stream) = &self.stream {
            if stream.is_live() {
                return Ok(());
            }
            self.stream = None;
        }

        match self.device.open() {
            Ok(stream) => {
                self.zoom = stream.zoom_range().map(|r| r.min).unwrap_or(1.0);
                self.stream = Some(stream);
                self.camera_error = None;
                log_info!("Camera acquired");
                Ok(())
            }
            Err(err) => {
                log_warn!("Camera acquisition failed: {err:#}");
                self.camera_error = Some(format!("{err:#}"));
                Err(err).context("camera access failed")
            }
        }
    }

    pub fn release(&mut self) {
        if self.stream.take().is_some() {
            log_info!("Camera released");
        }
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    pub fn camera_error(&self) -> Option<&str> {
        self.camera_error.as_deref()
    }

    pub fn zoom_range(&self) -> Option<ZoomRange> {
        self.stream
            .as_ref()
            .and_then(|stream| stream.zoom_range())
            .map(|range| range.capped(self.settings.max_zoom))
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Applies a clamped zoom level and returns the level actually set.
    pub fn set_zoom(&mut self, level: f32) -> Result<f32> {
        let range = self
            .zoom_range()
            .ok_or_else(|| anyhow!("camera does not support zoom"))?;
        let level = range.clamp(level);
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| anyhow!("camera is not active"))?;
        stream.apply_zoom(level)?;
        self.zoom = level;
        Ok(level)
    }

    /// Grabs the current frame as a JPEG artifact. `None` when the camera is
    /// not held, has no frame yet, or the frame cannot be encoded.
    pub fn capture_still(&mut self, now: DateTime<Utc>) -> Option<Artifact> {
        let frame = self.stream.as_mut()?.grab_frame()?;
        match frame_to_artifact(&frame, self.settings.jpeg_quality, now) {
            Ok(artifact) => Some(artifact),
            Err(err) => {
                log_warn!("Dropping frame that failed to encode: {err:#}");
                None
            }
        }
    }

    pub fn set_settings(&mut self, settings: CaptureSettings) {
        self.settings = settings;
        if let Some(range) = self.zoom_range() {
            let level = range.clamp(self.zoom);
            if level != self.zoom {
                if let Err(err) = self.set_zoom(level) {
                    log_warn!("Could not re-apply zoom after settings change: {err:#}");
                }
            }
        }
    }

    pub fn status(&self) -> CameraStatus {
        CameraStatus {
            active: self.is_active(),
            zoom: self.zoom,
            zoom_range: self.zoom_range(),
            error: self.camera_error.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use anyhow::{bail, Result};
    use image::DynamicImage;

    use crate::capture::{CameraDevice, CameraStream, ZoomRange};

    /// In-memory camera whose availability and frame can be flipped by tests.
    #[derive(Default)]
    pub struct FakeCamera {
        pub denied: AtomicBool,
        pub has_frame: AtomicBool,
        pub zoom_range: Mutex<Option<ZoomRange>>,
        pub open_streams: Arc<AtomicUsize>,
        pub applied_zoom: Arc<Mutex<Option<f32>>>,
    }

    impl FakeCamera {
        pub fn with_frame() -> Self {
            let camera = Self::default();
            camera.has_frame.store(true, Ordering::SeqCst);
            camera
        }

        pub fn open_streams(&self) -> usize {
            self.open_streams.load(Ordering::SeqCst)
        }
    }

    struct FakeStream {
        frame: Option<DynamicImage>,
        zoom_range: Option<ZoomRange>,
        open_streams: Arc<AtomicUsize>,
        applied_zoom: Arc<Mutex<Option<f32>>>,
    }

    impl CameraDevice for FakeCamera {
        fn open(&self) -> Result<Box<dyn CameraStream>> {
            if self.denied.load(Ordering::SeqCst) {
                bail!("permission denied");
            }
            self.open_streams.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeStream {
                frame: self
                    .has_frame
                    .load(Ordering::SeqCst)
                    .then(|| DynamicImage::new_rgb8(4, 4)),
                zoom_range: *self.zoom_range.lock().unwrap(),
                open_streams: self.open_streams.clone(),
                applied_zoom: self.applied_zoom.clone(),
            }))
        }
    }

    impl CameraStream for FakeStream {
        fn grab_frame(&mut self) -> Option<DynamicImage> {
            self.frame.clone()
        }

        fn zoom_range(&self) -> Option<ZoomRange> {
            self.zoom_range
        }

        fn apply_zoom(&mut self, level: f32) -> Result<()> {
            *self.applied_zoom.lock().unwrap() = Some(level);
            Ok(())
        }
    }

    impl Drop for FakeStream {
        fn drop(&mut self) {
            self.open_streams.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::testing::FakeCamera;
    use super::*;

    fn controller(camera: Arc<FakeCamera>) -> CaptureController {
        CaptureController::new(camera, CaptureSettings::default())
    }

    #[test]
    fn acquire_and_release_track_the_stream() {
        let camera = Arc::new(FakeCamera::with_frame());
        let mut capture = controller(camera.clone());

        capture.acquire().unwrap();
        capture.acquire().unwrap();
        assert_eq!(camera.open_streams(), 1);
        assert!(capture.status().active);

        capture.release();
        assert_eq!(camera.open_streams(), 0);
        assert!(capture.capture_still(Utc::now()).is_none());
    }

    #[test]
    fn denied_camera_records_the_error() {
        let camera = Arc::new(FakeCamera::default());
        camera.denied.store(true, Ordering::SeqCst);
        let mut capture = controller(camera.clone());

        assert!(capture.acquire().is_err());
        assert!(capture.camera_error().unwrap().contains("permission denied"));

        camera.denied.store(false, Ordering::SeqCst);
        capture.acquire().unwrap();
        assert!(capture.camera_error().is_none());
    }

    #[test]
    fn capture_without_frame_is_none() {
        let mut capture = controller(Arc::new(FakeCamera::default()));
        capture.acquire().unwrap();
        assert!(capture.capture_still(Utc::now()).is_none());
    }

    #[test]
    fn capture_produces_jpeg_artifact() {
        let mut capture = controller(Arc::new(FakeCamera::with_frame()));
        capture.acquire().unwrap();
        let artifact = capture.capture_still(Utc::now()).unwrap();
        assert_eq!(artifact.mime_type(), "image/jpeg");
        assert!(!artifact.raw_data().is_empty());
    }

    #[test]
    fn zoom_is_capped_and_clamped() {
        let camera = Arc::new(FakeCamera::with_frame());
        *camera.zoom_range.lock().unwrap() = Some(ZoomRange::new(1.0, 30.0));
        let mut capture = controller(camera.clone());
        capture.acquire().unwrap();

        assert_eq!(capture.zoom_range().unwrap().max, 10.0);
        assert_eq!(capture.set_zoom(50.0).unwrap(), 10.0);
        assert_eq!(*camera.applied_zoom.lock().unwrap(), Some(10.0));

        capture.set_settings(CaptureSettings {
            max_zoom: 4.0,
            ..CaptureSettings::default()
        });
        assert_eq!(capture.zoom(), 4.0);
    }

    #[test]
    fn zoom_without_support_fails() {
        let mut capture = controller(Arc::new(FakeCamera::with_frame()));
        capture.acquire().unwrap();
        assert!(capture.set_zoom(2.0).is_err());
    }
}
