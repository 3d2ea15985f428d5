//! Camera fed by the webview.
//!
//! The webview owns the browser media stream and pushes frames here; the
//! Rust side only ever sees the most recent one. Zoom requests flow the other
//! way and are picked up by the webview when it polls.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{bail, Context, Result};
use image::DynamicImage;

use crate::utils::DataUrl;

use super::{CameraDevice, CameraStream, ZoomRange};

#[derive(Default)]
struct FeedState {
    unavailable: bool,
    latest: Option<DynamicImage>,
    zoom_range: Option<ZoomRange>,
    requested_zoom: Option<f32>,
    open_streams: usize,
}

#[derive(Clone, Default)]
pub struct FrameFeed {
    inner: Arc<Mutex<FeedState>>,
}

impl FrameFeed {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Records what the webview learned when it asked for the camera.
    pub fn report_device(&self, available: bool, zoom_range: Option<ZoomRange>) {
        let mut state = self.lock();
        state.unavailable = !available;
        state.zoom_range = zoom_range;
        if !available {
            state.latest = None;
        }
    }

    /// Stores an encoded frame. Frames arriving while nobody holds the camera
    /// are dropped.
    pub fn push_frame(&self, encoded: &[u8]) -> Result<bool> {
        let frame = image::load_from_memory(encoded).context("camera frame is not an image")?;
        let mut state = self.lock();
        if state.open_streams == 0 {
            return Ok(false);
        }
        state.latest = Some(frame);
        Ok(true)
    }

    pub fn push_data_url(&self, data_url: &str) -> Result<bool> {
        let bytes = DataUrl::parse(data_url)?.decode()?;
        self.push_frame(&bytes)
    }

    /// Zoom level the webview should apply to its track, if any was set.
    pub fn requested_zoom(&self) -> Option<f32> {
        self.lock().requested_zoom
    }
}

impl CameraDevice for FrameFeed {
    fn open(&self) -> Result<Box<dyn CameraStream>> {
        let mut state = self.lock();
        if state.unavailable {
            bail!("camera is unavailable or permission was denied");
        }
        state.open_streams += 1;
        Ok(Box::new(FeedStream { feed: self.clone() }))
    }
}

struct FeedStream {
    feed: FrameFeed,
}

impl CameraStream for FeedStream {
    fn grab_frame(&mut self) -> Option<DynamicImage> {
        self.feed.lock().latest.clone()
    }

    fn zoom_range(&self) -> Option<ZoomRange> {
        self.feed.lock().zoom_range
    }

    fn apply_zoom(&mut self, level: f32) -> Result<()> {
        let mut state = self.feed.lock();
        if state.zoom_range.is_none() {
            bail!("camera does not support zoom");
        }
        state.requested_zoom = Some(level);
        Ok(())
    }

    fn is_live(&self) -> bool {
        !self.feed.lock().unavailable
    }
}

impl Drop for FeedStream {
    fn drop(&mut self) {
        let mut state = self.feed.lock();
        state.open_streams = state.open_streams.saturating_sub(1);
        if state.open_streams == 0 {
            state.latest = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::ImageFormat;

    use super::*;

    fn png_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::new_rgb8(2, 2)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn frames_only_land_while_a_stream_is_open() {
        let feed = FrameFeed::new();
        assert!(!feed.push_frame(&png_bytes()).unwrap());

        let mut stream = feed.open().unwrap();
        assert!(stream.grab_frame().is_none());
        assert!(feed.push_frame(&png_bytes()).unwrap());
        assert!(stream.grab_frame().is_some());

        drop(stream);
        assert!(!feed.push_frame(&png_bytes()).unwrap());
        let mut reopened = feed.open().unwrap();
        assert!(reopened.grab_frame().is_none());
    }

    #[test]
    fn unavailable_device_refuses_to_open() {
        let feed = FrameFeed::new();
        feed.report_device(false, None);
        assert!(feed.open().is_err());

        feed.report_device(true, None);
        assert!(feed.open().is_ok());
    }

    #[test]
    fn zoom_requests_need_zoom_support() {
        let feed = FrameFeed::new();
        let mut stream = feed.open().unwrap();
        assert!(stream.apply_zoom(2.0).is_err());

        feed.report_device(true, Some(ZoomRange::new(1.0, 5.0)));
        stream.apply_zoom(2.0).unwrap();
        assert_eq!(feed.requested_zoom(), Some(2.0));
    }

    #[test]
    fn garbage_frames_are_rejected() {
        let feed = FrameFeed::new();
        let _stream = feed.open().unwrap();
        assert!(feed.push_frame(b"nope").is_err());
        assert!(feed.push_data_url("data:image/png;base64,@@@").is_err());
    }
}
