//! Camera access and still-frame capture.
//!
//! A [`CameraDevice`] hands out [`CameraStream`]s; holding a stream is holding
//! the camera, and dropping it releases the device.

#[cfg(feature = "desktop")]
pub mod commands;
pub mod controller;
pub mod encode;
pub mod feed;

use anyhow::Result;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

pub use controller::{CameraStatus, CaptureController};
pub use feed::FrameFeed;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ZoomRange {
    pub min: f32,
    pub max: f32,
}

impl ZoomRange {
    pub fn new(min: f32, max: f32) -> Self {
        let min = if min > 0.0 { min } else { 1.0 };
        Self {
            min,
            max: max.max(min),
        }
    }

    pub fn capped(self, ceiling: f32) -> Self {
        Self::new(self.min, self.max.min(ceiling.max(self.min)))
    }

    pub fn clamp(&self, level: f32) -> f32 {
        if level.is_nan() {
            return self.min;
        }
        level.clamp(self.min, self.max)
    }
}

pub trait CameraStream: Send {
    /// Most recent frame, `None` until the stream has produced one.
    fn grab_frame(&mut self) -> Option<DynamicImage>;

    fn zoom_range(&self) -> Option<ZoomRange>;

    fn apply_zoom(&mut self, level: f32) -> Result<()>;

    /// Whether the underlying device is still delivering.
    fn is_live(&self) -> bool {
        true
    }
}

pub trait CameraDevice: Send + Sync + 'static {
    fn open(&self) -> Result<Box<dyn CameraStream>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_range_caps_and_clamps() {
        let range = ZoomRange::new(1.0, 25.0).capped(10.0);
        assert_eq!(range.max, 10.0);
        assert_eq!(range.clamp(0.2), 1.0);
        assert_eq!(range.clamp(12.0), 10.0);
        assert_eq!(range.clamp(f32::NAN), 1.0);
    }

    #[test]
    fn zero_minimum_defaults_to_one() {
        let range = ZoomRange::new(0.0, 4.0);
        assert_eq!(range.min, 1.0);
        assert_eq!(ZoomRange::new(2.0, 1.0).max, 2.0);
    }
}
