use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use image::{codecs::jpeg::JpegEncoder, DynamicImage};

use crate::models::Artifact;
use crate::utils::DataUrl;

pub const STILL_MIME_TYPE: &str = "image/jpeg";

pub fn encode_jpeg(frame: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = frame.to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
        .encode_image(&rgb)
        .context("failed to encode frame as JPEG")?;
    Ok(bytes)
}

/// Turns a camera frame into an image artifact at full resolution.
pub fn frame_to_artifact(
    frame: &DynamicImage,
    quality: u8,
    captured_at: DateTime<Utc>,
) -> Result<Artifact> {
    let bytes = encode_jpeg(frame, quality)?;
    let url = DataUrl::from_bytes(STILL_MIME_TYPE, &bytes);
    Ok(Artifact::from_payload(url.payload, url.mime_type, captured_at))
}
