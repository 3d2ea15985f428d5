//! `data:` URL helpers.
//!
//! The webview hands media around as `data:<mime>;base64,<payload>` strings,
//! while the backend wants the bare base64 payload plus a MIME type.

use anyhow::{anyhow, bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime_type: String,
    pub payload: String,
}

impl DataUrl {
    pub fn new(mime_type: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            payload: payload.into(),
        }
    }

    /// Parses a base64 data URL. Non-base64 (percent-encoded) URLs are rejected
    /// because nothing in the app produces them.
    pub fn parse(value: &str) -> Result<Self> {
        let rest = value
            .strip_prefix("data:")
            .ok_or_else(|| anyhow!("not a data URL"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| anyhow!("data URL is missing its payload separator"))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| anyhow!("data URL is not base64 encoded"))?;
        if mime_type.is_empty() {
            bail!("data URL has no MIME type");
        }

        Ok(Self::new(mime_type, payload))
    }

    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(mime_type, BASE64.encode(bytes))
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(self.payload.as_bytes())
            .context("data URL payload is not valid base64")
    }

    /// File extension for the MIME subtype, `bin` when unknown.
    pub fn extension(&self) -> &str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            "video/webm" => "webm",
            "video/mp4" => "mp4",
            _ => "bin",
        }
    }
}

impl std::fmt::Display for DataUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.payload)
    }
}
