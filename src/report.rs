//! Exportable summary of the artifact on screen.
//!
//! The webview lays the PDF page out; this module decides what goes on it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Artifact, MediaKind};
use crate::session::SessionState;
use crate::utils::{time::format_report_timestamp, DataUrl};

pub const REPORT_TITLE: &str = "NanoLens Guide";
pub const INSIGHTS_HEADING: &str = "ANALYSIS INSIGHTS";
pub const REPORT_FILE_NAME: &str = "NanoLens_Report.pdf";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub title: String,
    pub header: String,
    pub kind: MediaKind,
    /// Only image artifacts carry a picture; the edited one wins.
    pub image: Option<String>,
    pub insights_heading: String,
    pub insights: Vec<String>,
    pub file_name: String,
}

impl AnalysisReport {
    pub fn build(artifact: &Artifact, edited_image: Option<&str>) -> Self {
        let image = match artifact.kind() {
            MediaKind::Image => Some(
                edited_image
                    .unwrap_or_else(|| artifact.preview_data())
                    .to_string(),
            ),
            MediaKind::Video => None,
        };
        let insights = artifact
            .analysis()
            .map(|analysis| analysis.observations.clone())
            .unwrap_or_default();

        Self {
            title: REPORT_TITLE.to_string(),
            header: format!(
                "TIME & DATE: {}",
                format_report_timestamp(artifact.created_at()).to_uppercase()
            ),
            kind: artifact.kind(),
            image,
            insights_heading: INSIGHTS_HEADING.to_string(),
            insights,
            file_name: REPORT_FILE_NAME.to_string(),
        }
    }

    pub fn from_state(state: &SessionState) -> Option<Self> {
        state
            .artifact()
            .map(|artifact| Self::build(artifact, state.edited_image()))
    }

    /// Insights as `1. ...`, `2. ...` lines.
    pub fn numbered_insights(&self) -> Vec<String> {
        self.insights
            .iter()
            .enumerate()
            .map(|(i, insight)| format!("{}. {insight}", i + 1))
            .collect()
    }

    pub fn to_markdown(&self) -> String {
        let mut out = format!("# {}\n\n{}\n\n", self.title, self.header);
        if let Some(image) = &self.image {
            out.push_str(&format!("![capture]({image})\n\n"));
        }
        out.push_str(&format!("## {}\n\n", self.insights_heading));
        for line in self.numbered_insights() {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

/// Writes the displayed image to `dir` as `nano-lens-<millis>.<ext>`.
pub fn save_displayed_image(dir: &Path, displayed: &str, now: DateTime<Utc>) -> Result<PathBuf> {
    let url = DataUrl::parse(displayed)?;
    let bytes = url.decode()?;
    if bytes.is_empty() {
        return Err(anyhow!("displayed image is empty"));
    }

    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(format!(
        "nano-lens-{}.{}",
        now.timestamp_millis(),
        url.extension()
    ));
    fs::write(&path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnalysisResult;

    fn analyzed(mime: &str) -> Artifact {
        Artifact::from_payload("AAAA", mime, Utc::now())
            .with_analysis(AnalysisResult::placeholder(&["Red mug", "Wooden desk", "Morning light"]))
    }

    #[test]
    fn image_report_prefers_edited_image() {
        let artifact = analyzed("image/jpeg");
        let report = AnalysisReport::build(&artifact, Some("data:image/png;base64,EDIT"));

        assert_eq!(report.image.as_deref(), Some("data:image/png;base64,EDIT"));
        assert!(report.header.starts_with("TIME & DATE: "));
        assert_eq!(
            report.numbered_insights(),
            vec!["1. Red mug", "2. Wooden desk", "3. Morning light"]
        );

        let plain = AnalysisReport::build(&artifact, None);
        assert_eq!(plain.image.as_deref(), Some(artifact.preview_data()));
    }

    #[test]
    fn video_report_has_no_image() {
        let report = AnalysisReport::build(&analyzed("video/mp4"), None);
        assert!(report.image.is_none());
        assert!(!report.to_markdown().contains("!["));
    }

    #[test]
    fn markdown_lists_numbered_insights() {
        let markdown = AnalysisReport::build(&analyzed("image/jpeg"), None).to_markdown();
        assert!(markdown.starts_with("# NanoLens Guide\n"));
        assert!(markdown.contains("## ANALYSIS INSIGHTS\n\n1. Red mug\n2. Wooden desk\n3. Morning light\n"));
    }

    #[test]
    fn report_needs_an_artifact() {
        assert!(AnalysisReport::from_state(&SessionState::Idle).is_none());
    }

    #[test]
    fn displayed_image_is_saved_with_timestamped_name() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc::now();
        let path = save_displayed_image(dir.path(), "data:image/png;base64,AAECAw==", now).unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            format!("nano-lens-{}.png", now.timestamp_millis())
        );
        assert_eq!(fs::read(path).unwrap(), vec![0, 1, 2, 3]);
        assert!(save_displayed_image(dir.path(), "garbage", now).is_err());
    }
}
