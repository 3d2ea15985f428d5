//! Instructions, response schema, fallbacks and edit presets.

use serde::Serialize;
use serde_json::{json, Value};

use crate::models::analysis::OBSERVATION_COUNT;

pub const IMAGE_ANALYSIS_INSTRUCTION: &str = "Analyze this image. 1. Provide 3 interesting observations. 2. Identify major objects and return their normalized bounding box coordinates [ymin, xmin, ymax, xmax] in 0-1000 range.";

pub const VIDEO_ANALYSIS_INSTRUCTION: &str = "Examine this video. Provide 3 key visual insights and detect any prominent objects found throughout the recording.";

/// Used when the model answers but leaves out the observation list.
pub const IMAGE_MISSING_OBSERVATIONS: [&str; OBSERVATION_COUNT] =
    ["Analysis available", "Visual confirmed", "Processing complete"];

/// Used when the image analysis call fails outright.
pub const IMAGE_FAILURE_OBSERVATIONS: [&str; OBSERVATION_COUNT] = [
    "Analysis error occurred.",
    "Please verify your connection.",
    "Try again with a clearer shot.",
];

pub const VIDEO_MISSING_OBSERVATIONS: [&str; OBSERVATION_COUNT] =
    ["Video insight 1", "Video insight 2", "Video insight 3"];

pub const VIDEO_FAILURE_OBSERVATIONS: [&str; OBSERVATION_COUNT] = [
    "Video analysis interrupted.",
    "Mime type or size issue.",
    "Check camera stream.",
];

pub const CHAT_EMPTY_REPLY: &str = "I'm sorry, I couldn't generate a helpful response for that.";

pub const CHAT_FAILURE_REPLY: &str =
    "I encountered an error trying to process your question about this image.";

pub fn chat_instruction(question: &str) -> String {
    format!("CONTEXT: You are looking at a visual file provided by the user. QUESTION: {question}")
}

/// JSON schema handed to the model so the analysis reply is machine-readable.
pub fn analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "points": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "A list of exactly 3 distinct, fascinating facts or observations about the image/video content."
            },
            "detectedObjects": {
                "type": "ARRAY",
                "description": "A list of key objects detected in the scene with their bounding box coordinates.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "label": { "type": "STRING", "description": "The name of the object detected." },
                        "box_2d": {
                            "type": "ARRAY",
                            "items": { "type": "INTEGER" },
                            "description": "The bounding box coordinates [ymin, xmin, ymax, xmax] in normalized 0-1000 scale."
                        }
                    },
                    "required": ["label", "box_2d"]
                }
            }
        },
        "required": ["points", "detectedObjects"]
    })
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct EditPreset {
    pub label: &'static str,
    pub prompt: &'static str,
}

pub const EDIT_PRESETS: [EditPreset; 3] = [
    EditPreset {
        label: "Elite Enhance",
        prompt: "Perform a high-end professional enhancement. Adjust lighting, clarity, and dynamic range to studio standards.",
    },
    EditPreset {
        label: "Neural Clarity",
        prompt: "Identify all key objects and sharpen their details while reducing background noise for a clean aesthetic.",
    },
    EditPreset {
        label: "Cinematic Mood",
        prompt: "Apply a professional cinematic color grade and lighting style similar to high-budget photography.",
    },
];

pub fn find_preset(label: &str) -> Option<&'static EditPreset> {
    EDIT_PRESETS
        .iter()
        .find(|preset| preset.label.eq_ignore_ascii_case(label))
}
