use serde::{Deserialize, Serialize};

/// Number of observations every analysis carries.
pub const OBSERVATION_COUNT: usize = 3;

/// Upper bound of the normalized box coordinate space.
pub const BOX_SCALE: i32 = 1000;

/// Object location as `[top, left, bottom, right]` in 0..=1000 space,
/// independent of the pixel size of the source image.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct BoundingBox([i32; 4]);

impl BoundingBox {
    pub fn new(top: i32, left: i32, bottom: i32, right: i32) -> Self {
        Self([top, left, bottom, right].map(|v| v.clamp(0, BOX_SCALE)))
    }

    /// Accepts the backend's loosely typed list; anything but four values is
    /// rejected.
    pub fn from_slice(values: &[i64]) -> Option<Self> {
        match values {
            [top, left, bottom, right] => Some(Self::new(
                clamp_i64(*top),
                clamp_i64(*left),
                clamp_i64(*bottom),
                clamp_i64(*right),
            )),
            _ => None,
        }
    }
}

fn clamp_i64(value: i64) -> i32 {
    value.clamp(0, BOX_SCALE as i64) as i32
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectedObject {
    pub label: String,
    #[serde(rename = "box_2d")]
    pub bounding_box: BoundingBox,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceLink {
    pub uri: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub observations: Vec<String>,
    #[serde(default)]
    pub detected_objects: Vec<DetectedObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_links: Option<Vec<ReferenceLink>>,
}

impl AnalysisResult {
    /// Builds a result whose observation list is forced to exactly
    /// [`OBSERVATION_COUNT`] entries: extra entries are dropped and missing ones
    /// are taken from `filler` by position.
    pub fn with_observations(
        observations: Vec<String>,
        filler: &[&str; OBSERVATION_COUNT],
        detected_objects: Vec<DetectedObject>,
    ) -> Self {
        let mut observations: Vec<String> = observations
            .into_iter()
            .filter(|o| !o.trim().is_empty())
            .take(OBSERVATION_COUNT)
            .collect();
        for slot in observations.len()..OBSERVATION_COUNT {
            observations.push(filler[slot].to_string());
        }

        Self {
            observations,
            detected_objects,
            reference_links: None,
        }
    }

    pub fn placeholder(lines: &[&str; OBSERVATION_COUNT]) -> Self {
        Self::with_observations(Vec::new(), lines, Vec::new())
    }
}

/// Outcome of an edit call. Either half may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EditResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_response: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILLER: [&str; 3] = ["a", "b", "c"];

    #[test]
    fn observations_are_padded_and_truncated_to_three() {
        let short = AnalysisResult::with_observations(vec!["one".into()], &FILLER, Vec::new());
        assert_eq!(short.observations, vec!["one", "b", "c"]);

        let long = AnalysisResult::with_observations(
            vec!["1".into(), "2".into(), "3".into(), "4".into()],
            &FILLER,
            Vec::new(),
        );
        assert_eq!(long.observations, vec!["1", "2", "3"]);
    }

    #[test]
    fn blank_observations_do_not_count() {
        let result =
            AnalysisResult::with_observations(vec!["  ".into(), "x".into()], &FILLER, Vec::new());
        assert_eq!(result.observations, vec!["x", "b", "c"]);
    }

    #[test]
    fn bounding_box_requires_four_values_and_clamps() {
        assert!(BoundingBox::from_slice(&[1, 2, 3]).is_none());
        let bbox = BoundingBox::from_slice(&[-5, 100, 1200, 600]).unwrap();
        assert_eq!(bbox, BoundingBox::new(0, 100, 1000, 600));
    }

    #[test]
    fn detected_object_uses_backend_field_name() {
        let object = DetectedObject {
            label: "cup".into(),
            bounding_box: BoundingBox::new(1, 2, 3, 4),
        };
        let json = serde_json::to_value(&object).unwrap();
        assert_eq!(json["box_2d"], serde_json::json!([1, 2, 3, 4]));
    }
}
