pub mod analysis;
pub mod artifact;

pub use analysis::{AnalysisResult, BoundingBox, DetectedObject, EditResult, ReferenceLink};
pub use artifact::{Artifact, ChatRole, ChatTurn, MediaKind};
