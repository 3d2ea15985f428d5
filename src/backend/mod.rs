//! Transport to the hosted generative model.

pub mod gemini;
pub mod reloadable;
pub mod types;

use std::future::Future;

use anyhow::Result;

pub use gemini::GeminiClient;
pub use reloadable::ReloadableGemini;
pub use types::{GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part};

/// Which configured model a request is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    /// Structured analysis and free-text chat.
    Vision,
    /// Image regeneration.
    ImageEdit,
}

/// One request/response round trip against the model API.
///
/// Implementations report transport, HTTP and decoding problems as errors;
/// deciding whether a failure is fatal is left to the caller.
pub trait GenerativeBackend: Send + Sync + 'static {
    fn generate(
        &self,
        role: ModelRole,
        request: GenerateContentRequest,
    ) -> impl Future<Output = Result<GenerateContentResponse>> + Send;
}
