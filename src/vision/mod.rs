//! Analysis, chat and edit clients layered over a [`GenerativeBackend`].

pub mod analysis;
pub mod edit;
pub mod prompts;

use std::future::Future;

use anyhow::Result;
use serde::Serialize;

use crate::backend::GenerativeBackend;
use crate::models::{AnalysisResult, Artifact, EditResult};

/// Image that an edit starts from: the archived payload, or the latest edit
/// layered on top of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditSource {
    pub data: String,
    pub mime_type: String,
}

/// What the session needs from the model.
///
/// `analyze` and `ask` may still return errors even though the stock
/// implementation never does; the session treats such errors as a no-op.
pub trait VisionService: Send + Sync + 'static {
    fn analyze(&self, artifact: &Artifact) -> impl Future<Output = Result<AnalysisResult>> + Send;

    fn ask(&self, artifact: &Artifact, question: &str) -> impl Future<Output = Result<String>> + Send;

    fn edit(
        &self,
        source: &EditSource,
        instruction: &str,
    ) -> impl Future<Output = Result<EditResult>> + Send;
}

pub struct VisionClient<B> {
    backend: B,
}

impl<B: GenerativeBackend> VisionClient<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: GenerativeBackend> VisionService for VisionClient<B> {
    async fn analyze(&self, artifact: &Artifact) -> Result<AnalysisResult> {
        Ok(analysis::analyze(
            &self.backend,
            artifact.raw_data(),
            artifact.mime_type(),
            artifact.kind(),
        )
        .await)
    }

    async fn ask(&self, artifact: &Artifact, question: &str) -> Result<String> {
        Ok(analysis::ask(&self.backend, artifact.raw_data(), artifact.mime_type(), question).await)
    }

    async fn edit(&self, source: &EditSource, instruction: &str) -> Result<EditResult> {
        edit::edit_image(&self.backend, &source.data, &source.mime_type, instruction).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use anyhow::{anyhow, Result};

    use crate::backend::{GenerateContentRequest, GenerateContentResponse, GenerativeBackend, ModelRole};

    enum Reply {
        Ok(GenerateContentResponse),
        Err(String),
    }

    /// Backend that replays canned replies and records every request.
    /// The last reply repeats once the script runs out.
    pub struct ScriptedBackend {
        replies: Mutex<VecDeque<Reply>>,
        requests: Mutex<Vec<(ModelRole, GenerateContentRequest)>>,
    }

    impl ScriptedBackend {
        fn with(reply: Reply) -> Self {
            Self {
                replies: Mutex::new(VecDeque::from([reply])),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn replying(response: GenerateContentResponse) -> Self {
            Self::with(Reply::Ok(response))
        }

        pub fn failing(message: &str) -> Self {
            Self::with(Reply::Err(message.to_string()))
        }

        pub fn requests(&self) -> Vec<(ModelRole, GenerateContentRequest)> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl GenerativeBackend for ScriptedBackend {
        async fn generate(
            &self,
            role: ModelRole,
            request: GenerateContentRequest,
        ) -> Result<GenerateContentResponse> {
            self.requests.lock().unwrap().push((role, request));
            let mut replies = self.replies.lock().unwrap();
            let reply = if replies.len() > 1 {
                replies.pop_front()
            } else {
                replies.front().map(|reply| match reply {
                    Reply::Ok(response) => Reply::Ok(response.clone()),
                    Reply::Err(message) => Reply::Err(message.clone()),
                })
            };
            match reply {
                Some(Reply::Ok(response)) => Ok(response),
                Some(Reply::Err(message)) => Err(anyhow!(message)),
                None => Err(anyhow!("no scripted reply")),
            }
        }
    }
}
