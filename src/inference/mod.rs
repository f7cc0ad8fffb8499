pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::InferenceError;
use crate::types::{InferenceRequest, InferenceResponse};

/// Pure LLM API call. No state, no history, no context management.
/// Request in, response out.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse, InferenceError>;
}

/// Blanket impl so `Box<dyn InferenceProvider>` can be passed directly to `Agent::new()`.
#[async_trait]
impl InferenceProvider for Box<dyn InferenceProvider> {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        (**self).infer(request).await
    }
}

/// Shared providers: the agent loop and the research tool use the same client.
#[async_trait]
impl<T: InferenceProvider + ?Sized> InferenceProvider for Arc<T> {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceResponse, InferenceError> {
        (**self).infer(request).await
    }
}

pub use openai::OpenAiProvider;
