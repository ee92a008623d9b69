//! Answer generation: the generator contract, prompts and the Ollama client

pub mod ollama;
pub mod prompt;

pub use ollama::OllamaClient;
pub use prompt::PromptBuilder;

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::types::response::ServiceStatus;

/// Incremental answer fragments
pub type TokenStream = BoxStream<'static, Result<String>>;

/// Trait for grounded answer generation
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate a complete answer
    async fn generate(&self, question: &str, contexts: &[String]) -> Result<String>;

    /// Generate an answer as a stream of text fragments
    async fn generate_stream(&self, question: &str, contexts: &[String]) -> Result<TokenStream>;

    /// Check whether the generation service is reachable
    async fn health_check(&self) -> ServiceStatus;

    /// Get the model being used
    fn model(&self) -> &str;
}

/// Shared cancellation flag for one streaming answer
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Whether both handles refer to the same flag
    pub fn same_as(&self, other: &CancelFlag) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        assert!(!other.is_cancelled());
        flag.cancel();
        assert!(other.is_cancelled());
    }
}
