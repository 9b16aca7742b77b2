//! Language-model collaborator: the `callModel` contract and its Gemini
//! implementation.

use async_trait::async_trait;

use crate::{error::Result, models::Message};

pub mod gemini;

pub use gemini::{GeminiClient, GeminiConfig};

/// One request to the model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelRequest {
    /// System instruction sent alongside the messages
    pub system: Option<String>,
    /// Conversation so far, oldest first
    pub messages: Vec<Message>,
}

impl ModelRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            system: None,
            messages,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Anything that can turn a conversation into reply text.
///
/// Implementations report failures as [`crate::BuildError::ModelCall`].
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, request: ModelRequest) -> Result<String>;
}
