use async_trait::async_trait;

use chatgate_protocol::openai::create_chat_completions::request::CreateChatCompletionRequestBody;
use chatgate_protocol::openai::create_chat_completions::response::CreateChatCompletionResponse;
use chatgate_protocol::openai::create_chat_completions::stream::CreateChatCompletionStreamResponse;

mod mock;

pub use mock::MockBackend;

/// Lazy, finite, forward-only chunk sequence of one streamed completion.
/// Dropping the receiver stops the producer: its next send fails and it
/// returns, so nothing keeps generating after the consumer is gone.
pub type ChunkStream =
    tokio::sync::mpsc::Receiver<Result<CreateChatCompletionStreamResponse, BackendError>>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    /// The capability failed before producing a usable response.
    #[error("{message}")]
    Failed {
        /// Upstream status to surface instead of 500, when the backend has one.
        status: Option<u16>,
        message: String,
    },
    /// The chunk sequence broke after generation had already begun.
    #[error("stream interrupted: {0}")]
    Interrupted(String),
}

impl BackendError {
    pub fn failed(message: impl Into<String>) -> Self {
        BackendError::Failed {
            status: None,
            message: message.into(),
        }
    }

    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            BackendError::Failed { status, .. } => *status,
            BackendError::Interrupted(_) => None,
        }
    }
}

/// The text-generation capability behind the gateway. Implementations own
/// model execution entirely; the gateway only validates, dispatches, and
/// encodes. Test doubles implement this trait directly.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Produce exactly one completion for a validated request.
    async fn complete(
        &self,
        request: &CreateChatCompletionRequestBody,
    ) -> Result<CreateChatCompletionResponse, BackendError>;

    /// Produce an incremental chunk sequence for a validated request.
    /// All chunks of one call share an id and arrive in generation order.
    async fn complete_stream(
        &self,
        request: &CreateChatCompletionRequestBody,
    ) -> Result<ChunkStream, BackendError>;
}
