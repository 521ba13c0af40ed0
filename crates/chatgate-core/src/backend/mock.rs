use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use chatgate_protocol::openai::create_chat_completions::request::CreateChatCompletionRequestBody;
use chatgate_protocol::openai::create_chat_completions::response::{
    ChatCompletionChoice, ChatCompletionObjectType, CreateChatCompletionResponse,
};
use chatgate_protocol::openai::create_chat_completions::stream::{
    ChatCompletionChunkObjectType, ChatCompletionStreamChoice, CreateChatCompletionStreamResponse,
};
use chatgate_protocol::openai::create_chat_completions::types::{
    ChatCompletionFinishReason, ChatCompletionResponseMessage, ChatCompletionResponseRole,
    ChatCompletionStreamResponseDelta, CompletionUsage,
};

use crate::backend::{Backend, BackendError, ChunkStream};

const CANNED_REPLY: &str = "This is a canned completion from the chatgate mock backend. \
Seeing this message means the gateway wiring works end to end.";

const DEFAULT_CHUNK_DELAY: Duration = Duration::from_millis(25);

/// Canned-text backend standing in for a real inference engine. Streaming
/// emits the reply word by word; the streamed concatenation equals the
/// non-streaming content for the same request, so clients can be tested
/// against either path interchangeably.
#[derive(Debug, Clone)]
pub struct MockBackend {
    reply: String,
    chunk_delay: Duration,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            reply: CANNED_REPLY.to_string(),
            chunk_delay: DEFAULT_CHUNK_DELAY,
        }
    }

    pub fn with_reply(reply: impl Into<String>, chunk_delay: Duration) -> Self {
        Self {
            reply: reply.into(),
            chunk_delay,
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn complete(
        &self,
        request: &CreateChatCompletionRequestBody,
    ) -> Result<CreateChatCompletionResponse, BackendError> {
        let prompt_tokens = prompt_chars(request);
        let completion_tokens = self.reply.len() as i64;
        Ok(CreateChatCompletionResponse {
            id: new_completion_id(),
            object: ChatCompletionObjectType::ChatCompletion,
            created: now_epoch(),
            model: request.model.clone(),
            choices: vec![ChatCompletionChoice {
                index: 0,
                message: ChatCompletionResponseMessage {
                    role: ChatCompletionResponseRole::Assistant,
                    content: self.reply.clone(),
                },
                finish_reason: ChatCompletionFinishReason::Stop,
            }],
            usage: CompletionUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
        })
    }

    async fn complete_stream(
        &self,
        request: &CreateChatCompletionRequestBody,
    ) -> Result<ChunkStream, BackendError> {
        let (tx, rx) = tokio::sync::mpsc::channel(16);
        let id = new_completion_id();
        let created = now_epoch();
        let model = request.model.clone();
        let words: Vec<String> = self.reply.split(' ').map(str::to_string).collect();
        let delay = self.chunk_delay;

        tokio::spawn(async move {
            let last = words.len().saturating_sub(1);
            for (i, word) in words.into_iter().enumerate() {
                let content = if i == last { word } else { format!("{word} ") };
                let delta = ChatCompletionStreamResponseDelta {
                    // The role is announced once, on the first chunk.
                    role: (i == 0).then_some(ChatCompletionResponseRole::Assistant),
                    content: Some(content),
                };
                let chunk = CreateChatCompletionStreamResponse {
                    id: id.clone(),
                    object: ChatCompletionChunkObjectType::ChatCompletionChunk,
                    created,
                    model: model.clone(),
                    choices: vec![ChatCompletionStreamChoice {
                        index: 0,
                        delta,
                        finish_reason: None,
                    }],
                };
                if tx.send(Ok(chunk)).await.is_err() {
                    return;
                }
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }

            let terminal = CreateChatCompletionStreamResponse {
                id,
                object: ChatCompletionChunkObjectType::ChatCompletionChunk,
                created,
                model,
                choices: vec![ChatCompletionStreamChoice {
                    index: 0,
                    delta: ChatCompletionStreamResponseDelta::default(),
                    finish_reason: Some(ChatCompletionFinishReason::Stop),
                }],
            };
            let _ = tx.send(Ok(terminal)).await;
        });

        Ok(rx)
    }
}

fn new_completion_id() -> String {
    format!("chatcmpl-{}", Uuid::new_v4().simple())
}

fn now_epoch() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

fn prompt_chars(request: &CreateChatCompletionRequestBody) -> i64 {
    request
        .messages
        .iter()
        .map(|message| message.content.len() as i64)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateChatCompletionRequestBody {
        serde_json::from_value(serde_json::json!({
            "model": "gateway-standard",
            "messages": [{"role": "user", "content": "Hello!"}]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn completion_has_one_stop_choice_and_usage() {
        let backend = MockBackend::new();
        let response = backend.complete(&request()).await.unwrap();

        assert_eq!(response.choices.len(), 1);
        assert_eq!(response.choices[0].finish_reason, ChatCompletionFinishReason::Stop);
        assert!(response.id.starts_with("chatcmpl-"));
        assert_eq!(response.usage.prompt_tokens, "Hello!".len() as i64);
        assert_eq!(
            response.usage.total_tokens,
            response.usage.prompt_tokens + response.usage.completion_tokens
        );
    }

    #[tokio::test]
    async fn stream_concatenation_matches_the_completion_content() {
        let backend = MockBackend::with_reply("alpha beta gamma", Duration::ZERO);
        let req = request();

        let completion = backend.complete(&req).await.unwrap();
        let mut rx = backend.complete_stream(&req).await.unwrap();

        let mut ids = Vec::new();
        let mut content = String::new();
        let mut finish_reasons = Vec::new();
        while let Some(chunk) = rx.recv().await {
            let chunk = chunk.unwrap();
            ids.push(chunk.id.clone());
            if let Some(piece) = &chunk.choices[0].delta.content {
                content.push_str(piece);
            }
            finish_reasons.push(chunk.choices[0].finish_reason);
        }

        assert_eq!(content, completion.choices[0].message.content);
        assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(finish_reasons.pop(), Some(Some(ChatCompletionFinishReason::Stop)));
        assert!(finish_reasons.iter().all(Option::is_none));
    }

    #[tokio::test]
    async fn role_is_announced_only_on_the_first_chunk() {
        let backend = MockBackend::with_reply("one two", Duration::ZERO);
        let mut rx = backend.complete_stream(&request()).await.unwrap();

        let first = rx.recv().await.unwrap().unwrap();
        assert_eq!(
            first.choices[0].delta.role,
            Some(ChatCompletionResponseRole::Assistant)
        );

        while let Some(chunk) = rx.recv().await {
            assert_eq!(chunk.unwrap().choices[0].delta.role, None);
        }
    }

    #[tokio::test]
    async fn dropping_the_receiver_stops_the_producer() {
        let backend = MockBackend::with_reply("word ".repeat(1000), Duration::from_millis(1));
        let mut rx = backend.complete_stream(&request()).await.unwrap();
        let _ = rx.recv().await.unwrap().unwrap();
        drop(rx);
        // Nothing to assert directly; the spawned producer exits on its next
        // failed send, which the channel closure guarantees.
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
