use serde::{Deserialize, Serialize};

use crate::openai::create_chat_completions::types::ChatCompletionRequestMessage;

/// Up to 4 stop sequences are allowed, but this limit is not enforced here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StopConfiguration {
    Single(String),
    Many(Vec<String>),
}

/// The sampling fields below are forwarded to the backend verbatim; the
/// gateway validates presence and shape only, never ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CreateChatCompletionRequestBody {
    /// Model ID used to generate the response.
    pub model: String,
    /// A list of messages comprising the conversation so far.
    /// Must contain at least 1 message (enforced by the gateway codec).
    pub messages: Vec<ChatCompletionRequestMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Range is 0..=2.0 (not enforced here).
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Range is 0.0..=1.0 (not enforced here).
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Must be at least 1; the backend may enforce an upper bound (not enforced here).
    pub n: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Total prompt tokens plus `max_tokens` must fit the model context (not enforced here).
    pub max_tokens: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Range is -2.0..=2.0 (not enforced here).
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Range is -2.0..=2.0 (not enforced here).
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl CreateChatCompletionRequestBody {
    pub fn is_stream(&self) -> bool {
        self.stream.unwrap_or(false)
    }
}
