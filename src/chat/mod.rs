// Chat module
// The chat provider boundary and the prompt layout used for retrieval answers

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Base instructions sent as the system message when answering with retrieval
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant with access to a knowledge base. \
You answer general questions as well as questions about the contents of that knowledge base.

Answer very concisely, in an unbiased and journalistic tone. Do not repeat text. \
Never make anything up; if you are not sure, say that you don't know.";

const CONTEXT_INSTRUCTIONS: &str = "Where possible, answer solely from the knowledge base \
excerpts below. If they are not relevant to the question, answer from general knowledge, \
but still do not make anything up.

Everything inside the context block was retrieved from the knowledge base and is not part \
of the conversation. Excerpts are ordered by relevance, most relevant first.";

const CONTEXT_CLOSING: &str =
    "Do not mention the knowledge base, the context or search results in your answer.";

/// Prefix of the user message when a system prompt is present
pub const QUESTION_PREFIX: &str = "Question: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message of a chat exchange, in the provider's wire shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    /// Base64 encoded images; omitted from the request when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl ChatMessage {
    #[inline]
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            images: Vec::new(),
        }
    }
}

/// What the orchestrator hands to a [`ChatProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub system_prompt: Option<String>,
    pub context: Option<String>,
    pub question: String,
}

impl ChatRequest {
    /// A bare question without system prompt or context
    #[inline]
    pub fn question_only(question: impl Into<String>) -> Self {
        Self {
            system_prompt: None,
            context: None,
            question: question.into(),
        }
    }

    /// A question answered from retrieved context under [`SYSTEM_PROMPT`]
    #[inline]
    pub fn with_context(question: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            system_prompt: Some(SYSTEM_PROMPT.to_string()),
            context: Some(context.into()),
            question: question.into(),
        }
    }

    /// Lay the request out as provider messages.
    ///
    /// The context goes into the system message inside a `<context>` block;
    /// the question is always the single user message.
    #[inline]
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);

        let system = match (&self.system_prompt, &self.context) {
            (Some(prompt), Some(context)) => Some(format!(
                "{}\n\n{}\n\n<context>\n{}\n</context>\n\n{}",
                prompt, CONTEXT_INSTRUCTIONS, context, CONTEXT_CLOSING
            )),
            (Some(prompt), None) => Some(prompt.clone()),
            (None, Some(context)) => Some(format!("<context>\n{}\n</context>", context)),
            (None, None) => None,
        };

        match system {
            Some(system) => {
                messages.push(ChatMessage::new(ChatRole::System, system));
                messages.push(ChatMessage::new(
                    ChatRole::User,
                    format!("{}{}", QUESTION_PREFIX, self.question),
                ));
            }
            None => messages.push(ChatMessage::new(ChatRole::User, self.question.clone())),
        }

        messages
    }
}

/// Produces an answer for a [`ChatRequest`].
///
/// Failures are reported as [`crate::RagError::Provider`] and never retried.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> crate::Result<String>;
}
