//! LLM provider implementations for PersonaChat.
//!
//! All providers implement the `personachat_core::Provider` trait and hand
//! back replies through the SSE decoder in [`sse`].

pub mod openai_compat;
pub mod sse;

pub use openai_compat::OpenAiCompatProvider;
pub use sse::{ReplyStream, SseDecoder, decode_stream};
