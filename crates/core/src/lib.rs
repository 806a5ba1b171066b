//! # PersonaChat Core
//!
//! Domain types, traits, and error definitions for PersonaChat.
//! This crate has **no I/O framework dependencies**: it defines the domain
//! model that the provider, document, and session crates implement against.
//!
//! - [`message`]: role-tagged messages and the append-only conversation
//! - [`document`]: the per-session mapping of uploaded file name → text
//! - [`persona`]: the static persona prompt injected as the system message
//! - [`provider`]: the streaming completion backend abstraction

pub mod document;
pub mod error;
pub mod message;
pub mod persona;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use document::{DocumentContext, DocumentEntry};
pub use error::{DocumentError, Error, ProviderError, Result};
pub use message::{Conversation, ConversationId, Message, Role};
pub use persona::{Persona, PersonaSource};
pub use provider::{FragmentStream, Provider, ProviderRequest};
