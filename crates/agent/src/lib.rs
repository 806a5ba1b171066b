//! Context budgeting and session orchestration: the heart of PersonaChat.
//!
//! Every user turn follows the same path:
//!
//! 1. **Append** the user message to the session's conversation
//! 2. **Assemble** a budgeted message list (persona + documents + history)
//! 3. **Stream** the reply from the provider, fragment by fragment
//! 4. **Commit** the full reply to history once the stream completed

pub mod context;
pub mod session;

pub use context::{
    AssembledContext, AssemblyInput, AssemblyMetadata, ContextAssembler, ContextBudget, DropInfo,
    LayerStats, SizeEstimator, WordCount,
};
pub use session::{ChatSession, SessionSettings};
