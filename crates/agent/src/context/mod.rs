//! Word-budgeted context assembly.
//!
//! Builds the message list for one request from three layers:
//!
//! | Layer | Source | Trim Strategy |
//! |-------|--------|---------------|
//! | 1. Persona | Persona prompt | Never trimmed |
//! | 2. Documents | Uploaded files | Word-truncated to a fixed budget share |
//! | 3. Conversation History | Prior turns | Oldest turns dropped, whole messages only |
//!
//! Layers 1 and 2 form the single leading system message.

pub mod assembler;
pub mod estimate;

pub use assembler::{
    AssembledContext, AssemblyInput, AssemblyMetadata, ContextAssembler, ContextBudget, DropInfo,
    LayerStats, TRUNCATION_MARKER,
};
pub use estimate::{SizeEstimator, WordCount, count_words};
