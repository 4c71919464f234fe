//! Document-grounded context assembly.
//!
//! Three stages, each pure and independently testable:
//!
//! | Stage | Input | Output |
//! |-------|-------|--------|
//! | Chunker | extracted text | fixed-size ordered chunks |
//! | Relevance Selector | chunks + question | bounded ordered subset |
//! | Prompt Assembler | state + question | ordered message sequence |

pub mod assembler;
pub mod chunker;
pub mod relevance;

pub use assembler::{AssemblyOptions, TRUNCATION_MARKER, assemble};
pub use chunker::{ChunkError, chunk};
pub use relevance::{FallbackPolicy, select_relevant};
