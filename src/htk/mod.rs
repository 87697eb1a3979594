//! HTK-ASCII model files.
//!
//! * [`lexer`] — splits text into sigils, keywords, strings and words.
//! * [`parser`] — recursive-descent grammar producing macros and HMMs.
//! * [`writer`] — serialises macros and HMMs back to text.
//! * [`HtkCodec`] — folder layout: which files to read, where to write.

pub mod codec;
pub(crate) mod lexer;
pub(crate) mod parser;
pub(crate) mod writer;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use codec::HtkCodec;
