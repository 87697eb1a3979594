//! The acoustic model aggregate and its macros.

pub mod acmodel;
pub mod macros;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use acmodel::{AcousticModel, MergeStats};
pub use macros::{Macro, MacroDef, MacroKind};
