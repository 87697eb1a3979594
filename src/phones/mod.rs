//! Phone inventories attached to an acoustic model.
//!
//! * [`TiedList`] — observed / tied context-dependent units (`tiedlist`).
//! * [`PhoneMapping`] — reversible phone-name substitutions
//!   (`monophones.repl`).

pub mod mapping;
pub mod tiedlist;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use mapping::{PhoneMapping, CONTEXT_DELIMITERS};
pub use tiedlist::TiedList;
