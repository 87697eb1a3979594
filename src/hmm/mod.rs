//! Phone HMMs: definition tree, factories and interpolation.
//!
//! # Layout
//!
//! ```text
//! Hmm ─ name
//!     └ HmmDefinition ─ options?          (Options)
//!                     ├ state_count
//!                     ├ states[]          (index, MacroOr<State>)
//!                     │   └ State ─ streams[] ─ mixtures[] ─ GaussianPdf
//!                     ├ regression_tree?  (parse-only)
//!                     ├ transition        (MacroOr<Transition>)
//!                     └ duration?
//! ```
//!
//! [`interpolation`] holds the numeric routines that combine resolved
//! definitions; [`Hmm::static_linear_interpolation`] is the entry point used
//! when two models are merged.

pub mod entity;
pub mod interpolation;
pub mod options;
pub mod types;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use entity::{Hmm, SILENCE_STATE_MACRO};
pub use options::{
    BaseKind, CovKind, DurKind, InputXform, LinXform, Options, ParameterKind, Qualifier,
};
pub use types::{
    Covariance, GaussianPdf, HmmDefinition, IndexedState, MacroOr, Matrix, Mixture, RegNode,
    RegTree, State, Stream, StreamPdf, Transition, Vector,
};
