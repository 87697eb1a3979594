//! HTK-ASCII acoustic models: read, merge, interpolate, write.
//!
//! # Architecture
//!
//! ```text
//!   folder ──▶ ModelReadWrite ──▶ HtkCodec ──▶ lexer ▶ parser
//!                                    │
//!                                    ▼
//!                              AcousticModel ─ macros, hmms, tiedlist, repl
//!                                    │
//!            fill_hmms / replace_phones / extract_monophones / merge_model
//!                                    │
//!   ModelMixer ──────────────────────┘──▶ writer ──▶ folder
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use htk_acmodel::readwrite::ModelReadWrite;
//!
//! let mut base = ModelReadWrite::new("models/base").read()?;
//! let other = ModelReadWrite::new("models/speaker").read()?;
//! let stats = base.merge_model(&other, 0.7)?;
//! println!("{stats}");
//! ModelReadWrite::new("models/merged").write(&base, "hmmdefs")?;
//! # Ok::<(), htk_acmodel::AcModelError>(())
//! ```

pub mod config;
pub mod error;
mod fsio;
pub mod hmm;
pub mod htk;
pub mod mixer;
pub mod model;
pub mod phones;
pub mod readwrite;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use error::{AcModelError, Result};
pub use hmm::Hmm;
pub use htk::HtkCodec;
pub use mixer::ModelMixer;
pub use model::{AcousticModel, MergeStats};
pub use phones::{PhoneMapping, TiedList};
pub use readwrite::{ModelCodec, ModelReadWrite};
