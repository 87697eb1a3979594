//! Configuration module for the acoustic-model engine.
//!
//! Provides `EngineConfig` (top-level settings), sub-configs for each
//! subsystem, `AppPaths` for the cross-platform config directory, and TOML
//! persistence via `EngineConfig::load` / `EngineConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{EngineConfig, FileNames, MixConfig, ProtoConfig};
