//! Engine settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files.  Missing keys fall back
//! to their defaults, so a settings file only needs the values it changes.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// FileNames
// ---------------------------------------------------------------------------

/// File names that make up an acoustic-model folder.
///
/// | Field        | Default           | Role                                |
/// |--------------|-------------------|-------------------------------------|
/// | `hmmdefs`    | `hmmdefs`         | macros + HMM bodies                 |
/// | `macros`     | `macros`          | macros only (when hmmdefs absent)   |
/// | `vfloors`    | `vFloors`         | variance floors                     |
/// | `hmm_ext`    | `hmm`             | individual / prototype HMM files    |
/// | `tiedlist`   | `tiedlist`        | observed / tied phone table         |
/// | `phone_repl` | `monophones.repl` | phone replacement table             |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileNames {
    pub hmmdefs: String,
    pub macros: String,
    pub vfloors: String,
    /// Extension (without the dot) of single-HMM files.
    pub hmm_ext: String,
    pub tiedlist: String,
    pub phone_repl: String,
}

impl Default for FileNames {
    fn default() -> Self {
        Self {
            hmmdefs: "hmmdefs".into(),
            macros: "macros".into(),
            vfloors: "vFloors".into(),
            hmm_ext: "hmm".into(),
            tiedlist: "tiedlist".into(),
            phone_repl: "monophones.repl".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ProtoConfig
// ---------------------------------------------------------------------------

/// Shape of the prototype written to bootstrap training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtoConfig {
    /// HTK parameter kind written in the `~o` header (e.g. `MFCC_0_D_N_Z`).
    pub parameter_kind: String,
    /// Self-loop probability of each emitting state, in order.
    pub self_loops: Vec<f64>,
}

impl Default for ProtoConfig {
    fn default() -> Self {
        Self {
            parameter_kind: "MFCC_0_D_N_Z".into(),
            self_loops: vec![0.6, 0.6, 0.7],
        }
    }
}

impl ProtoConfig {
    /// Total number of states, including the two non-emitting ones.
    pub fn num_states(&self) -> usize {
        self.self_loops.len() + 2
    }
}

// ---------------------------------------------------------------------------
// MixConfig
// ---------------------------------------------------------------------------

/// Defaults for model merging and mixing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixConfig {
    /// Weight of the base model (0.0 – 1.0).
    pub gamma: f64,
    /// Output format name passed to the model writer.
    pub format: String,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            gamma: 0.5,
            format: "hmmdefs".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// EngineConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level engine configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use htk_acmodel::config::EngineConfig;
///
/// // Load (returns Default when file is missing)
/// let config = EngineConfig::load().unwrap();
/// assert_eq!(config.files.hmmdefs, "hmmdefs");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Folder layout.
    pub files: FileNames,
    /// Prototype writer settings.
    pub proto: ProtoConfig,
    /// Merge / mix defaults.
    pub mix: MixConfig,
}

impl EngineConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(EngineConfig::default())` when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = EngineConfig::default();
        original.save_to(&path).expect("save");

        let loaded = EngineConfig::load_from(&path).expect("load");
        assert_eq!(original, loaded);
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = EngineConfig::load_from(&path).expect("should not error");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn default_values() {
        let cfg = EngineConfig::default();

        assert_eq!(cfg.files.hmmdefs, "hmmdefs");
        assert_eq!(cfg.files.vfloors, "vFloors");
        assert_eq!(cfg.files.tiedlist, "tiedlist");
        assert_eq!(cfg.files.phone_repl, "monophones.repl");
        assert_eq!(cfg.proto.parameter_kind, "MFCC_0_D_N_Z");
        assert_eq!(cfg.proto.num_states(), 5);
        assert_eq!(cfg.mix.gamma, 0.5);
        assert_eq!(cfg.mix.format, "hmmdefs");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[mix]\ngamma = 0.8\n").expect("write");

        let cfg = EngineConfig::load_from(&path).expect("load");
        assert_eq!(cfg.mix.gamma, 0.8);
        assert_eq!(cfg.mix.format, "hmmdefs");
        assert_eq!(cfg.files, FileNames::default());
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = EngineConfig::default();
        cfg.files.hmmdefs = "models.mmf".into();
        cfg.proto.parameter_kind = "MFCC_E_D_A".into();
        cfg.proto.self_loops = vec![0.5, 0.5, 0.5, 0.5];
        cfg.mix.gamma = 0.25;

        cfg.save_to(&path).expect("save");
        let loaded = EngineConfig::load_from(&path).expect("load");

        assert_eq!(loaded.files.hmmdefs, "models.mmf");
        assert_eq!(loaded.proto.parameter_kind, "MFCC_E_D_A");
        assert_eq!(loaded.proto.num_states(), 6);
        assert_eq!(loaded.mix.gamma, 0.25);
    }
}
