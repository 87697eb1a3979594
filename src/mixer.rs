//! Mixing a text-trained model with a speaker-adapted one.
//!
//! Both models are reduced to their monophones and renamed into a shared
//! phone space through their own replacement tables.  Mixing then merges the
//! second model into a copy of the first, maps the phones back to the first
//! model's original names and writes the result.

use std::path::Path;

use crate::config::EngineConfig;
use crate::error::{AcModelError, Result};
use crate::model::{AcousticModel, MergeStats};
use crate::phones::PhoneMapping;
use crate::readwrite::ModelReadWrite;

/// Two monophone models ready to be mixed.
#[derive(Debug, Clone, Default)]
pub struct ModelMixer {
    config: EngineConfig,
    models: Option<(AcousticModel, AcousticModel)>,
}

impl ModelMixer {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            models: None,
        }
    }

    /// Read both models from their folders, then [`set_models`].
    ///
    /// [`set_models`]: ModelMixer::set_models
    pub fn read(&mut self, text_model_dir: &Path, speaker_model_dir: &Path) -> Result<()> {
        let a = ModelReadWrite::with_config(text_model_dir, &self.config).read()?;
        let b = ModelReadWrite::with_config(speaker_model_dir, &self.config).read()?;
        self.set_models(&a, &b)
    }

    /// Keep the monophones of both models, each renamed through its own
    /// replacement table.
    ///
    /// # Errors
    ///
    /// [`AcModelError::ParameterKindMismatch`] when the models were trained
    /// on different MFCC kinds.
    pub fn set_models(&mut self, a: &AcousticModel, b: &AcousticModel) -> Result<()> {
        if !a.compare_mfcc(b) {
            return Err(AcModelError::ParameterKindMismatch {
                left: a.get_mfcc_parameter_kind(),
                right: b.get_mfcc_parameter_kind(),
            });
        }
        let mut a = a.extract_monophones()?;
        let mut b = b.extract_monophones()?;
        a.replace_phones(false);
        b.replace_phones(false);
        log::info!(
            "mixer: {} monophones in {:?}, {} in {:?}",
            a.hmms().len(),
            a.name,
            b.hmms().len(),
            b.name
        );
        self.models = Some((a, b));
        Ok(())
    }

    /// Merge the second model into the first with weight `gamma` on the
    /// first, and write the result to `output_dir` in `format`.
    pub fn mix(&self, output_dir: &Path, format: &str, gamma: f64) -> Result<MergeStats> {
        let (a, b) = self
            .models
            .as_ref()
            .ok_or_else(|| AcModelError::DataType("no models to mix".into()))?;

        let mut mixed = a.clone();
        reconcile_mappings(mixed.repl_mut(), b.repl());
        let stats = mixed.merge_model(b, gamma)?;
        mixed.replace_phones(true);

        ModelReadWrite::with_config(output_dir, &self.config).write(&mixed, format)?;
        log::info!("mixer: wrote {} ({stats})", output_dir.display());
        Ok(stats)
    }
}

/// Move every entry of `base` whose value `other` maps from a different key
/// onto a key that does not clash: `other`'s key, that key doubled, or the
/// original key doubled.
fn reconcile_mappings(base: &mut PhoneMapping, other: &PhoneMapping) {
    let keys: Vec<String> = base.keys().map(str::to_string).collect();
    for key in keys {
        let Some(value) = base.get(&key).map(str::to_string) else {
            continue;
        };
        let Some(other_key) = other.get_key(&value).filter(|k| *k != key) else {
            continue;
        };

        let doubled = format!("{other_key}{other_key}");
        let new_key = if !base.is_key(other_key) {
            other_key.to_string()
        } else if !base.is_key(&doubled) {
            doubled
        } else {
            format!("{key}{key}")
        };
        log::debug!("mixer: remapping {key:?} -> {new_key:?} for {value:?}");
        base.rename_key(&key, &new_key);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
