//! Format dispatch over the registered model codecs.
//!
//! [`ModelReadWrite`] is bound to one folder.  Reading tries every codec in
//! registration order and lets the first one that recognises the folder do
//! the work; writing picks the codec by format name.

use std::path::{Path, PathBuf};

use crate::config::{EngineConfig, FileNames, ProtoConfig};
use crate::error::{AcModelError, Result};
use crate::htk::HtkCodec;
use crate::model::AcousticModel;

// ---------------------------------------------------------------------------
// ModelCodec trait
// ---------------------------------------------------------------------------

/// A folder-based model format.
pub trait ModelCodec {
    /// Name used to select this codec for writing.
    fn format(&self) -> &'static str;

    /// `true` when `folder` looks like a model in this format.
    fn detect(&self, folder: &Path) -> bool;

    fn read(&self, folder: &Path) -> Result<AcousticModel>;

    fn write(&self, model: &AcousticModel, folder: &Path) -> Result<()>;
}

// Compile-time assertion: Box<dyn ModelCodec> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn ModelCodec>) {}
};

impl ModelCodec for HtkCodec {
    fn format(&self) -> &'static str {
        "hmmdefs"
    }

    fn detect(&self, folder: &Path) -> bool {
        HtkCodec::detect(self, folder)
    }

    fn read(&self, folder: &Path) -> Result<AcousticModel> {
        self.read_folder(folder, None)
    }

    fn write(&self, model: &AcousticModel, folder: &Path) -> Result<()> {
        self.write_folder(model, folder, None)
    }
}

// ---------------------------------------------------------------------------
// ModelReadWrite
// ---------------------------------------------------------------------------

/// Reader / writer bound to one model folder.
#[derive(Debug, Clone)]
pub struct ModelReadWrite {
    folder: PathBuf,
    files: FileNames,
    proto: ProtoConfig,
}

impl ModelReadWrite {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self::with_config(folder, &EngineConfig::default())
    }

    pub fn with_config(folder: impl Into<PathBuf>, config: &EngineConfig) -> Self {
        Self {
            folder: folder.into(),
            files: config.files.clone(),
            proto: config.proto.clone(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Registered codecs, in the order they are tried.
    fn codecs(&self) -> Vec<Box<dyn ModelCodec>> {
        vec![Box::new(HtkCodec::new(
            self.files.clone(),
            self.proto.clone(),
        ))]
    }

    /// Names accepted by [`write`](ModelReadWrite::write).
    pub fn formats(&self) -> Vec<&'static str> {
        self.codecs().iter().map(|c| c.format()).collect()
    }

    /// Read the model with the first codec that recognises the folder.
    ///
    /// # Errors
    ///
    /// [`AcModelError::Folder`] when no codec recognises it, otherwise
    /// whatever the codec reports.
    pub fn read(&self) -> Result<AcousticModel> {
        let codec = self
            .codecs()
            .into_iter()
            .find(|c| c.detect(&self.folder))
            .ok_or_else(|| AcModelError::Folder(self.folder.clone()))?;
        log::debug!(
            "reading {} as {}",
            self.folder.display(),
            codec.format()
        );
        codec.read(&self.folder)
    }

    /// Write `model` in the named format.
    ///
    /// # Errors
    ///
    /// [`AcModelError::FileFormat`] when `format` is not registered.
    pub fn write(&self, model: &AcousticModel, format: &str) -> Result<()> {
        let codec = self
            .codecs()
            .into_iter()
            .find(|c| c.format() == format)
            .ok_or_else(|| AcModelError::FileFormat(format.to_string()))?;
        codec.write(model, &self.folder)
    }
}
