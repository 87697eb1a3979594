//! Small file-system helpers shared by the readers and writers.
//!
//! Reads decode strictly as UTF-8 and treat empty files as errors.  Writes go
//! through a temporary file in the destination folder which is renamed over
//! the target once complete, so a failed write never leaves a truncated file
//! behind.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{AcModelError, Result};

/// Read a whole text file.
///
/// # Errors
///
/// - [`AcModelError::File`] — the file cannot be read or is empty.
/// - [`AcModelError::Encoding`] — the bytes are not valid UTF-8.
pub(crate) fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| AcModelError::file(path, e.to_string()))?;
    if bytes.is_empty() {
        return Err(AcModelError::file(path, "file is empty"));
    }
    String::from_utf8(bytes).map_err(|_| AcModelError::Encoding(path.to_path_buf()))
}

/// Replace `path` with `contents` atomically.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| AcModelError::Io(e.error))?;
    log::debug!("wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}
