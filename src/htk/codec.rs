//! Folder-level HTK-ASCII reader and writer.

use std::path::{Path, PathBuf};

use crate::config::{FileNames, ProtoConfig};
use crate::error::{AcModelError, Result};
use crate::fsio;
use crate::hmm::{Hmm, MacroOr, Options, ParameterKind};
use crate::model::{AcousticModel, Macro};
use crate::phones::{PhoneMapping, TiedList};

use super::parser::{self, ParsedFile};
use super::writer;

// ---------------------------------------------------------------------------
// HtkCodec
// ---------------------------------------------------------------------------

/// Reads and writes acoustic-model folders in HTK-ASCII.
///
/// A folder holds either one `hmmdefs` file with macros and HMM bodies, or a
/// `macros` file next to individual `*.hmm` files, plus optional `tiedlist`
/// and `monophones.repl` tables.
#[derive(Debug, Clone, Default)]
pub struct HtkCodec {
    files: FileNames,
    proto: ProtoConfig,
}

impl HtkCodec {
    pub fn new(files: FileNames, proto: ProtoConfig) -> Self {
        Self { files, proto }
    }

    // -----------------------------------------------------------------------
    // Detection
    // -----------------------------------------------------------------------

    /// `true` when `folder` holds a model this codec can read.
    pub fn detect(&self, folder: &Path) -> bool {
        if folder.join(&self.files.hmmdefs).is_file() {
            return true;
        }
        folder.join(&self.files.macros).is_file()
            || folder.join(&self.files.vfloors).is_file()
            || !self.hmm_files(folder).is_empty()
    }

    /// `*.hmm` files of `folder`, sorted by name.
    fn hmm_files(&self, folder: &Path) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(folder) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .is_some_and(|ext| ext.to_string_lossy() == self.files.hmm_ext)
            })
            .collect();
        files.sort();
        files
    }

    // -----------------------------------------------------------------------
    // Reading
    // -----------------------------------------------------------------------

    /// Read the model stored in `folder`.
    ///
    /// With `filename`, only that file is parsed.  Otherwise the first
    /// layout found wins: `hmmdefs`, then `macros` plus `*.hmm`, then
    /// `vFloors`.  The tied-list and phone replacement table are loaded when
    /// present; a missing or unreadable table leaves the field empty.
    ///
    /// # Errors
    ///
    /// - [`AcModelError::Folder`] — no model file found.
    /// - [`AcModelError::File`] / [`AcModelError::Encoding`] — unreadable file.
    /// - [`AcModelError::Parse`] — grammar error.
    /// - [`AcModelError::DuplicateHmm`] — the same HMM is defined twice.
    pub fn read_folder(&self, folder: &Path, filename: Option<&str>) -> Result<AcousticModel> {
        let sources = match filename {
            Some(name) => vec![folder.join(name)],
            None => self.model_files(folder)?,
        };

        let name = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut model = AcousticModel::new(name);
        for path in &sources {
            let parsed = parse_path(path)?;
            for m in parsed.macros {
                model.push_macro(m);
            }
            for hmm in parsed.hmms {
                model.append_hmm(hmm)?;
            }
        }

        if let Some(tiedlist) = self.load_tiedlist(folder) {
            model.set_tiedlist(tiedlist);
        }
        if let Some(repl) = self.load_repl(folder) {
            model.set_repl(repl);
        }

        log::info!(
            "htk: read {} ({} macros, {} HMMs, {} observed / {} tied units)",
            folder.display(),
            model.macros().len(),
            model.hmms().len(),
            model.tiedlist().observed_len(),
            model.tiedlist().tied_len()
        );
        Ok(model)
    }

    fn model_files(&self, folder: &Path) -> Result<Vec<PathBuf>> {
        let hmmdefs = folder.join(&self.files.hmmdefs);
        if hmmdefs.is_file() {
            return Ok(vec![hmmdefs]);
        }

        let macros = folder.join(&self.files.macros);
        let hmms = self.hmm_files(folder);
        if macros.is_file() || !hmms.is_empty() {
            let mut files = Vec::with_capacity(hmms.len() + 1);
            if macros.is_file() {
                files.push(macros);
            }
            files.extend(hmms);
            return Ok(files);
        }

        let vfloors = folder.join(&self.files.vfloors);
        if vfloors.is_file() {
            return Ok(vec![vfloors]);
        }
        Err(AcModelError::Folder(folder.to_path_buf()))
    }

    /// Best-effort tied-list load; `None` when absent or unreadable.
    fn load_tiedlist(&self, folder: &Path) -> Option<TiedList> {
        let path = folder.join(&self.files.tiedlist);
        if !path.is_file() {
            return None;
        }
        TiedList::load(&path)
            .map_err(|e| log::debug!("htk: ignoring tied-list {}: {e}", path.display()))
            .ok()
    }

    /// Best-effort replacement table load; `None` when absent or unreadable.
    fn load_repl(&self, folder: &Path) -> Option<PhoneMapping> {
        let path = folder.join(&self.files.phone_repl);
        if !path.is_file() {
            return None;
        }
        PhoneMapping::load(&path)
            .map_err(|e| log::debug!("htk: ignoring phone table {}: {e}", path.display()))
            .ok()
    }

    // -----------------------------------------------------------------------
    // Writing
    // -----------------------------------------------------------------------

    /// Write `model` into `folder` (created if needed).
    ///
    /// Macros and HMM bodies go into one file, `hmmdefs` unless `filename`
    /// says otherwise.  When the model has HMMs, variance and mean macros are
    /// not written.  The tied-list and phone table are written next to it
    /// when non-empty.  Every file is replaced atomically, and nothing is
    /// written when serialisation fails.
    pub fn write_folder(
        &self,
        model: &AcousticModel,
        folder: &Path,
        filename: Option<&str>,
    ) -> Result<()> {
        let reduced = !model.hmms().is_empty();
        let text = writer::write_file(model.macros(), model.hmms(), reduced)?;
        let tiedlist = (!model.tiedlist().is_empty()).then(|| model.tiedlist().to_text());
        let repl = (!model.repl().is_empty()).then(|| model.repl().to_text());

        std::fs::create_dir_all(folder)?;
        let target = folder.join(filename.unwrap_or(&self.files.hmmdefs));
        fsio::write_atomic(&target, &text)?;
        if let Some(text) = tiedlist {
            fsio::write_atomic(&folder.join(&self.files.tiedlist), &text)?;
        }
        if let Some(text) = repl {
            fsio::write_atomic(&folder.join(&self.files.phone_repl), &text)?;
        }

        log::info!(
            "htk: wrote {} HMMs to {}",
            model.hmms().len(),
            target.display()
        );
        Ok(())
    }

    /// Write a training prototype of `vector_size` dimensions to `path`.
    ///
    /// The layout (parameter kind, number of states, self-loops) comes from
    /// [`ProtoConfig`]; every emitting state is a single zero-mean,
    /// unit-variance Gaussian.
    pub fn write_hmm_proto(&self, vector_size: usize, path: &Path) -> Result<()> {
        if self.proto.num_states() < 3 {
            return Err(AcModelError::DataType(
                "a prototype needs at least one emitting state".into(),
            ));
        }
        let parameter_kind: ParameterKind = self
            .proto
            .parameter_kind
            .parse()
            .map_err(AcModelError::DataType)?;
        let options = Options {
            vec_size: Some(vector_size),
            parameter_kind: Some(parameter_kind),
            ..Options::default()
        };

        let states = self
            .proto
            .self_loops
            .iter()
            .map(|_| {
                MacroOr::Inline(Hmm::create_gmm(
                    vec![vec![0.0; vector_size]],
                    vec![vec![1.0; vector_size]],
                    None,
                    None,
                ))
            })
            .collect();
        let transition = Hmm::create_transition(&self.proto.self_loops);
        let proto = Hmm::create("proto", states, MacroOr::Inline(transition));

        let text = writer::write_file(&[Macro::options(options)], &[proto], false)?;
        fsio::write_atomic(path, &text)?;
        log::info!(
            "htk: wrote {}-state prototype to {}",
            self.proto.num_states(),
            path.display()
        );
        Ok(())
    }
}

fn parse_path(path: &Path) -> Result<ParsedFile> {
    let text = fsio::read_text(path)?;
    parser::parse(&text, &path.display().to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmm::StreamPdf;
    use crate::model::MacroDef;
    use tempfile::tempdir;

    fn codec() -> HtkCodec {
        HtkCodec::default()
    }

    fn mfcc_options() -> Macro {
        Macro::options(Options {
            vec_size: Some(25),
            parameter_kind: Some("MFCC_0_D".parse().unwrap()),
            ..Options::default()
        })
    }

    fn one_hmm_model(mean: f64) -> AcousticModel {
        let mut model = AcousticModel::new("m");
        model.push_macro(mfcc_options());
        let state = Hmm::create_gmm(vec![vec![mean; 25]], vec![vec![1.0; 25]], Some(vec![4.5]), None);
        let hmm = Hmm::create(
            "a",
            vec![
                MacroOr::Inline(state.clone()),
                MacroOr::Inline(state.clone()),
                MacroOr::Inline(state),
            ],
            MacroOr::Inline(Hmm::create_transition(&[0.6, 0.6, 0.7])),
        );
        model.append_hmm(hmm).unwrap();
        model
    }

    fn mean_of(model: &AcousticModel, phone: &str) -> Vec<f64> {
        let state = model.get_hmm(phone).unwrap().get_state(2).unwrap().inline().unwrap();
        match &state.streams[0].pdf {
            StreamPdf::Mixtures(m) => m[0].pdf.inline().unwrap().mean.inline().unwrap().clone(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn detect_layouts() {
        let dir = tempdir().expect("temp dir");
        assert!(!codec().detect(dir.path()));

        std::fs::write(dir.path().join("a.hmm"), "x").unwrap();
        assert!(codec().detect(dir.path()));

        let other = tempdir().expect("temp dir");
        std::fs::write(other.path().join("vFloors"), "x").unwrap();
        assert!(codec().detect(other.path()));
    }

    #[test]
    fn empty_folder_is_a_folder_error() {
        let dir = tempdir().expect("temp dir");
        assert!(matches!(
            codec().read_folder(dir.path(), None),
            Err(AcModelError::Folder(_))
        ));
    }

    #[test]
    fn round_trip() {
        let dir = tempdir().expect("temp dir");
        let mut model = one_hmm_model(0.123456789);
        model.tiedlist_mut().add_observed("a-b+c");
        model.tiedlist_mut().add_tied("x-y+z", Some("a-b+c"));
        model.repl_mut().add("a:", "aa");

        codec().write_folder(&model, dir.path(), None).unwrap();
        assert!(dir.path().join("hmmdefs").is_file());
        assert!(dir.path().join("tiedlist").is_file());
        assert!(dir.path().join("monophones.repl").is_file());

        let back = codec().read_folder(dir.path(), None).unwrap();
        assert_eq!(back.hmms().len(), 1);
        assert_eq!(back.get_mfcc_parameter_kind(), "mfcc_0d");
        assert_eq!(mean_of(&back, "a"), vec![1.234568e-1; 25]);
        let read = back.get_hmm("a").unwrap().transition().unwrap().inline().unwrap();
        let written = model.get_hmm("a").unwrap().transition().unwrap().inline().unwrap();
        for (r, w) in read.matrix.iter().flatten().zip(written.matrix.iter().flatten()) {
            assert!((r - w).abs() < 1e-6);
        }
        assert!(back.tiedlist().is_observed("a-b+c"));
        assert_eq!(back.tiedlist().observed_for("x-y+z"), Some("a-b+c"));
        assert_eq!(back.repl().get("a:"), Some("aa"));
    }

    const MULTI_STREAM: &str = r#"~o
<STREAMINFO> 2 2 1
<VECSIZE> 3<NULLD><MFCC_0><DIAGC>
~t "T_sil"
<TRANSP> 3
 0.0 1.0 0.0
 0.0 0.9 0.1
 0.0 0.0 0.0
~d "dur"
<DURATION> 2
 3.0 1.5
~s "silst"
<NUMMIXES> 1 1
<SWEIGHTS> 2
 0.8 0.2
<STREAM> 1
<MEAN> 2
 0.0 0.0
<VARIANCE> 2
 1.0 1.0
<STREAM> 2
<MEAN> 1
 0.0
<VARIANCE> 1
 1.0
~h "sil"
<BEGINHMM>
<DIAGC>
<NUMSTATES> 3
<STATE> 2
~s "silst"
~t "T_sil"
<ENDHMM>
~h "a"
<BEGINHMM>
<NUMSTATES> 4
<STATE> 2
<NUMMIXES> 2 1
<SWEIGHTS> 2
 0.5 0.5
<STREAM> 1
<MIXTURE> 1 0.25
<MEAN> 2
 1.0 -1.0
<VARIANCE> 2
 0.5 0.5
<GCONST> 1.5
<MIXTURE> 2 0.75
<RCLASS> 2
<MEAN> 2
 2.0 -2.0
<VARIANCE> 2
 0.25 0.25
<STREAM> 2
<MEAN> 1
 3.0
<VARIANCE> 1
 2.0
<DURATION> 1
 4.0
<STATE> 3
~s "silst"
<TRANSP> 4
 0.0 1.0 0.0 0.0
 0.0 0.6 0.4 0.0
 0.0 0.0 0.7 0.3
 0.0 0.0 0.0 0.0
~d "dur"
<ENDHMM>
"#;

    #[test]
    fn multi_stream_text_survives_write_and_read() {
        let src = tempdir().expect("temp dir");
        std::fs::write(src.path().join("hmmdefs"), MULTI_STREAM).unwrap();
        let first = codec().read_folder(src.path(), None).unwrap();
        assert_eq!(first.macros().len(), 4);
        assert_eq!(first.hmms().len(), 2);

        let out = tempdir().expect("temp dir");
        codec().write_folder(&first, out.path(), None).unwrap();
        let second = codec().read_folder(out.path(), None).unwrap();
        assert_eq!(second.macros(), first.macros());
        assert_eq!(second.hmms(), first.hmms());

        let a = second.get_hmm("a").unwrap();
        assert_eq!(a.definition().duration, Some(MacroOr::Macro("dur".into())));
        let state = a.get_state(2).unwrap().inline().unwrap();
        assert_eq!(state.num_mixes, Some(vec![2, 1]));
        assert_eq!(state.streams.len(), 2);
        assert_eq!(state.duration, Some(MacroOr::Inline(vec![4.0])));
        assert_eq!(a.get_state(3).unwrap().macro_name(), Some("silst"));
        let sil = second.get_hmm("sil").unwrap();
        assert!(sil.definition().options.is_some());
    }

    #[test]
    fn empty_tables_are_not_written() {
        let dir = tempdir().expect("temp dir");
        codec().write_folder(&one_hmm_model(0.0), dir.path(), Some("model.mmf")).unwrap();
        assert!(dir.path().join("model.mmf").is_file());
        assert!(!dir.path().join("tiedlist").exists());
        assert!(!dir.path().join("monophones.repl").exists());

        let back = codec().read_folder(dir.path(), Some("model.mmf")).unwrap();
        assert_eq!(back.hmms().len(), 1);
    }

    #[test]
    fn write_creates_missing_folder() {
        let dir = tempdir().expect("temp dir");
        let out = dir.path().join("nested").join("out");
        codec().write_folder(&one_hmm_model(0.0), &out, None).unwrap();
        assert!(out.join("hmmdefs").is_file());
    }

    #[test]
    fn failed_write_leaves_nothing_behind() {
        let dir = tempdir().expect("temp dir");
        let mut model = one_hmm_model(0.0);
        let hmm = model.get_hmm_mut("a").unwrap();
        if let MacroOr::Inline(state) = &mut hmm.definition_mut().states[0].state {
            state.streams[0].pdf = StreamPdf::Discrete(vec![1]);
        }
        assert!(codec().write_folder(&model, dir.path(), None).is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn macros_and_hmm_files() {
        let dir = tempdir().expect("temp dir");
        std::fs::write(
            dir.path().join("macros"),
            "~o\n<VECSIZE> 1<NULLD><MFCC_0><DIAGC>\n~s \"silst\"\n<MEAN> 1\n 0\n<VARIANCE> 1\n 1\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("sp.hmm"),
            "~h \"sp\"\n<BEGINHMM>\n<NUMSTATES> 3\n<STATE> 2\n~s \"silst\"\n<TRANSP> 3\n 0 1 0\n 0 0.9 0.1\n 0 0 0\n<ENDHMM>\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("tiedlist"), "a b c\n").unwrap();

        let mut model = codec().read_folder(dir.path(), None).unwrap();
        assert_eq!(model.macros().len(), 2);
        assert!(model.tiedlist().is_empty());
        model.fill_hmms().unwrap();
        assert_eq!(model.get_hmm("sp").unwrap().get_vector_size(), 1);
    }

    #[test]
    fn vfloors_only() {
        let dir = tempdir().expect("temp dir");
        std::fs::write(
            dir.path().join("vFloors"),
            "~v varFloor1\n<Variance> 2\n 1.0e-02 1.0e-02\n",
        )
        .unwrap();
        let model = codec().read_folder(dir.path(), None).unwrap();
        assert!(model.hmms().is_empty());
        assert!(matches!(model.macros()[0].definition, MacroDef::Variance(_)));

        let out = tempdir().expect("temp dir");
        codec().write_folder(&model, out.path(), None).unwrap();
        let text = std::fs::read_to_string(out.path().join("hmmdefs")).unwrap();
        assert!(text.contains("~v \"varFloor1\""));
    }

    #[test]
    fn empty_model_file_is_a_file_error() {
        let dir = tempdir().expect("temp dir");
        std::fs::write(dir.path().join("hmmdefs"), "").unwrap();
        assert!(matches!(
            codec().read_folder(dir.path(), None),
            Err(AcModelError::File { .. })
        ));
    }

    #[test]
    fn proto_file() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("proto");
        codec().write_hmm_proto(25, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("~o\n<VECSIZE> 25<MFCC_0_D_N_Z>\n~h \"proto\"\n"));

        let model = codec().read_folder(dir.path(), Some("proto")).unwrap();
        let proto = model.get_hmm("proto").unwrap();
        assert_eq!(proto.get_vector_size(), 25);
        assert_eq!(proto.definition().state_count, 5);
        assert!(proto.transition().unwrap().inline().unwrap().is_valid());
    }

    #[test]
    fn proto_needs_an_emitting_state() {
        let dir = tempdir().expect("temp dir");
        let codec = HtkCodec::new(
            FileNames::default(),
            ProtoConfig {
                self_loops: Vec::new(),
                ..ProtoConfig::default()
            },
        );
        let path = dir.path().join("proto");
        assert!(matches!(
            codec.write_hmm_proto(3, &path),
            Err(AcModelError::DataType(_))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn proto_rejects_bad_parameter_kind() {
        let dir = tempdir().expect("temp dir");
        let codec = HtkCodec::new(
            FileNames::default(),
            ProtoConfig {
                parameter_kind: "NOPE".into(),
                ..ProtoConfig::default()
            },
        );
        assert!(matches!(
            codec.write_hmm_proto(3, &dir.path().join("proto")),
            Err(AcModelError::DataType(_))
        ));
    }
}
