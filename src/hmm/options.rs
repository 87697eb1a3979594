//! Global options: parameter kind, covariance / duration kinds, stream
//! layout and input transforms.
//!
//! HTK writes these as bracketed tags, e.g.
//! `<VecSize> 39<NullD><MFCC_0_D_A><DiagC>`.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::types::{MacroOr, Matrix};

// ---------------------------------------------------------------------------
// ParameterKind
// ---------------------------------------------------------------------------

/// Base spectral feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BaseKind {
    Discrete,
    Lpc,
    LpCepstra,
    Mfcc,
    Fbank,
    MelSpec,
    LpRefc,
    LpDelCep,
    User,
}

impl BaseKind {
    const ALL: [BaseKind; 9] = [
        BaseKind::Discrete,
        BaseKind::Lpc,
        BaseKind::LpCepstra,
        BaseKind::Mfcc,
        BaseKind::Fbank,
        BaseKind::MelSpec,
        BaseKind::LpRefc,
        BaseKind::LpDelCep,
        BaseKind::User,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            BaseKind::Discrete => "DISCRETE",
            BaseKind::Lpc => "LPC",
            BaseKind::LpCepstra => "LPCEPSTRA",
            BaseKind::Mfcc => "MFCC",
            BaseKind::Fbank => "FBANK",
            BaseKind::MelSpec => "MELSPEC",
            BaseKind::LpRefc => "LPREFC",
            BaseKind::LpDelCep => "LPDELCEP",
            BaseKind::User => "USER",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.tag().eq_ignore_ascii_case(tag))
    }
}

/// Parameter qualifier (the `_X` suffixes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Qualifier {
    /// `_A` acceleration coefficients.
    Acceleration,
    /// `_C` compressed.
    Compressed,
    /// `_D` delta coefficients.
    Delta,
    /// `_E` log energy.
    Energy,
    /// `_K` CRC checksum.
    Checksum,
    /// `_N` absolute energy suppressed.
    NoAbsEnergy,
    /// `_O` original source.
    Original,
    /// `_0` zeroth cepstral coefficient.
    Zeroth,
    /// `_V` VQ data.
    Vq,
    /// `_Z` cepstral mean subtracted.
    ZeroMean,
}

impl Qualifier {
    pub fn code(self) -> char {
        match self {
            Qualifier::Acceleration => 'A',
            Qualifier::Compressed => 'C',
            Qualifier::Delta => 'D',
            Qualifier::Energy => 'E',
            Qualifier::Checksum => 'K',
            Qualifier::NoAbsEnergy => 'N',
            Qualifier::Original => 'O',
            Qualifier::Zeroth => '0',
            Qualifier::Vq => 'V',
            Qualifier::ZeroMean => 'Z',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        Some(match code.to_ascii_uppercase() {
            'A' => Qualifier::Acceleration,
            'C' => Qualifier::Compressed,
            'D' => Qualifier::Delta,
            'E' => Qualifier::Energy,
            'K' => Qualifier::Checksum,
            'N' => Qualifier::NoAbsEnergy,
            'O' => Qualifier::Original,
            '0' => Qualifier::Zeroth,
            'V' => Qualifier::Vq,
            'Z' => Qualifier::ZeroMean,
            _ => return None,
        })
    }
}

/// Base kind plus ordered qualifiers, e.g. `MFCC_0_D_N_Z`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterKind {
    pub base: BaseKind,
    pub qualifiers: Vec<Qualifier>,
}

impl ParameterKind {
    /// Lower-case `base_` followed by the qualifier codes, e.g. `mfcc_0dnz`.
    pub fn compact(&self) -> String {
        let mut out = self.base.tag().to_ascii_lowercase();
        out.push('_');
        out.extend(self.qualifiers.iter().map(|q| q.code().to_ascii_lowercase()));
        out
    }
}

impl FromStr for ParameterKind {
    type Err = String;

    /// Case-insensitive: `mfcc_0_d` and `MFCC_0_D` are the same kind.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('_');
        let base = parts
            .next()
            .and_then(BaseKind::from_tag)
            .ok_or_else(|| format!("unknown parameter kind {s:?}"))?;
        let mut qualifiers = Vec::new();
        for part in parts {
            let mut chars = part.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => qualifiers.push(
                    Qualifier::from_code(c)
                        .ok_or_else(|| format!("unknown qualifier _{c} in {s:?}"))?,
                ),
                _ => return Err(format!("malformed qualifier _{part} in {s:?}")),
            }
        }
        Ok(Self { base, qualifiers })
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base.tag())?;
        for q in &self.qualifiers {
            write!(f, "_{}", q.code())?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Covariance / duration kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CovKind {
    DiagC,
    InvDiagC,
    FullC,
    LltC,
    XformC,
}

impl CovKind {
    pub fn tag(self) -> &'static str {
        match self {
            CovKind::DiagC => "DIAGC",
            CovKind::InvDiagC => "INVDIAGC",
            CovKind::FullC => "FULLC",
            CovKind::LltC => "LLTC",
            CovKind::XformC => "XFORMC",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        [
            CovKind::DiagC,
            CovKind::InvDiagC,
            CovKind::FullC,
            CovKind::LltC,
            CovKind::XformC,
        ]
        .into_iter()
        .find(|k| k.tag().eq_ignore_ascii_case(tag))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DurKind {
    NullD,
    PoissonD,
    GammaD,
    Gen,
}

impl DurKind {
    pub fn tag(self) -> &'static str {
        match self {
            DurKind::NullD => "NULLD",
            DurKind::PoissonD => "POISSOND",
            DurKind::GammaD => "GAMMAD",
            DurKind::Gen => "GEN",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        [DurKind::NullD, DurKind::PoissonD, DurKind::GammaD, DurKind::Gen]
            .into_iter()
            .find(|k| k.tag().eq_ignore_ascii_case(tag))
    }
}

// ---------------------------------------------------------------------------
// Input transform
// ---------------------------------------------------------------------------

/// `<LinXform>`: block-diagonal linear transform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinXform {
    pub vec_size: usize,
    pub block_sizes: Vec<usize>,
    pub blocks: Vec<Matrix>,
}

/// `<InputXform>` applied to the features before decoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputXform {
    pub mmf_id_mask: String,
    pub parameter_kind: ParameterKind,
    pub pre_qualified: bool,
    pub lin_xform: LinXform,
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Global options, found in `~o` macros or at the top of an HMM body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Options {
    pub hmm_set_id: Option<String>,
    /// Vector size of each stream (`<StreamInfo>`).
    pub stream_info: Option<Vec<usize>>,
    pub vec_size: Option<usize>,
    pub input_xform: Option<MacroOr<InputXform>>,
    pub cov_kind: Option<CovKind>,
    pub dur_kind: Option<DurKind>,
    pub parameter_kind: Option<ParameterKind>,
}

impl Options {
    pub fn is_empty(&self) -> bool {
        *self == Options::default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
