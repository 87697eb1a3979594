//! Structural building blocks of an HMM definition.
//!
//! Every field that HTK allows to be shared through a macro is wrapped in a
//! [`MacroOr`]: it holds either the inline structure or the name of the
//! macro that defines it.  Only [`crate::model::AcousticModel::fill_hmms`]
//! turns references into inline values.

use serde::Serialize;

use super::options::Options;

/// A run of floating-point values whose length is its dimension.
pub type Vector = Vec<f64>;

/// Row-major matrix; every row has the same length.
pub type Matrix = Vec<Vec<f64>>;

// ---------------------------------------------------------------------------
// MacroOr
// ---------------------------------------------------------------------------

/// A value defined in place or borrowed from a named macro.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MacroOr<T> {
    Inline(T),
    Macro(String),
}

impl<T> MacroOr<T> {
    pub fn is_inline(&self) -> bool {
        matches!(self, MacroOr::Inline(_))
    }

    pub fn inline(&self) -> Option<&T> {
        match self {
            MacroOr::Inline(v) => Some(v),
            MacroOr::Macro(_) => None,
        }
    }

    pub fn inline_mut(&mut self) -> Option<&mut T> {
        match self {
            MacroOr::Inline(v) => Some(v),
            MacroOr::Macro(_) => None,
        }
    }

    pub fn macro_name(&self) -> Option<&str> {
        match self {
            MacroOr::Inline(_) => None,
            MacroOr::Macro(name) => Some(name),
        }
    }
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

/// Square matrix of state transition probabilities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub matrix: Matrix,
}

impl Transition {
    pub fn new(matrix: Matrix) -> Self {
        Self { matrix }
    }

    /// Number of states (rows).
    pub fn dim(&self) -> usize {
        self.matrix.len()
    }

    /// Every row sums to 1 except the last, absorbing row which sums to 0.
    /// Sums are compared after rounding to 4 decimals.
    pub fn is_valid(&self) -> bool {
        let n = self.matrix.len();
        if n == 0 || self.matrix.iter().any(|row| row.len() != n) {
            return false;
        }
        self.matrix.iter().enumerate().all(|(i, row)| {
            let sum: f64 = row.iter().sum();
            let rounded = (sum * 10_000.0).round() / 10_000.0;
            if i + 1 == n {
                rounded == 0.0
            } else {
                rounded == 1.0
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Gaussian components
// ---------------------------------------------------------------------------

/// Covariance of a Gaussian.  Only the diagonal variance can be written
/// back; the other kinds are kept so that a read never loses data silently.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Covariance {
    /// `<Variance>` or `~v`.
    Variance(MacroOr<Vector>),
    /// `<InvCovar>` upper triangle, or `~i`.
    InvCovar(MacroOr<Matrix>),
    /// `<LLTCovar>` upper triangle.
    LltCovar(Matrix),
    /// `<Xform>` or `~x`.
    Xform(MacroOr<Matrix>),
}

impl Covariance {
    pub fn variance(&self) -> Option<&Vector> {
        match self {
            Covariance::Variance(v) => v.inline(),
            _ => None,
        }
    }
}

/// Probability density of one mixture component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaussianPdf {
    /// Regression class (`<RClass>`).
    pub rclass: Option<usize>,
    pub mean: MacroOr<Vector>,
    pub covariance: Covariance,
    /// Precomputed normalisation term.
    pub gconst: Option<f64>,
}

impl GaussianPdf {
    /// Diagonal Gaussian without a precomputed constant.
    pub fn diagonal(mean: Vector, variance: Vector) -> Self {
        Self {
            rclass: None,
            mean: MacroOr::Inline(mean),
            covariance: Covariance::Variance(MacroOr::Inline(variance)),
            gconst: None,
        }
    }
}

/// One weighted component of a Gaussian mixture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mixture {
    /// 1-based component index.
    pub index: usize,
    /// `None` when the file omits `<Mixture>` for a single component.
    pub weight: Option<f64>,
    /// Inline pdf or `~m` reference.
    pub pdf: MacroOr<GaussianPdf>,
}

// ---------------------------------------------------------------------------
// Streams and states
// ---------------------------------------------------------------------------

/// Output distribution of one stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StreamPdf {
    Mixtures(Vec<Mixture>),
    /// `<TMix>`: weights over a shared codebook.
    TiedMixture { name: String, weights: Vec<f64> },
    /// `<DProb>`: discrete log probabilities.
    Discrete(Vec<i64>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stream {
    /// `<Stream>` index, `None` for the implicit single stream.
    pub index: Option<usize>,
    pub pdf: StreamPdf,
}

impl Stream {
    pub fn mixtures(&self) -> Option<&[Mixture]> {
        match &self.pdf {
            StreamPdf::Mixtures(m) => Some(m),
            _ => None,
        }
    }
}

/// Emitting state body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct State {
    /// Per-stream mixture counts (`<NumMixes>`).
    pub num_mixes: Option<Vec<usize>>,
    /// Stream weights (`<SWeights>` or `~w`).
    pub stream_weights: Option<MacroOr<Vector>>,
    pub streams: Vec<Stream>,
    /// State duration parameters (`<Duration>` or `~d`).
    pub duration: Option<MacroOr<Vector>>,
}

impl State {
    /// Mean dimensionality of the first inline component, if any.
    pub fn vector_size(&self) -> Option<usize> {
        let mixture = self.streams.first()?.mixtures()?.first()?;
        let pdf = mixture.pdf.inline()?;
        pdf.mean.inline().map(Vec::len)
    }
}

/// A state together with its 1-based position in the HMM.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedState {
    pub index: usize,
    pub state: MacroOr<State>,
}

// ---------------------------------------------------------------------------
// Regression tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RegNode {
    /// `<Node> index n child...`
    Node { index: usize, children: Vec<usize> },
    /// `<TNode> index components`
    Terminal { index: usize, components: usize },
}

/// Regression class tree (`<RegTree>`).  Read-only: it is never written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegTree {
    pub terminals: usize,
    pub nodes: Vec<RegNode>,
}

// ---------------------------------------------------------------------------
// HmmDefinition
// ---------------------------------------------------------------------------

/// Everything between `<BeginHMM>` and `<EndHMM>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HmmDefinition {
    /// Options local to this HMM.
    pub options: Option<Options>,
    /// Total number of states, including the two non-emitting ones.
    pub state_count: usize,
    pub states: Vec<IndexedState>,
    pub regression_tree: Option<MacroOr<RegTree>>,
    pub transition: Option<MacroOr<Transition>>,
    pub duration: Option<MacroOr<Vector>>,
}

impl HmmDefinition {
    /// `true` when neither a state nor the transition is a macro reference.
    pub fn is_inline(&self) -> bool {
        self.states.iter().all(|s| s.state.is_inline())
            && self.transition.as_ref().map_or(true, MacroOr::is_inline)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn left_to_right() -> Transition {
        Transition::new(vec![
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.9, 0.1],
            vec![0.0, 0.0, 0.0],
        ])
    }

    #[test]
    fn valid_transition() {
        assert!(left_to_right().is_valid());
    }

    #[test]
    fn transition_tolerates_rounding() {
        let mut t = left_to_right();
        t.matrix[1] = vec![0.0, 0.90001, 0.09998];
        assert!(t.is_valid());
    }

    #[test]
    fn transition_rejects_bad_rows() {
        let mut t = left_to_right();
        t.matrix[1][1] = 0.5;
        assert!(!t.is_valid());

        let mut t = left_to_right();
        t.matrix[2][2] = 1.0;
        assert!(!t.is_valid());

        let ragged = Transition::new(vec![vec![0.0, 1.0], vec![0.0]]);
        assert!(!ragged.is_valid());
    }

    #[test]
    fn macro_or_accessors() {
        let inline: MacroOr<u8> = MacroOr::Inline(3);
        let named: MacroOr<u8> = MacroOr::Macro("silst".into());
        assert_eq!(inline.inline(), Some(&3));
        assert_eq!(inline.macro_name(), None);
        assert_eq!(named.inline(), None);
        assert_eq!(named.macro_name(), Some("silst"));
    }

    #[test]
    fn state_vector_size_needs_inline_mean() {
        let state = State {
            streams: vec![Stream {
                index: None,
                pdf: StreamPdf::Mixtures(vec![Mixture {
                    index: 1,
                    weight: None,
                    pdf: MacroOr::Inline(GaussianPdf::diagonal(vec![0.0; 4], vec![1.0; 4])),
                }]),
            }],
            ..State::default()
        };
        assert_eq!(state.vector_size(), Some(4));

        let mut referenced = state.clone();
        if let StreamPdf::Mixtures(m) = &mut referenced.streams[0].pdf {
            m[0].pdf = MacroOr::Macro("mix1".into());
        }
        assert_eq!(referenced.vector_size(), None);
    }
}
