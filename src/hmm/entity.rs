//! A single phone model and its factories.
//!
//! [`Hmm`] pairs a phone label (`"a"`, `"t-a+k"`, ...) with an
//! [`HmmDefinition`].  The factories build the shapes used to bootstrap
//! training: the 5-state prototype ([`Hmm::create_proto`]) and the
//! short-pause model tied to the silence centre state ([`Hmm::create_sp`]).

use serde::Serialize;

use crate::error::{AcModelError, Result};

use super::interpolation;
use super::types::{
    GaussianPdf, HmmDefinition, IndexedState, MacroOr, Mixture, State, Stream, StreamPdf,
    Transition, Vector,
};

/// Name of the silence centre state shared by the short-pause model.
pub const SILENCE_STATE_MACRO: &str = "silst";

// ---------------------------------------------------------------------------
// Hmm
// ---------------------------------------------------------------------------

/// One phone model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hmm {
    name: String,
    definition: HmmDefinition,
}

impl Default for Hmm {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NAME)
    }
}

impl Hmm {
    /// Label given to models created without one.
    pub const DEFAULT_NAME: &'static str = "und";

    /// An HMM with an empty definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: HmmDefinition::default(),
        }
    }

    pub fn with_definition(name: impl Into<String>, definition: HmmDefinition) -> Self {
        Self {
            name: name.into(),
            definition,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the model.
    ///
    /// # Errors
    ///
    /// [`AcModelError::DataType`] for an empty name or one containing
    /// whitespace or quotes, which HTK cannot represent.
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c == '"') {
            return Err(AcModelError::DataType(format!(
                "invalid HMM name {name:?}"
            )));
        }
        self.name = name;
        Ok(())
    }

    pub(crate) fn rename_unchecked(&mut self, name: String) {
        self.name = name;
    }

    pub fn definition(&self) -> &HmmDefinition {
        &self.definition
    }

    pub fn definition_mut(&mut self) -> &mut HmmDefinition {
        &mut self.definition
    }

    pub fn set_definition(&mut self, definition: HmmDefinition) {
        self.definition = definition;
    }

    pub fn into_definition(self) -> HmmDefinition {
        self.definition
    }

    pub fn states(&self) -> &[IndexedState] {
        &self.definition.states
    }

    pub fn transition(&self) -> Option<&MacroOr<Transition>> {
        self.definition.transition.as_ref()
    }

    /// State at the given 1-based index.
    pub fn get_state(&self, index: usize) -> Option<&MacroOr<State>> {
        self.definition
            .states
            .iter()
            .find(|s| s.index == index)
            .map(|s| &s.state)
    }

    /// Mean dimensionality of the first state.
    ///
    /// Returns 0 when that state is a macro reference: the size is unknown
    /// until the macro is resolved.
    pub fn get_vector_size(&self) -> usize {
        self.definition
            .states
            .first()
            .and_then(|s| s.state.inline())
            .and_then(State::vector_size)
            .unwrap_or(0)
    }

    // -----------------------------------------------------------------------
    // Factories
    // -----------------------------------------------------------------------

    /// Build an HMM from emitting states (numbered from 2) and a transition.
    pub fn create(
        name: impl Into<String>,
        states: Vec<MacroOr<State>>,
        transition: MacroOr<Transition>,
    ) -> Self {
        let state_count = states.len() + 2;
        let states = states
            .into_iter()
            .enumerate()
            .map(|(i, state)| IndexedState {
                index: i + 2,
                state,
            })
            .collect();
        Self::with_definition(
            name,
            HmmDefinition {
                state_count,
                states,
                transition: Some(transition),
                ..HmmDefinition::default()
            },
        )
    }

    /// 5-state prototype: zero means, unit variances, self-loops
    /// `0.6, 0.6, 0.7`, `n_mixtures` equally weighted components per state.
    pub fn create_proto(vector_size: usize, n_mixtures: usize) -> Self {
        let n = n_mixtures.max(1);
        let states = (0..3)
            .map(|_| {
                MacroOr::Inline(Self::create_gmm(
                    vec![vec![0.0; vector_size]; n],
                    vec![vec![1.0; vector_size]; n],
                    None,
                    None,
                ))
            })
            .collect();
        let transition = Self::create_transition(&[0.6, 0.6, 0.7]);
        Self::create("proto", states, MacroOr::Inline(transition))
    }

    /// 3-state short pause whose emitting state is the shared `silst` macro.
    pub fn create_sp() -> Self {
        Self::create(
            "sp",
            vec![MacroOr::Macro(SILENCE_STATE_MACRO.to_string())],
            MacroOr::Inline(Self::create_transition(&[0.9])),
        )
    }

    /// One-stream Gaussian-mixture state.
    ///
    /// Weights default to `1/n`; with a single component no `<Mixture>`
    /// header is written.
    pub fn create_gmm(
        means: Vec<Vector>,
        variances: Vec<Vector>,
        gconsts: Option<Vec<f64>>,
        weights: Option<Vec<f64>>,
    ) -> State {
        let n = means.len();
        let mixtures = means
            .into_iter()
            .zip(variances)
            .enumerate()
            .map(|(i, (mean, variance))| {
                let weight = match (&weights, n) {
                    (Some(w), _) => w.get(i).copied(),
                    (None, 1) => None,
                    (None, _) => Some(1.0 / n as f64),
                };
                Mixture {
                    index: i + 1,
                    weight,
                    pdf: MacroOr::Inline(GaussianPdf {
                        gconst: gconsts.as_ref().and_then(|g| g.get(i).copied()),
                        ..GaussianPdf::diagonal(mean, variance)
                    }),
                }
            })
            .collect::<Vec<_>>();
        State {
            num_mixes: (n > 1).then(|| vec![n]),
            streams: vec![Stream {
                index: None,
                pdf: StreamPdf::Mixtures(mixtures),
            }],
            ..State::default()
        }
    }

    /// Left-to-right transition matrix from per-state self-loop
    /// probabilities: entry goes 1→2 with probability 1, state `i` loops with
    /// `p_i` and moves on with `1 - p_i`, the exit row is all zero.
    pub fn create_transition(self_loops: &[f64]) -> Transition {
        let n = self_loops.len() + 2;
        let mut matrix = vec![vec![0.0; n]; n];
        matrix[0][1] = 1.0;
        for (i, p) in self_loops.iter().enumerate() {
            matrix[i + 1][i + 1] = *p;
            matrix[i + 1][i + 2] = 1.0 - p;
        }
        Transition::new(matrix)
    }

    // -----------------------------------------------------------------------
    // Interpolation
    // -----------------------------------------------------------------------

    /// Replace states and transition by `gamma * self + (1 - gamma) * other`.
    ///
    /// Returns `false`, leaving `self` untouched, when either part cannot be
    /// interpolated (typically an unresolved macro reference).
    pub fn static_linear_interpolation(&mut self, other: &Hmm, gamma: f64) -> bool {
        let coefficients = [gamma, 1.0 - gamma];
        let states = interpolation::linear_states(
            &[self.states(), other.states()],
            &coefficients,
        );
        let transition = match (self.transition(), other.transition()) {
            (Some(a), Some(b)) => interpolation::linear_transitions(&[a, b], &coefficients),
            _ => None,
        };
        match (states, transition) {
            (Some(states), Some(transition)) => {
                self.definition.states = states;
                self.definition.transition = Some(MacroOr::Inline(transition));
                true
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
