//! Linear interpolation of HMM parameters.
//!
//! Every routine takes `n` operands and `n` coefficients and returns
//! `Σ gamma_i * operand_i`.  Coefficients are expected to sum to 1; that is
//! not enforced.  Routines returning `Option` yield `None` when the operands
//! cannot be combined: a macro reference instead of an inline value, a
//! dimension mismatch, or a stream kind that has no numeric interpolation.
//!
//! Non-numeric fields (indices, regression classes, durations) are copied
//! from the first operand.

use super::types::{
    Covariance, GaussianPdf, IndexedState, MacroOr, Matrix, Mixture, State, Stream, StreamPdf,
    Transition, Vector,
};

// ---------------------------------------------------------------------------
// Plain numbers
// ---------------------------------------------------------------------------

/// `Σ values[i] * gammas[i]`.
pub fn linear_interpolate_values(values: &[f64], gammas: &[f64]) -> f64 {
    values
        .iter()
        .zip(gammas)
        .fold(0.0, |acc, (v, g)| acc + v * g)
}

/// Element-wise weighted sum.  Vectors are assumed to share one length;
/// the result is as long as the first vector.
pub fn linear_interpolate_vectors(vectors: &[&[f64]], gammas: &[f64]) -> Vector {
    let Some(first) = vectors.first() else {
        return Vector::new();
    };
    (0..first.len())
        .map(|i| {
            let column: Vec<f64> = vectors.iter().map(|v| v[i]).collect();
            linear_interpolate_values(&column, gammas)
        })
        .collect()
}

/// Row-wise [`linear_interpolate_vectors`].
pub fn linear_interpolate_matrix(matrices: &[&Matrix], gammas: &[f64]) -> Matrix {
    let Some(first) = matrices.first() else {
        return Matrix::new();
    };
    (0..first.len())
        .map(|row| {
            let rows: Vec<&[f64]> = matrices.iter().map(|m| m[row].as_slice()).collect();
            linear_interpolate_vectors(&rows, gammas)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// Interpolate transition matrices of identical dimension.
pub fn linear_interpolate_transitions(
    transitions: &[&Transition],
    gammas: &[f64],
) -> Option<Transition> {
    let first = transitions.first()?;
    let dim = first.dim();
    if transitions
        .iter()
        .any(|t| t.dim() != dim || t.matrix.iter().any(|row| row.len() != dim))
    {
        return None;
    }
    let matrices: Vec<&Matrix> = transitions.iter().map(|t| &t.matrix).collect();
    Some(Transition {
        matrix: linear_interpolate_matrix(&matrices, gammas),
    })
}

// ---------------------------------------------------------------------------
// Gaussian mixtures
// ---------------------------------------------------------------------------

/// Interpolate mean, variance, gconst and (when every operand has one) the
/// mixture weight.  Fails on macro references or dimension mismatches.
pub fn linear_interpolate_mixtures(mixtures: &[&Mixture], gammas: &[f64]) -> Option<Mixture> {
    let first = mixtures.first()?;
    let pdfs: Vec<&GaussianPdf> = mixtures
        .iter()
        .map(|m| m.pdf.inline())
        .collect::<Option<_>>()?;

    let means: Vec<&[f64]> = pdfs
        .iter()
        .map(|p| p.mean.inline().map(Vec::as_slice))
        .collect::<Option<_>>()?;
    let variances: Vec<&[f64]> = pdfs
        .iter()
        .map(|p| p.covariance.variance().map(Vec::as_slice))
        .collect::<Option<_>>()?;

    let dim = means[0].len();
    if means.iter().any(|m| m.len() != dim) || variances.iter().any(|v| v.len() != dim) {
        return None;
    }

    let gconst = pdfs
        .iter()
        .map(|p| p.gconst)
        .collect::<Option<Vec<f64>>>()
        .map(|g| linear_interpolate_values(&g, gammas))
        .or(pdfs[0].gconst);

    let weight = mixtures
        .iter()
        .map(|m| m.weight)
        .collect::<Option<Vec<f64>>>()
        .map(|w| linear_interpolate_values(&w, gammas))
        .or(first.weight);

    Some(Mixture {
        index: first.index,
        weight,
        pdf: MacroOr::Inline(GaussianPdf {
            rclass: pdfs[0].rclass,
            mean: MacroOr::Inline(linear_interpolate_vectors(&means, gammas)),
            covariance: Covariance::Variance(MacroOr::Inline(linear_interpolate_vectors(
                &variances, gammas,
            ))),
            gconst,
        }),
    })
}

/// Interpolate component by component.  Every operand must be a Gaussian
/// mixture stream with the same number of components.
pub fn linear_interpolate_streams(streams: &[&Stream], gammas: &[f64]) -> Option<Stream> {
    let first = streams.first()?;
    let mixtures: Vec<&[Mixture]> = streams
        .iter()
        .map(|s| s.mixtures())
        .collect::<Option<_>>()?;
    let count = mixtures[0].len();
    if mixtures.iter().any(|m| m.len() != count) {
        return None;
    }

    let combined = (0..count)
        .map(|i| {
            let column: Vec<&Mixture> = mixtures.iter().map(|m| &m[i]).collect();
            linear_interpolate_mixtures(&column, gammas)
        })
        .collect::<Option<Vec<_>>>()?;

    Some(Stream {
        index: first.index,
        pdf: StreamPdf::Mixtures(combined),
    })
}

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

/// Interpolate one state position.  Fails if any operand is a macro
/// reference: states must be resolved first.
pub fn linear_interpolate_states(
    states: &[&IndexedState],
    gammas: &[f64],
) -> Option<IndexedState> {
    let first = states.first()?;
    let bodies: Vec<&State> = states
        .iter()
        .map(|s| s.state.inline())
        .collect::<Option<_>>()?;
    let head = bodies[0];

    let stream_count = head.streams.len();
    if bodies.iter().any(|b| b.streams.len() != stream_count) {
        return None;
    }
    let streams = (0..stream_count)
        .map(|i| {
            let column: Vec<&Stream> = bodies.iter().map(|b| &b.streams[i]).collect();
            linear_interpolate_streams(&column, gammas)
        })
        .collect::<Option<Vec<_>>>()?;

    let stream_weights = match &head.stream_weights {
        None => None,
        Some(_) => {
            let weights: Vec<&[f64]> = bodies
                .iter()
                .map(|b| {
                    b.stream_weights
                        .as_ref()
                        .and_then(MacroOr::inline)
                        .map(Vec::as_slice)
                })
                .collect::<Option<_>>()?;
            if weights.iter().any(|w| w.len() != weights[0].len()) {
                return None;
            }
            Some(MacroOr::Inline(linear_interpolate_vectors(&weights, gammas)))
        }
    };

    Some(IndexedState {
        index: first.index,
        state: MacroOr::Inline(State {
            num_mixes: head.num_mixes.clone(),
            stream_weights,
            streams,
            duration: head.duration.clone(),
        }),
    })
}

// ---------------------------------------------------------------------------
// Top-level entries
// ---------------------------------------------------------------------------

/// Interpolate whole state lists position by position.
///
/// Fails when the number of lists differs from the number of coefficients
/// or the lists have different lengths.  A single list is returned as is.
pub fn linear_states(
    state_lists: &[&[IndexedState]],
    coefficients: &[f64],
) -> Option<Vec<IndexedState>> {
    if state_lists.is_empty() || state_lists.len() != coefficients.len() {
        return None;
    }
    if state_lists.len() == 1 {
        return Some(state_lists[0].to_vec());
    }
    let len = state_lists[0].len();
    if state_lists.iter().any(|l| l.len() != len) {
        return None;
    }
    (0..len)
        .map(|i| {
            let column: Vec<&IndexedState> = state_lists.iter().map(|l| &l[i]).collect();
            linear_interpolate_states(&column, coefficients)
        })
        .collect()
}

/// Interpolate transitions given as inline values or macro references.
/// References make the call fail; a single operand is returned as is.
pub fn linear_transitions(
    transitions: &[&MacroOr<Transition>],
    coefficients: &[f64],
) -> Option<Transition> {
    if transitions.is_empty() || transitions.len() != coefficients.len() {
        return None;
    }
    let inline: Vec<&Transition> = transitions
        .iter()
        .map(|t| t.inline())
        .collect::<Option<_>>()?;
    if inline.len() == 1 {
        return Some(inline[0].clone());
    }
    linear_interpolate_transitions(&inline, coefficients)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn gaussian_state(index: usize, mean: f64, dim: usize) -> IndexedState {
        IndexedState {
            index,
            state: MacroOr::Inline(State {
                streams: vec![Stream {
                    index: None,
                    pdf: StreamPdf::Mixtures(vec![Mixture {
                        index: 1,
                        weight: Some(1.0),
                        pdf: MacroOr::Inline(GaussianPdf {
                            gconst: Some(mean * 10.0),
                            ..GaussianPdf::diagonal(vec![mean; dim], vec![1.0 + mean; dim])
                        }),
                    }]),
                }],
                ..State::default()
            }),
        }
    }

    fn mean_of(state: &IndexedState) -> &Vector {
        let body = state.state.inline().unwrap();
        let mixture = &body.streams[0].mixtures().unwrap()[0];
        mixture.pdf.inline().unwrap().mean.inline().unwrap()
    }

    #[test]
    fn values_weighted_sum() {
        assert_eq!(linear_interpolate_values(&[2.0, 4.0], &[0.5, 0.5]), 3.0);
        assert_eq!(linear_interpolate_values(&[], &[]), 0.0);
    }

    #[test]
    fn vectors_identity_law() {
        let v1: &[f64] = &[0.1, -3.25, 7.0e-5, 12.5];
        let v2: &[f64] = &[9.0, 8.0, -7.0, 6.0];
        assert_eq!(linear_interpolate_vectors(&[v1, v2], &[1.0, 0.0]), v1);
        assert_eq!(linear_interpolate_vectors(&[v1, v2], &[0.0, 1.0]), v2);
    }

    #[test]
    fn vectors_midpoint() {
        let v1: &[f64] = &[0.0, 0.2, 0.8, 0.0];
        let v2: &[f64] = &[0.0, 0.4, 0.6, 0.0];
        let mid: Vec<f64> = linear_interpolate_vectors(&[v1, v2], &[0.5, 0.5])
            .into_iter()
            .map(|x| (x * 10.0).round() / 10.0)
            .collect();
        assert_eq!(mid, vec![0.0, 0.3, 0.7, 0.0]);
    }

    #[test]
    fn matrix_row_wise() {
        let a = vec![vec![0.0, 1.0], vec![0.0, 0.0]];
        let b = vec![vec![0.0, 0.0], vec![1.0, 0.0]];
        let m = linear_interpolate_matrix(&[&a, &b], &[0.25, 0.75]);
        assert_eq!(m, vec![vec![0.0, 0.25], vec![0.75, 0.0]]);
    }

    #[test]
    fn transitions_need_same_dimension() {
        let a = Transition::new(vec![vec![0.0, 1.0], vec![0.0, 0.0]]);
        let b = Transition::new(vec![vec![0.0; 3]; 3]);
        assert!(linear_interpolate_transitions(&[&a, &b], &[0.5, 0.5]).is_none());
        assert!(linear_interpolate_transitions(&[&a, &a], &[0.5, 0.5]).is_some());
    }

    #[test]
    fn mixtures_fail_on_dimension_mismatch() {
        let a = gaussian_state(2, 0.0, 3);
        let b = gaussian_state(2, 1.0, 4);
        assert!(linear_interpolate_states(&[&a, &b], &[0.5, 0.5]).is_none());
    }

    #[test]
    fn mixtures_interpolate_all_numeric_fields() {
        let a = gaussian_state(2, 0.0, 3);
        let b = gaussian_state(2, 1.0, 3);
        let s = linear_interpolate_states(&[&a, &b], &[0.5, 0.5]).unwrap();
        assert_eq!(s.index, 2);
        assert_eq!(mean_of(&s), &vec![0.5; 3]);

        let body = s.state.inline().unwrap();
        let mixture = &body.streams[0].mixtures().unwrap()[0];
        let pdf = mixture.pdf.inline().unwrap();
        assert_eq!(pdf.covariance.variance(), Some(&vec![1.5; 3]));
        assert_eq!(pdf.gconst, Some(5.0));
        assert_eq!(mixture.weight, Some(1.0));
    }

    #[test]
    fn missing_weight_keeps_first() {
        let a = gaussian_state(2, 0.0, 2);
        let mut b = gaussian_state(2, 1.0, 2);
        if let MacroOr::Inline(state) = &mut b.state {
            if let StreamPdf::Mixtures(m) = &mut state.streams[0].pdf {
                m[0].weight = None;
            }
        }
        let s = linear_interpolate_states(&[&a, &b], &[0.3, 0.7]).unwrap();
        let body = s.state.inline().unwrap();
        assert_eq!(body.streams[0].mixtures().unwrap()[0].weight, Some(1.0));
    }

    #[test]
    fn states_fail_on_macro_reference() {
        let a = gaussian_state(2, 0.0, 3);
        let b = IndexedState {
            index: 2,
            state: MacroOr::Macro("silst".into()),
        };
        assert!(linear_interpolate_states(&[&a, &b], &[0.5, 0.5]).is_none());
    }

    #[test]
    fn linear_states_checks_operand_counts() {
        let a = vec![gaussian_state(2, 0.0, 2), gaussian_state(3, 0.0, 2)];
        let b = vec![gaussian_state(2, 1.0, 2)];
        assert!(linear_states(&[a.as_slice(), b.as_slice()], &[0.5, 0.5]).is_none());
        assert!(linear_states(&[a.as_slice(), a.as_slice()], &[1.0]).is_none());
        assert!(linear_states(&[], &[]).is_none());
    }

    #[test]
    fn linear_states_single_operand_is_identity() {
        let a = vec![gaussian_state(2, 0.25, 2)];
        assert_eq!(linear_states(&[a.as_slice()], &[0.3]).unwrap(), a);
    }

    #[test]
    fn linear_states_index_by_index() {
        let a = vec![gaussian_state(2, 0.0, 2), gaussian_state(3, 0.0, 2)];
        let b = vec![gaussian_state(2, 1.0, 2), gaussian_state(3, 2.0, 2)];
        let out = linear_states(&[a.as_slice(), b.as_slice()], &[0.5, 0.5]).unwrap();
        assert_eq!(mean_of(&out[0]), &vec![0.5; 2]);
        assert_eq!(mean_of(&out[1]), &vec![1.0; 2]);
        assert_eq!(out[1].index, 3);
    }

    #[test]
    fn linear_transitions_rejects_references() {
        let t = MacroOr::Inline(Transition::new(vec![vec![0.0, 1.0], vec![0.0, 0.0]]));
        let r: MacroOr<Transition> = MacroOr::Macro("T_sil".into());
        assert!(linear_transitions(&[&t, &r], &[0.5, 0.5]).is_none());
        assert_eq!(linear_transitions(&[&t], &[1.0]), t.inline().cloned());
    }

    #[test]
    fn tied_mixture_streams_are_not_interpolated() {
        let tied = Stream {
            index: Some(1),
            pdf: StreamPdf::TiedMixture {
                name: "cb".into(),
                weights: vec![0.5, 0.5],
            },
        };
        assert!(linear_interpolate_streams(&[&tied, &tied], &[0.5, 0.5]).is_none());
    }
}
