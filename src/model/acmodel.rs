//! The acoustic model aggregate.
//!
//! [`AcousticModel`] owns the macros, the phone HMMs, the tied-list and the
//! phone replacement table read from one model folder, and implements the
//! model-level operations: macro resolution, phone renaming, monophone
//! extraction and merging two models by interpolation.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::error::{AcModelError, Result};
use crate::hmm::{BaseKind, Hmm, IndexedState, MacroOr, State, Transition};
use crate::phones::{PhoneMapping, TiedList, CONTEXT_DELIMITERS};

use super::macros::{Macro, MacroDef, MacroKind};

// ---------------------------------------------------------------------------
// MergeStats
// ---------------------------------------------------------------------------

/// Outcome of [`AcousticModel::merge_model`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    /// HMMs of the other model that were missing and got added.
    pub appended: usize,
    /// Shared HMMs replaced by their interpolation.
    pub interpolated: usize,
    /// Original HMMs left untouched.
    pub kept: usize,
    /// Shared HMMs replaced outright by the other model's version.
    pub changed: usize,
}

impl fmt::Display for MergeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "appended={} interpolated={} kept={} changed={}",
            self.appended, self.interpolated, self.kept, self.changed
        )
    }
}

// ---------------------------------------------------------------------------
// AcousticModel
// ---------------------------------------------------------------------------

/// Macros + HMMs + tied-list + phone replacement table.
///
/// HMM names are unique within a model.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AcousticModel {
    pub name: String,
    macros: Vec<Macro>,
    hmms: Vec<Hmm>,
    tiedlist: TiedList,
    repl: PhoneMapping,
}

impl AcousticModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    // -----------------------------------------------------------------------
    // Macros
    // -----------------------------------------------------------------------

    pub fn macros(&self) -> &[Macro] {
        &self.macros
    }

    pub fn set_macros(&mut self, macros: Vec<Macro>) {
        self.macros = macros;
    }

    pub fn push_macro(&mut self, m: Macro) {
        self.macros.push(m);
    }

    /// Last macro of this kind and name (later definitions shadow earlier
    /// ones).
    pub fn find_macro(&self, kind: MacroKind, name: &str) -> Option<&Macro> {
        self.macros
            .iter()
            .rev()
            .find(|m| m.kind() == kind && m.name == name)
    }

    // -----------------------------------------------------------------------
    // HMMs
    // -----------------------------------------------------------------------

    pub fn hmms(&self) -> &[Hmm] {
        &self.hmms
    }

    /// Replace every HMM, validating each one as [`append_hmm`] does.
    ///
    /// [`append_hmm`]: AcousticModel::append_hmm
    pub fn set_hmms(&mut self, hmms: Vec<Hmm>) -> Result<()> {
        let previous = std::mem::take(&mut self.hmms);
        for hmm in hmms {
            if let Err(e) = self.append_hmm(hmm) {
                self.hmms = previous;
                return Err(e);
            }
        }
        Ok(())
    }

    fn position(&self, phone: &str) -> Result<usize> {
        let mut found = self
            .hmms
            .iter()
            .enumerate()
            .filter(|(_, h)| h.name() == phone)
            .map(|(i, _)| i);
        match (found.next(), found.next()) {
            (Some(i), None) => Ok(i),
            _ => Err(AcModelError::HmmNotFound(phone.to_string())),
        }
    }

    fn contains(&self, phone: &str) -> bool {
        self.hmms.iter().any(|h| h.name() == phone)
    }

    /// The HMM named `phone`.
    ///
    /// # Errors
    ///
    /// [`AcModelError::HmmNotFound`] when no HMM, or more than one, has
    /// this name.
    pub fn get_hmm(&self, phone: &str) -> Result<&Hmm> {
        let i = self.position(phone)?;
        Ok(&self.hmms[i])
    }

    pub fn get_hmm_mut(&mut self, phone: &str) -> Result<&mut Hmm> {
        let i = self.position(phone)?;
        Ok(&mut self.hmms[i])
    }

    /// Add an HMM.
    ///
    /// # Errors
    ///
    /// - [`AcModelError::DuplicateHmm`] — the name is already used.
    /// - [`AcModelError::IncompleteHmm`] — the HMM has neither states nor a
    ///   transition.
    pub fn append_hmm(&mut self, hmm: Hmm) -> Result<()> {
        if self.contains(hmm.name()) {
            return Err(AcModelError::DuplicateHmm(hmm.name().to_string()));
        }
        let def = hmm.definition();
        if def.states.is_empty() && def.transition.is_none() {
            return Err(AcModelError::IncompleteHmm(hmm.name().to_string()));
        }
        self.hmms.push(hmm);
        Ok(())
    }

    /// Remove and return the HMM named `phone`.
    pub fn pop_hmm(&mut self, phone: &str) -> Result<Hmm> {
        let i = self.position(phone)?;
        Ok(self.hmms.remove(i))
    }

    // -----------------------------------------------------------------------
    // Phone tables
    // -----------------------------------------------------------------------

    pub fn tiedlist(&self) -> &TiedList {
        &self.tiedlist
    }

    pub fn tiedlist_mut(&mut self) -> &mut TiedList {
        &mut self.tiedlist
    }

    pub fn set_tiedlist(&mut self, tiedlist: TiedList) {
        self.tiedlist = tiedlist;
    }

    pub fn repl(&self) -> &PhoneMapping {
        &self.repl
    }

    pub fn repl_mut(&mut self) -> &mut PhoneMapping {
        &mut self.repl
    }

    pub fn set_repl(&mut self, repl: PhoneMapping) {
        self.repl = repl;
    }

    // -----------------------------------------------------------------------
    // Macro resolution
    // -----------------------------------------------------------------------

    /// Copy state and transition macros into every HMM that references
    /// them, then drop the state and transition macros.
    ///
    /// Mean, variance, duration and option macros are kept.  Nothing is
    /// modified when a reference cannot be resolved.
    ///
    /// # Errors
    ///
    /// [`AcModelError::UnresolvedMacros`] naming the HMM and the missing
    /// macros.
    pub fn fill_hmms(&mut self) -> Result<()> {
        let mut filled: Vec<(usize, Vec<IndexedState>, Option<MacroOr<Transition>>)> = Vec::new();

        for (i, hmm) in self.hmms.iter().enumerate() {
            if hmm.definition().is_inline() {
                continue;
            }
            let mut missing = Vec::new();

            let states: Vec<IndexedState> = hmm
                .states()
                .iter()
                .map(|s| match &s.state {
                    MacroOr::Inline(_) => s.clone(),
                    MacroOr::Macro(name) => match self.state_macro(name) {
                        Some(state) => IndexedState {
                            index: s.index,
                            state: MacroOr::Inline(state.clone()),
                        },
                        None => {
                            missing.push(format!("~s {name}"));
                            s.clone()
                        }
                    },
                })
                .collect();

            let transition = match hmm.transition() {
                Some(MacroOr::Macro(name)) => match self.transition_macro(name) {
                    Some(t) => Some(MacroOr::Inline(t.clone())),
                    None => {
                        missing.push(format!("~t {name}"));
                        None
                    }
                },
                other => other.cloned(),
            };

            if !missing.is_empty() {
                return Err(AcModelError::UnresolvedMacros {
                    hmm: hmm.name().to_string(),
                    names: missing,
                });
            }
            filled.push((i, states, transition));
        }

        log::debug!("acmodel: filled {} HMM definitions", filled.len());
        for (i, states, transition) in filled {
            let def = self.hmms[i].definition_mut();
            def.states = states;
            def.transition = transition;
        }
        self.macros
            .retain(|m| !matches!(m.kind(), MacroKind::State | MacroKind::Transition));
        Ok(())
    }

    fn state_macro(&self, name: &str) -> Option<&State> {
        match self.find_macro(MacroKind::State, name).map(|m| &m.definition) {
            Some(MacroDef::State(s)) => Some(s),
            _ => None,
        }
    }

    fn transition_macro(&self, name: &str) -> Option<&Transition> {
        match self
            .find_macro(MacroKind::Transition, name)
            .map(|m| &m.definition)
        {
            Some(MacroDef::Transition(t)) => Some(t),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Phone renaming
    // -----------------------------------------------------------------------

    /// Rename phones through the replacement table.
    ///
    /// Rebuilds the tied-list under the new names, renames every HMM, and
    /// for states still referencing a macro rewrites the phone field (the
    /// second `_`-separated field) of the macro name.  Macro-referenced
    /// transitions are mapped the same way but the result is not stored
    /// back: existing model folders rely on those names staying as they
    /// are.  The table direction is restored afterwards.
    pub fn replace_phones(&mut self, reverse: bool) {
        if self.repl.is_empty() {
            return;
        }
        let saved_direction = self.repl.is_reverse();
        self.repl.set_reverse(reverse);

        let mut tiedlist = TiedList::new();
        for observed in self.tiedlist.observed() {
            tiedlist.add_observed(self.repl.map(observed, CONTEXT_DELIMITERS));
        }
        for (tied, observed) in self.tiedlist.tied() {
            let observed = self.repl.map(observed, CONTEXT_DELIMITERS);
            tiedlist.add_tied(self.repl.map(tied, CONTEXT_DELIMITERS), Some(&observed));
        }
        self.tiedlist = tiedlist;

        let repl = &self.repl;
        for hmm in &mut self.hmms {
            let mapped = repl.map(hmm.name(), CONTEXT_DELIMITERS);
            hmm.rename_unchecked(mapped);

            let def = hmm.definition_mut();
            for s in &mut def.states {
                if let MacroOr::Macro(name) = &mut s.state {
                    if let Some(renamed) = map_macro_name(repl, name) {
                        *name = renamed;
                    }
                }
            }
            if let Some(MacroOr::Macro(name)) = &def.transition {
                if let Some(renamed) = map_macro_name(repl, name) {
                    log::debug!("acmodel: transition macro {name:?} maps to {renamed:?} (unchanged)");
                }
            }
        }

        self.repl.set_reverse(saved_direction);
    }

    // -----------------------------------------------------------------------
    // Sub-models
    // -----------------------------------------------------------------------

    /// Copy of the model restricted to context-independent HMMs (names
    /// without `-` or `+`), fully resolved, without a tied-list.
    pub fn extract_monophones(&self) -> Result<AcousticModel> {
        let mut out = AcousticModel::new(self.name.clone());
        out.macros = self.macros.clone();
        out.hmms = self
            .hmms
            .iter()
            .filter(|h| !h.name().contains(['+', '-']))
            .cloned()
            .collect();
        out.fill_hmms()?;
        out.repl = self.repl.clone();
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Parameter kind
    // -----------------------------------------------------------------------

    /// `mfcc_` followed by the qualifier codes of the first MFCC parameter
    /// kind found in an options macro (e.g. `mfcc_0dnz`), or an empty
    /// string.
    pub fn get_mfcc_parameter_kind(&self) -> String {
        self.macros
            .iter()
            .filter_map(|m| match &m.definition {
                MacroDef::Options(o) => o.parameter_kind.as_ref(),
                _ => None,
            })
            .find(|pk| pk.base == BaseKind::Mfcc)
            .map(|pk| pk.compact())
            .unwrap_or_default()
    }

    /// `true` when both models use the same MFCC base and qualifier set,
    /// regardless of qualifier order.
    pub fn compare_mfcc(&self, other: &AcousticModel) -> bool {
        kind_tokens(&self.get_mfcc_parameter_kind()) == kind_tokens(&other.get_mfcc_parameter_kind())
    }

    // -----------------------------------------------------------------------
    // Merge
    // -----------------------------------------------------------------------

    /// Merge `other` into `self`.
    ///
    /// Missing HMMs are appended.  Shared HMMs are kept (`gamma == 1`),
    /// replaced (`gamma == 0`) or replaced by
    /// `gamma * self + (1 - gamma) * other`.  Tied-lists are unioned and
    /// replacement pairs of `other` whose key and value are both unknown to
    /// `self` are added.
    ///
    /// # Errors
    ///
    /// - [`AcModelError::InvalidGamma`] — `gamma` outside `[0, 1]`.
    /// - [`AcModelError::ParameterKindMismatch`] — different MFCC kinds.
    /// - [`AcModelError::UnresolvedMacros`] — from [`fill_hmms`].
    ///
    /// Neither model is modified when an error is returned.
    ///
    /// [`fill_hmms`]: AcousticModel::fill_hmms
    pub fn merge_model(&mut self, other: &AcousticModel, gamma: f64) -> Result<MergeStats> {
        if !(0.0..=1.0).contains(&gamma) {
            return Err(AcModelError::InvalidGamma(gamma));
        }
        if !self.compare_mfcc(other) {
            return Err(AcModelError::ParameterKindMismatch {
                left: self.get_mfcc_parameter_kind(),
                right: other.get_mfcc_parameter_kind(),
            });
        }

        let mut other = other.clone();
        other.fill_hmms()?;
        self.fill_hmms()?;

        let mut stats = MergeStats {
            kept: self.hmms.len(),
            ..MergeStats::default()
        };

        for hmm in other.hmms {
            let Ok(i) = self.position(hmm.name()) else {
                self.hmms.push(hmm);
                stats.appended += 1;
                continue;
            };
            if gamma == 1.0 {
                continue;
            }
            if gamma == 0.0 {
                self.hmms[i].set_definition(hmm.into_definition());
                stats.changed += 1;
                stats.kept -= 1;
            } else if self.hmms[i].static_linear_interpolation(&hmm, gamma) {
                stats.interpolated += 1;
                stats.kept -= 1;
            } else {
                log::warn!("acmodel: cannot interpolate {:?}, kept as is", hmm.name());
            }
        }

        self.tiedlist.merge(&other.tiedlist);
        for (key, value) in other.repl.pairs() {
            if !self.repl.is_key(key) && !self.repl.is_value(value) {
                self.repl.add(key, value);
            }
        }

        log::info!("acmodel: merged {:?} into {:?}: {stats}", other.name, self.name);
        Ok(stats)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map the phone field of a `PREFIX_phone_...` macro name.
fn map_macro_name(repl: &PhoneMapping, name: &str) -> Option<String> {
    let mut fields: Vec<String> = name.split('_').map(str::to_string).collect();
    let phone = fields.get_mut(1)?;
    *phone = repl.map_entry(phone);
    Some(fields.join("_"))
}

/// Base name plus one token per qualifier code, lower-cased.
fn kind_tokens(kind: &str) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();
    let mut parts = kind.split('_');
    if let Some(base) = parts.next().filter(|b| !b.is_empty()) {
        tokens.insert(base.to_ascii_lowercase());
    }
    for part in parts {
        tokens.extend(part.chars().map(|c| c.to_ascii_lowercase().to_string()));
    }
    tokens
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
