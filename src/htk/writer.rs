//! HTK-ASCII serialisation.
//!
//! Keywords are written upper-case.  Vectors and matrix rows go on their own
//! line, each value preceded by a space and formatted as `d.dddddde±XX`.
//! Structures HTK can hold but this engine cannot write back (full
//! covariances, tied-mixture and discrete streams, regression trees, input
//! transforms) are rejected with [`AcModelError::NotImplemented`].

use crate::error::{AcModelError, Result};
use crate::hmm::{
    Covariance, GaussianPdf, Hmm, MacroOr, Options, State, StreamPdf, Transition, Vector,
};
use crate::model::{Macro, MacroDef, MacroKind};

/// Six-digit scientific notation with a signed, two-digit exponent.
///
/// ```text
/// 1.0    -> 1.000000e+00
/// -0.025 -> -2.500000e-02
/// ```
pub(crate) fn fmt_float(value: f64) -> String {
    let s = format!("{value:.6e}");
    match s.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => s,
    }
}

/// Serialise macros followed by HMM bodies.
///
/// With `reduced` set, variance and mean macros are left out.
pub(crate) fn write_file(macros: &[Macro], hmms: &[Hmm], reduced: bool) -> Result<String> {
    let mut w = HtkWriter::default();
    for m in macros {
        if reduced && matches!(m.kind(), MacroKind::Variance | MacroKind::Mean) {
            continue;
        }
        w.macro_def(m)?;
    }
    for hmm in hmms {
        w.hmm(hmm)?;
    }
    Ok(w.out)
}

#[derive(Default)]
struct HtkWriter {
    out: String,
}

impl HtkWriter {
    fn line(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn reference(&mut self, sigil: char, name: &str) {
        self.line(&format!("~{sigil} \"{name}\""));
    }

    fn values(&mut self, values: &[f64]) {
        for v in values {
            self.out.push(' ');
            self.out.push_str(&fmt_float(*v));
        }
        self.out.push('\n');
    }

    fn vector(&mut self, keyword: &str, values: &[f64]) {
        self.line(&format!("<{keyword}> {}", values.len()));
        self.values(values);
    }

    fn vector_or_ref(&mut self, keyword: &str, sigil: char, value: &MacroOr<Vector>) {
        match value {
            MacroOr::Inline(v) => self.vector(keyword, v),
            MacroOr::Macro(name) => self.reference(sigil, name),
        }
    }

    // -----------------------------------------------------------------------
    // Macros and options
    // -----------------------------------------------------------------------

    fn macro_def(&mut self, m: &Macro) -> Result<()> {
        match &m.definition {
            MacroDef::Options(o) => {
                self.line("~o");
                self.options(o)?;
            }
            MacroDef::Transition(t) => {
                self.reference('t', &m.name);
                self.transition(t);
            }
            MacroDef::State(s) => {
                self.reference('s', &m.name);
                self.state(s)?;
            }
            MacroDef::Variance(v) => {
                self.reference('v', &m.name);
                self.vector("VARIANCE", v);
            }
            MacroDef::Mean(v) => {
                self.reference('u', &m.name);
                self.vector("MEAN", v);
            }
            MacroDef::Duration(v) => {
                self.reference('d', &m.name);
                self.vector("DURATION", v);
            }
        }
        Ok(())
    }

    fn options(&mut self, o: &Options) -> Result<()> {
        if o.input_xform.is_some() {
            return Err(AcModelError::not_implemented("writing input transforms"));
        }
        if let Some(id) = &o.hmm_set_id {
            self.line(&format!("<HMMSETID> {id}"));
        }
        if let Some(sizes) = &o.stream_info {
            let sizes: Vec<String> = sizes.iter().map(usize::to_string).collect();
            self.line(&format!("<STREAMINFO> {} {}", sizes.len(), sizes.join(" ")));
        }
        let mut tags = String::new();
        if let Some(n) = o.vec_size {
            tags.push_str(&format!("<VECSIZE> {n}"));
        }
        if let Some(d) = o.dur_kind {
            tags.push_str(&format!("<{}>", d.tag()));
        }
        if let Some(pk) = &o.parameter_kind {
            tags.push_str(&format!("<{pk}>"));
        }
        if let Some(c) = o.cov_kind {
            tags.push_str(&format!("<{}>", c.tag()));
        }
        if !tags.is_empty() {
            self.line(&tags);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // HMM
    // -----------------------------------------------------------------------

    fn hmm(&mut self, hmm: &Hmm) -> Result<()> {
        let def = hmm.definition();
        let transition = def
            .transition
            .as_ref()
            .ok_or_else(|| AcModelError::IncompleteHmm(hmm.name().to_string()))?;
        if def.regression_tree.is_some() {
            return Err(AcModelError::not_implemented("writing regression trees"));
        }

        self.reference('h', hmm.name());
        self.line("<BEGINHMM>");
        if let Some(o) = def.options.as_ref().filter(|o| !o.is_empty()) {
            self.options(o)?;
        }
        self.line(&format!("<NUMSTATES> {}", def.state_count));
        for s in &def.states {
            self.line(&format!("<STATE> {}", s.index));
            match &s.state {
                MacroOr::Inline(state) => self.state(state)?,
                MacroOr::Macro(name) => self.reference('s', name),
            }
        }
        match transition {
            MacroOr::Inline(t) => self.transition(t),
            MacroOr::Macro(name) => self.reference('t', name),
        }
        if let Some(d) = &def.duration {
            self.vector_or_ref("DURATION", 'd', d);
        }
        self.line("<ENDHMM>");
        Ok(())
    }

    fn transition(&mut self, t: &Transition) {
        self.line(&format!("<TRANSP> {}", t.dim()));
        for row in &t.matrix {
            self.values(row);
        }
    }

    fn state(&mut self, state: &State) -> Result<()> {
        if let Some(counts) = &state.num_mixes {
            let counts: Vec<String> = counts.iter().map(usize::to_string).collect();
            self.line(&format!("<NUMMIXES> {}", counts.join(" ")));
        }
        if let Some(weights) = &state.stream_weights {
            self.vector_or_ref("SWEIGHTS", 'w', weights);
        }
        for stream in &state.streams {
            if let Some(k) = stream.index {
                self.line(&format!("<STREAM> {k}"));
            }
            match &stream.pdf {
                StreamPdf::Mixtures(mixtures) => {
                    for m in mixtures {
                        if let Some(weight) = m.weight {
                            self.line(&format!("<MIXTURE> {} {}", m.index, fmt_float(weight)));
                        }
                        match &m.pdf {
                            MacroOr::Inline(pdf) => self.pdf(pdf)?,
                            MacroOr::Macro(name) => self.reference('m', name),
                        }
                    }
                }
                StreamPdf::TiedMixture { .. } => {
                    return Err(AcModelError::not_implemented("writing tied-mixture streams"))
                }
                StreamPdf::Discrete(_) => {
                    return Err(AcModelError::not_implemented("writing discrete streams"))
                }
            }
        }
        if let Some(d) = &state.duration {
            self.vector_or_ref("DURATION", 'd', d);
        }
        Ok(())
    }

    fn pdf(&mut self, pdf: &GaussianPdf) -> Result<()> {
        if let Some(class) = pdf.rclass {
            self.line(&format!("<RCLASS> {class}"));
        }
        self.vector_or_ref("MEAN", 'u', &pdf.mean);
        match &pdf.covariance {
            Covariance::Variance(v) => self.vector_or_ref("VARIANCE", 'v', v),
            Covariance::InvCovar(_) => {
                return Err(AcModelError::not_implemented("writing inverse covariances"))
            }
            Covariance::LltCovar(_) => {
                return Err(AcModelError::not_implemented("writing LLT covariances"))
            }
            Covariance::Xform(_) => {
                return Err(AcModelError::not_implemented("writing covariance transforms"))
            }
        }
        if let Some(g) = pdf.gconst {
            self.line(&format!("<GCONST> {}", fmt_float(g)));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
