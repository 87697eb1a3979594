//! Recursive-descent parser for HTK-ASCII model files.
//!
//! Each grammar rule is one method returning the finished node, assembled
//! bottom-up from its children.  The only shared state is the token cursor.
//!
//! ```text
//! file       := ( macro | hmm )*
//! macro      := ~o options | ~t name transp | ~s name state
//!             | ~v name <Variance> vec | ~u name <Mean> vec | ~d name <Duration> vec
//! hmm        := ~h name <BeginHMM> options <NumStates> N (<State> i state){N-2}
//!               regtree? (transp | ~t name) duration? <EndHMM>
//! state      := ~s name | <NumMixes> n+ ? weights? stream+ duration?
//! stream     := <Stream> k pdfs | pdfs
//! pdfs       := <TMix> name rle | <DProb> rle | (<Mixture> i w pdf)+ | pdf
//! pdf        := ~m name | <RClass> n ? mean covariance <GConst> g ?
//! ```

use crate::error::{AcModelError, Result};
use crate::hmm::{
    Covariance, CovKind, DurKind, GaussianPdf, Hmm, HmmDefinition, IndexedState, InputXform,
    LinXform, MacroOr, Matrix, Mixture, Options, ParameterKind, RegNode, RegTree, State, Stream,
    StreamPdf, Transition, Vector,
};
use crate::model::{Macro, MacroDef};

use super::lexer::{tokenize, Token, TokenKind};

/// Upper bound on a `<TMix>`/`<DProb>` run with no `<NumMixes>` count.
const MAX_RUN_LENGTH: usize = 1 << 16;

/// Macros and HMMs of one file, in file order.
#[derive(Debug, Default)]
pub(crate) struct ParsedFile {
    pub macros: Vec<Macro>,
    pub hmms: Vec<Hmm>,
}

/// Parse a whole model file.  `file` labels error messages.
pub(crate) fn parse(text: &str, file: &str) -> Result<ParsedFile> {
    let tokens = tokenize(text, file)?;
    Parser {
        file,
        tokens,
        pos: 0,
    }
    .file()
}

struct Parser<'a> {
    file: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    // -----------------------------------------------------------------------
    // Cursor
    // -----------------------------------------------------------------------

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error_at(&self, line: usize, message: impl Into<String>) -> AcModelError {
        AcModelError::Parse {
            file: self.file.to_string(),
            line,
            message: message.into(),
        }
    }

    /// Error located at the upcoming token, or at the last line on EOF.
    fn error(&self, message: impl Into<String>) -> AcModelError {
        let line = self
            .tokens
            .get(self.pos)
            .or(self.tokens.last())
            .map_or(1, |t| t.line);
        self.error_at(line, message)
    }

    fn unexpected(&self, expected: &str) -> AcModelError {
        match self.tokens.get(self.pos) {
            Some(t) => self.error_at(t.line, format!("expected {expected}, found {}", t.describe())),
            None => self.error(format!("expected {expected}, found end of file")),
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(TokenKind::Keyword(k)) if k == keyword)
    }

    fn at_sigil(&self, sigil: char) -> bool {
        matches!(self.peek(), Some(TokenKind::Sigil(s)) if *s == sigil)
    }

    fn at_word(&self) -> bool {
        matches!(self.peek(), Some(TokenKind::Word(_)))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let found = self.at_keyword(keyword);
        if found {
            self.pos += 1;
        }
        found
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("<{keyword}>")))
        }
    }

    /// Macro or HMM name: quoted, or a bare word.
    fn name(&mut self) -> Result<String> {
        match self.peek() {
            Some(TokenKind::Text(_) | TokenKind::Word(_)) => match self.next().map(|t| t.kind) {
                Some(TokenKind::Text(s) | TokenKind::Word(s)) => Ok(s),
                _ => Err(self.unexpected("a name")),
            },
            _ => Err(self.unexpected("a name")),
        }
    }

    /// `~<sigil> name` if the next token is that sigil.
    fn reference(&mut self, sigil: char) -> Result<Option<String>> {
        if !self.at_sigil(sigil) {
            return Ok(None);
        }
        self.pos += 1;
        self.name().map(Some)
    }

    fn word(&mut self, expected: &str) -> Result<(String, usize)> {
        if !self.at_word() {
            return Err(self.unexpected(expected));
        }
        match self.next() {
            Some(Token {
                kind: TokenKind::Word(w),
                line,
            }) => Ok((w, line)),
            _ => Err(self.unexpected(expected)),
        }
    }

    fn integer(&mut self) -> Result<usize> {
        let (word, line) = self.word("an integer")?;
        word.parse()
            .map_err(|_| self.error_at(line, format!("expected an integer, found {word}")))
    }

    fn number(&mut self) -> Result<f64> {
        let (word, line) = self.word("a number")?;
        word.parse()
            .map_err(|_| self.error_at(line, format!("expected a number, found {word}")))
    }

    fn numbers(&mut self, count: usize) -> Result<Vec<f64>> {
        (0..count).map(|_| self.number()).collect()
    }

    fn integers(&mut self, count: usize) -> Result<Vec<usize>> {
        (0..count).map(|_| self.integer()).collect()
    }

    /// `dim v1 ... vdim`
    fn vector(&mut self) -> Result<Vector> {
        let dim = self.integer()?;
        self.numbers(dim)
    }

    /// `rows * cols` numbers, closing a row every `cols` values.
    fn matrix(&mut self, rows: usize, cols: usize) -> Result<Matrix> {
        let size = rows
            .checked_mul(cols)
            .ok_or_else(|| self.error(format!("matrix size {rows}x{cols} is too large")))?;
        let flat = self.numbers(size)?;
        Ok(flat.chunks(cols.max(1)).map(<[f64]>::to_vec).collect())
    }

    /// `n` then the upper triangle, row `i` holding `n - i` values.
    fn triangle(&mut self) -> Result<Matrix> {
        let n = self.integer()?;
        (0..n).map(|i| self.numbers(n - i)).collect()
    }

    /// Weights written with `*count` repetition (`0.1*3 0.2`).
    ///
    /// A run never grows past the declared mixture count, or past
    /// [`MAX_RUN_LENGTH`] when no count was declared.
    fn run_length(&mut self, count: Option<usize>) -> Result<Vec<String>> {
        let limit = count.unwrap_or(MAX_RUN_LENGTH);
        let mut values = Vec::new();
        while self.at_word() && values.len() < limit {
            let (word, line) = self.word("a value")?;
            let (value, repeat) = match word.split_once('*') {
                Some((value, repeat)) => {
                    let repeat: usize = repeat
                        .parse()
                        .map_err(|_| self.error_at(line, format!("bad repeat count in {word}")))?;
                    (value.to_string(), repeat)
                }
                None => (word.clone(), 1),
            };
            if repeat > limit - values.len() {
                return Err(self.error_at(
                    line,
                    format!("{word} runs past {limit} values"),
                ));
            }
            values.extend(std::iter::repeat(value).take(repeat));
        }
        Ok(values)
    }

    // -----------------------------------------------------------------------
    // File
    // -----------------------------------------------------------------------

    fn file(mut self) -> Result<ParsedFile> {
        let mut parsed = ParsedFile::default();
        while self.peek().is_some() {
            let sigil = match self.peek() {
                Some(TokenKind::Sigil(s)) => *s,
                _ => return Err(self.unexpected("a macro or HMM definition")),
            };
            self.pos += 1;
            match sigil {
                'o' => parsed.macros.push(Macro::options(self.options()?)),
                'h' => {
                    let name = self.name()?;
                    let definition = self.hmm(&name)?;
                    parsed.hmms.push(Hmm::with_definition(name, definition));
                }
                't' => {
                    let name = self.name()?;
                    let def = MacroDef::Transition(self.transition()?);
                    parsed.macros.push(Macro::new(name, def));
                }
                's' => {
                    let name = self.name()?;
                    let def = MacroDef::State(self.state_body()?);
                    parsed.macros.push(Macro::new(name, def));
                }
                'v' => {
                    let name = self.name()?;
                    self.expect_keyword("variance")?;
                    let def = MacroDef::Variance(self.vector()?);
                    parsed.macros.push(Macro::new(name, def));
                }
                'u' => {
                    let name = self.name()?;
                    self.expect_keyword("mean")?;
                    let def = MacroDef::Mean(self.vector()?);
                    parsed.macros.push(Macro::new(name, def));
                }
                'd' => {
                    let name = self.name()?;
                    self.expect_keyword("duration")?;
                    let def = MacroDef::Duration(self.vector()?);
                    parsed.macros.push(Macro::new(name, def));
                }
                'w' | 'm' | 'i' | 'x' | 'j' | 'r' => {
                    return Err(AcModelError::not_implemented(format!(
                        "~{sigil} macro definitions ({}:{})",
                        self.file,
                        self.tokens[self.pos - 1].line
                    )))
                }
                other => {
                    return Err(self.error_at(
                        self.tokens[self.pos - 1].line,
                        format!("unknown macro type ~{other}"),
                    ))
                }
            }
        }
        log::debug!(
            "htk: parsed {}: {} macros, {} HMMs",
            self.file,
            parsed.macros.len(),
            parsed.hmms.len()
        );
        Ok(parsed)
    }

    // -----------------------------------------------------------------------
    // Options
    // -----------------------------------------------------------------------

    fn options(&mut self) -> Result<Options> {
        let mut options = Options::default();
        while let Some(TokenKind::Keyword(keyword)) = self.peek() {
            let keyword = keyword.clone();
            match keyword.as_str() {
                "hmmsetid" => {
                    self.pos += 1;
                    options.hmm_set_id = Some(self.name()?);
                }
                "streaminfo" => {
                    self.pos += 1;
                    let n = self.integer()?;
                    options.stream_info = Some(self.integers(n)?);
                }
                "vecsize" => {
                    self.pos += 1;
                    options.vec_size = Some(self.integer()?);
                }
                "inputxform" => {
                    self.pos += 1;
                    options.input_xform = Some(self.input_xform()?);
                }
                tag => {
                    if let Some(kind) = CovKind::from_tag(tag) {
                        options.cov_kind = Some(kind);
                    } else if let Some(kind) = DurKind::from_tag(tag) {
                        options.dur_kind = Some(kind);
                    } else if let Ok(kind) = tag.parse::<ParameterKind>() {
                        options.parameter_kind = Some(kind);
                    } else {
                        break;
                    }
                    self.pos += 1;
                }
            }
        }
        Ok(options)
    }

    fn input_xform(&mut self) -> Result<MacroOr<InputXform>> {
        if let Some(name) = self.reference('j')? {
            return Ok(MacroOr::Macro(name));
        }
        self.expect_keyword("mmfidmask")?;
        let mmf_id_mask = self.name()?;
        let parameter_kind = match self.peek() {
            Some(TokenKind::Keyword(k)) => k
                .parse::<ParameterKind>()
                .map_err(|e| self.error(e))?,
            _ => return Err(self.unexpected("a parameter kind")),
        };
        self.pos += 1;
        let pre_qualified = self.eat_keyword("prequal");

        self.expect_keyword("linxform")?;
        self.expect_keyword("vecsize")?;
        let vec_size = self.integer()?;
        self.expect_keyword("blockinfo")?;
        let n = self.integer()?;
        let block_sizes = self.integers(n)?;
        let mut blocks = Vec::new();
        for expected in 1..=n {
            self.expect_keyword("block")?;
            let index = self.integer()?;
            if index != expected {
                return Err(self.error(format!("expected block {expected}, found {index}")));
            }
            self.expect_keyword("xform")?;
            let rows = self.integer()?;
            let cols = self.integer()?;
            blocks.push(self.matrix(rows, cols)?);
        }
        Ok(MacroOr::Inline(InputXform {
            mmf_id_mask,
            parameter_kind,
            pre_qualified,
            lin_xform: LinXform {
                vec_size,
                block_sizes,
                blocks,
            },
        }))
    }

    // -----------------------------------------------------------------------
    // HMM
    // -----------------------------------------------------------------------

    fn hmm(&mut self, name: &str) -> Result<HmmDefinition> {
        self.expect_keyword("beginhmm")?;
        let options = self.options()?;
        self.expect_keyword("numstates")?;
        let state_count = self.integer()?;
        if state_count < 3 {
            return Err(self.error(format!(
                "HMM {name:?} declares {state_count} states, at least 3 are needed"
            )));
        }

        let mut states = Vec::new();
        for expected in 2..state_count {
            if !self.at_keyword("state") {
                return Err(self.unexpected(&format!("<state> {expected} of HMM {name:?}")));
            }
            self.pos += 1;
            let index = self.integer()?;
            if index != expected {
                return Err(self.error(format!(
                    "HMM {name:?}: expected state {expected}, found {index}"
                )));
            }
            let state = match self.reference('s')? {
                Some(r) => MacroOr::Macro(r),
                None => MacroOr::Inline(self.state_body()?),
            };
            states.push(IndexedState { index, state });
        }

        let regression_tree = self.regression_tree()?;
        let transition = match self.reference('t')? {
            Some(r) => MacroOr::Macro(r),
            None if self.at_keyword("transp") => MacroOr::Inline(self.transition()?),
            None => return Err(self.unexpected(&format!("the transition of HMM {name:?}"))),
        };
        let duration = self.duration()?;
        self.expect_keyword("endhmm")?;

        Ok(HmmDefinition {
            options: (!options.is_empty()).then_some(options),
            state_count,
            states,
            regression_tree,
            transition: Some(transition),
            duration,
        })
    }

    fn transition(&mut self) -> Result<Transition> {
        self.expect_keyword("transp")?;
        let n = self.integer()?;
        Ok(Transition::new(self.matrix(n, n)?))
    }

    fn duration(&mut self) -> Result<Option<MacroOr<Vector>>> {
        if let Some(r) = self.reference('d')? {
            return Ok(Some(MacroOr::Macro(r)));
        }
        if self.eat_keyword("duration") {
            return Ok(Some(MacroOr::Inline(self.vector()?)));
        }
        Ok(None)
    }

    fn regression_tree(&mut self) -> Result<Option<MacroOr<RegTree>>> {
        if let Some(r) = self.reference('r')? {
            return Ok(Some(MacroOr::Macro(r)));
        }
        if !self.eat_keyword("regtree") {
            return Ok(None);
        }
        let terminals = self.integer()?;
        let mut nodes = Vec::new();
        loop {
            if self.eat_keyword("node") {
                let index = self.integer()?;
                let n = self.integer()?;
                let children = self.integers(n)?;
                nodes.push(RegNode::Node { index, children });
            } else if self.eat_keyword("tnode") {
                let index = self.integer()?;
                let components = self.integer()?;
                nodes.push(RegNode::Terminal { index, components });
            } else {
                break;
            }
        }
        Ok(Some(MacroOr::Inline(RegTree { terminals, nodes })))
    }

    // -----------------------------------------------------------------------
    // State
    // -----------------------------------------------------------------------

    fn state_body(&mut self) -> Result<State> {
        let num_mixes = if self.eat_keyword("nummixes") {
            let mut counts = Vec::new();
            while self.at_word() {
                counts.push(self.integer()?);
            }
            if counts.is_empty() {
                return Err(self.unexpected("mixture counts"));
            }
            Some(counts)
        } else {
            None
        };

        let stream_weights = match self.reference('w')? {
            Some(r) => Some(MacroOr::Macro(r)),
            None if self.eat_keyword("sweights") => Some(MacroOr::Inline(self.vector()?)),
            None => None,
        };

        let mixes_of = |stream: usize| {
            num_mixes
                .as_ref()
                .and_then(|m| stream.checked_sub(1).and_then(|i| m.get(i)).copied())
        };

        let mut streams = Vec::new();
        if self.at_keyword("stream") {
            while self.eat_keyword("stream") {
                let index = self.integer()?;
                let pdf = self.stream_pdf(mixes_of(index))?;
                streams.push(Stream {
                    index: Some(index),
                    pdf,
                });
            }
        } else {
            let pdf = self.stream_pdf(mixes_of(1))?;
            streams.push(Stream { index: None, pdf });
        }

        let duration = self.duration()?;
        Ok(State {
            num_mixes,
            stream_weights,
            streams,
            duration,
        })
    }

    fn stream_pdf(&mut self, mixes: Option<usize>) -> Result<StreamPdf> {
        if self.eat_keyword("tmix") {
            let name = self.name()?;
            let weights = self
                .run_length(mixes)?
                .iter()
                .map(|w| w.parse::<f64>().map_err(|_| self.error(format!("bad weight {w}"))))
                .collect::<Result<_>>()?;
            return Ok(StreamPdf::TiedMixture { name, weights });
        }
        if self.eat_keyword("dprob") {
            let values = self
                .run_length(mixes)?
                .iter()
                .map(|v| v.parse::<i64>().map_err(|_| self.error(format!("bad probability {v}"))))
                .collect::<Result<_>>()?;
            return Ok(StreamPdf::Discrete(values));
        }

        let mut mixtures = Vec::new();
        if self.at_keyword("mixture") {
            while self.eat_keyword("mixture") {
                let index = self.integer()?;
                let weight = self.number()?;
                mixtures.push(Mixture {
                    index,
                    weight: Some(weight),
                    pdf: self.pdf()?,
                });
            }
        } else {
            mixtures.push(Mixture {
                index: 1,
                weight: None,
                pdf: self.pdf()?,
            });
        }
        Ok(StreamPdf::Mixtures(mixtures))
    }

    fn pdf(&mut self) -> Result<MacroOr<GaussianPdf>> {
        if let Some(r) = self.reference('m')? {
            return Ok(MacroOr::Macro(r));
        }
        let rclass = if self.eat_keyword("rclass") {
            Some(self.integer()?)
        } else {
            None
        };
        let mean = match self.reference('u')? {
            Some(r) => MacroOr::Macro(r),
            None => {
                self.expect_keyword("mean")?;
                MacroOr::Inline(self.vector()?)
            }
        };
        let covariance = self.covariance()?;
        let gconst = if self.eat_keyword("gconst") {
            Some(self.number()?)
        } else {
            None
        };
        Ok(MacroOr::Inline(GaussianPdf {
            rclass,
            mean,
            covariance,
            gconst,
        }))
    }

    fn covariance(&mut self) -> Result<Covariance> {
        if let Some(r) = self.reference('v')? {
            return Ok(Covariance::Variance(MacroOr::Macro(r)));
        }
        if let Some(r) = self.reference('i')? {
            return Ok(Covariance::InvCovar(MacroOr::Macro(r)));
        }
        if let Some(r) = self.reference('x')? {
            return Ok(Covariance::Xform(MacroOr::Macro(r)));
        }
        if self.eat_keyword("variance") {
            Ok(Covariance::Variance(MacroOr::Inline(self.vector()?)))
        } else if self.eat_keyword("invcovar") {
            Ok(Covariance::InvCovar(MacroOr::Inline(self.triangle()?)))
        } else if self.eat_keyword("lltcovar") {
            Ok(Covariance::LltCovar(self.triangle()?))
        } else if self.eat_keyword("xform") {
            let rows = self.integer()?;
            let cols = self.integer()?;
            Ok(Covariance::Xform(MacroOr::Inline(self.matrix(rows, cols)?)))
        } else {
            Err(self.unexpected("a covariance"))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmm::{BaseKind, Qualifier};
    use crate::model::MacroKind;

    const SAMPLE: &str = r#"~o
<STREAMINFO> 1 2
<VECSIZE> 2<NULLD><MFCC_0_D><DIAGC>
~v "varFloor1"
<VARIANCE> 2
 1.000000e-02 1.000000e-02
~s "silst"
<MEAN> 2
 0.0 0.0
<VARIANCE> 2
 1.0 1.0
<GCONST> 3.675754e+00
~h "a"
<BEGINHMM>
<NUMSTATES> 4
<STATE> 2
<NUMMIXES> 2
<MIXTURE> 1 4.000000e-01
<MEAN> 2
 1.0 2.0
<VARIANCE> 2
 0.5 0.5
<MIXTURE> 2 6.000000e-01
<RCLASS> 3
<MEAN> 2
 -1.0 -2.0
<VARIANCE> 2
 0.25 0.25
<STATE> 3
~s "silst"
<TRANSP> 4
 0.0 1.0 0.0 0.0
 0.0 0.6 0.4 0.0
 0.0 0.0 0.7 0.3
 0.0 0.0 0.0 0.0
<ENDHMM>
~h "sp"
<BeginHMM>
<NumStates> 3
<State> 2
~s "silst"
~t "T_sp"
<EndHMM>
"#;

    fn hmm_text(body: &str) -> String {
        format!("~h \"x\"\n<BeginHMM>\n{body}\n<EndHMM>\n")
    }

    #[test]
    fn parses_sample_file() {
        let parsed = parse(SAMPLE, "hmmdefs").unwrap();
        let kinds: Vec<MacroKind> = parsed.macros.iter().map(Macro::kind).collect();
        assert_eq!(
            kinds,
            vec![MacroKind::Options, MacroKind::Variance, MacroKind::State]
        );

        let MacroDef::Options(options) = &parsed.macros[0].definition else {
            panic!("first macro is not ~o");
        };
        assert_eq!(options.stream_info, Some(vec![2]));
        assert_eq!(options.vec_size, Some(2));
        assert_eq!(options.dur_kind, Some(DurKind::NullD));
        assert_eq!(options.cov_kind, Some(CovKind::DiagC));
        let pk = options.parameter_kind.as_ref().unwrap();
        assert_eq!(pk.base, BaseKind::Mfcc);
        assert_eq!(pk.qualifiers, vec![Qualifier::Zeroth, Qualifier::Delta]);

        let names: Vec<&str> = parsed.hmms.iter().map(Hmm::name).collect();
        assert_eq!(names, vec!["a", "sp"]);
    }

    #[test]
    fn parses_mixtures_and_references() {
        let parsed = parse(SAMPLE, "hmmdefs").unwrap();
        let a = &parsed.hmms[0];
        assert_eq!(a.definition().state_count, 4);

        let state = a.get_state(2).unwrap().inline().unwrap();
        assert_eq!(state.num_mixes, Some(vec![2]));
        let mixtures = state.streams[0].mixtures().unwrap();
        assert_eq!(mixtures.len(), 2);
        assert_eq!(mixtures[1].weight, Some(0.6));
        let pdf = mixtures[1].pdf.inline().unwrap();
        assert_eq!(pdf.rclass, Some(3));
        assert_eq!(pdf.mean.inline().unwrap(), &vec![-1.0, -2.0]);
        assert_eq!(pdf.covariance.variance().unwrap(), &vec![0.25, 0.25]);

        assert_eq!(a.get_state(3).unwrap().macro_name(), Some("silst"));
        let t = a.transition().unwrap().inline().unwrap();
        assert_eq!(t.matrix[2], vec![0.0, 0.0, 0.7, 0.3]);

        let sp = &parsed.hmms[1];
        assert_eq!(sp.transition().unwrap().macro_name(), Some("T_sp"));
    }

    #[test]
    fn state_macro_keeps_gconst() {
        let parsed = parse(SAMPLE, "hmmdefs").unwrap();
        let MacroDef::State(state) = &parsed.macros[2].definition else {
            panic!("third macro is not ~s");
        };
        let mixtures = state.streams[0].mixtures().unwrap();
        assert_eq!(mixtures[0].weight, None);
        assert_eq!(mixtures[0].pdf.inline().unwrap().gconst, Some(3.675754));
    }

    #[test]
    fn missing_state_is_a_parse_error() {
        let text = hmm_text("<NumStates> 5\n<State> 2\n~s \"s\"\n<State> 3\n~s \"s\"\n~t \"t\"");
        match parse(&text, "hmmdefs") {
            Err(AcModelError::Parse { line, message, .. }) => {
                assert_eq!(line, 8);
                assert!(message.contains("<state> 4"), "{message}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_transition_is_a_parse_error() {
        let text = hmm_text("<NumStates> 3\n<State> 2\n~s \"s\"");
        let err = parse(&text, "hmmdefs").unwrap_err();
        assert!(err.to_string().contains("transition"), "{err}");
    }

    #[test]
    fn bad_number_reports_line() {
        let text = "~v \"v\"\n<Variance> 2\n 1.0 abc\n";
        match parse(text, "vFloors") {
            Err(AcModelError::Parse { file, line, .. }) => {
                assert_eq!(file, "vFloors");
                assert_eq!(line, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unsupported_macro_definition() {
        let err = parse("~m \"mix1\"\n<Mean> 1 0.0\n", "hmmdefs").unwrap_err();
        assert!(matches!(err, AcModelError::NotImplemented(_)));
    }

    #[test]
    fn tied_mixture_run_length() {
        let text = hmm_text(
            "<NumStates> 3\n<State> 2\n<NumMixes> 4\n<TMix> \"cb\" 0.1*3 0.7\n~t \"t\"",
        );
        let parsed = parse(&text, "hmmdefs").unwrap();
        let state = parsed.hmms[0].get_state(2).unwrap().inline().unwrap();
        assert_eq!(
            state.streams[0].pdf,
            StreamPdf::TiedMixture {
                name: "cb".into(),
                weights: vec![0.1, 0.1, 0.1, 0.7],
            }
        );
    }

    #[test]
    fn discrete_stream() {
        let text = hmm_text("<NumStates> 3\n<State> 2\n<DProb> 5*2 9\n~t \"t\"");
        let parsed = parse(&text, "hmmdefs").unwrap();
        let state = parsed.hmms[0].get_state(2).unwrap().inline().unwrap();
        assert_eq!(state.streams[0].pdf, StreamPdf::Discrete(vec![5, 5, 9]));
    }

    #[test]
    fn full_covariance_and_regression_tree() {
        let text = hmm_text(
            "<NumStates> 3\n<State> 2\n<Mean> 2 0 0\n<InvCovar> 2\n 1 0.5\n 2\n\
             <RegTree> 2\n<Node> 1 2 2 3\n<TNode> 2 4\n<TNode> 3 4\n~t \"t\"",
        );
        let parsed = parse(&text, "hmmdefs").unwrap();
        let hmm = &parsed.hmms[0];
        let state = hmm.get_state(2).unwrap().inline().unwrap();
        let pdf = state.streams[0].mixtures().unwrap()[0].pdf.inline().unwrap();
        assert_eq!(
            pdf.covariance,
            Covariance::InvCovar(MacroOr::Inline(vec![vec![1.0, 0.5], vec![2.0]]))
        );

        let tree = hmm.definition().regression_tree.as_ref().unwrap().inline().unwrap();
        assert_eq!(tree.terminals, 2);
        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(
            tree.nodes[0],
            RegNode::Node {
                index: 1,
                children: vec![2, 3]
            }
        );
    }

    #[test]
    fn multiple_streams() {
        let text = hmm_text(
            "<NumStates> 3\n<State> 2\n<NumMixes> 1 1\n<SWeights> 2 1.0 1.0\n\
             <Stream> 1\n<Mean> 1 0\n<Variance> 1 1\n<Stream> 2\n<Mean> 1 0\n<Variance> 1 1\n~t \"t\"",
        );
        let parsed = parse(&text, "hmmdefs").unwrap();
        let state = parsed.hmms[0].get_state(2).unwrap().inline().unwrap();
        assert_eq!(state.streams.len(), 2);
        assert_eq!(state.streams[1].index, Some(2));
        assert_eq!(state.stream_weights, Some(MacroOr::Inline(vec![1.0, 1.0])));
    }

    #[test]
    fn input_xform_in_options() {
        let text = "~o\n<VecSize> 2<MFCC_0>\n<InputXform>\n<MMFIdMask> *\n<MFCC_0>\n\
                    <LinXform> <VecSize> 2\n<BlockInfo> 1 2\n<Block> 1\n<Xform> 2 2\n 1 0\n 0 1\n";
        let parsed = parse(text, "macros").unwrap();
        let MacroDef::Options(options) = &parsed.macros[0].definition else {
            panic!("not ~o");
        };
        let xform = options.input_xform.as_ref().unwrap().inline().unwrap();
        assert_eq!(xform.mmf_id_mask, "*");
        assert_eq!(xform.lin_xform.block_sizes, vec![2]);
        assert_eq!(xform.lin_xform.blocks[0], vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn huge_state_count_is_a_parse_error() {
        let text = "~h \"x\"\n<BeginHMM>\n<NumStates> 18446744073709551615\n<EndHMM>\n";
        match parse(text, "hmmdefs") {
            Err(AcModelError::Parse { line, message, .. }) => {
                assert_eq!(line, 4);
                assert!(message.contains("<state> 2"), "{message}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn oversized_matrix_is_a_parse_error() {
        match parse("~t \"t\"\n<TransP> 4294967296\n", "hmmdefs") {
            Err(AcModelError::Parse { message, .. }) => {
                assert!(message.contains("too large"), "{message}");
            }
            other => panic!("unexpected {other:?}"),
        }

        let text = "~o\n<VecSize> 2<MFCC_0>\n<InputXform>\n<MMFIdMask> *\n<MFCC_0>\n\
                    <LinXform> <VecSize> 2\n<BlockInfo> 18446744073709551615\n";
        assert!(matches!(
            parse(text, "macros"),
            Err(AcModelError::Parse { .. })
        ));
    }

    #[test]
    fn run_past_mixture_count() {
        let text = hmm_text(
            "<NumStates> 3\n<State> 2\n<NumMixes> 2\n<TMix> \"cb\" 0.1*3\n~t \"t\"",
        );
        match parse(&text, "hmmdefs") {
            Err(AcModelError::Parse { line, message, .. }) => {
                assert_eq!(line, 6);
                assert!(message.contains("0.1*3"), "{message}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn huge_repeat_count_is_rejected() {
        let text = hmm_text(
            "<NumStates> 3\n<State> 2\n<DProb> 5*18446744073709551615\n~t \"t\"",
        );
        assert!(matches!(
            parse(&text, "hmmdefs"),
            Err(AcModelError::Parse { .. })
        ));
    }

    #[test]
    fn garbage_at_top_level() {
        let err = parse("<BeginHMM>", "hmmdefs").unwrap_err();
        assert!(err.to_string().contains("macro or HMM definition"), "{err}");
    }
}
