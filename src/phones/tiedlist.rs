//! Observed / tied phone table.
//!
//! A [`TiedList`] records which context-dependent units (triphones,
//! biphones, monophones) physically exist in a model ("observed") and which
//! unseen units share the parameters of an observed one ("tied").  A label is
//! never both observed and tied.
//!
//! File format, one entry per line:
//!
//! ```text
//! a-b+c            <- observed
//! x-y+z a-b+c      <- tied -> observed
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::Serialize;

use crate::error::{AcModelError, Result};
use crate::fsio;

// ---------------------------------------------------------------------------
// TiedList
// ---------------------------------------------------------------------------

/// Bidirectional observed/tied label store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TiedList {
    /// Observed labels, in insertion order.
    observed: Vec<String>,
    #[serde(skip)]
    observed_set: HashSet<String>,
    /// Tied label -> observed label, sorted by tied label.
    tied: BTreeMap<String, String>,
}

impl TiedList {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn is_observed(&self, label: &str) -> bool {
        self.observed_set.contains(label)
    }

    pub fn is_tied(&self, label: &str) -> bool {
        self.tied.contains_key(label)
    }

    /// Observed label a tied label shares its parameters with.
    pub fn observed_for(&self, tied: &str) -> Option<&str> {
        self.tied.get(tied).map(String::as_str)
    }

    /// Observed labels in insertion order.
    pub fn observed(&self) -> impl Iterator<Item = &str> {
        self.observed.iter().map(String::as_str)
    }

    /// `(tied, observed)` pairs sorted by tied label.
    pub fn tied(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tied.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn observed_len(&self) -> usize {
        self.observed.len()
    }

    pub fn tied_len(&self) -> usize {
        self.tied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observed.is_empty() && self.tied.is_empty()
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Insert an observed label.  Returns `false` when the label is already
    /// known, either as observed or as tied.
    pub fn add_observed(&mut self, label: impl Into<String>) -> bool {
        let label = label.into();
        if self.observed_set.contains(&label) || self.tied.contains_key(&label) {
            return false;
        }
        self.observed_set.insert(label.clone());
        self.observed.push(label);
        true
    }

    /// Record a tied label.
    ///
    /// With `observed = Some(..)` the pair is stored as given.  With `None`
    /// the target is guessed from the existing tied entries (see
    /// [`TiedList::guess_observed`]).  Returns `false`, leaving the list
    /// untouched, when `tied` is already known or no target can be guessed.
    pub fn add_tied(&mut self, tied: impl Into<String>, observed: Option<&str>) -> bool {
        let tied = tied.into();
        if self.observed_set.contains(&tied) || self.tied.contains_key(&tied) {
            return false;
        }
        let target = match observed {
            Some(o) => o.to_string(),
            None => match self.guess_observed(&tied) {
                Some(o) => o,
                None => {
                    log::debug!("tiedlist: no candidate to tie {tied:?}");
                    return false;
                }
            },
        };
        self.tied.insert(tied, target);
        true
    }

    /// Fold `other` into `self`: observed labels first, then tied pairs.
    /// Entries already known to `self` are skipped.
    pub fn merge(&mut self, other: &TiedList) {
        for label in &other.observed {
            self.add_observed(label.clone());
        }
        for (tied, observed) in &other.tied {
            self.add_tied(tied.clone(), Some(observed));
        }
    }

    /// Remove `label` from whichever side holds it.  When `propagate` is set
    /// and the label was observed, every tied entry pointing at it goes too.
    pub fn remove(&mut self, label: &str, propagate: bool) {
        if self.observed_set.remove(label) {
            self.observed.retain(|o| o != label);
            if propagate {
                self.tied.retain(|_, target| target != label);
            }
        }
        self.tied.remove(label);
    }

    /// Guess the observed unit an unseen label should share parameters with.
    ///
    /// Triphones `l-c+r` look for existing tied targets containing `c+r`,
    /// then for targets whose centre phone is `c`.  Biphones and monophones
    /// look for targets whose centre phone matches.  Among the matches the
    /// most frequent target wins; equal counts go to the lexicographically
    /// smallest label.
    pub fn guess_observed(&self, label: &str) -> Option<String> {
        let (left, center, right) = split_context(label);

        let mut candidates: Vec<&str> = Vec::new();
        if let (Some(_), Some(right)) = (left, right) {
            let suffix = format!("{center}+{right}");
            candidates = self
                .tied
                .values()
                .filter(|t| t.contains(&suffix))
                .map(String::as_str)
                .collect();
        }
        if candidates.is_empty() {
            candidates = self
                .tied
                .values()
                .filter(|t| split_context(t).1 == center)
                .map(String::as_str)
                .collect();
        }
        most_frequent(&candidates).map(str::to_string)
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Read a tied-list file and add its entries to `self`.
    ///
    /// # Errors
    ///
    /// [`AcModelError::TiedListFormat`] on a line with more than two tokens.
    pub fn read(&mut self, path: &Path) -> Result<()> {
        let text = fsio::read_text(path)?;
        self.read_str(&text)
    }

    pub(crate) fn read_str(&mut self, text: &str) -> Result<()> {
        for (idx, line) in text.lines().enumerate() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.as_slice() {
                [] => {}
                [observed] => {
                    self.add_observed(*observed);
                }
                [tied, observed] => {
                    self.add_tied(*tied, Some(observed));
                }
                _ => {
                    return Err(AcModelError::TiedListFormat {
                        line: idx + 1,
                        content: line.to_string(),
                    })
                }
            }
        }
        Ok(())
    }

    /// Load a tied-list file into a fresh list.
    pub fn load(path: &Path) -> Result<Self> {
        let mut list = Self::new();
        list.read(path)?;
        Ok(list)
    }

    /// Write observed labels (insertion order) then tied pairs (sorted).
    pub fn save(&self, path: &Path) -> Result<()> {
        fsio::write_atomic(path, &self.to_text())
    }

    pub(crate) fn to_text(&self) -> String {
        let mut out = String::new();
        for observed in &self.observed {
            out.push_str(observed);
            out.push('\n');
        }
        for (tied, observed) in &self.tied {
            out.push_str(tied);
            out.push(' ');
            out.push_str(observed);
            out.push('\n');
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Split `l-c+r` into its left context, centre phone and right context.
pub(crate) fn split_context(label: &str) -> (Option<&str>, &str, Option<&str>) {
    let (left, rest) = match label.find('-') {
        Some(i) => (Some(&label[..i]), &label[i + 1..]),
        None => (None, label),
    };
    let (center, right) = match rest.find('+') {
        Some(i) => (&rest[..i], Some(&rest[i + 1..])),
        None => (rest, None),
    };
    (left, center, right)
}

fn most_frequent<'a>(candidates: &[&'a str]) -> Option<&'a str> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for c in candidates {
        *counts.entry(c).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|(a, ca), (b, cb)| ca.cmp(cb).then_with(|| b.cmp(a)))
        .map(|(label, _)| label)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn observed_is_inserted_once() {
        let mut list = TiedList::new();
        assert!(list.add_observed("a-b+c"));
        assert!(!list.add_observed("a-b+c"));
        assert_eq!(list.observed_len(), 1);
    }

    #[test]
    fn tied_rejects_known_labels() {
        let mut list = TiedList::new();
        list.add_observed("a-b+c");
        assert!(!list.add_tied("a-b+c", Some("x")));
        assert!(list.add_tied("x-b+c", Some("a-b+c")));
        assert!(!list.add_tied("x-b+c", Some("a-b+c")));
        assert!(!list.add_observed("x-b+c"));
    }

    #[test]
    fn split_context_handles_all_shapes() {
        assert_eq!(split_context("a-b+c"), (Some("a"), "b", Some("c")));
        assert_eq!(split_context("b+c"), (None, "b", Some("c")));
        assert_eq!(split_context("a-b"), (Some("a"), "b", None));
        assert_eq!(split_context("b"), (None, "b", None));
    }

    #[test]
    fn triphone_heuristic_prefers_right_biphone_match() {
        let mut list = TiedList::new();
        list.add_tied("p-a+t", Some("k-a+t"));
        list.add_tied("s-a+t", Some("k-a+t"));
        list.add_tied("m-a+n", Some("k-a+n"));

        assert!(list.add_tied("z-a+t", None));
        assert_eq!(list.observed_for("z-a+t"), Some("k-a+t"));
    }

    #[test]
    fn triphone_heuristic_falls_back_to_center() {
        let mut list = TiedList::new();
        list.add_tied("m-a+n", Some("k-a+n"));
        list.add_tied("p-a+n", Some("k-a+n"));
        list.add_tied("m-o+n", Some("k-o+n"));

        assert!(list.add_tied("z-a+q", None));
        assert_eq!(list.observed_for("z-a+q"), Some("k-a+n"));
    }

    #[test]
    fn heuristic_tie_break_is_lexicographic() {
        let mut list = TiedList::new();
        list.add_tied("m-a+n", Some("r-a+n"));
        list.add_tied("p-a+t", Some("k-a+t"));

        assert!(list.add_tied("z-a+q", None));
        assert_eq!(list.observed_for("z-a+q"), Some("k-a+t"));
    }

    #[test]
    fn biphone_heuristic_uses_monophone() {
        let mut list = TiedList::new();
        list.add_tied("a+b", Some("a+c"));
        list.add_tied("o+b", Some("o+c"));

        assert!(list.add_tied("a+z", None));
        assert_eq!(list.observed_for("a+z"), Some("a+c"));
        assert!(!list.add_tied("u+z", None));
    }

    #[test]
    fn merge_unions_both_sides() {
        let mut a = TiedList::new();
        a.add_observed("a");
        a.add_tied("x-a+y", Some("a"));

        let mut b = TiedList::new();
        b.add_observed("b");
        b.add_observed("a");
        b.add_tied("x-a+y", Some("b"));
        b.add_tied("x-b+y", Some("b"));

        a.merge(&b);
        assert_eq!(a.observed().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(a.observed_for("x-a+y"), Some("a"));
        assert_eq!(a.observed_for("x-b+y"), Some("b"));
    }

    #[test]
    fn remove_with_propagation() {
        let mut list = TiedList::new();
        list.add_observed("a");
        list.add_observed("b");
        list.add_tied("x-a+y", Some("a"));
        list.add_tied("z-a+y", Some("a"));
        list.add_tied("x-b+y", Some("b"));

        list.remove("a", true);
        assert!(!list.is_observed("a"));
        assert_eq!(list.tied_len(), 1);

        list.remove("b", false);
        assert!(list.is_tied("x-b+y"));
        list.remove("x-b+y", false);
        assert!(list.is_empty());
    }

    #[test]
    fn file_round_trip() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("tiedlist");

        let mut list = TiedList::new();
        list.add_observed("a-b+c");
        list.add_tied("x-y+z", Some("a-b+c"));
        list.save(&path).expect("save");

        let reloaded = TiedList::load(&path).expect("load");
        assert_eq!(reloaded, list);
        assert!(reloaded.is_observed("a-b+c"));
        assert!(reloaded.is_tied("x-y+z"));
        assert!(!reloaded.is_tied("a-b+c"));
        assert!(!reloaded.is_observed("x-y+z"));
    }

    #[test]
    fn save_sorts_tied_entries() {
        let mut list = TiedList::new();
        list.add_observed("q");
        list.add_observed("b");
        list.add_tied("z", Some("q"));
        list.add_tied("c", Some("b"));
        assert_eq!(list.to_text(), "q\nb\nc b\nz q\n");
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let mut list = TiedList::new();
        let err = list.read_str("a\nb c\nd e f\n").unwrap_err();
        match err {
            AcModelError::TiedListFormat { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
