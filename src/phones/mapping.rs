//! Phone-name substitution table (`monophones.repl`).
//!
//! [`PhoneMapping`] holds an ordered list of `(key, value)` pairs.  In the
//! forward direction a phone equal to a key is replaced by its value; in the
//! reverse direction a phone equal to a value is replaced by its key.
//! Phones that match nothing pass through unchanged.

use std::path::Path;

use serde::Serialize;

use crate::error::{AcModelError, Result};
use crate::fsio;

/// Delimiters separating the phones of a context-dependent label.
pub const CONTEXT_DELIMITERS: &[char] = &['-', '+'];

// ---------------------------------------------------------------------------
// PhoneMapping
// ---------------------------------------------------------------------------

/// Ordered, reversible phone substitution table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhoneMapping {
    pairs: Vec<(String, String)>,
    reverse: bool,
}

impl PhoneMapping {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Direction
    // -----------------------------------------------------------------------

    pub fn set_reverse(&mut self, reverse: bool) {
        self.reverse = reverse;
    }

    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn is_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    pub fn is_value(&self, value: &str) -> bool {
        self.pairs.iter().any(|(_, v)| v == value)
    }

    /// Value of the first pair with this key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Key of the first pair with this value.
    pub fn get_key(&self, value: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(_, v)| v == value)
            .map(|(k, _)| k.as_str())
    }

    /// Keys in table order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(k, _)| k.as_str())
    }

    /// Pairs in table order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Append a pair.  Returns `false` if the exact pair already exists.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        let value = value.into();
        if self.pairs.iter().any(|(k, v)| *k == key && *v == value) {
            return false;
        }
        self.pairs.push((key, value));
        true
    }

    /// Give every pair keyed `key` the key `new_key`, keeping table order.
    /// Returns `false` when `key` is absent.
    pub fn rename_key(&mut self, key: &str, new_key: &str) -> bool {
        let mut found = false;
        for (k, _) in self.pairs.iter_mut().filter(|(k, _)| k == key) {
            *k = new_key.to_string();
            found = true;
        }
        found
    }

    /// Remove every pair with this key, returning the first removed value.
    pub fn pop(&mut self, key: &str) -> Option<String> {
        let first = self.get(key).map(str::to_string);
        self.pairs.retain(|(k, _)| k != key);
        first
    }

    // -----------------------------------------------------------------------
    // Mapping
    // -----------------------------------------------------------------------

    /// Map one phone according to the current direction.
    pub fn map_entry(&self, entry: &str) -> String {
        let mapped = if self.reverse {
            self.get_key(entry)
        } else {
            self.get(entry)
        };
        mapped.unwrap_or(entry).to_string()
    }

    /// Map every phone of `text`, keeping the delimiters in place.
    ///
    /// ```
    /// use htk_acmodel::phones::{PhoneMapping, CONTEXT_DELIMITERS};
    ///
    /// let mut repl = PhoneMapping::new();
    /// repl.add("a:", "aa");
    /// assert_eq!(repl.map("t-a:+k", CONTEXT_DELIMITERS), "t-aa+k");
    /// ```
    pub fn map(&self, text: &str, delimiters: &[char]) -> String {
        if self.is_empty() {
            return text.to_string();
        }
        let mut out = String::with_capacity(text.len());
        let mut piece_start = 0;
        for (i, c) in text.char_indices() {
            if delimiters.contains(&c) {
                out.push_str(&self.map_entry(&text[piece_start..i]));
                out.push(c);
                piece_start = i + c.len_utf8();
            }
        }
        out.push_str(&self.map_entry(&text[piece_start..]));
        out
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Load a table file: one `key value` pair per line.
    ///
    /// Blank lines and `#` comments are skipped.  A line with a single token
    /// is a format error; extra tokens after the value are ignored.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fsio::read_text(path)?;
        Self::parse(&text)
    }

    pub(crate) fn parse(text: &str) -> Result<Self> {
        let mut table = Self::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut tokens = line.split_whitespace();
            match (tokens.next(), tokens.next()) {
                (Some(key), Some(value)) => {
                    table.add(key, value);
                }
                _ => {
                    return Err(AcModelError::MappingFormat {
                        line: idx + 1,
                        content: line.to_string(),
                    })
                }
            }
        }
        Ok(table)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fsio::write_atomic(path, &self.to_text())
    }

    pub(crate) fn to_text(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{k} {v}\n"))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
