//! Tokeniser for HTK-ASCII model files.
//!
//! HTK text is a flat stream of four token shapes:
//!
//! | Shape     | Example            | Token                     |
//! |-----------|--------------------|---------------------------|
//! | sigil     | `~h`               | [`TokenKind::Sigil`]      |
//! | keyword   | `<BeginHMM>`       | [`TokenKind::Keyword`]    |
//! | text      | `"a-b+c"`          | [`TokenKind::Text`]       |
//! | word      | `-1.234e+00`, `39` | [`TokenKind::Word`]       |
//!
//! Keywords are matched case-insensitively, so they are stored lower-cased
//! and without the angle brackets.  They may be glued to their neighbours
//! (`<VecSize> 39<NullD><MFCC_0_D><DiagC>`).

use crate::error::{AcModelError, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Sigil(char),
    Keyword(String),
    Text(String),
    Word(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// 1-based source line.
    pub line: usize,
}

impl Token {
    /// Short rendering used in parse error messages.
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Sigil(c) => format!("~{c}"),
            TokenKind::Keyword(k) => format!("<{k}>"),
            TokenKind::Text(t) => format!("\"{t}\""),
            TokenKind::Word(w) => w.clone(),
        }
    }
}

/// Split `text` into tokens.  `file` only labels errors.
pub(crate) fn tokenize(text: &str, file: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut line = 1;

    let error = |line: usize, message: String| AcModelError::Parse {
        file: file.to_string(),
        line,
        message,
    };

    while let Some((start, c)) = chars.next() {
        match c {
            '\n' => line += 1,
            c if c.is_whitespace() => {}
            '~' => match chars.next() {
                Some((_, s)) if s.is_ascii_alphabetic() => tokens.push(Token {
                    kind: TokenKind::Sigil(s.to_ascii_lowercase()),
                    line,
                }),
                _ => return Err(error(line, "dangling '~'".into())),
            },
            '<' => {
                let mut keyword = String::new();
                loop {
                    match chars.next() {
                        Some((_, '>')) => break,
                        Some((_, '\n')) | None => {
                            return Err(error(line, format!("unterminated keyword <{keyword}")))
                        }
                        Some((_, k)) => keyword.push(k.to_ascii_lowercase()),
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::Keyword(keyword),
                    line,
                });
            }
            '"' => {
                let first_line = line;
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some((_, '"')) => break,
                        Some((_, '\n')) => {
                            line += 1;
                            value.push('\n');
                        }
                        Some((_, v)) => value.push(v),
                        None => return Err(error(first_line, "unterminated string".into())),
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::Text(value),
                    line: first_line,
                });
            }
            _ => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, n)) = chars.peek() {
                    if n.is_whitespace() || n == '<' || n == '"' {
                        break;
                    }
                    end = i + n.len_utf8();
                    chars.next();
                }
                tokens.push(Token {
                    kind: TokenKind::Word(text[start..end].to_string()),
                    line,
                });
            }
        }
    }
    Ok(tokens)
}
