//! Token definitions

use std::fmt;

/// A token with its kind, raw lexeme text, and source offset.
///
/// Keywords are not distinguished here: `LET`, `IF` and friends are
/// ordinary IDENTIFIER tokens that the parser matches by literal text,
/// so the token kind set stays minimal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Raw lexeme text, exactly as it appears in the source
    pub text: String,
    /// Character index of the first character of the lexeme
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, offset: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            offset,
        }
    }
}

/// Token kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Integer,
    Decimal,
    Character,
    String,
    Operator,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Integer => "INTEGER",
            TokenKind::Decimal => "DECIMAL",
            TokenKind::Character => "CHARACTER",
            TokenKind::String => "STRING",
            TokenKind::Operator => "OPERATOR",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={:?}@{}", self.kind, self.text, self.offset)
    }
}
