//! SQL tokens for rendering predicates.
//!
//! Tokens are dialect-agnostic representations that serialize
//! to dialect-specific strings.

use super::dialect::{Dialect, SqlDialect};

/// A single element of a rendered `WHERE` predicate.
///
/// Adding a new variant here will cause compile errors everywhere
/// it needs to be handled (exhaustive matching).
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // === Keywords ===
    And,
    Or,
    Not,
    In,

    // === Punctuation ===
    Comma,
    LParen,
    RParen,

    // === Operators ===
    Eq,

    // === Whitespace ===
    Space,

    // === Dynamic ===
    /// Identifier, quoted per dialect.
    Ident(String),
    /// String literal, escaped per dialect.
    LitString(String),
    /// Always-true predicate.
    True,
    /// Always-false predicate.
    False,
}

impl Token {
    /// Text of tokens whose rendering does not depend on the dialect.
    fn fixed_text(&self) -> Option<&'static str> {
        Some(match self {
            Token::And => "AND",
            Token::Or => "OR",
            Token::Not => "NOT",
            Token::In => "IN",
            Token::Comma => ",",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Eq => "=",
            Token::Space => " ",
            Token::Ident(_) | Token::LitString(_) | Token::True | Token::False => return None,
        })
    }

    /// Render this token for `dialect`.
    pub fn serialize(&self, dialect: Dialect) -> String {
        match self {
            Token::Ident(name) => dialect.quote_identifier(name),
            Token::LitString(s) => dialect.quote_string(s),
            Token::True => dialect.true_predicate().to_string(),
            Token::False => dialect.false_predicate().to_string(),
            _ => self.fixed_text().map(str::to_string).unwrap_or_default(),
        }
    }
}

/// Tokens of one predicate, rendered together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: Token) -> &mut Self {
        self.tokens.push(token);
        self
    }

    pub fn append(&mut self, other: &TokenStream) -> &mut Self {
        self.tokens.extend_from_slice(&other.tokens);
        self
    }

    /// Push `items` with `separator` (surrounded by the given spacing)
    /// between consecutive items.
    pub fn separated<T>(
        &mut self,
        items: impl IntoIterator<Item = T>,
        separator: Token,
        mut emit: impl FnMut(&mut Self, T),
    ) -> &mut Self {
        let spaced = !matches!(separator, Token::Comma);
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                if spaced {
                    self.space();
                }
                self.push(separator.clone()).space();
            }
            emit(self, item);
        }
        self
    }

    pub fn serialize(&self, dialect: Dialect) -> String {
        self.tokens.iter().map(|t| t.serialize(dialect)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn space(&mut self) -> &mut Self {
        self.push(Token::Space)
    }

    pub fn lparen(&mut self) -> &mut Self {
        self.push(Token::LParen)
    }

    pub fn rparen(&mut self) -> &mut Self {
        self.push(Token::RParen)
    }
}
