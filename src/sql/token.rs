//! Statement token definitions
//!
//! Statements are split into bare words, single-quoted literals and the four
//! punctuation characters `,` `=` `(` `)`. Keywords are ordinary words and are
//! recognised by the parser.

use std::fmt;

/// Statement token types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Bare word: keyword, identifier, `*` or unquoted value
    Word(String),
    /// Single-quoted literal (text between the quotes)
    Quoted(String),
    /// ,
    Comma,
    /// =
    Eq,
    /// (
    LParen,
    /// )
    RParen,
    /// End of input
    Eof,
}

impl Token {
    /// Check if this token is the given keyword (case-insensitive)
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(word) if word.eq_ignore_ascii_case(keyword))
    }

    /// Check if this token ends a token run on its own
    pub fn is_punctuation(c: char) -> bool {
        matches!(c, ',' | '=' | '(' | ')')
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(word) => write!(f, "{}", word),
            Token::Quoted(text) => write!(f, "'{}'", text),
            Token::Comma => write!(f, ","),
            Token::Eq => write!(f, "="),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_matching() {
        assert!(Token::Word("from".to_string()).is_keyword("FROM"));
        assert!(Token::Word("FROM".to_string()).is_keyword("FROM"));
        assert!(!Token::Quoted("FROM".to_string()).is_keyword("FROM"));
        assert!(!Token::Comma.is_keyword(","));
    }

    #[test]
    fn test_display() {
        assert_eq!(Token::Quoted("a b".to_string()).to_string(), "'a b'");
        assert_eq!(Token::Word("users".to_string()).to_string(), "users");
        assert_eq!(Token::Eof.to_string(), "end of input");
    }
}
