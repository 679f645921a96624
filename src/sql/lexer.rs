//! Statement lexer (tokenizer)
//!
//! This module converts statement strings into a stream of tokens.

use super::token::Token;
use crate::error::{Error, Result};

/// Statement lexer
pub struct Lexer {
    /// Input characters
    input: Vec<char>,
    /// Current position in input
    position: usize,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Tokenize the entire input; the last token is always `Token::Eof`
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            if token == Token::Eof {
                tokens.push(token);
                break;
            }
            tokens.push(token);
        }

        Ok(tokens)
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        if self.is_at_end() {
            return Ok(Token::Eof);
        }

        let ch = self.current_char();
        match ch {
            ',' => {
                self.advance();
                Ok(Token::Comma)
            }
            '=' => {
                self.advance();
                Ok(Token::Eq)
            }
            '(' => {
                self.advance();
                Ok(Token::LParen)
            }
            ')' => {
                self.advance();
                Ok(Token::RParen)
            }
            '\'' => self.read_quoted(),
            _ => Ok(self.read_word()),
        }
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    /// Read a single-quoted literal. There is no escape syntax: the next quote closes it.
    fn read_quoted(&mut self) -> Result<Token> {
        let start_pos = self.position;
        self.advance(); // skip opening quote

        let mut value = String::new();
        while !self.is_at_end() {
            let ch = self.current_char();
            self.advance();
            if ch == '\'' {
                return Ok(Token::Quoted(value));
            }
            value.push(ch);
        }

        Err(Error::UnterminatedString(start_pos))
    }

    /// Read a bare word up to whitespace, punctuation or a quote
    fn read_word(&mut self) -> Token {
        let mut value = String::new();
        while !self.is_at_end() {
            let ch = self.current_char();
            if ch.is_whitespace() || ch == '\'' || Token::is_punctuation(ch) {
                break;
            }
            value.push(ch);
            self.advance();
        }
        Token::Word(value)
    }
}

/// Tokenize a statement
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(s: &str) -> Token {
        Token::Word(s.to_string())
    }

    #[test]
    fn test_simple_select() {
        let tokens = tokenize("SELECT * FROM users").unwrap();

        assert_eq!(
            tokens,
            vec![
                word("SELECT"),
                word("*"),
                word("FROM"),
                word("users"),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_punctuation_splits_words() {
        let tokens = tokenize("SELECT a,b FROM t WHERE a=b").unwrap();

        assert_eq!(
            tokens,
            vec![
                word("SELECT"),
                word("a"),
                Token::Comma,
                word("b"),
                word("FROM"),
                word("t"),
                word("WHERE"),
                word("a"),
                Token::Eq,
                word("b"),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_quoted_literal() {
        let tokens = tokenize("INSERT INTO t VALUES ('hello world', 'a=b,(c)')").unwrap();

        assert_eq!(tokens[4], Token::LParen);
        assert_eq!(tokens[5], Token::Quoted("hello world".to_string()));
        assert_eq!(tokens[6], Token::Comma);
        assert_eq!(tokens[7], Token::Quoted("a=b,(c)".to_string()));
        assert_eq!(tokens[8], Token::RParen);
    }

    #[test]
    fn test_quote_ends_word() {
        let tokens = tokenize("abc'x y'def").unwrap();
        assert_eq!(
            tokens,
            vec![
                word("abc"),
                Token::Quoted("x y".to_string()),
                word("def"),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_empty_quoted_literal() {
        let tokens = tokenize("''").unwrap();
        assert_eq!(tokens, vec![Token::Quoted(String::new()), Token::Eof]);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("SELECT 'oops").unwrap_err();
        assert!(matches!(err, Error::UnterminatedString(7)));
    }

    #[test]
    fn test_whitespace_only() {
        assert_eq!(tokenize(" \t ").unwrap(), vec![Token::Eof]);
    }
}
