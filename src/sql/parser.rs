//! Statement parser
//!
//! This module parses statement tokens into a `Statement`. WHERE clauses are
//! parsed by recursive descent:
//!
//! ```text
//! expression := term (OR term)*
//! term       := factor (AND factor)*
//! factor     := '(' expression ')' | condition
//! condition  := operand '=' operand
//! operand    := quoted-literal | bare-word
//! ```

use super::ast::*;
use super::lexer::Lexer;
use super::token::Token;
use crate::error::{Error, Result};

/// Statement parser
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Create a new parser from a statement string
    pub fn new(sql: &str) -> Result<Self> {
        let mut lexer = Lexer::new(sql);
        let tokens = lexer.tokenize()?;

        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Parse a single statement
    pub fn parse(&mut self) -> Result<Statement> {
        let verb = match self.current() {
            Token::Word(word) => word.to_ascii_uppercase(),
            Token::Eof => return Err(Error::syntax("empty statement")),
            other => return Err(Error::UnknownCommand(other.to_string())),
        };

        match verb.as_str() {
            "SELECT" => self.parse_select().map(Statement::Select),
            "INSERT" => self.parse_insert().map(Statement::Insert),
            "DELETE" => self.parse_delete().map(Statement::Delete),
            _ => Err(Error::UnknownCommand(verb)),
        }
    }

    /// Parse a SELECT statement
    fn parse_select(&mut self) -> Result<SelectStatement> {
        self.advance(); // SELECT

        let mut columns = Vec::new();
        while !self.check_keyword("FROM") {
            match self.current().clone() {
                Token::Comma => self.advance(),
                Token::Word(name) => {
                    columns.push(name);
                    self.advance();
                }
                Token::Eof => return Err(Error::syntax("expected FROM")),
                other => {
                    return Err(Error::syntax(format!(
                        "unexpected '{}' in select list",
                        other
                    )))
                }
            }
        }
        self.advance(); // FROM

        if columns.is_empty() {
            return Err(Error::syntax("expected at least one column before FROM"));
        }
        let projection = if columns.len() == 1 && columns[0] == "*" {
            Projection::All
        } else {
            Projection::Columns(columns)
        };

        let mut tables = Vec::new();
        while !self.is_at_end() && !self.check_keyword("WHERE") {
            match self.current().clone() {
                Token::Comma => self.advance(),
                Token::Word(name) => {
                    tables.push(name);
                    self.advance();
                }
                other => {
                    return Err(Error::syntax(format!(
                        "unexpected '{}' in table list",
                        other
                    )))
                }
            }
        }
        if tables.is_empty() {
            return Err(Error::syntax("expected table name after FROM"));
        }

        let selection = self.parse_where()?;

        Ok(SelectStatement {
            projection,
            tables,
            selection,
        })
    }

    /// Parse `INSERT INTO <table> VALUES ( v1 , v2 , ... )`
    fn parse_insert(&mut self) -> Result<InsertStatement> {
        self.advance(); // INSERT

        if !self.check_keyword("INTO") {
            return Err(Error::syntax("invalid INSERT syntax: expected INTO"));
        }
        self.advance();

        let table = self.expect_word("table name")?;

        if !self.check_keyword("VALUES") {
            return Err(Error::syntax("invalid INSERT syntax: expected VALUES"));
        }
        self.advance();

        self.expect(&Token::LParen)?;
        let mut values = Vec::new();
        loop {
            match self.current().clone() {
                Token::RParen => {
                    self.advance();
                    break;
                }
                Token::Comma => self.advance(),
                Token::Word(value) | Token::Quoted(value) => {
                    values.push(value);
                    self.advance();
                }
                Token::Eof => return Err(Error::syntax("expected ')' after values")),
                other => {
                    return Err(Error::syntax(format!(
                        "unexpected '{}' in value list",
                        other
                    )))
                }
            }
        }

        self.expect_end()?;
        Ok(InsertStatement { table, values })
    }

    /// Parse `DELETE FROM <table> [WHERE ...]`
    fn parse_delete(&mut self) -> Result<DeleteStatement> {
        self.advance(); // DELETE

        if !self.check_keyword("FROM") {
            return Err(Error::syntax("invalid DELETE syntax: expected FROM"));
        }
        self.advance();

        let table = self.expect_word("table name")?;
        let selection = self.parse_where()?;

        Ok(DeleteStatement { table, selection })
    }

    /// Parse an optional `WHERE <expression>` running to the end of the statement
    fn parse_where(&mut self) -> Result<Option<Expr>> {
        if self.is_at_end() {
            return Ok(None);
        }
        if !self.check_keyword("WHERE") {
            return Err(Error::syntax(format!(
                "expected WHERE, found '{}'",
                self.current()
            )));
        }
        self.advance();

        let expr = self.parse_expression()?;
        self.expect_end()?;
        Ok(Some(expr))
    }

    /// Parse an expression (OR has the lowest precedence)
    pub fn parse_expression(&mut self) -> Result<Expr> {
        let mut left = self.parse_term()?;

        while self.check_keyword("OR") {
            self.advance();
            let right = self.parse_term()?;
            left = Expr::or(left, right);
        }

        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let mut left = self.parse_factor()?;

        while self.check_keyword("AND") {
            self.advance();
            let right = self.parse_factor()?;
            left = Expr::and(left, right);
        }

        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr> {
        if self.check(&Token::LParen) {
            self.advance();
            let expr = self.parse_expression()?;
            self.expect(&Token::RParen)?;
            return Ok(expr);
        }
        self.parse_condition()
    }

    fn parse_condition(&mut self) -> Result<Expr> {
        let lhs = self.parse_operand()?;
        self.expect(&Token::Eq)?;
        let rhs = self.parse_operand()?;
        Ok(Expr::Eq(lhs, rhs))
    }

    fn parse_operand(&mut self) -> Result<Operand> {
        let operand = match self.current().clone() {
            Token::Quoted(text) => Operand::Literal(text),
            Token::Word(word) => Operand::Identifier(word),
            other => {
                return Err(Error::syntax(format!(
                    "expected operand, found '{}'",
                    other
                )))
            }
        };
        self.advance();
        Ok(operand)
    }

    // ========== Helper Methods ==========

    fn current(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(token)
    }

    fn check_keyword(&self, keyword: &str) -> bool {
        self.current().is_keyword(keyword)
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(Error::syntax(format!(
                "expected '{}', found '{}'",
                token,
                self.current()
            )))
        }
    }

    fn expect_word(&mut self, what: &str) -> Result<String> {
        match self.current().clone() {
            Token::Word(word) => {
                self.advance();
                Ok(word)
            }
            other => Err(Error::syntax(format!("expected {}, found '{}'", what, other))),
        }
    }

    fn expect_end(&self) -> Result<()> {
        if self.is_at_end() {
            Ok(())
        } else {
            Err(Error::syntax(format!(
                "unexpected '{}' after end of statement",
                self.current()
            )))
        }
    }
}

/// Parse a statement string
pub fn parse(sql: &str) -> Result<Statement> {
    Parser::new(sql)?.parse()
}
