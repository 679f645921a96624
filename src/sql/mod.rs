//! Statement language module
//!
//! Tokenizing and parsing of SELECT / INSERT / DELETE statements.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{DeleteStatement, Expr, InsertStatement, Operand, Projection, SelectStatement, Statement};
pub use lexer::{tokenize, Lexer};
pub use parser::{parse, Parser};
pub use token::Token;
