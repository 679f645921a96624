//! Statement syntax tree
//!
//! This module defines the parsed form of SELECT, INSERT and DELETE statements.

/// A parsed statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// SELECT statement
    Select(SelectStatement),
    /// INSERT statement
    Insert(InsertStatement),
    /// DELETE statement
    Delete(DeleteStatement),
}

impl Statement {
    /// INSERT and DELETE change table files
    pub fn is_mutation(&self) -> bool {
        matches!(self, Statement::Insert(_) | Statement::Delete(_))
    }
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// Select list
    pub projection: Projection,
    /// FROM tables, in join order
    pub tables: Vec<String>,
    /// WHERE clause
    pub selection: Option<Expr>,
}

/// Select list
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// `*`: every table's primary key then its columns
    All,
    /// Named identifiers, resolved against the combined row
    Columns(Vec<String>),
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    /// Unquoted values in column order
    pub values: Vec<String>,
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: String,
    pub selection: Option<Expr>,
}

/// Boolean WHERE expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    /// `lhs = rhs`
    Eq(Operand, Operand),
}

impl Expr {
    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::Or(Box::new(left), Box::new(right))
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::And(Box::new(left), Box::new(right))
    }
}

/// One side of an equality condition
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Quoted literal, compared by its text
    Literal(String),
    /// Bare word, looked up in the row and used verbatim when absent
    Identifier(String),
}
