//! Allow-listed arithmetic and boolean expressions used by pricing rules.
//!
//! Formulas and conditions are free text authored by lab administrators, so
//! they are treated as untrusted. Input is lexed against the grammar's token
//! set before anything is parsed, parsed into an [`Expr`] tree, and evaluated
//! by walking that tree. There is no general-purpose evaluator underneath.
//!
//! Accepted grammar: decimal literals, `( )`, `+ - * / %`, unary `-`,
//! `== != < <= > >=`, `and`/`&&`, `or`/`||`.

pub mod ast;
pub mod lexer;
pub mod parser;

use thiserror::Error;

pub use ast::{BinaryOp, ComparisonOp, Expr, LogicalOp, Value, ValueKind};

use self::parser::Parser;

/// Deepest nesting of parentheses and unary minus accepted by the parser.
pub const MAX_DEPTH: usize = 64;
/// Longest token stream accepted for a single expression.
pub const MAX_TOKENS: usize = 1024;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("invalid expression at offset {position}: {message}")]
    InvalidExpression { position: usize, message: String },
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: ValueKind, found: ValueKind },
    #[error("division by zero")]
    DivisionByZero,
    #[error("arithmetic overflow")]
    Overflow,
    #[error("expression exceeds complexity limit of {limit}")]
    TooComplex { limit: usize },
}

pub fn parse(source: &str) -> Result<Expr, ExpressionError> {
    let tokens = lexer::tokenize(source)?;
    Parser::new(&tokens, source.len()).parse()
}

pub fn evaluate(source: &str) -> Result<Value, ExpressionError> {
    parse(source)?.evaluate()
}

pub fn evaluate_numeric(source: &str) -> Result<rust_decimal::Decimal, ExpressionError> {
    evaluate(source)?.as_number()
}

pub fn evaluate_boolean(source: &str) -> Result<bool, ExpressionError> {
    evaluate(source)?.as_boolean()
}
