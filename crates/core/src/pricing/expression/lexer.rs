use std::ops::Range;
use std::str::FromStr;

use logos::Logos;
use rust_decimal::Decimal;

use super::{ExpressionError, MAX_TOKENS};

/// Every token the pricing grammar accepts. Anything else in the input,
/// letters included, fails to lex.
#[derive(Logos, Clone, Debug, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    #[regex(r"[0-9]+(\.[0-9]+)?", parse_number)]
    #[regex(r"\.[0-9]+", parse_number)]
    Number(Decimal),

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,

    #[token("and")]
    #[token("&&")]
    And,
    #[token("or")]
    #[token("||")]
    Or,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub span: Range<usize>,
}

fn parse_number(lexer: &mut logos::Lexer<Token>) -> Option<Decimal> {
    Decimal::from_str(lexer.slice()).ok()
}

/// Tokenizes the whole input up front so nothing is parsed unless every
/// character belongs to the grammar.
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, ExpressionError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push(Spanned { token, span }),
            Err(()) => {
                return Err(ExpressionError::InvalidExpression {
                    position: span.start,
                    message: format!("unexpected `{}`", lexer.slice()),
                });
            }
        }

        if tokens.len() > MAX_TOKENS {
            return Err(ExpressionError::TooComplex { limit: MAX_TOKENS });
        }
    }

    Ok(tokens)
}
