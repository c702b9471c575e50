use super::ast::{BinaryOp, ComparisonOp, Expr, LogicalOp};
use super::lexer::{Spanned, Token};
use super::{ExpressionError, MAX_DEPTH};

/// Recursive-descent parser over a pre-lexed token stream.
///
/// Precedence, loosest first: `or`, `and`, comparison, additive,
/// multiplicative, unary minus, primary. Binary levels are left-associative.
pub struct Parser<'a> {
    tokens: &'a [Spanned],
    cursor: usize,
    depth: usize,
    source_len: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Spanned], source_len: usize) -> Self {
        Self { tokens, cursor: 0, depth: 0, source_len }
    }

    pub fn parse(mut self) -> Result<Expr, ExpressionError> {
        if self.tokens.is_empty() {
            return Err(ExpressionError::InvalidExpression {
                position: 0,
                message: "expression is empty".to_string(),
            });
        }

        let expr = self.parse_or()?;
        if let Some(trailing) = self.peek_spanned() {
            return Err(ExpressionError::InvalidExpression {
                position: trailing.span.start,
                message: format!("unexpected {} after complete expression", describe(&trailing.token)),
            });
        }
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = Expr::Logical { op: LogicalOp::Or, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_comparison()?;
        while self.eat(&Token::And) {
            let right = self.parse_comparison()?;
            left = Expr::Logical { op: LogicalOp::And, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_additive()?;
        while let Some(op) = self.peek().and_then(comparison_op) {
            self.cursor += 1;
            let right = self.parse_additive()?;
            left = Expr::Comparison { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Subtract,
                _ => break,
            };
            self.cursor += 1;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Multiply,
                Some(Token::Slash) => BinaryOp::Divide,
                Some(Token::Percent) => BinaryOp::Remainder,
                _ => break,
            };
            self.cursor += 1;
            let right = self.parse_unary()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        if self.eat(&Token::Minus) {
            self.enter()?;
            let operand = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expr::Negate(Box::new(operand)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        let Some(spanned) = self.peek_spanned() else {
            return Err(ExpressionError::InvalidExpression {
                position: self.source_len,
                message: "expression ends unexpectedly".to_string(),
            });
        };

        match &spanned.token {
            Token::Number(value) => {
                let value = *value;
                self.cursor += 1;
                Ok(Expr::Literal(value))
            }
            Token::LParen => {
                let open = spanned.span.start;
                self.cursor += 1;
                self.enter()?;
                let inner = self.parse_or()?;
                self.depth -= 1;
                if !self.eat(&Token::RParen) {
                    return Err(ExpressionError::InvalidExpression {
                        position: open,
                        message: "unclosed `(`".to_string(),
                    });
                }
                Ok(inner)
            }
            other => Err(ExpressionError::InvalidExpression {
                position: spanned.span.start,
                message: format!("expected a number or `(`, found {}", describe(other)),
            }),
        }
    }

    fn enter(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExpressionError::TooComplex { limit: MAX_DEPTH });
        }
        Ok(())
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.cursor).map(|spanned| &spanned.token)
    }

    fn peek_spanned(&self) -> Option<&'a Spanned> {
        self.tokens.get(self.cursor)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.cursor += 1;
            return true;
        }
        false
    }
}

fn comparison_op(token: &Token) -> Option<ComparisonOp> {
    match token {
        Token::EqEq => Some(ComparisonOp::Equal),
        Token::NotEq => Some(ComparisonOp::NotEqual),
        Token::Lt => Some(ComparisonOp::Less),
        Token::LtEq => Some(ComparisonOp::LessOrEqual),
        Token::Gt => Some(ComparisonOp::Greater),
        Token::GtEq => Some(ComparisonOp::GreaterOrEqual),
        _ => None,
    }
}

fn describe(token: &Token) -> String {
    let symbol = match token {
        Token::Number(value) => return format!("number `{value}`"),
        Token::Plus => "+",
        Token::Minus => "-",
        Token::Star => "*",
        Token::Slash => "/",
        Token::Percent => "%",
        Token::EqEq => "==",
        Token::NotEq => "!=",
        Token::Lt => "<",
        Token::LtEq => "<=",
        Token::Gt => ">",
        Token::GtEq => ">=",
        Token::And => "and",
        Token::Or => "or",
        Token::LParen => "(",
        Token::RParen => ")",
    };
    format!("`{symbol}`")
}
