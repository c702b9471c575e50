use std::fmt;

use rust_decimal::Decimal;

use super::ExpressionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Literal(Decimal),
    Negate(Box<Expr>),
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    Comparison { op: ComparisonOp, left: Box<Expr>, right: Box<Expr> },
    Logical { op: LogicalOp, left: Box<Expr>, right: Box<Expr> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Number,
    Boolean,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number => f.write_str("number"),
            Self::Boolean => f.write_str("boolean"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Value {
    Number(Decimal),
    Boolean(bool),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Number(_) => ValueKind::Number,
            Self::Boolean(_) => ValueKind::Boolean,
        }
    }

    pub fn as_number(self) -> Result<Decimal, ExpressionError> {
        match self {
            Self::Number(value) => Ok(value),
            Self::Boolean(_) => {
                Err(ExpressionError::TypeMismatch { expected: ValueKind::Number, found: ValueKind::Boolean })
            }
        }
    }

    pub fn as_boolean(self) -> Result<bool, ExpressionError> {
        match self {
            Self::Boolean(value) => Ok(value),
            Self::Number(_) => {
                Err(ExpressionError::TypeMismatch { expected: ValueKind::Boolean, found: ValueKind::Number })
            }
        }
    }
}

impl Expr {
    pub fn evaluate(&self) -> Result<Value, ExpressionError> {
        match self {
            Self::Literal(value) => Ok(Value::Number(*value)),
            Self::Negate(inner) => Ok(Value::Number(-inner.evaluate()?.as_number()?)),
            Self::Binary { op, left, right } => {
                let left = left.evaluate()?.as_number()?;
                let right = right.evaluate()?.as_number()?;
                apply_arithmetic(*op, left, right).map(Value::Number)
            }
            Self::Comparison { op, left, right } => {
                compare(*op, left.evaluate()?, right.evaluate()?).map(Value::Boolean)
            }
            Self::Logical { op, left, right } => {
                let left = left.evaluate()?.as_boolean()?;
                let short_circuit = match op {
                    LogicalOp::And => !left,
                    LogicalOp::Or => left,
                };
                if short_circuit {
                    return Ok(Value::Boolean(left));
                }
                right.evaluate()?.as_boolean().map(Value::Boolean)
            }
        }
    }

    /// Static type of the expression, checked without evaluating anything.
    pub fn infer_kind(&self) -> Result<ValueKind, ExpressionError> {
        match self {
            Self::Literal(_) => Ok(ValueKind::Number),
            Self::Negate(inner) => expect_kind(inner, ValueKind::Number),
            Self::Binary { left, right, .. } => {
                expect_kind(left, ValueKind::Number)?;
                expect_kind(right, ValueKind::Number)
            }
            Self::Comparison { op, left, right } => {
                let left = left.infer_kind()?;
                let right = right.infer_kind()?;
                match op {
                    ComparisonOp::Equal | ComparisonOp::NotEqual if left == right => {}
                    _ if left == ValueKind::Number && right == ValueKind::Number => {}
                    _ => {
                        let found = if left == ValueKind::Number { right } else { left };
                        return Err(ExpressionError::TypeMismatch { expected: ValueKind::Number, found });
                    }
                }
                Ok(ValueKind::Boolean)
            }
            Self::Logical { left, right, .. } => {
                expect_kind(left, ValueKind::Boolean)?;
                expect_kind(right, ValueKind::Boolean)
            }
        }
    }
}

fn expect_kind(expr: &Expr, expected: ValueKind) -> Result<ValueKind, ExpressionError> {
    let found = expr.infer_kind()?;
    if found != expected {
        return Err(ExpressionError::TypeMismatch { expected, found });
    }
    Ok(found)
}

fn apply_arithmetic(op: BinaryOp, left: Decimal, right: Decimal) -> Result<Decimal, ExpressionError> {
    let result = match op {
        BinaryOp::Add => left.checked_add(right),
        BinaryOp::Subtract => left.checked_sub(right),
        BinaryOp::Multiply => left.checked_mul(right),
        BinaryOp::Divide | BinaryOp::Remainder if right.is_zero() => {
            return Err(ExpressionError::DivisionByZero);
        }
        BinaryOp::Divide => left.checked_div(right),
        BinaryOp::Remainder => left.checked_rem(right),
    };
    result.ok_or(ExpressionError::Overflow)
}

fn compare(op: ComparisonOp, left: Value, right: Value) -> Result<bool, ExpressionError> {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => Ok(match op {
            ComparisonOp::Equal => left == right,
            ComparisonOp::NotEqual => left != right,
            ComparisonOp::Less => left < right,
            ComparisonOp::LessOrEqual => left <= right,
            ComparisonOp::Greater => left > right,
            ComparisonOp::GreaterOrEqual => left >= right,
        }),
        (Value::Boolean(left), Value::Boolean(right)) => match op {
            ComparisonOp::Equal => Ok(left == right),
            ComparisonOp::NotEqual => Ok(left != right),
            _ => Err(ExpressionError::TypeMismatch {
                expected: ValueKind::Number,
                found: ValueKind::Boolean,
            }),
        },
        (left, right) => Err(ExpressionError::TypeMismatch { expected: left.kind(), found: right.kind() }),
    }
}
