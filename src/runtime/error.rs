use crate::language::{ast::Expr, printer, span::Location};
use crate::runtime::value::ValueType;
use thiserror::Error;

pub type RuntimeResult<T> = Result<T, EvaluationError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ErrorKind {
    #[error("invalid subscript of type {0}")]
    InvalidSubscript(ValueType),
    #[error("cannot subscript a {container} with a {subscript}")]
    SubscriptContainer {
        container: ValueType,
        subscript: ValueType,
    },
    #[error("cannot roll a die of type {0}")]
    Unrollable(ValueType),
    #[error("invalid number of dice: {0}")]
    DiceNumber(i64),
    #[error("cannot count a function")]
    CountFunction,
    #[error("nested output")]
    NestedOutput,
    #[error("cannot append to a {0}")]
    AppendTarget(ValueType),
    #[error("illegal loop container of type {0}")]
    LoopContainer(ValueType),
    #[error("too many arguments: expected at most {expected}, received {received}")]
    ExtraArgument { expected: usize, received: usize },
    #[error("argument `{0}` is already set")]
    ArgumentAlreadySet(String),
    #[error("unknown argument `{0}`")]
    UnknownArgument(String),
    #[error("expression is not assignable")]
    NotAssignable,
    #[error("division by zero")]
    DivisionByZero,
    #[error("cannot import `{address}`: {reason}")]
    Import { address: String, reason: String },
    #[error("circular import of `{0}`")]
    CircularImport(String),
    #[error("recursion limit reached: more than {0} nested evaluations")]
    RecursionLimit(usize),
}

/// Failure raised while evaluating an expression.
#[derive(Debug, Error, Clone)]
#[error("{kind}")]
pub struct EvaluationError {
    pub kind: ErrorKind,
    pub location: Location,
    /// Source text of the failing expression.
    pub expression: String,
}

impl EvaluationError {
    pub fn new(expr: &Expr, kind: ErrorKind) -> Self {
        Self {
            kind,
            location: expr.location.clone(),
            expression: printer::to_source(expr),
        }
    }
}
