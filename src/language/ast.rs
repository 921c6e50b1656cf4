use crate::language::span::Location;
use crate::runtime::value::{Value, ValueType};
use std::{fmt, rc::Rc, str::FromStr};

/// Binding strength of each syntactic form, weakest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Sequence,
    Output,
    Assign,
    Control,
    Or,
    And,
    Not,
    Comparison,
    IndexOf,
    Append,
    Range,
    Plus,
    Mult,
    Sign,
    Best,
    Draw,
    Dice,
    Unary,
    Subscript,
    Atom,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Fragment {
    Text(String),
    Variable(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithmeticOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::Div => "/",
            ArithmeticOp::Mod => "%",
        }
    }

    pub fn precedence(self) -> Precedence {
        match self {
            ArithmeticOp::Add | ArithmeticOp::Sub => Precedence::Plus,
            ArithmeticOp::Mul | ArithmeticOp::Div | ArithmeticOp::Mod => Precedence::Mult,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignOp {
    Plus,
    Minus,
}

impl SignOp {
    pub fn symbol(self) -> &'static str {
        match self {
            SignOp::Plus => "+",
            SignOp::Minus => "-",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl ComparisonOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "==",
            ComparisonOp::Ne => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Gt => ">",
            ComparisonOp::Le => "<=",
            ComparisonOp::Ge => ">=",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EqualityOp {
    Same,
    NotSame,
}

impl EqualityOp {
    pub fn symbol(self) -> &'static str {
        match self {
            EqualityOp::Same => "===",
            EqualityOp::NotSame => "!==",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selector {
    Highest,
    Lowest,
    First,
    Last,
}

impl Selector {
    pub fn keyword(self) -> &'static str {
        match self {
            Selector::Highest => "highest",
            Selector::Lowest => "lowest",
            Selector::First => "first",
            Selector::Last => "last",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReorderOp {
    Sort,
    Reverse,
    Shuffle,
}

impl ReorderOp {
    pub fn keyword(self) -> &'static str {
        match self {
            ReorderOp::Sort => "sorted",
            ReorderOp::Reverse => "reversed",
            ReorderOp::Shuffle => "shuffled",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeSelector {
    Local,
    Outer,
    Global,
}

impl ScopeSelector {
    pub fn keyword(self) -> &'static str {
        match self {
            ScopeSelector::Local => "local",
            ScopeSelector::Outer => "outer",
            ScopeSelector::Global => "global",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutputMode {
    Roll,
    #[default]
    Sample,
}

impl OutputMode {
    pub fn keyword(self) -> &'static str {
        match self {
            OutputMode::Roll => "roll",
            OutputMode::Sample => "sample",
        }
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "roll" => Ok(OutputMode::Roll),
            "sample" => Ok(OutputMode::Sample),
            other => Err(format!("unknown output mode `{}`", other)),
        }
    }
}

/// Type requested by an output: either a concrete type or the value as evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputType {
    Native,
    Type(ValueType),
}

impl OutputType {
    pub fn target(self) -> Option<ValueType> {
        match self {
            OutputType::Native => None,
            OutputType::Type(ty) => Some(ty),
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            OutputType::Native => "native",
            OutputType::Type(ty) => ty.keyword(),
        }
    }
}

impl Default for OutputType {
    fn default() -> Self {
        OutputType::Type(ValueType::Number)
    }
}

impl FromStr for OutputType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s {
            "native" => return Ok(OutputType::Native),
            "undef" | "undefined" => ValueType::Undefined,
            "string" => ValueType::String,
            "boolean" => ValueType::Boolean,
            "number" => ValueType::Number,
            "list" => ValueType::List,
            "map" => ValueType::Map,
            "fun" | "function" => ValueType::Function,
            other => return Err(format!("unknown type `{}`", other)),
        };
        Ok(OutputType::Type(ty))
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Clone, Debug)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
}

#[derive(Clone, Debug)]
pub struct Lambda {
    pub params: Vec<Param>,
    pub body: Expr,
}

#[derive(Clone, Debug)]
pub struct ForLoop {
    pub index: Option<String>,
    pub item: String,
    pub out: Expr,
    pub container: Expr,
    pub condition: Option<Expr>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepeatForm {
    /// `while C repeat E`
    PreTest,
    /// `repeat E while C`
    PostTest,
    /// `repeat E if C`, a post-test loop limited to one repetition.
    Once,
}

#[derive(Clone, Debug)]
pub struct Repeat {
    pub form: RepeatForm,
    pub body: Expr,
    pub condition: Expr,
    pub limit: Option<Expr>,
}

#[derive(Clone, Debug)]
pub struct Output {
    pub mode: OutputMode,
    pub expression: Rc<Expr>,
    pub ty: Option<OutputType>,
    pub name: Option<Expr>,
}

#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: Location,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Constant(Value),
    Interpolation(Vec<Fragment>),
    List(Vec<Expr>),
    Map(Vec<(String, Expr)>),
    Lambda(Rc<Lambda>),
    Arithmetic {
        op: ArithmeticOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Sign {
        op: SignOp,
        operand: Box<Expr>,
    },
    NumberComparison {
        op: ComparisonOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    GeneralComparison {
        op: EqualityOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Append {
        target: Box<Expr>,
        source: Box<Expr>,
    },
    Best {
        selector: Selector,
        operand: Box<Expr>,
    },
    BestMultiple {
        selector: Selector,
        count: Box<Expr>,
        operand: Box<Expr>,
    },
    Draw(Box<Expr>),
    DrawMultiple {
        count: Box<Expr>,
        operand: Box<Expr>,
    },
    Die(Box<Expr>),
    Dice {
        count: Box<Expr>,
        die: Box<Expr>,
    },
    Count(Box<Expr>),
    Convert {
        ty: ValueType,
        operand: Box<Expr>,
    },
    IndexOf {
        element: Box<Expr>,
        container: Box<Expr>,
    },
    Reorder {
        op: ReorderOp,
        operand: Box<Expr>,
    },
    Range {
        begin: Box<Expr>,
        end: Box<Expr>,
    },
    ForLoop(Box<ForLoop>),
    Repeat(Box<Repeat>),
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Subscript {
        container: Box<Expr>,
        subscript: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        positional: Vec<Expr>,
        named: Vec<(String, Expr)>,
    },
    Sequence(Box<Expr>, Box<Expr>),
    ScopeVariables(ScopeSelector),
    Output(Box<Output>),
    Import {
        address: Box<Expr>,
        namespace: Option<String>,
    },
    Variable(String),
}

impl Expr {
    pub fn new(kind: ExprKind, location: Location) -> Self {
        Self { kind, location }
    }

    pub fn constant(value: Value, location: Location) -> Self {
        Self::new(ExprKind::Constant(value), location)
    }

    /// Rebuilds a value as the expression that evaluates to a fresh copy of it.
    pub fn from_value(value: &Value) -> Self {
        let location = Location::builtin();
        let kind = match value {
            Value::List(items) => ExprKind::List(items.borrow().iter().map(Expr::from_value).collect()),
            Value::Map(entries) => ExprKind::Map(
                entries
                    .borrow()
                    .iter()
                    .map(|(key, value)| (key.clone(), Expr::from_value(value)))
                    .collect(),
            ),
            Value::Function(function) => ExprKind::Lambda(function.lambda.clone()),
            scalar => ExprKind::Constant(scalar.clone()),
        };
        Self::new(kind, location)
    }

    pub fn precedence(&self) -> Precedence {
        match &self.kind {
            ExprKind::Constant(Value::Number(n)) if *n < 0 => Precedence::Sign,
            ExprKind::Constant(_)
            | ExprKind::Interpolation(_)
            | ExprKind::List(_)
            | ExprKind::Map(_)
            | ExprKind::Lambda(_)
            | ExprKind::ScopeVariables(_)
            | ExprKind::Variable(_) => Precedence::Atom,
            ExprKind::Arithmetic { op, .. } => op.precedence(),
            ExprKind::Sign { .. } => Precedence::Sign,
            ExprKind::NumberComparison { .. } | ExprKind::GeneralComparison { .. } => {
                Precedence::Comparison
            }
            ExprKind::And(..) => Precedence::And,
            ExprKind::Or(..) => Precedence::Or,
            ExprKind::Not(_) => Precedence::Not,
            ExprKind::Append { .. } => Precedence::Append,
            ExprKind::Best { .. } | ExprKind::BestMultiple { .. } => Precedence::Best,
            ExprKind::Draw(_) | ExprKind::DrawMultiple { .. } => Precedence::Draw,
            ExprKind::Die(_) | ExprKind::Dice { .. } => Precedence::Dice,
            ExprKind::Count(_) | ExprKind::Convert { .. } | ExprKind::Reorder { .. } => {
                Precedence::Unary
            }
            ExprKind::IndexOf { .. } => Precedence::IndexOf,
            ExprKind::Range { .. } => Precedence::Range,
            ExprKind::ForLoop(_) | ExprKind::Repeat(_) | ExprKind::Conditional { .. } => {
                Precedence::Control
            }
            ExprKind::Assign { .. } => Precedence::Assign,
            ExprKind::Subscript { .. } | ExprKind::Call { .. } => Precedence::Subscript,
            ExprKind::Sequence(..) => Precedence::Sequence,
            ExprKind::Output(_) | ExprKind::Import { .. } => Precedence::Output,
        }
    }

    /// The type this node yields before any requested conversion, `None` when it
    /// depends on the values involved.
    pub fn native_type(&self) -> Option<ValueType> {
        match &self.kind {
            ExprKind::Constant(value) => Some(value.value_type()),
            ExprKind::Interpolation(_) => Some(ValueType::String),
            ExprKind::List(_)
            | ExprKind::BestMultiple { .. }
            | ExprKind::DrawMultiple { .. }
            | ExprKind::Dice { .. }
            | ExprKind::Reorder { .. }
            | ExprKind::Range { .. }
            | ExprKind::Repeat(_) => Some(ValueType::List),
            ExprKind::Map(_) | ExprKind::ScopeVariables(_) => Some(ValueType::Map),
            ExprKind::Lambda(_) => Some(ValueType::Function),
            ExprKind::Arithmetic { .. } | ExprKind::Sign { .. } | ExprKind::Count(_) => {
                Some(ValueType::Number)
            }
            ExprKind::NumberComparison { .. }
            | ExprKind::GeneralComparison { .. }
            | ExprKind::And(..)
            | ExprKind::Or(..)
            | ExprKind::Not(_) => Some(ValueType::Boolean),
            ExprKind::Convert { ty, .. } => Some(*ty),
            ExprKind::Output(_) | ExprKind::Import { .. } => Some(ValueType::Undefined),
            ExprKind::Sequence(_, right) => right.native_type(),
            ExprKind::Append { .. }
            | ExprKind::Best { .. }
            | ExprKind::Draw(_)
            | ExprKind::Die(_)
            | ExprKind::IndexOf { .. }
            | ExprKind::ForLoop(_)
            | ExprKind::Conditional { .. }
            | ExprKind::Assign { .. }
            | ExprKind::Subscript { .. }
            | ExprKind::Call { .. }
            | ExprKind::Variable(_) => None,
        }
    }

    /// Whether a `roll` or `sample` appears anywhere in this tree.
    pub fn has_output(&self) -> bool {
        match &self.kind {
            ExprKind::Output(_) => true,
            ExprKind::Constant(_)
            | ExprKind::Interpolation(_)
            | ExprKind::ScopeVariables(_)
            | ExprKind::Variable(_) => false,
            ExprKind::List(items) => items.iter().any(Expr::has_output),
            ExprKind::Map(entries) => entries.iter().any(|(_, e)| e.has_output()),
            ExprKind::Lambda(lambda) => {
                lambda.body.has_output()
                    || lambda
                        .params
                        .iter()
                        .any(|p| p.default.as_ref().is_some_and(Expr::has_output))
            }
            ExprKind::Arithmetic { left, right, .. }
            | ExprKind::NumberComparison { left, right, .. }
            | ExprKind::GeneralComparison { left, right, .. }
            | ExprKind::And(left, right)
            | ExprKind::Or(left, right)
            | ExprKind::Sequence(left, right)
            | ExprKind::Append {
                target: left,
                source: right,
            }
            | ExprKind::BestMultiple {
                count: left,
                operand: right,
                ..
            }
            | ExprKind::DrawMultiple {
                count: left,
                operand: right,
            }
            | ExprKind::Dice {
                count: left,
                die: right,
            }
            | ExprKind::IndexOf {
                element: left,
                container: right,
            }
            | ExprKind::Range {
                begin: left,
                end: right,
            }
            | ExprKind::Assign {
                target: left,
                value: right,
            }
            | ExprKind::Subscript {
                container: left,
                subscript: right,
            } => left.has_output() || right.has_output(),
            ExprKind::Sign { operand, .. }
            | ExprKind::Best { operand, .. }
            | ExprKind::Convert { operand, .. }
            | ExprKind::Reorder { operand, .. }
            | ExprKind::Not(operand)
            | ExprKind::Draw(operand)
            | ExprKind::Die(operand)
            | ExprKind::Count(operand) => operand.has_output(),
            ExprKind::ForLoop(for_loop) => {
                for_loop.out.has_output()
                    || for_loop.container.has_output()
                    || for_loop.condition.as_ref().is_some_and(Expr::has_output)
            }
            ExprKind::Repeat(repeat) => {
                repeat.body.has_output()
                    || repeat.condition.has_output()
                    || repeat.limit.as_ref().is_some_and(Expr::has_output)
            }
            ExprKind::Conditional {
                condition,
                then,
                otherwise,
            } => condition.has_output() || then.has_output() || otherwise.has_output(),
            ExprKind::Call {
                callee,
                positional,
                named,
            } => {
                callee.has_output()
                    || positional.iter().any(Expr::has_output)
                    || named.iter().any(|(_, e)| e.has_output())
            }
            ExprKind::Import { address, .. } => address.has_output(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::language::printer::to_source(self))
    }
}
