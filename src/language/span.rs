use miette::SourceSpan;
use std::{fmt, rc::Rc};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn start() -> Self {
        Self {
            line: 1,
            column: 1,
            offset: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub begin: Position,
    pub end: Position,
}

impl Span {
    pub fn new(begin: Position, end: Position) -> Self {
        Self { begin, end }
    }

    pub fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.begin.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn union(self, other: Span) -> Span {
        let begin = if other.begin.offset < self.begin.offset {
            other.begin
        } else {
            self.begin
        };
        let end = if other.end.offset > self.end.offset {
            other.end
        } else {
            self.end
        };
        Span { begin, end }
    }
}

/// Where an expression came from, kept for diagnostics only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub source: Rc<str>,
    pub span: Span,
}

impl Location {
    pub fn new(source: Rc<str>, span: Span) -> Self {
        Self { source, span }
    }

    /// Location of nodes synthesized by the runtime (value conversions, default outputs).
    pub fn builtin() -> Self {
        Self {
            source: Rc::from("<builtin>"),
            span: Span::default(),
        }
    }

    pub fn to(&self, other: &Location) -> Location {
        Location {
            source: self.source.clone(),
            span: self.span.union(other.span),
        }
    }

    pub fn to_source_span(&self) -> SourceSpan {
        (self.span.begin.offset, self.span.len()).into()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.source, self.span.begin.line, self.span.begin.column
        )
    }
}
