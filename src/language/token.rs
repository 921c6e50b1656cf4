use crate::language::{ast::Fragment, span::Span};

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Number(i64),
    String(Vec<Fragment>),

    Undef,
    True,
    False,
    If,
    Then,
    Else,
    For,
    In,
    While,
    Repeat,
    Limit,
    Import,
    Roll,
    Sample,
    As,
    Fun,
    Local,
    Outer,
    Global,
    Of,
    From,
    Draw,
    Highest,
    Lowest,
    First,
    Last,
    Count,
    StringKw,
    BooleanKw,
    NumberKw,
    ListKw,
    MapKw,
    Sorted,
    Reversed,
    Shuffled,
    And,
    Or,
    Not,
    D,

    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    DotDot,
    Semi,
    Separator, // ---
    Eq,
    EqEq,
    BangEq,
    EqEqEq,
    BangEqEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    LtLt,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Hash,

    Eof,
}

pub fn keyword(word: &str) -> Option<TokenKind> {
    let kind = match word {
        "undef" => TokenKind::Undef,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "if" => TokenKind::If,
        "then" => TokenKind::Then,
        "else" => TokenKind::Else,
        "for" => TokenKind::For,
        "in" => TokenKind::In,
        "while" => TokenKind::While,
        "repeat" => TokenKind::Repeat,
        "limit" => TokenKind::Limit,
        "import" => TokenKind::Import,
        "roll" => TokenKind::Roll,
        "sample" => TokenKind::Sample,
        "as" => TokenKind::As,
        "fun" => TokenKind::Fun,
        "local" => TokenKind::Local,
        "outer" => TokenKind::Outer,
        "global" => TokenKind::Global,
        "of" => TokenKind::Of,
        "from" => TokenKind::From,
        "draw" => TokenKind::Draw,
        "highest" => TokenKind::Highest,
        "lowest" => TokenKind::Lowest,
        "first" => TokenKind::First,
        "last" => TokenKind::Last,
        "count" => TokenKind::Count,
        "string" => TokenKind::StringKw,
        "boolean" => TokenKind::BooleanKw,
        "number" => TokenKind::NumberKw,
        "list" => TokenKind::ListKw,
        "map" => TokenKind::MapKw,
        "sorted" => TokenKind::Sorted,
        "reversed" => TokenKind::Reversed,
        "shuffled" => TokenKind::Shuffled,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "d" => TokenKind::D,
        _ => return None,
    };
    Some(kind)
}

pub fn is_keyword(word: &str) -> bool {
    keyword(word).is_some()
}
