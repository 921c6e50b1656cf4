use crate::language::{
    ast::Fragment,
    span::{Position, Span},
    token::{keyword, Token, TokenKind},
};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{digit1, multispace1, not_line_ending},
    combinator::{map_res, recognize, value},
    sequence::pair,
    IResult,
};

#[derive(Debug)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

pub fn lex(source: &str) -> Result<Vec<Token>, Vec<LexError>> {
    let lexer = Lexer::new(source);
    lexer.run()
}

struct Lexer<'a> {
    src: &'a str,
    position: Position,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            position: Position::start(),
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, Vec<LexError>> {
        loop {
            let rest = self.rest();
            let Some(ch) = rest.chars().next() else {
                break;
            };
            if let Ok((remaining, _)) = trivia(rest) {
                self.advance(rest.len() - remaining.len());
                continue;
            }
            match ch {
                '"' => self.lex_string(),
                ch if ch.is_ascii_digit() => self.lex_number(rest),
                ch if ch.is_ascii_alphabetic() || ch == '_' => self.lex_word(rest),
                _ => self.lex_symbol(rest, ch),
            }
        }
        let end = Span::new(self.position, self.position);
        self.push_token(TokenKind::Eof, end);

        if self.errors.is_empty() {
            Ok(self.tokens)
        } else {
            Err(self.errors)
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.position.offset..]
    }

    /// Consumes `len` bytes, keeping line and column in step, and returns the covered span.
    fn advance(&mut self, len: usize) -> Span {
        let begin = self.position;
        let consumed = &self.src[begin.offset..begin.offset + len];
        for ch in consumed.chars() {
            if ch == '\n' {
                self.position.line += 1;
                self.position.column = 1;
            } else {
                self.position.column += 1;
            }
        }
        self.position.offset += len;
        Span::new(begin, self.position)
    }

    fn push_token(&mut self, kind: TokenKind, span: Span) {
        self.tokens.push(Token { kind, span });
    }

    fn error(&mut self, span: Span, message: impl Into<String>) {
        self.errors.push(LexError {
            message: message.into(),
            span,
        });
    }

    fn lex_number(&mut self, rest: &'a str) {
        match number(rest) {
            Ok((remaining, kind)) => {
                let span = self.advance(rest.len() - remaining.len());
                self.push_token(kind, span);
            }
            Err(_) => {
                let len = rest
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(rest.len());
                let span = self.advance(len);
                self.error(span, "Number literal out of range");
            }
        }
    }

    fn lex_word(&mut self, rest: &'a str) {
        let Ok((_, text)) = word(rest) else {
            let span = self.advance(1);
            self.error(span, "Invalid identifier");
            return;
        };
        let begin = self.position;
        for (start, end, kind) in split_word(text) {
            let span = Span::new(shift(begin, start), shift(begin, end));
            match kind {
                Some(kind) => self.push_token(kind, span),
                None => self.error(span, "Number literal out of range"),
            }
        }
        self.advance(text.len());
    }

    fn lex_symbol(&mut self, rest: &'a str, ch: char) {
        match symbol(rest) {
            Ok((remaining, kind)) => {
                let span = self.advance(rest.len() - remaining.len());
                self.push_token(kind, span);
            }
            Err(_) => {
                let span = self.advance(ch.len_utf8());
                self.error(span, format!("Unexpected character `{}`", ch));
            }
        }
    }

    fn lex_string(&mut self) {
        let rest = self.rest();
        let mut fragments = Vec::new();
        let mut text = String::new();
        let mut chars = rest.char_indices().skip(1);
        let mut closed_at = None;
        let mut problem = None;

        while let Some((index, ch)) = chars.next() {
            match ch {
                '"' => {
                    closed_at = Some(index + 1);
                    break;
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => text.push('\n'),
                    Some((_, 't')) => text.push('\t'),
                    Some((_, escaped)) => text.push(escaped),
                    None => break,
                },
                '{' => {
                    let mut name = String::new();
                    let mut terminated = false;
                    for (_, inner) in chars.by_ref() {
                        if inner == '}' {
                            terminated = true;
                            break;
                        }
                        name.push(inner);
                    }
                    let name = name.trim().to_string();
                    if !terminated || !is_identifier(&name) {
                        problem.get_or_insert("Invalid interpolation in string literal");
                        continue;
                    }
                    if !text.is_empty() {
                        fragments.push(Fragment::Text(std::mem::take(&mut text)));
                    }
                    fragments.push(Fragment::Variable(name));
                }
                _ => text.push(ch),
            }
        }
        if !text.is_empty() {
            fragments.push(Fragment::Text(text));
        }

        match closed_at {
            Some(len) => {
                let span = self.advance(len);
                match problem {
                    Some(message) => self.error(span, message),
                    None => self.push_token(TokenKind::String(fragments), span),
                }
            }
            None => {
                let span = self.advance(rest.len());
                self.error(span, "Unterminated string literal");
            }
        }
    }
}

fn shift(position: Position, bytes: usize) -> Position {
    Position {
        line: position.line,
        column: position.column + bytes,
        offset: position.offset + bytes,
    }
}

fn trivia(input: &str) -> IResult<&str, &str> {
    alt((multispace1, recognize(pair(tag("//"), not_line_ending))))(input)
}

fn number(input: &str) -> IResult<&str, TokenKind> {
    map_res(digit1, |digits: &str| {
        digits.parse::<i64>().map(TokenKind::Number)
    })(input)
}

fn word(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn symbol(input: &str) -> IResult<&str, TokenKind> {
    alt((
        alt((
            value(TokenKind::Separator, tag("---")),
            value(TokenKind::EqEqEq, tag("===")),
            value(TokenKind::BangEqEq, tag("!==")),
            value(TokenKind::EqEq, tag("==")),
            value(TokenKind::BangEq, tag("!=")),
            value(TokenKind::LtEq, tag("<=")),
            value(TokenKind::GtEq, tag(">=")),
            value(TokenKind::LtLt, tag("<<")),
            value(TokenKind::DotDot, tag("..")),
        )),
        alt((
            value(TokenKind::LParen, tag("(")),
            value(TokenKind::RParen, tag(")")),
            value(TokenKind::LBracket, tag("[")),
            value(TokenKind::RBracket, tag("]")),
            value(TokenKind::LBrace, tag("{")),
            value(TokenKind::RBrace, tag("}")),
            value(TokenKind::Comma, tag(",")),
            value(TokenKind::Colon, tag(":")),
            value(TokenKind::Dot, tag(".")),
            value(TokenKind::Semi, tag(";")),
            value(TokenKind::Eq, tag("=")),
            value(TokenKind::Lt, tag("<")),
            value(TokenKind::Gt, tag(">")),
            value(TokenKind::Plus, tag("+")),
            value(TokenKind::Minus, tag("-")),
            value(TokenKind::Star, tag("*")),
            value(TokenKind::Slash, tag("/")),
            value(TokenKind::Percent, tag("%")),
            value(TokenKind::Hash, tag("#")),
        )),
    ))(input)
}

pub fn is_identifier(text: &str) -> bool {
    matches!(word(text), Ok(("", _)))
}

/// Splits a word into tokens, peeling off the dice operator glued to its operands:
/// `d6` is `d 6`, `dX` is `d X` and `Nd6` is `N d 6`. A `None` kind marks
/// die digits that overflow a number.
fn split_word(word: &str) -> Vec<(usize, usize, Option<TokenKind>)> {
    if let Some(kind) = keyword(word) {
        return vec![(0, word.len(), Some(kind))];
    }
    let bytes = word.as_bytes();
    if bytes.len() >= 2
        && bytes[0].is_ascii_uppercase()
        && bytes[1] == b'd'
        && is_die_suffix(&word[2..])
    {
        let mut parts = vec![
            (0, 1, Some(TokenKind::Identifier(word[..1].to_string()))),
            (1, 2, Some(TokenKind::D)),
        ];
        parts.extend(die_type(&word[2..], 2));
        return parts;
    }
    if bytes.len() >= 2 && bytes[0] == b'd' && is_die_suffix(&word[1..]) {
        let mut parts = vec![(0, 1, Some(TokenKind::D))];
        parts.extend(die_type(&word[1..], 1));
        return parts;
    }
    vec![(0, word.len(), Some(TokenKind::Identifier(word.to_string())))]
}

fn is_die_suffix(rest: &str) -> bool {
    match rest.as_bytes().first() {
        None => true,
        Some(first) if first.is_ascii_uppercase() => true,
        Some(_) => rest.bytes().all(|b| b.is_ascii_digit()),
    }
}

fn die_type(rest: &str, start: usize) -> Option<(usize, usize, Option<TokenKind>)> {
    if rest.is_empty() {
        return None;
    }
    let end = start + rest.len();
    let kind = if rest.bytes().all(|b| b.is_ascii_digit()) {
        rest.parse::<i64>().ok().map(TokenKind::Number)
    } else {
        Some(TokenKind::Identifier(rest.to_string()))
    };
    Some((start, end, kind))
}
