use crate::language::{
    ast::*,
    errors::{SyntaxError, SyntaxErrors},
    lexer::lex,
    span::{Location, Span},
    token::{Token, TokenKind},
};
use crate::runtime::value::{Value, ValueType};
use std::rc::Rc;

/// Parses a whole program: top-level expressions separated by `---`.
pub fn parse_program(source_name: &str, source: &str) -> Result<Vec<Expr>, SyntaxErrors> {
    let source_name: Rc<str> = Rc::from(source_name);
    let tokens = match lex(source) {
        Ok(tokens) => tokens,
        Err(errors) => {
            let errs = errors
                .into_iter()
                .map(|err| {
                    SyntaxError::new(err.message, Location::new(source_name.clone(), err.span))
                })
                .collect();
            return Err(SyntaxErrors::new(errs));
        }
    };
    Parser::new(source_name, tokens).parse()
}

struct Parser {
    source_name: Rc<str>,
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<SyntaxError>,
}

impl Parser {
    fn new(source_name: Rc<str>, tokens: Vec<Token>) -> Self {
        Self {
            source_name,
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Vec<Expr>, SyntaxErrors> {
        let mut program = Vec::new();

        while !self.is_eof() {
            if self.matches(TokenKind::Separator) {
                continue;
            }
            match self.parse_statement() {
                Ok(expr) => program.push(expr),
                Err(err) => {
                    self.report(err);
                    self.synchronize();
                }
            }
        }

        if self.errors.is_empty() {
            Ok(program)
        } else {
            Err(SyntaxErrors::new(self.errors))
        }
    }

    fn parse_statement(&mut self) -> Result<Expr, SyntaxError> {
        let expr = self.parse_sequence()?;
        if !self.is_eof() && !self.check(TokenKind::Separator) {
            return Err(self
                .error_here("Unexpected token after expression")
                .with_help("separate expressions with `;` or `---`"));
        }
        Ok(expr)
    }

    fn parse_sequence(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_output()?;
        while self.matches(TokenKind::Semi) {
            if self.ends_sequence() {
                break;
            }
            let right = self.parse_output()?;
            let location = left.location.to(&right.location);
            left = Expr::new(
                ExprKind::Sequence(Box::new(left), Box::new(right)),
                location,
            );
        }
        Ok(left)
    }

    fn ends_sequence(&self) -> bool {
        matches!(
            self.peek_kind(),
            None | Some(
                TokenKind::Eof
                    | TokenKind::Separator
                    | TokenKind::RParen
                    | TokenKind::RBracket
                    | TokenKind::RBrace
                    | TokenKind::Comma
            )
        )
    }

    fn parse_output(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.current_span();
        let mode = if self.matches(TokenKind::Roll) {
            Some(OutputMode::Roll)
        } else if self.matches(TokenKind::Sample) {
            Some(OutputMode::Sample)
        } else {
            None
        };

        if let Some(mode) = mode {
            let expression = self.parse_assign()?;
            let ty = if self.matches(TokenKind::As) {
                Some(self.parse_output_type()?)
            } else {
                None
            };
            let name = match self.peek_kind() {
                Some(TokenKind::String(_)) => Some(self.parse_primary()?),
                _ => None,
            };
            let output = Output {
                mode,
                expression: Rc::new(expression),
                ty,
                name,
            };
            return Ok(Expr::new(
                ExprKind::Output(Box::new(output)),
                self.location_from(start),
            ));
        }

        if self.matches(TokenKind::Import) {
            let namespace = match (self.peek_kind(), self.peek_kind_n(1)) {
                (Some(TokenKind::Identifier(name)), Some(TokenKind::Eq)) => {
                    self.advance();
                    self.advance();
                    Some(name)
                }
                _ => None,
            };
            let address = self.parse_assign()?;
            return Ok(Expr::new(
                ExprKind::Import {
                    address: Box::new(address),
                    namespace,
                },
                self.location_from(start),
            ));
        }

        self.parse_assign()
    }

    fn parse_output_type(&mut self) -> Result<OutputType, SyntaxError> {
        let ty = match self.peek_kind() {
            Some(TokenKind::Undef) => OutputType::Type(ValueType::Undefined),
            Some(TokenKind::StringKw) => OutputType::Type(ValueType::String),
            Some(TokenKind::BooleanKw) => OutputType::Type(ValueType::Boolean),
            Some(TokenKind::NumberKw) => OutputType::Type(ValueType::Number),
            Some(TokenKind::ListKw) => OutputType::Type(ValueType::List),
            Some(TokenKind::MapKw) => OutputType::Type(ValueType::Map),
            Some(TokenKind::Fun) => OutputType::Type(ValueType::Function),
            Some(TokenKind::Identifier(name)) if name == "native" => OutputType::Native,
            _ => {
                return Err(self
                    .error_here("Expected a type after `as`")
                    .with_help("one of undef, string, boolean, number, list, map, fun, native"))
            }
        };
        self.advance();
        Ok(ty)
    }

    fn parse_assign(&mut self) -> Result<Expr, SyntaxError> {
        let target = self.parse_control()?;
        if self.matches(TokenKind::Eq) {
            let value = self.parse_control()?;
            let location = target.location.to(&value.location);
            return Ok(Expr::new(
                ExprKind::Assign {
                    target: Box::new(target),
                    value: Box::new(value),
                },
                location,
            ));
        }
        Ok(target)
    }

    fn parse_control(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.current_span();

        if self.matches(TokenKind::If) {
            let condition = self.parse_or()?;
            self.expect(TokenKind::Then)?;
            let then = self.parse_or()?;
            self.expect(TokenKind::Else)?;
            let otherwise = self.parse_control()?;
            return Ok(Expr::new(
                ExprKind::Conditional {
                    condition: Box::new(condition),
                    then: Box::new(then),
                    otherwise: Box::new(otherwise),
                },
                self.location_from(start),
            ));
        }

        if self.matches(TokenKind::While) {
            let condition = self.parse_or()?;
            self.expect(TokenKind::Repeat)?;
            let body = self.parse_or()?;
            let limit = self.parse_limit()?;
            let repeat = Repeat {
                form: RepeatForm::PreTest,
                body,
                condition,
                limit,
            };
            return Ok(Expr::new(
                ExprKind::Repeat(Box::new(repeat)),
                self.location_from(start),
            ));
        }

        if self.matches(TokenKind::Repeat) {
            let body = self.parse_or()?;
            let repeat = if self.matches(TokenKind::While) {
                let condition = self.parse_or()?;
                let limit = self.parse_limit()?;
                Repeat {
                    form: RepeatForm::PostTest,
                    body,
                    condition,
                    limit,
                }
            } else if self.matches(TokenKind::If) {
                let condition = self.parse_or()?;
                let limit = Some(Expr::constant(
                    Value::Number(1),
                    self.location_from(start),
                ));
                Repeat {
                    form: RepeatForm::Once,
                    body,
                    condition,
                    limit,
                }
            } else {
                return Err(self
                    .error_here("Expected `while` or `if` after repeated expression")
                    .with_help("write `repeat E while C` or `repeat E if C`"));
            };
            return Ok(Expr::new(
                ExprKind::Repeat(Box::new(repeat)),
                self.location_from(start),
            ));
        }

        if self.matches(TokenKind::For) {
            return self.parse_for_tail(start, None);
        }

        let expr = self.parse_or()?;
        if self.matches(TokenKind::For) {
            let start = expr.location.span;
            return self.parse_for_tail(start, Some(expr));
        }
        Ok(expr)
    }

    fn parse_limit(&mut self) -> Result<Option<Expr>, SyntaxError> {
        if self.matches(TokenKind::Limit) {
            Ok(Some(self.parse_or()?))
        } else {
            Ok(None)
        }
    }

    fn parse_for_tail(&mut self, start: Span, out: Option<Expr>) -> Result<Expr, SyntaxError> {
        let (first, first_span) = self.expect_identifier("Expected loop variable after `for`")?;
        let (index, item, item_span) = if self.matches(TokenKind::Comma) {
            let (item, item_span) = self.expect_identifier("Expected item variable after `,`")?;
            (Some(first), item, item_span)
        } else {
            (None, first, first_span)
        };
        self.expect(TokenKind::In)?;
        let container = self.parse_or()?;
        let condition = if self.matches(TokenKind::If) {
            Some(self.parse_or()?)
        } else {
            None
        };
        let out = match out {
            Some(out) => out,
            None => Expr::new(ExprKind::Variable(item.clone()), self.location(item_span)),
        };
        let for_loop = ForLoop {
            index,
            item,
            out,
            container,
            condition,
        };
        Ok(Expr::new(
            ExprKind::ForLoop(Box::new(for_loop)),
            self.location_from(start),
        ))
    }

    fn parse_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_and()?;
        while self.matches(TokenKind::Or) {
            let right = self.parse_and()?;
            let location = left.location.to(&right.location);
            left = Expr::new(ExprKind::Or(Box::new(left), Box::new(right)), location);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_not()?;
        while self.matches(TokenKind::And) {
            let right = self.parse_not()?;
            let location = left.location.to(&right.location);
            left = Expr::new(ExprKind::And(Box::new(left), Box::new(right)), location);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.current_span();
        if self.matches(TokenKind::Not) {
            let operand = self.parse_not()?;
            return Ok(Expr::new(
                ExprKind::Not(Box::new(operand)),
                self.location_from(start),
            ));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, SyntaxError> {
        let left = self.parse_index_of()?;
        let comparison = match self.peek_kind() {
            Some(TokenKind::EqEq) => Comparison::Number(ComparisonOp::Eq),
            Some(TokenKind::BangEq) => Comparison::Number(ComparisonOp::Ne),
            Some(TokenKind::Lt) => Comparison::Number(ComparisonOp::Lt),
            Some(TokenKind::Gt) => Comparison::Number(ComparisonOp::Gt),
            Some(TokenKind::LtEq) => Comparison::Number(ComparisonOp::Le),
            Some(TokenKind::GtEq) => Comparison::Number(ComparisonOp::Ge),
            Some(TokenKind::EqEqEq) => Comparison::General(EqualityOp::Same),
            Some(TokenKind::BangEqEq) => Comparison::General(EqualityOp::NotSame),
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_index_of()?;
        let location = left.location.to(&right.location);
        let (left, right) = (Box::new(left), Box::new(right));
        let kind = match comparison {
            Comparison::Number(op) => ExprKind::NumberComparison { op, left, right },
            Comparison::General(op) => ExprKind::GeneralComparison { op, left, right },
        };
        Ok(Expr::new(kind, location))
    }

    fn parse_index_of(&mut self) -> Result<Expr, SyntaxError> {
        let element = self.parse_append()?;
        if self.matches(TokenKind::In) {
            let container = self.parse_append()?;
            let location = element.location.to(&container.location);
            return Ok(Expr::new(
                ExprKind::IndexOf {
                    element: Box::new(element),
                    container: Box::new(container),
                },
                location,
            ));
        }
        Ok(element)
    }

    fn parse_append(&mut self) -> Result<Expr, SyntaxError> {
        let target = self.parse_range()?;
        if self.matches(TokenKind::LtLt) {
            let source = self.parse_range()?;
            let location = target.location.to(&source.location);
            return Ok(Expr::new(
                ExprKind::Append {
                    target: Box::new(target),
                    source: Box::new(source),
                },
                location,
            ));
        }
        Ok(target)
    }

    fn parse_range(&mut self) -> Result<Expr, SyntaxError> {
        let begin = self.parse_additive()?;
        if self.matches(TokenKind::DotDot) {
            let end = self.parse_additive()?;
            let location = begin.location.to(&end.location);
            return Ok(Expr::new(
                ExprKind::Range {
                    begin: Box::new(begin),
                    end: Box::new(end),
                },
                location,
            ));
        }
        Ok(begin)
    }

    fn parse_additive(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => ArithmeticOp::Add,
                Some(TokenKind::Minus) => ArithmeticOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = arithmetic(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_sign()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => ArithmeticOp::Mul,
                Some(TokenKind::Slash) => ArithmeticOp::Div,
                Some(TokenKind::Percent) => ArithmeticOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_sign()?;
            left = arithmetic(op, left, right);
        }
        Ok(left)
    }

    fn parse_sign(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.current_span();
        let op = match self.peek_kind() {
            Some(TokenKind::Plus) => SignOp::Plus,
            Some(TokenKind::Minus) => SignOp::Minus,
            _ => return self.parse_best(),
        };
        self.advance();
        let operand = self.parse_best()?;
        Ok(Expr::new(
            ExprKind::Sign {
                op,
                operand: Box::new(operand),
            },
            self.location_from(start),
        ))
    }

    fn parse_best(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.current_span();
        let selector = match self.peek_kind() {
            Some(TokenKind::Highest) => Selector::Highest,
            Some(TokenKind::Lowest) => Selector::Lowest,
            Some(TokenKind::First) => Selector::First,
            Some(TokenKind::Last) => Selector::Last,
            _ => return self.parse_draw(),
        };
        self.advance();
        if self.matches(TokenKind::Of) {
            let operand = self.parse_draw()?;
            return Ok(Expr::new(
                ExprKind::Best {
                    selector,
                    operand: Box::new(operand),
                },
                self.location_from(start),
            ));
        }
        let count = self.parse_or()?;
        self.expect(TokenKind::Of)?;
        let operand = self.parse_draw()?;
        Ok(Expr::new(
            ExprKind::BestMultiple {
                selector,
                count: Box::new(count),
                operand: Box::new(operand),
            },
            self.location_from(start),
        ))
    }

    fn parse_draw(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.current_span();
        if !self.matches(TokenKind::Draw) {
            return self.parse_dice();
        }
        if self.matches(TokenKind::From) {
            let operand = self.parse_dice()?;
            return Ok(Expr::new(
                ExprKind::Draw(Box::new(operand)),
                self.location_from(start),
            ));
        }
        let count = self.parse_dice()?;
        self.expect(TokenKind::From)?;
        let operand = self.parse_dice()?;
        Ok(Expr::new(
            ExprKind::DrawMultiple {
                count: Box::new(count),
                operand: Box::new(operand),
            },
            self.location_from(start),
        ))
    }

    fn parse_dice(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.current_span();
        let mut left = if self.matches(TokenKind::D) {
            let die = self.parse_unary()?;
            Expr::new(ExprKind::Die(Box::new(die)), self.location_from(start))
        } else {
            self.parse_unary()?
        };
        while self.matches(TokenKind::D) {
            let die = self.parse_unary()?;
            let location = left.location.to(&die.location);
            left = Expr::new(
                ExprKind::Dice {
                    count: Box::new(left),
                    die: Box::new(die),
                },
                location,
            );
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.current_span();
        let build: fn(Box<Expr>) -> ExprKind = match self.peek_kind() {
            Some(TokenKind::Count | TokenKind::Hash) => ExprKind::Count,
            Some(TokenKind::StringKw) => |operand| convert(ValueType::String, operand),
            Some(TokenKind::BooleanKw) => |operand| convert(ValueType::Boolean, operand),
            Some(TokenKind::NumberKw) => |operand| convert(ValueType::Number, operand),
            Some(TokenKind::ListKw) => |operand| convert(ValueType::List, operand),
            Some(TokenKind::MapKw) => |operand| convert(ValueType::Map, operand),
            Some(TokenKind::Sorted) => |operand| reorder(ReorderOp::Sort, operand),
            Some(TokenKind::Reversed) => |operand| reorder(ReorderOp::Reverse, operand),
            Some(TokenKind::Shuffled) => |operand| reorder(ReorderOp::Shuffle, operand),
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expr::new(build(Box::new(operand)), self.location_from(start)))
    }

    fn parse_postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.matches(TokenKind::LParen) {
                let (positional, named) = self.parse_arguments()?;
                let end = self.expect(TokenKind::RParen)?.span;
                let location = Location::new(self.source_name.clone(), expr.location.span.union(end));
                expr = Expr::new(
                    ExprKind::Call {
                        callee: Box::new(expr),
                        positional,
                        named,
                    },
                    location,
                );
                continue;
            }
            if self.matches(TokenKind::LBracket) {
                let subscript = self.parse_sequence()?;
                let end = self.expect(TokenKind::RBracket)?.span;
                let location = Location::new(self.source_name.clone(), expr.location.span.union(end));
                expr = Expr::new(
                    ExprKind::Subscript {
                        container: Box::new(expr),
                        subscript: Box::new(subscript),
                    },
                    location,
                );
                continue;
            }
            if self.matches(TokenKind::Dot) {
                let (name, span) = self.expect_identifier("Expected entry name after `.`")?;
                let subscript = Expr::constant(Value::String(name), self.location(span));
                let location = expr.location.to(&subscript.location);
                expr = Expr::new(
                    ExprKind::Subscript {
                        container: Box::new(expr),
                        subscript: Box::new(subscript),
                    },
                    location,
                );
                continue;
            }
            break;
        }
        Ok(expr)
    }

    fn parse_arguments(&mut self) -> Result<(Vec<Expr>, Vec<(String, Expr)>), SyntaxError> {
        let mut positional = Vec::new();
        let mut named = Vec::new();
        if self.check(TokenKind::RParen) {
            return Ok((positional, named));
        }
        loop {
            if let (Some(TokenKind::Identifier(name)), Some(TokenKind::Colon)) =
                (self.peek_kind(), self.peek_kind_n(1))
            {
                self.advance();
                self.advance();
                named.push((name, self.parse_sequence()?));
            } else if !named.is_empty() {
                return Err(self
                    .error_here("Positional argument after named argument")
                    .with_help("pass positional arguments first"));
            } else {
                positional.push(self.parse_sequence()?);
            }
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        Ok((positional, named))
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.current_span();
        let Some(kind) = self.peek_kind() else {
            return Err(self.error_here("Expected an expression"));
        };
        match kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::constant(Value::Number(n), self.location(start)))
            }
            TokenKind::String(fragments) => {
                self.advance();
                Ok(string_literal(fragments, self.location(start)))
            }
            TokenKind::Undef => {
                self.advance();
                Ok(Expr::constant(Value::Undefined, self.location(start)))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::constant(Value::Boolean(true), self.location(start)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::constant(Value::Boolean(false), self.location(start)))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expr::new(ExprKind::Variable(name), self.location(start)))
            }
            TokenKind::Local | TokenKind::Outer | TokenKind::Global => {
                self.advance();
                let selector = match kind {
                    TokenKind::Local => ScopeSelector::Local,
                    TokenKind::Outer => ScopeSelector::Outer,
                    _ => ScopeSelector::Global,
                };
                Ok(Expr::new(
                    ExprKind::ScopeVariables(selector),
                    self.location(start),
                ))
            }
            TokenKind::LBracket => self.parse_list(),
            TokenKind::LBrace => self.parse_map(),
            TokenKind::Fun => self.parse_lambda(),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_sequence()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            _ => Err(self.error_here("Expected an expression")),
        }
    }

    fn parse_list(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.expect(TokenKind::LBracket)?.span;
        let mut items = Vec::new();
        while !self.check(TokenKind::RBracket) && !self.is_eof() {
            items.push(self.parse_sequence()?);
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(Expr::new(ExprKind::List(items), self.location_from(start)))
    }

    fn parse_map(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.expect(TokenKind::LBrace)?.span;
        let mut entries = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_eof() {
            let key = match self.peek_kind() {
                Some(TokenKind::Identifier(name)) => name,
                Some(TokenKind::String(fragments)) => match plain_text(&fragments) {
                    Some(text) => text,
                    None => return Err(self.error_here("Map keys cannot be interpolated")),
                },
                _ => {
                    return Err(self
                        .error_here("Expected entry name")
                        .with_help("map entries are written `name: expression`"))
                }
            };
            self.advance();
            self.expect(TokenKind::Colon)?;
            entries.push((key, self.parse_sequence()?));
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Expr::new(ExprKind::Map(entries), self.location_from(start)))
    }

    fn parse_lambda(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.expect(TokenKind::Fun)?.span;
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.check(TokenKind::RParen) && !self.is_eof() {
            let (name, _) = self.expect_identifier("Expected parameter name")?;
            let default = if self.matches(TokenKind::Colon) {
                Some(self.parse_sequence()?)
            } else {
                None
            };
            params.push(Param { name, default });
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        let open = self.expect(TokenKind::LBrace)?.span;
        let body = if self.check(TokenKind::RBrace) {
            Expr::constant(Value::Undefined, self.location(open))
        } else {
            self.parse_sequence()?
        };
        self.expect(TokenKind::RBrace)?;
        Ok(Expr::new(
            ExprKind::Lambda(Rc::new(Lambda { params, body })),
            self.location_from(start),
        ))
    }

    fn expect_identifier(&mut self, msg: &str) -> Result<(String, Span), SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Identifier(name)) => {
                let span = self.advance().span;
                Ok((name, span))
            }
            _ => Err(self.error_here(msg)),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token, SyntaxError> {
        if self.check(kind.clone()) {
            Ok(self.advance())
        } else {
            Err(self.error_here(&format!("Expected {}", describe(&kind))))
        }
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        matches!(self.peek_kind(), Some(tk) if tk == kind)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|t| t.kind.clone())
    }

    fn peek_kind_n(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + n).map(|t| t.kind.clone())
    }

    fn advance(&mut self) -> &Token {
        let index = self.pos.min(self.tokens.len().saturating_sub(1));
        self.pos = (self.pos + 1).min(self.tokens.len());
        &self.tokens[index]
    }

    fn is_eof(&self) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Eof) | None)
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.span)
            .unwrap_or_default()
    }

    fn previous_span(&self) -> Option<Span> {
        if self.pos == 0 {
            None
        } else {
            self.tokens.get(self.pos - 1).map(|t| t.span)
        }
    }

    fn location(&self, span: Span) -> Location {
        Location::new(self.source_name.clone(), span)
    }

    fn location_from(&self, start: Span) -> Location {
        let span = match self.previous_span() {
            Some(previous) => start.union(previous),
            None => start,
        };
        self.location(span)
    }

    fn error_here(&self, message: &str) -> SyntaxError {
        SyntaxError::new(message.to_string(), self.location(self.current_span()))
    }

    fn report(&mut self, err: SyntaxError) {
        self.errors.push(err);
    }

    fn synchronize(&mut self) {
        while !self.is_eof() && !self.check(TokenKind::Separator) {
            self.advance();
        }
    }
}

enum Comparison {
    Number(ComparisonOp),
    General(EqualityOp),
}

fn arithmetic(op: ArithmeticOp, left: Expr, right: Expr) -> Expr {
    let location = left.location.to(&right.location);
    Expr::new(
        ExprKind::Arithmetic {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        location,
    )
}

fn convert(ty: ValueType, operand: Box<Expr>) -> ExprKind {
    ExprKind::Convert { ty, operand }
}

fn reorder(op: ReorderOp, operand: Box<Expr>) -> ExprKind {
    ExprKind::Reorder { op, operand }
}

fn plain_text(fragments: &[Fragment]) -> Option<String> {
    let mut text = String::new();
    for fragment in fragments {
        match fragment {
            Fragment::Text(part) => text.push_str(part),
            Fragment::Variable(_) => return None,
        }
    }
    Some(text)
}

fn string_literal(fragments: Vec<Fragment>, location: Location) -> Expr {
    match plain_text(&fragments) {
        Some(text) => Expr::constant(Value::String(text), location),
        None => Expr::new(ExprKind::Interpolation(fragments), location),
    }
}

fn describe(kind: &TokenKind) -> String {
    let text = match kind {
        TokenKind::Then => "then",
        TokenKind::Else => "else",
        TokenKind::Repeat => "repeat",
        TokenKind::In => "in",
        TokenKind::Of => "of",
        TokenKind::From => "from",
        TokenKind::Fun => "fun",
        TokenKind::LParen => "(",
        TokenKind::RParen => ")",
        TokenKind::LBracket => "[",
        TokenKind::RBracket => "]",
        TokenKind::LBrace => "{",
        TokenKind::RBrace => "}",
        TokenKind::Colon => ":",
        other => return format!("{:?}", other),
    };
    format!("`{}`", text)
}
