use crate::language::{
    ast::*,
    lexer::is_identifier,
    token::is_keyword,
};
use crate::runtime::value::{Function, Value};

/// Renders an expression as source text with as few parentheses as the grammar allows.
pub fn to_source(expr: &Expr) -> String {
    let mut stringer = ExpressionStringer::new();
    stringer.expression(expr, Precedence::Sequence);
    stringer.finish()
}

/// Renders a value as the source text of an expression producing it.
pub fn value_source(value: &Value) -> String {
    let mut stringer = ExpressionStringer::new();
    stringer.value(value);
    stringer.finish()
}

/// Resolves variable names while rendering output labels.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<Value>;

pub struct ExpressionStringer<'a> {
    out: String,
    lookup: Option<Lookup<'a>>,
    /// Containers currently being rendered.
    open: Vec<usize>,
}

impl Default for ExpressionStringer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ExpressionStringer<'a> {
    pub fn new() -> Self {
        Self {
            out: String::new(),
            lookup: None,
            open: Vec::new(),
        }
    }

    /// Variables bound to scalars are rendered as their current value.
    pub fn with_lookup(lookup: Lookup<'a>) -> Self {
        Self {
            out: String::new(),
            lookup: Some(lookup),
            open: Vec::new(),
        }
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn push(&mut self, text: &str) -> &mut Self {
        self.out.push_str(text);
        self
    }

    fn space(&mut self) -> &mut Self {
        self.push(" ")
    }

    fn render(&self, expr: &Expr, precedence: Precedence) -> String {
        let mut nested = ExpressionStringer {
            out: String::new(),
            lookup: self.lookup,
            open: self.open.clone(),
        };
        nested.expression(expr, precedence);
        nested.out
    }

    pub fn expression(&mut self, expr: &Expr, precedence: Precedence) -> &mut Self {
        if expr.precedence() < precedence {
            self.push("(");
            self.node(expr);
            self.push(")")
        } else {
            self.node(expr);
            self
        }
    }

    fn binary(&mut self, left: &Expr, symbol: &str, right: &Expr, operands: Precedence) {
        self.expression(left, operands)
            .space()
            .push(symbol)
            .space()
            .expression(right, operands);
    }

    fn left_assoc(&mut self, left: &Expr, symbol: &str, right: &Expr, own: Precedence, next: Precedence) {
        self.expression(left, own)
            .space()
            .push(symbol)
            .space()
            .expression(right, next);
    }

    fn node(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Constant(value) => {
                self.value(value);
            }
            ExprKind::Interpolation(fragments) => self.interpolation(fragments),
            ExprKind::List(items) => {
                self.push("[");
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        self.push(", ");
                    }
                    self.expression(item, Precedence::Sequence);
                }
                self.push("]");
            }
            ExprKind::Map(entries) => {
                self.push("{");
                for (index, (key, value)) in entries.iter().enumerate() {
                    if index > 0 {
                        self.push(", ");
                    }
                    self.key(key).push(": ").expression(value, Precedence::Sequence);
                }
                self.push("}");
            }
            ExprKind::Lambda(lambda) => self.lambda(lambda),
            ExprKind::Arithmetic { op, left, right } => {
                let (own, next) = match op.precedence() {
                    Precedence::Plus => (Precedence::Plus, Precedence::Mult),
                    _ => (Precedence::Mult, Precedence::Sign),
                };
                self.left_assoc(left, op.symbol(), right, own, next);
            }
            ExprKind::Sign { op, operand } => {
                self.push(op.symbol()).expression(operand, Precedence::Best);
            }
            ExprKind::NumberComparison { op, left, right } => {
                self.binary(left, op.symbol(), right, Precedence::IndexOf);
            }
            ExprKind::GeneralComparison { op, left, right } => {
                self.binary(left, op.symbol(), right, Precedence::IndexOf);
            }
            ExprKind::And(left, right) => {
                self.left_assoc(left, "and", right, Precedence::And, Precedence::Not);
            }
            ExprKind::Or(left, right) => {
                self.left_assoc(left, "or", right, Precedence::Or, Precedence::And);
            }
            ExprKind::Not(operand) => {
                self.push("not ").expression(operand, Precedence::Not);
            }
            ExprKind::Append { target, source } => {
                self.binary(target, "<<", source, Precedence::Range);
            }
            ExprKind::Best { selector, operand } => {
                self.push(selector.keyword())
                    .push(" of ")
                    .expression(operand, Precedence::Draw);
            }
            ExprKind::BestMultiple {
                selector,
                count,
                operand,
            } => {
                self.push(selector.keyword())
                    .space()
                    .expression(count, Precedence::Or)
                    .push(" of ")
                    .expression(operand, Precedence::Draw);
            }
            ExprKind::Draw(operand) => {
                self.push("draw from ").expression(operand, Precedence::Dice);
            }
            ExprKind::DrawMultiple { count, operand } => {
                self.push("draw ")
                    .expression(count, Precedence::Dice)
                    .push(" from ")
                    .expression(operand, Precedence::Dice);
            }
            ExprKind::Die(die) => {
                let die = self.render(die, Precedence::Unary);
                self.push("d");
                if needs_space_before_die(&die) {
                    self.space();
                }
                self.push(&die);
            }
            ExprKind::Dice { count, die } => {
                let count = self.render(count, Precedence::Unary);
                let die = self.render(die, Precedence::Unary);
                self.push(&count);
                if needs_space_after_count(&count) {
                    self.space();
                }
                self.push("d");
                if needs_space_before_die(&die) {
                    self.space();
                }
                self.push(&die);
            }
            ExprKind::Count(operand) => {
                self.push("count ").expression(operand, Precedence::Unary);
            }
            ExprKind::Convert { ty, operand } => {
                self.push(ty.keyword()).space().expression(operand, Precedence::Unary);
            }
            ExprKind::IndexOf { element, container } => {
                self.binary(element, "in", container, Precedence::Append);
            }
            ExprKind::Reorder { op, operand } => {
                self.push(op.keyword()).space().expression(operand, Precedence::Unary);
            }
            ExprKind::Range { begin, end } => {
                self.binary(begin, "..", end, Precedence::Plus);
            }
            ExprKind::ForLoop(for_loop) => self.for_loop(for_loop),
            ExprKind::Repeat(repeat) => self.repeat(repeat),
            ExprKind::Conditional {
                condition,
                then,
                otherwise,
            } => {
                self.push("if ")
                    .expression(condition, Precedence::Or)
                    .push(" then ")
                    .expression(then, Precedence::Or)
                    .push(" else ")
                    .expression(otherwise, Precedence::Control);
            }
            ExprKind::Assign { target, value } => {
                self.binary(target, "=", value, Precedence::Control);
            }
            ExprKind::Subscript {
                container,
                subscript,
            } => {
                self.expression(container, Precedence::Subscript);
                match &subscript.kind {
                    ExprKind::Constant(Value::String(name)) if is_plain_name(name) => {
                        self.push(".").push(name);
                    }
                    _ => {
                        self.push("[")
                            .expression(subscript, Precedence::Sequence)
                            .push("]");
                    }
                }
            }
            ExprKind::Call {
                callee,
                positional,
                named,
            } => {
                self.expression(callee, Precedence::Subscript).push("(");
                let mut first = true;
                for argument in positional {
                    if !first {
                        self.push(", ");
                    }
                    first = false;
                    self.expression(argument, Precedence::Sequence);
                }
                for (name, argument) in named {
                    if !first {
                        self.push(", ");
                    }
                    first = false;
                    self.push(name)
                        .push(": ")
                        .expression(argument, Precedence::Sequence);
                }
                self.push(")");
            }
            ExprKind::Sequence(left, right) => {
                self.expression(left, Precedence::Sequence)
                    .push("; ")
                    .expression(right, Precedence::Output);
            }
            ExprKind::ScopeVariables(selector) => {
                self.push(selector.keyword());
            }
            ExprKind::Output(output) => {
                self.push(output.mode.keyword())
                    .space()
                    .expression(&output.expression, Precedence::Assign);
                if let Some(ty) = output.ty {
                    self.push(" as ").push(ty.keyword());
                }
                if let Some(name) = &output.name {
                    self.space().expression(name, Precedence::Atom);
                }
            }
            ExprKind::Import { address, namespace } => {
                self.push("import ");
                if let Some(namespace) = namespace {
                    self.push(namespace).push(" = ");
                }
                self.expression(address, Precedence::Assign);
            }
            ExprKind::Variable(name) => {
                let bound = self.lookup.and_then(|lookup| lookup(name));
                match bound {
                    Some(value) if value.is_scalar() => {
                        self.value(&value);
                    }
                    _ => {
                        self.push(name);
                    }
                }
            }
        }
    }

    fn for_loop(&mut self, for_loop: &ForLoop) {
        let bare = matches!(&for_loop.out.kind, ExprKind::Variable(name) if *name == for_loop.item);
        if !bare {
            self.expression(&for_loop.out, Precedence::Or).space();
        }
        self.push("for ");
        if let Some(index) = &for_loop.index {
            self.push(index).push(", ");
        }
        self.push(&for_loop.item)
            .push(" in ")
            .expression(&for_loop.container, Precedence::Or);
        if let Some(condition) = &for_loop.condition {
            if !matches!(condition.kind, ExprKind::Constant(Value::Boolean(true))) {
                self.push(" if ").expression(condition, Precedence::Or);
            }
        }
    }

    fn repeat(&mut self, repeat: &Repeat) {
        match repeat.form {
            RepeatForm::PreTest => {
                self.push("while ")
                    .expression(&repeat.condition, Precedence::Or)
                    .push(" repeat ")
                    .expression(&repeat.body, Precedence::Or);
            }
            RepeatForm::PostTest => {
                self.push("repeat ")
                    .expression(&repeat.body, Precedence::Or)
                    .push(" while ")
                    .expression(&repeat.condition, Precedence::Or);
            }
            RepeatForm::Once => {
                self.push("repeat ")
                    .expression(&repeat.body, Precedence::Or)
                    .push(" if ")
                    .expression(&repeat.condition, Precedence::Or);
                return;
            }
        }
        if let Some(limit) = &repeat.limit {
            self.push(" limit ").expression(limit, Precedence::Or);
        }
    }

    fn lambda(&mut self, lambda: &Lambda) {
        self.push("fun(");
        for (index, param) in lambda.params.iter().enumerate() {
            if index > 0 {
                self.push(", ");
            }
            self.push(&param.name);
            if let Some(default) = &param.default {
                let undefined = matches!(default.kind, ExprKind::Constant(Value::Undefined));
                if !undefined {
                    self.push(": ").expression(default, Precedence::Sequence);
                }
            }
        }
        self.push(") { ")
            .expression(&lambda.body, Precedence::Sequence)
            .push(" }");
    }

    fn interpolation(&mut self, fragments: &[Fragment]) {
        self.push("\"");
        for fragment in fragments {
            match fragment {
                Fragment::Text(text) => self.escaped(text),
                Fragment::Variable(name) => {
                    self.push("{").push(name).push("}");
                }
            }
        }
        self.push("\"");
    }

    fn key(&mut self, key: &str) -> &mut Self {
        if is_plain_name(key) {
            self.push(key)
        } else {
            self.string(key)
        }
    }

    fn string(&mut self, text: &str) -> &mut Self {
        self.push("\"");
        self.escaped(text);
        self.push("\"")
    }

    fn escaped(&mut self, text: &str) {
        for ch in text.chars() {
            match ch {
                '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '{' => self.out.push_str("\\{"),
                '\n' => self.out.push_str("\\n"),
                '\t' => self.out.push_str("\\t"),
                ch => self.out.push(ch),
            }
        }
    }

    /// A container met again inside itself renders as `undef`.
    pub fn value(&mut self, value: &Value) -> &mut Self {
        if let Some(id) = value.container_id() {
            if self.open.contains(&id) {
                return self.push("undef");
            }
            self.open.push(id);
            self.container(value);
            self.open.pop();
            return self;
        }
        match value {
            Value::Undefined => self.push("undef"),
            Value::Boolean(true) => self.push("true"),
            Value::Boolean(false) => self.push("false"),
            Value::Number(n) => self.push(&n.to_string()),
            Value::String(text) => self.string(text),
            Value::List(_) | Value::Map(_) => self.container(value),
            Value::Function(function) => {
                let Function { lambda, .. } = function.as_ref();
                self.lambda(lambda);
                self
            }
        }
    }

    fn container(&mut self, value: &Value) -> &mut Self {
        match value {
            Value::List(items) => {
                self.push("[");
                for (index, item) in items.borrow().iter().enumerate() {
                    if index > 0 {
                        self.push(", ");
                    }
                    self.value(item);
                }
                self.push("]")
            }
            Value::Map(entries) => {
                self.push("{");
                for (index, (key, item)) in entries.borrow().iter().enumerate() {
                    if index > 0 {
                        self.push(", ");
                    }
                    self.key(key).push(": ");
                    self.value(item);
                }
                self.push("}")
            }
            _ => self,
        }
    }
}

fn is_plain_name(name: &str) -> bool {
    is_identifier(name) && !is_keyword(name) && !looks_like_dice(name)
}

/// Names the lexer would split around a glued `d`, such as `d6` or `Xd`.
fn looks_like_dice(name: &str) -> bool {
    let bytes = name.as_bytes();
    let die_rest = |rest: &str| match rest.as_bytes().first() {
        None => true,
        Some(first) if first.is_ascii_uppercase() => true,
        Some(_) => rest.bytes().all(|b| b.is_ascii_digit()),
    };
    (bytes.len() >= 2 && bytes[0] == b'd' && die_rest(&name[1..]))
        || (bytes.len() >= 2
            && bytes[0].is_ascii_uppercase()
            && bytes[1] == b'd'
            && die_rest(&name[2..]))
}

/// `3d6` and `Nd6` lex as dice, `xd6` would lex as one identifier.
fn needs_space_after_count(count: &str) -> bool {
    let Some(last) = count.chars().last() else {
        return false;
    };
    if !(last.is_ascii_alphanumeric() || last == '_') {
        return false;
    }
    if count.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let single_upper = count.len() == 1 && last.is_ascii_uppercase();
    !single_upper
}

/// `d6`, `dX` and `d[...]` lex as dice, `dx` would lex as one identifier.
fn needs_space_before_die(die: &str) -> bool {
    let Some(first) = die.chars().next() else {
        return false;
    };
    if first.is_ascii_uppercase() {
        return false;
    }
    if first.is_ascii_digit() {
        let digits = die.bytes().take_while(|b| b.is_ascii_digit()).count();
        let rest = &die[digits..];
        return rest
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    }
    first.is_ascii_alphabetic() || first == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::parser::parse_program;

    fn reprint(source: &str) -> String {
        let program = parse_program("test", source).expect("source should parse");
        to_source(&program[0])
    }

    #[test]
    fn dice_stay_compact() {
        assert_eq!(reprint("3 d 6"), "3d6");
        assert_eq!(reprint("d X"), "dX");
        assert_eq!(reprint("N d 8"), "Nd8");
        assert_eq!(reprint("n d 8"), "n d8");
        assert_eq!(reprint("2 d faces"), "2d faces");
        assert_eq!(reprint("d [1, 2, 3]"), "d[1, 2, 3]");
    }

    #[test]
    fn parentheses_follow_precedence() {
        assert_eq!(reprint("(1 + 2) * 3"), "(1 + 2) * 3");
        assert_eq!(reprint("1 + (2 * 3)"), "1 + 2 * 3");
        assert_eq!(reprint("1 - (2 - 3)"), "1 - (2 - 3)");
        assert_eq!(reprint("(1 - 2) - 3"), "1 - 2 - 3");
        assert_eq!(reprint("highest 2 of (3d6)"), "highest 2 of 3d6");
        assert_eq!(reprint("count (d6)"), "count (d6)");
    }

    #[test]
    fn control_forms() {
        assert_eq!(reprint("x for x in [1,2]"), "for x in [1, 2]");
        assert_eq!(
            reprint("x*2 for i,x in L if i>0"),
            "x * 2 for i, x in L if i > 0"
        );
        assert_eq!(reprint("repeat d6 if _ == 1"), "repeat d6 if _ == 1");
        assert_eq!(
            reprint("while x < 3 repeat d6 limit 4"),
            "while x < 3 repeat d6 limit 4"
        );
        assert_eq!(
            reprint("if a then 1 else if b then 2 else 3"),
            "if a then 1 else if b then 2 else 3"
        );
    }

    #[test]
    fn functions_and_containers() {
        assert_eq!(
            reprint("f = fun(x, y: 2) { x * y }"),
            "f = fun(x, y: 2) { x * y }"
        );
        assert_eq!(reprint("{foo: 1, \"a b\": 2}.foo"), "{foo: 1, \"a b\": 2}.foo");
        assert_eq!(reprint("m[\"count\"]"), "m[\"count\"]");
        assert_eq!(reprint("f(1, size: 2)"), "f(1, size: 2)");
    }

    #[test]
    fn outputs_and_imports() {
        assert_eq!(
            reprint("roll 3d6 as list \"hit {x}\""),
            "roll 3d6 as list \"hit {x}\""
        );
        assert_eq!(reprint("import lib = \"x.yadrol\""), "import lib = \"x.yadrol\"");
    }

    #[test]
    fn labels_substitute_scalar_variables() {
        let program = parse_program("test", "n d6 + bonus").unwrap();
        let lookup = |name: &str| match name {
            "n" => Some(Value::Number(3)),
            "bonus" => Some(Value::list(vec![Value::Number(1)])),
            _ => None,
        };
        let mut stringer = ExpressionStringer::with_lookup(&lookup);
        stringer.expression(&program[0], Precedence::Sequence);
        assert_eq!(stringer.finish(), "3d6 + bonus");
    }

    #[test]
    fn values_render_as_source() {
        let value = Value::list(vec![
            Value::Number(-2),
            Value::String("a\"b".into()),
            Value::Boolean(false),
            Value::Undefined,
        ]);
        assert_eq!(value_source(&value), "[-2, \"a\\\"b\", false, undef]");
    }

    #[test]
    fn self_containing_values_render_the_cycle_as_undef() {
        let list = Value::list(vec![Value::Number(1)]);
        let Value::List(items) = &list else {
            unreachable!()
        };
        items.borrow_mut().push(list.clone());
        assert_eq!(value_source(&list), "[1, undef]");
        let shared = Value::list(vec![Value::Number(2)]);
        let pair = Value::list(vec![shared.clone(), shared]);
        assert_eq!(value_source(&pair), "[[2], [2]]");
        items.borrow_mut().clear();
    }
}
