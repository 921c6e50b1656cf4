use crate::language::{
    ast::*,
    parser::parse_program,
    printer::ExpressionStringer,
};
use crate::options::Options;
use crate::runtime::{
    convert::{convert_value, Converter},
    dice::{self, Throw},
    distribution::Distribution,
    environment::{Environment, ScopeId},
    error::{ErrorKind, EvaluationError, RuntimeResult},
    import::{Fetch, ImportCache},
    records::{OutputResult, RecordLogger},
    value::{compare, equal, Function, ListRef, MapRef, Value, ValueType},
};
use indexmap::IndexMap;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// Deepest nesting of evaluations, counting each call as at least two.
pub const MAX_DEPTH: usize = 1_000;

pub struct Interpreter {
    env: Environment,
    depth: usize,
    rng: StdRng,
    records: RecordLogger,
    imports: ImportCache,
    fetcher: Box<dyn Fetch>,
    sample_size: u64,
    default_type: OutputType,
}

impl Interpreter {
    pub fn new(options: &Options, fetcher: Box<dyn Fetch>) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            env: Environment::new(),
            depth: 0,
            rng,
            records: RecordLogger::new(),
            imports: ImportCache::new(),
            fetcher,
            sample_size: options.sample_size,
            default_type: options.default_type,
        }
    }

    pub fn global(&self) -> ScopeId {
        self.env.global()
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn records(&self) -> &RecordLogger {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut RecordLogger {
        &mut self.records
    }

    pub fn imports(&self) -> &ImportCache {
        &self.imports
    }

    /// Evaluates `expr` in `scope`, converting the result when `target` names a type.
    pub fn evaluate(
        &mut self,
        expr: &Expr,
        scope: ScopeId,
        target: Option<ValueType>,
    ) -> RuntimeResult<Value> {
        if self.depth >= MAX_DEPTH {
            return Err(EvaluationError::new(expr, ErrorKind::RecursionLimit(MAX_DEPTH)));
        }
        self.depth += 1;
        let result = self
            .eval_native(expr, scope, target)
            .and_then(|value| self.convert(value, target, scope));
        self.depth -= 1;
        result
    }

    pub fn convert(
        &mut self,
        value: Value,
        target: Option<ValueType>,
        scope: ScopeId,
    ) -> RuntimeResult<Value> {
        match target {
            Some(ty) if value.value_type() != ty => convert_value(
                &value,
                ty,
                &mut InScope {
                    interpreter: self,
                    scope,
                },
            ),
            _ => Ok(value),
        }
    }

    fn eval_native(
        &mut self,
        expr: &Expr,
        scope: ScopeId,
        target: Option<ValueType>,
    ) -> RuntimeResult<Value> {
        match &expr.kind {
            ExprKind::Constant(value) => Ok(value.clone()),
            ExprKind::Variable(name) => Ok(self.env.get(scope, name)),
            ExprKind::Interpolation(fragments) => {
                let mut out = String::new();
                for fragment in fragments {
                    match fragment {
                        Fragment::Text(text) => out.push_str(text),
                        Fragment::Variable(name) => {
                            let value = self.env.get(scope, name);
                            if let Value::String(s) =
                                self.convert(value, Some(ValueType::String), scope)?
                            {
                                out.push_str(&s);
                            }
                        }
                    }
                }
                Ok(Value::String(out))
            }
            ExprKind::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.evaluate(item, scope, None)?);
                }
                Ok(Value::list(values))
            }
            ExprKind::Map(entries) => {
                let mut values = IndexMap::with_capacity(entries.len());
                for (key, entry) in entries {
                    let value = self.evaluate(entry, scope, None)?;
                    values.insert(key.clone(), value);
                }
                Ok(Value::map(values))
            }
            ExprKind::Lambda(lambda) => {
                Ok(Value::Function(Rc::new(Function {
                    scope: self.env.capture(scope),
                    lambda: lambda.clone(),
                    owner: Value::Undefined,
                })))
            }
            ExprKind::Arithmetic { op, left, right } => {
                let lhs = self.number(left, scope)?;
                let rhs = self.number(right, scope)?;
                eval_arithmetic(*op, lhs, rhs)
                    .map(Value::Number)
                    .ok_or_else(|| EvaluationError::new(expr, ErrorKind::DivisionByZero))
            }
            ExprKind::Sign { op, operand } => {
                let n = self.number(operand, scope)?;
                Ok(Value::Number(match op {
                    SignOp::Plus => n,
                    SignOp::Minus => n.wrapping_neg(),
                }))
            }
            ExprKind::NumberComparison { op, left, right } => {
                let lhs = self.number(left, scope)?;
                let rhs = self.number(right, scope)?;
                Ok(Value::Boolean(match op {
                    ComparisonOp::Eq => lhs == rhs,
                    ComparisonOp::Ne => lhs != rhs,
                    ComparisonOp::Lt => lhs < rhs,
                    ComparisonOp::Gt => lhs > rhs,
                    ComparisonOp::Le => lhs <= rhs,
                    ComparisonOp::Ge => lhs >= rhs,
                }))
            }
            ExprKind::GeneralComparison { op, left, right } => {
                let lhs = self.evaluate(left, scope, None)?;
                let rhs = self.evaluate(right, scope, None)?;
                let same = equal(&lhs, &rhs);
                Ok(Value::Boolean(match op {
                    EqualityOp::Same => same,
                    EqualityOp::NotSame => !same,
                }))
            }
            ExprKind::And(left, right) => {
                let result = self.boolean(left, scope)? && self.boolean(right, scope)?;
                Ok(Value::Boolean(result))
            }
            ExprKind::Or(left, right) => {
                let result = self.boolean(left, scope)? || self.boolean(right, scope)?;
                Ok(Value::Boolean(result))
            }
            ExprKind::Not(operand) => Ok(Value::Boolean(!self.boolean(operand, scope)?)),
            ExprKind::Append { target, source } => self.append(expr, target, source, scope),
            ExprKind::Best { selector, operand } => {
                let items = self.list(operand, scope)?;
                let items = items.borrow();
                Ok(dice::best(*selector, &items))
            }
            ExprKind::BestMultiple {
                selector,
                count,
                operand,
            } => {
                let n = self.number(count, scope)?;
                let items = self.list(operand, scope)?;
                let picked = dice::best_multiple(*selector, n, &items.borrow());
                Ok(Value::list(picked))
            }
            ExprKind::Draw(operand) => {
                let items = self.list(operand, scope)?;
                let mut items = items.borrow_mut();
                if items.is_empty() {
                    Ok(Value::Undefined)
                } else {
                    Ok(items.remove(0))
                }
            }
            ExprKind::DrawMultiple { count, operand } => {
                let n = self.number(count, scope)?;
                let items = self.list(operand, scope)?;
                if n <= 0 {
                    return Ok(Value::list(Vec::new()));
                }
                let mut items = items.borrow_mut();
                let n = usize::try_from(n).unwrap_or(usize::MAX).min(items.len());
                Ok(Value::list(items.drain(..n).collect()))
            }
            ExprKind::Die(die) => {
                let die = self.evaluate(die, scope, None)?;
                let face = self.throw(expr, &die)?;
                if !self.records.is_sampling() {
                    self.records.record_dice(die, vec![face.clone()]);
                }
                Ok(face)
            }
            ExprKind::Dice { count, die } => {
                let n = self.number(count, scope)?;
                let die = self.evaluate(die, scope, None)?;
                if let Value::Function(function) = &die {
                    if function.arity() >= 1 {
                        return self.call_function(
                            expr,
                            function,
                            vec![Value::Number(n)],
                            Vec::new(),
                            None,
                        );
                    }
                }
                if n <= 0 {
                    return Err(EvaluationError::new(expr, ErrorKind::DiceNumber(n)));
                }
                let mut faces = Vec::new();
                for _ in 0..n {
                    faces.push(self.throw(expr, &die)?);
                }
                if !self.records.is_sampling() {
                    self.records.record_dice(die, faces.clone());
                }
                Ok(Value::list(faces))
            }
            ExprKind::Count(operand) => match self.evaluate(operand, scope, None)? {
                Value::Undefined => Ok(Value::Number(0)),
                Value::List(items) => Ok(Value::Number(items.borrow().len() as i64)),
                Value::Map(entries) => Ok(Value::Number(entries.borrow().len() as i64)),
                Value::Function(_) => Err(EvaluationError::new(expr, ErrorKind::CountFunction)),
                _ => Ok(Value::Number(1)),
            },
            ExprKind::Convert { ty, operand } => self.evaluate(operand, scope, Some(*ty)),
            ExprKind::IndexOf { element, container } => {
                let element = self.evaluate(element, scope, None)?;
                let container = self.evaluate(container, scope, None)?;
                Ok(index_of(&element, &container))
            }
            ExprKind::Reorder { op, operand } => {
                let items = self.list(operand, scope)?;
                match op {
                    ReorderOp::Sort => {
                        let mut sorted = items.borrow().clone();
                        sorted.sort_by(compare);
                        *items.borrow_mut() = sorted;
                    }
                    ReorderOp::Reverse => items.borrow_mut().reverse(),
                    ReorderOp::Shuffle => items.borrow_mut().shuffle(&mut self.rng),
                }
                Ok(Value::List(items))
            }
            ExprKind::Range { begin, end } => {
                let begin = self.number(begin, scope)?;
                let end = self.number(end, scope)?;
                Ok(Value::list(dice::range(begin, end)))
            }
            ExprKind::ForLoop(for_loop) => self.for_loop(expr, for_loop, scope),
            ExprKind::Repeat(repeat) => self.repeat(repeat, scope),
            ExprKind::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if self.boolean(condition, scope)? {
                    self.evaluate(then, scope, target)
                } else {
                    self.evaluate(otherwise, scope, target)
                }
            }
            ExprKind::Assign { target, value } => {
                let value = self.evaluate(value, scope, None)?;
                self.assign(target, value.clone(), scope)?;
                Ok(value)
            }
            ExprKind::Subscript {
                container,
                subscript,
            } => {
                let container = self.evaluate(container, scope, None)?;
                let subscript = self.evaluate(subscript, scope, None)?;
                subscript_value(expr, &container, &subscript)
            }
            ExprKind::Call {
                callee,
                positional,
                named,
            } => {
                let callee = self.evaluate(callee, scope, Some(ValueType::Function))?;
                let Value::Function(function) = callee else {
                    return Ok(Value::Undefined);
                };
                let mut args = Vec::with_capacity(positional.len());
                for arg in positional {
                    args.push(self.evaluate(arg, scope, None)?);
                }
                let mut named_args = Vec::with_capacity(named.len());
                for (name, arg) in named {
                    named_args.push((name.clone(), self.evaluate(arg, scope, None)?));
                }
                self.call_function(expr, &function, args, named_args, target)
            }
            ExprKind::Sequence(first, second) => {
                self.evaluate(first, scope, None)?;
                self.evaluate(second, scope, target)
            }
            ExprKind::ScopeVariables(selector) => {
                let variables = match selector {
                    ScopeSelector::Local => self.env.variables(scope),
                    ScopeSelector::Outer => match self.env.parent(scope) {
                        Some(parent) => self.env.variables(parent),
                        None => Value::empty_map(),
                    },
                    ScopeSelector::Global => self.env.variables(self.env.root(scope)),
                };
                Ok(Value::Map(variables))
            }
            ExprKind::Output(output) => {
                self.output(expr, output, scope)?;
                Ok(Value::Undefined)
            }
            ExprKind::Import { address, namespace } => {
                self.import(expr, address, namespace.as_deref(), scope)?;
                Ok(Value::Undefined)
            }
        }
    }

    fn number(&mut self, expr: &Expr, scope: ScopeId) -> RuntimeResult<i64> {
        Ok(match self.evaluate(expr, scope, Some(ValueType::Number))? {
            Value::Number(n) => n,
            _ => 0,
        })
    }

    fn boolean(&mut self, expr: &Expr, scope: ScopeId) -> RuntimeResult<bool> {
        Ok(matches!(
            self.evaluate(expr, scope, Some(ValueType::Boolean))?,
            Value::Boolean(true)
        ))
    }

    fn string(&mut self, expr: &Expr, scope: ScopeId) -> RuntimeResult<String> {
        Ok(match self.evaluate(expr, scope, Some(ValueType::String))? {
            Value::String(s) => s,
            _ => String::new(),
        })
    }

    /// The list `expr` evaluates to, or a fresh one holding its conversion.
    fn list(&mut self, expr: &Expr, scope: ScopeId) -> RuntimeResult<ListRef> {
        Ok(match self.evaluate(expr, scope, Some(ValueType::List))? {
            Value::List(items) => items,
            _ => Rc::new(RefCell::new(Vec::new())),
        })
    }

    fn throw(&mut self, site: &Expr, die: &Value) -> RuntimeResult<Value> {
        match dice::throw(&mut self.rng, die) {
            Ok(Throw::Face(face)) => Ok(face),
            Ok(Throw::Call(function)) => {
                self.call_function(site, &function, Vec::new(), Vec::new(), None)
            }
            Err(kind) => Err(EvaluationError::new(site, kind)),
        }
    }

    fn append(
        &mut self,
        site: &Expr,
        target: &Expr,
        source: &Expr,
        scope: ScopeId,
    ) -> RuntimeResult<Value> {
        let container = self.evaluate(target, scope, None)?;
        match &container {
            Value::List(items) => {
                let added = self.list(source, scope)?;
                let added = added.borrow().clone();
                items.borrow_mut().extend(added);
            }
            Value::Map(entries) => {
                let added = self.evaluate(source, scope, Some(ValueType::Map))?;
                if let Value::Map(added) = added {
                    let added: Vec<_> = added
                        .borrow()
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect();
                    entries.borrow_mut().extend(added);
                }
            }
            other => {
                return Err(EvaluationError::new(
                    site,
                    ErrorKind::AppendTarget(other.value_type()),
                ))
            }
        }
        Ok(container)
    }

    /// Calls `function`, binding arguments in a fresh scope under its captured one.
    pub fn call_function(
        &mut self,
        site: &Expr,
        function: &Rc<Function>,
        positional: Vec<Value>,
        named: Vec<(String, Value)>,
        target: Option<ValueType>,
    ) -> RuntimeResult<Value> {
        let lambda = function.lambda.clone();
        let params = &lambda.params;
        if positional.len() > params.len() {
            return Err(EvaluationError::new(
                site,
                ErrorKind::ExtraArgument {
                    expected: params.len(),
                    received: positional.len(),
                },
            ));
        }
        let mut bound: Vec<Option<Value>> = vec![None; params.len()];
        for (slot, value) in bound.iter_mut().zip(positional) {
            *slot = Some(value);
        }
        for (name, value) in named {
            let Some(index) = params.iter().position(|p| p.name == name) else {
                return Err(EvaluationError::new(site, ErrorKind::UnknownArgument(name)));
            };
            if bound[index].is_some() {
                return Err(EvaluationError::new(
                    site,
                    ErrorKind::ArgumentAlreadySet(name),
                ));
            }
            bound[index] = Some(value);
        }

        let mut values = Vec::with_capacity(params.len());
        for (param, slot) in params.iter().zip(bound) {
            let value = match (slot, &param.default) {
                (Some(value), _) => value,
                (None, Some(default)) => self.evaluate(default, function.scope.id(), None)?,
                (None, None) => Value::Undefined,
            };
            values.push(value);
        }

        let mark = self.env.mark();
        let call_scope = self.env.push_scope(Some(function.scope.id()));
        for (param, value) in params.iter().zip(values) {
            self.env.define(call_scope, &param.name, value);
        }
        self.env.define(call_scope, "this", function.owner.clone());
        let result = self.evaluate(&lambda.body, call_scope, target);
        self.env.release(mark);
        result
    }

    fn for_loop(&mut self, site: &Expr, for_loop: &ForLoop, scope: ScopeId) -> RuntimeResult<Value> {
        let mut container = self.evaluate(&for_loop.container, scope, None)?;
        if let Value::Function(_) = container {
            container = self.convert(container, Some(ValueType::List), scope)?;
        }
        let source = match container {
            Value::List(items) => LoopSource::List(items.borrow().clone()),
            Value::Map(entries) => LoopSource::Map(
                entries
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
            other => {
                return Err(EvaluationError::new(
                    site,
                    ErrorKind::LoopContainer(other.value_type()),
                ))
            }
        };

        let mark = self.env.mark();
        let loop_scope = self.env.push_scope(Some(scope));
        let result = self.run_for_loop(for_loop, source, loop_scope);
        self.env.release(mark);
        result
    }

    fn run_for_loop(
        &mut self,
        for_loop: &ForLoop,
        source: LoopSource,
        loop_scope: ScopeId,
    ) -> RuntimeResult<Value> {
        match source {
            LoopSource::List(items) => {
                let mut results = Vec::new();
                for (index, item) in items.into_iter().enumerate() {
                    if let Some(value) =
                        self.loop_step(for_loop, Value::Number(index as i64), item, loop_scope)?
                    {
                        results.push(value);
                    }
                }
                Ok(Value::list(results))
            }
            LoopSource::Map(entries) => {
                let mut results = IndexMap::new();
                for (key, item) in entries {
                    if let Some(value) =
                        self.loop_step(for_loop, Value::String(key.clone()), item, loop_scope)?
                    {
                        results.insert(key, value);
                    }
                }
                Ok(Value::map(results))
            }
        }
    }

    fn loop_step(
        &mut self,
        for_loop: &ForLoop,
        index: Value,
        item: Value,
        loop_scope: ScopeId,
    ) -> RuntimeResult<Option<Value>> {
        self.env.define(loop_scope, &for_loop.item, item);
        if let Some(name) = &for_loop.index {
            self.env.define(loop_scope, name, index);
        }
        if let Some(condition) = &for_loop.condition {
            if !self.boolean(condition, loop_scope)? {
                return Ok(None);
            }
        }
        self.evaluate(&for_loop.out, loop_scope, None).map(Some)
    }

    fn repeat(&mut self, repeat: &Repeat, scope: ScopeId) -> RuntimeResult<Value> {
        let limit = match &repeat.limit {
            Some(limit) => Some(self.number(limit, scope)?),
            None => None,
        };
        let mark = self.env.mark();
        let loop_scope = self.env.push_scope(Some(scope));
        let result = self.run_repeat(repeat, limit, loop_scope);
        self.env.release(mark);
        result.map(Value::list)
    }

    fn run_repeat(
        &mut self,
        repeat: &Repeat,
        limit: Option<i64>,
        loop_scope: ScopeId,
    ) -> RuntimeResult<Vec<Value>> {
        let reached = |results: &Vec<Value>, extra: i64| {
            limit.is_some_and(|limit| results.len() as i64 >= limit.saturating_add(extra))
        };
        let mut results = Vec::new();
        match repeat.form {
            RepeatForm::PreTest => loop {
                if reached(&results, 0) || !self.boolean(&repeat.condition, loop_scope)? {
                    break;
                }
                results.push(self.evaluate(&repeat.body, loop_scope, None)?);
            },
            RepeatForm::PostTest | RepeatForm::Once => loop {
                results.push(self.evaluate(&repeat.body, loop_scope, None)?);
                if reached(&results, 1) || !self.boolean(&repeat.condition, loop_scope)? {
                    break;
                }
            },
        }
        Ok(results)
    }

    fn assign(&mut self, target: &Expr, value: Value, scope: ScopeId) -> RuntimeResult<()> {
        match &target.kind {
            ExprKind::Variable(name) => {
                self.env.set(scope, name, value);
                Ok(())
            }
            ExprKind::Subscript {
                container,
                subscript,
            } => {
                let container = self.evaluate(container, scope, None)?;
                let subscript = self.evaluate(subscript, scope, None)?;
                self.assign_subscript(target, &container, &subscript, value, scope)
            }
            ExprKind::List(targets) => {
                let values = match self.convert(value, Some(ValueType::List), scope)? {
                    Value::List(items) => items.borrow().clone(),
                    _ => Vec::new(),
                };
                for (index, item) in targets.iter().enumerate() {
                    let value = values.get(index).cloned().unwrap_or(Value::Undefined);
                    self.assign(item, value, scope)?;
                }
                Ok(())
            }
            ExprKind::Map(targets) => {
                let values = match self.convert(value, Some(ValueType::Map), scope)? {
                    Value::Map(entries) => entries.borrow().clone(),
                    _ => IndexMap::new(),
                };
                for (key, item) in targets {
                    let value = values.get(key).cloned().unwrap_or(Value::Undefined);
                    self.assign(item, value, scope)?;
                }
                Ok(())
            }
            _ => Err(EvaluationError::new(target, ErrorKind::NotAssignable)),
        }
    }

    fn assign_subscript(
        &mut self,
        site: &Expr,
        container: &Value,
        subscript: &Value,
        value: Value,
        scope: ScopeId,
    ) -> RuntimeResult<()> {
        match (container, subscript) {
            (_, Value::Undefined | Value::Boolean(_) | Value::Function(_)) => Err(
                EvaluationError::new(site, ErrorKind::InvalidSubscript(subscript.value_type())),
            ),
            (Value::List(items), Value::Number(index)) => {
                let mut items = items.borrow_mut();
                let Some(index) = write_index(*index, items.len()) else {
                    return Err(EvaluationError::new(
                        site,
                        ErrorKind::InvalidSubscript(ValueType::Number),
                    ));
                };
                if index >= items.len() {
                    items.resize(index + 1, Value::Undefined);
                }
                items[index] = value;
                Ok(())
            }
            (Value::Map(entries), Value::String(key)) => {
                entries.borrow_mut().insert(key.clone(), value);
                Ok(())
            }
            (Value::List(_) | Value::Map(_), Value::List(subscripts)) => {
                let values = match self.convert(value, Some(ValueType::List), scope)? {
                    Value::List(items) => items.borrow().clone(),
                    _ => Vec::new(),
                };
                let subscripts = subscripts.borrow().clone();
                for (index, sub) in subscripts.iter().enumerate() {
                    let value = values.get(index).cloned().unwrap_or(Value::Undefined);
                    self.assign_subscript(site, container, sub, value, scope)?;
                }
                Ok(())
            }
            (Value::List(_) | Value::Map(_), Value::Map(subscripts)) => {
                let values = match self.convert(value, Some(ValueType::Map), scope)? {
                    Value::Map(entries) => entries.borrow().clone(),
                    _ => IndexMap::new(),
                };
                let subscripts = subscripts.borrow().clone();
                for (key, sub) in &subscripts {
                    let value = values.get(key).cloned().unwrap_or(Value::Undefined);
                    self.assign_subscript(site, container, sub, value, scope)?;
                }
                Ok(())
            }
            _ => Err(EvaluationError::new(
                site,
                ErrorKind::SubscriptContainer {
                    container: container.value_type(),
                    subscript: subscript.value_type(),
                },
            )),
        }
    }

    fn output(&mut self, site: &Expr, output: &Output, scope: ScopeId) -> RuntimeResult<()> {
        let result_type = output.ty.unwrap_or(self.default_type).target();
        let name = match &output.name {
            Some(name) => self.string(name, scope)?,
            None => self.label(&output.expression, scope),
        };
        self.records
            .start(output.mode)
            .map_err(|kind| EvaluationError::new(site, kind))?;
        let result = match output.mode {
            OutputMode::Roll => self
                .evaluate(&output.expression, scope, result_type)
                .map(OutputResult::Value),
            OutputMode::Sample => self
                .sample(&output.expression, scope, result_type)
                .map(OutputResult::Distribution),
        };
        match result {
            Ok(result) => {
                self.records
                    .finish(name, output.expression.clone(), result_type, result);
                Ok(())
            }
            Err(error) => {
                self.records.abandon();
                Err(error)
            }
        }
    }

    fn label(&self, expr: &Expr, scope: ScopeId) -> String {
        let lookup = |name: &str| self.env.lookup(scope, name);
        let mut stringer = ExpressionStringer::with_lookup(&lookup);
        stringer.expression(expr, Precedence::Sequence);
        stringer.finish()
    }

    fn sample(
        &mut self,
        expr: &Expr,
        scope: ScopeId,
        result_type: Option<ValueType>,
    ) -> RuntimeResult<Distribution> {
        let mut distribution = Distribution::new();
        for _ in 0..self.sample_size {
            let value = self.evaluate(expr, scope, result_type)?;
            distribution.incr(value);
        }
        debug!(
            samples = self.sample_size,
            distinct = distribution.counters().len(),
            "sampled {}",
            expr
        );
        Ok(distribution)
    }

    fn import(
        &mut self,
        site: &Expr,
        address: &Expr,
        namespace: Option<&str>,
        scope: ScopeId,
    ) -> RuntimeResult<()> {
        let address = self.string(address, scope)?;
        let bindings = match self.imports.get(&address) {
            Some(bindings) => {
                debug!(address = %address, "import cache hit");
                bindings
            }
            None => self.resolve_import(site, &address)?,
        };
        let destination = match namespace {
            None => self.env.variables(scope),
            Some(name) => match self.env.lookup(scope, name) {
                Some(Value::Map(entries)) => entries,
                _ => {
                    let entries = Value::empty_map();
                    self.env.set(scope, name, Value::Map(entries.clone()));
                    entries
                }
            },
        };
        let imported: Vec<_> = bindings
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        destination.borrow_mut().extend(imported);
        Ok(())
    }

    fn resolve_import(
        &mut self,
        site: &Expr,
        address: &str,
    ) -> RuntimeResult<MapRef> {
        if !self.imports.begin(address) {
            return Err(EvaluationError::new(
                site,
                ErrorKind::CircularImport(address.to_string()),
            ));
        }
        match self.load_import(site, address) {
            Ok(bindings) => {
                self.imports.complete(address, bindings.clone());
                Ok(bindings)
            }
            Err(error) => {
                self.imports.abort(address);
                Err(error)
            }
        }
    }

    fn load_import(
        &mut self,
        site: &Expr,
        address: &str,
    ) -> RuntimeResult<MapRef> {
        let import_error = |reason: String| {
            EvaluationError::new(
                site,
                ErrorKind::Import {
                    address: address.to_string(),
                    reason,
                },
            )
        };
        let source = self
            .fetcher
            .fetch(address)
            .map_err(|e| import_error(e.to_string()))?;
        let program = parse_program(address, &source).map_err(|e| import_error(e.to_string()))?;
        debug!(address, expressions = program.len(), "evaluating import");

        let import_scope = self.env.push_root_scope();
        for expr in &program {
            self.evaluate(expr, import_scope, None)?;
        }
        Ok(self.env.variables(import_scope))
    }
}

enum LoopSource {
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
}

/// Evaluation context for conversions that call or create functions.
struct InScope<'i> {
    interpreter: &'i mut Interpreter,
    scope: ScopeId,
}

impl Converter for InScope<'_> {
    fn call(&mut self, function: &Rc<Function>, ty: ValueType) -> RuntimeResult<Value> {
        let function = function.clone();
        self.interpreter.call_function(
            &function.lambda.body,
            &function,
            Vec::new(),
            Vec::new(),
            Some(ty),
        )
    }

    fn wrap(&mut self, value: &Value) -> Value {
        Value::Function(Rc::new(Function {
            scope: self.interpreter.env.capture(self.scope),
            lambda: Rc::new(Lambda {
                params: Vec::new(),
                body: Expr::from_value(value),
            }),
            owner: Value::Undefined,
        }))
    }
}

/// Wrapping arithmetic with floored division; `None` on a zero divisor.
fn eval_arithmetic(op: ArithmeticOp, lhs: i64, rhs: i64) -> Option<i64> {
    Some(match op {
        ArithmeticOp::Add => lhs.wrapping_add(rhs),
        ArithmeticOp::Sub => lhs.wrapping_sub(rhs),
        ArithmeticOp::Mul => lhs.wrapping_mul(rhs),
        ArithmeticOp::Div => {
            if rhs == 0 {
                return None;
            }
            let quotient = lhs.wrapping_div(rhs);
            if lhs.wrapping_rem(rhs) != 0 && ((lhs < 0) != (rhs < 0)) {
                quotient.wrapping_sub(1)
            } else {
                quotient
            }
        }
        ArithmeticOp::Mod => {
            if rhs == 0 {
                return None;
            }
            let remainder = lhs.wrapping_rem(rhs);
            if remainder != 0 && ((remainder < 0) != (rhs < 0)) {
                remainder.wrapping_add(rhs)
            } else {
                remainder
            }
        }
    })
}

fn index_of(element: &Value, container: &Value) -> Value {
    match container {
        Value::Undefined => Value::Undefined,
        Value::List(items) => items
            .borrow()
            .iter()
            .position(|item| equal(item, element))
            .map_or(Value::Undefined, |i| Value::Number(i as i64)),
        Value::Map(entries) => entries
            .borrow()
            .iter()
            .find(|(_, value)| equal(value, element))
            .map_or(Value::Undefined, |(key, _)| Value::String(key.clone())),
        other => Value::Boolean(equal(other, element)),
    }
}

/// Resolves a possibly negative index; `None` when it lands before the start.
fn read_index(index: i64, len: usize) -> Option<usize> {
    let resolved = if index < 0 {
        (len as i64).checked_add(index)?
    } else {
        index
    };
    usize::try_from(resolved).ok()
}

fn write_index(index: i64, len: usize) -> Option<usize> {
    read_index(index, len)
}

fn subscript_value(site: &Expr, container: &Value, subscript: &Value) -> RuntimeResult<Value> {
    let value = match (container, subscript) {
        (_, Value::Undefined | Value::Boolean(_) | Value::Function(_)) => {
            return Err(EvaluationError::new(
                site,
                ErrorKind::InvalidSubscript(subscript.value_type()),
            ))
        }
        (Value::List(items), Value::Number(index)) => {
            let items = items.borrow();
            read_index(*index, items.len())
                .and_then(|i| items.get(i).cloned())
                .unwrap_or(Value::Undefined)
        }
        (Value::Map(entries), Value::String(key)) => entries
            .borrow()
            .get(key)
            .cloned()
            .unwrap_or(Value::Undefined),
        (Value::List(_) | Value::Map(_), Value::List(subscripts)) => {
            let subscripts = subscripts.borrow().clone();
            let mut values = Vec::with_capacity(subscripts.len());
            for sub in &subscripts {
                values.push(subscript_value(site, container, sub)?);
            }
            Value::list(values)
        }
        (Value::List(_) | Value::Map(_), Value::Map(subscripts)) => {
            let subscripts = subscripts.borrow().clone();
            let mut values = IndexMap::with_capacity(subscripts.len());
            for (key, sub) in &subscripts {
                values.insert(key.clone(), subscript_value(site, container, sub)?);
            }
            Value::map(values)
        }
        _ => {
            return Err(EvaluationError::new(
                site,
                ErrorKind::SubscriptContainer {
                    container: container.value_type(),
                    subscript: subscript.value_type(),
                },
            ))
        }
    };
    Ok(match value {
        Value::Function(function) => {
            Value::Function(Rc::new(function.with_owner(container.clone())))
        }
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::import::MemoryFetcher;

    fn interpreter(fetcher: MemoryFetcher) -> Interpreter {
        let options = Options::default().with_seed(42).with_sample_size(200);
        Interpreter::new(&options, Box::new(fetcher))
    }

    fn eval_in(interpreter: &mut Interpreter, source: &str) -> RuntimeResult<Value> {
        let program = parse_program("test", source).expect("source should parse");
        let global = interpreter.global();
        let mut last = Value::Undefined;
        for expr in &program {
            last = interpreter.evaluate(expr, global, None)?;
        }
        Ok(last)
    }

    fn eval(source: &str) -> Value {
        eval_in(&mut interpreter(MemoryFetcher::new()), source).expect("evaluation should succeed")
    }

    fn eval_err(source: &str) -> ErrorKind {
        eval_in(&mut interpreter(MemoryFetcher::new()), source)
            .expect_err("evaluation should fail")
            .kind
    }

    fn render(source: &str) -> String {
        eval(source).to_string()
    }

    #[test]
    fn arithmetic_floors_and_wraps() {
        assert_eq!(render("7 + 35"), "42");
        assert_eq!(render("-7 / 2"), "-4");
        assert_eq!(render("-7 % 3"), "2");
        assert_eq!(render("7 % -3"), "-2");
        assert_eq!(render("\"12\" * true"), "12");
        assert_eq!(eval_err("1 / 0"), ErrorKind::DivisionByZero);
        assert_eq!(eval_err("1 % (2 - 2)"), ErrorKind::DivisionByZero);
    }

    #[test]
    fn comparisons_and_logic() {
        assert_eq!(render("[1, 2] == 3"), "true");
        assert_eq!(render("[1, 2] === [1, 2]"), "true");
        assert_eq!(render("\"1\" !== 1"), "true");
        assert_eq!(render("0 and (1 / 0)"), "false");
        assert_eq!(render("1 or (1 / 0)"), "true");
        assert_eq!(render("not []"), "true");
    }

    #[test]
    fn interpolation_reads_variables_as_strings() {
        assert_eq!(
            render("n = 3; ok = true; \"{n} hits, {ok}, [{missing}]\""),
            "\"3 hits, true, []\""
        );
    }

    #[test]
    fn selection_from_lists() {
        assert_eq!(render("highest 2 of [17, 1, 42, 33]"), "[42, 33]");
        assert_eq!(render("lowest of [3, 1, 2]"), "1");
        assert_eq!(render("first of []"), "undef");
        assert_eq!(render("last 2 of 5"), "[5]");
    }

    #[test]
    fn draws_consume_the_shared_list() {
        assert_eq!(render("x = [1, 2, 3]; draw from x; x"), "[2, 3]");
        assert_eq!(render("x = [1, 2, 3]; draw 2 from x"), "[1, 2]");
        assert_eq!(render("x = [1]; draw 5 from x; x"), "[]");
        assert_eq!(render("draw from []"), "undef");
        assert_eq!(render("draw 0 from [1]"), "[]");
    }

    #[test]
    fn ranges_and_appends() {
        assert_eq!(render("0 .. 4"), "[0, 1, 2, 3]");
        assert_eq!(render("3 .. 0"), "[3, 2, 1]");
        assert_eq!(render("0 .. 4 << 4 .. 6"), "[0, 1, 2, 3, 4, 5]");
        assert_eq!(render("m = {a: 1}; m << {b: 2}; m"), "{a: 1, b: 2}");
        assert_eq!(eval_err("3 << 4"), ErrorKind::AppendTarget(ValueType::Number));
    }

    #[test]
    fn dice_roll_within_bounds_and_log_throws() {
        let mut interpreter = interpreter(MemoryFetcher::new());
        let Value::List(faces) = eval_in(&mut interpreter, "3d6").expect("dice roll") else {
            panic!("dice yield a list");
        };
        assert_eq!(faces.borrow().len(), 3);
        for face in faces.borrow().iter() {
            let Value::Number(n) = face else {
                panic!("number faces");
            };
            assert!((1..=6).contains(n));
        }
        assert_eq!(interpreter.records().dice_records().len(), 1);
        assert_eq!(interpreter.records().dice_records()[0].results.len(), 3);
    }

    #[test]
    fn dice_errors() {
        assert_eq!(eval_err("0 d6"), ErrorKind::DiceNumber(0));
        assert_eq!(eval_err("d true"), ErrorKind::Unrollable(ValueType::Boolean));
        assert_eq!(render("d 0"), "undef");
        assert_eq!(render("d []"), "undef");
        assert_eq!(render("d [7]"), "7");
        assert_eq!(render("d {a: 1}"), "{a: 1}");
    }

    #[test]
    fn function_dice() {
        assert_eq!(render("f = fun() { 5 }; 2 d f"), "[5, 5]");
        assert_eq!(render("f = fun(n) { n * 10 }; 3 d f"), "30");
        assert_eq!(render("f = fun(n) { n * 10 }; d f"), "0");
    }

    #[test]
    fn count_and_index_of() {
        assert_eq!(render("count [1, 2, 3]"), "3");
        assert_eq!(render("#{a: 1}"), "1");
        assert_eq!(render("count undef"), "0");
        assert_eq!(render("count \"abc\""), "1");
        assert_eq!(eval_err("count fun() { 1 }"), ErrorKind::CountFunction);
        assert_eq!(render("2 in [1, 2, 2]"), "1");
        assert_eq!(render("2 in {a: 1, b: 2}"), "\"b\"");
        assert_eq!(render("3 in [1]"), "undef");
        assert_eq!(render("3 in undef"), "undef");
        assert_eq!(render("3 in 3"), "true");
    }

    #[test]
    fn reorders_mutate_in_place() {
        assert_eq!(render("x = [3, 1, 2]; sorted x; x"), "[1, 2, 3]");
        assert_eq!(render("reversed [1, 2, 3]"), "[3, 2, 1]");
        assert_eq!(render("sorted shuffled (0 .. 10)"), render("0 .. 10"));
    }

    #[test]
    fn for_loops_keep_the_source_shape() {
        assert_eq!(render("x * 2 for x in [1, 2, 3]"), "[2, 4, 6]");
        assert_eq!(render("for x in [1, 2, 3, 4] if x % 2 == 0"), "[2, 4]");
        assert_eq!(render("v + 1 for k, v in {a: 1, b: 2}"), "{a: 2, b: 3}");
        assert_eq!(render("i for i, v in [5, 6]"), "[0, 1]");
        assert_eq!(eval_err("for x in 3"), ErrorKind::LoopContainer(ValueType::Number));
        assert_eq!(
            eval_err("for x in undef"),
            ErrorKind::LoopContainer(ValueType::Undefined)
        );
        assert_eq!(render("for x in (list undef)"), "[]");
    }

    #[test]
    fn repeat_limits() {
        assert_eq!(render("count (while true repeat 1 limit 3)"), "3");
        assert_eq!(render("count (repeat 1 while true limit 3)"), "4");
        assert_eq!(render("count (repeat 1 if true)"), "2");
        assert_eq!(render("repeat 1 if false"), "[1]");
        assert_eq!(render("while false repeat 1"), "[]");
        assert_eq!(render("n = 0; while n < 3 repeat (n = n + 1)"), "[1, 2, 3]");
    }

    #[test]
    fn conditionals_only_evaluate_the_taken_branch() {
        assert_eq!(render("if 1 then 2 else 1 / 0"), "2");
        assert_eq!(render("if \"\" then 2 else 3"), "3");
    }

    #[test]
    fn assignments_and_destructuring() {
        assert_eq!(render("x = {foo: true, bar: 42}; x[\"bar\"]"), "42");
        assert_eq!(render("[a, b, c] = [1, 2]; [b, a, c]"), "[2, 1, undef]");
        assert_eq!(render("{x: a, y: b} = {y: 4, x: 3}; a - b"), "-1");
        assert_eq!(render("l = [1]; l[3] = 4; l"), "[1, undef, undef, 4]");
        assert_eq!(render("l = [1, 2]; l[-1] = 9; l"), "[1, 9]");
        assert_eq!(render("m = {}; m.a = 1; m[[\"b\", \"c\"]] = [2, 3]; m"), "{a: 1, b: 2, c: 3}");
        assert_eq!(eval_err("1 = 2"), ErrorKind::NotAssignable);
    }

    #[test]
    fn subscripts() {
        assert_eq!(render("[1, 2, 3][-1]"), "3");
        assert_eq!(render("[1, 2, 3][7]"), "undef");
        assert_eq!(render("[1, 2, 3][[0, 2]]"), "[1, 3]");
        assert_eq!(render("{a: 1, b: 2}[{x: \"b\"}]"), "{x: 2}");
        assert_eq!(render("{a: 1}.b"), "undef");
        assert_eq!(eval_err("[1][true]"), ErrorKind::InvalidSubscript(ValueType::Boolean));
        assert_eq!(
            eval_err("[1][\"a\"]"),
            ErrorKind::SubscriptContainer {
                container: ValueType::List,
                subscript: ValueType::String
            }
        );
    }

    #[test]
    fn calls_bind_arguments() {
        assert_eq!(render("foo = fun(x) { x * 2 }; foo(21)"), "42");
        assert_eq!(render("f = fun(a, b: 10) { a - b }; f(b: 1, a: 5)"), "4");
        assert_eq!(render("f = fun(a, b: 10) { a - b }; f(15)"), "5");
        assert_eq!(render("f = fun(a) { a }; f()"), "undef");
        assert_eq!(
            eval_err("f = fun(a) { a }; f(1, 2)"),
            ErrorKind::ExtraArgument {
                expected: 1,
                received: 2
            }
        );
        assert_eq!(
            eval_err("f = fun(a) { a }; f(1, a: 2)"),
            ErrorKind::ArgumentAlreadySet("a".into())
        );
        assert_eq!(
            eval_err("f = fun(a) { a }; f(z: 2)"),
            ErrorKind::UnknownArgument("z".into())
        );
    }

    #[test]
    fn closures_capture_their_scope() {
        assert_eq!(
            render("adder = fun(n) { fun(x) { x + n } }; add2 = adder(2); add2(40)"),
            "42"
        );
        assert_eq!(
            render("counter = fun() { n = 0; fun() { n = n + 1 } }; c = counter(); c(); c()"),
            "2"
        );
    }

    #[test]
    fn methods_see_their_owner_as_this() {
        assert_eq!(
            render("o = {n: 5, get: fun() { this.n }}; o.get()"),
            "5"
        );
    }

    #[test]
    fn values_convert_to_functions_and_back() {
        assert_eq!(render("x = [1, 2]; x()"), "[1, 2]");
        assert_eq!(render("x = [1, 2]; y = x(); y << 3; x"), "[1, 2]");
        assert_eq!(render("number fun() { \"7\" }"), "7");
        assert_eq!(render("string [1, true, \"x\"]"), "\"1truex\"");
    }

    #[test]
    fn scope_variables_are_live() {
        assert_eq!(render("x = 1; local.x = 2; x"), "2");
        assert_eq!(render("count outer"), "0");
        assert_eq!(render("f = fun() { outer.z }; z = 4; f()"), "4");
        assert_eq!(render("y = 3; f = fun() { global.y }; f()"), "3");
    }

    #[test]
    fn outputs_record_results() {
        let mut interpreter = interpreter(MemoryFetcher::new());
        let value = eval_in(&mut interpreter, "bonus = 2; roll d6 + bonus; sample d4 \"four\"")
            .expect("outputs evaluate");
        assert_eq!(value, Value::Undefined);
        let records = interpreter.records().records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "d6 + 2");
        assert_eq!(records[0].dice_records.len(), 1);
        assert_eq!(records[1].name, "four");
        let OutputResult::Distribution(distribution) = &records[1].result else {
            panic!("samples produce distributions");
        };
        assert_eq!(distribution.total(), 200);
        assert!(records[1].dice_records.is_empty());
    }

    #[test]
    fn sampled_dice_leave_no_log() {
        let mut interpreter = interpreter(MemoryFetcher::new());
        eval_in(&mut interpreter, "sample 3d6; sample d20; sample (x = d4; x d 6)")
            .expect("samples");
        assert_eq!(interpreter.records().records().len(), 3);
        assert!(interpreter.records().dice_records().is_empty());
        eval_in(&mut interpreter, "roll 2d6").expect("roll");
        assert_eq!(interpreter.records().dice_records().len(), 1);
    }

    #[test]
    fn nested_outputs_fail_and_reset() {
        let mut interpreter = interpreter(MemoryFetcher::new());
        let error = eval_in(&mut interpreter, "roll (roll 1)").expect_err("nested output");
        assert_eq!(error.kind, ErrorKind::NestedOutput);
        assert!(eval_in(&mut interpreter, "roll 1").is_ok());
    }

    #[test]
    fn imports_merge_bindings() {
        let fetcher = MemoryFetcher::new()
            .with("lib", "half = fun(x) { x / 2 }; base = 10")
            .with("loop", "import \"loop\"")
            .with("broken", "x = ");
        let mut interpreter = interpreter(fetcher);
        assert_eq!(
            eval_in(&mut interpreter, "import \"lib\"; half(base)").expect("import"),
            Value::Number(5)
        );
        assert_eq!(
            eval_in(&mut interpreter, "import m = \"lib\"; m.base").expect("namespaced import"),
            Value::Number(10)
        );
        assert_eq!(interpreter.imports().len(), 1);
        assert!(matches!(
            eval_in(&mut interpreter, "import \"loop\"").map_err(|e| e.kind),
            Err(ErrorKind::CircularImport(_))
        ));
        assert!(matches!(
            eval_in(&mut interpreter, "import \"broken\"").map_err(|e| e.kind),
            Err(ErrorKind::Import { .. })
        ));
        assert!(matches!(
            eval_in(&mut interpreter, "import \"absent\"").map_err(|e| e.kind),
            Err(ErrorKind::Import { .. })
        ));
    }

    #[test]
    fn scopes_are_released_after_calls_and_loops() {
        let mut interpreter = interpreter(MemoryFetcher::new());
        eval_in(&mut interpreter, "f = fun(x) { x + 1 }").expect("definition");
        let before = interpreter.env().len();
        eval_in(&mut interpreter, "f(1); y * 2 for y in [1, 2]; repeat 1 if false")
            .expect("calls and loops");
        assert_eq!(interpreter.env().len(), before);
    }

    #[test]
    fn returned_closures_do_not_pin_scopes() {
        let mut interpreter = interpreter(MemoryFetcher::new());
        eval_in(&mut interpreter, "g = fun() { fun() { 1 } }").expect("definition");
        let before = interpreter.env().len();
        for _ in 0..20 {
            eval_in(&mut interpreter, "sample count (x for x in [g()])").expect("sample");
        }
        assert!(
            interpreter.env().len() <= before + 65,
            "{} scopes alive after sampling",
            interpreter.env().len()
        );

        let kept = eval_in(
            &mut interpreter,
            "h = g(); add = fun(n) { fun(m) { n + m } }; plus = add(2); plus(3)",
        )
        .expect("kept closures");
        assert_eq!(kept, Value::Number(5));
        eval_in(&mut interpreter, "sample count (add(x) for x in 1 .. 50)").expect("sample");
        assert_eq!(
            eval_in(&mut interpreter, "h() + plus(1)").expect("still callable"),
            Value::Number(4)
        );
    }

    /// Runs `body` on a thread whose stack fits `MAX_DEPTH` nested evaluations.
    fn with_deep_stack(body: impl FnOnce() + Send + 'static) {
        std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(body)
            .expect("spawn evaluation thread")
            .join()
            .expect("evaluation thread panicked");
    }

    #[test]
    fn runaway_recursion_hits_the_depth_limit() {
        with_deep_stack(|| {
            let mut interpreter = interpreter(MemoryFetcher::new());
            let count_down = "f = fun(n) { if n == 0 then 0 else f(n - 1) }";
            eval_in(&mut interpreter, count_down).expect("definition");
            assert_eq!(eval_in(&mut interpreter, "f(100)").expect("shallow"), Value::Number(0));
            let error = eval_in(&mut interpreter, "f(5000)").expect_err("too deep");
            assert_eq!(error.kind, ErrorKind::RecursionLimit(MAX_DEPTH));
            assert_eq!(eval_in(&mut interpreter, "f(10)").expect("depth reset"), Value::Number(0));
            assert_eq!(
                eval_in(&mut interpreter, "spin = fun() { spin() }; spin()")
                    .map_err(|e| e.kind),
                Err(ErrorKind::RecursionLimit(MAX_DEPTH))
            );
        });
    }

    #[test]
    fn self_containing_lists_convert_and_print() {
        let mut interpreter = interpreter(MemoryFetcher::new());
        assert_eq!(
            eval_in(&mut interpreter, "x = [1]; x << [x]; string x").expect("string"),
            Value::String("1".into())
        );
        assert_eq!(eval_in(&mut interpreter, "number x").expect("number"), Value::Number(1));
        assert_eq!(eval_in(&mut interpreter, "x").expect("value").to_string(), "[1, undef]");
        assert_eq!(
            eval_in(&mut interpreter, "y = [1]; y << [y]; x === y").expect("comparison"),
            Value::Boolean(true)
        );
        eval_in(&mut interpreter, "x << 0; y << 1; roll x as string").expect("roll");
    }

    #[test]
    fn floor_arithmetic_helpers() {
        assert_eq!(eval_arithmetic(ArithmeticOp::Div, 7, 2), Some(3));
        assert_eq!(eval_arithmetic(ArithmeticOp::Div, -7, -2), Some(3));
        assert_eq!(eval_arithmetic(ArithmeticOp::Div, 7, -2), Some(-4));
        assert_eq!(eval_arithmetic(ArithmeticOp::Mod, -1, 5), Some(4));
        assert_eq!(eval_arithmetic(ArithmeticOp::Div, i64::MIN, -1), Some(i64::MIN));
        assert_eq!(eval_arithmetic(ArithmeticOp::Mod, 1, 0), None);
    }
}
