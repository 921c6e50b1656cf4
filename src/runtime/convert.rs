use crate::runtime::{
    error::RuntimeResult,
    value::{Function, Value, ValueType},
};
use indexmap::IndexMap;
use std::rc::Rc;

/// The two conversions that need an evaluation context.
pub trait Converter {
    /// Calls `function` with no arguments, asking for a result of type `ty`.
    fn call(&mut self, function: &Rc<Function>, ty: ValueType) -> RuntimeResult<Value>;

    /// Wraps a non-function value in a zero-parameter function.
    fn wrap(&mut self, value: &Value) -> Value;
}

/// Converts `value` to `ty`. Only calls into user functions can fail.
pub fn convert_value(
    value: &Value,
    ty: ValueType,
    converter: &mut dyn Converter,
) -> RuntimeResult<Value> {
    if value.value_type() == ty {
        return Ok(value.clone());
    }
    if ty == ValueType::Undefined {
        return Ok(Value::Undefined);
    }
    if let Value::Function(function) = value {
        return converter.call(function, ty);
    }
    Ok(match ty {
        ValueType::Undefined => Value::Undefined,
        ValueType::String => Value::String(to_string(value, converter, &mut Vec::new())?),
        ValueType::Boolean => Value::Boolean(to_boolean(value)),
        ValueType::Number => Value::Number(to_number(value, converter, &mut Vec::new())?),
        ValueType::List => to_list(value),
        ValueType::Map => to_map(value),
        ValueType::Function => converter.wrap(value),
    })
}

/// Containers being folded; one reached again through itself adds nothing.
type Folding = Vec<usize>;

fn to_string(
    value: &Value,
    converter: &mut dyn Converter,
    folding: &mut Folding,
) -> RuntimeResult<String> {
    Ok(match value {
        Value::Undefined => String::new(),
        Value::String(s) => s.clone(),
        Value::Boolean(true) => "true".to_string(),
        Value::Boolean(false) => String::new(),
        Value::Number(n) => n.to_string(),
        Value::List(_) | Value::Map(_) => {
            let Some(id) = enter(value, folding) else {
                return Ok(String::new());
            };
            let mut out = String::new();
            for element in elements(value) {
                out.push_str(&to_string(&element, converter, folding)?);
            }
            leave(id, folding);
            out
        }
        Value::Function(function) => match converter.call(function, ValueType::String)? {
            Value::String(s) => s,
            _ => String::new(),
        },
    })
}

fn to_boolean(value: &Value) -> bool {
    match value {
        Value::Undefined => false,
        Value::String(s) => !s.is_empty(),
        Value::Boolean(b) => *b,
        Value::Number(n) => *n != 0,
        Value::List(items) => !items.borrow().is_empty(),
        Value::Map(entries) => !entries.borrow().is_empty(),
        Value::Function(_) => true,
    }
}

fn to_number(
    value: &Value,
    converter: &mut dyn Converter,
    folding: &mut Folding,
) -> RuntimeResult<i64> {
    Ok(match value {
        Value::Undefined => 0,
        Value::String(s) => s.trim().parse().unwrap_or(0),
        Value::Boolean(b) => i64::from(*b),
        Value::Number(n) => *n,
        Value::List(_) | Value::Map(_) => {
            let Some(id) = enter(value, folding) else {
                return Ok(0);
            };
            let mut sum = 0i64;
            for element in elements(value) {
                sum = sum.wrapping_add(to_number(&element, converter, folding)?);
            }
            leave(id, folding);
            sum
        }
        Value::Function(function) => match converter.call(function, ValueType::Number)? {
            Value::Number(n) => n,
            _ => 0,
        },
    })
}

fn to_list(value: &Value) -> Value {
    match value {
        Value::Undefined => Value::list(Vec::new()),
        Value::List(_) => value.clone(),
        Value::Map(entries) => Value::list(entries.borrow().values().cloned().collect()),
        scalar => Value::list(vec![scalar.clone()]),
    }
}

fn to_map(value: &Value) -> Value {
    let mut map = IndexMap::new();
    match value {
        Value::Undefined => {}
        Value::Map(_) => return value.clone(),
        Value::List(items) => {
            for (index, item) in items.borrow().iter().enumerate() {
                map.insert(format!("_{}", index), item.clone());
            }
        }
        scalar => {
            map.insert("_".to_string(), scalar.clone());
        }
    }
    Value::map(map)
}

fn enter(value: &Value, folding: &mut Folding) -> Option<usize> {
    let id = value.container_id()?;
    if folding.contains(&id) {
        return None;
    }
    folding.push(id);
    Some(id)
}

fn leave(id: usize, folding: &mut Folding) {
    if let Some(position) = folding.iter().rposition(|&seen| seen == id) {
        folding.remove(position);
    }
}

/// Snapshot of a container's elements, so conversions never hold a borrow
/// while user code runs.
fn elements(value: &Value) -> Vec<Value> {
    match value {
        Value::List(items) => items.borrow().clone(),
        Value::Map(entries) => entries.borrow().values().cloned().collect(),
        _ => Vec::new(),
    }
}

/// Conversion without an evaluation context: functions count as undefined.
struct Detached;

impl Converter for Detached {
    fn call(&mut self, _function: &Rc<Function>, _ty: ValueType) -> RuntimeResult<Value> {
        Ok(Value::Undefined)
    }

    fn wrap(&mut self, value: &Value) -> Value {
        value.clone()
    }
}

/// Numeric view of a value used by statistics; functions count as 0.
pub fn number_view(value: &Value) -> i64 {
    match convert_value(value, ValueType::Number, &mut Detached) {
        Ok(Value::Number(n)) => n,
        _ => 0,
    }
}
