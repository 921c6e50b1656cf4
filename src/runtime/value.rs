use crate::language::{ast::Lambda, printer};
use crate::runtime::environment::Capture;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

pub type ListRef = Rc<RefCell<Vec<Value>>>;
pub type MapRef = Rc<RefCell<IndexMap<String, Value>>>;

/// Value types in their total order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueType {
    Undefined,
    String,
    Boolean,
    Number,
    List,
    Map,
    Function,
}

impl ValueType {
    pub fn keyword(self) -> &'static str {
        match self {
            ValueType::Undefined => "undef",
            ValueType::String => "string",
            ValueType::Boolean => "boolean",
            ValueType::Number => "number",
            ValueType::List => "list",
            ValueType::Map => "map",
            ValueType::Function => "fun",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Undefined => "undefined",
            ValueType::String => "string",
            ValueType::Boolean => "boolean",
            ValueType::Number => "number",
            ValueType::List => "list",
            ValueType::Map => "map",
            ValueType::Function => "function",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug)]
pub enum Value {
    Undefined,
    String(String),
    Boolean(bool),
    Number(i64),
    List(ListRef),
    Map(MapRef),
    Function(Rc<Function>),
}

/// A closure over the scope it was created in.
#[derive(Debug)]
pub struct Function {
    pub scope: Capture,
    pub lambda: Rc<Lambda>,
    /// Container the function was read from, bound to `this` during calls.
    pub owner: Value,
}

impl Function {
    pub fn arity(&self) -> usize {
        self.lambda.params.len()
    }

    pub fn with_owner(&self, owner: Value) -> Function {
        Function {
            scope: self.scope.clone(),
            lambda: self.lambda.clone(),
            owner,
        }
    }
}

impl Value {
    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn map(entries: IndexMap<String, Value>) -> Value {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    pub fn empty_map() -> MapRef {
        Rc::new(RefCell::new(IndexMap::new()))
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Undefined => ValueType::Undefined,
            Value::String(_) => ValueType::String,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Number(_) => ValueType::Number,
            Value::List(_) => ValueType::List,
            Value::Map(_) => ValueType::Map,
            Value::Function(_) => ValueType::Function,
        }
    }

    /// Identity of a list or map, shared by every handle to it.
    pub fn container_id(&self) -> Option<usize> {
        match self {
            Value::List(items) => Some(Rc::as_ptr(items) as *const () as usize),
            Value::Map(entries) => Some(Rc::as_ptr(entries) as *const () as usize),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Undefined | Value::String(_) | Value::Boolean(_) | Value::Number(_)
        )
    }
}

/// Total order over all values: by type first, then by content.
pub fn compare(a: &Value, b: &Value) -> Ordering {
    compare_in(a, b, &mut Vec::new())
}

/// Pairs of containers under comparison. Meeting a pair again means the
/// containers nest into themselves the same way, so that branch is equal.
type Comparing = Vec<(usize, usize)>;

fn compare_in(a: &Value, b: &Value, comparing: &mut Comparing) -> Ordering {
    match (a, b) {
        (Value::Undefined, Value::Undefined) => Ordering::Equal,
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => a.cmp(b),
        (Value::List(x), Value::List(y)) => {
            if Rc::ptr_eq(x, y) {
                return Ordering::Equal;
            }
            nested(a, b, comparing, |comparing| {
                let (x, y) = (x.borrow(), y.borrow());
                compare_sequences(x.iter(), y.iter(), comparing)
            })
        }
        (Value::Map(x), Value::Map(y)) => {
            if Rc::ptr_eq(x, y) {
                return Ordering::Equal;
            }
            nested(a, b, comparing, |comparing| {
                let (x, y) = (x.borrow(), y.borrow());
                compare_sequences(x.values(), y.values(), comparing)
            })
        }
        (Value::Function(a), Value::Function(b)) => {
            Rc::as_ptr(a).cast::<()>().cmp(&Rc::as_ptr(b).cast::<()>())
        }
        (a, b) => a.value_type().cmp(&b.value_type()),
    }
}

fn nested(
    a: &Value,
    b: &Value,
    comparing: &mut Comparing,
    contents: impl FnOnce(&mut Comparing) -> Ordering,
) -> Ordering {
    let (Some(x), Some(y)) = (a.container_id(), b.container_id()) else {
        return Ordering::Equal;
    };
    if comparing.contains(&(x, y)) {
        return Ordering::Equal;
    }
    comparing.push((x, y));
    let order = contents(comparing);
    comparing.pop();
    order
}

fn compare_sequences<'v>(
    mut a: impl Iterator<Item = &'v Value>,
    mut b: impl Iterator<Item = &'v Value>,
    comparing: &mut Comparing,
) -> Ordering {
    loop {
        match (a.next(), b.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match compare_in(x, y, comparing) {
                Ordering::Equal => continue,
                other => return other,
            },
        }
    }
}

pub fn equal(a: &Value, b: &Value) -> bool {
    compare(a, b) == Ordering::Equal
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        equal(self, other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&printer::value_source(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number_list(values: &[i64]) -> Value {
        Value::list(values.iter().map(|n| Value::Number(*n)).collect())
    }

    #[test]
    fn types_are_ordered_before_contents() {
        let ordered = [
            Value::Undefined,
            Value::String("zzz".into()),
            Value::Boolean(false),
            Value::Number(-100),
            number_list(&[]),
            Value::map(IndexMap::new()),
        ];
        for pair in ordered.windows(2) {
            assert_eq!(compare(&pair[0], &pair[1]), Ordering::Less);
            assert_eq!(compare(&pair[1], &pair[0]), Ordering::Greater);
        }
    }

    #[test]
    fn lists_compare_element_wise() {
        assert_eq!(
            compare(&number_list(&[1, 2]), &number_list(&[1, 3])),
            Ordering::Less
        );
        assert_eq!(
            compare(&number_list(&[1, 2]), &number_list(&[1, 2, 0])),
            Ordering::Less
        );
        assert!(equal(&number_list(&[4, 2]), &number_list(&[4, 2])));
    }

    #[test]
    fn maps_compare_values_in_order() {
        let mut a = IndexMap::new();
        a.insert("x".to_string(), Value::Number(1));
        let mut b = IndexMap::new();
        b.insert("y".to_string(), Value::Number(1));
        assert!(equal(&Value::map(a.clone()), &Value::map(b)));
        let mut c = a.clone();
        c.insert("z".to_string(), Value::Undefined);
        assert_eq!(
            compare(&Value::map(a), &Value::map(c)),
            Ordering::Less
        );
    }

    #[test]
    fn display_uses_source_syntax() {
        assert_eq!(number_list(&[1, 2]).to_string(), "[1, 2]");
        assert_eq!(Value::String("x".into()).to_string(), "\"x\"");
        assert_eq!(ValueType::Undefined.to_string(), "undefined");
    }

    #[test]
    fn self_containing_lists_compare_without_looping() {
        let (a, b) = (number_list(&[1]), number_list(&[1]));
        for list in [&a, &b] {
            let Value::List(items) = list else {
                unreachable!()
            };
            items.borrow_mut().push(list.clone());
        }
        assert!(equal(&a, &b));
        assert_eq!(compare(&a, &number_list(&[1, 2])), Ordering::Greater);
        for list in [a, b] {
            if let Value::List(items) = list {
                items.borrow_mut().clear();
            }
        }
    }
}
