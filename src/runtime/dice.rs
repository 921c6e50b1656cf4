use crate::language::ast::Selector;
use crate::runtime::{
    error::ErrorKind,
    value::{compare, Function, Value},
};
use indexmap::IndexMap;
use rand::Rng;
use std::rc::Rc;

/// Outcome of throwing one die.
#[derive(Debug)]
pub enum Throw {
    Face(Value),
    /// Function dice are thrown by calling them.
    Call(Rc<Function>),
}

pub fn throw<R: Rng + ?Sized>(rng: &mut R, die: &Value) -> Result<Throw, ErrorKind> {
    let face = match die {
        Value::Number(faces) if *faces <= 0 => Value::Undefined,
        Value::Number(faces) => Value::Number(rng.gen_range(1..=*faces)),
        Value::List(items) => {
            let items = items.borrow();
            if items.is_empty() {
                Value::Undefined
            } else {
                items[rng.gen_range(0..items.len())].clone()
            }
        }
        Value::Map(entries) => {
            let entries = entries.borrow();
            if entries.is_empty() {
                Value::Undefined
            } else {
                let index = rng.gen_range(0..entries.len());
                let mut face = IndexMap::new();
                if let Some((key, value)) = entries.get_index(index) {
                    face.insert(key.clone(), value.clone());
                }
                Value::map(face)
            }
        }
        Value::Function(function) => return Ok(Throw::Call(function.clone())),
        other => return Err(ErrorKind::Unrollable(other.value_type())),
    };
    Ok(Throw::Face(face))
}

/// Extremal element, the first one on ties; first or last literally.
pub fn best(selector: Selector, items: &[Value]) -> Value {
    let picked = match selector {
        Selector::First => items.first(),
        Selector::Last => items.last(),
        Selector::Highest => items.iter().fold(None, |best: Option<&Value>, item| match best {
            Some(b) if compare(item, b).is_le() => Some(b),
            _ => Some(item),
        }),
        Selector::Lowest => items.iter().fold(None, |best: Option<&Value>, item| match best {
            Some(b) if compare(item, b).is_ge() => Some(b),
            _ => Some(item),
        }),
    };
    picked.cloned().unwrap_or(Value::Undefined)
}

/// `count` elements of `items`, kept in their original order.
pub fn best_multiple(selector: Selector, count: i64, items: &[Value]) -> Vec<Value> {
    if count <= 0 {
        return Vec::new();
    }
    let len = items.len();
    let n = usize::try_from(count).unwrap_or(usize::MAX);
    if n >= len {
        return items.to_vec();
    }
    let mut indices: Vec<usize> = (0..len).collect();
    let chosen: &mut [usize] = match selector {
        Selector::First => &mut indices[..n],
        Selector::Last => &mut indices[len - n..],
        Selector::Highest | Selector::Lowest => {
            indices.sort_by(|a, b| compare(&items[*a], &items[*b]));
            if selector == Selector::Highest {
                &mut indices[len - n..]
            } else {
                &mut indices[..n]
            }
        }
    };
    chosen.sort_unstable();
    chosen.iter().map(|i| items[*i].clone()).collect()
}

/// Half-open range from `begin` towards `end`.
pub fn range(begin: i64, end: i64) -> Vec<Value> {
    if begin <= end {
        (begin..end).map(Value::Number).collect()
    } else {
        ((end + 1)..=begin).rev().map(Value::Number).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn numbers(values: &[i64]) -> Vec<Value> {
        values.iter().map(|n| Value::Number(*n)).collect()
    }

    fn face(throw: Throw) -> Value {
        match throw {
            Throw::Face(value) => value,
            Throw::Call(_) => panic!("expected a face"),
        }
    }

    #[test]
    fn number_dice_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let Value::Number(n) = face(throw(&mut rng, &Value::Number(6)).expect("rollable")) else {
                panic!("expected a number");
            };
            assert!((1..=6).contains(&n));
        }
        assert_eq!(
            face(throw(&mut rng, &Value::Number(0)).expect("rollable")),
            Value::Undefined
        );
    }

    #[test]
    fn map_dice_yield_one_entry() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut entries = IndexMap::new();
        entries.insert("a".to_string(), Value::Number(1));
        entries.insert("b".to_string(), Value::Number(2));
        let Value::Map(rolled) = face(throw(&mut rng, &Value::map(entries)).expect("rollable"))
        else {
            panic!("expected a map");
        };
        assert_eq!(rolled.borrow().len(), 1);
    }

    #[test]
    fn scalars_other_than_numbers_are_unrollable() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            throw(&mut rng, &Value::Boolean(true)),
            Err(ErrorKind::Unrollable(_))
        ));
    }

    #[test]
    fn best_prefers_the_first_on_ties() {
        let items = vec![
            Value::list(numbers(&[1])),
            Value::Number(9),
            Value::Number(9),
        ];
        let Value::List(first) = &items[0] else {
            unreachable!()
        };
        let Value::List(picked) = best(Selector::Highest, &items) else {
            panic!("lists sort after numbers");
        };
        assert!(Rc::ptr_eq(first, &picked));
        assert_eq!(best(Selector::Lowest, &numbers(&[3, 1, 1])), Value::Number(1));
        assert_eq!(best(Selector::Last, &[]), Value::Undefined);
    }

    #[test]
    fn best_multiple_keeps_original_order() {
        let items = numbers(&[17, 1, 42, 33]);
        assert_eq!(best_multiple(Selector::Highest, 2, &items), numbers(&[42, 33]));
        assert_eq!(best_multiple(Selector::Lowest, 2, &items), numbers(&[17, 1]));
        assert_eq!(best_multiple(Selector::Last, 3, &items), numbers(&[1, 42, 33]));
        assert_eq!(best_multiple(Selector::First, 0, &items), numbers(&[]));
        assert_eq!(best_multiple(Selector::Highest, 9, &items), items);
    }

    #[test]
    fn ranges_are_half_open_in_both_directions() {
        assert_eq!(range(0, 4), numbers(&[0, 1, 2, 3]));
        assert_eq!(range(3, 0), numbers(&[3, 2, 1]));
        assert_eq!(range(2, 2), numbers(&[]));
    }
}
