use std::mem;
use std::rc::Rc;

use crate::interpreter::cps::value::Value;
use crate::interpreter::cps::RuntimeError;

use crate::runtime_error;

/// A cons cell. Proper lists are chains of pairs ending in `Value::Nil`.
#[derive(Clone)]
pub struct Pair {
    pub first: Value,
    pub second: Value,
}

// Walks the cdr chain in a loop; only nesting in the car position recurses.
impl PartialEq for Pair {
    fn eq(&self, other: &Pair) -> bool {
        let (mut left, mut right) = (self, other);
        loop {
            if left.first != right.first {
                return false;
            }
            match (&left.second, &right.second) {
                (Value::Pair(l), Value::Pair(r)) => {
                    if Rc::ptr_eq(l, r) {
                        return true;
                    }
                    left = l;
                    right = r;
                }
                (l, r) => return l == r,
            }
        }
    }
}

// Unlinks long cdr chains one cell at a time so that dropping a big list
// does not recurse once per element.
impl Drop for Pair {
    fn drop(&mut self) {
        let mut next = mem::replace(&mut self.second, Value::Nil);
        while let Value::Pair(rc) = next {
            match Rc::try_unwrap(rc) {
                Ok(mut pair) => next = mem::replace(&mut pair.second, Value::Nil),
                Err(_) => break,
            }
        }
    }
}

#[macro_export]
macro_rules! shift_or_error {
    ($list:expr, $kind:ident, $($arg:tt)*) => (
        match $list.shift() {
            Some((car, cdr)) => (car, cdr),
            None => $crate::runtime_error!($kind, $($arg)*),
        }
    )
}

impl Value {
    pub fn cons(first: Value, second: Value) -> Value { Value::Pair(Rc::new(Pair { first, second })) }

    pub fn from_vec(src: Vec<Value>) -> Value { Value::from_vec_with_tail(src, Value::Nil) }

    pub fn from_vec_with_tail(src: Vec<Value>, tail: Value) -> Value { src.into_iter().rev().fold(tail, |acc, val| Value::cons(val, acc)) }

    pub fn is_pair(&self) -> bool { matches!(self, Value::Pair(_)) }

    /// Nil => None, Pair => Some((first, second))
    pub fn shift(&self) -> Option<(Value, Value)> {
        match self {
            Value::Pair(pair) => Some((pair.first.clone(), pair.second.clone())),
            _ => None,
        }
    }

    /// `nil` or a pair chain that ends in `nil`
    pub fn is_list(&self) -> bool { self.list_len().is_some() }

    /// Length of a proper list; `None` for improper lists and non-lists.
    pub fn list_len(&self) -> Option<usize> {
        let mut iter = self.iter();
        let len = iter.by_ref().count();
        match iter.tail() {
            Value::Nil => Some(len),
            _ => None,
        }
    }

    pub fn iter(&self) -> ListIter<'_> { ListIter(self) }

    /// Collects a proper list into a vector, rejecting dotted tails.
    pub fn list_to_vec(&self) -> Result<Vec<Value>, RuntimeError> {
        let mut iter = self.iter();
        let items: Vec<Value> = iter.by_ref().cloned().collect();
        match iter.tail() {
            Value::Nil => Ok(items),
            _ => runtime_error!(InvalidArguments, "expected a proper list: {:?}", self),
        }
    }
}

/// Walks the `first` fields of a pair chain; `tail` is what remains after it stops.
pub struct ListIter<'a>(&'a Value);

impl<'a> ListIter<'a> {
    pub fn tail(&self) -> &'a Value { self.0 }
}

impl<'a> Iterator for ListIter<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        match self.0 {
            Value::Pair(pair) => {
                self.0 = &pair.second;
                Some(&pair.first)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::cps::ErrorKind;

    fn ints(ns: &[i64]) -> Value { Value::from_vec(ns.iter().map(|n| Value::Integer(*n)).collect()) }

    #[test]
    fn test_proper_list() {
        let list = ints(&[1, 2, 3]);
        assert!(list.is_list());
        assert_eq!(list.list_len(), Some(3));
        assert_eq!(list.list_to_vec().unwrap(), vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
        assert_eq!(Value::Nil.list_len(), Some(0));
    }

    #[test]
    fn test_improper_list() {
        let dotted = Value::from_vec_with_tail(vec![Value::Integer(1)], Value::Integer(2));
        assert!(!dotted.is_list());
        assert_eq!(dotted.list_len(), None);
        assert_eq!(dotted.list_to_vec().unwrap_err().kind, ErrorKind::InvalidArguments);
        assert_eq!(Value::Integer(7).list_len(), None);
    }

    #[test]
    fn test_shift() {
        let list = ints(&[1, 2]);
        let (car, cdr) = list.shift().unwrap();
        assert_eq!(car, Value::Integer(1));
        assert_eq!(cdr, ints(&[2]));
        assert!(Value::Nil.shift().is_none());
    }

    #[test]
    fn test_drop_long_list() {
        let list = (0..1_000_000).fold(Value::Nil, |acc, n| Value::cons(Value::Integer(n), acc));
        assert_eq!(list.list_len(), Some(1_000_000));
        drop(list);
    }

    #[test]
    fn test_eq_long_list() {
        let build = |last: i64| (0..1_000_000).fold(Value::cons(Value::Integer(last), Value::Nil), |acc, n| Value::cons(Value::Integer(n), acc));
        assert!(build(0) == build(0));
        assert!(build(0) != build(1));
        let shared = build(0);
        assert!(Value::cons(Value::Nil, shared.clone()) == Value::cons(Value::Nil, shared));
    }

    #[test]
    fn test_eq_dotted() {
        let dotted = |tail: i64| Value::from_vec_with_tail(vec![Value::Integer(1), ints(&[2])], Value::Integer(tail));
        assert_eq!(dotted(3), dotted(3));
        assert_ne!(dotted(3), dotted(4));
        assert_ne!(dotted(3), ints(&[1, 2]));
    }

    #[test]
    fn test_shared_tail_survives_drop() {
        let tail = ints(&[2, 3]);
        let list = Value::cons(Value::Integer(1), tail.clone());
        drop(list);
        assert_eq!(tail, ints(&[2, 3]));
    }
}
