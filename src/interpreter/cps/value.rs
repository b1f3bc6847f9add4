use std::fmt;
use std::rc::Rc;

use crate::interpreter::cps::{ErrorKind, Pair, Procedure, RuntimeError};
use crate::reader::parser::Node;

use crate::runtime_error;

#[derive(Clone, PartialEq)]
pub enum Value {
    Symbol(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),

    // the empty list; never a Pair
    Nil,
    // result of forms that produce nothing observable
    Undefined,

    Pair(Rc<Pair>),

    Procedure(Procedure),
}

impl std::ops::Add for Value {
    type Output = Result<Value, RuntimeError>;

    fn add(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Integer(a), Value::Integer(b)) => match a.checked_add(b) {
                Some(n) => Ok(Value::Integer(n)),
                None => Ok(Value::Float(a as f64 + b as f64)),
            },
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
            (Value::Integer(a), Value::Float(b)) => Ok(Value::Float(a as f64 + b)),
            (Value::Float(a), Value::Integer(b)) => Ok(Value::Float(a + b as f64)),
            (a, b) => runtime_error!(InvalidArguments, "cannot `+` {:?} and {:?}", a, b),
        }
    }
}

impl std::ops::Sub for Value {
    type Output = Result<Value, RuntimeError>;

    fn sub(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Integer(a), Value::Integer(b)) => match a.checked_sub(b) {
                Some(n) => Ok(Value::Integer(n)),
                None => Ok(Value::Float(a as f64 - b as f64)),
            },
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a - b)),
            (Value::Integer(a), Value::Float(b)) => Ok(Value::Float(a as f64 - b)),
            (Value::Float(a), Value::Integer(b)) => Ok(Value::Float(a - b as f64)),
            (a, b) => runtime_error!(InvalidArguments, "cannot `-` {:?} and {:?}", a, b),
        }
    }
}

impl std::ops::Mul for Value {
    type Output = Result<Value, RuntimeError>;

    fn mul(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Integer(a), Value::Integer(b)) => match a.checked_mul(b) {
                Some(n) => Ok(Value::Integer(n)),
                None => Ok(Value::Float(a as f64 * b as f64)),
            },
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a * b)),
            (Value::Integer(a), Value::Float(b)) => Ok(Value::Float(a as f64 * b)),
            (Value::Float(a), Value::Integer(b)) => Ok(Value::Float(a * b as f64)),
            (a, b) => runtime_error!(InvalidArguments, "cannot `*` {:?} and {:?}", a, b),
        }
    }
}

impl std::ops::Div for Value {
    type Output = Result<Value, RuntimeError>;

    /// Exact integer quotients stay integers, everything else becomes a float.
    fn div(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (_, Value::Integer(0)) => runtime_error!(InvalidArguments, "division by zero"),
            (Value::Integer(a), Value::Integer(b)) => match (a.checked_rem(b), a.checked_div(b)) {
                (Some(0), Some(q)) => Ok(Value::Integer(q)),
                _ => Ok(Value::Float(a as f64 / b as f64)),
            },
            (_, Value::Float(b)) if b == 0.0 => runtime_error!(InvalidArguments, "division by zero"),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a / b)),
            (Value::Integer(a), Value::Float(b)) => Ok(Value::Float(a as f64 / b)),
            (Value::Float(a), Value::Integer(b)) => Ok(Value::Float(a / b as f64)),
            (a, b) => runtime_error!(InvalidArguments, "cannot `/` {:?} and {:?}", a, b),
        }
    }
}

impl std::ops::Neg for Value {
    type Output = Result<Value, RuntimeError>;

    fn neg(self) -> Self::Output {
        match self {
            Value::Integer(a) => Ok(a.checked_neg().map(Value::Integer).unwrap_or(Value::Float(-(a as f64)))),
            Value::Float(a) => Ok(Value::Float(-a)),
            x => runtime_error!(InvalidArguments, "cannot `-` {:?}", x),
        }
    }
}

impl Value {
    pub fn symbol(name: &str) -> Value { Value::Symbol(name.to_string()) }

    pub fn from_node(node: &Node) -> Value {
        match *node {
            Node::Identifier(ref val) => Value::Symbol(val.clone()),
            Node::Integer(val) => Value::Integer(val),
            Node::Float(val) => Value::Float(val),
            Node::Boolean(val) => Value::Boolean(val),
            Node::String(ref val) => Value::String(val.clone()),
            Node::List(ref nodes) => Value::from_vec(nodes.iter().map(Value::from_node).collect()),
            Node::Dotted(ref nodes, ref tail) => Value::from_vec_with_tail(nodes.iter().map(Value::from_node).collect(), Value::from_node(tail)),
        }
    }

    /// Everything except `#f` counts as true.
    pub fn is_true(&self) -> bool { !matches!(self, Value::Boolean(false)) }

    pub fn is_number(&self) -> bool { matches!(self, Value::Integer(_) | Value::Float(_)) }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_integer(self) -> Result<i64, RuntimeError> {
        match self {
            Value::Integer(i) => Ok(i),
            _ => runtime_error!(InvalidArguments, "expected an integer value: {:?}", self),
        }
    }

    pub fn into_float(self) -> Result<f64, RuntimeError> {
        match self {
            Value::Integer(i) => Ok(i as f64),
            Value::Float(f) => Ok(f),
            _ => runtime_error!(InvalidArguments, "expected a number: {:?}", self),
        }
    }

    pub fn into_procedure(self) -> Result<Procedure, RuntimeError> {
        match self {
            Value::Procedure(p) => Ok(p),
            _ => Err(RuntimeError::new(
                ErrorKind::NotCallable,
                format!("{} is not callable: {:?}", self.type_name(), self),
            )),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Symbol(_) => "symbol",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Nil => "nil",
            Value::Undefined => "undefined",
            Value::Pair(_) => "pair",
            Value::Procedure(_) => "procedure",
        }
    }
}

fn show(f: &mut fmt::Formatter, v: &Value, repr: bool) -> fmt::Result {
    if repr {
        write!(f, "{:?}", v)
    } else {
        write!(f, "{}", v)
    }
}

fn write_pair(f: &mut fmt::Formatter, pair: &Pair, repr: bool) -> fmt::Result {
    write!(f, "(")?;
    show(f, &pair.first, repr)?;
    let mut rest = &pair.second;
    loop {
        match rest {
            Value::Pair(p) => {
                write!(f, " ")?;
                show(f, &p.first, repr)?;
                rest = &p.second;
            }
            Value::Nil => break,
            tail => {
                write!(f, " . ")?;
                show(f, tail, repr)?;
                break;
            }
        }
    }
    write!(f, ")")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Value::Symbol(ref val) => write!(f, "{}", val),
            Value::Integer(val) => write!(f, "{}", val),
            Value::Float(val) => write!(f, "{:?}", val), // keeps the ".0" on whole floats
            Value::Boolean(val) => write!(f, "#{}", if val { "t" } else { "f" }),
            Value::String(ref val) => write!(f, "{}", val),
            Value::Nil => write!(f, "()"),
            Value::Undefined => write!(f, "undefined"),
            Value::Pair(ref pair) => write_pair(f, pair, false),
            Value::Procedure(ref pr) => write!(f, "{}", pr),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Value::String(ref val) => write!(f, "{:?}", val),
            Value::Pair(ref pair) => write_pair(f, pair, true),
            _ => write!(f, "{}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_false_is_false() {
        assert!(Value::Integer(0).is_true());
        assert!(Value::Nil.is_true());
        assert!(Value::Undefined.is_true());
        assert!(!Value::Boolean(false).is_true());
    }

    #[test]
    fn test_division() {
        assert_eq!((Value::Integer(6) / Value::Integer(3)).unwrap(), Value::Integer(2));
        assert_eq!((Value::Integer(5) / Value::Integer(2)).unwrap(), Value::Float(2.5));
        assert_eq!((Value::Integer(5) / Value::Integer(0)).unwrap_err().kind, ErrorKind::InvalidArguments);
    }

    #[test]
    fn test_display_and_debug() {
        let list = Value::from_vec(vec![Value::symbol("a"), Value::String("b c".into()), Value::Boolean(true)]);
        assert_eq!(list.to_string(), "(a b c #t)");
        assert_eq!(format!("{:?}", list), "(a \"b c\" #t)");

        let dotted = Value::cons(Value::Integer(1), Value::Integer(2));
        assert_eq!(dotted.to_string(), "(1 . 2)");
    }
}
