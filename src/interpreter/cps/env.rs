use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::interpreter::cps::value::Value;
use crate::interpreter::cps::{ErrorKind, Formals, RuntimeError};
use crate::runtime_error;

pub type EnvRef = Rc<RefCell<Env>>;

/// One frame of the environment chain.
pub struct Env {
    pub parent: Option<EnvRef>,
    pub values: HashMap<String, Value>,
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.parent {
            Some(ref parent) => {
                let mut names: Vec<&String> = self.values.keys().collect();
                names.sort();
                write!(f, "<Env {:?} -> {:?}>", names, parent.borrow())
            }
            None => write!(f, "<Global Env>"),
        }
    }
}

impl Env {
    pub fn new_root() -> EnvRef {
        let env = Env {
            parent: None,
            values: HashMap::new(),
        };
        Rc::new(RefCell::new(env))
    }

    pub fn new_child(parent: EnvRef) -> EnvRef {
        let env = Env {
            parent: Some(parent),
            values: HashMap::new(),
        };
        Rc::new(RefCell::new(env))
    }

    /// Binds `formals` to `values` in one fresh frame under `parent`.
    ///
    /// Nothing is allocated when the arity does not match, so a failed call
    /// never leaves a half-bound frame behind.
    pub fn new_child_frame(parent: EnvRef, formals: &Formals, values: Vec<Value>) -> Result<EnvRef, RuntimeError> {
        if !formals.accepts(values.len()) {
            runtime_error!(
                Arity,
                "invalid parameter binding: {} expects {} argument(s), got {}",
                formals,
                formals.arity(),
                values.len()
            );
        }

        let frame = Env::new_child(parent);
        {
            let mut env = frame.borrow_mut();
            let mut values = values.into_iter();
            for name in &formals.names {
                if let Some(value) = values.next() {
                    env.define(name.clone(), value);
                }
            }
            if let Some(ref rest) = formals.rest {
                env.define(rest.clone(), Value::from_vec(values.collect()));
            }
        }
        Ok(frame)
    }

    /// Define a variable at the current level, shadowing (never touching) any
    /// binding of the same name further up the chain.
    pub fn define(&mut self, key: String, value: Value) { self.values.insert(key, value); }

    /// Walks up the chain; mu frames can make it as deep as the call stack.
    pub fn lookup(&self, key: &str) -> Option<Value> {
        if let Some(val) = self.values.get(key) {
            return Some(val.clone());
        }
        let mut frame = self.parent.clone();
        while let Some(env) = frame {
            if let Some(val) = env.borrow().values.get(key) {
                return Some(val.clone());
            }
            frame = env.borrow().parent.clone();
        }
        None
    }

    pub fn get(&self, key: &str) -> Result<Value, RuntimeError> {
        self.lookup(key)
            .ok_or_else(|| RuntimeError::new(ErrorKind::UnknownIdentifier, format!("unknown identifier: {}", key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::cps::check::check_formals;

    fn formals(names: &[&str]) -> Formals { check_formals(&Value::from_vec(names.iter().map(|n| Value::symbol(n)).collect())).unwrap() }

    #[test]
    fn test_lookup_through_ancestors() {
        let root = Env::new_root();
        root.borrow_mut().define("x".into(), Value::Integer(1));
        let child = Env::new_child(root.clone());
        let grandchild = Env::new_child(child);

        assert_eq!(grandchild.borrow().get("x").unwrap(), Value::Integer(1));
    }

    #[test]
    fn test_shadowing() {
        let root = Env::new_root();
        root.borrow_mut().define("x".into(), Value::Integer(1));
        let child = Env::new_child(root.clone());
        child.borrow_mut().define("x".into(), Value::Integer(2));

        assert_eq!(child.borrow().get("x").unwrap(), Value::Integer(2));
        assert_eq!(root.borrow().get("x").unwrap(), Value::Integer(1));
    }

    #[test]
    fn test_define_overwrites_locally() {
        let root = Env::new_root();
        root.borrow_mut().define("x".into(), Value::Integer(1));
        root.borrow_mut().define("x".into(), Value::Integer(5));
        assert_eq!(root.borrow().get("x").unwrap(), Value::Integer(5));
    }

    #[test]
    fn test_unknown_identifier() {
        let root = Env::new_root();
        let child = Env::new_child(root);
        let err = child.borrow().get("nope").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownIdentifier);
        assert!(err.message.contains("nope"));
    }

    #[test]
    fn test_new_child_frame() {
        let root = Env::new_root();
        let frame = Env::new_child_frame(root.clone(), &formals(&["a", "b"]), vec![Value::Integer(1), Value::Integer(2)]).unwrap();
        assert_eq!(frame.borrow().get("a").unwrap(), Value::Integer(1));
        assert_eq!(frame.borrow().get("b").unwrap(), Value::Integer(2));
        assert!(Rc::ptr_eq(frame.borrow().parent.as_ref().unwrap(), &root));
    }

    #[test]
    fn test_new_child_frame_arity() {
        let root = Env::new_root();
        let err = Env::new_child_frame(root.clone(), &formals(&["a", "b"]), vec![Value::Integer(1)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Arity);
        let err = Env::new_child_frame(root, &formals(&["a"]), vec![Value::Integer(1), Value::Integer(2)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Arity);
    }

    #[test]
    fn test_new_child_frame_variadic() {
        let root = Env::new_root();
        let spec = Value::from_vec_with_tail(vec![Value::symbol("a")], Value::symbol("rest"));
        let formals = check_formals(&spec).unwrap();
        let frame = Env::new_child_frame(root, &formals, vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]).unwrap();
        assert_eq!(frame.borrow().get("rest").unwrap(), Value::from_vec(vec![Value::Integer(2), Value::Integer(3)]));
    }
}
