use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::interpreter::cps::cont::eval_sequence;
use crate::interpreter::cps::env::{Env, EnvRef};
use crate::interpreter::cps::value::Value;
use crate::interpreter::cps::{ErrorKind, RuntimeError, Stack, Trampoline};

/// Parameter list of a user procedure.
#[derive(Clone, Debug, PartialEq)]
pub struct Formals {
    pub names: Vec<String>,
    pub rest: Option<String>,
}

impl Formals {
    pub fn accepts(&self, count: usize) -> bool {
        match self.rest {
            Some(_) => count >= self.names.len(),
            None => count == self.names.len(),
        }
    }

    pub fn arity(&self) -> String {
        match self.rest {
            Some(_) => format!("at least {}", self.names.len()),
            None => self.names.len().to_string(),
        }
    }

    pub fn to_value(&self) -> Value {
        let names = self.names.iter().map(|n| Value::symbol(n)).collect();
        match self.rest {
            Some(ref rest) => Value::from_vec_with_tail(names, Value::symbol(rest)),
            None => Value::from_vec(names),
        }
    }
}

impl fmt::Display for Formals {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.to_value()) }
}

pub type PlainFn = fn(Vec<Value>) -> Result<Value, RuntimeError>;
pub type EnvFn = fn(Vec<Value>, &EnvRef, &Stack) -> Result<Value, RuntimeError>;

/// Host function behind a builtin; `WithEnv` receives the caller's
/// environment and the evaluation stack so it can re-enter the evaluator.
#[derive(Clone, Copy)]
pub enum BuiltinFn {
    Plain(PlainFn),
    WithEnv(EnvFn),
}

#[derive(Clone)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

impl Builtin {
    /// Host failures surface as "invalid arguments"; errors raised by nested
    /// evaluation keep their own kind.
    fn call(&self, args: Vec<Value>, env: &EnvRef, stack: &Stack) -> Result<Value, RuntimeError> {
        let result = match self.func {
            BuiltinFn::Plain(f) => f(args),
            BuiltinFn::WithEnv(f) => f(args, env, stack),
        };
        result.map_err(|e| match e.kind {
            ErrorKind::InvalidArguments => RuntimeError::new(ErrorKind::InvalidArguments, format!("invalid arguments for {}: {}", self.name, e.message)),
            _ => e,
        })
    }
}

/// A closure over the environment it was defined in.
pub struct LambdaProcedure {
    pub formals: Formals,
    pub body: Value,
    pub env: EnvRef,
}

/// A dynamically scoped procedure: its frames hang off the caller's environment.
pub struct MuProcedure {
    pub formals: Formals,
    pub body: Value,
}

#[derive(Clone)]
pub enum Procedure {
    Builtin(Builtin),
    Lambda(Rc<LambdaProcedure>),
    Mu(Rc<MuProcedure>),
}

impl PartialEq for Procedure {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Procedure::Builtin(a), Procedure::Builtin(b)) => a.name == b.name,
            (Procedure::Lambda(a), Procedure::Lambda(b)) => Rc::ptr_eq(a, b),
            (Procedure::Mu(a), Procedure::Mu(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Procedure::Builtin(ref b) => write!(f, "#[{}]", b.name),
            Procedure::Lambda(ref l) => write!(f, "{}", Value::cons(Value::symbol("lambda"), Value::cons(l.formals.to_value(), l.body.clone()))),
            Procedure::Mu(ref m) => write!(f, "{}", Value::cons(Value::symbol("mu"), Value::cons(m.formals.to_value(), m.body.clone()))),
        }
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Procedure::Builtin(ref b) => write!(f, "#<procedure:{}>", b.name),
            Procedure::Lambda(_) => write!(f, "#<procedure>"),
            Procedure::Mu(_) => write!(f, "#<mu-procedure>"),
        }
    }
}

impl Procedure {
    pub fn builtin(name: &'static str, func: BuiltinFn) -> Procedure { Procedure::Builtin(Builtin { name, func }) }

    pub fn lambda(formals: Formals, body: Value, env: EnvRef) -> Procedure { Procedure::Lambda(Rc::new(LambdaProcedure { formals, body, env })) }

    pub fn mu(formals: Formals, body: Value) -> Procedure { Procedure::Mu(Rc::new(MuProcedure { formals, body })) }

    /// Applies the procedure to already evaluated arguments. `env` is the
    /// environment the call was evaluated in; only builtins that ask for it
    /// and mu procedures look at it.
    pub fn apply(&self, args: Vec<Value>, env: EnvRef, stack: &mut Stack) -> Result<Trampoline, RuntimeError> {
        debug!("apply {:?} to {} argument(s)", self, args.len());
        match self {
            Procedure::Builtin(b) => Ok(Trampoline::Run(b.call(args, &env, stack)?)),
            Procedure::Lambda(l) => {
                let frame = Env::new_child_frame(l.env.clone(), &l.formals, args)?;
                eval_sequence(l.body.clone(), frame, stack)
            }
            Procedure::Mu(m) => {
                let frame = Env::new_child_frame(env, &m.formals, args)?;
                eval_sequence(m.body.clone(), frame, stack)
            }
        }
    }
}
