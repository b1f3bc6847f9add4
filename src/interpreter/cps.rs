pub mod builtins;
pub mod check;
pub mod cont;
pub mod env;
pub mod error;
pub mod list;
pub mod procedure;
pub mod special;
pub mod trampoline;
pub mod value;


use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

pub use cont::Cont;
pub use env::{Env, EnvRef};
pub use error::{ErrorKind, RuntimeError};
pub use list::{ListIter, Pair};
pub use procedure::{Builtin, BuiltinFn, Formals, Procedure};
pub use special::{SpecialForm, SPECIAL_FORMS};
pub use trampoline::{Limits, Stack, Trampoline};
pub use value::Value;

use crate::interpreter::parse_code;

/// Continuations allowed on the stack before evaluation gives up.
pub const DEFAULT_MAX_DEPTH: usize = 100_000;

/// Builtin re-entries allowed at once; sized for a default 2 MiB thread stack.
pub const DEFAULT_MAX_NESTING: usize = 32;

/// Owns the global environment and the limits every top-level evaluation runs under.
#[derive(Clone)]
pub struct Interpreter {
    root: EnvRef,
    max_depth: usize,
    max_nesting: usize,
    timeout: Option<Duration>,
    interrupt: Arc<AtomicBool>,
}

impl Default for Interpreter {
    fn default() -> Self { Interpreter::new() }
}

impl Interpreter {
    pub fn new() -> Interpreter { Interpreter::with_limits(DEFAULT_MAX_DEPTH, None) }

    pub fn with_limits(max_depth: usize, timeout: Option<Duration>) -> Interpreter {
        let root = Env::new_root();
        builtins::install(&root);
        Interpreter {
            root,
            max_depth,
            max_nesting: DEFAULT_MAX_NESTING,
            timeout,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Raises the nesting cap for callers that run on a larger stack.
    pub fn with_max_nesting(mut self, max_nesting: usize) -> Interpreter {
        self.max_nesting = max_nesting;
        self
    }

    pub fn global(&self) -> EnvRef { self.root.clone() }

    /// Setting the returned flag aborts the running evaluation with a
    /// `KeyboardInterrupt`. The flag is cleared once the abort is observed.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> { self.interrupt.clone() }

    fn limits(&self) -> Limits {
        Limits {
            max_depth: self.max_depth,
            max_nesting: self.max_nesting,
            deadline: self.timeout.map(|t| Instant::now() + t),
            interrupt: self.interrupt.clone(),
        }
    }

    /// Evaluates one expression in the global environment.
    pub fn eval(&self, expr: Value) -> Result<Value, RuntimeError> {
        debug!("eval {}", expr);
        let mut stack = Stack::new(self.limits());
        let result = trampoline::cps(expr, self.root.clone(), &mut stack);
        if let Err(ref e) = result {
            if e.is_control() {
                warn!("evaluation aborted: {}", e);
                // a flag raised after the last tick must not leak into the next evaluation
                self.interrupt.store(false, Ordering::Relaxed);
            }
        }
        result
    }

    /// Evaluates the expressions in order and returns the value of the last one.
    pub fn run(&self, exprs: &[Value]) -> Result<Value, RuntimeError> {
        let mut last = Value::Undefined;
        for expr in exprs {
            last = self.eval(expr.clone())?;
        }
        Ok(last)
    }

    pub fn eval_str(&self, src: &str) -> Result<Value, RuntimeError> {
        let exprs = parse_code(src)?;
        info!("evaluating {} expression(s)", exprs.len());
        self.run(&exprs)
    }
}
