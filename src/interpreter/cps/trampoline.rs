use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::trace;

use crate::interpreter::cps::check::check_form;
use crate::interpreter::cps::cont::cont_special;
use crate::interpreter::cps::{Cont, EnvRef, Pair, Procedure, RuntimeError, Value, SPECIAL_FORMS};
use crate::{runtime_error, shift_or_error};

// how many steps pass between two deadline checks
const DEADLINE_CHECK_INTERVAL: u64 = 1024;

pub enum Trampoline {
    Bounce(Value, EnvRef),                   // evaluate the expression, hand the value to the top continuation
    QuasiquoteBounce(Value, usize, EnvRef), // walk quasiquoted data at the given nesting depth
    Run(Value),                              // hand a finished value to the top continuation
}

impl fmt::Debug for Trampoline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trampoline::Bounce(val, _) => write!(f, "Bounce({:?}, env)", val),
            Trampoline::QuasiquoteBounce(val, depth, _) => write!(f, "QuasiquoteBounce({:?}, {}, env)", val, depth),
            Trampoline::Run(val) => write!(f, "Run({:?})", val),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Limits {
    pub max_depth: usize,
    /// Builtins that re-enter the evaluator (`map`, `apply`, `eval`, `load`, ..)
    /// run a fresh trampoline on the host stack; this caps how many of those
    /// may be active at once.
    pub max_nesting: usize,
    pub deadline: Option<Instant>,
    pub interrupt: Arc<AtomicBool>,
}

/// Pending continuations of one evaluation.
///
/// Nested evaluations started by builtins get their own stack whose depth
/// starts where the caller's left off, so `max_depth` bounds the whole
/// top-level evaluation.
#[derive(Debug)]
pub struct Stack {
    conts: Vec<Cont>,
    base: usize,
    nesting: usize,
    steps: u64,
    limits: Limits,
}

impl Stack {
    pub fn new(limits: Limits) -> Stack {
        Stack {
            conts: Vec::new(),
            base: 0,
            nesting: 0,
            steps: 0,
            limits,
        }
    }

    pub fn nested(&self) -> Result<Stack, RuntimeError> {
        if self.nesting >= self.limits.max_nesting {
            runtime_error!(RecursionDepth, "maximum recursion depth exceeded (nested evaluation limit {})", self.limits.max_nesting)
        }
        Ok(Stack {
            conts: Vec::new(),
            base: self.depth() + 1,
            nesting: self.nesting + 1,
            steps: 0,
            limits: self.limits.clone(),
        })
    }

    pub fn depth(&self) -> usize { self.base + self.conts.len() }

    pub fn push(&mut self, k: Cont) -> Result<(), RuntimeError> {
        if self.depth() >= self.limits.max_depth {
            runtime_error!(RecursionDepth, "maximum recursion depth exceeded (limit {})", self.limits.max_depth)
        }
        self.conts.push(k);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Cont> { self.conts.pop() }

    fn tick(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;
        if self.limits.interrupt.swap(false, Ordering::Relaxed) {
            runtime_error!(Interrupted, "evaluation interrupted")
        }
        if self.steps % DEADLINE_CHECK_INTERVAL == 0 {
            if let Some(deadline) = self.limits.deadline {
                if Instant::now() >= deadline {
                    runtime_error!(Interrupted, "evaluation timed out")
                }
            }
        }
        Ok(())
    }
}

fn bounce_symbol(symbol: &str, env: &EnvRef) -> Result<Trampoline, RuntimeError> {
    let val = env.borrow().get(symbol)?;
    trace!("bounce symbol / {} => {:?}", symbol, val);
    Ok(Trampoline::Run(val))
}

fn bounce_pair(expr: &Value, pair: &Pair, env: EnvRef, stack: &mut Stack) -> Result<Trampoline, RuntimeError> {
    // special forms are looked up before the environment, so they cannot be shadowed
    if let Some(sf) = pair.first.as_symbol().and_then(|s| SPECIAL_FORMS.get(s)) {
        return cont_special(*sf, pair.second.clone(), env, stack);
    }
    if !pair.second.is_list() {
        runtime_error!(CannotEvaluate, "unable to evaluate expression {:?}", expr)
    }
    stack.push(Cont::EvalOperator(pair.second.clone(), env.clone()))?;
    Ok(Trampoline::Bounce(pair.first.clone(), env))
}

pub fn bounce(val: Value, env: EnvRef, stack: &mut Stack) -> Result<Trampoline, RuntimeError> {
    match val {
        Value::Symbol(ref s) => bounce_symbol(s, &env),
        Value::Pair(ref pair) => bounce_pair(&val, pair, env, stack),
        Value::Procedure(_) => runtime_error!(CannotEvaluate, "unable to evaluate expression {}", val),
        // numbers, booleans, strings, nil and undefined evaluate to themselves
        _ => Ok(Trampoline::Run(val)),
    }
}

/// `unquote` at depth 1 switches back to evaluation; nested `quasiquote`s
/// push the depth up so their unquotes stay literal.
pub fn quasiquote_bounce(val: Value, depth: usize, env: EnvRef, stack: &mut Stack) -> Result<Trampoline, RuntimeError> {
    let pair = match val {
        Value::Pair(ref pair) => pair.clone(),
        _ => return Ok(Trampoline::Run(val)),
    };

    let mut depth = depth;
    match pair.first.as_symbol() {
        Some("unquote") => {
            depth -= 1;
            if depth == 0 {
                check_form(&pair.second, 1, Some(1))?;
                let (operand, _) = shift_or_error!(pair.second, MalformedForm, "unquote needs an operand");
                return Ok(Trampoline::Bounce(operand, env));
            }
        }
        Some("quasiquote") => depth += 1,
        _ => {}
    }

    stack.push(Cont::QuasiquoteSecond(pair.second.clone(), depth, env.clone()))?;
    Ok(Trampoline::QuasiquoteBounce(pair.first.clone(), depth, env))
}

/// Runs the trampoline until the stack is empty and a value lands.
pub fn drive(start: Trampoline, stack: &mut Stack) -> Result<Value, RuntimeError> {
    let mut result = start;
    loop {
        stack.tick()?;
        trace!(depth = stack.depth(), "{:?}", result);
        result = match result {
            Trampoline::Bounce(val, env) => bounce(val, env, stack)?,
            Trampoline::QuasiquoteBounce(val, depth, env) => quasiquote_bounce(val, depth, env, stack)?,
            Trampoline::Run(val) => match stack.pop() {
                Some(k) => k.run(val, stack)?,
                None => return Ok(val),
            },
        };
    }
}

pub fn cps(expr: Value, env: EnvRef, stack: &mut Stack) -> Result<Value, RuntimeError> { drive(Trampoline::Bounce(expr, env), stack) }

/// Evaluates `expr` on a nested stack; used by builtins that re-enter the evaluator.
pub fn eval_nested(expr: Value, env: EnvRef, stack: &Stack) -> Result<Value, RuntimeError> {
    let mut nested = stack.nested()?;
    cps(expr, env, &mut nested)
}

/// Applies `procedure` on a nested stack and runs it to completion.
pub fn apply_nested(procedure: &Procedure, args: Vec<Value>, env: EnvRef, stack: &Stack) -> Result<Value, RuntimeError> {
    let mut nested = stack.nested()?;
    let start = procedure.apply(args, env, &mut nested)?;
    drive(start, &mut nested)
}
