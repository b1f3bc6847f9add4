use std::fmt;

use tracing::debug;

use crate::interpreter::cps::check::{check_form, check_formals};
use crate::interpreter::cps::{Env, EnvRef, Formals, Procedure, RuntimeError, SpecialForm, Stack, Trampoline, Value};
use crate::{runtime_error, shift_or_error};

pub enum Cont {
    // remaining body expressions, environment
    EvalSequence(Value, EnvRef),

    // operand expressions waiting for the operator value
    EvalOperator(Value, EnvRef),
    // procedure, remaining operands, evaluated arguments, environment
    EvalArgs(Procedure, Value, Vec<Value>, EnvRef),

    // then branch, optional else branch, environment
    EvalIf(Value, Option<Value>, EnvRef),
    EvalAnd(Value, EnvRef),
    EvalOr(Value, EnvRef),
    // clause body, remaining clauses, environment
    EvalCond(Value, Value, EnvRef),
    // names, remaining initializers, evaluated initializers, body, outer environment
    EvalLet(Formals, Value, Vec<Value>, Value, EnvRef),
    EvalDefine(String, EnvRef),

    // cdr still to walk, depth, environment
    QuasiquoteSecond(Value, usize, EnvRef),
    // walked car waiting for its cdr
    QuasiquotePair(Value),
}

impl fmt::Debug for Cont {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cont::EvalSequence(rest, _) => write!(f, "<EvalSequence {:?}>", rest),
            Cont::EvalOperator(operands, _) => write!(f, "<EvalOperator {:?}>", operands),
            Cont::EvalArgs(pr, rest, acc, _) => write!(f, "<EvalArgs {:?} rest={:?} acc={}>", pr, rest, acc.len()),
            Cont::EvalIf(then_expr, else_expr, _) => write!(f, "<EvalIf then={:?} else={:?}>", then_expr, else_expr),
            Cont::EvalAnd(rest, _) => write!(f, "<EvalAnd {:?}>", rest),
            Cont::EvalOr(rest, _) => write!(f, "<EvalOr {:?}>", rest),
            Cont::EvalCond(_, rest, _) => write!(f, "<EvalCond rest={:?}>", rest),
            Cont::EvalLet(formals, rest, _, _, _) => write!(f, "<EvalLet {} rest={:?}>", formals, rest),
            Cont::EvalDefine(name, _) => write!(f, "<EvalDefine {}>", name),
            Cont::QuasiquoteSecond(rest, depth, _) => write!(f, "<QuasiquoteSecond {:?} depth={}>", rest, depth),
            Cont::QuasiquotePair(first) => write!(f, "<QuasiquotePair {:?}>", first),
        }
    }
}

/// Evaluates a body in order and returns the last value; the last
/// expression runs in tail position.
pub fn eval_sequence(body: Value, env: EnvRef, stack: &mut Stack) -> Result<Trampoline, RuntimeError> {
    match body.shift() {
        None => Ok(Trampoline::Run(Value::Undefined)),
        Some((first, rest)) => {
            if !matches!(rest, Value::Nil) {
                stack.push(Cont::EvalSequence(rest, env.clone()))?;
            }
            Ok(Trampoline::Bounce(first, env))
        }
    }
}

fn eval_operands(f: Procedure, rest: Value, acc: Vec<Value>, env: EnvRef, stack: &mut Stack) -> Result<Trampoline, RuntimeError> {
    match rest.shift() {
        Some((car, cdr)) => {
            stack.push(Cont::EvalArgs(f, cdr, acc, env.clone()))?;
            Ok(Trampoline::Bounce(car, env))
        }
        None => f.apply(acc, env, stack),
    }
}

fn eval_and(rest: Value, env: EnvRef, stack: &mut Stack) -> Result<Trampoline, RuntimeError> {
    match rest.shift() {
        None => Ok(Trampoline::Run(Value::Boolean(true))),
        Some((car, Value::Nil)) => Ok(Trampoline::Bounce(car, env)),
        Some((car, cdr)) => {
            stack.push(Cont::EvalAnd(cdr, env.clone()))?;
            Ok(Trampoline::Bounce(car, env))
        }
    }
}

fn eval_or(rest: Value, env: EnvRef, stack: &mut Stack) -> Result<Trampoline, RuntimeError> {
    match rest.shift() {
        None => Ok(Trampoline::Run(Value::Boolean(false))),
        Some((car, Value::Nil)) => Ok(Trampoline::Bounce(car, env)),
        Some((car, cdr)) => {
            stack.push(Cont::EvalOr(cdr, env.clone()))?;
            Ok(Trampoline::Bounce(car, env))
        }
    }
}

fn is_else_clause(clause: &Value) -> bool {
    match clause {
        Value::Pair(pair) => pair.first.as_symbol() == Some("else"),
        _ => false,
    }
}

fn eval_cond(clauses: Value, env: EnvRef, stack: &mut Stack) -> Result<Trampoline, RuntimeError> {
    let (clause, remaining) = match clauses.shift() {
        Some(pair) => pair,
        None => return Ok(Trampoline::Run(Value::Undefined)),
    };
    let (test, body) = shift_or_error!(clause, MalformedForm, "empty cond clause");
    if test.as_symbol() == Some("else") {
        return match body {
            Value::Nil => Ok(Trampoline::Run(Value::Boolean(true))),
            body => eval_sequence(body, env, stack),
        };
    }
    stack.push(Cont::EvalCond(body, remaining, env.clone()))?;
    Ok(Trampoline::Bounce(test, env))
}

fn eval_let(formals: Formals, inits: Value, values: Vec<Value>, body: Value, env: EnvRef, stack: &mut Stack) -> Result<Trampoline, RuntimeError> {
    match inits.shift() {
        Some((init, remaining)) => {
            stack.push(Cont::EvalLet(formals, remaining, values, body, env.clone()))?;
            Ok(Trampoline::Bounce(init, env))
        }
        None => {
            let frame = Env::new_child_frame(env, &formals, values)?;
            eval_sequence(body, frame, stack)
        }
    }
}

/// Two shapes of define:
/// 1. (define name value)
///    (define x 42)            ; => x
/// 2. (define (name . formals) body...), sugar for binding a lambda
///
///    (define (add x y)
///      (+ x y))               ; => add
///
///    (define (sum . numbers)
///      (reduce + numbers))
fn cont_special_define(rest: Value, env: EnvRef, stack: &mut Stack) -> Result<Trampoline, RuntimeError> {
    check_form(&rest, 2, None)?;
    let (target, tail) = shift_or_error!(rest, MalformedForm, "define needs a target");
    match target {
        Value::Symbol(name) => {
            check_form(&rest, 2, Some(2))?;
            let (expr, _) = shift_or_error!(tail, MalformedForm, "define needs a value");
            stack.push(Cont::EvalDefine(name, env.clone()))?;
            Ok(Trampoline::Bounce(expr, env))
        }
        Value::Pair(ref signature) => {
            let name = match signature.first.as_symbol() {
                Some(name) => name.to_string(),
                None => runtime_error!(MalformedForm, "non-symbol procedure name: {:?}", signature.first),
            };
            let formals = check_formals(&signature.second)?;
            let f = Procedure::lambda(formals, tail, env.clone());
            env.borrow_mut().define(name.clone(), Value::Procedure(f));
            Ok(Trampoline::Run(Value::Symbol(name)))
        }
        _ => runtime_error!(MalformedForm, "non-symbol: {:?}", target),
    }
}

fn cont_special_if(rest: Value, env: EnvRef, stack: &mut Stack) -> Result<Trampoline, RuntimeError> {
    check_form(&rest, 2, Some(3))?;
    let operands: Vec<Value> = rest.iter().cloned().collect();
    let (cond, then_expr, else_expr) = match operands.as_slice() {
        [cond, then_expr] => (cond.clone(), then_expr.clone(), None),
        [cond, then_expr, else_expr] => (cond.clone(), then_expr.clone(), Some(else_expr.clone())),
        _ => runtime_error!(MalformedForm, "badly formed if: {:?}", rest),
    };
    stack.push(Cont::EvalIf(then_expr, else_expr, env.clone()))?;
    Ok(Trampoline::Bounce(cond, env))
}

fn cont_special_cond(rest: Value, env: EnvRef, stack: &mut Stack) -> Result<Trampoline, RuntimeError> {
    let count = check_form(&rest, 0, None)?;
    // validate every clause before any test runs
    for (i, clause) in rest.iter().enumerate() {
        check_form(clause, 1, None)?;
        if is_else_clause(clause) && i + 1 < count {
            runtime_error!(MalformedForm, "else must be the last cond clause: {:?}", clause)
        }
    }
    eval_cond(rest, env, stack)
}

fn cont_special_let(rest: Value, env: EnvRef, stack: &mut Stack) -> Result<Trampoline, RuntimeError> {
    check_form(&rest, 2, None)?;
    let (bindings, body) = shift_or_error!(rest, MalformedForm, "let needs bindings");
    if !bindings.is_list() {
        runtime_error!(MalformedForm, "improper syntax for let bindings: {:?}", bindings)
    }

    let mut names = Vec::new();
    let mut inits = Vec::new();
    for binding in bindings.iter() {
        check_form(binding, 2, Some(2))?;
        let (name, tail) = shift_or_error!(binding, MalformedForm, "empty let binding");
        let (init, _) = shift_or_error!(tail, MalformedForm, "let binding needs a value");
        names.push(name);
        inits.push(init);
    }
    // duplicate or non-symbol names fail here, before any initializer runs
    let formals = check_formals(&Value::from_vec(names))?;
    eval_let(formals, Value::from_vec(inits), Vec::new(), body, env, stack)
}

fn cont_special_lambda(rest: Value, env: EnvRef) -> Result<Trampoline, RuntimeError> {
    check_form(&rest, 2, None)?;
    let (formals, body) = shift_or_error!(rest, MalformedForm, "lambda needs formals");
    let f = Procedure::lambda(check_formals(&formals)?, body, env);
    Ok(Trampoline::Run(Value::Procedure(f)))
}

fn cont_special_mu(rest: Value) -> Result<Trampoline, RuntimeError> {
    check_form(&rest, 2, None)?;
    let (formals, body) = shift_or_error!(rest, MalformedForm, "mu needs formals");
    let f = Procedure::mu(check_formals(&formals)?, body);
    Ok(Trampoline::Run(Value::Procedure(f)))
}

fn single_operand(rest: Value) -> Result<Value, RuntimeError> {
    check_form(&rest, 1, Some(1))?;
    let (operand, _) = shift_or_error!(rest, MalformedForm, "expected one operand");
    Ok(operand)
}

pub fn cont_special(sf: SpecialForm, rest: Value, env: EnvRef, stack: &mut Stack) -> Result<Trampoline, RuntimeError> {
    debug!("SpecialForm / {:?} {:?}", sf, rest);
    match sf {
        SpecialForm::Define => cont_special_define(rest, env, stack),

        SpecialForm::Quote => Ok(Trampoline::Run(single_operand(rest)?)),
        SpecialForm::Quasiquote => Ok(Trampoline::QuasiquoteBounce(single_operand(rest)?, 1, env)),
        SpecialForm::Unquote => runtime_error!(UnexpectedUnquote, "unexpected unquote: {:?}", Value::cons(Value::symbol("unquote"), rest)),

        SpecialForm::Begin => {
            check_form(&rest, 0, None)?;
            eval_sequence(rest, env, stack)
        }

        SpecialForm::Lambda => cont_special_lambda(rest, env),
        SpecialForm::Mu => cont_special_mu(rest),

        SpecialForm::If => cont_special_if(rest, env, stack),
        SpecialForm::And => {
            check_form(&rest, 0, None)?;
            eval_and(rest, env, stack)
        }
        SpecialForm::Or => {
            check_form(&rest, 0, None)?;
            eval_or(rest, env, stack)
        }
        SpecialForm::Cond => cont_special_cond(rest, env, stack),
        SpecialForm::Let => cont_special_let(rest, env, stack),
    }
}

impl Cont {
    pub fn run(self, val: Value, stack: &mut Stack) -> Result<Trampoline, RuntimeError> {
        match self {
            // the value of every body expression but the last is dropped
            Cont::EvalSequence(rest, env) => eval_sequence(rest, env, stack),

            Cont::EvalOperator(operands, env) => eval_operands(val.into_procedure()?, operands, Vec::new(), env, stack),
            Cont::EvalArgs(f, rest, mut acc, env) => {
                acc.push(val);
                eval_operands(f, rest, acc, env, stack)
            }

            Cont::EvalIf(then_expr, else_expr, env) => match (val.is_true(), else_expr) {
                (true, _) => Ok(Trampoline::Bounce(then_expr, env)),
                (false, Some(else_expr)) => Ok(Trampoline::Bounce(else_expr, env)),
                (false, None) => Ok(Trampoline::Run(Value::Undefined)),
            },

            Cont::EvalAnd(rest, env) => match val.is_true() {
                false => Ok(Trampoline::Run(Value::Boolean(false))),
                true => eval_and(rest, env, stack),
            },
            Cont::EvalOr(rest, env) => match val.is_true() {
                true => Ok(Trampoline::Run(val)),
                false => eval_or(rest, env, stack),
            },

            Cont::EvalCond(body, remaining, env) => match (val.is_true(), body) {
                (true, Value::Nil) => Ok(Trampoline::Run(val)),
                (true, body) => eval_sequence(body, env, stack),
                (false, _) => eval_cond(remaining, env, stack),
            },

            Cont::EvalLet(formals, remaining, mut values, body, env) => {
                values.push(val);
                eval_let(formals, remaining, values, body, env, stack)
            }

            // (define name value) binds in the current frame and echoes the name
            Cont::EvalDefine(name, env) => {
                env.borrow_mut().define(name.clone(), val);
                Ok(Trampoline::Run(Value::Symbol(name)))
            }

            Cont::QuasiquoteSecond(rest, depth, env) => {
                stack.push(Cont::QuasiquotePair(val))?;
                Ok(Trampoline::QuasiquoteBounce(rest, depth, env))
            }
            Cont::QuasiquotePair(first) => Ok(Trampoline::Run(Value::cons(first, val))),
        }
    }
}
