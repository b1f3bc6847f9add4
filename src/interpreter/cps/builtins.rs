use std::fs;
use std::path::PathBuf;

use tracing::info;

use crate::interpreter::cps::procedure::{BuiltinFn, EnvFn, PlainFn};
use crate::interpreter::cps::trampoline::{apply_nested, eval_nested};
use crate::interpreter::cps::{EnvRef, Procedure, RuntimeError, Stack, Value};
use crate::interpreter::parse_code;
use crate::runtime_error;

fn expect_args<const N: usize>(name: &str, args: Vec<Value>) -> Result<[Value; N], RuntimeError> {
    let count = args.len();
    match <[Value; N]>::try_from(args) {
        Ok(array) => Ok(array),
        Err(_) => runtime_error!(InvalidArguments, "`{}` takes {} argument(s), got {}", name, N, count),
    }
}

fn fold_numbers(args: Vec<Value>, init: Value, op: fn(Value, Value) -> Result<Value, RuntimeError>) -> Result<Value, RuntimeError> {
    args.into_iter().try_fold(init, op)
}

fn add(args: Vec<Value>) -> Result<Value, RuntimeError> { fold_numbers(args, Value::Integer(0), |acc, arg| acc + arg) }

fn mul(args: Vec<Value>) -> Result<Value, RuntimeError> { fold_numbers(args, Value::Integer(1), |acc, arg| acc * arg) }

fn sub(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let mut iter = args.into_iter();
    match (iter.next(), iter.len()) {
        (None, _) => runtime_error!(InvalidArguments, "`-` requires at least one argument"),
        (Some(val), 0) => -val,
        (Some(initial), _) => iter.try_fold(initial, |acc, arg| acc - arg),
    }
}

fn div(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let mut iter = args.into_iter();
    match (iter.next(), iter.len()) {
        (None, _) => runtime_error!(InvalidArguments, "`/` requires at least one argument"),
        (Some(val), 0) => Value::Integer(1) / val,
        (Some(initial), _) => iter.try_fold(initial, |acc, arg| acc / arg),
    }
}

fn integer_op(name: &str, args: Vec<Value>, op: fn(i64, i64) -> Option<i64>) -> Result<Value, RuntimeError> {
    let [a, b] = expect_args::<2>(name, args)?;
    let (a, b) = (a.into_integer()?, b.into_integer()?);
    match op(a, b) {
        Some(n) => Ok(Value::Integer(n)),
        None => runtime_error!(InvalidArguments, "`{}` of {} by {}", name, a, b),
    }
}

fn quotient(args: Vec<Value>) -> Result<Value, RuntimeError> { integer_op("quotient", args, i64::checked_div) }

fn remainder(args: Vec<Value>) -> Result<Value, RuntimeError> { integer_op("remainder", args, i64::checked_rem) }

fn modulo(args: Vec<Value>) -> Result<Value, RuntimeError> {
    integer_op("modulo", args, |a, b| {
        let r = a.checked_rem(b)?;
        Some(if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
    })
}

fn abs(args: Vec<Value>) -> Result<Value, RuntimeError> {
    match expect_args::<1>("abs", args)? {
        [Value::Integer(n)] => Ok(n.checked_abs().map(Value::Integer).unwrap_or(Value::Float((n as f64).abs()))),
        [Value::Float(f)] => Ok(Value::Float(f.abs())),
        [other] => runtime_error!(InvalidArguments, "expected a number: {:?}", other),
    }
}

fn compare(name: &str, args: Vec<Value>, holds: fn(f64, f64) -> bool) -> Result<Value, RuntimeError> {
    if args.len() < 2 {
        runtime_error!(InvalidArguments, "`{}` needs at least two arguments, got {}", name, args.len())
    }
    let numbers = args.into_iter().map(Value::into_float).collect::<Result<Vec<f64>, RuntimeError>>()?;
    Ok(Value::Boolean(numbers.windows(2).all(|w| holds(w[0], w[1]))))
}

fn num_eq(args: Vec<Value>) -> Result<Value, RuntimeError> { compare("=", args, |a, b| a == b) }

fn lt(args: Vec<Value>) -> Result<Value, RuntimeError> { compare("<", args, |a, b| a < b) }

fn gt(args: Vec<Value>) -> Result<Value, RuntimeError> { compare(">", args, |a, b| a > b) }

fn le(args: Vec<Value>) -> Result<Value, RuntimeError> { compare("<=", args, |a, b| a <= b) }

fn ge(args: Vec<Value>) -> Result<Value, RuntimeError> { compare(">=", args, |a, b| a >= b) }

fn predicate(name: &str, args: Vec<Value>, test: fn(&Value) -> bool) -> Result<Value, RuntimeError> {
    let [value] = expect_args::<1>(name, args)?;
    Ok(Value::Boolean(test(&value)))
}

fn is_null(args: Vec<Value>) -> Result<Value, RuntimeError> { predicate("null?", args, |v| matches!(v, Value::Nil)) }

fn is_pair(args: Vec<Value>) -> Result<Value, RuntimeError> { predicate("pair?", args, Value::is_pair) }

fn is_list(args: Vec<Value>) -> Result<Value, RuntimeError> { predicate("list?", args, Value::is_list) }

fn is_number(args: Vec<Value>) -> Result<Value, RuntimeError> { predicate("number?", args, Value::is_number) }

fn is_integer(args: Vec<Value>) -> Result<Value, RuntimeError> { predicate("integer?", args, |v| matches!(v, Value::Integer(_))) }

fn is_symbol(args: Vec<Value>) -> Result<Value, RuntimeError> { predicate("symbol?", args, |v| matches!(v, Value::Symbol(_))) }

fn is_string(args: Vec<Value>) -> Result<Value, RuntimeError> { predicate("string?", args, |v| matches!(v, Value::String(_))) }

fn is_boolean(args: Vec<Value>) -> Result<Value, RuntimeError> { predicate("boolean?", args, |v| matches!(v, Value::Boolean(_))) }

fn is_procedure(args: Vec<Value>) -> Result<Value, RuntimeError> { predicate("procedure?", args, |v| matches!(v, Value::Procedure(_))) }

fn not(args: Vec<Value>) -> Result<Value, RuntimeError> { predicate("not", args, |v| !v.is_true()) }

fn number_test(name: &str, args: Vec<Value>, test: fn(f64) -> bool) -> Result<Value, RuntimeError> {
    let [value] = expect_args::<1>(name, args)?;
    Ok(Value::Boolean(test(value.into_float()?)))
}

fn is_zero(args: Vec<Value>) -> Result<Value, RuntimeError> { number_test("zero?", args, |n| n == 0.0) }

fn is_even(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let [value] = expect_args::<1>("even?", args)?;
    Ok(Value::Boolean(value.into_integer()? % 2 == 0))
}

fn is_odd(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let [value] = expect_args::<1>("odd?", args)?;
    Ok(Value::Boolean(value.into_integer()? % 2 != 0))
}

fn is_eq(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let [a, b] = expect_args::<2>("eq?", args)?;
    let same = match (&a, &b) {
        (Value::Pair(x), Value::Pair(y)) => std::rc::Rc::ptr_eq(x, y),
        _ => a == b,
    };
    Ok(Value::Boolean(same))
}

fn is_equal(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let [a, b] = expect_args::<2>("equal?", args)?;
    Ok(Value::Boolean(a == b))
}

fn cons(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let [first, second] = expect_args::<2>("cons", args)?;
    Ok(Value::cons(first, second))
}

fn car(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let [list] = expect_args::<1>("car", args)?;
    match list.shift() {
        Some((car, _)) => Ok(car),
        None => runtime_error!(InvalidArguments, "can't run car on {:?}", list),
    }
}

fn cdr(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let [list] = expect_args::<1>("cdr", args)?;
    match list.shift() {
        Some((_, cdr)) => Ok(cdr),
        None => runtime_error!(InvalidArguments, "can't run cdr on {:?}", list),
    }
}

fn list(args: Vec<Value>) -> Result<Value, RuntimeError> { Ok(Value::from_vec(args)) }

fn length(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let [list] = expect_args::<1>("length", args)?;
    match list.list_len() {
        Some(len) => Ok(Value::Integer(len as i64)),
        None => runtime_error!(InvalidArguments, "expected a proper list: {:?}", list),
    }
}

/// (append list ... last); the last argument is shared, not copied
fn append(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let mut iter = args.into_iter().rev();
    let last = iter.next().unwrap_or(Value::Nil);
    iter.try_fold(last, |acc, list| Ok(Value::from_vec_with_tail(list.list_to_vec()?, acc)))
}

fn error(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let message = args.iter().map(|v| v.to_string()).collect::<Vec<String>>().join(" ");
    runtime_error!(User, "{}", message)
}

fn display(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let [val] = expect_args::<1>("display", args)?;
    print!("{}", val);
    Ok(Value::Undefined)
}

fn displayln(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let [val] = expect_args::<1>("displayln", args)?;
    println!("{}", val);
    Ok(Value::Undefined)
}

fn print(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let [val] = expect_args::<1>("print", args)?;
    println!("{:?}", val);
    Ok(Value::Undefined)
}

fn newline(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let [] = expect_args::<0>("newline", args)?;
    println!();
    Ok(Value::Undefined)
}

/// (eval expr) evaluates data as code in the caller's environment
fn eval(args: Vec<Value>, env: &EnvRef, stack: &Stack) -> Result<Value, RuntimeError> {
    let [expr] = expect_args::<1>("eval", args)?;
    eval_nested(expr, env.clone(), stack)
}

/// (apply proc args)
fn apply(args: Vec<Value>, env: &EnvRef, stack: &Stack) -> Result<Value, RuntimeError> {
    let [f, list] = expect_args::<2>("apply", args)?;
    let f = f.into_procedure()?;
    apply_nested(&f, list.list_to_vec()?, env.clone(), stack)
}

fn map(args: Vec<Value>, env: &EnvRef, stack: &Stack) -> Result<Value, RuntimeError> {
    let [f, list] = expect_args::<2>("map", args)?;
    let f = f.into_procedure()?;
    let mapped = list
        .list_to_vec()?
        .into_iter()
        .map(|item| apply_nested(&f, vec![item], env.clone(), stack))
        .collect::<Result<Vec<Value>, RuntimeError>>()?;
    Ok(Value::from_vec(mapped))
}

fn filter(args: Vec<Value>, env: &EnvRef, stack: &Stack) -> Result<Value, RuntimeError> {
    let [f, list] = expect_args::<2>("filter", args)?;
    let f = f.into_procedure()?;
    let mut kept = Vec::new();
    for item in list.list_to_vec()? {
        if apply_nested(&f, vec![item.clone()], env.clone(), stack)?.is_true() {
            kept.push(item);
        }
    }
    Ok(Value::from_vec(kept))
}

fn reduce(args: Vec<Value>, env: &EnvRef, stack: &Stack) -> Result<Value, RuntimeError> {
    let [f, list] = expect_args::<2>("reduce", args)?;
    let f = f.into_procedure()?;
    let mut iter = list.list_to_vec()?.into_iter();
    let initial = match iter.next() {
        Some(initial) => initial,
        None => runtime_error!(InvalidArguments, "cannot reduce an empty list"),
    };
    iter.try_fold(initial, |acc, item| apply_nested(&f, vec![acc, item], env.clone(), stack))
}

/// (load 'name) or (load "name") reads `name`, falling back to `name.scm`,
/// and evaluates every expression in the caller's environment.
fn load(args: Vec<Value>, env: &EnvRef, stack: &Stack) -> Result<Value, RuntimeError> {
    let [target] = expect_args::<1>("load", args)?;
    let name = match target {
        Value::Symbol(s) | Value::String(s) => s,
        other => runtime_error!(InvalidArguments, "expected a file name: {:?}", other),
    };

    let mut candidates = vec![PathBuf::from(&name)];
    if !name.ends_with(".scm") {
        candidates.push(PathBuf::from(format!("{}.scm", name)));
    }
    let src = match candidates.iter().find_map(|path| fs::read_to_string(path).ok()) {
        Some(src) => src,
        None => runtime_error!(Io, "cannot open {}", name),
    };

    info!("loading {}", name);
    for expr in parse_code(&src)? {
        eval_nested(expr, env.clone(), stack)?;
    }
    Ok(Value::Undefined)
}

static PLAIN_BUILTINS: &[(&str, PlainFn)] = &[
    ("+", add),
    ("-", sub),
    ("*", mul),
    ("/", div),
    ("quotient", quotient),
    ("remainder", remainder),
    ("modulo", modulo),
    ("abs", abs),
    ("=", num_eq),
    ("<", lt),
    (">", gt),
    ("<=", le),
    (">=", ge),
    ("null?", is_null),
    ("pair?", is_pair),
    ("list?", is_list),
    ("number?", is_number),
    ("integer?", is_integer),
    ("symbol?", is_symbol),
    ("string?", is_string),
    ("boolean?", is_boolean),
    ("procedure?", is_procedure),
    ("zero?", is_zero),
    ("even?", is_even),
    ("odd?", is_odd),
    ("not", not),
    ("eq?", is_eq),
    ("equal?", is_equal),
    ("cons", cons),
    ("car", car),
    ("cdr", cdr),
    ("list", list),
    ("length", length),
    ("append", append),
    ("error", error),
    ("display", display),
    ("displayln", displayln),
    ("print", print),
    ("newline", newline),
];

static ENV_BUILTINS: &[(&str, EnvFn)] = &[
    ("eval", eval),
    ("apply", apply),
    ("map", map),
    ("filter", filter),
    ("reduce", reduce),
    ("load", load),
];

pub fn get_builtin_names() -> impl Iterator<Item = &'static str> { PLAIN_BUILTINS.iter().map(|(name, _)| *name).chain(ENV_BUILTINS.iter().map(|(name, _)| *name)) }

/// Seeds a global frame with the builtin catalog and `undefined`.
pub fn install(env: &EnvRef) {
    let mut env = env.borrow_mut();
    for &(name, f) in PLAIN_BUILTINS {
        env.define(name.into(), Value::Procedure(Procedure::builtin(name, BuiltinFn::Plain(f))));
    }
    for &(name, f) in ENV_BUILTINS {
        env.define(name.into(), Value::Procedure(Procedure::builtin(name, BuiltinFn::WithEnv(f))));
    }
    env.define("undefined".into(), Value::Undefined);
}
