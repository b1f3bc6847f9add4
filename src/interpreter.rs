pub mod cps;
pub mod cps_json;

pub use cps::Interpreter;

use crate::interpreter::cps::{RuntimeError, Value};
use crate::reader::lexer;
use crate::reader::parser;

/// Reads source text into data ready for evaluation.
pub fn parse_code(src: &str) -> Result<Vec<Value>, RuntimeError> {
    let tokens = lexer::tokenize(src)?;
    let ast = parser::parse(&tokens)?;
    Ok(ast.iter().map(Value::from_node).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_code() {
        let exprs = parse_code("(define x 1) 'x").unwrap();
        assert_eq!(exprs.len(), 2);
        assert_eq!(exprs[1].to_string(), "(quote x)");
    }

    #[test]
    fn test_parse_code_syntax_error() {
        let err = parse_code("(+ 1 2))").unwrap_err();
        assert_eq!(err.kind, cps::ErrorKind::Syntax);
    }

    #[test]
    fn test_eval_str() {
        let interpreter = Interpreter::new();
        assert_eq!(interpreter.eval_str("(define (square x) (* x x)) (square 4)").unwrap().to_string(), "16");
        assert_eq!(interpreter.eval_str("(list 1 \"a\" 'b)").unwrap().to_string(), "(1 a b)");
    }
}
