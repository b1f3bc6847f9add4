pub mod lexer;
pub mod parser;

use crate::interpreter::cps::ErrorKind;

/// Whether `src` holds only whole expressions. Input that breaks off in the
/// middle of a list or string is incomplete; any other syntax error counts as
/// complete so the evaluator gets to report it.
pub fn is_complete(src: &str) -> bool {
    let tokens = match lexer::tokenize(src) {
        Ok(tokens) => tokens,
        Err(e) => return e.kind != ErrorKind::UnexpectedEof,
    };
    match parser::parse(&tokens) {
        Ok(_) => true,
        Err(e) => e.kind != ErrorKind::UnexpectedEof,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_complete() {
        assert!(is_complete(""));
        assert!(is_complete("(+ 1 2)"));
        assert!(is_complete("(+ 1 2))"));
        assert!(!is_complete("(define (f x)"));
        assert!(!is_complete("'"));
        assert!(!is_complete("(display \"abc"));
        assert!(is_complete("; only a comment"));
    }
}
