use std::iter::Peekable;
use std::str::Chars;

use crate::interpreter::cps::RuntimeError;
use crate::runtime_error;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    Quote,
    Quasiquote,
    Unquote,
    Dot,
    Identifier(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
}

fn is_delimiter(c: char) -> bool { c.is_whitespace() || matches!(c, '(' | ')' | '\'' | '`' | ',' | '"' | ';') }

pub fn tokenize(src: &str) -> Result<Vec<Token>, RuntimeError> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            ';' => {
                // comment runs to end of line
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '\'' => {
                chars.next();
                tokens.push(Token::Quote);
            }
            '`' => {
                chars.next();
                tokens.push(Token::Quasiquote);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Unquote);
            }
            '"' => {
                chars.next();
                tokens.push(Token::String(read_string(&mut chars)?));
            }
            _ => {
                let mut atom = String::new();
                while let Some(&c) = chars.peek() {
                    if is_delimiter(c) {
                        break;
                    }
                    atom.push(c);
                    chars.next();
                }
                tokens.push(classify(&atom)?);
            }
        }
    }
    Ok(tokens)
}

fn read_string(chars: &mut Peekable<Chars>) -> Result<String, RuntimeError> {
    let mut s = String::new();
    loop {
        match chars.next() {
            Some('"') => return Ok(s),
            Some('\\') => match chars.next() {
                Some('n') => s.push('\n'),
                Some('t') => s.push('\t'),
                Some('r') => s.push('\r'),
                Some('\\') => s.push('\\'),
                Some('"') => s.push('"'),
                Some(c) => runtime_error!(Syntax, "unknown escape sequence: \\{}", c),
                None => runtime_error!(UnexpectedEof, "unterminated string"),
            },
            Some(c) => s.push(c),
            None => runtime_error!(UnexpectedEof, "unterminated string"),
        }
    }
}

// "inf", "nan" and friends parse as f64 but read as symbols
fn looks_numeric(atom: &str) -> bool {
    atom.chars().any(|c| c.is_ascii_digit()) && atom.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
}

fn classify(atom: &str) -> Result<Token, RuntimeError> {
    let token = match atom {
        "." => Token::Dot,
        "#t" | "true" => Token::Boolean(true),
        "#f" | "false" => Token::Boolean(false),
        s if s.starts_with('#') => runtime_error!(Syntax, "invalid token: {}", s),
        s => {
            if let Ok(i) = s.parse::<i64>() {
                Token::Integer(i)
            } else if looks_numeric(s) {
                match s.parse::<f64>() {
                    Ok(f) => Token::Float(f),
                    Err(_) => Token::Identifier(s.to_string()),
                }
            } else {
                Token::Identifier(s.to_string())
            }
        }
    };
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::cps::ErrorKind;

    fn ident(s: &str) -> Token { Token::Identifier(s.to_string()) }

    #[test]
    fn test_simple() {
        let tokens = tokenize("(+ 1 2)").unwrap();
        assert_eq!(tokens, vec![Token::LParen, ident("+"), Token::Integer(1), Token::Integer(2), Token::RParen]);
    }

    #[test]
    fn test_atoms() {
        let tokens = tokenize("-5 2.5 1e3 #t #f true false hello-World -").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Integer(-5),
                Token::Float(2.5),
                Token::Float(1000.0),
                Token::Boolean(true),
                Token::Boolean(false),
                Token::Boolean(true),
                Token::Boolean(false),
                ident("hello-World"),
                ident("-"),
            ]
        );
    }

    #[test]
    fn test_inf_is_symbol() {
        assert_eq!(tokenize("inf nan").unwrap(), vec![ident("inf"), ident("nan")]);
    }

    #[test]
    fn test_big_integer_reads_as_float() {
        assert_eq!(tokenize("99999999999999999999").unwrap(), vec![Token::Float(1e20)]);
    }

    #[test]
    fn test_quote_marks() {
        let tokens = tokenize("'a `(b ,c) (d . e)").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Quote,
                ident("a"),
                Token::Quasiquote,
                Token::LParen,
                ident("b"),
                Token::Unquote,
                ident("c"),
                Token::RParen,
                Token::LParen,
                ident("d"),
                Token::Dot,
                ident("e"),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_strings_and_comments() {
        let tokens = tokenize("\"a\\n\\\"b\\\"\" ; trailing comment\nx").unwrap();
        assert_eq!(tokens, vec![Token::String("a\n\"b\"".to_string()), ident("x")]);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("\"abc").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_bad_hash_token() {
        let err = tokenize("#x").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
    }
}
