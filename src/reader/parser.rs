use crate::interpreter::cps::RuntimeError;
use crate::reader::lexer::Token;
use crate::runtime_error;

// reading, converting and printing a datum recurse once per level
const MAX_NESTING: usize = 512;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Identifier(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    List(Vec<Node>),
    Dotted(Vec<Node>, Box<Node>), // (a b . c)
}

pub fn parse(tokens: &[Token]) -> Result<Vec<Node>, RuntimeError> {
    let mut parser = Parser { tokens, pos: 0, depth: 0 };
    let mut nodes = Vec::new();
    while let Some(node) = parser.next_node()? {
        nodes.push(node);
    }
    Ok(nodes)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn peek(&self) -> Option<&'a Token> { self.tokens.get(self.pos) }

    /// Reads the next datum, `None` once the tokens run out.
    fn next_node(&mut self) -> Result<Option<Node>, RuntimeError> {
        let token = match self.advance() {
            Some(token) => token,
            None => return Ok(None),
        };
        let node = match token {
            Token::LParen => self.nested(|p| p.parse_list())?,
            Token::RParen => runtime_error!(Syntax, "unexpected ')'"),
            Token::Dot => runtime_error!(Syntax, "unexpected '.'"),
            Token::Quote => self.nested(|p| p.parse_quoted("quote"))?,
            Token::Quasiquote => self.nested(|p| p.parse_quoted("quasiquote"))?,
            Token::Unquote => self.nested(|p| p.parse_quoted("unquote"))?,
            Token::Identifier(s) if s == "nil" => Node::List(vec![]),
            Token::Identifier(s) => Node::Identifier(s.clone()),
            Token::Integer(i) => Node::Integer(*i),
            Token::Float(f) => Node::Float(*f),
            Token::Boolean(b) => Node::Boolean(*b),
            Token::String(s) => Node::String(s.clone()),
        };
        Ok(Some(node))
    }

    fn nested<F>(&mut self, read: F) -> Result<Node, RuntimeError>
    where
        F: FnOnce(&mut Self) -> Result<Node, RuntimeError>,
    {
        if self.depth >= MAX_NESTING {
            runtime_error!(Syntax, "datum nested more than {} levels deep", MAX_NESTING)
        }
        self.depth += 1;
        let node = read(self);
        self.depth -= 1;
        node
    }

    fn expect_node(&mut self) -> Result<Node, RuntimeError> {
        match self.next_node()? {
            Some(node) => Ok(node),
            None => runtime_error!(UnexpectedEof, "unexpected end of input"),
        }
    }

    fn parse_quoted(&mut self, name: &str) -> Result<Node, RuntimeError> {
        let quoted = self.expect_node()?;
        Ok(Node::List(vec![Node::Identifier(name.to_string()), quoted]))
    }

    // the opening paren is already consumed
    fn parse_list(&mut self) -> Result<Node, RuntimeError> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None => runtime_error!(UnexpectedEof, "unexpected end of input, missing ')'"),
                Some(Token::RParen) => {
                    self.pos += 1;
                    return Ok(Node::List(items));
                }
                Some(Token::Dot) => {
                    self.pos += 1;
                    if items.is_empty() {
                        runtime_error!(Syntax, "unexpected '.'")
                    }
                    let tail = self.expect_node()?;
                    return match self.advance() {
                        Some(Token::RParen) => Ok(Node::Dotted(items, Box::new(tail))),
                        Some(_) => runtime_error!(Syntax, "expected one element after '.'"),
                        None => runtime_error!(UnexpectedEof, "unexpected end of input, missing ')'"),
                    };
                }
                Some(_) => items.push(self.expect_node()?),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::cps::ErrorKind;
    use crate::reader::lexer::tokenize;

    fn read(src: &str) -> Result<Vec<Node>, RuntimeError> { parse(&tokenize(src)?) }

    fn ident(s: &str) -> Node { Node::Identifier(s.to_string()) }

    #[test]
    fn test_nested_list() {
        let nodes = read("(define (f x) (* x 2))").unwrap();
        assert_eq!(
            nodes,
            vec![Node::List(vec![
                ident("define"),
                Node::List(vec![ident("f"), ident("x")]),
                Node::List(vec![ident("*"), ident("x"), Node::Integer(2)]),
            ])]
        );
    }

    #[test]
    fn test_quote_shorthands() {
        let nodes = read("'a `(b ,c)").unwrap();
        assert_eq!(nodes[0], Node::List(vec![ident("quote"), ident("a")]));
        assert_eq!(
            nodes[1],
            Node::List(vec![
                ident("quasiquote"),
                Node::List(vec![ident("b"), Node::List(vec![ident("unquote"), ident("c")])]),
            ])
        );
    }

    #[test]
    fn test_dotted() {
        let nodes = read("(1 2 . 3)").unwrap();
        assert_eq!(nodes, vec![Node::Dotted(vec![Node::Integer(1), Node::Integer(2)], Box::new(Node::Integer(3)))]);
    }

    #[test]
    fn test_nil() {
        assert_eq!(read("nil ()").unwrap(), vec![Node::List(vec![]), Node::List(vec![])]);
    }

    #[test]
    fn test_errors() {
        assert_eq!(read("(1 2").unwrap_err().kind, ErrorKind::UnexpectedEof);
        assert_eq!(read("'").unwrap_err().kind, ErrorKind::UnexpectedEof);
        assert_eq!(read(")").unwrap_err().kind, ErrorKind::Syntax);
        assert_eq!(read("(. 1)").unwrap_err().kind, ErrorKind::Syntax);
        assert_eq!(read("(1 . 2 3)").unwrap_err().kind, ErrorKind::Syntax);
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(read(&deep).unwrap().len(), 1);
        let too_deep = format!("{}1{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        let err = read(&too_deep).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert!(err.message.contains("512"), "{}", err.message);
        // quote marks nest too, and an unclosed deep datum is still an error, not incomplete
        assert_eq!(read(&format!("{}a", "'".repeat(MAX_NESTING + 1))).unwrap_err().kind, ErrorKind::Syntax);
        assert_eq!(read(&"(".repeat(MAX_NESTING + 1)).unwrap_err().kind, ErrorKind::Syntax);
    }
}
