use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnknownIdentifier,
    NotCallable,
    CannotEvaluate,
    MalformedForm,
    MalformedFormals,
    Arity,
    InvalidArguments,
    RecursionDepth,
    UnexpectedUnquote,
    User, // raised by (error ...)
    Interrupted,
    Syntax,
    UnexpectedEof,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ErrorKind::Syntax | ErrorKind::UnexpectedEof => "SyntaxError",
            ErrorKind::RecursionDepth => "RecursionError",
            ErrorKind::Interrupted => "KeyboardInterrupt",
            ErrorKind::Io => "IOError",
            _ => "SchemeError",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> RuntimeError {
        RuntimeError {
            kind,
            message: message.into(),
        }
    }

    /// Failures that must keep their identity when they cross a builtin boundary.
    pub fn is_control(&self) -> bool { matches!(self.kind, ErrorKind::RecursionDepth | ErrorKind::Interrupted) }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}: {}", self.kind, self.message) }
}

impl std::error::Error for RuntimeError {}

#[macro_export]
macro_rules! runtime_error {
    ($kind:ident, $($arg:tt)*) => (
        return Err($crate::interpreter::cps::RuntimeError::new(
            $crate::interpreter::cps::ErrorKind::$kind,
            format!($($arg)*),
        ))
    )
}
