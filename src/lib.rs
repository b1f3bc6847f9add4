pub mod config;
pub mod interpreter;
pub mod logging;
pub mod reader;
pub mod repl;
