use std::process::ExitCode;
use std::thread;

use clap::Parser;
use tracing::{debug, error};

use mu_scheme::config::{Cli, Settings};
use mu_scheme::{logging, repl};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = match Settings::resolve(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("mu-scheme: {}", e);
            return ExitCode::from(2);
        }
    };
    // flushes the log file on exit
    let _guard = match logging::init(&settings.log) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("mu-scheme: {}", e);
            return ExitCode::from(2);
        }
    };
    debug!(?settings, "starting");

    // deeply nested data is read and printed recursively, so give the evaluator room
    let worker = thread::Builder::new()
        .name("evaluator".to_string())
        .stack_size(settings.stack_size())
        .spawn(move || repl::run(&settings, cli.file.as_deref(), cli.load, cli.quiet));
    let handle = match worker {
        Ok(handle) => handle,
        Err(e) => {
            error!("cannot spawn evaluator thread: {}", e);
            eprintln!("mu-scheme: cannot spawn evaluator thread: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match handle.join() {
        Ok(Ok(true)) => ExitCode::SUCCESS,
        Ok(Ok(false)) => ExitCode::FAILURE,
        Ok(Err(e)) => {
            eprintln!("mu-scheme: {}", e);
            ExitCode::FAILURE
        }
        Err(_) => {
            eprintln!("mu-scheme: evaluator thread panicked");
            ExitCode::FAILURE
        }
    }
}
