use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use crossterm::style::Stylize;
use crossterm::tty::IsTty;
use reedline::{
    default_emacs_keybindings, ColumnarMenu, DefaultCompleter, Emacs, FileBackedHistory, KeyCode, KeyModifiers, MenuBuilder, Prompt, PromptEditMode, PromptHistorySearch,
    PromptHistorySearchStatus, Reedline, ReedlineEvent, ReedlineMenu, Signal, ValidationResult, Validator,
};
use tracing::{info, warn};

use crate::config::{Emit, Settings};
use crate::interpreter::cps::builtins::get_builtin_names;
use crate::interpreter::cps::{ErrorKind, Interpreter, RuntimeError, Value, SPECIAL_FORMS};
use crate::interpreter::{cps_json, parse_code};
use crate::reader;

const HISTORY_CAPACITY: usize = 1000;
const COMPLETION_MENU: &str = "completion_menu";

/// Keeps reedline reading lines until every list and string is closed.
struct BalancedParens;

impl Validator for BalancedParens {
    fn validate(&self, line: &str) -> ValidationResult {
        if reader::is_complete(line) {
            ValidationResult::Complete
        } else {
            ValidationResult::Incomplete
        }
    }
}

fn completion_words() -> Vec<String> {
    let mut words: Vec<String> = SPECIAL_FORMS.keys().map(|s| s.to_string()).chain(get_builtin_names().map(String::from)).collect();
    words.sort();
    words
}

/// Tab completes builtin and special form names.
fn line_editor() -> Reedline {
    let mut completer = DefaultCompleter::with_inclusions(&['-', '?', '!', '*', '<', '>', '=']).set_min_word_len(2);
    completer.insert(completion_words());
    let menu = ColumnarMenu::default().with_name(COMPLETION_MENU);
    let mut keybindings = default_emacs_keybindings();
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::UntilFound(vec![ReedlineEvent::Menu(COMPLETION_MENU.to_string()), ReedlineEvent::MenuNext]),
    );
    Reedline::create()
        .with_validator(Box::new(BalancedParens))
        .with_completer(Box::new(completer))
        .with_menu(ReedlineMenu::EngineCompleter(Box::new(menu)))
        .with_edit_mode(Box::new(Emacs::new(keybindings)))
}

struct SchemePrompt;

impl Prompt for SchemePrompt {
    fn render_prompt_left(&self) -> Cow<str> { Cow::Borrowed("scm") }

    fn render_prompt_right(&self) -> Cow<str> { Cow::Borrowed("") }

    fn render_prompt_indicator(&self, _mode: PromptEditMode) -> Cow<str> { Cow::Borrowed("> ") }

    fn render_prompt_multiline_indicator(&self) -> Cow<str> { Cow::Borrowed(".... ") }

    fn render_prompt_history_search_indicator(&self, search: PromptHistorySearch) -> Cow<str> {
        let prefix = match search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!("({}reverse-search: {}) ", prefix, search.term))
    }
}

struct Printer {
    emit: Emit,
    color: bool,
}

impl Printer {
    fn value(&self, val: &Value) {
        if *val == Value::Undefined {
            return;
        }
        match self.emit {
            Emit::Text => println!("{}", val),
            Emit::Json => match cps_json::serialize_value(val) {
                Ok(json) => println!("{}", json),
                Err(e) => self.line(format!("Error: {}", e)),
            },
        }
    }

    fn error(&self, err: &RuntimeError) {
        match err.kind {
            ErrorKind::Interrupted => self.line("KeyboardInterrupt".to_string()),
            _ => self.line(format!("Error: {}", err.message)),
        }
    }

    fn line(&self, line: String) {
        if self.color {
            println!("{}", line.red());
        } else {
            println!("{}", line);
        }
    }
}

/// One interpreter plus the way its results are shown.
pub struct Session {
    interpreter: Interpreter,
    printer: Printer,
    quiet: bool,
    history_file: Option<PathBuf>,
}

impl Session {
    pub fn new(settings: &Settings, quiet: bool) -> Session {
        Session {
            interpreter: Interpreter::with_limits(settings.max_depth, settings.timeout()).with_max_nesting(settings.max_nesting()),
            printer: Printer {
                emit: settings.emit,
                color: io::stdout().is_tty(),
            },
            quiet,
            history_file: settings.history_file.clone(),
        }
    }

    pub fn interpreter(&self) -> &Interpreter { &self.interpreter }

    /// Evaluates each expression of `src` in turn. A failing expression is
    /// reported and the rest still run, except after an interrupt, which
    /// abandons the remaining expressions. Returns whether all of them succeeded.
    pub fn run_source(&self, src: &str, quiet: bool) -> bool {
        let exprs = match parse_code(src) {
            Ok(exprs) => exprs,
            Err(e) => {
                self.printer.error(&e);
                return false;
            }
        };
        let mut ok = true;
        for expr in exprs {
            match self.interpreter.eval(expr) {
                Ok(val) if !quiet => self.printer.value(&val),
                Ok(_) => {}
                Err(e) => {
                    self.printer.error(&e);
                    if e.kind == ErrorKind::Interrupted {
                        return false;
                    }
                    ok = false;
                }
            }
        }
        ok
    }

    /// Routes SIGINT to the interpreter's interrupt flag, so Ctrl-C stops the
    /// running evaluation instead of the process.
    fn forward_ctrl_c(&self) {
        let flag = self.interpreter.interrupt_handle();
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
            warn!("cannot install Ctrl-C handler: {}", e);
        }
    }

    pub fn run_file(&self, path: &Path, quiet: bool) -> io::Result<bool> {
        info!("running {}", path.display());
        let src = fs::read_to_string(path)?;
        Ok(self.run_source(&src, quiet))
    }

    /// Reads from the terminal until Ctrl-D.
    pub fn interact(&self) -> io::Result<()> {
        let mut line_editor = line_editor();
        if let Some(ref path) = self.history_file {
            match FileBackedHistory::with_file(HISTORY_CAPACITY, path.clone()) {
                Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
                Err(e) => warn!("history file {} unavailable: {}", path.display(), e),
            }
        }

        let prompt = SchemePrompt;
        loop {
            match line_editor.read_line(&prompt)? {
                Signal::Success(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    // a Ctrl-C that arrived while no evaluation was running
                    self.interpreter.interrupt_handle().store(false, Ordering::Relaxed);
                    self.run_source(&line, self.quiet);
                }
                Signal::CtrlC => self.printer.line("KeyboardInterrupt".to_string()),
                Signal::CtrlD => {
                    println!();
                    return Ok(());
                }
                #[allow(unreachable_patterns)]
                _ => {}
            }
        }
    }
}

/// Runs `file` on its own, or with `load` set loads it quietly and then
/// goes interactive. Without a file it only goes interactive.
pub fn run(settings: &Settings, file: Option<&Path>, load: bool, quiet: bool) -> io::Result<bool> {
    let session = Session::new(settings, quiet);
    session.forward_ctrl_c();
    match file {
        Some(path) if !load => session.run_file(path, quiet),
        Some(path) => {
            session.run_file(path, true)?;
            session.interact()?;
            Ok(true)
        }
        None => {
            session.interact()?;
            Ok(true)
        }
    }
}
