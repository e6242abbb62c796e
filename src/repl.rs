//! Interactive read-eval-print loop.

use crate::ast::Statement;
use crate::compiler::Compiler;
use crate::evaluator;
use crate::object::{Env, Environment, Object};
use crate::parser::{self, ParseError};
use crate::vm::VM;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::path::PathBuf;
use std::rc::Rc;
use tracing::debug;

const PROMPT: &str = ">> ";
const HISTORY_FILE: &str = ".rhimeji_history";

/// Which backend executes each line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Engine {
    /// Tree-walking evaluator, supports the whole language
    #[default]
    Eval,
    /// Bytecode compiler and VM, arithmetic only
    Vm,
}

/// State that outlives a single line: the global environment for the evaluator and the
/// constant pool for the VM.
pub struct Session {
    engine: Engine,
    env: Env,
    constants: Vec<Rc<Object>>,
}

impl Session {
    pub fn new(engine: Engine) -> Self {
        Session {
            engine,
            env: Environment::new_shared(),
            constants: vec![],
        }
    }

    /// Runs one line of input and returns what should be shown to the user, if anything.
    pub fn eval_line(&mut self, line: &str) -> Option<String> {
        let program = match parser::parse(line) {
            Ok(program) => program,
            Err(errors) => return Some(format_parse_errors(&errors)),
        };

        match self.engine {
            Engine::Eval => {
                let result = evaluator::eval(&program, &self.env);
                if result.is_error() {
                    debug!(%result, "evaluation failed");
                }

                match program.statements.last() {
                    Some(Statement::Let(..)) if !result.is_error() => None,
                    _ => Some(result.to_string()),
                }
            }
            Engine::Vm => {
                let mut compiler = Compiler::new_with_state(std::mem::take(&mut self.constants));
                let compiled = compiler.compile(&program);
                self.constants = compiler.constants;

                match compiled {
                    Ok(bytecode) => match VM::new(bytecode).run() {
                        Ok(result) => Some(result.to_string()),
                        Err(err) => Some(format!("Whoops! Executing bytecode failed:\n\t{}", err)),
                    },
                    Err(err) => Some(format!("Whoops! Compilation failed:\n\t{}", err)),
                }
            }
        }
    }
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    let mut out = String::from("parser errors:");
    for error in errors {
        out.push_str("\n\t");
        out.push_str(&error.to_string());
    }
    out
}

pub struct Repl {
    editor: DefaultEditor,
    session: Session,
    history_path: Option<PathBuf>,
}

impl Repl {
    pub fn new(engine: Engine) -> RlResult<Self> {
        let mut repl = Repl {
            editor: DefaultEditor::new()?,
            session: Session::new(engine),
            history_path: std::env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(HISTORY_FILE)),
        };

        if let Some(ref path) = repl.history_path {
            let _ = repl.editor.load_history(path);
        }

        Ok(repl)
    }

    pub fn run(&mut self) -> RlResult<()> {
        debug!(engine = ?self.session.engine, "starting session");
        println!("Type :quit or press Ctrl-D to exit.");

        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();

                    if line.is_empty() {
                        continue;
                    }

                    let _ = self.editor.add_history_entry(line);

                    if line.starts_with(':') {
                        if handle_command(line) {
                            break;
                        }
                        continue;
                    }

                    if let Some(output) = self.session.eval_line(line) {
                        println!("{}", output);
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("Error: {}", err);
                    break;
                }
            }
        }

        if let Some(ref path) = self.history_path {
            let _ = self.editor.save_history(path);
        }

        Ok(())
    }
}

/// Returns true when the session should end.
fn handle_command(cmd: &str) -> bool {
    match cmd {
        ":quit" | ":q" => true,
        _ => {
            println!("Unknown command: {}", cmd);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run_lines(engine: Engine, lines: &[&str]) -> Vec<Option<String>> {
        let mut session = Session::new(engine);
        lines.iter().map(|line| session.eval_line(line)).collect()
    }

    #[test]
    fn bindings_persist_across_lines() {
        let outputs = run_lines(
            Engine::Eval,
            &[
                "let add = fn(a, b) { a + b };",
                "let x = 2",
                "add(x, 3)",
                "let y = 1; y",
            ],
        );

        assert_eq!(
            vec![None, None, Some("5".to_string()), Some("1".to_string())],
            outputs
        );
    }

    #[test]
    fn errors_are_displayed() {
        let outputs = run_lines(Engine::Eval, &["let x = ;", "foo", "1 + true"]);

        assert_eq!(
            vec![
                Some("parser errors:\n\tno prefix parse function for ; found".to_string()),
                Some("ERROR: identifier not found: foo".to_string()),
                Some("ERROR: type mismatch: INTEGER + BOOLEAN".to_string()),
            ],
            outputs
        );
    }

    #[test]
    fn errors_are_displayed_even_when_the_line_ends_in_let() {
        let outputs = run_lines(Engine::Eval, &["let x = foo;", "foo; let y = 1", "y"]);

        assert_eq!(
            vec![
                Some("ERROR: identifier not found: foo".to_string()),
                Some("ERROR: identifier not found: foo".to_string()),
                Some("ERROR: identifier not found: y".to_string()),
            ],
            outputs
        );
    }

    #[test]
    fn vm_engine() {
        let outputs = run_lines(Engine::Vm, &["1 + 2", "3 * 4", "true", "let a = 1;", "1 + false"]);

        assert_eq!(
            vec![
                Some("3".to_string()),
                Some("12".to_string()),
                Some("true".to_string()),
                Some("Whoops! Compilation failed:\n\tcompiling `let a = 1;` is not supported".to_string()),
                Some("Whoops! Executing bytecode failed:\n\ttype mismatch: INTEGER + BOOLEAN".to_string()),
            ],
            outputs
        );
    }

    #[test]
    fn commands() {
        assert!(handle_command(":quit"));
        assert!(handle_command(":q"));
        assert!(!handle_command(":nope"));
    }
}
