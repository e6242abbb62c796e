use clap::{Parser, Subcommand};
use rhimeji::compiler::{Bytecode, BytecodeError, Compiler, CompilerError};
use rhimeji::evaluator;
use rhimeji::object::{Environment, Object};
use rhimeji::parser::{self, ParseError};
use rhimeji::repl::{Engine, Repl};
use rhimeji::vm::{VMError, VM};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;
use tracing::debug;

#[derive(Parser)]
#[command(name = "rhimeji", version, about = "A small scripting language interpreter")]
struct Cli {
    /// Backend used by the REPL
    #[arg(long, value_enum, default_value = "eval", global = true)]
    engine: Engine,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate a source file and print its final value
    Run { file: PathBuf },
    /// Compile a source file to bytecode
    Compile {
        file: PathBuf,
        /// Output path, defaults to the input file name with a `.bin` extension
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Execute a compiled bytecode file
    Exec { file: PathBuf },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse failed:{}", format_parse_errors(.0))]
    Parse(Vec<ParseError>),
    #[error("{0}")]
    Eval(String),
    #[error(transparent)]
    Compile(#[from] CompilerError),
    #[error(transparent)]
    Bytecode(#[from] BytecodeError),
    #[error(transparent)]
    Vm(#[from] VMError),
    #[error(transparent)]
    Repl(#[from] rustyline::error::ReadlineError),
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    errors.iter().map(|err| format!("\n\t{}", err)).collect()
}

/// Installs a subscriber only when RUST_LOG is set, so normal runs print nothing extra.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    let result = match cli.command {
        None => Repl::new(cli.engine)
            .and_then(|mut repl| repl.run())
            .map_err(CliError::from),
        Some(Command::Run { file }) => run_file(&file),
        Some(Command::Compile { file, output }) => {
            let output = output.unwrap_or_else(|| file.with_extension("bin"));
            compile_file(&file, &output)
        }
        Some(Command::Exec { file }) => exec_file(&file),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn read_source(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn run_file(path: &Path) -> Result<(), CliError> {
    let program = parser::parse(&read_source(path)?).map_err(CliError::Parse)?;
    debug!(path = %path.display(), statements = program.statements.len(), "evaluating");

    let result = evaluator::eval(&program, &Environment::new_shared());
    match result.as_ref() {
        Object::Error(message) => Err(CliError::Eval(message.clone())),
        Object::Null => Ok(()),
        _ => {
            println!("{}", result);
            Ok(())
        }
    }
}

fn compile_file(path: &Path, output: &Path) -> Result<(), CliError> {
    let program = parser::parse(&read_source(path)?).map_err(CliError::Parse)?;
    let bytecode = Compiler::new().compile(&program)?;

    let write_error = |source| CliError::Write {
        path: output.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(output).map_err(write_error)?);
    bytecode.write_to(&mut writer)?;
    writer.flush().map_err(write_error)?;

    debug!(
        output = %output.display(),
        bytes = bytecode.instructions.len(),
        constants = bytecode.constants.len(),
        "wrote bytecode"
    );
    Ok(())
}

fn exec_file(path: &Path) -> Result<(), CliError> {
    let file = File::open(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let bytecode = Bytecode::read_from(&mut BufReader::new(file))?;

    let result = VM::new(bytecode).run()?;
    println!("{}", result);
    Ok(())
}
