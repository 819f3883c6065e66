use anyhow::{Context as _, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use oml_lib::io::STDOUT;
use oml_lib::radix;
use oml_lib::vm::{self, Context, IntStack, Interpreter, InterpreterConfig, Outcome, Program};

use std::io::Write;

mod repl;

/// OML - ordinal manipulation language
///
/// A language similar to dc with the integer as its only data type. All numbers
/// live on the stack, every byte of the program is an instruction.
///
/// Examples: convert hexadecimal to decimal with `oml -xn`,
/// hexadecimal to binary with `oml -xn 2Q`,
/// and get the n-th fibonacci number with `oml '01h(Z:@+z1-)\d'`
#[derive(Parser)]
#[command(author, version, about, long_about)]
struct Cli {
    /// The program. Starts an interactive session if missing
    code: Option<String>,

    /// Read the program from the file `CODE` instead
    #[arg(short = 'f', long)]
    file: bool,

    /// Execute the program once for every number on stdin
    #[arg(short = 'n', long)]
    numbers: bool,

    /// Treat the input base as hexadecimal initially
    #[arg(short = 'x', long, conflicts_with = "binary")]
    hex: bool,

    /// Treat the input base as binary initially
    #[arg(short = 'b', long)]
    binary: bool,

    /// Seed for `?`, defaults to the clock
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = InterpreterConfig::default();
    if cli.hex {
        config.input_base = 16;
    } else if cli.binary {
        config.input_base = 2;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    debug!(?config, "starting");
    let mut interpreter = Interpreter::new(config);

    let Some(code) = cli.code else {
        let res = repl::run(&mut interpreter)?;
        std::process::exit(res);
    };
    let code = if cli.file {
        std::fs::read(&code).with_context(|| format!("reading program from {}", code))?
    } else {
        code.into_bytes()
    };

    let program = Program::new(code);
    let res = match run(&mut interpreter, &program, cli.numbers) {
        Ok(res) => res,
        Err(e) => {
            eprintln!("{}", e);
            1
        }
    };
    interpreter.outputs.flush()?;
    std::process::exit(res);
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Runs the program and returns the exit status. Runtime errors are
/// rendered with the position they happened at
pub fn run(interpreter: &mut Interpreter, program: &Program, over_numbers: bool) -> Result<i32, String> {
    let mut ctx = Context::new(program, IntStack::new());
    let res = if over_numbers {
        run_over_numbers(interpreter, &mut ctx)
    } else {
        run_once(interpreter, &mut ctx)
    };
    match res {
        Ok(Outcome::Finished) => Ok(0),
        Ok(Outcome::Exit(code)) => Ok(code),
        Err(e) => Err(format!("Runtime error: {}\n{}", e, point_at(program.code(), ctx.cursor))),
    }
}

/// runs once, then prints the stack
fn run_once(interpreter: &mut Interpreter, ctx: &mut Context) -> vm::Result<Outcome> {
    let outcome = interpreter.run(ctx)?;
    if outcome == Outcome::Finished {
        let out = interpreter.outputs.get(STDOUT).ok_or(vm::Error::UnknownStream(STDOUT))?;
        ctx.stack.display(out)?;
    }
    Ok(outcome)
}

/// pushes each number of the input, runs, prints the top and starts over
fn run_over_numbers(interpreter: &mut Interpreter, ctx: &mut Context) -> vm::Result<Outcome> {
    loop {
        interpreter.input.skip_whitespace()?;
        if !interpreter.input.has_remaining()? {
            return Ok(Outcome::Finished);
        }
        let Some(n) = interpreter.input.read_int(interpreter.input_base)? else {
            continue;
        };
        ctx.stack.push(n);
        if let Outcome::Exit(code) = interpreter.run(ctx)? {
            return Ok(Outcome::Exit(code));
        }
        let top = ctx.stack.pop();
        let text = radix::format_int(top, interpreter.output_base)?;
        let out = interpreter.outputs.get(STDOUT).ok_or(vm::Error::UnknownStream(STDOUT))?;
        writeln!(out, "{}", text)?;
        ctx.stack.clear();
    }
}

/// the line of `code` that contains `pos`, with a caret under it
fn point_at(code: &[u8], pos: usize) -> String {
    let pos = pos.min(code.len());
    let start = code[..pos].iter().rposition(|b| *b == b'\n').map_or(0, |p| p + 1);
    let end = code[pos..].iter().position(|b| *b == b'\n').map_or(code.len(), |p| pos + p);
    let line = String::from_utf8_lossy(&code[start..end]);
    format!("  {}\n  {}^", line, " ".repeat(pos - start))
}
