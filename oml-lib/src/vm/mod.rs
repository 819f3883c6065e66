//! The virtual machine: the interpreter that owns all shared state, the
//! contexts it runs, and the sub-execution used by map and reduce.

use crate::io::{Input, Outputs};
use crate::radix::DigitsError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::ops::ControlFlow;
use std::result::Result as StdResult;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::debug;

pub mod context;
pub mod dispatch;
pub mod heap;
pub mod stack;

pub use context::{Context, Program};
pub use heap::{Arena, Handle};
pub use stack::IntStack;

pub const REGISTER_COUNT: usize = 256;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Division by zero at {at}")]
    DivisionByZero { at: usize },

    #[error("Unbalanced '{bracket}' at {at}, there is no matching bracket")]
    UnbalancedBracket { bracket: char, at: usize },

    #[error("{handle} is not a handle to a heap stack")]
    InvalidHandle { handle: i64 },

    #[error("Base {0} has no digits")]
    InvalidBase(i64),

    #[error("{0} has too many digits to write in unary")]
    UnaryTooLong(i64),

    #[error("Stream {0} is not open")]
    UnknownStream(i64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = StdResult<T, Error>;

impl From<DigitsError> for Error {
    fn from(e: DigitsError) -> Self {
        match e {
            DigitsError::InvalidBase(base) => Error::InvalidBase(base),
            DigitsError::UnaryTooLong(n) => Error::UnaryTooLong(n),
        }
    }
}

/// how a complete run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// the cursor reached the end of the code
    Finished,
    /// `e~` was executed, with this status
    Exit(i32),
}

/// returned by every single step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    Continue,
    ExitCode(i32),
}

macro_rules! bail{
    ($($err:tt)*) => {
        return Err(Error::$($err)*);
    };
}
pub(crate) use bail;

#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    pub input_base: i64,
    pub output_base: i64,
    pub seed: u64,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            input_base: 10,
            output_base: 10,
            seed: clock_seed(),
        }
    }
}

/// a number that changes every millisecond
pub fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

/// Owns everything that outlives a single program run: registers,
/// variables, the bases, the heap stacks, the random source and the streams.
///
/// Contexts are passed in by mutable reference, nested runs get a fresh
/// context of their own but see the same registers and variables.
pub struct Interpreter {
    pub registers: Vec<IntStack>,
    pub variables: [i64; REGISTER_COUNT],
    pub input_base: i64,
    pub output_base: i64,
    pub input: Input,
    pub outputs: Outputs,
    heap: Arena<IntStack>,
    rng: StdRng,
}

impl Interpreter {
    /// an interpreter on stdin, stdout and stderr
    pub fn new(config: InterpreterConfig) -> Self {
        Self::with_io(config, Input::stdin(), Outputs::default())
    }

    pub fn with_io(config: InterpreterConfig, input: Input, outputs: Outputs) -> Self {
        Self {
            registers: vec![IntStack::new(); REGISTER_COUNT],
            variables: [0; REGISTER_COUNT],
            input_base: config.input_base,
            output_base: config.output_base,
            input,
            outputs,
            heap: Arena::new(),
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    /// Runs `ctx` until its cursor passes the end of the code. Afterwards the
    /// cursor is back at 0, so the same context can be run again on whatever
    /// is on its stack.
    ///
    /// On error the cursor is left at the failing opcode.
    pub fn run(&mut self, ctx: &mut Context) -> Result<Outcome> {
        while ctx.is_running() {
            if let ExecOutcome::ExitCode(code) = self.step(ctx)? {
                debug!(code, "exit requested");
                return Ok(Outcome::Exit(code));
            }
            ctx.cursor += 1;
        }
        ctx.cursor = 0;
        Ok(Outcome::Finished)
    }

    /// Runs `block` as a program of its own on `stack`.
    ///
    /// Continue carries the resulting stack, Break the status of an `e~`
    /// somewhere inside.
    pub fn exec_block(&mut self, block: &Program, stack: IntStack) -> Result<ControlFlow<i32, IntStack>> {
        let mut child = Context::new(block, stack);
        Ok(match self.run(&mut child)? {
            Outcome::Finished => ControlFlow::Continue(child.stack),
            Outcome::Exit(code) => ControlFlow::Break(code),
        })
    }

    /// Replaces every element of the stack with the top of the stack the
    /// block leaves when it is run on just that element.
    pub fn map(&mut self, ctx: &mut Context, block: &Program) -> Result<ExecOutcome> {
        let elems = std::mem::take(&mut ctx.stack).into_vec();
        debug!(count = elems.len(), block = %String::from_utf8_lossy(block.code()), "map");
        let mut mapped = IntStack::new();
        for v in elems {
            match self.exec_block(block, IntStack::from(vec![v]))? {
                ControlFlow::Continue(mut res) => mapped.push(res.pop()),
                ControlFlow::Break(code) => return Ok(ExecOutcome::ExitCode(code)),
            }
        }
        ctx.stack = mapped;
        Ok(ExecOutcome::Continue)
    }

    /// Runs the block on a copy of the stack and takes the result as the new
    /// stack, until a single value is left.
    ///
    /// A pass may leave the stack as long as it was: registers, variables and
    /// the input outlive it, so the next pass can behave differently. A block
    /// that never shrinks the stack loops forever, like `1(1)` does.
    pub fn reduce(&mut self, ctx: &mut Context, block: &Program) -> Result<ExecOutcome> {
        debug!(count = ctx.stack.len(), block = %String::from_utf8_lossy(block.code()), "reduce");
        while ctx.stack.len() > 1 {
            match self.exec_block(block, ctx.stack.clone())? {
                ControlFlow::Continue(res) => ctx.stack = res,
                ControlFlow::Break(code) => return Ok(ExecOutcome::ExitCode(code)),
            }
        }
        Ok(ExecOutcome::Continue)
    }

    /// Runs `code` once on `stack` and returns the final stack. Meant for
    /// embedding and tests, the cli drives its contexts itself.
    pub fn run_source(&mut self, code: &str, stack: IntStack) -> Result<(IntStack, Outcome)> {
        let program = Program::new(code);
        let mut ctx = Context::new(&program, stack);
        let outcome = self.run(&mut ctx)?;
        self.outputs.flush()?;
        Ok((ctx.stack, outcome))
    }

    pub fn heap_stack(&self, handle: Handle) -> Option<&IntStack> {
        self.heap.get(handle)
    }

    /// Frees a heap stack. There is no opcode for this, it is for embedders
    /// that know a handle won't be used again
    pub fn release_heap_stack(&mut self, handle: Handle) -> Option<IntStack> {
        self.heap.remove(handle)
    }
}
