//! An interpreter for OML, a stack language in the spirit of dc where every
//! byte of the program is an instruction.
//!
//! There is no compilation step, the code is executed as it is. What you need
//! to do to run a program:
//! 1. wrap the code in a [`vm::Program`], which computes where the brackets match
//! 1. create a [`vm::Interpreter`], it holds the registers, variables, bases and streams
//! 1. create a [`vm::Context`] for the program with an initial stack,
//!    and hand it to [`vm::Interpreter::run`]:
//!
//!    ```
//!    use oml_lib::vm::{Context, IntStack, Interpreter, InterpreterConfig, Outcome, Program};
//!
//!    let program = Program::new("23+");
//!    let mut interpreter = Interpreter::new(InterpreterConfig::default());
//!    let mut ctx = Context::new(&program, IntStack::new());
//!    assert_eq!(interpreter.run(&mut ctx).unwrap(), Outcome::Finished);
//!    assert_eq!(ctx.stack.peek(), 5);
//!    ```
//!
//! A context can be run again after it finished, that's how the cli applies a
//! program to every number of its input.
pub mod io;
pub mod opcode;
pub mod radix;
pub mod scan;
pub mod vm;
