use anyhow::{anyhow, bail, Result};
use crossterm::style::Stylize;
use oml_lib::vm::{Context, IntStack, Interpreter, Outcome, Program};
use rustyline::{error::ReadlineError, DefaultEditor};

use std::io::Write;

#[derive(PartialEq, Clone, Debug)]
enum UserCommand {
    Run(String),
    ShowStack,
    ShowRegister(u8),
    ShowVariable(u8),
    Clear,
    Nothing,
    Quit,
}

/// Every line is a program of its own, but they all work on the same stack,
/// and the interpreter keeps its registers and variables in between.
/// Returns the exit status.
pub fn run(interpreter: &mut Interpreter) -> Result<i32> {
    let mut rl = DefaultEditor::new()?;
    let mut stack = IntStack::new();

    use UserCommand::*;
    loop {
        match read_line(&mut rl)? {
            Nothing => {}
            Run(code) => {
                let program = Program::new(code);
                let mut ctx = Context::new(&program, std::mem::take(&mut stack));
                let res = interpreter.run(&mut ctx);
                interpreter.outputs.flush()?;
                stack = ctx.stack;
                match res {
                    Ok(Outcome::Finished) => render_stack(&stack),
                    Ok(Outcome::Exit(code)) => return Ok(code),
                    Err(e) => eprintln!("{} {}", "Runtime error:".red().bold(), e),
                }
            }
            ShowStack => render_stack(&stack),
            ShowRegister(r) => render_stack(&interpreter.registers[r as usize]),
            ShowVariable(v) => println!("{}", interpreter.variables[v as usize]),
            Clear => stack.clear(),
            Quit => return Ok(0),
        }
    }
}

fn read_line(rl: &mut DefaultEditor) -> Result<UserCommand> {
    loop {
        let line = rl.readline("oml> ");
        use ReadlineError::*;
        match line {
            Ok(line) => {
                if !line.trim().is_empty() {
                    rl.add_history_entry(line.as_str())?;
                }
                match parse_line(&line) {
                    Ok(cmd) => return Ok(cmd),
                    Err(e) => eprintln!("{} {}", "Error:".red(), e),
                }
            }
            Err(Interrupted | Eof) => return Ok(UserCommand::Quit),
            Err(other) => return Err(other.into()),
        }
    }
}

/// lines starting with a colon are commands to the session, everything
/// else is code
fn parse_line(line: &str) -> Result<UserCommand> {
    use UserCommand::*;
    let Some(cmd) = line.trim().strip_prefix(':') else {
        return Ok(if line.trim().is_empty() {
            Nothing
        } else {
            Run(line.to_string())
        });
    };
    let elems: Vec<_> = cmd.split_whitespace().collect();
    match elems.as_slice() {
        ["q" | "quit"] => Ok(Quit),
        ["s" | "stack"] => Ok(ShowStack),
        ["c" | "clear"] => Ok(Clear),
        ["r" | "register", name] => Ok(ShowRegister(parse_name(name)?)),
        ["v" | "variable", name] => Ok(ShowVariable(parse_name(name)?)),
        [] => bail!("Missing command after ':'"),
        _ => bail!("Invalid command"),
    }
}

/// registers and variables are named by a single byte, like in the code
fn parse_name(name: &str) -> Result<u8> {
    match name.as_bytes() {
        [b] => Ok(*b),
        _ => Err(anyhow!("a name is a single character, got '{}'", name)),
    }
}

fn render_stack(stack: &IntStack) {
    let mut out = std::io::stdout().lock();
    for (i, v) in stack.iter().enumerate().rev() {
        // a failing stdout is not worth ending the session for
        let _ = writeln!(out, "{}: {}", format!("{:>3}", i).dark_grey(), v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        use UserCommand::*;
        assert_eq!(parse_line("23+").unwrap(), Run("23+".into()));
        assert_eq!(parse_line("   ").unwrap(), Nothing);
        assert_eq!(parse_line(":q").unwrap(), Quit);
        assert_eq!(parse_line(" :stack ").unwrap(), ShowStack);
        assert_eq!(parse_line(":r a").unwrap(), ShowRegister(b'a'));
        assert_eq!(parse_line(":v 0").unwrap(), ShowVariable(b'0'));
        assert!(parse_line(":r ab").is_err());
        assert!(parse_line(":").is_err());
        assert!(parse_line(":nope").is_err());
    }
}
