use crate::scan::BracketMap;
use crate::vm::{Error, IntStack, Result};

/// Code together with its bracket table. Immutable once built, so a
/// program can be run any number of times, nested or not.
#[derive(Debug, Clone)]
pub struct Program {
    code: Vec<u8>,
    brackets: BracketMap,
}

impl Program {
    pub fn new(code: impl Into<Vec<u8>>) -> Self {
        let code = code.into();
        let brackets = BracketMap::build(&code);
        Self { code, brackets }
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// position of the bracket that belongs to the one at `at`
    pub fn matching(&self, at: usize) -> Result<usize> {
        self.brackets
            .partner(at)
            .ok_or_else(|| Error::UnbalancedBracket {
                bracket: self.code.get(at).copied().unwrap_or(b'?') as char,
                at,
            })
    }
}

/// The state of one running program: where it is, and its private stacks.
///
/// Registers and variables are not in here, they belong to the
/// [Interpreter](crate::vm::Interpreter) and are shared by all contexts it runs.
#[derive(Debug)]
pub struct Context<'p> {
    pub program: &'p Program,
    /// index of the current opcode. After a step it points to the last byte
    /// the opcode consumed
    pub cursor: usize,
    pub stack: IntStack,
    /// the regions hidden by `[`, each one followed by its size
    pub stack_of_stacks: IntStack,
    /// number of currently open `[`
    pub depth: usize,
}

impl<'p> Context<'p> {
    pub fn new(program: &'p Program, stack: IntStack) -> Self {
        Self {
            program,
            cursor: 0,
            stack,
            stack_of_stacks: IntStack::new(),
            depth: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.cursor < self.program.len()
    }

    pub fn current(&self) -> u8 {
        self.program.code()[self.cursor]
    }

    /// Advances to the next byte and returns it. An operand that is cut off
    /// by the end of the code reads as 0
    pub fn operand(&mut self) -> u8 {
        self.cursor += 1;
        self.program.code().get(self.cursor).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_past_end() {
        let p = Program::new("f");
        let mut ctx = Context::new(&p, IntStack::new());
        assert_eq!(ctx.current(), b'f');
        assert_eq!(ctx.operand(), 0);
        assert!(!ctx.is_running());
    }

    #[test]
    fn test_matching_reports_position() {
        let p = Program::new("1(2(3)");
        assert_eq!(p.matching(3).unwrap(), 5);
        match p.matching(1) {
            Err(Error::UnbalancedBracket { bracket, at }) => {
                assert_eq!(bracket, '(');
                assert_eq!(at, 1);
            }
            other => panic!("expected an unbalanced bracket, got {:?}", other),
        }
    }
}
