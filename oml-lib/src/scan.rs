//! Bracket matching for `(` `)` and `{` `}`.
//!
//! Programs are never parsed, the dispatcher walks the raw bytes. To jump it
//! still needs to know where the partner of a bracket is, and that is computed
//! once per code buffer by a balanced-depth scan. Every bracket kind has its own
//! depth, a `(` is only ever matched with a `)`.
//!
//! The scan walks the code the same way execution does, so brackets that are
//! data and not control flow are ignored: the contents of string literals, the
//! byte after `'`, register and variable names and `e\` comments. The two
//! bracket carrying extended opcodes `e(` and `e{` open a block like their plain
//! counterparts.

use crate::opcode::{ExtOp, Op};

/// For every position in the code, the position of the matching bracket.
/// None for non-brackets and for brackets without a partner.
#[derive(Debug, Clone, Default)]
pub struct BracketMap {
    partners: Vec<Option<usize>>,
}

impl BracketMap {
    pub fn build(code: &[u8]) -> Self {
        let mut partners = vec![None; code.len()];
        let mut parens = vec![];
        let mut braces = vec![];
        let mut close = |open_stack: &mut Vec<usize>, at: usize| {
            if let Some(open) = open_stack.pop() {
                partners[open] = Some(at);
                partners[at] = Some(open);
            }
        };

        let mut i = 0;
        while i < code.len() {
            match code[i] {
                b'(' => parens.push(i),
                b'{' => braces.push(i),
                b')' => close(&mut parens, i),
                b'}' => close(&mut braces, i),
                b'"' => i = string_end(code, i),
                b'e' => match code.get(i + 1).copied().and_then(ExtOp::decode) {
                    // the bracket gets looked at in the next round
                    Some(ExtOp::Map | ExtOp::Reduce) => {}
                    Some(ExtOp::Comment) => i = line_end(code, i + 1),
                    _ => i += 1,
                },
                b => {
                    if Op::decode(b).map_or(false, Op::takes_operand) {
                        i += 1;
                    }
                }
            }
            i += 1;
        }
        Self { partners }
    }

    pub fn partner(&self, at: usize) -> Option<usize> {
        self.partners.get(at).copied().flatten()
    }
}

/// Position of the quote that closes the string opened at `open`, or the code
/// length if the string runs to the end. `""` inside a string is a quote.
pub fn string_end(code: &[u8], open: usize) -> usize {
    let mut i = open + 1;
    while i < code.len() {
        if code[i] == b'"' {
            if code.get(i + 1) == Some(&b'"') {
                i += 2;
                continue;
            }
            break;
        }
        i += 1;
    }
    i
}

/// position of the next newline at or after `from`, or the code length
pub fn line_end(code: &[u8], from: usize) -> usize {
    code[from.min(code.len())..]
        .iter()
        .position(|b| *b == b'\n')
        .map_or(code.len(), |p| from + p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested() {
        let m = BracketMap::build(b"1(2(3)4)");
        assert_eq!(m.partner(1), Some(7));
        assert_eq!(m.partner(7), Some(1));
        assert_eq!(m.partner(3), Some(5));
        assert_eq!(m.partner(0), None);
    }

    #[test]
    fn test_kinds_are_independent() {
        let m = BracketMap::build(b"({)}");
        assert_eq!(m.partner(0), Some(2));
        assert_eq!(m.partner(1), Some(3));
    }

    #[test]
    fn test_unbalanced() {
        let m = BracketMap::build(b"0(2");
        assert_eq!(m.partner(1), None);
        let m = BracketMap::build(b"2)");
        assert_eq!(m.partner(1), None);
    }

    #[test]
    fn test_data_brackets_are_skipped() {
        let m = BracketMap::build(b"0(\"a)b\"')t(w))");
        assert_eq!(m.partner(1), Some(13));
        let m = BracketMap::build(b"(e\\ ) comment\n)");
        assert_eq!(m.partner(0), Some(14));
    }

    #[test]
    fn test_escaped_quote() {
        let code = b"\"a\"\")\")";
        assert_eq!(string_end(code, 0), 5);
        let m = BracketMap::build(code);
        assert_eq!(m.partner(4), None);
        assert_eq!(m.partner(6), None);
    }

    #[test]
    fn test_extended_blocks() {
        let m = BracketMap::build(b"e{1+}e(+)");
        assert_eq!(m.partner(1), Some(4));
        assert_eq!(m.partner(6), Some(8));
        // e) is not a bracket
        let m = BracketMap::build(b"(e))");
        assert_eq!(m.partner(0), Some(3));
    }

    #[test]
    fn test_line_end() {
        assert_eq!(line_end(b"ab\ncd", 0), 2);
        assert_eq!(line_end(b"abcd", 1), 4);
        assert_eq!(line_end(b"ab", 5), 2);
    }
}
