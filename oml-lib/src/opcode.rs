//! The opcode set. Every byte of a program is looked up in a 256 entry table,
//! bytes that aren't in there are no-ops (that includes whitespace).
//! `e` introduces the extended set, which has its own table keyed by the byte
//! following it.

use once_cell::sync::Lazy;
use strum_macros::IntoStaticStr;

/// Opcodes that are a single byte.
///
/// The doc comments use `a b -> c` for the stack effect, `b` is the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub enum Op {
    /// digits, `A`-`F` and the named constants `G H I J S`
    Literal(i64),
    /// `"..."`, pushes the chars so that the first one ends up on top, then the length
    Str,
    /// `'x`, pushes the byte x
    Char,

    // arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    /// `a b -> a/b a%b`
    DivMod,
    /// `a b -> a^b`
    Pow,
    Negate,
    Factorial,
    Cbrt,
    Sqrt,
    Cube,
    Square,
    /// `x y -> xy`, decimal concatenation
    Concat,
    /// `n -> [0, n)`
    Random,

    // bits and comparisons
    And,
    Or,
    Xor,
    Not,
    /// `n k -> n ^ (1 << k)`
    ToggleBit,
    Less,
    Equal,
    Greater,

    // stack shaping
    Discard,
    Dup,
    /// `a b -> a b a`
    Over,
    Swap,
    /// `a b c -> c a b`
    Rot,
    Triple,
    /// `n -> ` duplicates the top n elements
    DupN,
    /// `n -> ` reverses the top n elements
    ReverseN,
    /// drops everything but the top
    Keep,
    /// top to bottom
    Bury,
    /// bottom to top
    Unbury,
    /// `i -> x`, copies the element i places below the top
    Pick,
    /// `i -> x`, moves the element i places below the top to the top
    Roll,
    Size,
    Clear,
    Reverse,
    /// `n -> 0 1 .. n-1`
    Range,
    /// `v n -> v v .. v`
    Repeat,

    // bases and digits
    SetInBase,
    SetOutBase,
    InBase,
    OutBase,
    /// `n -> binary digits of n`
    Bits,
    /// `n -> output base digits of n`
    OutDigits,
    /// whole stack as binary digits -> one number
    CollapseBits,
    /// whole stack as output base digits -> one number
    CollapseDigits,

    // output
    Print,
    Emit,
    /// `bytes.. n -> `
    EmitN,
    /// `bytes.. n fd -> `
    WriteStream,
    /// prints the stack, top first
    Show,

    // input
    ReadInt,
    ReadLine,
    ReadByte,

    // control flow
    /// `(`, skip to the matching `)` if the top is 0. Doesn't pop
    SkipOpen,
    /// `)`, jump back to the matching `(` if the top isn't 0. Doesn't pop
    LoopClose,
    /// `{`, pops, skips to the matching `}` if it was 0
    BlockOpen,
    /// `}`, only a target
    BlockClose,

    // storage
    /// `f<byte>`
    Store,
    /// `g<byte>`
    Load,
    /// `t<byte>`
    RegPush,
    /// `w<byte>`
    RegPop,
    /// `[`, hides all but the top n elements
    Descend,
    /// `]`, brings back what the last `[` hid
    Ascend,
    /// `r`
    Depth,

    /// `e<byte>`, see [ExtOp]
    Extended,
}

/// The opcodes that are written as `e` followed by another byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub enum ExtOp {
    Not,
    PrintLn,
    GreaterEq,
    NotEqual,
    LessEq,
    /// `e\`, everything up to the end of the line is ignored
    Comment,
    IsAlpha,
    Upper,
    Lower,
    /// `e{...}`, runs the block once per stack element
    Map,
    /// `e(...)`, runs the block on the stack until one value is left
    Reduce,
    /// pushes 1 if there is input left
    HasInput,
    /// reads every remaining integer
    ReadAll,
    /// `-> handle`
    Alloc,
    /// `handle n -> handle`, moves the top n elements to the heap stack
    MoveTo,
    /// prints the heap stack behind the handle on top
    ShowHeap,
    /// `handle v -> handle`
    HeapPush,
    /// `handle -> v handle`
    HeapPop,
    /// `e~`, exits with the top as status
    Exit,
}

static OPS: Lazy<[Option<Op>; 256]> = Lazy::new(|| {
    let mut table = [None; 256];
    for b in 0..=255u8 {
        table[b as usize] = Op::from_byte(b);
    }
    table
});

static EXT_OPS: Lazy<[Option<ExtOp>; 256]> = Lazy::new(|| {
    let mut table = [None; 256];
    for b in 0..=255u8 {
        table[b as usize] = ExtOp::from_byte(b);
    }
    table
});

impl Op {
    pub fn decode(b: u8) -> Option<Op> {
        OPS[b as usize]
    }

    /// true for opcodes that consume the following byte as their operand
    pub fn takes_operand(self) -> bool {
        use Op::*;
        matches!(self, Char | Store | Load | RegPush | RegPop | Extended)
    }

    pub fn name(self) -> &'static str {
        self.into()
    }

    fn from_byte(b: u8) -> Option<Op> {
        use Op::*;
        Some(match b {
            b'0'..=b'9' => Literal((b - b'0') as i64),
            b'A'..=b'F' => Literal((b - b'A') as i64 + 10),
            b'G' => Literal(64),
            b'H' => Literal(256),
            b'I' => Literal(100),
            b'J' => Literal(1000),
            b'S' => Literal(16),
            b'"' => Str,
            b'\'' => Char,
            b'+' => Add,
            b'-' => Sub,
            b'*' => Mul,
            b'/' => Div,
            b'%' => Rem,
            b'.' => DivMod,
            b'`' => Pow,
            b'_' => Negate,
            b'!' => Factorial,
            b'M' => Cbrt,
            b'N' => Sqrt,
            b'm' => Cube,
            b'n' => Square,
            b'T' => Concat,
            b'?' => Random,
            b'&' => And,
            b'|' => Or,
            b'^' => Xor,
            b'~' => Not,
            b'a' => ToggleBit,
            b'<' => Less,
            b'=' => Equal,
            b'>' => Greater,
            b'$' => Discard,
            b':' => Dup,
            b';' => Over,
            b',' => Swap,
            b'@' => Rot,
            b'X' => Triple,
            b'K' => DupN,
            b'R' => ReverseN,
            b'd' => Keep,
            b'Z' => Bury,
            b'z' => Unbury,
            b'b' => Pick,
            b'c' => Roll,
            b'l' => Size,
            b'L' => Clear,
            b'\\' => Reverse,
            b'Y' => Range,
            b'x' => Repeat,
            b'P' => SetInBase,
            b'Q' => SetOutBase,
            b'p' => InBase,
            b'q' => OutBase,
            b'U' => Bits,
            b'V' => OutDigits,
            b'u' => CollapseBits,
            b'v' => CollapseDigits,
            b'#' => Print,
            b'o' => Emit,
            b's' => EmitN,
            b'W' => WriteStream,
            b'O' => Show,
            b'h' => ReadInt,
            b'i' => ReadLine,
            b'j' => ReadByte,
            b'(' => SkipOpen,
            b')' => LoopClose,
            b'{' => BlockOpen,
            b'}' => BlockClose,
            b'f' => Store,
            b'g' => Load,
            b't' => RegPush,
            b'w' => RegPop,
            b'[' => Descend,
            b']' => Ascend,
            b'r' => Depth,
            b'e' => Extended,
            _ => return None,
        })
    }
}

impl ExtOp {
    pub fn decode(b: u8) -> Option<ExtOp> {
        EXT_OPS[b as usize]
    }

    pub fn name(self) -> &'static str {
        self.into()
    }

    fn from_byte(b: u8) -> Option<ExtOp> {
        use ExtOp::*;
        Some(match b {
            b'!' => Not,
            b'#' => PrintLn,
            b'<' => GreaterEq,
            b'=' => NotEqual,
            b'>' => LessEq,
            b'\\' => Comment,
            b'A' => IsAlpha,
            b'C' => Upper,
            b'c' => Lower,
            b'{' => Map,
            b'(' => Reduce,
            b'e' => HasInput,
            b'i' => ReadAll,
            b'm' => Alloc,
            b'n' => MoveTo,
            b'o' => ShowHeap,
            b'p' => HeapPush,
            b'q' => HeapPop,
            b'~' => Exit,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals() {
        assert_eq!(Op::decode(b'7'), Some(Op::Literal(7)));
        assert_eq!(Op::decode(b'C'), Some(Op::Literal(12)));
        assert_eq!(Op::decode(b'G'), Some(Op::Literal(64)));
        assert_eq!(Op::decode(b'S'), Some(Op::Literal(16)));
    }

    #[test]
    fn test_unknown_bytes_are_none() {
        for b in [b' ', b'\n', b'k', b'y', 0xff] {
            assert_eq!(Op::decode(b), None);
        }
        assert_eq!(ExtOp::decode(b'z'), None);
    }

    #[test]
    fn test_operands() {
        assert!(Op::decode(b'f').unwrap().takes_operand());
        assert!(Op::decode(b'e').unwrap().takes_operand());
        assert!(!Op::decode(b'u').unwrap().takes_operand());
    }

    #[test]
    fn test_names() {
        assert_eq!(Op::Swap.name(), "Swap");
        assert_eq!(Op::Literal(3).name(), "Literal");
        assert_eq!(ExtOp::Map.name(), "Map");
    }
}
