//! Executes single opcodes. Every arm leaves the cursor on the last byte it
//! consumed, [Interpreter::run] moves past it.

use crate::io::{Outputs, STDOUT};
use crate::opcode::{ExtOp, Op};
use crate::radix;
use crate::scan;
use crate::vm::*;
use rand::Rng;
use std::io::Write;
use tracing::{debug, trace, warn};

macro_rules! binop {
    ($stack:expr, |$a:ident, $b:ident| $res:expr) => {{
        let $b = $stack.pop();
        let $a = $stack.pop();
        $stack.push($res);
    }};
}

macro_rules! unop {
    ($stack:expr, |$a:ident| $res:expr) => {{
        let $a = $stack.pop();
        $stack.push($res);
    }};
}

fn stream(outputs: &mut Outputs, fd: i64) -> Result<&mut (dyn Write + 'static)> {
    outputs.get(fd).ok_or(Error::UnknownStream(fd))
}

fn checked_divisor(b: i64, at: usize) -> Result<i64> {
    if b == 0 {
        bail!(DivisionByZero { at });
    }
    Ok(b)
}

fn map_ascii(n: i64, f: impl Fn(u8) -> u8) -> i64 {
    u8::try_from(n).map_or(n, |c| f(c) as i64)
}

impl Interpreter {
    pub fn step(&mut self, ctx: &mut Context) -> Result<ExecOutcome> {
        let Some(op) = Op::decode(ctx.current()) else {
            return Ok(ExecOutcome::Continue);
        };
        trace!(cursor = ctx.cursor, op = op.name(), "dispatch");
        let at = ctx.cursor;
        let s = &mut ctx.stack;

        use Op::*;
        match op {
            Literal(v) => s.push(v),
            Str => {
                let code = ctx.program.code();
                let end = scan::string_end(code, at);
                let mut bytes = vec![];
                let mut i = at + 1;
                while i < end {
                    bytes.push(code[i]);
                    // inside the literal a quote is always doubled
                    if code[i] == b'"' {
                        i += 1;
                    }
                    i += 1;
                }
                s.push_all(bytes.iter().rev().map(|b| *b as i64));
                s.push(bytes.len() as i64);
                ctx.cursor = end;
            }
            Char => {
                let c = ctx.operand();
                ctx.stack.push(c as i64);
            }

            Add => binop!(s, |a, b| a.wrapping_add(b)),
            Sub => binop!(s, |a, b| a.wrapping_sub(b)),
            Mul => binop!(s, |a, b| a.wrapping_mul(b)),
            Div => binop!(s, |a, b| a.wrapping_div(checked_divisor(b, at)?)),
            Rem => binop!(s, |a, b| a.wrapping_rem(checked_divisor(b, at)?)),
            DivMod => {
                let b = checked_divisor(s.pop(), at)?;
                let a = s.pop();
                s.push(a.wrapping_div(b));
                s.push(a.wrapping_rem(b));
            }
            Pow => binop!(s, |a, b| radix::ipow(a, b)),
            Negate => unop!(s, |a| a.wrapping_neg()),
            Factorial => unop!(s, |a| radix::factorial(a)),
            Cbrt => unop!(s, |a| radix::icbrt(a)),
            Sqrt => unop!(s, |a| radix::isqrt(a)),
            Cube => unop!(s, |a| a.wrapping_mul(a).wrapping_mul(a)),
            Square => unop!(s, |a| a.wrapping_mul(a)),
            Concat => binop!(s, |a, b| radix::concat(a, b)),
            Random => {
                let n = s.pop();
                s.push(if n > 0 { self.rng.gen_range(0..n) } else { 0 });
            }

            And => binop!(s, |a, b| a & b),
            Or => binop!(s, |a, b| a | b),
            Xor => binop!(s, |a, b| a ^ b),
            Not => unop!(s, |a| !a),
            ToggleBit => binop!(s, |n, k| n ^ 1i64.checked_shl(k as u32).unwrap_or(0)),
            Less => binop!(s, |a, b| (a < b) as i64),
            Equal => binop!(s, |a, b| (a == b) as i64),
            Greater => binop!(s, |a, b| (a > b) as i64),

            Discard => {
                s.pop();
            }
            Dup => {
                let a = s.pop();
                s.push_all([a, a]);
            }
            Over => {
                let b = s.pop();
                let a = s.pop();
                s.push_all([a, b, a]);
            }
            Swap => {
                let b = s.pop();
                let a = s.pop();
                s.push_all([b, a]);
            }
            Rot => {
                let c = s.pop();
                let b = s.pop();
                let a = s.pop();
                s.push_all([c, a, b]);
            }
            Triple => {
                let a = s.pop();
                s.push_all([a, a, a]);
            }
            DupN => {
                let n = s.pop();
                let start = s.len() - stack::clamp_count(n, s.len());
                s.extend_from_within(start..);
            }
            ReverseN => {
                let n = s.pop();
                s.reverse_top(n);
            }
            Keep => {
                let top = s.pop();
                s.clear();
                s.push(top);
            }
            Bury => {
                let top = s.pop();
                s.unshift(top);
            }
            Unbury => {
                let bottom = s.shift();
                s.push(bottom);
            }
            Pick => {
                let i = s.pop();
                let v = s.index_from_top(i).map_or(0, |idx| s[idx]);
                s.push(v);
            }
            Roll => {
                let i = s.pop();
                let v = s.index_from_top(i).and_then(|idx| s.remove_at(idx));
                s.push(v.unwrap_or(0));
            }
            Size => {
                let len = s.len() as i64;
                s.push(len);
            }
            Clear => s.clear(),
            Reverse => s.reverse(),
            Range => {
                let n = s.pop();
                s.push_all(0..n);
            }
            Repeat => {
                let n = s.pop();
                let v = s.pop();
                s.push_all(std::iter::repeat(v).take(stack::clamp_count(n, usize::MAX)));
            }

            SetInBase => {
                self.input_base = s.pop();
                debug!(base = self.input_base, "input base set");
            }
            SetOutBase => {
                self.output_base = s.pop();
                debug!(base = self.output_base, "output base set");
            }
            InBase => s.push(self.input_base),
            OutBase => s.push(self.output_base),
            Bits => {
                let n = s.pop();
                s.push_all(radix::to_digits(n, 2).unwrap_or_default());
            }
            OutDigits => {
                let n = s.pop();
                s.push_all(radix::to_digits(n, self.output_base)?);
            }
            CollapseBits => {
                let digits = std::mem::take(s).into_vec();
                s.push(radix::from_digits(&digits, 2));
            }
            CollapseDigits => {
                if self.output_base < 1 {
                    bail!(InvalidBase(self.output_base));
                }
                let digits = std::mem::take(s).into_vec();
                s.push(radix::from_digits(&digits, self.output_base));
            }

            Print => {
                let n = s.pop();
                self.print_int(n, "")?;
            }
            Emit => {
                let b = s.pop() as u8;
                stream(&mut self.outputs, STDOUT)?.write_all(&[b])?;
            }
            EmitN => {
                let n = stack::clamp_count(s.pop(), usize::MAX);
                let bytes: Vec<u8> = (0..n).map(|_| s.pop() as u8).collect();
                stream(&mut self.outputs, STDOUT)?.write_all(&bytes)?;
            }
            WriteStream => {
                let fd = s.pop();
                let n = stack::clamp_count(s.pop(), usize::MAX);
                let mut bytes: Vec<u8> = (0..n).map(|_| s.pop() as u8).collect();
                bytes.reverse();
                stream(&mut self.outputs, fd)?.write_all(&bytes)?;
            }
            Show => s.display(stream(&mut self.outputs, STDOUT)?)?,

            ReadInt => {
                let n = self.input.read_int(self.input_base)?;
                s.push(n.unwrap_or(0));
            }
            ReadLine => {
                let line = self.input.read_line()?;
                s.push_all(line.iter().rev().map(|b| *b as i64));
                s.push(line.len() as i64);
            }
            ReadByte => {
                let b = self.input.read_byte()?;
                s.push(b.map_or(-1, |b| b as i64));
            }

            SkipOpen => {
                if s.peek() == 0 {
                    ctx.cursor = ctx.program.matching(at)?;
                }
            }
            LoopClose => {
                if s.peek() != 0 {
                    ctx.cursor = ctx.program.matching(at)?;
                }
            }
            BlockOpen => {
                if s.pop() == 0 {
                    ctx.cursor = ctx.program.matching(at)?;
                }
            }
            BlockClose => {}

            Store => {
                let v = ctx.stack.pop();
                let var = ctx.operand();
                self.variables[var as usize] = v;
            }
            Load => {
                let var = ctx.operand();
                ctx.stack.push(self.variables[var as usize]);
            }
            RegPush => {
                let v = ctx.stack.pop();
                let reg = ctx.operand();
                self.registers[reg as usize].push(v);
            }
            RegPop => {
                let reg = ctx.operand();
                let v = self.registers[reg as usize].pop();
                ctx.stack.push(v);
            }
            Descend => {
                let n = s.pop();
                let hidden = s.len() - stack::clamp_count(n, s.len());
                ctx.stack_of_stacks.push_all(s.drain(..hidden));
                ctx.stack_of_stacks.push(hidden as i64);
                ctx.depth += 1;
            }
            Ascend => {
                let n = ctx.stack_of_stacks.pop();
                let mut restored = ctx.stack_of_stacks.split_top(n);
                restored.extend_from_slice(&s[..]);
                *s = IntStack::from(restored);
                ctx.depth = ctx.depth.saturating_sub(1);
            }
            Depth => s.push(ctx.depth as i64),

            Extended => {
                let ident = ctx.operand();
                return match ExtOp::decode(ident) {
                    Some(ext) => self.step_extended(ctx, ext),
                    None => Ok(ExecOutcome::Continue),
                };
            }
        }
        Ok(ExecOutcome::Continue)
    }

    /// the cursor is on the byte after the `e`
    fn step_extended(&mut self, ctx: &mut Context, ext: ExtOp) -> Result<ExecOutcome> {
        trace!(cursor = ctx.cursor, op = ext.name(), "dispatch extended");
        let s = &mut ctx.stack;

        use ExtOp::*;
        match ext {
            Not => unop!(s, |a| (a == 0) as i64),
            PrintLn => {
                let n = s.pop();
                self.print_int(n, "\n")?;
            }
            GreaterEq => binop!(s, |a, b| (a >= b) as i64),
            NotEqual => binop!(s, |a, b| (a != b) as i64),
            LessEq => binop!(s, |a, b| (a <= b) as i64),
            Comment => ctx.cursor = scan::line_end(ctx.program.code(), ctx.cursor),
            IsAlpha => unop!(s, |a| u8::try_from(a).map_or(false, |c| c.is_ascii_alphabetic()) as i64),
            Upper => unop!(s, |a| map_ascii(a, |c| c.to_ascii_uppercase())),
            Lower => unop!(s, |a| map_ascii(a, |c| c.to_ascii_lowercase())),
            Map | Reduce => {
                let program = ctx.program;
                let open = ctx.cursor;
                let close = program.matching(open)?;
                let block = Program::new(&program.code()[open + 1..close]);
                ctx.cursor = close;
                return if ext == Map {
                    self.map(ctx, &block)
                } else {
                    self.reduce(ctx, &block)
                };
            }
            HasInput => {
                let remaining = self.input.has_remaining()?;
                s.push(remaining as i64);
            }
            ReadAll => {
                loop {
                    self.input.skip_whitespace()?;
                    if !self.input.has_remaining()? {
                        break;
                    }
                    if let Some(n) = self.input.read_int(self.input_base)? {
                        s.push(n);
                    }
                }
                s.reverse();
            }
            Alloc => {
                let handle = self.heap.insert(IntStack::new());
                debug!(handle, "heap stack allocated");
                s.push(handle);
            }
            MoveTo => {
                let n = s.pop();
                let handle = s.pop();
                let Some(target) = self.heap.get_mut(handle) else {
                    bail!(InvalidHandle { handle });
                };
                target.push_all(s.split_top(n));
                s.push(handle);
            }
            ShowHeap => {
                let handle = s.peek();
                let Some(target) = self.heap.get(handle) else {
                    bail!(InvalidHandle { handle });
                };
                target.display(stream(&mut self.outputs, STDOUT)?)?;
            }
            HeapPush => {
                let v = s.pop();
                let handle = s.pop();
                let Some(target) = self.heap.get_mut(handle) else {
                    bail!(InvalidHandle { handle });
                };
                target.push(v);
                s.push(handle);
            }
            HeapPop => {
                let handle = s.pop();
                let Some(target) = self.heap.get_mut(handle) else {
                    bail!(InvalidHandle { handle });
                };
                s.push_all([target.pop(), handle]);
            }
            Exit => return Ok(ExecOutcome::ExitCode(s.pop() as i32)),
        }
        Ok(ExecOutcome::Continue)
    }

    fn print_int(&mut self, n: i64, end: &str) -> Result<()> {
        if self.output_base == 1 {
            warn!("unary isn't really a base");
        }
        let text = radix::format_int(n, self.output_base)?;
        write!(stream(&mut self.outputs, STDOUT)?, "{}{}", text, end)?;
        Ok(())
    }
}
