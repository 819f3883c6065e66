//! The integer stack every part of the vm is built from: the main stack, the
//! stack-of-stacks, the 256 registers and the heap stacks.
//!
//! Reading from an empty stack is not an error. `pop`, `peek` and `shift` all
//! return 0 in that case, programs are expected to know what they pushed.

use derive_more::{Deref, DerefMut};
use std::io::{self, Write};

/// Index 0 is the bottom, `len() - 1` is the top.
///
/// Derefs to the backing Vec, so slicing, iterating and `len()` come for free.
/// The inherent methods shadow the Vec ones where the semantics differ
/// (i.e. `pop` returns a plain i64).
#[derive(Debug, Default, Clone, PartialEq, Eq, Deref, DerefMut)]
pub struct IntStack(Vec<i64>);

impl IntStack {
    pub fn new() -> Self {
        Self(Vec::with_capacity(16))
    }

    pub fn push(&mut self, v: i64) {
        self.0.push(v);
    }

    /// removes the top, 0 if there is nothing to remove
    pub fn pop(&mut self) -> i64 {
        self.0.pop().unwrap_or(0)
    }

    pub fn peek(&self) -> i64 {
        self.0.last().copied().unwrap_or(0)
    }

    /// removes the bottom element. O(n)
    pub fn shift(&mut self) -> i64 {
        if self.0.is_empty() {
            0
        } else {
            self.0.remove(0)
        }
    }

    /// inserts at the bottom. O(n)
    pub fn unshift(&mut self, v: i64) {
        self.0.insert(0, v);
    }

    /// removes the element at `index` (counted from the bottom), keeping the
    /// order of everything else
    pub fn remove_at(&mut self, index: usize) -> Option<i64> {
        if index < self.0.len() {
            Some(self.0.remove(index))
        } else {
            None
        }
    }

    /// converts an index that counts from the top (0 is the top) into one
    /// counting from the bottom
    pub fn index_from_top(&self, ridx: i64) -> Option<usize> {
        let ridx = usize::try_from(ridx).ok()?;
        self.0.len().checked_sub(ridx + 1)
    }

    pub fn push_all(&mut self, values: impl IntoIterator<Item = i64>) {
        self.0.extend(values);
    }

    /// reverses the order of the top `n` elements. `n` is clamped to the size
    pub fn reverse_top(&mut self, n: i64) {
        let n = clamp_count(n, self.0.len());
        let start = self.0.len() - n;
        self.0[start..].reverse();
    }

    /// removes the top `n` elements and returns them bottom to top
    pub fn split_top(&mut self, n: i64) -> Vec<i64> {
        let n = clamp_count(n, self.0.len());
        let start = self.0.len() - n;
        self.0.split_off(start)
    }

    pub fn into_vec(self) -> Vec<i64> {
        self.0
    }

    /// writes the stack top first, one number per line
    pub fn display(&self, out: &mut dyn Write) -> io::Result<()> {
        for v in self.0.iter().rev() {
            writeln!(out, "{}", v)?;
        }
        Ok(())
    }
}

impl From<Vec<i64>> for IntStack {
    fn from(value: Vec<i64>) -> Self {
        Self(value)
    }
}

impl FromIterator<i64> for IntStack {
    fn from_iter<T: IntoIterator<Item = i64>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// counts coming from the stack can be negative or larger than the stack
pub(crate) fn clamp_count(n: i64, len: usize) -> usize {
    usize::try_from(n).map_or(0, |n| n.min(len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underflow_is_zero() {
        let mut s = IntStack::new();
        assert_eq!(s.pop(), 0);
        assert_eq!(s.peek(), 0);
        assert_eq!(s.shift(), 0);
        assert!(s.is_empty());
    }

    #[test]
    fn test_shift_unshift() {
        let mut s = IntStack::from(vec![1, 2, 3]);
        s.unshift(0);
        assert_eq!(*s, vec![0, 1, 2, 3]);
        assert_eq!(s.shift(), 0);
        assert_eq!(s.peek(), 3);
    }

    #[test]
    fn test_remove_at_keeps_order() {
        let mut s = IntStack::from(vec![5, 6, 7, 8]);
        assert_eq!(s.remove_at(1), Some(6));
        assert_eq!(*s, vec![5, 7, 8]);
        assert_eq!(s.remove_at(3), None);
    }

    #[test]
    fn test_index_from_top() {
        let s = IntStack::from(vec![5, 6, 7]);
        assert_eq!(s.index_from_top(0), Some(2));
        assert_eq!(s.index_from_top(2), Some(0));
        assert_eq!(s.index_from_top(3), None);
        assert_eq!(s.index_from_top(-1), None);
    }

    #[test]
    fn test_reverse_and_split_clamp() {
        let mut s = IntStack::from(vec![1, 2, 3, 4]);
        s.reverse_top(2);
        assert_eq!(*s, vec![1, 2, 4, 3]);
        s.reverse_top(100);
        assert_eq!(*s, vec![3, 4, 2, 1]);
        assert_eq!(s.split_top(-4), Vec::<i64>::new());
        assert_eq!(s.split_top(3), vec![4, 2, 1]);
        assert_eq!(*s, vec![3]);
    }

    #[test]
    fn test_display_top_first() {
        let s = IntStack::from(vec![1, 2, 3]);
        let mut out = vec![];
        s.display(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "3\n2\n1\n");
    }
}
