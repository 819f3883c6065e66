//! Storage for the heap stacks (`em` and friends).
//!
//! Programs only ever see an integer handle on their stack. Handles are indices
//! into this arena together with a generation, so a handle that was made up, or
//! one whose slot was released and reused, is rejected instead of aliasing
//! someone else's stack.
//!
//! Like the free-list heap it grew out of, removal pushes the index to
//! `free_indices`, and the next insert reuses it. The arena never shrinks.

/// An arena handle as it lives on the operand stack
pub type Handle = i64;

/// generations stay within 31 bits so that handles are positive
const MAX_GENERATION: u32 = i32::MAX as u32;

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_indices: Vec<usize>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: vec![],
            free_indices: vec![],
        }
    }

    pub fn insert(&mut self, val: T) -> Handle {
        let idx = if let Some(idx) = self.free_indices.pop() {
            self.slots[idx].value = Some(val);
            idx
        } else {
            // generations start at 1, so no handle is ever 0
            self.slots.push(Slot {
                generation: 1,
                value: Some(val),
            });
            self.slots.len() - 1
        };
        encode(idx, self.slots[idx].generation)
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        let (idx, generation) = decode(handle)?;
        self.slots
            .get(idx)
            .filter(|s| s.generation == generation)
            .and_then(|s| s.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        let (idx, generation) = decode(handle)?;
        self.slots
            .get_mut(idx)
            .filter(|s| s.generation == generation)
            .and_then(|s| s.value.as_mut())
    }

    /// releases the slot. Every handle to it is invalid afterwards
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        let (idx, generation) = decode(handle)?;
        let slot = self.slots.get_mut(idx)?;
        if slot.generation != generation {
            return None;
        }
        let val = slot.value.take()?;
        slot.generation = if slot.generation >= MAX_GENERATION {
            1
        } else {
            slot.generation + 1
        };
        self.free_indices.push(idx);
        Some(val)
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn encode(idx: usize, generation: u32) -> Handle {
    ((generation as i64) << 32) | (idx as u32 as i64)
}

fn decode(handle: Handle) -> Option<(usize, u32)> {
    let generation = u32::try_from(handle >> 32).ok()?;
    let idx = (handle & 0xffff_ffff) as usize;
    Some((idx, generation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_never_zero() {
        let mut a = Arena::new();
        let h = a.insert("first");
        assert_ne!(h, 0);
        assert_eq!(a.get(h), Some(&"first"));
        assert_eq!(a.get(0), None);
    }

    #[test]
    fn test_stale_handle_is_rejected() {
        let mut a = Arena::new();
        let h1 = a.insert(1);
        assert_eq!(a.remove(h1), Some(1));
        let h2 = a.insert(2);
        assert_ne!(h1, h2);
        assert_eq!(a.get(h1), None);
        assert_eq!(a.get(h2), Some(&2));
        assert_eq!(a.remove(h1), None);
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn test_generation_wraps_around() {
        let mut a = Arena::new();
        let h = a.insert('a');
        a.slots[0].generation = MAX_GENERATION;
        let old = encode(0, MAX_GENERATION);
        assert!(old > 0);
        assert_eq!(a.get(old), Some(&'a'));
        assert_eq!(a.remove(old), Some('a'));
        // the slot starts over, and the very first handle is live again
        let new = a.insert('b');
        assert_eq!(new, h);
        assert!(new > 0);
        assert_eq!(a.get(new), Some(&'b'));
        assert_eq!(a.get(old), None);
    }

    #[test]
    fn test_made_up_handles() {
        let mut a: Arena<i32> = Arena::new();
        a.insert(7);
        assert_eq!(a.get(-1), None);
        assert_eq!(a.get(12345), None);
        assert_eq!(a.get_mut(encode(3, 1)), None);
    }
}
