//! Fixed two-slot buffer with publish-on-commit semantics.

use core::ops::{Deref, DerefMut};

/// Two slots: one published for readers, one being assembled by the writer.
///
/// A [`WriteHandle`] borrows the buffer mutably, so no [`ReadHandle`] can
/// exist while a write is in progress; readers only ever see a slot that was
/// completely written and committed.
#[derive(Clone, Debug)]
pub struct DoubleBuffer<T> {
    slots: [T; 2],
    published: usize,
}

impl<T: Copy> DoubleBuffer<T> {
    /// Both slots start as `initial`.
    pub const fn new(initial: T) -> Self {
        Self {
            slots: [initial, initial],
            published: 0,
        }
    }

    /// Starts a write into the back slot, pre-filled with the published value.
    pub fn write(&mut self) -> WriteHandle<'_, T> {
        let back = self.published ^ 1;
        self.slots[back] = self.slots[self.published];
        WriteHandle { buffer: self, back }
    }

    /// Borrows the most recently committed value.
    pub fn read_latest(&self) -> ReadHandle<'_, T> {
        ReadHandle {
            value: &self.slots[self.published],
        }
    }

    /// Copy of the most recently committed value.
    pub fn latest(&self) -> T {
        self.slots[self.published]
    }
}

/// In-progress write; becomes visible to readers only on [`commit`](Self::commit).
pub struct WriteHandle<'a, T> {
    buffer: &'a mut DoubleBuffer<T>,
    back: usize,
}

impl<T> WriteHandle<'_, T> {
    /// Publishes the written slot.
    pub fn commit(self) {
        self.buffer.published = self.back;
    }
}

impl<T> Deref for WriteHandle<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.buffer.slots[self.back]
    }
}

impl<T> DerefMut for WriteHandle<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.buffer.slots[self.back]
    }
}

/// Shared view of the published slot.
pub struct ReadHandle<'a, T> {
    value: &'a T,
}

impl<T> Deref for ReadHandle<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value
    }
}
