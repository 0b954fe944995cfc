//! Bounded navigation cursor over the ordered question sequence.
//!
//! `next`/`previous` clamp at the boundaries (no wraparound, no error);
//! `go_to` rejects targets outside the valid interval. `is_first` and
//! `is_last` give the caller enough state to choose the "Next" vs
//! "Submit" affordance deterministically.

use crate::error::SessionError;

#[derive(Debug, Clone)]
pub struct NavigationCursor {
    index: usize,
    len: usize,
}

impl NavigationCursor {
    /// Cursor over `[0, len-1]`, starting at 0.
    pub fn new(len: usize) -> Self {
        Self { index: 0, len }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.len
    }

    /// Advance by one question; a no-op at the last index.
    pub fn next(&mut self) -> usize {
        if self.index + 1 < self.len {
            self.index += 1;
        }
        self.index
    }

    /// Step back by one question; a no-op at index 0.
    pub fn previous(&mut self) -> usize {
        if self.index > 0 {
            self.index -= 1;
        }
        self.index
    }

    /// Jump to an arbitrary question index.
    pub fn go_to(&mut self, index: usize) -> Result<(), SessionError> {
        if index >= self.len {
            return Err(SessionError::OutOfRange {
                index,
                len: self.len,
            });
        }
        self.index = index;
        Ok(())
    }
}
