//! Re-entrant class locks for `synchronized` methods.
//!
//! A lock belongs to at most one program at a time and counts how many times
//! that program acquired it. Other programs never block: `lock` returns
//! `false` and the caller yields and retries on its next tick. Waiting
//! programs are remembered in a bounded FIFO so the lock is handed out in
//! request order once free.

use std::collections::VecDeque;

use crate::ProgramId;

#[derive(Clone, Debug, Default)]
pub struct ClassLock {
    holder: Option<ProgramId>,
    count: u32,
    waiters: VecDeque<ProgramId>,
}

impl ClassLock {
    pub fn new() -> Self {
        ClassLock::default()
    }

    #[inline]
    pub fn holder(&self) -> Option<ProgramId> {
        self.holder
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Try to acquire for `program`. A full waiter queue leaves the caller
    /// unqueued; it keeps polling and gets queued once there is room.
    pub fn lock(&mut self, program: ProgramId, queue_len: usize) -> bool {
        match self.holder {
            Some(holder) if holder == program => {
                self.count += 1;
                true
            }
            None if self.waiters.front().map_or(true, |&w| w == program) => {
                self.waiters.pop_front();
                self.holder = Some(program);
                self.count = 1;
                true
            }
            _ => {
                if !self.waiters.contains(&program) && self.waiters.len() < queue_len {
                    self.waiters.push_back(program);
                }
                false
            }
        }
    }

    /// Release one acquisition. Returns false if `program` does not hold it.
    pub fn unlock(&mut self, program: ProgramId) -> bool {
        if self.holder != Some(program) {
            return false;
        }
        self.count = self.count.saturating_sub(1);
        if self.count == 0 {
            self.holder = None;
        }
        true
    }

    /// Drop every acquisition and queue entry of `program`.
    pub fn free(&mut self, program: ProgramId) {
        if self.holder == Some(program) {
            self.holder = None;
            self.count = 0;
        }
        self.waiters.retain(|&w| w != program);
    }
}

#[cfg(test)]
mod tests;
