/*!
 * Ready Queue Level
 * One FIFO priority level with its own lock and a lock-free length hint
 */

use super::Dispatch;
use parking_lot::{Mutex, MutexGuard};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

pub(super) struct LevelQueue {
    entries: Mutex<VecDeque<Dispatch>>,
    len: AtomicUsize,
}

impl LevelQueue {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            len: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, VecDeque<Dispatch>> {
        self.entries.lock()
    }

    /// Approximate length, readable without the level lock
    #[inline(always)]
    pub fn len_hint(&self) -> usize {
        self.len.load(Ordering::SeqCst)
    }

    /// Must be called with the level lock held, after appending
    #[inline(always)]
    pub fn inc(&self) {
        self.len.fetch_add(1, Ordering::SeqCst);
    }

    /// Must be called with the level lock held, after removing
    #[inline(always)]
    pub fn dec(&self) {
        let previous = self.len.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "level length underflow");
    }
}
