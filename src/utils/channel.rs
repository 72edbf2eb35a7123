use std::sync::{Condvar, Mutex};

use crossbeam_queue::SegQueue;

/// Unbounded FIFO channel with any number of producers and a single blocking
/// consumer. Items live in a lock-free queue; the mutex only exists so the
/// consumer can park on the condvar without missing a wakeup.
pub struct Channel<T> {
    queue: SegQueue<T>,
    parked: Mutex<()>,
    condvar: Condvar,
}

impl<T> Channel<T> {
    pub fn new() -> Self {
        Self {
            queue: SegQueue::new(),
            parked: Mutex::new(()),
            condvar: Condvar::new(),
        }
    }

    pub fn put(&self, element: T) {
        self.queue.push(element);

        // Taking the lock orders this notify after any consumer that has
        // checked the queue and is about to wait.
        let _guard = self.parked.lock().unwrap();
        self.condvar.notify_one();
    }

    /// Blocks until an item is available and returns the oldest one.
    pub fn get(&self) -> T {
        if let Some(element) = self.queue.pop() {
            return element;
        }

        let mut guard = self.parked.lock().unwrap();
        loop {
            if let Some(element) = self.queue.pop() {
                return element;
            }
            guard = self.condvar.wait(guard).unwrap();
        }
    }

    pub fn try_get(&self) -> Option<T> {
        self.queue.pop()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}
