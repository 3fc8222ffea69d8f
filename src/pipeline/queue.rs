use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

struct Entry<T> {
    sequence: usize,
    item: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sequence.cmp(&other.sequence)
    }
}

/// Hand-off between concurrent segment workers and the single ordered consumer.
///
/// `put` may be called from any number of tasks. `get` always yields the lowest
/// sequence number currently buffered, regardless of arrival order.
pub struct RendezvousQueue<T> {
    heap: Mutex<BinaryHeap<Reverse<Entry<T>>>>,
    available: Notify,
}

impl<T> RendezvousQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            available: Notify::new(),
        }
    }

    pub fn put(&self, sequence: usize, item: T) {
        self.heap.lock().unwrap().push(Reverse(Entry { sequence, item }));
        self.available.notify_one();
    }

    /// Waits up to `timeout` for any item and returns the lowest-numbered one.
    /// `None` means nothing arrived in time.
    pub async fn get(&self, timeout: Duration) -> Option<(usize, T)> {
        self.get_when(timeout, |_| true).await
    }

    /// Like `get`, but only hands out the head once its sequence is at most `next`.
    ///
    /// Later sequences stay buffered until every earlier one has been taken.
    pub async fn get_next(&self, next: usize, timeout: Duration) -> Option<(usize, T)> {
        self.get_when(timeout, |head| head <= next).await
    }

    pub fn len(&self) -> usize {
        self.heap.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn get_when<F>(&self, timeout: Duration, ready: F) -> Option<(usize, T)>
    where
        F: Fn(usize) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            // Register interest before checking so a put between the check and the await is not lost.
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(found) = self.try_pop(&ready) {
                return Some(found);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.try_pop(&ready);
            }
        }
    }

    fn try_pop<F>(&self, ready: &F) -> Option<(usize, T)>
    where
        F: Fn(usize) -> bool,
    {
        let mut heap = self.heap.lock().unwrap();
        match heap.peek() {
            Some(Reverse(head)) if ready(head.sequence) => {
                heap.pop().map(|Reverse(entry)| (entry.sequence, entry.item))
            }
            _ => None,
        }
    }
}

impl<T> Default for RendezvousQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
