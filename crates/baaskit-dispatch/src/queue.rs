//! Priority queue of pending jobs

use crate::job::Job;
use crate::priority::Priority;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

struct Entry {
    priority: Priority,
    seq: u64,
    job: Box<dyn Job>,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Max-heap: higher priority first, then the earlier submission
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Pending jobs ordered by `(priority desc, seq asc)`, plus the closed flag
///
/// Lives behind the dispatcher's mutex, so submission, removal and closing never race.
#[derive(Default)]
pub(crate) struct JobQueue {
    heap: BinaryHeap<Entry>,
    closed: bool,
}

impl JobQueue {
    pub(crate) fn push(&mut self, priority: Priority, job: Box<dyn Job>) {
        let seq = job.seq();
        self.heap.push(Entry { priority, seq, job });
    }

    /// Take the next job and mark it running
    pub(crate) fn pop(&mut self) -> Option<Box<dyn Job>> {
        self.heap.pop().map(|entry| {
            entry.job.mark_running();
            entry.job
        })
    }

    /// Remove a job that has not been taken by a worker yet
    pub(crate) fn remove(&mut self, seq: u64) -> Option<Box<dyn Job>> {
        if !self.heap.iter().any(|entry| entry.seq == seq) {
            return None;
        }
        let mut entries = std::mem::take(&mut self.heap).into_vec();
        let position = entries.iter().position(|entry| entry.seq == seq)?;
        let removed = entries.swap_remove(position);
        self.heap = BinaryHeap::from(entries);
        Some(removed.job)
    }

    /// Close the queue and hand back everything still pending, in dequeue order
    pub(crate) fn close(&mut self) -> Vec<Box<dyn Job>> {
        self.closed = true;
        let mut drained = Vec::with_capacity(self.heap.len());
        while let Some(entry) = self.heap.pop() {
            drained.push(entry.job);
        }
        drained
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::tests::NoopJob;

    #[test]
    fn test_priority_then_fifo() {
        let mut queue = JobQueue::default();
        queue.push(Priority(1), NoopJob::boxed(1));
        queue.push(Priority(5), NoopJob::boxed(2));
        queue.push(Priority(5), NoopJob::boxed(3));
        queue.push(Priority(1), NoopJob::boxed(4));
        queue.push(Priority(-2), NoopJob::boxed(5));
        queue.push(Priority(3), NoopJob::boxed(6));

        let order: Vec<u64> = std::iter::from_fn(|| queue.pop()).map(|job| job.seq()).collect();
        assert_eq!(order, vec![2, 3, 6, 1, 4, 5]);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut queue = JobQueue::default();
        for seq in 1..=4 {
            queue.push(Priority(0), NoopJob::boxed(seq));
        }
        assert_eq!(queue.remove(2).map(|job| job.seq()), Some(2));
        assert!(queue.remove(2).is_none());
        assert_eq!(queue.len(), 3);

        let order: Vec<u64> = std::iter::from_fn(|| queue.pop()).map(|job| job.seq()).collect();
        assert_eq!(order, vec![1, 3, 4]);
    }

    #[test]
    fn test_close_drains() {
        let mut queue = JobQueue::default();
        queue.push(Priority(0), NoopJob::boxed(1));
        queue.push(Priority(9), NoopJob::boxed(2));

        let drained: Vec<u64> = queue.close().iter().map(|job| job.seq()).collect();
        assert_eq!(drained, vec![2, 1]);
        assert!(queue.is_closed());
        assert!(queue.is_empty());
    }
}
