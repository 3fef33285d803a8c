//! Caller-side handle for asynchronous submissions

use crate::dispatcher::Shared;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering as AtomicOrdering};
use std::sync::{Arc, Weak};

const QUEUED: u8 = 0;
const RUNNING: u8 = 1;
const DONE: u8 = 2;

/// Lifecycle of one submission, shared by the queued job and its handle
#[derive(Debug)]
pub(crate) struct Control {
    seq: u64,
    cancelled: AtomicBool,
    state: AtomicU8,
}

impl Control {
    pub(crate) fn new(seq: u64) -> Self {
        Self { seq, cancelled: AtomicBool::new(false), state: AtomicU8::new(QUEUED) }
    }

    pub(crate) fn seq(&self) -> u64 {
        self.seq
    }

    /// Called by the queue when a worker takes the job
    pub(crate) fn mark_running(&self) {
        self.state.store(RUNNING, AtomicOrdering::SeqCst);
    }

    pub(crate) fn mark_done(&self) {
        self.state.store(DONE, AtomicOrdering::SeqCst);
    }

    pub(crate) fn is_done(&self) -> bool {
        self.state.load(AtomicOrdering::SeqCst) == DONE
    }

    pub(crate) fn request_cancel(&self) {
        self.cancelled.store(true, AtomicOrdering::SeqCst);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(AtomicOrdering::SeqCst)
    }
}

/// Returned by `Dispatcher::submit_async`
///
/// Handles compare and order by submission sequence. Keeping one after completion is
/// harmless; it only holds a weak reference to the dispatcher.
#[derive(Clone)]
pub struct RequestHandle {
    control: Arc<Control>,
    dispatcher: Weak<Shared>,
}

impl RequestHandle {
    pub(crate) fn new(control: Arc<Control>, dispatcher: Weak<Shared>) -> Self {
        Self { control, dispatcher }
    }

    /// Submission sequence number, unique per dispatcher
    pub fn sequence(&self) -> u64 {
        self.control.seq()
    }

    /// Whether the callback has already been invoked
    pub fn is_finished(&self) -> bool {
        self.control.is_done()
    }

    /// Cancel the submission
    ///
    /// Returns `true` only if the task was still queued: it is removed and its callback
    /// receives `Err(Cancelled)`. A running task is flagged instead; its result is
    /// discarded and its session change skipped, and `false` is returned. Completed tasks
    /// are left alone.
    pub fn cancel(&self) -> bool {
        match self.dispatcher.upgrade() {
            Some(shared) => shared.cancel(&self.control),
            None => false,
        }
    }
}

impl fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandle")
            .field("seq", &self.control.seq())
            .field("cancelled", &self.control.is_cancelled())
            .field("finished", &self.control.is_done())
            .finish()
    }
}

impl PartialEq for RequestHandle {
    fn eq(&self, other: &Self) -> bool {
        self.sequence() == other.sequence()
    }
}

impl Eq for RequestHandle {}

impl PartialOrd for RequestHandle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RequestHandle {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sequence().cmp(&other.sequence())
    }
}

impl Hash for RequestHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sequence().hash(state);
    }
}
