//! Worker pool and submission API

use crate::error::{DispatchError, DispatchResult};
use crate::handle::{Control, RequestHandle};
use crate::job::{ExecEnv, Job, TaskJob};
use crate::priority::Priority;
use crate::queue::JobQueue;
use crate::task::Task;
use baaskit_core::{CredentialStore, Envelope, FailureReason, RequestFactory, Transport};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Number of worker tasks, fixed for the dispatcher's lifetime
    pub workers: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { workers: 2 }
    }
}

impl DispatcherConfig {
    pub fn with_workers(workers: usize) -> Self {
        Self { workers }
    }

    pub fn validate(&self) -> DispatchResult<()> {
        if self.workers == 0 {
            return Err(DispatchError::InvalidConfig(
                "at least one worker is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// State shared between the dispatcher, its workers and outstanding handles
pub(crate) struct Shared {
    queue: Mutex<JobQueue>,
    notify: Notify,
    next_seq: AtomicU64,
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    factory: RequestFactory,
}

impl Shared {
    fn lock_queue(&self) -> MutexGuard<'_, JobQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn cancel(&self, control: &Control) -> bool {
        let removed = self.lock_queue().remove(control.seq());
        match removed {
            Some(job) => {
                control.request_cancel();
                job.cancel();
                true
            }
            None => {
                if !control.is_done() {
                    debug!(seq = control.seq(), "cancellation requested for running task");
                    control.request_cancel();
                }
                false
            }
        }
    }

    /// Stop accepting work and cancel everything still queued
    fn close(&self) -> usize {
        let drained = {
            let mut queue = self.lock_queue();
            if queue.is_closed() {
                return 0;
            }
            queue.close()
        };
        let count = drained.len();
        for job in drained {
            job.cancel();
        }
        self.notify.notify_waiters();
        count
    }
}

async fn worker_loop(id: usize, shared: Arc<Shared>) {
    debug!(worker = id, "worker started");
    loop {
        let notified = shared.notify.notified();
        tokio::pin!(notified);
        // Register before looking at the queue so a submit in between is not missed
        notified.as_mut().enable();

        let next = {
            let mut queue = shared.lock_queue();
            match queue.pop() {
                Some(job) => {
                    if !queue.is_empty() {
                        shared.notify.notify_one();
                    }
                    Some(job)
                }
                None if queue.is_closed() => break,
                None => None,
            }
        };

        match next {
            Some(job) => {
                let env = ExecEnv {
                    transport: shared.transport.as_ref(),
                    store: shared.store.as_ref(),
                    factory: &shared.factory,
                };
                let seq = job.seq();
                // Task code is guarded inside the job; what is left is the callback
                if let Err(payload) = AssertUnwindSafe(job.run(&env)).catch_unwind().await {
                    let reason = FailureReason::panicked(&*payload);
                    error!(worker = id, seq, %reason, "callback panicked");
                }
            }
            None => notified.await,
        }
    }
    debug!(worker = id, "worker stopped");
}

/// Bounded worker pool fed by one priority queue
///
/// Must be started inside a tokio runtime. Dropping the dispatcher closes the queue and
/// cancels queued tasks; running tasks finish on their own.
pub struct Dispatcher {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    pub fn start(
        config: DispatcherConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
        factory: RequestFactory,
    ) -> DispatchResult<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;

        let shared = Arc::new(Shared {
            queue: Mutex::new(JobQueue::default()),
            notify: Notify::new(),
            next_seq: AtomicU64::new(1),
            transport,
            store,
            factory,
        });

        let workers = (0..config.workers)
            .map(|id| runtime.spawn(worker_loop(id, shared.clone())))
            .collect();

        info!(workers = config.workers, base_url = shared.factory.base_url(), "dispatcher started");
        Ok(Self { shared, workers: Mutex::new(workers) })
    }

    /// Enqueue a task; `callback` runs exactly once on a worker with the result
    pub fn submit_async<T, F>(
        &self,
        task: T,
        priority: Priority,
        callback: F,
    ) -> DispatchResult<RequestHandle>
    where
        T: Task,
        F: FnOnce(Envelope<T::Output>) + Send + 'static,
    {
        let seq = self.shared.next_seq.fetch_add(1, Ordering::SeqCst);
        let control = Arc::new(Control::new(seq));
        let name = task.name();
        let job = Box::new(TaskJob::new(task, callback, control.clone()));

        {
            let mut queue = self.shared.lock_queue();
            if queue.is_closed() {
                return Err(DispatchError::ShutDown);
            }
            queue.push(priority, job);
            debug!(seq, task = name, %priority, queued = queue.len(), "task submitted");
        }
        self.shared.notify.notify_one();

        Ok(RequestHandle::new(control, Arc::downgrade(&self.shared)))
    }

    /// Submit and wait for the result
    pub async fn submit_sync<T: Task>(
        &self,
        task: T,
        priority: Priority,
    ) -> DispatchResult<Envelope<T::Output>> {
        let (tx, rx) = oneshot::channel();
        self.submit_async(task, priority, move |envelope| {
            let _ = tx.send(envelope);
        })?;
        rx.await.map_err(|_| DispatchError::WorkerLost)
    }

    /// Submit and block the current thread until the result arrives
    ///
    /// For threads outside the runtime; calling it from async code panics.
    pub fn submit_blocking<T: Task>(
        &self,
        task: T,
        priority: Priority,
    ) -> DispatchResult<Envelope<T::Output>> {
        let (tx, rx) = oneshot::channel();
        self.submit_async(task, priority, move |envelope| {
            let _ = tx.send(envelope);
        })?;
        rx.blocking_recv().map_err(|_| DispatchError::WorkerLost)
    }

    /// See [`RequestHandle::cancel`]
    pub fn cancel(&self, handle: &RequestHandle) -> bool {
        handle.cancel()
    }

    /// Number of tasks waiting for a worker
    pub fn queued(&self) -> usize {
        self.shared.lock_queue().len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.lock_queue().is_closed()
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.shared.store
    }

    pub fn factory(&self) -> &RequestFactory {
        &self.shared.factory
    }

    /// Stop accepting work, cancel queued tasks and wait for running ones to finish
    pub async fn shutdown(&self) {
        let cancelled = self.shared.close();
        let workers: Vec<JoinHandle<()>> = {
            let mut guard = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
            guard.drain(..).collect()
        };
        for worker in workers {
            let _ = worker.await;
        }
        info!(cancelled, "dispatcher shut down");
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shared.close();
    }
}
