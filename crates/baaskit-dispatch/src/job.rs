//! Type-erased task plus callback, and the execution state machine a worker runs

use crate::handle::Control;
use crate::task::{SessionEffect, Task};
use async_trait::async_trait;
use baaskit_core::{
    CredentialStore, Envelope, FailureReason, RequestContext, RequestFactory, Transport,
    UNAUTHENTICATED_STATUS,
};
use futures::FutureExt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What a worker lends a job while it runs
pub(crate) struct ExecEnv<'a> {
    pub(crate) transport: &'a dyn Transport,
    pub(crate) store: &'a dyn CredentialStore,
    pub(crate) factory: &'a RequestFactory,
}

#[async_trait]
pub(crate) trait Job: Send {
    fn seq(&self) -> u64;

    fn mark_running(&self);

    /// Deliver `Err(Cancelled)` without running
    fn cancel(self: Box<Self>);

    async fn run(self: Box<Self>, env: &ExecEnv<'_>);
}

pub(crate) struct TaskJob<T, F> {
    task: T,
    callback: F,
    control: Arc<Control>,
}

impl<T, F> TaskJob<T, F>
where
    T: Task,
    F: FnOnce(Envelope<T::Output>) + Send + 'static,
{
    pub(crate) fn new(task: T, callback: F, control: Arc<Control>) -> Self {
        Self { task, callback, control }
    }
}

/// Run task code, turning a panic into `Err(Panicked)`
fn guarded<R>(f: impl FnOnce() -> R) -> Result<R, FailureReason> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| FailureReason::panicked(&*payload))
}

fn deliver<T, F>(control: &Control, callback: F, envelope: Envelope<T>)
where
    F: FnOnce(Envelope<T>),
{
    control.mark_done();
    callback(envelope);
}

#[async_trait]
impl<T, F> Job for TaskJob<T, F>
where
    T: Task,
    F: FnOnce(Envelope<T::Output>) + Send + 'static,
{
    fn seq(&self) -> u64 {
        self.control.seq()
    }

    fn mark_running(&self) {
        self.control.mark_running();
    }

    fn cancel(self: Box<Self>) {
        let TaskJob { task, callback, control } = *self;
        debug!(seq = control.seq(), task = task.name(), "cancelled before start");
        deliver(&control, callback, Err(FailureReason::Cancelled));
    }

    async fn run(self: Box<Self>, env: &ExecEnv<'_>) {
        let TaskJob { task, callback, control } = *self;
        let seq = control.seq();
        let name = task.name();

        if control.is_cancelled() {
            debug!(seq, task = name, "cancelled before build");
            deliver(&control, callback, Err(FailureReason::Cancelled));
            return;
        }

        // The only session read of this attempt
        let session = env.store.get();
        let built = guarded(|| {
            let ctx = RequestContext::new(&session, env.factory);
            task.build_request(&ctx)
        });
        let request = match built {
            Ok(Some(request)) => request,
            Ok(None) => {
                let reason =
                    guarded(|| task.on_precondition_skip()).unwrap_or_else(|panicked| panicked);
                debug!(seq, task = name, %reason, "precondition not met, skipping");
                deliver(&control, callback, Err(reason));
                return;
            }
            Err(reason) => {
                error!(seq, task = name, %reason, "build_request panicked");
                deliver(&control, callback, Err(reason));
                return;
            }
        };

        debug!(seq, task = name, method = %request.method, path = %request.path(), "sending");
        let result = match AssertUnwindSafe(env.transport.execute(request)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => {
                let reason = FailureReason::panicked(&*payload);
                error!(seq, task = name, %reason, "transport panicked");
                deliver(&control, callback, Err(reason));
                return;
            }
        };

        if control.is_cancelled() {
            debug!(seq, task = name, "cancelled while running, discarding result");
            deliver(&control, callback, Err(FailureReason::Cancelled));
            return;
        }

        let response = match result {
            Ok(response) => response,
            Err(error) => {
                debug!(seq, task = name, %error, "transport failed");
                deliver(&control, callback, Err(error.into()));
                return;
            }
        };

        let status = response.status;
        let (envelope, mut effect) = match guarded(|| task.classify(status, &response, &session)) {
            Ok(outcome) => outcome.into_parts(),
            Err(reason) => {
                error!(seq, task = name, status, %reason, "classify panicked");
                (Err(reason), SessionEffect::Keep)
            }
        };
        if status == UNAUTHENTICATED_STATUS {
            effect = SessionEffect::Clear;
        }
        debug!(seq, task = name, status, ok = envelope.is_ok(), "classified");

        if control.is_cancelled() {
            debug!(seq, task = name, "cancelled before session update, discarding result");
            deliver(&control, callback, Err(FailureReason::Cancelled));
            return;
        }

        if let Err(reason) = guarded(|| apply_effect(env.store, effect, seq, name)) {
            error!(seq, task = name, %reason, "credential store panicked");
        }
        deliver(&control, callback, envelope);
    }
}

fn apply_effect(store: &dyn CredentialStore, effect: SessionEffect, seq: u64, task: &str) {
    let result = match effect {
        SessionEffect::Keep => return,
        SessionEffect::Replace(session) => {
            info!(seq, task, identity = session.identity().unwrap_or_default(), "session replaced");
            store.set(session)
        }
        SessionEffect::Clear => {
            info!(seq, task, "session cleared");
            store.clear()
        }
    };
    if let Err(error) = result {
        warn!(seq, task, %error, "failed to update credential store");
    }
}
