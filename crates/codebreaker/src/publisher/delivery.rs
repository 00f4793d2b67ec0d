//! Serialized execution context for state updates and observer dispatch.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

type Job<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Single-consumer job queue that owns a piece of state.
///
/// Jobs posted from any thread run one at a time, in posting order, on one
/// task. The state is never reachable from outside a job.
pub(crate) struct DeliveryContext<S> {
    jobs: mpsc::UnboundedSender<Job<S>>,
}

impl<S: Send + 'static> DeliveryContext<S> {
    /// Spawns the consumer task on `runtime`, handing it ownership of `state`.
    pub(crate) fn spawn(runtime: &Handle, state: S) -> Self {
        let (jobs, mut queue) = mpsc::unbounded_channel::<Job<S>>();
        runtime.spawn(async move {
            let mut state = state;
            while let Some(job) = queue.recv().await {
                if catch_unwind(AssertUnwindSafe(|| job(&mut state))).is_err() {
                    error!("Delivery job panicked; continuing with next job");
                }
            }
            debug!("Delivery context closed");
        });
        Self { jobs }
    }

    /// Queues `job`. Returns false if the consumer has stopped.
    pub(crate) fn post(&self, job: impl FnOnce(&mut S) + Send + 'static) -> bool {
        let posted = self.jobs.send(Box::new(job)).is_ok();
        if !posted {
            warn!("Delivery context is gone; job dropped");
        }
        posted
    }

    /// Runs `read` on the consumer after every job queued before it.
    ///
    /// Returns `None` if the consumer has stopped.
    pub(crate) async fn query<R>(&self, read: impl FnOnce(&S) -> R + Send + 'static) -> Option<R>
    where
        R: Send + 'static,
    {
        let (reply, answer) = oneshot::channel();
        if !self.post(move |state| {
            let _ = reply.send(read(state));
        }) {
            return None;
        }
        answer.await.ok()
    }
}

impl<S> Clone for DeliveryContext<S> {
    fn clone(&self) -> Self {
        Self {
            jobs: self.jobs.clone(),
        }
    }
}

impl<S> fmt::Debug for DeliveryContext<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryContext")
            .field("closed", &self.jobs.is_closed())
            .finish()
    }
}
