//! Suspended Work
//!
//! Propagation polls every triggered evaluation once, in place. Whatever
//! is still pending after that first poll is handed to the graph's driver:
//! one task that owns all suspended evaluations and polls them one at a
//! time.
//!
//! # Guarantees
//!
//! - Evaluations never run in parallel. Every poll of graph work, whether
//!   inline on the committing thread or resumed by the driver, happens
//!   while holding the graph's turn. The turn is reentrant, so a cascade
//!   triggered from inside a computation continues on the same thread.
//! - Suspended work is never dropped. Without a tokio runtime it is parked
//!   and stays visible through [`Graph::pending`]; the driver adopts it as
//!   soon as a runtime is known.
//!
//! The runtime is the one given to [`Graph::set_runtime`], else the one
//! current when the graph was built, else the one current when the work
//! suspended.

use std::task::Context;

use futures_util::future::{self, BoxFuture};
use futures_util::stream::{FuturesUnordered, StreamExt};
use futures_util::task::noop_waker_ref;
use futures_util::FutureExt;
use tokio::runtime::Handle as RuntimeHandle;
use tokio::sync::mpsc;

use super::runtime::Graph;

pub(crate) type Job = BoxFuture<'static, ()>;

/// Queue into the driver task, plus work waiting for a runtime.
#[derive(Default)]
pub(crate) struct Driver {
    queue: Option<mpsc::UnboundedSender<Job>>,
    parked: Vec<Job>,
}

impl Driver {
    /// Spawn the driver task on `runtime`, handing it every parked job.
    fn start(&mut self, runtime: &RuntimeHandle) {
        let (queue, incoming) = mpsc::unbounded_channel();
        let jobs: FuturesUnordered<Job> = self.parked.drain(..).collect();
        tracing::debug!(jobs = jobs.len(), "starting evaluation driver");
        runtime.spawn(serve(jobs, incoming));
        self.queue = Some(queue);
    }
}

/// Poll queued jobs until the graph is gone and every job has finished.
async fn serve(mut jobs: FuturesUnordered<Job>, mut incoming: mpsc::UnboundedReceiver<Job>) {
    loop {
        tokio::select! {
            job = incoming.recv() => match job {
                Some(job) => jobs.push(job),
                None => break,
            },
            Some(()) = jobs.next(), if !jobs.is_empty() => {}
        }
    }
    while jobs.next().await.is_some() {}
    tracing::debug!("evaluation driver stopped");
}

impl Graph {
    /// Runtime that resumes suspended evaluations.
    ///
    /// Overrides the runtime captured at construction. Work parked while no
    /// runtime was known starts resuming right away.
    pub fn set_runtime(&self, runtime: RuntimeHandle) {
        *self.inner.runtime.write() = Some(runtime.clone());
        let mut driver = self.inner.driver.lock();
        if driver.queue.is_none() && !driver.parked.is_empty() {
            driver.start(&runtime);
        }
    }

    /// Poll `work` once in place; if it suspends, hand it to the driver.
    pub(crate) fn drive(&self, mut work: Job) {
        {
            let _turn = self.inner.turn.lock();
            let mut cx = Context::from_waker(noop_waker_ref());
            if work.poll_unpin(&mut cx).is_ready() {
                return;
            }
        }
        self.suspend(self.serialized(work));
    }

    fn suspend(&self, work: Job) {
        let mut driver = self.inner.driver.lock();
        let work = match &driver.queue {
            Some(queue) => match queue.send(work) {
                Ok(()) => return,
                Err(mpsc::error::SendError(work)) => work,
            },
            None => work,
        };

        driver.queue = None;
        driver.parked.push(work);
        match self.runtime() {
            Some(runtime) => driver.start(&runtime),
            None => tracing::warn!(
                parked = driver.parked.len(),
                "evaluation suspended with no tokio runtime; parked until one is set"
            ),
        }
    }

    fn runtime(&self) -> Option<RuntimeHandle> {
        self.inner
            .runtime
            .read()
            .clone()
            .or_else(|| RuntimeHandle::try_current().ok())
    }

    /// Wrap `work` so that each poll holds the graph's turn.
    pub(crate) fn serialized<T: Send + 'static>(
        &self,
        mut work: BoxFuture<'static, T>,
    ) -> BoxFuture<'static, T> {
        let inner = self.inner.clone();
        future::poll_fn(move |cx| {
            let _turn = inner.turn.lock();
            work.poll_unpin(cx)
        })
        .boxed()
    }
}
