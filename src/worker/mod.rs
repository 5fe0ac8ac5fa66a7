
use crossbeam::channel::{unbounded, Receiver, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{error, info};

use crate::clusterer::Partitioner;
use crate::db::PointStore;
use crate::orchestrator::{ClusterRequest, Event, Orchestrator};

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Work queue is closed")]
    Closed,

    #[error("Worker pool needs at least one worker")]
    NoWorkers,
}

/// Fixed set of threads draining an unbounded request queue.
///
/// Each request runs to completion on one worker; responses go to the shared
/// outbound channel in page order.
pub struct WorkerPool {
    queue: Option<Sender<ClusterRequest>>,
    handles: Vec<JoinHandle<usize>>,
}

impl WorkerPool {
    pub fn spawn<S, P>(
        orchestrator: Arc<Orchestrator<S, P>>,
        workers: usize,
        outbox: Sender<Event>,
    ) -> Result<Self, PoolError>
    where
        S: PointStore + 'static,
        P: Partitioner + 'static,
    {
        if workers == 0 {
            return Err(PoolError::NoWorkers);
        }

        let (queue, requests) = unbounded::<ClusterRequest>();
        let handles = (0..workers)
            .map(|index| {
                let orchestrator = Arc::clone(&orchestrator);
                let requests = requests.clone();
                let outbox = outbox.clone();
                thread::Builder::new()
                    .name(format!("cluster-worker-{}", index))
                    .spawn(move || work(&orchestrator, &requests, &outbox))
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(workers, "worker pool started");
        Ok(Self {
            queue: Some(queue),
            handles,
        })
    }

    pub fn submit(&self, request: ClusterRequest) -> Result<(), PoolError> {
        self.queue
            .as_ref()
            .ok_or(PoolError::Closed)?
            .send(request)
            .map_err(|_| PoolError::Closed)
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Stop accepting work, let queued requests finish and join the workers.
    /// Returns how many requests were processed.
    pub fn shutdown(mut self) -> usize {
        self.close()
    }

    fn close(&mut self) -> usize {
        self.queue.take();
        self.handles
            .drain(..)
            .map(|handle| handle.join().unwrap_or(0))
            .sum()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
    }
}

fn work<S, P>(
    orchestrator: &Orchestrator<S, P>,
    requests: &Receiver<ClusterRequest>,
    outbox: &Sender<Event>,
) -> usize
where
    S: PointStore,
    P: Partitioner,
{
    let mut processed = 0;
    for request in requests.iter() {
        // Panics inside a run already become an error event; one escaping
        // here happened while pages were going out, so nothing more is sent.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| orchestrator.run(&request, outbox)));
        if outcome.is_err() {
            error!(
                user = request.user_id,
                channel = %request.channel,
                "clustering run panicked while dispatching"
            );
        }
        processed += 1;
    }
    processed
}
