mod error;
mod event;
mod state;


pub use error::{
    FailureKind, RunError, GENERIC_ERROR_MESSAGE, INSUFFICIENT_POINTS_MESSAGE, INVALID_K_MESSAGE,
};
pub use event::{Event, EventKind};
pub use state::{RunReport, RunState};

use crossbeam::channel::Sender;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn};

use crate::clusterer::{MultiStartKmeans, Partitioner};
use crate::codec::paginate;
use crate::commit::{CommitRequest, ResultCommitter};
use crate::config::{ClusterConfig, ConfigError};
use crate::db::{PointId, PointStore, ResultId, UserId};

/// One request to cluster a user's active points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRequest {
    pub user_id: UserId,
    pub k: usize,
    /// Falls back to the configured default group
    #[serde(default)]
    pub group_name: Option<String>,
    /// Opaque destination for the responses
    #[serde(default)]
    pub channel: String,
}

impl ClusterRequest {
    pub fn new(user_id: UserId, k: usize, channel: impl Into<String>) -> Self {
        Self {
            user_id,
            k,
            group_name: None,
            channel: channel.into(),
        }
    }

    pub fn with_group(mut self, group_name: impl Into<String>) -> Self {
        self.group_name = Some(group_name.into());
        self
    }
}

/// Runs clustering requests end to end: load, check, optimize, commit, page out.
pub struct Orchestrator<S, P = MultiStartKmeans> {
    store: Arc<S>,
    engine: P,
    committer: ResultCommitter,
    config: ClusterConfig,
}

impl<S: PointStore> Orchestrator<S, MultiStartKmeans> {
    pub fn new(store: Arc<S>, config: ClusterConfig) -> Result<Self, ConfigError> {
        let engine = MultiStartKmeans::from_seed(config.seed);
        Self::with_engine(store, engine, config)
    }
}

impl<S: PointStore, P: Partitioner> Orchestrator<S, P> {
    /// Rejects configs that fail [`ClusterConfig::validate`]
    pub fn with_engine(
        store: Arc<S>,
        engine: P,
        config: ClusterConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let committer = ResultCommitter::new(config.consume_inputs);
        Ok(Self {
            store,
            engine,
            committer,
            config,
        })
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn group_for<'a>(&'a self, request: &'a ClusterRequest) -> &'a str {
        request
            .group_name
            .as_deref()
            .unwrap_or(&self.config.default_group)
    }

    /// Run a request to a terminal state. Every outcome puts at least one
    /// event on `outbox` unless the receiving side is gone; a failure puts
    /// exactly one.
    pub fn run(&self, request: &ClusterRequest, outbox: &Sender<Event>) -> RunReport {
        let group = self.group_for(request);
        let span = info_span!(
            "cluster",
            user = request.user_id,
            group = %group,
            k = request.k,
            channel = %request.channel
        );
        let _entered = span.enter();
        info!("clustering run started");

        let mut state = RunState::Loading;
        // Nothing has been dispatched yet, so a panic still ends in one error event
        let executed = panic::catch_unwind(AssertUnwindSafe(|| {
            self.execute(request, group, &mut state)
        }))
        .unwrap_or_else(|payload| Err(RunError::Panicked(panic_message(payload.as_ref()))));

        match executed {
            Ok((result_id, pages)) => {
                advance(&mut state, RunState::Dispatching);
                let mut sent = 0;
                for page in pages {
                    if dispatch(outbox, Event::response(&request.channel, page)) {
                        sent += 1;
                    }
                }
                advance(&mut state, RunState::Done);
                info!(result_id, pages = sent, "clustering run finished");

                RunReport {
                    state,
                    result_id: Some(result_id),
                    messages_sent: sent,
                }
            }
            Err(err) => {
                let kind = err.kind();
                if kind == FailureKind::InsufficientPoints {
                    warn!(error = %err, "clustering request rejected");
                } else {
                    error!(error = %err, stage = ?state, "clustering run failed");
                }
                advance(&mut state, RunState::Failed(kind));

                let sent = dispatch(outbox, Event::error(&request.channel, err.user_message()));
                RunReport {
                    state,
                    result_id: err.partial_result_id(),
                    messages_sent: usize::from(sent),
                }
            }
        }
    }

    fn execute(
        &self,
        request: &ClusterRequest,
        group: &str,
        state: &mut RunState,
    ) -> Result<(ResultId, Vec<Vec<String>>), RunError> {
        let points = self.store.load_active_points(request.user_id, group)?;

        advance(state, RunState::Validating);
        if request.k == 0 {
            return Err(RunError::ZeroCentroids);
        }
        if request.k > points.len() {
            return Err(RunError::InsufficientPoints {
                requested: request.k,
                available: points.len(),
            });
        }

        advance(state, RunState::Optimizing);
        let coords: Vec<Vec<f64>> = points.iter().map(|p| p.coords.clone()).collect();
        let partition = self.engine.partition(
            &coords,
            request.k,
            self.config.restarts,
            self.config.max_iterations,
        )?;

        advance(state, RunState::Committing);
        let inputs: Vec<PointId> = points.iter().map(|p| p.id).collect();
        let outcome = self.committer.commit(
            self.store.as_ref(),
            &CommitRequest {
                user_id: request.user_id,
                group_name: group,
                k: request.k,
                restarts: self.config.restarts,
                max_iterations: self.config.max_iterations,
                centroids: &partition.centroids,
                inputs: &inputs,
            },
        )?;

        advance(state, RunState::Formatting);
        let pages = paginate(&outcome.labels, self.config.page_size);
        Ok((outcome.result_id, pages))
    }
}

fn advance(state: &mut RunState, next: RunState) {
    debug!(from = ?state, to = ?next, "run state");
    *state = next;
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn dispatch(outbox: &Sender<Event>, event: Event) -> bool {
    match outbox.send(event) {
        Ok(()) => true,
        Err(err) => {
            warn!(channel = %err.0.channel, "outbound queue closed, dropping response");
            false
        }
    }
}
