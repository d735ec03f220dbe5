//! Network-Boundary Cache Worker
//!
//! A service-worker-style cache living in its own task: the page side talks
//! to it only through messages, never shared memory. Every intercepted fetch
//! travels over an mpsc channel and comes back on a oneshot; the worker owns
//! its response buckets outright.

pub mod buckets;
pub mod request;
pub mod routes;
#[allow(clippy::module_inception)]
pub mod worker;

pub use buckets::{BucketKind, BucketStore, CACHE_VERSION};
pub use request::{
    Destination, FetchError, Fetcher, HttpFetcher, WorkerRequest, WorkerResponse, SW_CACHE_STALE,
    SW_CACHE_TIMESTAMP,
};
pub use routes::{api_whitelist, is_static_asset, match_api_route, ApiRoute, STATIC_ASSETS};
pub use worker::{LifecycleState, NetworkWorker};

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::info;

// == Control Protocol ==
/// Out-of-band commands the page side can post to the worker.
#[derive(Debug)]
pub enum ControlCommand {
    /// Activate immediately instead of waiting for pages to close.
    SkipWaiting,
    /// Wipe every response bucket.
    ClearCache,
}

/// Acknowledgement for a control command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlAck {
    pub success: bool,
}

// == Worker Messages ==
/// Everything that can cross the page-to-worker channel.
#[derive(Debug)]
pub enum WorkerMessage {
    Fetch {
        request: WorkerRequest,
        reply: oneshot::Sender<Result<WorkerResponse, FetchError>>,
    },
    Control {
        command: ControlCommand,
        reply: oneshot::Sender<ControlAck>,
    },
}

// == Worker Handle ==
/// The page side's end of the channel. Cheap to clone; every caller shares
/// the one worker task.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<WorkerMessage>,
}

impl WorkerHandle {
    /// Sends an intercepted request to the worker and waits for the routed
    /// response. A dead worker task surfaces as `WorkerUnavailable`.
    pub async fn fetch(&self, request: WorkerRequest) -> Result<WorkerResponse, FetchError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WorkerMessage::Fetch { request, reply })
            .await
            .map_err(|_| FetchError::WorkerUnavailable)?;
        rx.await.map_err(|_| FetchError::WorkerUnavailable)?
    }

    /// Posts a control command and waits for its acknowledgement.
    pub async fn control(&self, command: ControlCommand) -> Result<ControlAck, FetchError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WorkerMessage::Control { command, reply })
            .await
            .map_err(|_| FetchError::WorkerUnavailable)?;
        rx.await.map_err(|_| FetchError::WorkerUnavailable)
    }
}

// == Spawn ==
/// Spawns the worker task: opens its buckets under `bucket_dir`, runs the
/// install/activate lifecycle against `base_url`, then serves messages until
/// every handle is dropped.
pub fn spawn_worker(
    fetcher: Arc<dyn Fetcher>,
    bucket_dir: &Path,
    base_url: String,
) -> Result<(WorkerHandle, JoinHandle<()>)> {
    let mut worker = NetworkWorker::new(fetcher, bucket_dir)?;
    let (tx, mut rx) = mpsc::channel::<WorkerMessage>(64);

    let handle = tokio::spawn(async move {
        worker.install(&base_url).await;

        while let Some(message) = rx.recv().await {
            match message {
                WorkerMessage::Fetch { request, reply } => {
                    let response = worker.handle_fetch(&request).await;
                    let _ = reply.send(response);
                }
                WorkerMessage::Control { command, reply } => {
                    let ack = match command {
                        ControlCommand::SkipWaiting => {
                            worker.activate();
                            ControlAck { success: true }
                        }
                        ControlCommand::ClearCache => ControlAck {
                            success: worker.clear_all_buckets(),
                        },
                    };
                    let _ = reply.send(ack);
                }
            }
        }

        info!("Worker task shutting down");
    });

    Ok((WorkerHandle { tx }, handle))
}
