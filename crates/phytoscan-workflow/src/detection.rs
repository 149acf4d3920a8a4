//! Classification request that outlives the fail-open deadline.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use phytoscan_sync::{ClassificationRequest, Classifier, ClientError};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What the classifier produced, once it has answered.
#[derive(Debug)]
pub enum DetectionOutcome {
    Response(Value),
    Failed(ClientError),
    /// The task panicked or was cancelled.
    Lost(String),
}

/// A classification running beside the session. Dropped tasks are aborted.
pub struct DetectionTask {
    handle: Option<JoinHandle<Result<Value, ClientError>>>,
}

impl DetectionTask {
    pub fn spawn(classifier: Arc<dyn Classifier>, request: ClassificationRequest) -> Self {
        let handle = tokio::spawn(async move { classifier.classify(&request).await });
        Self {
            handle: Some(handle),
        }
    }

    /// Wait at most `limit`. `None` means the call is still running.
    pub async fn wait(&mut self, limit: Duration) -> Option<DetectionOutcome> {
        let handle = self.handle.as_mut()?;
        let joined = tokio::time::timeout(limit, handle).await.ok()?;
        self.handle = None;
        Some(outcome(joined))
    }

    /// The outcome if the call has finished, without waiting.
    pub fn poll_ready(&mut self) -> Option<DetectionOutcome> {
        let handle = self.handle.as_mut()?;
        let joined = handle.now_or_never()?;
        self.handle = None;
        debug!("late classification arrived");
        Some(outcome(joined))
    }

    pub fn is_pending(&self) -> bool {
        self.handle.is_some()
    }

    pub fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("classification task aborted");
        }
    }
}

impl Drop for DetectionTask {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}

fn outcome(
    joined: Result<Result<Value, ClientError>, tokio::task::JoinError>,
) -> DetectionOutcome {
    match joined {
        Ok(Ok(raw)) => DetectionOutcome::Response(raw),
        Ok(Err(e)) => DetectionOutcome::Failed(e),
        Err(e) => {
            warn!(error = %e, "classification task did not complete");
            DetectionOutcome::Lost(e.to_string())
        }
    }
}
