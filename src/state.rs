use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::discord::verify::SignatureVerifier;
use crate::pipeline::Pipeline;

/// Everything the inbound handler needs, shared across requests.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<SignatureVerifier>,
    pub pipeline: Arc<Pipeline>,
    pub in_flight: Arc<InFlight>,
}

impl AppState {
    pub fn new(verifier: SignatureVerifier, pipeline: Pipeline) -> Self {
        Self {
            verifier: Arc::new(verifier),
            pipeline: Arc::new(pipeline),
            in_flight: Arc::new(InFlight::default()),
        }
    }
}

/// Pipelines that were acknowledged but have not reached a delivery state yet.
#[derive(Default)]
pub struct InFlight {
    tasks: Mutex<JoinSet<()>>,
}

impl InFlight {
    pub async fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().await;
        // Reap finished pipelines so the set only holds live ones.
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Waits up to `grace` for every tracked pipeline. Returns how many were
    /// still running and got aborted.
    pub async fn drain(&self, grace: Duration) -> usize {
        let mut tasks = std::mem::take(&mut *self.tasks.lock().await);
        if tasks.is_empty() {
            return 0;
        }

        info!("waiting for {} in-flight interactions", tasks.len());
        let finished = tokio::time::timeout(grace, async {
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    warn!("interaction task ended abnormally: {}", e);
                }
            }
        })
        .await;

        if finished.is_ok() {
            return 0;
        }
        let abandoned = tasks.len();
        warn!("{} interactions did not finish within {:?}", abandoned, grace);
        tasks.shutdown().await;
        abandoned
    }
}
