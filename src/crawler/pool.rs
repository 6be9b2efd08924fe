//! Resizable pool of fetch workers

use crate::crawler::worker::{run_worker, WorkerContext};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct WorkerHandle {
    id: usize,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns the worker tasks and their cancellation tokens
///
/// Every worker token is a child of the pool's root token, so cancelling the
/// root stops all of them. Retired workers finish their current batch before
/// exiting and are joined on [`shutdown`](Self::shutdown).
pub struct WorkerPool {
    ctx: Arc<WorkerContext>,
    root: CancellationToken,
    active: Vec<WorkerHandle>,
    retiring: Vec<JoinHandle<()>>,
    next_id: usize,
}

impl WorkerPool {
    pub fn new(ctx: Arc<WorkerContext>) -> Self {
        Self {
            ctx,
            root: CancellationToken::new(),
            active: Vec::new(),
            retiring: Vec::new(),
            next_id: 0,
        }
    }

    /// Starts `count` workers immediately
    pub fn spawn(&mut self, count: usize) {
        for _ in 0..count {
            let id = self.next_id;
            self.next_id += 1;

            let token = self.root.child_token();
            let handle = tokio::spawn(run_worker(Arc::clone(&self.ctx), id, token.clone()));
            self.active.push(WorkerHandle { id, token, handle });
        }
    }

    /// Signals the most recently started worker to stop after its batch
    ///
    /// Returns false if no worker is active.
    pub fn retire_one(&mut self) -> bool {
        let Some(worker) = self.active.pop() else {
            return false;
        };
        tracing::debug!("Retiring worker {}", worker.id);
        worker.token.cancel();
        self.retiring.push(worker.handle);
        self.retiring.retain(|handle| !handle.is_finished());
        true
    }

    /// Drops workers that exited without being retired
    ///
    /// Returns how many were removed.
    pub fn reap(&mut self) -> usize {
        let before = self.active.len();
        self.active.retain(|worker| {
            let finished = worker.handle.is_finished();
            if finished {
                tracing::warn!("Worker {} exited unexpectedly", worker.id);
            }
            !finished
        });
        before - self.active.len()
    }

    /// Workers currently pulling from the frontier
    pub fn active(&self) -> usize {
        self.active.len()
    }

    /// Cancels every worker and waits for all of them to finish
    pub async fn shutdown(self) {
        self.root.cancel();

        let handles = self
            .active
            .into_iter()
            .map(|worker| worker.handle)
            .chain(self.retiring);
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("Worker task failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::RetryPolicy;
    use crate::crawler::frontier::Frontier;
    use crate::crawler::metrics::FetchMetrics;
    use crate::crawler::politeness::PolitenessGate;
    use crate::index::IndexIntake;
    use reqwest::Client;
    use std::time::Duration;

    fn pool() -> (WorkerPool, tokio::sync::mpsc::Receiver<crate::index::IndexRecord>) {
        let (intake, rx) = IndexIntake::from_channel(4);
        let client = Client::new();
        let ctx = WorkerContext {
            frontier: Arc::new(Frontier::new()),
            gate: Arc::new(PolitenessGate::new(client.clone(), "TestBot", Duration::ZERO)),
            client,
            intake,
            metrics: Arc::new(FetchMetrics::new()),
            retry: RetryPolicy::none(),
            batch_size: 2,
            idle_backoff: Duration::from_millis(5),
        };
        (WorkerPool::new(Arc::new(ctx)), rx)
    }

    #[tokio::test]
    async fn test_spawn_and_retire() {
        let (mut pool, _rx) = pool();
        pool.spawn(3);
        assert_eq!(pool.active(), 3);

        assert!(pool.retire_one());
        assert_eq!(pool.active(), 2);

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_retire_empty_pool() {
        let (mut pool, _rx) = pool();
        assert!(!pool.retire_one());
        assert_eq!(pool.reap(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_releases_context() {
        let (mut pool, mut rx) = pool();
        pool.spawn(2);
        tokio::time::timeout(Duration::from_secs(1), pool.shutdown())
            .await
            .unwrap();

        // The last intake sender lived in the worker context
        assert!(rx.recv().await.is_none());
    }
}
