use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::{Request, Shared};
use crate::cache::ResultCache;
use crate::error::{BackendError, PredictionError};
use crate::predictor::{ScoringBackend, ScoringResult};

pub(crate) struct PredictionWorker {
    shared: Arc<Shared>,
    backend: Arc<dyn ScoringBackend>,
    cache: Arc<ResultCache>,
}

impl PredictionWorker {
    pub(crate) fn new(
        shared: Arc<Shared>,
        backend: Arc<dyn ScoringBackend>,
        cache: Arc<ResultCache>,
    ) -> PredictionWorker {
        PredictionWorker {
            shared,
            backend,
            cache,
        }
    }

    /// Blocks until a request is pending or the orchestrator shuts down.
    fn next_request(&self) -> Option<Request> {
        let mut slot = self.shared.slot.lock();

        loop {
            if slot.shutdown {
                return None;
            }

            if let Some(request) = slot.pending.take() {
                return Some(request);
            }

            self.shared.available.wait(&mut slot);
        }
    }

    #[inline(always)]
    fn drop_stale(&self, request: Request, stage: &str) {
        log::debug!("dropping superseded request {} {}", request.id, stage);
        self.shared.dropped.fetch_add(1, Ordering::SeqCst);
    }

    /// Calls the backend. A panicking backend fails this request only.
    fn score(&self, request: &Request) -> Result<ScoringResult, BackendError> {
        let backend = &self.backend;
        let scored = panic::catch_unwind(AssertUnwindSafe(|| {
            backend.score(&request.trajectory, request.candidates.as_ref())
        }));

        match scored {
            Ok(result) => result,
            Err(_) => {
                log::error!("scoring backend panicked on request {}", request.id);
                Err(BackendError::Failure("backend panicked".into()))
            }
        }
    }

    pub(crate) fn run(self) {
        log::debug!("prediction worker started");

        while let Some(request) = self.next_request() {
            if !self.shared.is_current(request.id) {
                self.drop_stale(request, "before scoring");
                continue;
            }

            let result = self.score(&request);

            match &result {
                Ok(scored) if self.shared.is_current(request.id) => {
                    self.cache.put(&request.trajectory, scored.clone())
                }
                Ok(_) => {}
                Err(e) => log::warn!("request {} failed: {}", request.id, e),
            }

            let slot = self.shared.slot.lock();
            if !self.shared.is_current(request.id) {
                drop(slot);
                self.drop_stale(request, "after scoring");
                continue;
            }

            request.deliver(&self.shared, result.map_err(Into::into));
        }

        log::debug!("prediction worker stopped");
    }
}

impl Drop for PredictionWorker {
    /// Closes the slot so that no submission waits on a worker that is gone.
    fn drop(&mut self) {
        let mut slot = self.shared.slot.lock();
        slot.shutdown = true;

        if let Some(request) = slot.pending.take() {
            if self.shared.is_current(request.id) {
                request.deliver(&self.shared, Err(PredictionError::WorkerStopped));
            } else {
                self.shared.dropped.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}
