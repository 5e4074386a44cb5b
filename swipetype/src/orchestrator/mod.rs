//! Single-flight scheduling of backend scoring.
//!
//! Each gesture is submitted with a fresh request id which becomes the
//! "current" one. A single pending slot sits between the input thread and
//! one background worker: submitting while a request is still waiting
//! replaces it. The worker re-checks that its request is still current before
//! and after calling the backend, and only current requests are delivered.
//!
//! Advancing the current id and delivering a result both happen under the
//! slot lock, so a result is never delivered once a newer request exists.
//!
//! Every submission ends in exactly one of three ways: a result, an error,
//! or silence when a newer submission superseded it. Silence shows up on the
//! [`PredictionHandle`] as `None`.
mod worker;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

use hashbrown::HashSet;
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use smol_str::SmolStr;

use self::worker::PredictionWorker;
use crate::cache::ResultCache;
use crate::error::PredictionError;
use crate::predictor::{ScoringBackend, ScoringResult};
use crate::types::Trajectory;

/// Monotonically increasing id of a submission.
pub type RequestId = u64;

/// What a handle resolves to when it is delivered.
pub type PredictionResult = Result<ScoringResult, PredictionError>;

pub(crate) struct Request {
    id: RequestId,
    trajectory: Trajectory,
    candidates: Option<HashSet<SmolStr>>,
    sender: mpsc::SyncSender<PredictionResult>,
}

impl Request {
    /// Must be called with the slot locked.
    fn deliver(&self, shared: &Shared, result: PredictionResult) {
        shared.delivered.fetch_add(1, Ordering::SeqCst);
        // the handle may already be gone
        let _ = self.sender.send(result);
    }
}

#[derive(Default)]
struct Slot {
    pending: Option<Request>,
    shutdown: bool,
}

pub(crate) struct Shared {
    slot: Mutex<Slot>,
    available: Condvar,
    next_id: AtomicU64,
    current: AtomicU64,
    submitted: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl Shared {
    fn new() -> Shared {
        Shared {
            slot: Mutex::new(Slot::default()),
            available: Condvar::new(),
            next_id: AtomicU64::new(0),
            current: AtomicU64::new(0),
            submitted: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    #[inline(always)]
    fn is_current(&self, id: RequestId) -> bool {
        self.current.load(Ordering::SeqCst) == id
    }

    fn advance(&self) -> RequestId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.current.store(id, Ordering::SeqCst);
        id
    }
}

/// Counters describing the orchestrator's lifetime so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrchestratorStats {
    /// id of the latest submission or cancellation
    pub current_id: RequestId,
    /// submissions so far
    pub submitted: u64,
    /// results and errors delivered
    pub delivered: u64,
    /// requests superseded before delivery
    pub dropped: u64,
}

/// The receiving end of one submission.
pub struct PredictionHandle {
    id: RequestId,
    shared: Arc<Shared>,
    receiver: mpsc::Receiver<PredictionResult>,
}

impl PredictionHandle {
    /// this request's id
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// whether no newer submission or cancellation has happened since
    pub fn is_current(&self) -> bool {
        self.shared.is_current(self.id)
    }

    /// Blocks until the request resolves. `None` means it was superseded.
    pub fn wait(self) -> Option<PredictionResult> {
        self.receiver.recv().ok()
    }

    /// Like [`wait`](Self::wait), also returning `None` when `timeout`
    /// elapses first.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<PredictionResult> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Returns the outcome if it has already arrived.
    pub fn try_get(&self) -> Option<PredictionResult> {
        self.receiver.try_recv().ok()
    }

    /// Supersedes this request if it is still the current one.
    pub fn cancel(&self) {
        let _slot = self.shared.slot.lock();
        let next = self.shared.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.shared.current.compare_exchange(
            self.id,
            next,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}

impl std::fmt::Debug for PredictionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionHandle")
            .field("id", &self.id)
            .field("current", &self.is_current())
            .finish()
    }
}

/// Schedules scoring requests on a background worker.
pub struct PredictionOrchestrator {
    shared: Arc<Shared>,
    cache: Arc<ResultCache>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PredictionOrchestrator {
    /// Starts the worker thread.
    pub fn new(
        backend: Arc<dyn ScoringBackend>,
        cache: Arc<ResultCache>,
    ) -> std::io::Result<PredictionOrchestrator> {
        let shared = Arc::new(Shared::new());
        let worker = PredictionWorker::new(Arc::clone(&shared), backend, Arc::clone(&cache));

        let join = std::thread::Builder::new()
            .name("swipetype-predict".into())
            .spawn(move || worker.run())?;

        Ok(PredictionOrchestrator {
            shared,
            cache,
            worker: Mutex::new(Some(join)),
        })
    }

    fn handle(&self, id: RequestId) -> (mpsc::SyncSender<PredictionResult>, PredictionHandle) {
        let (sender, receiver) = mpsc::sync_channel(1);
        let handle = PredictionHandle {
            id,
            shared: Arc::clone(&self.shared),
            receiver,
        };
        (sender, handle)
    }

    /// Submits a trajectory, superseding every earlier submission.
    ///
    /// Trajectories under two points resolve to an empty result and cached
    /// gestures resolve immediately; neither reaches the backend.
    pub fn submit(
        &self,
        trajectory: Trajectory,
        candidates: Option<HashSet<SmolStr>>,
    ) -> PredictionHandle {
        let immediate = if trajectory.len() < 2 {
            Some(Ok(ScoringResult::empty()))
        } else {
            self.cache.get(&trajectory).map(Ok)
        };

        let mut slot = self.shared.slot.lock();
        let id = self.shared.advance();
        self.shared.submitted.fetch_add(1, Ordering::SeqCst);
        let (sender, handle) = self.handle(id);

        let request = Request {
            id,
            trajectory,
            candidates,
            sender,
        };

        if let Some(result) = immediate {
            log::trace!("request {} resolved without scoring", id);
            request.deliver(&self.shared, result);
            return handle;
        }

        if slot.shutdown {
            request.deliver(&self.shared, Err(PredictionError::WorkerStopped));
            return handle;
        }

        if let Some(old) = slot.pending.replace(request) {
            log::debug!("request {} replaced pending request {}", id, old.id);
            self.shared.dropped.fetch_add(1, Ordering::SeqCst);
        }

        self.shared.available.notify_one();
        handle
    }

    /// Supersedes whatever is pending or in flight. Safe to call repeatedly.
    pub fn cancel_pending(&self) {
        let _slot = self.shared.slot.lock();
        let id = self.shared.advance();
        log::trace!("cancelled pending requests, current id is now {}", id);
    }

    /// id of the latest submission or cancellation
    pub fn current_id(&self) -> RequestId {
        self.shared.current.load(Ordering::SeqCst)
    }

    /// the cache consulted before scoring
    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Request counters so far.
    pub fn stats(&self) -> OrchestratorStats {
        OrchestratorStats {
            current_id: self.current_id(),
            submitted: self.shared.submitted.load(Ordering::SeqCst),
            delivered: self.shared.delivered.load(Ordering::SeqCst),
            dropped: self.shared.dropped.load(Ordering::SeqCst),
        }
    }

    /// Stops the worker and waits for it. A pending request is dropped;
    /// later submissions resolve to [`PredictionError::WorkerStopped`].
    pub fn shutdown(&self) {
        {
            let mut slot = self.shared.slot.lock();
            slot.shutdown = true;
            if slot.pending.take().is_some() {
                self.shared.dropped.fetch_add(1, Ordering::SeqCst);
            }
        }
        self.shared.available.notify_all();

        if let Some(join) = self.worker.lock().take() {
            if join.join().is_err() {
                log::error!("prediction worker panicked");
            }
        }
    }
}

impl Drop for PredictionOrchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for PredictionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionOrchestrator")
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::error::BackendError;
    use crate::predictor::ScoredWord;
    use crate::types::Point;

    use std::sync::atomic::AtomicUsize;

    /// Answers with the number of points after a delay.
    struct SlowBackend {
        delay: Duration,
        calls: AtomicUsize,
    }

    impl SlowBackend {
        fn new(delay_ms: u64) -> SlowBackend {
            SlowBackend {
                delay: Duration::from_millis(delay_ms),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ScoringBackend for SlowBackend {
        fn score(
            &self,
            trajectory: &Trajectory,
            _candidates: Option<&HashSet<SmolStr>>,
        ) -> Result<ScoringResult, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            let word = format!("len{}", trajectory.len());
            Ok(ScoringResult::new(vec![ScoredWord::new(&word, 1)]))
        }
    }

    struct FailingBackend;

    impl ScoringBackend for FailingBackend {
        fn score(
            &self,
            _trajectory: &Trajectory,
            _candidates: Option<&HashSet<SmolStr>>,
        ) -> Result<ScoringResult, BackendError> {
            Err(BackendError::Failure("model crashed".into()))
        }
    }

    /// Reports when scoring starts and holds it until released.
    struct GatedBackend {
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl GatedBackend {
        fn new() -> (GatedBackend, mpsc::Receiver<()>, mpsc::Sender<()>) {
            let (entered, on_enter) = mpsc::channel();
            let (release, on_release) = mpsc::channel();
            let backend = GatedBackend {
                entered: Mutex::new(entered),
                release: Mutex::new(on_release),
            };
            (backend, on_enter, release)
        }
    }

    impl ScoringBackend for GatedBackend {
        fn score(
            &self,
            _trajectory: &Trajectory,
            _candidates: Option<&HashSet<SmolStr>>,
        ) -> Result<ScoringResult, BackendError> {
            let _ = self.entered.lock().send(());
            let _ = self.release.lock().recv_timeout(PATIENCE);
            Ok(ScoringResult::new(vec![ScoredWord::new("gated", 1)]))
        }
    }

    /// Panics on trajectories of exactly three points.
    struct PanickingBackend;

    impl ScoringBackend for PanickingBackend {
        fn score(
            &self,
            trajectory: &Trajectory,
            _candidates: Option<&HashSet<SmolStr>>,
        ) -> Result<ScoringResult, BackendError> {
            if trajectory.len() == 3 {
                panic!("model blew up");
            }
            Ok(ScoringResult::new(vec![ScoredWord::new("fine", 1)]))
        }
    }

    fn cache() -> Arc<ResultCache> {
        Arc::new(ResultCache::new(&CacheConfig::default()))
    }

    fn line(y: f32, n: usize) -> Trajectory {
        Trajectory::from_points((0..n).map(|i| Point::new(i as f32 * 20.0, y)))
    }

    const PATIENCE: Duration = Duration::from_secs(5);

    #[test]
    fn only_latest_submission_is_delivered() {
        let backend = Arc::new(SlowBackend::new(200));
        let orchestrator = PredictionOrchestrator::new(backend, cache()).unwrap();

        let a = orchestrator.submit(line(0.0, 10), None);
        let b = orchestrator.submit(line(300.0, 12), None);

        assert!(!a.is_current());
        assert!(b.is_current());

        let b = b.wait_timeout(PATIENCE).expect("b delivered").unwrap();
        assert_eq!(b.words(), vec!["len12"]);
        assert!(a.wait().is_none());

        let stats = orchestrator.stats();
        assert_eq!(stats.submitted, 2);
        assert_eq!(stats.delivered, 1);
    }

    #[test]
    fn immediate_result_supersedes_in_flight_request() {
        let (backend, entered, release) = GatedBackend::new();
        let orchestrator = PredictionOrchestrator::new(Arc::new(backend), cache()).unwrap();

        let a = orchestrator.submit(line(0.0, 10), None);
        entered.recv_timeout(PATIENCE).expect("scoring started");

        // resolves on the spot while a is still being scored
        let b = orchestrator.submit(Trajectory::from_points(vec![Point::new(1.0, 1.0)]), None);
        assert_eq!(b.try_get(), Some(Ok(ScoringResult::empty())));

        release.send(()).unwrap();
        assert!(a.wait().is_none());

        let stats = orchestrator.stats();
        assert_eq!(stats.submitted, 2);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.dropped, 1);
        // superseded results are not cached either
        assert!(orchestrator.cache().is_empty());
    }

    #[test]
    fn backend_panic_fails_only_its_request() {
        let orchestrator = PredictionOrchestrator::new(Arc::new(PanickingBackend), cache()).unwrap();

        let outcome = orchestrator.submit(line(0.0, 3), None).wait_timeout(PATIENCE);
        assert_eq!(
            outcome,
            Some(Err(PredictionError::Backend(BackendError::Failure(
                "backend panicked".into()
            ))))
        );

        let outcome = orchestrator.submit(line(200.0, 10), None).wait_timeout(PATIENCE);
        assert_eq!(outcome.unwrap().unwrap().words(), vec!["fine"]);
    }

    #[test]
    fn cancel_pending_delivers_nothing() {
        let backend = Arc::new(SlowBackend::new(100));
        let orchestrator = PredictionOrchestrator::new(backend, cache()).unwrap();

        let a = orchestrator.submit(line(0.0, 10), None);
        orchestrator.cancel_pending();
        orchestrator.cancel_pending();

        assert!(a.wait().is_none());
        assert_eq!(orchestrator.stats().delivered, 0);
    }

    #[test]
    fn cancel_with_nothing_pending() {
        let orchestrator = PredictionOrchestrator::new(Arc::new(SlowBackend::new(0)), cache()).unwrap();
        let before = orchestrator.current_id();
        orchestrator.cancel_pending();
        assert!(orchestrator.current_id() > before);
    }

    #[test]
    fn handle_cancel_only_affects_itself() {
        let orchestrator = PredictionOrchestrator::new(Arc::new(SlowBackend::new(100)), cache()).unwrap();

        let a = orchestrator.submit(line(0.0, 10), None);
        let b = orchestrator.submit(line(300.0, 10), None);
        // a is already superseded, so this must not touch b
        a.cancel();
        assert!(b.is_current());

        b.cancel();
        assert!(!b.is_current());
        assert!(b.wait().is_none());
    }

    #[test]
    fn backend_errors_are_delivered() {
        let orchestrator = PredictionOrchestrator::new(Arc::new(FailingBackend), cache()).unwrap();

        let outcome = orchestrator.submit(line(0.0, 10), None).wait();
        assert_eq!(
            outcome,
            Some(Err(PredictionError::Backend(BackendError::Failure(
                "model crashed".into()
            ))))
        );
        // failures are not cached
        assert!(orchestrator.cache().is_empty());
    }

    #[test]
    fn cache_hit_skips_backend() {
        let backend = Arc::new(SlowBackend::new(0));
        let cache = cache();
        let cached = ScoringResult::new(vec![ScoredWord::new("cached", 7)]);
        cache.put(&line(0.0, 10), cached.clone());

        let orchestrator = PredictionOrchestrator::new(backend.clone(), cache).unwrap();
        let handle = orchestrator.submit(line(2.0, 10), None);

        assert_eq!(handle.try_get(), Some(Ok(cached)));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn results_are_cached() {
        let backend = Arc::new(SlowBackend::new(0));
        let orchestrator = PredictionOrchestrator::new(backend.clone(), cache()).unwrap();

        let first = orchestrator.submit(line(0.0, 10), None).wait();
        let second = orchestrator.submit(line(1.0, 10), None).wait();

        assert_eq!(first, second);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn short_trajectories_are_empty() {
        let backend = Arc::new(SlowBackend::new(0));
        let orchestrator = PredictionOrchestrator::new(backend.clone(), cache()).unwrap();

        let handle = orchestrator.submit(Trajectory::from_points(vec![Point::new(1.0, 1.0)]), None);
        assert_eq!(handle.wait(), Some(Ok(ScoringResult::empty())));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn submissions_after_shutdown() {
        let orchestrator = PredictionOrchestrator::new(Arc::new(SlowBackend::new(0)), cache()).unwrap();
        orchestrator.shutdown();
        orchestrator.shutdown();

        let outcome = orchestrator.submit(line(0.0, 10), None).wait();
        assert_eq!(outcome, Some(Err(PredictionError::WorkerStopped)));
    }
}
