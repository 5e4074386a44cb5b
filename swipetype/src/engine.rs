//! Per-session wiring of the pipeline stages.
use std::sync::Arc;

use hashbrown::HashSet;
use parking_lot::RwLock;
use serde::Serialize;
use smol_str::SmolStr;

use crate::cache::{CacheStats, ResultCache};
use crate::classifier::TouchTracker;
use crate::config::EngineConfig;
use crate::correction::{Correction, CorrectionScorer};
use crate::dictionary::Dictionary;
use crate::layout::KeyboardLayout;
use crate::mapper::{touched_chars, KeyCandidate, SpatialKeyMapper};
use crate::orchestrator::{OrchestratorStats, PredictionHandle, PredictionOrchestrator};
use crate::predictor::ScoringBackend;
use crate::pruner::CandidatePruner;
use crate::simplify::simplify;
use crate::types::{Point, Trajectory};

/// The geometric pipeline's output for one trajectory.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateSet {
    /// keys detected along the simplified path
    pub keys: Vec<KeyCandidate>,
    /// their letters, in order
    pub touched: Vec<char>,
    /// plausible words
    pub words: Vec<SmolStr>,
    /// whether pruning fell back to the whole dictionary
    pub is_full_dictionary: bool,
}

/// Layout snapshot plus everything derived from it.
#[derive(Debug)]
struct LayoutState {
    layout: Arc<KeyboardLayout>,
    width: f32,
    height: f32,
    mapper: SpatialKeyMapper,
    key_width: f32,
}

impl LayoutState {
    fn new(layout: Arc<KeyboardLayout>, width: f32, height: f32, config: &EngineConfig) -> LayoutState {
        let mapper = SpatialKeyMapper::new(&layout, width, height, &config.detection);
        let key_width = layout.average_key_width(width);

        LayoutState {
            layout,
            width,
            height,
            mapper,
            key_width,
        }
    }
}

/// Counters across all stages.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    /// result cache counters
    pub cache: CacheStats,
    /// request counters
    pub orchestrator: OrchestratorStats,
    /// words in the current dictionary
    pub dictionary_size: usize,
}

/// One input session's prediction pipeline.
///
/// The layout can only be replaced through `&mut self`, so it cannot change
/// while a [`TouchTracker`] borrowed from the engine is alive.
#[derive(Debug)]
pub struct SwipeEngine {
    config: EngineConfig,
    layout: LayoutState,
    dictionary: RwLock<Arc<Dictionary>>,
    pruner: CandidatePruner,
    scorer: CorrectionScorer,
    orchestrator: PredictionOrchestrator,
}

impl SwipeEngine {
    /// Builds the pipeline and starts its prediction worker.
    pub fn new(
        config: EngineConfig,
        layout: Arc<KeyboardLayout>,
        width: f32,
        height: f32,
        dictionary: Dictionary,
        backend: Arc<dyn ScoringBackend>,
    ) -> std::io::Result<SwipeEngine> {
        let cache = Arc::new(ResultCache::new(&config.cache));
        let orchestrator = PredictionOrchestrator::new(backend, cache)?;
        let pruner = CandidatePruner::new(&dictionary, config.pruning.clone());
        let scorer = CorrectionScorer::new(config.correction.clone());
        let layout = LayoutState::new(layout, width, height, &config);

        log::debug!(
            "engine ready: {} words, {}x{} keyboard",
            dictionary.len(),
            width,
            height
        );

        Ok(SwipeEngine {
            config,
            layout,
            dictionary: RwLock::new(Arc::new(dictionary)),
            pruner,
            scorer,
            orchestrator,
        })
    }

    /// the configuration the engine was built with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// the current layout
    pub fn layout(&self) -> &Arc<KeyboardLayout> {
        &self.layout.layout
    }

    /// Replaces the layout or keyboard size for the following gestures.
    ///
    /// Cached results refer to the old geometry and are dropped.
    pub fn set_layout(&mut self, layout: Arc<KeyboardLayout>, width: f32, height: f32) {
        self.layout = LayoutState::new(layout, width, height, &self.config);
        self.orchestrator.cache().clear();
    }

    /// Starts following a pointer at its touch-down sample.
    pub fn begin_touch(&self, point: Point, time_ms: u64) -> TouchTracker<'_> {
        TouchTracker::new(
            &self.layout.layout,
            self.layout.width,
            self.layout.height,
            &self.config.gesture,
            point,
            time_ms,
        )
    }

    /// Runs the cheap stages: simplification, key detection and pruning.
    pub fn candidates(&self, trajectory: &Trajectory) -> CandidateSet {
        let points = trajectory.points();
        let simplified = simplify(trajectory, self.config.detection.simplify_epsilon);
        let keys = self.layout.mapper.detect_trajectory(&simplified);
        let touched = touched_chars(&keys);

        let words = self.pruner.prune_by_extremities(&points, &touched);
        let words = self
            .pruner
            .prune_by_length(&points, words, self.layout.key_width);
        let is_full_dictionary = words.len() == self.pruner.index().all().len();

        CandidateSet {
            keys,
            touched,
            words,
            is_full_dictionary,
        }
    }

    /// Prunes the dictionary for `trajectory` and queues it for scoring,
    /// superseding any earlier submission.
    pub fn submit(&self, trajectory: Trajectory) -> PredictionHandle {
        let candidates = if trajectory.len() < 2 {
            None
        } else {
            let set = self.candidates(&trajectory);
            if set.is_full_dictionary {
                None
            } else {
                Some(set.words.into_iter().collect::<HashSet<_>>())
            }
        };

        self.orchestrator.submit(trajectory, candidates)
    }

    /// Supersedes the current prediction, if any.
    pub fn cancel_pending(&self) {
        self.orchestrator.cancel_pending();
    }

    /// Corrections of a completed word, best first.
    pub fn correct(&self, typed: &str) -> Vec<Correction> {
        let dictionary = Arc::clone(&self.dictionary.read());
        self.scorer.suggest_default(typed, dictionary.words().map(SmolStr::as_str))
    }

    /// Swaps in a new vocabulary and rebuilds the pruning index.
    pub fn reload_dictionary(&self, dictionary: Dictionary) {
        self.pruner.reload(&dictionary);
        *self.dictionary.write() = Arc::new(dictionary);
        self.orchestrator.cache().clear();
    }

    /// the dictionary pruner
    pub fn pruner(&self) -> &CandidatePruner {
        &self.pruner
    }

    /// Counters across the cache and orchestrator.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            cache: self.orchestrator.cache().stats(),
            orchestrator: self.orchestrator.stats(),
            dictionary_size: self.dictionary.read().len(),
        }
    }
}
