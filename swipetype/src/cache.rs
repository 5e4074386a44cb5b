//! Tolerant result cache keyed on gesture geometry.
//!
//! Two swipes of the same word are never pixel-identical, so entries are
//! looked up by similarity of a small fingerprint rather than by equality.
use parking_lot::Mutex;
use serde::Serialize;

use crate::config::CacheConfig;
use crate::constants::{CACHE_MAX_LENGTH_RATIO, CACHE_MIN_LENGTH_RATIO};
use crate::predictor::ScoringResult;
use crate::types::{Point, Trajectory};

/// Geometric fingerprint of a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheKey {
    /// where the gesture started
    pub start: Point,
    /// where it ended
    pub end: Point,
    /// mean of all samples
    pub centroid: Point,
    /// number of samples
    pub len: usize,
}

impl CacheKey {
    /// Fingerprints `trajectory`; `None` below two points.
    pub fn from_trajectory(trajectory: &Trajectory) -> Option<CacheKey> {
        if trajectory.len() < 2 {
            return None;
        }

        Some(CacheKey {
            start: trajectory.start()?,
            end: trajectory.end()?,
            centroid: trajectory.centroid()?,
            len: trajectory.len(),
        })
    }

    /// Whether both keys likely describe the same gesture: point counts
    /// within 20% and start, end and centroid each closer than `threshold`.
    pub fn is_similar(&self, other: &CacheKey, threshold: f32) -> bool {
        if other.len == 0 {
            return false;
        }

        let ratio = self.len as f32 / other.len as f32;
        if ratio < CACHE_MIN_LENGTH_RATIO || ratio > CACHE_MAX_LENGTH_RATIO {
            return false;
        }

        self.start.distance(&other.start) < threshold
            && self.end.distance(&other.end) < threshold
            && self.centroid.distance(&other.centroid) < threshold
    }
}

#[derive(Debug)]
struct CacheEntry {
    key: CacheKey,
    result: ScoringResult,
    last_access: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: Vec<CacheEntry>,
    tick: u64,
    hits: u64,
    misses: u64,
}

impl CacheState {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    /// entries held
    pub size: usize,
    /// maximum number of entries
    pub capacity: usize,
    /// lookups that found an entry
    pub hits: u64,
    /// lookups that found nothing
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups that hit, `0.0` before any lookup.
    pub fn hit_rate(&self) -> f32 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f32 / total as f32
        }
    }
}

/// A bounded, least-recently-used cache of scoring results.
///
/// Capacity is small enough that a linear scan beats any index. All state
/// sits behind one mutex, so lookups from the input thread and stores from
/// the prediction worker serialize.
#[derive(Debug)]
pub struct ResultCache {
    state: Mutex<CacheState>,
    capacity: usize,
    threshold: f32,
}

impl ResultCache {
    /// Creates an empty cache sized by `config`.
    pub fn new(config: &CacheConfig) -> ResultCache {
        ResultCache {
            state: Mutex::new(CacheState::default()),
            capacity: config.capacity,
            threshold: config.distance_threshold,
        }
    }

    /// Returns the result of the first entry similar to `trajectory`.
    pub fn get(&self, trajectory: &Trajectory) -> Option<ScoringResult> {
        let key = CacheKey::from_trajectory(trajectory)?;
        let mut state = self.state.lock();
        let tick = state.next_tick();

        let threshold = self.threshold;
        let found = state
            .entries
            .iter_mut()
            .find(|e| key.is_similar(&e.key, threshold))
            .map(|e| {
                e.last_access = tick;
                e.result.clone()
            });

        match found {
            Some(result) => {
                state.hits += 1;
                log::trace!("cache hit ({} entries)", state.entries.len());
                Some(result)
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    /// Stores `result` for `trajectory`, replacing similar entries and
    /// evicting the least recently used entry when full.
    pub fn put(&self, trajectory: &Trajectory, result: ScoringResult) {
        let key = match CacheKey::from_trajectory(trajectory) {
            Some(key) => key,
            None => return,
        };

        if self.capacity == 0 {
            return;
        }

        let mut state = self.state.lock();
        let tick = state.next_tick();
        let threshold = self.threshold;

        state.entries.retain(|e| !key.is_similar(&e.key, threshold));
        state.entries.push(CacheEntry {
            key,
            result,
            last_access: tick,
        });

        while state.entries.len() > self.capacity {
            let oldest = state
                .entries
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(i, _)| i);

            match oldest {
                Some(i) => {
                    state.entries.remove(i);
                }
                None => break,
            }
        }

        if state.entries.len() > self.capacity {
            debug_assert!(false, "cache grew past its capacity");
            log::warn!("cache grew past its capacity, clearing");
            Self::reset(&mut state);
        }
    }

    /// Drops every entry and resets the counters.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        Self::reset(&mut state);
    }

    /// Resets the hit and miss counters, keeping entries.
    pub fn reset_stats(&self) {
        let mut state = self.state.lock();
        state.hits = 0;
        state.misses = 0;
    }

    /// number of entries
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// whether the cache holds nothing
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// current size and counters
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            size: state.entries.len(),
            capacity: self.capacity,
            hits: state.hits,
            misses: state.misses,
        }
    }

    fn reset(state: &mut CacheState) {
        state.entries.clear();
        state.hits = 0;
        state.misses = 0;
    }
}
