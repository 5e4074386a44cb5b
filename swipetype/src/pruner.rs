//! Dictionary pruning by gesture extremities and path length.
//!
//! Swiped words almost always start near the first touched key and end near
//! the last one. Indexing the dictionary by `(first letter, last letter)`
//! narrows tens of thousands of words down to a handful of buckets before the
//! expensive scorer runs. Every stage fails open: when a filter would leave
//! nothing, the wider set is returned instead.
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use itertools::Itertools;
use parking_lot::RwLock;
use serde::Serialize;
use smol_str::SmolStr;

use crate::config::PruningConfig;
use crate::dictionary::Dictionary;
use crate::types::{arc_length, Point};

/// `(first, last)` letter buckets of one dictionary snapshot.
#[derive(Debug, Default)]
pub struct ExtremityIndex {
    buckets: HashMap<(char, char), Vec<SmolStr>>,
    all: Vec<SmolStr>,
}

impl ExtremityIndex {
    /// Indexes every word of two or more characters by its lowercased
    /// first and last character.
    pub fn build(dictionary: &Dictionary) -> ExtremityIndex {
        let mut all: Vec<SmolStr> = dictionary.words().cloned().collect();
        all.sort();

        let mut buckets: HashMap<(char, char), Vec<SmolStr>> = HashMap::new();
        for word in all.iter() {
            if let Some(pair) = extremities(word) {
                buckets.entry(pair).or_insert_with(Vec::new).push(word.clone());
            }
        }

        log::debug!("built extremity index with {} unique pairs", buckets.len());
        ExtremityIndex { buckets, all }
    }

    /// Words with this first and last letter.
    pub fn bucket(&self, first: char, last: char) -> &[SmolStr] {
        self.buckets
            .get(&(lower(first), lower(last)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// every dictionary word, sorted
    pub fn all(&self) -> &[SmolStr] {
        &self.all
    }
}

#[inline(always)]
fn lower(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn extremities(word: &str) -> Option<(char, char)> {
    let mut chars = word.chars();
    let first = chars.next()?;
    let last = chars.last()?;
    Some((lower(first), lower(last)))
}

/// Statistics about the current index.
#[derive(Debug, Clone, Serialize)]
pub struct PrunerStats {
    /// words indexed
    pub dictionary_size: usize,
    /// distinct first/last letter pairs
    pub extremity_pairs: usize,
    /// smallest bucket
    pub min_words_per_pair: usize,
    /// largest bucket
    pub max_words_per_pair: usize,
    /// median bucket size
    pub median_words_per_pair: usize,
}

/// Narrows a dictionary to plausible candidates for one gesture.
///
/// The index is rebuilt from scratch on [`reload`](Self::reload) and swapped
/// in whole; concurrent readers keep using the snapshot they started with.
#[derive(Debug)]
pub struct CandidatePruner {
    index: RwLock<Arc<ExtremityIndex>>,
    config: PruningConfig,
}

impl CandidatePruner {
    /// Indexes `dictionary`.
    pub fn new(dictionary: &Dictionary, config: PruningConfig) -> CandidatePruner {
        CandidatePruner {
            index: RwLock::new(Arc::new(ExtremityIndex::build(dictionary))),
            config,
        }
    }

    /// Rebuilds the index for a new dictionary and swaps it in.
    pub fn reload(&self, dictionary: &Dictionary) {
        let index = Arc::new(ExtremityIndex::build(dictionary));
        *self.index.write() = index;
    }

    /// the index snapshot currently in use
    pub fn index(&self) -> Arc<ExtremityIndex> {
        Arc::clone(&self.index.read())
    }

    /// Candidates whose first and last letters match the gesture's extremities.
    ///
    /// Up to `extremity_keys` distinct letters from the start and from the end
    /// of `touched` are crossed. When no bucket matches, only the first and
    /// last touched letters are tried; after that the whole dictionary is
    /// returned.
    pub fn prune_by_extremities(&self, path: &[Point], touched: &[char]) -> Vec<SmolStr> {
        let index = self.index();

        if path.len() < 2 || touched.is_empty() {
            return index.all().to_vec();
        }

        let n = self.config.extremity_keys;
        let starts: Vec<char> = touched.iter().take(n).map(|c| lower(*c)).unique().collect();
        let ends: Vec<char> = touched
            .iter()
            .skip(touched.len().saturating_sub(n))
            .map(|c| lower(*c))
            .unique()
            .collect();

        let mut candidates: Vec<SmolStr> = starts
            .iter()
            .cartesian_product(ends.iter())
            .flat_map(|(s, e)| index.bucket(*s, *e).iter().cloned())
            .unique()
            .collect();

        if candidates.is_empty() {
            log::debug!("no candidates with extremities, falling back to first/last touched");
            if let (Some(first), Some(last)) = (touched.first(), touched.last()) {
                candidates = index.bucket(*first, *last).to_vec();
            }
        }

        if candidates.is_empty() {
            log::debug!("no extremity candidates, using full dictionary");
            return index.all().to_vec();
        }

        log::debug!(
            "pruned to {} candidates from {}",
            candidates.len(),
            index.all().len()
        );
        candidates
    }

    /// Drops candidates whose ideal path length is far from the swiped one.
    ///
    /// The ideal length of a word is `(len - 1) × key_width × length_factor`;
    /// a candidate survives when it is within `length_tolerance` key widths.
    /// If nothing survives, `candidates` is returned unchanged.
    pub fn prune_by_length(
        &self,
        path: &[Point],
        candidates: Vec<SmolStr>,
        key_width: f32,
    ) -> Vec<SmolStr> {
        if path.len() < 2 {
            return candidates;
        }

        let length = arc_length(path);
        let tolerance = self.config.length_tolerance * key_width;
        let factor = self.config.length_factor;

        let filtered: Vec<SmolStr> = candidates
            .iter()
            .filter(|w| {
                let ideal = (w.chars().count() as f32 - 1.0) * key_width * factor;
                (length - ideal).abs() < tolerance
            })
            .cloned()
            .collect();

        log::debug!("length pruning: {} -> {}", candidates.len(), filtered.len());

        if filtered.is_empty() {
            candidates
        } else {
            filtered
        }
    }

    /// Words beginning with `c`.
    pub fn words_starting_with(&self, c: char) -> Vec<SmolStr> {
        let c = lower(c);
        self.index()
            .all()
            .iter()
            .filter(|w| w.chars().next().map(lower) == Some(c))
            .cloned()
            .collect()
    }

    /// Words ending with `c`.
    pub fn words_ending_with(&self, c: char) -> Vec<SmolStr> {
        let c = lower(c);
        self.index()
            .all()
            .iter()
            .filter(|w| w.chars().last().map(lower) == Some(c))
            .cloned()
            .collect()
    }

    /// Every indexed first/last letter pair.
    pub fn extremity_pairs(&self) -> HashSet<(char, char)> {
        self.index().buckets.keys().copied().collect()
    }

    /// Share of the dictionary left after pruning to one pair; 0.1 means a
    /// 90% reduction. Unknown pairs fall back to the whole dictionary.
    pub fn pruning_efficiency(&self, first: char, last: char) -> f32 {
        let index = self.index();
        let total = index.all().len();

        if total == 0 {
            return 1.0;
        }

        let bucket = index.bucket(first, last);
        let count = if bucket.is_empty() { total } else { bucket.len() };
        count as f32 / total as f32
    }

    /// Bucket size statistics.
    pub fn stats(&self) -> PrunerStats {
        let index = self.index();
        let counts: Vec<usize> = index.buckets.values().map(Vec::len).sorted().collect();

        PrunerStats {
            dictionary_size: index.all().len(),
            extremity_pairs: counts.len(),
            min_words_per_pair: counts.first().copied().unwrap_or(0),
            max_words_per_pair: counts.last().copied().unwrap_or(0),
            median_words_per_pair: counts.get(counts.len() / 2).copied().unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict(words: &[&str]) -> Dictionary {
        words.iter().map(|w| (*w, 1)).collect()
    }

    fn path() -> Vec<Point> {
        vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)]
    }

    #[test]
    fn extremities_exclude_other_endings() {
        let pruner = CandidatePruner::new(&dict(&["cat", "car", "cot"]), PruningConfig::default());
        let out = pruner.prune_by_extremities(&path(), &['c', 't']);

        let set: HashSet<SmolStr> = out.into_iter().collect();
        let expected: HashSet<SmolStr> = vec!["cat", "cot"].into_iter().map(SmolStr::new).collect();
        assert_eq!(set, expected);
    }

    #[test]
    fn crosses_leading_and_trailing_keys() {
        let pruner = CandidatePruner::new(
            &dict(&["hello", "jello", "help", "yellow", "hellp"]),
            PruningConfig::default(),
        );
        let out = pruner.prune_by_extremities(&path(), &['h', 'j', 'e', 'l', 'p', 'o']);

        for w in &["hello", "jello", "help", "hellp"] {
            assert!(out.contains(&SmolStr::new(w)), "{}", w);
        }
        assert!(!out.contains(&SmolStr::new("yellow")));
        assert_eq!(out.iter().unique().count(), out.len());
    }

    #[test]
    fn falls_back_to_full_dictionary() {
        let pruner = CandidatePruner::new(&dict(&["cat", "car", "dog"]), PruningConfig::default());

        assert_eq!(pruner.prune_by_extremities(&path(), &['x', 'z']).len(), 3);
        assert_eq!(pruner.prune_by_extremities(&path(), &[]).len(), 3);
        assert_eq!(pruner.prune_by_extremities(&path()[..1], &['c', 't']).len(), 3);
    }

    #[test]
    fn case_insensitive_extremities() {
        let pruner = CandidatePruner::new(&dict(&["Cat", "a"]), PruningConfig::default());
        assert_eq!(
            pruner.prune_by_extremities(&path(), &['c', 't']),
            vec![SmolStr::new("Cat")]
        );
        assert!(pruner.extremity_pairs().contains(&('c', 't')));
        // single letter words are not indexed
        assert!(!pruner.extremity_pairs().contains(&('a', 'a')));
    }

    #[test]
    fn length_pruning() {
        let pruner = CandidatePruner::new(&dict(&[]), PruningConfig::default());
        let key_width = 100.0;
        // 400 units travelled
        let path = vec![Point::new(0.0, 0.0), Point::new(400.0, 0.0)];
        let candidates: Vec<SmolStr> = vec!["ab", "abcdef", "abcdefghijklmnop"]
            .into_iter()
            .map(SmolStr::new)
            .collect();

        // ideal: 80, 400, 1200; tolerance 300
        let out = pruner.prune_by_length(&path, candidates.clone(), key_width);
        assert_eq!(out, vec![SmolStr::new("ab"), SmolStr::new("abcdef")]);

        let long_only = vec![SmolStr::new("abcdefghijklmnop")];
        assert_eq!(
            pruner.prune_by_length(&path, long_only.clone(), key_width),
            long_only
        );
    }

    #[test]
    fn reload_swaps_index() {
        let pruner = CandidatePruner::new(&dict(&["cat"]), PruningConfig::default());
        let before = pruner.index();

        pruner.reload(&dict(&["cat", "cut", "dog"]));

        assert_eq!(before.all().len(), 1);
        assert_eq!(pruner.index().all().len(), 3);
        assert_eq!(pruner.prune_by_extremities(&path(), &['c', 't']).len(), 2);
    }

    #[test]
    fn helpers() {
        let pruner = CandidatePruner::new(
            &dict(&["cat", "cot", "car", "dog", "tact"]),
            PruningConfig::default(),
        );

        assert_eq!(pruner.words_starting_with('c').len(), 3);
        assert_eq!(pruner.words_ending_with('t').len(), 3);
        assert!((pruner.pruning_efficiency('c', 't') - 0.4).abs() < 1e-6);
        assert_eq!(pruner.pruning_efficiency('x', 'y'), 1.0);

        let stats = pruner.stats();
        assert_eq!(stats.dictionary_size, 5);
        assert_eq!(stats.extremity_pairs, 4);
        assert_eq!(stats.max_words_per_pair, 2);
    }
}
