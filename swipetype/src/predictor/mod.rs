//! The seam to an external word scorer.
mod lexicon;

pub use self::lexicon::LexiconBackend;

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::BackendError;
use crate::types::Trajectory;

/// A ranked word as returned by a scoring backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredWord {
    /// the word
    pub word: SmolStr,
    /// higher is better
    pub score: i32,
}

impl ScoredWord {
    /// A scored word.
    pub fn new(word: &str, score: i32) -> ScoredWord {
        ScoredWord {
            word: SmolStr::new(word),
            score,
        }
    }
}

/// Ranked words, best first. An empty result means "no prediction".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringResult {
    entries: Vec<ScoredWord>,
}

impl ScoringResult {
    /// Ranked `entries`, best first.
    pub fn new(entries: Vec<ScoredWord>) -> ScoringResult {
        ScoringResult { entries }
    }

    /// The "no prediction" result.
    pub fn empty() -> ScoringResult {
        ScoringResult { entries: vec![] }
    }

    /// whether there is no prediction
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// number of words
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// words with their scores
    pub fn entries(&self) -> &[ScoredWord] {
        &self.entries
    }

    /// the ranked words
    pub fn words(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.word.as_str()).collect()
    }

    /// the scores, parallel to [`words`](Self::words)
    pub fn scores(&self) -> Vec<i32> {
        self.entries.iter().map(|e| e.score).collect()
    }

    /// Splits into words and their parallel scores.
    pub fn into_parts(self) -> (Vec<SmolStr>, Vec<i32>) {
        self.entries.into_iter().map(|e| (e.word, e.score)).unzip()
    }
}

/// An expensive word scorer, such as a neural model.
///
/// Implementations may take tens to hundreds of milliseconds and are only
/// ever called from the prediction worker. `candidates`, when given, is the
/// pruned vocabulary the result should be drawn from.
pub trait ScoringBackend: Send + Sync {
    /// Ranks words for `trajectory`, best first.
    fn score(
        &self,
        trajectory: &Trajectory,
        candidates: Option<&HashSet<SmolStr>>,
    ) -> Result<ScoringResult, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts() {
        let result = ScoringResult::new(vec![ScoredWord::new("hello", 9), ScoredWord::new("help", 4)]);

        assert_eq!(result.words(), vec!["hello", "help"]);
        assert_eq!(result.scores(), vec![9, 4]);

        let (words, scores) = result.into_parts();
        assert_eq!(words[1], "help");
        assert_eq!(scores, vec![9, 4]);
        assert!(ScoringResult::empty().is_empty());
    }
}
