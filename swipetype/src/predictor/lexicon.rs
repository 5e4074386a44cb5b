use hashbrown::HashSet;
use smol_str::SmolStr;

use super::{ScoredWord, ScoringBackend, ScoringResult};
use crate::config::EngineConfig;
use crate::correction::CorrectionScorer;
use crate::dictionary::Dictionary;
use crate::error::BackendError;
use crate::layout::KeyboardLayout;
use crate::mapper::SpatialKeyMapper;
use crate::simplify::simplify;
use crate::types::Trajectory;

/// A dictionary-only scorer.
///
/// Reads the letters off the path with [`SpatialKeyMapper`] and ranks words by
/// their [`CorrectionScorer`] score against that letter sequence. Equal scores
/// go to the more frequent word. Useful where no model is available and as a
/// baseline to compare models against.
#[derive(Debug)]
pub struct LexiconBackend {
    mapper: SpatialKeyMapper,
    scorer: CorrectionScorer,
    dictionary: Dictionary,
    epsilon: f32,
    max_results: usize,
}

impl LexiconBackend {
    /// Builds a backend over `dictionary` for one layout and keyboard size.
    pub fn new(
        layout: &KeyboardLayout,
        width: f32,
        height: f32,
        dictionary: Dictionary,
        config: &EngineConfig,
    ) -> LexiconBackend {
        LexiconBackend {
            mapper: SpatialKeyMapper::new(layout, width, height, &config.detection),
            scorer: CorrectionScorer::new(config.correction.clone()),
            dictionary,
            epsilon: config.detection.simplify_epsilon,
            max_results: config.correction.max_suggestions,
        }
    }

    /// the letters read off `trajectory`
    pub fn letters(&self, trajectory: &Trajectory) -> String {
        let simplified = simplify(trajectory, self.epsilon);
        self.mapper
            .detect_trajectory(&simplified)
            .iter()
            .map(|k| k.letter)
            .collect()
    }

    fn rank<'a, I>(&self, typed: &str, words: I) -> Vec<ScoredWord>
    where
        I: Iterator<Item = &'a SmolStr>,
    {
        let mut scored: Vec<(u16, u32, &SmolStr)> = words
            .filter_map(|w| {
                let score = self.scorer.score(w, typed);
                if score == 0 {
                    None
                } else {
                    Some((score, self.dictionary.frequency(w).unwrap_or(0), w))
                }
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)).then(a.2.cmp(b.2)));
        scored.truncate(self.max_results);

        scored
            .into_iter()
            .map(|(score, _, w)| ScoredWord::new(w, score as i32))
            .collect()
    }
}

impl ScoringBackend for LexiconBackend {
    fn score(
        &self,
        trajectory: &Trajectory,
        candidates: Option<&HashSet<SmolStr>>,
    ) -> Result<ScoringResult, BackendError> {
        if self.dictionary.is_empty() {
            return Err(BackendError::Unavailable("dictionary is empty".into()));
        }

        let typed = self.letters(trajectory);
        log::debug!("lexicon backend read '{}'", typed);

        if typed.is_empty() {
            return Ok(ScoringResult::empty());
        }

        let ranked = match candidates {
            Some(set) => self.rank(&typed, set.iter()),
            None => self.rank(&typed, self.dictionary.words()),
        };

        Ok(ScoringResult::new(ranked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyOrdering;

    const W: f32 = 1000.0;
    const H: f32 = 400.0;

    fn swipe(layout: &KeyboardLayout, word: &str) -> Trajectory {
        let keys = layout.letter_keys(W, H);
        let mut points = vec![];

        for c in word.chars() {
            let center = keys.iter().find(|k| k.letter == c).unwrap().center;
            points.extend(std::iter::repeat(center).take(4));
        }

        Trajectory::from_points(points)
    }

    fn config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.detection.key_ordering = KeyOrdering::StrongestPoint;
        config.detection.simplify_epsilon = 0.0;
        config
    }

    #[test]
    fn reads_and_ranks_letters() {
        let layout = KeyboardLayout::qwerty();
        let dictionary: Dictionary = vec![("dog", 10), ("dig", 50), ("cat", 1)].into_iter().collect();
        let backend = LexiconBackend::new(&layout, W, H, dictionary, &config());

        let trajectory = swipe(&layout, "dog");
        assert_eq!(backend.letters(&trajectory), "dog");

        let result = backend.score(&trajectory, None).unwrap();
        assert_eq!(result.words()[0], "dog");
        assert_eq!(result.scores()[0], 1000);
        assert!(!result.words().contains(&"cat"));
    }

    #[test]
    fn restricted_to_candidates() {
        let layout = KeyboardLayout::qwerty();
        let dictionary: Dictionary = vec![("dog", 10), ("dig", 50)].into_iter().collect();
        let backend = LexiconBackend::new(&layout, W, H, dictionary, &config());

        let only: HashSet<SmolStr> = vec![SmolStr::new("dig")].into_iter().collect();
        let result = backend.score(&swipe(&layout, "dog"), Some(&only)).unwrap();
        assert_eq!(result.words(), vec!["dig"]);
    }

    #[test]
    fn empty_dictionary_is_unavailable() {
        let layout = KeyboardLayout::qwerty();
        let backend = LexiconBackend::new(&layout, W, H, Dictionary::new(), &config());

        match backend.score(&swipe(&layout, "dog"), None) {
            Err(BackendError::Unavailable(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
