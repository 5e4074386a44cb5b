//! Typo correction and autocomplete scoring for completed words.
//!
//! Scores range from 0 (no match) to 1000 (exact match):
//!
//! | match                                   | score               |
//! |-----------------------------------------|---------------------|
//! | exact                                   | 1000                |
//! | typed word is a prefix (autocomplete)   | 800                 |
//! | dictionary word is a prefix (overswipe) | 700                 |
//! | keyboard-aware edit distance `d ≤ max`  | `500 - 100·d`       |
//! | order-preserving common characters `c`  | `200 + 10·c`        |
//!
//! Substituting a key with one of its QWERTY neighbours costs half as much
//! as substituting a distant key.
use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::config::CorrectionConfig;
use crate::constants::{
    COST_ADJACENT_SUBSTITUTION, COST_NON_ADJACENT_SUBSTITUTION, SCORE_BASE_CORRECTION,
    SCORE_EXACT_MATCH, SCORE_FUZZY_BASE, SCORE_FUZZY_PER_CHAR, SCORE_OVERSWIPE,
    SCORE_PENALTY_PER_EDIT, SCORE_PREFIX_MATCH,
};

/// A scored correction candidate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Correction {
    /// the dictionary word
    pub word: SmolStr,
    /// match score in `0..=1000`
    pub score: u16,
    /// `score / 1000`
    pub confidence: f32,
    /// whether `word` equals the typed word, ignoring case
    pub is_exact: bool,
}

impl PartialOrd for Correction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Best corrections sort first; equal scores fall back to the word.
impl Ord for Correction {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then_with(|| self.word.cmp(&other.word))
    }
}

impl PartialEq for Correction {
    fn eq(&self, other: &Self) -> bool {
        self.word == other.word && self.score == other.score
    }
}

impl Eq for Correction {}

// Neighbours of each key on a QWERTY layout, one row up and down included.
fn neighbours(c: char) -> &'static str {
    match c {
        'q' => "was",
        'w' => "qesda",
        'e' => "wrdfs",
        'r' => "etfgd",
        't' => "ryghf",
        'y' => "tuhjg",
        'u' => "yijkh",
        'i' => "uoklj",
        'o' => "iplk",
        'p' => "ol",
        'a' => "qwsz",
        's' => "adwexzq",
        'd' => "sfercx",
        'f' => "dgrtvc",
        'g' => "fhtybv",
        'h' => "gjyunb",
        'j' => "hkuimn",
        'k' => "jliom",
        'l' => "kop",
        'z' => "asx",
        'x' => "zcsd",
        'c' => "xvdf",
        'v' => "cbfg",
        'b' => "vngh",
        'n' => "bmhj",
        'm' => "njk",
        _ => "",
    }
}

/// whether `b` neighbours `a` on a QWERTY keyboard
#[inline(always)]
pub fn is_adjacent(a: char, b: char) -> bool {
    neighbours(a).contains(b)
}

/// Levenshtein distance where substitutions between neighbouring keys are
/// cheaper. Insertions and deletions cost 1.
pub fn keyboard_distance(a: &[char], b: &[char]) -> u32 {
    let mut prev: Vec<u32> = (0..=b.len() as u32).collect();
    let mut cur = vec![0u32; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        cur[0] = i as u32 + 1;

        for (j, cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j]
            } else {
                let substitution = if is_adjacent(*ca, *cb) {
                    COST_ADJACENT_SUBSTITUTION
                } else {
                    COST_NON_ADJACENT_SUBSTITUTION
                };

                (prev[j + 1] + 1)
                    .min(cur[j] + 1)
                    .min(prev[j] + substitution)
            };
        }

        std::mem::swap(&mut prev, &mut cur);
    }

    prev[b.len()]
}

// Greedy in-order matches of `b` against `a`.
fn common_chars(a: &[char], b: &[char]) -> usize {
    let mut j = 0;

    for c in a {
        if j >= b.len() {
            break;
        }
        if *c == b[j] {
            j += 1;
        }
    }

    j
}

/// Scores dictionary words against a typed word.
#[derive(Debug, Clone)]
pub struct CorrectionScorer {
    config: CorrectionConfig,
}

impl CorrectionScorer {
    /// Creates a scorer with the given limits.
    pub fn new(config: CorrectionConfig) -> CorrectionScorer {
        CorrectionScorer { config }
    }

    /// How well `dictionary_word` matches `typed`, ignoring case.
    pub fn score(&self, dictionary_word: &str, typed: &str) -> u16 {
        if dictionary_word.is_empty() || typed.is_empty() {
            return 0;
        }

        let dict = dictionary_word.to_lowercase();
        let typed = typed.to_lowercase();

        if dict == typed {
            return SCORE_EXACT_MATCH;
        }

        if dict.starts_with(&typed) {
            return SCORE_PREFIX_MATCH;
        }

        if typed.starts_with(&dict) {
            return SCORE_OVERSWIPE;
        }

        let dict: Vec<char> = dict.chars().collect();
        let typed: Vec<char> = typed.chars().collect();

        let distance = keyboard_distance(&dict, &typed);
        if distance <= self.config.max_edit_distance {
            return SCORE_BASE_CORRECTION
                .saturating_sub((distance as u16).saturating_mul(SCORE_PENALTY_PER_EDIT));
        }

        let common = common_chars(&dict, &typed);
        let min_len = dict.len().min(typed.len());
        if common + 1 >= min_len {
            let bonus = (common as u16).saturating_mul(SCORE_FUZZY_PER_CHAR);
            return SCORE_FUZZY_BASE.saturating_add(bonus).min(SCORE_EXACT_MATCH);
        }

        0
    }

    /// Score mapped onto `[0, 1]`.
    pub fn confidence(&self, score: u16) -> f32 {
        (score as f32 / SCORE_EXACT_MATCH as f32).max(0.0).min(1.0)
    }

    /// Ranks `words` as corrections of `typed`, best first, keeping at most
    /// `max` of them.
    ///
    /// Typed words shorter than the configured minimum are too ambiguous to
    /// correct and yield nothing.
    pub fn suggest<I>(&self, typed: &str, words: I, max: usize) -> Vec<Correction>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        if typed.chars().count() < self.config.min_word_length {
            return vec![];
        }

        let mut out: Vec<Correction> = words
            .into_iter()
            .filter_map(|w| {
                let w = w.as_ref();
                let score = self.score(w, typed);

                if score == 0 {
                    return None;
                }

                Some(Correction {
                    word: SmolStr::new(w),
                    score,
                    confidence: self.confidence(score),
                    is_exact: score == SCORE_EXACT_MATCH,
                })
            })
            .collect();

        out.sort();
        out.truncate(max);

        log::debug!("corrections for '{}': {}", typed, out.len());
        out
    }

    /// [`suggest`](Self::suggest) capped at the configured suggestion count
    pub fn suggest_default<I>(&self, typed: &str, words: I) -> Vec<Correction>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.suggest(typed, words, self.config.max_suggestions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> CorrectionScorer {
        CorrectionScorer::new(CorrectionConfig::default())
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn exact_and_prefix() {
        let s = scorer();

        assert_eq!(s.score("hello", "hello"), 1000);
        assert_eq!(s.score("Hello", "hELLO"), 1000);
        // autocomplete: typed is a prefix of the dictionary word
        assert_eq!(s.score("hello", "hell"), 800);
        // overswipe: the dictionary word is a prefix of what was typed
        assert_eq!(s.score("hell", "hello"), 700);
        assert_eq!(s.score("", "hello"), 0);
        assert_eq!(s.score("hello", ""), 0);
    }

    #[test]
    fn adjacency_aware_substitution() {
        let s = scorer();

        // c and b are not neighbours
        assert_eq!(s.score("cat", "bat"), 300);
        // c and v are
        assert_eq!(s.score("cat", "vat"), 400);
        assert_eq!(s.score("cat", "cats"), 700);
        assert_eq!(s.score("cart", "cat"), 400);
    }

    #[test]
    fn distance() {
        assert_eq!(keyboard_distance(&chars("kitten"), &chars("kitten")), 0);
        assert_eq!(keyboard_distance(&chars(""), &chars("abc")), 3);
        assert_eq!(keyboard_distance(&chars("qwe"), &chars("qwr")), 1);
        assert_eq!(keyboard_distance(&chars("qwe"), &chars("qwm")), 2);
        assert!(is_adjacent('s', 'd'));
        assert!(!is_adjacent('a', 'p'));
    }

    #[test]
    fn fuzzy_fallback() {
        let s = scorer();

        assert_eq!(common_chars(&chars("axbxcx"), &chars("abc")), 3);
        assert_eq!(s.score("axbxcx", "abc"), 230);
        assert_eq!(s.score("zzzz", "mmmm"), 0);
    }

    #[test]
    fn suggestions() {
        let s = scorer();
        let words = vec!["hello", "help", "hell", "yellow", "cat"];

        let out = s.suggest("hell", &words, 3);
        let ranked: Vec<&str> = out.iter().map(|c| c.word.as_str()).collect();

        assert_eq!(ranked, vec!["hell", "hello", "help"]);
        assert!(out[0].is_exact);
        assert_eq!(out[0].confidence, 1.0);
        assert!((out[1].confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn short_words_not_corrected() {
        let s = scorer();
        assert!(s.suggest("ca", vec!["cat", "ca"], 5).is_empty());
        assert!(!s.suggest("cat", vec!["cat"], 5).is_empty());
    }

    #[test]
    fn suggestions_from_dictionary() {
        let s = scorer();
        let dict: crate::dictionary::Dictionary =
            vec![("cast", 3), ("cat", 9), ("dog", 1)].into_iter().collect();

        let out = s.suggest("cas", dict.words().map(SmolStr::as_str), 5);
        assert_eq!(out[0].word, "cast");
        assert!(out.iter().all(|c| c.word != "dog"));
    }

    #[test]
    fn zero_scores_dropped() {
        let s = scorer();
        let out = s.suggest_default("zzzz", vec!["mmmm", "zzzz"]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].word, "zzzz");
    }
}
