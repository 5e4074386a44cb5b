//! Read-only word frequency view.
use std::io::BufRead;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A `word → frequency` mapping.
///
/// Owned by whoever loads vocabulary; the pipeline only reads it and builds
/// its own derived indexes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dictionary {
    words: HashMap<SmolStr, u32>,
}

impl Dictionary {
    /// An empty dictionary.
    pub fn new() -> Dictionary {
        Dictionary {
            words: HashMap::new(),
        }
    }

    /// Reads `word<TAB>frequency` lines. Lines starting with `#` are skipped,
    /// a missing or unparsable frequency counts as 1.
    pub fn from_tsv<R: BufRead>(reader: R) -> std::io::Result<Dictionary> {
        let mut words = HashMap::new();

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut parts = line.split('\t');
            let word = match parts.next() {
                Some(w) if !w.is_empty() => w,
                _ => continue,
            };
            let freq = parts.next().and_then(|f| f.trim().parse().ok()).unwrap_or(1);

            words.insert(SmolStr::new(word), freq);
        }

        Ok(Dictionary { words })
    }

    /// number of words
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// whether there are no words
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// frequency of `word`, if present
    pub fn frequency(&self, word: &str) -> Option<u32> {
        self.words.get(word).copied()
    }

    /// whether `word` is present
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains_key(word)
    }

    /// all words, in no particular order
    pub fn words(&self) -> impl Iterator<Item = &SmolStr> {
        self.words.keys()
    }

    /// words with their frequencies, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, u32)> {
        self.words.iter().map(|(w, f)| (w, *f))
    }
}

impl<S: AsRef<str>> std::iter::FromIterator<(S, u32)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Dictionary {
        Dictionary {
            words: iter
                .into_iter()
                .map(|(w, f)| (SmolStr::new(w.as_ref()), f))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tsv() {
        let input = "# comment\nhello\t120\nhelp\t80\n\nhelm\nbad\tx\n";
        let dict = Dictionary::from_tsv(input.as_bytes()).unwrap();

        assert_eq!(dict.len(), 4);
        assert_eq!(dict.frequency("hello"), Some(120));
        assert_eq!(dict.frequency("helm"), Some(1));
        assert_eq!(dict.frequency("bad"), Some(1));
        assert!(!dict.contains("comment"));
    }

    #[test]
    fn from_iter() {
        let dict: Dictionary = vec![("cat", 3), ("car", 2)].into_iter().collect();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.frequency("car"), Some(2));
    }
}
