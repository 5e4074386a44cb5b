//! Probabilistic key detection along a swipe path.
//!
//! Every path point votes for the letter keys around it with a Gaussian
//! weight of its distance to the key center:
//!
//! ```text
//! P(key | point) = exp(-d² / (2σ²)),  σ = key_size × sigma_factor
//! ```
//!
//! Votes are summed per key, normalized by the number of points and
//! thresholded. The surviving keys are ordered along the path to approximate
//! the typed letters.
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::config::{DetectionConfig, KeyOrdering};
use crate::constants::KEY_SEARCH_RADIUS_FACTOR;
use crate::layout::{KeyRef, KeyboardLayout, LetterKey};
use crate::types::{Point, Trajectory};

/// A key detected along a path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyCandidate {
    /// the detected key
    pub key: KeyRef,
    /// its letter
    pub letter: char,
    /// accumulated weight divided by the number of path points
    pub probability: f32,
    /// where along the path the key is placed for ordering
    pub path_index: i32,
}

/// Uniform grid over key centers. A cell is as large as the widest search
/// radius, so the 3×3 neighbourhood of a point's cell holds every key that
/// can be in range.
#[derive(Debug)]
struct KeyGrid {
    cell: f32,
    cells: HashMap<(i32, i32), Vec<usize>>,
}

impl KeyGrid {
    fn new(keys: &[LetterKey], radii: &[f32]) -> KeyGrid {
        let cell = radii.iter().cloned().fold(0.0f32, f32::max).max(1.0);
        let mut cells: HashMap<(i32, i32), Vec<usize>> = HashMap::new();

        for (i, k) in keys.iter().enumerate() {
            cells
                .entry(Self::cell_of(cell, &k.center))
                .or_insert_with(Vec::new)
                .push(i);
        }

        KeyGrid { cell, cells }
    }

    #[inline(always)]
    fn cell_of(cell: f32, p: &Point) -> (i32, i32) {
        ((p.x / cell).floor() as i32, (p.y / cell).floor() as i32)
    }

    fn around<'a>(&'a self, p: &Point) -> impl Iterator<Item = usize> + 'a {
        let (cx, cy) = Self::cell_of(self.cell, p);

        (-1..=1)
            .flat_map(move |dx| (-1..=1).map(move |dy| (cx + dx, cy + dy)))
            .filter_map(move |c| self.cells.get(&c))
            .flat_map(|v| v.iter().copied())
    }
}

/// Detects keys along a path for one layout snapshot.
#[derive(Debug)]
pub struct SpatialKeyMapper {
    keys: Vec<LetterKey>,
    radii: Vec<f32>,
    grid: KeyGrid,
    sigma: f32,
    min_probability: f32,
    probability_threshold: f32,
    ordering: KeyOrdering,
}

#[derive(Debug, Clone, Copy, Default)]
struct KeyVotes {
    total: f32,
    peak: f32,
    peak_index: usize,
}

impl SpatialKeyMapper {
    /// Prepares detection for `layout` drawn at `width` × `height` pixels.
    ///
    /// The key size behind σ is the mean letter key width.
    pub fn new(
        layout: &KeyboardLayout,
        width: f32,
        height: f32,
        config: &DetectionConfig,
    ) -> SpatialKeyMapper {
        let keys = layout.letter_keys(width, height);
        let radii: Vec<f32> = keys
            .iter()
            .map(|k| k.width.max(k.height) * KEY_SEARCH_RADIUS_FACTOR)
            .collect();
        let grid = KeyGrid::new(&keys, &radii);
        let key_size = layout.average_key_width(width);

        SpatialKeyMapper {
            keys,
            radii,
            grid,
            sigma: key_size * config.sigma_factor,
            min_probability: config.min_probability,
            probability_threshold: config.probability_threshold,
            ordering: config.key_ordering,
        }
    }

    /// Gaussian weight of a key at `distance`
    #[inline(always)]
    pub fn weight(&self, distance: f32) -> f32 {
        if self.sigma <= 0.0 {
            return 0.0;
        }
        (-(distance * distance) / (2.0 * self.sigma * self.sigma)).exp()
    }

    /// Detects the keys along `path`, ordered by where they occur.
    ///
    /// Paths with fewer than two points yield nothing.
    pub fn detect(&self, path: &[Point]) -> Vec<KeyCandidate> {
        if path.len() < 2 {
            return vec![];
        }

        let mut votes = vec![KeyVotes::default(); self.keys.len()];

        for (index, point) in path.iter().enumerate() {
            for k in self.grid.around(point) {
                let distance = point.distance(&self.keys[k].center);

                if distance >= self.radii[k] {
                    continue;
                }

                let w = self.weight(distance);
                if w <= self.min_probability {
                    continue;
                }

                let v = &mut votes[k];
                v.total += w;
                if w > v.peak {
                    v.peak = w;
                    v.peak_index = index;
                }
            }
        }

        let n = path.len() as f32;
        let mut candidates: Vec<(KeyCandidate, usize)> = votes
            .iter()
            .enumerate()
            .filter_map(|(k, v)| {
                let probability = v.total / n;
                if probability > self.probability_threshold {
                    Some((
                        KeyCandidate {
                            key: self.keys[k].key,
                            letter: self.keys[k].letter,
                            probability,
                            path_index: -1,
                        },
                        v.peak_index,
                    ))
                } else {
                    None
                }
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.0.probability
                .partial_cmp(&a.0.probability)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        for (c, peak_index) in candidates.iter_mut() {
            c.path_index = match self.ordering {
                KeyOrdering::PathMidpoint => (path.len() / 2) as i32,
                KeyOrdering::StrongestPoint => *peak_index as i32,
            };
        }

        candidates.sort_by_key(|(c, _)| c.path_index);
        log::trace!("detected {} keys over {} points", candidates.len(), path.len());

        candidates.into_iter().map(|(c, _)| c).collect()
    }

    /// [`detect`](Self::detect) over a trajectory's points
    pub fn detect_trajectory(&self, trajectory: &Trajectory) -> Vec<KeyCandidate> {
        self.detect(&trajectory.points())
    }
}

/// The letters of detected keys, in order.
pub fn touched_chars(candidates: &[KeyCandidate]) -> Vec<char> {
    candidates.iter().map(|c| c.letter).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: f32 = 1000.0;
    const H: f32 = 400.0;

    fn center_of(layout: &KeyboardLayout, c: char) -> Point {
        layout
            .letter_keys(W, H)
            .into_iter()
            .find(|k| k.letter == c)
            .unwrap()
            .center
    }

    fn strongest() -> DetectionConfig {
        let mut cfg = DetectionConfig::default();
        cfg.key_ordering = KeyOrdering::StrongestPoint;
        cfg
    }

    #[test]
    fn short_paths_are_empty() {
        let layout = KeyboardLayout::qwerty();
        let mapper = SpatialKeyMapper::new(&layout, W, H, &DetectionConfig::default());

        assert!(mapper.detect(&[]).is_empty());
        assert!(mapper.detect(&[Point::new(50.0, 50.0)]).is_empty());
    }

    #[test]
    fn gaussian_weight() {
        let layout = KeyboardLayout::qwerty();
        let mapper = SpatialKeyMapper::new(&layout, W, H, &DetectionConfig::default());

        assert_eq!(mapper.weight(0.0), 1.0);
        // sigma = 100 * 0.5
        assert!((mapper.weight(50.0) - (-0.5f32).exp()).abs() < 1e-6);
    }

    #[test]
    fn dwelling_on_keys_detects_them_in_order() {
        let layout = KeyboardLayout::qwerty();
        let mapper = SpatialKeyMapper::new(&layout, W, H, &strongest());
        let c = center_of(&layout, 'c');
        let a = center_of(&layout, 'a');
        let t = center_of(&layout, 't');

        let path = vec![c, c, c, a, a, a, t, t, t];
        let found = touched_chars(&mapper.detect(&path));

        assert_eq!(found, vec!['c', 'a', 't']);
    }

    #[test]
    fn midpoint_ordering_follows_probability() {
        let layout = KeyboardLayout::qwerty();
        let mapper = SpatialKeyMapper::new(&layout, W, H, &DetectionConfig::default());
        let q = center_of(&layout, 'q');
        let p = center_of(&layout, 'p');

        let path = vec![q, p, p, p];
        let found = mapper.detect(&path);

        assert_eq!(touched_chars(&found), vec!['p']);
        assert!(found.iter().all(|c| c.path_index == 2));

        let path = vec![q, q, p, p, p];
        let found = mapper.detect(&path);
        assert_eq!(touched_chars(&found), vec!['p', 'q']);
    }

    #[test]
    fn non_letter_keys_never_detected() {
        let layout = KeyboardLayout::qwerty();
        let mapper = SpatialKeyMapper::new(&layout, W, H, &DetectionConfig::default());
        // middle of the space bar
        let space = Point::new(500.0, 350.0);

        let found = mapper.detect(&[space, space, space]);
        assert!(found.is_empty());
    }

    #[test]
    fn grid_matches_brute_force() {
        let layout = KeyboardLayout::qwerty();
        let mapper = SpatialKeyMapper::new(&layout, W, H, &DetectionConfig::default());

        for &(x, y) in &[(0.0, 0.0), (512.0, 163.0), (999.0, 399.0), (-150.0, 30.0)] {
            let p = Point::new(x, y);
            let mut via_grid: Vec<usize> = mapper
                .grid
                .around(&p)
                .filter(|&k| p.distance(&mapper.keys[k].center) < mapper.radii[k])
                .collect();
            via_grid.sort();

            let brute: Vec<usize> = (0..mapper.keys.len())
                .filter(|&k| p.distance(&mapper.keys[k].center) < mapper.radii[k])
                .collect();

            assert_eq!(via_grid, brute);
        }
    }
}
