//! Engine configuration.
//!
//! Every group has a `const fn default()` so a complete configuration can live
//! in a `static`. Groups missing from a JSON document fall back to their
//! defaults.
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Thresholds for gesture shape and tap/swipe classification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GestureConfig {
    /// direction units to travel before a rotation starts
    pub circle_sensitivity: i32,
    /// swipe distance used when the starting key's width is unknown
    pub min_swipe_distance: f32,
    /// Manhattan radius around the touch-down point counted as "center"
    pub center_radius: f32,
}

/// Parameters of path simplification and probabilistic key detection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// RDP tolerance in pixels; `0` keeps every point
    pub simplify_epsilon: f32,
    /// key size multiplier for the Gaussian standard deviation
    pub sigma_factor: f32,
    /// per-point weights at or below this are ignored
    pub min_probability: f32,
    /// normalized weight a key must exceed to be reported
    pub probability_threshold: f32,
    /// how detected keys are ordered
    pub key_ordering: KeyOrdering,
}

/// How detected keys are placed along the path before ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyOrdering {
    /// every key is placed at the middle of the path, leaving keys in
    /// descending probability order
    PathMidpoint,
    /// every key is placed at the sample where its weight peaked
    StrongestPoint,
}

/// Parameters of dictionary pruning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PruningConfig {
    /// distinct start and end keys taken from each end of the key sequence
    pub extremity_keys: usize,
    /// fraction of a key width travelled per letter of a word
    pub length_factor: f32,
    /// accepted deviation from the ideal path length, in key widths
    pub length_tolerance: f32,
}

/// Parameters of typo correction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorrectionConfig {
    /// largest keyboard distance still scored as a correction
    pub max_edit_distance: u32,
    /// typed words shorter than this are never corrected
    pub min_word_length: usize,
    /// corrections returned by default
    pub max_suggestions: usize,
}

/// Parameters of the result cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// maximum number of cached results
    pub capacity: usize,
    /// largest start, end or centroid displacement still considered similar
    pub distance_threshold: f32,
}

/// Configuration of a [`SwipeEngine`](crate::engine::SwipeEngine).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// gesture shape and classification
    #[serde(default = "GestureConfig::default")]
    pub gesture: GestureConfig,
    /// simplification and key detection
    #[serde(default = "DetectionConfig::default")]
    pub detection: DetectionConfig,
    /// dictionary pruning
    #[serde(default = "PruningConfig::default")]
    pub pruning: PruningConfig,
    /// typo correction
    #[serde(default = "CorrectionConfig::default")]
    pub correction: CorrectionConfig,
    /// result cache
    #[serde(default = "CacheConfig::default")]
    pub cache: CacheConfig,
}

impl GestureConfig {
    /// Defaults tuned for a phone-sized keyboard.
    pub const fn default() -> GestureConfig {
        GestureConfig {
            circle_sensitivity: 2,
            min_swipe_distance: 40.0,
            center_radius: 40.0,
        }
    }
}

impl DetectionConfig {
    /// Default detection parameters.
    pub const fn default() -> DetectionConfig {
        DetectionConfig {
            simplify_epsilon: 10.0,
            sigma_factor: 0.5,
            min_probability: 0.01,
            probability_threshold: 0.3,
            key_ordering: KeyOrdering::PathMidpoint,
        }
    }
}

impl PruningConfig {
    /// Default pruning parameters.
    pub const fn default() -> PruningConfig {
        PruningConfig {
            extremity_keys: 2,
            length_factor: 0.8,
            length_tolerance: 3.0,
        }
    }
}

impl CorrectionConfig {
    /// Default correction parameters.
    pub const fn default() -> CorrectionConfig {
        CorrectionConfig {
            max_edit_distance: 2,
            min_word_length: 3,
            max_suggestions: 5,
        }
    }
}

impl CacheConfig {
    /// Default cache parameters.
    pub const fn default() -> CacheConfig {
        CacheConfig {
            capacity: 20,
            distance_threshold: 50.0,
        }
    }
}

impl EngineConfig {
    /// Every group at its default.
    pub const fn default() -> EngineConfig {
        EngineConfig {
            gesture: GestureConfig::default(),
            detection: DetectionConfig::default(),
            pruning: PruningConfig::default(),
            correction: CorrectionConfig::default(),
            cache: CacheConfig::default(),
        }
    }

    /// reads a JSON configuration
    pub fn from_reader<R: Read>(reader: R) -> Result<EngineConfig, ConfigError> {
        serde_json::from_reader(reader).map_err(ConfigError::Parse)
    }

    /// reads a JSON configuration file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
        let file = std::fs::File::open(path).map_err(ConfigError::Io)?;
        Self::from_reader(std::io::BufReader::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    static CFG: EngineConfig = EngineConfig::default();

    #[test]
    fn defaults() {
        assert_eq!(CFG.gesture.circle_sensitivity, 2);
        assert_eq!(CFG.gesture.center_radius, CFG.gesture.min_swipe_distance);
        assert_eq!(CFG.cache.capacity, 20);
        assert_eq!(CFG.correction.max_edit_distance, 2);
        assert_eq!(CFG.correction.min_word_length, 3);
        assert_eq!(CFG.detection.key_ordering, KeyOrdering::PathMidpoint);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let json = r#"{ "cache": { "capacity": 4, "distance_threshold": 10.0 } }"#;
        let cfg = EngineConfig::from_reader(json.as_bytes()).unwrap();

        assert_eq!(cfg.cache.capacity, 4);
        assert_eq!(cfg.gesture, GestureConfig::default());
        assert_eq!(cfg.pruning, PruningConfig::default());
    }

    #[test]
    fn from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let mut cfg = EngineConfig::default();
        cfg.detection.key_ordering = KeyOrdering::StrongestPoint;
        write!(file, "{}", serde_json::to_string(&cfg).unwrap()).unwrap();

        let loaded = EngineConfig::from_path(file.path()).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn invalid_json() {
        match EngineConfig::from_reader("{ nope".as_bytes()) {
            Err(ConfigError::Parse(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
