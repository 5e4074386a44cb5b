//! Tap or swipe?
//!
//! A touch is a swipe when the pointer left the key it started on and either
//! travelled at least half that key's width or stayed down longer than a tap
//! can last. The distance threshold scales with the layout, the time
//! threshold catches slow gestures that never travel far.
use serde::{Deserialize, Serialize};

use crate::config::GestureConfig;
use crate::constants::MAX_TAP_DURATION_MS;
use crate::gesture::{GestureShape, GestureTracker};
use crate::layout::{KeyRef, KeyboardLayout};
use crate::types::{Point, Trajectory};

/// Outcome of tap/swipe classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TouchKind {
    /// a discrete key press
    Tap,
    /// the start of trajectory based word input
    Swipe,
}

/// The inputs the classification depends on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchSummary {
    /// whether any sample landed outside the touch-down key
    pub left_starting_key: bool,
    /// path length in pixels
    pub total_distance: f32,
    /// time from touch-down to the latest sample
    pub elapsed_ms: u64,
    /// width in pixels of the touch-down key
    pub starting_key_width: f32,
}

impl TouchSummary {
    /// Applies [`classify`] to this summary.
    pub fn classify(&self) -> TouchKind {
        classify(
            self.left_starting_key,
            self.total_distance,
            self.elapsed_ms,
            self.starting_key_width,
        )
    }
}

/// Classifies a touch as [`TouchKind::Tap`] or [`TouchKind::Swipe`].
#[inline]
pub fn classify(
    left_starting_key: bool,
    total_distance: f32,
    elapsed_ms: u64,
    starting_key_width: f32,
) -> TouchKind {
    let min_swipe_distance = starting_key_width / 2.0;

    if left_starting_key
        && (total_distance >= min_swipe_distance || elapsed_ms > MAX_TAP_DURATION_MS)
    {
        TouchKind::Swipe
    } else {
        TouchKind::Tap
    }
}

/// A finished touch.
#[derive(Debug, Clone)]
pub struct CompletedTouch {
    /// every sample, touch-down first
    pub trajectory: Trajectory,
    /// tap or swipe
    pub kind: TouchKind,
    /// recognized gesture shape
    pub shape: GestureShape,
    /// the key under the touch-down point, if any
    pub starting_key: Option<KeyRef>,
}

/// Follows one pointer from touch-down to touch-up.
///
/// Owns the trajectory while it grows; [`finish`](Self::finish) moves it out,
/// so a finished trajectory can no longer be appended to.
#[derive(Debug)]
pub struct TouchTracker<'a> {
    layout: &'a KeyboardLayout,
    width: f32,
    height: f32,
    trajectory: Trajectory,
    starting_key: Option<KeyRef>,
    starting_key_width: f32,
    left_starting_key: bool,
    total_distance: f32,
    gesture: GestureTracker,
}

impl<'a> TouchTracker<'a> {
    /// Starts tracking at the touch-down sample.
    ///
    /// When the touch-down is not on a key, twice the configured
    /// `min_swipe_distance` stands in for the starting key width.
    pub fn new(
        layout: &'a KeyboardLayout,
        width: f32,
        height: f32,
        config: &GestureConfig,
        point: Point,
        time_ms: u64,
    ) -> TouchTracker<'a> {
        let starting_key = layout.key_at(point, width, height);
        let starting_key_width = starting_key
            .and_then(|k| layout.key(k))
            .map(|k| k.rect.width * width)
            .unwrap_or(config.min_swipe_distance * 2.0);

        TouchTracker {
            layout,
            width,
            height,
            trajectory: Trajectory::starting_at(point, time_ms),
            starting_key,
            starting_key_width,
            left_starting_key: false,
            total_distance: 0.0,
            gesture: GestureTracker::new(point, config.center_radius, config.circle_sensitivity),
        }
    }

    /// Records a move sample. Returns whether the gesture shape changed.
    pub fn move_to(&mut self, point: Point, time_ms: u64) -> bool {
        if let Some(last) = self.trajectory.end() {
            self.total_distance += last.distance(&point);
        }

        if !self.left_starting_key && self.layout.key_at(point, self.width, self.height) != self.starting_key {
            log::trace!("pointer left starting key {:?}", self.starting_key);
            self.left_starting_key = true;
        }

        self.trajectory.push(point, time_ms);
        self.gesture.update(point)
    }

    /// samples so far
    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// the key under the touch-down point
    pub fn starting_key(&self) -> Option<KeyRef> {
        self.starting_key
    }

    /// the gesture shape so far
    pub fn shape(&self) -> GestureShape {
        self.gesture.shape()
    }

    /// the classification inputs so far
    pub fn summary(&self) -> TouchSummary {
        TouchSummary {
            left_starting_key: self.left_starting_key,
            total_distance: self.total_distance,
            elapsed_ms: self.trajectory.duration_ms(),
            starting_key_width: self.starting_key_width,
        }
    }

    /// the classification so far
    pub fn kind(&self) -> TouchKind {
        self.summary().classify()
    }

    /// Lifts the pointer and freezes the trajectory.
    pub fn finish(mut self) -> CompletedTouch {
        let shape = self.gesture.pointer_up();
        let kind = self.kind();
        log::debug!(
            "touch finished: {:?}, {:?}, {} samples",
            kind,
            shape,
            self.trajectory.len()
        );

        CompletedTouch {
            trajectory: self.trajectory,
            kind,
            shape,
            starting_key: self.starting_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn reference_cases() {
        assert_eq!(classify(true, 50.0, 100, 80.0), TouchKind::Swipe);
        assert_eq!(classify(true, 25.0, 50, 80.0), TouchKind::Tap);
        assert_eq!(classify(true, 30.0, 200, 80.0), TouchKind::Swipe);
        assert_eq!(classify(true, 40.0, 0, 80.0), TouchKind::Swipe);
        assert_eq!(classify(true, 39.9, 150, 80.0), TouchKind::Tap);
        assert_eq!(classify(false, 500.0, 1000, 80.0), TouchKind::Tap);
    }

    proptest! {
        #[test]
        fn never_swipe_without_leaving_key(
            distance in 0.0f32..10_000.0,
            elapsed in 0u64..100_000,
            width in 0.0f32..1_000.0,
        ) {
            prop_assert_eq!(classify(false, distance, elapsed, width), TouchKind::Tap);
        }

        #[test]
        fn agrees_with_thresholds(
            distance in 0.0f32..1_000.0,
            elapsed in 0u64..1_000,
            width in 1.0f32..500.0,
        ) {
            let expected = distance >= width / 2.0 || elapsed > 150;
            let kind = classify(true, distance, elapsed, width);
            prop_assert_eq!(kind == TouchKind::Swipe, expected);
            prop_assert_eq!(kind, classify(true, distance, elapsed, width));
        }
    }

    #[test]
    fn tracker_tap() {
        let layout = KeyboardLayout::qwerty();
        let cfg = GestureConfig::default();
        let mut t = TouchTracker::new(&layout, 1000.0, 400.0, &cfg, Point::new(150.0, 50.0), 0);
        t.move_to(Point::new(155.0, 52.0), 30);
        let done = t.finish();

        assert_eq!(done.kind, TouchKind::Tap);
        assert_eq!(done.trajectory.len(), 2);
    }

    #[test]
    fn tracker_swipe() {
        let layout = KeyboardLayout::qwerty();
        let cfg = GestureConfig::default();
        let mut t = TouchTracker::new(&layout, 1000.0, 400.0, &cfg, Point::new(150.0, 50.0), 0);
        t.move_to(Point::new(200.0, 50.0), 20);
        t.move_to(Point::new(260.0, 50.0), 40);

        let summary = t.summary();
        assert!(summary.left_starting_key);
        assert!((summary.total_distance - 110.0).abs() < 1e-3);
        assert!((summary.starting_key_width - 100.0).abs() < 1e-3);
        assert_eq!(summary.elapsed_ms, 40);

        let done = t.finish();
        assert_eq!(done.kind, TouchKind::Swipe);
        assert_eq!(done.shape, GestureShape::Swipe);
    }

    #[test]
    fn tracker_roundtrip_with_defaults() {
        let layout = KeyboardLayout::qwerty();
        let cfg = GestureConfig::default();
        let mut t = TouchTracker::new(&layout, 1000.0, 400.0, &cfg, Point::new(150.0, 50.0), 0);

        // jitter inside the center area does not start a gesture
        assert!(!t.move_to(Point::new(153.0, 51.0), 10));
        assert_eq!(t.shape(), GestureShape::None);

        assert!(t.move_to(Point::new(250.0, 50.0), 60));
        assert!(t.move_to(Point::new(152.0, 51.0), 120));

        let done = t.finish();
        assert_eq!(done.shape, GestureShape::Roundtrip);
        assert_eq!(done.kind, TouchKind::Swipe);
    }

    #[test]
    fn tracker_off_key_uses_fallback_width() {
        let layout = KeyboardLayout::qwerty();
        let cfg = GestureConfig::default();
        let t = TouchTracker::new(&layout, 1000.0, 400.0, &cfg, Point::new(-20.0, 50.0), 0);

        assert!(t.starting_key().is_none());
        assert_eq!(t.summary().starting_key_width, cfg.min_swipe_distance * 2.0);
    }
}
