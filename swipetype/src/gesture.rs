//! Shape recognition for short directional touches.
//!
//! A pointer that leaves its key in some direction starts a [`Gesture`] in the
//! [`GestureState::Swiped`] state. Turning far enough in one sense makes it a
//! circle (clockwise) or an anticircle; reversing the rotation cancels it;
//! coming back to the starting point turns a plain swipe into a roundtrip.
use serde::{Deserialize, Serialize};

use crate::constants::DIRECTION_COUNT;
use crate::types::Point;

/// A quantized angle bucket in `[0, 16)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Direction(u8);

impl Direction {
    /// wraps any integer into the direction range
    pub fn new(value: i32) -> Direction {
        Direction(value.rem_euclid(DIRECTION_COUNT) as u8)
    }

    /// quantizes the direction of a pointer displacement
    ///
    /// Returns `None` for a zero displacement.
    pub fn from_delta(dx: f32, dy: f32) -> Option<Direction> {
        if dx == 0.0 && dy == 0.0 {
            return None;
        }

        let angle = (dy as f64).atan2(dx as f64) + std::f64::consts::PI;
        let bucket = (angle * 8.0 / std::f64::consts::PI) as i32 + 12;
        Some(Direction::new(bucket))
    }

    /// the raw bucket
    pub fn value(self) -> i32 {
        self.0 as i32
    }
}

/// Signed shortest angular difference from `d1` to `d2`, in `(-8, 8]`.
///
/// Positive is clockwise. The antipode is reported as `+8`.
pub fn dir_diff(d1: Direction, d2: Direction) -> i32 {
    if d1 == d2 {
        return 0;
    }

    let left = (d1.value() - d2.value()).rem_euclid(DIRECTION_COUNT);
    let right = (d2.value() - d1.value()).rem_euclid(DIRECTION_COUNT);

    if left < right {
        -left
    } else {
        right
    }
}

/// States of the gesture state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GestureState {
    /// the rotation reversed; no shape
    Cancelled,
    /// moving in a straight line
    Swiped,
    /// turning clockwise
    RotatingClockwise,
    /// turning anticlockwise
    RotatingAnticlockwise,
    /// lifted after a straight swipe
    EndedSwipe,
    /// came back to the touch-down point after a straight swipe
    EndedCenter,
    /// lifted while turning clockwise
    EndedClockwise,
    /// lifted while turning anticlockwise
    EndedAnticlockwise,
}

/// Recognized gesture shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GestureShape {
    /// no gesture, or a cancelled one
    None,
    /// straight movement away from the touch-down point
    Swipe,
    /// out and back to the touch-down point
    Roundtrip,
    /// clockwise rotation
    Circle,
    /// anticlockwise rotation
    Anticircle,
}

/// Gesture state machine driven by direction changes of one pointer.
#[derive(Debug, Clone)]
pub struct Gesture {
    current: Direction,
    state: GestureState,
    sensitivity: i32,
}

impl Gesture {
    /// starts a swipe towards `starting_direction`
    pub fn new(starting_direction: Direction, sensitivity: i32) -> Gesture {
        Gesture {
            current: starting_direction,
            state: GestureState::Swiped,
            sensitivity,
        }
    }

    /// current state
    pub fn state(&self) -> GestureState {
        self.state
    }

    /// the last direction that changed the state
    pub fn current_direction(&self) -> Direction {
        self.current
    }

    /// the currently recognized shape
    pub fn shape(&self) -> GestureShape {
        use GestureState::*;

        match self.state {
            Cancelled => GestureShape::None,
            Swiped | EndedSwipe => GestureShape::Swipe,
            EndedCenter => GestureShape::Roundtrip,
            RotatingClockwise | EndedClockwise => GestureShape::Circle,
            RotatingAnticlockwise | EndedAnticlockwise => GestureShape::Anticircle,
        }
    }

    /// whether the pointer is still down and the gesture can still change
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self.state,
            GestureState::Swiped
                | GestureState::RotatingClockwise
                | GestureState::RotatingAnticlockwise
        )
    }

    /// The pointer now points towards `direction`.
    ///
    /// Returns whether the state changed in a way that changes [`shape`](Self::shape).
    pub fn changed_direction(&mut self, direction: Direction) -> bool {
        let d = dir_diff(self.current, direction);
        let clockwise = d > 0;

        match self.state {
            GestureState::Swiped => {
                if d.abs() < self.sensitivity {
                    return false;
                }

                self.state = if clockwise {
                    GestureState::RotatingClockwise
                } else {
                    GestureState::RotatingAnticlockwise
                };
                self.current = direction;
                true
            }
            GestureState::RotatingClockwise | GestureState::RotatingAnticlockwise => {
                // no movement has no rotation sense to disagree with
                if d == 0 {
                    return false;
                }

                self.current = direction;

                if (self.state == GestureState::RotatingClockwise) == clockwise {
                    false
                } else {
                    self.state = GestureState::Cancelled;
                    true
                }
            }
            _ => false,
        }
    }

    /// The pointer came back to where it started.
    ///
    /// Returns whether [`shape`](Self::shape) changed.
    pub fn moved_to_center(&mut self) -> bool {
        match self.state {
            GestureState::Swiped => {
                self.state = GestureState::EndedCenter;
                true
            }
            GestureState::RotatingClockwise => {
                self.state = GestureState::EndedClockwise;
                false
            }
            GestureState::RotatingAnticlockwise => {
                self.state = GestureState::EndedAnticlockwise;
                false
            }
            _ => false,
        }
    }

    /// The pointer was lifted.
    pub fn pointer_up(&mut self) {
        self.state = match self.state {
            GestureState::Swiped => GestureState::EndedSwipe,
            GestureState::RotatingClockwise => GestureState::EndedClockwise,
            GestureState::RotatingAnticlockwise => GestureState::EndedAnticlockwise,
            other => other,
        };
    }
}

/// Feeds raw pointer positions into a [`Gesture`].
///
/// The gesture is created lazily on the first sample that leaves the center
/// area around the touch-down point.
#[derive(Debug, Clone)]
pub struct GestureTracker {
    origin: Point,
    center_radius: f32,
    sensitivity: i32,
    gesture: Option<Gesture>,
}

impl GestureTracker {
    /// Tracks a pointer that went down at `origin`.
    pub fn new(origin: Point, center_radius: f32, sensitivity: i32) -> GestureTracker {
        GestureTracker {
            origin,
            center_radius,
            sensitivity,
            gesture: None,
        }
    }

    /// processes a pointer sample, returning whether the shape changed
    pub fn update(&mut self, point: Point) -> bool {
        let dx = point.x - self.origin.x;
        let dy = point.y - self.origin.y;

        if dx.abs() + dy.abs() < self.center_radius {
            return match self.gesture.as_mut() {
                Some(g) if g.is_in_progress() => g.moved_to_center(),
                _ => false,
            };
        }

        let direction = match Direction::from_delta(dx, dy) {
            Some(d) => d,
            None => return false,
        };

        match self.gesture.as_mut() {
            Some(g) => g.changed_direction(direction),
            None => {
                self.gesture = Some(Gesture::new(direction, self.sensitivity));
                true
            }
        }
    }

    /// the state machine, once the pointer has left the center
    pub fn gesture(&self) -> Option<&Gesture> {
        self.gesture.as_ref()
    }

    /// the current shape, `None` while the pointer has not left the center
    pub fn shape(&self) -> GestureShape {
        self.gesture
            .as_ref()
            .map(Gesture::shape)
            .unwrap_or(GestureShape::None)
    }

    /// lifts the pointer and returns the final shape
    pub fn pointer_up(&mut self) -> GestureShape {
        if let Some(g) = self.gesture.as_mut() {
            g.pointer_up();
        }
        self.shape()
    }
}
