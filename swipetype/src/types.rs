//! Touch samples and trajectories.
use serde::{Deserialize, Serialize};

/// A touch sample in keyboard-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// horizontal position
    pub x: f32,
    /// vertical position
    pub y: f32,
}

impl Point {
    /// creates a point
    pub const fn new(x: f32, y: f32) -> Point {
        Point { x, y }
    }

    /// Euclidean distance to another point
    #[inline(always)]
    pub fn distance(&self, other: &Point) -> f32 {
        self.distance_sq(other).sqrt()
    }

    /// squared Euclidean distance to another point
    #[inline(always)]
    pub fn distance_sq(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// A point together with the time it was sampled at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedPoint {
    /// sampled position
    pub point: Point,
    /// sample time in milliseconds
    pub time_ms: u64,
}

/// Chronologically ordered touch samples of one gesture.
///
/// Timestamps never decrease: a sample older than the previous one is
/// clamped to the previous timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<TimedPoint>", into = "Vec<TimedPoint>")]
pub struct Trajectory {
    samples: Vec<TimedPoint>,
}

impl Trajectory {
    /// creates an empty trajectory
    pub fn new() -> Trajectory {
        Trajectory { samples: vec![] }
    }

    /// creates a trajectory starting at the touch-down sample
    pub fn starting_at(point: Point, time_ms: u64) -> Trajectory {
        let mut t = Trajectory::new();
        t.push(point, time_ms);
        t
    }

    /// builds a trajectory from raw points, spacing them one millisecond apart
    pub fn from_points<I: IntoIterator<Item = Point>>(points: I) -> Trajectory {
        let mut t = Trajectory::new();
        for (i, p) in points.into_iter().enumerate() {
            t.push(p, i as u64);
        }
        t
    }

    /// appends a sample
    pub fn push(&mut self, point: Point, time_ms: u64) {
        let time_ms = match self.samples.last() {
            Some(last) if last.time_ms > time_ms => {
                log::trace!("clamping out of order sample {} < {}", time_ms, last.time_ms);
                last.time_ms
            }
            _ => time_ms,
        };

        self.samples.push(TimedPoint { point, time_ms });
    }

    /// number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// whether no samples have been recorded
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// all samples in order
    pub fn samples(&self) -> &[TimedPoint] {
        &self.samples
    }

    /// positions of all samples in order
    pub fn points(&self) -> Vec<Point> {
        self.samples.iter().map(|s| s.point).collect()
    }

    /// first position
    pub fn start(&self) -> Option<Point> {
        self.samples.first().map(|s| s.point)
    }

    /// last position
    pub fn end(&self) -> Option<Point> {
        self.samples.last().map(|s| s.point)
    }

    /// mean position of all samples
    pub fn centroid(&self) -> Option<Point> {
        if self.samples.is_empty() {
            return None;
        }

        let n = self.samples.len() as f32;
        let (sx, sy) = self
            .samples
            .iter()
            .fold((0.0f32, 0.0f32), |(sx, sy), s| (sx + s.point.x, sy + s.point.y));

        Some(Point::new(sx / n, sy / n))
    }

    /// total length of the polyline through all samples
    pub fn arc_length(&self) -> f32 {
        arc_length(&self.points())
    }

    /// time between the first and the last sample
    pub fn duration_ms(&self) -> u64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.time_ms - first.time_ms,
            _ => 0,
        }
    }
}

impl From<Vec<TimedPoint>> for Trajectory {
    fn from(samples: Vec<TimedPoint>) -> Trajectory {
        let mut t = Trajectory::new();
        for s in samples {
            t.push(s.point, s.time_ms);
        }
        t
    }
}

impl From<Trajectory> for Vec<TimedPoint> {
    fn from(t: Trajectory) -> Vec<TimedPoint> {
        t.samples
    }
}

/// total length of the polyline through `points`
pub fn arc_length(points: &[Point]) -> f32 {
    points.windows(2).map(|w| w[0].distance(&w[1])).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_order_timestamps() {
        let mut t = Trajectory::starting_at(Point::new(0.0, 0.0), 10);
        t.push(Point::new(1.0, 0.0), 5);
        t.push(Point::new(2.0, 0.0), 20);

        let times: Vec<u64> = t.samples().iter().map(|s| s.time_ms).collect();
        assert_eq!(times, vec![10, 10, 20]);
        assert_eq!(t.duration_ms(), 10);
    }

    #[test]
    fn geometry() {
        let t = Trajectory::from_points(vec![
            Point::new(0.0, 0.0),
            Point::new(3.0, 4.0),
            Point::new(6.0, 0.0),
        ]);

        assert_eq!(t.arc_length(), 10.0);
        assert_eq!(t.start(), Some(Point::new(0.0, 0.0)));
        assert_eq!(t.end(), Some(Point::new(6.0, 0.0)));
        let c = t.centroid().unwrap();
        assert!((c.x - 3.0).abs() < 1e-6);
        assert!((c.y - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn deserializing_clamps_timestamps() {
        let json = r#"[
            {"point": {"x": 0.0, "y": 0.0}, "time_ms": 30},
            {"point": {"x": 1.0, "y": 0.0}, "time_ms": 20}
        ]"#;
        let t: Trajectory = serde_json::from_str(json).unwrap();

        assert_eq!(t.samples()[1].time_ms, 30);
        assert_eq!(serde_json::to_value(&t).unwrap().as_array().map(|a| a.len()), Some(2));
    }

    #[test]
    fn empty() {
        let t = Trajectory::new();
        assert!(t.centroid().is_none());
        assert_eq!(t.arc_length(), 0.0);
        assert_eq!(t.duration_ms(), 0);
    }
}
