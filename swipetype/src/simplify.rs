//! Trajectory reduction.
//!
//! [`simplify_path`] keeps the geometrically essential points of a dense
//! trajectory (Ramer-Douglas-Peucker). [`Resampler`] fits a trajectory to the
//! fixed input length a scoring backend expects.
use serde::{Deserialize, Serialize};

use crate::types::{Point, Trajectory};

/// Distance from `point` to the segment `start`..`end`.
///
/// Falls back to the distance to `start` when the segment is a single point.
pub fn segment_distance(point: &Point, start: &Point, end: &Point) -> f32 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length_sq = dx * dx + dy * dy;

    if length_sq == 0.0 {
        return point.distance(start);
    }

    let t = ((point.x - start.x) * dx + (point.y - start.y) * dy) / length_sq;
    let t = t.max(0.0).min(1.0);
    let nearest = Point::new(start.x + t * dx, start.y + t * dy);

    point.distance(&nearest)
}

/// Indices of the points kept by Ramer-Douglas-Peucker simplification.
///
/// Works on `(first, last)` index ranges of the input with an explicit stack,
/// so the only allocations are the keep mask and the stack. Inputs with fewer
/// than three points, or a non-positive `epsilon`, keep every point.
pub fn simplify_indices(points: &[Point], epsilon: f32) -> Vec<usize> {
    let n = points.len();

    if n < 3 || epsilon <= 0.0 {
        return (0..n).collect();
    }

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut ranges = Vec::with_capacity(32);
    ranges.push((0usize, n - 1));

    while let Some((first, last)) = ranges.pop() {
        if last - first < 2 {
            continue;
        }

        let mut max_dist = 0.0f32;
        let mut max_index = first;

        for i in first + 1..last {
            let dist = segment_distance(&points[i], &points[first], &points[last]);
            if dist > max_dist {
                max_dist = dist;
                max_index = i;
            }
        }

        if max_dist > epsilon {
            keep[max_index] = true;
            ranges.push((max_index, last));
            ranges.push((first, max_index));
        }
    }

    keep.iter()
        .enumerate()
        .filter_map(|(i, k)| if *k { Some(i) } else { None })
        .collect()
}

/// Simplifies a polyline, preserving its first and last points.
pub fn simplify_path(points: &[Point], epsilon: f32) -> Vec<Point> {
    simplify_indices(points, epsilon)
        .into_iter()
        .map(|i| points[i])
        .collect()
}

/// Simplifies a trajectory, keeping the timestamps of the surviving samples.
pub fn simplify(trajectory: &Trajectory, epsilon: f32) -> Trajectory {
    let samples = trajectory.samples();
    let points = trajectory.points();
    let kept = simplify_indices(&points, epsilon);

    log::trace!("simplified {} points to {}", samples.len(), kept.len());
    kept.into_iter()
        .map(|i| samples[i])
        .collect::<Vec<_>>()
        .into()
}

/// Strategies for shortening a trajectory to a fixed number of points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleMode {
    /// keep the first points, dropping the end of the gesture
    Truncate,
    /// keep the endpoints and sample the rest, favouring start and end
    Discard,
    /// average runs of neighbouring points
    Merge,
}

/// Fits trajectories to a fixed backend input length.
#[derive(Debug, Clone, Copy)]
pub struct Resampler {
    /// number of points to produce
    pub target: usize,
    /// how to get there
    pub mode: ResampleMode,
}

impl Resampler {
    /// A resampler to `target` points.
    pub fn new(target: usize, mode: ResampleMode) -> Resampler {
        Resampler { target, mode }
    }

    /// Returns at most `target` points. Shorter inputs are returned as is.
    pub fn resample(&self, points: &[Point]) -> Vec<Point> {
        if points.len() <= self.target || self.target == 0 {
            return points.to_vec();
        }

        match self.mode {
            ResampleMode::Truncate => points[..self.target].to_vec(),
            ResampleMode::Discard => discard_indices(points.len(), self.target)
                .into_iter()
                .map(|i| points[i])
                .collect(),
            ResampleMode::Merge => merge(points, self.target),
        }
    }
}

// Start and end zones cover 30% of the input each and get 35% of the output.
fn discard_indices(len: usize, target: usize) -> Vec<usize> {
    if target == 1 {
        return vec![0];
    }

    let mut out = Vec::with_capacity(target);
    out.push(0);

    let middle = target - 2;
    let available = len - 2;

    if available <= middle {
        out.extend(1..len - 1);
    } else if middle > 0 {
        let start_zone_end = 1 + (available as f64 * 0.3) as usize;
        let end_zone_start = len - 1 - (available as f64 * 0.3) as usize;

        let in_start = (middle as f64 * 0.35) as usize;
        let in_end = (middle as f64 * 0.35) as usize;
        let in_middle = middle - in_start - in_end;

        for i in 0..in_start {
            out.push(1 + (i * (start_zone_end - 1)) / in_start);
        }

        let middle_size = end_zone_start - start_zone_end;
        for i in 0..in_middle {
            out.push(start_zone_end + (i * middle_size) / in_middle);
        }

        let end_size = (len - 1) - end_zone_start;
        for i in 0..in_end {
            out.push(end_zone_start + (i * end_size) / in_end);
        }
    }

    out.push(len - 1);
    out
}

fn merge(points: &[Point], target: usize) -> Vec<Point> {
    let ratio = points.len() as f64 / target as f64;

    (0..target)
        .map(|i| {
            let from = (i as f64 * ratio) as usize;
            let to = (((i + 1) as f64 * ratio) as usize).max(from + 1).min(points.len());
            let bucket = &points[from..to];
            let n = bucket.len() as f32;
            let (sx, sy) = bucket
                .iter()
                .fold((0.0f32, 0.0f32), |(sx, sy), p| (sx + p.x, sy + p.y));
            Point::new(sx / n, sy / n)
        })
        .collect()
}
