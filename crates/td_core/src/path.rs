//! Path geometry: the curve enemies walk along.
//!
//! A map supplies a handful of control points. [`PathCurve::build`] threads a
//! Catmull-Rom spline through them and samples it densely; everything else in
//! the simulation works on that sample array. Progress `t` in `[0, 1]` maps
//! linearly onto sample indices, so progress is not arc-length exact. Enemy
//! motion compensates by scaling each step by the local segment length.

use serde::{Deserialize, Serialize};

use crate::config::MAX_MAP_DIMENSION;
use crate::error::{GameError, Result};
use crate::math::{fixed_int, fixed_ratio, Fixed, Vec2Fixed};

/// Samples taken per control-point segment.
pub const SAMPLES_PER_SEGMENT: i32 = 40;

/// Full width of the walkable corridor around the curve.
pub const CORRIDOR_WIDTH: Fixed = fixed_int(40);

/// Sampled traversal curve. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathCurve {
    samples: Vec<Vec2Fixed>,
}

impl PathCurve {
    /// Build a curve through the given control points.
    ///
    /// The first and last control points are duplicated as spline tangent
    /// anchors so the curve starts and ends exactly on them.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DegenerateMap`] when fewer than two control points
    /// are supplied, and [`GameError::ControlPointOutOfRange`] when a point
    /// lies outside `0..=MAX_MAP_DIMENSION` on either axis.
    pub fn build(control_points: &[Vec2Fixed]) -> Result<Self> {
        Self::build_named("<anonymous>", control_points)
    }

    /// Like [`build`](Self::build), labelling errors with a map name.
    pub fn build_named(name: &str, control_points: &[Vec2Fixed]) -> Result<Self> {
        let count = control_points.len();
        if count < 2 {
            return Err(GameError::DegenerateMap {
                map: name.to_string(),
                points: count,
            });
        }

        let limit = Fixed::from_num(MAX_MAP_DIMENSION);
        let in_range = |v: Fixed| v >= Fixed::ZERO && v <= limit;
        if let Some(point) = control_points
            .iter()
            .find(|p| !in_range(p.x) || !in_range(p.y))
        {
            return Err(GameError::ControlPointOutOfRange {
                map: name.to_string(),
                x: point.x,
                y: point.y,
                limit: MAX_MAP_DIMENSION,
            });
        }

        let segments = count - 1;
        let mut samples = Vec::with_capacity(segments * SAMPLES_PER_SEGMENT as usize + 1);

        for i in 0..segments {
            let p0 = control_points[i.saturating_sub(1)];
            let p1 = control_points[i];
            let p2 = control_points[i + 1];
            let p3 = control_points[(i + 2).min(count - 1)];

            for step in 0..SAMPLES_PER_SEGMENT {
                let t = fixed_ratio(step, SAMPLES_PER_SEGMENT);
                samples.push(catmull_rom(p0, p1, p2, p3, t));
            }
        }
        samples.push(control_points[count - 1]);

        Ok(Self { samples })
    }

    /// The sampled points, in traversal order.
    #[must_use]
    pub fn samples(&self) -> &[Vec2Fixed] {
        &self.samples
    }

    /// Number of samples on the curve.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// First point of the curve (where enemies spawn).
    #[must_use]
    pub fn start(&self) -> Vec2Fixed {
        self.samples[0]
    }

    /// Last point of the curve (the base).
    #[must_use]
    pub fn end(&self) -> Vec2Fixed {
        self.samples[self.samples.len() - 1]
    }

    /// Sum of the distances between consecutive samples.
    #[must_use]
    pub fn total_length(&self) -> Fixed {
        self.samples
            .windows(2)
            .map(|pair| pair[0].distance(pair[1]))
            .fold(Fixed::ZERO, |acc, len| acc + len)
    }

    /// Map progress `t` onto the curve.
    ///
    /// `t` is clamped to `[0, 1]` and mapped linearly onto the sample array,
    /// interpolating between the two bounding samples.
    #[must_use]
    pub fn position_at_progress(&self, t: Fixed) -> Vec2Fixed {
        let (index, frac) = self.locate(t);
        if index + 1 >= self.samples.len() {
            return self.end();
        }
        self.samples[index].lerp(self.samples[index + 1], frac)
    }

    /// Length of the sample segment that contains progress `t`.
    #[must_use]
    pub fn segment_length_at(&self, t: Fixed) -> Fixed {
        let (index, _) = self.locate(t);
        let index = index.min(self.samples.len() - 2);
        self.samples[index].distance(self.samples[index + 1])
    }

    /// Progress covered by one sample segment.
    #[must_use]
    pub fn progress_per_segment(&self) -> Fixed {
        Fixed::from_num(1) / self.last_index()
    }

    /// Whether `point` lies inside the corridor, widened by `margin`.
    ///
    /// Used to keep towers off the path. Scans every sample.
    #[must_use]
    pub fn is_within_corridor(&self, point: Vec2Fixed, margin: Fixed) -> bool {
        let reach = CORRIDOR_WIDTH / Fixed::from_num(2) + margin;
        self.samples.iter().any(|sample| sample.within(point, reach))
    }

    fn last_index(&self) -> Fixed {
        Fixed::from_num(self.samples.len() - 1)
    }

    /// Split progress into a sample index and the fraction toward the next one.
    fn locate(&self, t: Fixed) -> (usize, Fixed) {
        let t = t.clamp(Fixed::ZERO, Fixed::from_num(1));
        let scaled = t * self.last_index();
        let index = scaled.floor();
        (index.to_num::<usize>(), scaled - index)
    }
}

/// Uniform Catmull-Rom interpolation between `p1` and `p2`.
fn catmull_rom(
    p0: Vec2Fixed,
    p1: Vec2Fixed,
    p2: Vec2Fixed,
    p3: Vec2Fixed,
    t: Fixed,
) -> Vec2Fixed {
    Vec2Fixed::new(
        catmull_rom_axis(p0.x, p1.x, p2.x, p3.x, t),
        catmull_rom_axis(p0.y, p1.y, p2.y, p3.y, t),
    )
}

fn catmull_rom_axis(p0: Fixed, p1: Fixed, p2: Fixed, p3: Fixed, t: Fixed) -> Fixed {
    let two = Fixed::from_num(2);
    let three = Fixed::from_num(3);
    let four = Fixed::from_num(4);
    let five = Fixed::from_num(5);

    let t2 = t * t;
    let t3 = t2 * t;

    let a = two * p1;
    let b = p2 - p0;
    let c = two * p0 - five * p1 + four * p2 - p3;
    let d = three * p1 - p0 - three * p2 + p3;

    (a + b * t + c * t2 + d * t3) / two
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zigzag() -> PathCurve {
        PathCurve::build(&[
            Vec2Fixed::from_ints(0, 100),
            Vec2Fixed::from_ints(200, 100),
            Vec2Fixed::from_ints(200, 400),
            Vec2Fixed::from_ints(600, 400),
        ])
        .unwrap()
    }

    fn straight() -> PathCurve {
        PathCurve::build(&[Vec2Fixed::from_ints(0, 100), Vec2Fixed::from_ints(400, 100)]).unwrap()
    }

    #[test]
    fn test_too_few_points_is_rejected() {
        let err = PathCurve::build(&[Vec2Fixed::ZERO]).unwrap_err();
        assert!(matches!(err, GameError::DegenerateMap { points: 1, .. }));
    }

    #[test]
    fn test_control_points_outside_map_limit_are_rejected() {
        let far = PathCurve::build_named(
            "far",
            &[Vec2Fixed::from_ints(0, 300), Vec2Fixed::from_ints(60_000, 300)],
        )
        .unwrap_err();
        assert!(matches!(
            &far,
            GameError::ControlPointOutOfRange { map, limit, .. }
                if map == "far" && *limit == MAX_MAP_DIMENSION
        ));

        let negative =
            PathCurve::build(&[Vec2Fixed::from_ints(-1, 0), Vec2Fixed::from_ints(100, 0)]);
        assert!(matches!(negative, Err(GameError::ControlPointOutOfRange { .. })));

        let edge = PathCurve::build(&[Vec2Fixed::ZERO, Vec2Fixed::from_ints(10_000, 10_000)]);
        assert!(edge.is_ok());
    }

    #[test]
    fn test_curve_starts_and_ends_on_control_points() {
        let curve = zigzag();
        assert_eq!(curve.start(), Vec2Fixed::from_ints(0, 100));
        assert_eq!(curve.end(), Vec2Fixed::from_ints(600, 400));
        assert_eq!(curve.position_at_progress(Fixed::ZERO), curve.start());
        assert_eq!(curve.position_at_progress(Fixed::from_num(1)), curve.end());
    }

    #[test]
    fn test_sample_density() {
        let curve = zigzag();
        assert_eq!(curve.sample_count(), 3 * SAMPLES_PER_SEGMENT as usize + 1);
    }

    #[test]
    fn test_curve_passes_through_interior_control_points() {
        let curve = zigzag();
        let at_second = curve.samples()[SAMPLES_PER_SEGMENT as usize];
        assert_eq!(at_second, Vec2Fixed::from_ints(200, 100));
    }

    #[test]
    fn test_progress_is_clamped() {
        let curve = zigzag();
        assert_eq!(curve.position_at_progress(Fixed::from_num(-1)), curve.start());
        assert_eq!(curve.position_at_progress(Fixed::from_num(3)), curve.end());
    }

    #[test]
    fn test_corridor_query() {
        let curve = straight();
        assert!(curve.is_within_corridor(Vec2Fixed::from_ints(100, 110), Fixed::ZERO));
        assert!(!curve.is_within_corridor(Vec2Fixed::from_ints(100, 140), Fixed::ZERO));
        assert!(curve.is_within_corridor(Vec2Fixed::from_ints(100, 140), Fixed::from_num(25)));
        assert!(!curve.is_within_corridor(Vec2Fixed::from_ints(100, 200), Fixed::from_num(25)));
    }

    #[test]
    fn test_straight_run_length() {
        let curve = straight();
        assert!((curve.total_length() - Fixed::from_num(400)).abs() < Fixed::from_num(0.01));

        // Duplicated end anchors ease in and out, so samples bunch up at the
        // ends and spread out in the middle.
        let edge = curve.segment_length_at(Fixed::ZERO);
        let middle = curve.segment_length_at(Fixed::from_num(0.5));
        assert!(edge > Fixed::ZERO);
        assert!(middle > edge);
    }
}
