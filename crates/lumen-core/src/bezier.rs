//! Pure curve math: closed-form cubic Bezier evaluation and uniform sampling.
//!
//! The viewer draws the sampled curve as a line strip and moves the first
//! light along it over time.

use glam::Vec3;

/// Parametric distance between consecutive samples of the overlay strip.
pub const DEFAULT_SAMPLE_STEP: f32 = 0.02;

/// A cubic Bezier defined by four control points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BezierCurve {
    pub control_points: [Vec3; 4],
}

impl Default for BezierCurve {
    fn default() -> Self {
        Self::new([
            Vec3::new(40.0, 40.0, 40.0),
            Vec3::new(50.0, 20.0, 40.0),
            Vec3::new(40.0, 50.0, -60.0),
            Vec3::new(70.0, 40.0, -40.0),
        ])
    }
}

impl BezierCurve {
    pub fn new(control_points: [Vec3; 4]) -> Self {
        Self { control_points }
    }

    /// Evaluate the curve at `t`. Values outside [0, 1] are clamped.
    pub fn point_at(&self, t: f32) -> Vec3 {
        let t = t.clamp(0.0, 1.0);
        let u = 1.0 - t;
        let [p0, p1, p2, p3] = self.control_points;
        p0 * (u * u * u) + p1 * (3.0 * u * u * t) + p2 * (3.0 * u * t * t) + p3 * (t * t * t)
    }

    /// Sample the curve from t = 0 to t = 1 inclusive.
    ///
    /// The step count is rounded so both endpoints are always present,
    /// which a floating-point accumulator would not guarantee.
    pub fn sample(&self, step: f32) -> Vec<Vec3> {
        let segments = (1.0 / step.max(1e-4)).round().max(1.0) as usize;
        (0..=segments)
            .map(|i| self.point_at(i as f32 / segments as f32))
            .collect()
    }

    /// Curve parameter for a point oscillating back and forth along the
    /// curve as `time` (seconds) advances.
    pub fn oscillation_parameter(time: f32) -> f32 {
        (time / 2.0).sin() / 2.0 + 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn endpoints_interpolate_first_and_last_control_points() {
        let curve = BezierCurve::default();
        assert!(approx(curve.point_at(0.0), curve.control_points[0]));
        assert!(approx(curve.point_at(1.0), curve.control_points[3]));
    }

    #[test]
    fn midpoint_matches_closed_form() {
        let curve = BezierCurve::new([
            Vec3::ZERO,
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
        ]);
        // (0 + 3*(0,1) + 3*(1,1) + (1,0)) / 8
        assert!(approx(curve.point_at(0.5), Vec3::new(0.5, 0.75, 0.0)));
    }

    #[test]
    fn parameter_is_clamped() {
        let curve = BezierCurve::default();
        assert!(approx(curve.point_at(-3.0), curve.point_at(0.0)));
        assert!(approx(curve.point_at(7.5), curve.point_at(1.0)));
    }

    #[test]
    fn default_sampling_has_51_points_including_ends() {
        let curve = BezierCurve::default();
        let points = curve.sample(DEFAULT_SAMPLE_STEP);
        assert_eq!(points.len(), 51);
        assert!(approx(points[0], curve.control_points[0]));
        assert!(approx(points[50], curve.control_points[3]));
    }

    #[test]
    fn oscillation_stays_in_unit_range() {
        for i in 0..200 {
            let t = BezierCurve::oscillation_parameter(i as f32 * 0.37);
            assert!((0.0..=1.0).contains(&t));
        }
        assert!((BezierCurve::oscillation_parameter(0.0) - 0.5).abs() < 1e-6);
    }
}
