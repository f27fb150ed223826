//! Quantized eye-space depth keys for the transparency sort.

use glam::Mat4;

/// Key reserved for primitives with no usable position (cross-sections,
/// empty centroids). They sort to the end and draw last.
pub const FARTHEST_KEY: u16 = 65535;

/// Third row of the model-view matrix. Dotting a point against it (plus
/// the translation term) gives eye-space Z; the distance from the view
/// plane is its negation.
pub fn eye_row(model_view: &Mat4) -> [f32; 4] {
    [
        model_view.x_axis.z,
        model_view.y_axis.z,
        model_view.z_axis.z,
        model_view.w_axis.z,
    ]
}

pub fn eye_distance(row: &[f32; 4], p: [f32; 3]) -> f32 {
    -(row[0] * p[0] + row[1] * p[1] + row[2] * p[2] + row[3])
}

/// Min and max eye distance over the eight corners of a bounding box.
/// A degenerate (flat) box gets its max nudged so the quantizer never
/// divides by zero.
pub fn min_max_dist(model_view: &Mat4, min: [f32; 3], max: [f32; 3]) -> (f32, f32) {
    let row = eye_row(model_view);
    let mut mindist = f32::MAX;
    let mut maxdist = f32::MIN;
    for corner in 0..8 {
        let p = [
            if corner & 1 == 0 { min[0] } else { max[0] },
            if corner & 2 == 0 { min[1] } else { max[1] },
            if corner & 4 == 0 { min[2] } else { max[2] },
        ];
        let dist = eye_distance(&row, p);
        mindist = mindist.min(dist);
        maxdist = maxdist.max(dist);
    }
    if mindist == maxdist {
        maxdist += 0.0000001;
    }
    (mindist, maxdist)
}

/// Maps world positions to 16-bit sort keys for one camera pose.
///
/// Keys are `65535 - round(multiplier * (dist - mindist))` with the raw
/// quantized distance clamped to 65535 first, so the farthest primitive
/// gets the smallest key and an ascending sort is back-to-front.
pub struct DepthKeyBuilder {
    row: [f32; 4],
    mindist: f32,
    multiplier: f32,
}

impl DepthKeyBuilder {
    pub fn new(model_view: &Mat4, min: [f32; 3], max: [f32; 3]) -> Self {
        let (mindist, maxdist) = min_max_dist(model_view, min, max);
        Self {
            row: eye_row(model_view),
            mindist,
            multiplier: 65534.0 / (maxdist - mindist),
        }
    }

    pub fn key(&self, position: [f32; 3]) -> u16 {
        let mut dist = self.multiplier * (eye_distance(&self.row, position) - self.mindist);
        if dist > 65535.0 {
            dist = 65535.0;
        }
        65535 - dist.round() as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    // Camera at z=+10 looking down -Z: larger world Z is nearer.
    fn test_view() -> Mat4 {
        Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y)
    }

    #[test]
    fn farther_point_gets_smaller_key() {
        let mv = test_view();
        let builder = DepthKeyBuilder::new(&mv, [-1.0, -1.0, -5.0], [1.0, 1.0, 5.0]);
        let near = builder.key([0.0, 0.0, 5.0]);
        let far = builder.key([0.0, 0.0, -5.0]);
        assert!(far < near, "far={} near={}", far, near);
    }

    #[test]
    fn keys_span_the_quantized_range() {
        let mv = test_view();
        let builder = DepthKeyBuilder::new(&mv, [0.0; 3], [0.0, 0.0, 8.0]);
        // Box corners map to the extremes of the 16-bit range
        assert_eq!(builder.key([0.0, 0.0, 8.0]), 65535);
        assert_eq!(builder.key([0.0, 0.0, 0.0]), 1);
    }

    #[test]
    fn degenerate_box_does_not_divide_by_zero() {
        let mv = test_view();
        let builder = DepthKeyBuilder::new(&mv, [1.0, 2.0, 3.0], [1.0, 2.0, 3.0]);
        let key = builder.key([1.0, 2.0, 3.0]);
        assert!(key <= 65535);
    }

    #[test]
    fn eye_distance_is_negated_eye_z() {
        let mv = test_view();
        let row = eye_row(&mv);
        // Point at origin is 10 units in front of the camera
        let dist = eye_distance(&row, [0.0, 0.0, 0.0]);
        assert!((dist - 10.0).abs() < 1e-5);
    }

    #[test]
    fn min_max_over_corners() {
        let mv = test_view();
        let (mindist, maxdist) = min_max_dist(&mv, [-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]);
        assert!((mindist - 9.0).abs() < 1e-5);
        assert!((maxdist - 11.0).abs() < 1e-5);
    }
}
