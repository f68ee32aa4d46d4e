//! Change-of-basis transforms for keyed curves.
//!
//! Callers compose conversions by applying them in sequence, e.g. the
//! inverse of a node's world matrix followed by the global axis/scale
//! matrix.

use super::types::{AnimationCurve, Interpolation, TrackKind};
use nalgebra_glm as glm;

/// Applies the full affine transform to a point.
pub fn transform_point(matrix: &glm::Mat4, p: [f32; 3]) -> [f32; 3] {
    let v = matrix * glm::vec4(p[0], p[1], p[2], 1.0);
    [v.x, v.y, v.z]
}

/// Applies only the linear part of `matrix`, for direction-like values.
pub fn transform_vector(matrix: &glm::Mat4, v: [f32; 3]) -> [f32; 3] {
    let v = glm::mat4_to_mat3(matrix) * glm::vec3(v[0], v[1], v[2]);
    [v.x, v.y, v.z]
}

/// Maps per-axis scale through the magnitudes of the linear part. The
/// mapping is linear, so it also carries scale tangents of either sign.
pub fn transform_scale(matrix: &glm::Mat4, s: [f32; 3]) -> [f32; 3] {
    let v = glm::abs(&glm::mat4_to_mat3(matrix)) * glm::vec3(s[0], s[1], s[2]);
    [v.x, v.y, v.z]
}

/// Rotation component of `matrix` with any scale divided out.
pub fn rotation_of(matrix: &glm::Mat4) -> glm::Quat {
    let mut m = glm::mat4_to_mat3(matrix);
    for c in 0..3 {
        let len = glm::length(&m.column(c).into_owned());
        if len > f32::EPSILON {
            let col = m.column(c) / len;
            m.set_column(c, &col);
        }
    }
    glm::quat_normalize(&glm::mat3_to_quat(&m))
}

/// Re-expresses a rotation in the basis rotated by `r`.
pub fn transform_quat(r: &glm::Quat, q: [f32; 4]) -> [f32; 4] {
    let q = glm::quat(q[0], q[1], q[2], q[3]);
    let out = r * q * glm::quat_inverse(r);
    [out.i, out.j, out.k, out.w]
}

fn apply(values: &mut [f32], f: &impl Fn(&[f32]) -> Vec<f32>) {
    let out = f(values);
    values.copy_from_slice(&out);
}

impl AnimationCurve {
    /// Rewrites every value and tangent through `matrix` according to the
    /// curve kind. Scalar, integer and color curves are left untouched.
    ///
    /// Hermite translation tangents are derivatives and only see the linear
    /// part; Bezier tangents are control points and get the full affine.
    pub fn transform(&mut self, matrix: &glm::Mat4) {
        let m = *matrix;
        let tangent: Option<Box<dyn Fn(&[f32]) -> Vec<f32>>> =
            match (self.kind, self.interpolation) {
                (TrackKind::Translation, Interpolation::Hermite) => Some(Box::new(move |v| {
                    transform_vector(&m, [v[0], v[1], v[2]]).to_vec()
                })),
                _ => None,
            };
        let f: Box<dyn Fn(&[f32]) -> Vec<f32>> = match self.kind {
            TrackKind::Translation => {
                Box::new(move |v| transform_point(&m, [v[0], v[1], v[2]]).to_vec())
            }
            TrackKind::Scaling => {
                Box::new(move |v| transform_scale(&m, [v[0], v[1], v[2]]).to_vec())
            }
            TrackKind::Rotation => {
                let r = rotation_of(matrix);
                Box::new(move |v| transform_quat(&r, [v[0], v[1], v[2], v[3]]).to_vec())
            }
            TrackKind::Color | TrackKind::Scalar | TrackKind::Integer => return,
        };

        let g = tangent.as_ref().unwrap_or(&f);
        for key in &mut self.keyframes {
            apply(&mut key.value, &f);
            if let Some(t) = key.in_tan.as_mut() {
                apply(t, g);
            }
            if let Some(t) = key.out_tan.as_mut() {
                apply(t, g);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Keyframe;
    use pretty_assertions::assert_eq;

    fn close(a: &[f32], b: &[f32]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-4)
    }

    #[test]
    fn translation_gets_full_affine() {
        let mut curve = AnimationCurve::from_keyframes(
            TrackKind::Translation,
            Interpolation::Linear,
            [Keyframe::new(0, [1.0, 0.0, 0.0])],
        )
        .unwrap();
        let m = glm::translation(&glm::vec3(0.0, 0.0, 5.0)) * glm::scaling(&glm::vec3(2.0, 2.0, 2.0));
        curve.transform(&m);
        assert!(close(&curve.keyframes()[0].value, &[2.0, 0.0, 5.0]));
    }

    #[test]
    fn scale_ignores_translation_and_sign() {
        let mut curve = AnimationCurve::from_keyframes(
            TrackKind::Scaling,
            Interpolation::Linear,
            [Keyframe::new(0, [1.0, 2.0, 3.0])],
        )
        .unwrap();
        // Swap X/Y with a mirror, plus a translation that must not leak in
        let m = glm::translation(&glm::vec3(10.0, 10.0, 10.0))
            * glm::rotation(std::f32::consts::FRAC_PI_2, &glm::vec3(0.0, 0.0, 1.0));
        curve.transform(&m);
        assert!(close(&curve.keyframes()[0].value, &[2.0, 1.0, 3.0]));
    }

    #[test]
    fn rotation_is_conjugated() {
        // 90 degrees about X, re-expressed after a 90 degree turn about Z,
        // becomes 90 degrees about Y.
        let half = std::f32::consts::FRAC_1_SQRT_2;
        let mut curve = AnimationCurve::from_keyframes(
            TrackKind::Rotation,
            Interpolation::Linear,
            [Keyframe::new(0, [half, 0.0, 0.0, half])],
        )
        .unwrap();
        let m = glm::rotation(std::f32::consts::FRAC_PI_2, &glm::vec3(0.0, 0.0, 1.0))
            * glm::scaling(&glm::vec3(3.0, 3.0, 3.0));
        curve.transform(&m);
        assert!(close(&curve.keyframes()[0].value, &[0.0, half, 0.0, half]));
    }

    #[test]
    fn tangents_follow_values() {
        let mut curve = AnimationCurve::from_keyframes(
            TrackKind::Translation,
            Interpolation::Hermite,
            [Keyframe::new(0, [1.0, 1.0, 1.0]).with_tangents([1.0, 0.0, 0.0], [0.0, 1.0, 0.0])],
        )
        .unwrap();
        curve.transform(&glm::scaling(&glm::vec3(2.0, 2.0, 2.0)));
        let key = &curve.keyframes()[0];
        assert!(close(key.in_tan.as_deref().unwrap(), &[2.0, 0.0, 0.0]));
        assert!(close(key.out_tan.as_deref().unwrap(), &[0.0, 2.0, 0.0]));
    }

    #[test]
    fn hermite_translation_keeps_its_shape() {
        let mut curve = AnimationCurve::from_keyframes(
            TrackKind::Translation,
            Interpolation::Hermite,
            [
                Keyframe::new(0, [0.0, 0.0, 0.0]).with_tangents([0.0; 3], [0.0; 3]),
                Keyframe::new(100, [0.0, 0.0, 10.0]).with_tangents([0.0; 3], [0.0; 3]),
            ],
        )
        .unwrap();
        let before = curve.sample(25);
        curve.transform(&glm::translation(&glm::vec3(0.0, 0.0, 100.0)));
        let after = curve.sample(25);
        assert!(close(&after, &[before[0], before[1], before[2] + 100.0]), "{after:?}");
        assert!(close(&after, &[0.0, 0.0, 101.5625]));
        assert_eq!(curve.keyframes()[0].out_tan.as_deref(), Some(&[0.0f32; 3][..]));
    }

    #[test]
    fn bezier_control_points_move_with_values() {
        let mut curve = AnimationCurve::from_keyframes(
            TrackKind::Translation,
            Interpolation::Bezier,
            [Keyframe::new(0, [0.0; 3]).with_tangents([0.0; 3], [1.0, 0.0, 0.0])],
        )
        .unwrap();
        curve.transform(&glm::translation(&glm::vec3(5.0, 0.0, 0.0)));
        assert!(close(curve.keyframes()[0].out_tan.as_deref().unwrap(), &[6.0, 0.0, 0.0]));
    }

    #[test]
    fn identity_leaves_scale_tangents_alone() {
        let curve = AnimationCurve::from_keyframes(
            TrackKind::Scaling,
            Interpolation::Hermite,
            [
                Keyframe::new(0, [1.0, 1.0, 1.0]).with_tangents([0.5; 3], [-1.0, -1.0, -1.0]),
                Keyframe::new(100, [2.0, 2.0, 2.0]).with_tangents([-0.5; 3], [0.0; 3]),
            ],
        )
        .unwrap();
        let mut same = curve.clone();
        same.transform(&glm::identity());
        assert_eq!(same, curve);
    }

    #[test]
    fn color_curves_are_untouched() {
        let mut curve = AnimationCurve::constant(TrackKind::Color, [0.5, 0.25, 1.0]);
        curve.transform(&glm::scaling(&glm::vec3(2.0, 2.0, 2.0)));
        assert_eq!(curve.keyframes()[0].value, vec![0.5, 0.25, 1.0]);
    }
}
