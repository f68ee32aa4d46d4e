// Curve evaluation between keyframes

use super::types::{AnimationCurve, Interpolation, Keyframe, TrackKind};
use nalgebra_glm as glm;

/// Linear interpolation for scalars
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Cubic Hermite with the MDX tangent convention (out-tangent of the left
/// key, in-tangent of the right key).
pub fn hermite_f32(a: f32, out_tan: f32, in_tan: f32, b: f32, t: f32) -> f32 {
    let t2 = t * t;
    let f1 = t2 * (2.0 * t - 3.0) + 1.0;
    let f2 = t * (t2 - 2.0 * t + 1.0);
    let f3 = t2 * (t - 1.0);
    let f4 = t2 * (3.0 - 2.0 * t);
    a * f1 + out_tan * f2 + in_tan * f3 + b * f4
}

/// Cubic Bezier where the tangents act as inner control points.
pub fn bezier_f32(a: f32, out_tan: f32, in_tan: f32, b: f32, t: f32) -> f32 {
    let inv = 1.0 - t;
    let f1 = inv * inv * inv;
    let f2 = 3.0 * t * inv * inv;
    let f3 = 3.0 * t * t * inv;
    let f4 = t * t * t;
    a * f1 + out_tan * f2 + in_tan * f3 + b * f4
}

/// SLERP (Spherical Linear Interpolation) for quaternions stored x, y, z, w.
/// Falls back to normalized lerp for nearly parallel inputs.
pub fn quat_slerp(a: &[f32], b: &[f32], t: f32) -> Vec<f32> {
    let q1 = glm::quat(a[0], a[1], a[2], a[3]);
    let mut q2 = glm::quat(b[0], b[1], b[2], b[3]);
    let mut dot = glm::quat_dot(&q1, &q2);
    // Take the short way round
    if dot < 0.0 {
        q2 = -q2;
        dot = -dot;
    }
    let q = if dot > 0.9995 {
        glm::quat_normalize(&(q1 + (q2 - q1) * t))
    } else {
        let theta = dot.acos();
        let sin = theta.sin();
        q1 * (((1.0 - t) * theta).sin() / sin) + q2 * ((t * theta).sin() / sin)
    };
    vec![q.i, q.j, q.k, q.w]
}

/// Interpolates between two adjacent keys at `frame`.
pub fn interpolate(
    kind: TrackKind,
    interpolation: Interpolation,
    before: &Keyframe,
    after: &Keyframe,
    frame: i32,
) -> Vec<f32> {
    if after.frame == before.frame {
        return before.value.clone();
    }
    let t = (frame - before.frame) as f32 / (after.frame - before.frame) as f32;

    match interpolation {
        Interpolation::DontInterp => before.value.clone(),
        Interpolation::Linear if kind == TrackKind::Rotation => {
            quat_slerp(&before.value, &after.value, t)
        }
        Interpolation::Linear => before
            .value
            .iter()
            .zip(after.value.iter())
            .map(|(a, b)| lerp_f32(*a, *b, t))
            .collect(),
        Interpolation::Hermite | Interpolation::Bezier => {
            let cubic = if interpolation == Interpolation::Hermite {
                hermite_f32
            } else {
                bezier_f32
            };
            let values: Vec<f32> = before
                .value
                .iter()
                .enumerate()
                .map(|(i, a)| {
                    let b = after.value.get(i).copied().unwrap_or(*a);
                    let out_t = before
                        .out_tan
                        .as_ref()
                        .and_then(|t| t.get(i).copied())
                        .unwrap_or(*a);
                    let in_t = after
                        .in_tan
                        .as_ref()
                        .and_then(|t| t.get(i).copied())
                        .unwrap_or(b);
                    cubic(*a, out_t, in_t, b, t)
                })
                .collect();
            if kind == TrackKind::Rotation {
                normalize_quat(&values)
            } else {
                values
            }
        }
    }
}

fn normalize_quat(values: &[f32]) -> Vec<f32> {
    let len = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if len <= f32::EPSILON {
        return TrackKind::Rotation.identity().to_vec();
    }
    values.iter().map(|v| v / len).collect()
}

impl AnimationCurve {
    /// Value at `frame`, clamped to the first and last keys.
    pub fn sample(&self, frame: i32) -> Vec<f32> {
        let keys = self.keyframes();
        let (first, last) = match (keys.first(), keys.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return self.kind.identity().to_vec(),
        };
        if frame <= first.frame {
            return first.value.clone();
        }
        if frame >= last.frame {
            return last.value.clone();
        }
        // First key strictly after `frame`; the range checks above keep it in 1..len
        let after = keys.partition_point(|k| k.frame <= frame);
        let before = &keys[after - 1];
        if before.frame == frame {
            return before.value.clone();
        }
        interpolate(self.kind, self.interpolation, before, &keys[after], frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: &[f32], b: &[f32]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-4, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn linear_sample_midpoint() {
        let curve = AnimationCurve::from_keyframes(
            TrackKind::Translation,
            Interpolation::Linear,
            [
                Keyframe::new(0, [0.0, 0.0, 0.0]),
                Keyframe::new(100, [10.0, 20.0, -10.0]),
            ],
        )
        .unwrap();
        assert_close(&curve.sample(50), &[5.0, 10.0, -5.0]);
        assert_close(&curve.sample(-10), &[0.0, 0.0, 0.0]);
        assert_close(&curve.sample(500), &[10.0, 20.0, -10.0]);
    }

    #[test]
    fn dont_interp_holds_previous_value() {
        let curve = AnimationCurve::from_keyframes(
            TrackKind::Scalar,
            Interpolation::DontInterp,
            [Keyframe::new(0, [1.0]), Keyframe::new(100, [0.0])],
        )
        .unwrap();
        assert_close(&curve.sample(99), &[1.0]);
        assert_close(&curve.sample(100), &[0.0]);
    }

    #[test]
    fn hermite_hits_endpoints() {
        assert!((hermite_f32(2.0, 5.0, -3.0, 7.0, 0.0) - 2.0).abs() < 1e-6);
        assert!((hermite_f32(2.0, 5.0, -3.0, 7.0, 1.0) - 7.0).abs() < 1e-6);
        assert!((bezier_f32(2.0, 5.0, -3.0, 7.0, 0.0) - 2.0).abs() < 1e-6);
        assert!((bezier_f32(2.0, 5.0, -3.0, 7.0, 1.0) - 7.0).abs() < 1e-6);
    }

    #[test]
    fn bezier_with_collinear_handles_is_linear() {
        // Handles at 1/3 and 2/3 reproduce a straight line
        let v = bezier_f32(0.0, 1.0, 2.0, 3.0, 0.5);
        assert!((v - 1.5).abs() < 1e-6);
    }

    #[test]
    fn slerp_midpoint_is_unit() {
        let half = std::f32::consts::FRAC_1_SQRT_2;
        let q = quat_slerp(&[0.0, 0.0, 0.0, 1.0], &[0.0, 0.0, half, half], 0.5);
        let len: f32 = q.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((len - 1.0).abs() < 1e-4);
        assert!(q[2] > 0.0 && q[2] < half);
    }
}
