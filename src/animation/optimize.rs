//! Lossy keyframe reduction.

use super::interpolation::interpolate;
use super::types::{AnimationCurve, TrackKind};

fn deviation(kind: TrackKind, predicted: &[f32], actual: &[f32]) -> f32 {
    let direct = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a).abs())
        .fold(0.0f32, f32::max);
    if kind != TrackKind::Rotation {
        return direct;
    }
    // q and -q encode the same rotation
    let flipped = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p + a).abs())
        .fold(0.0f32, f32::max);
    direct.min(flipped)
}

impl AnimationCurve {
    /// Drops interior keys that the neighbouring keys reproduce within
    /// `tolerance` at the dropped key's frame, until no key qualifies.
    ///
    /// The first and last keys always survive. A curve whose values are all
    /// equal is collapsed to a single key. Running the pass again with the
    /// same tolerance removes nothing. Returns the number of keys removed.
    pub fn optimize(&mut self, tolerance: f32) -> usize {
        let before = self.keyframes.len();
        if self.collapse_if_static() {
            return before - self.keyframes.len();
        }

        loop {
            let mut removed = false;
            let mut i = 1;
            while i + 1 < self.keyframes.len() {
                let predicted = interpolate(
                    self.kind,
                    self.interpolation,
                    &self.keyframes[i - 1],
                    &self.keyframes[i + 1],
                    self.keyframes[i].frame,
                );
                if deviation(self.kind, &predicted, &self.keyframes[i].value) < tolerance {
                    self.keyframes.remove(i);
                    removed = true;
                } else {
                    i += 1;
                }
            }
            if !removed {
                break;
            }
        }

        self.collapse_if_static();
        let removed = before - self.keyframes.len();
        if removed > 0 {
            log::trace!(
                "optimized {:?} curve: {} -> {} keys",
                self.kind,
                before,
                self.keyframes.len()
            );
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use crate::animation::{AnimationCurve, Interpolation, Keyframe, TrackKind};
    use test_case::test_case;

    fn scalar(interp: Interpolation, keys: &[(i32, f32)]) -> AnimationCurve {
        AnimationCurve::from_keyframes(
            TrackKind::Scalar,
            interp,
            keys.iter().map(|(f, v)| Keyframe::new(*f, [*v])),
        )
        .unwrap()
    }

    #[test]
    fn removes_collinear_keys() {
        let mut curve = scalar(
            Interpolation::Linear,
            &[(0, 0.0), (100, 1.0), (200, 2.0), (300, 3.0)],
        );
        assert_eq!(curve.optimize(0.01), 2);
        let frames: Vec<i32> = curve.keyframes().iter().map(|k| k.frame).collect();
        assert_eq!(frames, vec![0, 300]);
    }

    #[test]
    fn keeps_peaks_above_tolerance() {
        let mut curve = scalar(
            Interpolation::Linear,
            &[(0, 0.0), (100, 1.0), (200, 0.0)],
        );
        assert_eq!(curve.optimize(0.05), 0);
        assert_eq!(curve.len(), 3);
    }

    #[test]
    fn endpoints_survive() {
        let mut curve = scalar(
            Interpolation::Linear,
            &[(0, 5.0), (10, 5.01), (20, 5.0), (30, 9.0)],
        );
        curve.optimize(0.05);
        let keys = curve.keyframes();
        assert_eq!(keys.first().unwrap().frame, 0);
        assert_eq!(keys.last().unwrap().frame, 30);
    }

    #[test]
    fn single_key_is_never_lost() {
        let mut curve = scalar(Interpolation::Linear, &[(40, 2.5)]);
        assert_eq!(curve.optimize(10.0), 0);
        assert_eq!(curve.len(), 1);
        assert_eq!(curve.keyframes()[0].frame, 40);
    }

    #[test]
    fn near_constant_curve_collapses() {
        let mut curve = scalar(
            Interpolation::Linear,
            &[(0, 1.0), (10, 1.001), (20, 1.0)],
        );
        curve.optimize(0.01);
        assert_eq!(curve.len(), 1);
        assert!(curve.is_static());
    }

    #[test_case(Interpolation::Linear ; "linear")]
    #[test_case(Interpolation::DontInterp ; "dont interp")]
    #[test_case(Interpolation::Hermite ; "hermite")]
    #[test_case(Interpolation::Bezier ; "bezier")]
    fn optimizing_twice_is_idempotent(interp: Interpolation) {
        let keys: Vec<(i32, f32)> = (0..40)
            .map(|i| (i * 33, ((i as f32) * 0.35).sin() * 2.0 + (i % 3) as f32 * 0.01))
            .collect();
        let mut once = scalar(interp, &keys);
        once.optimize(0.05);
        let mut twice = once.clone();
        twice.optimize(0.05);
        assert_eq!(once, twice);
    }

    #[test]
    fn rotation_sign_flip_is_not_a_deviation() {
        let mut curve = AnimationCurve::from_keyframes(
            TrackKind::Rotation,
            Interpolation::Linear,
            [
                Keyframe::new(0, [0.0, 0.0, 0.0, 1.0]),
                Keyframe::new(50, [0.0, 0.0, 0.0, -1.0]),
                Keyframe::new(100, [0.0, 0.0, 0.0, 1.0]),
            ],
        )
        .unwrap();
        curve.optimize(0.01);
        // The flipped middle key goes, then the equal endpoints collapse
        assert_eq!(curve.len(), 1);
        assert!(curve.is_static());
    }
}
