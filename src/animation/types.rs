// Animation curve data types

use crate::error::{MdlError, Result};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Interpolation between keyframes, in MDX numbering (0..=3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interpolation {
    /// Hold the previous value until the next key
    DontInterp,
    #[default]
    Linear,
    Hermite,
    Bezier,
}

impl Interpolation {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::DontInterp),
            1 => Some(Self::Linear),
            2 => Some(Self::Hermite),
            3 => Some(Self::Bezier),
            _ => None,
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            Self::DontInterp => 0,
            Self::Linear => 1,
            Self::Hermite => 2,
            Self::Bezier => 3,
        }
    }

    /// Hermite and Bezier keys carry in/out tangents.
    pub fn has_tangents(self) -> bool {
        matches!(self, Self::Hermite | Self::Bezier)
    }

    /// MDL keyword
    pub fn name(self) -> &'static str {
        match self {
            Self::DontInterp => "DontInterp",
            Self::Linear => "Linear",
            Self::Hermite => "Hermite",
            Self::Bezier => "Bezier",
        }
    }
}

/// What a curve animates. Decides value width, how a change of basis
/// applies to it, and how MDL prints its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    Translation,
    /// Quaternion stored as x, y, z, w
    Rotation,
    Scaling,
    /// Stored as r, g, b
    Color,
    Scalar,
    /// Integer-valued scalar (texture ids, visibility-as-int tracks)
    Integer,
}

impl TrackKind {
    pub fn width(self) -> usize {
        match self {
            Self::Translation | Self::Scaling | Self::Color => 3,
            Self::Rotation => 4,
            Self::Scalar | Self::Integer => 1,
        }
    }

    /// Value a node transform takes when its curve is absent.
    pub fn identity(self) -> &'static [f32] {
        match self {
            Self::Translation => &[0.0, 0.0, 0.0],
            Self::Rotation => &[0.0, 0.0, 0.0, 1.0],
            Self::Scaling | Self::Color => &[1.0, 1.0, 1.0],
            Self::Scalar => &[1.0],
            Self::Integer => &[0.0],
        }
    }
}

/// A single key: time in milliseconds, value and optional tangents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub frame: i32,
    pub value: Vec<f32>,
    pub in_tan: Option<Vec<f32>>,
    pub out_tan: Option<Vec<f32>>,
}

impl Keyframe {
    pub fn new(frame: i32, value: impl Into<Vec<f32>>) -> Self {
        Self {
            frame,
            value: value.into(),
            in_tan: None,
            out_tan: None,
        }
    }

    pub fn with_tangents(mut self, in_tan: impl Into<Vec<f32>>, out_tan: impl Into<Vec<f32>>) -> Self {
        self.in_tan = Some(in_tan.into());
        self.out_tan = Some(out_tan.into());
        self
    }
}

/// A keyed animation track.
///
/// Keyframes are kept strictly ordered by frame; inserting a second key at
/// an existing frame is rejected. `global_sequence` is the duration (ms) of
/// the global timeline driving the curve, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationCurve {
    pub kind: TrackKind,
    pub interpolation: Interpolation,
    pub global_sequence: Option<u32>,
    /// Raw GLBS index read from MDX, cleared once the reference is resolved.
    #[serde(skip)]
    pub(crate) global_sequence_id: Option<u32>,
    pub(super) keyframes: Vec<Keyframe>,
}

impl AnimationCurve {
    pub fn new(kind: TrackKind, interpolation: Interpolation) -> Self {
        Self {
            kind,
            interpolation,
            global_sequence: None,
            global_sequence_id: None,
            keyframes: Vec::new(),
        }
    }

    /// Builds a curve from keys in any order. Duplicate frames are an error.
    pub fn from_keyframes(
        kind: TrackKind,
        interpolation: Interpolation,
        keyframes: impl IntoIterator<Item = Keyframe>,
    ) -> Result<Self> {
        let mut curve = Self::new(kind, interpolation);
        for key in keyframes {
            curve.insert(key)?;
        }
        Ok(curve)
    }

    /// Curve holding one constant value at frame 0.
    pub fn constant(kind: TrackKind, value: impl Into<Vec<f32>>) -> Self {
        let mut curve = Self::new(kind, Interpolation::DontInterp);
        curve.keyframes.push(Keyframe::new(0, value));
        curve
    }

    pub fn with_global_sequence(mut self, duration: u32) -> Self {
        self.global_sequence = Some(duration);
        self
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Inserts a key in frame order.
    pub fn insert(&mut self, key: Keyframe) -> Result<()> {
        if key.value.len() != self.kind.width() {
            return Err(MdlError::invariant(format!(
                "{:?} key at frame {} has {} components, expected {}",
                self.kind,
                key.frame,
                key.value.len(),
                self.kind.width()
            )));
        }
        match self.keyframes.binary_search_by_key(&key.frame, |k| k.frame) {
            Ok(_) => Err(MdlError::invariant(format!(
                "duplicate keyframe at frame {}",
                key.frame
            ))),
            Err(pos) => {
                self.keyframes.insert(pos, key);
                Ok(())
            }
        }
    }

    /// True when the curve carries no motion: zero or one key, or every
    /// key holding the same value.
    pub fn is_static(&self) -> bool {
        match self.keyframes.split_first() {
            None => true,
            Some((first, rest)) => rest.iter().all(|k| k.value == first.value),
        }
    }

    /// The single value of a static curve.
    pub fn static_value(&self) -> Option<&[f32]> {
        if self.is_static() {
            self.keyframes.first().map(|k| k.value.as_slice())
        } else {
            None
        }
    }

    /// Reduces a static curve to one key. Returns whether it is static.
    pub fn collapse_if_static(&mut self) -> bool {
        if !self.is_static() {
            return false;
        }
        self.keyframes.truncate(1);
        if let Some(key) = self.keyframes.first_mut() {
            key.in_tan = None;
            key.out_tan = None;
        }
        true
    }

    /// Reverses the component order of every value and tangent (RGB <-> BGR).
    pub(crate) fn reverse_components(&mut self) {
        for key in &mut self.keyframes {
            key.value.reverse();
            if let Some(t) = key.in_tan.as_mut() {
                t.reverse();
            }
            if let Some(t) = key.out_tan.as_mut() {
                t.reverse();
            }
        }
    }

    /// Structural hash over every key, used for content-keyed deduplication.
    pub fn hash_content<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.interpolation.hash(state);
        self.global_sequence.hash(state);
        for key in &self.keyframes {
            key.frame.hash(state);
            hash_floats(&key.value, state);
            if let Some(t) = &key.in_tan {
                hash_floats(t, state);
            }
            if let Some(t) = &key.out_tan {
                hash_floats(t, state);
            }
        }
    }
}

pub(crate) fn hash_floats<H: Hasher>(values: &[f32], state: &mut H) {
    values.len().hash(state);
    for v in values {
        // -0.0 and 0.0 compare equal, so they must hash equal too
        let v = if *v == 0.0 { 0.0f32 } else { *v };
        v.to_bits().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_frame_order() {
        let mut curve = AnimationCurve::new(TrackKind::Scalar, Interpolation::Linear);
        curve.insert(Keyframe::new(200, [2.0])).unwrap();
        curve.insert(Keyframe::new(0, [0.0])).unwrap();
        curve.insert(Keyframe::new(100, [1.0])).unwrap();

        let frames: Vec<i32> = curve.keyframes().iter().map(|k| k.frame).collect();
        assert_eq!(frames, vec![0, 100, 200]);
    }

    #[test]
    fn duplicate_frame_is_rejected() {
        let mut curve = AnimationCurve::new(TrackKind::Scalar, Interpolation::Linear);
        curve.insert(Keyframe::new(10, [1.0])).unwrap();
        let err = curve.insert(Keyframe::new(10, [2.0])).unwrap_err();
        assert!(matches!(err, MdlError::InvariantViolation(_)));
        assert_eq!(curve.len(), 1);
    }

    #[test]
    fn wrong_width_is_rejected() {
        let mut curve = AnimationCurve::new(TrackKind::Rotation, Interpolation::Linear);
        assert!(curve.insert(Keyframe::new(0, [0.0, 0.0, 0.0])).is_err());
    }

    #[test]
    fn constant_values_collapse() {
        let mut curve = AnimationCurve::from_keyframes(
            TrackKind::Translation,
            Interpolation::Linear,
            [
                Keyframe::new(0, [1.0, 2.0, 3.0]),
                Keyframe::new(100, [1.0, 2.0, 3.0]),
                Keyframe::new(200, [1.0, 2.0, 3.0]),
            ],
        )
        .unwrap();
        assert!(curve.collapse_if_static());
        assert_eq!(curve.len(), 1);
        assert_eq!(curve.static_value(), Some(&[1.0, 2.0, 3.0][..]));
    }

    #[test]
    fn moving_curve_is_not_static() {
        let curve = AnimationCurve::from_keyframes(
            TrackKind::Scalar,
            Interpolation::Linear,
            [Keyframe::new(0, [0.0]), Keyframe::new(100, [1.0])],
        )
        .unwrap();
        assert!(!curve.is_static());
        assert_eq!(curve.static_value(), None);
    }
}
