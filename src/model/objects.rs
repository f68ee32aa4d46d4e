use crate::animation::AnimationCurve;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub path: String,
    pub attachment_id: u32,
    pub visibility: Option<AnimationCurve>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LightType {
    #[default]
    Omnidirectional,
    Directional,
    Ambient,
}

impl LightType {
    pub fn from_u32(value: u32) -> Self {
        match value {
            1 => Self::Directional,
            2 => Self::Ambient,
            0 => Self::Omnidirectional,
            _ => {
                log::warn!("Unknown light type: {}, defaulting to Omnidirectional", value);
                Self::Omnidirectional
            }
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            Self::Omnidirectional => 0,
            Self::Directional => 1,
            Self::Ambient => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Omnidirectional => "Omnidirectional",
            Self::Directional => "Directional",
            Self::Ambient => "Ambient",
        }
    }
}

/// Light source. Each static field may be overridden by its curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub light_type: LightType,
    pub attenuation_start: f32,
    pub attenuation_start_anim: Option<AnimationCurve>,
    pub attenuation_end: f32,
    pub attenuation_end_anim: Option<AnimationCurve>,
    /// r, g, b
    pub color: [f32; 3],
    pub color_anim: Option<AnimationCurve>,
    pub intensity: f32,
    pub intensity_anim: Option<AnimationCurve>,
    pub ambient_color: [f32; 3],
    pub ambient_color_anim: Option<AnimationCurve>,
    pub ambient_intensity: f32,
    pub ambient_intensity_anim: Option<AnimationCurve>,
    pub visibility: Option<AnimationCurve>,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            light_type: LightType::Omnidirectional,
            attenuation_start: 80.0,
            attenuation_start_anim: None,
            attenuation_end: 200.0,
            attenuation_end_anim: None,
            color: [1.0, 1.0, 1.0],
            color_anim: None,
            intensity: 1.0,
            intensity_anim: None,
            ambient_color: [1.0, 1.0, 1.0],
            ambient_color_anim: None,
            ambient_intensity: 0.0,
            ambient_intensity_anim: None,
            visibility: None,
        }
    }
}

impl Light {
    pub fn curves(&self) -> impl Iterator<Item = &AnimationCurve> {
        [
            &self.attenuation_start_anim,
            &self.attenuation_end_anim,
            &self.color_anim,
            &self.intensity_anim,
            &self.ambient_color_anim,
            &self.ambient_intensity_anim,
            &self.visibility,
        ]
        .into_iter()
        .flatten()
    }

    pub fn curves_mut(&mut self) -> impl Iterator<Item = &mut AnimationCurve> {
        [
            self.attenuation_start_anim.as_mut(),
            self.attenuation_end_anim.as_mut(),
            self.color_anim.as_mut(),
            self.intensity_anim.as_mut(),
            self.ambient_color_anim.as_mut(),
            self.ambient_intensity_anim.as_mut(),
            self.visibility.as_mut(),
        ]
        .into_iter()
        .flatten()
    }
}

/// Event object: fires a sound/splat/footprint at the given track times.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventObject {
    pub track: Vec<u32>,
    /// Global sequence duration, if the event runs on a global timeline
    pub global_sequence: Option<u32>,
    #[serde(skip)]
    pub(crate) global_sequence_id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CollisionShape {
    Box { min: [f32; 3], max: [f32; 3] },
    Plane { min: [f32; 3], max: [f32; 3] },
    Sphere { center: [f32; 3], radius: f32 },
    Cylinder { base: [f32; 3], top: [f32; 3], radius: f32 },
}

impl Default for CollisionShape {
    fn default() -> Self {
        CollisionShape::Sphere {
            center: [0.0; 3],
            radius: 0.0,
        }
    }
}

impl CollisionShape {
    /// MDX shape type code
    pub fn type_id(&self) -> u32 {
        match self {
            Self::Box { .. } => 0,
            Self::Plane { .. } => 1,
            Self::Sphere { .. } => 2,
            Self::Cylinder { .. } => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Box { .. } => "Box",
            Self::Plane { .. } => "Plane",
            Self::Sphere { .. } => "Sphere",
            Self::Cylinder { .. } => "Cylinder",
        }
    }

    pub fn vertices(&self) -> Vec<[f32; 3]> {
        match self {
            Self::Box { min, max } | Self::Plane { min, max } => vec![*min, *max],
            Self::Sphere { center, .. } => vec![*center],
            Self::Cylinder { base, top, .. } => vec![*base, *top],
        }
    }

    pub fn radius(&self) -> Option<f32> {
        match self {
            Self::Sphere { radius, .. } | Self::Cylinder { radius, .. } => Some(*radius),
            _ => None,
        }
    }
}
