use crate::animation::AnimationCurve;
use serde::{Deserialize, Serialize};

/// First-generation particle emitter that spawns model or texture particles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticleEmitter {
    pub emission_rate: f32,
    pub emission_rate_anim: Option<AnimationCurve>,
    pub gravity: f32,
    pub gravity_anim: Option<AnimationCurve>,
    pub longitude: f32,
    pub longitude_anim: Option<AnimationCurve>,
    pub latitude: f32,
    pub latitude_anim: Option<AnimationCurve>,
    pub path: String,
    pub life_span: f32,
    pub life_span_anim: Option<AnimationCurve>,
    pub speed: f32,
    pub speed_anim: Option<AnimationCurve>,
    pub visibility: Option<AnimationCurve>,
}

impl ParticleEmitter {
    pub fn curves(&self) -> impl Iterator<Item = &AnimationCurve> {
        [
            &self.emission_rate_anim,
            &self.gravity_anim,
            &self.longitude_anim,
            &self.latitude_anim,
            &self.life_span_anim,
            &self.speed_anim,
            &self.visibility,
        ]
        .into_iter()
        .flatten()
    }

    pub fn curves_mut(&mut self) -> impl Iterator<Item = &mut AnimationCurve> {
        [
            self.emission_rate_anim.as_mut(),
            self.gravity_anim.as_mut(),
            self.longitude_anim.as_mut(),
            self.latitude_anim.as_mut(),
            self.life_span_anim.as_mut(),
            self.speed_anim.as_mut(),
            self.visibility.as_mut(),
        ]
        .into_iter()
        .flatten()
    }
}

/// Blend mode of a ParticleEmitter2, in MDX numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParticleFilterMode {
    #[default]
    Blend,
    Additive,
    Modulate,
    Modulate2x,
    AlphaKey,
}

impl ParticleFilterMode {
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => Self::Blend,
            1 => Self::Additive,
            2 => Self::Modulate,
            3 => Self::Modulate2x,
            4 => Self::AlphaKey,
            _ => {
                log::warn!("Unknown particle filter mode: {}, defaulting to Blend", value);
                Self::Blend
            }
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            Self::Blend => 0,
            Self::Additive => 1,
            Self::Modulate => 2,
            Self::Modulate2x => 3,
            Self::AlphaKey => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Blend => "Blend",
            Self::Additive => "Additive",
            Self::Modulate => "Modulate",
            Self::Modulate2x => "Modulate2x",
            Self::AlphaKey => "AlphaKey",
        }
    }
}

/// Which quads a ParticleEmitter2 draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HeadOrTail {
    #[default]
    Head,
    Tail,
    Both,
}

impl HeadOrTail {
    pub fn from_u32(value: u32) -> Self {
        match value {
            1 => Self::Tail,
            2 => Self::Both,
            _ => Self::Head,
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            Self::Head => 0,
            Self::Tail => 1,
            Self::Both => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Head => "Head",
            Self::Tail => "Tail",
            Self::Both => "Both",
        }
    }
}

/// Second-generation (sprite sheet) particle emitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleEmitter2 {
    pub speed: f32,
    pub speed_anim: Option<AnimationCurve>,
    pub variation: f32,
    pub variation_anim: Option<AnimationCurve>,
    pub latitude: f32,
    pub latitude_anim: Option<AnimationCurve>,
    pub gravity: f32,
    pub gravity_anim: Option<AnimationCurve>,
    pub life_span: f32,
    pub emission_rate: f32,
    pub emission_rate_anim: Option<AnimationCurve>,
    pub width: f32,
    pub width_anim: Option<AnimationCurve>,
    pub length: f32,
    pub length_anim: Option<AnimationCurve>,
    pub filter_mode: ParticleFilterMode,
    pub rows: u32,
    pub columns: u32,
    pub head_or_tail: HeadOrTail,
    pub tail_length: f32,
    pub time: f32,
    /// Start, middle and end colors as r, g, b
    pub segment_color: [[f32; 3]; 3],
    pub segment_alpha: [u8; 3],
    pub segment_scaling: [f32; 3],
    pub head_intervals: [u32; 3],
    pub head_decay_intervals: [u32; 3],
    pub tail_intervals: [u32; 3],
    pub tail_decay_intervals: [u32; 3],
    /// Raw index into the model's textures
    pub texture_id: u32,
    pub squirt: bool,
    pub priority_plane: i32,
    pub replaceable_id: u32,
    pub visibility: Option<AnimationCurve>,
}

impl Default for ParticleEmitter2 {
    fn default() -> Self {
        Self {
            speed: 0.0,
            speed_anim: None,
            variation: 0.0,
            variation_anim: None,
            latitude: 0.0,
            latitude_anim: None,
            gravity: 0.0,
            gravity_anim: None,
            life_span: 1.0,
            emission_rate: 0.0,
            emission_rate_anim: None,
            width: 0.0,
            width_anim: None,
            length: 0.0,
            length_anim: None,
            filter_mode: ParticleFilterMode::Blend,
            rows: 1,
            columns: 1,
            head_or_tail: HeadOrTail::Head,
            tail_length: 0.0,
            time: 0.5,
            segment_color: [[1.0; 3]; 3],
            segment_alpha: [255; 3],
            segment_scaling: [1.0; 3],
            head_intervals: [0; 3],
            head_decay_intervals: [0; 3],
            tail_intervals: [0; 3],
            tail_decay_intervals: [0; 3],
            texture_id: 0,
            squirt: false,
            priority_plane: 0,
            replaceable_id: 0,
            visibility: None,
        }
    }
}

impl ParticleEmitter2 {
    pub fn curves(&self) -> impl Iterator<Item = &AnimationCurve> {
        [
            &self.speed_anim,
            &self.variation_anim,
            &self.latitude_anim,
            &self.gravity_anim,
            &self.emission_rate_anim,
            &self.length_anim,
            &self.width_anim,
            &self.visibility,
        ]
        .into_iter()
        .flatten()
    }

    pub fn curves_mut(&mut self) -> impl Iterator<Item = &mut AnimationCurve> {
        [
            self.speed_anim.as_mut(),
            self.variation_anim.as_mut(),
            self.latitude_anim.as_mut(),
            self.gravity_anim.as_mut(),
            self.emission_rate_anim.as_mut(),
            self.length_anim.as_mut(),
            self.width_anim.as_mut(),
            self.visibility.as_mut(),
        ]
        .into_iter()
        .flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RibbonEmitter {
    pub height_above: f32,
    pub height_above_anim: Option<AnimationCurve>,
    pub height_below: f32,
    pub height_below_anim: Option<AnimationCurve>,
    pub alpha: f32,
    pub alpha_anim: Option<AnimationCurve>,
    /// r, g, b
    pub color: [f32; 3],
    pub color_anim: Option<AnimationCurve>,
    pub life_span: f32,
    pub texture_slot: u32,
    pub texture_slot_anim: Option<AnimationCurve>,
    pub emission_rate: u32,
    pub rows: u32,
    pub columns: u32,
    /// Raw index into the model's materials
    pub material_id: u32,
    pub gravity: f32,
    pub visibility: Option<AnimationCurve>,
}

impl Default for RibbonEmitter {
    fn default() -> Self {
        Self {
            height_above: 0.0,
            height_above_anim: None,
            height_below: 0.0,
            height_below_anim: None,
            alpha: 1.0,
            alpha_anim: None,
            color: [1.0; 3],
            color_anim: None,
            life_span: 1.0,
            texture_slot: 0,
            texture_slot_anim: None,
            emission_rate: 0,
            rows: 1,
            columns: 1,
            material_id: 0,
            gravity: 0.0,
            visibility: None,
        }
    }
}

impl RibbonEmitter {
    pub fn curves(&self) -> impl Iterator<Item = &AnimationCurve> {
        [
            &self.height_above_anim,
            &self.height_below_anim,
            &self.alpha_anim,
            &self.color_anim,
            &self.texture_slot_anim,
            &self.visibility,
        ]
        .into_iter()
        .flatten()
    }

    pub fn curves_mut(&mut self) -> impl Iterator<Item = &mut AnimationCurve> {
        [
            self.height_above_anim.as_mut(),
            self.height_below_anim.as_mut(),
            self.alpha_anim.as_mut(),
            self.color_anim.as_mut(),
            self.texture_slot_anim.as_mut(),
            self.visibility.as_mut(),
        ]
        .into_iter()
        .flatten()
    }
}
