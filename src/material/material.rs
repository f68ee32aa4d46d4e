use super::{FilterMode, MaterialFlags, ShadingFlags};
use crate::animation::AnimationCurve;
use crate::model::Texture;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Unique within a model; geosets refer to materials by this name
    pub name: String,
    pub priority_plane: i32,
    pub flags: Vec<MaterialFlags>,
    /// Shader name (v900+)
    pub shader: String,
    pub layers: Vec<Layer>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn curves_mut(&mut self) -> impl Iterator<Item = &mut AnimationCurve> {
        self.layers.iter_mut().flat_map(|l| l.curves_mut())
    }

    pub fn curves(&self) -> impl Iterator<Item = &AnimationCurve> {
        self.layers.iter().flat_map(|l| l.curves())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub filter_mode: FilterMode,
    pub shading_flags: Vec<ShadingFlags>,
    pub texture: Texture,
    /// Texture-id curve; values index the model's textures
    pub texture_anim: Option<AnimationCurve>,
    pub texture_anim_id: Option<u32>,
    pub coord_id: u32,
    pub alpha: f32,
    pub alpha_anim: Option<AnimationCurve>,

    // v900+
    pub emissive_gain: f32,
    pub fresnel_color: [f32; 3],
    pub fresnel_opacity: f32,
    pub fresnel_team_color: f32,
}

impl Default for Layer {
    fn default() -> Self {
        Self {
            filter_mode: FilterMode::None,
            shading_flags: Vec::new(),
            texture: Texture::default(),
            texture_anim: None,
            texture_anim_id: None,
            coord_id: 0,
            alpha: 1.0,
            alpha_anim: None,
            emissive_gain: 1.0,
            fresnel_color: [1.0; 3],
            fresnel_opacity: 0.0,
            fresnel_team_color: 0.0,
        }
    }
}

impl Layer {
    pub fn new(texture: Texture, filter_mode: FilterMode) -> Self {
        Self {
            texture,
            filter_mode,
            ..Default::default()
        }
    }

    pub fn has_shading(&self, flag: ShadingFlags) -> bool {
        self.shading_flags.contains(&flag)
    }

    pub fn curves_mut(&mut self) -> impl Iterator<Item = &mut AnimationCurve> {
        [self.alpha_anim.as_mut(), self.texture_anim.as_mut()]
            .into_iter()
            .flatten()
    }

    pub fn curves(&self) -> impl Iterator<Item = &AnimationCurve> {
        [self.alpha_anim.as_ref(), self.texture_anim.as_ref()]
            .into_iter()
            .flatten()
    }
}
