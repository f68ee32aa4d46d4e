mod animation;
mod emitter;
mod geoset;
mod objects;
mod skeleton;
mod texture;

pub use animation::*;
pub use emitter::*;
pub use geoset::*;
pub use objects::*;
pub use skeleton::*;
pub use texture::*;

// Re-export material types from the material module
pub use crate::material::{FilterMode, Layer, Material, MaterialFlags, ShadingFlags};

use crate::animation::AnimationCurve;
use crate::error::{MdlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Format versions this crate reads and writes.
pub const SUPPORTED_VERSIONS: [u32; 3] = [800, 900, 1000];

pub fn is_supported_version(version: u32) -> bool {
    SUPPORTED_VERSIONS.contains(&version)
}

/// Axis-aligned bounds plus bounding-sphere radius.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min: [f32; 3],
    pub max: [f32; 3],
    pub bounds_radius: f32,
}

impl Extent {
    pub fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        let mut extent = Self {
            min,
            max,
            bounds_radius: 0.0,
        };
        extent.bounds_radius = extent.half_diagonal();
        extent
    }

    /// Bounds of a point cloud; empty input gives the zero extent.
    pub fn from_points(points: impl IntoIterator<Item = [f32; 3]>) -> Self {
        let mut points = points.into_iter();
        let Some(first) = points.next() else {
            return Self::default();
        };
        let (mut min, mut max) = (first, first);
        for p in points {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        Self::new(min, max)
    }

    pub fn merge(&self, other: &Extent) -> Extent {
        let mut min = self.min;
        let mut max = self.max;
        for i in 0..3 {
            min[i] = min[i].min(other.min[i]);
            max[i] = max[i].max(other.max[i]);
        }
        Extent::new(min, max)
    }

    fn half_diagonal(&self) -> f32 {
        let d: f32 = (0..3).map(|i| (self.max[i] - self.min[i]).powi(2)).sum();
        d.sqrt() / 2.0
    }
}

/// Distinct global-sequence durations in first-registration order. The
/// position of a duration is its GLBS index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalSequences(Vec<u32>);

impl GlobalSequences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `duration` if absent. Returns its index either way.
    pub fn insert(&mut self, duration: u32) -> u32 {
        match self.index_of(duration) {
            Some(i) => i,
            None => {
                self.0.push(duration);
                (self.0.len() - 1) as u32
            }
        }
    }

    pub fn index_of(&self, duration: u32) -> Option<u32> {
        self.0.iter().position(|d| *d == duration).map(|i| i as u32)
    }

    pub fn get(&self, index: u32) -> Option<u32> {
        self.0.get(index as usize).copied()
    }

    pub fn contains(&self, duration: u32) -> bool {
        self.0.contains(&duration)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<u32> for GlobalSequences {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut out = GlobalSequences::new();
        for d in iter {
            out.insert(d);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub version: u32,
    pub name: String,
    pub animation_file: String,
    pub extent: Extent,
    pub blend_time: u32,
    pub sequences: Vec<Sequence>,
    pub global_sequences: GlobalSequences,
    pub textures: Vec<Texture>,
    pub materials: Vec<Material>,
    pub geosets: Vec<Geoset>,
    pub nodes: NodeRegistry,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            version: 800,
            name: String::new(),
            animation_file: String::new(),
            extent: Extent::default(),
            blend_time: 150,
            sequences: Vec::new(),
            global_sequences: GlobalSequences::new(),
            textures: Vec::new(),
            materials: Vec::new(),
            geosets: Vec::new(),
            nodes: NodeRegistry::new(),
        }
    }
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Records the curve's global sequence, if any. Call once the curve is final.
    pub fn register_global_sequence(&mut self, curve: Option<&AnimationCurve>) {
        if let Some(duration) = curve.and_then(|c| c.global_sequence) {
            self.global_sequences.insert(duration);
        }
    }

    /// Adds the texture unless an equal one exists. Returns its index.
    pub fn register_texture(&mut self, texture: &Texture) -> u32 {
        match self.texture_index(texture) {
            Some(i) => i,
            None => {
                self.textures.push(texture.clone());
                (self.textures.len() - 1) as u32
            }
        }
    }

    pub fn texture_index(&self, texture: &Texture) -> Option<u32> {
        self.textures
            .iter()
            .position(|t| t == texture)
            .map(|i| i as u32)
    }

    pub fn material_index(&self, name: &str) -> Option<u32> {
        self.materials
            .iter()
            .position(|m| m.name == name)
            .map(|i| i as u32)
    }

    /// Adds a material and registers its layer textures. Replaces any
    /// material with the same name.
    pub fn add_material(&mut self, material: Material) -> u32 {
        for layer in &material.layers {
            self.register_texture(&layer.texture);
        }
        match self.material_index(&material.name) {
            Some(i) => {
                self.materials[i as usize] = material;
                i
            }
            None => {
                self.materials.push(material);
                (self.materials.len() - 1) as u32
            }
        }
    }

    pub fn sort_sequences(&mut self) {
        self.sequences.sort_by_key(|s| s.start);
    }

    /// Every animation curve in the model.
    pub fn curves(&self) -> Vec<&AnimationCurve> {
        let mut out: Vec<&AnimationCurve> = Vec::new();
        for material in &self.materials {
            out.extend(material.curves());
        }
        for anim in self.geosets.iter().filter_map(|g| g.geoset_anim.as_ref()) {
            out.extend(anim.curves());
        }
        for node in &self.nodes {
            out.extend(node.curves());
        }
        out
    }

    pub fn triangle_count(&self) -> usize {
        self.geosets.iter().map(|g| g.triangles.len()).sum()
    }

    /// Geosets carrying a GeosetAnim, with their geoset index.
    pub fn geoset_anims(&self) -> impl Iterator<Item = (usize, &GeosetAnim)> {
        self.geosets
            .iter()
            .enumerate()
            .filter_map(|(i, g)| g.geoset_anim.as_ref().map(|a| (i, a)))
    }

    /// Recomputes geoset extents and the model extent from vertex positions.
    pub fn update_extents(&mut self) {
        let mut total: Option<Extent> = None;
        for geoset in &mut self.geosets {
            geoset.update_extent();
            total = Some(match total {
                Some(e) => e.merge(&geoset.extent),
                None => geoset.extent,
            });
        }
        self.extent = total.unwrap_or_default();
    }

    /// Checks the cross-entity invariants a serializer relies on.
    pub fn validate(&self) -> Result<()> {
        if !is_supported_version(self.version) {
            return Err(MdlError::UnsupportedVersion(self.version));
        }
        if self.sequences.windows(2).any(|w| w[0].start > w[1].start) {
            return Err(MdlError::invariant("sequences are not sorted by start"));
        }
        for (i, geoset) in self.geosets.iter().enumerate() {
            if let Some(t) = geoset.first_bad_triangle() {
                return Err(MdlError::invariant(format!(
                    "geoset {i}: triangle {t} indexes past {} vertices",
                    geoset.vertices.len()
                )));
            }
            if self.material_index(&geoset.material_name).is_none() {
                return Err(MdlError::invariant(format!(
                    "geoset {i}: unknown material '{}'",
                    geoset.material_name
                )));
            }
            for bone in geoset.matrices.iter().flatten() {
                if !self.nodes.contains(bone) {
                    return Err(MdlError::invariant(format!(
                        "geoset {i}: matrix group names unknown node '{bone}'"
                    )));
                }
            }
        }
        for material in &self.materials {
            for layer in &material.layers {
                if self.texture_index(&layer.texture).is_none() {
                    return Err(MdlError::invariant(format!(
                        "material '{}': layer texture '{}' is not registered",
                        material.name, layer.texture.path
                    )));
                }
            }
        }
        for node in &self.nodes {
            if let Some(parent) = &node.parent {
                if !self.nodes.contains(parent) {
                    return Err(MdlError::invariant(format!(
                        "node '{}' has unknown parent '{parent}'",
                        node.name
                    )));
                }
            }
        }
        let known: HashSet<u32> = self.global_sequences.iter().collect();
        for curve in self.curves() {
            if let Some(d) = curve.global_sequence {
                if !known.contains(&d) {
                    return Err(MdlError::invariant(format!(
                        "curve uses unregistered global sequence {d}"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::TrackKind;

    #[test]
    fn global_sequences_are_unique_and_ordered() {
        let mut seqs = GlobalSequences::new();
        assert_eq!(seqs.insert(1000), 0);
        assert_eq!(seqs.insert(270), 1);
        assert_eq!(seqs.insert(1000), 0);
        assert_eq!(seqs.iter().collect::<Vec<_>>(), vec![1000, 270]);
    }

    #[test]
    fn registering_curve_adds_duration() {
        let mut model = Model::default();
        let curve = AnimationCurve::constant(TrackKind::Scalar, [1.0]).with_global_sequence(500);
        model.register_global_sequence(Some(&curve));
        model.register_global_sequence(Some(&curve));
        model.register_global_sequence(None);
        assert_eq!(model.global_sequences.len(), 1);
        assert!(model.global_sequences.contains(500));
    }

    #[test]
    fn extent_from_points() {
        let e = Extent::from_points([[0.0, -1.0, 2.0], [2.0, 1.0, 0.0]]);
        assert_eq!(e.min, [0.0, -1.0, 0.0]);
        assert_eq!(e.max, [2.0, 1.0, 2.0]);
        assert!((e.bounds_radius - 1.5).abs() < 1e-6);
        assert_eq!(Extent::from_points(std::iter::empty()), Extent::default());
    }

    #[test]
    fn validate_catches_unsorted_sequences() {
        let mut model = Model::default();
        model.sequences = vec![Sequence::new("Walk", 4000, 5000), Sequence::stand()];
        assert!(model.validate().is_err());
        model.sort_sequences();
        assert!(model.validate().is_ok());
    }

    #[test]
    fn validate_catches_dangling_matrix_bone() {
        let mut model = Model::default();
        model.add_material(Material::new("Material 0"));
        let mut geoset = Geoset::new("Material 0");
        geoset.matrices = vec![vec!["Missing".to_string()]];
        model.geosets.push(geoset);
        assert!(matches!(
            model.validate(),
            Err(MdlError::InvariantViolation(_))
        ));
    }

    #[test]
    fn textures_register_once() {
        let mut model = Model::default();
        let a = model.register_texture(&Texture::new("a.blp"));
        let b = model.register_texture(&Texture::replaceable(1));
        assert_eq!(model.register_texture(&Texture::new("a.blp")), a);
        assert_eq!((a, b), (0, 1));
    }
}
