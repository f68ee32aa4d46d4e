use super::Extent;
use crate::animation::{hash_floats, AnimationCurve};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// How a vertex is attached to the skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexInfluence {
    /// Index into the geoset's matrix groups
    Matrix(u32),
    /// Four matrix-group indices with weights summing to 255
    Skin { bones: [u8; 4], weights: [u8; 4] },
}

impl Default for VertexInfluence {
    fn default() -> Self {
        VertexInfluence::Matrix(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub influence: VertexInfluence,
}

impl Vertex {
    /// Hash consistent with `PartialEq`, for bucketed deduplication.
    pub fn content_hash(&self) -> u64 {
        let mut h = DefaultHasher::new();
        hash_floats(&self.position, &mut h);
        hash_floats(&self.normal, &mut h);
        hash_floats(&self.uv, &mut h);
        self.influence.hash(&mut h);
        h.finish()
    }
}

/// Geoset vertex-color and visibility animation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeosetAnim {
    pub alpha: f32,
    pub alpha_anim: Option<AnimationCurve>,
    /// Static color as r, g, b
    pub color: Option<[f32; 3]>,
    pub color_anim: Option<AnimationCurve>,
    pub flags: u32,
}

/// GeosetAnim flag bits
pub const GEOSET_ANIM_DROP_SHADOW: u32 = 0x1;
pub const GEOSET_ANIM_COLOR: u32 = 0x2;

impl Default for GeosetAnim {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            alpha_anim: None,
            color: None,
            color_anim: None,
            flags: 0,
        }
    }
}

impl GeosetAnim {
    /// Structural hash: equal content gives equal hashes. Used only to
    /// bucket geosets for merging, never persisted.
    pub fn content_hash(&self) -> u64 {
        let mut h = DefaultHasher::new();
        hash_floats(&[self.alpha], &mut h);
        self.flags.hash(&mut h);
        match &self.color {
            Some(c) => hash_floats(c, &mut h),
            None => 0u8.hash(&mut h),
        }
        for curve in [&self.alpha_anim, &self.color_anim] {
            match curve {
                Some(c) => c.hash_content(&mut h),
                None => 0u8.hash(&mut h),
            }
        }
        h.finish()
    }

    pub fn curves_mut(&mut self) -> impl Iterator<Item = &mut AnimationCurve> {
        [self.alpha_anim.as_mut(), self.color_anim.as_mut()]
            .into_iter()
            .flatten()
    }

    pub fn curves(&self) -> impl Iterator<Item = &AnimationCurve> {
        [self.alpha_anim.as_ref(), self.color_anim.as_ref()]
            .into_iter()
            .flatten()
    }
}

/// A mesh partition sharing one material.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geoset {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<[u32; 3]>,
    /// Matrix groups: bone names whose transforms jointly move a vertex
    pub matrices: Vec<Vec<String>>,
    pub material_name: String,
    pub geoset_anim: Option<GeosetAnim>,
    pub selection_group: u32,
    pub unselectable: bool,
    pub extent: Extent,
    pub sequence_extents: Vec<Extent>,
    /// Per-vertex tangents (v900+)
    pub tangents: Vec<[f32; 4]>,
    pub lod: u32,
    pub lod_name: String,
}

impl Geoset {
    pub fn new(material_name: impl Into<String>) -> Self {
        Self {
            material_name: material_name.into(),
            ..Default::default()
        }
    }

    pub fn uses_skin_weights(&self) -> bool {
        self.vertices
            .iter()
            .any(|v| matches!(v.influence, VertexInfluence::Skin { .. }))
    }

    /// Recomputes `extent` from vertex positions.
    pub fn update_extent(&mut self) {
        self.extent = Extent::from_points(self.vertices.iter().map(|v| v.position));
    }

    /// Index of the first triangle corner that points past the vertex list.
    pub fn first_bad_triangle(&self) -> Option<usize> {
        let len = self.vertices.len() as u32;
        self.triangles
            .iter()
            .position(|t| t.iter().any(|i| *i >= len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::TrackKind;

    #[test]
    fn equal_anims_hash_equal() {
        let a = GeosetAnim {
            alpha_anim: Some(AnimationCurve::constant(TrackKind::Scalar, [0.0])),
            color: Some([1.0, 0.5, 0.0]),
            ..Default::default()
        };
        let b = a.clone();
        assert_eq!(a.content_hash(), b.content_hash());

        let c = GeosetAnim {
            color: Some([1.0, 0.5, 0.25]),
            ..a.clone()
        };
        assert_ne!(a, c);
    }

    #[test]
    fn signed_zero_hashes_like_zero() {
        let a = Vertex {
            position: [0.0, 1.0, 2.0],
            ..Default::default()
        };
        let b = Vertex {
            position: [-0.0, 1.0, 2.0],
            ..Default::default()
        };
        assert_eq!(a, b);
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn detects_out_of_range_triangle() {
        let mut geoset = Geoset::new("default");
        geoset.vertices = vec![Vertex::default(); 3];
        geoset.triangles = vec![[0, 1, 2], [0, 2, 3]];
        assert_eq!(geoset.first_bad_triangle(), Some(1));
    }
}
