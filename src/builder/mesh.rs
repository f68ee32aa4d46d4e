//! Vertex and matrix-group indexing for export geosets.

use crate::error::{MdlError, Result};
use crate::mdl::PRECISION;
use crate::model::{GeosetAnim, Geoset, Vertex, VertexInfluence};
use std::collections::HashMap;

/// Matrix-group mode keeps bones above this weight
pub const GROUP_WEIGHT_THRESHOLD: f64 = 0.25;
pub const MAX_GROUP_BONES: usize = 3;
pub const MAX_SKIN_BONES: usize = 4;

/// One triangle corner as the host supplies it, already in export space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    /// Bone name and weight, in any order
    pub weights: Vec<(String, f64)>,
}

/// A triangulated mesh ready to be split into geosets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshCandidate {
    pub name: String,
    pub material_name: String,
    pub geoset_anim: Option<GeosetAnim>,
    /// Node that carries vertices without bone weights
    pub parent: Option<String>,
    pub triangles: Vec<[RawVertex; 3]>,
}

/// Rounds to the precision MDL text keeps.
pub fn round(v: f32) -> f32 {
    let scale = 10f32.powi(PRECISION as i32);
    let r = (v * scale).round() / scale;
    if r == 0.0 { 0.0 } else { r }
}

pub(crate) fn round_all<const N: usize>(v: [f32; N]) -> [f32; N] {
    v.map(round)
}

/// Orders weights heaviest first, dropping non-positive entries.
pub(crate) fn sorted_weights(weights: &[(String, f64)]) -> Vec<(String, f64)> {
    let mut out: Vec<(String, f64)> = weights.iter().filter(|(_, w)| *w > 0.0).cloned().collect();
    out.sort_by(|a, b| b.1.total_cmp(&a.1));
    out
}

/// Bones with weight above the threshold, at most three. Falls back to the
/// heaviest bone. Expects weights sorted heaviest first.
pub fn matrix_group(sorted: &[(String, f64)]) -> Vec<String> {
    let group: Vec<String> = sorted
        .iter()
        .filter(|(_, w)| *w > GROUP_WEIGHT_THRESHOLD)
        .take(MAX_GROUP_BONES)
        .map(|(name, _)| name.clone())
        .collect();
    if group.is_empty() {
        sorted.first().map(|(name, _)| vec![name.clone()]).unwrap_or_default()
    } else {
        group
    }
}

/// Scales up to four weights (heaviest first) to bytes summing to 255.
/// Rounding leftovers go to the first entry.
pub fn skin_weights(weights: &[f64]) -> [u8; 4] {
    let top = &weights[..weights.len().min(MAX_SKIN_BONES)];
    let total: f64 = top.iter().sum();
    if total <= 0.0 {
        return [255, 0, 0, 0];
    }
    let scale = 255.0 / total;
    let mut out = [0i32; 4];
    for (o, w) in out.iter_mut().zip(top) {
        *o = (w * scale).round_ties_even() as i32;
    }
    out[0] += 255 - out.iter().sum::<i32>();
    out.map(|w| w.clamp(0, 255) as u8)
}

/// Hash buckets over one geoset's vertices and matrix groups.
#[derive(Debug, Default)]
pub(crate) struct GeosetIndex {
    vertices: HashMap<u64, Vec<u32>>,
    matrices: HashMap<Vec<String>, u32>,
}

impl GeosetIndex {
    /// Index of `group` in the geoset's matrix list, appending it if new.
    pub fn matrix(&mut self, geoset: &mut Geoset, group: Vec<String>) -> u32 {
        if let Some(i) = self.matrices.get(&group) {
            return *i;
        }
        let i = geoset.matrices.len() as u32;
        geoset.matrices.push(group.clone());
        self.matrices.insert(group, i);
        i
    }

    /// Index of an equal vertex, appending `vertex` if none exists.
    pub fn vertex(&mut self, geoset: &mut Geoset, vertex: Vertex) -> u32 {
        let bucket = self.vertices.entry(vertex.content_hash()).or_default();
        if let Some(i) = bucket
            .iter()
            .copied()
            .find(|i| geoset.vertices[*i as usize] == vertex)
        {
            return i;
        }
        let i = geoset.vertices.len() as u32;
        geoset.vertices.push(vertex);
        bucket.push(i);
        i
    }

    /// Builds the skin influence for weights sorted heaviest first. Each
    /// bone gets its own single-bone matrix group.
    pub fn skin(&mut self, geoset: &mut Geoset, sorted: &[(String, f64)], fallback: &str) -> Result<VertexInfluence> {
        if sorted.is_empty() {
            let bone = self.skin_bone(geoset, fallback)?;
            return Ok(VertexInfluence::Skin {
                bones: [bone, 0, 0, 0],
                weights: [255, 0, 0, 0],
            });
        }
        let top = &sorted[..sorted.len().min(MAX_SKIN_BONES)];
        let mut bones = [0u8; 4];
        for (slot, (name, _)) in bones.iter_mut().zip(top) {
            *slot = self.skin_bone(geoset, name)?;
        }
        let values: Vec<f64> = top.iter().map(|(_, w)| *w).collect();
        Ok(VertexInfluence::Skin {
            bones,
            weights: skin_weights(&values),
        })
    }

    fn skin_bone(&mut self, geoset: &mut Geoset, name: &str) -> Result<u8> {
        let i = self.matrix(geoset, vec![name.to_string()]);
        u8::try_from(i).map_err(|_| {
            MdlError::invariant(format!("skinned geoset references more than 256 bones ('{name}')"))
        })
    }
}
