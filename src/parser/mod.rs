// MDX import: chunk decoding into raw entities, then a resolution pass
// that turns ordinal references into names and owned records.

mod geoset;
pub mod layout;
mod load;
mod node;
mod parser;
pub mod reader;
mod resolve;
pub mod tags;

pub use load::{load, Loaded};
pub use reader::ChunkReader;

use crate::material::Material;
use crate::model::{Geoset, GeosetAnim, Model, Node};

/// Chunk decoders write here. Every cross-entity reference is still the
/// raw index found in the file.
#[derive(Debug, Default)]
pub(crate) struct RawModel {
    /// Header, sequences, global sequences and textures go straight in.
    pub model: Model,
    pub materials: Vec<RawMaterial>,
    pub geosets: Vec<RawGeoset>,
    pub geoset_anims: Vec<RawGeosetAnim>,
    pub nodes: Vec<RawNode>,
    /// GLBS durations by file position
    pub global_sequences: Vec<u32>,
    pub pivots: Vec<[f32; 3]>,
    pub bind_poses: Vec<[f32; 16]>,
}

#[derive(Debug)]
pub(crate) struct RawMaterial {
    pub material: Material,
    /// TEXS index per layer
    pub texture_ids: Vec<u32>,
}

#[derive(Debug)]
pub(crate) struct RawGeoset {
    pub geoset: Geoset,
    pub material_id: u32,
    /// Matrix groups as node object indices
    pub matrix_groups: Vec<Vec<u32>>,
}

#[derive(Debug)]
pub(crate) struct RawGeosetAnim {
    pub anim: GeosetAnim,
    pub geoset_id: u32,
}

#[derive(Debug)]
pub(crate) struct RawNode {
    pub node: Node,
    pub object_id: u32,
    /// -1 for a root node
    pub parent: i32,
}

impl RawModel {
    pub fn version(&self) -> u32 {
        self.model.version
    }
}
