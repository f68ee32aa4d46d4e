use super::emitter::{ParticleEmitter, ParticleEmitter2, RibbonEmitter};
use super::objects::{Attachment, CollisionShape, EventObject, Light};
use crate::animation::AnimationCurve;
use crate::error::{MdlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Node flag bits shared by every node record (MDX `flags` field).
pub mod node_flags {
    pub const DONT_INHERIT_TRANSLATION: u32 = 0x1;
    pub const DONT_INHERIT_ROTATION: u32 = 0x2;
    pub const DONT_INHERIT_SCALING: u32 = 0x4;
    pub const BILLBOARDED: u32 = 0x8;
    pub const BILLBOARDED_LOCK_X: u32 = 0x10;
    pub const BILLBOARDED_LOCK_Y: u32 = 0x20;
    pub const BILLBOARDED_LOCK_Z: u32 = 0x40;
    pub const CAMERA_ANCHORED: u32 = 0x80;

    // Object type bits, derived from the node variant when writing
    pub const BONE: u32 = 0x100;
    pub const LIGHT: u32 = 0x200;
    pub const EVENT_OBJECT: u32 = 0x400;
    pub const ATTACHMENT: u32 = 0x800;
    pub const PARTICLE_EMITTER: u32 = 0x1000;
    pub const COLLISION_SHAPE: u32 = 0x2000;
    pub const RIBBON_EMITTER: u32 = 0x4000;
    pub const TYPE_MASK: u32 = 0x7f00;

    // Emitter-specific bits
    pub const EMITTER_USES_MDL: u32 = 0x8000;
    pub const EMITTER_USES_TGA: u32 = 0x10000;
    pub const UNSHADED: u32 = 0x8000;
    pub const SORT_PRIMS_FAR_Z: u32 = 0x10000;
    pub const LINE_EMITTER: u32 = 0x20000;
    pub const UNFOGGED: u32 = 0x40000;
    pub const MODEL_SPACE: u32 = 0x80000;
    pub const XY_QUAD: u32 = 0x100000;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    pub geoset_id: Option<u32>,
    pub geoset_anim_id: Option<u32>,
}

/// Variant payload of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Bone(Bone),
    Helper,
    Attachment(Attachment),
    Light(Light),
    ParticleEmitter(ParticleEmitter),
    ParticleEmitter2(Box<ParticleEmitter2>),
    RibbonEmitter(RibbonEmitter),
    CollisionShape(CollisionShape),
    Event(EventObject),
}

impl NodeKind {
    /// MDX object type bit for this variant
    pub fn type_flag(&self) -> u32 {
        match self {
            NodeKind::Bone(_) => node_flags::BONE,
            NodeKind::Helper => 0,
            NodeKind::Attachment(_) => node_flags::ATTACHMENT,
            NodeKind::Light(_) => node_flags::LIGHT,
            NodeKind::ParticleEmitter(_) | NodeKind::ParticleEmitter2(_) => {
                node_flags::PARTICLE_EMITTER
            }
            NodeKind::RibbonEmitter(_) => node_flags::RIBBON_EMITTER,
            NodeKind::CollisionShape(_) => node_flags::COLLISION_SHAPE,
            NodeKind::Event(_) => node_flags::EVENT_OBJECT,
        }
    }

    /// Emission rank: nodes are numbered bones first, then helpers,
    /// attachments, events, lights, collision shapes and emitters.
    pub fn rank(&self) -> u8 {
        match self {
            NodeKind::Bone(_) => 0,
            NodeKind::Helper => 1,
            NodeKind::Attachment(_) => 2,
            NodeKind::Event(_) => 3,
            NodeKind::Light(_) => 4,
            NodeKind::CollisionShape(_) => 5,
            NodeKind::ParticleEmitter(_) => 6,
            NodeKind::ParticleEmitter2(_) => 7,
            NodeKind::RibbonEmitter(_) => 8,
        }
    }
}

/// Common node capability set: identity, hierarchy, pivot and transform
/// animation, plus the variant payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub pivot: [f32; 3],
    /// Parent node by name
    pub parent: Option<String>,
    pub anim_loc: Option<AnimationCurve>,
    pub anim_rot: Option<AnimationCurve>,
    pub anim_scale: Option<AnimationCurve>,
    /// Rest transform, column-major 4x4
    pub bindpose: Option<[f32; 16]>,
    /// Inheritance/billboard bits; type bits are derived from `kind`
    pub flags: u32,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            pivot: [0.0; 3],
            parent: None,
            anim_loc: None,
            anim_rot: None,
            anim_scale: None,
            bindpose: None,
            flags: 0,
            kind,
        }
    }

    pub fn bone(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Bone(Bone::default()))
    }

    pub fn helper(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Helper)
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_pivot(mut self, pivot: [f32; 3]) -> Self {
        self.pivot = pivot;
        self
    }

    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    pub fn is_bone(&self) -> bool {
        matches!(self.kind, NodeKind::Bone(_))
    }

    /// Every curve on the node, transform tracks first.
    pub fn curves(&self) -> Vec<&AnimationCurve> {
        let mut out: Vec<&AnimationCurve> = [&self.anim_loc, &self.anim_rot, &self.anim_scale]
            .into_iter()
            .flatten()
            .collect();
        match &self.kind {
            NodeKind::Bone(_) | NodeKind::Helper | NodeKind::Event(_) => {}
            NodeKind::CollisionShape(_) => {}
            NodeKind::Attachment(a) => out.extend(a.visibility.as_ref()),
            NodeKind::Light(l) => out.extend(l.curves()),
            NodeKind::ParticleEmitter(e) => out.extend(e.curves()),
            NodeKind::ParticleEmitter2(e) => out.extend(e.curves()),
            NodeKind::RibbonEmitter(e) => out.extend(e.curves()),
        }
        out
    }

    pub fn curves_mut(&mut self) -> Vec<&mut AnimationCurve> {
        let mut out: Vec<&mut AnimationCurve> = [
            self.anim_loc.as_mut(),
            self.anim_rot.as_mut(),
            self.anim_scale.as_mut(),
        ]
        .into_iter()
        .flatten()
        .collect();
        match &mut self.kind {
            NodeKind::Bone(_) | NodeKind::Helper | NodeKind::Event(_) => {}
            NodeKind::CollisionShape(_) => {}
            NodeKind::Attachment(a) => out.extend(a.visibility.as_mut()),
            NodeKind::Light(l) => out.extend(l.curves_mut()),
            NodeKind::ParticleEmitter(e) => out.extend(e.curves_mut()),
            NodeKind::ParticleEmitter2(e) => out.extend(e.curves_mut()),
            NodeKind::RibbonEmitter(e) => out.extend(e.curves_mut()),
        }
        out
    }
}

/// Flat node registry keyed by name, preserving insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Node>", into = "Vec<Node>")]
pub struct NodeRegistry {
    nodes: Vec<Node>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node; names are unique within a model.
    pub fn insert(&mut self, node: Node) -> Result<usize> {
        if self.index.contains_key(&node.name) {
            return Err(MdlError::invariant(format!(
                "duplicate node name '{}'",
                node.name
            )));
        }
        let pos = self.nodes.len();
        self.index.insert(node.name.clone(), pos);
        self.nodes.push(node);
        Ok(pos)
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.index.get(name).map(|&i| &mut self.nodes[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    /// Names cannot be changed through this iterator's items without
    /// breaking the index, so only the registry renames nodes.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Node> {
        self.nodes.iter_mut()
    }

    /// Nodes in object-id order (see [`NodeKind::rank`]); stable within a kind.
    pub fn in_object_order(&self) -> Vec<&Node> {
        let mut out: Vec<&Node> = self.nodes.iter().collect();
        out.sort_by_key(|n| n.kind.rank());
        out
    }

    /// Object id for each node name, matching [`Self::in_object_order`].
    pub fn object_ids(&self) -> HashMap<&str, u32> {
        self.in_object_order()
            .into_iter()
            .enumerate()
            .map(|(i, n)| (n.name.as_str(), i as u32))
            .collect()
    }
}

impl<'a> IntoIterator for &'a NodeRegistry {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl TryFrom<Vec<Node>> for NodeRegistry {
    type Error = MdlError;

    fn try_from(nodes: Vec<Node>) -> Result<Self> {
        let mut registry = NodeRegistry::new();
        for node in nodes {
            registry.insert(node)?;
        }
        Ok(registry)
    }
}

impl From<NodeRegistry> for Vec<Node> {
    fn from(registry: NodeRegistry) -> Self {
        registry.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_rejects_duplicate_names() {
        let mut nodes = NodeRegistry::new();
        nodes.insert(Node::bone("Root")).unwrap();
        assert!(nodes.insert(Node::helper("Root")).is_err());
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn object_order_groups_by_kind() {
        let mut nodes = NodeRegistry::new();
        nodes.insert(Node::helper("Bone_Helper")).unwrap();
        nodes
            .insert(Node::new("Hand Ref", NodeKind::Attachment(Attachment::default())))
            .unwrap();
        nodes.insert(Node::bone("Root")).unwrap();
        nodes.insert(Node::bone("Arm").with_parent("Root")).unwrap();

        let order: Vec<&str> = nodes
            .in_object_order()
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(order, vec!["Root", "Arm", "Bone_Helper", "Hand Ref"]);
        assert_eq!(nodes.object_ids()["Hand Ref"], 3);
    }
}
