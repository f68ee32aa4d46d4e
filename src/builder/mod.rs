//! Export-side model construction from pre-classified host candidates.

mod classify;
mod mesh;

pub use classify::NodeClass;
pub use mesh::{matrix_group, round, skin_weights, MeshCandidate, RawVertex};

use crate::animation::{transform_point, AnimationCurve};
use crate::error::{MdlError, Result};
use crate::model::{
    Bone, Geoset, GeosetAnim, Material, Model, Node, NodeKind, Sequence, Vertex, VertexInfluence,
};
use crate::settings::ExportSettings;
use mesh::{round_all, sorted_weights, GeosetIndex};
use nalgebra_glm as glm;
use std::collections::HashMap;

/// Accumulates nodes, meshes, materials and sequences into a [`Model`].
///
/// Nodes must be added before the meshes that are weighted to them. Weights
/// naming unknown nodes are ignored.
#[derive(Debug)]
pub struct ModelBuilder {
    settings: ExportSettings,
    global_matrix: glm::Mat4,
    model: Model,
    /// (material, geoset anim hash) -> candidate geoset indices
    geoset_map: HashMap<(String, u64), Vec<usize>>,
    indices: Vec<GeosetIndex>,
}

impl ModelBuilder {
    pub fn new(name: impl Into<String>, settings: ExportSettings) -> Self {
        let settings = settings.sanitized();
        let mut model = Model::new(name);
        model.version = settings.mdl_version;
        Self {
            global_matrix: settings.global_matrix(),
            settings,
            model,
            geoset_map: HashMap::new(),
            indices: Vec::new(),
        }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn global_matrix(&self) -> &glm::Mat4 {
        &self.global_matrix
    }

    pub fn add_sequence(&mut self, sequence: Sequence) {
        self.model.sequences.push(sequence);
    }

    pub fn add_material(&mut self, material: Material) -> u32 {
        self.model.add_material(material)
    }

    /// Optimizes (when enabled) and registers a finished curve.
    fn finish_curve(&mut self, curve: &mut AnimationCurve) {
        if self.settings.optimize_animation {
            let removed = curve.optimize(self.settings.optimize_tolerance);
            if removed > 0 {
                log::trace!("optimized {:?} curve, {removed} keys removed", curve.kind);
            }
        }
        self.model.register_global_sequence(Some(&*curve));
    }

    /// Adds a node whose curves and pivot are in host world space. Location
    /// and rotation keys go through the inverse of `world`, then the global
    /// matrix. Transform curves that end up static at identity are dropped.
    pub fn add_node(&mut self, mut node: Node, world: &glm::Mat4) -> Result<()> {
        let local = glm::inverse(world);
        node.pivot = transform_point(&self.global_matrix, node.pivot);
        for curve in [node.anim_loc.as_mut(), node.anim_rot.as_mut()]
            .into_iter()
            .flatten()
        {
            curve.transform(&local);
            curve.transform(&self.global_matrix);
        }
        for curve in node.curves_mut() {
            self.finish_curve(curve);
        }
        for slot in [&mut node.anim_loc, &mut node.anim_rot, &mut node.anim_scale] {
            let at_identity = slot.as_ref().is_some_and(|c| {
                c.global_sequence.is_none() && c.static_value() == Some(c.kind.identity())
            });
            if at_identity {
                *slot = None;
            }
        }
        log::debug!("adding {} '{}'", kind_name(&node.kind), node.name);
        self.model.nodes.insert(node)?;
        Ok(())
    }

    /// Adds an empty marker classified by its name. Returns false when the
    /// name matches no class.
    pub fn add_marker(
        &mut self,
        name: &str,
        pivot: [f32; 3],
        parent: Option<&str>,
        world: &glm::Mat4,
    ) -> Result<bool> {
        let Some(class) = NodeClass::from_name(name) else {
            log::debug!("skipping unclassified marker '{name}'");
            return Ok(false);
        };
        let mut node = Node::new(name, class.node_kind()).with_pivot(pivot);
        node.parent = parent.map(str::to_string);
        self.add_node(node, world)?;
        Ok(true)
    }

    fn geoset_for(&mut self, material_name: &str, anim: Option<&GeosetAnim>) -> usize {
        let key = (
            material_name.to_string(),
            anim.map(|a| a.content_hash()).unwrap_or(0),
        );
        let geosets = &self.model.geosets;
        let found = self.geoset_map.get(&key).and_then(|bucket| {
            bucket
                .iter()
                .copied()
                .find(|i| geosets[*i].geoset_anim.as_ref() == anim)
        });
        if let Some(i) = found {
            return i;
        }
        let mut geoset = Geoset::new(material_name);
        geoset.geoset_anim = anim.cloned();
        let i = self.model.geosets.len();
        self.model.geosets.push(geoset);
        self.indices.push(GeosetIndex::default());
        self.geoset_map.entry(key).or_default().push(i);
        i
    }

    /// Splits a triangulated mesh into geosets keyed by material and
    /// geoset animation, deduplicating vertices and matrix groups.
    pub fn add_mesh(&mut self, mut mesh: MeshCandidate) -> Result<()> {
        if let Some(anim) = mesh.geoset_anim.as_mut() {
            for curve in anim.curves_mut() {
                self.finish_curve(curve);
            }
        }

        // Unweighted vertices follow the parent, or a bone made for the mesh
        let fallback = match &mesh.parent {
            Some(p) if self.model.nodes.contains(p) => p.clone(),
            _ => mesh.name.clone(),
        };
        let unweighted = mesh.triangles.iter().flatten().any(|v| {
            !v.weights
                .iter()
                .any(|(name, w)| *w > 0.0 && self.model.nodes.contains(name))
        });
        if unweighted && !self.model.nodes.contains(&fallback) {
            log::debug!("mesh '{fallback}' has unweighted vertices, adding a bone for it");
            self.model.nodes.insert(Node::bone(&fallback))?;
        }

        let g = self.geoset_for(&mesh.material_name, mesh.geoset_anim.as_ref());
        let use_skin = self.settings.use_skinweights;
        for triangle in &mesh.triangles {
            let mut corners = [0u32; 3];
            for (corner, raw) in corners.iter_mut().zip(triangle) {
                let known: Vec<(String, f64)> = raw
                    .weights
                    .iter()
                    .filter(|(name, _)| self.model.nodes.contains(name))
                    .cloned()
                    .collect();
                let sorted = sorted_weights(&known);
                let geoset = &mut self.model.geosets[g];
                let index = &mut self.indices[g];
                let influence = if use_skin {
                    index.skin(geoset, &sorted, &fallback)?
                } else {
                    let mut group = matrix_group(&sorted);
                    if group.is_empty() {
                        group = vec![fallback.clone()];
                    }
                    VertexInfluence::Matrix(index.matrix(geoset, group))
                };
                let vertex = Vertex {
                    position: round_all(raw.position),
                    normal: round_all(raw.normal),
                    uv: round_all([raw.uv[0], 1.0 - raw.uv[1]]),
                    influence,
                };
                *corner = index.vertex(geoset, vertex);
            }
            self.model.geosets[g].triangles.push(corners);
        }
        log::debug!(
            "mesh '{}': {} triangles into geoset {g} ({})",
            mesh.name,
            mesh.triangles.len(),
            mesh.material_name
        );
        Ok(())
    }

    /// Helpers that carry geometry must be bones.
    fn promote_weighted_helpers(&mut self) {
        let weighted: Vec<String> = self
            .model
            .geosets
            .iter()
            .flat_map(|g| g.matrices.iter().flatten())
            .cloned()
            .collect();
        for name in weighted {
            if let Some(node) = self.model.nodes.get_mut(&name) {
                if matches!(node.kind, NodeKind::Helper) {
                    log::debug!("helper '{name}' carries vertices, exporting it as a bone");
                    node.kind = NodeKind::Bone(Bone::default());
                }
            }
        }
    }

    /// Finishes the model: default sequence, ordering, extents, checks.
    pub fn build(mut self) -> Result<Model> {
        if self.model.geosets.iter().all(|g| g.triangles.is_empty()) {
            return Err(MdlError::NoGeometry);
        }
        self.model.geosets.retain(|g| !g.triangles.is_empty());
        if self.model.sequences.is_empty() {
            self.model.sequences.push(Sequence::stand());
        }
        self.model.sort_sequences();
        self.promote_weighted_helpers();
        self.model.update_extents();
        let extent = self.model.extent;
        for sequence in &mut self.model.sequences {
            sequence.extent.get_or_insert(extent);
        }
        self.model.validate()?;
        log::debug!(
            "built '{}': {} geosets, {} triangles, {} nodes, {} sequences",
            self.model.name,
            self.model.geosets.len(),
            self.model.triangle_count(),
            self.model.nodes.len(),
            self.model.sequences.len()
        );
        Ok(self.model)
    }
}

fn kind_name(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::Bone(_) => "bone",
        NodeKind::Helper => "helper",
        NodeKind::Attachment(_) => "attachment",
        NodeKind::Light(_) => "light",
        NodeKind::ParticleEmitter(_) => "particle emitter",
        NodeKind::ParticleEmitter2(_) => "particle emitter 2",
        NodeKind::RibbonEmitter(_) => "ribbon emitter",
        NodeKind::CollisionShape(_) => "collision shape",
        NodeKind::Event(_) => "event",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Interpolation, Keyframe, TrackKind};
    use crate::material::{FilterMode, Layer};
    use crate::model::Texture;
    use pretty_assertions::assert_eq;

    fn corner(position: [f32; 3], weights: &[(&str, f64)]) -> RawVertex {
        RawVertex {
            position,
            normal: [0.0, 0.0, 1.0],
            uv: [0.0, 1.0],
            weights: weights.iter().map(|(n, w)| (n.to_string(), *w)).collect(),
        }
    }

    fn builder(settings: ExportSettings) -> ModelBuilder {
        let mut b = ModelBuilder::new("Unit", settings);
        b.add_material(
            Material::new("Skin").with_layer(Layer::new(Texture::new("skin.blp"), FilterMode::None)),
        );
        b
    }

    fn quad(weights: &[(&str, f64)]) -> MeshCandidate {
        let a = corner([0.0, 0.0, 0.0], weights);
        let b = corner([1.0, 0.0, 0.0], weights);
        let c = corner([1.0, 1.0, 0.0], weights);
        let d = corner([0.0, 1.0, 0.0], weights);
        MeshCandidate {
            name: "Body".into(),
            material_name: "Skin".into(),
            triangles: vec![[a.clone(), b, c.clone()], [a, c, d]],
            ..Default::default()
        }
    }

    #[test]
    fn empty_builder_has_no_geometry() {
        let err = builder(ExportSettings::default()).build().unwrap_err();
        assert!(matches!(err, MdlError::NoGeometry));
    }

    #[test]
    fn shared_corners_are_deduplicated() {
        let mut b = builder(ExportSettings::default());
        b.add_mesh(quad(&[])).unwrap();
        let model = b.build().unwrap();
        let geoset = &model.geosets[0];
        assert_eq!(geoset.vertices.len(), 4);
        assert_eq!(geoset.triangles, vec![[0, 1, 2], [0, 2, 3]]);
        // V is flipped
        assert_eq!(geoset.vertices[0].uv, [0.0, 0.0]);
        // No parent: a bone named after the mesh carries the vertices
        assert_eq!(geoset.matrices, vec![vec!["Body".to_string()]]);
        assert!(model.nodes.get("Body").is_some_and(Node::is_bone));
    }

    #[test]
    fn default_sequence_is_stand() {
        let mut b = builder(ExportSettings::default());
        b.add_mesh(quad(&[])).unwrap();
        let model = b.build().unwrap();
        assert_eq!(model.sequences.len(), 1);
        assert_eq!(
            (model.sequences[0].name.as_str(), model.sequences[0].start, model.sequences[0].end),
            ("Stand", 0, 3333)
        );
    }

    #[test]
    fn sequences_are_sorted() {
        let mut b = builder(ExportSettings::default());
        b.add_sequence(Sequence::new("Walk", 5000, 6000));
        b.add_sequence(Sequence::new("Stand", 0, 1000));
        b.add_sequence(Sequence::new("Attack", 2000, 3000));
        b.add_mesh(quad(&[])).unwrap();
        let model = b.build().unwrap();
        let starts: Vec<u32> = model.sequences.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0, 2000, 5000]);
    }

    #[test]
    fn skin_weights_use_single_bone_groups() {
        let settings = ExportSettings {
            use_skinweights: true,
            mdl_version: 900,
            ..Default::default()
        };
        let mut b = builder(settings);
        for name in ["Root", "Arm", "Hand"] {
            b.add_node(Node::bone(name), &glm::identity()).unwrap();
        }
        b.add_mesh(quad(&[("Root", 0.2), ("Arm", 0.5), ("Hand", 0.3)])).unwrap();
        let model = b.build().unwrap();
        let geoset = &model.geosets[0];
        assert_eq!(
            geoset.matrices,
            vec![vec!["Arm".to_string()], vec!["Hand".to_string()], vec!["Root".to_string()]]
        );
        assert_eq!(
            geoset.vertices[0].influence,
            VertexInfluence::Skin {
                bones: [0, 1, 2, 0],
                weights: [128, 76, 51, 0],
            }
        );
    }

    #[test]
    fn helpers_with_vertices_become_bones() {
        let mut b = builder(ExportSettings::default());
        b.add_marker("Bone_Chest", [0.0; 3], None, &glm::identity()).unwrap();
        b.add_mesh(quad(&[("Bone_Chest", 1.0)])).unwrap();
        let model = b.build().unwrap();
        assert!(model.nodes.get("Bone_Chest").is_some_and(Node::is_bone));
    }

    #[test]
    fn geosets_merge_by_material_and_anim() {
        let mut b = builder(ExportSettings::default());
        b.add_mesh(quad(&[])).unwrap();
        let mut second = quad(&[]);
        second.name = "Body".into();
        for t in &mut second.triangles {
            for v in t.iter_mut() {
                v.position[2] = 5.0;
            }
        }
        b.add_mesh(second).unwrap();
        let mut faded = quad(&[]);
        faded.geoset_anim = Some(GeosetAnim {
            alpha: 0.5,
            ..Default::default()
        });
        b.add_mesh(faded).unwrap();
        let model = b.build().unwrap();
        assert_eq!(model.geosets.len(), 2);
        assert_eq!(model.geosets[0].triangles.len(), 4);
        assert_eq!(model.geoset_anims().count(), 1);
    }

    #[test]
    fn node_curves_are_transformed_and_registered() {
        let settings = ExportSettings {
            global_scale: 2.0,
            ..Default::default()
        };
        let mut b = builder(settings);
        let curve = AnimationCurve::from_keyframes(
            TrackKind::Translation,
            Interpolation::Linear,
            [Keyframe::new(0, [0.0, 0.0, 0.0]), Keyframe::new(500, [0.0, 0.0, 1.0])],
        )
        .unwrap()
        .with_global_sequence(500);
        let mut node = Node::bone("Root").with_pivot([1.0, 0.0, 0.0]);
        node.anim_loc = Some(curve);
        node.anim_scale = Some(AnimationCurve::constant(TrackKind::Scaling, [1.0, 1.0, 1.0]));
        b.add_node(node, &glm::identity()).unwrap();
        b.add_mesh(quad(&[("Root", 1.0)])).unwrap();
        let model = b.build().unwrap();

        let root = model.nodes.get("Root").unwrap();
        assert_eq!(root.pivot, [2.0, 0.0, 0.0]);
        assert_eq!(root.anim_loc.as_ref().unwrap().keyframes()[1].value, vec![0.0, 0.0, 2.0]);
        assert!(root.anim_scale.is_none());
        assert!(model.global_sequences.contains(500));
    }
}
