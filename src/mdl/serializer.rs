//! MDL text export. Sections follow the fixed order the format requires and
//! every counted header is checked against what was emitted.

use super::format::{bgr, Float, Value, Vector};
use super::writer::MdlWriter;
use crate::animation::{AnimationCurve, TrackKind};
use crate::error::{MdlError, Result};
use crate::parser::layout::{EMISSIVE_VERSION, FRESNEL_VERSION};
use crate::model::{
    node_flags, Bone, CollisionShape, Extent, Geoset, GeosetAnim, Layer, Light, Material, Model,
    Node, NodeKind, ParticleEmitter, ParticleEmitter2, RibbonEmitter, VertexInfluence,
    GEOSET_ANIM_DROP_SHADOW,
};
use std::collections::HashMap;

const TEXTURE_WRAP_WIDTH: u32 = 0x1;
const TEXTURE_WRAP_HEIGHT: u32 = 0x2;

fn quoted(s: &str) -> String {
    format!("\"{s}\"")
}

struct Serializer<'a> {
    model: &'a Model,
    object_ids: HashMap<&'a str, u32>,
    w: MdlWriter,
}

impl<'a> Serializer<'a> {
    fn new(model: &'a Model) -> Self {
        Self {
            model,
            object_ids: model.nodes.object_ids(),
            w: MdlWriter::new(),
        }
    }

    fn object_id(&self, name: &str) -> Result<u32> {
        self.object_ids
            .get(name)
            .copied()
            .ok_or_else(|| MdlError::invariant(format!("unknown node '{name}'")))
    }

    fn global_seq_id(&self, duration: u32) -> Result<u32> {
        self.model
            .global_sequences
            .index_of(duration)
            .ok_or_else(|| MdlError::invariant(format!("global sequence {duration} is not registered")))
    }

    fn extent(&mut self, e: &Extent) -> Result<()> {
        self.w.field("MinimumExtent", Vector(&e.min))?;
        self.w.field("MaximumExtent", Vector(&e.max))?;
        if e.bounds_radius > 0.0 {
            self.w.field("BoundsRadius", Float(e.bounds_radius))?;
        }
        Ok(())
    }

    /// Writes a keyed block: `Name count { interpolation, keys }`.
    fn curve(&mut self, name: &str, curve: &AnimationCurve) -> Result<()> {
        let mut curve = curve.clone();
        if curve.kind == TrackKind::Color {
            curve.reverse_components();
        }
        self.w.open_counted(name, curve.len())?;
        self.w.flag(curve.interpolation.name())?;
        if let Some(duration) = curve.global_sequence {
            let id = self.global_seq_id(duration)?;
            self.w.field("GlobalSeqId", id)?;
        }
        for key in curve.keyframes() {
            self.w
                .item(format_args!("{}: {},", key.frame, Value(&key.value)))?;
            if curve.interpolation.has_tangents() {
                let in_tan = key.in_tan.as_deref().unwrap_or(&key.value);
                let out_tan = key.out_tan.as_deref().unwrap_or(&key.value);
                self.w.line(format_args!("\tInTan {},", Value(in_tan)))?;
                self.w.line(format_args!("\tOutTan {},", Value(out_tan)))?;
            }
        }
        self.w.close()
    }

    fn optional_curve(&mut self, name: &str, curve: Option<&AnimationCurve>) -> Result<()> {
        match curve {
            Some(c) => self.curve(name, c),
            None => Ok(()),
        }
    }

    /// `static Name value,` unless the curve carries motion or a global
    /// sequence, in which case the keyed block is written instead. Static
    /// colors are passed already in file order.
    fn attribute(&mut self, name: &str, value: &[f32], curve: Option<&AnimationCurve>) -> Result<()> {
        match curve {
            Some(c) if c.global_sequence.is_none() && c.static_value().is_some() => {
                let mut v = c.static_value().unwrap_or(value).to_vec();
                if c.kind == TrackKind::Color {
                    v.reverse();
                }
                self.w.line(format_args!("static {name} {},", Value(&v)))
            }
            Some(c) => self.curve(name, c),
            None => self.w.line(format_args!("static {name} {},", Value(value))),
        }
    }

    fn version(&mut self) -> Result<()> {
        self.w.open("Version")?;
        self.w.field("FormatVersion", self.model.version)?;
        self.w.close()
    }

    fn header(&mut self) -> Result<()> {
        let m = self.model;
        let mut counts = [0usize; 9];
        for node in &m.nodes {
            counts[node.kind.rank() as usize] += 1;
        }
        let geoset_anims = m.geoset_anims().count();

        self.w.open(format_args!("Model {}", quoted(&m.name)))?;
        if !m.geosets.is_empty() {
            self.w.field("NumGeosets", m.geosets.len())?;
        }
        if geoset_anims > 0 {
            self.w.field("NumGeosetAnims", geoset_anims)?;
        }
        const COUNTS: [(usize, &str); 9] = [
            (1, "NumHelpers"),
            (0, "NumBones"),
            (4, "NumLights"),
            (2, "NumAttachments"),
            (3, "NumEvents"),
            (6, "NumParticleEmitters"),
            (7, "NumParticleEmitters2"),
            (8, "NumRibbonEmitters"),
            (5, "NumCollisionShapes"),
        ];
        for (rank, keyword) in COUNTS {
            if counts[rank] > 0 {
                self.w.field(keyword, counts[rank])?;
            }
        }
        self.w.field("BlendTime", m.blend_time)?;
        self.extent(&m.extent)?;
        if !m.animation_file.is_empty() {
            self.w.field("AnimationFile", quoted(&m.animation_file))?;
        }
        self.w.close()
    }

    fn sequences(&mut self) -> Result<()> {
        let m = self.model;
        self.w.open_counted("Sequences", m.sequences.len())?;
        for s in &m.sequences {
            self.w.open(format_args!("Anim {}", quoted(&s.name)))?;
            self.w
                .field("Interval", format_args!("{{{}, {}}}", s.start, s.end))?;
            if s.non_looping {
                self.w.flag("NonLooping")?;
            }
            if s.rarity > 0 {
                self.w.field("Rarity", s.rarity)?;
            }
            if s.is_walk() {
                self.w.field("MoveSpeed", s.movement_speed.round() as i64)?;
            }
            self.extent(&s.extent.unwrap_or(m.extent))?;
            self.w.close()?;
        }
        self.w.close()
    }

    fn global_sequences(&mut self) -> Result<()> {
        let m = self.model;
        if m.global_sequences.is_empty() {
            return Ok(());
        }
        self.w.open_counted("GlobalSequences", m.global_sequences.len())?;
        for duration in m.global_sequences.iter() {
            self.w.item(format_args!("Duration {duration},"))?;
        }
        self.w.close()
    }

    fn textures(&mut self) -> Result<()> {
        let m = self.model;
        if m.textures.is_empty() {
            return Ok(());
        }
        self.w.open_counted("Textures", m.textures.len())?;
        for t in &m.textures {
            self.w.open("Bitmap")?;
            self.w.field("Image", quoted(&t.path))?;
            if t.replaceable_id != 0 {
                self.w.field("ReplaceableId", t.replaceable_id)?;
            }
            if t.flags & TEXTURE_WRAP_WIDTH != 0 {
                self.w.flag("WrapWidth")?;
            }
            if t.flags & TEXTURE_WRAP_HEIGHT != 0 {
                self.w.flag("WrapHeight")?;
            }
            self.w.close()?;
        }
        self.w.close()
    }

    fn layer(&mut self, layer: &Layer) -> Result<()> {
        let texture_id = self.model.texture_index(&layer.texture).ok_or_else(|| {
            MdlError::invariant(format!("layer texture '{}' is not registered", layer.texture.path))
        })?;
        self.w.open("Layer")?;
        self.w.field("FilterMode", layer.filter_mode.name())?;
        for flag in &layer.shading_flags {
            self.w.flag(flag.name())?;
        }
        self.attribute("TextureID", &[texture_id as f32], layer.texture_anim.as_ref())?;
        if let Some(anim_id) = layer.texture_anim_id {
            self.w.field("TVertexAnimId", anim_id)?;
        }
        if layer.coord_id != 0 {
            self.w.field("CoordId", layer.coord_id)?;
        }
        self.attribute("Alpha", &[layer.alpha], layer.alpha_anim.as_ref())?;
        if self.model.version >= EMISSIVE_VERSION {
            self.w
                .line(format_args!("static EmissiveGain {},", Float(layer.emissive_gain)))?;
        }
        if self.model.version >= FRESNEL_VERSION {
            self.w.line(format_args!(
                "static FresnelColor {},",
                Vector(&bgr(&layer.fresnel_color))
            ))?;
            self.w
                .line(format_args!("static FresnelOpacity {},", Float(layer.fresnel_opacity)))?;
            self.w.line(format_args!(
                "static FresnelTeamColor {},",
                Float(layer.fresnel_team_color)
            ))?;
        }
        self.w.close()
    }

    fn material(&mut self, material: &Material) -> Result<()> {
        self.w.open("Material")?;
        for flag in &material.flags {
            self.w.flag(flag.name())?;
        }
        if material.priority_plane != 0 {
            self.w.field("PriorityPlane", material.priority_plane)?;
        }
        if self.model.version >= EMISSIVE_VERSION && !material.shader.is_empty() {
            self.w.field("Shader", quoted(&material.shader))?;
        }
        for layer in &material.layers {
            self.layer(layer)?;
        }
        self.w.close()
    }

    fn materials(&mut self) -> Result<()> {
        let m = self.model;
        if m.materials.is_empty() {
            return Ok(());
        }
        self.w.open_counted("Materials", m.materials.len())?;
        for material in &m.materials {
            self.material(material)?;
        }
        self.w.close()
    }

    fn geoset(&mut self, geoset: &Geoset) -> Result<()> {
        let version = self.model.version;
        let material_id = self.model.material_index(&geoset.material_name).ok_or_else(|| {
            MdlError::invariant(format!("unknown material '{}'", geoset.material_name))
        })?;
        let skinned = geoset.uses_skin_weights() && version >= 900;

        self.w.open("Geoset")?;
        self.w.open_counted("Vertices", geoset.vertices.len())?;
        for v in &geoset.vertices {
            self.w.item(format_args!("{},", Vector(&v.position)))?;
        }
        self.w.close()?;
        self.w.open_counted("Normals", geoset.vertices.len())?;
        for v in &geoset.vertices {
            self.w.item(format_args!("{},", Vector(&v.normal)))?;
        }
        self.w.close()?;
        self.w.open_counted("TVertices", geoset.vertices.len())?;
        for v in &geoset.vertices {
            self.w.item(format_args!("{},", Vector(&v.uv)))?;
        }
        self.w.close()?;

        if !skinned {
            self.w.open("VertexGroup")?;
            for v in &geoset.vertices {
                let group = match v.influence {
                    VertexInfluence::Matrix(g) => g,
                    VertexInfluence::Skin { bones, .. } => bones[0] as u32,
                };
                self.w.line(format_args!("{group},"))?;
            }
            self.w.close()?;
        }
        if version >= 900 && !geoset.tangents.is_empty() {
            self.w.open_counted("Tangents", geoset.tangents.len())?;
            for t in &geoset.tangents {
                self.w.item(format_args!("{},", Vector(t)))?;
            }
            self.w.close()?;
        }
        if skinned {
            self.w.open_counted("SkinWeights", geoset.vertices.len())?;
            for v in &geoset.vertices {
                let (bones, weights) = match v.influence {
                    VertexInfluence::Skin { bones, weights } => (bones, weights),
                    VertexInfluence::Matrix(g) => ([g as u8, 0, 0, 0], [255, 0, 0, 0]),
                };
                let [b0, b1, b2, b3] = bones;
                let [w0, w1, w2, w3] = weights;
                self.w
                    .item(format_args!("{b0}, {b1}, {b2}, {b3}, {w0}, {w1}, {w2}, {w3},"))?;
            }
            self.w.close()?;
        }

        let index_count = geoset.triangles.len() * 3;
        self.w.open(format_args!("Faces 1 {index_count}"))?;
        self.w.open("Triangles")?;
        let indices: Vec<String> = geoset
            .triangles
            .iter()
            .flatten()
            .map(|i| i.to_string())
            .collect();
        self.w.line(format_args!("{{ {} }},", indices.join(", ")))?;
        self.w.close()?;
        self.w.close()?;

        let total: usize = geoset.matrices.iter().map(Vec::len).sum();
        self.w.open_declared(
            format_args!("Groups {} {total}", geoset.matrices.len()),
            geoset.matrices.len(),
        )?;
        for group in &geoset.matrices {
            let ids = group
                .iter()
                .map(|name| self.object_id(name).map(|id| id.to_string()))
                .collect::<Result<Vec<_>>>()?;
            self.w.item(format_args!("Matrices {{ {} }},", ids.join(", ")))?;
        }
        self.w.close()?;

        self.extent(&geoset.extent)?;
        for e in &geoset.sequence_extents {
            self.w.open("Anim")?;
            self.extent(e)?;
            self.w.close()?;
        }
        self.w.field("MaterialID", material_id)?;
        self.w.field("SelectionGroup", geoset.selection_group)?;
        if geoset.unselectable {
            self.w.flag("Unselectable")?;
        }
        if version >= 900 {
            self.w.field("LevelOfDetail", geoset.lod)?;
            if !geoset.lod_name.is_empty() {
                self.w.field("Name", quoted(&geoset.lod_name))?;
            }
        }
        self.w.close()
    }

    fn geoset_anim(&mut self, geoset_id: usize, anim: &GeosetAnim) -> Result<()> {
        self.w.open("GeosetAnim")?;
        if anim.flags & GEOSET_ANIM_DROP_SHADOW != 0 {
            self.w.flag("DropShadow")?;
        }
        self.attribute("Alpha", &[anim.alpha], anim.alpha_anim.as_ref())?;
        if anim.color.is_some() || anim.color_anim.is_some() {
            let color = anim.color.unwrap_or([1.0; 3]);
            self.attribute("Color", &bgr(&color), anim.color_anim.as_ref())?;
        }
        self.w.field("GeosetId", geoset_id)?;
        self.w.close()
    }

    fn node_flags(&mut self, node: &Node) -> Result<()> {
        let inherit: Vec<&str> = [
            (node_flags::DONT_INHERIT_TRANSLATION, "Translation"),
            (node_flags::DONT_INHERIT_ROTATION, "Rotation"),
            (node_flags::DONT_INHERIT_SCALING, "Scaling"),
        ]
        .into_iter()
        .filter(|(bit, _)| node.has_flag(*bit))
        .map(|(_, name)| name)
        .collect();
        if !inherit.is_empty() {
            self.w
                .line(format_args!("DontInherit {{ {} }},", inherit.join(", ")))?;
        }
        for (bit, name) in [
            (node_flags::BILLBOARDED, "Billboarded"),
            (node_flags::BILLBOARDED_LOCK_X, "BillboardedLockX"),
            (node_flags::BILLBOARDED_LOCK_Y, "BillboardedLockY"),
            (node_flags::BILLBOARDED_LOCK_Z, "BillboardedLockZ"),
            (node_flags::CAMERA_ANCHORED, "CameraAnchored"),
        ] {
            if node.has_flag(bit) {
                self.w.flag(name)?;
            }
        }
        Ok(())
    }

    /// Opens the node block and writes the shared header lines.
    fn open_node(&mut self, keyword: &str, node: &Node) -> Result<()> {
        self.w
            .open(format_args!("{keyword} {}", quoted(&node.name)))?;
        let id = self.object_id(&node.name)?;
        self.w.field("ObjectId", id)?;
        if let Some(parent) = &node.parent {
            let parent_id = self.object_id(parent)?;
            self.w
                .line(format_args!("Parent {parent_id}, // {}", quoted(parent)))?;
        }
        self.node_flags(node)
    }

    fn transforms(&mut self, node: &Node) -> Result<()> {
        self.optional_curve("Translation", node.anim_loc.as_ref())?;
        self.optional_curve("Rotation", node.anim_rot.as_ref())?;
        self.optional_curve("Scaling", node.anim_scale.as_ref())
    }

    fn bone(&mut self, node: &Node, bone: &Bone) -> Result<()> {
        self.open_node("Bone", node)?;
        match bone.geoset_id {
            Some(id) => self.w.field("GeosetId", id)?,
            None => self.w.field("GeosetId", "Multiple")?,
        }
        match bone.geoset_anim_id {
            Some(id) => self.w.field("GeosetAnimId", id)?,
            None => self.w.field("GeosetAnimId", "None")?,
        }
        self.transforms(node)?;
        self.w.close()
    }

    fn helper(&mut self, node: &Node) -> Result<()> {
        self.open_node("Helper", node)?;
        self.transforms(node)?;
        self.w.close()
    }

    fn pivots(&mut self, order: &[&Node]) -> Result<()> {
        if order.is_empty() {
            return Ok(());
        }
        self.w.open_counted("PivotPoints", order.len())?;
        for node in order {
            self.w.item(format_args!("{},", Vector(&node.pivot)))?;
        }
        self.w.close()
    }

    fn bind_poses(&mut self, order: &[&Node]) -> Result<()> {
        if self.model.version < 900 || !order.iter().any(|n| n.bindpose.is_some()) {
            return Ok(());
        }
        self.w.open("BindPose")?;
        self.w.open_counted("Matrices", order.len())?;
        for node in order {
            let pose = node.bindpose.unwrap_or([
                1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
            ]);
            let affine: Vec<f32> = (0..4).flat_map(|c| pose[c * 4..c * 4 + 3].to_vec()).collect();
            self.w.item(format_args!("{},", Vector(&affine)))?;
        }
        self.w.close()?;
        self.w.close()
    }

    fn object(&mut self, node: &Node) -> Result<()> {
        match &node.kind {
            NodeKind::Bone(bone) => self.bone(node, bone),
            NodeKind::Helper => self.helper(node),
            NodeKind::Attachment(a) => {
                self.open_node("Attachment", node)?;
                self.w.field("AttachmentID", a.attachment_id)?;
                if !a.path.is_empty() {
                    self.w.field("Path", quoted(&a.path))?;
                }
                self.transforms(node)?;
                self.optional_curve("Visibility", a.visibility.as_ref())?;
                self.w.close()
            }
            NodeKind::Event(event) => {
                self.open_node("EventObject", node)?;
                if !event.track.is_empty() {
                    self.w.open_counted("EventTrack", event.track.len())?;
                    if let Some(duration) = event.global_sequence {
                        let id = self.global_seq_id(duration)?;
                        self.w.field("GlobalSeqId", id)?;
                    }
                    for frame in &event.track {
                        self.w.item(format_args!("{frame},"))?;
                    }
                    self.w.close()?;
                }
                self.transforms(node)?;
                self.w.close()
            }
            NodeKind::Light(light) => self.light(node, light),
            NodeKind::CollisionShape(shape) => self.collision_shape(node, shape),
            NodeKind::ParticleEmitter(e) => self.particle_emitter(node, e),
            NodeKind::ParticleEmitter2(e) => self.particle_emitter2(node, e),
            NodeKind::RibbonEmitter(r) => self.ribbon_emitter(node, r),
        }
    }

    fn light(&mut self, node: &Node, l: &Light) -> Result<()> {
        self.open_node("Light", node)?;
        self.w.flag(l.light_type.name())?;
        self.attribute("AttenuationStart", &[l.attenuation_start], l.attenuation_start_anim.as_ref())?;
        self.attribute("AttenuationEnd", &[l.attenuation_end], l.attenuation_end_anim.as_ref())?;
        self.attribute("Intensity", &[l.intensity], l.intensity_anim.as_ref())?;
        self.attribute("Color", &bgr(&l.color), l.color_anim.as_ref())?;
        self.attribute("AmbIntensity", &[l.ambient_intensity], l.ambient_intensity_anim.as_ref())?;
        self.attribute("AmbColor", &bgr(&l.ambient_color), l.ambient_color_anim.as_ref())?;
        self.optional_curve("Visibility", l.visibility.as_ref())?;
        self.transforms(node)?;
        self.w.close()
    }

    fn collision_shape(&mut self, node: &Node, shape: &CollisionShape) -> Result<()> {
        self.open_node("CollisionShape", node)?;
        self.w.flag(shape.name())?;
        let vertices = shape.vertices();
        self.w.open_counted("Vertices", vertices.len())?;
        for v in &vertices {
            self.w.item(format_args!("{},", Vector(v)))?;
        }
        self.w.close()?;
        if let Some(radius) = shape.radius() {
            self.w.field("BoundsRadius", Float(radius))?;
        }
        self.transforms(node)?;
        self.w.close()
    }

    fn particle_emitter(&mut self, node: &Node, e: &ParticleEmitter) -> Result<()> {
        self.open_node("ParticleEmitter", node)?;
        if node.has_flag(node_flags::EMITTER_USES_MDL) {
            self.w.flag("EmitterUsesMDL")?;
        }
        if node.has_flag(node_flags::EMITTER_USES_TGA) {
            self.w.flag("EmitterUsesTGA")?;
        }
        self.attribute("EmissionRate", &[e.emission_rate], e.emission_rate_anim.as_ref())?;
        self.attribute("Gravity", &[e.gravity], e.gravity_anim.as_ref())?;
        self.attribute("Longitude", &[e.longitude], e.longitude_anim.as_ref())?;
        self.attribute("Latitude", &[e.latitude], e.latitude_anim.as_ref())?;
        self.optional_curve("Visibility", e.visibility.as_ref())?;
        self.w.open("Particle")?;
        self.attribute("LifeSpan", &[e.life_span], e.life_span_anim.as_ref())?;
        self.attribute("InitVelocity", &[e.speed], e.speed_anim.as_ref())?;
        self.w.field("Path", quoted(&e.path))?;
        self.w.close()?;
        self.transforms(node)?;
        self.w.close()
    }

    fn particle_emitter2(&mut self, node: &Node, e: &ParticleEmitter2) -> Result<()> {
        self.open_node("ParticleEmitter2", node)?;
        for (bit, name) in [
            (node_flags::UNSHADED, "Unshaded"),
            (node_flags::SORT_PRIMS_FAR_Z, "SortPrimsFarZ"),
            (node_flags::LINE_EMITTER, "LineEmitter"),
            (node_flags::UNFOGGED, "Unfogged"),
            (node_flags::MODEL_SPACE, "ModelSpace"),
            (node_flags::XY_QUAD, "XYQuad"),
        ] {
            if node.has_flag(bit) {
                self.w.flag(name)?;
            }
        }
        self.attribute("Speed", &[e.speed], e.speed_anim.as_ref())?;
        self.attribute("Variation", &[e.variation], e.variation_anim.as_ref())?;
        self.attribute("Latitude", &[e.latitude], e.latitude_anim.as_ref())?;
        self.attribute("Gravity", &[e.gravity], e.gravity_anim.as_ref())?;
        self.optional_curve("Visibility", e.visibility.as_ref())?;
        if e.squirt {
            self.w.flag("Squirt")?;
        }
        self.w.field("LifeSpan", Float(e.life_span))?;
        self.attribute("EmissionRate", &[e.emission_rate], e.emission_rate_anim.as_ref())?;
        self.attribute("Width", &[e.width], e.width_anim.as_ref())?;
        self.attribute("Length", &[e.length], e.length_anim.as_ref())?;
        self.w.flag(e.filter_mode.name())?;
        self.w.field("Rows", e.rows)?;
        self.w.field("Columns", e.columns)?;
        self.w.flag(e.head_or_tail.name())?;
        self.w.field("TailLength", Float(e.tail_length))?;
        self.w.field("Time", Float(e.time))?;

        self.w.open("SegmentColor")?;
        for color in &e.segment_color {
            self.w.field("Color", Vector(&bgr(color)))?;
        }
        self.w.close_with(",")?;
        let [a0, a1, a2] = e.segment_alpha;
        self.w.field("Alpha", format_args!("{{{a0}, {a1}, {a2}}}"))?;
        self.w.field("ParticleScaling", Vector(&e.segment_scaling))?;
        for (name, interval) in [
            ("LifeSpanUVAnim", e.head_intervals),
            ("DecayUVAnim", e.head_decay_intervals),
            ("TailUVAnim", e.tail_intervals),
            ("TailDecayUVAnim", e.tail_decay_intervals),
        ] {
            let [i0, i1, i2] = interval;
            self.w.field(name, format_args!("{{{i0}, {i1}, {i2}}}"))?;
        }
        self.w.field("TextureID", e.texture_id)?;
        if e.replaceable_id != 0 {
            self.w.field("ReplaceableId", e.replaceable_id)?;
        }
        if e.priority_plane != 0 {
            self.w.field("PriorityPlane", e.priority_plane)?;
        }
        self.transforms(node)?;
        self.w.close()
    }

    fn ribbon_emitter(&mut self, node: &Node, r: &RibbonEmitter) -> Result<()> {
        self.open_node("RibbonEmitter", node)?;
        self.attribute("HeightAbove", &[r.height_above], r.height_above_anim.as_ref())?;
        self.attribute("HeightBelow", &[r.height_below], r.height_below_anim.as_ref())?;
        self.attribute("Alpha", &[r.alpha], r.alpha_anim.as_ref())?;
        self.attribute("Color", &bgr(&r.color), r.color_anim.as_ref())?;
        self.attribute("TextureSlot", &[r.texture_slot as f32], r.texture_slot_anim.as_ref())?;
        self.optional_curve("Visibility", r.visibility.as_ref())?;
        self.w.field("EmissionRate", r.emission_rate)?;
        self.w.field("LifeSpan", Float(r.life_span))?;
        if r.gravity != 0.0 {
            self.w.field("Gravity", Float(r.gravity))?;
        }
        self.w.field("Rows", r.rows)?;
        self.w.field("Columns", r.columns)?;
        self.w.field("MaterialID", r.material_id)?;
        self.transforms(node)?;
        self.w.close()
    }

    fn write(mut self) -> Result<String> {
        let m = self.model;
        self.version()?;
        self.header()?;
        self.sequences()?;
        self.global_sequences()?;
        self.textures()?;
        self.materials()?;
        for geoset in &m.geosets {
            self.geoset(geoset)?;
        }
        for (id, anim) in m.geoset_anims() {
            self.geoset_anim(id, anim)?;
        }

        // Bones and helpers precede the pivots, every other object follows
        let order = m.nodes.in_object_order();
        let (skeleton, objects): (Vec<&Node>, Vec<&Node>) = order
            .iter()
            .copied()
            .partition(|n| matches!(n.kind, NodeKind::Bone(_) | NodeKind::Helper));
        for node in &skeleton {
            self.object(node)?;
        }
        self.pivots(&order)?;
        self.bind_poses(&order)?;
        for node in &objects {
            self.object(node)?;
        }
        self.w.finish()
    }
}

/// Serializes a validated model as MDL text.
pub fn save(model: &Model) -> Result<String> {
    model.validate()?;
    let text = Serializer::new(model).write()?;
    log::debug!("wrote '{}' as {} bytes of MDL", model.name, text.len());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Interpolation, Keyframe};
    use crate::model::{Sequence, Texture};
    use pretty_assertions::assert_eq;

    fn model_with_bone() -> Model {
        let mut model = Model::new("Test");
        model.sequences.push(Sequence::stand());
        model.nodes.insert(Node::bone("Bone_Root")).unwrap();
        model
    }

    #[test]
    fn global_sequences_block() {
        let mut model = model_with_bone();
        model.global_sequences.insert(270);
        model.global_sequences.insert(1000);
        let text = save(&model).unwrap();
        assert!(text.contains("GlobalSequences 2 {\n\tDuration 270,\n\tDuration 1000,\n}\n"));
    }

    #[test]
    fn sections_follow_format_order() {
        let mut model = model_with_bone();
        model.nodes.insert(Node::new("Hand Ref", NodeKind::Attachment(Default::default())).with_parent("Bone_Root")).unwrap();
        let text = save(&model).unwrap();
        let at = |needle: &str| text.find(needle).unwrap();
        assert!(at("Version {") < at("Model \"Test\""));
        assert!(at("Model \"Test\"") < at("Sequences 1 {"));
        assert!(at("Bone \"Bone_Root\"") < at("PivotPoints 2 {"));
        assert!(at("PivotPoints 2 {") < at("Attachment \"Hand Ref\""));
        assert!(text.contains("\tParent 0, // \"Bone_Root\"\n"));
        assert!(text.contains("\tObjectId 1,\n"));
    }

    #[test]
    fn walk_sequences_carry_move_speed() {
        let mut model = model_with_bone();
        let mut walk = Sequence::new("Walk", 4000, 5000);
        walk.movement_speed = 270.0;
        walk.rarity = 2;
        model.sequences.push(walk);
        let text = save(&model).unwrap();
        assert!(text.contains("\tAnim \"Walk\" {\n\t\tInterval {4000, 5000},\n\t\tRarity 2,\n\t\tMoveSpeed 270,\n"));
        assert_eq!(text.matches("MoveSpeed").count(), 1);
    }

    #[test]
    fn hermite_curve_writes_tangents() {
        let mut model = model_with_bone();
        let curve = AnimationCurve::from_keyframes(
            TrackKind::Translation,
            Interpolation::Hermite,
            [
                Keyframe::new(0, [0.0, 0.0, 0.0]).with_tangents([0.0, 0.0, 1.0], [0.0, 0.0, -1.0]),
                Keyframe::new(100, [0.0, 0.0, 2.5]),
            ],
        )
        .unwrap();
        model.nodes.get_mut("Bone_Root").unwrap().anim_loc = Some(curve);
        let text = save(&model).unwrap();
        let expected = "\tTranslation 2 {\n\t\tHermite,\n\t\t0: {0, 0, 0},\n\t\t\tInTan {0, 0, 1},\n\t\t\tOutTan {0, 0, -1},\n\t\t100: {0, 0, 2.5},\n\t\t\tInTan {0, 0, 2.5},\n\t\t\tOutTan {0, 0, 2.5},\n\t}\n";
        assert!(text.contains(expected), "{text}");
    }

    #[test]
    fn static_layer_alpha_and_texture_id() {
        let mut model = model_with_bone();
        let texture = Texture::new("Textures\\Skin.blp");
        model.add_material(Material::new("Skin").with_layer(Layer::new(texture, Default::default())));
        let text = save(&model).unwrap();
        assert!(text.contains("\t\t\tstatic TextureID 0,\n"));
        assert!(text.contains("\t\t\tstatic Alpha 1,\n"));
        assert!(text.contains("Textures 1 {\n\tBitmap {\n\t\tImage \"Textures\\Skin.blp\",\n"));
    }
}
