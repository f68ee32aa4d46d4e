//! MDX encoder. Emits the chunk set the parser reads, with node chunks in
//! object-id order so ordinal references line up on the way back in.

use super::chunk_writer::ChunkWriter;
use crate::animation::{AnimationCurve, TrackKind};
use crate::error::{MdlError, Result};
use crate::model::{
    Extent, Geoset, GeosetAnim, Layer, Material, Model, Node, NodeKind,
    VertexInfluence, GEOSET_ANIM_COLOR,
};
use crate::parser::layout::{
    raw_index, EMISSIVE_VERSION, FRESNEL_VERSION, NAME_WIDTH, PATH_WIDTH, SELECTION_UNSELECTABLE,
};
use crate::parser::tags;
use std::collections::HashMap;


struct Encoder<'a> {
    model: &'a Model,
    object_ids: HashMap<&'a str, u32>,
}

fn write_extent(w: &mut ChunkWriter, e: &Extent) -> Result<()> {
    w.write_f32(e.bounds_radius)?;
    w.write_f32s(&e.min)?;
    w.write_f32s(&e.max)
}

fn write_color(w: &mut ChunkWriter, c: &[f32; 3]) -> Result<()> {
    w.write_f32s(&[c[2], c[1], c[0]])
}

impl<'a> Encoder<'a> {
    fn new(model: &'a Model) -> Self {
        Self {
            model,
            object_ids: model.nodes.object_ids(),
        }
    }

    fn object_id(&self, name: &str) -> Result<u32> {
        self.object_ids
            .get(name)
            .copied()
            .ok_or_else(|| MdlError::invariant(format!("unknown node '{name}'")))
    }

    fn write_values(w: &mut ChunkWriter, kind: TrackKind, values: &[f32]) -> Result<()> {
        match kind {
            TrackKind::Integer => w.write_u32(values.first().copied().unwrap_or(0.0).max(0.0) as u32),
            _ => w.write_f32s(values),
        }
    }

    fn write_track(&self, w: &mut ChunkWriter, tag: [u8; 4], curve: Option<&AnimationCurve>) -> Result<()> {
        let Some(curve) = curve else {
            return Ok(());
        };
        let mut curve = curve.clone();
        if curve.kind == TrackKind::Color {
            curve.reverse_components();
        }
        let global_seq = match curve.global_sequence {
            Some(d) => self.model.global_sequences.index_of(d).ok_or_else(|| {
                MdlError::invariant(format!("global sequence {d} is not registered"))
            })? as i32,
            None => -1,
        };

        w.write_tag(tag)?;
        w.write_u32(curve.len() as u32)?;
        w.write_u32(curve.interpolation.to_u32())?;
        w.write_i32(global_seq)?;
        for key in curve.keyframes() {
            w.write_i32(key.frame)?;
            Self::write_values(w, curve.kind, &key.value)?;
            if curve.interpolation.has_tangents() {
                Self::write_values(w, curve.kind, key.in_tan.as_deref().unwrap_or(&key.value))?;
                Self::write_values(w, curve.kind, key.out_tan.as_deref().unwrap_or(&key.value))?;
            }
        }
        Ok(())
    }

    fn write_header(&self, w: &mut ChunkWriter) -> Result<()> {
        let m = self.model;
        w.chunk(tags::VERS, |w| w.write_u32(m.version))?;
        w.chunk(tags::MODL, |w| {
            w.write_cstring(&m.name, NAME_WIDTH)?;
            w.write_cstring(&m.animation_file, PATH_WIDTH)?;
            write_extent(w, &m.extent)?;
            w.write_u32(m.blend_time)
        })?;
        if !m.sequences.is_empty() {
            w.chunk(tags::SEQS, |w| {
                for s in &m.sequences {
                    w.write_cstring(&s.name, NAME_WIDTH)?;
                    w.write_u32(s.start)?;
                    w.write_u32(s.end)?;
                    w.write_f32(s.movement_speed)?;
                    w.write_u32(s.non_looping as u32)?;
                    w.write_f32(s.rarity as f32)?;
                    w.write_u32(0)?;
                    write_extent(w, &s.extent.unwrap_or(m.extent))?;
                }
                Ok(())
            })?;
        }
        if !m.global_sequences.is_empty() {
            w.chunk(tags::GLBS, |w| {
                m.global_sequences.iter().try_for_each(|d| w.write_u32(d))
            })?;
        }
        if !m.textures.is_empty() {
            w.chunk(tags::TEXS, |w| {
                for t in &m.textures {
                    w.write_u32(t.replaceable_id)?;
                    w.write_cstring(&t.path, PATH_WIDTH)?;
                    w.write_u32(t.flags)?;
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    fn write_layer(&self, w: &mut ChunkWriter, layer: &Layer) -> Result<()> {
        let texture_id = self.model.texture_index(&layer.texture).ok_or_else(|| {
            MdlError::invariant(format!("layer texture '{}' is not registered", layer.texture.path))
        })?;
        w.inclusive(|w| {
            w.write_u32(layer.filter_mode.to_u32())?;
            w.write_u32(crate::material::ShadingFlags::to_bits(&layer.shading_flags))?;
            w.write_u32(texture_id)?;
            w.write_u32(raw_index(layer.texture_anim_id))?;
            w.write_u32(layer.coord_id)?;
            w.write_f32(layer.alpha)?;
            if self.model.version >= EMISSIVE_VERSION {
                w.write_f32(layer.emissive_gain)?;
            }
            if self.model.version >= FRESNEL_VERSION {
                w.write_f32s(&layer.fresnel_color)?;
                w.write_f32(layer.fresnel_opacity)?;
                w.write_f32(layer.fresnel_team_color)?;
            }
            self.write_track(w, tags::KMTA, layer.alpha_anim.as_ref())?;
            self.write_track(w, tags::KMTF, layer.texture_anim.as_ref())
        })
    }

    fn write_material(&self, w: &mut ChunkWriter, material: &Material) -> Result<()> {
        w.inclusive(|w| {
            w.write_i32(material.priority_plane)?;
            w.write_u32(crate::material::MaterialFlags::to_bits(&material.flags))?;
            if self.model.version >= EMISSIVE_VERSION {
                w.write_cstring(&material.shader, NAME_WIDTH)?;
            }
            w.write_tag(tags::LAYS)?;
            w.write_u32(material.layers.len() as u32)?;
            material
                .layers
                .iter()
                .try_for_each(|layer| self.write_layer(w, layer))
        })
    }

    fn write_geoset(&self, w: &mut ChunkWriter, geoset: &Geoset) -> Result<()> {
        let version = self.model.version;
        if geoset.vertices.len() > u16::MAX as usize + 1 {
            return Err(MdlError::invariant(format!(
                "geoset has {} vertices, more than 16-bit indices can address",
                geoset.vertices.len()
            )));
        }
        let material_id = self
            .model
            .material_index(&geoset.material_name)
            .ok_or_else(|| MdlError::invariant(format!("unknown material '{}'", geoset.material_name)))?;
        let skinned = geoset.uses_skin_weights();
        if skinned && version < 900 {
            log::warn!("skin weights need version 900+, writing first bones only");
        }

        let mut matrix_ids = Vec::new();
        for name in geoset.matrices.iter().flatten() {
            matrix_ids.push(self.object_id(name)?);
        }

        w.inclusive(|w| {
            w.write_tag(tags::VRTX)?;
            w.write_u32(geoset.vertices.len() as u32)?;
            for v in &geoset.vertices {
                w.write_f32s(&v.position)?;
            }
            w.write_tag(tags::NRMS)?;
            w.write_u32(geoset.vertices.len() as u32)?;
            for v in &geoset.vertices {
                w.write_f32s(&v.normal)?;
            }
            w.write_tag(tags::PTYP)?;
            w.write_u32(1)?;
            w.write_u32(4)?;
            w.write_tag(tags::PCNT)?;
            w.write_u32(1)?;
            w.write_u32(geoset.triangles.len() as u32 * 3)?;
            w.write_tag(tags::PVTX)?;
            w.write_u32(geoset.triangles.len() as u32 * 3)?;
            for index in geoset.triangles.iter().flatten() {
                w.write_u16(*index as u16)?;
            }

            w.write_tag(tags::GNDX)?;
            w.write_u32(geoset.vertices.len() as u32)?;
            for v in &geoset.vertices {
                let group = match v.influence {
                    VertexInfluence::Matrix(g) => g,
                    VertexInfluence::Skin { bones, .. } if version < 900 => bones[0] as u32,
                    VertexInfluence::Skin { .. } => 0,
                };
                let group = u8::try_from(group).map_err(|_| {
                    MdlError::invariant(format!("matrix group {group} does not fit a byte"))
                })?;
                w.write_u8(group)?;
            }
            w.write_tag(tags::MTGC)?;
            w.write_u32(geoset.matrices.len() as u32)?;
            for group in &geoset.matrices {
                w.write_u32(group.len() as u32)?;
            }
            w.write_tag(tags::MATS)?;
            w.write_u32(matrix_ids.len() as u32)?;
            w.write_u32s(&matrix_ids)?;

            w.write_u32(material_id)?;
            w.write_u32(geoset.selection_group)?;
            w.write_u32(if geoset.unselectable { SELECTION_UNSELECTABLE } else { 0 })?;
            if version >= 900 {
                w.write_u32(geoset.lod)?;
                w.write_cstring(&geoset.lod_name, NAME_WIDTH)?;
            }
            write_extent(w, &geoset.extent)?;
            w.write_u32(geoset.sequence_extents.len() as u32)?;
            for e in &geoset.sequence_extents {
                write_extent(w, e)?;
            }

            if version >= 900 {
                if !geoset.tangents.is_empty() {
                    w.write_tag(tags::TANG)?;
                    w.write_u32(geoset.tangents.len() as u32)?;
                    for t in &geoset.tangents {
                        w.write_f32s(t)?;
                    }
                }
                if skinned {
                    w.write_tag(tags::SKIN)?;
                    w.write_u32(geoset.vertices.len() as u32 * 8)?;
                    for v in &geoset.vertices {
                        let (bones, weights) = match v.influence {
                            VertexInfluence::Skin { bones, weights } => (bones, weights),
                            VertexInfluence::Matrix(g) => ([g as u8, 0, 0, 0], [255, 0, 0, 0]),
                        };
                        bones.iter().chain(&weights).try_for_each(|b| w.write_u8(*b))?;
                    }
                }
            }

            w.write_tag(tags::UVAS)?;
            w.write_u32(1)?;
            w.write_tag(tags::UVBS)?;
            w.write_u32(geoset.vertices.len() as u32)?;
            for v in &geoset.vertices {
                w.write_f32s(&v.uv)?;
            }
            Ok(())
        })
    }

    fn write_geoset_anim(&self, w: &mut ChunkWriter, geoset_id: usize, anim: &GeosetAnim) -> Result<()> {
        w.inclusive(|w| {
            let mut flags = anim.flags;
            if anim.color.is_some() {
                flags |= GEOSET_ANIM_COLOR;
            }
            w.write_f32(anim.alpha)?;
            w.write_u32(flags)?;
            write_color(w, &anim.color.unwrap_or([1.0; 3]))?;
            w.write_u32(geoset_id as u32)?;
            self.write_track(w, tags::KGAO, anim.alpha_anim.as_ref())?;
            self.write_track(w, tags::KGAC, anim.color_anim.as_ref())
        })
    }

    fn write_node(&self, w: &mut ChunkWriter, node: &Node) -> Result<()> {
        let parent = match &node.parent {
            Some(p) => self.object_id(p)? as i32,
            None => -1,
        };
        w.inclusive(|w| {
            w.write_cstring(&node.name, NAME_WIDTH)?;
            w.write_u32(self.object_id(&node.name)?)?;
            w.write_i32(parent)?;
            w.write_u32(node.flags | node.kind.type_flag())?;
            self.write_track(w, tags::KGTR, node.anim_loc.as_ref())?;
            self.write_track(w, tags::KGRT, node.anim_rot.as_ref())?;
            self.write_track(w, tags::KGSC, node.anim_scale.as_ref())
        })
    }

    /// Variant-specific record body following the node header.
    fn write_object(&self, w: &mut ChunkWriter, node: &Node) -> Result<()> {
        match &node.kind {
            NodeKind::Bone(bone) => {
                self.write_node(w, node)?;
                w.write_u32(raw_index(bone.geoset_id))?;
                w.write_u32(raw_index(bone.geoset_anim_id))
            }
            NodeKind::Helper => self.write_node(w, node),
            NodeKind::Attachment(a) => w.inclusive(|w| {
                self.write_node(w, node)?;
                w.write_cstring(&a.path, PATH_WIDTH)?;
                w.write_u32(a.attachment_id)?;
                self.write_track(w, tags::KATV, a.visibility.as_ref())
            }),
            NodeKind::Event(event) => {
                self.write_node(w, node)?;
                if event.track.is_empty() {
                    return Ok(());
                }
                let global_seq = match event.global_sequence {
                    Some(d) => self.model.global_sequences.index_of(d).ok_or_else(|| {
                        MdlError::invariant(format!("global sequence {d} is not registered"))
                    })? as i32,
                    None => -1,
                };
                w.write_tag(tags::KEVT)?;
                w.write_u32(event.track.len() as u32)?;
                w.write_i32(global_seq)?;
                w.write_u32s(&event.track)
            }
            NodeKind::Light(l) => w.inclusive(|w| {
                self.write_node(w, node)?;
                w.write_u32(l.light_type.to_u32())?;
                w.write_f32(l.attenuation_start)?;
                w.write_f32(l.attenuation_end)?;
                write_color(w, &l.color)?;
                w.write_f32(l.intensity)?;
                write_color(w, &l.ambient_color)?;
                w.write_f32(l.ambient_intensity)?;
                self.write_track(w, tags::KLAS, l.attenuation_start_anim.as_ref())?;
                self.write_track(w, tags::KLAE, l.attenuation_end_anim.as_ref())?;
                self.write_track(w, tags::KLAC, l.color_anim.as_ref())?;
                self.write_track(w, tags::KLAI, l.intensity_anim.as_ref())?;
                self.write_track(w, tags::KLBC, l.ambient_color_anim.as_ref())?;
                self.write_track(w, tags::KLBI, l.ambient_intensity_anim.as_ref())?;
                self.write_track(w, tags::KLAV, l.visibility.as_ref())
            }),
            NodeKind::CollisionShape(shape) => {
                self.write_node(w, node)?;
                w.write_u32(shape.type_id())?;
                for v in shape.vertices() {
                    w.write_f32s(&v)?;
                }
                if let Some(radius) = shape.radius() {
                    w.write_f32(radius)?;
                }
                Ok(())
            }
            NodeKind::ParticleEmitter(e) => w.inclusive(|w| {
                self.write_node(w, node)?;
                w.write_f32(e.emission_rate)?;
                w.write_f32(e.gravity)?;
                w.write_f32(e.longitude)?;
                w.write_f32(e.latitude)?;
                w.write_cstring(&e.path, PATH_WIDTH)?;
                w.write_f32(e.life_span)?;
                w.write_f32(e.speed)?;
                self.write_track(w, tags::KPEE, e.emission_rate_anim.as_ref())?;
                self.write_track(w, tags::KPEG, e.gravity_anim.as_ref())?;
                self.write_track(w, tags::KPLN, e.longitude_anim.as_ref())?;
                self.write_track(w, tags::KPLT, e.latitude_anim.as_ref())?;
                self.write_track(w, tags::KPEL, e.life_span_anim.as_ref())?;
                self.write_track(w, tags::KPES, e.speed_anim.as_ref())?;
                self.write_track(w, tags::KPEV, e.visibility.as_ref())
            }),
            NodeKind::ParticleEmitter2(e) => w.inclusive(|w| {
                self.write_node(w, node)?;
                w.write_f32s(&[
                    e.speed,
                    e.variation,
                    e.latitude,
                    e.gravity,
                    e.life_span,
                    e.emission_rate,
                    e.width,
                    e.length,
                ])?;
                w.write_u32(e.filter_mode.to_u32())?;
                w.write_u32(e.rows)?;
                w.write_u32(e.columns)?;
                w.write_u32(e.head_or_tail.to_u32())?;
                w.write_f32(e.tail_length)?;
                w.write_f32(e.time)?;
                for color in &e.segment_color {
                    write_color(w, color)?;
                }
                for alpha in e.segment_alpha {
                    w.write_u8(alpha)?;
                }
                w.write_f32s(&e.segment_scaling)?;
                w.write_u32s(&e.head_intervals)?;
                w.write_u32s(&e.head_decay_intervals)?;
                w.write_u32s(&e.tail_intervals)?;
                w.write_u32s(&e.tail_decay_intervals)?;
                w.write_u32(e.texture_id)?;
                w.write_u32(e.squirt as u32)?;
                w.write_i32(e.priority_plane)?;
                w.write_u32(e.replaceable_id)?;
                self.write_track(w, tags::KP2S, e.speed_anim.as_ref())?;
                self.write_track(w, tags::KP2R, e.variation_anim.as_ref())?;
                self.write_track(w, tags::KP2L, e.latitude_anim.as_ref())?;
                self.write_track(w, tags::KP2G, e.gravity_anim.as_ref())?;
                self.write_track(w, tags::KP2E, e.emission_rate_anim.as_ref())?;
                self.write_track(w, tags::KP2N, e.length_anim.as_ref())?;
                self.write_track(w, tags::KP2W, e.width_anim.as_ref())?;
                self.write_track(w, tags::KP2V, e.visibility.as_ref())
            }),
            NodeKind::RibbonEmitter(r) => w.inclusive(|w| {
                self.write_node(w, node)?;
                w.write_f32(r.height_above)?;
                w.write_f32(r.height_below)?;
                w.write_f32(r.alpha)?;
                write_color(w, &r.color)?;
                w.write_f32(r.life_span)?;
                w.write_u32(r.texture_slot)?;
                w.write_u32(r.emission_rate)?;
                w.write_u32(r.rows)?;
                w.write_u32(r.columns)?;
                w.write_u32(r.material_id)?;
                w.write_f32(r.gravity)?;
                self.write_track(w, tags::KRHA, r.height_above_anim.as_ref())?;
                self.write_track(w, tags::KRHB, r.height_below_anim.as_ref())?;
                self.write_track(w, tags::KRAL, r.alpha_anim.as_ref())?;
                self.write_track(w, tags::KRCO, r.color_anim.as_ref())?;
                self.write_track(w, tags::KRTX, r.texture_slot_anim.as_ref())?;
                self.write_track(w, tags::KRVS, r.visibility.as_ref())
            }),
        }
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let m = self.model;
        let mut w = ChunkWriter::new();
        w.write_tag(tags::MDLX)?;
        self.write_header(&mut w)?;

        if !m.materials.is_empty() {
            w.chunk(tags::MTLS, |w| {
                m.materials.iter().try_for_each(|mat| self.write_material(w, mat))
            })?;
        }
        if !m.geosets.is_empty() {
            w.chunk(tags::GEOS, |w| {
                m.geosets.iter().try_for_each(|g| self.write_geoset(w, g))
            })?;
        }
        if m.geoset_anims().next().is_some() {
            w.chunk(tags::GEOA, |w| {
                m.geoset_anims()
                    .try_for_each(|(i, anim)| self.write_geoset_anim(w, i, anim))
            })?;
        }

        // Node chunks in rank order, so file position equals object id
        let order = m.nodes.in_object_order();
        const NODE_CHUNKS: [[u8; 4]; 9] = [
            tags::BONE,
            tags::HELP,
            tags::ATCH,
            tags::EVTS,
            tags::LITE,
            tags::CLID,
            tags::PREM,
            tags::PRE2,
            tags::RIBB,
        ];
        for (rank, tag) in NODE_CHUNKS.into_iter().enumerate() {
            let nodes: Vec<&Node> = order
                .iter()
                .copied()
                .filter(|n| n.kind.rank() as usize == rank)
                .collect();
            if nodes.is_empty() {
                continue;
            }
            w.chunk(tag, |w| nodes.iter().try_for_each(|n| self.write_object(w, n)))?;
            log::debug!("wrote {} {}", nodes.len(), crate::parser::reader::tag_name(&tag));
        }

        if !order.is_empty() {
            w.chunk(tags::PIVT, |w| {
                order.iter().try_for_each(|n| w.write_f32s(&n.pivot))
            })?;
        }
        if m.version >= 900 && order.iter().any(|n| n.bindpose.is_some()) {
            w.chunk(tags::BPOS, |w| {
                w.write_u32(order.len() as u32)?;
                for n in &order {
                    let pose = n.bindpose.unwrap_or_else(|| {
                        let mut identity = [0.0f32; 16];
                        for i in 0..4 {
                            identity[i * 5] = 1.0;
                        }
                        identity
                    });
                    for c in 0..4 {
                        w.write_f32s(&pose[c * 4..c * 4 + 3])?;
                    }
                }
                Ok(())
            })?;
        }
        Ok(w.into_inner())
    }
}

/// Encodes a validated model as MDX bytes.
pub fn save(model: &Model) -> Result<Vec<u8>> {
    model.validate()?;
    let bytes = Encoder::new(model).encode()?;
    log::debug!("encoded '{}' as {} bytes of MDX", model.name, bytes.len());
    Ok(bytes)
}
