use super::layout::{optional_index, NAME_WIDTH, PATH_WIDTH};
use super::parser::{read_color, Tracks};
use super::reader::ChunkReader;
use super::tags;
use super::{RawModel, RawNode};
use crate::error::{MdlError, Result};
use crate::model::{
    node_flags, Attachment, Bone, CollisionShape, EventObject, HeadOrTail, Light, LightType,
    Node, NodeKind, ParticleEmitter, ParticleEmitter2, ParticleFilterMode, RibbonEmitter,
};

/// Reads the node header shared by every object record. The returned node
/// is a helper until the caller fills in its variant.
fn read_node(r: &mut ChunkReader) -> Result<RawNode> {
    let mut n = r.inclusive_record()?;
    let name = n.read_cstring(NAME_WIDTH)?;
    let object_id = n.read_u32()?;
    let parent = n.read_i32()?;
    let flags = n.read_u32()?;

    let mut node = Node::helper(name);
    node.flags = flags & !node_flags::TYPE_MASK;
    let mut tracks = Tracks::read(&mut n)?;
    node.anim_loc = tracks.take(tags::KGTR);
    node.anim_rot = tracks.take(tags::KGRT);
    node.anim_scale = tracks.take(tags::KGSC);
    tracks.finish(&node.name);

    Ok(RawNode {
        node,
        object_id,
        parent,
    })
}

fn push(raw: &mut RawModel, mut node: RawNode, kind: NodeKind) {
    node.node.kind = kind;
    raw.nodes.push(node);
}

pub(crate) fn read_bones(r: &mut ChunkReader, raw: &mut RawModel) -> Result<()> {
    let mut count = 0;
    while !r.is_empty() {
        let node = read_node(r)?;
        let bone = Bone {
            geoset_id: optional_index(r.read_u32()?),
            geoset_anim_id: optional_index(r.read_u32()?),
        };
        push(raw, node, NodeKind::Bone(bone));
        count += 1;
    }
    log::debug!("Loaded {count} bones");
    Ok(())
}

pub(crate) fn read_helpers(r: &mut ChunkReader, raw: &mut RawModel) -> Result<()> {
    let mut count = 0;
    while !r.is_empty() {
        let node = read_node(r)?;
        // Helper has no additional fields after Node, unlike Bone
        push(raw, node, NodeKind::Helper);
        count += 1;
    }
    log::debug!("Loaded {count} helpers");
    Ok(())
}

pub(crate) fn read_attachments(r: &mut ChunkReader, raw: &mut RawModel) -> Result<()> {
    while !r.is_empty() {
        let mut a = r.inclusive_record()?;
        let node = read_node(&mut a)?;
        let path = a.read_cstring(PATH_WIDTH)?;
        let attachment_id = a.read_u32()?;
        let mut tracks = Tracks::read(&mut a)?;
        let attachment = Attachment {
            path,
            attachment_id,
            visibility: tracks.take(tags::KATV),
        };
        tracks.finish(&node.node.name);
        push(raw, node, NodeKind::Attachment(attachment));
    }
    Ok(())
}

pub(crate) fn read_lights(r: &mut ChunkReader, raw: &mut RawModel) -> Result<()> {
    while !r.is_empty() {
        let mut l = r.inclusive_record()?;
        let node = read_node(&mut l)?;
        let mut light = Light {
            light_type: LightType::from_u32(l.read_u32()?),
            attenuation_start: l.read_f32()?,
            attenuation_end: l.read_f32()?,
            color: read_color(&mut l)?,
            intensity: l.read_f32()?,
            ambient_color: read_color(&mut l)?,
            ambient_intensity: l.read_f32()?,
            ..Default::default()
        };
        let mut tracks = Tracks::read(&mut l)?;
        light.attenuation_start_anim = tracks.take(tags::KLAS);
        light.attenuation_end_anim = tracks.take(tags::KLAE);
        light.color_anim = tracks.take(tags::KLAC);
        light.intensity_anim = tracks.take(tags::KLAI);
        light.ambient_color_anim = tracks.take(tags::KLBC);
        light.ambient_intensity_anim = tracks.take(tags::KLBI);
        light.visibility = tracks.take(tags::KLAV);
        tracks.finish(&node.node.name);
        push(raw, node, NodeKind::Light(light));
    }
    Ok(())
}

pub(crate) fn read_events(r: &mut ChunkReader, raw: &mut RawModel) -> Result<()> {
    while !r.is_empty() {
        let node = read_node(r)?;
        let mut event = EventObject::default();
        if r.peek_tag() == Some(tags::KEVT) {
            r.read_tag()?;
            let count = r.read_u32()?;
            event.global_sequence_id = u32::try_from(r.read_i32()?).ok();
            for _ in 0..count {
                event.track.push(r.read_u32()?);
            }
        }
        push(raw, node, NodeKind::Event(event));
    }
    Ok(())
}

pub(crate) fn read_collision_shapes(r: &mut ChunkReader, raw: &mut RawModel) -> Result<()> {
    while !r.is_empty() {
        let node = read_node(r)?;
        let shape = match r.read_u32()? {
            0 => CollisionShape::Box {
                min: r.read_f32s::<3>()?,
                max: r.read_f32s::<3>()?,
            },
            1 => CollisionShape::Plane {
                min: r.read_f32s::<3>()?,
                max: r.read_f32s::<3>()?,
            },
            2 => CollisionShape::Sphere {
                center: r.read_f32s::<3>()?,
                radius: r.read_f32()?,
            },
            3 => CollisionShape::Cylinder {
                base: r.read_f32s::<3>()?,
                top: r.read_f32s::<3>()?,
                radius: r.read_f32()?,
            },
            // Record length depends on the type, so the rest of the chunk is lost
            other => {
                return Err(MdlError::invariant(format!(
                    "collision shape '{}' has unknown type {other}",
                    node.node.name
                )));
            }
        };
        push(raw, node, NodeKind::CollisionShape(shape));
    }
    Ok(())
}

pub(crate) fn read_particle_emitters(r: &mut ChunkReader, raw: &mut RawModel) -> Result<()> {
    while !r.is_empty() {
        let mut p = r.inclusive_record()?;
        let node = read_node(&mut p)?;
        let mut emitter = ParticleEmitter {
            emission_rate: p.read_f32()?,
            gravity: p.read_f32()?,
            longitude: p.read_f32()?,
            latitude: p.read_f32()?,
            path: p.read_cstring(PATH_WIDTH)?,
            life_span: p.read_f32()?,
            speed: p.read_f32()?,
            ..Default::default()
        };
        let mut tracks = Tracks::read(&mut p)?;
        emitter.emission_rate_anim = tracks.take(tags::KPEE);
        emitter.gravity_anim = tracks.take(tags::KPEG);
        emitter.longitude_anim = tracks.take(tags::KPLN);
        emitter.latitude_anim = tracks.take(tags::KPLT);
        emitter.life_span_anim = tracks.take(tags::KPEL);
        emitter.speed_anim = tracks.take(tags::KPES);
        emitter.visibility = tracks.take(tags::KPEV);
        tracks.finish(&node.node.name);
        push(raw, node, NodeKind::ParticleEmitter(emitter));
    }
    Ok(())
}

pub(crate) fn read_particle_emitters2(r: &mut ChunkReader, raw: &mut RawModel) -> Result<()> {
    while !r.is_empty() {
        let mut p = r.inclusive_record()?;
        let node = read_node(&mut p)?;
        let mut e = ParticleEmitter2 {
            speed: p.read_f32()?,
            variation: p.read_f32()?,
            latitude: p.read_f32()?,
            gravity: p.read_f32()?,
            life_span: p.read_f32()?,
            emission_rate: p.read_f32()?,
            width: p.read_f32()?,
            length: p.read_f32()?,
            filter_mode: ParticleFilterMode::from_u32(p.read_u32()?),
            rows: p.read_u32()?,
            columns: p.read_u32()?,
            head_or_tail: HeadOrTail::from_u32(p.read_u32()?),
            tail_length: p.read_f32()?,
            time: p.read_f32()?,
            ..Default::default()
        };
        for color in &mut e.segment_color {
            *color = read_color(&mut p)?;
        }
        for alpha in &mut e.segment_alpha {
            *alpha = p.read_u8()?;
        }
        e.segment_scaling = p.read_f32s::<3>()?;
        e.head_intervals = p.read_u32s::<3>()?;
        e.head_decay_intervals = p.read_u32s::<3>()?;
        e.tail_intervals = p.read_u32s::<3>()?;
        e.tail_decay_intervals = p.read_u32s::<3>()?;
        e.texture_id = p.read_u32()?;
        e.squirt = p.read_u32()? != 0;
        e.priority_plane = p.read_i32()?;
        e.replaceable_id = p.read_u32()?;

        let mut tracks = Tracks::read(&mut p)?;
        e.speed_anim = tracks.take(tags::KP2S);
        e.variation_anim = tracks.take(tags::KP2R);
        e.latitude_anim = tracks.take(tags::KP2L);
        e.gravity_anim = tracks.take(tags::KP2G);
        e.emission_rate_anim = tracks.take(tags::KP2E);
        e.length_anim = tracks.take(tags::KP2N);
        e.width_anim = tracks.take(tags::KP2W);
        e.visibility = tracks.take(tags::KP2V);
        tracks.finish(&node.node.name);
        push(raw, node, NodeKind::ParticleEmitter2(Box::new(e)));
    }
    Ok(())
}

pub(crate) fn read_ribbon_emitters(r: &mut ChunkReader, raw: &mut RawModel) -> Result<()> {
    while !r.is_empty() {
        let mut p = r.inclusive_record()?;
        let node = read_node(&mut p)?;
        let mut ribbon = RibbonEmitter {
            height_above: p.read_f32()?,
            height_below: p.read_f32()?,
            alpha: p.read_f32()?,
            color: read_color(&mut p)?,
            life_span: p.read_f32()?,
            texture_slot: p.read_u32()?,
            emission_rate: p.read_u32()?,
            rows: p.read_u32()?,
            columns: p.read_u32()?,
            material_id: p.read_u32()?,
            gravity: p.read_f32()?,
            ..Default::default()
        };
        let mut tracks = Tracks::read(&mut p)?;
        ribbon.height_above_anim = tracks.take(tags::KRHA);
        ribbon.height_below_anim = tracks.take(tags::KRHB);
        ribbon.alpha_anim = tracks.take(tags::KRAL);
        ribbon.color_anim = tracks.take(tags::KRCO);
        ribbon.texture_slot_anim = tracks.take(tags::KRTX);
        ribbon.visibility = tracks.take(tags::KRVS);
        tracks.finish(&node.node.name);
        push(raw, node, NodeKind::RibbonEmitter(ribbon));
    }
    Ok(())
}
