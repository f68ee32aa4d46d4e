use super::layout::{optional_index, EMISSIVE_VERSION, FRESNEL_VERSION, NAME_WIDTH, PATH_WIDTH};
use super::reader::{tag_name, ChunkReader};
use super::tags::{self, track_kind};
use super::{RawGeosetAnim, RawMaterial, RawModel};
use crate::animation::{AnimationCurve, Interpolation, Keyframe, TrackKind};
use crate::error::{MdlError, Result};
use crate::material::{FilterMode, Layer, Material, MaterialFlags, ShadingFlags};
use crate::model::{
    is_supported_version, Extent, GeosetAnim, Sequence, Texture, GEOSET_ANIM_COLOR,
};

// From Delphi: SizeOfSeq = $50 + 13*4 = 80 + 52 = 132 bytes per sequence
pub(super) const SEQUENCE_SIZE: usize = 0x50 + 13 * 4;
// replaceable id + 260 byte path + flags
pub(super) const TEXTURE_SIZE: usize = 4 + 0x104 + 4;


/// Bounds radius, minimum, maximum.
pub(super) fn read_extent(r: &mut ChunkReader) -> Result<Extent> {
    let bounds_radius = r.read_f32()?;
    let min = r.read_f32s::<3>()?;
    let max = r.read_f32s::<3>()?;
    Ok(Extent {
        min,
        max,
        bounds_radius,
    })
}

/// Colors are stored b, g, r.
pub(super) fn read_color(r: &mut ChunkReader) -> Result<[f32; 3]> {
    let [b, g, red] = r.read_f32s::<3>()?;
    Ok([red, g, b])
}

fn read_values(r: &mut ChunkReader, kind: TrackKind) -> Result<Vec<f32>> {
    if kind == TrackKind::Integer {
        return Ok(vec![r.read_u32()? as f32]);
    }
    (0..kind.width()).map(|_| r.read_f32()).collect()
}

/// Reads one track body (the tag is already consumed).
pub(super) fn read_track(r: &mut ChunkReader, tag: &[u8; 4], kind: TrackKind) -> Result<AnimationCurve> {
    let count = r.read_u32()?;
    let raw_interp = r.read_u32()?;
    let interpolation = Interpolation::from_u32(raw_interp).ok_or_else(|| {
        MdlError::invariant(format!(
            "{} track has unknown interpolation {raw_interp}",
            tag_name(tag)
        ))
    })?;
    let global_seq = r.read_i32()?;

    let mut curve = AnimationCurve::new(kind, interpolation);
    curve.global_sequence_id = u32::try_from(global_seq).ok();
    for _ in 0..count {
        let frame = r.read_i32()?;
        let mut key = Keyframe::new(frame, read_values(r, kind)?);
        if interpolation.has_tangents() {
            key.in_tan = Some(read_values(r, kind)?);
            key.out_tan = Some(read_values(r, kind)?);
        }
        if let Err(e) = curve.insert(key) {
            log::warn!("{} track: {e}, key dropped", tag_name(tag));
        }
    }
    if kind == TrackKind::Color {
        curve.reverse_components();
    }
    Ok(curve)
}

/// Tracks trailing a record, in file order.
#[derive(Debug, Default)]
pub(super) struct Tracks(Vec<([u8; 4], AnimationCurve)>);

impl Tracks {
    /// Reads tracks until the record ends. An unknown tag cannot be sized,
    /// so it ends the record.
    pub fn read(r: &mut ChunkReader) -> Result<Self> {
        let mut tracks = Vec::new();
        while !r.is_empty() {
            let tag = r.read_tag()?;
            let Some(kind) = track_kind(&tag) else {
                log::warn!(
                    "unknown track '{}', skipping {} bytes",
                    tag_name(&tag),
                    r.remaining()
                );
                r.rest();
                break;
            };
            let curve = read_track(r, &tag, kind)?;
            tracks.push((tag, curve));
        }
        Ok(Tracks(tracks))
    }

    pub fn take(&mut self, tag: [u8; 4]) -> Option<AnimationCurve> {
        let pos = self.0.iter().position(|(t, _)| *t == tag)?;
        Some(self.0.remove(pos).1)
    }

    /// Logs any track the record type does not model.
    pub fn finish(self, owner: &str) {
        for (tag, _) in self.0 {
            log::debug!("{owner}: ignoring track '{}'", tag_name(&tag));
        }
    }
}

pub(crate) fn read_version(r: &mut ChunkReader, raw: &mut RawModel) -> Result<()> {
    let version = r.read_u32()?;
    if !is_supported_version(version) {
        return Err(MdlError::UnsupportedVersion(version));
    }
    log::debug!("MDX version {version}");
    raw.model.version = version;
    Ok(())
}

pub(crate) fn read_model_info(r: &mut ChunkReader, raw: &mut RawModel) -> Result<()> {
    let model = &mut raw.model;
    model.name = r.read_cstring(NAME_WIDTH)?;
    model.animation_file = r.read_cstring(PATH_WIDTH)?;
    model.extent = read_extent(r)?;
    model.blend_time = r.read_u32()?;
    log::debug!("model '{}'", model.name);
    Ok(())
}

pub(crate) fn read_sequences(r: &mut ChunkReader, raw: &mut RawModel) -> Result<()> {
    while !r.is_empty() {
        let mut s = r.sub(SEQUENCE_SIZE)?;
        let name = s.read_cstring(NAME_WIDTH)?;
        let start = s.read_u32()?;
        let end = s.read_u32()?;
        let movement_speed = s.read_f32()?;
        let non_looping = s.read_u32()? & 1 != 0;
        let rarity = s.read_f32()?;
        let _sync_point = s.read_u32()?;
        let extent = read_extent(&mut s)?;
        raw.model.sequences.push(Sequence {
            name,
            start,
            end,
            non_looping,
            rarity: rarity.max(0.0).round() as u32,
            movement_speed,
            extent: Some(extent),
        });
    }
    log::debug!("Loaded {} sequences", raw.model.sequences.len());
    Ok(())
}

pub(crate) fn read_global_sequences(r: &mut ChunkReader, raw: &mut RawModel) -> Result<()> {
    while !r.is_empty() {
        let duration = r.read_u32()?;
        if raw.model.global_sequences.contains(duration) {
            log::warn!("duplicate global sequence duration {duration}");
        }
        raw.model.global_sequences.insert(duration);
        // Curves address GLBS by position, duplicates included
        raw.global_sequences.push(duration);
    }
    Ok(())
}

pub(crate) fn read_textures(r: &mut ChunkReader, raw: &mut RawModel) -> Result<()> {
    while !r.is_empty() {
        let mut t = r.sub(TEXTURE_SIZE)?;
        let replaceable_id = t.read_u32()?;
        let path = t.read_cstring(PATH_WIDTH)?;
        let flags = t.read_u32()?;
        raw.model.textures.push(Texture {
            path,
            replaceable_id,
            flags,
        });
    }
    log::debug!("Loaded {} textures", raw.model.textures.len());
    Ok(())
}

fn read_layer(r: &mut ChunkReader, version: u32) -> Result<(Layer, u32)> {
    let filter_mode = FilterMode::from_u32(r.read_u32()?);
    let shading_flags = ShadingFlags::from_bits(r.read_u32()?);
    let texture_id = r.read_u32()?;
    let texture_anim_id = optional_index(r.read_u32()?);
    let coord_id = r.read_u32()?;
    let alpha = r.read_f32()?;

    let mut layer = Layer {
        filter_mode,
        shading_flags,
        texture_anim_id,
        coord_id,
        alpha,
        ..Default::default()
    };
    if version >= EMISSIVE_VERSION {
        layer.emissive_gain = r.read_f32()?;
    }
    if version >= FRESNEL_VERSION {
        layer.fresnel_color = r.read_f32s::<3>()?;
        layer.fresnel_opacity = r.read_f32()?;
        layer.fresnel_team_color = r.read_f32()?;
    }

    let mut tracks = Tracks::read(r)?;
    layer.alpha_anim = tracks.take(tags::KMTA);
    layer.texture_anim = tracks.take(tags::KMTF);
    tracks.finish("layer");
    Ok((layer, texture_id))
}

pub(crate) fn read_materials(r: &mut ChunkReader, raw: &mut RawModel) -> Result<()> {
    let version = raw.version();
    while !r.is_empty() {
        let mut m = r.inclusive_record()?;
        let mut material = Material::new(format!("Material {}", raw.materials.len()));
        material.priority_plane = m.read_i32()?;
        material.flags = MaterialFlags::from_bits(m.read_u32()?);
        if version >= EMISSIVE_VERSION {
            material.shader = m.read_cstring(NAME_WIDTH)?;
        }

        let tag = m.read_tag()?;
        if tag != tags::LAYS {
            return Err(MdlError::InvalidMagic {
                expected: "LAYS".to_string(),
                actual: tag_name(&tag),
            });
        }
        let count = m.read_u32()?;
        let mut texture_ids = Vec::new();
        for _ in 0..count {
            let mut l = m.inclusive_record()?;
            let (layer, texture_id) = read_layer(&mut l, version)?;
            material.layers.push(layer);
            texture_ids.push(texture_id);
        }
        raw.materials.push(RawMaterial {
            material,
            texture_ids,
        });
    }
    log::debug!("Loaded {} materials", raw.materials.len());
    Ok(())
}

pub(crate) fn read_geoset_anims(r: &mut ChunkReader, raw: &mut RawModel) -> Result<()> {
    while !r.is_empty() {
        let mut a = r.inclusive_record()?;
        let alpha = a.read_f32()?;
        let flags = a.read_u32()?;
        let color = read_color(&mut a)?;
        let geoset_id = a.read_u32()?;
        let mut tracks = Tracks::read(&mut a)?;
        let anim = GeosetAnim {
            alpha,
            alpha_anim: tracks.take(tags::KGAO),
            color: (flags & GEOSET_ANIM_COLOR != 0).then_some(color),
            color_anim: tracks.take(tags::KGAC),
            flags,
        };
        tracks.finish("geoset anim");
        raw.geoset_anims.push(RawGeosetAnim { anim, geoset_id });
    }
    Ok(())
}

pub(crate) fn read_pivots(r: &mut ChunkReader, raw: &mut RawModel) -> Result<()> {
    while !r.is_empty() {
        raw.pivots.push(r.read_f32s::<3>()?);
    }
    log::debug!("Loaded {} pivot points", raw.pivots.len());
    Ok(())
}

/// Bind poses are stored as 3x4 affine matrices, four columns of three.
pub(crate) fn read_bind_poses(r: &mut ChunkReader, raw: &mut RawModel) -> Result<()> {
    let count = r.read_u32()?;
    for _ in 0..count {
        let m = r.read_f32s::<12>()?;
        let mut pose = [0.0f32; 16];
        for c in 0..4 {
            pose[c * 4..c * 4 + 3].copy_from_slice(&m[c * 3..c * 3 + 3]);
        }
        pose[15] = 1.0;
        raw.bind_poses.push(pose);
    }
    Ok(())
}
