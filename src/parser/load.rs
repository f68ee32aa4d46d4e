use super::geoset::read_geosets;
use super::node::{
    read_attachments, read_bones, read_collision_shapes, read_events, read_helpers, read_lights,
    read_particle_emitters, read_particle_emitters2, read_ribbon_emitters,
};
use super::parser::{
    read_bind_poses, read_geoset_anims, read_global_sequences, read_materials, read_model_info,
    read_pivots, read_sequences, read_textures, read_version,
};
use super::reader::{tag_name, ChunkReader};
use super::resolve::resolve;
use super::tags;
use super::RawModel;
use crate::error::{MdlError, Result};
use crate::model::Model;

/// A decoded model plus the errors recovered from along the way.
#[derive(Debug)]
pub struct Loaded {
    pub model: Model,
    /// Truncated chunks and dropped references, in the order met
    pub errors: Vec<MdlError>,
}

type ChunkDecoder = fn(&mut ChunkReader, &mut RawModel) -> Result<()>;

fn decoder(tag: &[u8; 4]) -> Option<ChunkDecoder> {
    Some(match *tag {
        tags::VERS => read_version,
        tags::MODL => read_model_info,
        tags::SEQS => read_sequences,
        tags::GLBS => read_global_sequences,
        tags::TEXS => read_textures,
        tags::MTLS => read_materials,
        tags::GEOS => read_geosets,
        tags::GEOA => read_geoset_anims,
        tags::BONE => read_bones,
        tags::LITE => read_lights,
        tags::HELP => read_helpers,
        tags::ATCH => read_attachments,
        tags::PIVT => read_pivots,
        tags::PREM => read_particle_emitters,
        tags::PRE2 => read_particle_emitters2,
        tags::RIBB => read_ribbon_emitters,
        tags::EVTS => read_events,
        tags::CLID => read_collision_shapes,
        tags::BPOS => read_bind_poses,
        _ => return None,
    })
}

/// Decodes an MDX buffer.
///
/// Only a bad magic or an unsupported version aborts. A chunk that fails
/// to decode keeps what it produced before the failure, and the loop
/// resumes at the next chunk boundary.
pub fn load(bytes: &[u8]) -> Result<Loaded> {
    let mut r = ChunkReader::new(bytes);
    let magic = r.read_tag()?;
    if magic != tags::MDLX {
        return Err(MdlError::InvalidMagic {
            expected: "MDLX".to_string(),
            actual: tag_name(&magic),
        });
    }

    let mut raw = RawModel::default();
    let mut errors = Vec::new();

    while r.remaining() >= 8 {
        let tag = r.read_tag()?;
        let size = r.read_u32()? as usize;
        let mut chunk = match r.sub(size) {
            Ok(chunk) => chunk,
            Err(e) => {
                log::warn!(
                    "{} chunk declares {size} bytes, only {} remain",
                    tag_name(&tag),
                    r.remaining()
                );
                errors.push(e);
                ChunkReader::new(r.rest())
            }
        };
        log::debug!("Reading {} chunk, size: {}", tag_name(&tag), size);

        let Some(decode) = decoder(&tag) else {
            if tags::IGNORED.contains(&tag) {
                log::debug!("skipping {} chunk", tag_name(&tag));
            } else {
                log::warn!("unknown chunk '{}' ({size} bytes) skipped", tag_name(&tag));
            }
            continue;
        };
        match decode(&mut chunk, &mut raw) {
            Ok(()) => {}
            Err(e @ MdlError::UnsupportedVersion(_)) => return Err(e),
            Err(e) => {
                log::warn!("{} chunk: {e}", tag_name(&tag));
                errors.push(e);
            }
        }
    }
    if !r.is_empty() {
        log::warn!("{} trailing bytes after last chunk", r.remaining());
    }

    let (model, resolve_errors) = resolve(raw);
    errors.extend(resolve_errors);
    log::debug!(
        "loaded '{}': {} nodes, {} geosets, {} sequences",
        model.name,
        model.nodes.len(),
        model.geosets.len(),
        model.sequences.len()
    );
    Ok(Loaded { model, errors })
}
