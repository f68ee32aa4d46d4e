use super::layout::{NAME_WIDTH, SELECTION_UNSELECTABLE};
use super::parser::read_extent;
use super::reader::{tag_name, ChunkReader};
use super::tags;
use super::{RawGeoset, RawModel};
use crate::error::{MdlError, Result};
use crate::model::{Geoset, Vertex, VertexInfluence};

/// Face type code for plain triangle lists
const FACE_TRIANGLES: u32 = 4;

fn read_count(r: &mut ChunkReader, expected: [u8; 4]) -> Result<usize> {
    let tag = r.read_tag()?;
    if tag != expected {
        return Err(MdlError::InvalidMagic {
            expected: tag_name(&expected),
            actual: tag_name(&tag),
        });
    }
    Ok(r.read_u32()? as usize)
}

fn read_vec3s(r: &mut ChunkReader, tag: [u8; 4]) -> Result<Vec<[f32; 3]>> {
    let count = read_count(r, tag)?;
    (0..count).map(|_| r.read_f32s::<3>()).collect()
}

fn read_u32s(r: &mut ChunkReader, tag: [u8; 4]) -> Result<Vec<u32>> {
    let count = read_count(r, tag)?;
    (0..count).map(|_| r.read_u32()).collect()
}

/// Keeps only triangle-list face groups.
fn triangles(types: &[u32], counts: &[u32], indices: &[u16]) -> Vec<[u32; 3]> {
    let mut out = Vec::new();
    let mut offset = 0usize;
    for (i, count) in counts.iter().enumerate() {
        let count = *count as usize;
        let end = (offset + count).min(indices.len());
        let face_type = types.get(i).copied().unwrap_or(FACE_TRIANGLES);
        if face_type == FACE_TRIANGLES {
            out.extend(
                indices[offset..end]
                    .chunks_exact(3)
                    .map(|t| [t[0] as u32, t[1] as u32, t[2] as u32]),
            );
        } else {
            log::warn!("skipping {count} indices of face type {face_type}");
        }
        offset = end;
    }
    out
}

fn read_geoset(r: &mut ChunkReader, version: u32) -> Result<RawGeoset> {
    let positions = read_vec3s(r, tags::VRTX)?;
    let normals = read_vec3s(r, tags::NRMS)?;
    let face_types = read_u32s(r, tags::PTYP)?;
    let face_counts = read_u32s(r, tags::PCNT)?;
    let index_count = read_count(r, tags::PVTX)?;
    let indices = (0..index_count)
        .map(|_| r.read_u16())
        .collect::<Result<Vec<_>>>()?;
    let group_count = read_count(r, tags::GNDX)?;
    let vertex_groups = r.read_bytes(group_count)?;
    let group_sizes = read_u32s(r, tags::MTGC)?;
    let matrix_indices = read_u32s(r, tags::MATS)?;

    let material_id = r.read_u32()?;
    let mut geoset = Geoset::default();
    geoset.selection_group = r.read_u32()?;
    geoset.unselectable = r.read_u32()? & SELECTION_UNSELECTABLE != 0;
    if version >= 900 {
        geoset.lod = r.read_u32()?;
        geoset.lod_name = r.read_cstring(NAME_WIDTH)?;
    }
    geoset.extent = read_extent(r)?;
    let extent_count = r.read_u32()?;
    for _ in 0..extent_count {
        geoset.sequence_extents.push(read_extent(r)?);
    }

    let mut skin: Option<&[u8]> = None;
    if version >= 900 {
        if r.peek_tag() == Some(tags::TANG) {
            let count = read_count(r, tags::TANG)?;
            for _ in 0..count {
                geoset.tangents.push(r.read_f32s::<4>()?);
            }
        }
        if r.peek_tag() == Some(tags::SKIN) {
            let count = read_count(r, tags::SKIN)?;
            skin = Some(r.read_bytes(count)?);
        }
    }

    let uv_sets = read_count(r, tags::UVAS)?;
    let mut uvs: Vec<[f32; 2]> = Vec::new();
    for set in 0..uv_sets {
        let count = read_count(r, tags::UVBS)?;
        let coords = (0..count)
            .map(|_| r.read_f32s::<2>())
            .collect::<Result<Vec<_>>>()?;
        // Only the first coordinate set is modelled
        if set == 0 {
            uvs = coords;
        }
    }

    // Matrix groups are sized by MTGC and filled from MATS in order
    let mut matrix_groups = Vec::with_capacity(group_sizes.len());
    let mut offset = 0usize;
    for size in &group_sizes {
        let end = offset + *size as usize;
        let group = matrix_indices.get(offset..end).ok_or_else(|| {
            MdlError::reference("matrix index", end as i64, matrix_indices.len())
        })?;
        matrix_groups.push(group.to_vec());
        offset = end;
    }

    // SKIN bones index MATS directly, so each entry becomes its own group
    if skin.is_some() {
        matrix_groups = matrix_indices.iter().map(|i| vec![*i]).collect();
    }

    geoset.vertices = positions
        .iter()
        .enumerate()
        .map(|(i, position)| {
            let influence = match skin {
                Some(bytes) if bytes.len() >= (i + 1) * 8 => {
                    let s = &bytes[i * 8..i * 8 + 8];
                    VertexInfluence::Skin {
                        bones: [s[0], s[1], s[2], s[3]],
                        weights: [s[4], s[5], s[6], s[7]],
                    }
                }
                _ => VertexInfluence::Matrix(vertex_groups.get(i).copied().unwrap_or(0) as u32),
            };
            Vertex {
                position: *position,
                normal: normals.get(i).copied().unwrap_or([0.0, 0.0, 1.0]),
                uv: uvs.get(i).copied().unwrap_or_default(),
                influence,
            }
        })
        .collect();
    geoset.triangles = triangles(&face_types, &face_counts, &indices);

    Ok(RawGeoset {
        geoset,
        material_id,
        matrix_groups,
    })
}

pub(crate) fn read_geosets(r: &mut ChunkReader, raw: &mut RawModel) -> Result<()> {
    let version = raw.version();
    while !r.is_empty() {
        let mut g = r.inclusive_record()?;
        let geoset = read_geoset(&mut g, version)?;
        log::debug!(
            "  Geoset {}: {} vertices, {} triangles",
            raw.geosets.len(),
            geoset.geoset.vertices.len(),
            geoset.geoset.triangles.len()
        );
        raw.geosets.push(geoset);
    }
    log::debug!("Loaded {} geosets", raw.geosets.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_triangle_groups_are_skipped() {
        let tris = triangles(&[4, 5, 4], &[3, 4, 3], &[0, 1, 2, 9, 9, 9, 9, 2, 3, 0]);
        assert_eq!(tris, vec![[0, 1, 2], [2, 3, 0]]);
    }
}
