//! Second phase of MDX import: ordinal references become names and owned
//! records. A bad reference drops the entity that holds it, never the model.

use super::{RawModel, RawNode};
use crate::animation::AnimationCurve;
use crate::error::MdlError;
use crate::model::{Model, NodeKind};

/// Resolves every raw reference and returns the finished model along with
/// the recovered errors.
pub(crate) fn resolve(raw: RawModel) -> (Model, Vec<MdlError>) {
    let RawModel {
        mut model,
        materials,
        geosets,
        geoset_anims,
        nodes,
        global_sequences,
        pivots,
        bind_poses,
    } = raw;
    let mut errors = Vec::new();
    let mut report = |e: MdlError, context: &str| {
        log::warn!("{context}: {e}");
        errors.push(e);
    };

    // Object index -> node name
    let names: Vec<String> = nodes.iter().map(|n| n.node.name.clone()).collect();
    if pivots.len() != nodes.len() {
        log::warn!("{} pivot points for {} nodes", pivots.len(), nodes.len());
    }

    let node_count = nodes.len();
    for (index, RawNode { mut node, object_id, parent }) in nodes.into_iter().enumerate() {
        let name = node.name.clone();
        if object_id as usize != index {
            log::warn!("node '{name}' declares object id {object_id} at position {index}");
        }
        if let Some(pivot) = pivots.get(index) {
            node.pivot = *pivot;
        }
        node.bindpose = bind_poses.get(index).copied();
        node.parent = match usize::try_from(parent) {
            Err(_) => None,
            Ok(p) if p < node_count => Some(names[p].clone()),
            Ok(p) => {
                report(
                    MdlError::reference("parent node", p as i64, node_count),
                    &name,
                );
                None
            }
        };
        for curve in node.curves_mut() {
            if let Err(e) = resolve_global_sequence(curve, &global_sequences) {
                report(e, &name);
            }
        }
        if let NodeKind::Event(event) = &mut node.kind {
            if let Some(id) = event.global_sequence_id.take() {
                match global_sequences.get(id as usize) {
                    Some(d) => event.global_sequence = Some(*d),
                    None => report(
                        MdlError::reference("global sequence", id, global_sequences.len()),
                        &name,
                    ),
                }
            }
        }
        if let Err(e) = model.nodes.insert(node) {
            report(e, &name);
        }
    }

    for mut raw_material in materials {
        let material = &mut raw_material.material;
        let layers = std::mem::take(&mut material.layers);
        for (mut layer, texture_id) in layers.into_iter().zip(raw_material.texture_ids) {
            match model.textures.get(texture_id as usize) {
                Some(texture) => layer.texture = texture.clone(),
                None => {
                    report(
                        MdlError::reference("texture", texture_id, model.textures.len()),
                        &material.name,
                    );
                    continue;
                }
            }
            for curve in layer.curves_mut() {
                if let Err(e) = resolve_global_sequence(curve, &global_sequences) {
                    report(e, &material.name);
                }
            }
            material.layers.push(layer);
        }
        model.materials.push(raw_material.material);
    }

    // Geoset ordinal -> position in model.geosets, for geoset anims
    let mut geoset_slots: Vec<Option<usize>> = Vec::with_capacity(geosets.len());
    for (i, raw_geoset) in geosets.into_iter().enumerate() {
        let context = format!("geoset {i}");
        let mut geoset = raw_geoset.geoset;
        let Some(material) = model.materials.get(raw_geoset.material_id as usize) else {
            report(
                MdlError::reference("material", raw_geoset.material_id, model.materials.len()),
                &context,
            );
            geoset_slots.push(None);
            continue;
        };
        geoset.material_name = material.name.clone();

        let matrices: Result<Vec<Vec<String>>, MdlError> = raw_geoset
            .matrix_groups
            .iter()
            .map(|group| {
                group
                    .iter()
                    .map(|index| {
                        names
                            .get(*index as usize)
                            .cloned()
                            .ok_or_else(|| MdlError::reference("matrix bone", *index, node_count))
                    })
                    .collect()
            })
            .collect();
        match matrices {
            Ok(m) => geoset.matrices = m,
            Err(e) => {
                report(e, &context);
                geoset_slots.push(None);
                continue;
            }
        }
        if let Some(t) = geoset.first_bad_triangle() {
            let bad = geoset.triangles[t].iter().copied().max().unwrap_or_default();
            report(
                MdlError::reference("vertex", bad, geoset.vertices.len()),
                &context,
            );
            geoset_slots.push(None);
            continue;
        }
        geoset_slots.push(Some(model.geosets.len()));
        model.geosets.push(geoset);
    }

    for mut raw_anim in geoset_anims {
        for curve in raw_anim.anim.curves_mut() {
            if let Err(e) = resolve_global_sequence(curve, &global_sequences) {
                report(e, "geoset anim");
            }
        }
        match geoset_slots.get(raw_anim.geoset_id as usize) {
            Some(Some(slot)) => model.geosets[*slot].geoset_anim = Some(raw_anim.anim),
            Some(None) => log::debug!("geoset anim for dropped geoset {}", raw_anim.geoset_id),
            None => report(
                MdlError::reference("geoset", raw_anim.geoset_id, geoset_slots.len()),
                "geoset anim",
            ),
        }
    }

    model.sort_sequences();
    (model, errors)
}

/// Replaces a raw GLBS index with the duration it names. On failure the
/// curve falls back to the sequence timeline.
fn resolve_global_sequence(curve: &mut AnimationCurve, durations: &[u32]) -> Result<(), MdlError> {
    let Some(id) = curve.global_sequence_id.take() else {
        return Ok(());
    };
    match durations.get(id as usize) {
        Some(d) => {
            curve.global_sequence = Some(*d);
            Ok(())
        }
        None => Err(MdlError::reference("global sequence", id, durations.len())),
    }
}
