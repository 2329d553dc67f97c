//! Mesh decoder: walks a parsed container tree into a [`Model`].
//!
//! The root form must be the `DETA` aggregate (or a bare `MESH` form, which
//! decodes as a single-LOD model). Unknown identifiers at any level are
//! skipped for forward compatibility, never treated as fatal. A detail level
//! whose geometry cannot be reconstructed is reported as a
//! [`Warning::LodSkipped`] and registered as an empty placeholder; sibling
//! levels are unaffected.

use std::collections::HashMap;

use itertools::Itertools;
use tracing::{debug, warn};
use winnow::Parser;
use winnow::binary::{le_f32, le_i32};
use winnow::combinator::repeat;
use winnow::error::{ContextError, ErrMode};

use crate::error::{ErrorKind, IResult, Warning};
use crate::iff::read::{FormCursor, Node, read_root};
use crate::iff::tags;
use crate::mesh::hardpoint::{parse_far, parse_hardpoint, parse_ranges, parse_sphere};
use crate::mesh::{
    Face, Fvrt, Lod, LodMesh, MaterialKey, Model, Polygon, Topology, Vec3, read_cstring,
};

type WResult<T> = Result<T, ErrMode<ContextError>>;

/// Decode one mesh file.
///
/// Returns the model together with the non-fatal warnings collected along
/// the way. Container-level faults outside a LOD subtree are fatal.
pub fn decode_model(data: &[u8]) -> IResult<(Model, Vec<Warning>)> {
    let mut root = read_root(data)?;
    let mut warnings = Vec::new();
    let mut model = Model::default();

    if root.id == tags::DETA {
        while root.has_more() {
            match root.read_node()? {
                Node::Chunk(chunk) if chunk.id == tags::RANG => {
                    model.ranges = parse_ranges(chunk.data)?;
                }
                Node::Chunk(chunk) if chunk.id == tags::FAR => {
                    model.far_range = Some(parse_far(chunk.data)?);
                }
                Node::Form(form) if form.id == tags::MESH => {
                    decode_mesh_group(form, &mut model, &mut warnings)?;
                }
                Node::Form(form) if form.id == tags::HARD => {
                    decode_hardpoints(form, &mut model)?;
                }
                Node::Form(form) if form.id == tags::COLL => {
                    decode_collision(form, &mut model)?;
                }
                Node::Form(form) => {
                    debug!(id = %form.id, "skipping unknown form");
                }
                Node::Chunk(chunk) => {
                    debug!(id = %chunk.id, "skipping unknown chunk");
                }
            }
        }
    } else if root.id == tags::MESH {
        // A bare minor mesh: one detail level, no auxiliary records.
        let (mesh, topology) = decode_minor_mesh(&mut root, 0)?;
        model.lods.push(Lod::Mesh { mesh, topology });
    } else {
        return Err(ErrorKind::NotAMesh {
            found: root.id.to_string(),
        }
        .into());
    }

    Ok((model, warnings))
}

/// Walk the `MESH` group form: one subform per detail level, named by a
/// 4-digit zero-padded decimal level index.
fn decode_mesh_group(
    mut group: FormCursor<'_>,
    model: &mut Model,
    warnings: &mut Vec<Warning>,
) -> IResult<()> {
    while group.has_more() {
        let mut lod_form = match group.read_node()? {
            Node::Form(form) => form,
            Node::Chunk(chunk) => {
                debug!(id = %chunk.id, "skipping stray chunk in mesh group");
                continue;
            }
        };
        let Ok(level) = lod_form.id.as_str().trim().parse::<usize>() else {
            warn!(id = %lod_form.id, "LOD form name is not a decimal level index");
            continue;
        };

        // Each level form wraps exactly one MESH (geometry) or EMPT
        // (placeholder) form.
        let lod = match lod_form.read_node()? {
            Node::Form(mut inner) if inner.id == tags::MESH => {
                match decode_minor_mesh(&mut inner, level) {
                    Ok((mesh, topology)) => Lod::Mesh { mesh, topology },
                    Err(err) => {
                        warnings.push(Warning::LodSkipped {
                            lod: level,
                            detail: err.to_string(),
                        });
                        Lod::Empty
                    }
                }
            }
            Node::Form(inner) if inner.id == tags::EMPT => Lod::Empty,
            other => {
                warnings.push(Warning::LodSkipped {
                    lod: level,
                    detail: format!("unexpected node {:?} in LOD form", node_id(&other)),
                });
                Lod::Empty
            }
        };
        register_lod(model, level, lod);
    }
    Ok(())
}

fn node_id(node: &Node<'_>) -> String {
    match node {
        Node::Form(form) => form.id.to_string(),
        Node::Chunk(chunk) => chunk.id.to_string(),
    }
}

fn register_lod(model: &mut Model, level: usize, lod: Lod) {
    if model.lods.len() <= level {
        model.lods.resize(level + 1, Lod::Empty);
    }
    model.lods[level] = lod;
}

/// Decode one minor-mesh form: a version subform holding the geometry
/// chunks. Builds into scratch state and publishes only on success.
fn decode_minor_mesh(form: &mut FormCursor<'_>, level: usize) -> IResult<(LodMesh, Topology)> {
    let mut version_form = match form.read_node()? {
        Node::Form(inner) => inner,
        Node::Chunk(_) => {
            return Err(ErrorKind::IncompleteLodData {
                lod: level,
                what: "version form",
            }
            .into());
        }
    };
    let version: u32 = version_form
        .id
        .as_str()
        .trim()
        .parse()
        .map_err(|_| ErrorKind::UnsupportedFormatVersion {
            name: version_form.id.to_string(),
        })?;

    let mut name = None;
    let mut vert_data = None;
    let mut vtnm_data = None;
    let mut fvrt_data = None;
    let mut face_data = None;
    let mut cntr_data = None;
    let mut radi_data = None;

    while version_form.has_more() {
        match version_form.read_node()? {
            Node::Chunk(chunk) => match chunk.id {
                tags::NAME => name = Some(read_cstring(chunk.data)),
                tags::VERT => vert_data = Some(chunk.data),
                // The older NORM name is reserved exclusively for version 9.
                tags::VTNM if version != 9 => vtnm_data = Some(chunk.data),
                tags::NORM if version == 9 => vtnm_data = Some(chunk.data),
                tags::FVRT => fvrt_data = Some(chunk.data),
                tags::FACE => face_data = Some(chunk.data),
                tags::CNTR => cntr_data = Some(chunk.data),
                tags::RADI => radi_data = Some(chunk.data),
                other => debug!(id = %other, lod = level, "skipping unknown geometry chunk"),
            },
            Node::Form(inner) => {
                debug!(id = %inner.id, lod = level, "skipping unknown subform");
            }
        }
    }

    let incomplete = |what: &'static str| ErrorKind::IncompleteLodData { lod: level, what };

    let name = name.filter(|n| !n.is_empty()).ok_or_else(|| incomplete("name"))?;
    let vertices = parse_vec3_array(vert_data.ok_or_else(|| incomplete("vertex"))?);
    let normals = parse_vec3_array(vtnm_data.ok_or_else(|| incomplete("normal"))?);
    let fvrts = parse_fvrt_array(fvrt_data.ok_or_else(|| incomplete("face-vertex"))?);
    let faces = parse_face_array(face_data.ok_or_else(|| incomplete("face"))?, version);
    if vertices.is_empty() {
        return Err(incomplete("vertex").into());
    }
    if normals.is_empty() {
        return Err(incomplete("normal").into());
    }
    if fvrts.is_empty() {
        return Err(incomplete("face-vertex").into());
    }
    if faces.is_empty() {
        return Err(incomplete("face").into());
    }

    let center = match cntr_data {
        Some(data) => parse_vec3_payload(data).unwrap_or_else(|| {
            warn!(lod = level, "CNTR chunk too short, defaulting to origin");
            [0.0; 3]
        }),
        None => {
            warn!(lod = level, "missing CNTR chunk, defaulting to origin");
            [0.0; 3]
        }
    };
    let radius = match radi_data {
        Some(data) if data.len() >= 4 => {
            f32::from_le_bytes(data[..4].try_into().expect("len checked"))
        }
        _ => {
            warn!(lod = level, "missing RADI chunk, defaulting to zero");
            0.0
        }
    };

    let mesh = LodMesh {
        name,
        version,
        vertices,
        normals,
        fvrts,
        faces,
        center,
        radius,
    };
    let topology = reconstruct(&mesh, level)?;
    Ok((mesh, topology))
}

fn parse_vec3_payload(data: &[u8]) -> Option<Vec3> {
    if data.len() < 12 {
        return None;
    }
    let input = &mut &data[..];
    parse_vec3(input).ok()
}

fn parse_vec3(input: &mut &[u8]) -> WResult<Vec3> {
    let x = le_f32.parse_next(input)?;
    let y = le_f32.parse_next(input)?;
    let z = le_f32.parse_next(input)?;
    Ok([x, y, z])
}

fn parse_vec3_array(data: &[u8]) -> Vec<Vec3> {
    if data.len() % 12 != 0 {
        warn!(len = data.len(), "vector array payload has trailing bytes");
    }
    let count = data.len() / 12;
    let input = &mut &data[..];
    repeat(count, parse_vec3)
        .parse_next(input)
        .unwrap_or_default()
}

fn parse_fvrt(input: &mut &[u8]) -> WResult<Fvrt> {
    let vertex = le_i32.parse_next(input)?;
    let normal = le_i32.parse_next(input)?;
    let u = le_f32.parse_next(input)?;
    let v = le_f32.parse_next(input)?;
    Ok(Fvrt { vertex, normal, u, v })
}

fn parse_fvrt_array(data: &[u8]) -> Vec<Fvrt> {
    if data.len() % 16 != 0 {
        warn!(len = data.len(), "FVRT payload has trailing bytes");
    }
    let count = data.len() / 16;
    let input = &mut &data[..];
    repeat(count, parse_fvrt)
        .parse_next(input)
        .unwrap_or_default()
}

fn parse_face_array(data: &[u8], version: u32) -> Vec<Face> {
    // Versions 11+ append a reserved i32 to each record.
    let record_size = if version >= 11 { 28 } else { 24 };
    if data.len() % record_size != 0 {
        warn!(len = data.len(), record_size, "FACE payload has trailing bytes");
    }
    let count = data.len() / record_size;
    let parse_face = |input: &mut &[u8]| -> WResult<Face> {
        let normal = le_i32.parse_next(input)?;
        let plane_offset = le_f32.parse_next(input)?;
        let texnum = le_i32.parse_next(input)?;
        let first_fvrt = le_i32.parse_next(input)?;
        let vertex_count = le_i32.parse_next(input)?;
        let light_flags = le_i32.parse_next(input)?;
        let reserved = if version >= 11 {
            Some(le_i32.parse_next(input)?)
        } else {
            None
        };
        Ok(Face {
            normal,
            plane_offset,
            texnum,
            first_fvrt,
            vertex_count,
            light_flags,
            reserved,
        })
    };
    let input = &mut &data[..];
    repeat(count, parse_face)
        .parse_next(input)
        .unwrap_or_default()
}

/// Reconstruct polygon topology from the flat record arrays.
///
/// The source format winds polygons opposite to the target topology, so
/// edges are generated from the reversed vertex loop and per-loop UVs are
/// taken over the reversed FVRT slice. The first coordinate of positions and
/// normals is negated to convert handedness.
pub fn reconstruct(mesh: &LodMesh, level: usize) -> IResult<Topology> {
    let incomplete = |what: &'static str| ErrorKind::IncompleteLodData { lod: level, what };

    let positions: Vec<Vec3> = mesh
        .vertices
        .iter()
        .map(|&[x, y, z]| [-x, y, z])
        .collect();
    let mut vertex_normals = vec![[0.0f32; 3]; mesh.vertices.len()];

    let mut edges: Vec<[u32; 2]> = Vec::new();
    // Canonical (min, max) key: an edge matches regardless of direction.
    let mut edge_index: HashMap<(u32, u32), u32> = HashMap::new();
    let mut materials: Vec<MaterialKey> = Vec::new();
    let mut polygons = Vec::with_capacity(mesh.faces.len());

    for face in &mesh.faces {
        let first = usize::try_from(face.first_fvrt).map_err(|_| incomplete("face-vertex"))?;
        let count = usize::try_from(face.vertex_count).map_err(|_| incomplete("face-vertex"))?;
        let slice = mesh
            .fvrts
            .get(first..first + count)
            .ok_or_else(|| incomplete("face-vertex"))?;

        let mut loop_verts = Vec::with_capacity(count);
        for fvrt in slice {
            let vertex = usize::try_from(fvrt.vertex)
                .ok()
                .filter(|&v| v < mesh.vertices.len())
                .ok_or_else(|| incomplete("vertex"))?;
            let normal = usize::try_from(fvrt.normal)
                .ok()
                .filter(|&n| n < mesh.normals.len())
                .ok_or_else(|| incomplete("normal"))?;
            let [nx, ny, nz] = mesh.normals[normal];
            vertex_normals[vertex] = [-nx, ny, nz];
            loop_verts.push(vertex as u32);
        }

        // Edges come from the reversed loop; UVs follow the same reversal.
        let mut edge_refs = Vec::with_capacity(count);
        for (a, b) in loop_verts.iter().rev().copied().circular_tuple_windows() {
            let key = (a.min(b), a.max(b));
            let next = edges.len() as u32;
            let edge = *edge_index.entry(key).or_insert_with(|| {
                edges.push([a, b]);
                next
            });
            edge_refs.push(edge);
        }

        let uvs: Vec<[f32; 2]> = slice.iter().rev().map(|f| [f.u, 1.0 - f.v]).collect();

        let key = MaterialKey {
            texnum: face.texnum,
            light_flags: face.light_flags,
        };
        let slot = match materials.iter().position(|&m| m == key) {
            Some(slot) => slot,
            None => {
                materials.push(key);
                materials.len() - 1
            }
        };

        polygons.push(Polygon {
            vertices: loop_verts,
            edges: edge_refs,
            uvs,
            material_slot: slot as u32,
        });
    }

    Ok(Topology {
        positions,
        vertex_normals,
        edges,
        polygons,
        materials,
    })
}

fn decode_hardpoints(mut group: FormCursor<'_>, model: &mut Model) -> IResult<()> {
    while group.has_more() {
        match group.read_node()? {
            Node::Chunk(chunk) if chunk.id == tags::HARD => {
                model.hardpoints.push(parse_hardpoint(chunk.data)?);
            }
            other => debug!(id = %node_id(&other), "skipping unknown hardpoint node"),
        }
    }
    Ok(())
}

fn decode_collision(mut group: FormCursor<'_>, model: &mut Model) -> IResult<()> {
    while group.has_more() {
        match group.read_node()? {
            Node::Chunk(chunk) if chunk.id == tags::SPHR => {
                model.collision = Some(parse_sphere(chunk.data)?);
            }
            other => debug!(id = %node_id(&other), "skipping unknown collision node"),
        }
    }
    Ok(())
}
