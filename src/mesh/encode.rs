//! Mesh encoder: scene geometry to a container tree, and re-emission of a
//! decoded [`Model`].
//!
//! [`encode_model`] serializes the stored record arrays verbatim, so a model
//! decoded from this crate's own output re-encodes byte-identically.
//! [`encode_scene`] converts host geometry into those records first:
//! handedness conversion (first coordinate negated on positions and
//! normals), exact-bits normal deduplication, texture-number resolution
//! through the registry, and plane-offset computation.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{ErrorKind, IResult, Warning};
use crate::iff::write::{Chunk, Form};
use crate::iff::{Tag, tags};
use crate::mesh::decode::reconstruct;
use crate::mesh::hardpoint::{far_chunk, hardpoint_chunk, ranges_chunk, sphere_chunk};
use crate::mesh::{
    DEFAULT_FACE_RESERVED, ENCODE_VERSION, Face, Fvrt, LFLAG_FULLBRIGHT, Lod, LodMesh, Model,
    Sphere, Vec3,
};
use crate::registry::{TextureRegistry, flat_colour_texnum};
use crate::scene::{SceneLod, SceneMaterial, SceneModel};

/// Far-plane range written by the scene encoder, by convention.
pub const DEFAULT_FAR_RANGE: [f32; 2] = [0.0, 900_000.0];

/// Switch distances substituted when the scene supplies none.
pub const DEFAULT_RANGES: [f32; 3] = [0.0, 400.0, 800.0];

/// Scene-encoding parameters.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// First texture number handed out by the registry, and the default id
    /// for materials with neither image nor flat colour.
    pub texnum_base: i32,
    /// Mesh format version to emit.
    pub version: u32,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            texnum_base: 22000,
            version: ENCODE_VERSION,
        }
    }
}

fn numbered_tag(value: usize) -> IResult<Tag> {
    let text = format!("{value:04}");
    let bytes: [u8; 4] = text.as_bytes().try_into().map_err(|_| ErrorKind::InvalidScene {
        detail: format!("index {value} does not fit a 4-digit form name"),
    })?;
    Tag::from_bytes(bytes).ok_or_else(|| {
        ErrorKind::InvalidScene {
            detail: format!("index {value} does not form a printable name"),
        }
        .into()
    })
}

/// Serialize one detail level's stored records as its minor-mesh form.
pub fn lod_mesh_form(mesh: &LodMesh) -> IResult<Form> {
    let mut version_form = Form::new(numbered_tag(mesh.version as usize)?);

    let mut name = Chunk::new(tags::NAME);
    name.push_cstring(mesh.name.clone());
    version_form.push(name);

    let mut vert = Chunk::new(tags::VERT);
    for &[x, y, z] in &mesh.vertices {
        vert.push_float(x);
        vert.push_float(y);
        vert.push_float(z);
    }
    version_form.push(vert);

    // Version 9 stores normals under the older NORM name.
    let normal_id = if mesh.version == 9 { tags::NORM } else { tags::VTNM };
    let mut vtnm = Chunk::new(normal_id);
    for &[x, y, z] in &mesh.normals {
        vtnm.push_float(x);
        vtnm.push_float(y);
        vtnm.push_float(z);
    }
    version_form.push(vtnm);

    let mut fvrt = Chunk::new(tags::FVRT);
    for record in &mesh.fvrts {
        fvrt.push_long(record.vertex);
        fvrt.push_long(record.normal);
        fvrt.push_float(record.u);
        fvrt.push_float(record.v);
    }
    version_form.push(fvrt);

    let mut face = Chunk::new(tags::FACE);
    for record in &mesh.faces {
        face.push_long(record.normal);
        face.push_float(record.plane_offset);
        face.push_long(record.texnum);
        face.push_long(record.first_fvrt);
        face.push_long(record.vertex_count);
        face.push_long(record.light_flags);
        if mesh.version >= 11 {
            face.push_long(record.reserved.unwrap_or(DEFAULT_FACE_RESERVED));
        }
    }
    version_form.push(face);

    let mut cntr = Chunk::new(tags::CNTR);
    for value in mesh.center {
        cntr.push_float(value);
    }
    version_form.push(cntr);

    let mut radi = Chunk::new(tags::RADI);
    radi.push_float(mesh.radius);
    version_form.push(radi);

    let mut minor = Form::new(tags::MESH);
    minor.push(version_form);
    Ok(minor)
}

/// Re-emit a model as its root aggregate form.
pub fn encode_model(model: &Model) -> IResult<Form> {
    let mut root = Form::new(tags::DETA);

    if !model.ranges.is_empty() {
        root.push(ranges_chunk(&model.ranges));
    }

    if !model.lods.is_empty() {
        let mut group = Form::new(tags::MESH);
        for (level, lod) in model.lods.iter().enumerate() {
            let mut lod_form = Form::new(numbered_tag(level)?);
            match lod {
                Lod::Mesh { mesh, .. } => lod_form.push(lod_mesh_form(mesh)?),
                Lod::Empty => lod_form.push(Form::new(tags::EMPT)),
            }
            group.push(lod_form);
        }
        root.push(group);
    }

    if !model.hardpoints.is_empty() {
        let mut hard = Form::new(tags::HARD);
        for hardpoint in &model.hardpoints {
            hard.push(hardpoint_chunk(hardpoint));
        }
        root.push(hard);
    }

    if let Some(sphere) = &model.collision {
        let mut coll = Form::new(tags::COLL);
        coll.push(sphere_chunk(sphere));
        root.push(coll);
    }

    if let Some(range) = model.far_range {
        root.push(far_chunk(range));
    }

    Ok(root)
}

/// Convert host scene geometry into a model and serialize it.
///
/// The registry outlives the call so the caller can list the texture-number
/// assignments afterwards. Material-resolution problems degrade to defaults
/// and are returned as warnings rather than aborting the conversion.
pub fn encode_scene(
    scene: &SceneModel,
    registry: &mut TextureRegistry,
    options: &EncodeOptions,
) -> IResult<(Form, Vec<Warning>)> {
    if scene.lods.is_empty() {
        return Err(ErrorKind::InvalidScene {
            detail: "scene has no detail levels".to_owned(),
        }
        .into());
    }

    let mut warnings = Vec::new();
    let mut model = Model::default();

    for (level, lod) in scene.lods.iter().enumerate() {
        let mesh = scene_lod_mesh(scene, lod, registry, options, &mut warnings)?;
        let topology = reconstruct(&mesh, level)?;
        model.lods.push(Lod::Mesh { mesh, topology });
    }

    model.ranges = if scene.ranges.is_empty() {
        DEFAULT_RANGES.to_vec()
    } else {
        scene.ranges.clone()
    };
    model.hardpoints = scene.hardpoints.clone();
    model.collision = Some(scene.collision.unwrap_or_else(|| {
        let base = &scene.lods[0];
        Sphere {
            center: base.origin,
            radius: half_diagonal(base.dimensions),
        }
    }));
    model.far_range = Some(DEFAULT_FAR_RANGE);

    Ok((encode_model(&model)?, warnings))
}

fn negate_x([x, y, z]: Vec3) -> Vec3 {
    [-x, y, z]
}

fn half_diagonal([dx, dy, dz]: Vec3) -> f32 {
    (dx * dx + dy * dy + dz * dz).sqrt() / 2.0
}

fn dot(a: Vec3, b: Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Normal table with exact-bits deduplication. Two normals merge only when
/// every component is bit-identical; numerically equal values derived along
/// different paths stay separate, matching the stored format's index-based
/// lookup.
#[derive(Default)]
struct NormalTable {
    normals: Vec<Vec3>,
    index: HashMap<[u32; 3], i32>,
}

impl NormalTable {
    fn intern(&mut self, normal: Vec3) -> i32 {
        let key = normal.map(f32::to_bits);
        *self.index.entry(key).or_insert_with(|| {
            self.normals.push(normal);
            (self.normals.len() - 1) as i32
        })
    }
}

fn scene_lod_mesh(
    scene: &SceneModel,
    lod: &SceneLod,
    registry: &mut TextureRegistry,
    options: &EncodeOptions,
    warnings: &mut Vec<Warning>,
) -> IResult<LodMesh> {
    let invalid = |detail: String| ErrorKind::InvalidScene { detail };

    if lod.polygons.is_empty() || lod.positions.is_empty() {
        return Err(invalid("detail level has no geometry".to_owned()).into());
    }

    // First pass: build the deduplicated normal table in a deterministic
    // order. Smoothed polygons contribute their vertices' shading normals,
    // every polygon contributes its flat normal.
    let mut table = NormalTable::default();
    for polygon in &lod.polygons {
        if polygon.smooth {
            for &vertex in &polygon.vertices {
                let normal = lod
                    .vertex_normals
                    .get(vertex as usize)
                    .ok_or_else(|| invalid(format!("vertex {vertex} has no shading normal")))?;
                table.intern(negate_x(*normal));
            }
        }
        table.intern(negate_x(polygon.normal));
    }

    let mut fvrts = Vec::new();
    let mut faces = Vec::with_capacity(lod.polygons.len());

    for polygon in &lod.polygons {
        if polygon.vertices.len() < 3 {
            return Err(invalid("polygon has fewer than 3 vertices".to_owned()).into());
        }
        if polygon.uvs.len() != polygon.vertices.len() {
            return Err(invalid("polygon UV count does not match its vertex count".to_owned()).into());
        }

        let flat_normal = negate_x(polygon.normal);
        let flat_index = table.intern(flat_normal);

        let first_fvrt = fvrts.len() as i32;
        for (&vertex, uv) in polygon.vertices.iter().zip(&polygon.uvs) {
            if vertex as usize >= lod.positions.len() {
                return Err(invalid(format!("polygon references vertex {vertex} out of range")).into());
            }
            let normal_index = if polygon.smooth {
                let normal = lod.vertex_normals[vertex as usize];
                table.intern(negate_x(normal))
            } else {
                flat_index
            };
            fvrts.push(Fvrt {
                vertex: vertex as i32,
                normal: normal_index,
                u: uv[0],
                // Negated so textures need no vertical flip on conversion.
                v: -uv[1],
            });
        }

        let (texnum, light_flags) = match polygon.material {
            Some(index) => {
                let material = scene
                    .materials
                    .get(index)
                    .ok_or_else(|| invalid(format!("polygon references material {index} out of range")))?;
                (
                    resolve_texnum(material, registry),
                    resolve_light_flags(material, warnings),
                )
            }
            None => (registry.base(), 0),
        };

        let first_vertex = negate_x(lod.positions[polygon.vertices[0] as usize]);
        let plane_offset = -dot(flat_normal, first_vertex);

        faces.push(Face {
            normal: flat_index,
            plane_offset,
            texnum,
            first_fvrt,
            vertex_count: polygon.vertices.len() as i32,
            light_flags,
            reserved: (options.version >= 11).then_some(DEFAULT_FACE_RESERVED),
        });
    }

    Ok(LodMesh {
        name: scene.name.clone(),
        version: options.version,
        vertices: lod.positions.iter().copied().map(negate_x).collect(),
        normals: table.normals,
        fvrts,
        faces,
        center: lod.origin,
        radius: half_diagonal(lod.dimensions),
    })
}

fn resolve_texnum(material: &SceneMaterial, registry: &mut TextureRegistry) -> i32 {
    if let Some(image) = &material.image {
        let basename = Path::new(image)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(image.as_str());
        registry.texnum_for_image(basename)
    } else if let Some(colour) = material.flat_colour {
        flat_colour_texnum(colour)
    } else {
        registry.base()
    }
}

fn resolve_light_flags(material: &SceneMaterial, warnings: &mut Vec<Warning>) -> i32 {
    let mut flags = 0;
    if material.unlit {
        flags |= LFLAG_FULLBRIGHT;
    }
    if let Some(text) = &material.light_flags {
        match text.trim().parse::<i32>() {
            Ok(value) => flags = value,
            Err(_) => {
                flags = 0;
                warnings.push(Warning::MaterialResolution {
                    detail: format!(
                        "cannot convert light-flag override {text:?} on material {:?} to an integer",
                        material.name
                    ),
                });
            }
        }
    }
    flags
}
