//! Portable mesh/model data structures and the binary mesh codec.
//!
//! A [`Model`] is the root aggregate produced by decoding one mesh file:
//! an ordered list of detail levels, their switch distances, hardpoints and
//! collision data. Each geometric detail level keeps the flat record arrays
//! exactly as stored on disk (so a decoded model re-encodes byte-identically)
//! plus a reconstructed [`Topology`] for host consumption.

/// Walks a parsed container tree into a [`Model`].
pub mod decode;
/// Emits a container tree from a model or host scene geometry.
pub mod encode;
/// Hardpoint, collision-sphere, and LOD-range record codecs.
pub mod hardpoint;

pub type Vec3 = [f32; 3];

/// Read a null-terminated Latin-1 string from the start of a chunk payload.
pub(crate) fn read_cstring(data: &[u8]) -> String {
    data.iter()
        .take_while(|&&byte| byte != 0)
        .map(|&byte| byte as char)
        .collect()
}

/// Light-flag bit set on faces whose material is unlit.
pub const LFLAG_FULLBRIGHT: i32 = 2;

/// Value written to the trailing face field of format versions >= 11.
/// Meaning unknown; preserved for compatibility.
pub const DEFAULT_FACE_RESERVED: i32 = 0x7F0096FF_u32 as i32;

/// Mesh format version emitted by the encoder.
pub const ENCODE_VERSION: u32 = 12;

/// A face-vertex record: one corner of one polygon.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fvrt {
    pub vertex: i32,
    pub normal: i32,
    pub u: f32,
    pub v: f32,
}

/// A face record as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Face {
    /// Index of the face's flat normal.
    pub normal: i32,
    /// Scalar `d` of the plane equation `normal . p + d = 0`.
    pub plane_offset: f32,
    /// Texture number resolved through the registry.
    pub texnum: i32,
    /// Index of this face's first FVRT; its FVRTs are contiguous.
    pub first_fvrt: i32,
    pub vertex_count: i32,
    pub light_flags: i32,
    /// Trailing field present in format versions >= 11 only.
    pub reserved: Option<i32>,
}

/// One geometric detail level, as stored.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LodMesh {
    pub name: String,
    pub version: u32,
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub fvrts: Vec<Fvrt>,
    pub faces: Vec<Face>,
    pub center: Vec3,
    pub radius: f32,
}

/// A detail level slot in a [`Model`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Lod {
    /// Geometry plus its reconstructed topology.
    Mesh {
        mesh: LodMesh,
        topology: Topology,
    },
    /// Placeholder level with no geometry (`EMPT`), or a level whose
    /// reconstruction failed and was reported as a warning.
    Empty,
}

/// A named rigid attachment transform.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hardpoint {
    pub rotation: [[f32; 3]; 3],
    pub position: Vec3,
    pub name: String,
}

/// A collision sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

/// The root aggregate for one mesh file.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Model {
    /// Detail levels ordered 0..N (0 = most detailed).
    pub lods: Vec<Lod>,
    /// LOD switch distances; entry N applies to detail level N.
    pub ranges: Vec<f32>,
    pub hardpoints: Vec<Hardpoint>,
    pub collision: Option<Sphere>,
    /// Near/far plane range metadata.
    pub far_range: Option<[f32; 2]>,
}

/// A distinct material within one LOD: faces sharing the same key share one
/// material slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaterialKey {
    pub texnum: i32,
    pub light_flags: i32,
}

/// One reconstructed polygon.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Polygon {
    /// Vertex loop in stored order.
    pub vertices: Vec<u32>,
    /// Deduplicated edge indices, one per loop edge.
    pub edges: Vec<u32>,
    /// Per-loop UVs, ordered to match the reversed vertex loop.
    pub uvs: Vec<[f32; 2]>,
    /// Index into [`Topology::materials`].
    pub material_slot: u32,
}

/// Polygon topology reconstructed from the flat per-face records.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Topology {
    /// Vertex positions converted to host handedness (first coordinate
    /// negated).
    pub positions: Vec<Vec3>,
    /// Per-vertex shading normals, handedness-converted like positions.
    pub vertex_normals: Vec<Vec3>,
    /// Globally deduplicated edges; `(a, b)` matches `(b, a)`.
    pub edges: Vec<[u32; 2]>,
    pub polygons: Vec<Polygon>,
    /// Distinct material keys in first-seen face order.
    pub materials: Vec<MaterialKey>,
}
