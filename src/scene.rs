//! Host-facing scene geometry accepted by the encoder.
//!
//! These types describe what a host application hands over for conversion:
//! polygon loops with per-corner UVs, per-polygon material references and
//! smoothing flags, plus the named attachment points and collision override
//! the model file carries alongside the geometry. Everything here is in host
//! coordinates; the encoder performs the handedness conversion.

use crate::mesh::{Hardpoint, Sphere, Vec3};

/// A material referenced by scene polygons.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SceneMaterial {
    pub name: String,
    /// Path or basename of the image file backing the material's texture.
    pub image: Option<String>,
    /// Untextured diffuse colour, encoded into the texture number.
    pub flat_colour: Option<[f32; 3]>,
    /// Unlit materials set the fullbright light-flag bit.
    pub unlit: bool,
    /// Explicit light-flag override. When present it replaces the computed
    /// flags entirely; a value that does not parse as an integer falls back
    /// to zero with a warning.
    pub light_flags: Option<String>,
}

/// One polygon loop.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScenePolygon {
    /// Vertex indices in host winding order.
    pub vertices: Vec<u32>,
    /// One UV per loop corner, parallel to `vertices`.
    pub uvs: Vec<[f32; 2]>,
    /// Flat normal in host coordinates.
    pub normal: Vec3,
    /// Smoothed polygons reference per-vertex shading normals instead of the
    /// flat normal.
    pub smooth: bool,
    /// Index into [`SceneModel::materials`].
    pub material: Option<usize>,
}

/// One detail level of scene geometry.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SceneLod {
    pub positions: Vec<Vec3>,
    /// Per-vertex shading normals, parallel to `positions`. Only consulted
    /// for polygons with smoothing enabled.
    pub vertex_normals: Vec<Vec3>,
    pub polygons: Vec<ScenePolygon>,
    /// Local origin, written as the level's center chunk verbatim.
    pub origin: Vec3,
    /// Bounding-box dimensions; the stored radius is half their diagonal.
    pub dimensions: Vec3,
}

/// A complete scene handed to the encoder.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SceneModel {
    /// Model name, written into each level's name chunk.
    pub name: String,
    /// Detail levels ordered most-detailed first.
    pub lods: Vec<SceneLod>,
    /// LOD switch distances; a conventional default is substituted when
    /// empty.
    pub ranges: Vec<f32>,
    pub hardpoints: Vec<Hardpoint>,
    /// Collision sphere override; when absent the encoder derives one from
    /// LOD 0's origin and bounding box.
    pub collision: Option<Sphere>,
    pub materials: Vec<SceneMaterial>,
}
