/// Error and warning definitions
pub mod error;
/// Generic IFF container codec -- reader and writer for FORM/CHUNK trees
pub mod iff;
/// Mesh data model plus the binary mesh decoder/encoder
pub mod mesh;
/// Per-conversion texture/material numbering
pub mod registry;
/// Host-side scene geometry surface consumed by the encoder
pub mod scene;
/// WCPPascal compiler-source rendering of an encoded container tree
pub mod source;
