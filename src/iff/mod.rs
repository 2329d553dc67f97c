//! Generic IFF container codec.
//!
//! The on-disk format is a recursive FORM/CHUNK tree in the RIFF family:
//! every node starts with a 4-byte printable-ASCII identifier and a
//! big-endian `i32` length. Group nodes (`FORM`, `CAT `, `LIST`) carry a
//! 4-byte subtype identifier followed by child nodes; leaf chunks carry an
//! opaque payload. Nodes with odd content length are followed by a single
//! zero pad byte which is never counted in the declared length.

/// Forward-only reader over a byte buffer.
pub mod read;
/// In-memory tree builder and serializer.
pub mod write;

/// A 4-byte container identifier.
///
/// Every byte is in the printable ASCII range `[0x20, 0x7E]`; readers reject
/// anything else as `InvalidContainerId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(pub(crate) [u8; 4]);

impl Tag {
    /// Validate and wrap a 4-byte identifier.
    pub fn from_bytes(bytes: [u8; 4]) -> Option<Tag> {
        if bytes.iter().all(|b| (0x20..=0x7E).contains(b)) {
            Some(Tag(bytes))
        } else {
            None
        }
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// The identifier as a `str`. Always valid UTF-8 since every byte is
    /// printable ASCII.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three reserved group-node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// Plain aggregate (`FORM`).
    Form,
    /// Concatenation (`CAT `).
    Cat,
    /// Ordered list (`LIST`).
    List,
}

impl GroupKind {
    pub fn from_tag(tag: Tag) -> Option<GroupKind> {
        match &tag.0 {
            b"FORM" => Some(GroupKind::Form),
            b"CAT " => Some(GroupKind::Cat),
            b"LIST" => Some(GroupKind::List),
            _ => None,
        }
    }

    pub fn tag(&self) -> Tag {
        match self {
            GroupKind::Form => Tag(*b"FORM"),
            GroupKind::Cat => Tag(*b"CAT "),
            GroupKind::List => Tag(*b"LIST"),
        }
    }
}

/// Identifiers used by the mesh file layout.
pub mod tags {
    use super::Tag;

    /// Root aggregate holding the whole model.
    pub const DETA: Tag = Tag(*b"DETA");
    /// Mesh group, per-LOD wrapper, and minor-mesh form all share this id.
    pub const MESH: Tag = Tag(*b"MESH");
    /// Placeholder form for a detail level with no geometry.
    pub const EMPT: Tag = Tag(*b"EMPT");
    /// LOD switch distances (f32 array).
    pub const RANG: Tag = Tag(*b"RANG");
    /// Hardpoint group form and per-hardpoint chunk id.
    pub const HARD: Tag = Tag(*b"HARD");
    /// Collision group form.
    pub const COLL: Tag = Tag(*b"COLL");
    /// Collision sphere chunk.
    pub const SPHR: Tag = Tag(*b"SPHR");
    /// Far plane range chunk (two f32).
    pub const FAR: Tag = Tag(*b"FAR ");
    /// Mesh name (null-terminated string).
    pub const NAME: Tag = Tag(*b"NAME");
    /// Vertex positions (f32 triples).
    pub const VERT: Tag = Tag(*b"VERT");
    /// Vertex normals (f32 triples).
    pub const VTNM: Tag = Tag(*b"VTNM");
    /// Vertex normals under the older name, reserved for format version 9.
    pub const NORM: Tag = Tag(*b"NORM");
    /// Face-vertex records.
    pub const FVRT: Tag = Tag(*b"FVRT");
    /// Face records.
    pub const FACE: Tag = Tag(*b"FACE");
    /// Mesh center point (3 f32).
    pub const CNTR: Tag = Tag(*b"CNTR");
    /// Bounding radius (1 f32).
    pub const RADI: Tag = Tag(*b"RADI");
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tag_validation() {
        assert!(Tag::from_bytes(*b"FORM").is_some());
        assert!(Tag::from_bytes(*b"FAR ").is_some());
        assert!(Tag::from_bytes([0x1F, b'A', b'B', b'C']).is_none());
        assert!(Tag::from_bytes([b'A', b'B', b'C', 0x7F]).is_none());
    }

    #[test]
    fn group_kind_round_trip() {
        for kind in [GroupKind::Form, GroupKind::Cat, GroupKind::List] {
            assert_eq!(GroupKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(GroupKind::from_tag(tags::DETA), None);
    }
}
