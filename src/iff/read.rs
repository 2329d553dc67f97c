//! Forward-only IFF container reader.
//!
//! [`Cursor::read_node`] distinguishes group nodes from chunks by their
//! 4-byte identifier. Reading a group consumes the whole node from the parent
//! cursor and hands back a [`FormCursor`] bounded to exactly the group's
//! declared content, so callers iterate children with `has_more` instead of
//! maintaining their own byte counters. Backtracking is not supported; after
//! any failure the cursor position is undefined and callers must stop.

use winnow::Parser;
use winnow::binary::be_i32;
use winnow::error::{ContextError, ErrMode};

use crate::error::{ErrorKind, IResult};
use crate::iff::{GroupKind, Tag};

/// A forward-only cursor over container bytes.
#[derive(Debug)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    /// Absolute offset of `data[0]` within the file. Sub-cursors inherit it
    /// so pad-byte parity and error offsets stay file-relative.
    base: usize,
}

/// One node produced by [`Cursor::read_node`].
#[derive(Debug)]
pub enum Node<'a> {
    Form(FormCursor<'a>),
    Chunk(Chunk<'a>),
}

/// A leaf chunk: identifier plus its unpadded payload.
#[derive(Debug)]
pub struct Chunk<'a> {
    pub id: Tag,
    pub data: &'a [u8],
}

/// A group node with a cursor bounded to its content.
///
/// Dropping the cursor without reading skips the whole subtree; the parent
/// cursor has already advanced past it.
#[derive(Debug)]
pub struct FormCursor<'a> {
    pub kind: GroupKind,
    /// The group's 4-byte subtype identifier.
    pub id: Tag,
    cursor: Cursor<'a>,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0, base: 0 }
    }

    /// Absolute file offset of the next unread byte.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether any content bytes remain.
    pub fn has_more(&self) -> bool {
        self.pos < self.data.len()
    }

    fn take(&mut self, count: usize) -> IResult<&'a [u8]> {
        if self.remaining() < count {
            return Err(ErrorKind::UnexpectedEof { offset: self.offset() }.into());
        }
        let slice = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    fn read_tag(&mut self) -> IResult<Tag> {
        let offset = self.offset();
        let bytes: [u8; 4] = self
            .take(4)?
            .try_into()
            .expect("take(4) returned a 4-byte slice");
        Tag::from_bytes(bytes)
            .ok_or_else(|| ErrorKind::InvalidContainerId { found: bytes, offset }.into())
    }

    fn read_len(&mut self) -> IResult<i32> {
        let offset = self.offset();
        let input = &mut &self.data[self.pos..];
        let value = be_i32
            .parse_next(input)
            .map_err(|_: ErrMode<ContextError>| ErrorKind::UnexpectedEof { offset })?;
        self.pos += 4;
        Ok(value)
    }

    /// Content is aligned at even file offsets; a single zero pad byte
    /// follows odd-length content and is never counted in the declared
    /// length.
    fn skip_pad(&mut self) {
        if self.offset() % 2 == 1 && self.has_more() {
            self.pos += 1;
        }
    }

    /// Read the next node, advancing past its entire on-disk extent
    /// (including any pad byte).
    pub fn read_node(&mut self) -> IResult<Node<'a>> {
        let node_offset = self.offset();
        let tag = self.read_tag()?;
        let declared = self.read_len()?;

        if let Some(kind) = GroupKind::from_tag(tag) {
            // Group length counts the 4-byte subtype plus children.
            if declared < 4 || (declared as usize) > self.remaining() {
                return Err(ErrorKind::TruncatedNode {
                    offset: node_offset,
                    declared: i64::from(declared),
                    available: self.remaining(),
                }
                .into());
            }
            let id = self.read_tag()?;
            let content_base = self.offset();
            let content = self.take(declared as usize - 4)?;
            self.skip_pad();
            Ok(Node::Form(FormCursor {
                kind,
                id,
                cursor: Cursor {
                    data: content,
                    pos: 0,
                    base: content_base,
                },
            }))
        } else {
            if declared < 0 || (declared as usize) > self.remaining() {
                return Err(ErrorKind::TruncatedNode {
                    offset: node_offset,
                    declared: i64::from(declared),
                    available: self.remaining(),
                }
                .into());
            }
            let data = self.take(declared as usize)?;
            self.skip_pad();
            Ok(Node::Chunk(Chunk { id: tag, data }))
        }
    }

    /// Skip the next node and its entire subtree.
    pub fn skip_node(&mut self) -> IResult<()> {
        self.read_node().map(drop)
    }
}

impl<'a> FormCursor<'a> {
    pub fn offset(&self) -> usize {
        self.cursor.offset()
    }

    /// Whether unread children remain inside this group.
    pub fn has_more(&self) -> bool {
        self.cursor.has_more()
    }

    /// The group's declared content length, counting its subtype id.
    pub fn content_len(&self) -> usize {
        4 + self.cursor.data.len()
    }

    pub fn read_node(&mut self) -> IResult<Node<'a>> {
        self.cursor.read_node()
    }

    pub fn skip_node(&mut self) -> IResult<()> {
        self.cursor.skip_node()
    }
}

/// Read the root node of a container file, which must be a group.
pub fn read_root(data: &[u8]) -> IResult<FormCursor<'_>> {
    let mut cursor = Cursor::new(data);
    match cursor.read_node()? {
        Node::Form(form) => Ok(form),
        Node::Chunk(chunk) => Err(ErrorKind::NotAMesh {
            found: chunk.id.to_string(),
        }
        .into()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reads_a_plain_chunk() {
        let data = b"GONE\x00\x00\x00\x04\x2A\x00\x00\x00";
        let mut cursor = Cursor::new(data);
        match cursor.read_node().unwrap() {
            Node::Chunk(chunk) => {
                assert_eq!(chunk.id.as_str(), "GONE");
                assert_eq!(chunk.data, &42i32.to_le_bytes());
            }
            Node::Form(_) => panic!("expected chunk"),
        }
        assert!(!cursor.has_more());
    }

    #[test]
    fn reads_form_children_via_bounded_cursor() {
        let data = b"FORM\x00\x00\x00(TESTFIB \x00\x00\x00\x1C\
            \x01\x00\x00\x00\x01\x00\x00\x00\x02\x00\x00\x00\x03\x00\x00\x00\
            \x05\x00\x00\x00\x08\x00\x00\x00\x0D\x00\x00\x00";
        let mut form = read_root(data).unwrap();
        assert_eq!(form.kind, GroupKind::Form);
        assert_eq!(form.id.as_str(), "TEST");
        assert!(form.has_more());

        match form.read_node().unwrap() {
            Node::Chunk(chunk) => {
                assert_eq!(chunk.id.as_str(), "FIB ");
                let values: Vec<i32> = chunk
                    .data
                    .chunks_exact(4)
                    .map(|b| i32::from_le_bytes(b.try_into().unwrap()))
                    .collect();
                assert_eq!(values, vec![1, 1, 2, 3, 5, 8, 13]);
            }
            Node::Form(_) => panic!("expected chunk"),
        }
        assert!(!form.has_more());
    }

    #[test]
    fn pad_byte_is_consumed_between_siblings() {
        // Chunk "ODD " with 3 content bytes, padded, followed by "EVEN".
        let mut data = Vec::new();
        data.extend_from_slice(b"ODD \x00\x00\x00\x03abc\x00");
        data.extend_from_slice(b"EVEN\x00\x00\x00\x02hi");
        let mut cursor = Cursor::new(&data);
        match cursor.read_node().unwrap() {
            Node::Chunk(chunk) => assert_eq!(chunk.data, b"abc"),
            Node::Form(_) => panic!("expected chunk"),
        }
        match cursor.read_node().unwrap() {
            Node::Chunk(chunk) => {
                assert_eq!(chunk.id.as_str(), "EVEN");
                assert_eq!(chunk.data, b"hi");
            }
            Node::Form(_) => panic!("expected chunk"),
        }
        assert!(!cursor.has_more());
    }

    #[test]
    fn invalid_identifier_is_rejected() {
        let data = b"\x01BAD\x00\x00\x00\x00";
        let mut cursor = Cursor::new(data);
        match cursor.read_node() {
            Err(err) => match err.kind {
                ErrorKind::InvalidContainerId { found, offset } => {
                    assert_eq!(found, [0x01, b'B', b'A', b'D']);
                    assert_eq!(offset, 0);
                }
                other => panic!("unexpected error: {other}"),
            },
            Ok(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn truncated_declared_length_is_rejected() {
        let data = b"GONE\x00\x00\x00\x10\x2A\x00\x00\x00";
        let mut cursor = Cursor::new(data);
        match cursor.read_node() {
            Err(err) => match err.kind {
                ErrorKind::TruncatedNode {
                    offset,
                    declared,
                    available,
                } => {
                    assert_eq!(offset, 0);
                    assert_eq!(declared, 16);
                    assert_eq!(available, 4);
                }
                other => panic!("unexpected error: {other}"),
            },
            Ok(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn skip_node_passes_whole_subtree() {
        // FORM wrapper holding one chunk, followed by a sibling chunk.
        let mut data = Vec::new();
        data.extend_from_slice(b"FORM\x00\x00\x00\x10WRAP");
        data.extend_from_slice(b"INNR\x00\x00\x00\x04\x01\x00\x00\x00");
        data.extend_from_slice(b"AFTR\x00\x00\x00\x00");
        let mut cursor = Cursor::new(&data);
        cursor.skip_node().unwrap();
        match cursor.read_node().unwrap() {
            Node::Chunk(chunk) => assert_eq!(chunk.id.as_str(), "AFTR"),
            Node::Form(_) => panic!("expected chunk"),
        }
    }
}
