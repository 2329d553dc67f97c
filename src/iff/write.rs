//! In-memory IFF tree builder and serializer.
//!
//! Chunks are built append-only from typed members (4-byte little-endian
//! longs and floats, null-terminated strings, raw bytes); forms hold an
//! ordered child list plus a subtype identifier. Declared lengths never
//! include pad bytes: a node whose content length is odd occupies one extra
//! zero byte on disk.

use crate::iff::{GroupKind, Tag};

/// One typed value appended to a chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    /// 4-byte little-endian signed integer.
    Long(i32),
    /// 4-byte IEEE-754 little-endian float.
    Float(f32),
    /// Raw bytes followed by one null terminator.
    CString(String),
    /// Opaque bytes, written verbatim.
    Bytes(Vec<u8>),
}

impl Member {
    pub fn byte_len(&self) -> usize {
        match self {
            Member::Long(_) | Member::Float(_) => 4,
            Member::CString(s) => s.len() + 1,
            Member::Bytes(b) => b.len(),
        }
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Member::Long(v) => out.extend_from_slice(&v.to_le_bytes()),
            Member::Float(v) => out.extend_from_slice(&v.to_le_bytes()),
            Member::CString(s) => {
                out.extend_from_slice(s.as_bytes());
                out.push(0);
            }
            Member::Bytes(b) => out.extend_from_slice(b),
        }
    }
}

/// A leaf chunk under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: Tag,
    pub members: Vec<Member>,
}

impl Chunk {
    pub fn new(id: Tag) -> Self {
        Chunk {
            id,
            members: Vec::new(),
        }
    }

    pub fn push_long(&mut self, value: i32) {
        self.members.push(Member::Long(value));
    }

    pub fn push_float(&mut self, value: f32) {
        self.members.push(Member::Float(value));
    }

    pub fn push_cstring(&mut self, value: impl Into<String>) {
        self.members.push(Member::CString(value.into()));
    }

    pub fn push_bytes(&mut self, value: impl Into<Vec<u8>>) {
        self.members.push(Member::Bytes(value.into()));
    }

    /// Unpadded content length.
    pub fn declared_length(&self) -> usize {
        self.members.iter().map(Member::byte_len).sum()
    }
}

/// A group node under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    pub kind: GroupKind,
    pub id: Tag,
    pub children: Vec<Node>,
}

impl Form {
    /// A plain `FORM` aggregate with the given subtype.
    pub fn new(id: Tag) -> Self {
        Form {
            kind: GroupKind::Form,
            id,
            children: Vec::new(),
        }
    }

    pub fn with_kind(kind: GroupKind, id: Tag) -> Self {
        Form {
            kind,
            id,
            children: Vec::new(),
        }
    }

    pub fn push(&mut self, child: impl Into<Node>) {
        self.children.push(child.into());
    }

    /// 4 bytes of subtype plus every child's on-disk size.
    pub fn declared_length(&self) -> usize {
        4 + self
            .children
            .iter()
            .map(Node::on_disk_size)
            .sum::<usize>()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.declared_length());
        write_form(self, &mut out);
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Form(Form),
    Chunk(Chunk),
}

impl From<Form> for Node {
    fn from(form: Form) -> Self {
        Node::Form(form)
    }
}

impl From<Chunk> for Node {
    fn from(chunk: Chunk) -> Self {
        Node::Chunk(chunk)
    }
}

impl Node {
    pub fn declared_length(&self) -> usize {
        match self {
            Node::Form(form) => form.declared_length(),
            Node::Chunk(chunk) => chunk.declared_length(),
        }
    }

    /// Header, content, and the pad byte when the content length is odd.
    pub fn on_disk_size(&self) -> usize {
        let length = self.declared_length();
        8 + length + (length & 1)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.on_disk_size());
        write_node(self, &mut out);
        out
    }
}

fn write_header(id: Tag, length: usize, out: &mut Vec<u8>) {
    out.extend_from_slice(id.as_bytes());
    out.extend_from_slice(&(length as i32).to_be_bytes());
}

fn write_form(form: &Form, out: &mut Vec<u8>) {
    let length = form.declared_length();
    write_header(form.kind.tag(), length, out);
    out.extend_from_slice(form.id.as_bytes());
    for child in &form.children {
        write_node(child, out);
    }
    if length % 2 == 1 {
        out.push(0);
    }
}

fn write_node(node: &Node, out: &mut Vec<u8>) {
    match node {
        Node::Form(form) => write_form(form, out),
        Node::Chunk(chunk) => {
            let length = chunk.declared_length();
            write_header(chunk.id, length, out);
            for member in &chunk.members {
                member.write_to(out);
            }
            if length % 2 == 1 {
                out.push(0);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::iff::tags;

    fn tag(bytes: &[u8; 4]) -> Tag {
        Tag::from_bytes(*bytes).unwrap()
    }

    #[test]
    fn even_chunk_has_no_pad() {
        let mut chunk = Chunk::new(tag(b"GONE"));
        chunk.push_long(42);
        let node = Node::from(chunk);
        assert_eq!(node.declared_length(), 4);
        assert_eq!(node.on_disk_size(), 12);
        assert_eq!(node.to_bytes(), b"GONE\x00\x00\x00\x04\x2A\x00\x00\x00");
    }

    #[test]
    fn odd_chunk_is_padded_but_length_is_unpadded() {
        let mut chunk = Chunk::new(tag(b"PONF"));
        chunk.push_float(1.5);
        chunk.push_cstring("sixteen chars!!!"); // 17 bytes with terminator
        chunk.push_long(-1);
        let node = Node::from(chunk);
        assert_eq!(node.declared_length(), 25);
        assert_eq!(node.on_disk_size(), 34);
        let bytes = node.to_bytes();
        assert_eq!(bytes.len(), 34);
        assert_eq!(&bytes[4..8], &25i32.to_be_bytes());
        assert_eq!(bytes[33], 0);
    }

    #[test]
    fn form_length_counts_children_on_disk() {
        let mut ponf = Chunk::new(tag(b"PONF"));
        ponf.push_float(1.5);
        ponf.push_cstring("sixteen chars!!!");
        ponf.push_long(-1);

        let mut gone = Chunk::new(tag(b"GONE"));
        gone.push_long(42);

        let mut form = Form::new(tag(b"FONG"));
        form.push(ponf);
        form.push(gone);
        form.push(Form::new(tags::EMPT));

        assert_eq!(form.declared_length(), 62);
        let bytes = form.to_bytes();
        assert_eq!(bytes.len(), 8 + 62);
        assert_eq!(&bytes[0..4], b"FORM");
        assert_eq!(&bytes[4..8], &62i32.to_be_bytes());
        assert_eq!(&bytes[8..12], b"FONG");
    }

    #[test]
    fn fibonacci_scenario_matches_reference_bytes() {
        let mut fib = Chunk::new(tag(b"FIB "));
        for value in [1, 1, 2, 3, 5, 8, 13] {
            fib.push_long(value);
        }
        let mut root = Form::new(tag(b"TEST"));
        root.push(fib);

        let expected: &[u8] = b"FORM\x00\x00\x00(TESTFIB \x00\x00\x00\x1C\
            \x01\x00\x00\x00\x01\x00\x00\x00\x02\x00\x00\x00\x03\x00\x00\x00\
            \x05\x00\x00\x00\x08\x00\x00\x00\x0D\x00\x00\x00";
        assert_eq!(root.to_bytes(), expected);

        let mut desc = Chunk::new(tag(b"DESC"));
        desc.push_cstring("the first seven fibonacci numbers");
        root.push(desc);
        let bytes = root.to_bytes();
        // Appended comment chunk: 34 content bytes, 42 on disk.
        assert_eq!(bytes.len(), 8 + 40 + 42);
    }

    #[test]
    fn writer_output_reads_back() {
        use crate::iff::read::{Node as RNode, read_root};

        let mut inner = Chunk::new(tag(b"DATA"));
        inner.push_cstring("abcd"); // 5 bytes with terminator, forces a pad
        let mut wrap = Form::new(tag(b"WRAP"));
        wrap.push(inner);
        let mut tail = Chunk::new(tag(b"TAIL"));
        tail.push_long(7);
        let mut root = Form::new(tag(b"ROOT"));
        root.push(wrap);
        root.push(tail);

        let bytes = root.to_bytes();
        let mut cursor = read_root(&bytes).unwrap();
        assert_eq!(cursor.id.as_str(), "ROOT");
        match cursor.read_node().unwrap() {
            RNode::Form(mut wrap) => {
                assert_eq!(wrap.id.as_str(), "WRAP");
                match wrap.read_node().unwrap() {
                    RNode::Chunk(chunk) => assert_eq!(chunk.data, b"abcd\x00"),
                    RNode::Form(_) => panic!("expected chunk"),
                }
                assert!(!wrap.has_more());
            }
            RNode::Chunk(_) => panic!("expected form"),
        }
        match cursor.read_node().unwrap() {
            RNode::Chunk(chunk) => {
                assert_eq!(chunk.id.as_str(), "TAIL");
                assert_eq!(chunk.data, &7i32.to_le_bytes());
            }
            RNode::Form(_) => panic!("expected chunk"),
        }
        assert!(!cursor.has_more());
    }
}
