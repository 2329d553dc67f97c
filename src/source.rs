//! Textual compiler-source rendering of a container tree.
//!
//! The same tree the binary writer serializes can be rendered as source text
//! for the external mesh compiler toolchain: an `IFF "name.iff"` header, a
//! texture-assignment comment, and nested `FORM`/`CHUNK` blocks whose
//! members appear as `long`, `float` and `cstring` lines. Field order and
//! coordinate conventions are identical to the binary form; only the syntax
//! differs.

use std::fmt::Write as _;

use crate::iff::write::{Chunk, Form, Member, Node};
use crate::registry::TextureRegistry;

/// Render a container tree as compiler source.
///
/// `name` is the output mesh name written into the file header. The
/// registry's texture assignments are listed in a leading comment so a
/// modder can see which number each image received.
pub fn write_source(name: &str, root: &Form, registry: &TextureRegistry) -> String {
    let mut out = String::new();
    // The header must be the first line or the file will not compile.
    let _ = writeln!(out, "IFF \"{name}.iff\"");
    out.push('\n');

    if !registry.is_empty() {
        out.push_str("// Texture indices:\n");
        for (texnum, basename) in registry.assignments() {
            let _ = writeln!(out, "// {basename} --> {texnum}");
        }
        out.push('\n');
    }

    out.push_str("{\n");
    render_form(root, 1, &mut out);
    out.push_str("}\n");
    out
}

fn render_form(form: &Form, depth: usize, out: &mut String) {
    let pad = "  ".repeat(depth);
    let keyword = form.kind.tag();
    let _ = writeln!(out, "{pad}{} \"{}\"", keyword.as_str().trim_end(), form.id);
    let _ = writeln!(out, "{pad}{{");
    for child in &form.children {
        match child {
            Node::Form(inner) => render_form(inner, depth + 1, out),
            Node::Chunk(chunk) => render_chunk(chunk, depth + 1, out),
        }
    }
    let _ = writeln!(out, "{pad}}}");
}

fn render_chunk(chunk: &Chunk, depth: usize, out: &mut String) {
    let pad = "  ".repeat(depth);
    let inner = "  ".repeat(depth + 1);
    let _ = writeln!(out, "{pad}CHUNK \"{}\"", chunk.id);
    let _ = writeln!(out, "{pad}{{");
    for member in &chunk.members {
        match member {
            Member::Long(value) => {
                let _ = writeln!(out, "{inner}long {value}");
            }
            Member::Float(value) => {
                let _ = writeln!(out, "{inner}float {value:.6}");
            }
            Member::CString(text) => {
                let _ = writeln!(out, "{inner}cstring \"{text}\"");
            }
            Member::Bytes(bytes) => {
                // Opaque payloads have no source syntax.
                let _ = writeln!(out, "{inner}// {} raw bytes omitted", bytes.len());
            }
        }
    }
    let _ = writeln!(out, "{pad}}}");
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::iff::Tag;
    use crate::iff::tags;

    #[test]
    fn renders_nested_blocks_with_typed_members() {
        let mut rang = Chunk::new(tags::RANG);
        rang.push_float(0.0);
        rang.push_float(400.0);
        let mut name = Chunk::new(tags::NAME);
        name.push_cstring("ship");
        let mut count = Chunk::new(Tag::from_bytes(*b"CNT ").unwrap());
        count.push_long(-3);

        let mut inner = Form::new(tags::MESH);
        inner.push(name);
        inner.push(count);
        let mut root = Form::new(tags::DETA);
        root.push(rang);
        root.push(inner);

        let registry = TextureRegistry::new(22000);
        let text = write_source("ship", &root, &registry);
        let expected = "\
IFF \"ship.iff\"

{
  FORM \"DETA\"
  {
    CHUNK \"RANG\"
    {
      float 0.000000
      float 400.000000
    }
    FORM \"MESH\"
    {
      CHUNK \"NAME\"
      {
        cstring \"ship\"
      }
      CHUNK \"CNT \"
      {
        long -3
      }
    }
  }
}
";
        assert_eq!(text, expected);
    }

    #[test]
    fn lists_texture_assignments_in_the_header_comment() {
        let mut registry = TextureRegistry::new(22000);
        registry.texnum_for_image("hull.png");
        registry.texnum_for_image("wing.png");
        let root = Form::new(tags::DETA);
        let text = write_source("ship", &root, &registry);
        assert!(text.starts_with("IFF \"ship.iff\"\n"));
        assert!(text.contains("// hull.png --> 22000\n"));
        assert!(text.contains("// wing.png --> 22001\n"));
    }
}
