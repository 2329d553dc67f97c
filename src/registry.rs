//! Texture/material numbering for one conversion.
//!
//! A [`TextureRegistry`] is created per file and discarded afterwards; it is
//! never shared between conversions. Image-backed materials receive
//! sequential numbers starting at a caller-chosen base, in first-encountered
//! order across all LODs. Flat-colour materials encode their quantized RGB
//! directly into the number under a reserved marker byte.

/// High-byte marker identifying a flat-colour texture number.
pub const FLAT_COLOUR_MARKER: u32 = 0x7F00_0000;

/// Per-conversion texture number assignment.
#[derive(Debug, Clone)]
pub struct TextureRegistry {
    base: i32,
    names: Vec<String>,
}

impl TextureRegistry {
    pub fn new(base: i32) -> Self {
        TextureRegistry {
            base,
            names: Vec::new(),
        }
    }

    /// The base number, also used as the default id for materials without an
    /// image texture.
    pub fn base(&self) -> i32 {
        self.base
    }

    /// Number for an image basename, assigning `base + n` on first sight.
    pub fn texnum_for_image(&mut self, basename: &str) -> i32 {
        if let Some(index) = self.names.iter().position(|name| name == basename) {
            self.base + index as i32
        } else {
            self.names.push(basename.to_owned());
            self.base + (self.names.len() - 1) as i32
        }
    }

    /// All `(texnum, basename)` assignments in assignment order.
    pub fn assignments(&self) -> impl Iterator<Item = (i32, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(index, name)| (self.base + index as i32, name.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Encode a quantized RGB triple as a flat-colour texture number.
pub fn flat_colour_texnum(rgb: [f32; 3]) -> i32 {
    let quantize = |channel: f32| (channel.clamp(0.0, 1.0) * 255.0).round() as u32;
    let packed =
        FLAT_COLOUR_MARKER | (quantize(rgb[0]) << 16) | (quantize(rgb[1]) << 8) | quantize(rgb[2]);
    packed as i32
}

/// Decode a flat-colour texture number back to its RGB triple, or `None` if
/// the number does not carry the marker byte.
pub fn texnum_colour(texnum: i32) -> Option<[f32; 3]> {
    let value = texnum as u32;
    if value & 0xFF00_0000 != FLAT_COLOUR_MARKER {
        return None;
    }
    Some([
        ((value >> 16) & 0xFF) as f32 / 255.0,
        ((value >> 8) & 0xFF) as f32 / 255.0,
        (value & 0xFF) as f32 / 255.0,
    ])
}
