//! Hardpoint, collision-sphere, and LOD-range record codecs.
//!
//! A hardpoint chunk is 12 `f32` fields read as a 3x4 block followed by a
//! null-terminated name. The position components interleave as the fourth
//! entry of each row with rows 2 and 3 swapped relative to a naive row-major
//! reading: row 0 ends in `x`, row 1 in `z`, row 2 in `y`. This is a
//! coordinate-handedness artifact of the source engine and is preserved
//! exactly on both read and write.

use tracing::warn;
use winnow::Parser;
use winnow::binary::le_f32;
use winnow::error::{ContextError, ErrMode};

use crate::error::{ErrorKind, IResult};
use crate::iff::{tags, write};
use crate::mesh::{Hardpoint, Sphere, read_cstring};

type WResult<T> = Result<T, ErrMode<ContextError>>;

fn parse_vec3(input: &mut &[u8]) -> WResult<[f32; 3]> {
    let x = le_f32.parse_next(input)?;
    let y = le_f32.parse_next(input)?;
    let z = le_f32.parse_next(input)?;
    Ok([x, y, z])
}

fn parse_transform_block(input: &mut &[u8]) -> WResult<([[f32; 3]; 3], [f32; 3])> {
    let mut rotation = [[0.0f32; 3]; 3];
    let mut trailing = [0.0f32; 3];
    for row in 0..3 {
        rotation[row] = parse_vec3(input)?;
        trailing[row] = le_f32.parse_next(input)?;
    }
    Ok((rotation, trailing))
}

/// Parse a hardpoint chunk payload.
pub fn parse_hardpoint(data: &[u8]) -> IResult<Hardpoint> {
    let input = &mut &data[..];
    let (rotation, trailing) = parse_transform_block(input)
        .map_err(|_| ErrorKind::UnexpectedEof { offset: 0 })?;
    let name = read_cstring(*input);
    // Trailing entries are x, z, y in row order.
    Ok(Hardpoint {
        rotation,
        position: [trailing[0], trailing[2], trailing[1]],
        name,
    })
}

/// Emit a hardpoint as a `HARD` chunk.
pub fn hardpoint_chunk(hardpoint: &Hardpoint) -> write::Chunk {
    let mut chunk = write::Chunk::new(tags::HARD);
    let [x, y, z] = hardpoint.position;
    for (row, component) in hardpoint.rotation.iter().zip([x, z, y]) {
        for &value in row {
            chunk.push_float(value);
        }
        chunk.push_float(component);
    }
    chunk.push_cstring(hardpoint.name.clone());
    chunk
}

/// Parse a collision sphere (`SPHR`) chunk payload.
pub fn parse_sphere(data: &[u8]) -> IResult<Sphere> {
    let input = &mut &data[..];
    let center = parse_vec3(input).map_err(|_| ErrorKind::UnexpectedEof { offset: 0 })?;
    let radius = le_f32
        .parse_next(input)
        .map_err(|_: ErrMode<ContextError>| ErrorKind::UnexpectedEof { offset: 12 })?;
    Ok(Sphere { center, radius })
}

/// Emit a collision sphere as a `SPHR` chunk.
pub fn sphere_chunk(sphere: &Sphere) -> write::Chunk {
    let mut chunk = write::Chunk::new(tags::SPHR);
    for value in sphere.center {
        chunk.push_float(value);
    }
    chunk.push_float(sphere.radius);
    chunk
}

/// Parse a LOD switch-distance (`RANG`) chunk payload: a flat f32 array.
pub fn parse_ranges(data: &[u8]) -> IResult<Vec<f32>> {
    if data.len() % 4 != 0 {
        warn!(len = data.len(), "RANG payload is not a multiple of 4 bytes");
    }
    Ok(data
        .chunks_exact(4)
        .map(|bytes| f32::from_le_bytes(bytes.try_into().expect("chunks_exact(4)")))
        .collect())
}

/// Emit LOD switch distances as a `RANG` chunk.
pub fn ranges_chunk(ranges: &[f32]) -> write::Chunk {
    let mut chunk = write::Chunk::new(tags::RANG);
    for &value in ranges {
        chunk.push_float(value);
    }
    chunk
}

/// Parse a far-plane range (`FAR `) chunk payload: near and far distances.
pub fn parse_far(data: &[u8]) -> IResult<[f32; 2]> {
    let input = &mut &data[..];
    let near = le_f32
        .parse_next(input)
        .map_err(|_: ErrMode<ContextError>| ErrorKind::UnexpectedEof { offset: 0 })?;
    let far = le_f32
        .parse_next(input)
        .map_err(|_: ErrMode<ContextError>| ErrorKind::UnexpectedEof { offset: 4 })?;
    Ok([near, far])
}

/// Emit a far-plane range as a `FAR ` chunk.
pub fn far_chunk(range: [f32; 2]) -> write::Chunk {
    let mut chunk = write::Chunk::new(tags::FAR);
    chunk.push_float(range[0]);
    chunk.push_float(range[1]);
    chunk
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::iff::write::Node;

    fn sample_hardpoint() -> Hardpoint {
        Hardpoint {
            rotation: [[1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]],
            position: [2.5, -7.0, 10.0],
            name: "gun-mount-1".to_owned(),
        }
    }

    #[test]
    fn hardpoint_round_trip() {
        let original = sample_hardpoint();
        let chunk = hardpoint_chunk(&original);
        let bytes = Node::from(chunk).to_bytes();
        // Strip the 8-byte header and the pad byte to get the payload.
        let payload = &bytes[8..8 + 12 * 4 + original.name.len() + 1];
        let parsed = parse_hardpoint(payload).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn hardpoint_position_interleave() {
        // Rows end in x, z, y respectively.
        let mut payload = Vec::new();
        for value in [
            1.0f32, 0.0, 0.0, 5.0, // row 0, x = 5
            0.0, 1.0, 0.0, 7.0, // row 1, z = 7
            0.0, 0.0, 1.0, 6.0, // row 2, y = 6
        ] {
            payload.extend_from_slice(&value.to_le_bytes());
        }
        payload.extend_from_slice(b"hp\x00");
        let parsed = parse_hardpoint(&payload).unwrap();
        assert_eq!(parsed.position, [5.0, 6.0, 7.0]);
        assert_eq!(parsed.name, "hp");
    }

    #[test]
    fn sphere_round_trip() {
        let sphere = Sphere {
            center: [1.0, 2.0, 3.0],
            radius: 40.5,
        };
        let chunk = sphere_chunk(&sphere);
        let bytes = Node::from(chunk).to_bytes();
        assert_eq!(parse_sphere(&bytes[8..]).unwrap(), sphere);
    }

    #[test]
    fn ranges_round_trip() {
        let ranges = vec![0.0f32, 400.0, 800.0];
        let chunk = ranges_chunk(&ranges);
        let bytes = Node::from(chunk).to_bytes();
        assert_eq!(parse_ranges(&bytes[8..]).unwrap(), ranges);
    }

    #[test]
    fn truncated_sphere_fails() {
        assert!(parse_sphere(&[0u8; 8]).is_err());
    }
}
