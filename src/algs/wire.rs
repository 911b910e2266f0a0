//! Byte views of halo payloads.
//!
//! Slabs travel as native-endian `f64` arrays; every rank of a world runs the
//! same binary on the same kind of node, so no byte swapping is done.

use bytemuck::Pod;

use crate::stencil_error::StencilError;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

/// Decode a payload of exactly `expected` values.
///
/// The payload is copied, so the byte buffer need not be aligned for `T`.
pub fn decode_exact<T: Pod>(bytes: &[u8], expected: usize) -> Result<Vec<T>, StencilError> {
    let width = std::mem::size_of::<T>();
    if bytes.len() != expected * width {
        return Err(StencilError::SizeMismatch {
            expected: expected * width,
            found: bytes.len(),
        });
    }
    Ok(bytes
        .chunks_exact(width)
        .map(bytemuck::pod_read_unaligned)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_from_unaligned_offsets() {
        let values = [1.5f64, -2.25, 1e300];
        let mut shifted = vec![0u8];
        shifted.extend_from_slice(cast_slice(&values));
        let back: Vec<f64> = decode_exact(&shifted[1..], 3).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn rejects_short_payloads() {
        let bytes = cast_slice(&[1.0f64, 2.0]).to_vec();
        assert_eq!(
            decode_exact::<f64>(&bytes[..12], 2),
            Err(StencilError::SizeMismatch {
                expected: 16,
                found: 12
            })
        );
    }
}
