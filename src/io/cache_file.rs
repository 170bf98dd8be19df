//! Binary layout of the precomputed cost-table blob.
//!
//! Format (little-endian):
//! - Magic hash: u32 (4 bytes), the dataset hash of the estimator that
//!   wrote the blob
//! - Offsets: blocks x classes pairs of (i32 x, i32 z)
//! - Vertex costs: classes x blocks x 4 f32 values
//!
//! Any size or hash mismatch makes the blob a cache miss, never an error.

use crate::core::SquareCoord;

/// CRC-32 of a blob, kept as the cross-host sync anchor.
pub fn blob_checksum(bytes: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// Serialize the cost tables. `offsets` is the flat block-major,
/// class-minor table; `vertex_costs` the flat cost table.
pub fn encode(hash: u32, offsets: &[SquareCoord], vertex_costs: &[f32]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + offsets.len() * 8 + vertex_costs.len() * 4);

    buf.extend_from_slice(&hash.to_le_bytes());
    for offset in offsets {
        buf.extend_from_slice(&offset.x.to_le_bytes());
        buf.extend_from_slice(&offset.z.to_le_bytes());
    }
    for cost in vertex_costs {
        buf.extend_from_slice(&cost.to_le_bytes());
    }

    buf
}

/// Deserialize a blob into preallocated tables. Returns `false` (leaving
/// the tables untouched) when the blob does not match the expected hash or
/// the expected geometry.
pub fn decode(
    bytes: &[u8],
    expected_hash: u32,
    offsets: &mut [SquareCoord],
    vertex_costs: &mut [f32],
) -> bool {
    let expected_len = 4 + offsets.len() * 8 + vertex_costs.len() * 4;
    if bytes.len() != expected_len {
        return false;
    }

    let embedded = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
    if embedded != expected_hash {
        return false;
    }

    let mut pos = 4;
    for offset in offsets.iter_mut() {
        offset.x = i32::from_le_bytes(bytes[pos..pos + 4].try_into().unwrap());
        offset.z = i32::from_le_bytes(bytes[pos + 4..pos + 8].try_into().unwrap());
        pos += 8;
    }
    for cost in vertex_costs.iter_mut() {
        *cost = f32::from_le_bytes(bytes[pos..pos + 4].try_into().unwrap());
        pos += 4;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let offsets = vec![SquareCoord::new(3, 5), SquareCoord::new(-1, 7)];
        let costs = vec![1.5f32, f32::INFINITY, 0.0, 42.0];

        let blob = encode(0xdead_beef, &offsets, &costs);

        let mut out_offsets = vec![SquareCoord::default(); 2];
        let mut out_costs = vec![0.0f32; 4];
        assert!(decode(&blob, 0xdead_beef, &mut out_offsets, &mut out_costs));
        assert_eq!(out_offsets, offsets);
        assert_eq!(out_costs[0], 1.5);
        assert!(out_costs[1].is_infinite());
    }

    #[test]
    fn hash_mismatch_is_a_miss() {
        let blob = encode(1, &[SquareCoord::new(0, 0)], &[0.0; 4]);
        let mut offsets = vec![SquareCoord::default(); 1];
        let mut costs = vec![0.0f32; 4];
        assert!(!decode(&blob, 2, &mut offsets, &mut costs));
    }

    #[test]
    fn truncated_blob_is_a_miss() {
        let blob = encode(1, &[SquareCoord::new(0, 0)], &[0.0; 4]);
        let mut offsets = vec![SquareCoord::default(); 1];
        let mut costs = vec![0.0f32; 4];
        assert!(!decode(&blob[..blob.len() - 1], 1, &mut offsets, &mut costs));
    }

    #[test]
    fn checksum_is_stable() {
        let blob = encode(7, &[SquareCoord::new(1, 2)], &[3.0; 4]);
        assert_eq!(blob_checksum(&blob), blob_checksum(&blob.clone()));
    }
}
