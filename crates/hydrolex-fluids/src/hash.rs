//! Cell quantization and hashing for the spatial grids.
//!
//! Cell keys are 32-bit FNV-1 hashes of the integer cell coordinate. Distinct cells may collide;
//! callers always re-check distances, so a collision only costs a few rejected candidates.

use glam::{IVec3, Vec3};

const FNV_OFFSET_BASIS: u32 = 2166136261;
const FNV_PRIME: u32 = 16777619;

/// Offsets of the 3×3×3 block of cells around (and including) a cell.
pub const NEIGHBOR_OFFSETS: [IVec3; 27] = {
    let mut offsets = [IVec3::ZERO; 27];
    let mut i = 0;
    while i < 27 {
        offsets[i] = IVec3::new(i as i32 / 9 - 1, (i as i32 / 3) % 3 - 1, i as i32 % 3 - 1);
        i += 1;
    }
    offsets
};

/// Integer coordinate of the cell of size `cell_size` containing `position`.
#[inline(always)]
pub fn quantize(position: Vec3, cell_size: f32) -> IVec3 {
    (position / cell_size).floor().as_ivec3()
}

/// FNV-1 (multiply, then xor) over the little-endian bytes of x, y and z in that order.
#[inline]
pub fn hash(cell: IVec3) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;

    for axis in cell.to_array() {
        for b in axis.to_le_bytes() {
            hash = hash.wrapping_mul(FNV_PRIME);
            hash ^= b as u32;
        }
    }

    hash
}

#[inline(always)]
pub fn hash_position(position: Vec3, cell_size: f32) -> u32 {
    hash(quantize(position, cell_size))
}

/// Keys of the 27 cells surrounding `cell`.
pub fn neighborhood(cell: IVec3) -> impl Iterator<Item = u32> {
    NEIGHBOR_OFFSETS.into_iter().map(move |offset| hash(cell.wrapping_add(offset)))
}
