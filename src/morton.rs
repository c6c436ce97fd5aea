//! 2D Morton (Z-order) codes and spatial reordering.
//!
//! Positions are quantised onto a 32-bit grid over the simulation region and
//! their coordinate bits interleaved into a 64-bit key; sorting particles by
//! this key places spatial neighbours at nearby indices, which is what makes
//! chunked force evaluation cache-friendly.

use crate::quadtree::Bounds;

/// Spreads the low 32 bits of `v` into the even bit positions of a u64 using
/// magic-constant masks (`0b...dcba` becomes `0b...0d0c0b0a`).
#[inline]
pub fn split_by_2(v: u32) -> u64 {
    let mut x = v as u64;
    x = (x | x << 16) & 0x0000_ffff_0000_ffff;
    x = (x | x << 8) & 0x00ff_00ff_00ff_00ff;
    x = (x | x << 4) & 0x0f0f_0f0f_0f0f_0f0f;
    x = (x | x << 2) & 0x3333_3333_3333_3333;
    x = (x | x << 1) & 0x5555_5555_5555_5555;
    x
}

/// Inverse of [`split_by_2`]: gathers the even bits of `v` back into a u32.
#[inline]
fn compact_by_2(v: u64) -> u32 {
    let mut x = v & 0x5555_5555_5555_5555;
    x = (x | x >> 1) & 0x3333_3333_3333_3333;
    x = (x | x >> 2) & 0x0f0f_0f0f_0f0f_0f0f;
    x = (x | x >> 4) & 0x00ff_00ff_00ff_00ff;
    x = (x | x >> 8) & 0x0000_ffff_0000_ffff;
    x = (x | x >> 16) & 0x0000_0000_ffff_ffff;
    x as u32
}

/// 64-bit Morton code of a grid point: x occupies the even bits, y the odd.
#[inline]
pub fn morton_encode(ix: u32, iy: u32) -> u64 {
    split_by_2(ix) | (split_by_2(iy) << 1)
}

/// Bit-at-a-time interleave. Slower than [`morton_encode`]; retained as the
/// reference implementation the magic-constant path is tested against.
pub fn morton_encode_naive(ix: u32, iy: u32) -> u64 {
    let mut code = 0u64;
    for b in 0..32 {
        code |= (((ix >> b) & 1) as u64) << (2 * b);
        code |= (((iy >> b) & 1) as u64) << (2 * b + 1);
    }
    code
}

/// Recovers the quantised grid coordinates from a Morton code.
#[inline]
pub fn morton_decode(code: u64) -> (u32, u32) {
    (compact_by_2(code), compact_by_2(code >> 1))
}

/// Computes the permutation that visits particles in increasing Z-order over
/// `region`. Equal codes keep their original relative order (ties broken by
/// index), so sorting an already-sorted set yields the identity permutation.
pub fn zorder_permutation(pos_x: &[f64], pos_y: &[f64], region: Bounds) -> Vec<u32> {
    let scale_x = (u32::MAX as f64) / (region.x_max - region.x_min);
    let scale_y = (u32::MAX as f64) / (region.y_max - region.y_min);

    let mut entries: Vec<(u64, u32)> = pos_x
        .iter()
        .zip(pos_y)
        .enumerate()
        .map(|(i, (&x, &y))| {
            let ix = ((x - region.x_min) * scale_x) as u32;
            let iy = ((y - region.y_min) * scale_y) as u32;
            (morton_encode(ix, iy), i as u32)
        })
        .collect();
    entries.sort_unstable();
    entries.into_iter().map(|(_, i)| i).collect()
}

/// Applies `perm` to every array in `arrays` in place, gathering through a
/// single scratch buffer. All per-particle arrays must be permuted together:
/// a particle's identity is its index, and indices are not preserved across a
/// reordering.
pub fn apply_permutation(perm: &[u32], arrays: &mut [&mut [f64]]) {
    let mut scratch = vec![0.0f64; perm.len()];
    for arr in arrays.iter_mut() {
        debug_assert_eq!(arr.len(), perm.len());
        for (dst, &src) in scratch.iter_mut().zip(perm) {
            *dst = arr[src as usize];
        }
        arr.copy_from_slice(&scratch);
    }
}
