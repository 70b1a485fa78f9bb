//! MurmurHash3 x64_128 implementation.
//!
//! Original algorithm by Austin Appleby. All rights to the original belong to the author.
//! Output is defined over little-endian 64-bit lanes and is identical on every host,
//! so hashes can be persisted and compared across processes and machines.

const C1: u64 = 0x87c37b91114253d5;
const C2: u64 = 0x4cf5ad432745937f;

/// Compute MurmurHash3 x64_128 with seed 0.
///
/// Returns the two 64-bit lanes as (h1, h2).
#[inline]
pub fn hash128(data: &[u8]) -> (u64, u64) {
    hash128_with_seed(data, 0)
}

/// Compute MurmurHash3 x64_128 with the given seed.
///
/// Both lanes start from the (zero-extended) seed, as in the reference implementation.
pub fn hash128_with_seed(data: &[u8], seed: u32) -> (u64, u64) {
    let len = data.len();
    let mut h1 = seed as u64;
    let mut h2 = seed as u64;

    let mut blocks = data.chunks_exact(16);
    for block in &mut blocks {
        let k1 = read_lane(&block[..8]);
        let k2 = read_lane(&block[8..]);

        h1 ^= mix_k1(k1);
        h1 = h1.rotate_left(27);
        h1 = h1.wrapping_add(h2);
        h1 = h1.wrapping_mul(5).wrapping_add(0x52dce729);

        h2 ^= mix_k2(k2);
        h2 = h2.rotate_left(31);
        h2 = h2.wrapping_add(h1);
        h2 = h2.wrapping_mul(5).wrapping_add(0x38495ab5);
    }

    // Tail: up to 15 bytes, k2 takes bytes 8.. and k1 takes bytes ..8
    let tail = blocks.remainder();
    if tail.len() > 8 {
        h2 ^= mix_k2(read_lane(&tail[8..]));
    }
    if !tail.is_empty() {
        h1 ^= mix_k1(read_lane(&tail[..tail.len().min(8)]));
    }

    h1 ^= len as u64;
    h2 ^= len as u64;

    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);

    h1 = fmix64(h1);
    h2 = fmix64(h2);

    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);

    (h1, h2)
}

/// Compute hash and return as 16-byte array (h1 then h2, little-endian).
#[inline]
pub fn hash128_bytes(data: &[u8], seed: u32) -> [u8; 16] {
    let (h1, h2) = hash128_with_seed(data, seed);
    let mut result = [0u8; 16];
    result[0..8].copy_from_slice(&h1.to_le_bytes());
    result[8..16].copy_from_slice(&h2.to_le_bytes());
    result
}

/// Assemble up to 8 bytes into a little-endian lane, zero-filling the rest.
#[inline]
fn read_lane(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .enumerate()
        .fold(0u64, |acc, (i, &b)| acc | ((b as u64) << (8 * i)))
}

#[inline]
fn mix_k1(k1: u64) -> u64 {
    k1.wrapping_mul(C1).rotate_left(31).wrapping_mul(C2)
}

#[inline]
fn mix_k2(k2: u64) -> u64 {
    k2.wrapping_mul(C2).rotate_left(33).wrapping_mul(C1)
}

/// Final mix function for 64-bit values.
#[inline]
fn fmix64(mut h: u64) -> u64 {
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51afd7ed558ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ceb9fe1a85ec53);
    h ^= h >> 33;
    h
}
