//! Type name hashing and payload checksums.

use super::{Error, Result};

/// Seed for MurmurHash3 when hashing canonical type names.
pub const TYPE_ID_SEED: u32 = 42;

/// Hash a canonical type name into its 64-bit wire id (first Murmur3 lane).
#[inline]
pub fn hash_type_name(canonical: &str) -> u64 {
    murmur3::hash128_with_seed(canonical.as_bytes(), TYPE_ID_SEED).0
}

/// CRC32C (Castagnoli) of a byte slice.
#[inline]
pub fn crc32c(data: &[u8]) -> u32 {
    crc32c::crc32c(data)
}

/// Verify a stored CRC32C against the payload it covers.
pub fn verify_crc32c(data: &[u8], expected: u32) -> Result<()> {
    let actual = crc32c(data);
    if actual != expected {
        return Err(Error::ChecksumMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32c_check_value() {
        assert_eq!(crc32c(b"123456789"), 0xe3069283);
        assert_eq!(crc32c(b"hello"), 0x9a71bb4c);
    }

    #[test]
    fn test_verify_crc32c() {
        assert!(verify_crc32c(b"hello", 0x9a71bb4c).is_ok());
        assert!(matches!(
            verify_crc32c(b"hello", 0x9a71bb4d),
            Err(Error::ChecksumMismatch { expected: 0x9a71bb4d, actual: 0x9a71bb4c })
        ));
    }

    #[test]
    fn test_type_name_hash() {
        assert_eq!(hash_type_name("uint8"), 0xd35548ddb93899d1);
        assert_eq!(hash_type_name("Array<uint8>"), 0x8d5a10f5f64d161c);
        assert_ne!(hash_type_name("int32"), hash_type_name("uint32"));
    }
}
