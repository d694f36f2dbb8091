//! Hash smearing and splitting.
//!
//! Every operation funnels the key's hash through the same pipeline: fold
//! the 64-bit hasher output to 32 bits, XOR-smear the high half into the
//! low half to repair weak low-bit entropy, then split the result into H1
//! (which picks the starting probe group) and H2 (a 7-bit fingerprint
//! stored in the slot's control byte). The sharded wrapper additionally
//! takes its shard index from the *top* of the smeared hash so that shard
//! selection never overlaps the bits H2 and the in-table probe consume.

use core::hash::BuildHasher;
use core::hash::Hash;

/// Bits of the smeared hash that select the starting group.
const H1_MASK: u32 = 0xFFFF_FF80;

/// Low 7 bits of the smeared hash, stored in the control byte.
const H2_MASK: u32 = 0x0000_007F;

/// Folds a 64-bit hash to 32 bits and smears the high half into the low
/// half.
///
/// The fold keeps entropy from both halves of the hasher output; the
/// `h ^ (h >> 16)` smear then spreads high bits into the low positions
/// that the group mask and fingerprint consume.
#[inline(always)]
pub(crate) fn smear(hash: u64) -> u32 {
    let h = (hash ^ (hash >> 32)) as u32;
    h ^ (h >> 16)
}

/// Group selector: the upper 25 bits of the smeared hash.
#[inline(always)]
pub(crate) fn h1(smeared: u32) -> usize {
    ((smeared & H1_MASK) >> 7) as usize
}

/// Control-byte fingerprint: the low 7 bits of the smeared hash.
///
/// The top bit is always clear, so a fingerprint can never collide with
/// the EMPTY or DELETED sentinels.
#[inline(always)]
pub(crate) fn h2(smeared: u32) -> u8 {
    (smeared & H2_MASK) as u8
}

/// Shard selector: the top `shard_bits` bits of the smeared hash.
#[inline(always)]
pub(crate) fn shard_of(smeared: u32, shard_bits: u32) -> usize {
    if shard_bits == 0 {
        0
    } else {
        (smeared >> (32 - shard_bits)) as usize
    }
}

/// Hashes `key` with `build_hasher` and smears the result.
#[inline]
pub(crate) fn smeared_hash<Q, S>(build_hasher: &S, key: &Q) -> u32
where
    Q: Hash + ?Sized,
    S: BuildHasher,
{
    smear(build_hasher.hash_one(key))
}

#[cfg(test)]
mod tests {
    use core::hash::Hasher;

    use siphasher::sip::SipHasher;

    use super::*;

    #[test]
    fn h2_top_bit_is_always_clear() {
        for seed in 0..10_000u64 {
            let s = smear(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15));
            assert!(h2(s) <= 0x7F);
        }
    }

    #[test]
    fn h1_drops_fingerprint_bits() {
        let s = 0xFFFF_FFFFu32;
        assert_eq!(h1(s), (0x01FF_FFFF) as usize);
        assert_eq!(h2(s), 0x7F);
        assert_eq!(h1(0x7F), 0);
    }

    #[test]
    fn smear_mixes_high_half() {
        // A hash with entropy only in the top 32 bits must still produce a
        // nonzero fingerprint for most inputs.
        let mut nonzero = 0;
        for seed in 1..1024u64 {
            let s = smear(seed << 32);
            if h2(s) != 0 || h1(s) != 0 {
                nonzero += 1;
            }
        }
        assert!(nonzero > 1000);
    }

    #[test]
    fn shard_uses_high_bits_only() {
        // Flipping any of the low 7 (fingerprint) bits must never change
        // the shard for any permitted shard_bits.
        for bits in 1..=crate::error::MAX_SHARD_BITS {
            let s = 0xA5A5_A5A5u32;
            for low in 0..128u32 {
                assert_eq!(shard_of(s, bits), shard_of(s ^ low, bits));
            }
            assert!(shard_of(u32::MAX, bits) < (1 << bits));
        }
        assert_eq!(shard_of(u32::MAX, 0), 0);
    }

    #[test]
    fn smeared_hash_is_deterministic() {
        struct FixedSip;
        impl core::hash::BuildHasher for FixedSip {
            type Hasher = SipHasher;
            fn build_hasher(&self) -> SipHasher {
                SipHasher::new_with_keys(1, 2)
            }
        }

        let a = smeared_hash(&FixedSip, &42u64);
        let b = smeared_hash(&FixedSip, &42u64);
        assert_eq!(a, b);

        let mut reference = SipHasher::new_with_keys(1, 2);
        42u64.hash(&mut reference);
        assert_eq!(a, smear(reference.finish()));
    }
}
