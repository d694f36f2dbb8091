//! Control bytes and the group matcher.
//!
//! Every slot owns one control byte: `EMPTY` (0x80), `DELETED` (0xFE, a
//! tombstone), or a 7-bit fingerprint of the slot's hash with the top bit
//! clear. Control bytes are packed eight to a 64-bit word and the words are
//! stored as `AtomicU64` so that a writer's byte publication is a release
//! store of the containing word and a racing optimistic reader always
//! observes each byte whole.
//!
//! [`Group`] loads one probe group's worth of control bytes and answers the
//! three matcher queries (`match_tag`, `match_empty`, `match_tombstone`) as
//! packed [`BitMask`]es. Two implementations exist: a portable SWAR matcher
//! operating on one 64-bit word (8 slots per group, the default) and an
//! SSE2 matcher operating on a 16-byte vector (16 slots per group, behind
//! the `simd` feature). SWAR is the default because it is portable and
//! benchmarked faster on the hardware this crate was profiled on.

use core::sync::atomic::AtomicU64;
use core::sync::atomic::Ordering;

use cfg_if::cfg_if;

mod bitmask;

pub(crate) use bitmask::BitMask;

cfg_if! {
    if #[cfg(all(
        feature = "simd",
        any(target_arch = "x86", target_arch = "x86_64"),
        target_feature = "sse2"
    ))] {
        mod sse2;
        pub(crate) use sse2::Group;
    } else {
        mod swar;
        pub(crate) use swar::Group;
    }
}

/// Control byte marking a slot that has never held an entry.
///
/// Chosen with the sign bit set so a fingerprint (top bit clear) can never
/// alias it.
pub(crate) const EMPTY: u8 = 0x80;

/// Control byte marking a tombstone: the slot once held an entry, must be
/// skipped by lookups, and may be reused by inserts.
pub(crate) const DELETED: u8 = 0xFE;

/// Number of control bytes packed into one `AtomicU64` word.
pub(crate) const WORD_LANES: usize = 8;

/// Returns `true` if the control byte holds a fingerprint (slot is live).
#[inline(always)]
pub(crate) fn is_full(ctrl: u8) -> bool {
    ctrl & 0x80 == 0
}

/// Reads the control byte for an absolute slot index.
///
/// Byte `i % 8` of a word is its i-th little-endian byte, so the shift
/// arithmetic is identical on every platform.
///
/// # Safety
///
/// `words` must point to at least `idx / 8 + 1` valid words.
#[inline(always)]
pub(crate) unsafe fn ctrl_byte(words: *const AtomicU64, idx: usize) -> u8 {
    // SAFETY: The caller guarantees `idx / WORD_LANES` is in bounds.
    let word = unsafe { &*words.add(idx / WORD_LANES) }.load(Ordering::Acquire);
    (word >> ((idx % WORD_LANES) * 8)) as u8
}

/// Writes the control byte for an absolute slot index.
///
/// The store releases the whole containing word, which is what publishes a
/// freshly written entry to optimistic readers (the key and value cells
/// must already be written).
///
/// # Safety
///
/// `words` must point to at least `idx / 8 + 1` valid words, and the caller
/// must be the unique writer of the word (the read-modify-write is not
/// atomic as a whole).
#[inline(always)]
pub(crate) unsafe fn set_ctrl_byte(words: *const AtomicU64, idx: usize, value: u8) {
    // SAFETY: The caller guarantees the word index is in bounds.
    let word = unsafe { &*words.add(idx / WORD_LANES) };
    let shift = (idx % WORD_LANES) * 8;
    let mask = 0xFFu64 << shift;
    let old = word.load(Ordering::Relaxed);
    word.store((old & !mask) | ((value as u64) << shift), Ordering::Release);
}
