//! SSE2 matcher: a 16-byte vector compare covers 16 slots per group.

#[cfg(target_arch = "x86")]
use core::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;
use core::sync::atomic::AtomicU64;
use core::sync::atomic::Ordering;

use super::BitMask;
use super::DELETED;
use super::EMPTY;

/// One probe group of control bytes, loaded as a 16-byte vector.
///
/// Lane `i` of the vector is logical byte `i` of the group, i.e. the i-th
/// little-endian byte of the two underlying control words.
#[derive(Copy, Clone)]
pub(crate) struct Group(__m128i);

impl Group {
    /// Slots per probe group.
    pub(crate) const WIDTH: usize = 16;

    /// Loads the two control words backing group `group`.
    ///
    /// The 16-byte load is performed as two word-sized acquire loads so
    /// each control byte is observed whole; a group snapshot may tear
    /// between the two words, which is harmless because every byte is
    /// independently meaningful and the callers re-validate races.
    ///
    /// # Safety
    ///
    /// `words` must point to at least `2 * group + 2` valid words.
    #[inline(always)]
    pub(crate) unsafe fn load(words: *const AtomicU64, group: usize) -> Group {
        // SAFETY: The caller guarantees both word indices are in bounds.
        let lo = unsafe { &*words.add(2 * group) }.load(Ordering::Acquire);
        let hi = unsafe { &*words.add(2 * group + 1) }.load(Ordering::Acquire);
        // SAFETY: SSE2 is statically required for this module.
        Group(unsafe { _mm_set_epi64x(hi as i64, lo as i64) })
    }

    /// Returns a mask of lanes whose byte equals `b`.
    #[inline(always)]
    pub(crate) fn match_tag(self, b: u8) -> BitMask {
        // SAFETY: SSE2 is statically required for this module.
        unsafe {
            let cmp = _mm_cmpeq_epi8(self.0, _mm_set1_epi8(b as i8));
            BitMask(_mm_movemask_epi8(cmp) as u16)
        }
    }

    /// Returns a mask of lanes holding the EMPTY sentinel.
    #[inline(always)]
    pub(crate) fn match_empty(self) -> BitMask {
        self.match_tag(EMPTY)
    }

    /// Returns a mask of lanes holding a tombstone.
    #[inline(always)]
    pub(crate) fn match_tombstone(self) -> BitMask {
        self.match_tag(DELETED)
    }
}
