//! The open-addressed table core.
//!
//! `RawTable<K, V>` owns three parallel planes in one type-erased
//! allocation: packed control words, key cells, and value cells.
//! `[ Ctrl | Keys | Vals ]`
//!
//! A slot's key and value cells are initialized iff its control byte holds
//! a fingerprint; EMPTY and DELETED slots hold no data. All probing is
//! group-wise: the control bytes for a whole group are loaded at once and
//! matched through the [`Group`](crate::group::Group) matcher, and the
//! probe advances over groups in triangular order.
//!
//! ## Rehashing
//!
//! Two distinct triggers rebuild the table:
//!
//! - *Over-load*: `live + tombstones` reaching the load threshold doubles
//!   the capacity.
//! - *Tombstone saturation*: once tombstones reach half the live count the
//!   table is rebuilt at the **same** capacity. Quadratic probing rules
//!   out backward-shift deletion, so deletion-heavy workloads would
//!   otherwise either accumulate tombstones without bound or double
//!   capacity for no gain.
//!
//! A rebuild drains every live entry into a fresh allocation using an
//! EMPTY-only probe (a fresh table has no tombstones) and leaves the old
//! table vacated. The single-threaded paths swap the fresh table into
//! place; the concurrent wrapper instead publishes it as a replacement so
//! racing optimistic readers can keep probing the retired allocation until
//! their stamps fail validation.
//!
//! ## Publication order
//!
//! Inserts write the key cell, then the value cell, then release-store the
//! control word with the new fingerprint. Erases release-store the
//! tombstone first and then vacate the cells. An optimistic reader
//! therefore never observes a fingerprint whose cells were not fully
//! written at the time of the store; any overlap with an in-flight write
//! is caught by the reader's stamp validation before the copied bits are
//! interpreted.

use core::borrow::Borrow;
use core::fmt::Debug;
use core::marker::PhantomData;
use core::mem;
use core::mem::MaybeUninit;
use core::ptr;
use core::ptr::NonNull;
use core::sync::atomic::AtomicU64;
use std::alloc::handle_alloc_error;
use std::alloc::Layout;

use crate::group::ctrl_byte;
use crate::group::is_full;
use crate::group::set_ctrl_byte;
use crate::group::Group;
use crate::group::DELETED;
use crate::group::EMPTY;
use crate::group::WORD_LANES;
use crate::hash::h1;
use crate::hash::h2;
use crate::probe::ProbeSeq;
use crate::probe::RandomCycle;

/// A control word holding EMPTY in every lane.
const EMPTY_WORD: u64 = u64::from_ne_bytes([EMPTY; 8]);

/// Rounds a requested minimum capacity up to a power-of-two number of
/// groups, with at least one group.
#[inline]
fn capacity_for(min_capacity: usize) -> usize {
    let groups = min_capacity
        .div_ceil(Group::WIDTH)
        .max(1)
        .next_power_of_two();
    groups * Group::WIDTH
}

/// `max_load = clamp(floor(capacity * load_factor), 1, capacity - 1)`.
///
/// The clamp guarantees the table always admits one entry and always keeps
/// at least one EMPTY slot, which is what terminates unsuccessful probes.
#[inline]
fn max_load_for(capacity: usize, load_factor: f64) -> usize {
    ((capacity as f64 * load_factor) as usize).clamp(1, capacity - 1)
}

/// Which kind of rebuild the rehash controller has decided on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Rehash {
    /// Double the capacity; triggered by the load threshold.
    Grow,
    /// Rebuild at the current capacity; triggered by tombstone
    /// saturation. Compacts every tombstone back to EMPTY.
    Compact,
}

#[derive(Clone, Copy)]
struct DataLayout {
    layout: Layout,
    keys_offset: usize,
    vals_offset: usize,
}

impl DataLayout {
    fn new<K, V>(capacity: usize) -> Self {
        let words = capacity / WORD_LANES;
        let ctrl_layout = Layout::array::<AtomicU64>(words).expect("allocation size overflow");
        let keys_layout =
            Layout::array::<MaybeUninit<K>>(capacity).expect("allocation size overflow");
        let vals_layout =
            Layout::array::<MaybeUninit<V>>(capacity).expect("allocation size overflow");

        let (layout, keys_offset) = ctrl_layout.extend(keys_layout).unwrap();
        let (layout, vals_offset) = layout.extend(vals_layout).unwrap();

        DataLayout {
            layout,
            keys_offset,
            vals_offset,
        }
    }
}

/// The table core. Single-owner: thread safety lives entirely in the
/// sharded wrapper.
pub(crate) struct RawTable<K, V> {
    layout: DataLayout,
    alloc: NonNull<u8>,

    capacity: usize,
    group_mask: usize,
    live: usize,
    tombstones: usize,
    max_load: usize,
    load_factor: f64,

    _marker: PhantomData<(K, V)>,
}

// SAFETY: The raw allocation is owned exclusively by the table; the
// pointers never alias another table's storage. Sending or sharing the
// table is sound whenever the cell types themselves allow it.
unsafe impl<K: Send, V: Send> Send for RawTable<K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for RawTable<K, V> {}

impl<K, V> RawTable<K, V> {
    /// Creates a table with room for at least `min_capacity` slots.
    ///
    /// The capacity is rounded up to a power-of-two multiple of the group
    /// width; there is no zero-capacity state. `load_factor` must already
    /// be validated to lie in (0, 1).
    pub(crate) fn with_capacity_and_load_factor(min_capacity: usize, load_factor: f64) -> Self {
        debug_assert!(load_factor > 0.0 && load_factor < 1.0);

        let capacity = capacity_for(min_capacity);
        let layout = DataLayout::new::<K, V>(capacity);
        // SAFETY: The layout covers at least one group of control bytes,
        // so its size is non-zero. Allocation failure is handled, and the
        // control plane is initialized to EMPTY before the pointer
        // escapes (the byte fill is a valid initialization of the
        // `AtomicU64` words).
        let alloc = unsafe {
            let raw = std::alloc::alloc(layout.layout);
            if raw.is_null() {
                handle_alloc_error(layout.layout);
            }
            ptr::write_bytes(raw, EMPTY, capacity);
            NonNull::new_unchecked(raw)
        };

        Self {
            layout,
            alloc,
            capacity,
            group_mask: capacity / Group::WIDTH - 1,
            live: 0,
            tombstones: 0,
            max_load: max_load_for(capacity, load_factor),
            load_factor,
            _marker: PhantomData,
        }
    }

    /// Total slot count. Always a power-of-two multiple of the group
    /// width.
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live entries.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.live
    }

    /// Number of tombstoned slots.
    #[inline]
    pub(crate) fn tombstones(&self) -> usize {
        self.tombstones
    }

    /// Load threshold: the table rebuilds before `live + tombstones`
    /// passes this.
    #[inline]
    pub(crate) fn max_load(&self) -> usize {
        self.max_load
    }

    #[inline]
    fn group_count(&self) -> usize {
        self.group_mask + 1
    }

    #[inline]
    fn ctrl_ptr(&self) -> *const AtomicU64 {
        self.alloc.as_ptr() as *const AtomicU64
    }

    #[inline]
    fn keys_ptr(&self) -> *mut MaybeUninit<K> {
        // SAFETY: `keys_offset` is within the allocation by construction.
        unsafe { self.alloc.as_ptr().add(self.layout.keys_offset) as *mut MaybeUninit<K> }
    }

    #[inline]
    fn vals_ptr(&self) -> *mut MaybeUninit<V> {
        // SAFETY: `vals_offset` is within the allocation by construction.
        unsafe { self.alloc.as_ptr().add(self.layout.vals_offset) as *mut MaybeUninit<V> }
    }

    /// Reads the control byte of slot `idx`.
    ///
    /// # Safety
    ///
    /// `idx` must be less than `self.capacity`.
    #[inline]
    unsafe fn ctrl(&self, idx: usize) -> u8 {
        // SAFETY: Bounds guaranteed by the caller.
        unsafe { ctrl_byte(self.ctrl_ptr(), idx) }
    }

    /// Writes the control byte of slot `idx` with a release store.
    ///
    /// # Safety
    ///
    /// `idx` must be less than `self.capacity`.
    #[inline]
    unsafe fn set_ctrl(&self, idx: usize, value: u8) {
        // SAFETY: Bounds guaranteed by the caller; `&mut self` on every
        // mutating caller makes this table the unique writer.
        unsafe { set_ctrl_byte(self.ctrl_ptr(), idx, value) }
    }

    #[inline]
    fn group_at(&self, group: usize) -> Group {
        debug_assert!(group <= self.group_mask);
        // SAFETY: `group` is within the control plane.
        unsafe { Group::load(self.ctrl_ptr(), group) }
    }

    /// Returns the key stored in a live slot.
    ///
    /// # Safety
    ///
    /// `idx` must be in bounds and its control byte must be a fingerprint.
    #[inline]
    pub(crate) unsafe fn key_at(&self, idx: usize) -> &K {
        // SAFETY: A fingerprint control byte guarantees the cell is
        // initialized.
        unsafe { (*self.keys_ptr().add(idx)).assume_init_ref() }
    }

    /// Returns the value stored in a live slot.
    ///
    /// # Safety
    ///
    /// `idx` must be in bounds and its control byte must be a fingerprint.
    #[inline]
    pub(crate) unsafe fn value_at(&self, idx: usize) -> &V {
        // SAFETY: A fingerprint control byte guarantees the cell is
        // initialized.
        unsafe { (*self.vals_ptr().add(idx)).assume_init_ref() }
    }

    /// Returns the value stored in a live slot, mutably.
    ///
    /// # Safety
    ///
    /// `idx` must be in bounds and its control byte must be a fingerprint.
    #[inline]
    pub(crate) unsafe fn value_at_mut(&mut self, idx: usize) -> &mut V {
        // SAFETY: A fingerprint control byte guarantees the cell is
        // initialized.
        unsafe { (*self.vals_ptr().add(idx)).assume_init_mut() }
    }

    /// Looks up the slot holding `key`, if any.
    ///
    /// Walks the triangular probe sequence from the key's H1; within each
    /// group, only slots whose fingerprint matches H2 are compared. The
    /// probe stops at the first group containing an EMPTY slot (the entry
    /// cannot live past it) or after visiting every group.
    pub(crate) fn find<Q>(&self, smeared: u32, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        if self.live == 0 {
            return None;
        }

        let tag = h2(smeared);
        let mut seq = ProbeSeq::new(h1(smeared), self.group_mask);
        let mut visited = 0;
        loop {
            let group = self.group_at(seq.group());
            let base = seq.group() * Group::WIDTH;
            for lane in group.match_tag(tag) {
                let idx = base + lane;
                // SAFETY: A matching fingerprint implies a live slot.
                if unsafe { self.key_at(idx) }.borrow() == key {
                    return Some(idx);
                }
            }
            if group.match_empty().any() {
                return None;
            }
            visited += 1;
            if visited >= self.group_count() {
                return None;
            }
            seq.advance();
        }
    }

    /// Inserts or overwrites, running the rehash controller first.
    ///
    /// Returns the previous value when `key` was already present.
    /// `hasher` recomputes smeared hashes for displaced entries during a
    /// rebuild.
    pub(crate) fn put(
        &mut self,
        smeared: u32,
        key: K,
        value: V,
        hasher: &impl Fn(&K) -> u32,
    ) -> Option<V>
    where
        K: Eq,
    {
        self.run_rehash_controller(hasher);
        self.put_within_capacity(smeared, key, value)
    }

    /// Inserts or overwrites without consulting the rehash controller.
    ///
    /// The caller must have ensured spare capacity (the controller ran, or
    /// the table was pre-sized). Walks the probe sequence remembering the
    /// first tombstone seen; on reaching a group with an EMPTY slot the
    /// entry lands in that tombstone if one was found, else in the EMPTY
    /// slot.
    ///
    /// # Panics
    ///
    /// Panics if the probe visits every group without finding an EMPTY
    /// slot. The rehash controller makes that state unreachable; hitting
    /// it means the capacity contract was violated.
    pub(crate) fn put_within_capacity(&mut self, smeared: u32, key: K, value: V) -> Option<V>
    where
        K: Eq,
    {
        let tag = h2(smeared);
        let mut seq = ProbeSeq::new(h1(smeared), self.group_mask);
        let mut first_tombstone: Option<usize> = None;
        let mut visited = 0;
        loop {
            let group = self.group_at(seq.group());
            let base = seq.group() * Group::WIDTH;
            for lane in group.match_tag(tag) {
                let idx = base + lane;
                // SAFETY: A matching fingerprint implies a live slot.
                if unsafe { self.key_at(idx) } == &key {
                    // SAFETY: Same slot; overwrite the value in place.
                    let old = mem::replace(unsafe { self.value_at_mut(idx) }, value);
                    return Some(old);
                }
            }
            if first_tombstone.is_none() {
                if let Some(lane) = group.match_tombstone().lowest_set_bit() {
                    first_tombstone = Some(base + lane);
                }
            }
            if let Some(lane) = group.match_empty().lowest_set_bit() {
                let target = first_tombstone.unwrap_or(base + lane);
                // SAFETY: `target` is either a tombstone found on this
                // probe path or the EMPTY slot just matched; both are in
                // bounds and vacant.
                unsafe { self.insert_at(target, key, value, tag) };
                return None;
            }
            visited += 1;
            if visited >= self.group_count() {
                panic!("probe cycle exhausted: no empty slot reachable; the table is saturated");
            }
            seq.advance();
        }
    }

    /// Writes a new entry into a vacant slot.
    ///
    /// # Safety
    ///
    /// `idx` must be in bounds and its control byte must be EMPTY or
    /// DELETED.
    unsafe fn insert_at(&mut self, idx: usize, key: K, value: V, tag: u8) {
        // SAFETY: Bounds guaranteed by the caller.
        unsafe {
            if self.ctrl(idx) == DELETED {
                self.tombstones -= 1;
            }
            // Publish the cells first, the control byte last.
            (*self.keys_ptr().add(idx)).write(key);
            (*self.vals_ptr().add(idx)).write(value);
            self.set_ctrl(idx, tag);
        }
        self.live += 1;
    }

    /// Removes `key`, running the rehash controller afterwards.
    pub(crate) fn remove<Q>(
        &mut self,
        smeared: u32,
        key: &Q,
        hasher: &impl Fn(&K) -> u32,
    ) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let pair = self.remove_keep_tombstone(smeared, key)?;
        self.run_rehash_controller(hasher);
        Some(pair)
    }

    /// Removes `key`, leaving the tombstone in place and skipping the
    /// controller. Used by the concurrent wrapper, which applies the
    /// rebuild decision itself so it can retire the old allocation.
    pub(crate) fn remove_keep_tombstone<Q>(&mut self, smeared: u32, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let idx = self.find(smeared, key)?;
        // SAFETY: `find` returned a live slot.
        Some(unsafe { self.take_slot(idx) })
    }

    /// Tombstones a live slot and moves its cells out.
    ///
    /// # Safety
    ///
    /// `idx` must be in bounds and its control byte must be a fingerprint.
    unsafe fn take_slot(&mut self, idx: usize) -> (K, V) {
        // SAFETY: Bounds and liveness guaranteed by the caller. The
        // tombstone is published before the cells are vacated; a racing
        // optimistic reader that matched the old fingerprint is caught by
        // its stamp validation.
        let pair = unsafe {
            self.set_ctrl(idx, DELETED);
            let key = (*self.keys_ptr().add(idx)).assume_init_read();
            let value = (*self.vals_ptr().add(idx)).assume_init_read();
            (key, value)
        };
        self.live -= 1;
        self.tombstones += 1;
        pair
    }

    /// The rehash controller's decision for the current counters.
    ///
    /// Over-load wins over tombstone saturation: growing also compacts.
    /// The saturation trigger requires at least one tombstone so an empty
    /// table never rebuilds.
    #[inline]
    pub(crate) fn rehash_needed(&self) -> Option<Rehash> {
        if self.live + self.tombstones >= self.max_load {
            Some(Rehash::Grow)
        } else if self.tombstones > 0 && self.tombstones >= self.live / 2 {
            Some(Rehash::Compact)
        } else {
            None
        }
    }

    /// Runs the controller, rebuilding in place when triggered.
    fn run_rehash_controller(&mut self, hasher: &impl Fn(&K) -> u32) {
        if let Some(kind) = self.rehash_needed() {
            let fresh = self.rebuilt_for(kind, hasher);
            *self = fresh;
        }
    }

    /// Builds the replacement table for a rebuild decision and drains
    /// every live entry into it.
    ///
    /// On return `self` is vacated (all ctrl EMPTY, counters zero) but
    /// still allocated, so a racing optimistic reader of the concurrent
    /// wrapper can finish a probe against it; dropping it only frees the
    /// allocation.
    pub(crate) fn rebuilt_for(&mut self, kind: Rehash, hasher: &impl Fn(&K) -> u32) -> Self {
        let min_capacity = match kind {
            Rehash::Grow => (self.capacity * 2).max(Group::WIDTH),
            Rehash::Compact => self.capacity,
        };
        let mut fresh = Self::with_capacity_and_load_factor(min_capacity, self.load_factor);
        self.drain_into(&mut fresh, hasher);
        fresh
    }

    /// Moves every live entry into `fresh` with an EMPTY-only probe and
    /// vacates `self`.
    fn drain_into(&mut self, fresh: &mut Self, hasher: &impl Fn(&K) -> u32) {
        debug_assert_eq!(fresh.live, 0);
        debug_assert!(fresh.max_load >= self.live, "rebuild target too small");

        for idx in 0..self.capacity {
            // SAFETY: `idx` is in bounds; a fingerprint byte implies
            // initialized cells which are moved out exactly once.
            unsafe {
                let ctrl = self.ctrl(idx);
                if is_full(ctrl) {
                    let key = (*self.keys_ptr().add(idx)).assume_init_read();
                    let value = (*self.vals_ptr().add(idx)).assume_init_read();
                    self.set_ctrl(idx, EMPTY);
                    let smeared = hasher(&key);
                    fresh.insert_fresh(smeared, key, value);
                } else if ctrl == DELETED {
                    self.set_ctrl(idx, EMPTY);
                }
            }
        }
        self.live = 0;
        self.tombstones = 0;
    }

    /// Insertion into a table known to contain no tombstones and spare
    /// EMPTY slots: the first EMPTY lane on the probe path is always the
    /// right target.
    ///
    /// # Safety
    ///
    /// `self` must have been freshly built with `max_load` headroom for
    /// the entry.
    unsafe fn insert_fresh(&mut self, smeared: u32, key: K, value: V) {
        let tag = h2(smeared);
        let mut seq = ProbeSeq::new(h1(smeared), self.group_mask);
        loop {
            let group = self.group_at(seq.group());
            if let Some(lane) = group.match_empty().lowest_set_bit() {
                let idx = seq.group() * Group::WIDTH + lane;
                // SAFETY: The lane just matched EMPTY.
                unsafe {
                    (*self.keys_ptr().add(idx)).write(key);
                    (*self.vals_ptr().add(idx)).write(value);
                    self.set_ctrl(idx, tag);
                }
                self.live += 1;
                return;
            }
            seq.advance();
        }
    }

    /// Rebuilds at the current capacity unconditionally, compacting every
    /// tombstone.
    pub(crate) fn force_compact(&mut self, hasher: &impl Fn(&K) -> u32) {
        let fresh = self.rebuilt_for(Rehash::Compact, hasher);
        *self = fresh;
    }

    /// Inserts an entry whose key is known to be absent, returning the
    /// slot it landed in.
    ///
    /// Runs the rehash controller first, then probes for the first
    /// reusable tombstone or EMPTY slot without any key comparisons. The
    /// entry API uses this after an unsuccessful `find` while still
    /// holding the table borrow, which is what upholds the absence
    /// contract.
    pub(crate) fn insert_slot(
        &mut self,
        smeared: u32,
        key: K,
        value: V,
        hasher: &impl Fn(&K) -> u32,
    ) -> usize {
        self.run_rehash_controller(hasher);

        let tag = h2(smeared);
        let mut seq = ProbeSeq::new(h1(smeared), self.group_mask);
        let mut first_tombstone: Option<usize> = None;
        let mut visited = 0;
        loop {
            let group = self.group_at(seq.group());
            let base = seq.group() * Group::WIDTH;
            if first_tombstone.is_none() {
                if let Some(lane) = group.match_tombstone().lowest_set_bit() {
                    first_tombstone = Some(base + lane);
                }
            }
            if let Some(lane) = group.match_empty().lowest_set_bit() {
                let target = first_tombstone.unwrap_or(base + lane);
                // SAFETY: `target` is a tombstone from this probe path or
                // the EMPTY slot just matched.
                unsafe { self.insert_at(target, key, value, tag) };
                return target;
            }
            visited += 1;
            if visited >= self.group_count() {
                panic!("probe cycle exhausted: no empty slot reachable; the table is saturated");
            }
            seq.advance();
        }
    }

    /// Removes the entry in a known-live slot, running the rehash
    /// controller afterwards.
    ///
    /// # Safety
    ///
    /// `idx` must be in bounds with a fingerprint control byte, as
    /// returned by [`find`](Self::find) on the unmodified table.
    pub(crate) unsafe fn remove_slot(
        &mut self,
        idx: usize,
        hasher: &impl Fn(&K) -> u32,
    ) -> (K, V) {
        // SAFETY: Caller contract.
        let pair = unsafe { self.take_slot(idx) };
        self.run_rehash_controller(hasher);
        pair
    }

    /// Shrinks the table to the smallest capacity whose load threshold
    /// still covers the live entries.
    pub(crate) fn shrink_to_fit(&mut self, hasher: &impl Fn(&K) -> u32) {
        let mut target = Group::WIDTH;
        while max_load_for(target, self.load_factor) < self.live {
            target *= 2;
        }
        if target < self.capacity {
            let mut fresh = Self::with_capacity_and_load_factor(target, self.load_factor);
            self.drain_into(&mut fresh, hasher);
            *self = fresh;
        }
    }

    /// Consumes the table and yields every live entry by value.
    pub(crate) fn into_entries(mut self) -> RawIntoIter<K, V> {
        let mut occupied = vec![0u8; self.capacity].into_boxed_slice();
        for (idx, byte) in occupied.iter_mut().enumerate() {
            // SAFETY: `idx` is in bounds.
            *byte = unsafe { self.ctrl(idx) };
        }
        let remaining = self.live;
        self.reset_ctrl();
        self.live = 0;
        self.tombstones = 0;

        RawIntoIter {
            occupied,
            table: self,
            index: 0,
            remaining,
        }
    }

    /// Pre-sizes for `additional` upcoming inserts.
    ///
    /// Projects the post-insertion occupancy as
    /// `live + tombstones + max(0, additional - tombstones)` (tombstones
    /// on the probe paths are reusable, so they are only counted once).
    /// If the projection reaches the load threshold, grows by doubling
    /// until the threshold covers `live + additional` and rebuilds once.
    /// Pure-overlap workloads over-estimate and may grow one step early;
    /// the projection is deliberately conservative.
    pub(crate) fn reserve(&mut self, additional: usize, hasher: &impl Fn(&K) -> u32) {
        if let Some(fresh) = self.rebuilt_for_reserve(additional, hasher) {
            *self = fresh;
        }
    }

    /// Replacement form of [`reserve`](Self::reserve): when pre-sizing is
    /// required, drains `self` into an adequately grown table and returns
    /// it, leaving `self` vacated but allocated. The concurrent wrapper
    /// publishes the replacement and retires the old allocation instead
    /// of freeing it under racing readers.
    pub(crate) fn rebuilt_for_reserve(
        &mut self,
        additional: usize,
        hasher: &impl Fn(&K) -> u32,
    ) -> Option<Self> {
        let projected = self.live + self.tombstones + additional.saturating_sub(self.tombstones);
        if projected < self.max_load {
            return None;
        }

        let needed = self.live + additional;
        let mut new_capacity = (self.capacity * 2).max(Group::WIDTH);
        while max_load_for(new_capacity, self.load_factor) < needed {
            new_capacity *= 2;
        }
        let mut fresh = Self::with_capacity_and_load_factor(new_capacity, self.load_factor);
        self.drain_into(&mut fresh, hasher);
        Some(fresh)
    }

    /// Drops every live entry and resets all control bytes to EMPTY,
    /// retaining capacity.
    pub(crate) fn clear(&mut self) {
        if self.live > 0 && mem::needs_drop::<(K, V)>() {
            for idx in 0..self.capacity {
                // SAFETY: `idx` is in bounds; fingerprint bytes gate the
                // drops.
                unsafe {
                    if is_full(self.ctrl(idx)) {
                        (*self.keys_ptr().add(idx)).assume_init_drop();
                        (*self.vals_ptr().add(idx)).assume_init_drop();
                    }
                }
            }
        }
        self.reset_ctrl();
        self.live = 0;
        self.tombstones = 0;
    }

    /// Release-stores EMPTY into every control word.
    fn reset_ctrl(&mut self) {
        let words = self.capacity / WORD_LANES;
        for w in 0..words {
            // SAFETY: `w` is within the control plane.
            unsafe { &*self.ctrl_ptr().add(w) }
                .store(EMPTY_WORD, core::sync::atomic::Ordering::Release);
        }
    }

    /// Retains only the entries `f` approves of.
    ///
    /// Walks the slots in a randomized full-cycle order and applies
    /// iterator-removal semantics to rejected entries: the slot is
    /// tombstoned and the counters adjusted, but no rebuild runs
    /// mid-walk, so the walk's index arithmetic stays valid throughout.
    pub(crate) fn retain(&mut self, mut f: impl FnMut(&K, &mut V) -> bool) {
        let cycle = RandomCycle::new(self.capacity);
        for i in 0..self.capacity {
            let idx = cycle.index_at(i);
            // SAFETY: `idx` is in bounds; fingerprint bytes gate every
            // cell access.
            unsafe {
                if !is_full(self.ctrl(idx)) {
                    continue;
                }
                let keep = {
                    let key = (*self.keys_ptr().add(idx)).assume_init_ref();
                    let value = (*self.vals_ptr().add(idx)).assume_init_mut();
                    f(key, value)
                };
                if !keep {
                    self.set_ctrl(idx, DELETED);
                    (*self.keys_ptr().add(idx)).assume_init_drop();
                    (*self.vals_ptr().add(idx)).assume_init_drop();
                    self.live -= 1;
                    self.tombstones += 1;
                }
            }
        }
    }

    /// Iterates the live entries in a randomized full-cycle order.
    pub(crate) fn iter(&self) -> RawIter<'_, K, V> {
        RawIter {
            table: self,
            cycle: RandomCycle::new(self.capacity),
            iteration: 0,
            remaining: self.live,
        }
    }

    /// Like [`iter`](Self::iter) but yields values mutably.
    pub(crate) fn iter_mut(&mut self) -> RawIterMut<'_, K, V> {
        let cycle = RandomCycle::new(self.capacity);
        let remaining = self.live;
        RawIterMut {
            table: NonNull::from(&mut *self),
            cycle,
            iteration: 0,
            remaining,
            _marker: PhantomData,
        }
    }

    /// Empties the table and yields the removed entries.
    ///
    /// The control plane is copied aside and reset up front, so the table
    /// is observably empty the moment this returns; the iterator hands
    /// out the displaced entries. Forgetting the iterator leaks the
    /// unyielded entries without dropping them.
    pub(crate) fn drain(&mut self) -> RawDrain<'_, K, V> {
        let mut occupied = vec![0u8; self.capacity].into_boxed_slice();
        for (idx, byte) in occupied.iter_mut().enumerate() {
            // SAFETY: `idx` is in bounds.
            *byte = unsafe { self.ctrl(idx) };
        }
        let remaining = self.live;
        self.reset_ctrl();
        self.live = 0;
        self.tombstones = 0;

        RawDrain {
            occupied,
            table: self,
            index: 0,
            remaining,
        }
    }
}

impl<K, V> Debug for RawTable<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RawTable")
            .field("capacity", &self.capacity)
            .field("live", &self.live)
            .field("tombstones", &self.tombstones)
            .field("max_load", &self.max_load)
            .finish()
    }
}

impl<K, V> Drop for RawTable<K, V> {
    fn drop(&mut self) {
        // SAFETY: Fingerprint bytes gate the drops; the allocation matches
        // `self.layout` by construction.
        unsafe {
            if mem::needs_drop::<(K, V)>() && self.live > 0 {
                for idx in 0..self.capacity {
                    if is_full(self.ctrl(idx)) {
                        (*self.keys_ptr().add(idx)).assume_init_drop();
                        (*self.vals_ptr().add(idx)).assume_init_drop();
                    }
                }
            }
            std::alloc::dealloc(self.alloc.as_ptr(), self.layout.layout);
        }
    }
}

impl<K, V> Clone for RawTable<K, V>
where
    K: Clone,
    V: Clone,
{
    fn clone(&self) -> Self {
        let layout = self.layout;
        // SAFETY: Same layout as the source table; the control plane is
        // copied byte-wise (a plain copy is fine, `&self` plus the
        // single-owner contract means no concurrent writer), then each
        // live cell is cloned into place.
        unsafe {
            let raw = std::alloc::alloc(layout.layout);
            if raw.is_null() {
                handle_alloc_error(layout.layout);
            }
            ptr::copy_nonoverlapping(self.alloc.as_ptr(), raw, self.capacity);

            let new = Self {
                layout,
                alloc: NonNull::new_unchecked(raw),
                capacity: self.capacity,
                group_mask: self.group_mask,
                live: self.live,
                tombstones: self.tombstones,
                max_load: self.max_load,
                load_factor: self.load_factor,
                _marker: PhantomData,
            };

            for idx in 0..self.capacity {
                if is_full(self.ctrl(idx)) {
                    (*new.keys_ptr().add(idx)).write(self.key_at(idx).clone());
                    (*new.vals_ptr().add(idx)).write(self.value_at(idx).clone());
                }
            }

            new
        }
    }
}

/// Borrowing iterator over live entries in randomized order.
pub(crate) struct RawIter<'a, K, V> {
    table: &'a RawTable<K, V>,
    cycle: RandomCycle,
    iteration: usize,
    remaining: usize,
}

impl<'a, K, V> Iterator for RawIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 && self.iteration < self.table.capacity {
            let idx = self.cycle.index_at(self.iteration);
            self.iteration += 1;
            // SAFETY: `idx` is in bounds; the fingerprint byte gates the
            // cell reads, and the shared borrow freezes the table.
            unsafe {
                if is_full(self.table.ctrl(idx)) {
                    self.remaining -= 1;
                    return Some((self.table.key_at(idx), self.table.value_at(idx)));
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for RawIter<'_, K, V> {}

/// Borrowing iterator yielding values mutably, in randomized order.
pub(crate) struct RawIterMut<'a, K, V> {
    table: NonNull<RawTable<K, V>>,
    cycle: RandomCycle,
    iteration: usize,
    remaining: usize,
    _marker: PhantomData<&'a mut RawTable<K, V>>,
}

impl<'a, K, V> Iterator for RawIterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        // SAFETY: The iterator holds the table's unique borrow; the
        // full-cycle walk visits each slot at most once, so the yielded
        // mutable references never alias.
        unsafe {
            let table = self.table.as_ref();
            while self.remaining > 0 && self.iteration < table.capacity {
                let idx = self.cycle.index_at(self.iteration);
                self.iteration += 1;
                if is_full(table.ctrl(idx)) {
                    self.remaining -= 1;
                    let key = (*table.keys_ptr().add(idx)).assume_init_ref();
                    let value = (*table.vals_ptr().add(idx)).assume_init_mut();
                    return Some((key, value));
                }
            }
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for RawIterMut<'_, K, V> {}

/// Draining iterator; see [`RawTable::drain`].
pub(crate) struct RawDrain<'a, K, V> {
    occupied: Box<[u8]>,
    table: &'a mut RawTable<K, V>,
    index: usize,
    remaining: usize,
}

impl<K, V> Iterator for RawDrain<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.occupied.len() {
            let idx = self.index;
            self.index += 1;
            if is_full(self.occupied[idx]) {
                self.remaining -= 1;
                // SAFETY: The copied control byte proves the cells were
                // initialized, and the reset control plane means nothing
                // else will read or drop them.
                return Some(unsafe {
                    (
                        (*self.table.keys_ptr().add(idx)).assume_init_read(),
                        (*self.table.vals_ptr().add(idx)).assume_init_read(),
                    )
                });
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for RawDrain<'_, K, V> {}

impl<K, V> Drop for RawDrain<'_, K, V> {
    fn drop(&mut self) {
        if mem::needs_drop::<(K, V)>() {
            for _ in &mut *self {}
        }
    }
}

/// Owning iterator over a consumed table's entries; see
/// [`RawTable::into_entries`].
pub(crate) struct RawIntoIter<K, V> {
    occupied: Box<[u8]>,
    table: RawTable<K, V>,
    index: usize,
    remaining: usize,
}

impl<K, V> Iterator for RawIntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.occupied.len() {
            let idx = self.index;
            self.index += 1;
            if is_full(self.occupied[idx]) {
                self.remaining -= 1;
                // SAFETY: The copied control byte proves the cells were
                // initialized, and the table's control plane was reset, so
                // each cell is read out exactly once and never dropped by
                // the table.
                return Some(unsafe {
                    (
                        (*self.table.keys_ptr().add(idx)).assume_init_read(),
                        (*self.table.vals_ptr().add(idx)).assume_init_read(),
                    )
                });
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for RawIntoIter<K, V> {}

impl<K, V> Drop for RawIntoIter<K, V> {
    fn drop(&mut self) {
        if mem::needs_drop::<(K, V)>() {
            for _ in &mut *self {}
        }
    }
}

/// Upper bound on fingerprint collisions an optimistic probe will copy
/// before giving up and falling back to the read lock.
pub(crate) const MAX_SNAPSHOT_CANDIDATES: usize = 8;

/// Candidate cells copied bit-wise out of a table by an optimistic probe.
///
/// The copies are raw bits and must not be interpreted until the caller's
/// stamp validation has proven that no writer overlapped the probe. The
/// buffer never drops its contents; a validated copy aliases a live entry
/// owned by the table, and an unvalidated copy may not be a value at all.
pub(crate) struct SnapshotCandidates<K, V> {
    len: usize,
    keys: [MaybeUninit<K>; MAX_SNAPSHOT_CANDIDATES],
    vals: [MaybeUninit<V>; MAX_SNAPSHOT_CANDIDATES],
}

impl<K, V> SnapshotCandidates<K, V> {
    pub(crate) fn new() -> Self {
        SnapshotCandidates {
            len: 0,
            keys: [const { MaybeUninit::uninit() }; MAX_SNAPSHOT_CANDIDATES],
            vals: [const { MaybeUninit::uninit() }; MAX_SNAPSHOT_CANDIDATES],
        }
    }

    /// Compares the candidate keys against `key` and clones the matching
    /// value out.
    ///
    /// # Safety
    ///
    /// The caller must have validated its stamp: every copied candidate
    /// is a faithful snapshot of a cell that was live and stable for the
    /// whole probe window.
    pub(crate) unsafe fn select<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        V: Clone,
    {
        for i in 0..self.len {
            // SAFETY: Validation (caller contract) proves the copies are
            // initialized values. They alias table-owned entries, so they
            // are borrowed and cloned, never dropped.
            unsafe {
                if self.keys[i].assume_init_ref().borrow() == key {
                    return Some(self.vals[i].assume_init_ref().clone());
                }
            }
        }
        None
    }

    /// Returns whether any candidate key equals `key`.
    ///
    /// # Safety
    ///
    /// Same contract as [`select`](Self::select).
    pub(crate) unsafe fn matches<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        // SAFETY: Caller contract as above.
        (0..self.len).any(|i| unsafe { self.keys[i].assume_init_ref() }.borrow() == key)
    }
}

impl<K, V> RawTable<K, V> {
    /// Probes for fingerprint matches on behalf of an optimistic reader,
    /// copying each candidate's cells bit-wise into `out`.
    ///
    /// Control words are read atomically; candidate cells are copied with
    /// volatile reads and never interpreted here, so a probe that races
    /// with a writer copies garbage harmlessly. Returns `false` when the
    /// candidate buffer overflows, in which case the caller must fall
    /// back to its read lock; `true` means the probe ran to a definite
    /// end (an EMPTY group or full coverage).
    ///
    /// # Safety
    ///
    /// `this` must point to a table whose allocation is kept alive for
    /// the duration of the call (the concurrent wrapper pins an epoch
    /// guard). No reference to the table may be formed here: a writer may
    /// be mutating it concurrently, and only the atomic control loads and
    /// volatile cell copies below are race-tolerant.
    pub(crate) unsafe fn snapshot_probe(
        this: *const Self,
        smeared: u32,
        out: &mut SnapshotCandidates<K, V>,
    ) -> bool {
        // SAFETY: Raw place reads of fields a writer never mutates in
        // place (the wrapper rebuilds by replacement, so capacity, masks,
        // and the allocation pointer are fixed for this table's lifetime).
        let (alloc, keys_offset, vals_offset, group_mask) = unsafe {
            (
                (*this).alloc,
                (*this).layout.keys_offset,
                (*this).layout.vals_offset,
                (*this).group_mask,
            )
        };
        let alloc = alloc.as_ptr();
        let ctrl = alloc as *const AtomicU64;
        // SAFETY: Offsets are within the allocation by construction.
        let (keys, vals) = unsafe {
            (
                alloc.add(keys_offset) as *const MaybeUninit<K>,
                alloc.add(vals_offset) as *const MaybeUninit<V>,
            )
        };

        let tag = h2(smeared);
        let group_count = group_mask + 1;
        let mut seq = ProbeSeq::new(h1(smeared), group_mask);
        let mut visited = 0;
        loop {
            // SAFETY: The probe group index is masked into the control
            // plane.
            let group = unsafe { Group::load(ctrl, seq.group()) };
            let base = seq.group() * Group::WIDTH;
            for lane in group.match_tag(tag) {
                if out.len == MAX_SNAPSHOT_CANDIDATES {
                    return false;
                }
                let idx = base + lane;
                // SAFETY: `idx < capacity`; the volatile reads copy raw
                // bits out of cells that may be mid-write, which is fine
                // because `MaybeUninit` makes no validity claim and the
                // caller interprets nothing before validating its stamp.
                unsafe {
                    out.keys[out.len] = ptr::read_volatile(keys.add(idx));
                    out.vals[out.len] = ptr::read_volatile(vals.add(idx));
                }
                out.len += 1;
            }
            if group.match_empty().any() {
                return true;
            }
            visited += 1;
            if visited >= group_count {
                return true;
            }
            seq.advance();
        }
    }
}
