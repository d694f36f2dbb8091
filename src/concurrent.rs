//! A sharded, thread-safe wrapper around the SwissTable core.
//!
//! The map is a fixed power-of-two array of shards, each pairing one
//! single-owner table with a reader-writer lock and a sequence stamp.
//! A key's shard comes from the **high** bits of its smeared hash; the low
//! bits already feed the in-table probe and the control-byte fingerprint,
//! so taking shard bits from the top preserves per-shard hash entropy.
//!
//! ## Reads
//!
//! Reads first try an optimistic pass: sample the shard's sequence stamp
//! (even means quiescent), probe the table copying candidate cells
//! bit-wise without interpreting them, then re-check the stamp. A stable
//! stamp proves no writer overlapped the probe, so the copies are faithful
//! snapshots and can be compared and cloned. Any instability falls back to
//! re-running the lookup under the shard's read lock.
//!
//! Two disciplines make the optimistic pass safe in Rust, where the
//! original design leaned on a garbage collector:
//!
//! - Writers publish entry cells *before* the control byte (and tombstone
//!   the control byte before vacating cells), so a fingerprint observed by
//!   a reader referred to fully written cells at the instant of the
//!   control store; every overlap is caught by the stamp.
//! - A rebuild never frees the old allocation in place. The writer drains
//!   entries into a fresh table, publishes it, and retires the vacated old
//!   table through `crossbeam::epoch`; readers probe under a pinned epoch
//!   guard, so their loads always land in live memory.
//!
//! ## Writes
//!
//! Writes serialize on the shard's write lock and bracket their mutations
//! with the sequence stamp (odd while in flight). Rebuilds happen inside
//! that bracket: the controller decision is taken before an insert and
//! after a removal, exactly as in the single-threaded table.
//!
//! The aggregate entry count is a relaxed atomic counter adjusted with the
//! per-operation delta computed under the shard write lock; concurrent
//! readers of `len` get an approximation that becomes exact at
//! quiescence.

use core::borrow::Borrow;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::sync::atomic::fence;
use core::sync::atomic::AtomicI64;
use core::sync::atomic::AtomicU64;
use core::sync::atomic::Ordering;
use std::collections::hash_map::RandomState;

use crossbeam::epoch;
use crossbeam::epoch::Atomic;
use crossbeam::epoch::Guard;
use crossbeam::epoch::Owned;
use parking_lot::RwLock;

use crate::error::validate_load_factor;
use crate::error::ConfigError;
use crate::error::MAX_SHARD_BITS;
use crate::hash::shard_of;
use crate::hash::smeared_hash;
use crate::map::DEFAULT_INITIAL_CAPACITY;
use crate::map::DEFAULT_LOAD_FACTOR;
use crate::table::RawTable;
use crate::table::SnapshotCandidates;

struct Shard<K, V> {
    /// Sequence stamp: even = quiescent, odd = a writer is mutating.
    seq: AtomicU64,
    /// Serializes writers and backs the fallback read path. The data it
    /// guards lives behind `table`, not in the lock itself.
    lock: RwLock<()>,
    /// The shard's table, swapped wholesale on rebuild.
    table: Atomic<RawTable<K, V>>,
}

impl<K, V> Shard<K, V> {
    fn new(capacity: usize, load_factor: f64) -> Self {
        Shard {
            seq: AtomicU64::new(0),
            lock: RwLock::new(()),
            table: Atomic::new(RawTable::with_capacity_and_load_factor(
                capacity,
                load_factor,
            )),
        }
    }

    /// Marks the shard as mid-write. Must hold the write lock.
    fn begin_write(&self) {
        let s = self.seq.load(Ordering::Relaxed);
        debug_assert_eq!(s & 1, 0, "nested write bracket");
        self.seq.store(s.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);
    }

    /// Marks the shard quiescent again. Must hold the write lock.
    fn end_write(&self) {
        let s = self.seq.load(Ordering::Relaxed);
        debug_assert_eq!(s & 1, 1, "unbalanced write bracket");
        self.seq.store(s.wrapping_add(1), Ordering::Release);
    }

    /// Samples the stamp for an optimistic read; `None` while a writer is
    /// in flight.
    fn optimistic_stamp(&self) -> Option<u64> {
        let s = self.seq.load(Ordering::Acquire);
        (s & 1 == 0).then_some(s)
    }

    /// Returns `true` if no write overlapped since `stamp` was sampled.
    fn validate(&self, stamp: u64) -> bool {
        fence(Ordering::Acquire);
        self.seq.load(Ordering::Relaxed) == stamp
    }
}

/// A sharded, thread-safe SwissTable map.
///
/// All operations take `&self`; reads are optimistic with a read-lock
/// fallback, writes serialize per shard. Values are returned by clone
/// (`get`) or by snapshot (`snapshot`), never by reference, because an
/// entry's slot may be rewritten the moment its shard lock is released.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
///
/// use hashsmith::ConcurrentSwissMap;
///
/// let map = Arc::new(ConcurrentSwissMap::new());
/// let writer = {
///     let map = Arc::clone(&map);
///     std::thread::spawn(move || {
///         for i in 0..100u32 {
///             map.insert(i, i * 2);
///         }
///     })
/// };
/// writer.join().unwrap();
/// assert_eq!(map.len(), 100);
/// assert_eq!(map.get(&40), Some(80));
/// ```
pub struct ConcurrentSwissMap<K, V, S = RandomState> {
    shards: Box<[Shard<K, V>]>,
    shard_bits: u32,
    size: AtomicI64,
    hash_builder: S,
}

impl<K, V> ConcurrentSwissMap<K, V, RandomState> {
    /// Creates a map with a shard count derived from the CPU count and
    /// default capacity and load factor.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_INITIAL_CAPACITY)
    }

    /// Creates a map sized for at least `capacity` entries spread across
    /// the default shard count.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_options(default_shard_count(), capacity, DEFAULT_LOAD_FACTOR)
    }

    /// Creates a map with explicit shard count, capacity, and load
    /// factor.
    ///
    /// The shard count is rounded up to a power of two.
    ///
    /// # Panics
    ///
    /// Panics if `shard_count` is zero or needs more than 25 bits, or if
    /// `load_factor` lies outside (0, 1).
    pub fn with_options(shard_count: usize, capacity: usize, load_factor: f64) -> Self {
        match Self::try_with_options_and_hasher(
            shard_count,
            capacity,
            load_factor,
            RandomState::new(),
        ) {
            Ok(map) => map,
            Err(e) => panic!("{e}"),
        }
    }

    /// Fallible form of [`with_options`](Self::with_options).
    pub fn try_with_options(
        shard_count: usize,
        capacity: usize,
        load_factor: f64,
    ) -> Result<Self, ConfigError> {
        Self::try_with_options_and_hasher(shard_count, capacity, load_factor, RandomState::new())
    }
}

impl<K, V, S> ConcurrentSwissMap<K, V, S> {
    /// Creates a map with explicit options and hasher builder.
    pub fn try_with_options_and_hasher(
        shard_count: usize,
        capacity: usize,
        load_factor: f64,
        hash_builder: S,
    ) -> Result<Self, ConfigError> {
        if shard_count == 0 {
            return Err(ConfigError::ShardCount(shard_count));
        }
        let rounded = shard_count.next_power_of_two();
        let shard_bits = rounded.trailing_zeros();
        if shard_bits > MAX_SHARD_BITS {
            return Err(ConfigError::ShardCount(shard_count));
        }
        let load_factor = validate_load_factor(load_factor)?;

        let per_shard = capacity.max(DEFAULT_INITIAL_CAPACITY).div_ceil(rounded).max(1);
        let shards: Box<[Shard<K, V>]> = (0..rounded)
            .map(|_| Shard::new(per_shard, load_factor))
            .collect();

        Ok(Self {
            shards,
            shard_bits,
            size: AtomicI64::new(0),
            hash_builder,
        })
    }

    /// Number of shards (a power of two).
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Approximate number of entries.
    ///
    /// Exact whenever no write is in flight; during concurrent writes the
    /// value may lag by in-flight deltas.
    pub fn len(&self) -> usize {
        self.size.load(Ordering::Relaxed).max(0) as usize
    }

    /// Returns `true` if the map holds no entries (subject to the same
    /// approximation as [`len`](Self::len)).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn shard_for(&self, smeared: u32) -> &Shard<K, V> {
        &self.shards[shard_of(smeared, self.shard_bits)]
    }

    /// Mutable access to a shard's current table.
    ///
    /// # Safety
    ///
    /// The caller must hold the shard's write lock; it is the unique
    /// mutator until the lock is released.
    #[allow(clippy::mut_from_ref)]
    unsafe fn writable<'g>(&self, shard: &Shard<K, V>, guard: &'g Guard) -> &'g mut RawTable<K, V> {
        let shared = shard.table.load(Ordering::Relaxed, guard);
        // SAFETY: The shard's table is never null after construction, and
        // the write lock (caller contract) makes this the sole mutable
        // reference.
        unsafe { &mut *(shared.as_raw() as *mut RawTable<K, V>) }
    }

    /// Publishes `fresh` as the shard's table and retires the old one.
    ///
    /// # Safety
    ///
    /// The caller must hold the shard's write lock, and the old table
    /// must already be vacated (drained) so its deferred destruction only
    /// frees memory.
    unsafe fn publish<'g>(
        &self,
        shard: &Shard<K, V>,
        fresh: RawTable<K, V>,
        guard: &'g Guard,
    ) -> &'g mut RawTable<K, V> {
        let old = shard.table.swap(Owned::new(fresh), Ordering::Release, guard);
        // SAFETY: After the swap no new reader can load `old`; readers
        // already probing it hold pinned guards, so destruction is
        // deferred past them.
        unsafe { guard.defer_destroy(old) };
        // SAFETY: Caller contract (write lock held).
        unsafe { self.writable(shard, guard) }
    }
}

impl<K, V, S> ConcurrentSwissMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Runs the rehash controller for a write-locked shard, replacing the
    /// table when a rebuild is due.
    ///
    /// # Safety
    ///
    /// The caller must hold the shard's write lock with the sequence
    /// stamp odd.
    unsafe fn run_controller<'g>(
        &self,
        shard: &Shard<K, V>,
        guard: &'g Guard,
    ) -> &'g mut RawTable<K, V> {
        // SAFETY: Caller contract.
        let table = unsafe { self.writable(shard, guard) };
        let Some(kind) = table.rehash_needed() else {
            return table;
        };
        let hash_builder = &self.hash_builder;
        let fresh = table.rebuilt_for(kind, &|k| smeared_hash(hash_builder, k));
        // SAFETY: Write lock held; `table` was just drained by
        // `rebuilt_for`.
        unsafe { self.publish(shard, fresh, guard) }
    }

    /// Returns a clone of the value for `key`.
    ///
    /// Optimistic: the common case takes no lock at all.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let smeared = smeared_hash(&self.hash_builder, key);
        let shard = self.shard_for(smeared);
        let guard = epoch::pin();

        if let Some(stamp) = shard.optimistic_stamp() {
            let table = shard.table.load(Ordering::Acquire, &guard);
            let mut candidates = SnapshotCandidates::new();
            // SAFETY: The pinned guard keeps the loaded table's
            // allocation alive; the probe copies bits without
            // interpreting them.
            let complete =
                unsafe { RawTable::snapshot_probe(table.as_raw(), smeared, &mut candidates) };
            if complete && shard.validate(stamp) {
                // SAFETY: The stamp was stable across the probe, so the
                // copies are faithful snapshots of live cells.
                return unsafe { candidates.select(key) };
            }
        }

        let _read = shard.lock.read();
        let table = shard.table.load(Ordering::Acquire, &guard);
        // SAFETY: Non-null after construction; the read lock excludes
        // writers for the borrow's duration.
        let table = unsafe { table.deref() };
        table
            .find(smeared, key)
            // SAFETY: `find` returned a live slot.
            .map(|idx| unsafe { table.value_at(idx) }.clone())
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let smeared = smeared_hash(&self.hash_builder, key);
        let shard = self.shard_for(smeared);
        let guard = epoch::pin();

        if let Some(stamp) = shard.optimistic_stamp() {
            let table = shard.table.load(Ordering::Acquire, &guard);
            let mut candidates = SnapshotCandidates::new();
            // SAFETY: As in `get`.
            let complete =
                unsafe { RawTable::snapshot_probe(table.as_raw(), smeared, &mut candidates) };
            if complete && shard.validate(stamp) {
                // SAFETY: As in `get`.
                return unsafe { candidates.matches(key) };
            }
        }

        let _read = shard.lock.read();
        let table = shard.table.load(Ordering::Acquire, &guard);
        // SAFETY: As in `get`.
        let table = unsafe { table.deref() };
        table.find(smeared, key).is_some()
    }

    /// Inserts a key-value pair, returning the previous value when `key`
    /// was already present.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let smeared = smeared_hash(&self.hash_builder, &key);
        let shard = self.shard_for(smeared);
        let guard = epoch::pin();

        let write = shard.lock.write();
        shard.begin_write();
        // SAFETY: Write lock held, stamp odd.
        let table = unsafe { self.run_controller(shard, &guard) };
        let previous = table.put_within_capacity(smeared, key, value);
        shard.end_write();
        if previous.is_none() {
            self.size.fetch_add(1, Ordering::Relaxed);
        }
        drop(write);
        previous
    }

    /// Removes `key`, returning its value.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let smeared = smeared_hash(&self.hash_builder, key);
        let shard = self.shard_for(smeared);
        let guard = epoch::pin();

        let write = shard.lock.write();
        shard.begin_write();
        // SAFETY: Write lock held.
        let table = unsafe { self.writable(shard, &guard) };
        let removed = table.remove_keep_tombstone(smeared, key);
        if removed.is_some() {
            // SAFETY: Write lock held, stamp odd.
            unsafe { self.run_controller(shard, &guard) };
        }
        shard.end_write();
        if removed.is_some() {
            self.size.fetch_sub(1, Ordering::Relaxed);
        }
        drop(write);
        removed.map(|(_, v)| v)
    }

    /// Returns the value for `key`, inserting the result of `make` when
    /// the key is absent. The whole operation is atomic with respect to
    /// the key's shard.
    ///
    /// `make` runs under the shard's write lock; keep it short.
    pub fn get_or_insert_with(&self, key: K, make: impl FnOnce() -> V) -> V
    where
        V: Clone,
    {
        let smeared = smeared_hash(&self.hash_builder, &key);
        let shard = self.shard_for(smeared);
        let guard = epoch::pin();

        let write = shard.lock.write();
        // Lookup first; a hit mutates nothing.
        // SAFETY: Write lock held.
        let table = unsafe { self.writable(shard, &guard) };
        if let Some(idx) = table.find(smeared, &key) {
            // SAFETY: `find` returned a live slot.
            let value = unsafe { table.value_at(idx) }.clone();
            drop(write);
            return value;
        }

        shard.begin_write();
        // SAFETY: Write lock held, stamp odd.
        let table = unsafe { self.run_controller(shard, &guard) };
        let value = make();
        let out = value.clone();
        table.put_within_capacity(smeared, key, value);
        shard.end_write();
        self.size.fetch_add(1, Ordering::Relaxed);
        drop(write);
        out
    }

    /// Bulk insert: buckets the entries by shard first so each shard's
    /// write lock is acquired at most once, pre-sizing each shard for its
    /// batch.
    pub fn insert_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut buckets: Vec<Vec<(u32, K, V)>> =
            (0..self.shards.len()).map(|_| Vec::new()).collect();
        for (key, value) in entries {
            let smeared = smeared_hash(&self.hash_builder, &key);
            buckets[shard_of(smeared, self.shard_bits)].push((smeared, key, value));
        }

        let guard = epoch::pin();
        for (bucket, shard) in buckets.into_iter().zip(self.shards.iter()) {
            if bucket.is_empty() {
                continue;
            }
            let write = shard.lock.write();
            shard.begin_write();
            // SAFETY: Write lock held.
            let mut table = unsafe { self.writable(shard, &guard) };
            let before = table.len();
            let hash_builder = &self.hash_builder;
            if let Some(fresh) =
                table.rebuilt_for_reserve(bucket.len(), &|k| smeared_hash(hash_builder, k))
            {
                // SAFETY: Write lock held; the old table was drained.
                table = unsafe { self.publish(shard, fresh, &guard) };
            }
            for (smeared, key, value) in bucket {
                table.put_within_capacity(smeared, key, value);
            }
            let delta = table.len() as i64 - before as i64;
            shard.end_write();
            if delta != 0 {
                self.size.fetch_add(delta, Ordering::Relaxed);
            }
            drop(write);
        }
    }

    /// Removes every entry from every shard.
    pub fn clear(&self) {
        let guard = epoch::pin();
        for shard in self.shards.iter() {
            let write = shard.lock.write();
            shard.begin_write();
            // SAFETY: Write lock held.
            let table = unsafe { self.writable(shard, &guard) };
            let before = table.len() as i64;
            table.clear();
            shard.end_write();
            if before != 0 {
                self.size.fetch_sub(before, Ordering::Relaxed);
            }
            drop(write);
        }
    }

    /// Copies the live entries out under each shard's read lock in turn.
    ///
    /// The snapshot is strongly consistent per shard and weakly
    /// consistent across shards: entries written to an already-visited
    /// shard during the walk are not reflected. Removal during iteration
    /// is a plain [`remove`](Self::remove) on the yielded key.
    pub fn snapshot(&self) -> Snapshot<K, V>
    where
        K: Clone,
        V: Clone,
    {
        let guard = epoch::pin();
        let mut entries = Vec::with_capacity(self.len());
        for shard in self.shards.iter() {
            let _read = shard.lock.read();
            let table = shard.table.load(Ordering::Acquire, &guard);
            // SAFETY: Non-null after construction; the read lock excludes
            // writers for the borrow's duration.
            let table = unsafe { table.deref() };
            for (key, value) in table.iter() {
                entries.push((key.clone(), value.clone()));
            }
        }
        Snapshot {
            inner: entries.into_iter(),
        }
    }
}

impl<K, V> Default for ConcurrentSwissMap<K, V, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> Drop for ConcurrentSwissMap<K, V, S> {
    fn drop(&mut self) {
        // SAFETY: `&mut self` proves no other thread holds the map, so
        // the unprotected guard and immediate destruction are sound.
        unsafe {
            let guard = epoch::unprotected();
            for shard in self.shards.iter() {
                let shared = shard.table.load(Ordering::Relaxed, guard);
                if !shared.is_null() {
                    drop(shared.into_owned());
                }
            }
        }
    }
}

fn default_shard_count() -> usize {
    (num_cpus::get() * 2).max(1).next_power_of_two()
}

/// Owning iterator over a point-in-time copy of the map's entries. See
/// [`ConcurrentSwissMap::snapshot`].
pub struct Snapshot<K, V> {
    inner: std::vec::IntoIter<(K, V)>,
}

impl<K, V> Iterator for Snapshot<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Snapshot<K, V> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_map_semantics() {
        let map: ConcurrentSwissMap<u32, String> = ConcurrentSwissMap::new();
        assert!(map.is_empty());
        assert_eq!(map.insert(1, "one".into()), None);
        assert_eq!(map.insert(1, "uno".into()), Some("one".into()));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&1), Some("uno".to_string()));
        assert!(map.contains_key(&1));
        assert!(!map.contains_key(&2));
        assert_eq!(map.remove(&1), Some("uno".to_string()));
        assert_eq!(map.remove(&1), None);
        assert!(map.is_empty());
    }

    #[test]
    fn shard_count_is_rounded_and_validated() {
        let map: ConcurrentSwissMap<u32, u32> =
            ConcurrentSwissMap::with_options(5, 16, 0.875);
        assert_eq!(map.shard_count(), 8);

        assert!(ConcurrentSwissMap::<u32, u32>::try_with_options(0, 16, 0.875).is_err());
        assert!(
            ConcurrentSwissMap::<u32, u32>::try_with_options(1 << 26, 16, 0.875).is_err(),
            "more than 25 shard bits must be rejected"
        );
        assert!(ConcurrentSwissMap::<u32, u32>::try_with_options(1 << 10, 16, 0.875).is_ok());
        assert!(ConcurrentSwissMap::<u32, u32>::try_with_options(16, 16, 1.5).is_err());
    }

    #[test]
    fn growth_inside_a_shard_keeps_entries() {
        let map: ConcurrentSwissMap<u32, u32> = ConcurrentSwissMap::with_options(2, 16, 0.875);
        for i in 0..10_000u32 {
            map.insert(i, i * 3);
        }
        assert_eq!(map.len(), 10_000);
        for i in (0..10_000u32).step_by(37) {
            assert_eq!(map.get(&i), Some(i * 3));
        }
        assert_eq!(map.get(&10_001), None);
    }

    #[test]
    fn removals_trigger_shard_rebuilds_safely() {
        let map: ConcurrentSwissMap<u32, u32> = ConcurrentSwissMap::with_options(4, 64, 0.875);
        for i in 0..1_000u32 {
            map.insert(i, i);
        }
        for i in 0..900u32 {
            assert_eq!(map.remove(&i), Some(i));
        }
        assert_eq!(map.len(), 100);
        for i in 900..1_000u32 {
            assert_eq!(map.get(&i), Some(i));
        }
    }

    #[test]
    fn insert_all_buckets_by_shard() {
        let map: ConcurrentSwissMap<u32, u32> = ConcurrentSwissMap::with_options(8, 16, 0.875);
        map.insert_all((0..5_000).map(|i| (i, i + 1)));
        assert_eq!(map.len(), 5_000);
        for i in (0..5_000).step_by(101) {
            assert_eq!(map.get(&i), Some(i + 1));
        }

        // Overlapping bulk insert overwrites without changing the size.
        map.insert_all((0..5_000).map(|i| (i, i + 2)));
        assert_eq!(map.len(), 5_000);
        assert_eq!(map.get(&4_999), Some(5_001));
    }

    #[test]
    fn snapshot_is_complete_at_quiescence() {
        let map: ConcurrentSwissMap<u32, u32> = ConcurrentSwissMap::new();
        for i in 0..500u32 {
            map.insert(i, i);
        }
        let mut entries: Vec<(u32, u32)> = map.snapshot().collect();
        assert_eq!(entries.len(), 500);
        entries.sort_unstable();
        entries.dedup();
        assert_eq!(entries.len(), 500, "snapshot keys must be distinct");
        for (k, v) in entries {
            assert_eq!(k, v);
        }
    }

    #[test]
    fn clear_resets_every_shard() {
        let map: ConcurrentSwissMap<u32, u32> = ConcurrentSwissMap::new();
        for i in 0..1_000u32 {
            map.insert(i, i);
        }
        map.clear();
        assert_eq!(map.len(), 0);
        assert_eq!(map.get(&1), None);
        map.insert(1, 1);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn get_or_insert_with_is_insert_once() {
        let map: ConcurrentSwissMap<u32, u32> = ConcurrentSwissMap::new();
        assert_eq!(map.get_or_insert_with(1, || 10), 10);
        assert_eq!(map.get_or_insert_with(1, || 20), 10);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&1), Some(10));
    }

    #[test]
    fn string_keys_round_trip() {
        let map: ConcurrentSwissMap<String, Vec<u8>> = ConcurrentSwissMap::new();
        map.insert("alpha".into(), vec![1, 2, 3]);
        assert_eq!(map.get("alpha"), Some(vec![1, 2, 3]));
        assert!(map.contains_key("alpha"));
        assert_eq!(map.remove("alpha"), Some(vec![1, 2, 3]));
    }
}
