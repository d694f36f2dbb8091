//! A SwissTable-style hash map.

use core::borrow::Borrow;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use std::collections::hash_map::RandomState;

use crate::error::validate_load_factor;
use crate::error::ConfigError;
use crate::hash::smeared_hash;
use crate::table::RawDrain;
use crate::table::RawIntoIter;
use crate::table::RawIter;
use crate::table::RawIterMut;
use crate::table::RawTable;

pub(crate) const DEFAULT_INITIAL_CAPACITY: usize = 16;
pub(crate) const DEFAULT_LOAD_FACTOR: f64 = 0.875;

/// A hash map built on an open-addressed table with packed control bytes
/// and group-wise probing.
///
/// `SwissMap<K, V, S>` stores key-value pairs where keys implement
/// `Hash + Eq` and uses a configurable hasher builder `S` (the standard
/// `RandomState` by default). One control byte per slot carries a 7-bit
/// fingerprint of the key's hash; lookups match a whole group of control
/// bytes at once and only touch the key cells whose fingerprints agree, so
/// most misses are rejected without a single key comparison.
///
/// Iteration order is deliberately randomized per iterator and never
/// reflects insertion order.
///
/// # Examples
///
/// ```rust
/// use hashsmith::SwissMap;
///
/// let mut map = SwissMap::new();
/// map.insert("a", 1);
/// map.insert("b", 2);
/// assert_eq!(map.get("a"), Some(&1));
/// assert_eq!(map.len(), 2);
/// ```
#[derive(Clone)]
pub struct SwissMap<K, V, S = RandomState> {
    table: RawTable<K, V>,
    hash_builder: S,
}

impl<K, V> SwissMap<K, V, RandomState> {
    /// Creates an empty map with the default capacity (16) and load
    /// factor (0.875).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hashsmith::SwissMap;
    ///
    /// let map: SwissMap<i32, String> = SwissMap::new();
    /// assert!(map.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_INITIAL_CAPACITY)
    }

    /// Creates an empty map with room for at least `capacity` entries'
    /// slots before the first resize.
    ///
    /// The actual capacity is rounded up to a power-of-two multiple of
    /// the probe-group width.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }

    /// Creates an empty map with explicit capacity and load factor.
    ///
    /// # Panics
    ///
    /// Panics if `load_factor` lies outside (0, 1). Use
    /// [`try_with_options`](Self::try_with_options) for a fallible
    /// variant.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hashsmith::SwissMap;
    ///
    /// let map: SwissMap<u32, u32> = SwissMap::with_options(64, 0.5);
    /// assert!(map.capacity() >= 64);
    /// ```
    pub fn with_options(capacity: usize, load_factor: f64) -> Self {
        match Self::try_with_options(capacity, load_factor) {
            Ok(map) => map,
            Err(e) => panic!("{e}"),
        }
    }

    /// Fallible form of [`with_options`](Self::with_options).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hashsmith::SwissMap;
    ///
    /// assert!(SwissMap::<u32, u32>::try_with_options(16, 1.5).is_err());
    /// ```
    pub fn try_with_options(capacity: usize, load_factor: f64) -> Result<Self, ConfigError> {
        Self::try_with_options_and_hasher(capacity, load_factor, RandomState::new())
    }
}

impl<K, V, S> SwissMap<K, V, S> {
    /// Creates an empty map using `hash_builder` to hash keys.
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(DEFAULT_INITIAL_CAPACITY, hash_builder)
    }

    /// Creates an empty map with the given capacity and hasher builder.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: RawTable::with_capacity_and_load_factor(capacity, DEFAULT_LOAD_FACTOR),
            hash_builder,
        }
    }

    /// Creates an empty map with explicit capacity, load factor, and
    /// hasher builder, failing on an out-of-range load factor.
    pub fn try_with_options_and_hasher(
        capacity: usize,
        load_factor: f64,
        hash_builder: S,
    ) -> Result<Self, ConfigError> {
        let load_factor = validate_load_factor(load_factor)?;
        Ok(Self {
            table: RawTable::with_capacity_and_load_factor(capacity, load_factor),
            hash_builder,
        })
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Returns the total slot count. Always a power-of-two multiple of
    /// the probe-group width; the map rebuilds before occupancy reaches
    /// `capacity * load_factor`.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Removes all entries, retaining the allocated capacity.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hashsmith::SwissMap;
    ///
    /// let mut map = SwissMap::new();
    /// map.insert(1, "a");
    /// map.clear();
    /// assert!(map.is_empty());
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Visits all entries in a randomized order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Visits all entries in a randomized order, values mutably.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            inner: self.table.iter_mut(),
        }
    }

    /// Visits all keys in a randomized order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            inner: self.table.iter(),
        }
    }

    /// Visits all values in a randomized order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values {
            inner: self.table.iter(),
        }
    }

    /// Visits all values mutably in a randomized order.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.table.iter_mut(),
        }
    }

    /// Removes every entry and yields the removed pairs.
    ///
    /// The map is empty as soon as `drain` returns, even if the iterator
    /// is not consumed.
    pub fn drain(&mut self) -> Drain<'_, K, V> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Keeps only the entries for which `f` returns `true`.
    ///
    /// Rejected entries are tombstoned exactly like iterator removal:
    /// the walk never rebuilds the table mid-flight.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hashsmith::SwissMap;
    ///
    /// let mut map: SwissMap<u32, u32> = (0..8).map(|i| (i, i)).collect();
    /// map.retain(|k, _| k % 2 == 0);
    /// assert_eq!(map.len(), 4);
    /// ```
    pub fn retain(&mut self, f: impl FnMut(&K, &mut V) -> bool) {
        self.table.retain(f);
    }

    #[cfg(test)]
    pub(crate) fn tombstones(&self) -> usize {
        self.table.tombstones()
    }

    #[cfg(test)]
    pub(crate) fn max_load(&self) -> usize {
        self.table.max_load()
    }
}

impl<K, V, S> SwissMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Returns a reference to the value for `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hashsmith::SwissMap;
    ///
    /// let mut map = SwissMap::new();
    /// map.insert(String::from("k"), 7);
    /// assert_eq!(map.get("k"), Some(&7));
    /// assert_eq!(map.get("missing"), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let smeared = smeared_hash(&self.hash_builder, key);
        let idx = self.table.find(smeared, key)?;
        // SAFETY: `find` returned a live slot.
        Some(unsafe { self.table.value_at(idx) })
    }

    /// Returns the stored key-value pair for `key`.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let smeared = smeared_hash(&self.hash_builder, key);
        let idx = self.table.find(smeared, key)?;
        // SAFETY: `find` returned a live slot.
        Some(unsafe { (self.table.key_at(idx), self.table.value_at(idx)) })
    }

    /// Returns a mutable reference to the value for `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let smeared = smeared_hash(&self.hash_builder, key);
        let idx = self.table.find(smeared, key)?;
        // SAFETY: `find` returned a live slot.
        Some(unsafe { self.table.value_at_mut(idx) })
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let smeared = smeared_hash(&self.hash_builder, key);
        self.table.find(smeared, key).is_some()
    }

    /// Returns `true` if any entry holds `value`. Linear scan.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.iter().any(|(_, v)| v == value)
    }

    /// Inserts a key-value pair, returning the previous value when `key`
    /// was already present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hashsmith::SwissMap;
    ///
    /// let mut map = SwissMap::new();
    /// assert_eq!(map.insert("a", 1), None);
    /// assert_eq!(map.insert("a", 2), Some(1));
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let Self {
            table,
            hash_builder,
        } = self;
        let smeared = smeared_hash(&*hash_builder, &key);
        table.put(smeared, key, value, &|k| smeared_hash(&*hash_builder, k))
    }

    /// Removes `key` from the map, returning its value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hashsmith::SwissMap;
    ///
    /// let mut map = SwissMap::new();
    /// map.insert(5, "five");
    /// assert_eq!(map.remove(&5), Some("five"));
    /// assert_eq!(map.remove(&5), None);
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes `key`, returning the stored key and value.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Self {
            table,
            hash_builder,
        } = self;
        let smeared = smeared_hash(&*hash_builder, key);
        table.remove(smeared, key, &|k| smeared_hash(&*hash_builder, k))
    }

    /// Removes `key` and immediately rebuilds the table at its current
    /// capacity, leaving no tombstones behind.
    ///
    /// Quadratic probing rules out the backward-shift deletion a
    /// linear-probing table could use, so tombstone-free removal costs a
    /// full rebuild; this is mainly useful ahead of a read-heavy phase.
    pub fn remove_compact<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Self {
            table,
            hash_builder,
        } = self;
        let smeared = smeared_hash(&*hash_builder, key);
        let (_, value) = table.remove_keep_tombstone(smeared, key)?;
        table.force_compact(&|k| smeared_hash(&*hash_builder, k));
        Some(value)
    }

    /// Reserves capacity for at least `additional` further inserts.
    ///
    /// Projects the future occupancy conservatively (tombstones on the
    /// probe paths are reusable) and performs at most one rebuild, after
    /// which the `additional` inserts proceed without resize checks.
    pub fn reserve(&mut self, additional: usize) {
        let Self {
            table,
            hash_builder,
        } = self;
        table.reserve(additional, &|k| smeared_hash(&*hash_builder, k));
    }

    /// Shrinks the table to the smallest capacity that still holds the
    /// current entries under the configured load factor.
    pub fn shrink_to_fit(&mut self) {
        let Self {
            table,
            hash_builder,
        } = self;
        table.shrink_to_fit(&|k| smeared_hash(&*hash_builder, k));
    }

    /// Gets the entry for `key` for in-place manipulation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hashsmith::SwissMap;
    ///
    /// let mut counts: SwissMap<char, u32> = SwissMap::new();
    /// for c in "abracadabra".chars() {
    ///     *counts.entry(c).or_insert(0) += 1;
    /// }
    /// assert_eq!(counts.get(&'a'), Some(&5));
    /// assert_eq!(counts.get(&'b'), Some(&2));
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, S> {
        let smeared = smeared_hash(&self.hash_builder, &key);
        match self.table.find(smeared, &key) {
            Some(idx) => Entry::Occupied(OccupiedEntry {
                map: self,
                idx,
                key,
            }),
            None => Entry::Vacant(VacantEntry {
                map: self,
                smeared,
                key,
            }),
        }
    }
}

impl<K, V, S> Default for SwissMap<K, V, S>
where
    S: Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> Debug for SwissMap<K, V, S>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> Extend<(K, V)> for SwissMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Bulk insert. Pre-sizes from the iterator's lower size bound so the
    /// whole batch triggers at most one rebuild up front.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for SwissMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_hasher(S::default());
        map.extend(iter);
        map
    }
}

impl<'a, K, V, S> IntoIterator for &'a SwissMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut SwissMap<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}

impl<K, V, S> IntoIterator for SwissMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> IntoIter<K, V> {
        IntoIter {
            inner: self.table.into_entries(),
        }
    }
}

/// Owning iterator over a map's entries.
pub struct IntoIter<K, V> {
    inner: RawIntoIter<K, V>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

/// Iterator over a map's entries. See [`SwissMap::iter`].
pub struct Iter<'a, K, V> {
    inner: RawIter<'a, K, V>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// Iterator over a map's entries with mutable values. See
/// [`SwissMap::iter_mut`].
pub struct IterMut<'a, K, V> {
    inner: RawIterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

/// Iterator over a map's keys. See [`SwissMap::keys`].
pub struct Keys<'a, K, V> {
    inner: RawIter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

/// Iterator over a map's values. See [`SwissMap::values`].
pub struct Values<'a, K, V> {
    inner: RawIter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

/// Iterator over a map's values, mutably. See [`SwissMap::values_mut`].
pub struct ValuesMut<'a, K, V> {
    inner: RawIterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}

/// A view into a single map entry, which is either vacant or occupied.
///
/// Constructed by [`SwissMap::entry`].
pub enum Entry<'a, K, V, S> {
    /// The key is present.
    Occupied(OccupiedEntry<'a, K, V, S>),
    /// The key is absent.
    Vacant(VacantEntry<'a, K, V, S>),
}

impl<'a, K, V, S> Entry<'a, K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Inserts `default` if the entry is vacant; returns a mutable
    /// reference to the value either way.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant; returns a
    /// mutable reference to the value either way.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Inserts `V::default()` if the entry is vacant; returns a mutable
    /// reference to the value either way.
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(V::default)
    }

    /// Mutates the value in place when the entry is occupied.
    #[must_use]
    pub fn and_modify(self, f: impl FnOnce(&mut V)) -> Self {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            vacant => vacant,
        }
    }

    /// The key this entry was looked up with.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }
}

/// A view into an occupied map entry; see [`SwissMap::entry`].
pub struct OccupiedEntry<'a, K, V, S> {
    map: &'a mut SwissMap<K, V, S>,
    idx: usize,
    key: K,
}

impl<'a, K, V, S> OccupiedEntry<'a, K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// The entry's key.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// A reference to the entry's value.
    pub fn get(&self) -> &V {
        // SAFETY: `idx` came from `find`, and the exclusive map borrow
        // means no operation has touched the slot since.
        unsafe { self.map.table.value_at(self.idx) }
    }

    /// A mutable reference to the entry's value.
    pub fn get_mut(&mut self) -> &mut V {
        // SAFETY: As in `get`.
        unsafe { self.map.table.value_at_mut(self.idx) }
    }

    /// Converts the entry into a mutable reference tied to the map.
    pub fn into_mut(self) -> &'a mut V {
        let OccupiedEntry { map, idx, .. } = self;
        // SAFETY: As in `get`.
        unsafe { map.table.value_at_mut(idx) }
    }

    /// Replaces the entry's value, returning the old one.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(self.get_mut(), value)
    }

    /// Removes the entry, returning its value.
    pub fn remove(self) -> V {
        self.remove_entry().1
    }

    /// Removes the entry, returning the stored key and value.
    pub fn remove_entry(self) -> (K, V) {
        let OccupiedEntry { map, idx, .. } = self;
        let SwissMap {
            table,
            hash_builder,
        } = map;
        // SAFETY: `idx` came from `find` on this same borrow of the map.
        unsafe { table.remove_slot(idx, &|k| smeared_hash(&*hash_builder, k)) }
    }
}

/// A view into a vacant map entry; see [`SwissMap::entry`].
pub struct VacantEntry<'a, K, V, S> {
    map: &'a mut SwissMap<K, V, S>,
    smeared: u32,
    key: K,
}

impl<'a, K, V, S> VacantEntry<'a, K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// The key that was looked up.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Recovers the looked-up key without inserting.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Inserts a value for the key and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        let VacantEntry { map, smeared, key } = self;
        let SwissMap {
            table,
            hash_builder,
        } = map;
        let idx = table.insert_slot(smeared, key, value, &|k| smeared_hash(&*hash_builder, k));
        // SAFETY: `insert_slot` returned the freshly filled slot.
        unsafe { table.value_at_mut(idx) }
    }
}

/// Draining iterator over a map's entries. See [`SwissMap::drain`].
pub struct Drain<'a, K, V> {
    inner: RawDrain<'a, K, V>,
}

impl<K, V> Iterator for Drain<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Drain<'_, K, V> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrite_and_miss() {
        let mut map = SwissMap::new();
        map.insert("a", 1);
        map.insert("b", 2);
        map.insert("a", 3);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a"), Some(&3));
        assert_eq!(map.get("b"), Some(&2));
        assert_eq!(map.get("c"), None);
    }

    #[test]
    fn small_capacity_grows_through_inserts() {
        let mut map = SwissMap::with_capacity(4);
        let initial_capacity = map.capacity();
        for i in 0..32u32 {
            map.insert(i, i * 10);
        }
        assert_eq!(map.len(), 32);
        for i in 0..32u32 {
            assert_eq!(map.get(&i), Some(&(i * 10)));
        }
        assert!(map.capacity() > initial_capacity, "a grow rehash must have run");
    }

    #[test]
    fn deletion_heavy_keeps_capacity_and_compacts() {
        let mut map = SwissMap::new();
        for i in 0..16u32 {
            map.insert(i, i);
        }
        let capacity_after_inserts = map.capacity();

        for i in 0..9u32 {
            assert_eq!(map.remove(&i), Some(i));
        }
        assert_eq!(map.len(), 7);
        assert_eq!(map.capacity(), capacity_after_inserts);
        assert_eq!(map.tombstones(), 0);
    }

    #[test]
    fn fifteenth_insert_doubles_a_sixteen_slot_table() {
        let mut map = SwissMap::with_options(16, 0.875);
        assert_eq!(map.capacity(), 16);
        assert_eq!(map.max_load(), 14);

        for i in 0..14u32 {
            map.insert(i, i);
        }
        assert_eq!(map.capacity(), 16);

        map.insert(14, 14);
        assert!(map.capacity() >= 32);
        for i in 0..15u32 {
            assert_eq!(map.get(&i), Some(&i));
        }
    }

    #[test]
    fn remove_decrements_size_exactly_once() {
        let mut map = SwissMap::new();
        map.insert(1, "x");
        let before = map.len();
        assert_eq!(map.remove(&1), Some("x"));
        assert_eq!(map.len(), before - 1);
        assert_eq!(map.get(&1), None);
    }

    #[test]
    fn borrowed_key_lookups() {
        let mut map: SwissMap<String, u32> = SwissMap::new();
        map.insert("alpha".to_string(), 1);
        assert!(map.contains_key("alpha"));
        assert_eq!(map.get("alpha"), Some(&1));
        assert_eq!(map.remove("alpha"), Some(1));
        assert!(!map.contains_key("alpha"));
    }

    #[test]
    fn get_mut_and_values_mut() {
        let mut map: SwissMap<u32, u32> = (0..10).map(|i| (i, i)).collect();
        *map.get_mut(&3).unwrap() += 100;
        assert_eq!(map.get(&3), Some(&103));

        for v in map.values_mut() {
            *v += 1;
        }
        assert_eq!(map.get(&0), Some(&1));
        assert_eq!(map.get(&3), Some(&104));
    }

    #[test]
    fn extend_presizes_for_the_whole_batch() {
        let mut map: SwissMap<u32, u32> = SwissMap::with_capacity(8);
        map.extend((0..1000).map(|i| (i, i)));
        assert_eq!(map.len(), 1000);
        assert!(map.capacity() as f64 * 0.875 >= 1000.0);
        for i in (0..1000).step_by(97) {
            assert_eq!(map.get(&i), Some(&i));
        }

        // Pure-overlap extend: values update, size does not.
        map.extend((0..1000).map(|i| (i, i + 1)));
        assert_eq!(map.len(), 1000);
        assert_eq!(map.get(&999), Some(&1000));
    }

    #[test]
    fn remove_compact_leaves_no_tombstones() {
        let mut map: SwissMap<u32, u32> = (0..12).map(|i| (i, i)).collect();
        let cap = map.capacity();
        assert_eq!(map.remove_compact(&4), Some(4));
        assert_eq!(map.tombstones(), 0);
        assert_eq!(map.capacity(), cap);
        assert_eq!(map.len(), 11);
        assert_eq!(map.remove_compact(&4), None);
    }

    #[test]
    fn contains_value_scans() {
        let mut map = SwissMap::new();
        map.insert(1, "one");
        map.insert(2, "two");
        assert!(map.contains_value(&"one"));
        assert!(!map.contains_value(&"three"));
    }

    #[test]
    fn drain_and_reuse() {
        let mut map: SwissMap<u32, u32> = (0..20).map(|i| (i, i)).collect();
        let drained: Vec<(u32, u32)> = map.drain().collect();
        assert_eq!(drained.len(), 20);
        assert!(map.is_empty());
        map.insert(1, 2);
        assert_eq!(map.get(&1), Some(&2));
    }

    #[test]
    fn iteration_is_complete_and_order_varies() {
        let map: SwissMap<u32, u32> = (0..64).map(|i| (i, i)).collect();
        let mut keys: Vec<u32> = map.keys().copied().collect();
        assert_eq!(keys.len(), 64);
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), 64);

        let first: Vec<u32> = map.keys().copied().collect();
        let differs = (0..16).any(|_| {
            let again: Vec<u32> = map.keys().copied().collect();
            again != first
        });
        assert!(differs);
    }

    #[test]
    fn invalid_load_factor_is_rejected() {
        assert!(SwissMap::<u32, u32>::try_with_options(16, 0.0).is_err());
        assert!(SwissMap::<u32, u32>::try_with_options(16, 1.0).is_err());
        assert!(SwissMap::<u32, u32>::try_with_options(16, 0.875).is_ok());
    }

    #[test]
    #[should_panic(expected = "load factor")]
    fn with_options_panics_on_bad_load_factor() {
        let _ = SwissMap::<u32, u32>::with_options(16, 2.0);
    }

    #[test]
    fn debug_formats_entries() {
        let mut map = SwissMap::new();
        map.insert(1, 2);
        let s = format!("{map:?}");
        assert!(s.contains("1: 2"));
    }

    #[test]
    fn entry_api_inserts_and_updates() {
        let mut map: SwissMap<&str, u32> = SwissMap::new();

        *map.entry("a").or_insert(0) += 1;
        *map.entry("a").or_insert(0) += 1;
        assert_eq!(map.get("a"), Some(&2));

        map.entry("b").or_insert_with(|| 10);
        assert_eq!(map.get("b"), Some(&10));

        let v = map.entry("c").or_default();
        assert_eq!(*v, 0);

        map.entry("a").and_modify(|v| *v *= 5).or_insert(99);
        assert_eq!(map.get("a"), Some(&10));
        map.entry("d").and_modify(|v| *v *= 5).or_insert(99);
        assert_eq!(map.get("d"), Some(&99));
    }

    #[test]
    fn occupied_entry_access_and_removal() {
        let mut map: SwissMap<u32, String> = SwissMap::new();
        map.insert(1, "one".to_string());

        match map.entry(1) {
            Entry::Occupied(mut entry) => {
                assert_eq!(entry.key(), &1);
                assert_eq!(entry.get(), "one");
                let old = entry.insert("uno".to_string());
                assert_eq!(old, "one");
            }
            Entry::Vacant(_) => panic!("should be occupied"),
        }
        assert_eq!(map.get(&1).map(String::as_str), Some("uno"));

        match map.entry(1) {
            Entry::Occupied(entry) => {
                let (k, v) = entry.remove_entry();
                assert_eq!((k, v.as_str()), (1, "uno"));
            }
            Entry::Vacant(_) => panic!("should be occupied"),
        }
        assert!(map.is_empty());

        match map.entry(7) {
            Entry::Vacant(entry) => {
                assert_eq!(entry.key(), &7);
                assert_eq!(entry.into_key(), 7);
            }
            Entry::Occupied(_) => panic!("should be vacant"),
        }
        assert!(map.is_empty());
    }

    #[test]
    fn shrink_to_fit_after_churn() {
        let mut map: SwissMap<u32, u32> = (0..2_000).map(|i| (i, i)).collect();
        for i in 0..1_990 {
            map.remove(&i);
        }
        let grown = map.capacity();
        map.shrink_to_fit();
        assert!(map.capacity() < grown);
        assert_eq!(map.len(), 10);
        for i in 1_990..2_000 {
            assert_eq!(map.get(&i), Some(&i));
        }
    }

    #[test]
    fn owned_iteration_consumes_the_map() {
        let map: SwissMap<u32, String> = (0..50).map(|i| (i, i.to_string())).collect();
        let mut pairs: Vec<(u32, String)> = map.into_iter().collect();
        pairs.sort_unstable();
        assert_eq!(pairs.len(), 50);
        for (i, (k, v)) in pairs.iter().enumerate() {
            assert_eq!(*k, i as u32);
            assert_eq!(v, &i.to_string());
        }
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn million_keys_survive_rehashes() {
        let mut map: SwissMap<u64, u64> = SwissMap::with_capacity(16);
        const N: u64 = 1_000_000;
        for i in 0..N {
            map.insert(i, i.wrapping_mul(31));
        }
        assert_eq!(map.len(), N as usize);
        for i in (0..N).step_by(997) {
            assert_eq!(map.get(&i), Some(&i.wrapping_mul(31)));
        }
        assert_eq!(map.get(&N), None);
    }
}
