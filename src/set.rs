//! A SwissTable-style hash set.

use core::borrow::Borrow;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use std::collections::hash_map::RandomState;

use crate::error::validate_load_factor;
use crate::error::ConfigError;
use crate::hash::smeared_hash;
use crate::map::DEFAULT_INITIAL_CAPACITY;
use crate::map::DEFAULT_LOAD_FACTOR;
use crate::table::RawDrain;
use crate::table::RawIntoIter;
use crate::table::RawIter;
use crate::table::RawTable;

/// A hash set sharing the map's open-addressed table, with a zero-sized
/// value plane.
///
/// `SwissSet<T, S>` stores elements implementing `Hash + Eq`. There is no
/// notion of an absent "null" element: every value of `T` is an ordinary
/// element, and callers that need a null-like member simply store
/// `Option<T>`.
///
/// Iteration order is randomized per iterator.
///
/// # Examples
///
/// ```rust
/// use hashsmith::SwissSet;
///
/// let mut set = SwissSet::new();
/// assert!(set.insert("a"));
/// assert!(!set.insert("a"));
/// assert!(set.contains("a"));
/// assert_eq!(set.len(), 1);
/// ```
#[derive(Clone)]
pub struct SwissSet<T, S = RandomState> {
    table: RawTable<T, ()>,
    hash_builder: S,
}

impl<T> SwissSet<T, RandomState> {
    /// Creates an empty set with the default capacity (16) and load
    /// factor (0.875).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_INITIAL_CAPACITY)
    }

    /// Creates an empty set with room for at least `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }

    /// Creates an empty set with explicit capacity and load factor.
    ///
    /// # Panics
    ///
    /// Panics if `load_factor` lies outside (0, 1).
    pub fn with_options(capacity: usize, load_factor: f64) -> Self {
        match Self::try_with_options(capacity, load_factor) {
            Ok(set) => set,
            Err(e) => panic!("{e}"),
        }
    }

    /// Fallible form of [`with_options`](Self::with_options).
    pub fn try_with_options(capacity: usize, load_factor: f64) -> Result<Self, ConfigError> {
        let load_factor = validate_load_factor(load_factor)?;
        Ok(Self {
            table: RawTable::with_capacity_and_load_factor(capacity, load_factor),
            hash_builder: RandomState::new(),
        })
    }
}

impl<T, S> SwissSet<T, S> {
    /// Creates an empty set using `hash_builder` to hash elements.
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(DEFAULT_INITIAL_CAPACITY, hash_builder)
    }

    /// Creates an empty set with the given capacity and hasher builder.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: RawTable::with_capacity_and_load_factor(capacity, DEFAULT_LOAD_FACTOR),
            hash_builder,
        }
    }

    /// Returns the number of elements in the set.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Returns the total slot count.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Removes all elements, retaining the allocated capacity.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Visits all elements in a randomized order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Removes every element and yields them.
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Keeps only the elements for which `f` returns `true`.
    ///
    /// Rejected elements are tombstoned like iterator removal; the walk
    /// never rebuilds the table mid-flight.
    pub fn retain(&mut self, mut f: impl FnMut(&T) -> bool) {
        self.table.retain(|element, _| f(element));
    }

    #[cfg(test)]
    pub(crate) fn tombstones(&self) -> usize {
        self.table.tombstones()
    }
}

impl<T, S> SwissSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    /// Adds an element, returning `true` if it was not already present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hashsmith::SwissSet;
    ///
    /// let mut set = SwissSet::new();
    /// assert!(set.insert(3));
    /// assert!(!set.insert(3));
    /// ```
    #[doc(alias = "add")]
    pub fn insert(&mut self, element: T) -> bool {
        let Self {
            table,
            hash_builder,
        } = self;
        let smeared = smeared_hash(&*hash_builder, &element);
        table
            .put(smeared, element, (), &|e| smeared_hash(&*hash_builder, e))
            .is_none()
    }

    /// Returns `true` if the set contains `element`.
    pub fn contains<Q>(&self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let smeared = smeared_hash(&self.hash_builder, element);
        self.table.find(smeared, element).is_some()
    }

    /// Returns the stored element equal to `element`.
    pub fn get<Q>(&self, element: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let smeared = smeared_hash(&self.hash_builder, element);
        let idx = self.table.find(smeared, element)?;
        // SAFETY: `find` returned a live slot.
        Some(unsafe { self.table.key_at(idx) })
    }

    /// Removes `element`, returning `true` if it was present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hashsmith::SwissSet;
    ///
    /// let mut set = SwissSet::new();
    /// set.insert('x');
    /// assert!(set.remove(&'x'));
    /// assert!(!set.remove(&'x'));
    /// ```
    pub fn remove<Q>(&mut self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.take(element).is_some()
    }

    /// Removes and returns the stored element equal to `element`.
    pub fn take<Q>(&mut self, element: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Self {
            table,
            hash_builder,
        } = self;
        let smeared = smeared_hash(&*hash_builder, element);
        table
            .remove(smeared, element, &|e| smeared_hash(&*hash_builder, e))
            .map(|(element, ())| element)
    }

    /// Reserves capacity for at least `additional` further inserts with
    /// at most one rebuild.
    pub fn reserve(&mut self, additional: usize) {
        let Self {
            table,
            hash_builder,
        } = self;
        table.reserve(additional, &|e| smeared_hash(&*hash_builder, e));
    }

    /// Shrinks the table to the smallest capacity that still holds the
    /// current elements under the configured load factor.
    pub fn shrink_to_fit(&mut self) {
        let Self {
            table,
            hash_builder,
        } = self;
        table.shrink_to_fit(&|e| smeared_hash(&*hash_builder, e));
    }
}

impl<T, S> Default for SwissSet<T, S>
where
    S: Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<T, S> Debug for SwissSet<T, S>
where
    T: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, S> Extend<T> for SwissSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for element in iter {
            self.insert(element);
        }
    }
}

impl<T, S> FromIterator<T> for SwissSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::with_hasher(S::default());
        set.extend(iter);
        set
    }
}

impl<'a, T, S> IntoIterator for &'a SwissSet<T, S> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<T, S> IntoIterator for SwissSet<T, S> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        IntoIter {
            inner: self.table.into_entries(),
        }
    }
}

/// Owning iterator over a set's elements.
pub struct IntoIter<T> {
    inner: RawIntoIter<T, ()>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

/// Iterator over a set's elements. See [`SwissSet::iter`].
pub struct Iter<'a, T> {
    inner: RawIter<'a, T, ()>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

/// Draining iterator over a set's elements. See [`SwissSet::drain`].
pub struct Drain<'a, T> {
    inner: RawDrain<'a, T, ()>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Drain<'_, T> {}
