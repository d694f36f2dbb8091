#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

mod error;
mod group;
mod hash;
mod probe;
mod table;

/// A sharded, thread-safe map with optimistic reads over per-shard locks.
pub mod concurrent;

/// A SwissTable-style hash map.
///
/// This module provides [`SwissMap`], a key-value map over the
/// open-addressed control-byte table with configurable hashers.
pub mod map;

/// A SwissTable-style hash set.
///
/// This module provides [`SwissSet`], a set over the same table with a
/// zero-sized value plane.
pub mod set;

pub use concurrent::ConcurrentSwissMap;
pub use error::ConfigError;
pub use map::Entry;
pub use map::SwissMap;
pub use set::SwissSet;
