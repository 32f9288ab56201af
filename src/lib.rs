#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod allocator;

/// Cell layouts: sentinel policy, plain and hash-caching key-value cells.
pub mod cell;

pub mod grower;

/// A key-value map facade over the table core.
pub mod hash_map;

/// A dedup set facade over the table core.
pub mod hash_set;

pub mod hash_table;

pub use hash_map::HashMap;
pub use hash_map::HashMapTable;
pub use hash_map::HashMapWithSavedHash;
pub use hash_set::HashSet;
pub use hash_table::HashTable;
pub use hash_table::LookupResult;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used when none is specified.
        ///
        /// Fast, non-cryptographic hashing suited to trivial-width integer
        /// keys. Tables keyed by attacker-controlled input should supply a
        /// keyed hasher instead.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else {
        /// Stand-in for the default type parameter when the `foldhash`
        /// feature is disabled. It has no values; supply a `BuildHasher`
        /// explicitly.
        #[derive(Clone, Copy, Debug)]
        pub enum DefaultHashBuilder {}

        impl core::hash::Hasher for DefaultHashBuilder {
            fn finish(&self) -> u64 {
                match *self {}
            }

            fn write(&mut self, _bytes: &[u8]) {
                match *self {}
            }
        }

        impl core::hash::BuildHasher for DefaultHashBuilder {
            type Hasher = DefaultHashBuilder;

            fn build_hasher(&self) -> DefaultHashBuilder {
                match *self {}
            }
        }
    }
}
