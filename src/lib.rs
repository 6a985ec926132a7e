// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Hash sets and maps backed by CHAMP tries.
//!
//! This crate provides four collections, [`HashSet`], [`HashMap`] and
//! their insertion-ordered counterparts [`SeqSet`] and [`SeqMap`], each in
//! two flavors sharing one trie representation:
//!
//! - an **immutable** form whose update operations return a new collection,
//!   leaving the old one untouched. All unchanged trie nodes are shared
//!   between the versions, so keeping many versions costs memory in
//!   proportion to their differences.
//! - a **mutable** form (`HashSetMut` and friends) that owns its trie and
//!   edits nodes in place, for efficiently batching many updates.
//!
//! Converting between the two forms is O(1) either way:
//! `to_mutable` borrows the trie without taking ownership of any node,
//! and `to_immutable` publishes the trie by giving up the view's
//! *ownership token*.
//!
//! # Ownership
//!
//! Every mutable view holds a token whose allocation identity marks the
//! trie nodes it created. A write may edit a node in place only when the
//! node carries the view's current token; any other node (created by an
//! immutable operation, or published by an earlier `to_immutable`) is
//! copied together with its path to the root (copy-path-on-write). Since
//! the trie's height is bounded, both disciplines are O(log<sub>32</sub> n)
//! per write.
//!
//! # Ordering
//!
//! The plain variants iterate in an arbitrary but stable order determined
//! by the hasher. The `Seq` variants tag every element with a sequence
//! number and iterate in insertion order; they additionally support
//! `get_first`/`get_last`, `insert_first`/`insert_last`,
//! `pop_first`/`pop_last` and reversed iteration, and the mutable forms
//! offer a write-through [`reversed`][seqset::GenericSeqSetMut::reversed]
//! view.
//!
//! # Thread safety
//!
//! An immutable collection, once published, can be freely shared across
//! threads (with the default `ArcK` pointer kind). A mutable view is
//! single-owner. Iterators over a mutable view are fail-fast: structurally
//! modifying the view between two `next` calls makes the iterator panic
//! rather than serve a torn traversal.
//!
//! # Features
//!
//! - `serde`: serialization as element sequences / entry maps, in
//!   iteration order.
//! - `bincode`: a count-prefixed binary encoding of the same shape.
//! - `proptest`: strategies for generating collections.
//! - `arbitrary`, `quickcheck`: instances for fuzzing and property tests.
//! - `triomphe`: use `triomphe::Arc` as the default shared pointer.
//!
//! [`HashSet`]: ./hashset/type.HashSet.html
//! [`HashMap`]: ./hashmap/type.HashMap.html
//! [`SeqSet`]: ./seqset/type.SeqSet.html
//! [`SeqMap`]: ./seqmap/type.SeqMap.html

#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod util;

mod config;
mod fail_fast;
mod hash;
mod nodes;
mod seq;

pub mod shared_ptr;

#[cfg(feature = "arbitrary")]
mod arbitrary;
#[cfg(feature = "bincode")]
mod bincode;
#[cfg(any(test, feature = "proptest"))]
pub mod proptest;
#[cfg(feature = "quickcheck")]
mod quickcheck;
#[cfg(feature = "serde")]
mod ser;

/// An unordered set.
pub mod hashset {
    pub use crate::hash::set::{
        ConsumingIter, GenericHashSet, GenericHashSetMut, HashSet, HashSetMut, Iter, SnapshotIter,
    };
}

/// An unordered map.
pub mod hashmap {
    pub use crate::hash::map::{
        ConsumingIter, GenericHashMap, GenericHashMapMut, HashMap, HashMapMut, Iter, Keys,
        SnapshotIter, Values,
    };
}

/// An insertion-ordered set.
pub mod seqset {
    pub use crate::seq::set::{
        ConsumingIter, GenericSeqSet, GenericSeqSetMut, Iter, Reversed, SeqSet, SeqSetMut,
        SnapshotIter,
    };
}

/// An insertion-ordered map.
pub mod seqmap {
    pub use crate::seq::map::{
        ConsumingIter, GenericSeqMap, GenericSeqMapMut, Iter, Keys, Reversed, SeqMap, SeqMapMut,
        SnapshotIter, Values,
    };
}

pub use crate::hashmap::{GenericHashMap, GenericHashMapMut, HashMap, HashMapMut};
pub use crate::hashset::{GenericHashSet, GenericHashSetMut, HashSet, HashSetMut};
pub use crate::seqmap::{GenericSeqMap, GenericSeqMapMut, SeqMap, SeqMapMut};
pub use crate::seqset::{GenericSeqSet, GenericSeqSetMut, SeqSet, SeqSetMut};
pub use crate::shared_ptr::DefaultSharedPtr;

#[cfg(test)]
pub(crate) mod test {
    use metrohash::MetroHash64;
    use std::hash::{BuildHasher, Hasher};
    use std::marker::PhantomData;

    /// A deliberately terrible hash function: it uses at most `N` bits of
    /// output, so every test exercises collision nodes and shared hash
    /// prefixes rather than the happy path.
    pub(crate) struct LolHasher<const N: usize = 8> {
        state: u64,
        shift: usize,
        size: PhantomData<[(); N]>,
    }

    impl<const N: usize> LolHasher<N> {
        fn feed_me(&mut self, byte: u8) {
            self.state ^= u64::from(byte) << self.shift;
            self.shift += 8;
            if self.shift >= 64 {
                self.shift = 0;
            }
        }
    }

    impl<const N: usize> Hasher for LolHasher<N> {
        fn write(&mut self, bytes: &[u8]) {
            for byte in bytes {
                self.feed_me(*byte)
            }
        }

        fn finish(&self) -> u64 {
            if N == 64 {
                self.state
            } else {
                self.state & ((1 << N) - 1)
            }
        }
    }

    impl<const N: usize> Default for LolHasher<N> {
        fn default() -> Self {
            LolHasher {
                state: 0,
                shift: 0,
                size: PhantomData,
            }
        }
    }

    /// A seeded metrohash, for tests that need a deterministic but
    /// realistic hash distribution.
    #[derive(Clone, Copy)]
    pub(crate) struct MetroHashBuilder {
        seed: u64,
    }

    impl MetroHashBuilder {
        pub(crate) fn new(seed: u64) -> Self {
            MetroHashBuilder { seed }
        }

        #[allow(dead_code)]
        pub(crate) fn seed(&self) -> u64 {
            self.seed
        }
    }

    impl BuildHasher for MetroHashBuilder {
        type Hasher = MetroHash64;

        fn build_hasher(&self) -> MetroHash64 {
            MetroHash64::with_seed(self.seed)
        }
    }

    #[test]
    fn metrohash_is_deterministic_per_seed() {
        for seed in 0..10 {
            let a = MetroHashBuilder::new(seed);
            let b = MetroHashBuilder::new(seed);
            assert_eq!(a.hash_one("champ"), b.hash_one("champ"));
        }
    }

    #[test]
    fn drained_set_survives_a_hostile_hasher() {
        // exercises drain with a hostile, collision-heavy hasher
        for seed in 0..100 {
            let mut lhs = vec![0, 1, 2];
            lhs.sort_unstable();

            let hasher = MetroHashBuilder::new(seed);
            let mut set: crate::GenericHashSetMut<i32, MetroHashBuilder, crate::DefaultSharedPtr> =
                crate::GenericHashSetMut::with_hasher(hasher);
            for &i in &lhs {
                set.insert(i);
            }

            let mut rhs: Vec<_> = set.into_iter().collect();
            rhs.sort_unstable();
            assert_eq!(lhs, rhs, "seed: {}", seed);
        }
    }
}
