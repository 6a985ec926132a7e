// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::{
    shared_ptr::SharedPointerKind, GenericHashMap, GenericHashSet, GenericSeqMap, GenericSeqSet,
};
use ::quickcheck::{Arbitrary, Gen};
use std::hash::{BuildHasher, Hash};
use std::iter::FromIterator;

impl<A, S, P> Arbitrary for GenericHashSet<A, S, P>
where
    A: Hash + Eq + Clone + Arbitrary + Sync,
    S: BuildHasher + Clone + Default + Send + Sync + 'static,
    P: SharedPointerKind + 'static,
{
    fn arbitrary(g: &mut Gen) -> Self {
        GenericHashSet::from_iter(Vec::<A>::arbitrary(g))
    }
}

impl<K, V, S, P> Arbitrary for GenericHashMap<K, V, S, P>
where
    K: Hash + Eq + Clone + Arbitrary + Sync,
    V: Clone + Arbitrary + Sync,
    S: BuildHasher + Clone + Default + Send + Sync + 'static,
    P: SharedPointerKind + 'static,
{
    fn arbitrary(g: &mut Gen) -> Self {
        GenericHashMap::from_iter(Vec::<(K, V)>::arbitrary(g))
    }
}

impl<A, S, P> Arbitrary for GenericSeqSet<A, S, P>
where
    A: Hash + Eq + Clone + Arbitrary + Sync,
    S: BuildHasher + Clone + Default + Send + Sync + 'static,
    P: SharedPointerKind + 'static,
{
    fn arbitrary(g: &mut Gen) -> Self {
        GenericSeqSet::from_iter(Vec::<A>::arbitrary(g))
    }
}

impl<K, V, S, P> Arbitrary for GenericSeqMap<K, V, S, P>
where
    K: Hash + Eq + Clone + Arbitrary + Sync,
    V: Clone + PartialEq + Arbitrary + Sync,
    S: BuildHasher + Clone + Default + Send + Sync + 'static,
    P: SharedPointerKind + 'static,
{
    fn arbitrary(g: &mut Gen) -> Self {
        GenericSeqMap::from_iter(Vec::<(K, V)>::arbitrary(g))
    }
}
