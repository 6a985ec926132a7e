// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Proptest strategies.
//!
//! These are only available when using the `proptest` feature flag.

use std::hash::Hash;
use std::ops::Range;

use ::proptest::collection::vec;
use ::proptest::strategy::{BoxedStrategy, Strategy, ValueTree};

use crate::{HashMap, HashSet, SeqMap, SeqSet};

/// A strategy for a hash set of a given size.
///
/// # Examples
///
/// ```rust,no_run
/// # use ::proptest::proptest;
/// proptest! {
///     #[test]
///     fn proptest_a_set(ref s in champl::proptest::hash_set(".*", 10..100)) {
///         assert!(s.len() < 100);
///         assert!(s.len() >= 10);
///     }
/// }
/// ```
pub fn hash_set<A: Strategy + 'static>(
    element: A,
    size: Range<usize>,
) -> BoxedStrategy<HashSet<<A::Tree as ValueTree>::Value>>
where
    <A::Tree as ValueTree>::Value: Hash + Eq + Clone,
{
    vec(element, size.clone())
        .prop_map(HashSet::from)
        .prop_filter("HashSet minimum size".to_owned(), move |s| {
            s.len() >= size.start
        })
        .boxed()
}

/// A strategy for a hash map of a given size.
pub fn hash_map<K: Strategy + 'static, V: Strategy + 'static>(
    key: K,
    value: V,
    size: Range<usize>,
) -> BoxedStrategy<HashMap<<K::Tree as ValueTree>::Value, <V::Tree as ValueTree>::Value>>
where
    <K::Tree as ValueTree>::Value: Hash + Eq + Clone,
    <V::Tree as ValueTree>::Value: Clone,
{
    vec((key, value), size.clone())
        .prop_map(HashMap::from)
        .prop_filter("HashMap minimum size".to_owned(), move |m| {
            m.len() >= size.start
        })
        .boxed()
}

/// A strategy for an insertion-ordered set of a given size.
pub fn seq_set<A: Strategy + 'static>(
    element: A,
    size: Range<usize>,
) -> BoxedStrategy<SeqSet<<A::Tree as ValueTree>::Value>>
where
    <A::Tree as ValueTree>::Value: Hash + Eq + Clone,
{
    vec(element, size.clone())
        .prop_map(SeqSet::from)
        .prop_filter("SeqSet minimum size".to_owned(), move |s| {
            s.len() >= size.start
        })
        .boxed()
}

/// A strategy for an insertion-ordered map of a given size.
pub fn seq_map<K: Strategy + 'static, V: Strategy + 'static>(
    key: K,
    value: V,
    size: Range<usize>,
) -> BoxedStrategy<SeqMap<<K::Tree as ValueTree>::Value, <V::Tree as ValueTree>::Value>>
where
    <K::Tree as ValueTree>::Value: Hash + Eq + Clone,
    <V::Tree as ValueTree>::Value: Clone + PartialEq,
{
    vec((key, value), size.clone())
        .prop_map(SeqMap::from)
        .prop_filter("SeqMap minimum size".to_owned(), move |m| {
            m.len() >= size.start
        })
        .boxed()
}

#[cfg(test)]
mod test {
    use super::*;
    use ::proptest::num::i16;
    use ::proptest::proptest;

    proptest! {
        #[test]
        fn strategies_respect_the_size_range(
            ref s in hash_set(i16::ANY, 5..50),
            ref m in seq_map(i16::ANY, i16::ANY, 5..50)
        ) {
            assert!(s.len() >= 5 && s.len() < 50);
            assert!(m.len() >= 5 && m.len() < 50);
        }
    }
}
