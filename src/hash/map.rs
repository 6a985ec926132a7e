// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! An unordered map.
//!
//! A hash map backed by a [CHAMP trie][1], in two flavors that hand off to
//! each other in O(1): [`GenericHashMap`], whose operations return new maps
//! sharing structure with the old one, and [`GenericHashMapMut`], a
//! single-owner view that edits its exclusively owned trie nodes in place.
//!
//! Single-key operations are O(log<sub>32</sub> n), which is close enough
//! to O(1) for any practical size. Iteration order is arbitrary but stable
//! for a given map; see the `seqmap` module for the variant that iterates
//! in insertion order.
//!
//! Map entries will have a predictable order based on the hasher being
//! used. Unless otherwise specified, this will be the standard
//! [`RandomState`][std::collections::hash_map::RandomState] hasher.
//!
//! [1]: https://michael.steindorfer.name/publications/phd-thesis-efficient-immutable-collections
//! [std::collections::hash_map::RandomState]: https://doc.rust-lang.org/std/collections/hash_map/struct.RandomState.html

use std::borrow::Borrow;
use std::collections;
use std::collections::hash_map::RandomState;
use std::fmt::{Debug, Error, Formatter};
use std::hash::{BuildHasher, Hash};
use std::iter::{FromIterator, FusedIterator};
use std::ops::Index;

use archery::{SharedPointer, SharedPointerKind};

use crate::fail_fast::{FailFast, ModCount};
use crate::nodes::champ::{
    hash_key, ChangeEvent, Drain as NodeDrain, HashValue, Iter as NodeIter, Node, OwnerToken,
};
use crate::shared_ptr::DefaultSharedPtr;

/// Construct a hash map from a sequence of key/value pairs.
///
/// # Examples
///
/// ```
/// # #[macro_use] extern crate champl;
/// # use champl::HashMap;
/// # fn main() {
/// assert_eq!(
///   hashmap!{
///     1 => 11,
///     2 => 22,
///     3 => 33
///   },
///   HashMap::from(vec![(1, 11), (2, 22), (3, 33)])
/// );
/// # }
/// ```
#[macro_export]
macro_rules! hashmap {
    () => { $crate::hashmap::HashMap::new() };

    ( $( $key:expr => $value:expr ),* ) => {{
        let mut map = $crate::hashmap::HashMapMut::new();
        $({
            map.insert($key, $value);
        })*;
        map.to_immutable()
    }};

    ( $( $key:expr => $value:expr ,)* ) => {{
        let mut map = $crate::hashmap::HashMapMut::new();
        $({
            map.insert($key, $value);
        })*;
        map.to_immutable()
    }};
}

/// Type alias for [`GenericHashMap`] with the default hasher and pointer
/// kind.
///
/// [GenericHashMap]: ./struct.GenericHashMap.html
pub type HashMap<K, V> = GenericHashMap<K, V, RandomState, DefaultSharedPtr>;

/// Type alias for [`GenericHashMapMut`] with the default hasher and pointer
/// kind.
///
/// [GenericHashMapMut]: ./struct.GenericHashMapMut.html
pub type HashMapMut<K, V> = GenericHashMapMut<K, V, RandomState, DefaultSharedPtr>;

/// An unordered map whose update operations return a new map.
///
/// Every returned map shares all untouched trie nodes with its ancestor, so
/// keeping many versions around costs memory proportional to the changes
/// between them, not to their sizes. An operation that has no effect
/// (inserting a mapping that is already present, removing an absent key)
/// returns a map sharing the root wholesale, `ptr_eq` with the receiver.
pub struct GenericHashMap<K, V, S, P: SharedPointerKind> {
    hasher: S,
    root: Option<SharedPointer<Node<(K, V), P>, P>>,
    size: usize,
}

/// An unordered map that is updated in place.
///
/// The view owns an ownership token; trie nodes created under the current
/// token are edited directly, everything else is copied on first touch.
/// [`to_immutable`][GenericHashMapMut::to_immutable] publishes the current
/// contents in O(1) by dropping the token.
///
/// The view is single-owner and not thread-safe; share the immutable form
/// instead.
pub struct GenericHashMapMut<K, V, S, P: SharedPointerKind> {
    hasher: S,
    root: Option<SharedPointer<Node<(K, V), P>, P>>,
    size: usize,
    mutator: Option<OwnerToken<P>>,
    mod_count: ModCount<P>,
}

impl<K, V> HashValue for (K, V)
where
    K: Eq,
{
    type Key = K;

    fn extract_key(&self) -> &Self::Key {
        &self.0
    }
}

impl<K, V, P> GenericHashMap<K, V, RandomState, P>
where
    K: Hash + Eq + Clone,
    V: Clone + PartialEq,
    P: SharedPointerKind,
{
    /// Construct a hash map with a single mapping.
    ///
    /// # Examples
    ///
    /// ```
    /// # use champl::HashMap;
    /// let map = HashMap::unit(123, "onetwothree");
    /// assert_eq!(
    ///   map.get(&123),
    ///   Some(&"onetwothree")
    /// );
    /// ```
    #[inline]
    #[must_use]
    pub fn unit(k: K, v: V) -> GenericHashMap<K, V, RandomState, P> {
        GenericHashMap::new().update(k, v)
    }
}

impl<K, V, S, P: SharedPointerKind> GenericHashMap<K, V, S, P> {
    /// Construct an empty hash map.
    #[inline]
    #[must_use]
    pub fn new() -> Self
    where
        S: Default,
    {
        Self::default()
    }

    /// Test whether a hash map is empty.
    ///
    /// Time: O(1)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the size of a hash map.
    ///
    /// Time: O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// # #[macro_use] extern crate champl;
    /// # fn main() {
    /// assert_eq!(3, hashmap!{
    ///   1 => 11,
    ///   2 => 22,
    ///   3 => 33
    /// }.len());
    /// # }
    /// ```
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Test whether two maps refer to the same content in memory.
    ///
    /// This is true if the two sides are references to the same map, or if
    /// the two maps refer to the same root node. In particular, an update
    /// that had no effect is `ptr_eq` with its receiver.
    ///
    /// Time: O(1)
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (Some(a), Some(b)) => SharedPointer::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Construct an empty hash map using the provided hasher.
    #[inline]
    #[must_use]
    pub fn with_hasher(hasher: S) -> Self {
        GenericHashMap {
            hasher,
            root: None,
            size: 0,
        }
    }

    /// Get a reference to the map's [`BuildHasher`][BuildHasher].
    ///
    /// [BuildHasher]: https://doc.rust-lang.org/std/hash/trait.BuildHasher.html
    #[must_use]
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Construct an empty hash map using the same hasher as the current
    /// hash map.
    #[inline]
    #[must_use]
    pub fn new_from<K1, V1>(&self) -> GenericHashMap<K1, V1, S, P>
    where
        K1: Hash + Eq + Clone,
        V1: Clone,
        S: Clone,
    {
        GenericHashMap {
            hasher: self.hasher.clone(),
            root: None,
            size: 0,
        }
    }

    /// Discard all elements from the map.
    pub fn clear(&mut self) {
        self.root = None;
        self.size = 0;
    }

    /// Get an iterator over the key/value pairs of a hash map, in arbitrary
    /// order.
    ///
    /// The order is consistent between maps using the same hasher, but no
    /// other ordering guarantee is offered.
    #[inline]
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V, P> {
        Iter {
            it: NodeIter::new(self.root.as_deref(), self.size),
        }
    }

    /// Get an iterator over a hash map's keys, in arbitrary order.
    #[inline]
    #[must_use]
    pub fn keys(&self) -> Keys<'_, K, V, P> {
        Keys {
            it: NodeIter::new(self.root.as_deref(), self.size),
        }
    }

    /// Get an iterator over a hash map's values, in arbitrary order.
    #[inline]
    #[must_use]
    pub fn values(&self) -> Values<'_, K, V, P> {
        Values {
            it: NodeIter::new(self.root.as_deref(), self.size),
        }
    }
}

impl<K, V, S, P> GenericHashMap<K, V, S, P>
where
    K: Hash + Eq,
    S: BuildHasher,
    P: SharedPointerKind,
{
    fn test_eq<S2, P2>(&self, other: &GenericHashMap<K, V, S2, P2>) -> bool
    where
        V: PartialEq,
        S2: BuildHasher,
        P2: SharedPointerKind,
    {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }

    /// Get the value for a key from a hash map.
    ///
    /// Time: O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// # #[macro_use] extern crate champl;
    /// # fn main() {
    /// let map = hashmap!{123 => "lol"};
    /// assert_eq!(
    ///   map.get(&123),
    ///   Some(&"lol")
    /// );
    /// # }
    /// ```
    #[must_use]
    pub fn get<BK>(&self, key: &BK) -> Option<&V>
    where
        BK: Hash + Eq + ?Sized,
        K: Borrow<BK>,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    /// Get the key/value pair for a key from a hash map.
    ///
    /// Time: O(log n)
    #[must_use]
    pub fn get_key_value<BK>(&self, key: &BK) -> Option<(&K, &V)>
    where
        BK: Hash + Eq + ?Sized,
        K: Borrow<BK>,
    {
        match &self.root {
            Some(root) => root
                .find(hash_key(&self.hasher, key), 0, key)
                .map(|(k, v)| (k, v)),
            None => None,
        }
    }

    /// Test for the presence of a key in a hash map.
    ///
    /// Time: O(log n)
    #[must_use]
    pub fn contains_key<BK>(&self, k: &BK) -> bool
    where
        BK: Hash + Eq + ?Sized,
        K: Borrow<BK>,
    {
        self.get_key_value(k).is_some()
    }
}

impl<K, V, S, P> GenericHashMap<K, V, S, P>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Clone,
    P: SharedPointerKind,
{
    /// Construct a new hash map by inserting a key/value mapping into a
    /// map.
    ///
    /// If the map already has a mapping for the given key, the mapping is
    /// replaced in the new map; if the stored value is equal to the new
    /// one, the result is `ptr_eq` with this map.
    ///
    /// Time: O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// # #[macro_use] extern crate champl;
    /// # fn main() {
    /// let map = hashmap!{};
    /// assert_eq!(
    ///   map.update(123, "123"),
    ///   hashmap!{123 => "123"}
    /// );
    /// # }
    /// ```
    #[must_use]
    pub fn update(&self, k: K, v: V) -> Self
    where
        V: PartialEq,
    {
        let hash = hash_key(&self.hasher, &k);
        let mut details = ChangeEvent::new();
        let root = match &self.root {
            Some(root) => {
                let mut root = root.clone();
                let hasher = &self.hasher;
                Node::update(
                    &mut root,
                    None,
                    (k, v),
                    hash,
                    0,
                    &mut details,
                    &|old: &(K, V), new: (K, V)| if old.1 == new.1 { None } else { Some(new) },
                    &|entry: &(K, V)| hash_key(hasher, &entry.0),
                );
                root
            }
            None => {
                details.inserted();
                SharedPointer::new(Node::unit(None, hash, (k, v)))
            }
        };
        if !details.modified {
            return self.clone();
        }
        let size = if details.replaced {
            self.size
        } else {
            self.size + 1
        };
        GenericHashMap {
            hasher: self.hasher.clone(),
            root: Some(root),
            size,
        }
    }

    /// Construct a new map without the given key.
    ///
    /// If the key is absent, the result is `ptr_eq` with this map.
    ///
    /// Time: O(log n)
    #[must_use]
    pub fn without<BK>(&self, k: &BK) -> Self
    where
        BK: Hash + Eq + ?Sized,
        K: Borrow<BK>,
    {
        match self.extract(k) {
            Some((_, map)) => map,
            None => self.clone(),
        }
    }

    /// Remove a key from the map, returning the removed value and the
    /// updated map, or [`None`][None] if the key was absent.
    ///
    /// Time: O(log n)
    ///
    /// [None]: https://doc.rust-lang.org/std/option/enum.Option.html#variant.None
    #[must_use]
    pub fn extract<BK>(&self, k: &BK) -> Option<(V, Self)>
    where
        BK: Hash + Eq + ?Sized,
        K: Borrow<BK>,
    {
        let root = self.root.as_ref()?;
        let mut new_root = root.clone();
        let mut details = ChangeEvent::new();
        Node::remove(&mut new_root, None, k, hash_key(&self.hasher, k), 0, &mut details);
        if !details.modified {
            return None;
        }
        let size = self.size - 1;
        let map = GenericHashMap {
            hasher: self.hasher.clone(),
            root: (size > 0).then_some(new_root),
            size,
        };
        details.old.map(|(_, v)| (v, map))
    }

    /// Convert this map into a mutable view of the same contents.
    ///
    /// Time: O(1). The trie is shared; the mutable view copies nodes as it
    /// first writes to them.
    #[must_use]
    pub fn to_mutable(&self) -> GenericHashMapMut<K, V, S, P> {
        GenericHashMapMut {
            hasher: self.hasher.clone(),
            root: self.root.clone(),
            size: self.size,
            mutator: None,
            mod_count: ModCount::new(),
        }
    }

    /// Construct the union of two maps, keeping the values in the current
    /// map when keys exist in both maps.
    ///
    /// The union with an empty map, or with itself, is `ptr_eq` with this
    /// map.
    ///
    /// Time: O(n log n)
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        if other.is_empty() || self.ptr_eq(&other) {
            return self;
        }
        if self.is_empty() {
            return other;
        }
        let mut out = other.to_mutable();
        for (k, v) in self {
            out.insert(k, v);
        }
        out.to_immutable()
    }

    /// Construct the union of multiple maps.
    ///
    /// Time: O(n log n)
    #[must_use]
    pub fn unions<I>(i: I) -> Self
    where
        I: IntoIterator<Item = Self>,
        S: Default,
    {
        i.into_iter().fold(Self::default(), Self::union)
    }

    /// Construct the intersection of two maps, keeping the keys that occur
    /// in both maps and the values from the current map.
    ///
    /// Time: O(n log n)
    #[must_use]
    pub fn intersection<V2>(self, other: GenericHashMap<K, V2, S, P>) -> Self
    where
        V2: Clone,
    {
        if other.is_empty() || self.is_empty() {
            return self.new_from();
        }
        let mut out = self.new_from().to_mutable();
        for (k, v) in self {
            if other.contains_key(&k) {
                out.insert(k, v);
            }
        }
        out.to_immutable()
    }

    /// Construct a map with every mapping of `self` whose key does not
    /// occur in `other`.
    ///
    /// If nothing gets removed, the result is `ptr_eq` with this map.
    ///
    /// Time: O(m log n) where m is the size of the other map
    #[must_use]
    pub fn relative_complement<V2>(self, other: GenericHashMap<K, V2, S, P>) -> Self
    where
        V2: Clone,
    {
        if other.is_empty() {
            return self;
        }
        let mut out = self.to_mutable();
        for k in other.keys() {
            out.remove(k);
        }
        out.to_immutable()
    }
}

impl<K, V, S, P: SharedPointerKind> GenericHashMapMut<K, V, S, P> {
    /// Construct an empty map.
    #[must_use]
    pub fn new() -> Self
    where
        S: Default,
    {
        Self::default()
    }

    /// Construct an empty map using the provided hasher.
    #[inline]
    #[must_use]
    pub fn with_hasher(hasher: S) -> Self {
        GenericHashMapMut {
            hasher,
            root: None,
            size: 0,
            mutator: None,
            mod_count: ModCount::new(),
        }
    }

    /// Get a reference to the map's [`BuildHasher`][BuildHasher].
    ///
    /// [BuildHasher]: https://doc.rust-lang.org/std/hash/trait.BuildHasher.html
    #[must_use]
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Test whether a map is empty.
    ///
    /// Time: O(1)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the size of a map.
    ///
    /// Time: O(1)
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Discard all elements from the map.
    pub fn clear(&mut self) {
        if self.size > 0 {
            self.mod_count.bump();
        }
        self.root = None;
        self.size = 0;
    }

    fn owner(&mut self) -> OwnerToken<P> {
        if self.mutator.is_none() {
            self.mutator = Some(OwnerToken::new());
        }
        self.mutator.as_ref().unwrap().clone()
    }
}

impl<K, V, S, P> GenericHashMapMut<K, V, S, P>
where
    K: Hash + Eq,
    S: BuildHasher,
    P: SharedPointerKind,
{
    /// Get the value for a key.
    ///
    /// Time: O(log n)
    #[must_use]
    pub fn get<BK>(&self, key: &BK) -> Option<&V>
    where
        BK: Hash + Eq + ?Sized,
        K: Borrow<BK>,
    {
        match &self.root {
            Some(root) => root
                .find(hash_key(&self.hasher, key), 0, key)
                .map(|(_, v)| v),
            None => None,
        }
    }

    /// Test for the presence of a key.
    ///
    /// Time: O(log n)
    #[must_use]
    pub fn contains_key<BK>(&self, k: &BK) -> bool
    where
        BK: Hash + Eq + ?Sized,
        K: Borrow<BK>,
    {
        self.get(k).is_some()
    }
}

impl<K, V, S, P> GenericHashMapMut<K, V, S, P>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Clone,
    P: SharedPointerKind,
{
    /// Insert a key/value mapping into a map, returning the value
    /// previously stored under the key.
    ///
    /// Time: O(log n)
    pub fn insert(&mut self, k: K, v: V) -> Option<V> {
        let token = self.owner();
        let hash = hash_key(&self.hasher, &k);
        let mut details = ChangeEvent::new();
        match &mut self.root {
            Some(root) => {
                let hasher = &self.hasher;
                Node::update(
                    root,
                    Some(&token),
                    (k, v),
                    hash,
                    0,
                    &mut details,
                    &|_, new| Some(new),
                    &|entry: &(K, V)| hash_key(hasher, &entry.0),
                );
            }
            None => {
                details.inserted();
                self.root = Some(SharedPointer::new(Node::unit(Some(token), hash, (k, v))));
            }
        }
        if details.modified && !details.replaced {
            self.size += 1;
            self.mod_count.bump();
        }
        details.old.map(|(_, v)| v)
    }

    /// Remove a key from the map, returning its value.
    ///
    /// Time: O(log n)
    pub fn remove<BK>(&mut self, k: &BK) -> Option<V>
    where
        BK: Hash + Eq + ?Sized,
        K: Borrow<BK>,
    {
        self.remove_with_key(k).map(|(_, v)| v)
    }

    /// Remove a key from the map, returning the stored key and value.
    ///
    /// Time: O(log n)
    pub fn remove_with_key<BK>(&mut self, k: &BK) -> Option<(K, V)>
    where
        BK: Hash + Eq + ?Sized,
        K: Borrow<BK>,
    {
        self.root.as_ref()?;
        let token = self.owner();
        let hash = hash_key(&self.hasher, k);
        let mut details = ChangeEvent::new();
        let root = self.root.as_mut().unwrap();
        Node::remove(root, Some(&token), k, hash, 0, &mut details);
        if !details.modified {
            return None;
        }
        self.size -= 1;
        self.mod_count.bump();
        if self.size == 0 {
            self.root = None;
        }
        details.old
    }

    /// Publish the current contents as an immutable map.
    ///
    /// Time: O(1). This view stays usable but gives up its ownership token,
    /// so its next writes copy the nodes they touch instead of editing them
    /// under the feet of the published map.
    #[must_use]
    pub fn to_immutable(&mut self) -> GenericHashMap<K, V, S, P> {
        self.mutator = None;
        GenericHashMap {
            hasher: self.hasher.clone(),
            root: self.root.clone(),
            size: self.size,
        }
    }

    /// Get an iterator over the key/value pairs of the map, in arbitrary
    /// order.
    ///
    /// The iterator works on a snapshot and yields pairs by clone. It is
    /// fail-fast: structurally modifying this view while the iterator is
    /// alive makes the iterator's next `next` call panic.
    ///
    /// Time: O(n)
    #[must_use]
    pub fn iter(&self) -> SnapshotIter<K, V, P> {
        SnapshotIter {
            it: FailFast::new(
                NodeDrain::new(self.root.clone(), self.size),
                &self.mod_count,
            ),
        }
    }
}

// Core traits

impl<K, V, S, P: SharedPointerKind> Clone for GenericHashMap<K, V, S, P>
where
    S: Clone,
{
    /// Clone a map.
    ///
    /// Time: O(1)
    #[inline]
    fn clone(&self) -> Self {
        GenericHashMap {
            hasher: self.hasher.clone(),
            root: self.root.clone(),
            size: self.size,
        }
    }
}

impl<K, V, S1, P1, S2, P2> PartialEq<GenericHashMap<K, V, S2, P2>> for GenericHashMap<K, V, S1, P1>
where
    K: Hash + Eq,
    V: PartialEq,
    S1: BuildHasher,
    S2: BuildHasher,
    P1: SharedPointerKind,
    P2: SharedPointerKind,
{
    fn eq(&self, other: &GenericHashMap<K, V, S2, P2>) -> bool {
        self.test_eq(other)
    }
}

impl<K, V, S, P> Eq for GenericHashMap<K, V, S, P>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
    P: SharedPointerKind,
{
}

impl<K, V, S, P> Default for GenericHashMap<K, V, S, P>
where
    S: Default,
    P: SharedPointerKind,
{
    fn default() -> Self {
        GenericHashMap {
            hasher: Default::default(),
            root: None,
            size: 0,
        }
    }
}

impl<K, V, S, P> Default for GenericHashMapMut<K, V, S, P>
where
    S: Default,
    P: SharedPointerKind,
{
    fn default() -> Self {
        GenericHashMapMut {
            hasher: Default::default(),
            root: None,
            size: 0,
            mutator: None,
            mod_count: ModCount::new(),
        }
    }
}

impl<K, V, S, RK, RV, P> Extend<(RK, RV)> for GenericHashMapMut<K, V, S, P>
where
    K: Hash + Eq + Clone + From<RK>,
    V: Clone + From<RV>,
    S: BuildHasher + Clone,
    P: SharedPointerKind,
{
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (RK, RV)>,
    {
        for (key, value) in iter {
            self.insert(From::from(key), From::from(value));
        }
    }
}

impl<BK, K, V, S, P> Index<&BK> for GenericHashMap<K, V, S, P>
where
    BK: Hash + Eq + ?Sized,
    K: Hash + Eq + Borrow<BK>,
    S: BuildHasher,
    P: SharedPointerKind,
{
    type Output = V;

    fn index(&self, key: &BK) -> &Self::Output {
        match self.get(key) {
            None => panic!("GenericHashMap::index: invalid key"),
            Some(value) => value,
        }
    }
}

impl<K, V, S, P> Debug for GenericHashMap<K, V, S, P>
where
    K: Hash + Eq + Debug,
    V: Debug,
    S: BuildHasher,
    P: SharedPointerKind,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S, P> Debug for GenericHashMapMut<K, V, S, P>
where
    K: Hash + Eq + Debug + Clone,
    V: Debug + Clone,
    S: BuildHasher + Clone,
    P: SharedPointerKind,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        f.debug_map().entries(self.iter()).finish()
    }
}

// Iterators

/// A borrowing iterator over the key/value pairs of an immutable map.
pub struct Iter<'a, K, V, P: SharedPointerKind> {
    it: NodeIter<'a, (K, V), P>,
}

// We impl Clone instead of deriving it, because we want Clone even if K and
// V aren't.
impl<'a, K, V, P: SharedPointerKind> Clone for Iter<'a, K, V, P> {
    fn clone(&self) -> Self {
        Iter {
            it: self.it.clone(),
        }
    }
}

impl<'a, K, V, P: SharedPointerKind> Iterator for Iter<'a, K, V, P> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<'a, K, V, P: SharedPointerKind> ExactSizeIterator for Iter<'a, K, V, P> {}

impl<'a, K, V, P: SharedPointerKind> FusedIterator for Iter<'a, K, V, P> {}

/// A borrowing iterator over the keys of a map.
pub struct Keys<'a, K, V, P: SharedPointerKind> {
    it: NodeIter<'a, (K, V), P>,
}

impl<'a, K, V, P: SharedPointerKind> Clone for Keys<'a, K, V, P> {
    fn clone(&self) -> Self {
        Keys {
            it: self.it.clone(),
        }
    }
}

impl<'a, K, V, P: SharedPointerKind> Iterator for Keys<'a, K, V, P> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<'a, K, V, P: SharedPointerKind> ExactSizeIterator for Keys<'a, K, V, P> {}

impl<'a, K, V, P: SharedPointerKind> FusedIterator for Keys<'a, K, V, P> {}

/// A borrowing iterator over the values of a map.
pub struct Values<'a, K, V, P: SharedPointerKind> {
    it: NodeIter<'a, (K, V), P>,
}

impl<'a, K, V, P: SharedPointerKind> Clone for Values<'a, K, V, P> {
    fn clone(&self) -> Self {
        Values {
            it: self.it.clone(),
        }
    }
}

impl<'a, K, V, P: SharedPointerKind> Iterator for Values<'a, K, V, P> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<'a, K, V, P: SharedPointerKind> ExactSizeIterator for Values<'a, K, V, P> {}

impl<'a, K, V, P: SharedPointerKind> FusedIterator for Values<'a, K, V, P> {}

/// A consuming iterator over the key/value pairs of a map.
pub struct ConsumingIter<K, V, P>
where
    K: Clone,
    V: Clone,
    P: SharedPointerKind,
{
    it: NodeDrain<(K, V), P>,
}

impl<K, V, P> Iterator for ConsumingIter<K, V, P>
where
    K: Clone,
    V: Clone,
    P: SharedPointerKind,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<K: Clone, V: Clone, P: SharedPointerKind> ExactSizeIterator for ConsumingIter<K, V, P> {}

impl<K: Clone, V: Clone, P: SharedPointerKind> FusedIterator for ConsumingIter<K, V, P> {}

/// A fail-fast snapshot iterator over the key/value pairs of a mutable map.
pub struct SnapshotIter<K, V, P>
where
    K: Clone,
    V: Clone,
    P: SharedPointerKind,
{
    it: FailFast<NodeDrain<(K, V), P>, P>,
}

impl<K, V, P> Iterator for SnapshotIter<K, V, P>
where
    K: Clone,
    V: Clone,
    P: SharedPointerKind,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<K: Clone, V: Clone, P: SharedPointerKind> ExactSizeIterator for SnapshotIter<K, V, P> {}

impl<K: Clone, V: Clone, P: SharedPointerKind> FusedIterator for SnapshotIter<K, V, P> {}

// Iterator conversions

impl<K, V, S, P> FromIterator<(K, V)> for GenericHashMap<K, V, S, P>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn from_iter<T>(i: T) -> Self
    where
        T: IntoIterator<Item = (K, V)>,
    {
        let mut map: GenericHashMapMut<K, V, S, P> = Default::default();
        for (k, v) in i {
            map.insert(k, v);
        }
        map.to_immutable()
    }
}

impl<K, V, S, P> FromIterator<(K, V)> for GenericHashMapMut<K, V, S, P>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn from_iter<T>(i: T) -> Self
    where
        T: IntoIterator<Item = (K, V)>,
    {
        let mut map = Self::default();
        for (k, v) in i {
            map.insert(k, v);
        }
        map
    }
}

impl<'a, K, V, S, P: SharedPointerKind> IntoIterator for &'a GenericHashMap<K, V, S, P> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S, P> IntoIterator for GenericHashMap<K, V, S, P>
where
    K: Clone,
    V: Clone,
    P: SharedPointerKind,
{
    type Item = (K, V);
    type IntoIter = ConsumingIter<K, V, P>;

    fn into_iter(self) -> Self::IntoIter {
        ConsumingIter {
            it: NodeDrain::new(self.root, self.size),
        }
    }
}

impl<K, V, S, P> IntoIterator for GenericHashMapMut<K, V, S, P>
where
    K: Clone,
    V: Clone,
    P: SharedPointerKind,
{
    type Item = (K, V);
    type IntoIter = ConsumingIter<K, V, P>;

    fn into_iter(self) -> Self::IntoIter {
        ConsumingIter {
            it: NodeDrain::new(self.root, self.size),
        }
    }
}

// Conversions

impl<K, V, S, const N: usize, P> From<[(K, V); N]> for GenericHashMap<K, V, S, P>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn from(arr: [(K, V); N]) -> Self {
        IntoIterator::into_iter(arr).collect()
    }
}

impl<K, V, S, P> From<Vec<(K, V)>> for GenericHashMap<K, V, S, P>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn from(vec: Vec<(K, V)>) -> Self {
        vec.into_iter().collect()
    }
}

impl<K, V, S, P> From<&Vec<(K, V)>> for GenericHashMap<K, V, S, P>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn from(vec: &Vec<(K, V)>) -> Self {
        vec.iter().cloned().collect()
    }
}

impl<K, V, S, P> From<collections::HashMap<K, V>> for GenericHashMap<K, V, S, P>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn from(map: collections::HashMap<K, V>) -> Self {
        map.into_iter().collect()
    }
}

impl<K, V, S, P> From<&collections::HashMap<K, V>> for GenericHashMap<K, V, S, P>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn from(map: &collections::HashMap<K, V>) -> Self {
        map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

// Tests

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::LolHasher;
    #[rustfmt::skip]
    use ::proptest::{collection, num::i16, proptest};
    use static_assertions::{assert_impl_all, assert_not_impl_any};
    use std::hash::BuildHasherDefault;

    assert_impl_all!(HashMap<i32, i32>: Send, Sync);
    assert_not_impl_any!(HashMap<i32, *const i32>: Send, Sync);
    assert_not_impl_any!(HashMap<*const i32, i32>: Send, Sync);
    assert_covariant!(HashMap<T, i32> in T);
    assert_covariant!(HashMap<i32, T> in T);

    #[test]
    fn safe_mutation() {
        let v1: HashMap<usize, usize> = (0..131_072).map(|i| (i, i)).collect();
        let mut v2 = v1.to_mutable();
        v2.insert(131_000, 23);
        assert_eq!(Some(&23), v2.get(&131_000));
        assert_eq!(Some(&131_000), v1.get(&131_000));
    }

    #[test]
    fn index_operator() {
        let map: HashMap<usize, usize> = hashmap![1 => 2, 3 => 4, 5 => 6];
        assert_eq!(4, map[&3]);
    }

    #[test]
    fn proper_formatting() {
        let map: HashMap<usize, usize> = hashmap![1 => 2];
        assert_eq!("{1: 2}", format!("{:?}", map));

        assert_eq!("{}", format!("{:?}", HashMap::<(), ()>::new()));
    }

    #[test]
    fn remove_failing() {
        let pairs = [(1469, 0), (-67, 0)];
        let mut map: GenericHashMapMut<i16, i16, BuildHasherDefault<LolHasher>, DefaultSharedPtr> =
            Default::default();
        for (k, v) in pairs {
            map.insert(k, v);
        }
        assert_eq!(2, map.len());
        for (k, _) in pairs {
            assert!(map.contains_key(&k));
            assert_eq!(Some(0), map.remove(&k));
            assert!(!map.contains_key(&k));
        }
        assert!(map.is_empty());
    }

    #[test]
    fn match_string_keys_with_string_slices() {
        let map: HashMap<String, i32> =
            vec![("foo".to_string(), 1), ("bar".to_string(), 2), ("baz".to_string(), 3)]
                .into_iter()
                .collect();
        assert_eq!(Some(&1), map.get("foo"));
        let map = map.without("foo");
        assert_eq!(None, map.get("foo"));
        assert_eq!(Some(3), map.extract("baz").map(|(v, _)| v));
    }

    #[test]
    fn macro_allows_trailing_comma() {
        let map1: HashMap<&str, i32> = hashmap! {"x" => 1, "y" => 2};
        let map2: HashMap<&str, i32> = hashmap! {
            "x" => 1,
            "y" => 2,
        };
        assert_eq!(map1, map2);
    }

    #[test]
    fn remove_top_level_collisions() {
        let keys = vec![9, 2569, 27145];
        let mut map: GenericHashMapMut<i16, i16, BuildHasherDefault<LolHasher>, DefaultSharedPtr> =
            Default::default();
        for k in keys.clone() {
            map.insert(k, k);
        }
        assert_eq!(keys.len(), map.len());
        for k in keys {
            let l = map.len();
            assert_eq!(Some(&k), map.get(&k));
            map.remove(&k);
            assert_eq!(None, map.get(&k));
            assert_eq!(l - 1, map.len());
        }
    }

    #[test]
    fn no_op_update_returns_the_same_instance() {
        let map = hashmap! {"a" => 1, "b" => 2};
        assert!(map.ptr_eq(&map.update("a", 1)));
        assert!(map.ptr_eq(&map.without(&"c")));
        assert!(!map.ptr_eq(&map.update("a", 9)));
    }

    #[test]
    fn insert_returns_the_previous_value() {
        let mut map: HashMapMut<&str, i32> = HashMapMut::new();
        assert_eq!(None, map.insert("a", 1));
        assert_eq!(Some(1), map.insert("a", 2));
        assert_eq!(Some(&2), map.get("a"));
        assert_eq!(1, map.len());
    }

    #[test]
    fn large_map() {
        let mut map: HashMapMut<i32, i32> = HashMapMut::new();
        let size = 32_769;
        for i in 0..size {
            map.insert(i, i);
        }
        assert_eq!(size as usize, map.len());
        let map = map.to_immutable();
        for i in 0..size {
            assert_eq!(Some(&i), map.get(&i));
        }
    }

    #[test]
    fn mutable_iterator_is_fail_fast() {
        let mut map: HashMapMut<i32, i32> = (0..100).map(|i| (i, i)).collect();
        let mut it = map.iter();
        assert!(it.next().is_some());
        map.remove(&42);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| it.next()));
        assert!(result.is_err());
    }

    proptest! {
        #[test]
        fn update_and_length(ref m in collection::hash_map(i16::ANY, i16::ANY, 0..1000)) {
            let mut map: GenericHashMap<i16, i16, BuildHasherDefault<LolHasher>, DefaultSharedPtr> =
                Default::default();
            for (index, (k, v)) in m.iter().enumerate() {
                map = map.update(*k, *v);
                assert_eq!(Some(v), map.get(k));
                assert_eq!(index + 1, map.len());
            }
        }

        #[test]
        fn from_iterator(ref m in collection::hash_map(i16::ANY, i16::ANY, 0..1000)) {
            let map: HashMap<i16, i16> =
                FromIterator::from_iter(m.iter().map(|(k, v)| (*k, *v)));
            assert_eq!(m.len(), map.len());
        }

        #[test]
        fn iterate_over(ref m in collection::hash_map(i16::ANY, i16::ANY, 0..1000)) {
            let map: HashMap<i16, i16> = FromIterator::from_iter(m.iter().map(|(k, v)| (*k, *v)));
            assert_eq!(m.len(), map.iter().count());
        }

        #[test]
        fn equality(ref m in collection::hash_map(i16::ANY, i16::ANY, 0..1000)) {
            let map1: HashMap<i16, i16> = FromIterator::from_iter(m.iter().map(|(k, v)| (*k, *v)));
            let map2: HashMap<i16, i16> = FromIterator::from_iter(m.iter().map(|(k, v)| (*k, *v)));
            assert_eq!(map1, map2);
        }

        #[test]
        fn lookup(ref m in collection::hash_map(i16::ANY, i16::ANY, 0..1000)) {
            let map: HashMap<i16, i16> = FromIterator::from_iter(m.iter().map(|(k, v)| (*k, *v)));
            for (k, v) in m {
                assert_eq!(Some(*v), map.get(k).cloned());
            }
        }

        #[test]
        fn without(ref pairs in collection::vec((i16::ANY, i16::ANY), 0..100)) {
            let mut m: collections::HashMap<i16, i16, _> =
                collections::HashMap::with_hasher(BuildHasherDefault::<LolHasher>::default());
            for (k, v) in pairs {
                m.insert(*k, *v);
            }
            let mut map: GenericHashMap<i16, i16, _, DefaultSharedPtr> =
                GenericHashMap::with_hasher(BuildHasherDefault::<LolHasher>::default());
            for (k, v) in &m {
                map = map.update(*k, *v);
            }
            for k in m.keys() {
                let l = map.len();
                assert_eq!(m.get(k).cloned(), map.get(k).cloned());
                map = map.without(k);
                assert_eq!(None, map.get(k));
                assert_eq!(l - 1, map.len());
            }
        }

        #[test]
        fn insert(ref m in collection::hash_map(i16::ANY, i16::ANY, 0..1000)) {
            let mut mut_map: GenericHashMapMut<i16, i16, BuildHasherDefault<LolHasher>, DefaultSharedPtr> = Default::default();
            let mut map: GenericHashMap<i16, i16, BuildHasherDefault<LolHasher>, DefaultSharedPtr> = Default::default();
            for (count, (k, v)) in m.iter().enumerate() {
                map = map.update(*k, *v);
                mut_map.insert(*k, *v);
                assert_eq!(count + 1, map.len());
                assert_eq!(count + 1, mut_map.len());
            }
            for (k, v) in m {
                assert_eq!(Some(v), map.get(k));
                assert_eq!(Some(v), mut_map.get(k));
            }
            assert_eq!(map, mut_map.to_immutable());
        }

        #[test]
        fn delete_and_reinsert(
            ref input in collection::hash_map(i16::ANY, i16::ANY, 1..1000),
            index_rand in ::proptest::num::usize::ANY
        ) {
            let index = *input.keys().nth(index_rand % input.len()).unwrap();
            let map1: HashMap<_, _> = HashMap::from_iter(input.clone());
            let (val, map2) = map1.extract(&index).unwrap();
            let map3 = map2.update(index, val);
            for key in map2.keys() {
                assert!(*key != index);
            }
            assert_eq!(map1.len(), map2.len() + 1);
            assert_eq!(map1, map3);
        }

        #[test]
        fn exact_size_iterator(ref m in collection::hash_map(i16::ANY, i16::ANY, 0..100)) {
            let map: HashMap<i16, i16> = FromIterator::from_iter(m.iter().map(|(k, v)| (*k, *v)));
            let mut should_be = m.len();
            let mut it = map.iter();
            loop {
                assert_eq!(should_be, it.len());
                match it.next() {
                    None => break,
                    Some(_) => should_be -= 1,
                }
            }
            assert_eq!(0, it.len());
        }

        #[test]
        fn union(ref m1 in collection::hash_map(i16::ANY, i16::ANY, 0..100),
                 ref m2 in collection::hash_map(i16::ANY, i16::ANY, 0..100)) {
            let map1: HashMap<i16, i16> = FromIterator::from_iter(m1.iter().map(|(k, v)| (*k, *v)));
            let map2: HashMap<i16, i16> = FromIterator::from_iter(m2.iter().map(|(k, v)| (*k, *v)));
            let union_map = map1.union(map2);

            for k in m1.keys() {
                assert!(union_map.contains_key(k));
            }

            for k in m2.keys() {
                assert!(union_map.contains_key(k));
            }

            for (k, v) in union_map.iter() {
                assert_eq!(v, m1.get(k).or_else(|| m2.get(k)).unwrap());
            }
        }
    }
}
