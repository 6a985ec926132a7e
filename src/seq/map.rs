// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! An insertion-ordered map.
//!
//! The same CHAMP trie as the `hashmap` module, with every entry tagged by
//! a sequence number so that iteration runs in insertion order. Two flavors
//! hand off to each other in O(1): [`GenericSeqMap`], whose operations
//! return new maps sharing structure with the old one, and
//! [`GenericSeqMapMut`], a single-owner view that edits its exclusively
//! owned trie nodes in place.
//!
//! A plain insert appends; replacing the value of a present key keeps the
//! entry's position. [`insert_first`][GenericSeqMapMut::insert_first] and
//! [`insert_last`][GenericSeqMapMut::insert_last] move a present key to the
//! respective end.
//!
//! Appending is amortized O(1); see the `seqset` module notes on sequence
//! counter renumbering, which works identically here.

use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::fmt::{Debug, Error, Formatter};
use std::hash::{BuildHasher, Hash};
use std::iter::{FromIterator, FusedIterator};
use std::ops::Index;

use archery::{SharedPointer, SharedPointerKind};

use crate::fail_fast::{FailFast, ModCount};
use crate::nodes::champ::{
    hash_key, ChangeEvent, Drain as NodeDrain, Iter as NodeIter, Node, OwnerToken,
};
use crate::seq::{first_in, last_in, must_renumber, renumber, SeqEntry, SeqIter};
use crate::shared_ptr::DefaultSharedPtr;

/// Construct an insertion-ordered map from a sequence of key/value pairs.
///
/// # Examples
///
/// ```
/// # #[macro_use] extern crate champl;
/// # fn main() {
/// let map = seqmap!{3 => "c", 1 => "a", 2 => "b"};
/// assert_eq!(
///   vec![3, 1, 2],
///   map.keys().cloned().collect::<Vec<_>>()
/// );
/// # }
/// ```
#[macro_export]
macro_rules! seqmap {
    () => { $crate::seqmap::SeqMap::new() };

    ( $( $key:expr => $value:expr ),* ) => {{
        let mut map = $crate::seqmap::SeqMapMut::new();
        $({
            map.insert($key, $value);
        })*;
        map.to_immutable()
    }};

    ( $( $key:expr => $value:expr ,)* ) => {{
        let mut map = $crate::seqmap::SeqMapMut::new();
        $({
            map.insert($key, $value);
        })*;
        map.to_immutable()
    }};
}

/// Type alias for [`GenericSeqMap`] with the default hasher and pointer
/// kind.
///
/// [GenericSeqMap]: ./struct.GenericSeqMap.html
pub type SeqMap<K, V> = GenericSeqMap<K, V, RandomState, DefaultSharedPtr>;

/// Type alias for [`GenericSeqMapMut`] with the default hasher and pointer
/// kind.
///
/// [GenericSeqMapMut]: ./struct.GenericSeqMapMut.html
pub type SeqMapMut<K, V> = GenericSeqMapMut<K, V, RandomState, DefaultSharedPtr>;

/// An insertion-ordered map whose update operations return a new map.
///
/// Iteration visits entries in the order their keys were inserted;
/// replacing a value does not move its entry. An operation that has no
/// effect returns a map sharing the root wholesale, `ptr_eq` with the
/// receiver.
pub struct GenericSeqMap<K, V, S, P: SharedPointerKind> {
    hasher: S,
    root: Option<SharedPointer<Node<SeqEntry<K, V>, P>, P>>,
    size: usize,
    first: i32,
    last: i32,
}

/// An insertion-ordered map that is updated in place.
///
/// The view is single-owner and not thread-safe; publish with
/// [`to_immutable`][GenericSeqMapMut::to_immutable] to share contents.
pub struct GenericSeqMapMut<K, V, S, P: SharedPointerKind> {
    hasher: S,
    root: Option<SharedPointer<Node<SeqEntry<K, V>, P>, P>>,
    size: usize,
    first: i32,
    last: i32,
    mutator: Option<OwnerToken<P>>,
    mod_count: ModCount<P>,
}

impl<K, V, S, P: SharedPointerKind> GenericSeqMap<K, V, S, P> {
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
        GenericSeqMap {
            hasher,
            root: None,
            size: 0,
            first: -1,
            last: 0,
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

    /// Test whether two maps refer to the same content in memory.
    ///
    /// Time: O(1)
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (Some(a), Some(b)) => SharedPointer::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Discard all entries from the map.
    pub fn clear(&mut self) {
        self.root = None;
        self.size = 0;
        self.first = -1;
        self.last = 0;
    }

    /// Get an iterator over the entries of the map, in insertion order.
    ///
    /// Time: O(n) to create, O(1) per step while the sequence numbers are
    /// dense, O(log n) per step otherwise.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.ranked(false),
        }
    }

    /// Get an iterator over the entries of the map, in reverse insertion
    /// order.
    #[must_use]
    pub fn reverse_iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.ranked(true),
        }
    }

    /// Get an iterator over the keys of the map, in insertion order.
    #[must_use]
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            it: self.ranked(false),
        }
    }

    /// Get an iterator over the values of the map, in insertion order.
    #[must_use]
    pub fn values(&self) -> Values<'_, K, V> {
        Values {
            it: self.ranked(false),
        }
    }

    fn ranked(&self, reversed: bool) -> SeqIter<&SeqEntry<K, V>> {
        SeqIter::new(
            self.size,
            self.first,
            self.last,
            reversed,
            NodeIter::new(self.root.as_deref(), self.size).map(|e| (e.seq, e)),
        )
    }

    /// The oldest entry of the map.
    ///
    /// Time: O(n)
    #[must_use]
    pub fn get_first(&self) -> Option<(&K, &V)> {
        first_in(self.root.as_deref(), self.size).map(|e| (&e.key, &e.value))
    }

    /// The most recently appended entry of the map.
    ///
    /// Time: O(n)
    #[must_use]
    pub fn get_last(&self) -> Option<(&K, &V)> {
        last_in(self.root.as_deref(), self.size).map(|e| (&e.key, &e.value))
    }
}

impl<K, V, S, P> GenericSeqMap<K, V, S, P>
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
        self.get_key_value(key).map(|(_, v)| v)
    }

    /// Get the key/value pair for a key.
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
                .map(|e| (&e.key, &e.value)),
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
        self.get_key_value(k).is_some()
    }
}

impl<K, V, S, P> GenericSeqMap<K, V, S, P>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Clone,
    P: SharedPointerKind,
{
    /// Construct a new map with a key/value mapping added.
    ///
    /// A new key is appended to the insertion order. A present key keeps
    /// its position, only its value changes; if even the value is equal,
    /// the result is `ptr_eq` with this map.
    ///
    /// Time: amortized O(log n)
    #[must_use]
    pub fn update(&self, k: K, v: V) -> Self
    where
        V: PartialEq,
    {
        let hash = hash_key(&self.hasher, &k);
        let entry = SeqEntry {
            key: k,
            value: v,
            seq: self.last,
        };
        let mut details = ChangeEvent::new();
        let mut out = self.clone();
        match &mut out.root {
            Some(root) => {
                let hasher = &self.hasher;
                Node::update(
                    root,
                    None,
                    entry,
                    hash,
                    0,
                    &mut details,
                    &|old: &SeqEntry<K, V>, new: SeqEntry<K, V>| {
                        if old.value == new.value {
                            None
                        } else {
                            // value replacement keeps the entry's position
                            Some(SeqEntry {
                                key: new.key,
                                value: new.value,
                                seq: old.seq,
                            })
                        }
                    },
                    &|e: &SeqEntry<K, V>| hash_key(hasher, &e.key),
                );
            }
            None => {
                details.inserted();
                out.root = Some(SharedPointer::new(Node::unit(None, hash, entry)));
            }
        }
        if !details.modified {
            return out;
        }
        if !details.replaced {
            out.size += 1;
            out.last += 1;
            out.compact();
        }
        out
    }

    /// Construct a new map with the given entry as its last, moving the
    /// key there if it is already present.
    ///
    /// Time: amortized O(log n)
    #[must_use]
    pub fn update_last(&self, k: K, v: V) -> Self
    where
        V: PartialEq,
    {
        self.push_back(k, v)
    }

    /// Construct a new map with the given entry as its first, moving the
    /// key there if it is already present.
    ///
    /// Time: amortized O(log n)
    #[must_use]
    pub fn update_first(&self, k: K, v: V) -> Self
    where
        V: PartialEq,
    {
        self.push_front(k, v)
    }

    fn push_back(&self, k: K, v: V) -> Self
    where
        V: PartialEq,
    {
        let hash = hash_key(&self.hasher, &k);
        let entry = SeqEntry {
            key: k,
            value: v,
            seq: self.last,
        };
        let mut details = ChangeEvent::new();
        let mut out = self.clone();
        match &mut out.root {
            Some(root) => {
                let hasher = &self.hasher;
                Node::update(
                    root,
                    None,
                    entry,
                    hash,
                    0,
                    &mut details,
                    &|old: &SeqEntry<K, V>, new: SeqEntry<K, V>| {
                        if old.value == new.value && old.seq == new.seq - 1 {
                            None
                        } else {
                            Some(new)
                        }
                    },
                    &|e: &SeqEntry<K, V>| hash_key(hasher, &e.key),
                );
            }
            None => {
                details.inserted();
                out.root = Some(SharedPointer::new(Node::unit(None, hash, entry)));
            }
        }
        if !details.modified {
            return out;
        }
        if details.replaced {
            if details.old.as_ref().unwrap().seq == out.first + 1 {
                out.first += 1;
            }
        } else {
            out.size += 1;
        }
        out.last += 1;
        out.compact();
        out
    }

    fn push_front(&self, k: K, v: V) -> Self
    where
        V: PartialEq,
    {
        let hash = hash_key(&self.hasher, &k);
        let entry = SeqEntry {
            key: k,
            value: v,
            seq: self.first,
        };
        let mut details = ChangeEvent::new();
        let mut out = self.clone();
        match &mut out.root {
            Some(root) => {
                let hasher = &self.hasher;
                Node::update(
                    root,
                    None,
                    entry,
                    hash,
                    0,
                    &mut details,
                    &|old: &SeqEntry<K, V>, new: SeqEntry<K, V>| {
                        if old.value == new.value && old.seq == new.seq + 1 {
                            None
                        } else {
                            Some(new)
                        }
                    },
                    &|e: &SeqEntry<K, V>| hash_key(hasher, &e.key),
                );
            }
            None => {
                details.inserted();
                out.root = Some(SharedPointer::new(Node::unit(None, hash, entry)));
            }
        }
        if !details.modified {
            return out;
        }
        if details.replaced {
            if details.old.as_ref().unwrap().seq == out.last - 1 {
                out.last -= 1;
            }
        } else {
            out.size += 1;
        }
        out.first -= 1;
        out.compact();
        out
    }

    /// Construct a new map without the given key; if the key is absent the
    /// result is `ptr_eq` with this map.
    ///
    /// Time: amortized O(log n)
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
    /// updated map.
    ///
    /// Time: amortized O(log n)
    #[must_use]
    pub fn extract<BK>(&self, k: &BK) -> Option<(V, Self)>
    where
        BK: Hash + Eq + ?Sized,
        K: Borrow<BK>,
    {
        self.root.as_ref()?;
        let mut details = ChangeEvent::new();
        let mut out = self.clone();
        let hash = hash_key(&self.hasher, k);
        Node::remove(out.root.as_mut().unwrap(), None, k, hash, 0, &mut details);
        if !details.modified {
            return None;
        }
        out.size -= 1;
        let removed = details.old.unwrap();
        if out.size == 0 {
            out.root = None;
            out.first = -1;
            out.last = 0;
        } else {
            if removed.seq == out.last - 1 {
                out.last -= 1;
            }
            if removed.seq == out.first + 1 {
                out.first += 1;
            }
            out.compact();
        }
        Some((removed.value, out))
    }

    /// Remove the oldest entry, returning it and the updated map.
    ///
    /// Time: O(n)
    #[must_use]
    pub fn without_first(&self) -> Option<((K, V), Self)> {
        let key = self.get_first()?.0.clone();
        let (value, rest) = self.extract(&key)?;
        Some(((key, value), rest))
    }

    /// Remove the most recently appended entry, returning it and the
    /// updated map.
    ///
    /// Time: O(n)
    #[must_use]
    pub fn without_last(&self) -> Option<((K, V), Self)> {
        let key = self.get_last()?.0.clone();
        let (value, rest) = self.extract(&key)?;
        Some(((key, value), rest))
    }

    /// Convert this map into a mutable view of the same contents.
    ///
    /// Time: O(1). The trie is shared; the mutable view copies nodes as it
    /// first writes to them.
    #[must_use]
    pub fn to_mutable(&self) -> GenericSeqMapMut<K, V, S, P> {
        GenericSeqMapMut {
            hasher: self.hasher.clone(),
            root: self.root.clone(),
            size: self.size,
            first: self.first,
            last: self.last,
            mutator: None,
            mod_count: ModCount::new(),
        }
    }

    /// Construct the union of two maps: this map's entries in their
    /// order, followed by the other map's entries under new keys in
    /// theirs. Keys present in both keep this map's value and position.
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
        let mut out = self.to_mutable();
        for (k, v) in other {
            if !out.contains_key(&k) {
                out.insert_raw(k, v);
            }
        }
        out.to_immutable()
    }

    /// Construct the intersection of two maps, keeping the keys that
    /// occur in both, with this map's values and order.
    ///
    /// Time: O(n log n)
    #[must_use]
    pub fn intersection<V2>(self, other: GenericSeqMap<K, V2, S, P>) -> Self
    where
        V2: Clone,
    {
        if self.is_empty() || other.is_empty() {
            return GenericSeqMap::with_hasher(self.hasher.clone());
        }
        let mut out = GenericSeqMapMut::with_hasher(self.hasher.clone());
        for (k, v) in self {
            if other.contains_key(&k) {
                out.insert_raw(k, v);
            }
        }
        out.to_immutable()
    }

    /// Construct a map with every entry of this map whose key does not
    /// occur in `other`, keeping this map's order.
    ///
    /// If nothing gets removed, the result is `ptr_eq` with this map.
    ///
    /// Time: O(m log n) where m is the size of the other map
    #[must_use]
    pub fn relative_complement<V2>(self, other: GenericSeqMap<K, V2, S, P>) -> Self
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

    fn compact(&mut self) {
        if !must_renumber(self.size, self.first, self.last) {
            return;
        }
        debug_assert!(self.size > 0);
        let token = OwnerToken::new();
        let root = self.root.as_mut().unwrap();
        let hasher = &self.hasher;
        *root = renumber(self.size, root, &token, &|e: &SeqEntry<K, V>| {
            hash_key(hasher, &e.key)
        });
        self.first = -1;
        self.last = self.size as i32;
    }
}

impl<K, V, S, P: SharedPointerKind> GenericSeqMapMut<K, V, S, P> {
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
        GenericSeqMapMut {
            hasher,
            root: None,
            size: 0,
            first: -1,
            last: 0,
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

    /// Discard all entries from the map.
    pub fn clear(&mut self) {
        if self.size > 0 {
            self.mod_count.bump();
        }
        self.root = None;
        self.size = 0;
        self.first = -1;
        self.last = 0;
    }

    /// The oldest entry of the map.
    ///
    /// Time: O(n)
    #[must_use]
    pub fn get_first(&self) -> Option<(&K, &V)> {
        first_in(self.root.as_deref(), self.size).map(|e| (&e.key, &e.value))
    }

    /// The most recently appended entry of the map.
    ///
    /// Time: O(n)
    #[must_use]
    pub fn get_last(&self) -> Option<(&K, &V)> {
        last_in(self.root.as_deref(), self.size).map(|e| (&e.key, &e.value))
    }

    fn owner(&mut self) -> OwnerToken<P> {
        if self.mutator.is_none() {
            self.mutator = Some(OwnerToken::new());
        }
        self.mutator.as_ref().unwrap().clone()
    }
}

impl<K, V, S, P> GenericSeqMapMut<K, V, S, P>
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
                .map(|e| &e.value),
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

impl<K, V, S, P> GenericSeqMapMut<K, V, S, P>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Clone,
    P: SharedPointerKind,
{
    /// Insert a key/value mapping, returning the value previously stored
    /// under the key.
    ///
    /// A new key is appended to the insertion order. A present key keeps
    /// its position; only its value changes.
    ///
    /// Time: amortized O(log n)
    pub fn insert(&mut self, k: K, v: V) -> Option<V>
    where
        V: PartialEq,
    {
        let token = self.owner();
        let hash = hash_key(&self.hasher, &k);
        let entry = SeqEntry {
            key: k,
            value: v,
            seq: self.last,
        };
        let mut details = ChangeEvent::new();
        match &mut self.root {
            Some(root) => {
                let hasher = &self.hasher;
                Node::update(
                    root,
                    Some(&token),
                    entry,
                    hash,
                    0,
                    &mut details,
                    &|old: &SeqEntry<K, V>, new: SeqEntry<K, V>| {
                        if old.value == new.value {
                            None
                        } else {
                            Some(SeqEntry {
                                key: new.key,
                                value: new.value,
                                seq: old.seq,
                            })
                        }
                    },
                    &|e: &SeqEntry<K, V>| hash_key(hasher, &e.key),
                );
            }
            None => {
                details.inserted();
                self.root = Some(SharedPointer::new(Node::unit(Some(token), hash, entry)));
            }
        }
        if details.modified && !details.replaced {
            self.size += 1;
            self.last += 1;
            self.mod_count.bump();
            self.compact();
        }
        details.old.map(|e| e.value)
    }

    /// Like [`insert`][GenericSeqMapMut::insert], but replaces the value of
    /// a present key unconditionally instead of comparing values first.
    fn insert_raw(&mut self, k: K, v: V) -> Option<V> {
        let token = self.owner();
        let hash = hash_key(&self.hasher, &k);
        let entry = SeqEntry {
            key: k,
            value: v,
            seq: self.last,
        };
        let mut details = ChangeEvent::new();
        match &mut self.root {
            Some(root) => {
                let hasher = &self.hasher;
                Node::update(
                    root,
                    Some(&token),
                    entry,
                    hash,
                    0,
                    &mut details,
                    &|old: &SeqEntry<K, V>, new: SeqEntry<K, V>| {
                        Some(SeqEntry {
                            key: new.key,
                            value: new.value,
                            seq: old.seq,
                        })
                    },
                    &|e: &SeqEntry<K, V>| hash_key(hasher, &e.key),
                );
            }
            None => {
                details.inserted();
                self.root = Some(SharedPointer::new(Node::unit(Some(token), hash, entry)));
            }
        }
        if details.modified && !details.replaced {
            self.size += 1;
            self.last += 1;
            self.mod_count.bump();
            self.compact();
        }
        details.old.map(|e| e.value)
    }

    /// Insert an entry as the last of the insertion order, moving the key
    /// there if it is already present. Returns the previously stored value.
    ///
    /// Time: amortized O(log n)
    pub fn insert_last(&mut self, k: K, v: V) -> Option<V>
    where
        V: PartialEq,
    {
        let token = self.owner();
        let hash = hash_key(&self.hasher, &k);
        let entry = SeqEntry {
            key: k,
            value: v,
            seq: self.last,
        };
        let mut details = ChangeEvent::new();
        match &mut self.root {
            Some(root) => {
                let hasher = &self.hasher;
                Node::update(
                    root,
                    Some(&token),
                    entry,
                    hash,
                    0,
                    &mut details,
                    &|old: &SeqEntry<K, V>, new: SeqEntry<K, V>| {
                        if old.value == new.value && old.seq == new.seq - 1 {
                            None
                        } else {
                            Some(new)
                        }
                    },
                    &|e: &SeqEntry<K, V>| hash_key(hasher, &e.key),
                );
            }
            None => {
                details.inserted();
                self.root = Some(SharedPointer::new(Node::unit(Some(token), hash, entry)));
            }
        }
        if details.modified {
            if details.replaced {
                if details.old.as_ref().unwrap().seq == self.first + 1 {
                    self.first += 1;
                }
            } else {
                self.size += 1;
            }
            self.last += 1;
            self.mod_count.bump();
            self.compact();
        }
        details.old.map(|e| e.value)
    }

    /// Insert an entry as the first of the insertion order, moving the key
    /// there if it is already present. Returns the previously stored value.
    ///
    /// Time: amortized O(log n)
    pub fn insert_first(&mut self, k: K, v: V) -> Option<V>
    where
        V: PartialEq,
    {
        let token = self.owner();
        let hash = hash_key(&self.hasher, &k);
        let entry = SeqEntry {
            key: k,
            value: v,
            seq: self.first,
        };
        let mut details = ChangeEvent::new();
        match &mut self.root {
            Some(root) => {
                let hasher = &self.hasher;
                Node::update(
                    root,
                    Some(&token),
                    entry,
                    hash,
                    0,
                    &mut details,
                    &|old: &SeqEntry<K, V>, new: SeqEntry<K, V>| {
                        if old.value == new.value && old.seq == new.seq + 1 {
                            None
                        } else {
                            Some(new)
                        }
                    },
                    &|e: &SeqEntry<K, V>| hash_key(hasher, &e.key),
                );
            }
            None => {
                details.inserted();
                self.root = Some(SharedPointer::new(Node::unit(Some(token), hash, entry)));
            }
        }
        if details.modified {
            if details.replaced {
                if details.old.as_ref().unwrap().seq == self.last - 1 {
                    self.last -= 1;
                }
            } else {
                self.size += 1;
            }
            self.first -= 1;
            self.mod_count.bump();
            self.compact();
        }
        details.old.map(|e| e.value)
    }

    /// Remove a key from the map, returning its value.
    ///
    /// Time: amortized O(log n)
    pub fn remove<BK>(&mut self, k: &BK) -> Option<V>
    where
        BK: Hash + Eq + ?Sized,
        K: Borrow<BK>,
    {
        self.remove_with_key(k).map(|(_, v)| v)
    }

    /// Remove a key from the map, returning the stored key and value.
    ///
    /// Time: amortized O(log n)
    pub fn remove_with_key<BK>(&mut self, k: &BK) -> Option<(K, V)>
    where
        BK: Hash + Eq + ?Sized,
        K: Borrow<BK>,
    {
        self.root.as_ref()?;
        let token = self.owner();
        let hash = hash_key(&self.hasher, k);
        let mut details = ChangeEvent::new();
        Node::remove(self.root.as_mut().unwrap(), Some(&token), k, hash, 0, &mut details);
        if !details.modified {
            return None;
        }
        self.size -= 1;
        self.mod_count.bump();
        let removed = details.old.unwrap();
        if self.size == 0 {
            self.root = None;
            self.first = -1;
            self.last = 0;
        } else {
            if removed.seq == self.last - 1 {
                self.last -= 1;
            }
            if removed.seq == self.first + 1 {
                self.first += 1;
            }
            self.compact();
        }
        Some((removed.key, removed.value))
    }

    /// Remove and return the oldest entry.
    ///
    /// Time: O(n)
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let key = self.get_first()?.0.clone();
        self.remove_with_key(&key)
    }

    /// Remove and return the most recently appended entry.
    ///
    /// Time: O(n)
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let key = self.get_last()?.0.clone();
        self.remove_with_key(&key)
    }

    /// Publish the current contents as an immutable map.
    ///
    /// Time: O(1). This view stays usable but gives up its ownership token,
    /// so its next writes copy the nodes they touch instead of editing them
    /// under the feet of the published map.
    #[must_use]
    pub fn to_immutable(&mut self) -> GenericSeqMap<K, V, S, P> {
        self.mutator = None;
        GenericSeqMap {
            hasher: self.hasher.clone(),
            root: self.root.clone(),
            size: self.size,
            first: self.first,
            last: self.last,
        }
    }

    /// Get an iterator over the entries of the map, in insertion order.
    ///
    /// The iterator works on a snapshot and yields pairs by clone. It is
    /// fail-fast: structurally modifying this view while the iterator is
    /// alive makes the iterator's next `next` call panic.
    ///
    /// Time: O(n) to create
    #[must_use]
    pub fn iter(&self) -> SnapshotIter<K, V, P> {
        self.snapshot(false)
    }

    /// Get an iterator over the entries of the map, in reverse insertion
    /// order. Fail-fast like [`iter`][GenericSeqMapMut::iter].
    #[must_use]
    pub fn reverse_iter(&self) -> SnapshotIter<K, V, P> {
        self.snapshot(true)
    }

    fn snapshot(&self, reversed: bool) -> SnapshotIter<K, V, P> {
        let ranked = SeqIter::new(
            self.size,
            self.first,
            self.last,
            reversed,
            NodeDrain::new(self.root.clone(), self.size).map(|e| (e.seq, e)),
        );
        SnapshotIter {
            it: FailFast::new(ranked, &self.mod_count),
        }
    }

    /// A reversed view of this map whose writes go to the underlying map,
    /// with the meaning of first and last exchanged.
    #[must_use]
    pub fn reversed(&mut self) -> Reversed<'_, K, V, S, P> {
        Reversed(self)
    }

    fn compact(&mut self) {
        if !must_renumber(self.size, self.first, self.last) {
            return;
        }
        debug_assert!(self.size > 0);
        let token = self.owner();
        let root = self.root.as_mut().unwrap();
        let hasher = &self.hasher;
        *root = renumber(self.size, root, &token, &|e: &SeqEntry<K, V>| {
            hash_key(hasher, &e.key)
        });
        self.first = -1;
        self.last = self.size as i32;
    }
}

/// A write-through reversed view of a mutable insertion-ordered map.
pub struct Reversed<'a, K, V, S, P: SharedPointerKind>(&'a mut GenericSeqMapMut<K, V, S, P>);

impl<'a, K, V, S, P> Reversed<'a, K, V, S, P>
where
    K: Hash + Eq + Clone,
    V: Clone + PartialEq,
    S: BuildHasher + Clone,
    P: SharedPointerKind,
{
    /// Test whether the underlying map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the size of the underlying map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Get the value for a key in the underlying map.
    #[must_use]
    pub fn get<BK>(&self, key: &BK) -> Option<&V>
    where
        BK: Hash + Eq + ?Sized,
        K: Borrow<BK>,
    {
        self.0.get(key)
    }

    /// Insert at this view's end, which prepends to the underlying map. A
    /// present key keeps its position; only its value changes.
    pub fn insert(&mut self, k: K, v: V) -> Option<V> {
        // the plain insert of the reversed view appends on its side
        let was_present = self.0.contains_key(&k);
        if was_present {
            self.0.insert(k, v)
        } else {
            self.0.insert_first(k, v)
        }
    }

    /// Insert an entry as this view's first.
    pub fn insert_first(&mut self, k: K, v: V) -> Option<V> {
        self.0.insert_last(k, v)
    }

    /// Insert an entry as this view's last.
    pub fn insert_last(&mut self, k: K, v: V) -> Option<V> {
        self.0.insert_first(k, v)
    }

    /// Remove a key from the underlying map.
    pub fn remove<BK>(&mut self, k: &BK) -> Option<V>
    where
        BK: Hash + Eq + ?Sized,
        K: Borrow<BK>,
    {
        self.0.remove(k)
    }

    /// This view's first entry.
    #[must_use]
    pub fn get_first(&self) -> Option<(&K, &V)> {
        self.0.get_last()
    }

    /// This view's last entry.
    #[must_use]
    pub fn get_last(&self) -> Option<(&K, &V)> {
        self.0.get_first()
    }

    /// Remove and return this view's first entry.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.0.pop_last()
    }

    /// Remove and return this view's last entry.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.0.pop_first()
    }

    /// Iterate in this view's order, which is the underlying map's reverse
    /// insertion order.
    #[must_use]
    pub fn iter(&self) -> SnapshotIter<K, V, P> {
        self.0.reverse_iter()
    }
}

// Core traits

impl<K, V, S, P: SharedPointerKind> Clone for GenericSeqMap<K, V, S, P>
where
    S: Clone,
{
    /// Clone a map.
    ///
    /// Time: O(1)
    #[inline]
    fn clone(&self) -> Self {
        GenericSeqMap {
            hasher: self.hasher.clone(),
            root: self.root.clone(),
            size: self.size,
            first: self.first,
            last: self.last,
        }
    }
}

impl<K, V, S, P> Default for GenericSeqMap<K, V, S, P>
where
    S: Default,
    P: SharedPointerKind,
{
    fn default() -> Self {
        GenericSeqMap {
            hasher: Default::default(),
            root: None,
            size: 0,
            first: -1,
            last: 0,
        }
    }
}

impl<K, V, S, P> Default for GenericSeqMapMut<K, V, S, P>
where
    S: Default,
    P: SharedPointerKind,
{
    fn default() -> Self {
        GenericSeqMapMut {
            hasher: Default::default(),
            root: None,
            size: 0,
            first: -1,
            last: 0,
            mutator: None,
            mod_count: ModCount::new(),
        }
    }
}

// Equality of ordered maps depends on the order, unlike the plain variant.
impl<K, V, S1, P1, S2, P2> PartialEq<GenericSeqMap<K, V, S2, P2>> for GenericSeqMap<K, V, S1, P1>
where
    K: Hash + Eq,
    V: PartialEq,
    S1: BuildHasher,
    S2: BuildHasher,
    P1: SharedPointerKind,
    P2: SharedPointerKind,
{
    fn eq(&self, other: &GenericSeqMap<K, V, S2, P2>) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|((k1, v1), (k2, v2))| k1 == k2 && v1 == v2)
    }
}

impl<K, V, S, P> Eq for GenericSeqMap<K, V, S, P>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
    P: SharedPointerKind,
{
}

impl<K, V, S, RK, RV, P> Extend<(RK, RV)> for GenericSeqMapMut<K, V, S, P>
where
    K: Hash + Eq + Clone + From<RK>,
    V: Clone + PartialEq + From<RV>,
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

impl<BK, K, V, S, P> Index<&BK> for GenericSeqMap<K, V, S, P>
where
    BK: Hash + Eq + ?Sized,
    K: Hash + Eq + Borrow<BK>,
    S: BuildHasher,
    P: SharedPointerKind,
{
    type Output = V;

    fn index(&self, key: &BK) -> &Self::Output {
        match self.get(key) {
            None => panic!("GenericSeqMap::index: invalid key"),
            Some(value) => value,
        }
    }
}

impl<K, V, S, P> Debug for GenericSeqMap<K, V, S, P>
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

impl<K, V, S, P> Debug for GenericSeqMapMut<K, V, S, P>
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

/// A borrowing iterator over an immutable ordered map, in insertion order
/// (or reversed, from [`reverse_iter`][GenericSeqMap::reverse_iter]).
pub struct Iter<'a, K, V> {
    it: SeqIter<&'a SeqEntry<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|e| (&e.key, &e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {}

impl<'a, K, V> FusedIterator for Iter<'a, K, V> {}

/// A borrowing iterator over the keys of an ordered map, in insertion
/// order.
pub struct Keys<'a, K, V> {
    it: SeqIter<&'a SeqEntry<K, V>>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|e| &e.key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<'a, K, V> ExactSizeIterator for Keys<'a, K, V> {}

impl<'a, K, V> FusedIterator for Keys<'a, K, V> {}

/// A borrowing iterator over the values of an ordered map, in insertion
/// order.
pub struct Values<'a, K, V> {
    it: SeqIter<&'a SeqEntry<K, V>>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|e| &e.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<'a, K, V> ExactSizeIterator for Values<'a, K, V> {}

impl<'a, K, V> FusedIterator for Values<'a, K, V> {}

/// A consuming iterator over an ordered map, in insertion order.
pub struct ConsumingIter<K, V>
where
    K: Clone,
    V: Clone,
{
    it: SeqIter<SeqEntry<K, V>>,
}

impl<K, V> Iterator for ConsumingIter<K, V>
where
    K: Clone,
    V: Clone,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|e| (e.key, e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<K: Clone, V: Clone> ExactSizeIterator for ConsumingIter<K, V> {}

impl<K: Clone, V: Clone> FusedIterator for ConsumingIter<K, V> {}

/// A fail-fast snapshot iterator over a mutable ordered map, in insertion
/// order (or reversed, from [`reverse_iter`][GenericSeqMapMut::reverse_iter]).
pub struct SnapshotIter<K, V, P>
where
    K: Clone,
    V: Clone,
    P: SharedPointerKind,
{
    it: FailFast<SeqIter<SeqEntry<K, V>>, P>,
}

impl<K, V, P> Iterator for SnapshotIter<K, V, P>
where
    K: Clone,
    V: Clone,
    P: SharedPointerKind,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|e| (e.key, e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<K: Clone, V: Clone, P: SharedPointerKind> ExactSizeIterator for SnapshotIter<K, V, P> {}

impl<K: Clone, V: Clone, P: SharedPointerKind> FusedIterator for SnapshotIter<K, V, P> {}

// Iterator conversions

impl<K, V, S, P> FromIterator<(K, V)> for GenericSeqMap<K, V, S, P>
where
    K: Hash + Eq + Clone,
    V: Clone + PartialEq,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn from_iter<T>(i: T) -> Self
    where
        T: IntoIterator<Item = (K, V)>,
    {
        let mut map: GenericSeqMapMut<K, V, S, P> = Default::default();
        for (k, v) in i {
            map.insert(k, v);
        }
        map.to_immutable()
    }
}

impl<K, V, S, P> FromIterator<(K, V)> for GenericSeqMapMut<K, V, S, P>
where
    K: Hash + Eq + Clone,
    V: Clone + PartialEq,
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

impl<'a, K, V, S, P: SharedPointerKind> IntoIterator for &'a GenericSeqMap<K, V, S, P> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S, P> IntoIterator for GenericSeqMap<K, V, S, P>
where
    K: Clone,
    V: Clone,
    P: SharedPointerKind,
{
    type Item = (K, V);
    type IntoIter = ConsumingIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        ConsumingIter {
            it: SeqIter::new(
                self.size,
                self.first,
                self.last,
                false,
                NodeDrain::new(self.root, self.size).map(|e| (e.seq, e)),
            ),
        }
    }
}

impl<K, V, S, P> IntoIterator for GenericSeqMapMut<K, V, S, P>
where
    K: Clone,
    V: Clone,
    P: SharedPointerKind,
{
    type Item = (K, V);
    type IntoIter = ConsumingIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        ConsumingIter {
            it: SeqIter::new(
                self.size,
                self.first,
                self.last,
                false,
                NodeDrain::new(self.root, self.size).map(|e| (e.seq, e)),
            ),
        }
    }
}

// Conversions

impl<K, V, S, const N: usize, P> From<[(K, V); N]> for GenericSeqMap<K, V, S, P>
where
    K: Hash + Eq + Clone,
    V: Clone + PartialEq,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn from(arr: [(K, V); N]) -> Self {
        IntoIterator::into_iter(arr).collect()
    }
}

impl<K, V, S, P> From<Vec<(K, V)>> for GenericSeqMap<K, V, S, P>
where
    K: Hash + Eq + Clone,
    V: Clone + PartialEq,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn from(vec: Vec<(K, V)>) -> Self {
        vec.into_iter().collect()
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

    assert_impl_all!(SeqMap<i32, i32>: Send, Sync);
    assert_not_impl_any!(SeqMap<i32, *const i32>: Send, Sync);
    assert_covariant!(SeqMap<i32, T> in T);

    fn entries<K, V, S, P>(map: &GenericSeqMapMut<K, V, S, P>) -> Vec<(K, V)>
    where
        K: Hash + Eq + Clone,
        V: Clone,
        S: BuildHasher + Clone,
        P: SharedPointerKind,
    {
        map.iter().collect()
    }

    #[test]
    fn iterates_in_insertion_order() {
        let mut map: SeqMapMut<i32, &str> = SeqMapMut::new();
        map.insert(3, "c");
        map.insert(1, "a");
        map.insert(2, "b");
        assert_eq!(vec![(3, "c"), (1, "a"), (2, "b")], entries(&map));
        assert_eq!(
            vec![(2, "b"), (1, "a"), (3, "c")],
            map.reverse_iter().collect::<Vec<_>>()
        );
        assert_eq!(Some((&3, &"c")), map.get_first());
        assert_eq!(Some((&2, &"b")), map.get_last());
    }

    #[test]
    fn value_replacement_keeps_the_position() {
        let mut map: SeqMapMut<&str, i32> = SeqMapMut::new();
        map.insert("a", 1);
        map.insert("b", 2);
        map.insert("c", 3);
        assert_eq!(Some(2), map.insert("b", 20));
        assert_eq!(vec![("a", 1), ("b", 20), ("c", 3)], entries(&map));
    }

    #[test]
    fn insert_last_and_first_move_entries() {
        let mut map: SeqMapMut<&str, i32> = SeqMapMut::new();
        map.insert("a", 1);
        map.insert("b", 2);
        map.insert("c", 3);
        assert_eq!(Some(1), map.insert_last("a", 10));
        assert_eq!(vec![("b", 2), ("c", 3), ("a", 10)], entries(&map));
        assert_eq!(Some(3), map.insert_first("c", 30));
        assert_eq!(vec![("c", 30), ("b", 2), ("a", 10)], entries(&map));
    }

    #[test]
    fn moving_an_entry_already_in_place_changes_nothing() {
        let mut map: SeqMapMut<&str, i32> = SeqMapMut::new();
        map.insert("a", 1);
        map.insert("b", 2);
        let it = map.iter();
        assert_eq!(Some(2), map.insert_last("b", 2));
        assert_eq!(Some(1), map.insert_first("a", 1));
        // no structural change, the outstanding iterator stays valid
        assert_eq!(vec![("a", 1), ("b", 2)], it.collect::<Vec<_>>());
    }

    #[test]
    fn pop_works_from_both_ends() {
        let mut map: SeqMapMut<i32, i32> = (0..5).map(|i| (i, i * 10)).collect();
        assert_eq!(Some((0, 0)), map.pop_first());
        assert_eq!(Some((4, 40)), map.pop_last());
        assert_eq!(vec![(1, 10), (2, 20), (3, 30)], entries(&map));
    }

    #[test]
    fn immutable_ops_share_structure_on_no_ops() {
        let map: SeqMap<i32, i32> = (0..10).map(|i| (i, i)).collect();
        assert!(map.ptr_eq(&map.update(5, 5)));
        assert!(map.ptr_eq(&map.without(&55)));
        assert!(map.ptr_eq(&map.update_last(9, 9)));
        assert!(map.ptr_eq(&map.update_first(0, 0)));
        assert!(!map.ptr_eq(&map.update(5, 50)));
    }

    #[test]
    fn immutable_update_preserves_the_old_version() {
        let v1: SeqMap<i32, i32> = (0..100).map(|i| (i, i)).collect();
        let v2 = v1.update(50, 500).update(100, 100);
        assert_eq!(100, v1.len());
        assert_eq!(101, v2.len());
        assert_eq!(Some(&50), v1.get(&50));
        assert_eq!(Some(&500), v2.get(&50));
        // replacing 50's value did not move it
        assert_eq!(
            (0..101).collect::<Vec<_>>(),
            v2.keys().cloned().collect::<Vec<_>>()
        );
    }

    #[test]
    fn index_operator() {
        let map: SeqMap<&str, i32> = seqmap! {"a" => 1, "b" => 2};
        assert_eq!(2, map["b"]);
    }

    #[test]
    fn mutable_iterator_is_fail_fast() {
        let mut map: SeqMapMut<i32, i32> = (0..100).map(|i| (i, i)).collect();
        let mut it = map.iter();
        assert_eq!(Some((0, 0)), it.next());
        map.remove(&40);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| it.next()));
        assert!(result.is_err());
    }

    #[test]
    fn reversed_view_writes_through() {
        let mut map: SeqMapMut<i32, i32> = (0..3).map(|i| (i, i)).collect();
        {
            let mut rev = map.reversed();
            assert_eq!(Some((&2, &2)), rev.get_first());
            rev.insert(-1, -1);
            assert_eq!(Some((2, 2)), rev.pop_first());
        }
        assert_eq!(vec![(-1, -1), (0, 0), (1, 1)], entries(&map));
    }

    #[test]
    fn handoff_round_trips_preserve_order() {
        let map: SeqMap<i32, i32> = (0..1000).map(|i| (i, i)).collect();
        let mut m = map.to_mutable();
        assert_eq!(map, m.to_immutable());
        for i in 1000..1100 {
            m.insert(i, i);
        }
        let grown = m.to_immutable();
        assert_eq!(
            (0..1100).collect::<Vec<_>>(),
            grown.keys().cloned().collect::<Vec<_>>()
        );
        assert_eq!(1000, map.len());
    }

    #[test]
    fn bulk_operations_preserve_order() {
        let left: SeqMap<i32, &str> = vec![(3, "l3"), (1, "l1"), (2, "l2")].into_iter().collect();
        let right: SeqMap<i32, &str> = vec![(5, "r5"), (2, "r2"), (4, "r4")].into_iter().collect();

        let union = left.clone().union(right.clone());
        assert_eq!(
            vec![(3, "l3"), (1, "l1"), (2, "l2"), (5, "r5"), (4, "r4")],
            union.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>()
        );

        let intersection = left.clone().intersection(right.clone());
        assert_eq!(
            vec![(2, "l2")],
            intersection.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>()
        );

        let complement = left.clone().relative_complement(right);
        assert_eq!(
            vec![(3, "l3"), (1, "l1")],
            complement.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>()
        );

        assert!(left.clone().union(SeqMap::new()).ptr_eq(&left));
        assert!(left
            .clone()
            .relative_complement(SeqMap::<i32, &str>::new())
            .ptr_eq(&left));
    }

    #[test]
    fn without_first_and_last() {
        let map: SeqMap<i32, i32> = (0..5).map(|i| (i, i)).collect();
        let ((k, v), rest) = map.without_first().unwrap();
        assert_eq!((0, 0), (k, v));
        assert_eq!(4, rest.len());
        let ((k, v), rest) = rest.without_last().unwrap();
        assert_eq!((4, 4), (k, v));
        assert_eq!(vec![1, 2, 3], rest.keys().cloned().collect::<Vec<_>>());
    }

    proptest! {
        #[test]
        fn order_matches_a_vec_model(
            ref ops in collection::vec((0u8..4, i16::ANY, i16::ANY), 0..300)
        ) {
            let mut map: GenericSeqMapMut<i16, i16, BuildHasherDefault<LolHasher>, DefaultSharedPtr> =
                Default::default();
            let mut model: Vec<(i16, i16)> = Vec::new();
            for (op, key, value) in ops {
                let (key, value) = (*key, *value);
                match op {
                    0 => {
                        match model.iter_mut().find(|(k, _)| *k == key) {
                            Some(entry) => entry.1 = value,
                            None => model.push((key, value)),
                        }
                        map.insert(key, value);
                    }
                    1 => {
                        model.retain(|(k, _)| *k != key);
                        model.push((key, value));
                        map.insert_last(key, value);
                    }
                    2 => {
                        model.retain(|(k, _)| *k != key);
                        model.insert(0, (key, value));
                        map.insert_first(key, value);
                    }
                    _ => {
                        model.retain(|(k, _)| *k != key);
                        map.remove(&key);
                    }
                }
                assert_eq!(model.len(), map.len());
            }
            assert_eq!(model, entries(&map));
        }

        #[test]
        fn immutable_and_mutable_agree(ref pairs in collection::vec((i16::ANY, i16::ANY), 0..200)) {
            let mut immutable: GenericSeqMap<i16, i16, BuildHasherDefault<LolHasher>, DefaultSharedPtr> =
                Default::default();
            let mut mutable: GenericSeqMapMut<i16, i16, BuildHasherDefault<LolHasher>, DefaultSharedPtr> =
                Default::default();
            for (k, v) in pairs {
                immutable = immutable.update(*k, *v);
                mutable.insert(*k, *v);
            }
            assert_eq!(immutable, mutable.to_immutable());
        }

        #[test]
        fn lookups_after_churn(ref pairs in collection::vec((i16::ANY, i16::ANY), 0..300)) {
            let mut map: GenericSeqMapMut<i16, i16, BuildHasherDefault<LolHasher>, DefaultSharedPtr> =
                Default::default();
            let mut reference: std::collections::HashMap<i16, i16> = Default::default();
            for (k, v) in pairs {
                map.insert(*k, *v);
                reference.insert(*k, *v);
            }
            for (k, v) in &reference {
                assert_eq!(Some(v), map.get(k));
            }
            assert_eq!(reference.len(), map.len());
        }
    }
}
