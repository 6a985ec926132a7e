// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! An insertion-ordered set.
//!
//! The same CHAMP trie as the `hashset` module, with every element tagged
//! by a sequence number so that iteration runs in insertion order. Two
//! flavors hand off to each other in O(1): [`GenericSeqSet`], whose
//! operations return new sets sharing structure with the old one, and
//! [`GenericSeqSetMut`], a single-owner view that edits its exclusively
//! owned trie nodes in place.
//!
//! A plain insert appends; [`insert_first`][GenericSeqSetMut::insert_first]
//! and [`insert_last`][GenericSeqSetMut::insert_last] move an element that
//! is already present to the respective end. Re-inserting a present element
//! with a plain insert keeps its position.
//!
//! Appending is amortized O(1): when the sequence counters drift too far
//! apart, after many removals or on the verge of overflow, the whole
//! trie is rebuilt once with densely packed numbers, a cost charged against
//! the insertions that caused the drift.

use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::fmt::{Debug, Error, Formatter};
use std::hash::{BuildHasher, Hash};
use std::iter::{FromIterator, FusedIterator};

use archery::{SharedPointer, SharedPointerKind};

use crate::fail_fast::{FailFast, ModCount};
use crate::nodes::champ::{
    hash_key, ChangeEvent, Drain as NodeDrain, Iter as NodeIter, Node, OwnerToken,
};
use crate::seq::{first_in, last_in, must_renumber, renumber, SeqElem, SeqIter};
use crate::shared_ptr::DefaultSharedPtr;

/// Construct an insertion-ordered set from a sequence of values.
///
/// # Examples
///
/// ```
/// # #[macro_use] extern crate champl;
/// # fn main() {
/// let set = seqset![3, 1, 2];
/// assert_eq!(vec![3, 1, 2], set.iter().cloned().collect::<Vec<_>>());
/// # }
/// ```
#[macro_export]
macro_rules! seqset {
    () => { $crate::seqset::SeqSet::new() };

    ( $($x:expr),* ) => {{
        let mut l = $crate::seqset::SeqSetMut::new();
        $(
            l.insert($x);
        )*
        l.to_immutable()
    }};

    ( $($x:expr ,)* ) => {{
        let mut l = $crate::seqset::SeqSetMut::new();
        $(
            l.insert($x);
        )*
        l.to_immutable()
    }};
}

/// Type alias for [`GenericSeqSet`] with the default hasher and pointer
/// kind.
///
/// [GenericSeqSet]: ./struct.GenericSeqSet.html
pub type SeqSet<A> = GenericSeqSet<A, RandomState, DefaultSharedPtr>;

/// Type alias for [`GenericSeqSetMut`] with the default hasher and pointer
/// kind.
///
/// [GenericSeqSetMut]: ./struct.GenericSeqSetMut.html
pub type SeqSetMut<A> = GenericSeqSetMut<A, RandomState, DefaultSharedPtr>;

/// An insertion-ordered set whose update operations return a new set.
///
/// Iteration visits elements in the order they were inserted. An operation
/// that has no effect returns a set sharing the root wholesale, `ptr_eq`
/// with the receiver.
pub struct GenericSeqSet<A, S, P: SharedPointerKind> {
    hasher: S,
    root: Option<SharedPointer<Node<SeqElem<A>, P>, P>>,
    size: usize,
    first: i32,
    last: i32,
}

/// An insertion-ordered set that is updated in place.
///
/// The view is single-owner and not thread-safe; publish with
/// [`to_immutable`][GenericSeqSetMut::to_immutable] to share contents.
pub struct GenericSeqSetMut<A, S, P: SharedPointerKind> {
    hasher: S,
    root: Option<SharedPointer<Node<SeqElem<A>, P>, P>>,
    size: usize,
    first: i32,
    last: i32,
    mutator: Option<OwnerToken<P>>,
    mod_count: ModCount<P>,
}

impl<A, S, P: SharedPointerKind> GenericSeqSet<A, S, P> {
    /// Construct an empty set.
    #[must_use]
    pub fn new() -> Self
    where
        S: Default,
    {
        Self::default()
    }

    /// Construct an empty set using the provided hasher.
    #[inline]
    #[must_use]
    pub fn with_hasher(hasher: S) -> Self {
        GenericSeqSet {
            hasher,
            root: None,
            size: 0,
            first: -1,
            last: 0,
        }
    }

    /// Get a reference to the set's [`BuildHasher`][BuildHasher].
    ///
    /// [BuildHasher]: https://doc.rust-lang.org/std/hash/trait.BuildHasher.html
    #[must_use]
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Test whether a set is empty.
    ///
    /// Time: O(1)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the size of a set.
    ///
    /// Time: O(1)
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Test whether two sets refer to the same content in memory.
    ///
    /// Time: O(1)
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (Some(a), Some(b)) => SharedPointer::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Discard all elements from the set.
    pub fn clear(&mut self) {
        self.root = None;
        self.size = 0;
        self.first = -1;
        self.last = 0;
    }

    /// Get an iterator over the set, in insertion order.
    ///
    /// Time: O(n) to create, O(1) per step while the sequence numbers are
    /// dense, O(log n) per step otherwise.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, A> {
        Iter {
            it: self.ranked(false),
        }
    }

    /// Get an iterator over the set, in reverse insertion order.
    #[must_use]
    pub fn reverse_iter(&self) -> Iter<'_, A> {
        Iter {
            it: self.ranked(true),
        }
    }

    fn ranked(&self, reversed: bool) -> SeqIter<&SeqElem<A>> {
        SeqIter::new(
            self.size,
            self.first,
            self.last,
            reversed,
            NodeIter::new(self.root.as_deref(), self.size).map(|e| (e.seq, e)),
        )
    }

    /// The oldest element of the set.
    ///
    /// Time: O(n)
    #[must_use]
    pub fn get_first(&self) -> Option<&A> {
        first_in(self.root.as_deref(), self.size).map(|e| &e.elem)
    }

    /// The most recently appended element of the set.
    ///
    /// Time: O(n)
    #[must_use]
    pub fn get_last(&self) -> Option<&A> {
        last_in(self.root.as_deref(), self.size).map(|e| &e.elem)
    }

    #[cfg(test)]
    pub(crate) fn counters(&self) -> (i32, i32) {
        (self.first, self.last)
    }
}

impl<A, S, P> GenericSeqSet<A, S, P>
where
    A: Hash + Eq,
    S: BuildHasher,
    P: SharedPointerKind,
{
    /// Test if a value is part of a set.
    ///
    /// Time: O(log n)
    #[must_use]
    pub fn contains<BA>(&self, a: &BA) -> bool
    where
        BA: Hash + Eq + ?Sized,
        A: Borrow<BA>,
    {
        match &self.root {
            Some(root) => root.find(hash_key(&self.hasher, a), 0, a).is_some(),
            None => false,
        }
    }
}

impl<A, S, P> GenericSeqSet<A, S, P>
where
    A: Hash + Eq + Clone,
    S: BuildHasher + Clone,
    P: SharedPointerKind,
{
    /// Construct a new set with the given value appended, unless it is
    /// already present, in which case the result is `ptr_eq` with this set
    /// and the element keeps its position.
    ///
    /// Time: amortized O(log n)
    #[must_use]
    pub fn update(&self, a: A) -> Self {
        self.push_back(a, false)
    }

    /// Construct a new set with the given value as its last element,
    /// moving it there if it is already present.
    ///
    /// Time: amortized O(log n)
    #[must_use]
    pub fn update_last(&self, a: A) -> Self {
        self.push_back(a, true)
    }

    /// Construct a new set with the given value as its first element,
    /// moving it there if it is already present.
    ///
    /// Time: amortized O(log n)
    #[must_use]
    pub fn update_first(&self, a: A) -> Self {
        self.push_front(a, true)
    }

    fn push_back(&self, a: A, move_existing: bool) -> Self {
        let hash = hash_key(&self.hasher, &a);
        let elem = SeqElem {
            elem: a,
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
                    elem,
                    hash,
                    0,
                    &mut details,
                    &|old: &SeqElem<A>, new: SeqElem<A>| {
                        if !move_existing || old.seq == new.seq - 1 {
                            None
                        } else {
                            Some(new)
                        }
                    },
                    &|e: &SeqElem<A>| hash_key(hasher, &e.elem),
                );
            }
            None => {
                details.inserted();
                out.root = Some(SharedPointer::new(Node::unit(None, hash, elem)));
            }
        }
        if !details.modified {
            return out;
        }
        if details.replaced {
            // the element vacated its old slot on the way to the back
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

    fn push_front(&self, a: A, move_existing: bool) -> Self {
        let hash = hash_key(&self.hasher, &a);
        let elem = SeqElem {
            elem: a,
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
                    elem,
                    hash,
                    0,
                    &mut details,
                    &|old: &SeqElem<A>, new: SeqElem<A>| {
                        if !move_existing || old.seq == new.seq + 1 {
                            None
                        } else {
                            Some(new)
                        }
                    },
                    &|e: &SeqElem<A>| hash_key(hasher, &e.elem),
                );
            }
            None => {
                details.inserted();
                out.root = Some(SharedPointer::new(Node::unit(None, hash, elem)));
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

    /// Construct a new set with the given value removed if it's in the
    /// set; otherwise the result is `ptr_eq` with this set.
    ///
    /// Time: amortized O(log n)
    #[must_use]
    pub fn without<BA>(&self, a: &BA) -> Self
    where
        BA: Hash + Eq + ?Sized,
        A: Borrow<BA>,
    {
        if self.root.is_none() {
            return self.clone();
        }
        let mut details = ChangeEvent::new();
        let mut out = self.clone();
        let hash = hash_key(&self.hasher, a);
        Node::remove(out.root.as_mut().unwrap(), None, a, hash, 0, &mut details);
        if !details.modified {
            return out;
        }
        out.size -= 1;
        let removed = details.old.unwrap();
        if out.size == 0 {
            out.root = None;
            out.first = -1;
            out.last = 0;
            return out;
        }
        if removed.seq == out.last - 1 {
            out.last -= 1;
        }
        if removed.seq == out.first + 1 {
            out.first += 1;
        }
        out.compact();
        out
    }

    /// Remove the oldest element, returning it and the updated set.
    ///
    /// Time: O(n)
    #[must_use]
    pub fn without_first(&self) -> Option<(A, Self)> {
        let first = self.get_first()?.clone();
        let rest = self.without(&first);
        Some((first, rest))
    }

    /// Remove the most recently appended element, returning it and the
    /// updated set.
    ///
    /// Time: O(n)
    #[must_use]
    pub fn without_last(&self) -> Option<(A, Self)> {
        let last = self.get_last()?.clone();
        let rest = self.without(&last);
        Some((last, rest))
    }

    /// Convert this set into a mutable view of the same contents.
    ///
    /// Time: O(1). The trie is shared; the mutable view copies nodes as it
    /// first writes to them.
    #[must_use]
    pub fn to_mutable(&self) -> GenericSeqSetMut<A, S, P> {
        GenericSeqSetMut {
            hasher: self.hasher.clone(),
            root: self.root.clone(),
            size: self.size,
            first: self.first,
            last: self.last,
            mutator: None,
            mod_count: ModCount::new(),
        }
    }

    /// Construct the union of two sets: this set's elements in their
    /// order, followed by the other set's new elements in theirs.
    ///
    /// The union with an empty set, or with itself, is `ptr_eq` with this
    /// set.
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
        for value in other {
            out.insert(value);
        }
        out.to_immutable()
    }

    /// Construct the intersection of two sets, keeping this set's order.
    ///
    /// The intersection with an empty set is the canonical empty set; the
    /// intersection of a set with itself is `ptr_eq` with this set.
    ///
    /// Time: O(n log n)
    #[must_use]
    pub fn intersection(self, other: Self) -> Self {
        if self.ptr_eq(&other) {
            return self;
        }
        if self.is_empty() || other.is_empty() {
            return GenericSeqSet::with_hasher(self.hasher.clone());
        }
        let mut out = GenericSeqSetMut::with_hasher(self.hasher.clone());
        for value in self {
            if other.contains(&value) {
                out.insert(value);
            }
        }
        out.to_immutable()
    }

    /// Construct the relative complement of two sets, that is this set
    /// without the other set's elements, keeping this set's order.
    ///
    /// If nothing gets removed, the result is `ptr_eq` with this set.
    ///
    /// Time: O(m log n) where m is the size of the other set
    #[must_use]
    pub fn relative_complement(self, other: Self) -> Self {
        if other.is_empty() {
            return self;
        }
        let mut out = self.to_mutable();
        for value in other {
            out.remove(&value);
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
        *root = renumber(self.size, root, &token, &|e: &SeqElem<A>| {
            hash_key(hasher, &e.elem)
        });
        self.first = -1;
        self.last = self.size as i32;
    }
}

impl<A, S, P: SharedPointerKind> GenericSeqSetMut<A, S, P> {
    /// Construct an empty set.
    #[must_use]
    pub fn new() -> Self
    where
        S: Default,
    {
        Self::default()
    }

    /// Construct an empty set using the provided hasher.
    #[inline]
    #[must_use]
    pub fn with_hasher(hasher: S) -> Self {
        GenericSeqSetMut {
            hasher,
            root: None,
            size: 0,
            first: -1,
            last: 0,
            mutator: None,
            mod_count: ModCount::new(),
        }
    }

    /// Get a reference to the set's [`BuildHasher`][BuildHasher].
    ///
    /// [BuildHasher]: https://doc.rust-lang.org/std/hash/trait.BuildHasher.html
    #[must_use]
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Test whether a set is empty.
    ///
    /// Time: O(1)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the size of a set.
    ///
    /// Time: O(1)
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Discard all elements from the set.
    pub fn clear(&mut self) {
        if self.size > 0 {
            self.mod_count.bump();
        }
        self.root = None;
        self.size = 0;
        self.first = -1;
        self.last = 0;
    }

    /// The oldest element of the set.
    ///
    /// Time: O(n)
    #[must_use]
    pub fn get_first(&self) -> Option<&A> {
        first_in(self.root.as_deref(), self.size).map(|e| &e.elem)
    }

    /// The most recently appended element of the set.
    ///
    /// Time: O(n)
    #[must_use]
    pub fn get_last(&self) -> Option<&A> {
        last_in(self.root.as_deref(), self.size).map(|e| &e.elem)
    }

    fn owner(&mut self) -> OwnerToken<P> {
        if self.mutator.is_none() {
            self.mutator = Some(OwnerToken::new());
        }
        self.mutator.as_ref().unwrap().clone()
    }

    #[cfg(test)]
    pub(crate) fn counters(&self) -> (i32, i32) {
        (self.first, self.last)
    }
}

impl<A, S, P> GenericSeqSetMut<A, S, P>
where
    A: Hash + Eq,
    S: BuildHasher,
    P: SharedPointerKind,
{
    /// Test if a value is part of a set.
    ///
    /// Time: O(log n)
    #[must_use]
    pub fn contains<BA>(&self, a: &BA) -> bool
    where
        BA: Hash + Eq + ?Sized,
        A: Borrow<BA>,
    {
        match &self.root {
            Some(root) => root.find(hash_key(&self.hasher, a), 0, a).is_some(),
            None => false,
        }
    }
}

impl<A, S, P> GenericSeqSetMut<A, S, P>
where
    A: Hash + Eq + Clone,
    S: BuildHasher + Clone,
    P: SharedPointerKind,
{
    /// Insert a value, appending it to the end of the insertion order.
    ///
    /// Returns true if the value was not already present. An insert of a
    /// value that is already in the set keeps the stored element where it
    /// is and changes nothing.
    ///
    /// Time: amortized O(log n)
    pub fn insert(&mut self, a: A) -> bool {
        self.push_back(a, false)
    }

    /// Insert a value as the last element, moving it to the end if it is
    /// already present.
    ///
    /// Returns true if the set changed.
    ///
    /// Time: amortized O(log n)
    pub fn insert_last(&mut self, a: A) -> bool {
        self.push_back(a, true)
    }

    /// Insert a value as the first element, moving it to the front if it
    /// is already present.
    ///
    /// Returns true if the set changed.
    ///
    /// Time: amortized O(log n)
    pub fn insert_first(&mut self, a: A) -> bool {
        self.push_front(a, true)
    }

    pub(crate) fn push_back(&mut self, a: A, move_existing: bool) -> bool {
        let token = self.owner();
        let hash = hash_key(&self.hasher, &a);
        let elem = SeqElem {
            elem: a,
            seq: self.last,
        };
        let mut details = ChangeEvent::new();
        match &mut self.root {
            Some(root) => {
                let hasher = &self.hasher;
                Node::update(
                    root,
                    Some(&token),
                    elem,
                    hash,
                    0,
                    &mut details,
                    &|old: &SeqElem<A>, new: SeqElem<A>| {
                        if !move_existing || old.seq == new.seq - 1 {
                            None
                        } else {
                            Some(new)
                        }
                    },
                    &|e: &SeqElem<A>| hash_key(hasher, &e.elem),
                );
            }
            None => {
                details.inserted();
                self.root = Some(SharedPointer::new(Node::unit(Some(token), hash, elem)));
            }
        }
        if !details.modified {
            return false;
        }
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
        true
    }

    pub(crate) fn push_front(&mut self, a: A, move_existing: bool) -> bool {
        let token = self.owner();
        let hash = hash_key(&self.hasher, &a);
        let elem = SeqElem {
            elem: a,
            seq: self.first,
        };
        let mut details = ChangeEvent::new();
        match &mut self.root {
            Some(root) => {
                let hasher = &self.hasher;
                Node::update(
                    root,
                    Some(&token),
                    elem,
                    hash,
                    0,
                    &mut details,
                    &|old: &SeqElem<A>, new: SeqElem<A>| {
                        if !move_existing || old.seq == new.seq + 1 {
                            None
                        } else {
                            Some(new)
                        }
                    },
                    &|e: &SeqElem<A>| hash_key(hasher, &e.elem),
                );
            }
            None => {
                details.inserted();
                self.root = Some(SharedPointer::new(Node::unit(Some(token), hash, elem)));
            }
        }
        if !details.modified {
            return false;
        }
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
        true
    }

    /// Remove a value from the set if it exists, returning it.
    ///
    /// Time: amortized O(log n)
    pub fn remove<BA>(&mut self, a: &BA) -> Option<A>
    where
        BA: Hash + Eq + ?Sized,
        A: Borrow<BA>,
    {
        self.root.as_ref()?;
        let token = self.owner();
        let hash = hash_key(&self.hasher, a);
        let mut details = ChangeEvent::new();
        Node::remove(self.root.as_mut().unwrap(), Some(&token), a, hash, 0, &mut details);
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
        Some(removed.elem)
    }

    /// Remove and return the oldest element.
    ///
    /// Time: O(n)
    pub fn pop_first(&mut self) -> Option<A> {
        let first = self.get_first()?.clone();
        self.remove(&first)
    }

    /// Remove and return the most recently appended element.
    ///
    /// Time: O(n)
    pub fn pop_last(&mut self) -> Option<A> {
        let last = self.get_last()?.clone();
        self.remove(&last)
    }

    /// Publish the current contents as an immutable set.
    ///
    /// Time: O(1). This view stays usable but gives up its ownership token,
    /// so its next writes copy the nodes they touch instead of editing them
    /// under the feet of the published set.
    #[must_use]
    pub fn to_immutable(&mut self) -> GenericSeqSet<A, S, P> {
        self.mutator = None;
        GenericSeqSet {
            hasher: self.hasher.clone(),
            root: self.root.clone(),
            size: self.size,
            first: self.first,
            last: self.last,
        }
    }

    /// Get an iterator over the set, in insertion order.
    ///
    /// The iterator works on a snapshot and yields values by clone. It is
    /// fail-fast: structurally modifying this view while the iterator is
    /// alive makes the iterator's next `next` call panic.
    ///
    /// Time: O(n) to create
    #[must_use]
    pub fn iter(&self) -> SnapshotIter<A, P> {
        self.snapshot(false)
    }

    /// Get an iterator over the set, in reverse insertion order. Fail-fast
    /// like [`iter`][GenericSeqSetMut::iter].
    #[must_use]
    pub fn reverse_iter(&self) -> SnapshotIter<A, P> {
        self.snapshot(true)
    }

    fn snapshot(&self, reversed: bool) -> SnapshotIter<A, P> {
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

    /// A reversed view of this set whose writes go to the underlying set,
    /// with the meaning of first and last exchanged.
    #[must_use]
    pub fn reversed(&mut self) -> Reversed<'_, A, S, P> {
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
        *root = renumber(self.size, root, &token, &|e: &SeqElem<A>| {
            hash_key(hasher, &e.elem)
        });
        self.first = -1;
        self.last = self.size as i32;
    }
}

/// A write-through reversed view of a mutable insertion-ordered set.
///
/// Every operation acts on the underlying set with the direction flipped:
/// the view's first element is the set's last, an insert through the view
/// prepends, and iteration runs backwards.
pub struct Reversed<'a, A, S, P: SharedPointerKind>(&'a mut GenericSeqSetMut<A, S, P>);

impl<'a, A, S, P> Reversed<'a, A, S, P>
where
    A: Hash + Eq + Clone,
    S: BuildHasher + Clone,
    P: SharedPointerKind,
{
    /// Test whether the underlying set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the size of the underlying set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Test if a value is part of the underlying set.
    #[must_use]
    pub fn contains<BA>(&self, a: &BA) -> bool
    where
        BA: Hash + Eq + ?Sized,
        A: Borrow<BA>,
    {
        self.0.contains(a)
    }

    /// Insert a value at this view's end, which prepends to the underlying
    /// set. A value that is already present keeps its position.
    pub fn insert(&mut self, a: A) -> bool {
        self.0.push_front(a, false)
    }

    /// Insert a value as this view's first element.
    pub fn insert_first(&mut self, a: A) -> bool {
        self.0.insert_last(a)
    }

    /// Insert a value as this view's last element.
    pub fn insert_last(&mut self, a: A) -> bool {
        self.0.insert_first(a)
    }

    /// Remove a value from the underlying set.
    pub fn remove<BA>(&mut self, a: &BA) -> Option<A>
    where
        BA: Hash + Eq + ?Sized,
        A: Borrow<BA>,
    {
        self.0.remove(a)
    }

    /// This view's first element.
    #[must_use]
    pub fn get_first(&self) -> Option<&A> {
        self.0.get_last()
    }

    /// This view's last element.
    #[must_use]
    pub fn get_last(&self) -> Option<&A> {
        self.0.get_first()
    }

    /// Remove and return this view's first element.
    pub fn pop_first(&mut self) -> Option<A> {
        self.0.pop_last()
    }

    /// Remove and return this view's last element.
    pub fn pop_last(&mut self) -> Option<A> {
        self.0.pop_first()
    }

    /// Iterate in this view's order, which is the underlying set's reverse
    /// insertion order.
    #[must_use]
    pub fn iter(&self) -> SnapshotIter<A, P> {
        self.0.reverse_iter()
    }
}

// Core traits

impl<A, S, P: SharedPointerKind> Clone for GenericSeqSet<A, S, P>
where
    S: Clone,
{
    /// Clone a set.
    ///
    /// Time: O(1)
    #[inline]
    fn clone(&self) -> Self {
        GenericSeqSet {
            hasher: self.hasher.clone(),
            root: self.root.clone(),
            size: self.size,
            first: self.first,
            last: self.last,
        }
    }
}

impl<A, S, P> Default for GenericSeqSet<A, S, P>
where
    S: Default,
    P: SharedPointerKind,
{
    fn default() -> Self {
        GenericSeqSet {
            hasher: Default::default(),
            root: None,
            size: 0,
            first: -1,
            last: 0,
        }
    }
}

impl<A, S, P> Default for GenericSeqSetMut<A, S, P>
where
    S: Default,
    P: SharedPointerKind,
{
    fn default() -> Self {
        GenericSeqSetMut {
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

// Equality of ordered sets depends on the order, unlike the plain variant.
impl<A, S1, P1, S2, P2> PartialEq<GenericSeqSet<A, S2, P2>> for GenericSeqSet<A, S1, P1>
where
    A: Hash + Eq,
    S1: BuildHasher,
    S2: BuildHasher,
    P1: SharedPointerKind,
    P2: SharedPointerKind,
{
    fn eq(&self, other: &GenericSeqSet<A, S2, P2>) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<A, S, P> Eq for GenericSeqSet<A, S, P>
where
    A: Hash + Eq,
    S: BuildHasher,
    P: SharedPointerKind,
{
}

impl<A, S, R, P: SharedPointerKind> Extend<R> for GenericSeqSetMut<A, S, P>
where
    A: Hash + Eq + Clone + From<R>,
    S: BuildHasher + Clone,
{
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = R>,
    {
        for value in iter {
            self.insert(From::from(value));
        }
    }
}

impl<A, S, P> Debug for GenericSeqSet<A, S, P>
where
    A: Hash + Eq + Debug,
    S: BuildHasher,
    P: SharedPointerKind,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<A, S, P> Debug for GenericSeqSetMut<A, S, P>
where
    A: Hash + Eq + Debug + Clone,
    S: BuildHasher + Clone,
    P: SharedPointerKind,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        f.debug_set().entries(self.iter()).finish()
    }
}

// Iterators

/// A borrowing iterator over an immutable ordered set, in insertion order
/// (or reversed, from [`reverse_iter`][GenericSeqSet::reverse_iter]).
pub struct Iter<'a, A> {
    it: SeqIter<&'a SeqElem<A>>,
}

impl<'a, A> Iterator for Iter<'a, A> {
    type Item = &'a A;

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|e| &e.elem)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<'a, A> ExactSizeIterator for Iter<'a, A> {}

impl<'a, A> FusedIterator for Iter<'a, A> {}

/// A consuming iterator over an ordered set, in insertion order.
pub struct ConsumingIter<A: Clone> {
    it: SeqIter<SeqElem<A>>,
}

impl<A: Clone> Iterator for ConsumingIter<A> {
    type Item = A;

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|e| e.elem)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<A: Clone> ExactSizeIterator for ConsumingIter<A> {}

impl<A: Clone> FusedIterator for ConsumingIter<A> {}

/// A fail-fast snapshot iterator over a mutable ordered set, in insertion
/// order (or reversed, from [`reverse_iter`][GenericSeqSetMut::reverse_iter]).
pub struct SnapshotIter<A, P>
where
    A: Clone,
    P: SharedPointerKind,
{
    it: FailFast<SeqIter<SeqElem<A>>, P>,
}

impl<A, P> Iterator for SnapshotIter<A, P>
where
    A: Clone,
    P: SharedPointerKind,
{
    type Item = A;

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|e| e.elem)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<A: Clone, P: SharedPointerKind> ExactSizeIterator for SnapshotIter<A, P> {}

impl<A: Clone, P: SharedPointerKind> FusedIterator for SnapshotIter<A, P> {}

// Iterator conversions

impl<A, RA, S, P> FromIterator<RA> for GenericSeqSet<A, S, P>
where
    A: Hash + Eq + Clone + From<RA>,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn from_iter<T>(i: T) -> Self
    where
        T: IntoIterator<Item = RA>,
    {
        let mut set: GenericSeqSetMut<A, S, P> = Default::default();
        for value in i {
            set.insert(From::from(value));
        }
        set.to_immutable()
    }
}

impl<A, RA, S, P> FromIterator<RA> for GenericSeqSetMut<A, S, P>
where
    A: Hash + Eq + Clone + From<RA>,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn from_iter<T>(i: T) -> Self
    where
        T: IntoIterator<Item = RA>,
    {
        let mut set = Self::default();
        for value in i {
            set.insert(From::from(value));
        }
        set
    }
}

impl<'a, A, S, P> IntoIterator for &'a GenericSeqSet<A, S, P>
where
    A: Hash + Eq,
    S: BuildHasher,
    P: SharedPointerKind,
{
    type Item = &'a A;
    type IntoIter = Iter<'a, A>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<A, S, P> IntoIterator for GenericSeqSet<A, S, P>
where
    A: Hash + Eq + Clone,
    S: BuildHasher,
    P: SharedPointerKind,
{
    type Item = A;
    type IntoIter = ConsumingIter<A>;

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

impl<A, S, P> IntoIterator for GenericSeqSetMut<A, S, P>
where
    A: Hash + Eq + Clone,
    S: BuildHasher,
    P: SharedPointerKind,
{
    type Item = A;
    type IntoIter = ConsumingIter<A>;

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

impl<A, S, const N: usize, P> From<[A; N]> for GenericSeqSet<A, S, P>
where
    A: Hash + Eq + Clone,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn from(arr: [A; N]) -> Self {
        IntoIterator::into_iter(arr).collect()
    }
}

impl<'a, A, S, P> From<&'a [A]> for GenericSeqSet<A, S, P>
where
    A: Hash + Eq + Clone,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn from(slice: &'a [A]) -> Self {
        slice.iter().cloned().collect()
    }
}

impl<A, S, P> From<Vec<A>> for GenericSeqSet<A, S, P>
where
    A: Hash + Eq + Clone,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn from(vec: Vec<A>) -> Self {
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
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use static_assertions::{assert_impl_all, assert_not_impl_any};
    use std::hash::BuildHasherDefault;

    assert_impl_all!(SeqSet<i32>: Send, Sync);
    assert_not_impl_any!(SeqSet<*const i32>: Send, Sync);
    assert_covariant!(SeqSet<T> in T);

    type LolSeqSetMut = GenericSeqSetMut<i16, BuildHasherDefault<LolHasher>, DefaultSharedPtr>;

    fn contents<A, S, P>(set: &GenericSeqSetMut<A, S, P>) -> Vec<A>
    where
        A: Hash + Eq + Clone,
        S: BuildHasher + Clone,
        P: SharedPointerKind,
    {
        set.iter().collect()
    }

    #[test]
    fn iterates_in_insertion_order() {
        let mut set: SeqSetMut<i32> = SeqSetMut::new();
        for i in [1, 2, 3, 4, 5] {
            assert!(set.insert(i));
        }
        set.insert_first(0);
        set.insert_last(6);
        assert_eq!(vec![0, 1, 2, 3, 4, 5, 6], contents(&set));
        assert_eq!(
            vec![6, 5, 4, 3, 2, 1, 0],
            set.reverse_iter().collect::<Vec<_>>()
        );
        assert_eq!(Some(&0), set.get_first());
        assert_eq!(Some(&6), set.get_last());
    }

    #[test]
    fn plain_insert_keeps_the_position_of_duplicates() {
        let mut set: SeqSetMut<&str> = SeqSetMut::new();
        set.insert("a");
        set.insert("b");
        set.insert("c");
        assert!(!set.insert("a"));
        assert_eq!(vec!["a", "b", "c"], contents(&set));
    }

    #[test]
    fn insert_last_moves_an_existing_element() {
        let mut set: SeqSetMut<&str> = SeqSetMut::new();
        for v in ["a", "b", "c"] {
            set.insert(v);
        }
        assert!(set.insert_last("a"));
        assert_eq!(vec!["b", "c", "a"], contents(&set));
        assert!(set.insert_first("c"));
        assert_eq!(vec!["c", "b", "a"], contents(&set));
    }

    #[test]
    fn moving_an_element_already_in_place_changes_nothing() {
        let mut set: SeqSetMut<&str> = SeqSetMut::new();
        for v in ["a", "b", "c"] {
            set.insert(v);
        }
        let it = set.iter();
        assert!(!set.insert_last("c"));
        assert!(!set.insert_first("a"));
        // no structural change, the outstanding iterator stays valid
        assert_eq!(vec!["a", "b", "c"], it.collect::<Vec<_>>());
    }

    #[test]
    fn pop_works_from_both_ends() {
        let mut set: SeqSetMut<i32> = (0..5).collect();
        assert_eq!(Some(0), set.pop_first());
        assert_eq!(Some(4), set.pop_last());
        assert_eq!(vec![1, 2, 3], contents(&set));
        set.clear();
        assert_eq!(None, set.pop_first());
        assert_eq!(None, set.pop_last());
    }

    #[test]
    fn immutable_ops_share_structure_on_no_ops() {
        let set: SeqSet<i32> = (0..10).collect();
        assert!(set.ptr_eq(&set.update(5)));
        assert!(set.ptr_eq(&set.without(&55)));
        assert!(set.ptr_eq(&set.update_last(9)));
        assert!(set.ptr_eq(&set.update_first(0)));
        assert!(!set.ptr_eq(&set.update_last(0)));
    }

    #[test]
    fn immutable_update_preserves_the_old_version() {
        let v1: SeqSet<i32> = (0..100).collect();
        let v2 = v1.update_first(99).update(100);
        assert_eq!(100, v1.len());
        assert_eq!(101, v2.len());
        assert_eq!(Some(&0), v1.get_first());
        assert_eq!(Some(&99), v2.get_first());
        assert_eq!((0..100).collect::<Vec<_>>(), v1.iter().cloned().collect::<Vec<_>>());
    }

    #[test]
    fn handoff_round_trips_preserve_order() {
        let set: SeqSet<i32> = (0..1000).collect();
        let mut m = set.to_mutable();
        assert_eq!(set, m.to_immutable());
        for i in 1000..1100 {
            m.insert(i);
        }
        let grown = m.to_immutable();
        assert_eq!((0..1100).collect::<Vec<_>>(), grown.iter().cloned().collect::<Vec<_>>());
        assert_eq!(999, *set.get_last().unwrap());
    }

    #[test]
    fn mutable_iterator_is_fail_fast() {
        let mut set: SeqSetMut<i32> = (0..100).collect();
        let mut it = set.iter();
        assert_eq!(Some(0), it.next());
        set.insert(100);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| it.next()));
        assert!(result.is_err());
    }

    #[test]
    fn reversed_view_writes_through() {
        let mut set: SeqSetMut<i32> = (0..3).collect();
        {
            let mut rev = set.reversed();
            assert_eq!(Some(&2), rev.get_first());
            assert_eq!(vec![2, 1, 0], rev.iter().collect::<Vec<_>>());
            rev.insert(-1); // appends in reverse order, so prepends underneath
            assert_eq!(Some(2), rev.pop_first());
        }
        assert_eq!(vec![-1, 0, 1], contents(&set));
    }

    #[test]
    fn middle_churn_triggers_renumbering_and_keeps_order() {
        let size = 20;
        let mut set: SeqSetMut<i32> = (0..size).collect();
        let mut model: Vec<i32> = (0..size).collect();
        for round in 0..500 {
            let victim = model[model.len() / 2];
            assert_eq!(Some(victim), set.remove(&victim));
            model.retain(|v| *v != victim);
            let fresh = size + round;
            assert!(set.insert(fresh));
            model.push(fresh);
            let (first, last) = set.counters();
            let extent = i64::from(last) - i64::from(first);
            assert!(
                extent <= 4 * set.len() as i64 + 1,
                "counters drifted: first={} last={} size={}",
                first,
                last,
                set.len()
            );
            assert_eq!(model, contents(&set));
        }
    }

    #[test]
    fn random_churn_matches_the_model() {
        let mut rng = SmallRng::seed_from_u64(0x5e9);
        let size = 1000;
        let mut set: SeqSetMut<i32> = (0..size).collect();
        let mut model: Vec<i32> = (0..size).collect();
        for round in 0..size {
            let victim = model[rng.gen_range(0..model.len())];
            set.remove(&victim);
            model.retain(|v| *v != victim);
            let fresh = size + round;
            set.insert_last(fresh);
            model.push(fresh);
            let (first, last) = set.counters();
            assert!(i64::from(last) - i64::from(first) <= 4 * set.len() as i64 + 1);
        }
        assert_eq!(model, contents(&set));
        assert_eq!(
            model.iter().rev().cloned().collect::<Vec<_>>(),
            set.reverse_iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn consuming_iteration_runs_in_order() {
        let set: SeqSet<i32> = (0..100).collect();
        assert_eq!((0..100).collect::<Vec<_>>(), set.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn equality_depends_on_the_order() {
        let forward: SeqSet<i32> = vec![1, 2, 3].into_iter().collect();
        let same: SeqSet<i32> = vec![1, 2, 3].into_iter().collect();
        let backward: SeqSet<i32> = vec![3, 2, 1].into_iter().collect();
        assert_eq!(forward, same);
        assert_ne!(forward, backward);
        // the plain variant considers the same contents equal either way
        let plain_forward: crate::HashSet<i32> = vec![1, 2, 3].into_iter().collect();
        let plain_backward: crate::HashSet<i32> = vec![3, 2, 1].into_iter().collect();
        assert_eq!(plain_forward, plain_backward);
    }

    #[test]
    fn bulk_operations_preserve_order() {
        let left: SeqSet<i32> = vec![3, 1, 2].into_iter().collect();
        let right: SeqSet<i32> = vec![5, 2, 4].into_iter().collect();

        let union = left.clone().union(right.clone());
        assert_eq!(vec![3, 1, 2, 5, 4], union.iter().cloned().collect::<Vec<_>>());

        let intersection = left.clone().intersection(right.clone());
        assert_eq!(vec![2], intersection.iter().cloned().collect::<Vec<_>>());

        let complement = left.clone().relative_complement(right);
        assert_eq!(vec![3, 1], complement.iter().cloned().collect::<Vec<_>>());

        assert!(left.clone().union(SeqSet::new()).ptr_eq(&left));
        assert!(left.clone().relative_complement(SeqSet::new()).ptr_eq(&left));
        assert!(left.clone().intersection(left.clone()).ptr_eq(&left));
        assert!(left.intersection(SeqSet::new()).is_empty());
    }

    #[test]
    fn without_first_and_last() {
        let set: SeqSet<i32> = (0..5).collect();
        let (first, rest) = set.without_first().unwrap();
        assert_eq!(0, first);
        assert_eq!(vec![1, 2, 3, 4], rest.iter().cloned().collect::<Vec<_>>());
        let (last, rest) = rest.without_last().unwrap();
        assert_eq!(4, last);
        assert_eq!(vec![1, 2, 3], rest.iter().cloned().collect::<Vec<_>>());
        assert_eq!(None, SeqSet::<i32>::new().without_first());
    }

    proptest! {
        #[test]
        fn order_matches_a_vec_model(
            ref ops in collection::vec((0u8..4, i16::ANY), 0..300)
        ) {
            let mut set: LolSeqSetMut = Default::default();
            let mut model: Vec<i16> = Vec::new();
            for (op, value) in ops {
                let value = *value;
                match op {
                    0 => {
                        if !model.contains(&value) {
                            model.push(value);
                        }
                        set.insert(value);
                    }
                    1 => {
                        model.retain(|v| *v != value);
                        model.push(value);
                        set.insert_last(value);
                    }
                    2 => {
                        model.retain(|v| *v != value);
                        model.insert(0, value);
                        set.insert_first(value);
                    }
                    _ => {
                        model.retain(|v| *v != value);
                        set.remove(&value);
                    }
                }
                assert_eq!(model.len(), set.len());
            }
            assert_eq!(model, contents(&set));
            let (first, last) = set.counters();
            assert!(i64::from(last) - i64::from(first) <= 4 * set.len() as i64 + 1);
        }

        #[test]
        fn immutable_and_mutable_agree(ref values in collection::vec(i16::ANY, 0..200)) {
            let mut immutable: GenericSeqSet<i16, BuildHasherDefault<LolHasher>, DefaultSharedPtr> =
                Default::default();
            let mut mutable: LolSeqSetMut = Default::default();
            for v in values {
                immutable = immutable.update(*v);
                mutable.insert(*v);
            }
            assert_eq!(immutable, mutable.to_immutable());
            let forward: Vec<i16> = immutable.iter().cloned().collect();
            let backward: Vec<i16> = immutable.reverse_iter().cloned().collect();
            assert_eq!(forward.iter().rev().cloned().collect::<Vec<_>>(), backward);
        }
    }
}
