// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! An unordered set.
//!
//! A hash set backed by a [CHAMP trie][1], in two flavors that hand off to
//! each other in O(1): [`GenericHashSet`], whose operations return new sets
//! sharing structure with the old one, and [`GenericHashSetMut`], a
//! single-owner view that edits its exclusively owned trie nodes in place.
//!
//! Single-element operations are O(log<sub>32</sub> n), which is close
//! enough to O(1) for any practical size. Iteration order is arbitrary but
//! stable for a given set; see the `seqset` module for the variant that
//! iterates in insertion order.
//!
//! Values have a predictable order based on the hasher being used. Unless
//! otherwise specified, this will be the standard
//! [`RandomState`][std::collections::hash_map::RandomState] hasher.
//!
//! [1]: https://michael.steindorfer.name/publications/phd-thesis-efficient-immutable-collections
//! [std::collections::hash_map::RandomState]: https://doc.rust-lang.org/std/collections/hash_map/struct.RandomState.html

use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::collections::{self, BTreeSet};
use std::fmt::{Debug, Error, Formatter};
use std::hash::{BuildHasher, Hash};
use std::iter::{FromIterator, FusedIterator, Sum};
use std::ops::{Add, Deref, Mul};

use archery::{SharedPointer, SharedPointerKind};

use crate::fail_fast::{FailFast, ModCount};
use crate::nodes::champ::{
    hash_key, ChangeEvent, Drain as NodeDrain, HashValue, Iter as NodeIter, Node, OwnerToken,
};
use crate::shared_ptr::DefaultSharedPtr;

/// Construct a hash set from a sequence of values.
///
/// # Examples
///
/// ```
/// # #[macro_use] extern crate champl;
/// # use champl::HashSet;
/// # fn main() {
/// assert_eq!(
///   hashset![1, 2, 3],
///   HashSet::from(vec![1, 2, 3])
/// );
/// # }
/// ```
#[macro_export]
macro_rules! hashset {
    () => { $crate::hashset::HashSet::new() };

    ( $($x:expr),* ) => {{
        let mut l = $crate::hashset::HashSetMut::new();
        $(
            l.insert($x);
        )*
        l.to_immutable()
    }};

    ( $($x:expr ,)* ) => {{
        let mut l = $crate::hashset::HashSetMut::new();
        $(
            l.insert($x);
        )*
        l.to_immutable()
    }};
}

/// Type alias for [`GenericHashSet`] with the default hasher and pointer
/// kind.
///
/// [GenericHashSet]: ./struct.GenericHashSet.html
pub type HashSet<A> = GenericHashSet<A, RandomState, DefaultSharedPtr>;

/// Type alias for [`GenericHashSetMut`] with the default hasher and pointer
/// kind.
///
/// [GenericHashSetMut]: ./struct.GenericHashSetMut.html
pub type HashSetMut<A> = GenericHashSetMut<A, RandomState, DefaultSharedPtr>;

/// An unordered set whose update operations return a new set.
///
/// Every returned set shares all untouched trie nodes with its ancestor, so
/// keeping many versions around costs memory proportional to the changes
/// between them, not to their sizes. An operation that has no effect
/// returns a set sharing the root wholesale, `ptr_eq` with the receiver.
///
/// Call [`to_mutable`][GenericHashSet::to_mutable] for an O(1) conversion
/// into the mutable form when batching many updates.
pub struct GenericHashSet<A, S, P: SharedPointerKind> {
    hasher: S,
    root: Option<SharedPointer<Node<Value<A>, P>, P>>,
    size: usize,
}

/// An unordered set that is updated in place.
///
/// The view owns an [ownership token]; trie nodes created under the current
/// token are edited directly, everything else is copied on first touch.
/// [`to_immutable`][GenericHashSetMut::to_immutable] publishes the current
/// contents in O(1) by dropping the token, which forces later writes
/// through this view back onto fresh copies.
///
/// The view is single-owner and not thread-safe; share the immutable form
/// instead.
///
/// [ownership token]: ../index.html#ownership
pub struct GenericHashSetMut<A, S, P: SharedPointerKind> {
    hasher: S,
    root: Option<SharedPointer<Node<Value<A>, P>, P>>,
    size: usize,
    mutator: Option<OwnerToken<P>>,
    mod_count: ModCount<P>,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
struct Value<A>(A);

impl<A> Deref for Value<A> {
    type Target = A;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// FIXME lacking specialisation, we can't simply implement `HashValue`
// for `A`, we have to use the `Value<A>` indirection.
impl<A> HashValue for Value<A>
where
    A: Eq,
{
    type Key = A;

    fn extract_key(&self) -> &Self::Key {
        &self.0
    }
}

impl<A, S, P> GenericHashSet<A, S, P>
where
    A: Hash + Eq + Clone,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    /// Construct a set with a single value.
    ///
    /// # Examples
    ///
    /// ```
    /// # use champl::hashset::HashSet;
    /// let set = HashSet::unit(123);
    /// assert!(set.contains(&123));
    /// ```
    #[inline]
    #[must_use]
    pub fn unit(a: A) -> Self {
        GenericHashSet::new().update(a)
    }
}

impl<A, S, P: SharedPointerKind> GenericHashSet<A, S, P> {
    /// Construct an empty set.
    #[must_use]
    pub fn new() -> Self
    where
        S: Default,
    {
        Self::default()
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
    ///
    /// # Examples
    ///
    /// ```
    /// # #[macro_use] extern crate champl;
    /// # fn main() {
    /// assert_eq!(3, hashset![1, 2, 3].len());
    /// # }
    /// ```
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Test whether two sets refer to the same content in memory.
    ///
    /// This is true if the two sides are references to the same set, or if
    /// the two sets refer to the same root node. In particular, an update
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

    /// Construct an empty set using the provided hasher.
    #[inline]
    #[must_use]
    pub fn with_hasher(hasher: S) -> Self {
        GenericHashSet {
            hasher,
            root: None,
            size: 0,
        }
    }

    /// Get a reference to the set's [`BuildHasher`][BuildHasher].
    ///
    /// [BuildHasher]: https://doc.rust-lang.org/std/hash/trait.BuildHasher.html
    #[must_use]
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Construct an empty set using the same hasher as the current set.
    #[inline]
    #[must_use]
    pub fn new_from<A2>(&self) -> GenericHashSet<A2, S, P>
    where
        A2: Hash + Eq + Clone,
        S: Clone,
    {
        GenericHashSet {
            hasher: self.hasher.clone(),
            root: None,
            size: 0,
        }
    }

    /// Discard all elements from the set.
    pub fn clear(&mut self) {
        self.root = None;
        self.size = 0;
    }

    /// Get an iterator over the values in a set, in arbitrary order.
    ///
    /// The order is consistent between sets using the same hasher, but no
    /// other ordering guarantee is offered.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, A, P> {
        Iter {
            it: NodeIter::new(self.root.as_deref(), self.size),
        }
    }
}

impl<A, S, P> GenericHashSet<A, S, P>
where
    A: Hash + Eq,
    S: BuildHasher,
    P: SharedPointerKind,
{
    fn test_eq<S2: BuildHasher, P2: SharedPointerKind>(
        &self,
        other: &GenericHashSet<A, S2, P2>,
    ) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|value| other.contains(value))
    }

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

impl<A, S, P> GenericHashSet<A, S, P>
where
    A: Hash + Eq + Clone,
    S: BuildHasher + Clone,
    P: SharedPointerKind,
{
    /// Construct a new set from the current set with the given value added.
    ///
    /// If the value is already present, the result is `ptr_eq` with this
    /// set.
    ///
    /// Time: O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// # #[macro_use] extern crate champl;
    /// # fn main() {
    /// let set = hashset![123];
    /// assert_eq!(
    ///   set.update(456),
    ///   hashset![123, 456]
    /// );
    /// # }
    /// ```
    #[must_use]
    pub fn update(&self, a: A) -> Self {
        let hash = hash_key(&self.hasher, &a);
        let mut details = ChangeEvent::new();
        let root = match &self.root {
            Some(root) => {
                let mut root = root.clone();
                let hasher = &self.hasher;
                Node::update(
                    &mut root,
                    None,
                    Value(a),
                    hash,
                    0,
                    &mut details,
                    &|_, _| None,
                    &|v: &Value<A>| hash_key(hasher, &v.0),
                );
                root
            }
            None => {
                details.inserted();
                SharedPointer::new(Node::unit(None, hash, Value(a)))
            }
        };
        if !details.modified {
            return self.clone();
        }
        GenericHashSet {
            hasher: self.hasher.clone(),
            root: Some(root),
            size: self.size + 1,
        }
    }

    /// Construct a new set with the given value removed if it's in the set.
    ///
    /// If the value is absent, the result is `ptr_eq` with this set.
    ///
    /// Time: O(log n)
    #[must_use]
    pub fn without<BA>(&self, a: &BA) -> Self
    where
        BA: Hash + Eq + ?Sized,
        A: Borrow<BA>,
    {
        let Some(root) = &self.root else {
            return self.clone();
        };
        let mut new_root = root.clone();
        let mut details = ChangeEvent::new();
        Node::remove(&mut new_root, None, a, hash_key(&self.hasher, a), 0, &mut details);
        if !details.modified {
            return self.clone();
        }
        let size = self.size - 1;
        GenericHashSet {
            hasher: self.hasher.clone(),
            root: (size > 0).then_some(new_root),
            size,
        }
    }

    /// Convert this set into a mutable view of the same contents.
    ///
    /// Time: O(1). The trie is shared; the mutable view copies nodes as it
    /// first writes to them.
    #[must_use]
    pub fn to_mutable(&self) -> GenericHashSetMut<A, S, P> {
        GenericHashSetMut {
            hasher: self.hasher.clone(),
            root: self.root.clone(),
            size: self.size,
            mutator: None,
            mod_count: ModCount::new(),
        }
    }

    /// Construct the union of two sets.
    ///
    /// The union with an empty set, or with itself, is `ptr_eq` with this
    /// set.
    ///
    /// Time: O(n log n)
    ///
    /// # Examples
    ///
    /// ```
    /// # #[macro_use] extern crate champl;
    /// # fn main() {
    /// let set1 = hashset!{1, 2};
    /// let set2 = hashset!{2, 3};
    /// let expected = hashset!{1, 2, 3};
    /// assert_eq!(expected, set1.union(set2));
    /// # }
    /// ```
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        if other.is_empty() || self.ptr_eq(&other) {
            return self;
        }
        if self.is_empty() {
            return other;
        }
        let (to_mutate, to_consume) = if self.len() >= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        let mut out = to_mutate.to_mutable();
        for value in to_consume {
            out.insert(value);
        }
        out.to_immutable()
    }

    /// Construct the union of multiple sets.
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

    /// Construct the intersection of two sets.
    ///
    /// The intersection with an empty set is the canonical empty set; the
    /// intersection of a set with itself is `ptr_eq` with this set.
    ///
    /// Time: O(n log n)
    ///
    /// # Examples
    ///
    /// ```
    /// # #[macro_use] extern crate champl;
    /// # fn main() {
    /// let set1 = hashset!{1, 2};
    /// let set2 = hashset!{2, 3};
    /// let expected = hashset!{2};
    /// assert_eq!(expected, set1.intersection(set2));
    /// # }
    /// ```
    #[must_use]
    pub fn intersection(self, other: Self) -> Self {
        if self.ptr_eq(&other) {
            return self;
        }
        if self.is_empty() || other.is_empty() {
            return self.new_from();
        }
        let mut out = self.new_from().to_mutable();
        for value in other {
            if self.contains(&value) {
                out.insert(value);
            }
        }
        out.to_immutable()
    }

    /// Construct the relative complement between two sets, that is the set
    /// of values in `self` that do not occur in `other`.
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
}

impl<A, S, P: SharedPointerKind> GenericHashSetMut<A, S, P> {
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
        GenericHashSetMut {
            hasher,
            root: None,
            size: 0,
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
    }

    /// The current ownership token, allocated on the first write after
    /// construction or publication.
    fn owner(&mut self) -> OwnerToken<P> {
        if self.mutator.is_none() {
            self.mutator = Some(OwnerToken::new());
        }
        self.mutator.as_ref().unwrap().clone()
    }
}

impl<A, S, P> GenericHashSetMut<A, S, P>
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

impl<A, S, P> GenericHashSetMut<A, S, P>
where
    A: Hash + Eq + Clone,
    S: BuildHasher + Clone,
    P: SharedPointerKind,
{
    /// Insert a value into a set.
    ///
    /// Returns true if the value was not already present. An insert of a
    /// value that is already in the set keeps the stored element and
    /// changes nothing.
    ///
    /// Time: O(log n)
    pub fn insert(&mut self, a: A) -> bool {
        let token = self.owner();
        let hash = hash_key(&self.hasher, &a);
        let mut details = ChangeEvent::new();
        match &mut self.root {
            Some(root) => {
                let hasher = &self.hasher;
                Node::update(
                    root,
                    Some(&token),
                    Value(a),
                    hash,
                    0,
                    &mut details,
                    &|_, _| None,
                    &|v: &Value<A>| hash_key(hasher, &v.0),
                );
            }
            None => {
                details.inserted();
                self.root = Some(SharedPointer::new(Node::unit(Some(token), hash, Value(a))));
            }
        }
        if details.modified {
            self.size += 1;
            self.mod_count.bump();
        }
        details.modified
    }

    /// Remove a value from a set if it exists, returning it.
    ///
    /// Time: O(log n)
    pub fn remove<BA>(&mut self, a: &BA) -> Option<A>
    where
        BA: Hash + Eq + ?Sized,
        A: Borrow<BA>,
    {
        self.root.as_ref()?;
        let token = self.owner();
        let hash = hash_key(&self.hasher, a);
        let mut details = ChangeEvent::new();
        let root = self.root.as_mut().unwrap();
        Node::remove(root, Some(&token), a, hash, 0, &mut details);
        if !details.modified {
            return None;
        }
        self.size -= 1;
        self.mod_count.bump();
        if self.size == 0 {
            self.root = None;
        }
        details.old.map(|v| v.0)
    }

    /// Publish the current contents as an immutable set.
    ///
    /// Time: O(1). This view stays usable but gives up its ownership token,
    /// so its next writes copy the nodes they touch instead of editing them
    /// under the feet of the published set.
    #[must_use]
    pub fn to_immutable(&mut self) -> GenericHashSet<A, S, P> {
        self.mutator = None;
        GenericHashSet {
            hasher: self.hasher.clone(),
            root: self.root.clone(),
            size: self.size,
        }
    }

    /// Get an iterator over the values of the set, in arbitrary order.
    ///
    /// The iterator works on a snapshot and yields values by clone. It is
    /// fail-fast: structurally modifying this view while the iterator is
    /// alive makes the iterator's next `next` call panic.
    ///
    /// Time: O(n)
    #[must_use]
    pub fn iter(&self) -> SnapshotIter<A, P> {
        SnapshotIter {
            it: FailFast::new(
                NodeDrain::new(self.root.clone(), self.size),
                &self.mod_count,
            ),
        }
    }
}

// Core traits

impl<A, S, P: SharedPointerKind> Clone for GenericHashSet<A, S, P>
where
    S: Clone,
{
    /// Clone a set.
    ///
    /// Time: O(1)
    #[inline]
    fn clone(&self) -> Self {
        GenericHashSet {
            hasher: self.hasher.clone(),
            root: self.root.clone(),
            size: self.size,
        }
    }
}

impl<A, S1, P1, S2, P2> PartialEq<GenericHashSet<A, S2, P2>> for GenericHashSet<A, S1, P1>
where
    A: Hash + Eq,
    S1: BuildHasher,
    S2: BuildHasher,
    P1: SharedPointerKind,
    P2: SharedPointerKind,
{
    fn eq(&self, other: &GenericHashSet<A, S2, P2>) -> bool {
        self.test_eq(other)
    }
}

impl<A, S, P> Eq for GenericHashSet<A, S, P>
where
    A: Hash + Eq,
    S: BuildHasher,
    P: SharedPointerKind,
{
}

impl<A, S, P> Default for GenericHashSet<A, S, P>
where
    S: Default,
    P: SharedPointerKind,
{
    fn default() -> Self {
        GenericHashSet {
            hasher: Default::default(),
            root: None,
            size: 0,
        }
    }
}

impl<A, S, P> Default for GenericHashSetMut<A, S, P>
where
    S: Default,
    P: SharedPointerKind,
{
    fn default() -> Self {
        GenericHashSetMut {
            hasher: Default::default(),
            root: None,
            size: 0,
            mutator: None,
            mod_count: ModCount::new(),
        }
    }
}

impl<A, S, P> Add for GenericHashSet<A, S, P>
where
    A: Hash + Eq + Clone,
    S: BuildHasher + Clone,
    P: SharedPointerKind,
{
    type Output = GenericHashSet<A, S, P>;

    fn add(self, other: Self) -> Self::Output {
        self.union(other)
    }
}

impl<A, S, P> Mul for GenericHashSet<A, S, P>
where
    A: Hash + Eq + Clone,
    S: BuildHasher + Clone,
    P: SharedPointerKind,
{
    type Output = GenericHashSet<A, S, P>;

    fn mul(self, other: Self) -> Self::Output {
        self.intersection(other)
    }
}

impl<A, S, P: SharedPointerKind> Sum for GenericHashSet<A, S, P>
where
    A: Hash + Eq + Clone,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn sum<I>(it: I) -> Self
    where
        I: Iterator<Item = Self>,
    {
        it.fold(Self::default(), Self::union)
    }
}

impl<A, S, R, P: SharedPointerKind> Extend<R> for GenericHashSetMut<A, S, P>
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

impl<A, S, P> Debug for GenericHashSet<A, S, P>
where
    A: Hash + Eq + Debug,
    S: BuildHasher,
    P: SharedPointerKind,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<A, S, P> Debug for GenericHashSetMut<A, S, P>
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

/// A borrowing iterator over the elements of an immutable set.
pub struct Iter<'a, A, P: SharedPointerKind> {
    it: NodeIter<'a, Value<A>, P>,
}

// We impl Clone instead of deriving it, because we want Clone even if A isn't.
impl<'a, A, P: SharedPointerKind> Clone for Iter<'a, A, P> {
    fn clone(&self) -> Self {
        Iter {
            it: self.it.clone(),
        }
    }
}

impl<'a, A, P> Iterator for Iter<'a, A, P>
where
    A: 'a,
    P: SharedPointerKind,
{
    type Item = &'a A;

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|v| &v.0)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<'a, A, P: SharedPointerKind> ExactSizeIterator for Iter<'a, A, P> {}

impl<'a, A, P: SharedPointerKind> FusedIterator for Iter<'a, A, P> {}

/// A consuming iterator over the elements of a set.
pub struct ConsumingIter<A, P>
where
    A: Clone,
    P: SharedPointerKind,
{
    it: NodeDrain<Value<A>, P>,
}

impl<A, P> Iterator for ConsumingIter<A, P>
where
    A: Clone,
    P: SharedPointerKind,
{
    type Item = A;

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|v| v.0)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<A: Clone, P: SharedPointerKind> ExactSizeIterator for ConsumingIter<A, P> {}

impl<A: Clone, P: SharedPointerKind> FusedIterator for ConsumingIter<A, P> {}

/// A fail-fast snapshot iterator over the elements of a mutable set.
pub struct SnapshotIter<A, P>
where
    A: Clone,
    P: SharedPointerKind,
{
    it: FailFast<NodeDrain<Value<A>, P>, P>,
}

impl<A, P> Iterator for SnapshotIter<A, P>
where
    A: Clone,
    P: SharedPointerKind,
{
    type Item = A;

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|v| v.0)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<A: Clone, P: SharedPointerKind> ExactSizeIterator for SnapshotIter<A, P> {}

impl<A: Clone, P: SharedPointerKind> FusedIterator for SnapshotIter<A, P> {}

// Iterator conversions

impl<A, RA, S, P> FromIterator<RA> for GenericHashSet<A, S, P>
where
    A: Hash + Eq + Clone + From<RA>,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn from_iter<T>(i: T) -> Self
    where
        T: IntoIterator<Item = RA>,
    {
        let mut set: GenericHashSetMut<A, S, P> = Default::default();
        for value in i {
            set.insert(From::from(value));
        }
        set.to_immutable()
    }
}

impl<A, RA, S, P> FromIterator<RA> for GenericHashSetMut<A, S, P>
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

impl<'a, A, S, P> IntoIterator for &'a GenericHashSet<A, S, P>
where
    A: Hash + Eq,
    S: BuildHasher,
    P: SharedPointerKind,
{
    type Item = &'a A;
    type IntoIter = Iter<'a, A, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<A, S, P> IntoIterator for GenericHashSet<A, S, P>
where
    A: Hash + Eq + Clone,
    S: BuildHasher,
    P: SharedPointerKind,
{
    type Item = A;
    type IntoIter = ConsumingIter<Self::Item, P>;

    fn into_iter(self) -> Self::IntoIter {
        ConsumingIter {
            it: NodeDrain::new(self.root, self.size),
        }
    }
}

impl<A, S, P> IntoIterator for GenericHashSetMut<A, S, P>
where
    A: Hash + Eq + Clone,
    S: BuildHasher,
    P: SharedPointerKind,
{
    type Item = A;
    type IntoIter = ConsumingIter<Self::Item, P>;

    fn into_iter(self) -> Self::IntoIter {
        ConsumingIter {
            it: NodeDrain::new(self.root, self.size),
        }
    }
}

// Conversions

impl<A, S, const N: usize, P> From<[A; N]> for GenericHashSet<A, S, P>
where
    A: Hash + Eq + Clone,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn from(arr: [A; N]) -> Self {
        IntoIterator::into_iter(arr).collect()
    }
}

impl<'a, A, S, P> From<&'a [A]> for GenericHashSet<A, S, P>
where
    A: Hash + Eq + Clone,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn from(slice: &'a [A]) -> Self {
        slice.iter().cloned().collect()
    }
}

impl<A, S, P> From<Vec<A>> for GenericHashSet<A, S, P>
where
    A: Hash + Eq + Clone,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn from(vec: Vec<A>) -> Self {
        vec.into_iter().collect()
    }
}

impl<A, S, P> From<&Vec<A>> for GenericHashSet<A, S, P>
where
    A: Hash + Eq + Clone,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn from(vec: &Vec<A>) -> Self {
        vec.iter().cloned().collect()
    }
}

impl<A, S, P> From<collections::HashSet<A>> for GenericHashSet<A, S, P>
where
    A: Eq + Hash + Clone,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn from(hash_set: collections::HashSet<A>) -> Self {
        hash_set.into_iter().collect()
    }
}

impl<A, S, P> From<&collections::HashSet<A>> for GenericHashSet<A, S, P>
where
    A: Eq + Hash + Clone,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn from(hash_set: &collections::HashSet<A>) -> Self {
        hash_set.iter().cloned().collect()
    }
}

impl<A, S, P> From<&BTreeSet<A>> for GenericHashSet<A, S, P>
where
    A: Hash + Eq + Clone,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn from(btree_set: &BTreeSet<A>) -> Self {
        btree_set.iter().cloned().collect()
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

    assert_impl_all!(HashSet<i32>: Send, Sync);
    assert_not_impl_any!(HashSet<*const i32>: Send, Sync);
    assert_covariant!(HashSet<T> in T);

    #[test]
    fn insert_failing() {
        let mut set: GenericHashSetMut<i16, BuildHasherDefault<LolHasher>, DefaultSharedPtr> =
            Default::default();
        set.insert(14658);
        assert_eq!(1, set.len());
        set.insert(-19198);
        assert_eq!(2, set.len());
    }

    #[test]
    fn match_strings_with_string_slices() {
        let set: HashSet<String> = vec!["foo".to_string(), "bar".to_string()]
            .into_iter()
            .collect();
        let set = set.without("bar");
        assert!(!set.contains("bar"));
        assert!(set.contains("foo"));
    }

    #[test]
    fn macro_allows_trailing_comma() {
        let set1 = hashset! {"foo", "bar"};
        let set2 = hashset! {
            "foo",
            "bar",
        };
        assert_eq!(set1, set2);
    }

    #[test]
    fn no_op_update_returns_the_same_instance() {
        let set = hashset![1, 2, 3];
        assert!(set.ptr_eq(&set.update(2)));
        assert!(set.ptr_eq(&set.without(&4)));
        assert!(set.clone().intersection(set.clone()).ptr_eq(&set));
        assert!(set.clone().union(HashSet::new()).ptr_eq(&set));
        assert!(set
            .clone()
            .intersection(HashSet::new())
            .ptr_eq(&HashSet::new()));
    }

    #[test]
    fn update_and_without_round_trip() {
        let set = HashSet::unit(1).update(2).update(3);
        assert_eq!(3, set.len());
        let smaller = set.without(&2);
        assert_eq!(2, smaller.len());
        assert!(!smaller.contains(&2));
        assert!(set.contains(&2));
        assert!(smaller.without(&1).without(&3).is_empty());
    }

    #[test]
    fn published_set_survives_later_mutation() {
        let mut m: HashSetMut<usize> = (0..10_000usize).collect();
        let published = m.to_immutable();
        for i in 0..5_000 {
            m.remove(&i);
        }
        assert_eq!(10_000, published.len());
        assert_eq!(5_000, m.len());
        for i in 0..10_000 {
            assert!(published.contains(&i));
            assert_eq!(i >= 5_000, m.contains(&i));
        }
    }

    #[test]
    fn handoff_round_trips() {
        let set: HashSet<i32> = (0..1000).collect();
        let mut m = set.to_mutable();
        assert_eq!(set, m.to_immutable());

        let mut m = set.to_mutable();
        for i in 1000..1100 {
            m.insert(i);
        }
        let grown = m.to_immutable();
        let expected: HashSet<i32> = (0..1100).collect();
        assert_eq!(expected, grown);
        assert_eq!(1000, set.len());
    }

    #[test]
    fn mutable_iterator_is_fail_fast() {
        let mut set: HashSetMut<i32> = (0..100).collect();
        let mut it = set.iter();
        assert!(it.next().is_some());
        set.insert(100);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| it.next()));
        assert!(result.is_err());
    }

    #[test]
    fn snapshot_iterator_ignores_later_writes() {
        let mut set: HashSetMut<i32> = (0..100).collect();
        let it = set.iter();
        // a non-structural no-op keeps the iterator valid
        assert!(!set.insert(5));
        let seen: Vec<i32> = it.collect();
        assert_eq!(100, seen.len());
    }

    #[test]
    fn remove_top_level_collisions() {
        let pairs = vec![9, 2569, 27145];
        let mut set: GenericHashSetMut<i16, BuildHasherDefault<LolHasher>, DefaultSharedPtr> =
            Default::default();
        for k in pairs.clone() {
            set.insert(k);
        }
        assert_eq!(pairs.len(), set.len());
        for k in pairs {
            let l = set.len();
            assert!(set.contains(&k));
            assert_eq!(Some(k), set.remove(&k));
            assert!(!set.contains(&k));
            assert_eq!(l - 1, set.len());
        }
    }

    #[test]
    fn large_set() {
        let mut set: HashSetMut<i32> = HashSetMut::new();
        let size = 32_769;
        for i in 0..size {
            set.insert(i);
        }
        assert_eq!(size as usize, set.len());
        let set = set.to_immutable();
        for i in 0..size {
            assert!(set.contains(&i));
        }
    }

    proptest! {
        #[test]
        fn update_and_length(ref s in collection::hash_set(i16::ANY, 0..1000)) {
            let mut set: GenericHashSet<i16, BuildHasherDefault<LolHasher>, DefaultSharedPtr> =
                Default::default();
            for (index, value) in s.iter().enumerate() {
                set = set.update(*value);
                assert!(set.contains(value));
                assert_eq!(index + 1, set.len());
            }
        }

        #[test]
        fn insert_and_remove_against_std(ref ops in collection::vec((::proptest::bool::ANY, i16::ANY), 0..400)) {
            let mut set: GenericHashSetMut<i16, BuildHasherDefault<LolHasher>, DefaultSharedPtr> =
                Default::default();
            let mut reference: collections::HashSet<i16> = collections::HashSet::new();
            for (grow, value) in ops {
                if *grow {
                    assert_eq!(reference.insert(*value), set.insert(*value));
                } else {
                    assert_eq!(reference.remove(value), set.remove(value).is_some());
                }
                assert_eq!(reference.len(), set.len());
            }
            for value in &reference {
                assert!(set.contains(value));
            }
        }

        #[test]
        fn iterate_over(ref s in collection::hash_set(i16::ANY, 0..1000)) {
            let set: HashSet<i16> = s.iter().copied().collect();
            assert_eq!(s.len(), set.iter().count());
        }

        #[test]
        fn consume(ref s in collection::hash_set(i16::ANY, 0..1000)) {
            let set: HashSet<i16> = s.iter().copied().collect();
            let drained: collections::HashSet<i16> = set.into_iter().collect();
            assert_eq!(s.len(), drained.len());
            assert_eq!(*s, drained);
        }

        #[test]
        fn equality_is_order_independent(ref s in collection::hash_set(i16::ANY, 0..300)) {
            let forward: HashSet<i16> = s.iter().copied().collect();
            let mut shuffled: Vec<i16> = s.iter().copied().collect();
            shuffled.reverse();
            let backward: HashSet<i16> = shuffled.into_iter().collect();
            assert_eq!(forward, backward);
        }

        #[test]
        fn exact_size_iterator(ref s in collection::hash_set(i16::ANY, 0..100)) {
            let set: HashSet<i16> = s.iter().copied().collect();
            let mut should_be = set.len();
            let mut it = set.iter();
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
        fn union_contains_both_sides(
            ref s1 in collection::hash_set(i16::ANY, 0..100),
            ref s2 in collection::hash_set(i16::ANY, 0..100)
        ) {
            let set1: HashSet<i16> = s1.iter().copied().collect();
            let set2: HashSet<i16> = s2.iter().copied().collect();
            let union = set1.union(set2);
            for v in s1.iter().chain(s2.iter()) {
                assert!(union.contains(v));
            }
            assert!(union.iter().all(|v| s1.contains(v) || s2.contains(v)));
        }

        #[test]
        fn handoff_equals_immutable_ops(ref values in collection::vec(i16::ANY, 0..200)) {
            let mut immutable: GenericHashSet<i16, BuildHasherDefault<LolHasher>, DefaultSharedPtr> =
                Default::default();
            let mut mutable = immutable.to_mutable();
            for v in values {
                immutable = immutable.update(*v);
                mutable.insert(*v);
            }
            assert_eq!(immutable, mutable.to_immutable());
        }
    }
}
