// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Nodes of a Compressed Hash-Array Mapped Prefix-tree (CHAMP), and the
//! single update/remove/find engine that every collection in this crate
//! drives.
//!
//! The path to a payload is determined by its hash code, consumed
//! [`HASH_SHIFT`] bits per level. A [`BitmapNode`] stores only its occupied
//! slots: `data_map` marks slots holding an inline payload, `node_map`
//! marks slots holding a child pointer, and the `mixed` array stores the
//! payloads at the front (in ascending bit-position order) and the children
//! at the back (in descending bit-position order). A payload lives in the
//! highest node at which its hash prefix is unique; payloads whose full
//! hashes collide end up in a [`CollisionNode`] below the deepest bitmap
//! level.
//!
//! Writes are copy-path-on-write: only the nodes along the touched path are
//! replaced, everything else is shared with the previous version. A mutable
//! view registers an [`OwnerToken`] in the nodes it creates; a node whose
//! token is identity-equal to the caller's is edited in place instead.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::iter::FusedIterator;
use std::mem;
use std::slice::Iter as SliceIter;

use archery::{SharedPointer, SharedPointerKind};
use bitmaps::{Bitmap, Bits, BitsImpl};
use imbl_sized_chunks::inline_array::InlineArray;

use crate::config::HASH_LEVEL_SIZE as HASH_SHIFT;

pub(crate) type HashBits = <BitsImpl<HASH_WIDTH> as Bits>::Store; // a uint of HASH_WIDTH bits

pub(crate) const HASH_WIDTH: usize = 2_usize.pow(HASH_SHIFT as u32);
const HASH_MASK: HashBits = (HASH_WIDTH - 1) as HashBits;

/// Bitmap levels until the hash bits are exhausted, plus one collision level.
pub(crate) const MAX_DEPTH: usize = HASH_WIDTH.div_ceil(HASH_SHIFT) + 1;

const _: () = {
    // The partition width must make the branching factor equal to the hash
    // width, so that one `HashBits` word holds one bit per child slot.
    assert!(HASH_SHIFT == 5, "HASH_LEVEL_SIZE must be 5");
};

#[inline]
pub(crate) fn hash_key<K: Hash + ?Sized, S: BuildHasher>(bh: &S, key: &K) -> HashBits {
    bh.hash_one(key) as HashBits
}

#[inline]
fn mask(hash: HashBits, shift: usize) -> usize {
    ((hash >> shift) & HASH_MASK) as usize
}

#[inline]
fn bitpos(mask: usize) -> HashBits {
    1 << mask
}

/// A trie payload: something with a hashable, equality-bearing key.
///
/// For sets the key is the element itself; for maps it is the pair's key.
/// The insertion-ordered variants project their sequence number away here,
/// which is what keeps sequence numbers out of hashing and equality.
pub trait HashValue {
    type Key: Eq;

    fn extract_key(&self) -> &Self::Key;
}

/// The ownership token of one mutable view.
///
/// Only the token's allocation identity matters, never its contents: a node
/// may be edited in place iff it carries a token that is pointer-equal to
/// the caller's. Nodes created by immutable operations carry none, so they
/// are copied before the first write no matter who asks.
pub(crate) struct OwnerToken<P: SharedPointerKind>(SharedPointer<(), P>);

impl<P: SharedPointerKind> OwnerToken<P> {
    pub(crate) fn new() -> Self {
        OwnerToken(SharedPointer::new(()))
    }
}

impl<P: SharedPointerKind> Clone for OwnerToken<P> {
    fn clone(&self) -> Self {
        OwnerToken(self.0.clone())
    }
}

impl<P: SharedPointerKind> PartialEq for OwnerToken<P> {
    fn eq(&self, other: &Self) -> bool {
        SharedPointer::ptr_eq(&self.0, &other.0)
    }
}

impl<P: SharedPointerKind> fmt::Debug for OwnerToken<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnerToken({:p})", &*self.0)
    }
}

#[inline]
fn editable<P: SharedPointerKind>(
    node: Option<&OwnerToken<P>>,
    mutator: Option<&OwnerToken<P>>,
) -> bool {
    match (node, mutator) {
        (Some(node), Some(mutator)) => node == mutator,
        _ => false,
    }
}

/// What a single update or removal did, reported back to the owning view.
#[derive(Debug)]
pub(crate) struct ChangeEvent<A> {
    /// The payload set of the trie changed.
    pub(crate) modified: bool,
    /// A payload with a matching key was already present.
    pub(crate) replaced: bool,
    /// The prior payload, where one was replaced, kept or removed.
    pub(crate) old: Option<A>,
}

impl<A> ChangeEvent<A> {
    pub(crate) fn new() -> Self {
        ChangeEvent {
            modified: false,
            replaced: false,
            old: None,
        }
    }

    pub(crate) fn inserted(&mut self) {
        self.modified = true;
    }

    fn kept(&mut self, old: A) {
        self.replaced = true;
        self.old = Some(old);
    }

    fn swapped(&mut self, old: A) {
        self.modified = true;
        self.replaced = true;
        self.old = Some(old);
    }

    fn removed(&mut self, old: A) {
        self.modified = true;
        self.old = Some(old);
    }
}

/// One slot of the `mixed` array of a [`BitmapNode`].
pub(crate) enum MixedEntry<A, P: SharedPointerKind> {
    Data(A),
    Child(SharedPointer<Node<A, P>, P>),
}

impl<A: Clone, P: SharedPointerKind> Clone for MixedEntry<A, P> {
    fn clone(&self) -> Self {
        match self {
            MixedEntry::Data(data) => MixedEntry::Data(data.clone()),
            MixedEntry::Child(child) => MixedEntry::Child(child.clone()),
        }
    }
}

/// The regular interior/leaf node, compressed via two bitmaps.
pub(crate) struct BitmapNode<A, P: SharedPointerKind> {
    mutator: Option<OwnerToken<P>>,
    data_map: HashBits,
    node_map: HashBits,
    mixed: Vec<MixedEntry<A, P>>,
}

/// Holds payloads whose full hashes are identical. Entry order within the
/// node carries no meaning. Only found below the deepest bitmap level.
pub(crate) struct CollisionNode<A, P: SharedPointerKind> {
    mutator: Option<OwnerToken<P>>,
    hash: HashBits,
    entries: Vec<A>,
}

pub(crate) enum Node<A, P: SharedPointerKind> {
    Bitmap(BitmapNode<A, P>),
    Collision(CollisionNode<A, P>),
}

impl<A: Clone, P: SharedPointerKind> Clone for BitmapNode<A, P> {
    fn clone(&self) -> Self {
        BitmapNode {
            mutator: self.mutator.clone(),
            data_map: self.data_map,
            node_map: self.node_map,
            mixed: self.mixed.clone(),
        }
    }
}

impl<A: Clone, P: SharedPointerKind> Clone for CollisionNode<A, P> {
    fn clone(&self) -> Self {
        CollisionNode {
            mutator: self.mutator.clone(),
            hash: self.hash,
            entries: self.entries.clone(),
        }
    }
}

impl<A: Clone, P: SharedPointerKind> Clone for Node<A, P> {
    fn clone(&self) -> Self {
        match self {
            Node::Bitmap(node) => Node::Bitmap(node.clone()),
            Node::Collision(node) => Node::Collision(node.clone()),
        }
    }
}

impl<A, P: SharedPointerKind> BitmapNode<A, P> {
    fn new(
        mutator: Option<OwnerToken<P>>,
        data_map: HashBits,
        node_map: HashBits,
        mixed: Vec<MixedEntry<A, P>>,
    ) -> Self {
        BitmapNode {
            mutator,
            data_map,
            node_map,
            mixed,
        }
    }

    pub(crate) fn data_arity(&self) -> usize {
        self.data_map.count_ones() as usize
    }

    pub(crate) fn node_arity(&self) -> usize {
        self.node_map.count_ones() as usize
    }

    pub(crate) fn has_data(&self) -> bool {
        self.data_map != 0
    }

    pub(crate) fn has_nodes(&self) -> bool {
        self.node_map != 0
    }

    pub(crate) fn has_data_arity_one(&self) -> bool {
        self.data_map.count_ones() == 1
    }

    /// Index into `mixed` of the payload stored at `bit`.
    fn data_index(&self, bit: HashBits) -> usize {
        (self.data_map & (bit - 1)).count_ones() as usize
    }

    /// Index into `mixed` of the child stored at `bit`.
    fn node_index(&self, bit: HashBits) -> usize {
        self.mixed.len() - 1 - (self.node_map & (bit - 1)).count_ones() as usize
    }

    pub(crate) fn data_at(&self, index: usize) -> &A {
        match &self.mixed[index] {
            MixedEntry::Data(data) => data,
            MixedEntry::Child(_) => panic!("champ: data cursor hit a child slot"),
        }
    }

    fn child(&self, bit: HashBits) -> &SharedPointer<Node<A, P>, P> {
        match &self.mixed[self.node_index(bit)] {
            MixedEntry::Child(child) => child,
            MixedEntry::Data(_) => panic!("champ: node cursor hit a data slot"),
        }
    }

    fn clone_for(&self, mutator: Option<&OwnerToken<P>>) -> Self
    where
        A: Clone,
    {
        BitmapNode {
            mutator: mutator.cloned(),
            data_map: self.data_map,
            node_map: self.node_map,
            mixed: self.mixed.clone(),
        }
    }

    // The mutating primitives below assume the caller has established
    // ownership of this node.

    fn set_data(&mut self, index: usize, value: A) -> A {
        match &mut self.mixed[index] {
            MixedEntry::Data(data) => mem::replace(data, value),
            MixedEntry::Child(_) => panic!("champ: data cursor hit a child slot"),
        }
    }

    fn set_child(&mut self, bit: HashBits, child: SharedPointer<Node<A, P>, P>) {
        let index = self.node_index(bit);
        self.mixed[index] = MixedEntry::Child(child);
    }

    fn insert_data(&mut self, bit: HashBits, value: A) {
        let index = self.data_index(bit);
        self.mixed.insert(index, MixedEntry::Data(value));
        self.data_map |= bit;
    }

    fn remove_data(&mut self, bit: HashBits) -> A {
        let index = self.data_index(bit);
        self.data_map &= !bit;
        match self.mixed.remove(index) {
            MixedEntry::Data(data) => data,
            MixedEntry::Child(_) => panic!("champ: data cursor hit a child slot"),
        }
    }

    /// Replaces the inline payload at `bit` with a child node, keeping the
    /// data-front/children-back layout intact.
    fn migrate_data_to_child(&mut self, bit: HashBits, child: SharedPointer<Node<A, P>, P>) -> A {
        let data = self.remove_data(bit);
        let index = self.mixed.len() - (self.node_map & (bit - 1)).count_ones() as usize;
        self.mixed.insert(index, MixedEntry::Child(child));
        self.node_map |= bit;
        data
    }

    /// Replaces the child at `bit` with an inline payload; the inverse of
    /// [`migrate_data_to_child`], used when removal collapses a subtree.
    ///
    /// [`migrate_data_to_child`]: BitmapNode::migrate_data_to_child
    fn migrate_child_to_data(&mut self, bit: HashBits, value: A) -> SharedPointer<Node<A, P>, P> {
        let index = self.node_index(bit);
        self.node_map &= !bit;
        let child = match self.mixed.remove(index) {
            MixedEntry::Child(child) => child,
            MixedEntry::Data(_) => panic!("champ: node cursor hit a data slot"),
        };
        self.insert_data(bit, value);
        child
    }
}

impl<A, P: SharedPointerKind> Node<A, P> {
    /// A root holding a single payload, addressed at level 0.
    pub(crate) fn unit(mutator: Option<OwnerToken<P>>, hash: HashBits, value: A) -> Self {
        Node::Bitmap(BitmapNode::new(
            mutator,
            bitpos(mask(hash, 0)),
            0,
            vec![MixedEntry::Data(value)],
        ))
    }

    fn mutator(&self) -> Option<&OwnerToken<P>> {
        match self {
            Node::Bitmap(node) => node.mutator.as_ref(),
            Node::Collision(node) => node.mutator.as_ref(),
        }
    }
}

impl<A, P> Node<A, P>
where
    A: HashValue,
    P: SharedPointerKind,
{
    pub(crate) fn find<BK>(&self, hash: HashBits, shift: usize, key: &BK) -> Option<&A>
    where
        BK: Eq + ?Sized,
        A::Key: Borrow<BK>,
    {
        let mut node = self;
        let mut shift = shift;
        loop {
            match node {
                Node::Bitmap(n) => {
                    let bit = bitpos(mask(hash, shift));
                    if n.data_map & bit != 0 {
                        let data = n.data_at(n.data_index(bit));
                        return if key == data.extract_key().borrow() {
                            Some(data)
                        } else {
                            None
                        };
                    } else if n.node_map & bit != 0 {
                        node = n.child(bit);
                        shift += HASH_SHIFT;
                    } else {
                        return None;
                    }
                }
                Node::Collision(n) => {
                    return n.entries.iter().find(|e| key == e.extract_key().borrow());
                }
            }
        }
    }
}

impl<A, P> Node<A, P>
where
    A: HashValue + Clone,
    P: SharedPointerKind,
{
    /// Inserts a payload, or offers it to `replace` when a payload with the
    /// same key is already present.
    ///
    /// `replace` receives the stored payload and the incoming one; `None`
    /// keeps the stored payload and leaves the trie untouched, `Some` swaps
    /// the slot. This one code path serves plain inserts, value updates and
    /// the move-to-front/move-to-back operations of the ordered variants,
    /// which differ only in the combinator they pass.
    ///
    /// `hash_fn` is consulted when an existing inline payload has to move
    /// down a level to make room.
    pub(crate) fn update(
        this: &mut SharedPointer<Node<A, P>, P>,
        mutator: Option<&OwnerToken<P>>,
        value: A,
        hash: HashBits,
        shift: usize,
        details: &mut ChangeEvent<A>,
        replace: &impl Fn(&A, A) -> Option<A>,
        hash_fn: &impl Fn(&A) -> HashBits,
    ) {
        if let Node::Collision(_) = &**this {
            return Self::update_collision(this, mutator, value, details, replace);
        }
        let bit = bitpos(mask(hash, shift));
        let node = match &**this {
            Node::Bitmap(node) => node,
            Node::Collision(_) => unreachable!(),
        };
        if node.data_map & bit != 0 {
            let index = node.data_index(bit);
            let old = node.data_at(index);
            if *old.extract_key() == *value.extract_key() {
                let old_copy = old.clone();
                match replace(old, value) {
                    None => details.kept(old_copy),
                    Some(swapped) => {
                        Self::edit_bitmap(this, mutator, |n| {
                            n.set_data(index, swapped);
                        });
                        details.swapped(old_copy);
                    }
                }
            } else {
                // Same path so far, different key: the stored payload moves
                // down into a fresh subtree alongside the new one.
                let old_copy = old.clone();
                let old_hash = hash_fn(&old_copy);
                let child = Self::merge_two(
                    mutator,
                    old_copy,
                    old_hash,
                    value,
                    hash,
                    shift + HASH_SHIFT,
                );
                Self::edit_bitmap(this, mutator, |n| {
                    n.migrate_data_to_child(bit, SharedPointer::new(child));
                });
                details.inserted();
            }
        } else if node.node_map & bit != 0 {
            if editable(node.mutator.as_ref(), mutator) {
                let n = Self::bitmap_mut(this);
                let index = n.node_index(bit);
                let child = match &mut n.mixed[index] {
                    MixedEntry::Child(child) => child,
                    MixedEntry::Data(_) => unreachable!(),
                };
                Self::update(
                    child,
                    mutator,
                    value,
                    hash,
                    shift + HASH_SHIFT,
                    details,
                    replace,
                    hash_fn,
                );
            } else {
                let mut child = node.child(bit).clone();
                Self::update(
                    &mut child,
                    mutator,
                    value,
                    hash,
                    shift + HASH_SHIFT,
                    details,
                    replace,
                    hash_fn,
                );
                if details.modified {
                    Self::edit_bitmap(this, mutator, |n| n.set_child(bit, child));
                }
            }
        } else {
            Self::edit_bitmap(this, mutator, |n| n.insert_data(bit, value));
            details.inserted();
        }
    }

    fn update_collision(
        this: &mut SharedPointer<Node<A, P>, P>,
        mutator: Option<&OwnerToken<P>>,
        value: A,
        details: &mut ChangeEvent<A>,
        replace: &impl Fn(&A, A) -> Option<A>,
    ) {
        let node = match &**this {
            Node::Collision(node) => node,
            Node::Bitmap(_) => unreachable!(),
        };
        match node
            .entries
            .iter()
            .position(|e| e.extract_key() == value.extract_key())
        {
            Some(index) => {
                let old = &node.entries[index];
                let old_copy = old.clone();
                match replace(old, value) {
                    None => details.kept(old_copy),
                    Some(swapped) => {
                        Self::edit_collision(this, mutator, |n| n.entries[index] = swapped);
                        details.swapped(old_copy);
                    }
                }
            }
            None => {
                Self::edit_collision(this, mutator, |n| n.entries.push(value));
                details.inserted();
            }
        }
    }

    /// Builds the smallest subtree distinguishing two payloads, descending
    /// level by level until their masked hashes diverge, or to a collision
    /// node when the full hashes are identical.
    fn merge_two(
        mutator: Option<&OwnerToken<P>>,
        value0: A,
        hash0: HashBits,
        value1: A,
        hash1: HashBits,
        shift: usize,
    ) -> Node<A, P> {
        if shift >= HASH_WIDTH {
            debug_assert_eq!(hash0, hash1);
            return Node::Collision(CollisionNode {
                mutator: mutator.cloned(),
                hash: hash0,
                entries: vec![value0, value1],
            });
        }
        let mask0 = mask(hash0, shift);
        let mask1 = mask(hash1, shift);
        if mask0 != mask1 {
            // both fit on this level
            let mixed = if mask0 < mask1 {
                vec![MixedEntry::Data(value0), MixedEntry::Data(value1)]
            } else {
                vec![MixedEntry::Data(value1), MixedEntry::Data(value0)]
            };
            Node::Bitmap(BitmapNode::new(
                mutator.cloned(),
                bitpos(mask0) | bitpos(mask1),
                0,
                mixed,
            ))
        } else {
            // still sharing a prefix, wrap the next level
            let child = Self::merge_two(mutator, value0, hash0, value1, hash1, shift + HASH_SHIFT);
            Node::Bitmap(BitmapNode::new(
                mutator.cloned(),
                0,
                bitpos(mask0),
                vec![MixedEntry::Child(SharedPointer::new(child))],
            ))
        }
    }

    /// Removes the payload matching `key`, if any.
    ///
    /// Keeps the trie canonical on the way out: a node left with a single
    /// inline payload and no children is rebuilt addressed at level 0 so
    /// that the ancestor (or the caller, at the root) can inline it.
    pub(crate) fn remove<BK>(
        this: &mut SharedPointer<Node<A, P>, P>,
        mutator: Option<&OwnerToken<P>>,
        key: &BK,
        hash: HashBits,
        shift: usize,
        details: &mut ChangeEvent<A>,
    ) where
        BK: Eq + ?Sized,
        A::Key: Borrow<BK>,
    {
        if let Node::Collision(_) = &**this {
            return Self::remove_collision(this, mutator, key, hash, details);
        }
        let bit = bitpos(mask(hash, shift));
        let node = match &**this {
            Node::Bitmap(node) => node,
            Node::Collision(_) => unreachable!(),
        };
        if node.data_map & bit != 0 {
            let index = node.data_index(bit);
            let old = node.data_at(index);
            if key != old.extract_key().borrow() {
                return;
            }
            details.removed(old.clone());
            if node.data_arity() == 2 && !node.has_nodes() {
                // Collapse to a single-payload node. Below the root the
                // survivor is re-addressed at level 0, which lets the parent
                // inline it and keeps every non-root subtree at two or more
                // payloads.
                let data_map = if shift == 0 {
                    node.data_map ^ bit
                } else {
                    bitpos(mask(hash, 0))
                };
                let survivor = node.data_at(index ^ 1).clone();
                *this = SharedPointer::new(Node::Bitmap(BitmapNode::new(
                    mutator.cloned(),
                    data_map,
                    0,
                    vec![MixedEntry::Data(survivor)],
                )));
            } else {
                Self::edit_bitmap(this, mutator, |n| {
                    n.remove_data(bit);
                });
            }
        } else if node.node_map & bit != 0 {
            if editable(node.mutator.as_ref(), mutator) {
                let n = Self::bitmap_mut(this);
                let index = n.node_index(bit);
                let collapsed = {
                    let child = match &mut n.mixed[index] {
                        MixedEntry::Child(child) => child,
                        MixedEntry::Data(_) => unreachable!(),
                    };
                    Self::remove(child, mutator, key, hash, shift + HASH_SHIFT, details);
                    if !details.modified {
                        return;
                    }
                    match &**child {
                        Node::Bitmap(c) if c.has_data_arity_one() && !c.has_nodes() => {
                            Some((child.clone(), c.data_at(0).clone()))
                        }
                        _ => None,
                    }
                };
                if let Some((child, data)) = collapsed {
                    if !n.has_data() && n.node_arity() == 1 {
                        // this node became a pass-through; hand the
                        // single-payload child up as-is
                        *this = child;
                    } else {
                        n.migrate_child_to_data(bit, data);
                    }
                }
            } else {
                let mut child = node.child(bit).clone();
                Self::remove(&mut child, mutator, key, hash, shift + HASH_SHIFT, details);
                if !details.modified {
                    return;
                }
                let collapsed = match &*child {
                    Node::Bitmap(c) if c.has_data_arity_one() && !c.has_nodes() => {
                        Some(c.data_at(0).clone())
                    }
                    _ => None,
                };
                match collapsed {
                    Some(data) => {
                        if !node.has_data() && node.node_arity() == 1 {
                            *this = child;
                        } else {
                            Self::edit_bitmap(this, mutator, |n| {
                                n.migrate_child_to_data(bit, data);
                            });
                        }
                    }
                    None => Self::edit_bitmap(this, mutator, |n| n.set_child(bit, child)),
                }
            }
        }
    }

    fn remove_collision<BK>(
        this: &mut SharedPointer<Node<A, P>, P>,
        mutator: Option<&OwnerToken<P>>,
        key: &BK,
        hash: HashBits,
        details: &mut ChangeEvent<A>,
    ) where
        BK: Eq + ?Sized,
        A::Key: Borrow<BK>,
    {
        let node = match &**this {
            Node::Collision(node) => node,
            Node::Bitmap(_) => unreachable!(),
        };
        let Some(index) = node
            .entries
            .iter()
            .position(|e| key == e.extract_key().borrow())
        else {
            return;
        };
        details.removed(node.entries[index].clone());
        if node.entries.len() == 2 {
            // Down to one entry: rebuild as a single-payload bitmap node,
            // which either becomes the new root or is inlined by the parent.
            let survivor = node.entries[index ^ 1].clone();
            *this = SharedPointer::new(Node::Bitmap(BitmapNode::new(
                mutator.cloned(),
                bitpos(mask(hash, 0)),
                0,
                vec![MixedEntry::Data(survivor)],
            )));
        } else {
            Self::edit_collision(this, mutator, |n| {
                n.entries.swap_remove(index);
            });
        }
    }

    /// Structural equality of two tries under `eq`.
    ///
    /// Bitmap nodes must agree on both maps and, slot for slot, on payloads
    /// and children; a data slot never compares equal to a child slot.
    /// Collision nodes compare as multisets under `eq`.
    pub(crate) fn equivalent(&self, other: &Self, eq: &impl Fn(&A, &A) -> bool) -> bool {
        match (self, other) {
            (Node::Bitmap(a), Node::Bitmap(b)) => {
                if a.data_map != b.data_map || a.node_map != b.node_map {
                    return false;
                }
                a.mixed.iter().zip(&b.mixed).all(|(x, y)| match (x, y) {
                    (MixedEntry::Data(da), MixedEntry::Data(db)) => eq(da, db),
                    (MixedEntry::Child(ca), MixedEntry::Child(cb)) => {
                        SharedPointer::ptr_eq(ca, cb) || ca.equivalent(cb, eq)
                    }
                    _ => false,
                })
            }
            (Node::Collision(a), Node::Collision(b)) => {
                if a.hash != b.hash || a.entries.len() != b.entries.len() {
                    return false;
                }
                // arbitrary entry order; strike matches off a scratch list
                let mut pending: Vec<&A> = b.entries.iter().collect();
                for entry in &a.entries {
                    match pending.iter().position(|other| eq(entry, other)) {
                        Some(found) => {
                            pending.swap_remove(found);
                        }
                        None => return false,
                    }
                }
                true
            }
            _ => false,
        }
    }

    fn bitmap_mut(this: &mut SharedPointer<Node<A, P>, P>) -> &mut BitmapNode<A, P> {
        match SharedPointer::make_mut(this) {
            Node::Bitmap(node) => node,
            Node::Collision(_) => unreachable!(),
        }
    }

    /// Runs `edit` against this bitmap node in place when the caller owns
    /// it, against a token-carrying copy otherwise.
    fn edit_bitmap(
        this: &mut SharedPointer<Node<A, P>, P>,
        mutator: Option<&OwnerToken<P>>,
        edit: impl FnOnce(&mut BitmapNode<A, P>),
    ) {
        if editable(this.mutator(), mutator) {
            edit(Self::bitmap_mut(this));
        } else {
            let mut copy = match &**this {
                Node::Bitmap(node) => node.clone_for(mutator),
                Node::Collision(_) => unreachable!(),
            };
            edit(&mut copy);
            *this = SharedPointer::new(Node::Bitmap(copy));
        }
    }

    fn edit_collision(
        this: &mut SharedPointer<Node<A, P>, P>,
        mutator: Option<&OwnerToken<P>>,
        edit: impl FnOnce(&mut CollisionNode<A, P>),
    ) {
        if editable(this.mutator(), mutator) {
            match SharedPointer::make_mut(this) {
                Node::Collision(node) => edit(node),
                Node::Bitmap(_) => unreachable!(),
            }
        } else {
            let mut copy = match &**this {
                Node::Collision(node) => CollisionNode {
                    mutator: mutator.cloned(),
                    hash: node.hash,
                    entries: node.entries.clone(),
                },
                Node::Bitmap(_) => unreachable!(),
            };
            edit(&mut copy);
            *this = SharedPointer::new(Node::Collision(copy));
        }
    }
}

#[cfg(test)]
impl<A, P> Node<A, P>
where
    A: HashValue + Clone,
    P: SharedPointerKind,
{
    /// Walks the trie asserting its structural invariants; returns the
    /// number of payloads in the subtree.
    pub(crate) fn check_invariants(
        &self,
        shift: usize,
        is_root: bool,
        prefix: HashBits,
        hash_fn: &impl Fn(&A) -> HashBits,
    ) -> usize {
        match self {
            Node::Bitmap(n) => {
                assert_eq!(0, n.data_map & n.node_map, "data_map and node_map overlap");
                assert_eq!(n.mixed.len(), n.data_arity() + n.node_arity());
                for (index, entry) in n.mixed.iter().enumerate() {
                    match entry {
                        MixedEntry::Data(_) => assert!(index < n.data_arity()),
                        MixedEntry::Child(_) => assert!(index >= n.data_arity()),
                    }
                }
                let mut count = 0;
                let data_positions = Bitmap::<HASH_WIDTH>::from_value(n.data_map);
                let mut cursor = data_positions.first_index();
                let mut ordinal = 0;
                while let Some(position) = cursor {
                    let data = n.data_at(ordinal);
                    let hash = hash_fn(data);
                    assert_eq!(position, mask(hash, shift), "payload stored under wrong slot");
                    assert_eq!(prefix, hash & ((1 << shift) - 1), "payload off its hash path");
                    count += 1;
                    ordinal += 1;
                    cursor = data_positions.next_index(position);
                }
                let node_positions = Bitmap::<HASH_WIDTH>::from_value(n.node_map);
                let mut cursor = node_positions.first_index();
                while let Some(position) = cursor {
                    let child = n.child(bitpos(position));
                    count += child.check_invariants(
                        shift + HASH_SHIFT,
                        false,
                        prefix | ((position as HashBits) << shift),
                        hash_fn,
                    );
                    cursor = node_positions.next_index(position);
                }
                if !is_root {
                    assert!(count >= 2, "non-root subtree holds fewer than two payloads");
                }
                count
            }
            Node::Collision(n) => {
                assert!(shift >= HASH_WIDTH, "collision node above the deepest level");
                assert!(n.entries.len() >= 2, "undersized collision node");
                for entry in &n.entries {
                    assert_eq!(n.hash, hash_fn(entry), "mixed hashes in a collision node");
                }
                assert_eq!(n.hash, prefix);
                n.entries.len()
            }
        }
    }
}

impl<A: fmt::Debug, P: SharedPointerKind> fmt::Debug for Node<A, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Bitmap(n) => {
                write!(f, "BitmapNode[")?;
                let mut sep = "";
                let data_positions = Bitmap::<HASH_WIDTH>::from_value(n.data_map);
                let mut cursor = data_positions.first_index();
                while let Some(position) = cursor {
                    let bit = bitpos(position);
                    write!(f, "{}{}: {:?}", sep, position, n.data_at(n.data_index(bit)))?;
                    sep = ", ";
                    cursor = data_positions.next_index(position);
                }
                let node_positions = Bitmap::<HASH_WIDTH>::from_value(n.node_map);
                let mut cursor = node_positions.first_index();
                while let Some(position) = cursor {
                    write!(f, "{}{}: {:?}", sep, position, n.child(bitpos(position)))?;
                    sep = ", ";
                    cursor = node_positions.next_index(position);
                }
                write!(f, "]")
            }
            Node::Collision(n) => write!(f, "CollisionNode({:#x}, {:?})", n.hash, n.entries),
        }
    }
}

/// An allocation-free stack for iterators.
type InlineStack<T> = InlineArray<T, (usize, [T; MAX_DEPTH])>;

enum IterItem<'a, A, P: SharedPointerKind> {
    Mixed(SliceIter<'a, MixedEntry<A, P>>),
    Collision(SliceIter<'a, A>),
}

// We manually impl Clone so the iterator is cloneable even when A isn't;
// it only holds references.
impl<'a, A, P: SharedPointerKind> Clone for IterItem<'a, A, P> {
    fn clone(&self) -> Self {
        match self {
            IterItem::Mixed(iter) => IterItem::Mixed(iter.clone()),
            IterItem::Collision(iter) => IterItem::Collision(iter.clone()),
        }
    }
}

/// Depth-first payload iterator, in arbitrary (trie) order.
///
/// Walking a node's `mixed` array front to back yields its inline payloads
/// first and then descends into its children, with a fixed-depth stack and
/// O(1) amortized steps.
pub(crate) struct Iter<'a, A, P: SharedPointerKind> {
    count: usize,
    stack: InlineStack<IterItem<'a, A, P>>,
}

impl<'a, A, P: SharedPointerKind> Clone for Iter<'a, A, P> {
    fn clone(&self) -> Self {
        Iter {
            count: self.count,
            stack: self.stack.clone(),
        }
    }
}

impl<'a, A, P: SharedPointerKind> Iter<'a, A, P> {
    pub(crate) fn new(root: Option<&'a Node<A, P>>, size: usize) -> Self {
        let mut result = Iter {
            count: size,
            stack: InlineStack::new(),
        };
        if let Some(node) = root {
            result.stack.push(Self::frame(node));
        }
        result
    }

    fn frame(node: &'a Node<A, P>) -> IterItem<'a, A, P> {
        match node {
            Node::Bitmap(n) => IterItem::Mixed(n.mixed.iter()),
            Node::Collision(n) => IterItem::Collision(n.entries.iter()),
        }
    }
}

impl<'a, A, P: SharedPointerKind> Iterator for Iter<'a, A, P> {
    type Item = &'a A;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.last_mut() {
            match current {
                IterItem::Mixed(iter) => {
                    if let Some(entry) = iter.next() {
                        match entry {
                            MixedEntry::Data(data) => {
                                self.count -= 1;
                                return Some(data);
                            }
                            MixedEntry::Child(child) => {
                                let frame = Self::frame(child);
                                self.stack.push(frame);
                            }
                        }
                        continue;
                    }
                }
                IterItem::Collision(iter) => {
                    if let Some(data) = iter.next() {
                        self.count -= 1;
                        return Some(data);
                    }
                }
            }
            self.stack.pop();
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.count, Some(self.count))
    }
}

impl<'a, A, P: SharedPointerKind> ExactSizeIterator for Iter<'a, A, P> {}

impl<'a, A, P: SharedPointerKind> FusedIterator for Iter<'a, A, P> {}

/// Consuming payload iterator, in arbitrary (trie) order.
///
/// Pops payloads out of the nodes as it goes; nodes still shared with other
/// views are cloned on first touch, exclusively held ones are emptied in
/// place.
pub(crate) struct Drain<A, P: SharedPointerKind> {
    count: usize,
    stack: InlineStack<SharedPointer<Node<A, P>, P>>,
}

impl<A, P: SharedPointerKind> Drain<A, P> {
    pub(crate) fn new(root: Option<SharedPointer<Node<A, P>, P>>, size: usize) -> Self {
        let mut result = Drain {
            count: size,
            stack: InlineStack::new(),
        };
        if let Some(root) = root {
            result.stack.push(root);
        }
        result
    }
}

impl<A: Clone, P: SharedPointerKind> Iterator for Drain<A, P> {
    type Item = A;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(top) = self.stack.last_mut() {
            match SharedPointer::make_mut(top) {
                Node::Bitmap(n) => {
                    if let Some(entry) = n.mixed.pop() {
                        match entry {
                            MixedEntry::Data(data) => {
                                self.count -= 1;
                                return Some(data);
                            }
                            MixedEntry::Child(child) => {
                                self.stack.push(child);
                            }
                        }
                        continue;
                    }
                }
                Node::Collision(n) => {
                    if let Some(data) = n.entries.pop() {
                        self.count -= 1;
                        return Some(data);
                    }
                }
            }
            self.stack.pop();
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.count, Some(self.count))
    }
}

impl<A: Clone, P: SharedPointerKind> ExactSizeIterator for Drain<A, P> {}

impl<A: Clone, P: SharedPointerKind> FusedIterator for Drain<A, P> {}
