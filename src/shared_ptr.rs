// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Shared pointers for trie nodes. Re-exports the [`archery`] crate.
//!
//! Every collection in this crate is generic over a [`SharedPointerKind`],
//! which decides how trie nodes are shared between views: atomically
//! reference counted (`ArcK`, the default), plain `Rc` (`RcK`, cheaper but
//! not thread-safe), or `triomphe::Arc` (`ArcTK`, with the `triomphe`
//! feature).
//!
//! [`archery`]: https://docs.rs/archery/latest/

pub use archery::{ArcK, RcK, SharedPointer, SharedPointerKind};

#[cfg(feature = "triomphe")]
pub use archery::ArcTK;

#[cfg(not(feature = "triomphe"))]
/// The pointer kind used by the [`HashSet`], [`HashMap`], [`SeqSet`] and
/// [`SeqMap`] type aliases: [`ArcK`] unless the `triomphe` feature selects
/// [`ArcTK`].
///
/// [`HashSet`]: ../hashset/type.HashSet.html
/// [`HashMap`]: ../hashmap/type.HashMap.html
/// [`SeqSet`]: ../seqset/type.SeqSet.html
/// [`SeqMap`]: ../seqmap/type.SeqMap.html
/// [`ArcK`]: https://docs.rs/archery/latest/archery/shared_pointer/kind/struct.ArcK.html
/// [`ArcTK`]: https://docs.rs/archery/latest/archery/shared_pointer/kind/struct.ArcTK.html
pub type DefaultSharedPtr = ArcK;

#[cfg(feature = "triomphe")]
/// The pointer kind used by the [`HashSet`], [`HashMap`], [`SeqSet`] and
/// [`SeqMap`] type aliases: [`ArcK`] unless the `triomphe` feature selects
/// [`ArcTK`].
///
/// [`HashSet`]: ../hashset/type.HashSet.html
/// [`HashMap`]: ../hashmap/type.HashMap.html
/// [`SeqSet`]: ../seqset/type.SeqSet.html
/// [`SeqMap`]: ../seqmap/type.SeqMap.html
/// [`ArcK`]: https://docs.rs/archery/latest/archery/shared_pointer/kind/struct.ArcK.html
/// [`ArcTK`]: https://docs.rs/archery/latest/archery/shared_pointer/kind/struct.ArcTK.html
pub type DefaultSharedPtr = ArcTK;
