// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/// The level size of the CHAMP tries, in bits.
/// Branching factor is 2 ^ HashLevelSize.
///
/// Five bits make the branching factor equal to the hash width, so each of
/// the two bit-maps of a trie node fits exactly into one hash-sized word.
pub(crate) const HASH_LEVEL_SIZE: usize = 5;
