// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Bincode support.
//!
//! The wire shape is a 32-bit element count followed by the elements (or
//! key/value entries) in iteration order. Decoding inserts in encounter
//! order, so the insertion-ordered variants restore both their contents and
//! their order.

use std::hash::{BuildHasher, Hash};

use archery::SharedPointerKind;
use bincode::de::Decoder;
use bincode::enc::Encoder;
use bincode::error::{DecodeError, EncodeError};
use bincode::{Decode, Encode};

use crate::hashmap::GenericHashMap;
use crate::hashset::GenericHashSet;
use crate::seqmap::GenericSeqMap;
use crate::seqset::GenericSeqSet;

// HashSet

impl<C, A, S, P> Decode<C> for GenericHashSet<A, S, P>
where
    A: Decode<C> + Hash + Eq + Clone,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn decode<D: Decoder<Context = C>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let length: u32 = Decode::decode(decoder)?;
        let mut output = crate::hashset::GenericHashSetMut::<A, S, P>::new();
        for _ in 0..length {
            let item: A = Decode::decode(decoder)?;
            // Duplicates are silently ignored.
            output.insert(item);
        }
        Ok(output.to_immutable())
    }
}

impl<A, S, P> Encode for GenericHashSet<A, S, P>
where
    A: Encode + Hash + Eq,
    S: BuildHasher,
    P: SharedPointerKind,
{
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&(self.len() as u32), encoder)?;
        for item in self.iter() {
            Encode::encode(item, encoder)?;
        }
        Ok(())
    }
}

// HashMap

impl<C, K, V, S, P> Decode<C> for GenericHashMap<K, V, S, P>
where
    K: Decode<C> + Hash + Eq + Clone,
    V: Decode<C> + Clone,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn decode<D: Decoder<Context = C>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let length: u32 = Decode::decode(decoder)?;
        let mut output = crate::hashmap::GenericHashMapMut::<K, V, S, P>::new();
        for _ in 0..length {
            let (k, v): (K, V) = Decode::decode(decoder)?;
            // Duplicates are silently ignored.
            output.insert(k, v);
        }
        Ok(output.to_immutable())
    }
}

impl<K, V, S, P> Encode for GenericHashMap<K, V, S, P>
where
    K: Encode + Hash + Eq,
    V: Encode,
    S: BuildHasher,
    P: SharedPointerKind,
{
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&(self.len() as u32), encoder)?;
        for (k, v) in self.iter() {
            Encode::encode(&(k, v), encoder)?;
        }
        Ok(())
    }
}

// SeqSet

impl<C, A, S, P> Decode<C> for GenericSeqSet<A, S, P>
where
    A: Decode<C> + Hash + Eq + Clone,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn decode<D: Decoder<Context = C>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let length: u32 = Decode::decode(decoder)?;
        let mut output = crate::seqset::GenericSeqSetMut::<A, S, P>::new();
        for _ in 0..length {
            let item: A = Decode::decode(decoder)?;
            output.insert(item);
        }
        Ok(output.to_immutable())
    }
}

impl<A, S, P> Encode for GenericSeqSet<A, S, P>
where
    A: Encode + Hash + Eq,
    S: BuildHasher,
    P: SharedPointerKind,
{
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&(self.len() as u32), encoder)?;
        for item in self.iter() {
            Encode::encode(item, encoder)?;
        }
        Ok(())
    }
}

// SeqMap

impl<C, K, V, S, P> Decode<C> for GenericSeqMap<K, V, S, P>
where
    K: Decode<C> + Hash + Eq + Clone,
    V: Decode<C> + Clone + PartialEq,
    S: BuildHasher + Default + Clone,
    P: SharedPointerKind,
{
    fn decode<D: Decoder<Context = C>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let length: u32 = Decode::decode(decoder)?;
        let mut output = crate::seqmap::GenericSeqMapMut::<K, V, S, P>::new();
        for _ in 0..length {
            let (k, v): (K, V) = Decode::decode(decoder)?;
            output.insert(k, v);
        }
        Ok(output.to_immutable())
    }
}

impl<K, V, S, P> Encode for GenericSeqMap<K, V, S, P>
where
    K: Encode + Hash + Eq,
    V: Encode,
    S: BuildHasher,
    P: SharedPointerKind,
{
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&(self.len() as u32), encoder)?;
        for (k, v) in self.iter() {
            Encode::encode(&(k, v), encoder)?;
        }
        Ok(())
    }
}

// Tests

#[cfg(test)]
mod test {
    use crate::{HashMap, HashSet, SeqMap, SeqSet};
    use bincode::config;

    #[test]
    fn hashset_round_trips() {
        let set: HashSet<i32> = (0..1000).collect();
        let bytes = bincode::encode_to_vec(&set, config::standard()).unwrap();
        let (restored, _): (HashSet<i32>, usize) =
            bincode::decode_from_slice(&bytes, config::standard()).unwrap();
        assert_eq!(set, restored);
    }

    #[test]
    fn hashmap_round_trips() {
        let map: HashMap<i32, String> = (0..1000).map(|i| (i, i.to_string())).collect();
        let bytes = bincode::encode_to_vec(&map, config::standard()).unwrap();
        let (restored, _): (HashMap<i32, String>, usize) =
            bincode::decode_from_slice(&bytes, config::standard()).unwrap();
        assert_eq!(map, restored);
    }

    #[test]
    fn ordered_variants_round_trip_their_order() {
        let set: SeqSet<i32> = (0..1000).rev().collect();
        let bytes = bincode::encode_to_vec(&set, config::standard()).unwrap();
        let (restored, _): (SeqSet<i32>, usize) =
            bincode::decode_from_slice(&bytes, config::standard()).unwrap();
        assert_eq!(set, restored);
        assert_eq!(
            set.iter().cloned().collect::<Vec<_>>(),
            restored.iter().cloned().collect::<Vec<_>>()
        );

        let map: SeqMap<i32, i32> = (0..1000).rev().map(|i| (i, i)).collect();
        let bytes = bincode::encode_to_vec(&map, config::standard()).unwrap();
        let (restored, _): (SeqMap<i32, i32>, usize) =
            bincode::decode_from_slice(&bytes, config::standard()).unwrap();
        assert_eq!(map, restored);
    }
}
