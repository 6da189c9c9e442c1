//! Codec impls for std types.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::hash::Hash;

use crate::codec::Decode;
use crate::codec::Deserializer;
use crate::codec::Encode;
use crate::codec::MapKey;
use crate::codec::Serializer;
use crate::error::Result;

// ============================================================================
//  WORDS
// ============================================================================

impl Encode for u32 {
    fn encode(&self, ser: &mut Serializer<'_>) -> Result<()> {
        ser.word(*self)
    }

    fn encode_seq(items: &[Self], ser: &mut Serializer<'_>) -> Result<()> {
        ser.word_array(items)
    }

    packed_encode_array!(u32);
}

impl Decode for u32 {
    fn decode(de: &mut Deserializer<'_>) -> Result<Self> {
        de.word()
    }

    fn decode_seq(de: &mut Deserializer<'_>) -> Result<Vec<Self>> {
        Ok(de.word_array()?.to_vec())
    }

    packed_decode_array!(u32);
}

for_each_narrow_int!(impl_narrow_int);

impl Encode for bool {
    fn encode(&self, ser: &mut Serializer<'_>) -> Result<()> {
        ser.word(u32::from(*self))
    }
}

impl Decode for bool {
    fn decode(de: &mut Deserializer<'_>) -> Result<Self> {
        Ok(de.word()? != 0)
    }
}

/// IEEE-754 single precision, bit for bit.
impl Encode for f32 {
    fn encode(&self, ser: &mut Serializer<'_>) -> Result<()> {
        ser.word(self.to_bits())
    }
}

impl Decode for f32 {
    fn decode(de: &mut Deserializer<'_>) -> Result<Self> {
        Ok(f32::from_bits(de.word()?))
    }
}

/// Low word first.
impl Encode for u64 {
    fn encode(&self, ser: &mut Serializer<'_>) -> Result<()> {
        ser.word(*self as u32)?;
        ser.word((*self >> 32) as u32)
    }

    packed_encode_array!(u64);
}

impl Decode for u64 {
    fn decode(de: &mut Deserializer<'_>) -> Result<Self> {
        let lo = de.word()? as u64;
        let hi = de.word()? as u64;
        Ok(hi << 32 | lo)
    }

    packed_decode_array!(u64);
}

impl Encode for i64 {
    fn encode(&self, ser: &mut Serializer<'_>) -> Result<()> {
        (*self as u64).encode(ser)
    }

    packed_encode_array!(i64);
}

impl Decode for i64 {
    fn decode(de: &mut Deserializer<'_>) -> Result<Self> {
        Ok(u64::decode(de)? as i64)
    }

    packed_decode_array!(i64);
}

// ============================================================================
//  STRINGS
// ============================================================================

impl Encode for str {
    fn encode(&self, ser: &mut Serializer<'_>) -> Result<()> {
        ser.text(self)
    }
}

impl Encode for String {
    fn encode(&self, ser: &mut Serializer<'_>) -> Result<()> {
        ser.text(self)
    }

    fn encode_seq(items: &[Self], ser: &mut Serializer<'_>) -> Result<()> {
        ser.text_array(items)
    }
}

impl Decode for String {
    fn decode(de: &mut Deserializer<'_>) -> Result<Self> {
        Ok(de.text()?.to_string())
    }

    fn decode_seq(de: &mut Deserializer<'_>) -> Result<Vec<Self>> {
        Ok(de.text_array()?.to_vec())
    }
}

// ============================================================================
//  CONTAINERS
// ============================================================================

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, ser: &mut Serializer<'_>) -> Result<()> {
        (**self).encode(ser)
    }
}

impl<T: Encode> Encode for [T] {
    fn encode(&self, ser: &mut Serializer<'_>) -> Result<()> {
        T::encode_seq(self, ser)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, ser: &mut Serializer<'_>) -> Result<()> {
        T::encode_seq(self, ser)
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(de: &mut Deserializer<'_>) -> Result<Self> {
        T::decode_seq(de)
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode(&self, ser: &mut Serializer<'_>) -> Result<()> {
        T::encode_array(self, ser)
    }
}

impl<T: Decode, const N: usize> Decode for [T; N] {
    fn decode(de: &mut Deserializer<'_>) -> Result<Self> {
        T::decode_array::<N>(de)
    }
}

impl MapKey for u32 {
    fn encode_keys(keys: &[&Self], ser: &mut Serializer<'_>) -> Result<()> {
        let keys: Vec<u32> = keys.iter().map(|k| **k).collect();
        ser.word_array(&keys)
    }

    fn decode_keys(de: &mut Deserializer<'_>) -> Result<Vec<Self>> {
        Ok(de.word_array()?.to_vec())
    }
}

impl MapKey for String {
    fn encode_keys(keys: &[&Self], ser: &mut Serializer<'_>) -> Result<()> {
        let keys: Vec<String> = keys.iter().map(|k| (*k).clone()).collect();
        ser.text_array(&keys)
    }

    fn decode_keys(de: &mut Deserializer<'_>) -> Result<Vec<Self>> {
        Ok(de.text_array()?.to_vec())
    }
}

/// The key list is dispensed first, then one value per key in list order.
fn encode_entries<'a, K, V>(
    entries: impl Iterator<Item = (&'a K, &'a V)>,
    ser: &mut Serializer<'_>,
) -> Result<()>
where
    K: MapKey + 'a,
    V: Encode + 'a,
{
    let (keys, values): (Vec<&K>, Vec<&V>) = entries.unzip();
    K::encode_keys(&keys, ser)?;
    for value in values {
        value.encode(ser)?;
    }
    Ok(())
}

fn decode_entries<K: MapKey, V: Decode>(de: &mut Deserializer<'_>) -> Result<Vec<(K, V)>> {
    let keys = K::decode_keys(de)?;
    let mut entries = Vec::with_capacity(keys.len());
    for key in keys {
        let value = V::decode(de)?;
        entries.push((key, value));
    }
    Ok(entries)
}

impl<K: MapKey, V: Encode> Encode for BTreeMap<K, V> {
    fn encode(&self, ser: &mut Serializer<'_>) -> Result<()> {
        encode_entries(self.iter(), ser)
    }
}

impl<K: MapKey, V: Decode> Decode for BTreeMap<K, V> {
    fn decode(de: &mut Deserializer<'_>) -> Result<Self> {
        Ok(decode_entries(de)?.into_iter().collect())
    }
}

/// Entries are sorted by key before encoding, so the wire order never
/// depends on the hasher.
impl<K: MapKey + Hash, V: Encode, S: BuildHasher> Encode for HashMap<K, V, S> {
    fn encode(&self, ser: &mut Serializer<'_>) -> Result<()> {
        let mut entries: Vec<(&K, &V)> = self.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        encode_entries(entries.into_iter(), ser)
    }
}

impl<K: MapKey + Hash, V: Decode, S: BuildHasher + Default> Decode for HashMap<K, V, S> {
    fn decode(de: &mut Deserializer<'_>) -> Result<Self> {
        Ok(decode_entries(de)?.into_iter().collect())
    }
}

// ============================================================================
//  TUPLES
// ============================================================================

/// The empty argument list and the void result take no keys.
impl Encode for () {
    fn encode(&self, _ser: &mut Serializer<'_>) -> Result<()> {
        Ok(())
    }
}

impl Decode for () {
    fn decode(_de: &mut Deserializer<'_>) -> Result<Self> {
        Ok(())
    }
}

impl_tuple!(A);
impl_tuple!(A, B);
impl_tuple!(A, B, C);
impl_tuple!(A, B, C, D);
impl_tuple!(A, B, C, D, E);
impl_tuple!(A, B, C, D, E, F);
impl_tuple!(A, B, C, D, E, F, G);
impl_tuple!(A, B, C, D, E, F, G, H);
impl_tuple!(A, B, C, D, E, F, G, H, I);
impl_tuple!(A, B, C, D, E, F, G, H, I, J);
impl_tuple!(A, B, C, D, E, F, G, H, I, J, K);
impl_tuple!(A, B, C, D, E, F, G, H, I, J, K, L);
