//! # Codec
//!
//! The translation layer between Rust values and `WireMessage` slots.
//!
//! ## Invariants
//! - **Symmetry**: For every type, `decode` dispenses exactly the keys `encode`
//!   dispensed, in the same order, independent of the value's contents.
//! - **Read-Only Decode**: A `Deserializer` never mutates the message it reads.

use slotmsg::Value;
use slotmsg::WireMessage;

use crate::error::Error;
use crate::error::Result;
use crate::keys::KeyDispenser;

/// A value that can be written into message slots.
///
/// `encode_seq` and `encode_array` describe how a *collection* of `Self` is
/// laid out. The defaults flatten element by element; scalar impls override
/// them to use the native wire arrays.
pub trait Encode {
    fn encode(&self, ser: &mut Serializer<'_>) -> Result<()>;

    /// Writes a dynamic sequence: a length word followed by every element.
    /// Elements that occupy no key (such as `()`) cannot be sequenced.
    fn encode_seq(items: &[Self], ser: &mut Serializer<'_>) -> Result<()>
    where
        Self: Sized,
    {
        ser.length(items.len())?;
        for item in items {
            let before = ser.keys_used();
            item.encode(ser)?;
            if ser.keys_used() == before {
                return Err(Error::KeylessElement);
            }
        }
        Ok(())
    }

    /// Writes a fixed-size array. The length is part of the type, so it is
    /// not written.
    fn encode_array(items: &[Self], ser: &mut Serializer<'_>) -> Result<()>
    where
        Self: Sized,
    {
        for item in items {
            item.encode(ser)?;
        }
        Ok(())
    }
}

/// A value that can be read back from message slots.
///
/// Mirrors [`Encode`]; an override of `encode_seq`/`encode_array` must come
/// with the matching override here.
pub trait Decode: Sized {
    fn decode(de: &mut Deserializer<'_>) -> Result<Self>;

    /// Reads a length word, then that many elements. Every element must take
    /// at least one key, so a forged length cannot outrun the message.
    fn decode_seq(de: &mut Deserializer<'_>) -> Result<Vec<Self>> {
        let len = de.length()?;
        let mut items = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            let before = de.keys_used();
            items.push(Self::decode(de)?);
            if de.keys_used() == before {
                return Err(Error::KeylessElement);
            }
        }
        Ok(items)
    }

    fn decode_array<const N: usize>(de: &mut Deserializer<'_>) -> Result<[Self; N]> {
        let mut items = Vec::with_capacity(N);
        for _ in 0..N {
            items.push(Self::decode(de)?);
        }
        <[Self; N]>::try_from(items)
            .map_err(|items| Error::ArrayLength { expected: N, found: items.len() })
    }
}

/// A type usable as a map key. Map keys travel together as one native array.
pub trait MapKey: Ord + Sized {
    fn encode_keys(keys: &[&Self], ser: &mut Serializer<'_>) -> Result<()>;
    fn decode_keys(de: &mut Deserializer<'_>) -> Result<Vec<Self>>;
}

/// Writes values into a message, one dispensed key per primitive.
pub struct Serializer<'m> {
    msg: &'m mut WireMessage,
    keys: KeyDispenser,
}

impl<'m> Serializer<'m> {
    /// Starts a pass at key `"0"`.
    pub fn new(msg: &'m mut WireMessage) -> Self {
        Self { msg, keys: KeyDispenser::new() }
    }

    /// Encodes any value and returns `self` for chaining.
    pub fn encode<T: Encode + ?Sized>(&mut self, value: &T) -> Result<&mut Self> {
        value.encode(self)?;
        Ok(self)
    }

    /// Number of keys written so far.
    pub fn keys_used(&self) -> u32 {
        self.keys.dispensed()
    }

    fn put(&mut self, value: Value) {
        let key = self.keys.dispense();
        self.msg.set(key, value);
    }

    pub fn word(&mut self, v: u32) -> Result<()> {
        self.put(Value::Word(v));
        Ok(())
    }

    pub fn word_array(&mut self, v: &[u32]) -> Result<()> {
        self.put(Value::WordArray(v.to_vec()));
        Ok(())
    }

    pub fn text(&mut self, v: &str) -> Result<()> {
        self.put(Value::Text(v.to_string()));
        Ok(())
    }

    pub fn text_array(&mut self, v: &[String]) -> Result<()> {
        self.put(Value::TextArray(v.to_vec()));
        Ok(())
    }

    pub fn bytes(&mut self, v: &[u8]) -> Result<()> {
        self.put(Value::Bytes(v.to_vec()));
        Ok(())
    }

    /// Writes a sequence length as a word.
    pub fn length(&mut self, len: usize) -> Result<()> {
        let len = u32::try_from(len).map_err(|_| Error::TooLong(len))?;
        self.word(len)
    }
}

/// Reads values from a message in the order a `Serializer` wrote them.
pub struct Deserializer<'m> {
    msg: &'m WireMessage,
    keys: KeyDispenser,
}

impl<'m> Deserializer<'m> {
    /// Starts a pass at key `"0"`.
    pub fn new(msg: &'m WireMessage) -> Self {
        Self { msg, keys: KeyDispenser::new() }
    }

    /// Decodes any value.
    pub fn decode<T: Decode>(&mut self) -> Result<T> {
        T::decode(self)
    }

    /// Number of keys read so far.
    pub fn keys_used(&self) -> u32 {
        self.keys.dispensed()
    }

    pub fn word(&mut self) -> Result<u32> {
        let key = self.keys.dispense();
        Ok(self.msg.get_word(&key)?)
    }

    pub fn word_array(&mut self) -> Result<&'m [u32]> {
        let key = self.keys.dispense();
        Ok(self.msg.get_word_array(&key)?)
    }

    pub fn text(&mut self) -> Result<&'m str> {
        let key = self.keys.dispense();
        Ok(self.msg.get_string(&key)?)
    }

    pub fn text_array(&mut self) -> Result<&'m [String]> {
        let key = self.keys.dispense();
        Ok(self.msg.get_string_array(&key)?)
    }

    pub fn bytes(&mut self) -> Result<&'m [u8]> {
        let key = self.keys.dispense();
        Ok(self.msg.get_binary_data(&key)?)
    }

    pub fn length(&mut self) -> Result<usize> {
        Ok(self.word()? as usize)
    }
}

/// Encodes `value` into `msg` starting at key `"0"`. Returns the number of
/// keys written.
pub fn encode_into<T: Encode + ?Sized>(msg: &mut WireMessage, value: &T) -> Result<u32> {
    let mut ser = Serializer::new(msg);
    value.encode(&mut ser)?;
    Ok(ser.keys_used())
}

/// Decodes a `T` from `msg` starting at key `"0"`.
pub fn decode_from<T: Decode>(msg: &WireMessage) -> Result<T> {
    T::decode(&mut Deserializer::new(msg))
}
