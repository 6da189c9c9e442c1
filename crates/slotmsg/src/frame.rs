//! # Framing
//!
//! Byte layout of a `WireMessage` for transports that move opaque buffers.
//!
//! ## Format
//!
//! - **Header**: `[Method: Str][Count: u32]`
//! - **Slot**: `[Key: Str][Tag: 1b][Payload]`
//! - **Str**: `[Len: u32][UTF-8: Len]`
//!
//! Payloads by tag:
//!
//! - `Word`: `u32`
//! - `WordArray`: `[N: u32][u32 * N]`
//! - `Text`: `Str`
//! - `TextArray`: `[N: u32][Str * N]`
//! - `Bytes`: `[Len: u32][Data: Len]`
//!
//! All integers are Little-Endian.

use crate::Error;
use crate::Result;
use crate::Value;
use crate::WireMessage;

/// Identifies the kind of the slot payload that follows.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Word = 0x01,
    WordArray = 0x02,
    Text = 0x03,
    TextArray = 0x04,
    Bytes = 0x05,
}

impl Tag {
    /// Returns the Tag variant for a given byte, or `None` if invalid.
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Tag::Word),
            0x02 => Some(Tag::WordArray),
            0x03 => Some(Tag::Text),
            0x04 => Some(Tag::TextArray),
            0x05 => Some(Tag::Bytes),
            _ => None,
        }
    }

    fn of(value: &Value) -> Self {
        match value {
            Value::Word(_) => Tag::Word,
            Value::WordArray(_) => Tag::WordArray,
            Value::Text(_) => Tag::Text,
            Value::TextArray(_) => Tag::TextArray,
            Value::Bytes(_) => Tag::Bytes,
        }
    }
}

/// Frames `msg` into a freshly allocated buffer.
pub fn encode(msg: &WireMessage) -> Result<Vec<u8>> {
    let mut enc = Encoder::new();
    enc.str(msg.method())?;
    enc.len(msg.len())?;
    for (key, value) in msg.iter() {
        enc.str(key)?;
        enc.value(value)?;
    }
    Ok(enc.into_bytes())
}

/// Parses a complete frame. The whole buffer must be consumed.
pub fn decode(bytes: &[u8]) -> Result<WireMessage> {
    let mut dec = Decoder::new(bytes);
    let mut msg = WireMessage::new(dec.str()?);
    let count = dec.u32()?;
    for _ in 0..count {
        let key = dec.str()?;
        if msg.contains(&key) {
            return Err(Error::DuplicateKey(key));
        }
        let value = dec.value()?;
        msg.set(key, value);
    }
    if dec.remaining() > 0 {
        return Err(Error::TrailingBytes(dec.remaining()));
    }
    Ok(msg)
}

/// Append-only frame writer.
struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    fn new() -> Self {
        Self { buf: Vec::with_capacity(256) }
    }

    fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn len(&mut self, n: usize) -> Result<()> {
        if n > u32::MAX as usize {
            return Err(Error::BlobTooLarge(n));
        }
        self.u32(n as u32);
        Ok(())
    }

    fn str(&mut self, v: &str) -> Result<()> {
        self.len(v.len())?;
        self.buf.extend_from_slice(v.as_bytes());
        Ok(())
    }

    fn value(&mut self, value: &Value) -> Result<()> {
        self.buf.push(Tag::of(value) as u8);
        match value {
            Value::Word(v) => self.u32(*v),
            Value::WordArray(items) => {
                self.len(items.len())?;
                for v in items {
                    self.u32(*v);
                }
            }
            Value::Text(s) => self.str(s)?,
            Value::TextArray(items) => {
                self.len(items.len())?;
                for s in items {
                    self.str(s)?;
                }
            }
            Value::Bytes(b) => {
                self.len(b.len())?;
                self.buf.extend_from_slice(b);
            }
        }
        Ok(())
    }
}

/// A bounds-checked cursor over a frame.
///
/// All read operations return `Error::UnexpectedEnd` if the buffer is exhausted.
struct Decoder<'a> {
    buf: &'a [u8],
}

impl<'a> Decoder<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.buf.len() {
            return Err(Error::UnexpectedEnd);
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads an element count and rejects counts that cannot possibly fit in
    /// the remaining buffer, so a corrupt header cannot force a huge allocation.
    fn count(&mut self, min_elem_size: usize) -> Result<usize> {
        let n = self.u32()? as usize;
        if n.saturating_mul(min_elem_size) > self.remaining() {
            return Err(Error::UnexpectedEnd);
        }
        Ok(n)
    }

    fn str(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| Error::InvalidUtf8)
    }

    fn value(&mut self) -> Result<Value> {
        let b = self.u8()?;
        let tag = Tag::from_u8(b).ok_or(Error::InvalidTag(b))?;
        match tag {
            Tag::Word => Ok(Value::Word(self.u32()?)),
            Tag::WordArray => {
                let n = self.count(4)?;
                let mut items = Vec::with_capacity(n);
                for _ in 0..n {
                    items.push(self.u32()?);
                }
                Ok(Value::WordArray(items))
            }
            Tag::Text => Ok(Value::Text(self.str()?)),
            Tag::TextArray => {
                let n = self.count(4)?;
                let mut items = Vec::with_capacity(n);
                for _ in 0..n {
                    items.push(self.str()?);
                }
                Ok(Value::TextArray(items))
            }
            Tag::Bytes => {
                let len = self.u32()? as usize;
                Ok(Value::Bytes(self.read_bytes(len)?.to_vec()))
            }
        }
    }
}
