//! # Slotmsg
//!
//! The flat, key-indexed container of typed primitives exchanged in one RPC
//! round trip.
//!
//! ## Format
//!
//! A message is a method name plus a set of slots. Each slot maps a string key
//! to exactly one primitive value:
//!
//! - **Word**: `u32`
//! - **WordArray**: sequence of `u32`
//! - **Text**: UTF-8 string
//! - **TextArray**: sequence of strings
//! - **Bytes**: opaque blob
//!
//! Slots are kept ordered by key, so framing a message is deterministic.

use std::collections::BTreeMap;
use std::fmt;

pub mod frame;


/// Slotmsg lookup and framing errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A get targeted a key that was never set.
    KeyNotFound(String),
    /// The key exists but holds a different kind of value.
    KindMismatch { key: String, expected: Kind, found: Kind },
    /// Byte does not correspond to a valid value `Tag`.
    InvalidTag(u8),
    /// String data is not valid UTF-8.
    InvalidUtf8,
    /// Buffer exhausted while reading a frame.
    UnexpectedEnd,
    /// Bytes left over after the last slot of a frame.
    TrailingBytes(usize),
    /// Blob, array or slot count exceeds `u32::MAX`.
    BlobTooLarge(usize),
    /// A frame carries the same key in two slots.
    DuplicateKey(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::KeyNotFound(key) => write!(f, "key not found: {}", key),
            Error::KindMismatch { key, expected, found } => {
                write!(f, "key {} holds {}, expected {}", key, found, expected)
            }
            Error::InvalidTag(b) => write!(f, "invalid tag byte: {:#04x}", b),
            Error::TrailingBytes(n) => write!(f, "{} trailing bytes after frame", n),
            Error::DuplicateKey(key) => write!(f, "key {} appears twice in frame", key),
            _ => write!(f, "{:?}", self),
        }
    }
}

impl std::error::Error for Error {}

/// Specialized `Result` for slotmsg operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The five primitive kinds a slot may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Word,
    WordArray,
    Text,
    TextArray,
    Bytes,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Word => "word",
            Kind::WordArray => "word_array",
            Kind::Text => "string",
            Kind::TextArray => "string_array",
            Kind::Bytes => "binarydata",
        };
        f.write_str(name)
    }
}

/// A single slot value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Word(u32),
    WordArray(Vec<u32>),
    Text(String),
    TextArray(Vec<String>),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Word(_) => Kind::Word,
            Value::WordArray(_) => Kind::WordArray,
            Value::Text(_) => Kind::Text,
            Value::TextArray(_) => Kind::TextArray,
            Value::Bytes(_) => Kind::Bytes,
        }
    }
}

/// A mutable, key-indexed message.
///
/// The method name travels in the message header, never in a slot, so codec
/// keys and the dispatch target cannot collide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireMessage {
    method: String,
    slots: BTreeMap<String, Value>,
}

impl WireMessage {
    /// Creates an empty message addressed to `method`.
    pub fn new(method: impl Into<String>) -> Self {
        Self { method: method.into(), slots: BTreeMap::new() }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn set_method(&mut self, method: impl Into<String>) {
        self.method = method.into();
    }

    /// Number of slots currently set.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    /// Sets a slot, replacing whatever the key held before.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.slots.insert(key.into(), value);
    }

    /// Returns the raw slot value, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.slots.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.slots.remove(key)
    }

    /// Iterates slots in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn set_word(&mut self, key: impl Into<String>, v: u32) {
        self.set(key, Value::Word(v));
    }

    pub fn set_word_array(&mut self, key: impl Into<String>, v: Vec<u32>) {
        self.set(key, Value::WordArray(v));
    }

    pub fn set_string(&mut self, key: impl Into<String>, v: impl Into<String>) {
        self.set(key, Value::Text(v.into()));
    }

    pub fn set_string_array(&mut self, key: impl Into<String>, v: Vec<String>) {
        self.set(key, Value::TextArray(v));
    }

    pub fn set_binary_data(&mut self, key: impl Into<String>, v: &[u8]) {
        self.set(key, Value::Bytes(v.to_vec()));
    }

    fn lookup(&self, key: &str) -> Result<&Value> {
        self.slots.get(key).ok_or_else(|| Error::KeyNotFound(key.to_string()))
    }

    fn mismatch(key: &str, expected: Kind, found: &Value) -> Error {
        Error::KindMismatch { key: key.to_string(), expected, found: found.kind() }
    }

    pub fn get_word(&self, key: &str) -> Result<u32> {
        match self.lookup(key)? {
            Value::Word(v) => Ok(*v),
            other => Err(Self::mismatch(key, Kind::Word, other)),
        }
    }

    pub fn get_word_array(&self, key: &str) -> Result<&[u32]> {
        match self.lookup(key)? {
            Value::WordArray(v) => Ok(v),
            other => Err(Self::mismatch(key, Kind::WordArray, other)),
        }
    }

    pub fn get_string(&self, key: &str) -> Result<&str> {
        match self.lookup(key)? {
            Value::Text(v) => Ok(v),
            other => Err(Self::mismatch(key, Kind::Text, other)),
        }
    }

    pub fn get_string_array(&self, key: &str) -> Result<&[String]> {
        match self.lookup(key)? {
            Value::TextArray(v) => Ok(v),
            other => Err(Self::mismatch(key, Kind::TextArray, other)),
        }
    }

    pub fn get_binary_data(&self, key: &str) -> Result<&[u8]> {
        match self.lookup(key)? {
            Value::Bytes(v) => Ok(v),
            other => Err(Self::mismatch(key, Kind::Bytes, other)),
        }
    }

    /// Frames the message into bytes. See [`frame::encode`].
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        frame::encode(self)
    }

    /// Parses a framed message. See [`frame::decode`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        frame::decode(bytes)
    }
}
