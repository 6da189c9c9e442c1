//! # Error Definitions
//!
//! Failures of a single encode or decode pass.

use slotmsg::Kind;

/// Codec failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Decode referenced a key that was never written. Usually a signature
    /// skew between caller and callee.
    MissingKey(String),
    /// The key exists but holds a different kind of value.
    KindMismatch { key: String, expected: Kind, found: Kind },
    /// A word does not fit the narrower integer it is decoded into.
    OutOfRange { value: u32, target: &'static str },
    /// A fixed-size array was decoded from a slot of the wrong size.
    ArrayLength { expected: usize, found: usize },
    /// A sequence is longer than a length word can describe.
    TooLong(usize),
    /// A sequence element occupied no key, so its count is unbounded by the
    /// message.
    KeylessElement,
    /// Any other failure reported by the message layer.
    Wire(slotmsg::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MissingKey(key) => write!(f, "missing key {}", key),
            Error::KindMismatch { key, expected, found } => {
                write!(f, "key {} holds {}, expected {}", key, found, expected)
            }
            Error::OutOfRange { value, target } => {
                write!(f, "word {:#x} out of range for {}", value, target)
            }
            Error::ArrayLength { expected, found } => {
                write!(f, "fixed array expected {} bytes or elements, found {}", expected, found)
            }
            Error::TooLong(n) => write!(f, "sequence of {} elements exceeds a word", n),
            Error::KeylessElement => write!(f, "sequence elements must occupy at least one key"),
            Error::Wire(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<slotmsg::Error> for Error {
    fn from(e: slotmsg::Error) -> Self {
        match e {
            slotmsg::Error::KeyNotFound(key) => Self::MissingKey(key),
            slotmsg::Error::KindMismatch { key, expected, found } => {
                Self::KindMismatch { key, expected, found }
            }
            other => Self::Wire(other),
        }
    }
}

/// A specialized Result type for codec operations.
pub type Result<T> = std::result::Result<T, Error>;
