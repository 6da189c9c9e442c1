//! # Slotpack
//!
//! A type-directed codec between native values and the flat slots of a
//! [`WireMessage`].
//!
//! ## Philosophy
//!
//! - **Positional**: Every primitive write takes the next key from a
//!   [`KeyDispenser`]. Keys are never named, so encode and decode must walk the
//!   same static type in the same order.
//! - **Static**: The value's type picks the write/read path. Types without an
//!   [`Encode`]/[`Decode`] impl are rejected by the compiler, not at runtime.
//! - **Narrow**: The wire only knows words, word arrays, strings, string arrays
//!   and blobs. Everything else is widened, reinterpreted or flattened onto them.
//!
//! ## Format
//!
//! - **Words**: `bool`, `u8`, `u16`, `u32`, `i8`, `i16`, `i32`, `f32` take one key.
//! - **Wide**: `u64`, `i64` take two keys (low word, high word).
//! - **Sequences**: `[Len: Word][Elem * Len]`; `Vec<u32>` and `Vec<String>` use
//!   the native array kinds instead.
//! - **Fixed arrays**: integer scalars pack into one blob; other elements follow
//!   one another without a length.
//! - **Maps**: `[Keys: WordArray | TextArray][Value * Len]`, keys ascending.
//! - **Tuples**: elements left to right; `()` takes no key.

extern crate self as slotpack;

#[macro_use]
mod macros;

mod codec;
mod error;
mod impls;
mod keys;


pub use slotmsg::Kind;
pub use slotmsg::Value;
pub use slotmsg::WireMessage;

pub use crate::codec::Decode;
pub use crate::codec::Deserializer;
pub use crate::codec::Encode;
pub use crate::codec::MapKey;
pub use crate::codec::Serializer;
pub use crate::codec::decode_from;
pub use crate::codec::encode_into;
pub use crate::error::Error;
pub use crate::error::Result;
pub use crate::keys::KeyDispenser;

#[cfg(feature = "derive")]
pub use slotpack_derive::Decode;
#[cfg(feature = "derive")]
pub use slotpack_derive::Encode;
