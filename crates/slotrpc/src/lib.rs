//! # Slotrpc
//!
//! The calling convention shared by slot clients and servers.
//!
//! ## Architecture
//!
//! A request is a [`WireMessage`] whose header names `module.method` and whose
//! slots hold the codec-encoded argument tuple. A reply holds the encoded
//! result, or a failure under the reserved `v1.` keys. Nothing here performs
//! I/O; transports and dispatch live in the runtime crate.

mod error;
mod frame;

#[cfg(test)]
mod tests;

pub use slotmsg::WireMessage;
use slotpack::Decode;
use slotpack::Encode;

pub use crate::error::Error;
pub use crate::error::FailureKind;
pub use crate::error::RemoteFailure;
pub use crate::error::Result;
pub use crate::frame::ABI_KEY;
pub use crate::frame::ABI_VERSION;
pub use crate::frame::ERROR_KEY;
pub use crate::frame::TYPE_KEY;
pub use crate::frame::check_abi;
pub use crate::frame::decode_args;
pub use crate::frame::decode_reply;
pub use crate::frame::encode_call;
pub use crate::frame::encode_failure;
pub use crate::frame::encode_result;
pub use crate::frame::failure_of;

/// Marks a type as the signature of a remotely callable method.
///
/// Only types implementing `Method` can be registered on a server or invoked
/// through a session, so an ordinary local function cannot be sent over the
/// wire by accident.
///
/// ```
/// use slotrpc::Method;
///
/// struct ReadRegister;
///
/// impl Method for ReadRegister {
///     const MODULE: &'static str = "memory";
///     const NAME: &'static str = "read";
///     type Args = (u32, u32);
///     type Output = Vec<u32>;
/// }
///
/// assert_eq!(slotrpc::qualified_name::<ReadRegister>(), "memory.read");
/// ```
pub trait Method {
    /// Module the method is registered by.
    const MODULE: &'static str;
    /// Method name within its module.
    const NAME: &'static str;
    type Args: Encode + Decode;
    type Output: Encode + Decode;
}

/// The `module.method` name a request for `M` carries in its header.
pub fn qualified_name<M: Method>() -> String {
    format!("{}.{}", M::MODULE, M::NAME)
}

/// The built-in request that loads a module on the server.
///
/// Arguments are `(module name, version key)`.
pub struct ModuleLoad;

impl Method for ModuleLoad {
    const MODULE: &'static str = "module";
    const NAME: &'static str = "load";
    type Args = (String, String);
    type Output = ();
}

/// Header of a [`ModuleLoad`] request.
pub const MODULE_LOAD_METHOD: &str = "module.load";
