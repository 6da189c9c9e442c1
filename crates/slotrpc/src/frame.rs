//! # Protocol Frames
//!
//! Defines the request and reply envelopes around codec-encoded payloads.
//!
//! ## Invariants
//! - **Header Routing**: The method name lives in the message header. Codec
//!   keys start at `"0"` in every message and never carry routing data.
//! - **Reserved Keys**: Envelope keys are prefixed with the ABI version
//!   (`v1.`), so they can never collide with the decimal codec keys.
//! - **Exclusive Replies**: A reply holds either a codec-encoded result or a
//!   failure (`v1.error` + `v1.type`), never both.

use slotmsg::Value;
use slotmsg::WireMessage;
use slotpack::Decode;
use slotpack::Encode;

use crate::error::Error;
use crate::error::FailureKind;
use crate::error::RemoteFailure;
use crate::error::Result;

/// Version of the calling convention spoken by this crate.
pub const ABI_VERSION: &str = "v1";

/// Text describing a failed call.
pub const ERROR_KEY: &str = "v1.error";

/// Text naming the [`FailureKind`] of a failed call.
pub const TYPE_KEY: &str = "v1.type";

/// Optional request key announcing the caller's ABI version.
pub const ABI_KEY: &str = "v1.abi";

/// Builds a request: `method` in the header, `args` from key `"0"`, and the
/// caller's ABI version under [`ABI_KEY`].
pub fn encode_call<A: Encode + ?Sized>(method: &str, args: &A) -> Result<WireMessage> {
    let mut msg = WireMessage::new(method);
    slotpack::encode_into(&mut msg, args)?;
    msg.set_string(ABI_KEY, ABI_VERSION);
    Ok(msg)
}

/// Decodes the arguments of a request.
pub fn decode_args<A: Decode>(request: &WireMessage) -> Result<A> {
    Ok(slotpack::decode_from(request)?)
}

/// Writes a successful result into `response`.
pub fn encode_result<R: Encode + ?Sized>(response: &mut WireMessage, result: &R) -> Result<()> {
    slotpack::encode_into(response, result)?;
    Ok(())
}

/// Replaces whatever `response` holds with a failure reply.
///
/// Partial results a handler wrote before failing are discarded.
pub fn encode_failure(response: &mut WireMessage, failure: &RemoteFailure) {
    let method = response.method().to_string();
    *response = WireMessage::new(method);
    response.set_string(ERROR_KEY, failure.message.as_str());
    response.set_string(TYPE_KEY, failure.kind.as_tag());
}

/// Returns the failure carried by a reply, if any.
///
/// A reply with an error text but no type reads as a `Handler` failure.
pub fn failure_of(reply: &WireMessage) -> Option<RemoteFailure> {
    let message = reply.get_string(ERROR_KEY).ok()?;
    let kind = reply.get_string(TYPE_KEY).map(FailureKind::from_tag).unwrap_or(FailureKind::Handler);
    Some(RemoteFailure::new(kind, message))
}

/// Checks a reply for a failure, then decodes the result.
pub fn decode_reply<R: Decode>(reply: &WireMessage) -> Result<R> {
    if let Some(failure) = failure_of(reply) {
        return Err(Error::Remote(failure));
    }
    Ok(slotpack::decode_from(reply)?)
}

/// Rejects requests announcing an ABI other than [`ABI_VERSION`].
///
/// Requests without [`ABI_KEY`] are accepted.
pub fn check_abi(request: &WireMessage) -> std::result::Result<(), RemoteFailure> {
    match request.get(ABI_KEY) {
        None => Ok(()),
        Some(Value::Text(version)) if version == ABI_VERSION => Ok(()),
        Some(Value::Text(version)) => Err(RemoteFailure::new(
            FailureKind::Protocol,
            format!("caller speaks ABI {}, server speaks {}", version, ABI_VERSION),
        )),
        Some(other) => Err(RemoteFailure::new(
            FailureKind::Protocol,
            format!("{} holds {}, expected string", ABI_KEY, other.kind()),
        )),
    }
}
