//! # Slotrun
//!
//! Everything that moves a call: the server-side method registry and module
//! catalog, the request dispatcher and TCP server, the transports, and the
//! client-side [`session::RpcSession`].

pub mod config;
pub mod local;
pub mod registry;
pub mod server;
pub mod session;
pub mod tcp;
pub mod transport;
