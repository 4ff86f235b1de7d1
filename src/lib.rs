//! RADIUS (RFC 2865/2866) packet codec, attribute dictionary, and
//! client/server request lifecycle.
//!
//! This crate is the wire-protocol and session-bookkeeping core: encoding
//! and decoding packets, hiding passwords, computing and verifying
//! authenticators, and driving the retry/identifier/circuit-breaker
//! machinery a client or server needs around that codec. It does not bind
//! a CLI, a dictionary file format, or a TLS transport — those are left to
//! callers.

pub mod attribute;
pub mod blacklist;
pub mod client;
pub mod config;
pub mod crypto;
pub mod dictionary;
pub mod error;
pub mod identifier;
pub mod packet;
pub mod pending;
pub mod secret;
pub mod server;
pub mod transport;

pub use attribute::{Attribute, DataType, Value};
pub use client::Client;
pub use config::{ClientConfig, ServerConfig};
pub use dictionary::{AttributeDescriptor, Dictionary, Enumeration};
pub use error::{Error, Result};
pub use packet::{Packet, PacketCode};
pub use secret::{SecretStore, StaticSecretStore};
pub use server::{RequestHandler, Server};
pub use transport::{DatagramTransport, UdpTransport};

/// Crate version, for inclusion in NAS-Identifier / log lines by callers
/// that want to report what built them.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
