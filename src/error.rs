//! Closed error set for the codec, dictionary, and client/server lifecycle.

use thiserror::Error;

/// Errors produced by this crate.
///
/// Decode-time errors are recovered at the receive boundary by callers
/// (the datagram is dropped); encode-time and user-input errors propagate.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    /// Packet header is truncated, the length field disagrees with the
    /// buffer, or an attribute runs past the declared packet length.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    /// An attribute's length byte is less than 2 or overruns its parent.
    #[error("malformed attribute: {0}")]
    MalformedAttribute(String),

    /// Packet code is not recognised for the current role.
    #[error("unknown packet type: {0}")]
    UnknownPacketType(u8),

    /// MD5/HMAC mismatch on authenticator or Message-Authenticator
    /// verification.
    #[error("bad authenticator")]
    BadAuthenticator,

    /// A typed constructor was given bytes or text of the wrong size or
    /// form for the attribute's data type.
    #[error("invalid value for attribute {name}: {reason}")]
    InvalidValue {
        /// Attribute name the value was rejected for.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// All 256 identifiers are in use for an endpoint.
    #[error("no free identifier available for endpoint")]
    NoFreeIdentifier,

    /// All configured retry attempts were exhausted without a response.
    #[error("request timed out")]
    Timeout,

    /// The circuit breaker is open for this endpoint.
    #[error("endpoint is blacklisted")]
    EndpointBlacklisted,

    /// Encoded packet size would exceed the 4096-byte RADIUS maximum.
    #[error("packet too long: {0} bytes")]
    PacketTooLong(usize),

    /// The server has no shared secret configured for the source address.
    #[error("no shared secret known for source address")]
    UnknownSecret,

    /// The pending request table has no entry for an inbound response
    /// (unknown identifier, already resolved, or never sent from here).
    #[error("no pending request for this response")]
    NoPendingRequest,

    /// The request was cancelled by the caller before it completed.
    #[error("request cancelled")]
    Cancelled,

    /// Transport I/O failure (send/recv on the underlying socket).
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
