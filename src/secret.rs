//! Shared-secret resolution (C11). A server needs to find the right secret
//! for an inbound request's source address before it can verify or decode
//! anything; this trait keeps that lookup pluggable (static table, file,
//! database) behind one async seam, matching the `AuthBackend` shape the
//! teacher uses for pluggable authentication.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;

use crate::error::Error;

/// Resolves the shared secret for a NAS by its source address.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn secret_for(&self, source: SocketAddr) -> Result<Vec<u8>, Error>;
}

/// An in-memory table of secrets keyed by NAS IP address (port ignored —
/// RADIUS secrets are conventionally per-host, not per-port).
#[derive(Debug, Clone, Default)]
pub struct StaticSecretStore {
    by_ip: HashMap<IpAddr, Vec<u8>>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, ip: IpAddr, secret: impl Into<Vec<u8>>) -> Self {
        self.by_ip.insert(ip, secret.into());
        self
    }

    pub fn insert(&mut self, ip: IpAddr, secret: impl Into<Vec<u8>>) {
        self.by_ip.insert(ip, secret.into());
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn secret_for(&self, source: SocketAddr) -> Result<Vec<u8>, Error> {
        self.by_ip.get(&source.ip()).cloned().ok_or(Error::UnknownSecret)
    }
}
