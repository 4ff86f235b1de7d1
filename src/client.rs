//! Client front-end (C7): send an Access-Request or Accounting-Request and
//! get back a verified response, with identifier allocation, retry,
//! blacklisting, and authenticator bookkeeping handled underneath.

use std::net::SocketAddr;
use std::sync::Arc;

use rand::RngCore;
use tracing::{debug, warn};

use crate::attribute::{Attribute, Value};
use crate::blacklist::Blacklist;
use crate::config::ClientConfig;
use crate::crypto;
use crate::error::Error;
use crate::identifier::IdentifierAllocator;
use crate::packet::{Packet, PacketCode};
use crate::pending::PendingTable;
use crate::transport::DatagramTransport;

const USER_PASSWORD_TYPE: u8 = 2;

/// A RADIUS client bound to one transport, shared across every destination
/// it talks to. Identifier pools, the pending-request table, and the
/// circuit breaker are all keyed per destination endpoint internally.
pub struct Client<T: DatagramTransport + 'static> {
    transport: Arc<T>,
    identifiers: Arc<IdentifierAllocator<SocketAddr>>,
    pending: Arc<PendingTable<SocketAddr>>,
    blacklist: Arc<Blacklist<SocketAddr>>,
    config: ClientConfig,
}

impl<T: DatagramTransport + 'static> Client<T> {
    pub fn new(transport: Arc<T>, config: ClientConfig) -> Self {
        Self {
            transport,
            identifiers: Arc::new(IdentifierAllocator::new()),
            pending: Arc::new(PendingTable::new()),
            blacklist: Arc::new(Blacklist::new(config.fail_count_threshold, config.blacklist_ttl())),
            config,
        }
    }

    /// Send `packet` to `destination` using `secret`, returning the
    /// verified response. `packet.identifier` is overwritten with a freshly
    /// allocated one; an Access-Request always gets a freshly generated
    /// Request Authenticator here regardless of what the caller set
    /// (spec.md §3, §4.5), and a plaintext `User-Password` (if present) is
    /// hidden in place against that authenticator before encoding. A
    /// placeholder Message-Authenticator (if present) is filled in by
    /// [`Packet::encode`].
    pub async fn send(&self, destination: SocketAddr, secret: &[u8], mut packet: Packet) -> Result<Packet, Error> {
        if self.blacklist.is_blacklisted(&destination) {
            return Err(Error::EndpointBlacklisted);
        }

        let identifier = self.identifiers.acquire(&destination)?;
        packet.identifier = identifier;
        if packet.code == PacketCode::AccessRequest {
            let mut ra = [0u8; 16];
            rand::thread_rng().fill_bytes(&mut ra);
            packet.authenticator = ra;
        }
        hide_user_password(&mut packet, secret);

        let result = self.send_allocated(destination, secret, packet).await;
        self.identifiers.release(&destination, identifier);
        self.blacklist.record(&destination, &result.as_ref().map(|_| ()).map_err(Error::clone));
        result
    }

    async fn send_allocated(&self, destination: SocketAddr, secret: &[u8], packet: Packet) -> Result<Packet, Error> {
        let identifier = packet.identifier;
        let request_authenticator = packet.authenticator;
        let bytes = packet.encode(secret, None)?;

        let rx = self.pending.register(destination, identifier, bytes.clone());
        self.transport.send_to(destination, &bytes).await?;

        let retry_task = {
            let pending = Arc::clone(&self.pending);
            let transport = Arc::clone(&self.transport);
            let interval = self.config.retry_interval();
            let retries = self.config.retries;
            tokio::spawn(async move {
                for attempt in 1..=retries {
                    tokio::time::sleep(interval).await;
                    if !pending.is_pending(&destination, identifier) {
                        return;
                    }
                    debug!(attempt, %destination, identifier, "retransmitting RADIUS request");
                    if let Some(bytes) = pending.sent_bytes(&destination, identifier) {
                        let _ = transport.send_to(destination, &bytes).await;
                    }
                }
            })
        };

        let overall_timeout = self.config.retry_interval() * (self.config.retries + 1);
        let outcome = tokio::time::timeout(overall_timeout, rx).await;
        retry_task.abort();

        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(Error::Cancelled),
            Err(_) => {
                self.pending.cancel(&destination, identifier);
                warn!(%destination, identifier, "RADIUS request timed out");
                return Err(Error::Timeout);
            }
        };

        match response.code {
            PacketCode::AccountingResponse | PacketCode::AccessAccept | PacketCode::AccessReject | PacketCode::AccessChallenge => {
                response.verify_response(secret, &request_authenticator)?;
            }
            _ => {}
        }
        Ok(response)
    }
}

/// Replace a plaintext `User-Password` value with its hidden form per RFC
/// 2865 §5.2, using `packet.authenticator` as the Request Authenticator.
/// A no-op if no such attribute is present.
fn hide_user_password(packet: &mut Packet, secret: &[u8]) {
    let authenticator = packet.authenticator;
    for attr in packet.attributes.iter_mut() {
        if attr.vendor_id == -1 && attr.type_code == USER_PASSWORD_TYPE {
            if let Value::String(plaintext) = &attr.value {
                let hidden = crypto::hide_password(plaintext.as_bytes(), &authenticator, secret);
                *attr = Attribute::new(-1, USER_PASSWORD_TYPE, Value::Octets(hidden));
            }
        }
    }
}
