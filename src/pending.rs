//! Pending-request table (C6): tracks in-flight requests by `(endpoint,
//! identifier)` and wakes the waiting caller via a one-shot channel when a
//! matching response arrives (spec.md §4.4, §5).

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

use tokio::sync::oneshot;

use crate::error::Error;
use crate::packet::Packet;

/// A single outstanding request: the bytes last sent (for byte-identical
/// retransmission) and the channel its eventual response is delivered on.
struct Entry {
    sent_bytes: Vec<u8>,
    completion: oneshot::Sender<Packet>,
}

/// Table of requests awaiting a response, keyed by the endpoint they were
/// sent to and the identifier they were sent with. Entries are removed the
/// moment they're completed or cancelled — nothing here outlives a single
/// request's lifecycle (spec.md §5).
pub struct PendingTable<Endpoint> {
    entries: Mutex<HashMap<(Endpoint, u8), Entry>>,
}

impl<Endpoint: Eq + Hash + Clone> Default for PendingTable<Endpoint> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Endpoint: Eq + Hash + Clone> PendingTable<Endpoint> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register a newly sent request, returning the receiver its caller
    /// should await. `sent_bytes` is retained so a retry timer can
    /// retransmit the identical encoding (spec.md §4.4 invariant).
    pub fn register(&self, endpoint: Endpoint, identifier: u8, sent_bytes: Vec<u8>) -> oneshot::Receiver<Packet> {
        let (tx, rx) = oneshot::channel();
        let mut table = self.entries.lock().expect("pending table mutex poisoned");
        table.insert(
            (endpoint, identifier),
            Entry {
                sent_bytes,
                completion: tx,
            },
        );
        rx
    }

    /// Look up the bytes last sent for this entry, for a retry timer to
    /// resend without re-encoding.
    pub fn sent_bytes(&self, endpoint: &Endpoint, identifier: u8) -> Option<Vec<u8>> {
        let table = self.entries.lock().expect("pending table mutex poisoned");
        table.get(&(endpoint.clone(), identifier)).map(|e| e.sent_bytes.clone())
    }

    /// Whether an entry is still outstanding (used by a retry timer to
    /// decide whether to keep retransmitting or stand down).
    pub fn is_pending(&self, endpoint: &Endpoint, identifier: u8) -> bool {
        let table = self.entries.lock().expect("pending table mutex poisoned");
        table.contains_key(&(endpoint.clone(), identifier))
    }

    /// Deliver a response: remove the entry and hand the packet to its
    /// waiting receiver. Returns [`Error::NoPendingRequest`] if there's no
    /// matching entry — an unexpected, late, or duplicate response.
    pub fn complete(&self, endpoint: &Endpoint, identifier: u8, packet: Packet) -> Result<(), Error> {
        let entry = {
            let mut table = self.entries.lock().expect("pending table mutex poisoned");
            table.remove(&(endpoint.clone(), identifier))
        };
        match entry {
            Some(entry) => {
                // The caller may have dropped its receiver (e.g. it gave up
                // already); that's not this table's problem to report.
                let _ = entry.completion.send(packet);
                Ok(())
            }
            None => Err(Error::NoPendingRequest),
        }
    }

    /// Remove an entry without delivering anything — used when a request
    /// times out or its caller cancels. Dropping the sender resolves the
    /// receiver with a `RecvError`, which callers map to [`Error::Cancelled`].
    pub fn cancel(&self, endpoint: &Endpoint, identifier: u8) {
        let mut table = self.entries.lock().expect("pending table mutex poisoned");
        table.remove(&(endpoint.clone(), identifier));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketCode;
    use std::net::{Ipv4Addr, SocketAddr};

    fn endpoint() -> SocketAddr {
        SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 1812)
    }

    #[tokio::test]
    async fn complete_delivers_the_packet_to_the_registered_receiver() {
        let table: PendingTable<SocketAddr> = PendingTable::new();
        let ep = endpoint();
        let rx = table.register(ep, 7, vec![1, 2, 3]);

        let response = Packet::new(PacketCode::AccessAccept, 7, [0u8; 16]);
        table.complete(&ep, 7, response.clone()).unwrap();

        let received = rx.await.unwrap();
        assert_eq!(received, response);
    }

    #[tokio::test]
    async fn complete_without_registration_errors() {
        let table: PendingTable<SocketAddr> = PendingTable::new();
        let response = Packet::new(PacketCode::AccessAccept, 3, [0u8; 16]);
        assert_eq!(table.complete(&endpoint(), 3, response), Err(Error::NoPendingRequest));
    }

    #[tokio::test]
    async fn cancel_resolves_receiver_with_an_error() {
        let table: PendingTable<SocketAddr> = PendingTable::new();
        let ep = endpoint();
        let rx = table.register(ep, 2, vec![9]);
        assert!(table.is_pending(&ep, 2));

        table.cancel(&ep, 2);
        assert!(!table.is_pending(&ep, 2));
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn sent_bytes_are_retrievable_for_retransmission() {
        let table: PendingTable<SocketAddr> = PendingTable::new();
        let ep = endpoint();
        let _rx = table.register(ep, 1, vec![0xaa, 0xbb]);
        assert_eq!(table.sent_bytes(&ep, 1), Some(vec![0xaa, 0xbb]));
        assert_eq!(table.sent_bytes(&ep, 99), None);
    }
}
