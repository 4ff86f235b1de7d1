//! Server front-end (C8): decode an inbound request, resolve its secret,
//! verify it, hand it to a [`RequestHandler`], and encode the handler's
//! response — the receive-side counterpart to [`crate::client::Client`].

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, warn};

use crate::dictionary::Dictionary;
use crate::error::Error;
use crate::packet::{Packet, PacketCode};
use crate::secret::SecretStore;
use crate::transport::DatagramTransport;

const MESSAGE_AUTHENTICATOR_TYPE: u8 = 80;

/// Application logic for answering a decoded, verified request. Mirrors the
/// teacher's `RadiusServerHandler` trait, generalized to one entry point
/// that returns whatever response packet the caller built rather than
/// separate auth/acct/coa methods tied to specific ports.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, source: SocketAddr, request: Packet) -> Packet;
}

/// Runs the receive loop: decode, resolve secret, verify, dispatch to the
/// handler, encode, send. One instance serves both the auth and accounting
/// ports if bound to both — callers typically run two.
pub struct Server<T: DatagramTransport + 'static> {
    transport: Arc<T>,
    secrets: Arc<dyn SecretStore>,
    dictionary: Arc<Dictionary>,
}

impl<T: DatagramTransport + 'static> Server<T> {
    pub fn new(transport: Arc<T>, secrets: Arc<dyn SecretStore>, dictionary: Arc<Dictionary>) -> Self {
        Self {
            transport,
            secrets,
            dictionary,
        }
    }

    /// Receive, verify, and answer a single request. Returns `Ok(())` once
    /// a response (or deliberate silence, on a malformed/unverifiable
    /// request) has been handled; loops forever in [`Server::run`].
    pub async fn serve_one(&self, handler: &dyn RequestHandler) -> Result<(), Error> {
        let mut buf = vec![0u8; crate::packet::MAX_PACKET_SIZE];
        let (len, source) = self.transport.recv_from(&mut buf).await?;

        let secret = match self.secrets.secret_for(source).await {
            Ok(secret) => secret,
            Err(err) => {
                warn!(%source, "dropping request: {err}");
                return Ok(());
            }
        };

        let request = match Packet::decode(&buf[..len], &self.dictionary) {
            Ok(packet) => packet,
            Err(err) => {
                warn!(%source, "dropping malformed packet: {err}");
                return Ok(());
            }
        };

        if let Err(err) = self.verify_request(&request, &secret) {
            warn!(%source, identifier = request.identifier, "rejecting request: {err}");
            return Ok(());
        }

        let response = handler.handle(source, request.clone()).await;
        match response.encode(&secret, Some(&request.authenticator)) {
            Ok(bytes) => {
                if let Err(err) = self.transport.send_to(source, &bytes).await {
                    error!(%source, "failed to send response: {err}");
                }
            }
            Err(err) => error!(%source, "failed to encode response: {err}"),
        }
        Ok(())
    }

    /// Serve requests until the transport errors out.
    pub async fn run(&self, handler: &dyn RequestHandler) -> Result<(), Error> {
        loop {
            self.serve_one(handler).await?;
        }
    }

    /// Verify an inbound request's integrity: an Accounting-Request's
    /// Request Authenticator must match RFC 2866 §4.1's formula, and any
    /// Message-Authenticator attribute present on any request kind must
    /// verify per RFC 3579 §3.2.
    fn verify_request(&self, request: &Packet, secret: &[u8]) -> Result<(), Error> {
        if request.code == PacketCode::AccountingRequest {
            request.verify_accounting_request(secret)?;
        }
        if let Some(attr) = request.get_attribute(-1, MESSAGE_AUTHENTICATOR_TYPE) {
            let received = match &attr.value {
                crate::attribute::Value::Octets(bytes) if bytes.len() == 16 => bytes.clone(),
                _ => return Err(Error::MalformedAttribute("Message-Authenticator must be 16 bytes".into())),
            };
            let expected = request
                .expected_message_authenticator(secret, &request.authenticator)?
                .expect("get_attribute just confirmed the attribute is present");
            if !crate::crypto::constant_time_eq(&expected, &received) {
                return Err(Error::BadAuthenticator);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{Attribute, Value};
    use crate::secret::StaticSecretStore;
    use crate::transport::UdpTransport;
    use std::net::Ipv4Addr;
    use std::sync::Mutex;

    struct EchoHandler;

    #[async_trait]
    impl RequestHandler for EchoHandler {
        async fn handle(&self, _source: SocketAddr, request: Packet) -> Packet {
            request.response(PacketCode::AccessAccept)
        }
    }

    struct RecordingHandler {
        seen: Mutex<Vec<u8>>,
    }

    #[async_trait]
    impl RequestHandler for RecordingHandler {
        async fn handle(&self, _source: SocketAddr, request: Packet) -> Packet {
            self.seen.lock().unwrap().push(request.identifier);
            request.response(PacketCode::AccessAccept)
        }
    }

    #[tokio::test]
    async fn serve_one_answers_a_well_formed_request() {
        let server_transport = Arc::new(UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap());
        let client_transport = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let server_addr = server_transport.local_addr().unwrap();

        let secrets: Arc<dyn SecretStore> = Arc::new(StaticSecretStore::new().with_secret(Ipv4Addr::LOCALHOST.into(), "s3cret"));
        let dict = Arc::new(Dictionary::with_standard_attributes());
        let server = Server::new(Arc::clone(&server_transport), secrets, dict);

        let request = Packet::access_request(1);
        let bytes = request.encode(b"s3cret", None).unwrap();
        client_transport.send_to(server_addr, &bytes).await.unwrap();

        server.serve_one(&EchoHandler).await.unwrap();

        let mut buf = [0u8; 64];
        let (len, _) = client_transport.recv_from(&mut buf).await.unwrap();
        let dict = Dictionary::with_standard_attributes();
        let response = Packet::decode(&buf[..len], &dict).unwrap();
        assert_eq!(response.code, PacketCode::AccessAccept);
        response.verify_response(b"s3cret", &request.authenticator).unwrap();
    }

    #[tokio::test]
    async fn serve_one_drops_requests_with_unknown_secret() {
        let server_transport = Arc::new(UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap());
        let client_transport = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let server_addr = server_transport.local_addr().unwrap();

        let secrets: Arc<dyn SecretStore> = Arc::new(StaticSecretStore::new());
        let dict = Arc::new(Dictionary::with_standard_attributes());
        let server = Server::new(Arc::clone(&server_transport), secrets, dict);

        let request = Packet::access_request(1);
        let bytes = request.encode(b"s3cret", None).unwrap();
        client_transport.send_to(server_addr, &bytes).await.unwrap();

        let handler = RecordingHandler { seen: Mutex::new(Vec::new()) };
        server.serve_one(&handler).await.unwrap();
        assert!(handler.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn serve_one_rejects_accounting_request_with_bad_authenticator() {
        let server_transport = Arc::new(UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap());
        let client_transport = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let server_addr = server_transport.local_addr().unwrap();

        let secrets: Arc<dyn SecretStore> = Arc::new(StaticSecretStore::new().with_secret(Ipv4Addr::LOCALHOST.into(), "s3cret"));
        let dict = Arc::new(Dictionary::with_standard_attributes());
        let server = Server::new(Arc::clone(&server_transport), secrets, dict);

        let mut request = Packet::new(PacketCode::AccountingRequest, 1, [0u8; 16]);
        request.add_attribute(Attribute::new(-1, 40, Value::Integer(1)));
        let mut bytes = request.encode(b"s3cret", None).unwrap();
        bytes[4] ^= 0xff; // corrupt the authenticator
        client_transport.send_to(server_addr, &bytes).await.unwrap();

        let handler = RecordingHandler { seen: Mutex::new(Vec::new()) };
        server.serve_one(&handler).await.unwrap();
        assert!(handler.seen.lock().unwrap().is_empty());
    }
}
