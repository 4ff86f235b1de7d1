//! Packet codec (C4): encode/decode of the 20-byte header + attribute
//! list, and the authenticator/Message-Authenticator computations spec.md
//! §4.1 defines.

use bytes::{Buf, BufMut, BytesMut};
use rand::RngCore;

use crate::attribute::{Attribute, VENDOR_SPECIFIC_TYPE};
use crate::crypto;
use crate::dictionary::Dictionary;
use crate::error::Error;

/// Maximum size of a RADIUS packet on the wire (spec.md §3).
pub const MAX_PACKET_SIZE: usize = 4096;
/// Size of the fixed packet header: code, identifier, length, authenticator.
pub const HEADER_SIZE: usize = 20;

const MESSAGE_AUTHENTICATOR_TYPE: u8 = 80;

/// RADIUS packet codes this crate's core knows (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketCode {
    AccessRequest,
    AccessAccept,
    AccessReject,
    AccountingRequest,
    AccountingResponse,
    AccessChallenge,
    StatusServer,
    StatusClient,
}

impl PacketCode {
    pub fn as_u8(self) -> u8 {
        match self {
            PacketCode::AccessRequest => 1,
            PacketCode::AccessAccept => 2,
            PacketCode::AccessReject => 3,
            PacketCode::AccountingRequest => 4,
            PacketCode::AccountingResponse => 5,
            PacketCode::AccessChallenge => 11,
            PacketCode::StatusServer => 12,
            PacketCode::StatusClient => 13,
        }
    }

    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::AccessRequest),
            2 => Some(Self::AccessAccept),
            3 => Some(Self::AccessReject),
            4 => Some(Self::AccountingRequest),
            5 => Some(Self::AccountingResponse),
            11 => Some(Self::AccessChallenge),
            12 => Some(Self::StatusServer),
            13 => Some(Self::StatusClient),
            _ => None,
        }
    }

    /// Whether this packet kind is self-authenticating at encode time —
    /// either a random Request Authenticator the caller already chose
    /// (Access-Request, Status-Server) or one computed entirely from the
    /// packet's own contents (Accounting-Request, per spec.md §4.1) —
    /// rather than one that must be supplied from the request being
    /// replied to.
    pub fn carries_request_authenticator(self) -> bool {
        matches!(
            self,
            PacketCode::AccessRequest | PacketCode::StatusServer | PacketCode::AccountingRequest
        )
    }
}

/// A RADIUS packet: header fields plus an ordered attribute list.
/// Attribute order is preserved end to end — it's semantically significant
/// for EAP-Message fragments (spec.md §3).
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub code: PacketCode,
    pub identifier: u8,
    pub authenticator: [u8; 16],
    pub attributes: Vec<Attribute>,
}

impl Packet {
    pub fn new(code: PacketCode, identifier: u8, authenticator: [u8; 16]) -> Self {
        Self {
            code,
            identifier,
            authenticator,
            attributes: Vec::new(),
        }
    }

    /// Build an Access-Request with a freshly generated random Request
    /// Authenticator (spec.md §3 invariant).
    pub fn access_request(identifier: u8) -> Self {
        let mut ra = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut ra);
        Self::new(PacketCode::AccessRequest, identifier, ra)
    }

    /// Build a response sharing this request's identifier (the caller
    /// supplies the authenticator; it's computed at encode time).
    pub fn response(&self, code: PacketCode) -> Self {
        Self::new(code, self.identifier, [0u8; 16])
    }

    pub fn add_attribute(&mut self, attribute: Attribute) -> &mut Self {
        self.attributes.push(attribute);
        self
    }

    pub fn get_attribute(&self, vendor_id: i32, type_code: u8) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.vendor_id == vendor_id && a.type_code == type_code)
    }

    pub fn get_attribute_by_name<'a>(&'a self, dict: &Dictionary, name: &str) -> Option<&'a Attribute> {
        let descriptor = dict.get_by_name(name)?;
        self.get_attribute(descriptor.vendor_id, descriptor.type_code)
    }

    fn message_authenticator_index(&self) -> Option<usize> {
        self.attributes
            .iter()
            .position(|a| a.vendor_id == -1 && a.type_code == MESSAGE_AUTHENTICATOR_TYPE)
    }

    /// Serialize every attribute in order into one buffer.
    fn encode_attributes(attributes: &[Attribute]) -> Result<BytesMut, Error> {
        let mut buf = BytesMut::new();
        for attr in attributes {
            attr.encode_into(&mut buf)?;
        }
        Ok(buf)
    }

    /// Encode this packet to wire bytes using `secret`.
    ///
    /// `request_authenticator` must be supplied for response kinds
    /// (Access-Accept/Reject/Challenge, Accounting-Response) — it's the
    /// Request Authenticator from the packet being replied to. It's
    /// ignored for request kinds, which carry their own authenticator.
    ///
    /// If a Message-Authenticator attribute is present, its value is
    /// zeroed, the HMAC-MD5 is computed over the provisional packet, the
    /// attribute is patched with the result, and only then is the outer
    /// authenticator computed over the final attribute bytes (spec.md
    /// §4.1, §9).
    pub fn encode(&self, secret: &[u8], request_authenticator: Option<&[u8; 16]>) -> Result<Vec<u8>, Error> {
        let mut attributes = self.attributes.clone();

        let header_authenticator = if self.code.carries_request_authenticator() {
            self.authenticator
        } else {
            *request_authenticator.ok_or_else(|| {
                Error::MalformedPacket("response packet kinds require the request's authenticator to encode".into())
            })?
        };

        if let Some(idx) = self.message_authenticator_index() {
            let mac = self
                .expected_message_authenticator(secret, &header_authenticator)?
                .expect("message_authenticator_index just confirmed the attribute is present");
            attributes[idx] = Attribute::new(-1, MESSAGE_AUTHENTICATOR_TYPE, crate::attribute::Value::Octets(mac.to_vec()));
        }

        let encoded_attrs = Self::encode_attributes(&attributes)?;
        let length = HEADER_SIZE + encoded_attrs.len();
        if length > MAX_PACKET_SIZE {
            return Err(Error::PacketTooLong(length));
        }

        let authenticator = match self.code {
            PacketCode::AccessRequest | PacketCode::StatusServer => self.authenticator,
            PacketCode::AccountingRequest => {
                crypto::accounting_authenticator(self.code.as_u8(), self.identifier, length as u16, &encoded_attrs, secret)
            }
            PacketCode::AccessAccept
            | PacketCode::AccessReject
            | PacketCode::AccessChallenge
            | PacketCode::AccountingResponse
            | PacketCode::StatusClient => crypto::response_authenticator(
                self.code.as_u8(),
                self.identifier,
                length as u16,
                &header_authenticator,
                &encoded_attrs,
                secret,
            ),
        };

        let mut out = BytesMut::with_capacity(length);
        out.put_u8(self.code.as_u8());
        out.put_u8(self.identifier);
        out.put_u16(length as u16);
        out.put_slice(&authenticator);
        out.put_slice(&encoded_attrs);
        Ok(out.to_vec())
    }

    /// Build the header-plus-attributes buffer HMAC-MD5 is computed over
    /// for a Message-Authenticator, using `authenticator` as the header's
    /// authenticator field verbatim (no computation). Used both while
    /// encoding (with the outer authenticator not yet known) and while
    /// verifying an inbound Message-Authenticator (with the attribute
    /// itself zeroed by the caller first).
    fn header_and_attributes(&self, authenticator: &[u8; 16]) -> Result<Vec<u8>, Error> {
        let encoded_attrs = Self::encode_attributes(&self.attributes)?;
        let length = HEADER_SIZE + encoded_attrs.len();
        if length > MAX_PACKET_SIZE {
            return Err(Error::PacketTooLong(length));
        }
        let mut buf = BytesMut::with_capacity(length);
        buf.put_u8(self.code.as_u8());
        buf.put_u8(self.identifier);
        buf.put_u16(length as u16);
        buf.put_slice(authenticator);
        buf.put_slice(&encoded_attrs);
        Ok(buf.to_vec())
    }

    /// Recompute the HMAC-MD5 this packet's Message-Authenticator
    /// attribute should carry, given the request's authenticator to put in
    /// the header (the same value the original sender used) and the
    /// attribute itself zeroed out. Returns `None` if there's no
    /// Message-Authenticator attribute present.
    pub fn expected_message_authenticator(&self, secret: &[u8], header_authenticator: &[u8; 16]) -> Result<Option<[u8; 16]>, Error> {
        let Some(idx) = self.message_authenticator_index() else {
            return Ok(None);
        };
        let mut zeroed = self.clone();
        zeroed.attributes[idx] = Attribute::new(-1, MESSAGE_AUTHENTICATOR_TYPE, crate::attribute::Value::Octets(vec![0u8; 16]));
        let buf = zeroed.header_and_attributes(header_authenticator)?;
        Ok(Some(crypto::hmac_md5(secret, &buf)))
    }

    /// Decode a packet from wire bytes, using `dict` to interpret
    /// attribute data types. Attributes beyond `length - 20` are never
    /// touched even if `buf` holds trailing garbage.
    pub fn decode(buf: &[u8], dict: &Dictionary) -> Result<Self, Error> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::MalformedPacket(format!(
                "header requires {HEADER_SIZE} bytes, got {}",
                buf.len()
            )));
        }
        let mut header = &buf[..HEADER_SIZE];
        let code_byte = header.get_u8();
        let identifier = header.get_u8();
        let length = header.get_u16() as usize;
        let mut authenticator = [0u8; 16];
        authenticator.copy_from_slice(&header[..16]);

        if length < HEADER_SIZE {
            return Err(Error::MalformedPacket(format!("length field {length} is shorter than the header")));
        }
        if length > MAX_PACKET_SIZE {
            return Err(Error::MalformedPacket(format!("length field {length} exceeds {MAX_PACKET_SIZE}")));
        }
        if length > buf.len() {
            return Err(Error::MalformedPacket(format!(
                "length field {length} exceeds buffer of {} bytes",
                buf.len()
            )));
        }

        let code = PacketCode::from_u8(code_byte).ok_or(Error::UnknownPacketType(code_byte))?;
        let attributes = Attribute::decode_many(-1, &buf[HEADER_SIZE..length], dict)?;

        Ok(Self {
            code,
            identifier,
            authenticator,
            attributes,
        })
    }

    /// Verify this (received) response packet's authenticator against the
    /// original request's authenticator and the shared secret.
    pub fn verify_response(&self, secret: &[u8], request_authenticator: &[u8; 16]) -> Result<(), Error> {
        let encoded_attrs = Self::encode_attributes(&self.attributes)?;
        let length = HEADER_SIZE + encoded_attrs.len();
        let expected = crypto::response_authenticator(
            self.code.as_u8(),
            self.identifier,
            length as u16,
            request_authenticator,
            &encoded_attrs,
            secret,
        );
        if crypto::constant_time_eq(&expected, &self.authenticator) {
            Ok(())
        } else {
            Err(Error::BadAuthenticator)
        }
    }

    /// Verify an Accounting-Request's authenticator: `MD5(header with
    /// authenticator zeroed ‖ attributes ‖ secret)` (spec.md §4.6).
    pub fn verify_accounting_request(&self, secret: &[u8]) -> Result<(), Error> {
        let encoded_attrs = Self::encode_attributes(&self.attributes)?;
        let length = HEADER_SIZE + encoded_attrs.len();
        let expected = crypto::accounting_authenticator(self.code.as_u8(), self.identifier, length as u16, &encoded_attrs, secret);
        if crypto::constant_time_eq(&expected, &self.authenticator) {
            Ok(())
        } else {
            Err(Error::BadAuthenticator)
        }
    }

    /// Whether this packet carries a Vendor-Specific attribute at all
    /// (helper for callers scanning for VSAs without a dictionary).
    pub fn has_vendor_specific(&self) -> bool {
        self.attributes.iter().any(|a| a.type_code == VENDOR_SPECIFIC_TYPE && a.vendor_id == -1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Value;
    use crate::dictionary::Dictionary;

    fn dict() -> Dictionary {
        Dictionary::with_standard_attributes()
    }

    #[test]
    fn access_request_round_trips() {
        let dict = dict();
        let mut req = Packet::access_request(0x2a);
        req.add_attribute(Attribute::from_name_str(&dict, "User-Name", "nemo").unwrap());
        let hidden = crypto::hide_password(b"arctangent", &req.authenticator, b"xyzzy5461");
        req.add_attribute(Attribute::new(-1, 2, Value::Octets(hidden)));

        let bytes = req.encode(b"xyzzy5461", None).unwrap();
        let decoded = Packet::decode(&bytes, &dict).unwrap();

        assert_eq!(decoded.identifier, 0x2a);
        assert_eq!(decoded.code, PacketCode::AccessRequest);
        let username = decoded.get_attribute_by_name(&dict, "User-Name").unwrap();
        assert_eq!(username.value, Value::String("nemo".to_string()));
    }

    #[test]
    fn accounting_request_authenticator_round_trips_and_detects_tamper() {
        let dict = dict();
        let mut req = Packet::new(PacketCode::AccountingRequest, 5, [0u8; 16]);
        req.add_attribute(Attribute::from_name_str(&dict, "NAS-Port", "1").unwrap());
        req.add_attribute(Attribute::from_name_str(&dict, "Acct-Status-Type", "Start").unwrap());

        let bytes = req.encode(b"s3cret", None).unwrap();
        let decoded = Packet::decode(&bytes, &dict).unwrap();
        decoded.verify_accounting_request(b"s3cret").unwrap();

        // Flipping one attribute byte must break verification.
        let mut tampered = bytes.clone();
        *tampered.last_mut().unwrap() ^= 0x01;
        let tampered_packet = Packet::decode(&tampered, &dict).unwrap();
        assert!(tampered_packet.verify_accounting_request(b"s3cret").is_err());
    }

    #[test]
    fn response_verification_round_trips_and_detects_tamper() {
        let dict = dict();
        let req = Packet::access_request(7);
        let mut resp = req.response(PacketCode::AccessAccept);
        resp.add_attribute(Attribute::from_name_str(&dict, "Reply-Message", "welcome").unwrap());

        let bytes = resp.encode(b"secret123456789", Some(&req.authenticator)).unwrap();
        let decoded = Packet::decode(&bytes, &dict).unwrap();
        decoded.verify_response(b"secret123456789", &req.authenticator).unwrap();

        let mut tampered = decoded.clone();
        tampered.authenticator[0] ^= 0xff;
        assert_eq!(tampered.verify_response(b"secret123456789", &req.authenticator), Err(Error::BadAuthenticator));
    }

    #[test]
    fn message_authenticator_is_patched_before_outer_authenticator() {
        let dict = dict();
        let req = Packet::access_request(9);
        let mut resp = req.response(PacketCode::AccessAccept);
        resp.add_attribute(Attribute::new(-1, 80, Value::Octets(vec![0u8; 16])));

        let bytes = resp.encode(b"secret123456789", Some(&req.authenticator)).unwrap();
        let decoded = Packet::decode(&bytes, &dict).unwrap();

        let ma = decoded.get_attribute(-1, 80).unwrap();
        assert_ne!(ma.value, Value::Octets(vec![0u8; 16]), "placeholder must be replaced with a real HMAC");
        decoded.verify_response(b"secret123456789", &req.authenticator).unwrap();
    }

    #[test]
    fn decode_rejects_truncated_header() {
        let dict = dict();
        assert!(Packet::decode(&[1, 2, 3], &dict).is_err());
    }

    #[test]
    fn decode_rejects_length_past_buffer() {
        let dict = dict();
        let mut buf = vec![1, 1, 0, 30];
        buf.extend_from_slice(&[0u8; 16]);
        assert!(Packet::decode(&buf, &dict).is_err());
    }

    #[test]
    fn decode_rejects_unknown_packet_code() {
        let dict = dict();
        let mut buf = vec![99, 1, 0, 20];
        buf.extend_from_slice(&[0u8; 16]);
        assert!(matches!(Packet::decode(&buf, &dict), Err(Error::UnknownPacketType(99))));
    }

    #[test]
    fn packet_too_long_is_rejected_at_encode() {
        let dict = dict();
        let mut req = Packet::access_request(1);
        // One 255-byte attribute is fine; enough of them overflow 4096.
        for _ in 0..20 {
            req.add_attribute(Attribute::from_name_bytes(&dict, "State", &[0u8; 253]).unwrap());
        }
        assert_eq!(req.encode(b"secret", None), Err(Error::PacketTooLong(20 + 255 * 20)));
    }
}
