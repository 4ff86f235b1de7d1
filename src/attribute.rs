//! Typed attribute values (C2): the wire↔typed↔text conversions the
//! dictionary descriptors drive. A tagged `Value` enum plays the role the
//! source's per-type constructor callbacks would — the descriptor carries
//! the type tag, `Value` carries one encode/decode implementation per tag
//! (spec.md §9 design note).

use std::net::{Ipv4Addr, Ipv6Addr};

use bytes::{Buf, BufMut, BytesMut};

use crate::dictionary::{AttributeDescriptor, Dictionary};
use crate::error::Error;

/// The standard Vendor-Specific Attribute type code (RFC 2865 §5.26).
pub const VENDOR_SPECIFIC_TYPE: u8 = 26;

/// Closed set of attribute data types a dictionary descriptor may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    String,
    Octets,
    Integer,
    Date,
    IpV4,
    IpV6,
    IpV6Prefix,
    VendorSpecific,
}

/// A typed attribute value. `VendorSpecific` nests a vendor id and an
/// ordered list of sub-attributes.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Octets(Vec<u8>),
    Integer(u32),
    Date(u32),
    IpV4(Ipv4Addr),
    IpV6(Ipv6Addr),
    IpV6Prefix(Ipv6Addr, u8),
    VendorSpecific(u32, Vec<Attribute>),
}

impl Value {
    fn data_type(&self) -> DataType {
        match self {
            Value::String(_) => DataType::String,
            Value::Octets(_) => DataType::Octets,
            Value::Integer(_) => DataType::Integer,
            Value::Date(_) => DataType::Date,
            Value::IpV4(_) => DataType::IpV4,
            Value::IpV6(_) => DataType::IpV6,
            Value::IpV6Prefix(..) => DataType::IpV6Prefix,
            Value::VendorSpecific(..) => DataType::VendorSpecific,
        }
    }

    /// Serialize this value's bytes only (no type/length header).
    fn encode(&self, buf: &mut BytesMut) -> Result<(), Error> {
        match self {
            Value::String(s) => buf.put_slice(s.as_bytes()),
            Value::Octets(o) => buf.put_slice(o),
            Value::Integer(v) | Value::Date(v) => buf.put_u32(*v),
            Value::IpV4(addr) => buf.put_slice(&addr.octets()),
            Value::IpV6(addr) => buf.put_slice(&addr.octets()),
            Value::IpV6Prefix(addr, prefix_len) => {
                buf.put_u8(0);
                buf.put_u8(*prefix_len);
                buf.put_slice(&addr.octets());
            }
            Value::VendorSpecific(vendor_id, subs) => {
                buf.put_u32(*vendor_id);
                for sub in subs {
                    sub.encode_into(buf)?;
                }
            }
        }
        Ok(())
    }

    fn decode(data_type: DataType, raw: &[u8], dict: &Dictionary) -> Result<Self, Error> {
        match data_type {
            DataType::String => Ok(Value::String(String::from_utf8_lossy(raw).into_owned())),
            DataType::Octets => Ok(Value::Octets(raw.to_vec())),
            DataType::Integer => Ok(Value::Integer(read_u32(raw, "Integer")?)),
            DataType::Date => Ok(Value::Date(read_u32(raw, "Date")?)),
            DataType::IpV4 => {
                if raw.len() != 4 {
                    return Err(malformed("IpV4", raw.len(), 4));
                }
                Ok(Value::IpV4(Ipv4Addr::new(raw[0], raw[1], raw[2], raw[3])))
            }
            DataType::IpV6 => {
                if raw.len() != 16 {
                    return Err(malformed("IpV6", raw.len(), 16));
                }
                let mut octets = [0u8; 16];
                octets.copy_from_slice(raw);
                Ok(Value::IpV6(Ipv6Addr::from(octets)))
            }
            DataType::IpV6Prefix => {
                if raw.len() < 2 || raw.len() > 18 {
                    return Err(Error::MalformedAttribute(format!(
                        "IpV6Prefix value must be 2..=18 bytes, got {}",
                        raw.len()
                    )));
                }
                let prefix_len = raw[1];
                let mut octets = [0u8; 16];
                let addr_bytes = &raw[2..];
                octets[..addr_bytes.len()].copy_from_slice(addr_bytes);
                Ok(Value::IpV6Prefix(Ipv6Addr::from(octets), prefix_len))
            }
            DataType::VendorSpecific => {
                if raw.len() < 4 {
                    return Err(Error::MalformedAttribute(
                        "Vendor-Specific attribute shorter than 4 bytes".into(),
                    ));
                }
                let vendor_id = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
                let subs = Attribute::decode_many(vendor_id as i32, &raw[4..], dict)?;
                Ok(Value::VendorSpecific(vendor_id, subs))
            }
        }
    }
}

fn read_u32(raw: &[u8], name: &str) -> Result<u32, Error> {
    if raw.len() != 4 {
        return Err(malformed(name, raw.len(), 4));
    }
    Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

fn malformed(name: &str, got: usize, expected: usize) -> Error {
    Error::MalformedAttribute(format!("{name} value must be {expected} bytes, got {got}"))
}

/// A single wire attribute: `(vendor_id, type_code)` identify it the same
/// way an `AttributeDescriptor` does; `-1` is the standard (non-vendor)
/// namespace. The attribute does not carry its own name — the dictionary
/// is the single source of truth for that, per spec.md §9.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub vendor_id: i32,
    pub type_code: u8,
    pub value: Value,
}

impl Attribute {
    /// Build an attribute directly from a vendor id, type code, and value,
    /// bypassing dictionary lookup. Used internally for nested
    /// Vendor-Specific sub-attributes and by callers who already hold a
    /// descriptor.
    pub fn new(vendor_id: i32, type_code: u8, value: Value) -> Self {
        Self {
            vendor_id,
            type_code,
            value,
        }
    }

    /// Build an attribute from raw wire bytes for a known `(vendor_id,
    /// type_code)` pair, looking up the data type in `dict`. Unknown pairs
    /// decode to an opaque `Octets` value so round-trips are preserved.
    pub fn from_wire(vendor_id: i32, type_code: u8, raw: &[u8], dict: &Dictionary) -> Result<Self, Error> {
        let data_type = dict
            .get_by_code(vendor_id, type_code)
            .map(|d| d.data_type)
            .unwrap_or(DataType::Octets);
        let value = Value::decode(data_type, raw, dict)?;
        Ok(Self::new(vendor_id, type_code, value))
    }

    /// Build an attribute from raw bytes supplied by the caller (not from
    /// the wire), resolved by attribute name. `Vendor-Specific` cannot be
    /// constructed this way — use [`Attribute::vendor_specific`].
    pub fn from_name_bytes(dict: &Dictionary, name: &str, raw: &[u8]) -> Result<Self, Error> {
        let descriptor = dict
            .get_by_name(name)
            .ok_or_else(|| Error::InvalidValue {
                name: name.to_string(),
                reason: "unknown attribute name".to_string(),
            })?
            .clone();
        if descriptor.data_type == DataType::VendorSpecific {
            return Err(Error::InvalidValue {
                name: name.to_string(),
                reason: "Vendor-Specific attributes must be built via vendor_specific()".to_string(),
            });
        }
        let value = Value::decode(descriptor.data_type, raw, dict)?;
        Ok(Self::new(descriptor.vendor_id, descriptor.type_code, value))
    }

    /// Build an attribute by parsing human-readable text per the
    /// descriptor's data type (`Integer` accepts decimal or an enumeration
    /// name; `IpV4`/`IpV6` accept textual addresses; `String` is taken
    /// as-is). `Octets` and `Vendor-Specific` reject string construction.
    pub fn from_name_str(dict: &Dictionary, name: &str, text: &str) -> Result<Self, Error> {
        let descriptor = dict
            .get_by_name(name)
            .ok_or_else(|| Error::InvalidValue {
                name: name.to_string(),
                reason: "unknown attribute name".to_string(),
            })?
            .clone();

        let invalid = |reason: &str| Error::InvalidValue {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let value = match descriptor.data_type {
            DataType::String => Value::String(text.to_string()),
            DataType::Octets => return Err(invalid("Octets attributes cannot be built from text")),
            DataType::Integer => {
                let n = if let Some(v) = descriptor.enumeration.value_of(text) {
                    v as u32
                } else {
                    text.parse::<u32>()
                        .map_err(|_| invalid("expected a decimal integer or enumeration name"))?
                };
                Value::Integer(n)
            }
            DataType::Date => {
                let n = text.parse::<u32>().map_err(|_| invalid("expected seconds since epoch"))?;
                Value::Date(n)
            }
            DataType::IpV4 => {
                let addr: Ipv4Addr = text.parse().map_err(|_| invalid("expected a dotted-quad IPv4 address"))?;
                Value::IpV4(addr)
            }
            DataType::IpV6 => {
                let addr: Ipv6Addr = text.parse().map_err(|_| invalid("expected an IPv6 address"))?;
                Value::IpV6(addr)
            }
            DataType::IpV6Prefix => {
                let (addr_text, len_text) = text
                    .split_once('/')
                    .ok_or_else(|| invalid("expected address/prefix-length"))?;
                let addr: Ipv6Addr = addr_text.parse().map_err(|_| invalid("expected an IPv6 address"))?;
                let prefix_len: u8 = len_text.parse().map_err(|_| invalid("expected a numeric prefix length"))?;
                Value::IpV6Prefix(addr, prefix_len)
            }
            DataType::VendorSpecific => {
                return Err(invalid("Vendor-Specific attributes must be built via vendor_specific()"))
            }
        };
        Ok(Self::new(descriptor.vendor_id, descriptor.type_code, value))
    }

    /// Build a Vendor-Specific Attribute by nesting sub-attributes under a
    /// vendor id — the only constructor VSAs support (spec.md §4.2).
    pub fn vendor_specific(vendor_id: u32, sub_attributes: Vec<Attribute>) -> Self {
        Self::new(-1, VENDOR_SPECIFIC_TYPE, Value::VendorSpecific(vendor_id, sub_attributes))
    }

    /// Look up this attribute's descriptor, if the dictionary knows one.
    pub fn descriptor<'d>(&self, dict: &'d Dictionary) -> Option<&'d AttributeDescriptor> {
        dict.get_by_code(self.vendor_id, self.type_code)
    }

    /// Human-readable name, falling back to a synthetic `Unknown-<code>`
    /// form for attributes the dictionary doesn't recognise.
    pub fn name(&self, dict: &Dictionary) -> String {
        match self.descriptor(dict) {
            Some(d) => d.name.clone(),
            None if self.vendor_id < 0 => format!("Unknown-{}", self.type_code),
            None => format!("Unknown-Vendor-{}-{}", self.vendor_id, self.type_code),
        }
    }

    /// Encode this attribute's `[type][length][value...]` wire form,
    /// appending to `buf`. Fails with `InvalidValue` if the resulting
    /// attribute would exceed the 255-byte maximum a single attribute can
    /// carry (length is a single byte).
    pub fn encode_into(&self, buf: &mut BytesMut) -> Result<(), Error> {
        let mut value_buf = BytesMut::new();
        self.value.encode(&mut value_buf)?;
        let total = 2 + value_buf.len();
        if total > 255 {
            return Err(Error::InvalidValue {
                name: format!("type {}", self.type_code),
                reason: format!("encoded attribute would be {total} bytes, maximum is 255"),
            });
        }
        buf.put_u8(self.type_code);
        buf.put_u8(total as u8);
        buf.put_slice(&value_buf);
        Ok(())
    }

    /// Encode this attribute's wire form into a fresh buffer.
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let mut buf = BytesMut::new();
        self.encode_into(&mut buf)?;
        Ok(buf.to_vec())
    }

    /// Parse a sequence of sibling attributes (each `[type][len][value]`)
    /// out of `data`, all sharing `vendor_id` (`-1` for the packet's
    /// top-level attribute list).
    pub fn decode_many(vendor_id: i32, data: &[u8], dict: &Dictionary) -> Result<Vec<Attribute>, Error> {
        let mut cursor = data;
        let mut attrs = Vec::new();
        while cursor.has_remaining() {
            if cursor.remaining() < 2 {
                return Err(Error::MalformedAttribute("incomplete attribute header".into()));
            }
            let type_code = cursor.chunk()[0];
            let length = cursor.chunk()[1] as usize;
            if length < 2 {
                return Err(Error::MalformedAttribute(format!(
                    "attribute length {length} is less than the 2-byte header"
                )));
            }
            if length > cursor.remaining() {
                return Err(Error::MalformedAttribute(
                    "attribute extends beyond its parent".into(),
                ));
            }
            let value_raw = &cursor.chunk()[2..length];
            attrs.push(Self::from_wire(vendor_id, type_code, value_raw, dict)?);
            cursor.advance(length);
        }
        Ok(attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Dictionary;

    #[test]
    fn string_attribute_round_trips() {
        let dict = Dictionary::with_standard_attributes();
        let attr = Attribute::from_name_str(&dict, "User-Name", "nemo").unwrap();
        let bytes = attr.encode().unwrap();
        assert_eq!(bytes[0], 1); // User-Name type code
        assert_eq!(bytes[1] as usize, bytes.len());

        let decoded = Attribute::from_wire(-1, bytes[0], &bytes[2..], &dict).unwrap();
        assert_eq!(decoded, attr);
        assert_eq!(decoded.name(&dict), "User-Name");
    }

    #[test]
    fn integer_attribute_accepts_enum_name_or_decimal() {
        let dict = Dictionary::with_standard_attributes();
        let by_name = Attribute::from_name_str(&dict, "Service-Type", "Login-User").unwrap();
        let by_decimal = Attribute::from_name_str(&dict, "Service-Type", "1").unwrap();
        assert_eq!(by_name, by_decimal);
    }

    #[test]
    fn octets_attribute_rejects_string_construction() {
        let dict = Dictionary::with_standard_attributes();
        let err = Attribute::from_name_str(&dict, "State", "anything").unwrap_err();
        assert!(matches!(err, Error::InvalidValue { .. }));
    }

    #[test]
    fn vendor_specific_round_trips() {
        let dict = Dictionary::with_standard_attributes();
        let sub = Attribute::new(9, 1, Value::Octets(b"shell:priv-lvl=15".to_vec()));
        let vsa = Attribute::vendor_specific(9, vec![sub.clone()]);
        let bytes = vsa.encode().unwrap();

        assert_eq!(bytes[0], VENDOR_SPECIFIC_TYPE);
        assert_eq!(&bytes[2..6], &9u32.to_be_bytes());
        assert_eq!(bytes[6], 1); // sub-attribute type
        assert_eq!(bytes[7] as usize, 2 + b"shell:priv-lvl=15".len());

        let decoded = Attribute::from_wire(-1, bytes[0], &bytes[2..], &dict).unwrap();
        match decoded.value {
            Value::VendorSpecific(vendor_id, subs) => {
                assert_eq!(vendor_id, 9);
                assert_eq!(subs, vec![sub]);
            }
            other => panic!("expected VendorSpecific, got {other:?}"),
        }
    }

    #[test]
    fn vendor_specific_rejects_typed_constructors() {
        let dict = Dictionary::with_standard_attributes();
        assert!(Attribute::from_name_bytes(&dict, "Vendor-Specific", b"\0\0\0\x09").is_err());
        assert!(Attribute::from_name_str(&dict, "Vendor-Specific", "x").is_err());
    }

    #[test]
    fn unknown_attribute_round_trips_as_octets() {
        let dict = Dictionary::with_standard_attributes();
        let raw = [0xde, 0xad, 0xbe, 0xef];
        let decoded = Attribute::from_wire(-1, 250, &raw, &dict).unwrap();
        assert_eq!(decoded.value, Value::Octets(raw.to_vec()));
        assert_eq!(decoded.name(&dict), "Unknown-250");

        let bytes = decoded.encode().unwrap();
        assert_eq!(&bytes[2..], &raw);
    }

    #[test]
    fn malformed_attribute_length_is_rejected() {
        let dict = Dictionary::with_standard_attributes();
        // length byte of 1 is shorter than the 2-byte header itself.
        let err = Attribute::decode_many(-1, &[1, 1], &dict).unwrap_err();
        assert!(matches!(err, Error::MalformedAttribute(_)));
    }

    #[test]
    fn attribute_overrunning_parent_is_rejected() {
        let dict = Dictionary::with_standard_attributes();
        let err = Attribute::decode_many(-1, &[1, 10, b'a', b'b'], &dict).unwrap_err();
        assert!(matches!(err, Error::MalformedAttribute(_)));
    }

    #[test]
    fn ipv6_prefix_accepts_short_address_forms() {
        let dict = Dictionary::with_standard_attributes();
        // reserved, prefix-len=64, and only 4 bytes of address.
        let raw = [0u8, 64, 0x20, 0x01, 0x0d, 0xb8];
        let value = Value::decode(DataType::IpV6Prefix, &raw, &dict).unwrap();
        match value {
            Value::IpV6Prefix(addr, len) => {
                assert_eq!(len, 64);
                assert_eq!(addr.octets()[..4], [0x20, 0x01, 0x0d, 0xb8]);
                assert_eq!(addr.octets()[4..], [0u8; 12]);
            }
            other => panic!("expected IpV6Prefix, got {other:?}"),
        }
    }
}
