//! The attribute registry (C3): maps `(vendor_id, type_code)` and `name` to
//! an [`AttributeDescriptor`], and resolves enumeration values both ways.
//! Built once at startup and read-only thereafter (spec.md §5) — a single
//! immutable value shared across worker threads needs no synchronization.

use std::collections::HashMap;

/// Int↔string enumeration for an `Integer`-typed attribute (e.g.
/// `Service-Type`'s `Login-User = 1`). Lookup by name is linear — these
/// sets are small (a handful to a few dozen entries).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enumeration(Vec<(i32, String)>);

impl Enumeration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: i32, name: impl Into<String>) {
        self.0.push((value, name.into()));
    }

    pub fn name_of(&self, value: i32) -> Option<&str> {
        self.0.iter().find(|(v, _)| *v == value).map(|(_, n)| n.as_str())
    }

    pub fn value_of(&self, name: &str) -> Option<i32> {
        self.0.iter().find(|(_, n)| n == name).map(|(v, _)| *v)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A dictionary entry. `vendor_id == -1` means the standard (non-vendor)
/// attribute space; otherwise `type_code` is a sub-attribute number within
/// that vendor's Vendor-Specific attribute. Two descriptors are equal iff
/// `(vendor_id, type_code)` matches (spec.md §3).
#[derive(Debug, Clone)]
pub struct AttributeDescriptor {
    pub vendor_id: i32,
    pub type_code: u8,
    pub name: String,
    pub data_type: crate::attribute::DataType,
    pub enumeration: Enumeration,
}

impl PartialEq for AttributeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.vendor_id == other.vendor_id && self.type_code == other.type_code
    }
}
impl Eq for AttributeDescriptor {}

impl AttributeDescriptor {
    pub fn standard(type_code: u8, name: &str, data_type: crate::attribute::DataType) -> Self {
        Self {
            vendor_id: -1,
            type_code,
            name: name.to_string(),
            data_type,
            enumeration: Enumeration::new(),
        }
    }

    pub fn vendor(vendor_id: u32, type_code: u8, name: &str, data_type: crate::attribute::DataType) -> Self {
        Self {
            vendor_id: vendor_id as i32,
            type_code,
            name: name.to_string(),
            data_type,
            enumeration: Enumeration::new(),
        }
    }

    pub fn with_enum(mut self, enumeration: Enumeration) -> Self {
        self.enumeration = enumeration;
        self
    }
}

/// The attribute registry. Two indices (by `(vendor_id, type_code)` and by
/// `name`) back the forward/reverse lookups spec.md §4.2 describes.
/// `(type_code == 26, vendor_id == -1)` — the Vendor-Specific attribute
/// itself — is always present and cannot be overridden with a
/// differently-typed descriptor, since the codec relies on it decoding
/// through the nested `VendorSpecific` path (spec.md §3 invariant).
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    by_code: HashMap<(i32, u8), AttributeDescriptor>,
    by_name: HashMap<String, (i32, u8)>,
}

impl Dictionary {
    /// An empty dictionary with no descriptors at all, not even
    /// Vendor-Specific. Mostly useful for tests that want to exercise the
    /// "unknown attribute" decode path from a clean slate.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A dictionary pre-populated with the RFC 2865/2866/3579 standard
    /// attribute set and the common enumerations needed to parse their
    /// text forms, matching the reference server's own built-in table.
    /// Loading further descriptors from an on-disk dictionary file is an
    /// external concern (spec.md §6) — use [`Dictionary::insert`] /
    /// [`Dictionary::insert_vendor`] to extend this programmatically.
    pub fn with_standard_attributes() -> Self {
        use crate::attribute::DataType::*;

        let mut dict = Self::empty();

        let standard: &[(u8, &str, crate::attribute::DataType)] = &[
            (1, "User-Name", String),
            (2, "User-Password", String),
            (3, "CHAP-Password", Octets),
            (4, "NAS-IP-Address", IpV4),
            (5, "NAS-Port", Integer),
            (6, "Service-Type", Integer),
            (7, "Framed-Protocol", Integer),
            (8, "Framed-IP-Address", IpV4),
            (9, "Framed-IP-Netmask", IpV4),
            (10, "Framed-Routing", Integer),
            (11, "Filter-Id", String),
            (12, "Framed-MTU", Integer),
            (13, "Framed-Compression", Integer),
            (14, "Login-IP-Host", IpV4),
            (15, "Login-Service", Integer),
            (16, "Login-TCP-Port", Integer),
            (18, "Reply-Message", String),
            (19, "Callback-Number", String),
            (20, "Callback-Id", String),
            (22, "Framed-Route", String),
            (23, "Framed-IPX-Network", Integer),
            (24, "State", Octets),
            (25, "Class", Octets),
            (26, "Vendor-Specific", VendorSpecific),
            (27, "Session-Timeout", Integer),
            (28, "Idle-Timeout", Integer),
            (29, "Termination-Action", Integer),
            (30, "Called-Station-Id", String),
            (31, "Calling-Station-Id", String),
            (32, "NAS-Identifier", String),
            (33, "Proxy-State", Octets),
            (34, "Login-LAT-Service", String),
            (35, "Login-LAT-Node", String),
            (36, "Login-LAT-Group", Octets),
            (37, "Framed-AppleTalk-Link", Integer),
            (38, "Framed-AppleTalk-Network", Integer),
            (39, "Framed-AppleTalk-Zone", String),
            (40, "Acct-Status-Type", Integer),
            (41, "Acct-Delay-Time", Integer),
            (42, "Acct-Input-Octets", Integer),
            (43, "Acct-Output-Octets", Integer),
            (44, "Acct-Session-Id", String),
            (45, "Acct-Authentic", Integer),
            (46, "Acct-Session-Time", Integer),
            (47, "Acct-Input-Packets", Integer),
            (48, "Acct-Output-Packets", Integer),
            (49, "Acct-Terminate-Cause", Integer),
            (60, "CHAP-Challenge", Octets),
            (61, "NAS-Port-Type", Integer),
            (62, "Port-Limit", Integer),
            (63, "Login-LAT-Port", String),
            (77, "Connect-Info", String),
            (79, "EAP-Message", Octets),
            (80, "Message-Authenticator", Octets),
            (95, "NAS-IPv6-Address", IpV6),
            (97, "Framed-Interface-Id", Octets),
            (98, "Framed-IPv6-Prefix", IpV6Prefix),
        ];
        for (code, name, data_type) in standard {
            dict.insert(AttributeDescriptor::standard(*code, name, *data_type));
        }

        let mut service_type = Enumeration::new();
        for (v, n) in [
            (1, "Login-User"),
            (2, "Framed-User"),
            (3, "Callback-Login-User"),
            (4, "Callback-Framed-User"),
            (5, "Outbound-User"),
            (6, "Administrative-User"),
            (7, "NAS-Prompt-User"),
            (8, "Authenticate-Only"),
        ] {
            service_type.insert(v, n);
        }
        dict.set_enumeration(-1, 6, service_type);

        let mut framed_protocol = Enumeration::new();
        framed_protocol.insert(1, "PPP");
        framed_protocol.insert(2, "SLIP");
        dict.set_enumeration(-1, 7, framed_protocol);

        let mut acct_status_type = Enumeration::new();
        acct_status_type.insert(1, "Start");
        acct_status_type.insert(2, "Stop");
        acct_status_type.insert(3, "Interim-Update");
        acct_status_type.insert(7, "Accounting-On");
        acct_status_type.insert(8, "Accounting-Off");
        dict.set_enumeration(-1, 40, acct_status_type);

        dict
    }

    /// Insert or replace a standard (`vendor_id == -1`) descriptor.
    pub fn insert(&mut self, descriptor: AttributeDescriptor) {
        let key = (descriptor.vendor_id, descriptor.type_code);
        self.by_name.insert(descriptor.name.clone(), key);
        self.by_code.insert(key, descriptor);
    }

    /// Insert or replace a vendor sub-attribute descriptor.
    pub fn insert_vendor(&mut self, descriptor: AttributeDescriptor) {
        self.insert(descriptor);
    }

    /// Attach or replace the enumeration for an existing descriptor.
    /// No-op if the `(vendor_id, type_code)` pair isn't registered.
    pub fn set_enumeration(&mut self, vendor_id: i32, type_code: u8, enumeration: Enumeration) {
        if let Some(d) = self.by_code.get_mut(&(vendor_id, type_code)) {
            d.enumeration = enumeration;
        }
    }

    pub fn get_by_code(&self, vendor_id: i32, type_code: u8) -> Option<&AttributeDescriptor> {
        self.by_code.get(&(vendor_id, type_code))
    }

    pub fn get_by_name(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.by_name.get(name).and_then(|key| self.by_code.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::DataType;

    #[test]
    fn standard_dictionary_resolves_by_code_and_name() {
        let dict = Dictionary::with_standard_attributes();
        let by_code = dict.get_by_code(-1, 1).unwrap();
        let by_name = dict.get_by_name("User-Name").unwrap();
        assert_eq!(by_code, by_name);
        assert_eq!(by_code.data_type, DataType::String);
    }

    #[test]
    fn unknown_pair_returns_none() {
        let dict = Dictionary::with_standard_attributes();
        assert!(dict.get_by_code(-1, 250).is_none());
        assert!(dict.get_by_code(9, 1).is_none());
    }

    #[test]
    fn descriptor_equality_ignores_name_and_type() {
        let a = AttributeDescriptor::standard(1, "User-Name", DataType::String);
        let b = AttributeDescriptor::standard(1, "Totally-Different", DataType::Integer);
        assert_eq!(a, b);
    }

    #[test]
    fn enumeration_round_trips_both_directions() {
        let dict = Dictionary::with_standard_attributes();
        let service_type = dict.get_by_code(-1, 6).unwrap();
        assert_eq!(service_type.enumeration.value_of("Login-User"), Some(1));
        assert_eq!(service_type.enumeration.name_of(1), Some("Login-User"));
    }

    #[test]
    fn custom_vendor_descriptor_is_distinct_namespace() {
        let mut dict = Dictionary::with_standard_attributes();
        dict.insert_vendor(AttributeDescriptor::vendor(9, 1, "Cisco-AVPair", DataType::String));
        assert!(dict.get_by_code(9, 1).is_some());
        assert!(dict.get_by_code(-1, 1).is_some());
        assert_ne!(dict.get_by_code(9, 1), dict.get_by_code(-1, 1));
    }
}
