//! MD5 chaining, HMAC-MD5, and byte-level primitives the codec builds on
//! (C1): authenticator computation, User-Password hiding (RFC 2865 §5.2),
//! and Message-Authenticator (RFC 3579 §3.2).

use hmac::{Hmac, Mac};
use md5::{Digest, Md5};

type HmacMd5 = Hmac<Md5>;

/// Plain MD5 digest of `data`.
pub fn md5(data: &[u8]) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// MD5 over the concatenation of every slice in `parts`, without
/// allocating an intermediate buffer.
pub fn md5_chained(parts: &[&[u8]]) -> [u8; 16] {
    let mut hasher = Md5::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// HMAC-MD5(key, data), used for the Message-Authenticator attribute.
pub fn hmac_md5(key: &[u8], data: &[u8]) -> [u8; 16] {
    // A key of any length is valid for HMAC; this only fails on a defective
    // implementation, never on caller input.
    let mut mac = HmacMd5::new_from_slice(key).expect("HMAC-MD5 accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// XORs `src` into `dst` in place. Panics if the slices differ in length;
/// every call site in this crate operates on fixed 16-byte MD5 blocks.
pub fn xor_in_place(dst: &mut [u8], src: &[u8]) {
    assert_eq!(dst.len(), src.len(), "xor_in_place requires equal-length slices");
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}

/// Constant-time equality check for authenticator comparison, so a timing
/// side channel can't leak how many leading bytes matched.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Request/Response authenticator for an Accounting-Request: `MD5(code ‖
/// id ‖ length ‖ 16 zero bytes ‖ attributes ‖ secret)`.
pub fn accounting_authenticator(
    code: u8,
    identifier: u8,
    length: u16,
    attributes: &[u8],
    secret: &[u8],
) -> [u8; 16] {
    let header = [code, identifier, (length >> 8) as u8, length as u8];
    let zeros = [0u8; 16];
    md5_chained(&[&header, &zeros, attributes, secret])
}

/// Response Authenticator for Access-Accept/Reject/Challenge and
/// Accounting-Response: `MD5(code ‖ id ‖ length ‖ request_authenticator ‖
/// attributes ‖ secret)`.
pub fn response_authenticator(
    code: u8,
    identifier: u8,
    length: u16,
    request_authenticator: &[u8; 16],
    attributes: &[u8],
    secret: &[u8],
) -> [u8; 16] {
    let header = [code, identifier, (length >> 8) as u8, length as u8];
    md5_chained(&[&header, request_authenticator, attributes, secret])
}

/// Hide a User-Password per RFC 2865 §5.2: pad to a multiple of 16 bytes
/// with zeros (max 128 bytes of plaintext), then XOR each 16-byte block
/// with `MD5(secret ‖ c)` where `c` is the Request Authenticator for the
/// first block and the previous ciphertext block thereafter.
pub fn hide_password(plaintext: &[u8], request_authenticator: &[u8; 16], secret: &[u8]) -> Vec<u8> {
    let padded_len = ((plaintext.len() + 15) / 16).max(1) * 16;
    let mut padded = vec![0u8; padded_len];
    padded[..plaintext.len()].copy_from_slice(plaintext);

    let mut result = Vec::with_capacity(padded_len);
    let mut chain: [u8; 16] = *request_authenticator;
    for block in padded.chunks(16) {
        let mut b = md5_chained(&[secret, &chain]);
        xor_in_place(&mut b, block);
        result.extend_from_slice(&b);
        chain.copy_from_slice(&b);
    }
    result
}

/// Reverse `hide_password`, stripping the trailing zero padding.
pub fn unhide_password(hidden: &[u8], request_authenticator: &[u8; 16], secret: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(hidden.len());
    let mut chain: [u8; 16] = *request_authenticator;
    for block in hidden.chunks(16) {
        let b = md5_chained(&[secret, &chain]);
        let mut plain = block.to_vec();
        xor_in_place(&mut plain, &b[..block.len()]);
        result.extend_from_slice(&plain);
        chain.copy_from_slice(block);
    }
    while result.last() == Some(&0) {
        result.pop();
    }
    result
}
