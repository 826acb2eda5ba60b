// src/feed/signature.rs
// Request signature the telegraph endpoint expects: sort the query
// parameters by key, join as `key=value&...`, sha1 the string, then md5 the
// sha1 hex digest. Vendor-mandated; treated as an opaque compatibility
// detail, not as a security mechanism.

use md5::Md5;
use sha1::{Digest, Sha1};

pub fn sign(params: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let sha_hex = to_hex(&Sha1::digest(joined.as_bytes()));
    to_hex(&Md5::digest(sha_hex.as_bytes()))
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(out, "{b:02x}");
    }
    out
}
