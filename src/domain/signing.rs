//! The gateway's MD5 authentication scheme.
//!
//! A keyed hash is `md5(key2 + md5(key1 + parameters))`, both digests as
//! lowercase hex, where `parameters` is a query string whose field order is
//! fixed by the gateway and which is never URL-encoded.

use md5::{Digest, Md5};
use sha1::Sha1;
use subtle::ConstantTimeEq;

/// The merchant's two shared MD5 keys
#[derive(Clone, PartialEq, Eq)]
pub struct Md5Keys {
    pub key1: String,
    pub key2: String,
}

impl std::fmt::Debug for Md5Keys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Md5Keys(<redacted>)")
    }
}

/// Canonical parameter strings, one per signed message kind.
pub mod canonical {
    /// Redirect to the hosted payment page
    pub fn session(merchant: &str, order_id: &str, currency: &str, amount: &str) -> String {
        format!(
            "merchant={}&orderid={}&currency={}&amount={}",
            merchant, order_id, currency, amount
        )
    }

    /// Callback `authkey`
    pub fn callback(transact: &str, amount: &str, currency: &str) -> String {
        format!("transact={}&amount={}&currency={}", transact, amount, currency)
    }

    /// Refund request. The currency is not part of the hashed string.
    pub fn refund(merchant: &str, order_id: &str, transact: &str, amount: &str) -> String {
        format!(
            "merchant={}&orderid={}&transact={}&amount={}",
            merchant, order_id, transact, amount
        )
    }
}

/// Signs outgoing parameters and verifies incoming ones.
///
/// MD5 control is optional per merchant. Without keys `sign` returns `None`
/// and `verify` accepts everything: an absent signature means "not checked".
#[derive(Debug, Clone)]
pub struct KeyedHashSigner {
    keys: Option<Md5Keys>,
}

impl KeyedHashSigner {
    pub fn new(keys: Option<Md5Keys>) -> Self {
        Self { keys }
    }

    pub fn is_enabled(&self) -> bool {
        self.keys.is_some()
    }

    pub fn sign(&self, parameters: &str) -> Option<String> {
        self.keys
            .as_ref()
            .map(|keys| keyed_hash(&keys.key1, &keys.key2, parameters))
    }

    pub fn verify(&self, parameters: &str, candidate: &str) -> bool {
        match self.sign(parameters) {
            Some(expected) => constant_time_eq(&expected, candidate),
            None => true,
        }
    }
}

pub fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

pub fn keyed_hash(key1: &str, key2: &str, parameters: &str) -> String {
    let inner = md5_hex(&format!("{}{}", key1, parameters));
    md5_hex(&format!("{}{}", key2, inner))
}

/// Hash embedded in return links in place of the order secret:
/// lowercase hex SHA-1 of the lowercased secret.
pub fn order_secret_hash(secret: &str) -> String {
    hex::encode(Sha1::digest(secret.to_lowercase().as_bytes()))
}

pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
