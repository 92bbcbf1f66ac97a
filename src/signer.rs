use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 of `payload` keyed by `secret`, lowercase hex.
///
/// The payload must be byte-identical to what goes on the wire. Binance
/// recomputes the digest over the query string / form body it receives,
/// so any re-encoding or field reordering after signing shows up as an
/// "invalid signature" error that looks exactly like bad credentials.
pub fn sign(secret: &str, payload: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Append `&signature=<hex>` to an already encoded payload.
pub fn signed_payload(secret: &str, payload: &str) -> String {
    let signature = sign(secret, payload);
    format!("{}&signature={}", payload, signature)
}
