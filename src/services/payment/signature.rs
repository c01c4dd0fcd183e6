use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// An empty secret verifies nothing; HMAC would otherwise accept it as a key.
fn verify_hex(secret: &str, data: &[u8], signature: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(data);
    mac.verify_slice(&expected).is_ok()
}

/// Hex HMAC-SHA256, the form the provider sends signatures in.
pub fn sign_hex(secret: &str, data: &[u8]) -> String {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map(|mut mac| {
            mac.update(data);
            hex::encode(mac.finalize().into_bytes())
        })
        .unwrap_or_default()
}

/// Checkout callback: HMAC over `"{order_id}|{payment_id}"` with the key secret.
pub fn verify_payment_signature(
    key_secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> bool {
    let payload = format!("{order_id}|{payment_id}");
    verify_hex(key_secret, payload.as_bytes(), signature)
}

/// Webhook: HMAC over the raw request body with the webhook secret.
pub fn verify_webhook_signature(webhook_secret: &str, body: &[u8], signature: &str) -> bool {
    verify_hex(webhook_secret, body, signature)
}
