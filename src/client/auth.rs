//! Request signing for the WEEX contract API
//!
//! WEEX signs requests with HMAC-SHA256 over
//! `timestamp + METHOD + path + body` (timestamp in milliseconds),
//! base64-encoded, sent alongside the key and passphrase in the
//! `ACCESS-*` headers.

use crate::error::{BotError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct WeexSigner {
    api_key: String,
    api_secret: String,
    api_passphrase: String,
}

impl WeexSigner {
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        api_passphrase: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            api_passphrase: api_passphrase.into(),
        }
    }

    /// Signature for one request at a fixed timestamp. Empty bodies sign
    /// as the empty string.
    pub fn sign(&self, timestamp_ms: i64, method: &str, path: &str, body: &str) -> Result<String> {
        let message = format!("{}{}{}{}", timestamp_ms, method.to_uppercase(), path, body);

        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| BotError::Auth(format!("Invalid secret key: {e}")))?;
        mac.update(message.as_bytes());

        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }

    /// The four ACCESS-* headers for a request signed now.
    pub fn auth_headers(
        &self,
        method: &str,
        path: &str,
        body: &str,
    ) -> Result<Vec<(&'static str, String)>> {
        let timestamp = Utc::now().timestamp_millis();
        let signature = self.sign(timestamp, method, path, body)?;

        Ok(vec![
            ("ACCESS-KEY", self.api_key.clone()),
            ("ACCESS-SIGN", signature),
            ("ACCESS-PASSPHRASE", self.api_passphrase.clone()),
            ("ACCESS-TIMESTAMP", timestamp.to_string()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> WeexSigner {
        WeexSigner::new("test-key", "test-secret", "test-pass")
    }

    #[test]
    fn test_known_signature_get() {
        let sig = signer()
            .sign(1_700_000_000_000, "GET", "/capi/v2/account/assets", "")
            .unwrap();
        assert_eq!(sig, "xC6MzWDtmCecSYKFDhiyJXuP9hvdqpnGnmbL61+uhUQ=");
    }

    #[test]
    fn test_known_signature_post_with_body() {
        let sig = signer()
            .sign(
                1_700_000_000_000,
                "POST",
                "/capi/v2/order/placeOrder",
                "{\"size\":\"1\"}",
            )
            .unwrap();
        assert_eq!(sig, "/A3C+T77SpYkoP3Pw+6EEBvTU510bWFGOefu3dJ6qHE=");
    }

    #[test]
    fn test_method_is_uppercased_in_prehash() {
        let s = signer();
        let lower = s
            .sign(1_700_000_000_000, "get", "/capi/v2/account/assets", "")
            .unwrap();
        let upper = s
            .sign(1_700_000_000_000, "GET", "/capi/v2/account/assets", "")
            .unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_body_changes_signature() {
        let s = signer();
        let a = s.sign(1, "POST", "/p", "{\"a\":1}").unwrap();
        let b = s.sign(1, "POST", "/p", "{\"a\":2}").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_auth_headers_complete() {
        let headers = signer()
            .auth_headers("GET", "/capi/v2/account/assets", "")
            .unwrap();
        let names: Vec<&str> = headers.iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec!["ACCESS-KEY", "ACCESS-SIGN", "ACCESS-PASSPHRASE", "ACCESS-TIMESTAMP"]
        );
        assert_eq!(headers[0].1, "test-key");
        assert_eq!(headers[2].1, "test-pass");
        // HMAC-SHA256 digest is 32 bytes, 44 chars in base64
        assert_eq!(headers[1].1.len(), 44);
    }
}
