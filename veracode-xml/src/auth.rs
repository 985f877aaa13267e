//! Request signing for the Veracode APIs.
//!
//! The client never loads credentials itself; it asks an injected
//! [`RequestSigner`] for the `Authorization` header of each outbound request.
//! [`HmacSigner`] implements the vendor `VERACODE-HMAC-SHA-256` scheme.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

use crate::VeracodeError;

// Type aliases for HMAC
type HmacSha256 = Hmac<Sha256>;

const AUTH_SCHEME: &str = "VERACODE-HMAC-SHA-256";
const REQUEST_VERSION: &str = "vcode_request_version_1";

// Constants for authentication error messages to avoid repeated allocations
const INVALID_API_KEY_MSG: &str = "Invalid API key format - must be hex string";
const INVALID_NONCE_MSG: &str = "Invalid nonce format";
const HMAC_CREATION_FAILED_MSG: &str = "Failed to create HMAC";

/// Produces the `Authorization` header value for an outbound request.
pub trait RequestSigner: Send + Sync {
    /// Sign a request for `method` against the fully built `url` (query included).
    ///
    /// # Errors
    ///
    /// Returns [`VeracodeError::Authentication`] when no header can be produced.
    fn authorization(&self, method: &str, url: &Url) -> Result<String, VeracodeError>;
}

/// API credentials (key id + hex secret) with redacted debug output.
#[derive(Clone)]
pub struct VeracodeCredentials {
    api_id: SecretString,
    api_key: SecretString,
}

impl VeracodeCredentials {
    pub fn new(api_id: String, api_key: String) -> Self {
        Self {
            api_id: SecretString::from(api_id),
            api_key: SecretString::from(api_key),
        }
    }

    #[must_use]
    pub fn expose_api_id(&self) -> &str {
        self.api_id.expose_secret()
    }

    #[must_use]
    pub fn expose_api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

impl fmt::Debug for VeracodeCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VeracodeCredentials")
            .field("api_id", &"[REDACTED]")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// HMAC request signer matching the official Veracode signing plugins.
#[derive(Debug, Clone)]
pub struct HmacSigner {
    credentials: VeracodeCredentials,
}

impl HmacSigner {
    pub fn new(credentials: VeracodeCredentials) -> Self {
        Self { credentials }
    }

    /// Compute the hex signature for a request at a fixed timestamp and nonce.
    ///
    /// # Errors
    ///
    /// Fails when the API key or nonce are not valid hex.
    pub fn signature(
        &self,
        method: &str,
        url: &Url,
        timestamp: u64,
        nonce: &str,
    ) -> Result<String, VeracodeError> {
        let path_and_query = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        let host = url.host_str().unwrap_or("");

        let data = format!(
            "id={}&host={}&url={}&method={}",
            self.credentials.expose_api_id(),
            host,
            path_and_query,
            method
        );

        let key_bytes = hex::decode(self.credentials.expose_api_key())
            .map_err(|_| VeracodeError::Authentication(INVALID_API_KEY_MSG.to_string()))?;

        let nonce_bytes = hex::decode(nonce)
            .map_err(|_| VeracodeError::Authentication(INVALID_NONCE_MSG.to_string()))?;

        // HMAC(nonce, key) -> HMAC(timestamp, .) -> HMAC(version, .) -> HMAC(data, .)
        let hashed_nonce = hmac_sha256(&key_bytes, &nonce_bytes)?;
        let hashed_timestamp = hmac_sha256(&hashed_nonce, timestamp.to_string().as_bytes())?;
        let hashed_version = hmac_sha256(&hashed_timestamp, REQUEST_VERSION.as_bytes())?;
        let signature = hmac_sha256(&hashed_version, data.as_bytes())?;

        Ok(hex::encode(signature))
    }

    /// Build the full header value for a given timestamp and nonce.
    ///
    /// # Errors
    ///
    /// See [`HmacSigner::signature`].
    pub fn header_value(
        &self,
        method: &str,
        url: &Url,
        timestamp: u64,
        nonce: &str,
    ) -> Result<String, VeracodeError> {
        let signature = self.signature(method, url, timestamp, nonce)?;
        Ok(format!(
            "{AUTH_SCHEME} id={},ts={timestamp},nonce={nonce},sig={signature}",
            self.credentials.expose_api_id()
        ))
    }
}

impl RequestSigner for HmacSigner {
    fn authorization(&self, method: &str, url: &Url) -> Result<String, VeracodeError> {
        #[allow(clippy::cast_possible_truncation)]
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| VeracodeError::Authentication(format!("System time error: {e}")))?
            .as_millis() as u64;

        let nonce_bytes: [u8; 16] = rand::random();
        let nonce = hex::encode(nonce_bytes);

        self.header_value(method, url, timestamp, &nonce)
    }
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<Vec<u8>, VeracodeError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|_| VeracodeError::Authentication(HMAC_CREATION_FAILED_MSG.to_string()))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
    const TEST_NONCE: &str = "00112233445566778899aabbccddeeff";

    fn signer() -> HmacSigner {
        HmacSigner::new(VeracodeCredentials::new("test_id".to_string(), TEST_KEY.to_string()))
    }

    #[test]
    fn test_credentials_debug_redaction() {
        let creds = VeracodeCredentials::new("my_api_id".to_string(), "deadbeef".to_string());
        let debug_output = format!("{creds:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("my_api_id"));
        assert!(!debug_output.contains("deadbeef"));
    }

    #[test]
    fn test_signature_is_deterministic_for_fixed_inputs() {
        let url = Url::parse("https://analysiscenter.veracode.com/api/5.0/getbuildinfo.do?app_id=42")
            .unwrap();
        let first = signer().signature("GET", &url, 1_700_000_000_000, TEST_NONCE).unwrap();
        let second = signer().signature("GET", &url, 1_700_000_000_000, TEST_NONCE).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
    }

    #[test]
    fn test_signature_covers_query_method_and_timestamp() {
        let url_a = Url::parse("https://analysiscenter.veracode.com/api/5.0/getbuildinfo.do?app_id=42")
            .unwrap();
        let url_b = Url::parse("https://analysiscenter.veracode.com/api/5.0/getbuildinfo.do?app_id=43")
            .unwrap();
        let base = signer().signature("GET", &url_a, 1, TEST_NONCE).unwrap();

        assert_ne!(base, signer().signature("GET", &url_b, 1, TEST_NONCE).unwrap());
        assert_ne!(base, signer().signature("POST", &url_a, 1, TEST_NONCE).unwrap());
        assert_ne!(base, signer().signature("GET", &url_a, 2, TEST_NONCE).unwrap());
    }

    #[test]
    fn test_header_format() {
        let url = Url::parse("https://analysiscenter.veracode.com/api/5.0/getapplist.do").unwrap();
        let header = signer().header_value("GET", &url, 1234, TEST_NONCE).unwrap();

        assert!(header.starts_with("VERACODE-HMAC-SHA-256 id=test_id,ts=1234,nonce="));
        assert!(header.contains(&format!("nonce={TEST_NONCE},sig=")));
    }

    #[test]
    fn test_random_nonce_per_request() {
        let url = Url::parse("https://analysiscenter.veracode.com/api/5.0/getapplist.do").unwrap();
        let first = signer().authorization("GET", &url).unwrap();
        let second = signer().authorization("GET", &url).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_non_hex_key_is_rejected() {
        let signer = HmacSigner::new(VeracodeCredentials::new(
            "test_id".to_string(),
            "not-hex!".to_string(),
        ));
        let url = Url::parse("https://analysiscenter.veracode.com/api/5.0/getapplist.do").unwrap();
        let err = signer.authorization("GET", &url).unwrap_err();
        assert!(matches!(err, VeracodeError::Authentication(_)));
    }
}
