//! Verification of Slack's `X-Slack-Signature` request header.
//!
//! Slack signs `v0:{timestamp}:{raw body}` with HMAC-SHA256 keyed by the app
//! signing secret. Requests older than five minutes are rejected as replays.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const MAX_REQUEST_AGE_SECS: i64 = 300;
const CLOCK_SKEW_SECS: i64 = 60;
const VERSION: &str = "v0";

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),
    #[error("malformed request timestamp `{0}`")]
    MalformedTimestamp(String),
    #[error("request timestamp {timestamp} is outside the accepted window (now {now})")]
    Stale { timestamp: i64, now: i64 },
    #[error("signature does not match request body")]
    Mismatch,
    #[error("signing secret is not usable as an HMAC key")]
    InvalidSecret,
}

#[derive(Clone)]
pub struct SignatureVerifier {
    keyed: HmacSha256,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier").field("secret", &"[REDACTED]").finish()
    }
}

impl SignatureVerifier {
    pub fn new(signing_secret: &str) -> Result<Self, SignatureError> {
        let keyed = HmacSha256::new_from_slice(signing_secret.as_bytes())
            .map_err(|_| SignatureError::InvalidSecret)?;
        Ok(Self { keyed })
    }

    pub fn sign(&self, timestamp: &str, body: &[u8]) -> String {
        let mac = self.mac(timestamp, body);
        format!("{VERSION}={}", hex::encode(mac.finalize().into_bytes()))
    }

    /// `now` is unix seconds. The comparison itself is constant-time.
    pub fn verify(
        &self,
        timestamp: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
        now: i64,
    ) -> Result<(), SignatureError> {
        let timestamp = timestamp.ok_or(SignatureError::MissingHeader(TIMESTAMP_HEADER))?;
        let signature = signature.ok_or(SignatureError::MissingHeader(SIGNATURE_HEADER))?;

        let issued = timestamp
            .trim()
            .parse::<i64>()
            .map_err(|_| SignatureError::MalformedTimestamp(timestamp.to_string()))?;
        if now - issued > MAX_REQUEST_AGE_SECS || issued - now > CLOCK_SKEW_SECS {
            return Err(SignatureError::Stale { timestamp: issued, now });
        }

        let expected = signature
            .strip_prefix("v0=")
            .and_then(|digest| hex::decode(digest).ok())
            .ok_or(SignatureError::Mismatch)?;

        self.mac(timestamp, body).verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
    }

    fn mac(&self, timestamp: &str, body: &[u8]) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(VERSION.as_bytes());
        mac.update(b":");
        mac.update(timestamp.as_bytes());
        mac.update(b":");
        mac.update(body);
        mac
    }
}
