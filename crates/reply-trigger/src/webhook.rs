//! Webhook signature verification
//!
//! Channels sign each webhook body with HMAC-SHA256 over the raw bytes:
//!
//! - LINE: base64 digest in `X-Line-Signature`, keyed by the channel secret
//! - Facebook / Instagram: `sha256=<hex>` in `X-Hub-Signature-256`, keyed by
//!   the app secret
//!
//! Verification uses constant-time comparison.
//!
//! # Example
//!
//! ```rust
//! use reply_trigger::{Channel, WebhookVerifier};
//!
//! let verifier = WebhookVerifier::new(Channel::Line, "channel-secret");
//! let body = br#"{"destination":"U0","events":[]}"#;
//! let signature = verifier.compute_signature(body);
//! assert!(verifier.verify(body, &signature));
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::types::Channel;

type HmacSha256 = Hmac<Sha256>;

/// Verifies webhook signatures for one channel
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    channel: Channel,
    secret: String,
}

impl WebhookVerifier {
    pub fn new(channel: Channel, secret: impl Into<String>) -> Self {
        Self {
            channel,
            secret: secret.into(),
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// HTTP header carrying the signature
    pub fn signature_header(&self) -> &'static str {
        match self.channel {
            Channel::Line => "X-Line-Signature",
            Channel::Facebook | Channel::Instagram => "X-Hub-Signature-256",
        }
    }

    /// Check `signature` against the raw request body.
    pub fn verify(&self, body: &[u8], signature: &str) -> bool {
        let signature = signature.trim();
        let expected = match self.channel {
            Channel::Line => STANDARD.decode(signature).ok(),
            Channel::Facebook | Channel::Instagram => signature
                .strip_prefix("sha256=")
                .and_then(|hex_digest| hex::decode(hex_digest).ok()),
        };
        let Some(expected) = expected else {
            tracing::debug!(channel = %self.channel, "malformed webhook signature");
            return false;
        };

        let Ok(mut mac) = HmacSha256::new_from_slice(self.secret.as_bytes()) else {
            return false;
        };
        mac.update(body);
        mac.verify_slice(&expected).is_ok()
    }

    /// Signature in the channel's header format.
    pub fn compute_signature(&self, body: &[u8]) -> String {
        let digest = match HmacSha256::new_from_slice(self.secret.as_bytes()) {
            Ok(mut mac) => {
                mac.update(body);
                mac.finalize().into_bytes().to_vec()
            }
            Err(_) => Vec::new(),
        };
        match self.channel {
            Channel::Line => STANDARD.encode(digest),
            Channel::Facebook | Channel::Instagram => format!("sha256={}", hex::encode(digest)),
        }
    }
}
