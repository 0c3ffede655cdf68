//! # Confirmation Signatures
//!
//! Verifies that a payment confirmation was issued by the gateway.
//!
//! ```text
//! expected = hex( HMAC-SHA256( secret, order_id + "|" + gateway_payment_id ) )
//! ```
//!
//! The comparison goes through [`Mac::verify_slice`], which is constant
//! time. The shared secret is handed to [`SignatureVerifier::new`] once;
//! nothing here reads configuration at call time.
//!
//! ## Test signatures
//! Non-production deployments can accept signatures carrying a sentinel
//! prefix (e.g. `test_sig_…`). The prefix is only honoured when the
//! verifier was built with [`TestSignatures::Allowed`]; with the default
//! [`TestSignatures::Rejected`] such a value is just a wrong signature.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::ValidationError;

type HmacSha256 = Hmac<Sha256>;

/// Whether sentinel-prefixed test signatures are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TestSignatures {
    #[default]
    Rejected,
    Allowed { prefix: String },
}

/// Result of checking a confirmation signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    Valid,
    /// Accepted through the non-production bypass.
    TestBypass,
    Invalid,
}

impl SignatureCheck {
    #[inline]
    pub fn is_accepted(&self) -> bool {
        !matches!(self, SignatureCheck::Invalid)
    }
}

/// HMAC-SHA256 verifier keyed with the gateway secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    keyed: HmacSha256,
    test_signatures: TestSignatures,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<redacted>")
            .field("test_signatures", &self.test_signatures)
            .finish()
    }
}

impl SignatureVerifier {
    /// Creates a verifier. Rejects an empty secret.
    pub fn new(secret: &[u8], test_signatures: TestSignatures) -> Result<Self, ValidationError> {
        if secret.is_empty() {
            return Err(ValidationError::required("signing secret"));
        }
        if let TestSignatures::Allowed { prefix } = &test_signatures {
            if prefix.is_empty() {
                return Err(ValidationError::required("test signature prefix"));
            }
        }

        let keyed = HmacSha256::new_from_slice(secret).map_err(|e| ValidationError::InvalidFormat {
            field: "signing secret".to_string(),
            reason: e.to_string(),
        })?;

        Ok(SignatureVerifier {
            keyed,
            test_signatures,
        })
    }

    /// Computes the hex signature the gateway would send for this pair.
    pub fn sign(&self, order_id: &str, gateway_payment_id: &str) -> String {
        let mut mac = self.keyed.clone();
        mac.update(signed_payload(order_id, gateway_payment_id).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Checks `signature` for `order_id|gateway_payment_id`.
    pub fn verify(&self, order_id: &str, gateway_payment_id: &str, signature: &str) -> SignatureCheck {
        if let TestSignatures::Allowed { prefix } = &self.test_signatures {
            if signature.starts_with(prefix.as_str()) {
                return SignatureCheck::TestBypass;
            }
        }

        let Ok(supplied) = hex::decode(signature.trim()) else {
            return SignatureCheck::Invalid;
        };

        let mut mac = self.keyed.clone();
        mac.update(signed_payload(order_id, gateway_payment_id).as_bytes());
        match mac.verify_slice(&supplied) {
            Ok(()) => SignatureCheck::Valid,
            Err(_) => SignatureCheck::Invalid,
        }
    }
}

fn signed_payload(order_id: &str, gateway_payment_id: &str) -> String {
    format!("{order_id}|{gateway_payment_id}")
}
