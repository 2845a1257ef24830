//! HMAC-SHA256 authenticity gate for inbound deployment requests.
//!
//! Deployment bodies are authenticated by a shared secret, not a user
//! session: the caller presents `HMAC-SHA256(secret, raw_body)` hex-encoded,
//! optionally prefixed with `sha256=`. Verification is request-scoped and
//! stateless; the same secret verifies concurrent requests without
//! coordination.
//!
//! # Security Invariants
//!
//! - Fail-closed: an unconfigured (or empty) secret accepts no deployments.
//! - The body-size ceiling is enforced before any digest is computed, so an
//!   oversized body cannot buy attacker-controlled CPU time.
//! - Digest comparison is constant-time via `subtle::ConstantTimeEq`.
//! - The secret only leaves its [`SecretString`] wrapper inside the HMAC
//!   computation; contexts are discarded after verification and never logged.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Optional prefix on presented signatures, stripped case-insensitively.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Ephemeral per-request verification input.
///
/// Constructed per inbound request and discarded after [`verify`] returns.
#[derive(Debug, Clone, Copy)]
pub struct SignatureContext<'a> {
    /// The raw request body, exactly as received on the wire.
    pub raw_body: &'a [u8],
    /// The presented signature header value, if any.
    pub presented: Option<&'a str>,
    /// The configured shared secret, if any.
    pub secret: Option<&'a SecretString>,
    /// Upper bound on accepted body size, in bytes.
    pub max_body_bytes: usize,
}

/// Rejection reasons from signature verification.
///
/// Everything except [`SignatureError::PayloadTooLarge`] is an
/// authentication failure; the public error surface collapses those to one
/// generic category so a probing caller cannot learn which check failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// No shared secret is configured; the system accepts no deployments.
    #[error("shared secret is not configured")]
    MissingSecret,

    /// The request carried no signature value.
    #[error("missing deployment signature")]
    MissingSignature,

    /// The body exceeds the configured size ceiling.
    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge {
        /// Received body size in bytes.
        size: usize,
        /// Configured ceiling in bytes.
        limit: usize,
    },

    /// The presented signature did not match the expected digest.
    #[error("invalid deployment signature")]
    InvalidSignature,
}

/// Verifies that a raw request body was produced by a holder of the shared
/// secret.
///
/// Checks run in a fixed order: configured secret, presence of a signature,
/// body-size ceiling (before any cryptographic work), then the HMAC digest
/// itself. The presented value is trimmed and an optional case-insensitive
/// `sha256=` prefix is stripped; the remainder must be the hex-encoded
/// digest. Malformed hex is indistinguishable from a wrong digest.
///
/// # Errors
///
/// Returns the first failing check as a [`SignatureError`].
pub fn verify(ctx: &SignatureContext<'_>) -> Result<(), SignatureError> {
    let secret = ctx.secret.ok_or(SignatureError::MissingSecret)?;
    if secret.expose_secret().is_empty() {
        return Err(SignatureError::MissingSecret);
    }

    let presented = ctx
        .presented
        .map(str::trim)
        .filter(|sig| !sig.is_empty())
        .ok_or(SignatureError::MissingSignature)?;

    if ctx.raw_body.len() > ctx.max_body_bytes {
        return Err(SignatureError::PayloadTooLarge {
            size: ctx.raw_body.len(),
            limit: ctx.max_body_bytes,
        });
    }

    let presented = normalize_signature(presented);
    let presented_digest =
        hex::decode(presented).map_err(|_| SignatureError::InvalidSignature)?;

    let expected = compute_digest(secret, ctx.raw_body);
    if bool::from(expected.ct_eq(&presented_digest)) {
        Ok(())
    } else {
        Err(SignatureError::InvalidSignature)
    }
}

/// Computes the hex-encoded signature a legitimate caller would present for
/// `raw_body`. Exposed for deployment clients and tests.
#[must_use]
pub fn compute_signature(secret: &SecretString, raw_body: &[u8]) -> String {
    hex::encode(compute_digest(secret, raw_body))
}

fn compute_digest(secret: &SecretString, raw_body: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(raw_body);
    mac.finalize().into_bytes().to_vec()
}

/// Strips the optional `sha256=` prefix, case-insensitively.
fn normalize_signature(presented: &str) -> &str {
    if presented.len() >= SIGNATURE_PREFIX.len()
        && presented[..SIGNATURE_PREFIX.len()].eq_ignore_ascii_case(SIGNATURE_PREFIX)
    {
        &presented[SIGNATURE_PREFIX.len()..]
    } else {
        presented
    }
}
