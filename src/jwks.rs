//! Public key derivation from a JSON Web Key Set.
//!
//! The identity provider publishes its token signing key as an EC JWK. The
//! gateway on the target wants the same key as a PEM `PUBLIC KEY` block, so
//! the first key of the set is decoded and re-encoded as SubjectPublicKeyInfo.
//! Only P-384 keys are supported.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use p384::pkcs8::{EncodePublicKey, LineEnding};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ProvisionError;

/// Curve name every derived key is assumed to be on.
pub const SUPPORTED_CURVE: &str = "P-384";

/// Timeout applied to the JWKS fetch when the caller has no preference.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Size in bytes of a P-384 field element.
const COORDINATE_LEN: usize = 48;

/// SEC1 tag of an uncompressed point.
const SEC1_UNCOMPRESSED_TAG: u8 = 0x04;

/// A JSON Web Key Set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    #[serde(default)]
    pub keys: Vec<Jwk>,
}

/// One EC public key record of a key set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    #[serde(default)]
    pub kty: String,
    #[serde(default, rename = "use")]
    pub use_: String,
    #[serde(default)]
    pub kid: String,
    #[serde(default)]
    pub alg: String,
    #[serde(default)]
    pub crv: String,
    /// X coordinate, unpadded base64url.
    #[serde(default)]
    pub x: String,
    /// Y coordinate, unpadded base64url.
    #[serde(default)]
    pub y: String,
}

impl Jwks {
    /// Returns the key used for derivation.
    ///
    /// Sets holding several keys are not disambiguated by `kid` or `use`;
    /// the first entry wins.
    pub fn first_key(&self) -> Result<&Jwk, ProvisionError> {
        self.keys
            .first()
            .ok_or_else(|| ProvisionError::Parse("no keys found in JWKS".to_string()))
    }
}

impl Jwk {
    /// Decodes the X and Y coordinates into big-endian byte strings.
    pub fn coordinates(&self) -> Result<(Vec<u8>, Vec<u8>), ProvisionError> {
        let x = decode_coordinate("x", &self.x)?;
        let y = decode_coordinate("y", &self.y)?;
        Ok((x, y))
    }

    /// Fails when the key declares a curve other than [`SUPPORTED_CURVE`].
    ///
    /// A key without a `crv` member is taken to be on the supported curve.
    pub fn check_curve(&self) -> Result<(), ProvisionError> {
        if self.crv.is_empty() || self.crv == SUPPORTED_CURVE {
            return Ok(());
        }
        Err(ProvisionError::Crypto(format!(
            "unsupported curve '{}' in key '{}': only {} is supported",
            self.crv, self.kid, SUPPORTED_CURVE
        )))
    }
}

fn decode_coordinate(name: &str, encoded: &str) -> Result<Vec<u8>, ProvisionError> {
    URL_SAFE_NO_PAD.decode(encoded).map_err(|e| {
        ProvisionError::Parse(format!("invalid base64url in JWK coordinate '{}': {}", name, e))
    })
}

/// Left-pads a big-endian integer to the P-384 field size.
fn to_field_bytes(name: &str, value: &[u8]) -> Result<[u8; COORDINATE_LEN], ProvisionError> {
    let first_significant = value.iter().position(|b| *b != 0).unwrap_or(value.len());
    let significant = &value[first_significant..];
    if significant.len() > COORDINATE_LEN {
        return Err(ProvisionError::Crypto(format!(
            "coordinate '{}' is {} bytes long, larger than a {} field element",
            name,
            significant.len(),
            SUPPORTED_CURVE
        )));
    }
    let mut out = [0u8; COORDINATE_LEN];
    out[COORDINATE_LEN - significant.len()..].copy_from_slice(significant);
    Ok(out)
}

/// Builds a P-384 public key from big-endian coordinates and renders it as PEM.
pub fn public_key_pem_from_coordinates(x: &[u8], y: &[u8]) -> Result<String, ProvisionError> {
    let mut sec1 = Vec::with_capacity(1 + 2 * COORDINATE_LEN);
    sec1.push(SEC1_UNCOMPRESSED_TAG);
    sec1.extend_from_slice(&to_field_bytes("x", x)?);
    sec1.extend_from_slice(&to_field_bytes("y", y)?);

    let key = p384::PublicKey::from_sec1_bytes(&sec1).map_err(|_| {
        ProvisionError::Crypto(format!("coordinates are not a point on {}", SUPPORTED_CURVE))
    })?;

    key.to_public_key_pem(LineEnding::LF)
        .map_err(|e| ProvisionError::Crypto(format!("failed to encode public key: {}", e)))
}

/// Derives the PEM public key from an already fetched key set.
pub fn public_key_pem_from_jwks(jwks: &Jwks) -> Result<String, ProvisionError> {
    let jwk = jwks.first_key()?;
    let (x, y) = jwk.coordinates()?;
    jwk.check_curve()?;
    debug!(kid = %jwk.kid, alg = %jwk.alg, "deriving public key from JWK");
    public_key_pem_from_coordinates(&x, &y)
}

/// Fetches and parses the key set published at `url`.
pub fn fetch_jwks(url: &str, timeout: Duration) -> Result<Jwks, ProvisionError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProvisionError::network(url, e))?;

    let response = client
        .get(url)
        .send()
        .map_err(|e| ProvisionError::network(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProvisionError::network(url, format!("error fetching JWKS: {}", status)));
    }

    let body = response
        .text()
        .map_err(|e| ProvisionError::network(url, e))?;

    serde_json::from_str(&body)
        .map_err(|e| ProvisionError::Parse(format!("invalid JWKS document from {}: {}", url, e)))
}

/// Fetches the key set at `url` and returns its first key as a PEM
/// SubjectPublicKeyInfo block.
///
/// A single request is made; failures are returned without retrying.
pub fn derive_jwks_public_key_pem(url: &str, timeout: Duration) -> Result<String, ProvisionError> {
    info!("fetching JWKS from {}", url);
    let jwks = fetch_jwks(url, timeout)?;
    public_key_pem_from_jwks(&jwks)
}
