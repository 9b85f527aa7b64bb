// dkim-validator – validation of DKIM signatures
// Copyright © 2022–2023 David Bürgin <dbuergin@gluet.ch>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.

//! Cryptographic utilities.
//!
//! # Public key formats
//!
//! RFC 6376 says that the `p=` tag of an RSA key record holds an RSAPublicKey
//! (RFC 3447), but its own example in appendix C installs a
//! SubjectPublicKeyInfo (RFC 5280). The latter is what is found in DNS in
//! practice. RSA key material is therefore first wrapped in a PEM envelope and
//! read as SubjectPublicKeyInfo; if that fails, it is read as RSAPublicKey.
//!
//! Ed25519 keys are read as the 32 raw key bytes mandated by RFC 8463, with a
//! fallback to SubjectPublicKeyInfo, the default output of OpenSSL.

mod ed25519;
mod hash;
mod rsa;

pub use self::{
    ed25519::{read_ed25519_verifying_key, verify_ed25519},
    hash::{digest, CountingHasher, HashStatus, InsufficientInput},
    rsa::{get_public_key_size, read_rsa_public_key, to_public_key_pem, verify_rsa},
};

use crate::{error::CryptoError, util::{self, CanonicalStr}};
use ::rsa::RsaPublicKey;
use ed25519_dalek::VerifyingKey as Ed25519VerifyingKey;
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// A key type, as given in the `k=` tag of a key record.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum KeyType {
    Rsa,
    Ed25519,
}

impl CanonicalStr for KeyType {
    fn canonical_str(&self) -> &'static str {
        match self {
            Self::Rsa => "rsa",
            Self::Ed25519 => "ed25519",
        }
    }
}

impl Display for KeyType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_str())
    }
}

impl FromStr for KeyType {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("rsa") {
            Ok(Self::Rsa)
        } else if s.eq_ignore_ascii_case("ed25519") {
            Ok(Self::Ed25519)
        } else {
            Err("unknown key type")
        }
    }
}

/// A hash algorithm.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum HashAlgorithm {
    Sha256,
    #[cfg(feature = "pre-rfc8301")]
    Sha1,
}

impl HashAlgorithm {
    pub fn all() -> &'static [Self] {
        &[
            Self::Sha256,
            #[cfg(feature = "pre-rfc8301")]
            Self::Sha1,
        ]
    }
}

impl CanonicalStr for HashAlgorithm {
    fn canonical_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            #[cfg(feature = "pre-rfc8301")]
            Self::Sha1 => "sha1",
        }
    }
}

impl Display for HashAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|alg| s.eq_ignore_ascii_case(alg.canonical_str()))
            .ok_or("unknown hash algorithm")
    }
}

/// A public key read from a key record, ready for verification.
#[derive(Debug)]
pub enum VerifyingKey {
    Rsa(RsaPublicKey),
    Ed25519(Ed25519VerifyingKey),
}

impl VerifyingKey {
    /// Reads key material of the given type from a `p=` tag value.
    pub fn from_base64(key_type: KeyType, key_base64: &str) -> Result<Self, CryptoError> {
        match key_type {
            KeyType::Rsa => read_rsa_public_key(key_base64).map(Self::Rsa),
            KeyType::Ed25519 => read_ed25519_verifying_key(key_base64).map(Self::Ed25519),
        }
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            Self::Rsa(_) => KeyType::Rsa,
            Self::Ed25519(_) => KeyType::Ed25519,
        }
    }

    /// The key size in bits, for RSA keys.
    pub fn key_size(&self) -> Option<usize> {
        match self {
            Self::Rsa(public_key) => Some(get_public_key_size(public_key)),
            Self::Ed25519(_) => None,
        }
    }

    /// Hashes `data` and verifies `signature` against the digest.
    pub fn verify(
        &self,
        hash_alg: HashAlgorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool, CryptoError> {
        let hashed = digest(hash_alg, data);

        match self {
            Self::Rsa(public_key) => verify_rsa(hash_alg, public_key, &hashed, signature),
            Self::Ed25519(verifying_key) => verify_ed25519(verifying_key, &hashed, signature),
        }
    }
}

/// Decodes a Base64 signature from a `b=` tag value.
pub fn decode_signature(signature_base64: &str) -> Result<Vec<u8>, CryptoError> {
    util::decode_base64(signature_base64).map_err(|_| CryptoError::InvalidBase64Signature)
}

/// Verifies an RSA signature over some data.
///
/// `public_key` is the Base64 key material from a `p=` tag, `signature` is the
/// Base64 signature from a `b=` tag, and `hash_algorithm` names the digest to
/// compute over `data`, for example `sha256`.
///
/// A well-formed signature that does not match yields `Ok(false)`.
///
/// # Errors
///
/// Returns an error if the signature is not Base64, if the hash algorithm is
/// unknown, or if the key material cannot be read.
pub fn validate_signature(
    public_key: &str,
    signature: &str,
    data: &[u8],
    hash_algorithm: &str,
) -> Result<bool, CryptoError> {
    let signature = decode_signature(signature)?;

    let hash_alg = HashAlgorithm::from_str(hash_algorithm)
        .map_err(|_| CryptoError::UnsupportedHashAlgorithm(hash_algorithm.into()))?;

    let public_key = VerifyingKey::from_base64(KeyType::Rsa, public_key)?;

    public_key.verify(hash_alg, data, &signature)
}

/// Verifies an Ed25519-SHA256 signature over some data.
///
/// Arguments are as for [`validate_signature`].
pub fn validate_ed25519_signature(
    public_key: &str,
    signature: &str,
    data: &[u8],
) -> Result<bool, CryptoError> {
    let signature = decode_signature(signature)?;

    let public_key = VerifyingKey::from_base64(KeyType::Ed25519, public_key)?;

    public_key.verify(HashAlgorithm::Sha256, data, &signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::rsa::{pkcs8::DecodePrivateKey, Pkcs1v15Sign, RsaPrivateKey};
    use ed25519_dalek::{Signer, SigningKey};
    use sha2::Sha256;

    const RSA_PUBLIC_KEY: &str = "MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEAvXEn6j24wx68Zs5djoKQ\
        LFXcGUUPzvAAfrc9RKzBQG+dglfdCqZy2ZFai4SlLivvkkCU+0wXl+ExSSY5xEiQ\
        k7m3YQZbeIAeSWUTLe7asTri73c7nX5D7+1KKWUarMHKLeWN5F9Re8uOfWrgZdYC\
        20bfoptbMQLLPcbfchP9Z7epZRwdi6xeZySFO2JnwyK2kEay7VpF7YivwQzMohF2\
        hlQ9OshDIa2w7uudKp5jAcOVymPTi3iu6tEI/3NNkcezukVawN6bLkZf6IEE3Gap\
        2oD3pidf51iAfb7BBbeE36Hl3dPxAgfsSrc/v2HTRMYeeBb7fjFC50ImvxjtmFUI\
        xQIDAQAB";

    fn rsa_sign(data: &[u8]) -> String {
        let private_key =
            RsaPrivateKey::from_pkcs8_pem(include_str!("../../tests/keys/rsa2048.pem")).unwrap();
        let hashed = digest(HashAlgorithm::Sha256, data);
        let signature = private_key.sign(Pkcs1v15Sign::new::<Sha256>(), &hashed).unwrap();
        util::encode_base64(signature)
    }

    #[test]
    fn parse_algorithm_names() {
        assert_eq!("RSA".parse(), Ok(KeyType::Rsa));
        assert_eq!("ed25519".parse(), Ok(KeyType::Ed25519));
        assert!("dsa".parse::<KeyType>().is_err());

        assert_eq!("sha256".parse(), Ok(HashAlgorithm::Sha256));
        assert!("cablecat".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn validate_signature_malformed_input() {
        assert_eq!(
            validate_signature("abc", "%%%", b"abc", "sha256"),
            Err(CryptoError::InvalidBase64Signature)
        );
        assert_eq!(
            validate_signature("abc", &util::encode_base64("123"), b"abc", "sha256"),
            Err(CryptoError::InvalidKey)
        );
        assert!(validate_signature("abc", "abc", b"abc", "sha256").is_err());
    }

    #[test]
    fn validate_signature_unknown_hash_algorithm() {
        let signature = rsa_sign(b"who ate my email?");

        assert_eq!(
            validate_signature(RSA_PUBLIC_KEY, &signature, b"who ate my email?", "cablecat"),
            Err(CryptoError::UnsupportedHashAlgorithm("cablecat".into()))
        );
    }

    #[test]
    fn validate_signature_ok() {
        let text = b"who ate my email?";
        let signature = rsa_sign(text);

        assert_eq!(validate_signature(RSA_PUBLIC_KEY, &signature, text, "sha256"), Ok(true));
        assert_eq!(
            validate_signature(RSA_PUBLIC_KEY, &signature, b"who ate my homework?", "sha256"),
            Ok(false)
        );
    }

    #[test]
    fn validate_signature_corrupt_key() {
        let text = b"who ate my email?";
        let signature = rsa_sign(text);

        let corrupt_key = RSA_PUBLIC_KEY.replacen("MIIBIjANBgkq", "MIIBIjANBgkr", 1);

        assert!(!matches!(
            validate_signature(&corrupt_key, &signature, text, "sha256"),
            Ok(true)
        ));
    }

    #[test]
    fn validate_ed25519_signature_ok() {
        let signing_key = SigningKey::from_bytes(&[7; 32]);
        let public_key = util::encode_base64(signing_key.verifying_key().as_bytes());

        let text = b"who ate my email?";
        let signature = signing_key.sign(&digest(HashAlgorithm::Sha256, text));
        let signature = util::encode_base64(signature.to_bytes());

        assert_eq!(validate_ed25519_signature(&public_key, &signature, text), Ok(true));
        assert_eq!(
            validate_ed25519_signature(&public_key, &signature, b"who ate my homework?"),
            Ok(false)
        );
    }

    #[test]
    fn verifying_key_sizes() {
        let key = VerifyingKey::from_base64(KeyType::Rsa, RSA_PUBLIC_KEY).unwrap();

        assert_eq!(key.key_type(), KeyType::Rsa);
        assert_eq!(key.key_size(), Some(2048));

        assert_eq!(
            VerifyingKey::from_base64(KeyType::Ed25519, RSA_PUBLIC_KEY).unwrap_err(),
            CryptoError::InvalidKey
        );
    }
}
