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

use crate::{crypto::HashAlgorithm, error::CryptoError, util};
use pkcs8::DecodePublicKey;
use rsa::{pkcs1::DecodeRsaPublicKey, traits::PublicKeyParts, Pkcs1v15Sign, RsaPublicKey};
#[cfg(feature = "pre-rfc8301")]
use sha1::Sha1;
use sha2::Sha256;

const PEM_LINE_WIDTH: usize = 64;

pub fn get_public_key_size(k: &RsaPublicKey) -> usize {
    k.size() * 8
}

/// Wraps Base64 key material from a `p=` tag in a PEM public key envelope.
pub fn to_public_key_pem(key_base64: &str) -> String {
    let chars: Vec<char> = key_base64
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let mut pem = String::from("-----BEGIN PUBLIC KEY-----\n");
    for line in chars.chunks(PEM_LINE_WIDTH) {
        pem.extend(line);
        pem.push('\n');
    }
    pem.push_str("-----END PUBLIC KEY-----\n");
    pem
}

/// Reads an RSA public key from the Base64 key material in a `p=` tag.
pub fn read_rsa_public_key(key_base64: &str) -> Result<RsaPublicKey, CryptoError> {
    // first the SubjectPublicKeyInfo format used in practice, then the
    // RSAPublicKey format that RFC 6376 actually prescribes
    if let Ok(public_key) = RsaPublicKey::from_public_key_pem(&to_public_key_pem(key_base64)) {
        return Ok(public_key);
    }

    let key_data = util::decode_base64(key_base64).map_err(|_| CryptoError::InvalidKey)?;

    RsaPublicKey::from_pkcs1_der(&key_data).map_err(|_| CryptoError::InvalidKey)
}

/// Verifies an RSASSA-PKCS1-v1_5 signature over a precomputed digest.
///
/// A signature that does not match yields `Ok(false)`.
pub fn verify_rsa(
    hash_alg: HashAlgorithm,
    public_key: &RsaPublicKey,
    hashed: &[u8],
    signature_data: &[u8],
) -> Result<bool, CryptoError> {
    let scheme = match hash_alg {
        HashAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
        #[cfg(feature = "pre-rfc8301")]
        HashAlgorithm::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
    };

    match public_key.verify(scheme, hashed, signature_data) {
        Ok(()) => Ok(true),
        Err(rsa::Error::Verification) => Ok(false),
        Err(_) => Err(CryptoError::Verification),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash;
    use rsa::{pkcs8::DecodePrivateKey, RsaPrivateKey};

    const PUBLIC_KEY: &str = "MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEAvXEn6j24wx68Zs5djoKQ\
        LFXcGUUPzvAAfrc9RKzBQG+dglfdCqZy2ZFai4SlLivvkkCU+0wXl+ExSSY5xEiQ\
        k7m3YQZbeIAeSWUTLe7asTri73c7nX5D7+1KKWUarMHKLeWN5F9Re8uOfWrgZdYC\
        20bfoptbMQLLPcbfchP9Z7epZRwdi6xeZySFO2JnwyK2kEay7VpF7YivwQzMohF2\
        hlQ9OshDIa2w7uudKp5jAcOVymPTi3iu6tEI/3NNkcezukVawN6bLkZf6IEE3Gap\
        2oD3pidf51iAfb7BBbeE36Hl3dPxAgfsSrc/v2HTRMYeeBb7fjFC50ImvxjtmFUI\
        xQIDAQAB";

    #[test]
    fn pem_envelope_wraps_lines() {
        let pem = to_public_key_pem("  abc\r\n def ");

        assert_eq!(pem, "-----BEGIN PUBLIC KEY-----\nabcdef\n-----END PUBLIC KEY-----\n");

        let pem = to_public_key_pem(PUBLIC_KEY);
        let lines: Vec<_> = pem.lines().collect();

        assert_eq!(lines.len(), 9);
        assert!(lines[1..7].iter().all(|l| l.len() == 64));
    }

    #[test]
    fn read_spki_and_pkcs1_keys() {
        let public_key = read_rsa_public_key(PUBLIC_KEY).unwrap();

        assert_eq!(get_public_key_size(&public_key), 2048);

        // the same key as a bare RSAPublicKey: SubjectPublicKeyInfo wraps it
        // after a 24-byte prefix
        let spki = util::decode_base64(PUBLIC_KEY).unwrap();
        let pkcs1 = util::encode_base64(&spki[24..]);

        assert_eq!(read_rsa_public_key(&pkcs1).unwrap(), public_key);
    }

    #[test]
    fn read_invalid_key() {
        assert_eq!(read_rsa_public_key("abc"), Err(CryptoError::InvalidKey));
        assert_eq!(read_rsa_public_key("%%%"), Err(CryptoError::InvalidKey));
    }

    #[test]
    fn verify_rsa_ok() {
        let private_key =
            RsaPrivateKey::from_pkcs8_pem(include_str!("../../tests/keys/rsa2048.pem")).unwrap();
        let public_key = read_rsa_public_key(PUBLIC_KEY).unwrap();

        let hashed = hash::digest(HashAlgorithm::Sha256, b"who ate my email?");
        let signature = private_key
            .sign(Pkcs1v15Sign::new::<Sha256>(), &hashed)
            .unwrap();

        assert_eq!(verify_rsa(HashAlgorithm::Sha256, &public_key, &hashed, &signature), Ok(true));

        let other = hash::digest(HashAlgorithm::Sha256, b"who ate my email!");

        assert_eq!(verify_rsa(HashAlgorithm::Sha256, &public_key, &other, &signature), Ok(false));
    }
}
