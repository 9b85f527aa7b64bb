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

use crate::{error::CryptoError, util};
use ed25519_dalek::{pkcs8::DecodePublicKey, Signature, Verifier, VerifyingKey};

/// Reads an Ed25519 public key from the Base64 key material in a `p=` tag.
///
/// RFC 8463 prescribes the 32 raw key bytes. Keys in SubjectPublicKeyInfo
/// format, as output by OpenSSL, are accepted as well.
pub fn read_ed25519_verifying_key(key_base64: &str) -> Result<VerifyingKey, CryptoError> {
    let key_data = util::decode_base64(key_base64).map_err(|_| CryptoError::InvalidKey)?;

    VerifyingKey::try_from(&key_data[..])
        .or_else(|_| VerifyingKey::from_public_key_der(&key_data))
        .map_err(|_| CryptoError::InvalidKey)
}

/// Verifies an Ed25519 signature over a precomputed digest.
///
/// In DKIM, the Ed25519 message is the SHA-256 digest of the signed data
/// (RFC 8463, section 3).
pub fn verify_ed25519(
    verifying_key: &VerifyingKey,
    hashed: &[u8],
    signature_data: &[u8],
) -> Result<bool, CryptoError> {
    let signature = Signature::from_slice(signature_data).map_err(|_| CryptoError::Verification)?;

    Ok(verifying_key.verify(hashed, &signature).is_ok())
}
