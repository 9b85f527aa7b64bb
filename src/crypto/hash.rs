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

use crate::crypto::HashAlgorithm;
use digest::DynDigest;
#[cfg(feature = "pre-rfc8301")]
use sha1::Sha1;
use sha2::Sha256;

fn new_digest(hash_alg: HashAlgorithm) -> Box<dyn DynDigest + Send> {
    match hash_alg {
        HashAlgorithm::Sha256 => Box::new(Sha256::default()),
        #[cfg(feature = "pre-rfc8301")]
        HashAlgorithm::Sha1 => Box::new(Sha1::default()),
    }
}

/// Computes the digest of some data.
pub fn digest(hash_alg: HashAlgorithm, data: &[u8]) -> Box<[u8]> {
    let mut digest = new_digest(hash_alg);
    digest.update(data);
    digest.finalize()
}

/// An error indicating that less input than the announced length was hashed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InsufficientInput;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HashStatus {
    AllConsumed,  // input was digested entirely
    Truncated,  // input was only partially digested, part of it was ignored
}

/// A hasher that digests at most a given number of bytes.
///
/// This is used for the body hash, where the `l=` tag limits how much of the
/// canonicalized body is covered by the signature.
pub struct CountingHasher {
    digest: Box<dyn DynDigest + Send>,
    length: Option<usize>,
    bytes_written: usize,
}

impl CountingHasher {
    pub fn new(hash_alg: HashAlgorithm, length: Option<usize>) -> Self {
        Self {
            digest: new_digest(hash_alg),
            length,
            bytes_written: 0,
        }
    }

    pub fn update(&mut self, bytes: &[u8]) -> HashStatus {
        match self.length {
            Some(len) => {
                let bytes_left_to_write = len - self.bytes_written;

                if bytes_left_to_write >= bytes.len() {
                    self.digest.update(bytes);
                    self.bytes_written += bytes.len();
                    HashStatus::AllConsumed
                } else {
                    self.digest.update(&bytes[..bytes_left_to_write]);
                    self.bytes_written += bytes_left_to_write;
                    HashStatus::Truncated
                }
            }
            None => {
                self.digest.update(bytes);
                self.bytes_written += bytes.len();
                HashStatus::AllConsumed
            }
        }
    }

    /// Returns the digest and the number of bytes digested.
    pub fn finish(self) -> Result<(Box<[u8]>, usize), InsufficientInput> {
        if self.length.is_some() && !self.is_done() {
            return Err(InsufficientInput);
        }

        Ok((self.digest.finalize(), self.bytes_written))
    }

    pub fn is_done(&self) -> bool {
        matches!(self.length, Some(len) if len == self.bytes_written)
    }
}
