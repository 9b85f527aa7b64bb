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

//! Error types.
//!
//! The errors in this module signal structurally invalid input to one of the
//! building blocks of this library. They are distinct from the failures that
//! are recorded for a DKIM signature in a
//! [`ValidationResult`][crate::ValidationResult]: those are expected outcomes
//! of validation and never surface as `Err` values.

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    io,
};

/// An error indicating that the caller supplied structurally invalid input.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ArgumentError {
    /// A header was constructed from an empty string.
    EmptyHeader,
    /// Tag extraction was attempted on a header that is not a signature header.
    NotSignatureHeader,
    /// Canonicalization was requested for an empty set of headers.
    NoHeaders,
}

impl Display for ArgumentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyHeader => write!(f, "header is empty"),
            Self::NotSignatureHeader => write!(f, "not a DKIM signature header"),
            Self::NoHeaders => write!(f, "no headers to canonicalize"),
        }
    }
}

impl Error for ArgumentError {}

/// An error indicating that a header block violates RFC 5322 folding rules.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum HeaderParseError {
    /// The first line of the header block is a continuation line.
    FoldedFirstLine,
    /// A line is neither a `label: value` line nor a continuation line.
    InvalidLine,
    /// The header label contains disallowed characters.
    InvalidLabel,
}

impl Display for HeaderParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::FoldedFirstLine => write!(f, "header starts with a folded line"),
            Self::InvalidLine => write!(f, "invalid line in header"),
            Self::InvalidLabel => write!(f, "invalid header label"),
        }
    }
}

impl Error for HeaderParseError {}

/// An error that occurs when parsing a header or a message.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum HeaderError {
    Argument(ArgumentError),
    Parse(HeaderParseError),
}

impl Display for HeaderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Argument(error) => error.fmt(f),
            Self::Parse(error) => error.fmt(f),
        }
    }
}

impl Error for HeaderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Argument(error) => Some(error),
            Self::Parse(error) => Some(error),
        }
    }
}

impl From<ArgumentError> for HeaderError {
    fn from(error: ArgumentError) -> Self {
        Self::Argument(error)
    }
}

impl From<HeaderParseError> for HeaderError {
    fn from(error: HeaderParseError) -> Self {
        Self::Parse(error)
    }
}

/// An error that occurs while retrieving public key records.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DnsError {
    /// The signing domain cannot be used in a DNS query.
    InvalidDomain(String),
    /// The selector cannot be used in a DNS query.
    InvalidSelector(String),
    /// The resolver failed with an error other than ‘not found’.
    Lookup(io::ErrorKind),
    /// A TXT record could not be parsed into tags.
    RecordFormat(String),
}

impl Display for DnsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDomain(domain) => write!(f, "invalid domain: {domain}"),
            Self::InvalidSelector(selector) => write!(f, "invalid selector: {selector}"),
            Self::Lookup(kind) => write!(f, "DNS lookup failed: {kind}"),
            Self::RecordFormat(record) => write!(f, "invalid key record format: {record}"),
        }
    }
}

impl Error for DnsError {}

impl From<io::Error> for DnsError {
    fn from(error: io::Error) -> Self {
        Self::Lookup(error.kind())
    }
}

/// An error that occurs when handing data to the cryptographic primitives.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CryptoError {
    /// The signature is not valid Base64.
    InvalidBase64Signature,
    /// The public key material cannot be used.
    InvalidKey,
    /// The hash algorithm name is not supported.
    UnsupportedHashAlgorithm(String),
    /// The verification primitive failed for a reason other than a mismatch.
    Verification,
}

impl Display for CryptoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBase64Signature => write!(f, "signature is not valid Base64"),
            Self::InvalidKey => write!(f, "invalid public key"),
            Self::UnsupportedHashAlgorithm(name) => {
                write!(f, "unsupported hash algorithm: {name}")
            }
            Self::Verification => write!(f, "signature verification error"),
        }
    }
}

impl Error for CryptoError {}
