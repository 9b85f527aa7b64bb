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

//! Representation of DKIM signatures.

mod names;

pub use names::{
    domains_equal, eq_or_subdomain_of, is_valid_domain, is_valid_selector, to_ascii_domain,
    Identity,
};

use crate::{
    crypto::{HashAlgorithm, KeyType},
    tag_list::{parse_colon_separated_tag_value, TagSet},
    util::CanonicalStr,
};
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// The tags that every DKIM signature must carry.
pub const REQUIRED_TAGS: [&str; 7] = ["v", "a", "b", "bh", "d", "h", "s"];

/// The only query method defined for retrieving public keys.
pub const DNS_TXT_QUERY_METHOD: &str = "dns/txt";

/// A signature algorithm.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SignatureAlgorithm {
    /// The *rsa-sha256* signature algorithm.
    RsaSha256,
    /// The historic *rsa-sha1* signature algorithm.
    #[cfg(feature = "pre-rfc8301")]
    RsaSha1,
    /// The *ed25519-sha256* signature algorithm.
    Ed25519Sha256,
}

impl SignatureAlgorithm {
    /// Returns this signature algorithm’s key type.
    pub fn to_key_type(self) -> KeyType {
        match self {
            Self::RsaSha256 => KeyType::Rsa,
            #[cfg(feature = "pre-rfc8301")]
            Self::RsaSha1 => KeyType::Rsa,
            Self::Ed25519Sha256 => KeyType::Ed25519,
        }
    }

    /// Returns this signature algorithm’s hash algorithm.
    pub fn to_hash_algorithm(self) -> HashAlgorithm {
        match self {
            Self::RsaSha256 | Self::Ed25519Sha256 => HashAlgorithm::Sha256,
            #[cfg(feature = "pre-rfc8301")]
            Self::RsaSha1 => HashAlgorithm::Sha1,
        }
    }
}

impl CanonicalStr for SignatureAlgorithm {
    fn canonical_str(&self) -> &'static str {
        match self {
            Self::RsaSha256 => "rsa-sha256",
            #[cfg(feature = "pre-rfc8301")]
            Self::RsaSha1 => "rsa-sha1",
            Self::Ed25519Sha256 => "ed25519-sha256",
        }
    }
}

impl Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_str())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key_type, hash_alg) = s.split_once('-').ok_or("unknown signature algorithm")?;

        match (KeyType::from_str(key_type)?, HashAlgorithm::from_str(hash_alg)?) {
            (KeyType::Rsa, HashAlgorithm::Sha256) => Ok(Self::RsaSha256),
            #[cfg(feature = "pre-rfc8301")]
            (KeyType::Rsa, HashAlgorithm::Sha1) => Ok(Self::RsaSha1),
            (KeyType::Ed25519, HashAlgorithm::Sha256) => Ok(Self::Ed25519Sha256),
            #[cfg(feature = "pre-rfc8301")]
            (KeyType::Ed25519, HashAlgorithm::Sha1) => Err("unknown signature algorithm"),
        }
    }
}

/// A canonicalization algorithm.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum CanonicalizationAlgorithm {
    /// The *simple* canonicalization algorithm.
    #[default]
    Simple,
    /// The *relaxed* canonicalization algorithm.
    Relaxed,
}

impl CanonicalStr for CanonicalizationAlgorithm {
    fn canonical_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Relaxed => "relaxed",
        }
    }
}

impl Display for CanonicalizationAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_str())
    }
}

impl FromStr for CanonicalizationAlgorithm {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("simple") {
            Ok(Self::Simple)
        } else if s.eq_ignore_ascii_case("relaxed") {
            Ok(Self::Relaxed)
        } else {
            Err("unknown canonicalization algorithm")
        }
    }
}

/// A pair of header/body canonicalization algorithms, as given in the `c=`
/// tag.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Canonicalization {
    pub header: CanonicalizationAlgorithm,
    pub body: CanonicalizationAlgorithm,
}

impl Display for Canonicalization {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.header, self.body)
    }
}

impl FromStr for Canonicalization {
    type Err = &'static str;

    // `c=relaxed` means relaxed/simple
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (header, body) = match s.split_once('/') {
            Some((header, body)) => (header.parse()?, body.parse()?),
            None => (s.parse()?, Default::default()),
        };

        Ok(Self { header, body })
    }
}

/// Checks whether a `q=` tag value names a supported query method.
///
/// The value is a colon-separated list; the method `dns/txt` must be among
/// its entries.
pub fn supports_dns_txt_query(value: &str) -> bool {
    parse_colon_separated_tag_value(value)
        .iter()
        .any(|method| method.eq_ignore_ascii_case(DNS_TXT_QUERY_METHOD))
}

/// An error that occurs when building a [`Signature`] from its tags.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SignatureError {
    MissingTag(&'static str),
    UnsupportedAlgorithm(String),
    UnsupportedCanonicalization(String),
    InvalidBodyLength(String),
    InvalidTimestamp(String),
    InvalidExpiration(String),
}

impl Display for SignatureError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTag(name) => write!(f, "Signature is missing required tag: {name}"),
            Self::UnsupportedAlgorithm(a) => write!(f, "Unsupported signature algorithm: {a}"),
            Self::UnsupportedCanonicalization(c) => {
                write!(f, "Unsupported canonicalization algorithm: {c}")
            }
            Self::InvalidBodyLength(l) => write!(f, "Invalid body length: {l}"),
            Self::InvalidTimestamp(t) => write!(f, "Invalid signature timestamp: {t}"),
            Self::InvalidExpiration(x) => write!(f, "Invalid signature expiration: {x}"),
        }
    }
}

impl Error for SignatureError {}

/// A typed view of a DKIM signature.
///
/// Constructed from the tags of a signature header once the required tags are
/// known to be present. Syntax of domain, selector and identity is not checked
/// here, that is left to the validation pipeline.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Signature {
    pub version: String,
    pub algorithm: SignatureAlgorithm,
    pub signature: String,
    pub body_hash: String,
    pub canonicalization: Canonicalization,
    pub domain: String,
    pub signed_headers: Vec<String>,
    pub identity: Option<String>,
    pub body_length: Option<usize>,
    pub query_methods: Option<String>,
    pub selector: String,
    pub timestamp: Option<u64>,
    pub expiration: Option<u64>,
}

impl Signature {
    pub fn from_tags(tags: &TagSet) -> Result<Self, SignatureError> {
        let required = |name: &'static str| tags.get(name).ok_or(SignatureError::MissingTag(name));

        let version = required("v")?.into();

        let a = required("a")?;
        let algorithm = a
            .parse()
            .map_err(|_| SignatureError::UnsupportedAlgorithm(a.into()))?;

        let canonicalization = match tags.get("c") {
            Some(c) => c
                .parse()
                .map_err(|_| SignatureError::UnsupportedCanonicalization(c.into()))?,
            None => Canonicalization::default(),
        };

        let body_length = tags
            .get("l")
            .map(|l| l.parse().map_err(|_| SignatureError::InvalidBodyLength(l.into())))
            .transpose()?;
        let timestamp = tags
            .get("t")
            .map(|t| t.parse().map_err(|_| SignatureError::InvalidTimestamp(t.into())))
            .transpose()?;
        let expiration = tags
            .get("x")
            .map(|x| x.parse().map_err(|_| SignatureError::InvalidExpiration(x.into())))
            .transpose()?;

        let signed_headers = parse_colon_separated_tag_value(required("h")?)
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(Self {
            version,
            algorithm,
            signature: required("b")?.into(),
            body_hash: required("bh")?.into(),
            canonicalization,
            domain: required("d")?.into(),
            signed_headers,
            identity: tags.get("i").map(Into::into),
            body_length,
            query_methods: tags.get("q").map(Into::into),
            selector: required("s")?.into(),
            timestamp,
            expiration,
        })
    }

    /// Whether the `h=` tag lists the given header, ignoring case.
    pub fn signs_header(&self, name: &str) -> bool {
        self.signed_headers.iter().any(|h| h.eq_ignore_ascii_case(name))
    }
}
