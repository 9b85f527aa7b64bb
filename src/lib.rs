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

//! A library for validating *DomainKeys Identified Mail* (DKIM) signatures as
//! described in [RFC 6376].
//!
//! The entry point is [`Validator`]: it takes a parsed [`Message`], evaluates
//! every *DKIM-Signature* header in it, and returns [`ValidationResults`]
//! holding one [`ValidationResult`] per signature. Each result lists the
//! failures, warnings and passes recorded for its signature. The results can
//! be rendered as a plain-text report (via `Display`) or as JSON.
//!
//! Public keys are retrieved through the [`Resolver`] trait. An
//! implementation for a `HashMap` of fixed answers is always available.
//!
//! The building blocks used by the validator (header parsing,
//! canonicalization, tag lists, key records, cryptography) are public modules
//! and can be used on their own.
//!
//! # Usage
//!
//! ```
//! # async fn f() {
//! use dkim_validator::{Message, Validator};
//! use std::collections::HashMap;
//!
//! let resolver = HashMap::from([(
//!     "sel._domainkey.example.com".to_owned(),
//!     vec!["v=DKIM1; k=rsa; p=MIIBIjANBg...".to_owned()],
//! )]);
//!
//! let message = Message::parse(b"From: me@example.com\r\n\r\nHello!\r\n").unwrap();
//!
//! let results = Validator::new(resolver).validate(&message).await;
//!
//! println!("{results}");
//! # }
//! ```
//!
//! # Cargo features
//!
//! The feature **`hickory-resolver`** makes an implementation of
//! [`Resolver`] available for the Hickory DNS resolver.
//!
//! The feature **`pre-rfc8301`** reverts cryptographic algorithm and key usage
//! back to before [RFC 8301]: it lowers the default minimum RSA key size to
//! 512 bits, and enables dependency `sha1` and thereby the insecure, historic
//! *rsa-sha1* signature algorithm. Its use is strongly discouraged.
//!
//! [RFC 6376]: https://www.rfc-editor.org/rfc/rfc6376
//! [RFC 8301]: https://www.rfc-editor.org/rfc/rfc8301

pub mod canonicalize;
pub mod crypto;
mod encoded_word;
pub mod error;
pub mod header;
pub mod message;
mod parse;
pub mod record;
pub mod resolver;
pub mod result;
pub mod signature;
pub mod tag_list;
mod util;
pub mod validator;

pub use crate::{
    crypto::{validate_ed25519_signature, validate_signature},
    error::{ArgumentError, CryptoError, DnsError, HeaderError, HeaderParseError},
    header::HeaderRecord,
    message::Message,
    record::PublicKeyRecord,
    resolver::{Resolver, Timeout},
    result::{ValidationResult, ValidationResults},
    signature::{Signature, SignatureAlgorithm},
    tag_list::TagSet,
    util::CanonicalStr,
    validator::{Config, Validator},
};
