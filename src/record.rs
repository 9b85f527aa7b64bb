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

//! DKIM public key record.

use crate::{
    error::DnsError,
    tag_list::{parse_colon_separated_tag_value, strip_fws_from_tag_value, TagSet},
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ServiceType {
    Any,
    Email,
    Other(String),
}

impl ServiceType {
    fn new(s: &str) -> Self {
        if s == "*" {
            Self::Any
        } else if s.eq_ignore_ascii_case("email") {
            Self::Email
        } else {
            Self::Other(s.into())
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Flag {
    Testing,
    NoSubdomains,
    Other(String),
}

impl Flag {
    fn new(s: &str) -> Self {
        if s.eq_ignore_ascii_case("y") {
            Self::Testing
        } else if s.eq_ignore_ascii_case("s") {
            Self::NoSubdomains
        } else {
            Self::Other(s.into())
        }
    }
}

/// A DKIM public key record, as published in a DNS TXT record.
///
/// All tags are retained as given; the accessors interpret the tags that
/// matter for validation. Defaults from RFC 6376, section 3.6.1, are not filled
/// in: absent tags read as `None`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PublicKeyRecord {
    tags: TagSet,
}

impl PublicKeyRecord {
    /// Parses a key record from the text of a TXT record.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::RecordFormat`] if the text is not a tag list.
    pub fn parse(s: &str) -> Result<Self, DnsError> {
        TagSet::parse_record(s).map(Self::from_tags)
    }

    pub fn from_tags(tags: TagSet) -> Self {
        Self { tags }
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// The `v=` tag.
    pub fn version(&self) -> Option<&str> {
        self.tags.get("v")
    }

    /// The `k=` tag.
    pub fn key_type(&self) -> Option<&str> {
        self.tags.get("k")
    }

    /// The entries of the `h=` tag.
    pub fn hash_algorithms(&self) -> Option<Vec<&str>> {
        self.tags.get("h").map(parse_colon_separated_tag_value)
    }

    /// The entries of the `s=` tag.
    pub fn service_types(&self) -> Option<Vec<ServiceType>> {
        self.tags.get("s").map(|s| {
            parse_colon_separated_tag_value(s)
                .into_iter()
                .map(ServiceType::new)
                .collect()
        })
    }

    /// Whether the key may be used for email, according to its `s=` tag.
    pub fn permits_email(&self) -> bool {
        match self.service_types() {
            Some(service_types) => service_types
                .iter()
                .any(|s| matches!(s, ServiceType::Any | ServiceType::Email)),
            None => true,
        }
    }

    /// The entries of the `t=` tag.
    pub fn flags(&self) -> Vec<Flag> {
        self.tags
            .get("t")
            .map(|t| parse_colon_separated_tag_value(t).into_iter().map(Flag::new).collect())
            .unwrap_or_default()
    }

    pub fn is_testing(&self) -> bool {
        self.flags().contains(&Flag::Testing)
    }

    pub fn forbids_subdomains(&self) -> bool {
        self.flags().contains(&Flag::NoSubdomains)
    }

    /// The `p=` tag, with whitespace removed.
    pub fn public_key(&self) -> Option<String> {
        self.tags.get("p").map(strip_fws_from_tag_value)
    }

    /// Whether the key has been revoked, signalled by an empty `p=` tag.
    pub fn is_revoked(&self) -> bool {
        matches!(self.public_key(), Some(p) if p.is_empty())
    }
}
