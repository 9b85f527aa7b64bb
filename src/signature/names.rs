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

//! Syntax checks and comparisons for domain names and selectors.

const MAX_DOMAIN_LENGTH: usize = 253;

/// Checks the syntax of a signing domain (`d=` tag).
///
/// The domain must be non-empty, must not begin or end with a dot, and must not
/// contain empty labels. Labels consist of letters, digits, `-` and `_`;
/// non-ASCII characters are allowed for internationalized names.
pub fn is_valid_domain(s: &str) -> bool {
    matches!(s.len(), 1..=MAX_DOMAIN_LENGTH) && s.split('.').all(is_label)
}

/// Checks the syntax of a selector (`s=` tag).
///
/// Selectors follow the same rules as domains, there is however no overall
/// length limit.
pub fn is_valid_selector(s: &str) -> bool {
    !s.is_empty() && s.split('.').all(is_label)
}

// lenient: allows things like "dkim_123"
fn is_label(s: &str) -> bool {
    matches!(s.len(), 1..=63)
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_') || !c.is_ascii())
}

/// Converts a domain or selector to its ASCII form, for use in a DNS query.
///
/// Returns `None` if the name is not syntactically valid.
pub fn to_ascii_domain(s: &str) -> Option<String> {
    if !is_valid_selector(s) {
        return None;
    }

    if s.is_ascii() {
        Some(s.into())
    } else {
        idna::domain_to_ascii(s).ok().filter(|d| !d.is_empty())
    }
}

fn to_ascii_lowercase_domain(s: &str) -> String {
    match idna::domain_to_ascii(s) {
        Ok(d) if !d.is_empty() => d,
        _ => s.to_ascii_lowercase(),
    }
}

/// Compares two domains for equivalence, in case-insensitive and IDNA-aware
/// manner.
pub fn domains_equal(name: &str, other: &str) -> bool {
    name.eq_ignore_ascii_case(other)
        || to_ascii_lowercase_domain(name) == to_ascii_lowercase_domain(other)
}

/// Checks whether `name` is the same domain as `other`, or a subdomain of it.
pub fn eq_or_subdomain_of(name: &str, other: &str) -> bool {
    if domains_equal(name, other) {
        return true;
    }

    let name = to_ascii_lowercase_domain(name);
    let other = to_ascii_lowercase_domain(other);

    match name.strip_suffix(&other) {
        Some(prefix) => prefix.len() > 1 && prefix.ends_with('.'),
        None => false,
    }
}

/// An agent or user identifier, as given in the `i=` tag.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Identity {
    pub local_part: Option<String>,
    pub domain: String,
}

impl Identity {
    /// Parses an identifier of the form `[local-part] "@" domain`.
    ///
    /// The domain part follows the last `@`.
    pub fn parse(s: &str) -> Option<Self> {
        let (local_part, domain) = s.rsplit_once('@')?;

        if !is_valid_domain(domain) {
            return None;
        }

        let local_part = if local_part.is_empty() {
            None
        } else {
            Some(local_part.into())
        };

        Some(Self {
            local_part,
            domain: domain.into(),
        })
    }
}
