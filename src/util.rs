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

use crate::tag_list::strip_fws_from_tag_value;
use base64ct::{Base64, Encoding};

/// A trait for entities that have a canonical string form, as used in DKIM
/// tag values.
pub trait CanonicalStr {
    /// Returns the canonical string form of this entity.
    fn canonical_str(&self) -> &'static str;
}

/// Decodes a Base64 tag value, ignoring any embedded whitespace.
pub fn decode_base64(s: &str) -> Result<Vec<u8>, base64ct::Error> {
    Base64::decode_vec(&strip_fws_from_tag_value(s))
}

pub fn encode_base64(bytes: impl AsRef<[u8]>) -> String {
    Base64::encode_string(bytes.as_ref())
}
