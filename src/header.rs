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

//! Representation of email header data.

use crate::{
    encoded_word,
    error::{ArgumentError, HeaderError, HeaderParseError},
    parse::{self, is_wsp, CRLF},
};
use bstr::{BStr, ByteSlice};
use std::{
    fmt::{self, Debug, Formatter},
    str,
};

/// One logical RFC 5322 header field, parsed from its raw bytes.
///
/// The raw bytes are kept verbatim, including folding and the trailing line
/// break, as they are needed for *simple* canonicalization.
#[derive(Clone, Eq, PartialEq)]
pub struct HeaderRecord {
    raw: Box<[u8]>,
    label: Box<str>,
    // value with continuation lines introduced by a single space, line breaks
    // between lines retained, final line break removed
    value: Box<[u8]>,
}

impl HeaderRecord {
    /// Parses a raw header block consisting of one `label: value` line and
    /// any number of folded continuation lines.
    pub fn parse(raw: impl Into<Box<[u8]>>) -> Result<Self, HeaderError> {
        let raw = raw.into();

        if raw.is_empty() {
            return Err(ArgumentError::EmptyHeader.into());
        }

        // the trailing line break belongs to the header, but is not a line of
        // its own
        let content = raw.trim_end_with(|c| matches!(c, '\r' | '\n'));

        let mut label = None;
        let mut value = vec![];

        for line in content.split_str(CRLF) {
            if matches!(line.first(), Some(&b) if is_wsp(b)) {
                if label.is_none() {
                    return Err(HeaderParseError::FoldedFirstLine.into());
                }
                value.extend(CRLF);
                value.push(b' ');
                value.extend(line.trim_start_with(|c| matches!(c, ' ' | '\t')));
            } else if label.is_none() {
                let (name, v) = parse_label_line(line)?;
                label = Some(name);
                value.extend(v);
            } else {
                return Err(HeaderParseError::InvalidLine.into());
            }
        }

        let label = label.ok_or(HeaderParseError::InvalidLine)?;

        Ok(Self {
            raw,
            label,
            value: value.into(),
        })
    }

    /// The exact original bytes of this header.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The header label, as written.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn lowercase_label(&self) -> String {
        self.label.to_ascii_lowercase()
    }

    /// The value as it appears in the header, still folded.
    pub fn raw_value(&self) -> &[u8] {
        &self.value
    }

    /// The value with folding line breaks collapsed, not decoded.
    pub fn unfolded_value(&self) -> Vec<u8> {
        parse::unfold(&self.value)
    }

    /// The unfolded value, with RFC 2047 encoded words decoded.
    pub fn value(&self) -> String {
        let unfolded = self.unfolded_value();
        let unfolded = unfolded.to_str_lossy();
        if unfolded.contains("=?") {
            encoded_word::decode(&unfolded)
        } else {
            unfolded.into_owned()
        }
    }

    /// The unfolded value as bytes, decoded only if it contains encoded words.
    ///
    /// Unlike [`HeaderRecord::value`], a value without encoded words keeps its
    /// bytes even when they are not UTF-8.
    pub fn decoded_value(&self) -> Vec<u8> {
        let unfolded = self.unfolded_value();
        if unfolded.find(b"=?").is_some() {
            encoded_word::decode(&unfolded.to_str_lossy()).into_bytes()
        } else {
            unfolded
        }
    }

    /// The value with all horizontal whitespace removed.
    ///
    /// This is the form in which tags are extracted from DKIM signature
    /// headers, whose Base64 payloads are wrapped purely for readability.
    pub fn value_without_spaces(&self) -> String {
        self.value().chars().filter(|&c| !matches!(c, ' ' | '\t')).collect()
    }

    /// Whether this header’s label equals `name`, ignoring case.
    pub fn has_label(&self, name: &str) -> bool {
        self.label.eq_ignore_ascii_case(name)
    }
}

impl Debug for HeaderRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderRecord")
            .field("label", &self.label)
            .field("value", &BStr::new(&self.value))
            .finish()
    }
}

// label-line = label *WSP ":" *WSP value
fn parse_label_line(line: &[u8]) -> Result<(Box<str>, &[u8]), HeaderParseError> {
    let colon = line.find_byte(b':').ok_or(HeaderParseError::InvalidLine)?;

    let name = line[..colon].trim_end_with(|c| matches!(c, ' ' | '\t'));
    if name.is_empty() || name.iter().any(|&b| is_wsp(b)) {
        return Err(HeaderParseError::InvalidLine);
    }
    if !name.iter().all(|b| b.is_ascii_graphic()) {
        return Err(HeaderParseError::InvalidLabel);
    }
    let name = str::from_utf8(name).map_err(|_| HeaderParseError::InvalidLabel)?;

    let value = line[(colon + 1)..].trim_start_with(|c| matches!(c, ' ' | '\t'));

    Ok((name.into(), value))
}
