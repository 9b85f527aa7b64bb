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

//! Parsed email messages.

use crate::{
    canonicalize::DkimHeader,
    error::HeaderError,
    header::HeaderRecord,
    parse::{is_wsp, CRLF},
};
use bstr::ByteSlice;

/// An email message split into its headers and its body.
///
/// Lines must be terminated with CRLF.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    headers: Vec<HeaderRecord>,
    body: Vec<u8>,
}

impl Message {
    /// Parses a raw message.
    ///
    /// The header section ends at the first empty line; everything after it is
    /// the body. A message without an empty line has only headers and an
    /// empty body.
    ///
    /// # Errors
    ///
    /// Returns an error if a header in the header section is malformed.
    pub fn parse(raw: &[u8]) -> Result<Self, HeaderError> {
        let (header_section, body) = split_message(raw);

        let headers = split_header_blocks(header_section)
            .into_iter()
            .map(HeaderRecord::parse)
            .collect::<Result<_, _>>()?;

        Ok(Self {
            headers,
            body: body.to_vec(),
        })
    }

    /// The headers, in message order.
    pub fn headers(&self) -> &[HeaderRecord] {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The *DKIM-Signature* headers, in message order.
    pub fn signature_headers(&self) -> impl Iterator<Item = &HeaderRecord> {
        self.headers
            .iter()
            .filter(|h| DkimHeader::new(h).is_signature_header())
    }
}

fn split_message(raw: &[u8]) -> (&[u8], &[u8]) {
    if let Some(body) = raw.strip_prefix(CRLF) {
        return (&raw[..0], body);
    }

    match raw.find(b"\r\n\r\n") {
        // the header section keeps the line break of its last line
        Some(i) => (&raw[..(i + 2)], &raw[(i + 4)..]),
        None => (raw, &raw[raw.len()..]),
    }
}

// Groups lines into header blocks, each a line followed by its continuation
// lines, with line breaks retained.
fn split_header_blocks(header_section: &[u8]) -> Vec<Vec<u8>> {
    let mut blocks: Vec<Vec<u8>> = vec![];

    let mut rest = header_section;
    while !rest.is_empty() {
        let line_len = match rest.find(CRLF) {
            Some(i) => i + CRLF.len(),
            None => rest.len(),
        };
        let (line, tail) = rest.split_at(line_len);
        rest = tail;

        match blocks.last_mut() {
            Some(block) if matches!(line.first(), Some(&b) if is_wsp(b)) => {
                block.extend(line);
            }
            _ => blocks.push(line.to_vec()),
        }
    }

    blocks
}
