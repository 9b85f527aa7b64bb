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

//! Canonicalization utilities.

use crate::{
    error::{ArgumentError, HeaderError},
    header::HeaderRecord,
    parse::CRLF,
    signature::CanonicalizationAlgorithm,
    tag_list,
};
use bstr::ByteSlice;
use std::{borrow::Cow, collections::HashSet};

/// The name of the DKIM signature header.
pub const DKIM_SIGNATURE_NAME: &str = "DKIM-Signature";

const SP: u8 = b' ';
const CR: u8 = b'\r';
const LF: u8 = b'\n';

/// A view of a header that provides the DKIM canonicalizations and
/// signature-header helpers.
#[derive(Clone, Copy, Debug)]
pub struct DkimHeader<'a> {
    header: &'a HeaderRecord,
    decode_encoded_words: bool,
}

impl<'a> DkimHeader<'a> {
    /// Creates a view that decodes RFC 2047 encoded words in relaxed mode.
    pub fn new(header: &'a HeaderRecord) -> Self {
        Self {
            header,
            decode_encoded_words: true,
        }
    }

    /// Sets whether relaxed canonicalization decodes encoded words. When
    /// off, the raw unfolded value is used, as most signers do.
    pub fn decode_encoded_words(mut self, value: bool) -> Self {
        self.decode_encoded_words = value;
        self
    }

    /// Whether this is a *DKIM-Signature* header.
    pub fn is_signature_header(&self) -> bool {
        self.header.has_label(DKIM_SIGNATURE_NAME)
    }

    /// Returns the header unchanged, including folding and case.
    pub fn simple(&self) -> Vec<u8> {
        self.header.raw().to_vec()
    }

    /// Returns `label:value` followed by a line break, with the label
    /// lowercased and whitespace in the unfolded, decoded value compressed.
    pub fn relaxed(&self) -> Vec<u8> {
        let value = if self.decode_encoded_words {
            self.header.decoded_value()
        } else {
            self.header.unfolded_value()
        };

        let mut result = vec![];
        result.extend(self.header.lowercase_label().trim().bytes());
        result.push(b':');
        canonicalize_header_relaxed(&mut result, &value);
        result.extend(CRLF);
        result
    }

    pub fn canonicalize(&self, algorithm: CanonicalizationAlgorithm) -> Vec<u8> {
        match algorithm {
            CanonicalizationAlgorithm::Simple => self.simple(),
            CanonicalizationAlgorithm::Relaxed => self.relaxed(),
        }
    }

    /// Canonicalizes this signature header for inclusion in the header hash:
    /// the `b=` value is removed, and the final line break is not included.
    pub fn canonicalize_unsigned(
        &self,
        algorithm: CanonicalizationAlgorithm,
    ) -> Result<Vec<u8>, HeaderError> {
        let unsigned = HeaderRecord::parse(remove_signature_value(self.header.raw()))?;

        let mut result = DkimHeader::new(&unsigned)
            .decode_encoded_words(self.decode_encoded_words)
            .canonicalize(algorithm);
        if result.ends_with(CRLF) {
            result.truncate(result.len() - CRLF.len());
        }

        Ok(result)
    }
}

fn canonicalize_header_relaxed(result: &mut Vec<u8>, value: &[u8]) {
    fn is_space(c: char) -> bool {
        matches!(c, ' ' | '\t' | '\r' | '\n')
    }

    let value = value.trim_with(is_space);

    let mut compressing = false;
    for &b in value {
        if is_space(b.into()) {
            if !compressing {
                result.push(SP);
                compressing = true;
            }
        } else {
            result.push(b);
            compressing = false;
        }
    }
}

/// Replaces the value of the `b=` tag in a raw signature header with the empty
/// string, keeping everything else, including the final line break.
pub fn remove_signature_value(raw: &[u8]) -> Vec<u8> {
    let Some(colon) = raw.find_byte(b':') else {
        return raw.to_vec();
    };

    let (name, rest) = raw.split_at(colon + 1);
    let (value, line_break) = match rest.strip_suffix(CRLF) {
        Some(value) => (value, CRLF),
        None => (rest, &b""[..]),
    };

    let mut result = name.to_vec();
    result.extend(blank_b_tag(value).iter());
    result.extend(line_break);
    result
}

fn blank_b_tag(value: &[u8]) -> Cow<'_, [u8]> {
    fn b_tag_prefix_len(s: &[u8]) -> Option<usize> {
        let (rest, _) = tag_list::strip_tag_name_and_equals(s).filter(|(_, name)| *name == b"b")?;
        Some(s.len() - rest.len())
    }

    let mut last_i = 0;

    for (i, _) in value.iter().enumerate().filter(|&(_, &b)| b == b';') {
        if let Some(n) = b_tag_prefix_len(&value[last_i..i]) {
            let mut result = value[..(last_i + n)].to_vec();
            result.extend(&value[i..]);
            return result.into();
        }
        last_i = i + 1;
    }

    if last_i != value.len() {
        if let Some(n) = b_tag_prefix_len(&value[last_i..]) {
            return value[..(last_i + n)].into();
        }
    }

    value.into()
}

/// Selects the headers named in `names` from `headers`, in the order of
/// `names`.
///
/// A name listed repeatedly selects the occurrences of that header from the
/// bottom up; names without a (remaining) matching header select nothing.
pub fn select_headers<'a, S: AsRef<str>>(
    headers: &'a [HeaderRecord],
    names: &[S],
) -> Vec<&'a HeaderRecord> {
    let mut result = vec![];
    let mut processed_indexes = HashSet::with_capacity(names.len());

    for name in names {
        let name = name.as_ref();
        if let Some((i, header)) = headers
            .iter()
            .enumerate()
            .rev()
            .find(|(i, h)| !processed_indexes.contains(i) && h.has_label(name))
        {
            processed_indexes.insert(i);
            result.push(header);
        }
    }

    result
}

/// Produces the header canonicalization result for some headers.
pub fn canonicalize_headers(
    headers: &[&HeaderRecord],
    algorithm: CanonicalizationAlgorithm,
) -> Result<Vec<u8>, ArgumentError> {
    canonicalize_headers_with(headers, algorithm, true)
}

/// Like [`canonicalize_headers`], but with control over whether relaxed
/// canonicalization decodes encoded words.
pub fn canonicalize_headers_with(
    headers: &[&HeaderRecord],
    algorithm: CanonicalizationAlgorithm,
    decode_encoded_words: bool,
) -> Result<Vec<u8>, ArgumentError> {
    if headers.is_empty() {
        return Err(ArgumentError::NoHeaders);
    }

    let mut result = vec![];
    for header in headers {
        let header = DkimHeader::new(header).decode_encoded_words(decode_encoded_words);
        result.extend(header.canonicalize(algorithm));
    }
    Ok(result)
}

/// Produces the body canonicalization result for a complete body.
pub fn canonicalize_body(body: &[u8], algorithm: CanonicalizationAlgorithm) -> Vec<u8> {
    let mut canonicalizer = BodyCanonicalizer::new(algorithm);
    let mut result = canonicalizer.canon_chunk(body);
    result.extend(canonicalizer.finish_canon());
    result
}

// which state are we in = what did we see last?
#[derive(Copy, Clone)]
enum CanonState {
    Init,
    CrLf,
    Cr,
    Wsp,
    WspCr,
    Byte,
}

/// A streaming canonicalizer using one of the body canonicalization
/// algorithms.
///
/// Trailing empty lines are held back until non-empty content follows; a body
/// without content canonicalizes to the empty string under both algorithms.
pub struct BodyCanonicalizer {
    kind: CanonicalizationAlgorithm,
    state: CanonState,
    blank_line: bool,  // whether currently on an empty or blank line
    empty_lines: usize,  // number of empty lines seen
}

impl BodyCanonicalizer {
    pub fn new(kind: CanonicalizationAlgorithm) -> Self {
        Self {
            kind,
            state: CanonState::Init,
            blank_line: true,
            empty_lines: 0,
        }
    }

    // canonicalisation recognises only CRLF as line separator/terminator, stray
    // CR and LF are treated like other bytes
    pub fn canon_chunk(&mut self, bytes: &[u8]) -> Vec<u8> {
        match self.kind {
            CanonicalizationAlgorithm::Simple => self.canon_chunk_simple(bytes),
            CanonicalizationAlgorithm::Relaxed => self.canon_chunk_relaxed(bytes),
        }
    }

    fn canon_chunk_simple(&mut self, bytes: &[u8]) -> Vec<u8> {
        let mut result = vec![];

        for &b in bytes {
            match self.state {
                CanonState::Init | CanonState::CrLf => {
                    if b == CR {
                        self.state = CanonState::Cr;
                    } else {
                        self.flush_empty_lines(&mut result);
                        result.push(b);
                        self.state = CanonState::Byte;
                    }
                }
                CanonState::Cr => {
                    if b == LF {
                        self.end_line(&mut result);
                        continue;
                    }

                    self.flush_empty_lines(&mut result);
                    result.push(CR);

                    if b != CR {
                        result.push(b);
                        self.state = CanonState::Byte;
                    }
                }
                CanonState::Byte => {
                    if b == CR {
                        self.state = CanonState::Cr;
                    } else {
                        result.push(b);
                    }
                }
                CanonState::Wsp | CanonState::WspCr => unreachable!(),
            }
        }

        result
    }

    fn canon_chunk_relaxed(&mut self, bytes: &[u8]) -> Vec<u8> {
        fn is_wsp(b: u8) -> bool {
            matches!(b, b'\t' | b' ')
        }

        let mut result = vec![];

        for &b in bytes {
            match self.state {
                CanonState::Init | CanonState::CrLf => {
                    if is_wsp(b) {
                        self.state = CanonState::Wsp;
                    } else if b == CR {
                        self.state = CanonState::Cr;
                    } else {
                        self.flush_empty_lines(&mut result);
                        result.push(b);
                        self.state = CanonState::Byte;
                    }
                }
                CanonState::Wsp => {
                    if b == CR {
                        self.state = CanonState::WspCr;
                    } else if !is_wsp(b) {
                        self.flush_empty_lines(&mut result);
                        result.push(SP);
                        result.push(b);
                        self.state = CanonState::Byte;
                    }
                }
                CanonState::Cr => {
                    if b == LF {
                        self.end_line(&mut result);
                        continue;
                    }

                    self.flush_empty_lines(&mut result);
                    result.push(CR);

                    if is_wsp(b) {
                        self.state = CanonState::Wsp;
                    } else if b != CR {
                        result.push(b);
                        self.state = CanonState::Byte;
                    }
                }
                CanonState::WspCr => {
                    if b == LF {
                        self.end_line(&mut result);
                        continue;
                    }

                    self.flush_empty_lines(&mut result);
                    result.push(SP);
                    result.push(CR);

                    if b == CR {
                        self.state = CanonState::Cr;
                    } else if is_wsp(b) {
                        self.state = CanonState::Wsp;
                    } else {
                        result.push(b);
                        self.state = CanonState::Byte;
                    }
                }
                CanonState::Byte => {
                    if is_wsp(b) {
                        self.state = CanonState::Wsp;
                    } else if b == CR {
                        self.state = CanonState::Cr;
                    } else {
                        result.push(b);
                    }
                }
            }
        }

        result
    }

    pub fn finish_canon(mut self) -> Vec<u8> {
        match self.state {
            CanonState::Init | CanonState::CrLf => vec![],
            CanonState::Cr => {
                let mut result = vec![];
                self.flush_empty_lines(&mut result);
                result.push(CR);
                result.extend(CRLF);  // non-empty body needs final CRLF
                result
            }
            CanonState::Wsp => {
                // trailing whitespace on an unterminated last line
                if self.blank_line {
                    vec![]
                } else {
                    CRLF.to_vec()
                }
            }
            CanonState::WspCr => {
                let mut result = vec![];
                self.flush_empty_lines(&mut result);
                result.push(SP);
                result.push(CR);
                result.extend(CRLF);
                result
            }
            CanonState::Byte => CRLF.to_vec(),
        }
    }

    fn end_line(&mut self, result: &mut Vec<u8>) {
        if self.blank_line {
            self.empty_lines += 1;
        } else {
            result.extend(CRLF);
            self.blank_line = true;
        }
        self.state = CanonState::CrLf;
    }

    // write out remembered empty lines after encountering/before processing
    // byte that ends a section of empty lines
    fn flush_empty_lines(&mut self, result: &mut Vec<u8>) {
        for _ in 0..self.empty_lines {
            result.extend(CRLF);
        }
        self.empty_lines = 0;
        self.blank_line = false;
    }
}
