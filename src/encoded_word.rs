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

//! MIME encoded-word decoding.
//!
//! See RFC 2047. Character sets are converted with the decoders of
//! `mail-parser`; encoded words in unknown character sets, and malformed
//! encoded words, are left as they are.

use base64ct::{Base64, Encoding};
use mail_parser::decoders::charsets::map::charset_decoder;

/// Decodes all encoded words in an (unfolded) header value.
///
/// Whitespace separating two adjacent encoded words is dropped.
pub fn decode(input: &str) -> String {
    let mut result = String::with_capacity(input.len());

    let mut rest = input;
    let mut pending_wsp: Option<&str> = None;
    let mut after_encoded_word = false;

    while !rest.is_empty() {
        if let Some((decoded, snext)) = strip_encoded_word(rest) {
            // whitespace between two encoded words is not displayed
            if !after_encoded_word {
                if let Some(wsp) = pending_wsp {
                    result.push_str(wsp);
                }
            }
            pending_wsp = None;
            result.push_str(&decoded);
            after_encoded_word = true;
            rest = snext;
        } else if rest.starts_with(is_wsp) {
            let snext = rest.trim_start_matches(is_wsp);
            if let Some(wsp) = pending_wsp.take() {
                result.push_str(wsp);
            }
            pending_wsp = Some(&rest[..(rest.len() - snext.len())]);
            rest = snext;
        } else {
            if let Some(wsp) = pending_wsp.take() {
                result.push_str(wsp);
            }
            let c = rest.chars().next().unwrap_or_default();
            result.push(c);
            after_encoded_word = false;
            rest = &rest[c.len_utf8()..];
        }
    }

    if let Some(wsp) = pending_wsp {
        result.push_str(wsp);
    }

    result
}

// encoded-word = "=?" charset "?" encoding "?" encoded-text "?="
fn strip_encoded_word(s: &str) -> Option<(String, &str)> {
    let s = s.strip_prefix("=?")?;

    let (charset, s) = s.split_once('?')?;
    let (encoding, s) = s.split_once('?')?;
    let end = s.find("?=")?;
    let (text, s) = (&s[..end], &s[(end + 2)..]);

    if text.contains(is_wsp) {
        return None;
    }

    // RFC 2231 language suffix
    let charset = charset.split('*').next().unwrap_or(charset);

    let bytes = if encoding.eq_ignore_ascii_case("q") {
        decode_q(text)?
    } else if encoding.eq_ignore_ascii_case("b") {
        Base64::decode_vec(text).ok()?
    } else {
        return None;
    };

    let decoder = charset_decoder(charset.as_bytes())?;

    Some((decoder(&bytes), s))
}

fn decode_q(text: &str) -> Option<Vec<u8>> {
    let mut result = Vec::with_capacity(text.len());

    let mut bytes = text.bytes();

    while let Some(b) = bytes.next() {
        match b {
            b'=' => {
                let d1 = bytes.next().filter(u8::is_ascii_hexdigit)?;
                let d2 = bytes.next().filter(u8::is_ascii_hexdigit)?;
                result.push(u8_from_digits(d1, d2));
            }
            b'_' => result.push(b' '),
            b => result.push(b),
        }
    }

    Some(result)
}

fn u8_from_digits(c1: u8, c2: u8) -> u8 {
    fn to_u8(c: u8) -> u8 {
        match c {
            b'0'..=b'9' => c - b'0',
            b'A'..=b'F' => c - b'A' + 0xa,
            b'a'..=b'f' => c - b'a' + 0xa,
            _ => unreachable!(),
        }
    }

    debug_assert!(c1.is_ascii_hexdigit() && c2.is_ascii_hexdigit());

    to_u8(c1) * 0x10 + to_u8(c2)
}

fn is_wsp(c: char) -> bool {
    matches!(c, ' ' | '\t')
}
