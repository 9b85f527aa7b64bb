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

//! Common byte-level parsing utilities.

pub const CRLF: &[u8] = b"\r\n";

pub fn is_wsp(b: u8) -> bool {
    matches!(b, b' ' | b'\t')
}

// FWS = ([*WSP CRLF] 1*WSP)

/// Strips one occurrence of folding whitespace.
pub fn strip_fws(input: &[u8]) -> Option<&[u8]> {
    if let Some(s) = strip_wsp(input) {
        s.strip_prefix(CRLF).and_then(strip_wsp).or(Some(s))
    } else {
        input.strip_prefix(CRLF).and_then(strip_wsp)
    }
}

fn strip_wsp(input: &[u8]) -> Option<&[u8]> {
    match input.iter().position(|&b| !is_wsp(b)) {
        Some(0) => None,
        Some(i) => Some(&input[i..]),
        None if input.is_empty() => None,
        None => Some(&[]),
    }
}

/// Replaces every line break followed by whitespace with a single space.
pub fn unfold(input: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());

    let mut rest = input;
    while let Some((&b, tail)) = rest.split_first() {
        if b == b'\r' && tail.first() == Some(&b'\n') && matches!(tail.get(1), Some(&c) if is_wsp(c)) {
            result.push(b' ');
            rest = &tail[1..];
            while let Some((&b, tail)) = rest.split_first() {
                if !is_wsp(b) {
                    break;
                }
                rest = tail;
            }
        } else {
            result.push(b);
            rest = tail;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_fws_ok() {
        assert_eq!(strip_fws(b""), None);
        assert_eq!(strip_fws(b"x"), None);
        assert_eq!(strip_fws(b" x"), Some(&b"x"[..]));
        assert_eq!(strip_fws(b"\r\n"), None);
        assert_eq!(strip_fws(b" \r\n"), Some(&b"\r\n"[..]));
        assert_eq!(strip_fws(b" \r\n x"), Some(&b"x"[..]));
        assert_eq!(strip_fws(b"\r\nx"), None);
        assert_eq!(strip_fws(b"\r\n\tx"), Some(&b"x"[..]));
    }

    #[test]
    fn unfold_ok() {
        assert_eq!(unfold(b"Y\t\r\n Z  "), b"Y\t Z  ");
        assert_eq!(unfold(b"a\r\n\t \tb\r\n c"), b"a b c");
        assert_eq!(unfold(b"a\r\nb"), b"a\r\nb");
        assert_eq!(unfold(b""), b"");
    }
}
