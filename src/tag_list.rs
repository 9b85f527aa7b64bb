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

//! Tag lists, as used in DKIM signature headers and DNS key records.

use crate::{
    canonicalize::DkimHeader,
    error::{ArgumentError, DnsError},
    header::HeaderRecord,
    parse::strip_fws,
};

/// An ordered mapping of tag names to tag values.
///
/// Unknown tags are retained. When a tag name occurs more than once, the last
/// value wins, but the tag keeps the position of its first occurrence.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TagSet(Vec<(String, String)>);

impl TagSet {
    /// Parses a tag list leniently: segments without a name, and segments
    /// without `=`, are skipped.
    pub fn parse(input: &str) -> Self {
        let mut tags = Self::default();
        for segment in input.split(';') {
            if let Some((name, value)) = segment.split_once('=') {
                tags.insert(name, value);
            }
        }
        tags
    }

    /// Parses the tag list in a DNS TXT key record.
    ///
    /// This is stricter than [`TagSet::parse`]: a non-empty segment that is not
    /// of the form `name=value` makes the whole record unusable.
    pub fn parse_record(input: &str) -> Result<Self, DnsError> {
        let mut tags = Self::default();
        for segment in input.split(';') {
            match segment.split_once('=') {
                Some((name, value)) => tags.insert(name, value),
                None if segment.trim().is_empty() => {}
                None => return Err(DnsError::RecordFormat(input.into())),
            }
        }
        Ok(tags)
    }

    fn insert(&mut self, name: &str, value: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        let value = value.trim();

        match self.0.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.into(),
            None => self.0.push((name.into(), value.into())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// Extracts the tags from a DKIM signature header.
///
/// Tags are parsed from the decoded value with all whitespace removed.
pub fn extract_tags(header: &HeaderRecord) -> Result<TagSet, ArgumentError> {
    if !DkimHeader::new(header).is_signature_header() {
        return Err(ArgumentError::NotSignatureHeader);
    }

    Ok(TagSet::parse(&header.value_without_spaces()))
}

/// Splits a colon-separated tag value such as the value of `h=`.
pub fn parse_colon_separated_tag_value(value: &str) -> Vec<&str> {
    value
        .split(':')
        .map(|s| s.trim_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n')))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Removes all whitespace, including folding line breaks, from a tag value.
pub fn strip_fws_from_tag_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ' ' | '\t' | '\r' | '\n'))
        .collect()
}

/// Strips `[FWS] tag-name [FWS] "="` from the start of a tag-spec, returning
/// the remainder and the tag name.
pub fn strip_tag_name_and_equals(input: &[u8]) -> Option<(&[u8], &[u8])> {
    let s = strip_fws(input).unwrap_or(input);

    let name_len = match s.split_first() {
        Some((b, rest)) if b.is_ascii_alphabetic() => {
            1 + rest
                .iter()
                .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
                .count()
        }
        _ => return None,
    };
    let (name, s) = s.split_at(name_len);

    let s = strip_fws(s).unwrap_or(s);

    let s = s.strip_prefix(b"=")?;

    Some((s, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_last_duplicate_wins() {
        let tags = TagSet::parse("s=a;s=b");

        assert_eq!(tags.len(), 1);
        assert_eq!(tags.get("s"), Some("b"));
    }

    #[test]
    fn parse_skips_unnamed_tags() {
        let tags = TagSet::parse("s=phpmailer; =true");

        assert_eq!(tags.iter().collect::<Vec<_>>(), [("s", "phpmailer")]);
    }

    #[test]
    fn parse_skips_trailing_semicolon() {
        let tags = TagSet::parse("s=phpmailer; x=true;");

        assert_eq!(tags.iter().collect::<Vec<_>>(), [("s", "phpmailer"), ("x", "true")]);
    }

    #[test]
    fn parse_splits_on_first_equals() {
        let tags = TagSet::parse("zz==;xx=;p=abc=");

        assert_eq!(tags.get("zz"), Some("="));
        assert_eq!(tags.get("xx"), Some(""));
        assert_eq!(tags.get("p"), Some("abc="));
    }

    #[test]
    fn parse_record_ok() {
        let tags = TagSet::parse_record("v=DKIM1; k=rsa; p=MIGfMA0;").unwrap();

        assert_eq!(
            tags.iter().collect::<Vec<_>>(),
            [("v", "DKIM1"), ("k", "rsa"), ("p", "MIGfMA0")]
        );
    }

    #[test]
    fn parse_record_bad_format() {
        assert!(matches!(
            TagSet::parse_record("v=DKIM1; k=rsa; garbage"),
            Err(DnsError::RecordFormat(_))
        ));
    }

    #[test]
    fn extract_tags_requires_signature_header() {
        let header = HeaderRecord::parse(*b"a:b\r\n").unwrap();

        assert_eq!(extract_tags(&header), Err(ArgumentError::NotSignatureHeader));
    }

    #[test]
    fn extract_tags_from_folded_header() {
        let header = HeaderRecord::parse(
            &b"DKIM-Signature: v=1; d=example.com; s=phpmailer;\r\n\
              \x20a=rsa-sha256; q=dns/txt; l=6; t=1570645905;; ; c=relaxed/simple;\r\n\
              \x20h=Date:To:From:Subject:Message-ID:X-Mailer:Content-Type;\r\n\
              \x20bh=g3zLYH4xKxcPrHOD18z9YfpQcnk/GaJedfustWU5uGs=; xx=; =yy; zz==;\r\n\
              \x20b=ljWj1co9L6sMrXJ1yBwJ771dnjvVKZN3i97Q/QB0lGQf43FPdautceMsiu3M132QopX63Osqp\r\n\
              \x20T1Oz40T9EMONwzCpzIMKKB/tNjDe5qw+evPjf/5mAaiVpIevh1P377t/K0y0nRmCaPbfa0sbm\r\n\
              \x20Rh7Z0ZEl+n4fqoyrTctR8ZEimwwd+xFOtx1hB9KgjW+JVcdTVQ=="[..],
        )
        .unwrap();

        let tags = extract_tags(&header).unwrap();

        assert_eq!(tags.len(), 13);
        assert_eq!(tags.get("a"), Some("rsa-sha256"));
        assert_eq!(
            tags.get("b"),
            Some(
                "ljWj1co9L6sMrXJ1yBwJ771dnjvVKZN3i97Q/QB0lGQf43FPdautceMsiu3M132QopX63Osqp\
                 T1Oz40T9EMONwzCpzIMKKB/tNjDe5qw+evPjf/5mAaiVpIevh1P377t/K0y0nRmCaPbfa0sbm\
                 Rh7Z0ZEl+n4fqoyrTctR8ZEimwwd+xFOtx1hB9KgjW+JVcdTVQ=="
            )
        );
        assert_eq!(tags.get("bh"), Some("g3zLYH4xKxcPrHOD18z9YfpQcnk/GaJedfustWU5uGs="));
        assert_eq!(tags.get("c"), Some("relaxed/simple"));
        assert_eq!(tags.get("d"), Some("example.com"));
        assert_eq!(tags.get("h"), Some("Date:To:From:Subject:Message-ID:X-Mailer:Content-Type"));
        assert_eq!(tags.get("l"), Some("6"));
        assert_eq!(tags.get("q"), Some("dns/txt"));
        assert_eq!(tags.get("s"), Some("phpmailer"));
        assert_eq!(tags.get("t"), Some("1570645905"));
        assert_eq!(tags.get("v"), Some("1"));
        assert_eq!(tags.get("xx"), Some(""));
        assert_eq!(tags.get("zz"), Some("="));
    }

    #[test]
    fn parse_colon_separated_tag_value_ok() {
        assert_eq!(
            parse_colon_separated_tag_value("ab:\r\n\tc\r\n\td:e"),
            ["ab", "c\r\n\td", "e"]
        );
        assert_eq!(parse_colon_separated_tag_value("From::To"), ["From", "To"]);
        assert!(parse_colon_separated_tag_value("").is_empty());
    }

    #[test]
    fn strip_tag_name_and_equals_ok() {
        assert_eq!(
            strip_tag_name_and_equals(b" b = abc"),
            Some((&b" abc"[..], &b"b"[..]))
        );
        assert_eq!(
            strip_tag_name_and_equals(b"\r\n\tbh=abc"),
            Some((&b"abc"[..], &b"bh"[..]))
        );
        assert_eq!(strip_tag_name_and_equals(b" =abc"), None);
        assert_eq!(strip_tag_name_and_equals(b" b abc"), None);
    }
}
