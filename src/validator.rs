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

//! Validator and supporting types.

use crate::{
    canonicalize::{canonicalize_body, canonicalize_headers_with, select_headers, DkimHeader},
    crypto::{self, CountingHasher, HashAlgorithm, VerifyingKey},
    error::DnsError,
    header::HeaderRecord,
    message::Message,
    record::PublicKeyRecord,
    result::{ValidationResult, ValidationResults},
    resolver::Resolver,
    signature::{self, Identity, Signature, REQUIRED_TAGS},
    tag_list::{extract_tags, TagSet},
    util::{self, CanonicalStr},
};
use std::{io::ErrorKind, time::SystemTime};
use tracing::{debug, trace};

/// Configuration for a validator.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// If given required headers are not signed in a DKIM signature, the
    /// signature will not validate. Note that the header `From` is always
    /// required independent of this configuration setting.
    pub required_signed_headers: Vec<String>,

    /// Only evaluate at most this number of signatures. Any extra signatures
    /// still get a result, which records that they were not evaluated.
    pub max_signatures: usize,

    /// Minimum acceptable key size in bits. When the key size of an RSA public
    /// key is below this limit, the key is rejected.
    ///
    /// By default, the minimum key size is 1024; if feature `pre-rfc8301` is
    /// enabled, the minimum key size is 512.
    pub min_key_bits: usize,

    /// Whether relaxed header canonicalization decodes RFC 2047 encoded
    /// words before compressing whitespace. Signers that hash the raw header
    /// value need this turned off.
    pub decode_encoded_words: bool,

    /// The `SystemTime` value to use as the instant ‘now’.
    pub fixed_system_time: Option<SystemTime>,
}

impl Config {
    fn current_timestamp(&self) -> u64 {
        self.fixed_system_time
            .unwrap_or_else(SystemTime::now)
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            required_signed_headers: vec![],
            max_signatures: usize::MAX,
            min_key_bits: if cfg!(feature = "pre-rfc8301") { 512 } else { 1024 },
            decode_encoded_words: true,
            fixed_system_time: None,
        }
    }
}

/// A validator of the DKIM signatures in a message.
///
/// # Examples
///
/// ```
/// # async fn f() {
/// use dkim_validator::{Message, Validator};
/// use std::collections::HashMap;
///
/// let resolver: HashMap<String, Vec<String>> = HashMap::new();
/// let validator = Validator::new(resolver);
///
/// let message = Message::parse(b"From: me@example.com\r\n\r\nHello!\r\n").unwrap();
///
/// let results = validator.validate(&message).await;
///
/// assert!(!results.is_valid());
/// assert_eq!(results.results()[0].fails(), ["No DKIM signature present"]);
/// # }
/// ```
pub struct Validator<R> {
    resolver: R,
    config: Config,
}

impl<R: Resolver> Validator<R> {
    pub fn new(resolver: R) -> Self {
        Self::with_config(resolver, Config::default())
    }

    pub fn with_config(resolver: R, config: Config) -> Self {
        Self { resolver, config }
    }

    /// Validates all DKIM signatures in a message.
    ///
    /// This never fails: problems with individual signatures are recorded as
    /// failures in the respective [`ValidationResult`].
    pub async fn validate(&self, message: &Message) -> ValidationResults {
        let mut results = ValidationResults::new();

        let signature_headers: Vec<_> = message.signature_headers().collect();

        if signature_headers.is_empty() {
            debug!("no DKIM signature in message");
            let mut result = ValidationResult::default();
            result.add_fail("No DKIM signature present");
            results.add_result(result);
            return results;
        }

        for (i, header) in signature_headers.into_iter().enumerate() {
            if i >= self.config.max_signatures {
                debug!(
                    index = i + 1,
                    max = self.config.max_signatures,
                    "skipping excess DKIM-Signature"
                );
                results.add_result(skipped_signature_result(header, self.config.max_signatures));
                continue;
            }

            trace!(index = i + 1, "processing DKIM-Signature");

            let result = self.validate_signature_header(message, header).await;

            debug!(
                index = i + 1,
                domain = result.domain(),
                selector = result.selector(),
                valid = result.is_valid(),
                "DKIM-Signature evaluated"
            );

            results.add_result(result);
        }

        results
    }

    /// Whether at least one DKIM signature in the message validates.
    pub async fn is_valid(&self, message: &Message) -> bool {
        self.validate(message).await.is_valid()
    }

    /// Retrieves the public key records published for a domain and selector.
    ///
    /// Records are looked up at `<selector>._domainkey.<domain>`. A name
    /// without records yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if domain or selector cannot be used in a query, if
    /// the lookup fails, or if a record is not a tag list.
    pub async fn fetch_public_keys(
        &self,
        domain: &str,
        selector: &str,
    ) -> Result<Vec<PublicKeyRecord>, DnsError> {
        let selector = signature::to_ascii_domain(selector)
            .ok_or_else(|| DnsError::InvalidSelector(selector.into()))?;
        let domain = signature::to_ascii_domain(domain)
            .ok_or_else(|| DnsError::InvalidDomain(domain.into()))?;

        let name = format!("{selector}._domainkey.{domain}");

        trace!(%name, "looking up public key records");

        let records = match self.resolver.get_text_records(&name).await {
            Ok(records) => records,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!(%name, "no key record");
                vec![]
            }
            Err(e) => {
                trace!(%name, "could not look up key record: {e}");
                return Err(e.into());
            }
        };

        records.iter().map(|r| PublicKeyRecord::parse(r)).collect()
    }

    async fn validate_signature_header(
        &self,
        message: &Message,
        header: &HeaderRecord,
    ) -> ValidationResult {
        let tags = match extract_tags(header) {
            Ok(tags) => tags,
            Err(e) => {
                let mut result = ValidationResult::default();
                result.add_fail(format!("Signature header cannot be read: {e}"));
                return result;
            }
        };

        let mut result = ValidationResult::new(
            tags.get("d").unwrap_or_default(),
            tags.get("s").unwrap_or_default(),
        );

        let Some(sig) = check_signature_tags(&tags, &mut result) else {
            return result;
        };

        self.check_signature_policy(&sig, &mut result);

        match sig.query_methods.as_deref() {
            None => {
                result.add_warning("Signature has no query method tag (q=), assuming dns/txt");
            }
            Some(q) if signature::supports_dns_txt_query(q) => {}
            Some(q) => {
                result.add_fail(format!("Unsupported query method: {q}"));
                return result;
            }
        }

        if let Some(len) = sig.body_length {
            result.add_warning(format!(
                "Signature uses a body length tag (l={len}), which is considered a security \
                 weakness: unsigned content may be appended to the body"
            ));
        }

        let records = match self.fetch_public_keys(&sig.domain, &sig.selector).await {
            Ok(records) if records.is_empty() => {
                result.add_fail(format!(
                    "Missing public key: no key record at {}._domainkey.{}",
                    sig.selector, sig.domain
                ));
                return result;
            }
            Ok(records) => records,
            Err(e) => {
                result.add_fail(format!("Missing public key: {e}"));
                return result;
            }
        };

        let hash_alg = sig.algorithm.to_hash_algorithm();

        let Some(data) = compute_header_data(
            &sig,
            message,
            header,
            self.config.decode_encoded_words,
            &mut result,
        ) else {
            return result;
        };

        check_body_hash(&sig, message, hash_alg, &mut result);

        let signature_data = match crypto::decode_signature(&sig.signature) {
            Ok(s) => s,
            Err(e) => {
                result.add_fail(format!("Signature data cannot be read: {e}"));
                return result;
            }
        };

        for (i, record) in records.iter().enumerate() {
            trace!("trying verification using DKIM key record {}", i + 1);

            self.verify_with_key(&sig, record, i + 1, &data, &signature_data, &mut result);
        }

        result
    }

    fn check_signature_policy(&self, sig: &Signature, result: &mut ValidationResult) {
        if !signature::is_valid_domain(&sig.domain) {
            result.add_fail(format!("Signing domain is invalid: {}.", sig.domain));
        }
        if !signature::is_valid_selector(&sig.selector) {
            result.add_fail(format!("Signing selector is invalid: {}.", sig.selector));
        }

        if let Some(i) = &sig.identity {
            match Identity::parse(i) {
                Some(identity) if signature::eq_or_subdomain_of(&identity.domain, &sig.domain) => {}
                Some(_) => {
                    result.add_fail(format!(
                        "Agent or user identifier does not match signing domain: {i}"
                    ));
                }
                None => {
                    result.add_fail(format!("Agent or user identifier is invalid: {i}"));
                }
            }
        }

        if !sig.signs_header("From") {
            result.add_fail("From header is not signed");
        }
        for name in &self.config.required_signed_headers {
            if !sig.signs_header(name) {
                result.add_fail(format!("Required header is not signed: {name}"));
            }
        }

        if let Some(expiration) = sig.expiration {
            if matches!(sig.timestamp, Some(timestamp) if expiration <= timestamp) {
                result.add_fail("Signature expiration is not after signature timestamp");
            }
            if expiration <= self.config.current_timestamp() {
                result.add_fail("Signature has expired");
            }
        }
    }

    fn verify_with_key(
        &self,
        sig: &Signature,
        record: &PublicKeyRecord,
        n: usize,
        data: &[u8],
        signature_data: &[u8],
        result: &mut ValidationResult,
    ) {
        let key_type = sig.algorithm.to_key_type();
        let hash_alg = sig.algorithm.to_hash_algorithm();

        let fails_before = result.fails().len();

        let expected_version = format!("DKIM{}", sig.version);
        if let Some(v) = record.version() {
            if v != expected_version {
                reject_key(result, n, format!("version {v} does not match {expected_version}"));
            }
        }
        if let Some(h) = record.hash_algorithms() {
            if !h.iter().any(|h| h.eq_ignore_ascii_case(hash_alg.canonical_str())) {
                reject_key(
                    result,
                    n,
                    format!("hash algorithms {} do not include {hash_alg}", h.join(":")),
                );
            }
        }
        if let Some(k) = record.key_type() {
            if !k.eq_ignore_ascii_case(key_type.canonical_str()) {
                reject_key(result, n, format!("key type {k} does not match {key_type}"));
            }
        }
        if !record.permits_email() {
            reject_key(result, n, "service type does not permit email");
        }
        if record.forbids_subdomains() {
            let identity_domain = sig
                .identity
                .as_deref()
                .and_then(Identity::parse)
                .map(|i| i.domain);
            if let Some(domain) = identity_domain {
                if !signature::domains_equal(&domain, &sig.domain) {
                    reject_key(result, n, "identity in a subdomain is not permitted (t=s)");
                }
            }
        }
        if record.is_testing() {
            result.add_warning(format!("Public key #{n}: domain is testing DKIM (t=y)"));
        }

        let public_key = match record.public_key() {
            None => {
                reject_key(result, n, "key data tag (p=) is missing");
                return;
            }
            Some(p) if p.is_empty() => {
                reject_key(result, n, "key has been revoked");
                return;
            }
            Some(p) => p,
        };

        if result.fails().len() > fails_before {
            return;
        }

        let key = match VerifyingKey::from_base64(key_type, &public_key) {
            Ok(key) => key,
            Err(e) => {
                reject_key(result, n, format!("key data unusable: {e}"));
                return;
            }
        };

        if let Some(bits) = key.key_size() {
            if bits < self.config.min_key_bits {
                reject_key(result, n, format!("key size of {bits} bits is too small"));
                return;
            }
        }

        match key.verify(hash_alg, data, signature_data) {
            Ok(true) => {
                trace!(key = n, "signature verified");
                result.add_pass(format!(
                    "Public key #{n}: signature verified ({key_type} key, {})",
                    sig.algorithm
                ));
            }
            Ok(false) => {
                reject_key(result, n, "signature does not verify");
            }
            Err(e) => {
                reject_key(result, n, format!("signature verification error: {e}"));
            }
        }
    }
}

// A signature over the evaluation limit is reported as failed, not dropped.
fn skipped_signature_result(header: &HeaderRecord, max: usize) -> ValidationResult {
    let mut result = match extract_tags(header) {
        Ok(tags) => ValidationResult::new(
            tags.get("d").unwrap_or_default(),
            tags.get("s").unwrap_or_default(),
        ),
        Err(_) => ValidationResult::default(),
    };
    result.add_fail(format!(
        "Signature not evaluated: message has more than {max} signatures"
    ));
    result
}

fn reject_key(result: &mut ValidationResult, n: usize, reason: impl Into<String>) {
    let reason = reason.into();
    trace!(key = n, "key rejected: {reason}");
    result.add_fail(format!("Public key #{n}: {reason}"));
}

// Required tags, version, and the typed view. Returns `None` if validation
// cannot continue.
fn check_signature_tags(tags: &TagSet, result: &mut ValidationResult) -> Option<Signature> {
    let missing: Vec<_> = REQUIRED_TAGS
        .iter()
        .filter(|&&name| !tags.contains(name))
        .copied()
        .collect();
    if !missing.is_empty() {
        result.add_fail(format!(
            "Signature is missing required tag(s): {}",
            missing.join(", ")
        ));
        return None;
    }

    if let Some(v) = tags.get("v") {
        if v != "1" {
            result.add_fail(format!("Incompatible DKIM version: {v}"));
        }
    }

    match Signature::from_tags(tags) {
        Ok(sig) => Some(sig),
        Err(e) => {
            result.add_fail(e.to_string());
            None
        }
    }
}

// Canonicalized signed headers, followed by the canonicalized signature header
// without its b= value.
fn compute_header_data(
    sig: &Signature,
    message: &Message,
    header: &HeaderRecord,
    decode_encoded_words: bool,
    result: &mut ValidationResult,
) -> Option<Vec<u8>> {
    let algorithm = sig.canonicalization.header;

    let selected = select_headers(message.headers(), &sig.signed_headers);

    // an empty selection contributes nothing
    let mut data =
        canonicalize_headers_with(&selected, algorithm, decode_encoded_words).unwrap_or_default();

    let header = DkimHeader::new(header).decode_encoded_words(decode_encoded_words);
    match header.canonicalize_unsigned(algorithm) {
        Ok(unsigned) => data.extend(unsigned),
        Err(e) => {
            result.add_fail(format!("Signature header cannot be canonicalized: {e}"));
            return None;
        }
    }

    Some(data)
}

fn check_body_hash(
    sig: &Signature,
    message: &Message,
    hash_alg: HashAlgorithm,
    result: &mut ValidationResult,
) {
    let body = canonicalize_body(message.body(), sig.canonicalization.body);

    let mut hasher = CountingHasher::new(hash_alg, sig.body_length);
    hasher.update(&body);

    match hasher.finish() {
        Ok((hash, _)) => {
            let body_hash = util::encode_base64(hash);
            if body_hash == sig.body_hash {
                trace!("body hash matched");
            } else {
                trace!("body hash mismatch: {body_hash}");
                result.add_fail("Body hash does not match signature");
            }
        }
        Err(_) => {
            trace!(len = body.len(), "body shorter than l= length");
            result.add_fail(format!(
                "Body is shorter than the length in the signature (l={})",
                sig.body_length.unwrap_or_default()
            ));
        }
    }
}
