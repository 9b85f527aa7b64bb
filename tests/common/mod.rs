use base64ct::{Base64, Encoding};
use dkim_validator::{
    canonicalize::{canonicalize_body, canonicalize_headers, select_headers, DkimHeader},
    crypto::{self, HashAlgorithm},
    signature::Canonicalization,
    tag_list::{parse_colon_separated_tag_value, TagSet},
    HeaderRecord, Message,
};
use ed25519_dalek::Signer;
use rsa::{pkcs8::DecodePrivateKey, Pkcs1v15Sign, RsaPrivateKey};
use sha2::Sha256;
use std::{collections::HashMap, io};
use tokio::fs;

pub enum SigningKey {
    Rsa(RsaPrivateKey),
    Ed25519(ed25519_dalek::SigningKey),
}

pub async fn read_public_key_file_base64(file_name: &str) -> io::Result<String> {
    let s = fs::read_to_string(file_name).await?;
    let mut key_base64: Vec<_> = s.lines().skip(1).collect();
    key_base64.pop();
    Ok(key_base64.join(""))
}

pub async fn read_rsa_signing_key(file_name: &str) -> io::Result<SigningKey> {
    let s = fs::read_to_string(file_name).await?;
    Ok(SigningKey::Rsa(RsaPrivateKey::from_pkcs8_pem(&s).unwrap()))
}

pub async fn read_ed25519_signing_key(file_name: &str) -> io::Result<SigningKey> {
    let s = fs::read_to_string(file_name).await?;
    Ok(SigningKey::Ed25519(
        ed25519_dalek::SigningKey::from_pkcs8_pem(&s).unwrap(),
    ))
}

/// The raw Ed25519 public key, as published in a `p=` tag.
pub async fn read_ed25519_public_key_base64(file_name: &str) -> io::Result<String> {
    let s = fs::read_to_string(file_name).await?;
    let key = ed25519_dalek::SigningKey::from_pkcs8_pem(&s).unwrap();
    Ok(Base64::encode_string(key.verifying_key().as_bytes()))
}

/// Key records in the style of a small test zone, keyed by query name.
pub async fn make_resolver() -> HashMap<String, Vec<String>> {
    let p = read_public_key_file_base64("tests/keys/rsa2048pub.pem")
        .await
        .unwrap();
    let ed25519_p = read_ed25519_public_key_base64("tests/keys/ed25519.pem")
        .await
        .unwrap();

    [
        ("phpmailer", format!("v=DKIM1; h=sha256; t=s; p={p}")),
        ("trailingsemi", format!("v=DKIM1; k=rsa; p={p};")),
        ("badformat", format!("v=DKIM1; k=rsa; p={p}; nonsense")),
        ("baddkimversion", format!("v=DKIM2; h=sha256; t=s; p={p}")),
        ("badhashtype", format!("v=DKIM1; h=sha1; t=s; p={p}")),
        ("badkeytype", format!("v=DKIM1; k=ed25519; t=s; p={p}")),
        ("badservicetype", format!("v=DKIM1; s=sms; t=s; p={p}")),
        ("testing", format!("v=DKIM1; k=rsa; t=y; p={p}")),
        ("revoked", "v=DKIM1; k=rsa; p=".to_owned()),
        ("ed25519", format!("v=DKIM1; k=ed25519; p={ed25519_p}")),
    ]
    .into_iter()
    .map(|(selector, record)| (format!("{selector}._domainkey.example.com"), vec![record]))
    .collect()
}

/// Signs a message with a DKIM-Signature built from `tags`, which must not
/// contain `bh=` or `b=`. The signature header is prepended to the message.
pub fn sign(message: &str, tags: &str, key: &SigningKey) -> String {
    let tag_set = TagSet::parse(tags);

    let canonicalization: Canonicalization = tag_set
        .get("c")
        .map(|c| c.parse().unwrap())
        .unwrap_or_default();
    let signed_headers = parse_colon_separated_tag_value(tag_set.get("h").unwrap());

    let parsed = Message::parse(message.as_bytes()).unwrap();

    let mut body = canonicalize_body(parsed.body(), canonicalization.body);
    if let Some(l) = tag_set.get("l") {
        body.truncate(l.parse().unwrap());
    }
    let bh = Base64::encode_string(&crypto::digest(HashAlgorithm::Sha256, &body));

    let unsigned = format!("DKIM-Signature: {tags}; bh={bh};\r\n\tb=");

    let selected = select_headers(parsed.headers(), &signed_headers);
    let mut data = canonicalize_headers(&selected, canonicalization.header).unwrap();
    let unsigned_header = HeaderRecord::parse(format!("{unsigned}\r\n").into_bytes()).unwrap();
    data.extend(
        DkimHeader::new(&unsigned_header)
            .canonicalize_unsigned(canonicalization.header)
            .unwrap(),
    );

    let hashed = crypto::digest(HashAlgorithm::Sha256, &data);

    let signature = match key {
        SigningKey::Rsa(k) => k.sign(Pkcs1v15Sign::new::<Sha256>(), &hashed).unwrap(),
        SigningKey::Ed25519(k) => k.sign(&hashed).to_bytes().to_vec(),
    };

    let b = Base64::encode_string(&signature);

    format!("{unsigned}{b}\r\n{message}")
}
