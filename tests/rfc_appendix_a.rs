use base64ct::{Base64, Encoding};
use dkim_validator::{Message, Validator};
use std::collections::HashMap;

// RFC 6376, appendix A.3, in SubjectPublicKeyInfo format
const BRISBANE_SPKI: &str = concat!(
    "MIGfMA0GCSqGSIb3DQEBAQUAA4GNADCBiQ",
    "KBgQDwIRP/UC3SBsEmGqZ9ZJW3/DkMoGeLnQg1fWn7/zYt",
    "IxN2SnFCjxOCKG9v3b4jYfcTNh5ijSsq631uBItLa7od+v",
    "/RtdC2UzJ1lWT947qR+Rcac2gbto/NMqJ0fzfVjH4OuKhi",
    "tdY9tf6mcwGjaNBcWToIMmPSPDdQPNUYckcQ2QIDAQAB",
);

/// Example from RFC 6376, appendix A.2, with public key in SPKI format.
#[tokio::test]
async fn rfc_appendix_a_spki() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = make_resolver(BRISBANE_SPKI);
    let message = Message::parse(make_msg().as_bytes()).unwrap();

    let results = Validator::new(resolver).validate(&message).await;

    assert_eq!(results.results().len(), 1);

    let result = &results.results()[0];

    assert!(result.is_valid(), "{:?}", result.fails());
    assert_eq!(result.domain(), "example.com");
    assert_eq!(result.selector(), "brisbane");
    assert!(result.warnings().is_empty());
    assert_eq!(
        result.passes(),
        ["Public key #1: signature verified (rsa key, rsa-sha256)"]
    );
}

/// Example from RFC 6376, appendix A.2, with public key in RSAPublicKey format.
#[tokio::test]
async fn rfc_appendix_a_rsa() {
    let _ = tracing_subscriber::fmt::try_init();

    // an SPKI structure for a 1024-bit key has a 22-byte prefix
    let spki = Base64::decode_vec(BRISBANE_SPKI).unwrap();
    let pkcs1 = Base64::encode_string(&spki[22..]);

    let resolver = make_resolver(&pkcs1);
    let message = Message::parse(make_msg().as_bytes()).unwrap();

    let validator = Validator::new(resolver);

    assert!(validator.is_valid(&message).await);
}

/// The same message with one signed header changed no longer validates.
#[tokio::test]
async fn rfc_appendix_a_modified() {
    let _ = tracing_subscriber::fmt::try_init();

    let resolver = make_resolver(BRISBANE_SPKI);
    let msg = make_msg().replace("Is dinner ready?", "Is dinner ready?!");
    let message = Message::parse(msg.as_bytes()).unwrap();

    let results = Validator::new(resolver).validate(&message).await;

    let result = &results.results()[0];

    assert!(!result.is_valid());
    assert_eq!(result.fails(), ["Public key #1: signature does not verify"]);
}

fn make_resolver(key: &str) -> HashMap<String, Vec<String>> {
    HashMap::from([(
        "brisbane._domainkey.example.com".to_owned(),
        vec![format!("v=DKIM1; p={key}")],
    )])
}

// Note RFC 6376, errata 4926 and 3192!
fn make_msg() -> String {
    "\
DKIM-Signature: v=1; a=rsa-sha256; s=brisbane; d=example.com;
      c=simple/simple; q=dns/txt; i=joe@football.example.com;
      h=Received : From : To : Subject : Date : Message-ID;
      bh=2jUSOH9NhtVGCQWNr9BrIAPreKQjO6Sn7XIkfJVOzv8=;
      b=AuUoFEfDxTDkHlLXSZEpZj79LICEps6eda7W3deTVFOk4yAUoqOB
        4nujc7YopdG5dWLSdNg6xNAZpOPr+kHxt1IrE+NahM6L/LbvaHut
        KVdkLLkpVaVVQPzeRDI009SO2Il5Lu7rDNH6mZckBdrIx0orEtZV
        4bmp/YzhwvcubU4=;
Received: from client1.football.example.com  [192.0.2.1]
      by submitserver.example.com with SUBMISSION;
      Fri, 11 Jul 2003 21:01:54 -0700 (PDT)
From: Joe SixPack <joe@football.example.com>
To: Suzie Q <suzie@shopping.example.net>
Subject: Is dinner ready?
Date: Fri, 11 Jul 2003 21:00:37 -0700 (PDT)
Message-ID: <20030712040037.46341.5F8J@football.example.com>

Hi.

We lost the game. Are you hungry yet?

Joe.
"
    .replace('\n', "\r\n")
}
