use dkim_validator::{Config, Message, ValidationResults, Validator};
use hickory_resolver::TokioAsyncResolver;
use std::time::{Duration, SystemTime};

// the signatures carry an expiration (x=) a few days after this instant
const SIGNED_AT: u64 = 1685534000;

/// Two signatures by gluet.ch, one Ed25519 and one RSA, on a mailing list
/// post. Of the original message, only the signed headers are kept.
#[tokio::test]
#[ignore = "depends on live DNS records"]
async fn live_gluet_ch_signatures() {
    let _ = tracing_subscriber::fmt::try_init();

    let message = Message::parse(make_msg().as_bytes()).unwrap();

    // the signer hashed the From header without decoding its encoded word
    let config = Config {
        decode_encoded_words: false,
        ..make_config()
    };

    let results = validate(&message, config).await;

    assert!(results.is_valid(), "{results}");

    let selectors: Vec<_> = results.results().iter().map(|r| r.selector()).collect();
    assert_eq!(selectors, ["ed25519.2022", "rsa.2022"]);

    for result in results.results() {
        assert_eq!(result.domain(), "gluet.ch");
        assert!(result.fails().is_empty(), "{:?}", result.fails());
        assert_eq!(result.passes().len(), 1);
    }

    let json: serde_json::Value = serde_json::from_str(&results.to_json().unwrap()).unwrap();
    assert_eq!(json["valid"], true);
    assert_eq!(json["signatures"].as_array().map(|a| a.len()), Some(2));
}

/// With encoded words decoded, the relaxed From header no longer matches
/// what the signer hashed.
#[tokio::test]
#[ignore = "depends on live DNS records"]
async fn live_gluet_ch_signatures_decoded() {
    let _ = tracing_subscriber::fmt::try_init();

    let message = Message::parse(make_msg().as_bytes()).unwrap();

    let results = validate(&message, make_config()).await;

    assert!(!results.is_valid());

    for result in results.results() {
        assert_eq!(result.fails(), ["Public key #1: signature does not verify"]);
    }
}

async fn validate(message: &Message, config: Config) -> ValidationResults {
    let resolver = TokioAsyncResolver::tokio(Default::default(), Default::default());

    Validator::with_config(resolver, config).validate(message).await
}

fn make_config() -> Config {
    Config {
        fixed_system_time: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(SIGNED_AT)),
        ..Default::default()
    }
}

fn make_msg() -> String {
    let headers = [
        "DKIM-Signature: v=1; d=gluet.ch; s=ed25519.2022; a=ed25519-sha256; c=relaxed;",
        "\tt=1685533963; x=1685965963; h=In-Reply-To:References:Message-ID:Subject:To:",
        "\tFrom:Date:From; bh=Ok/RDBA9vdXb4/9LV6+zaL8d5k/ULQ8txPgihq+RLYo=; b=Lvl3jVXexq",
        "\tiO/XWd6fwnfh2DjqwZS4KjpCqH84seDO644qzE+3SvTCeK3X8rX7TNy4NoX/DbtweTAnSHyqWIAw=",
        "\t=",
        "DKIM-Signature: v=1; d=gluet.ch; s=rsa.2022; a=rsa-sha256; c=relaxed;",
        "\tt=1685533963; x=1685965963; h=In-Reply-To:References:Message-ID:Subject:To:",
        "\tFrom:Date:From; bh=Ok/RDBA9vdXb4/9LV6+zaL8d5k/ULQ8txPgihq+RLYo=; b=TqDPQwlg53",
        "\tnjF/2QvtlJhwmUgHknCdfSgGPlgA6Xf9ujD2Qwoo7f0rev/HV9cCcQIiokxzH2yq2scgRW7S3aQlT",
        "\t1nWMwTMauupENomDeI4Bu5564J/THY8pcj0WHdb3ocw/YYaHtX19TCYgsangvoBvQ2r2+ROvNCTO4",
        "\t0Ey/3ddQrvVCX0kqMoLK2S6G4T6SveN1YqtvA0J01DOR2ADXU7E+lWEjn9mVKnBsyCdFfR5IzfgP8",
        "\t+NbdhzGccyLIp7JT6MijptPw1Pqgm7Ro5a9aFS5OhQJElzj8dpEcZoXeWKHBaWRYaJm52/1MW3V0L",
        "\tt7SPHd4n5m7S78YXqRu90H2Q==",
        "Date: Wed, 31 May 2023 13:52:41 +0200",
        "From: David =?utf-8?Q?B=C3=BCrgin?= <dbuergin@gluet.ch>",
        "To: users@spamassassin.apache.org",
        "Subject: Re: authres missing when ran from spamass-milter",
        "Message-ID: <ZHc1CSNkQm3m9WII@gluet.ch>",
        "References: <ZHYhBSf+hfKW7lUu@fantomas.sk>",
        " <2d7e4edf-0cc6-72a3-15e5-c86fa6dba389@gluet.ch>",
        " <ZHYtqRk5I0vgf+lW@fantomas.sk>",
        "In-Reply-To: <ZHYtqRk5I0vgf+lW@fantomas.sk>",
    ];

    let body = [
        "Matus UHLAR - fantomas:",
        "> that will need spamass-milter change.",
        "",
        "Have you tried setting:",
        "",
        "authres_trusted_authserv fantomas.fantomas.sk",
        "",
        "I think this should work without changing anything in the milter \u{e2}\u{20ac}\u{a6}",
    ];

    let mut msg = String::new();
    for line in headers {
        msg.push_str(line);
        msg.push_str("\r\n");
    }
    msg.push_str("\r\n");
    for line in body {
        msg.push_str(line);
        msg.push_str("\r\n");
    }
    msg
}
