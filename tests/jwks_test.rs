use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use httpmock::{Method::GET, MockServer};
use imgprov::ProvisionError;
use imgprov::jwks::{derive_jwks_public_key_pem, fetch_jwks};
use p384::elliptic_curve::sec1::ToEncodedPoint;
use p384::pkcs8::DecodePublicKey;

const TIMEOUT: Duration = Duration::from_secs(5);

fn sample_key() -> (p384::PublicKey, String) {
    let secret = p384::SecretKey::from_slice(&[11u8; 48]).expect("valid scalar");
    let public = secret.public_key();
    let point = public.to_encoded_point(false);
    let doc = format!(
        r#"{{"keys":[{{"kty":"EC","use":"sig","kid":"primary","alg":"ES384","crv":"P-384","x":"{}","y":"{}"}}]}}"#,
        URL_SAFE_NO_PAD.encode(point.x().unwrap()),
        URL_SAFE_NO_PAD.encode(point.y().unwrap()),
    );
    (public, doc)
}

#[test]
fn derives_pem_from_served_key_set() {
    let (public, doc) = sample_key();
    let server = MockServer::start();
    let jwks = server.mock(|when, then| {
        when.method(GET).path("/.well-known/jwks.json");
        then.status(200)
            .header("content-type", "application/json")
            .body(doc);
    });

    let pem = derive_jwks_public_key_pem(&server.url("/.well-known/jwks.json"), TIMEOUT).unwrap();

    assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
    assert_eq!(p384::PublicKey::from_public_key_pem(&pem).unwrap(), public);
    assert_eq!(jwks.hits(), 1);
}

#[test]
fn non_success_status_is_network_error() {
    let server = MockServer::start();
    let jwks = server.mock(|when, then| {
        when.method(GET).path("/jwks");
        then.status(404);
    });

    let err = derive_jwks_public_key_pem(&server.url("/jwks"), TIMEOUT).unwrap_err();
    match &err {
        ProvisionError::Network { url, message } => {
            assert!(url.ends_with("/jwks"));
            assert!(message.contains("error fetching JWKS"), "got {}", message);
            assert!(message.contains("404"), "got {}", message);
        }
        other => panic!("expected network error, got {:?}", other),
    }
    assert_eq!(jwks.hits(), 1, "failed fetches are not retried");
}

#[test]
fn malformed_body_is_parse_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/jwks");
        then.status(200).body("<html>not json</html>");
    });

    let err = fetch_jwks(&server.url("/jwks"), TIMEOUT).unwrap_err();
    assert!(matches!(err, ProvisionError::Parse(_)), "got {:?}", err);
}

#[test]
fn empty_key_set_is_parse_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/jwks");
        then.status(200).body(r#"{"keys":[]}"#);
    });

    let err = derive_jwks_public_key_pem(&server.url("/jwks"), TIMEOUT).unwrap_err();
    assert!(matches!(err, ProvisionError::Parse(_)), "got {:?}", err);
    assert!(err.to_string().contains("no keys found in JWKS"));
}

#[test]
fn unreachable_host_is_network_error() {
    // Port 9 (discard) on localhost is not expected to accept HTTP.
    let err = fetch_jwks("http://127.0.0.1:9/jwks", TIMEOUT).unwrap_err();
    assert!(matches!(err, ProvisionError::Network { .. }), "got {:?}", err);
}
