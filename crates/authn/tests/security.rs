//! Security-focused token tests.
//!
//! These tests check the token pipeline's resistance to common JWT attack
//! vectors: algorithm substitution, tampered payloads, forged signatures,
//! expired tokens, structurally broken input and replay after logout.
#![allow(clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::json;
use tokengate_authn::{
    AuthError, InMemoryRevocationStore, RequestGate, RevocationStore, TokenCodec,
    assert_auth_error,
    config::AuthConfig,
    jwt::unix_now,
    testutil::{TEST_SECRET, craft_raw_jwt, issue_expired_token, test_config},
};
use tokengate_storage::UserId;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn codec() -> TokenCodec {
    TokenCodec::new(&test_config())
}

fn gate() -> (RequestGate, Arc<TokenCodec>, Arc<InMemoryRevocationStore>) {
    let codec = Arc::new(codec());
    let store = Arc::new(InMemoryRevocationStore::new());
    (RequestGate::new(Arc::clone(&codec), store.clone()), codec, store)
}

/// Signs arbitrary JSON claims with the test secret under `alg`.
fn sign_raw(alg: Algorithm, claims: &serde_json::Value) -> String {
    jsonwebtoken::encode(
        &Header::new(alg),
        claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("sign test claims")
}

fn valid_payload() -> serde_json::Value {
    let now = unix_now();
    json!({"sub": "7", "email": "mallory@example.com", "iat": now, "exp": now + 3600})
}

// ===========================================================================
// 1. Algorithm substitution
// ===========================================================================

#[test]
fn test_algorithm_none_rejected() {
    let token = craft_raw_jwt(&json!({"typ": "JWT", "alg": "none"}), &valid_payload());
    // `none` is not a known algorithm, so the header fails to parse.
    let err = codec().verify(&token).expect_err("alg none must be rejected");
    assert!(err.is_unauthenticated(), "got: {err:?}");
}

#[test]
fn test_algorithm_none_with_empty_signature_rejected() {
    let token = craft_raw_jwt(&json!({"alg": "none"}), &valid_payload());
    let (unsigned, _) = token.rsplit_once('.').expect("three segments");
    let err = codec().verify(&format!("{unsigned}.")).expect_err("unsigned token");
    assert!(err.is_unauthenticated(), "got: {err:?}");
}

#[test]
fn test_other_hmac_algorithms_rejected_even_with_correct_secret() {
    for alg in [Algorithm::HS384, Algorithm::HS512] {
        let token = sign_raw(alg, &valid_payload());
        assert_auth_error!(codec().verify(&token), BadSignature);
    }
}

#[test]
fn test_asymmetric_algorithm_header_rejected() {
    for alg in ["RS256", "ES256", "EdDSA"] {
        let token = craft_raw_jwt(&json!({"typ": "JWT", "alg": alg}), &valid_payload());
        let err = codec().verify(&token).expect_err("asymmetric header");
        assert!(err.is_unauthenticated(), "{alg}: {err:?}");
    }
}

// ===========================================================================
// 2. Tampering and forgery
// ===========================================================================

#[test]
fn test_tampered_payload_rejected() {
    let codec = codec();
    let issued = codec.issue(UserId::from(7), "mallory@example.com").expect("issue");

    // Re-encode the payload with a different subject but keep the signature.
    let mut parts: Vec<&str> = issued.token.split('.').collect();
    let forged_payload = base64_url(&json!({
        "sub": "1",
        "email": "admin@example.com",
        "iat": issued.claims.iat,
        "exp": issued.claims.exp,
    }));
    parts[1] = &forged_payload;
    let forged = parts.join(".");

    assert_auth_error!(codec.verify(&forged), BadSignature);
}

#[test]
fn test_extended_expiry_rejected() {
    let codec = codec();
    let issued = codec.issue(UserId::from(7), "m@example.com").expect("issue");

    let mut parts: Vec<&str> = issued.token.split('.').collect();
    let extended = base64_url(&json!({
        "sub": issued.claims.sub,
        "email": issued.claims.email,
        "iat": issued.claims.iat,
        "exp": issued.claims.exp + 86_400 * 365,
    }));
    parts[1] = &extended;

    assert_auth_error!(codec.verify(&parts.join(".")), BadSignature);
}

#[test]
fn test_token_from_another_deployment_rejected() {
    let other = AuthConfig::builder()
        .secret("a-completely-different-deployment-secret")
        .build()
        .expect("config");
    let foreign = TokenCodec::new(&other).issue(UserId::from(1), "a@b.c").expect("issue").token;

    assert_auth_error!(codec().verify(&foreign), BadSignature);
}

#[test]
fn test_truncated_signature_rejected() {
    let issued = codec().issue(UserId::from(1), "a@b.c").expect("issue");
    let truncated = &issued.token[..issued.token.len() - 4];
    let err = codec().verify(truncated).expect_err("truncated signature");
    assert!(err.is_unauthenticated(), "got: {err:?}");
}

// ===========================================================================
// 3. Claim validation
// ===========================================================================

#[test]
fn test_missing_required_claims_rejected() {
    let now = unix_now();
    for payload in [
        json!({"email": "a@b.c", "iat": now, "exp": now + 60}),
        json!({"sub": "1", "email": "a@b.c", "exp": now + 60}),
        json!({"sub": "1", "email": "a@b.c", "iat": now}),
    ] {
        let token = sign_raw(Algorithm::HS256, &payload);
        assert_auth_error!(codec().verify(&token), Malformed);
    }
}

#[test]
fn test_expiry_not_after_issuance_rejected() {
    let now = unix_now();
    let token = sign_raw(
        Algorithm::HS256,
        &json!({"sub": "1", "email": "a@b.c", "iat": now, "exp": now}),
    );
    assert_auth_error!(codec().verify(&token), Malformed);
}

#[test]
fn test_expiry_boundary_is_inclusive() {
    let codec = codec();
    let issued = codec.issue_at(UserId::from(1), "a@b.c", 1_000_000).expect("issue");
    let exp = issued.claims.exp;

    assert!(codec.verify_at(&issued.token, exp).is_ok());
    assert_auth_error!(codec.verify_at(&issued.token, exp + 1), Expired);
}

#[tokio::test]
async fn test_non_numeric_subject_rejected_by_gate() {
    let (gate, _, _) = gate();
    let now = unix_now();
    let token = sign_raw(
        Algorithm::HS256,
        &json!({"sub": "client:alice", "email": "a@b.c", "iat": now, "exp": now + 60}),
    );
    assert_auth_error!(gate.admit(Some(&token)).await, Malformed);
}

// ===========================================================================
// 4. Structural garbage
// ===========================================================================

#[test]
fn test_malformed_structures_rejected() {
    let codec = codec();
    for token in [
        "",
        ".",
        "..",
        "a.b",
        "a.b.c.d",
        "not-a-jwt",
        "eyJhbGciOiJIUzI1NiJ9",
        "eyJhbGciOiJIUzI1NiJ9.!!!.sig",
        "\u{0}\u{0}\u{0}",
    ] {
        let err = codec.verify(token).expect_err("garbage must not verify");
        assert!(err.is_unauthenticated(), "{token:?}: {err:?}");
    }
}

// ===========================================================================
// 5. Expiry and replay through the gate
// ===========================================================================

#[tokio::test]
async fn test_expired_token_rejected_by_gate() {
    let (gate, codec, _) = gate();
    let expired = issue_expired_token(&codec, UserId::from(3));
    assert_auth_error!(gate.admit(Some(&expired)).await, Expired);
}

#[tokio::test]
async fn test_revoked_token_cannot_be_replayed() {
    let (gate, codec, store) = gate();
    let issued = codec.issue(UserId::from(3), "r@example.com").expect("issue");

    assert!(gate.admit(Some(&issued.token)).await.is_ok());

    store.revoke(&issued.token, issued.claims.exp).await.expect("revoke");

    for _ in 0..3 {
        assert_auth_error!(gate.admit(Some(&issued.token)).await, Revoked);
    }
}

#[tokio::test]
async fn test_rejections_share_one_external_shape() {
    let (gate, codec, _) = gate();
    let expired = issue_expired_token(&codec, UserId::from(3));
    let forged = craft_raw_jwt(&json!({"alg": "HS256"}), &valid_payload());

    for token in [None, Some(""), Some(expired.as_str()), Some(forged.as_str())] {
        let err: AuthError = gate.admit(token).await.expect_err("rejected");
        assert!(err.is_unauthenticated(), "{token:?}: {err:?}");
    }
}

fn base64_url(value: &serde_json::Value) -> String {
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    URL_SAFE_NO_PAD.encode(value.to_string())
}
