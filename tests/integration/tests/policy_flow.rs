//! Security policy integration tests.
//!
//! Full rule chains evaluated against identity provider responses.

use std::sync::Arc;

use fedsec_integration_tests::{TestEnv, IDP_CERT_PEM, IDP_ENTITY_ID, ROGUE_CERT_PEM};
use fedsec_saml::policy::rules::NullSecurityRule;
use fedsec_saml::types::Issuer;
use fedsec_saml::SamlError;

/// A fresh response over an authenticated back channel is accepted.
#[tokio::test]
async fn test_trusted_response_is_authenticated() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let mut policy = env.policy();
    let request = TestEnv::tls_request(IDP_CERT_PEM)?;
    let response = TestEnv::response("_resp1", TestEnv::at(0))?;

    policy.evaluate(&response, Some(&request))?;

    assert!(policy.is_authenticated());
    assert_eq!(policy.issuer().map(|i| i.name.as_str()), Some(IDP_ENTITY_ID));
    assert!(Arc::ptr_eq(
        policy.issuer_metadata().expect("issuer metadata"),
        &env.idp_role
    ));
    assert_eq!(policy.message_id(), Some("_resp1"));

    Ok(())
}

/// Without a client certificate the message passes but is not authenticated.
#[tokio::test]
async fn test_front_channel_response_is_not_authenticated() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let mut policy = env.policy();
    let response = TestEnv::response("_resp1", TestEnv::at(0))?;

    policy.evaluate(&response, None)?;

    assert!(!policy.is_authenticated());
    assert!(policy.issuer().is_some());

    Ok(())
}

/// A certificate the issuer never published rejects the message.
#[tokio::test]
async fn test_rogue_certificate_is_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let mut policy = env.policy();
    let request = TestEnv::tls_request(ROGUE_CERT_PEM)?;
    let response = TestEnv::response("_resp1", TestEnv::at(0))?;

    let err = policy
        .evaluate(&response, Some(&request))
        .expect_err("rogue certificate must be rejected");

    assert!(matches!(err, SamlError::TransportCredentialRejected(_)));
    assert!(err.is_policy_violation());
    assert_eq!(err.http_status(), 401);
    assert!(!policy.is_authenticated());

    Ok(())
}

/// A response replayed within the freshness window is rejected, and once
/// the window has passed it is rejected as expired instead.
#[tokio::test]
async fn test_replay_then_expiry() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let response = TestEnv::response("_m1", TestEnv::at(0))?;

    let mut policy = env.policy();
    policy.evaluate(&response, None)?;

    env.clock.advance_secs(64);
    let mut policy = env.policy();
    let err = policy
        .evaluate(&response, None)
        .expect_err("replay must be rejected");
    assert!(matches!(err, SamlError::ReplayDetected(ref id) if id == "_m1"));

    env.clock.advance_secs(2);
    let mut policy = env.policy();
    let err = policy
        .evaluate(&response, None)
        .expect_err("stale message must be rejected");
    assert!(matches!(err, SamlError::MessageExpired));

    Ok(())
}

/// Messages dated beyond the tolerated skew are rejected.
#[tokio::test]
async fn test_future_dated_response() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let mut policy = env.policy();
    policy.evaluate(&TestEnv::response("_ok", TestEnv::at(5))?, None)?;

    let mut policy = env.policy();
    let err = policy
        .evaluate(&TestEnv::response("_late", TestEnv::at(6))?, None)
        .expect_err("future message must be rejected");
    assert!(matches!(err, SamlError::IssuedInFuture));

    Ok(())
}

/// A rule chain that sees two different issuers rejects the message.
#[tokio::test]
async fn test_issuer_conflict_aborts_chain() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let mut policy = env.policy();
    policy.set_issuer(&Issuer::new("https://other.example.org"))?;
    let request = TestEnv::tls_request(IDP_CERT_PEM)?;

    let err = policy
        .evaluate(&TestEnv::response("_resp1", TestEnv::at(0))?, Some(&request))
        .expect_err("conflicting issuer must be rejected");

    assert!(matches!(err, SamlError::IssuerConflict { .. }));
    assert!(!policy.is_authenticated());
    assert_eq!(env.replay_cache.len(), 0);

    Ok(())
}

/// An unknown issuer has no metadata, so the certificate rule cannot apply.
#[tokio::test]
async fn test_unknown_issuer_is_never_authenticated() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let mut policy = env.policy();
    let request = TestEnv::tls_request(IDP_CERT_PEM)?;
    let response = TestEnv::response_from("https://unknown.example.org", "_resp1", TestEnv::at(0))?;

    policy.evaluate(&response, Some(&request))?;

    assert!(policy.issuer_metadata().is_none());
    assert!(!policy.is_authenticated());

    Ok(())
}

/// A policy can be reset and reused for the next message.
#[tokio::test]
async fn test_policy_reuse_after_reset() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let mut policy = env.policy();
    let request = TestEnv::tls_request(IDP_CERT_PEM)?;

    policy.evaluate(&TestEnv::response("_first", TestEnv::at(0))?, Some(&request))?;
    assert!(policy.is_authenticated());

    env.clock.advance_secs(10);
    policy.reset(false);
    assert!(!policy.is_authenticated());

    policy.evaluate(&TestEnv::response("_second", TestEnv::at(10))?, None)?;
    assert_eq!(policy.message_id(), Some("_second"));
    assert!(!policy.is_authenticated());
    assert_eq!(env.replay_cache.len(), 2);

    Ok(())
}

/// Later rules still run after earlier rules establish trust.
#[tokio::test]
async fn test_rules_do_not_short_circuit() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let mut policy = env.policy();
    policy.rules_mut().insert(0, Arc::new(NullSecurityRule::new()));
    let response = TestEnv::response("_m1", TestEnv::at(0))?;

    policy.evaluate(&response, None)?;
    assert!(policy.is_authenticated());

    let mut policy = env.policy();
    policy.rules_mut().insert(0, Arc::new(NullSecurityRule::new()));
    let err = policy
        .evaluate(&response, None)
        .expect_err("replay must still be caught");
    assert!(matches!(err, SamlError::ReplayDetected(_)));

    Ok(())
}
