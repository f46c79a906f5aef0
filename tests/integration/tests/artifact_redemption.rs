//! Artifact map integration tests.
//!
//! The identity provider side stores a response under an artifact; the
//! service provider redeems it over an authenticated back channel.

use fedsec_integration_tests::{TestEnv, IDP_CERT_PEM, IDP_ENTITY_ID, SP_ENTITY_ID};
use fedsec_saml::binding::ArtifactMapConfig;
use fedsec_saml::policy::ProtocolMessage;
use fedsec_saml::types::SamlArtifact;
use fedsec_saml::SamlError;

/// Store, transmit the encoded artifact, decode, redeem and evaluate.
#[tokio::test]
async fn test_artifact_round_trip_and_evaluation() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let map = env.artifact_map(ArtifactMapConfig::default());

    let artifact = SamlArtifact::new_type0004(IDP_ENTITY_ID, 1);
    let response = TestEnv::response("_resp1", TestEnv::at(0))?;
    map.store_content(response, &artifact, Some(SP_ENTITY_ID)).await?;

    let received = SamlArtifact::parse(&artifact.encode())?;
    assert!(received.is_from(IDP_ENTITY_ID));
    assert_eq!(map.relying_party(&received).await?.as_deref(), Some(SP_ENTITY_ID));

    let content = map
        .retrieve_content(&received, Some(SP_ENTITY_ID))
        .await?
        .expect("artifact content");
    assert_eq!(content.message_id(), Some("_resp1"));

    let mut policy = env.policy();
    policy.evaluate(&content, Some(&TestEnv::tls_request(IDP_CERT_PEM)?))?;
    assert!(policy.is_authenticated());

    assert!(map.retrieve_content(&received, Some(SP_ENTITY_ID)).await?.is_none());

    Ok(())
}

/// A guess by the wrong relying party burns the artifact for everyone.
#[tokio::test]
async fn test_wrong_relying_party_burns_artifact() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let map = env.artifact_map(ArtifactMapConfig::default());

    let artifact = SamlArtifact::new_type0004(IDP_ENTITY_ID, 0);
    map.store_content(TestEnv::response("_resp1", TestEnv::at(0))?, &artifact, Some(SP_ENTITY_ID))
        .await?;

    let err = map
        .retrieve_content(&artifact, Some("https://attacker.example.org"))
        .await
        .expect_err("mismatched relying party must fail");
    assert!(matches!(err, SamlError::ArtifactTrustViolation { .. }));
    assert_eq!(err.http_status(), 403);

    assert!(map.retrieve_content(&artifact, Some(SP_ENTITY_ID)).await?.is_none());
    assert!(env.storage.is_empty());

    Ok(())
}

/// Entries vanish once the configured lifetime passes.
#[tokio::test]
async fn test_configured_ttl() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let map = env.artifact_map(ArtifactMapConfig {
        artifact_ttl_secs: 30,
        ..ArtifactMapConfig::default()
    });

    let early = SamlArtifact::new_type0004(IDP_ENTITY_ID, 0);
    let late = SamlArtifact::new_type0004(IDP_ENTITY_ID, 0);
    map.store_content(TestEnv::response("_a", TestEnv::at(0))?, &early, None).await?;
    map.store_content(TestEnv::response("_b", TestEnv::at(0))?, &late, None).await?;

    env.clock.advance_secs(29);
    assert!(map.retrieve_content(&early, None).await?.is_some());

    env.clock.advance_secs(1);
    assert!(map.retrieve_content(&late, None).await?.is_none());
    assert!(map.relying_party(&late).await?.is_none());

    Ok(())
}

/// SAML 1.x artifacts work the same way as SAML 2.0 ones.
#[tokio::test]
async fn test_saml1_artifact() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let map = env.artifact_map(ArtifactMapConfig::default());

    let artifact = SamlArtifact::new_type0001(IDP_ENTITY_ID);
    map.store_content(TestEnv::response("_a", TestEnv::at(0))?, &artifact, None).await?;

    let received = SamlArtifact::parse(&artifact.encode())?;
    assert_eq!(received, artifact);
    assert!(map.retrieve_content(&received, None).await?.is_some());

    Ok(())
}

/// Content still attached to an enclosing message cannot be stored.
#[tokio::test]
async fn test_attached_content_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let map = env.artifact_map(ArtifactMapConfig::default());

    let attached = TestEnv::response("_a", TestEnv::at(0))?
        .attached_to("{urn:oasis:names:tc:SAML:2.0:protocol}ArtifactResponse");
    let err = map
        .store_content(attached, &SamlArtifact::new_type0004(IDP_ENTITY_ID, 0), None)
        .await
        .expect_err("attached content must be rejected");

    assert!(matches!(err, SamlError::ContractViolation(_)));
    assert!(!err.is_policy_violation());

    Ok(())
}
