//! End-to-End Integration Tests
//!
//! These tests drive the security policy and artifact map together, the way
//! a service provider processes messages from an identity provider.

mod artifact_redemption;
mod policy_flow;
