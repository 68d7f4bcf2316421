//! Shared fixtures for unit tests

use listmonk_eb_types::{ResolvedParameters, StackParameters};

pub(crate) const ACCOUNT: &str = "123456789012";
pub(crate) const CERTIFICATE: &str = "arn:aws:acm:us-east-1:123456789012:certificate/abc-123";

pub(crate) fn stack_parameters() -> StackParameters {
    StackParameters {
        account: Some(ACCOUNT.into()),
        certificate_arn: Some(CERTIFICATE.into()),
        ..Default::default()
    }
}

pub(crate) fn params() -> ResolvedParameters {
    stack_parameters().resolve().unwrap()
}
