//! Plan parameters
//!
//! [`StackParameters`] is what operators hand in (flags, config file, env).
//! Every field is optional there; [`StackParameters::resolve`] applies the
//! defaults and validates everything up front, producing
//! [`ResolvedParameters`]. Builders only ever see resolved parameters, so no
//! default is decided inside a builder and a missing required input stops
//! plan construction before a single resource is declared.

use crate::network::{CidrError, Ipv4Cidr};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The one region this deployment targets
pub const REGION: &str = "us-east-1";

pub const DEFAULT_STACK_NAME: &str = "ListmonkEbStack";
pub const DEFAULT_PREFIX: &str = "listmonk";
pub const DEFAULT_IMAGE_TAG: &str = "v5.0.3";
pub const DEFAULT_BUNDLE_DIR: &str = "eb-bundle";
pub const DEFAULT_VPC_CIDR: &str = "10.0.0.0/16";
pub const DEFAULT_MAX_AZS: u8 = 2;
pub const DEFAULT_NAT_GATEWAYS: u8 = 1;

/// Name of the certificate parameter as operators know it
pub const CERTIFICATE_PARAMETER: &str = "AcmCertArn";

/// Name of the image tag parameter as operators know it
pub const IMAGE_TAG_PARAMETER: &str = "ListmonkImageTag";

/// Parameter resolution errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterError {
    #[error("required parameter {0} is not set")]
    Missing(&'static str),

    #[error("account id must be 12 digits, got {0:?}")]
    InvalidAccount(String),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("certificate is in region {certificate_region}, but the stack deploys to {region}")]
    CertificateRegionMismatch {
        certificate_region: String,
        region: String,
    },

    #[error("invalid VPC block: {0}")]
    Cidr(#[from] CidrError),
}

/// Raw plan inputs; `None` means "use the default" (or "missing" for
/// required inputs).
///
/// Region, database sizing, instance class, timezone and health check are
/// fixed for this deployment and are not inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackParameters {
    pub stack_name: Option<String>,
    pub account: Option<String>,
    pub certificate_arn: Option<String>,
    pub image_tag: Option<String>,
    pub bundle_dir: Option<PathBuf>,
    pub prefix: Option<String>,
    pub vpc_cidr: Option<String>,
    pub max_azs: Option<u8>,
    pub nat_gateways: Option<u8>,
}

impl StackParameters {
    /// Overlay `other` on top of `self`: every field set in `other` wins.
    pub fn merge(self, other: StackParameters) -> StackParameters {
        StackParameters {
            stack_name: other.stack_name.or(self.stack_name),
            account: other.account.or(self.account),
            certificate_arn: other.certificate_arn.or(self.certificate_arn),
            image_tag: other.image_tag.or(self.image_tag),
            bundle_dir: other.bundle_dir.or(self.bundle_dir),
            prefix: other.prefix.or(self.prefix),
            vpc_cidr: other.vpc_cidr.or(self.vpc_cidr),
            max_azs: other.max_azs.or(self.max_azs),
            nat_gateways: other.nat_gateways.or(self.nat_gateways),
        }
    }

    /// Apply defaults and validate every input.
    pub fn resolve(&self) -> Result<ResolvedParameters, ParameterError> {
        // Required inputs first: nothing else matters if these are absent.
        let certificate_arn = self
            .certificate_arn
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ParameterError::Missing(CERTIFICATE_PARAMETER))?
            .to_string();
        let account = self
            .account
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ParameterError::Missing("account"))?
            .to_string();

        if account.len() != 12 || !account.chars().all(|c| c.is_ascii_digit()) {
            return Err(ParameterError::InvalidAccount(account));
        }
        if let Some(certificate_region) = arn_region(&certificate_arn) {
            if certificate_region != REGION {
                return Err(ParameterError::CertificateRegionMismatch {
                    certificate_region: certificate_region.to_string(),
                    region: REGION.to_string(),
                });
            }
        }

        let image_tag = self.image_tag.as_deref().unwrap_or(DEFAULT_IMAGE_TAG);
        validate_image_tag(image_tag)?;

        let prefix = self.prefix.as_deref().unwrap_or(DEFAULT_PREFIX);
        validate_prefix(prefix)?;

        let stack_name = non_empty(
            "stack_name",
            self.stack_name.as_deref().unwrap_or(DEFAULT_STACK_NAME),
        )?;

        let network = self.resolve_network(REGION)?;

        Ok(ResolvedParameters {
            stack_name,
            account,
            region: REGION.to_string(),
            partition: Partition::for_region(REGION),
            certificate_arn,
            image_tag: image_tag.to_string(),
            prefix: prefix.to_string(),
            bundle_dir: self
                .bundle_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BUNDLE_DIR)),
            network,
        })
    }

    fn resolve_network(&self, region: &str) -> Result<NetworkSettings, ParameterError> {
        let cidr: Ipv4Cidr = self
            .vpc_cidr
            .as_deref()
            .unwrap_or(DEFAULT_VPC_CIDR)
            .parse()?;
        if !(16..=24).contains(&cidr.prefix()) {
            return Err(ParameterError::Invalid {
                name: "vpc_cidr",
                reason: format!("prefix /{} outside /16../24", cidr.prefix()),
            });
        }

        let max_azs = self.max_azs.unwrap_or(DEFAULT_MAX_AZS);
        if !(1..=6).contains(&max_azs) {
            return Err(ParameterError::Invalid {
                name: "max_azs",
                reason: format!("{max_azs} outside 1..=6"),
            });
        }

        let nat_gateways = self.nat_gateways.unwrap_or(DEFAULT_NAT_GATEWAYS);
        if nat_gateways == 0 || nat_gateways > max_azs {
            return Err(ParameterError::Invalid {
                name: "nat_gateways",
                reason: format!("{nat_gateways} must be between 1 and max_azs ({max_azs})"),
            });
        }

        let availability_zones = (0..max_azs)
            .map(|i| format!("{region}{}", char::from(b'a' + i)))
            .collect();

        Ok(NetworkSettings {
            cidr,
            availability_zones,
            nat_gateways,
        })
    }
}

/// Fully resolved inputs handed to the builders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedParameters {
    pub stack_name: String,
    pub account: String,
    pub region: String,
    pub partition: Partition,
    pub certificate_arn: String,
    pub image_tag: String,
    pub prefix: String,
    pub bundle_dir: PathBuf,
    pub network: NetworkSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSettings {
    pub cidr: Ipv4Cidr,
    pub availability_zones: Vec<String>,
    pub nat_gateways: u8,
}

/// ARN partition the region belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Partition {
    Aws,
    AwsCn,
    AwsUsGov,
}

impl Partition {
    pub fn for_region(region: &str) -> Self {
        if region.starts_with("cn-") {
            Self::AwsCn
        } else if region.starts_with("us-gov-") {
            Self::AwsUsGov
        } else {
            Self::Aws
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::AwsCn => "aws-cn",
            Self::AwsUsGov => "aws-us-gov",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn non_empty(name: &'static str, value: &str) -> Result<String, ParameterError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ParameterError::Invalid {
            name,
            reason: "must not be empty".into(),
        });
    }
    Ok(value.to_string())
}

/// Region segment of an ARN (`arn:partition:service:region:account:resource`)
fn arn_region(arn: &str) -> Option<&str> {
    let mut parts = arn.splitn(6, ':');
    if parts.next()? != "arn" {
        return None;
    }
    let region = parts.nth(2)?;
    (!region.is_empty()).then_some(region)
}

/// Container image tag grammar: `[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}`
fn validate_image_tag(tag: &str) -> Result<(), ParameterError> {
    let mut chars = tag.chars();
    let valid = tag.len() <= 128
        && chars
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if !valid {
        return Err(ParameterError::Invalid {
            name: IMAGE_TAG_PARAMETER,
            reason: format!("{tag:?} is not a valid image tag"),
        });
    }
    Ok(())
}

fn validate_prefix(prefix: &str) -> Result<(), ParameterError> {
    let valid = prefix.chars().next().is_some_and(|c| c.is_ascii_lowercase())
        && prefix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid {
        return Err(ParameterError::Invalid {
            name: "prefix",
            reason: format!("{prefix:?} must be lowercase alphanumeric with hyphens"),
        });
    }
    Ok(())
}
