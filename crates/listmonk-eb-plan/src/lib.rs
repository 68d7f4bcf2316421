//! listmonk-eb Plan - Provisioning plan for listmonk on Elastic Beanstalk
//!
//! Turns resolved parameters into a [`Plan`]: every resource the deployment
//! needs, wired together with explicit dependency edges, plus the outputs,
//! storage grants and asset entries the external engine consumes.
//!
//! ## Component Order
//!
//! ```text
//! network -> access policy -> credential -> data cluster
//!                          -> identity   -> artifact
//!                          -> environment (everything above) -> outputs
//! ```
//!
//! Each builder is a function from parameters and upstream descriptors to a
//! [`Fragment`]; [`Plan::absorb`] rejects any fragment that points at a
//! resource the plan does not hold yet.
//!
//! ## Usage
//!
//! ```no_run
//! use listmonk_eb_plan::{synthesize, template};
//! use listmonk_eb_types::StackParameters;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let params = StackParameters {
//!     account: Some("123456789012".into()),
//!     certificate_arn: Some("arn:aws:acm:us-east-1:123456789012:certificate/abc".into()),
//!     ..Default::default()
//! };
//! let synthesis = synthesize(&params)?;
//! println!("{}", template::to_string_pretty(&synthesis.plan)?);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod access;
pub mod artifact;
pub mod credential;
pub mod database;
pub mod diff;
pub mod environment;
pub mod error;
pub mod graph;
pub mod guard;
pub mod identity;
pub mod network;
pub mod outputs;
pub mod plan;
pub mod template;

mod tags;
#[cfg(test)]
mod testing;

pub use access::{AccessBoundary, AccessPolicy, Tier};
pub use artifact::Artifact;
pub use credential::{Credential, GeneratedPassword, PasswordPolicy};
pub use database::DataCluster;
pub use diff::{ChangeAction, PlanDiff, ResourceChange};
pub use environment::EnvironmentDescriptor;
pub use error::{PlanError, Result};
pub use graph::DependencyGraph;
pub use identity::{Identity, IdentityPair, ManagedPolicy, ServicePrincipal};
pub use network::{NetworkTopology, SubnetRef};
pub use plan::{AssetEntry, Fragment, Grant, Output, Plan};

use listmonk_eb_types::{ResolvedParameters, StackParameters};
use tracing::{info, instrument};

/// A built plan and the descriptors it was built from
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub params: ResolvedParameters,
    pub plan: Plan,
    pub network: NetworkTopology,
    pub access: AccessPolicy,
    pub credential: Credential,
    pub cluster: DataCluster,
    pub identities: IdentityPair,
    pub artifact: Artifact,
    pub environment: EnvironmentDescriptor,
}

/// Resolve parameters and build the plan.
///
/// Parameters are resolved first, so a missing certificate or account fails
/// before any resource is declared.
pub fn synthesize(params: &StackParameters) -> Result<Synthesis> {
    let resolved = params.resolve()?;
    synthesize_resolved(&resolved)
}

/// Build the plan from already resolved parameters.
#[instrument(skip_all, fields(stack = %params.stack_name, region = %params.region))]
pub fn synthesize_resolved(params: &ResolvedParameters) -> Result<Synthesis> {
    let mut plan = Plan::new(params);

    let network = plan.absorb(network::build(params)?)?;
    let access = plan.absorb(access::build(params, &network)?)?;
    let credential = plan.absorb(credential::build(params)?)?;
    let cluster = plan.absorb(database::build(params, &network, &access.data, &credential)?)?;
    let identities = plan.absorb(identity::build(params)?)?;
    let artifact = plan.absorb(artifact::build(params, identities.orchestration.principal)?)?;

    let upstream = environment::Upstream {
        network: &network,
        access: &access,
        credential: &credential,
        cluster: &cluster,
        identities: &identities,
        artifact: &artifact,
    };
    let environment = plan.absorb(environment::build(params, &upstream)?)?;

    outputs::emit(&mut plan, &network, &access, &cluster, &credential)?;
    plan.validate()?;

    info!(
        resources = plan.len(),
        outputs = plan.outputs().len(),
        grants = plan.grants().len(),
        "Plan synthesized"
    );

    Ok(Synthesis {
        params: params.clone(),
        plan,
        network,
        access,
        credential,
        cluster,
        identities,
        artifact,
        environment,
    })
}
