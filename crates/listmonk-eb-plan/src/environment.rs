//! Environment composer
//!
//! Registers the application and a version pointing at the published bundle,
//! then declares the environment with its full option table. Everything the
//! environment needs arrives as an upstream descriptor; nothing is looked up.

use crate::access::AccessPolicy;
use crate::artifact::Artifact;
use crate::credential::Credential;
use crate::database::DataCluster;
use crate::error::Result;
use crate::identity::{IdentityPair, ServicePrincipal};
use crate::network::NetworkTopology;
use crate::plan::Fragment;
use listmonk_eb_types::{
    Component, LogicalId, OptionSettings, Properties, ResolvedParameters, Resource, ResourceKind,
    SubnetType, Value,
};
use tracing::{info, instrument};

/// Hosting platform the environment runs on
pub const SOLUTION_STACK: &str = "64bit Amazon Linux 2023 v4.7.0 running Docker";

/// Address the application binds inside the container
pub const APP_ADDRESS: &str = "0.0.0.0:9000";

/// Port of the on-instance proxy the load balancer forwards to
pub const PROXY_PORT: u16 = 80;

/// Route behind the admin login; a broken application fails the check.
pub const HEALTH_CHECK_PATH: &str = "/admin/login";

pub const INSTANCE_TYPE: &str = "t3.medium";
pub const TIMEZONE: &str = "Australia/Sydney";

pub const DEPLOYMENT_POLICY: &str = "Rolling";
pub const UPDATE_LEVEL: &str = "minor";
pub const MAINTENANCE_WINDOW: &str = "Sun:14:00";

/// Option namespaces used by the environment
pub mod namespace {
    pub const LOAD_BALANCER: &str = "aws:elbv2:loadbalancer";
    pub const ENVIRONMENT: &str = "aws:elasticbeanstalk:environment";
    pub const LAUNCH: &str = "aws:autoscaling:launchconfiguration";
    pub const VPC: &str = "aws:ec2:vpc";
    pub const HTTPS_LISTENER: &str = "aws:elb:listener:443";
    pub const DEFAULT_PROCESS: &str = "aws:elasticbeanstalk:environment:process:default";
    pub const APP_ENV: &str = "aws:elasticbeanstalk:application:environment";
    pub const COMMAND: &str = "aws:elasticbeanstalk:command";
    pub const MANAGED_ACTIONS: &str = "aws:elasticbeanstalk:managedactions";
    pub const PLATFORM_UPDATE: &str = "aws:elasticbeanstalk:managedactions:platformupdate";
}

/// Everything the composer consumes
#[derive(Debug, Clone, Copy)]
pub struct Upstream<'a> {
    pub network: &'a NetworkTopology,
    pub access: &'a AccessPolicy,
    pub credential: &'a Credential,
    pub cluster: &'a DataCluster,
    pub identities: &'a IdentityPair,
    pub artifact: &'a Artifact,
}

/// The declared application, version and environment
#[derive(Debug, Clone)]
pub struct EnvironmentDescriptor {
    pub application: LogicalId,
    pub version: LogicalId,
    pub environment: LogicalId,
    pub application_name: String,
    pub environment_name: String,
    pub options: OptionSettings,
}

impl EnvironmentDescriptor {
    pub fn endpoint_url(&self) -> Value {
        Value::attribute(&self.environment, "EndpointURL")
    }

    /// Value a runtime variable resolves to
    pub fn runtime_variable(&self, name: &str) -> Option<&Value> {
        self.options.get(namespace::APP_ENV, name)
    }
}

/// The full option table.
///
/// Each namespace:option pair is set once; a second set of the same pair is
/// an error.
pub fn option_settings(params: &ResolvedParameters, up: &Upstream<'_>) -> Result<OptionSettings> {
    use namespace::*;

    let mut o = OptionSettings::new();

    o.set(LOAD_BALANCER, "SecurityGroups", up.access.edge.group_id())?;

    o.set(ENVIRONMENT, "ServiceRole", up.identities.orchestration.role_arn())?;
    o.set(LAUNCH, "IamInstanceProfile", up.identities.runtime_profile())?;
    o.set(LAUNCH, "SecurityGroups", up.access.application.group_id())?;
    o.set(LAUNCH, "InstanceType", INSTANCE_TYPE)?;

    o.set(VPC, "VPCId", up.network.vpc_id())?;
    o.set(VPC, "Subnets", up.network.subnet_ids(SubnetType::PrivateWithEgress))?;
    o.set(VPC, "ELBSubnets", up.network.subnet_ids(SubnetType::Public))?;

    o.set(ENVIRONMENT, "LoadBalancerType", "application")?;
    o.set(HTTPS_LISTENER, "ListenerEnabled", "true")?;
    o.set(HTTPS_LISTENER, "Protocol", "HTTPS")?;
    o.set(HTTPS_LISTENER, "SSLCertificateId", params.certificate_arn.as_str())?;

    o.set(DEFAULT_PROCESS, "Port", PROXY_PORT.to_string())?;
    o.set(DEFAULT_PROCESS, "HealthCheckPath", HEALTH_CHECK_PATH)?;

    o.set(APP_ENV, "LISTMONK_IMAGE_TAG", params.image_tag.as_str())?;
    o.set(APP_ENV, "LISTMONK_app__address", APP_ADDRESS)?;
    o.set(APP_ENV, "LISTMONK_db__host", up.cluster.endpoint_hostname())?;
    o.set(APP_ENV, "LISTMONK_db__port", up.cluster.port.number().to_string())?;
    o.set(APP_ENV, "LISTMONK_db__database", up.cluster.database_name.as_str())?;
    // Resolved by the provider at apply time; the plan holds only the pointer.
    o.set(APP_ENV, "LISTMONK_db__user", up.credential.username_value())?;
    o.set(APP_ENV, "LISTMONK_db__password", up.credential.password_value())?;
    o.set(APP_ENV, "LISTMONK_db__ssl_mode", "require")?;
    o.set(APP_ENV, "TZ", TIMEZONE)?;

    o.set(COMMAND, "DeploymentPolicy", DEPLOYMENT_POLICY)?;

    o.set(MANAGED_ACTIONS, "ManagedActionsEnabled", "true")?;
    o.set(PLATFORM_UPDATE, "UpdateLevel", UPDATE_LEVEL)?;
    o.set(MANAGED_ACTIONS, "PreferredStartTime", MAINTENANCE_WINDOW)?;

    Ok(o)
}

#[instrument(skip_all, fields(prefix = %params.prefix, image_tag = %params.image_tag))]
pub fn build(params: &ResolvedParameters, up: &Upstream<'_>) -> Result<Fragment<EnvironmentDescriptor>> {
    let prefix = params.prefix.as_str();
    let application_name = prefix.to_string();
    let environment_name = format!("{prefix}-prod");

    let application = LogicalId::from_path(&[&format!("{prefix}-EbApp")]);
    let version = LogicalId::from_path(&[&format!("{prefix}-EbAppVersion")]);
    let environment = LogicalId::from_path(&[&format!("{prefix}-EbEnv")]);

    let options = option_settings(params, up)?;

    let app_resource = Resource::new(application.clone(), ResourceKind::Application, Component::Environment)
        .set("ApplicationName", application_name.as_str());

    // The application name is a literal, so the edge to the application is
    // declared explicitly.
    let version_resource = Resource::new(
        version.clone(),
        ResourceKind::ApplicationVersion,
        Component::Environment,
    )
    .set("ApplicationName", application_name.as_str())
    .set(
        "Description",
        format!(
            "{prefix} {} bundle {}",
            params.image_tag,
            &up.artifact.digest[..12.min(up.artifact.digest.len())]
        ),
    )
    .set(
        "SourceBundle",
        Properties::new()
            .with("S3Bucket", up.artifact.bucket_value())
            .with("S3Key", up.artifact.key_value()),
    )
    .depends_on(&application);

    let mut env_resource = Resource::new(environment.clone(), ResourceKind::Environment, Component::Environment)
        .set("ApplicationName", application_name.as_str())
        .set("EnvironmentName", environment_name.as_str())
        .set("SolutionStackName", SOLUTION_STACK)
        .set("VersionLabel", Value::reference(&version))
        .set("OptionSettings", options.to_property())
        .depends_on(&application)
        .depends_on(&up.cluster.writer);
    for id in up
        .access
        .edge
        .ready_ids()
        .into_iter()
        .chain(up.access.application.ready_ids())
    {
        env_resource = env_resource.depends_on(id);
    }

    info!(
        environment = %environment_name,
        options = options.len(),
        "Environment composed"
    );

    // Same grant as the publisher's; the plan keeps grants as a set.
    let grant = up.artifact.read_grant(ServicePrincipal::Orchestration);

    Ok(Fragment::new(
        EnvironmentDescriptor {
            application,
            version,
            environment,
            application_name,
            environment_name,
            options,
        },
        vec![app_resource, version_resource, env_resource],
    )
    .with_grant(grant))
}
