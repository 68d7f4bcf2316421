//! Data cluster builder
//!
//! A serverless-v2 Aurora PostgreSQL cluster with a single writer, placed in
//! the private subnets behind the data boundary. Sizing, retention,
//! encryption, deletion protection and private placement are not parameters.

use crate::access::AccessBoundary;
use crate::credential::Credential;
use crate::error::Result;
use crate::network::NetworkTopology;
use crate::plan::Fragment;
use listmonk_eb_types::{
    Component, DeletionPolicy, LogicalId, Port, Properties, Property, ResolvedParameters, Resource,
    ResourceKind, SubnetType, Value,
};
use tracing::{info, instrument};

pub const ENGINE: &str = "aurora-postgresql";
pub const ENGINE_VERSION: &str = "15.3";
pub const DATABASE_NAME: &str = "listmonk";
const PARAMETER_GROUP: &str = "default.aurora-postgresql15";
const WRITER_CLASS: &str = "db.serverless";

/// Aurora capacity units the cluster scales between
pub const MIN_CAPACITY: f64 = 0.5;
pub const MAX_CAPACITY: f64 = 8.0;
pub const BACKUP_RETENTION_DAYS: u16 = 7;

/// The declared database cluster
#[derive(Debug, Clone)]
pub struct DataCluster {
    pub cluster: LogicalId,
    pub writer: LogicalId,
    pub subnet_group: LogicalId,
    pub secret_attachment: LogicalId,
    pub identifier: String,
    pub database_name: String,
    pub port: Port,
}

impl DataCluster {
    /// Writer endpoint hostname, known once the cluster exists
    pub fn endpoint_hostname(&self) -> Value {
        Value::attribute(&self.cluster, "Endpoint.Address")
    }
}

#[instrument(skip_all, fields(prefix = %params.prefix))]
pub fn build(
    params: &ResolvedParameters,
    network: &NetworkTopology,
    data: &AccessBoundary,
    credential: &Credential,
) -> Result<Fragment<DataCluster>> {
    let root = format!("{}-AuroraPg", params.prefix);
    let identifier = format!("{}-aurora-pg", params.prefix);
    let port = Port::POSTGRES;

    let subnet_group = LogicalId::from_path(&[&root, "Subnets", "Default"]);
    let cluster = LogicalId::from_path(&[&root, "Resource"]);
    let writer = LogicalId::from_path(&[&root, "Instance1"]);
    let secret_attachment = LogicalId::from_path(&[&root, "Secret", "Attachment"]);

    let private_subnets = network.subnet_refs(SubnetType::PrivateWithEgress);

    let group = Resource::new(subnet_group.clone(), ResourceKind::DbSubnetGroup, Component::DataCluster)
        .set("DBSubnetGroupDescription", format!("Subnets for {root} database"))
        .set("SubnetIds", Property::list(private_subnets));

    let mut cluster_resource = Resource::new(cluster.clone(), ResourceKind::DbCluster, Component::DataCluster)
        .set("DBClusterIdentifier", identifier.as_str())
        .set("Engine", ENGINE)
        .set("EngineVersion", ENGINE_VERSION)
        .set("DBClusterParameterGroupName", PARAMETER_GROUP)
        .set("DatabaseName", DATABASE_NAME)
        .set("DBSubnetGroupName", Value::reference(&subnet_group))
        .set("VpcSecurityGroupIds", Property::list([data.group_id()]))
        .set("MasterUsername", credential.username_value())
        .set("MasterUserPassword", credential.password_value())
        .set(
            "ServerlessV2ScalingConfiguration",
            Properties::new()
                .with("MinCapacity", MIN_CAPACITY)
                .with("MaxCapacity", MAX_CAPACITY),
        )
        .set("Port", port.number())
        .set("StorageEncrypted", true)
        .set("DeletionProtection", true)
        .set("BackupRetentionPeriod", BACKUP_RETENTION_DAYS)
        .set("CopyTagsToSnapshot", true)
        .retain_with(DeletionPolicy::Snapshot);
    // Rules must be in place before the cluster relies on the boundary.
    for id in data.ready_ids() {
        cluster_resource = cluster_resource.depends_on(id);
    }

    let writer_resource = Resource::new(writer.clone(), ResourceKind::DbInstance, Component::DataCluster)
        .set("DBClusterIdentifier", Value::reference(&cluster))
        .set("DBInstanceClass", WRITER_CLASS)
        .set("Engine", ENGINE)
        .set("PromotionTier", 0i64)
        .set("PubliclyAccessible", false);

    let attachment = Resource::new(
        secret_attachment.clone(),
        ResourceKind::SecretTargetAttachment,
        Component::DataCluster,
    )
    .set("SecretId", credential.secret_arn())
    .set("TargetId", Value::reference(&cluster))
    .set("TargetType", ResourceKind::DbCluster.type_name());

    info!(
        cluster = %identifier,
        engine = ENGINE,
        version = ENGINE_VERSION,
        min_capacity = MIN_CAPACITY,
        max_capacity = MAX_CAPACITY,
        "Data cluster declared"
    );

    Ok(Fragment::new(
        DataCluster {
            cluster,
            writer,
            subnet_group,
            secret_attachment,
            identifier,
            database_name: DATABASE_NAME.to_string(),
            port,
        },
        vec![group, cluster_resource, writer_resource, attachment],
    ))
}
