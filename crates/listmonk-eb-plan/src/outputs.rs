//! Operator-facing outputs

use crate::access::AccessPolicy;
use crate::credential::Credential;
use crate::database::DataCluster;
use crate::error::Result;
use crate::network::NetworkTopology;
use crate::plan::{Output, Plan};
use tracing::info;

pub const VPC_ID: &str = "VpcId";
pub const APP_SG_ID: &str = "AppSgId";
pub const DB_ENDPOINT: &str = "DbEndpoint";
pub const DB_SECRET_ARN: &str = "DbSecretArn";

/// Add the four outputs an operator needs after apply.
pub fn emit(
    plan: &mut Plan,
    network: &NetworkTopology,
    access: &AccessPolicy,
    cluster: &DataCluster,
    credential: &Credential,
) -> Result<()> {
    let outputs = [
        Output {
            name: VPC_ID.into(),
            value: network.vpc_id(),
            description: "Network identifier".into(),
        },
        Output {
            name: APP_SG_ID.into(),
            value: access.application.group_id(),
            description: "Application security group".into(),
        },
        Output {
            name: DB_ENDPOINT.into(),
            value: cluster.endpoint_hostname(),
            description: "Database writer endpoint hostname".into(),
        },
        Output {
            name: DB_SECRET_ARN.into(),
            value: credential.secret_arn(),
            description: "ARN of the database credential secret".into(),
        },
    ];
    for output in outputs {
        plan.add_output(output)?;
    }
    info!(outputs = plan.outputs().len(), "Outputs emitted");
    Ok(())
}
