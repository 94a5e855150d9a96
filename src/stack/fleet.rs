use anyhow::{anyhow, Result};
use chrono::Utc;
use tracing::info;

use crate::aws::clients::traits::{
    AutoScalingOperations, CloudFormationOperations, Ec2Operations, InstanceInfo,
};

use super::provisioner::StackProvisioner;

/// Resolves a stack's autoscaling-group resource to the EC2 instances
/// behind it. The stack must be ready; an empty group yields an empty list.
pub async fn autoscaling_group_instances<C, A, E>(
    provisioner: &StackProvisioner<C>,
    autoscaling: &A,
    ec2: &E,
    stack_id: &str,
    resource_name: &str,
) -> Result<Vec<InstanceInfo>>
where
    C: CloudFormationOperations,
    A: AutoScalingOperations,
    E: Ec2Operations,
{
    let stack = provisioner.get_stack(stack_id).await?;
    StackProvisioner::<C>::ensure_ready(&stack)?;

    let resource = provisioner
        .provider()
        .describe_resource(&stack.name, resource_name)
        .await?;

    let group = autoscaling
        .find_group(&resource.physical_resource_id)
        .await?
        .ok_or_else(|| {
            anyhow!(
                "Auto Scaling group {} not found",
                resource.physical_resource_id
            )
        })?;

    if group.instance_ids.is_empty() {
        return Ok(Vec::new());
    }

    ec2.describe_instances(&group.instance_ids).await
}

/// Public DNS names of the given instances, skipping instances without one.
pub fn public_hostnames(instances: &[InstanceInfo]) -> Vec<String> {
    instances
        .iter()
        .filter_map(|instance| instance.public_dns_name.clone())
        .filter(|hostname| !hostname.is_empty())
        .collect()
}

/// Logs one status line per active instance, with an ssh connection string
/// when a key and user are configured.
pub fn log_instances(instances: &[InstanceInfo], ssh_key: Option<&str>, ssh_user: Option<&str>) {
    if instances.is_empty() {
        info!("No EC2 instances found");
        return;
    }

    let now = Utc::now();

    for instance in instances {
        if instance.state == "terminated" {
            continue;
        }

        let uptime = instance
            .launch_time
            .map(|launch_time| format_uptime(now.signed_duration_since(launch_time)))
            .unwrap_or_else(|| "unknown".to_string());

        info!(
            "*** {} | {} | {} | {} | Active for {}",
            instance.state,
            instance.name.as_deref().unwrap_or("-"),
            instance.id,
            instance.instance_type,
            uptime
        );

        if let (Some(key), Some(user), Some(hostname)) =
            (ssh_key, ssh_user, instance.public_dns_name.as_deref())
        {
            if !hostname.is_empty() {
                info!("  ssh -i {} -l {} {}", key, user, hostname);
            }
        }
    }
}

fn format_uptime(elapsed: chrono::Duration) -> String {
    let minutes = elapsed.num_minutes().max(0);
    format!("{}h {}m", minutes / 60, minutes % 60)
}
