use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_autoscaling::Client as AutoScalingClient;

use super::traits::{AutoScalingGroupInfo, AutoScalingOperations};

pub struct AutoScalingModule {
    client: AutoScalingClient,
}

impl AutoScalingModule {
    pub fn new(client: AutoScalingClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AutoScalingOperations for AutoScalingModule {
    async fn find_group(&self, group_id: &str) -> Result<Option<AutoScalingGroupInfo>> {
        let output = self
            .client
            .describe_auto_scaling_groups()
            .auto_scaling_group_names(group_id)
            .send()
            .await
            .with_context(|| format!("Failed to describe Auto Scaling group {}", group_id))?;

        let Some(group) = output.auto_scaling_groups().first() else {
            log::debug!("Auto Scaling group {} not found", group_id);
            return Ok(None);
        };

        let instance_ids = group
            .instances()
            .iter()
            .map(|instance| instance.instance_id().to_string())
            .collect();

        Ok(Some(AutoScalingGroupInfo {
            name: group.auto_scaling_group_name().to_string(),
            instance_ids,
        }))
    }
}
