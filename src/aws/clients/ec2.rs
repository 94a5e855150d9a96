use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_ec2::Client as Ec2Client;
use chrono::{DateTime, Utc};

use super::traits::{Ec2Operations, InstanceInfo};

pub struct Ec2Module {
    client: Ec2Client,
}

impl Ec2Module {
    pub fn new(client: Ec2Client) -> Self {
        Self { client }
    }
}

fn name_tag(instance: &aws_sdk_ec2::types::Instance) -> Option<String> {
    instance
        .tags()
        .iter()
        .find(|tag| tag.key() == Some("Name"))
        .and_then(|tag| tag.value())
        .map(str::to_string)
}

fn convert_instance(instance: &aws_sdk_ec2::types::Instance) -> InstanceInfo {
    InstanceInfo {
        id: instance.instance_id().unwrap_or_default().to_string(),
        state: instance
            .state()
            .and_then(|state| state.name())
            .map(|name| name.as_str().to_string())
            .unwrap_or_default(),
        name: name_tag(instance),
        instance_type: instance
            .instance_type()
            .map(|instance_type| instance_type.as_str().to_string())
            .unwrap_or_default(),
        public_dns_name: instance.public_dns_name().map(str::to_string),
        launch_time: instance
            .launch_time()
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts.secs(), ts.subsec_nanos())),
    }
}

#[async_trait]
impl Ec2Operations for Ec2Module {
    async fn describe_instances(&self, instance_ids: &[String]) -> Result<Vec<InstanceInfo>> {
        let output = self
            .client
            .describe_instances()
            .set_instance_ids(Some(instance_ids.to_vec()))
            .send()
            .await
            .context("Failed to describe EC2 instances")?;

        let instances = output
            .reservations()
            .iter()
            .flat_map(|reservation| reservation.instances())
            .map(convert_instance)
            .collect();

        Ok(instances)
    }
}
