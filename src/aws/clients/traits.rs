use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::stack::error::StackError;
use crate::stack::model::{StackEvent, StackInfo, StackRequest, StackResource};

#[async_trait]
pub trait CloudFormationOperations {
    /// Finds a stack by name or id. None when the stack does not exist.
    async fn find_stack(&self, stack_id: &str) -> Result<Option<StackInfo>, StackError>;
    /// Events for a stack, newest-first.
    async fn describe_events(&self, stack_id: &str) -> Result<Vec<StackEvent>, StackError>;
    async fn describe_resource(
        &self,
        stack_id: &str,
        logical_id: &str,
    ) -> Result<StackResource, StackError>;
    /// Returns the template description on success.
    async fn validate_template(&self, template_body: &str) -> Result<Option<String>, StackError>;
    /// Returns the id of the stack being created.
    async fn create_stack(&self, request: &StackRequest) -> Result<String, StackError>;
    /// Returns the id of the stack being updated. A provider "no updates"
    /// response surfaces as `StackError::NoUpdates`.
    async fn update_stack(&self, request: &StackRequest) -> Result<String, StackError>;
    async fn delete_stack(&self, stack_id: &str) -> Result<(), StackError>;
}

#[async_trait]
pub trait AutoScalingOperations {
    async fn find_group(&self, group_id: &str) -> Result<Option<AutoScalingGroupInfo>>;
}

#[async_trait]
pub trait Ec2Operations {
    async fn describe_instances(&self, instance_ids: &[String]) -> Result<Vec<InstanceInfo>>;
}

#[derive(Debug, Clone)]
pub struct AutoScalingGroupInfo {
    pub name: String,
    pub instance_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct InstanceInfo {
    pub id: String,
    pub state: String,
    pub name: Option<String>,
    pub instance_type: String,
    pub public_dns_name: Option<String>,
    pub launch_time: Option<DateTime<Utc>>,
}
