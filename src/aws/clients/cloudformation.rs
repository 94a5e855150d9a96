use std::collections::BTreeMap;

use anyhow::anyhow;
use async_trait::async_trait;
use aws_sdk_cloudformation::error::ProvideErrorMetadata;
use aws_sdk_cloudformation::types::{Parameter, Tag};
use aws_sdk_cloudformation::Client as CloudFormationClient;
use chrono::{DateTime, Utc};

use crate::stack::error::StackError;
use crate::stack::model::{StackEvent, StackInfo, StackRequest, StackResource};
use crate::stack::status::StackStatus;

use super::traits::CloudFormationOperations;

pub struct CloudFormationModule {
    client: CloudFormationClient,
}

impl CloudFormationModule {
    pub fn new(client: CloudFormationClient) -> Self {
        Self { client }
    }
}

fn convert_timestamp(timestamp: &aws_sdk_cloudformation::primitives::DateTime) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos()).unwrap_or_default()
}

fn convert_stack(stack: &aws_sdk_cloudformation::types::Stack) -> Result<StackInfo, StackError> {
    let status: StackStatus = stack.stack_status().as_str().parse()?;

    let mut outputs = BTreeMap::new();
    for output in stack.outputs() {
        if let (Some(key), Some(value)) = (output.output_key(), output.output_value()) {
            outputs.insert(key.to_string(), value.to_string());
        }
    }

    Ok(StackInfo {
        id: stack
            .stack_id()
            .unwrap_or_else(|| stack.stack_name())
            .to_string(),
        name: stack.stack_name().to_string(),
        status,
        status_reason: stack.stack_status_reason().map(str::to_string),
        outputs,
    })
}

fn convert_event(event: &aws_sdk_cloudformation::types::StackEvent) -> StackEvent {
    StackEvent {
        event_id: event.event_id().to_string(),
        timestamp: convert_timestamp(event.timestamp()),
        resource_type: event.resource_type().unwrap_or_default().to_string(),
        logical_resource_id: event.logical_resource_id().unwrap_or_default().to_string(),
        resource_status: event
            .resource_status()
            .map(|status| status.as_str().to_string())
            .unwrap_or_default(),
        resource_status_reason: event.resource_status_reason().map(str::to_string),
    }
}

fn build_parameters(request: &StackRequest) -> Vec<Parameter> {
    request
        .parameters
        .iter()
        .map(|(key, value)| {
            Parameter::builder()
                .parameter_key(key)
                .parameter_value(value)
                .build()
        })
        .collect()
}

fn build_tags(request: &StackRequest) -> Result<Vec<Tag>, StackError> {
    request
        .tags
        .iter()
        .map(|(key, value)| {
            Tag::builder()
                .key(key)
                .value(value)
                .build()
                .map_err(|e| StackError::Provider(anyhow!("Failed to build stack tag: {e}")))
        })
        .collect()
}

#[async_trait]
impl CloudFormationOperations for CloudFormationModule {
    async fn find_stack(&self, stack_id: &str) -> Result<Option<StackInfo>, StackError> {
        let result = self
            .client
            .describe_stacks()
            .stack_name(stack_id)
            .send()
            .await;

        match result {
            Ok(output) => match output.stacks().first() {
                Some(stack) => Ok(Some(convert_stack(stack)?)),
                None => Ok(None),
            },
            Err(err) => {
                let err = err.into_service_error();
                // a describe miss surfaces as a ValidationError
                if err.message().unwrap_or_default().contains("does not exist") {
                    log::debug!("Stack {} does not exist", stack_id);
                    return Ok(None);
                }
                Err(StackError::Provider(anyhow!(
                    "Failed to describe stack {}: {}",
                    stack_id,
                    err
                )))
            }
        }
    }

    async fn describe_events(&self, stack_id: &str) -> Result<Vec<StackEvent>, StackError> {
        let output = self
            .client
            .describe_stack_events()
            .stack_name(stack_id)
            .send()
            .await
            .map_err(|e| {
                StackError::Provider(anyhow!(
                    "Failed to describe events for stack {}: {}",
                    stack_id,
                    e.into_service_error()
                ))
            })?;

        Ok(output.stack_events().iter().map(convert_event).collect())
    }

    async fn describe_resource(
        &self,
        stack_id: &str,
        logical_id: &str,
    ) -> Result<StackResource, StackError> {
        let output = self
            .client
            .describe_stack_resource()
            .stack_name(stack_id)
            .logical_resource_id(logical_id)
            .send()
            .await
            .map_err(|e| {
                StackError::Provider(anyhow!(
                    "Failed to describe resource {} of stack {}: {}",
                    logical_id,
                    stack_id,
                    e.into_service_error()
                ))
            })?;

        let detail = output.stack_resource_detail().ok_or_else(|| {
            StackError::Provider(anyhow!("No resource detail in response for {}", logical_id))
        })?;

        Ok(StackResource {
            logical_resource_id: detail.logical_resource_id().to_string(),
            physical_resource_id: detail.physical_resource_id().unwrap_or_default().to_string(),
            resource_type: detail.resource_type().to_string(),
        })
    }

    async fn validate_template(&self, template_body: &str) -> Result<Option<String>, StackError> {
        let result = self
            .client
            .validate_template()
            .template_body(template_body)
            .send()
            .await;

        match result {
            Ok(output) => Ok(output.description().map(str::to_string)),
            Err(err) => {
                let err = err.into_service_error();
                if err.code() == Some("ValidationError") {
                    Err(StackError::TemplateValidation(
                        err.message().unwrap_or_default().to_string(),
                    ))
                } else {
                    Err(StackError::Provider(anyhow!(
                        "Failed to validate template: {}",
                        err
                    )))
                }
            }
        }
    }

    async fn create_stack(&self, request: &StackRequest) -> Result<String, StackError> {
        let output = self
            .client
            .create_stack()
            .stack_name(&request.name)
            .template_body(&request.template_body)
            .disable_rollback(request.disable_rollback)
            .set_parameters(Some(build_parameters(request)))
            .set_tags(Some(build_tags(request)?))
            .send()
            .await
            .map_err(|e| {
                StackError::Provider(anyhow!(
                    "Failed to create stack {}: {}",
                    request.name,
                    e.into_service_error()
                ))
            })?;

        Ok(output
            .stack_id()
            .unwrap_or(request.name.as_str())
            .to_string())
    }

    async fn update_stack(&self, request: &StackRequest) -> Result<String, StackError> {
        let result = self
            .client
            .update_stack()
            .stack_name(&request.name)
            .template_body(&request.template_body)
            .disable_rollback(request.disable_rollback)
            .set_parameters(Some(build_parameters(request)))
            .set_tags(Some(build_tags(request)?))
            .send()
            .await;

        match result {
            Ok(output) => Ok(output
                .stack_id()
                .unwrap_or(request.name.as_str())
                .to_string()),
            Err(err) => {
                let err = err.into_service_error();
                if err
                    .message()
                    .unwrap_or_default()
                    .contains("No updates are to be performed")
                {
                    Err(StackError::NoUpdates(request.name.clone()))
                } else {
                    Err(StackError::Provider(anyhow!(
                        "Failed to update stack {}: {}",
                        request.name,
                        err
                    )))
                }
            }
        }
    }

    async fn delete_stack(&self, stack_id: &str) -> Result<(), StackError> {
        self.client
            .delete_stack()
            .stack_name(stack_id)
            .send()
            .await
            .map_err(|e| {
                StackError::Provider(anyhow!(
                    "Failed to delete stack {}: {}",
                    stack_id,
                    e.into_service_error()
                ))
            })?;

        Ok(())
    }
}
