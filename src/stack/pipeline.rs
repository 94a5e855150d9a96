use std::collections::BTreeMap;
use std::fs;

use anyhow::{anyhow, Context, Result};
use tracing::{error, info};

use crate::aws::clients::traits::CloudFormationOperations;
use crate::config::DeployConfig;

use super::model::{ProvisionResult, StackRequest};
use super::provisioner::StackProvisioner;

/// Provisions the configured stacks strictly in order. Each stack's
/// declared outputs become candidate parameters for the stacks that
/// follow, so ordering is a hard dependency.
pub async fn provision_all<C: CloudFormationOperations>(
    provisioner: &StackProvisioner<C>,
    config: &DeployConfig,
) -> Result<ProvisionResult> {
    if config.stacks.is_empty() {
        return Err(anyhow!("No stacks configured"));
    }

    let mut chained: BTreeMap<String, String> = BTreeMap::new();
    let mut last = None;

    for entry in &config.stacks {
        info!("--> Create stack {}", entry.name);

        let template_file = config.stack_template_file(entry);
        let template_body = fs::read_to_string(&template_file)
            .with_context(|| format!("Failed to read template {}", template_file.display()))?;

        // chained outputs first, stack-specific parameters win on collision
        let mut parameters = chained.clone();
        parameters.extend(entry.parameters.clone());

        let request = StackRequest {
            name: entry.name.clone(),
            template_body,
            tags: config.default_tags(),
            parameters,
            disable_rollback: config.disable_rollback,
        };

        let result = provisioner.create_or_update(&request).await?;
        if !result.succeeded {
            error!("Stack {} provisioning failed", entry.name);
            return Ok(result);
        }

        if !entry.outputs.is_empty() {
            let stack = result
                .stack
                .as_ref()
                .ok_or_else(|| anyhow!("No stack snapshot for {}", entry.name))?;

            for key in &entry.outputs {
                let value = stack.output_value(key).ok_or_else(|| {
                    anyhow!("Output {} not found in stack {}", key, entry.name)
                })?;
                chained.insert(key.clone(), value.to_string());
            }
        }

        last = Some(result);
    }

    last.ok_or_else(|| anyhow!("No stacks configured"))
}

/// Deletes the configured stacks in reverse order, stopping at the first
/// failure.
pub async fn delete_all<C: CloudFormationOperations>(
    provisioner: &StackProvisioner<C>,
    config: &DeployConfig,
) -> Result<bool> {
    if config.stacks.is_empty() {
        return Err(anyhow!("No stacks configured"));
    }

    for entry in config.stacks.iter().rev() {
        info!("--> Delete stack {}", entry.name);

        let deleted = provisioner
            .delete(&entry.name, config.delete_failed_stacks)
            .await?;

        if !deleted {
            error!("Failed to delete stack {}", entry.name);
            return Ok(false);
        }
    }

    Ok(true)
}
