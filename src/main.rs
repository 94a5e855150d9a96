use std::fs;

use anyhow::{bail, Context, Result};
use clap::Parser;
use regex::Regex;
use tracing::info;

use cumulus::aws::clients::cloudformation::CloudFormationModule;
use cumulus::aws::utils;
use cumulus::cli::{Cli, Commands};
use cumulus::config::DeployConfig;
use cumulus::stack::fleet;
use cumulus::stack::model::StackRequest;
use cumulus::stack::pipeline;
use cumulus::stack::StackProvisioner;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    if let Err(e) = cumulus::telemetry::init_telemetry() {
        eprintln!("Failed to initialize telemetry: {}", e);
    }

    let cli = Cli::parse();

    let config = DeployConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;

    let region = cli.region.as_deref();
    let provisioner = build_provisioner(&config, region).await;

    match &cli.command {
        Commands::Provision {
            stack,
            disable_rollback,
        } => {
            provision_command(&provisioner, &config, stack.as_deref(), *disable_rollback).await?;
        }
        Commands::ProvisionAll => {
            let result = pipeline::provision_all(&provisioner, &config).await?;
            if !result.succeeded {
                bail!(
                    "Stack provisioning failed: {}",
                    result.error.unwrap_or_default()
                );
            }
        }
        Commands::Delete {
            stack,
            allow_failed,
        } => {
            let stack_name = resolve_stack_name(&config, stack.as_deref())?;
            let allow_failed = *allow_failed || config.delete_failed_stacks;
            if !provisioner.delete(&stack_name, allow_failed).await? {
                bail!("Failed to delete stack {}", stack_name);
            }
        }
        Commands::DeleteAll => {
            if !pipeline::delete_all(&provisioner, &config).await? {
                bail!("Failed to delete stacks");
            }
        }
        Commands::Outputs { stack } => {
            let outputs = provisioner.outputs(stack).await?;
            println!("{}", serde_json::to_string_pretty(&outputs)?);
        }
        Commands::Hostnames { stack, pattern } => {
            let pattern = Regex::new(pattern)
                .with_context(|| format!("Invalid output key pattern: {}", pattern))?;
            for hostname in provisioner.static_hostnames(stack, &pattern).await? {
                println!("{}", hostname);
            }
        }
        Commands::Instances {
            stack,
            resource,
            hosts,
        } => {
            instances_command(&provisioner, &config, region, stack, resource, *hosts).await?;
        }
    }

    Ok(())
}

async fn build_provisioner(
    config: &DeployConfig,
    region: Option<&str>,
) -> StackProvisioner<CloudFormationModule> {
    let cfn = utils::cloudformation_client(&config.aws, region).await;
    StackProvisioner::with_polling(cfn, config.poll_interval(), config.poll_timeout())
}

fn resolve_stack_name(config: &DeployConfig, stack: Option<&str>) -> Result<String> {
    stack
        .map(str::to_string)
        .or_else(|| config.stack_name.clone())
        .context("Stack name not defined")
}

async fn provision_command(
    provisioner: &StackProvisioner<CloudFormationModule>,
    config: &DeployConfig,
    stack: Option<&str>,
    disable_rollback: bool,
) -> Result<()> {
    let stack_name = resolve_stack_name(config, stack)?;

    let template_file = config.template_file();
    let template_body = fs::read_to_string(&template_file)
        .with_context(|| format!("Failed to read template {}", template_file.display()))?;

    let request = StackRequest {
        name: stack_name,
        template_body,
        tags: config.default_tags(),
        parameters: Default::default(),
        disable_rollback: disable_rollback || config.disable_rollback,
    };

    let result = provisioner.create_or_update(&request).await?;
    if !result.succeeded {
        bail!(
            "Stack provisioning failed: {}",
            result.error.unwrap_or_default()
        );
    }

    Ok(())
}

async fn instances_command(
    provisioner: &StackProvisioner<CloudFormationModule>,
    config: &DeployConfig,
    region: Option<&str>,
    stack: &str,
    resource: &str,
    hosts: bool,
) -> Result<()> {
    let autoscaling = utils::autoscaling_client(&config.aws, region).await;
    let ec2 = utils::ec2_client(&config.aws, region).await;

    let instances =
        fleet::autoscaling_group_instances(provisioner, &autoscaling, &ec2, stack, resource)
            .await?;

    if hosts {
        for hostname in fleet::public_hostnames(&instances) {
            println!("{}", hostname);
        }
        return Ok(());
    }

    info!("Stack {} resource {}", stack, resource);
    fleet::log_instances(
        &instances,
        config.ssh_key.as_deref(),
        config.ssh_user.as_deref(),
    );

    Ok(())
}
