use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cumulus")]
#[command(about = "CloudFormation stack deployment tasks", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, default_value = "config/aws.yml")]
    pub config: PathBuf,

    #[arg(long)]
    pub region: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Provision the configured stack
    Provision {
        #[arg(long)]
        stack: Option<String>,

        #[arg(long)]
        disable_rollback: bool,
    },

    /// Provision every configured stack in order, chaining outputs
    ProvisionAll,

    /// Delete a stack
    Delete {
        #[arg(long)]
        stack: Option<String>,

        #[arg(long)]
        allow_failed: bool,
    },

    /// Delete every configured stack in reverse order
    DeleteAll,

    /// Print the outputs of a stack
    Outputs { stack: String },

    /// Print output values whose keys match a pattern
    Hostnames { stack: String, pattern: String },

    /// List the EC2 instances behind a stack's autoscaling group
    Instances {
        stack: String,
        resource: String,

        #[arg(long)]
        hosts: bool,
    },
}
