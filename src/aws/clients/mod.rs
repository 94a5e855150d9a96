pub mod autoscaling;
pub mod cloudformation;
pub mod ec2;
pub mod traits;
