use aws_config::Region;

use crate::config::AwsSettings;

use super::clients::autoscaling::AutoScalingModule;
use super::clients::cloudformation::CloudFormationModule;
use super::clients::ec2::Ec2Module;

/// Resolves shared SDK configuration from the explicit settings struct.
/// Static credentials from the config file take precedence; otherwise the
/// SDK default provider chain applies.
pub async fn sdk_config(
    settings: &AwsSettings,
    region_override: Option<&str>,
) -> aws_config::SdkConfig {
    let region = region_override.unwrap_or(&settings.region).to_string();

    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(region));

    if let (Some(access_key_id), Some(secret_access_key)) =
        (&settings.access_key_id, &settings.secret_access_key)
    {
        loader = loader.credentials_provider(aws_sdk_cloudformation::config::Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "deploy-config",
        ));
    }

    loader.load().await
}

pub async fn cloudformation_client(
    settings: &AwsSettings,
    region_override: Option<&str>,
) -> CloudFormationModule {
    let config = sdk_config(settings, region_override).await;
    CloudFormationModule::new(aws_sdk_cloudformation::Client::new(&config))
}

pub async fn ec2_client(settings: &AwsSettings, region_override: Option<&str>) -> Ec2Module {
    let config = sdk_config(settings, region_override).await;
    Ec2Module::new(aws_sdk_ec2::Client::new(&config))
}

pub async fn autoscaling_client(
    settings: &AwsSettings,
    region_override: Option<&str>,
) -> AutoScalingModule {
    let config = sdk_config(settings, region_override).await;
    AutoScalingModule::new(aws_sdk_autoscaling::Client::new(&config))
}
