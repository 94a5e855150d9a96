use std::time::Duration;

use regex::Regex;
use tokio::time::{sleep, Instant};
use tracing::{error, info, instrument, warn};

use crate::aws::clients::traits::CloudFormationOperations;

use super::error::StackError;
use super::events::{log_events, EventStream};
use super::model::{ProvisionResult, StackInfo, StackRequest};
use super::status::{StackStatus, StatusClass};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Drives CloudFormation stack operations to completion by polling status
/// and streaming event logs until a terminal status is reached.
pub struct StackProvisioner<C> {
    cfn: C,
    poll_interval: Duration,
    poll_timeout: Option<Duration>,
}

impl<C: CloudFormationOperations> StackProvisioner<C> {
    pub fn new(cfn: C) -> Self {
        Self {
            cfn,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: None,
        }
    }

    pub fn with_polling(cfn: C, interval: Duration, timeout: Option<Duration>) -> Self {
        Self {
            cfn,
            poll_interval: interval,
            poll_timeout: timeout,
        }
    }

    pub fn provider(&self) -> &C {
        &self.cfn
    }

    /// Gate for update, delete and output reads: the stack must be in a
    /// ready status.
    pub fn ensure_ready(stack: &StackInfo) -> Result<(), StackError> {
        if stack.status.is_ready() {
            return Ok(());
        }

        Err(StackError::NotReady {
            name: stack.name.clone(),
            status: stack.status,
        })
    }

    pub async fn get_stack(&self, stack_id: &str) -> Result<StackInfo, StackError> {
        self.cfn
            .find_stack(stack_id)
            .await?
            .ok_or_else(|| StackError::NotFound(stack_id.to_string()))
    }

    /// Creates the stack if absent, updates it if present and ready.
    /// Template rejection, a not-ready stack and a failed terminal status
    /// come back as a failed `ProvisionResult`; provider errors propagate.
    #[instrument(skip(self, request), fields(stack = %request.name))]
    pub async fn create_or_update(
        &self,
        request: &StackRequest,
    ) -> Result<ProvisionResult, StackError> {
        let description = match self.cfn.validate_template(&request.template_body).await {
            Ok(description) => description,
            Err(StackError::TemplateValidation(message)) => {
                error!("Template validation failed: {}", message);
                return Ok(ProvisionResult::failure(message));
            }
            Err(err) => return Err(err),
        };

        info!("Stack Name:        {}", request.name);
        if let Some(description) = description {
            info!("Stack Description: {}", description);
        }

        let stack_id = match self.cfn.find_stack(&request.name).await? {
            Some(stack) => {
                if let Err(err) = Self::ensure_ready(&stack) {
                    error!("{}", err);
                    return Ok(ProvisionResult::failure(err.to_string()));
                }

                info!("Stack Status: {}", stack.status);
                info!("Updating existing stack {}", request.name);

                match self.cfn.update_stack(request).await {
                    Ok(stack_id) => stack_id,
                    Err(StackError::NoUpdates(_)) => {
                        warn!("Update skipped: no updates are to be performed");
                        return Ok(ProvisionResult::success(stack));
                    }
                    Err(err) => return Err(err),
                }
            }
            None => {
                info!("Creating new stack {}", request.name);
                self.cfn.create_stack(request).await?
            }
        };

        let stack = self.wait_for_completion(&stack_id).await?;

        if stack.status.is_provision_success() {
            info!("Stack provisioning complete - stack status: {}", stack.status);
            Ok(ProvisionResult::success(stack))
        } else {
            error!("Stack provisioning failed - stack status: {}", stack.status);
            Ok(ProvisionResult::failure(stack.status.as_str()))
        }
    }

    /// Deletes a stack and waits for the terminal status. Returns true iff
    /// the delete reached DELETE_COMPLETE. A missing stack and a stack that
    /// fails the ready gate are reported and return false.
    #[instrument(skip(self))]
    pub async fn delete(&self, stack_id: &str, allow_failed: bool) -> Result<bool, StackError> {
        info!("Stack Name:        {}", stack_id);

        let stack = match self.cfn.find_stack(stack_id).await? {
            Some(stack) => stack,
            None => {
                error!("Stack not found");
                return Ok(false);
            }
        };

        let force = allow_failed
            && matches!(
                stack.status,
                StackStatus::CreateFailed | StackStatus::DeleteFailed
            );

        if force {
            warn!("Deleting failed stack {}", stack.name);
        } else if let Err(err) = Self::ensure_ready(&stack) {
            error!("{}", err);
            return Ok(false);
        } else {
            info!("Deleting existing stack {}", stack.name);
        }

        self.cfn.delete_stack(&stack.name).await?;

        // poll by id: deleted stacks remain describable by id only
        let stack = self.wait_for_completion(&stack.id).await?;

        if stack.status == StackStatus::DeleteComplete {
            info!("Stack deleting complete - stack status: {}", stack.status);
            Ok(true)
        } else {
            error!("Stack deleting failed - stack status: {}", stack.status);
            Ok(false)
        }
    }

    /// All output values of a ready stack.
    pub async fn outputs(
        &self,
        stack_id: &str,
    ) -> Result<std::collections::BTreeMap<String, String>, StackError> {
        let stack = self.get_stack(stack_id).await?;
        Self::ensure_ready(&stack)?;
        Ok(stack.outputs)
    }

    pub async fn output_value(
        &self,
        stack_id: &str,
        key: &str,
    ) -> Result<Option<String>, StackError> {
        let stack = self.get_stack(stack_id).await?;
        Self::ensure_ready(&stack)?;
        Ok(stack.output_value(key).map(str::to_string))
    }

    /// Output values whose keys match the given pattern, in key order.
    pub async fn static_hostnames(
        &self,
        stack_id: &str,
        pattern: &Regex,
    ) -> Result<Vec<String>, StackError> {
        let stack = self.get_stack(stack_id).await?;
        Self::ensure_ready(&stack)?;

        Ok(stack
            .outputs
            .iter()
            .filter(|(key, _)| pattern.is_match(key))
            .map(|(_, value)| value.clone())
            .collect())
    }

    /// Shared poll loop: re-fetch the stack and drain new events on a fixed
    /// interval while the status is in progress. Unbounded unless a poll
    /// timeout was configured.
    async fn wait_for_completion(&self, stack_id: &str) -> Result<StackInfo, StackError> {
        let started = Instant::now();
        let mut events = EventStream::new();

        let mut stack = self.get_stack(stack_id).await?;
        log_events(&events.new_events(&self.cfn.describe_events(stack_id).await?));

        while stack.status.class() == StatusClass::InProgress {
            if let Some(timeout) = self.poll_timeout {
                if started.elapsed() > timeout {
                    return Err(StackError::PollTimeout {
                        name: stack.name,
                        waited: started.elapsed(),
                    });
                }
            }

            sleep(self.poll_interval).await;

            stack = self.get_stack(stack_id).await?;
            log_events(&events.new_events(&self.cfn.describe_events(stack_id).await?));
        }

        Ok(stack)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use super::super::testing::FakeCloudFormation;
    use super::*;

    fn request(name: &str) -> StackRequest {
        StackRequest {
            name: name.to_string(),
            template_body: "{}".to_string(),
            tags: BTreeMap::new(),
            parameters: BTreeMap::new(),
            disable_rollback: false,
        }
    }

    fn stack(name: &str, status: StackStatus) -> StackInfo {
        StackInfo {
            id: format!("arn:aws:cloudformation:eu-west-1:123456789012:stack/{name}/guid"),
            name: name.to_string(),
            status,
            status_reason: None,
            outputs: BTreeMap::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn creates_absent_stack_and_polls_to_complete() {
        let cfn = FakeCloudFormation::new();
        cfn.push_lookup(None);
        cfn.push_lookup(Some(stack("web", StackStatus::CreateInProgress)));
        cfn.push_lookup(Some(stack("web", StackStatus::CreateInProgress)));
        cfn.push_lookup(Some(stack("web", StackStatus::CreateComplete)));

        let provisioner = StackProvisioner::new(cfn);
        let result = provisioner.create_or_update(&request("web")).await.unwrap();

        assert!(result.succeeded);
        assert_eq!(result.stack.unwrap().status, StackStatus::CreateComplete);

        let cfn = provisioner.cfn;
        assert_eq!(cfn.create_calls(), 1);
        assert_eq!(cfn.update_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn updates_ready_stack() {
        let cfn = FakeCloudFormation::new();
        cfn.push_lookup(Some(stack("web", StackStatus::CreateComplete)));
        cfn.push_lookup(Some(stack("web", StackStatus::UpdateInProgress)));
        cfn.push_lookup(Some(stack("web", StackStatus::UpdateComplete)));

        let provisioner = StackProvisioner::new(cfn);
        let result = provisioner.create_or_update(&request("web")).await.unwrap();

        assert!(result.succeeded);
        assert_eq!(result.stack.unwrap().status, StackStatus::UpdateComplete);

        let cfn = provisioner.cfn;
        assert_eq!(cfn.create_calls(), 0);
        assert_eq!(cfn.update_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn no_updates_is_a_successful_noop() {
        let mut existing = stack("web", StackStatus::UpdateComplete);
        existing
            .outputs
            .insert("Endpoint".to_string(), "web.example.com".to_string());

        let cfn = FakeCloudFormation::new();
        cfn.push_lookup(Some(existing));
        cfn.fail_update_with_no_updates();

        let provisioner = StackProvisioner::new(cfn);
        let result = provisioner.create_or_update(&request("web")).await.unwrap();

        assert!(result.succeeded);
        let stack = result.stack.unwrap();
        assert_eq!(stack.status, StackStatus::UpdateComplete);
        assert_eq!(stack.output_value("Endpoint"), Some("web.example.com"));
    }

    #[tokio::test(start_paused = true)]
    async fn in_progress_stack_fails_before_any_mutation() {
        let cfn = FakeCloudFormation::new();
        cfn.push_lookup(Some(stack("web", StackStatus::UpdateInProgress)));

        let provisioner = StackProvisioner::new(cfn);
        let result = provisioner.create_or_update(&request("web")).await.unwrap();

        assert!(!result.succeeded);
        assert!(result.error.unwrap().contains("UPDATE_IN_PROGRESS"));

        let cfn = provisioner.cfn;
        assert_eq!(cfn.create_calls(), 0);
        assert_eq!(cfn.update_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_template_fails_before_any_api_mutation() {
        let cfn = FakeCloudFormation::new();
        cfn.reject_template("Template format error: JSON not well-formed");

        let provisioner = StackProvisioner::new(cfn);
        let result = provisioner.create_or_update(&request("web")).await.unwrap();

        assert!(!result.succeeded);
        assert!(result.error.unwrap().contains("JSON not well-formed"));

        let cfn = provisioner.cfn;
        assert_eq!(cfn.create_calls(), 0);
        assert_eq!(cfn.update_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rollback_terminal_status_is_a_failure() {
        let cfn = FakeCloudFormation::new();
        cfn.push_lookup(None);
        cfn.push_lookup(Some(stack("web", StackStatus::CreateInProgress)));
        cfn.push_lookup(Some(stack("web", StackStatus::RollbackInProgress)));
        cfn.push_lookup(Some(stack("web", StackStatus::RollbackComplete)));

        let provisioner = StackProvisioner::new(cfn);
        let result = provisioner.create_or_update(&request("web")).await.unwrap();

        assert!(!result.succeeded);
        assert_eq!(result.error.as_deref(), Some("ROLLBACK_COMPLETE"));
    }

    #[tokio::test(start_paused = true)]
    async fn delete_requires_ready_stack() {
        let cfn = FakeCloudFormation::new();
        cfn.push_lookup(Some(stack("web", StackStatus::UpdateInProgress)));

        let provisioner = StackProvisioner::new(cfn);
        let deleted = provisioner.delete("web", false).await.unwrap();

        assert!(!deleted);
        assert_eq!(provisioner.cfn.delete_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn allow_failed_bypasses_the_ready_gate() {
        let cfn = FakeCloudFormation::new();
        cfn.push_lookup(Some(stack("web", StackStatus::CreateFailed)));
        cfn.push_lookup(Some(stack("web", StackStatus::DeleteInProgress)));
        cfn.push_lookup(Some(stack("web", StackStatus::DeleteComplete)));

        let provisioner = StackProvisioner::new(cfn);
        let deleted = provisioner.delete("web", true).await.unwrap();

        assert!(deleted);
        assert_eq!(provisioner.cfn.delete_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_of_missing_stack_reports_false() {
        let cfn = FakeCloudFormation::new();
        cfn.push_lookup(None);

        let provisioner = StackProvisioner::new(cfn);
        let deleted = provisioner.delete("gone", false).await.unwrap();

        assert!(!deleted);
        assert_eq!(provisioner.cfn.delete_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_timeout_aborts_when_configured() {
        let cfn = FakeCloudFormation::new();
        cfn.push_lookup(None);
        // never leaves CREATE_IN_PROGRESS
        cfn.push_lookup(Some(stack("web", StackStatus::CreateInProgress)));

        let provisioner =
            StackProvisioner::with_polling(cfn, Duration::from_secs(5), Some(Duration::from_secs(60)));
        let err = provisioner
            .create_or_update(&request("web"))
            .await
            .unwrap_err();

        assert!(matches!(err, StackError::PollTimeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn events_are_fetched_on_every_poll() {
        use crate::stack::model::StackEvent;
        use chrono::{TimeZone, Utc};

        fn event(id: &str) -> StackEvent {
            StackEvent {
                event_id: id.to_string(),
                timestamp: Utc.with_ymd_and_hms(2016, 4, 11, 9, 30, 0).unwrap(),
                resource_type: "AWS::CloudFormation::Stack".to_string(),
                logical_resource_id: "web".to_string(),
                resource_status: "CREATE_IN_PROGRESS".to_string(),
                resource_status_reason: None,
            }
        }

        let cfn = FakeCloudFormation::new();
        cfn.push_lookup(None);
        cfn.push_lookup(Some(stack("web", StackStatus::CreateInProgress)));
        cfn.push_lookup(Some(stack("web", StackStatus::CreateComplete)));
        cfn.push_events(vec![event("1")]);
        cfn.push_events(vec![event("2"), event("1")]);

        let provisioner = StackProvisioner::new(cfn);
        let result = provisioner.create_or_update(&request("web")).await.unwrap();

        assert!(result.succeeded);
        // one fetch after the initial lookup, one per poll iteration
        assert_eq!(provisioner.cfn.event_fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn output_value_reads_a_single_key() {
        let mut ready = stack("web", StackStatus::CreateComplete);
        ready
            .outputs
            .insert("Endpoint".to_string(), "web.example.com".to_string());

        let cfn = FakeCloudFormation::new();
        cfn.push_lookup(Some(ready));

        let provisioner = StackProvisioner::new(cfn);
        // one scripted lookup, reused by both reads
        assert_eq!(
            provisioner.output_value("web", "Endpoint").await.unwrap(),
            Some("web.example.com".to_string())
        );
        assert_eq!(provisioner.output_value("web", "Missing").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn outputs_are_gated_on_readiness() {
        let cfn = FakeCloudFormation::new();
        cfn.push_lookup(Some(stack("web", StackStatus::DeleteInProgress)));

        let provisioner = StackProvisioner::new(cfn);
        let err = provisioner.outputs("web").await.unwrap_err();

        assert!(matches!(err, StackError::NotReady { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn static_hostnames_filter_output_keys() {
        let mut ready = stack("web", StackStatus::CreateComplete);
        ready
            .outputs
            .insert("AdminHostname".to_string(), "admin.example.com".to_string());
        ready
            .outputs
            .insert("WebHostname".to_string(), "www.example.com".to_string());
        ready
            .outputs
            .insert("DatabasePort".to_string(), "3306".to_string());

        let cfn = FakeCloudFormation::new();
        cfn.push_lookup(Some(ready));

        let provisioner = StackProvisioner::new(cfn);
        let pattern = Regex::new(r".*Hostname$").unwrap();
        let hosts = provisioner.static_hostnames("web", &pattern).await.unwrap();

        assert_eq!(hosts, vec!["admin.example.com", "www.example.com"]);
    }
}
