use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::aws::clients::traits::CloudFormationOperations;

use super::error::StackError;
use super::model::{StackEvent, StackInfo, StackRequest, StackResource};

/// Scripted in-memory CloudFormation provider. Lookups and event batches
/// are consumed in order; the final entry of each queue repeats, so a poll
/// loop can run past the scripted sequence.
pub struct FakeCloudFormation {
    lookups: Mutex<VecDeque<Option<StackInfo>>>,
    event_batches: Mutex<VecDeque<Vec<StackEvent>>>,
    event_fetches: Mutex<usize>,
    template_error: Mutex<Option<String>>,
    no_updates: Mutex<bool>,
    create_requests: Mutex<Vec<StackRequest>>,
    update_requests: Mutex<Vec<StackRequest>>,
    delete_requests: Mutex<Vec<String>>,
}

impl FakeCloudFormation {
    pub fn new() -> Self {
        Self {
            lookups: Mutex::new(VecDeque::new()),
            event_batches: Mutex::new(VecDeque::new()),
            event_fetches: Mutex::new(0),
            template_error: Mutex::new(None),
            no_updates: Mutex::new(false),
            create_requests: Mutex::new(Vec::new()),
            update_requests: Mutex::new(Vec::new()),
            delete_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_lookup(&self, stack: Option<StackInfo>) {
        self.lookups.lock().unwrap().push_back(stack);
    }

    pub fn push_events(&self, events: Vec<StackEvent>) {
        self.event_batches.lock().unwrap().push_back(events);
    }

    pub fn reject_template(&self, message: &str) {
        *self.template_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_update_with_no_updates(&self) {
        *self.no_updates.lock().unwrap() = true;
    }

    pub fn create_calls(&self) -> usize {
        self.create_requests.lock().unwrap().len()
    }

    pub fn update_calls(&self) -> usize {
        self.update_requests.lock().unwrap().len()
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_requests.lock().unwrap().len()
    }

    pub fn event_fetches(&self) -> usize {
        *self.event_fetches.lock().unwrap()
    }

    pub fn created_requests(&self) -> Vec<StackRequest> {
        self.create_requests.lock().unwrap().clone()
    }

    pub fn deleted_stacks(&self) -> Vec<String> {
        self.delete_requests.lock().unwrap().clone()
    }

    fn next_lookup(&self) -> Option<StackInfo> {
        let mut lookups = self.lookups.lock().unwrap();
        if lookups.len() > 1 {
            lookups.pop_front().flatten()
        } else {
            lookups.front().cloned().flatten()
        }
    }
}

#[async_trait]
impl CloudFormationOperations for FakeCloudFormation {
    async fn find_stack(&self, _stack_id: &str) -> Result<Option<StackInfo>, StackError> {
        Ok(self.next_lookup())
    }

    async fn describe_events(&self, _stack_id: &str) -> Result<Vec<StackEvent>, StackError> {
        *self.event_fetches.lock().unwrap() += 1;
        let mut batches = self.event_batches.lock().unwrap();
        if batches.len() > 1 {
            Ok(batches.pop_front().unwrap_or_default())
        } else {
            Ok(batches.front().cloned().unwrap_or_default())
        }
    }

    async fn describe_resource(
        &self,
        stack_id: &str,
        logical_id: &str,
    ) -> Result<StackResource, StackError> {
        Ok(StackResource {
            logical_resource_id: logical_id.to_string(),
            physical_resource_id: format!("{stack_id}-{logical_id}"),
            resource_type: "AWS::AutoScaling::AutoScalingGroup".to_string(),
        })
    }

    async fn validate_template(&self, _template_body: &str) -> Result<Option<String>, StackError> {
        match self.template_error.lock().unwrap().clone() {
            Some(message) => Err(StackError::TemplateValidation(message)),
            None => Ok(None),
        }
    }

    async fn create_stack(&self, request: &StackRequest) -> Result<String, StackError> {
        self.create_requests.lock().unwrap().push(request.clone());
        Ok(format!("{}-id", request.name))
    }

    async fn update_stack(&self, request: &StackRequest) -> Result<String, StackError> {
        if *self.no_updates.lock().unwrap() {
            return Err(StackError::NoUpdates(request.name.clone()));
        }
        self.update_requests.lock().unwrap().push(request.clone());
        Ok(format!("{}-id", request.name))
    }

    async fn delete_stack(&self, stack_id: &str) -> Result<(), StackError> {
        self.delete_requests.lock().unwrap().push(stack_id.to_string());
        Ok(())
    }
}
