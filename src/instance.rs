// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Registration descriptor for a decryption worker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceDescriptor {
    pub id: String,
    pub region: String,
}

impl InstanceDescriptor {
    pub fn new(id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            region: region.into(),
        }
    }
}

/// A registered decryption worker as seen by the dispatcher.
///
/// The dispatcher only reads the affinity state; updating it is up to the
/// instance when it processes a task.
pub trait Instance: Send + Sync {
    fn id(&self) -> &str;

    fn region(&self) -> &str;

    /// Content key this instance processed most recently, `None` while idle.
    fn last_adam_id(&self) -> Option<String>;

    /// Takes ownership of the task and must eventually answer it exactly
    /// once. Must not block the caller.
    fn process(&self, task: Task);

    fn metrics(&self) -> Option<InstanceMetrics> {
        None
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct InstanceMetrics {
    pub instance_id: String,
    pub region: String,
    pub last_adam_id: Option<String>,
    pub inflight: usize,
    pub queue_len: usize,
    pub capacity: usize,
    pub processed: usize,
    pub errors: usize,
}

/// Builds instances from descriptors.
pub trait InstanceFactory: Send + Sync {
    fn create(&self, descriptor: &InstanceDescriptor) -> anyhow::Result<Arc<dyn Instance>>;
}

impl<F> InstanceFactory for F
where
    F: Fn(&InstanceDescriptor) -> anyhow::Result<Arc<dyn Instance>> + Send + Sync,
{
    fn create(&self, descriptor: &InstanceDescriptor) -> anyhow::Result<Arc<dyn Instance>> {
        self(descriptor)
    }
}
