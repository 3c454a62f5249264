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

use crate::error::{DispatchError, Result};
use crate::instance::{Instance, InstanceDescriptor, InstanceFactory, InstanceMetrics};
use crate::region::RegionOracle;
use crate::registry::InstanceRegistry;
use crate::selection::{Selection, select_instance};
use crate::task::{Task, TaskResult};
use log::{debug, error, info, warn};
use std::sync::Arc;

/// Routes tasks to registered instances by content affinity.
pub struct Dispatcher {
    registry: InstanceRegistry,
    factory: Arc<dyn InstanceFactory>,
    oracle: Arc<dyn RegionOracle>,
}

impl Dispatcher {
    pub fn new(
        factory: impl InstanceFactory + 'static,
        oracle: impl RegionOracle + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry: InstanceRegistry::new(),
            factory: Arc::new(factory),
            oracle: Arc::new(oracle),
        })
    }

    /// Builds an instance from `descriptor` and registers it.
    ///
    /// Nothing is registered when construction fails.
    pub fn add_instance(&self, descriptor: &InstanceDescriptor) -> Result<()> {
        let instance = self.factory.create(descriptor).map_err(|e| {
            error!("failed to add instance {}: {:#}", descriptor.id, e);
            DispatchError::construction(descriptor.id.clone(), e)
        })?;
        self.register(instance);
        Ok(())
    }

    /// Registers an already constructed instance.
    pub fn register(&self, instance: Arc<dyn Instance>) {
        info!(
            "added instance {} (region {})",
            instance.id(),
            instance.region()
        );
        self.registry.add(instance);
    }

    /// Registers every descriptor, returning the ones that failed.
    pub fn add_instances<'a, I>(&self, descriptors: I) -> Vec<(String, DispatchError)>
    where
        I: IntoIterator<Item = &'a InstanceDescriptor>,
    {
        descriptors
            .into_iter()
            .filter_map(|d| self.add_instance(d).err().map(|e| (d.id.clone(), e)))
            .collect()
    }

    /// Removes the first instance registered under `id`.
    pub fn remove_instance(&self, id: &str) -> bool {
        match self.registry.remove(id) {
            Some(_) => {
                info!("removed instance {}", id);
                true
            }
            None => {
                debug!("remove of unknown instance {}", id);
                false
            }
        }
    }

    /// The instance a task for `adam_id` would be routed to right now.
    pub fn route(&self, adam_id: &str) -> Option<Selection> {
        self.registry.read(|instances| {
            select_instance(instances, adam_id, self.oracle.as_ref(), &mut rand::rng())
        })
    }

    /// Routes `task` and returns without waiting for it to finish.
    ///
    /// The outcome arrives on the task's handle: from the chosen instance, or
    /// immediately as a failure when no instance can take it.
    pub fn submit(&self, task: Task) {
        if task.adam_id().is_empty() {
            warn!("rejecting task with empty adam id");
            task.fail(DispatchError::EmptyAdamId);
            return;
        }
        match self.route(task.adam_id()) {
            Some(Selection { instance, tier }) => {
                debug!(
                    "selected instance {} for adam id {} ({})",
                    instance.id(),
                    task.adam_id(),
                    tier
                );
                instance.process(task);
            }
            None => {
                warn!("no available instance for adam id {}", task.adam_id());
                task.fail(DispatchError::NoAvailableInstance);
            }
        }
    }

    /// Submits a new task and waits for its result.
    pub async fn submit_and_wait(
        &self,
        adam_id: impl Into<String>,
        key: impl Into<String>,
        payload: Vec<u8>,
    ) -> TaskResult {
        let (task, handle) = Task::new(adam_id, key, payload);
        self.submit(task);
        handle.await
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn instance_ids(&self) -> Vec<String> {
        self.registry.ids()
    }

    pub fn instance_metrics(&self) -> Vec<InstanceMetrics> {
        self.registry
            .read(|instances| instances.iter().filter_map(|i| i.metrics()).collect())
    }
}
