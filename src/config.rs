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

use crate::constants::{
    DEFAULT_CONCURRENCY_PER_INSTANCE, DEFAULT_INSTANCE_QUEUE_CAPACITY, ENV_CONCURRENCY,
    ENV_QUEUE_CAPACITY,
};
use crate::error::{DispatchError, Result};
use crate::instance::InstanceDescriptor;
use serde::Deserialize;
use std::env::var;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Bounded queue size of each worker instance.
    pub queue_capacity: usize,
    /// Concurrent handler calls per worker instance.
    pub concurrency: usize,
    /// Instances registered at start-up.
    pub instances: Vec<InstanceDescriptor>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_INSTANCE_QUEUE_CAPACITY,
            concurrency: DEFAULT_CONCURRENCY_PER_INSTANCE,
            instances: Vec::new(),
        }
    }
}

impl DispatcherConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `AFFINITY_DISPATCHER_QUEUE_CAPACITY` and
    /// `AFFINITY_DISPATCHER_CONCURRENCY` when set.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(n) = read_env(ENV_QUEUE_CAPACITY)? {
            config.queue_capacity = n;
        }
        if let Some(n) = read_env(ENV_CONCURRENCY)? {
            config.concurrency = n;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(DispatchError::Config("queue_capacity must be positive".into()));
        }
        if self.concurrency == 0 {
            return Err(DispatchError::Config("concurrency must be positive".into()));
        }
        Ok(())
    }
}

fn read_env(name: &str) -> Result<Option<usize>> {
    match var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| DispatchError::Config(format!("{name}={value}: {e}"))),
        Err(_) => Ok(None),
    }
}
