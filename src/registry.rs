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

use crate::instance::Instance;
use parking_lot::RwLock;
use std::sync::Arc;

/// Ordered list of registered instances.
///
/// Mutations take the write lock, lookups share the read lock. Order is
/// insertion order and removal keeps the relative order of the rest.
#[derive(Default)]
pub struct InstanceRegistry {
    instances: RwLock<Vec<Arc<dyn Instance>>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, instance: Arc<dyn Instance>) {
        self.instances.write().push(instance);
    }

    /// Removes the first instance with `id`, returning it.
    pub fn remove(&self, id: &str) -> Option<Arc<dyn Instance>> {
        let mut instances = self.instances.write();
        let pos = instances.iter().position(|inst| inst.id() == id)?;
        Some(instances.remove(pos))
    }

    /// Runs `f` against the current instances under the shared lock.
    pub fn read<T>(&self, f: impl FnOnce(&[Arc<dyn Instance>]) -> T) -> T {
        f(&self.instances.read())
    }

    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.read(|instances| instances.iter().map(|i| i.id().to_string()).collect())
    }
}
