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
use crate::task::{Task, TaskResult};
use parking_lot::Mutex;
use std::sync::Arc;

/// In-memory instance that answers every task immediately.
pub(crate) struct FakeInstance {
    id: String,
    region: String,
    last: Mutex<Option<String>>,
}

impl FakeInstance {
    pub(crate) fn new(id: &str, region: &str, last: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            region: region.to_string(),
            last: Mutex::new(last.map(str::to_string)),
        })
    }
}

impl Instance for FakeInstance {
    fn id(&self) -> &str {
        &self.id
    }

    fn region(&self) -> &str {
        &self.region
    }

    fn last_adam_id(&self) -> Option<String> {
        self.last.lock().clone()
    }

    fn process(&self, task: Task) {
        *self.last.lock() = Some(task.adam_id().to_string());
        let data = format!("{}:{}", self.id, task.request.key).into_bytes();
        task.respond(TaskResult::success(data));
    }
}

pub(crate) fn as_dyn(instances: &[Arc<FakeInstance>]) -> Vec<Arc<dyn Instance>> {
    instances
        .iter()
        .map(|i| i.clone() as Arc<dyn Instance>)
        .collect()
}
