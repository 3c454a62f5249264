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

/// Bounded queue size for each worker instance.
pub const DEFAULT_INSTANCE_QUEUE_CAPACITY: usize = 64;

/// Number of tasks a worker instance runs through its handler at once.
pub const DEFAULT_CONCURRENCY_PER_INSTANCE: usize = 4;

pub const ENV_QUEUE_CAPACITY: &str = "AFFINITY_DISPATCHER_QUEUE_CAPACITY";
pub const ENV_CONCURRENCY: &str = "AFFINITY_DISPATCHER_CONCURRENCY";
