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

//! # Affinity Dispatcher
//!
//! An **in-process task dispatcher** that routes decryption tasks to a changing
//! pool of worker instances, keeping each content key ("adam id") on the
//! instance that handled it last.
//!
//! Selection runs three tiers in order:
//!
//! - **Affinity**: the instance whose last content key matches the task
//! - **Idle**: the first unused instance whose region can serve the key
//! - **Random**: a uniform pick among every region-capable instance
//!
//! When no tier finds an instance the task fails immediately; nothing queues
//! at the dispatcher.
//!
//! ## Core Concepts
//!
//! - A [`Task`](task::Task) carries the content key, key reference and payload,
//!   plus a oneshot conduit answered exactly once with a
//!   [`TaskResult`](task::TaskResult).
//! - An [`Instance`](instance::Instance) is an opaque worker that records its
//!   own affinity state. [`WorkerInstance`](worker::WorkerInstance) is a tokio
//!   backed implementation with a bounded queue.
//! - A [`RegionOracle`](region::RegionOracle) decides whether an instance's
//!   region can serve a content key.
//! - The [`Dispatcher`](dispatcher::Dispatcher) owns the registry and exposes
//!   `add_instance`, `remove_instance` and `submit`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use affinity_dispatcher::dispatcher::Dispatcher;
//! use affinity_dispatcher::instance::InstanceDescriptor;
//! use affinity_dispatcher::region::AnyRegion;
//! use affinity_dispatcher::task::TaskRequest;
//! use affinity_dispatcher::worker::WorkerFactory;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let factory = WorkerFactory::new(|req: TaskRequest| async move {
//!         Ok::<_, anyhow::Error>(req.payload)
//!     });
//!     let dispatcher = Dispatcher::new(factory, AnyRegion);
//!     dispatcher.add_instance(&InstanceDescriptor::new("w1", "us"))?;
//!
//!     let result = dispatcher
//!         .submit_and_wait("1440818839", "key-uri", b"sample".to_vec())
//!         .await;
//!     println!("success: {}", result.success);
//!     Ok(())
//! }
//! ```
//!
//! ## License
//!
//! Licensed under [Apache 2.0](https://www.apache.org/licenses/LICENSE-2.0).
pub mod config;
mod constants;
pub mod dispatcher;
pub mod error;
pub mod instance;
pub mod region;
pub mod registry;
pub mod selection;
pub mod task;
#[cfg(test)]
mod testing;
pub mod worker;

pub use dispatcher::Dispatcher;
pub use error::{DispatchError, Result};
pub use task::{Task, TaskHandle, TaskResult};
