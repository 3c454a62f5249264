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

//! Queue-backed worker instances.

use crate::config::DispatcherConfig;
use crate::constants::{DEFAULT_CONCURRENCY_PER_INSTANCE, DEFAULT_INSTANCE_QUEUE_CAPACITY};
use crate::error::DispatchError;
use crate::instance::{Instance, InstanceDescriptor, InstanceFactory, InstanceMetrics};
use crate::task::{Task, TaskRequest, TaskResult};
use anyhow::{Context, bail};
use log::{debug, error, warn};
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::runtime::Handle;
use tokio::sync::{Semaphore, mpsc};

/// A worker with its own bounded queue, drained by a spawned tokio task.
///
/// Once a dequeued task gets a concurrency permit, its content key becomes
/// the worker's affinity state and the handler runs. Dropping the last handle
/// closes the queue and the semaphore: running tasks finish, queued ones fail
/// with [`DispatchError::InstanceClosed`].
pub struct WorkerInstance {
    id: String,
    region: String,
    tx: mpsc::Sender<Task>,
    semaphore: Arc<Semaphore>,
    last_adam_id: Arc<RwLock<Option<String>>>,
    inflight: Arc<AtomicUsize>,
    processed: Arc<AtomicUsize>,
    errors: Arc<AtomicUsize>,
}

impl WorkerInstance {
    /// Spawns the worker on the current tokio runtime.
    pub fn spawn<F, Fut>(
        descriptor: &InstanceDescriptor,
        queue_capacity: usize,
        concurrency: usize,
        handler: F,
    ) -> anyhow::Result<Arc<Self>>
    where
        F: Fn(TaskRequest) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = anyhow::Result<Vec<u8>>> + Send + 'static,
    {
        if descriptor.id.is_empty() {
            bail!("instance id must not be empty");
        }
        if descriptor.region.is_empty() {
            bail!("instance {} has no region", descriptor.id);
        }
        if queue_capacity == 0 || concurrency == 0 {
            bail!("queue capacity and concurrency must be positive");
        }
        let runtime = Handle::try_current().context("worker instances need a tokio runtime")?;

        let (tx, mut rx) = mpsc::channel::<Task>(queue_capacity);
        let last_adam_id = Arc::new(RwLock::new(None));
        let inflight = Arc::new(AtomicUsize::new(0));
        let processed = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));
        let semaphore = Arc::new(Semaphore::new(concurrency));

        let id = descriptor.id.clone();
        let semaphore_worker = semaphore.clone();
        let last_worker = last_adam_id.clone();
        let inflight_worker = inflight.clone();
        let processed_worker = processed.clone();
        let errors_worker = errors.clone();

        runtime.spawn(async move {
            while let Some(task) = rx.recv().await {
                let permit = match semaphore_worker.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        errors_worker.fetch_add(1, Ordering::Relaxed);
                        debug!("instance {} semaphore closed, failing task", id);
                        task.fail(DispatchError::InstanceClosed(id.clone()));
                        continue;
                    }
                };

                *last_worker.write() = Some(task.adam_id().to_string());
                inflight_worker.fetch_add(1, Ordering::Relaxed);

                let id = id.clone();
                let handler = handler.clone();
                let inflight = inflight_worker.clone();
                let processed = processed_worker.clone();
                let errors = errors_worker.clone();
                tokio::spawn(async move {
                    let (request, responder) = task.into_parts();
                    let adam_id = request.adam_id.clone();
                    let payload = request.payload.clone();
                    let result = match handler(request).await {
                        Ok(data) => TaskResult::success(data),
                        Err(e) => {
                            error!("instance {} error processing {}: {:?}", id, adam_id, e);
                            errors.fetch_add(1, Ordering::Relaxed);
                            TaskResult::failure(payload, e.into())
                        }
                    };
                    processed.fetch_add(1, Ordering::Relaxed);
                    inflight.fetch_sub(1, Ordering::Relaxed);
                    responder.respond(result);
                    drop(permit);
                });
            }
            debug!("instance {} queue closed", id);
        });

        Ok(Arc::new(Self {
            id: descriptor.id.clone(),
            region: descriptor.region.clone(),
            tx,
            semaphore,
            last_adam_id,
            inflight,
            processed,
            errors,
        }))
    }

    /// Clears the affinity state so the worker counts as idle again.
    pub fn reset(&self) {
        *self.last_adam_id.write() = None;
    }

    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::Relaxed)
    }
}

impl Drop for WorkerInstance {
    fn drop(&mut self) {
        self.semaphore.close();
    }
}

impl Instance for WorkerInstance {
    fn id(&self) -> &str {
        &self.id
    }

    fn region(&self) -> &str {
        &self.region
    }

    fn last_adam_id(&self) -> Option<String> {
        self.last_adam_id.read().clone()
    }

    fn process(&self, task: Task) {
        match self.tx.try_send(task) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(task)) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                warn!("instance {} queue full, rejecting {}", self.id, task.adam_id());
                task.fail(DispatchError::InstanceQueueFull(self.id.clone()));
            }
            Err(mpsc::error::TrySendError::Closed(task)) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                task.fail(DispatchError::InstanceClosed(self.id.clone()));
            }
        }
    }

    fn metrics(&self) -> Option<InstanceMetrics> {
        Some(InstanceMetrics {
            instance_id: self.id.clone(),
            region: self.region.clone(),
            last_adam_id: Instance::last_adam_id(self),
            inflight: self.inflight(),
            queue_len: self.tx.max_capacity() - self.tx.capacity(),
            capacity: self.tx.max_capacity(),
            processed: self.processed.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        })
    }
}

/// Builds [`WorkerInstance`]s that share one async handler.
#[derive(Clone)]
pub struct WorkerFactory<F> {
    handler: F,
    queue_capacity: usize,
    concurrency: usize,
}

impl<F> WorkerFactory<F> {
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            queue_capacity: DEFAULT_INSTANCE_QUEUE_CAPACITY,
            concurrency: DEFAULT_CONCURRENCY_PER_INSTANCE,
        }
    }

    pub fn from_config(config: &DispatcherConfig, handler: F) -> Self {
        Self {
            handler,
            queue_capacity: config.queue_capacity,
            concurrency: config.concurrency,
        }
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
}

impl<F, Fut> InstanceFactory for WorkerFactory<F>
where
    F: Fn(TaskRequest) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = anyhow::Result<Vec<u8>>> + Send + 'static,
{
    fn create(&self, descriptor: &InstanceDescriptor) -> anyhow::Result<Arc<dyn Instance>> {
        let worker = WorkerInstance::spawn(
            descriptor,
            self.queue_capacity,
            self.concurrency,
            self.handler.clone(),
        )?;
        Ok(worker)
    }
}
