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

//! Tasks, their results, and the one-shot conduit between them.

use crate::error::{DispatchError, Result};
use log::debug;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// The work carried by a [`Task`], detached from its result conduit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskRequest {
    pub adam_id: String,
    pub key: String,
    pub payload: Vec<u8>,
}

/// A unit of work for the dispatcher.
///
/// Exactly one [`TaskResult`] is delivered per task: every way of answering
/// consumes the task, and dropping a task unanswered surfaces to the waiting
/// [`TaskHandle`] as [`DispatchError::ResultDropped`].
#[derive(Debug)]
pub struct Task {
    pub request: TaskRequest,
    respond_to: oneshot::Sender<TaskResult>,
}

impl Task {
    pub fn new(
        adam_id: impl Into<String>,
        key: impl Into<String>,
        payload: Vec<u8>,
    ) -> (Self, TaskHandle) {
        let (tx, rx) = oneshot::channel();
        let task = Task {
            request: TaskRequest {
                adam_id: adam_id.into(),
                key: key.into(),
                payload,
            },
            respond_to: tx,
        };
        (task, TaskHandle { rx })
    }

    pub fn adam_id(&self) -> &str {
        &self.request.adam_id
    }

    pub fn respond(self, result: TaskResult) {
        Responder {
            respond_to: self.respond_to,
        }
        .respond(result)
    }

    /// Answers with a failure, echoing the original payload back.
    pub fn fail(self, error: DispatchError) {
        let Task {
            request,
            respond_to,
        } = self;
        Responder { respond_to }.respond(TaskResult::failure(request.payload, error))
    }

    pub fn into_parts(self) -> (TaskRequest, Responder) {
        (
            self.request,
            Responder {
                respond_to: self.respond_to,
            },
        )
    }
}

/// Sending half of a task's result conduit.
#[derive(Debug)]
pub struct Responder {
    respond_to: oneshot::Sender<TaskResult>,
}

impl Responder {
    pub fn respond(self, result: TaskResult) {
        if self.respond_to.send(result).is_err() {
            debug!("task result discarded, receiver already gone");
        }
    }
}

/// Receiving half of a task's result conduit. Await it for the result.
#[derive(Debug)]
pub struct TaskHandle {
    rx: oneshot::Receiver<TaskResult>,
}

impl TaskHandle {
    /// Takes the result if it has already been delivered, otherwise hands the
    /// handle back so it can be polled again or awaited.
    pub fn try_result(mut self) -> std::result::Result<TaskResult, Self> {
        match self.rx.try_recv() {
            Ok(result) => Ok(result),
            Err(oneshot::error::TryRecvError::Empty) => Err(self),
            Err(oneshot::error::TryRecvError::Closed) => Ok(TaskResult::dropped()),
        }
    }
}

impl Future for TaskHandle {
    type Output = TaskResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.unwrap_or_else(|_| TaskResult::dropped()))
    }
}

/// Outcome of processing a [`Task`].
#[derive(Debug)]
pub struct TaskResult {
    pub success: bool,
    /// Output on success, the original payload on failure.
    pub data: Vec<u8>,
    pub error: Option<DispatchError>,
}

impl TaskResult {
    pub fn success(data: Vec<u8>) -> Self {
        TaskResult {
            success: true,
            data,
            error: None,
        }
    }

    pub fn failure(data: Vec<u8>, error: DispatchError) -> Self {
        TaskResult {
            success: false,
            data,
            error: Some(error),
        }
    }

    fn dropped() -> Self {
        TaskResult::failure(Vec::new(), DispatchError::ResultDropped)
    }

    pub fn into_result(self) -> Result<Vec<u8>> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self.error.unwrap_or(DispatchError::ResultDropped))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fail_echoes_payload() {
        let (task, handle) = Task::new("song1", "key", b"raw".to_vec());
        task.fail(DispatchError::NoAvailableInstance);

        let result = handle.await;
        assert!(!result.success);
        assert_eq!(result.data, b"raw");
        assert!(matches!(
            result.error,
            Some(DispatchError::NoAvailableInstance)
        ));
    }

    #[tokio::test]
    async fn dropped_task_resolves_handle() {
        let (task, handle) = Task::new("song1", "key", b"raw".to_vec());
        drop(task);

        let result = handle.await;
        assert!(!result.success);
        assert!(matches!(result.error, Some(DispatchError::ResultDropped)));
    }

    #[test]
    fn try_result_hands_back_pending_handle() {
        let (task, handle) = Task::new("song1", "key", Vec::new());
        let handle = handle.try_result().expect_err("nothing delivered yet");
        let handle = handle.try_result().expect_err("still nothing delivered");

        let (request, responder) = task.into_parts();
        assert_eq!(request.adam_id, "song1");
        responder.respond(TaskResult::success(b"clear".to_vec()));

        let result = handle.try_result().expect("result delivered");
        assert_eq!(result.into_result().unwrap(), b"clear");
    }

    #[tokio::test]
    async fn await_after_pending_try_result() {
        let (task, handle) = Task::new("song1", "key", Vec::new());
        let handle = handle.try_result().expect_err("nothing delivered yet");

        task.respond(TaskResult::success(b"clear".to_vec()));
        let result = handle.await;
        assert!(result.success);
        assert_eq!(result.data, b"clear");
    }
}
