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

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = DispatchError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("no available instance")]
    NoAvailableInstance,

    #[error("task has an empty adam id")]
    EmptyAdamId,

    #[error("failed to construct instance {id}: {source}")]
    Construction {
        id: String,
        #[source]
        source: BoxError,
    },

    #[error("instance {0} queue is full")]
    InstanceQueueFull(String),

    #[error("instance {0} is closed")]
    InstanceClosed(String),

    #[error("result conduit dropped before a result was delivered")]
    ResultDropped,

    #[error("processing failed: {0}")]
    Processing(#[source] BoxError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DispatchError {
    pub fn construction(id: impl Into<String>, source: impl Into<BoxError>) -> Self {
        DispatchError::Construction {
            id: id.into(),
            source: source.into(),
        }
    }
}

impl From<anyhow::Error> for DispatchError {
    fn from(error: anyhow::Error) -> Self {
        DispatchError::Processing(error.into())
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(error: serde_json::Error) -> Self {
        DispatchError::Config(error.to_string())
    }
}
