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

//! End-to-end routing through tokio-backed worker instances.

use affinity_dispatcher::config::DispatcherConfig;
use affinity_dispatcher::instance::InstanceDescriptor;
use affinity_dispatcher::region::{AnyRegion, RegionTable};
use affinity_dispatcher::selection::SelectionTier;
use affinity_dispatcher::task::TaskRequest;
use affinity_dispatcher::worker::WorkerFactory;
use affinity_dispatcher::{DispatchError, Dispatcher, Task};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

type Echo = std::future::Ready<anyhow::Result<Vec<u8>>>;

fn echo_factory() -> WorkerFactory<impl Fn(TaskRequest) -> Echo + Clone> {
    WorkerFactory::new(|req: TaskRequest| {
        std::future::ready(Ok(format!("{}:{}", req.adam_id, req.key).into_bytes()))
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_each_get_one_result() {
    init_logging();
    let calls = Arc::new(AtomicUsize::new(0));
    let factory = {
        let calls = calls.clone();
        WorkerFactory::new(move |req: TaskRequest| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::Relaxed);
                tokio::time::sleep(Duration::from_millis(1)).await;
                Ok::<_, anyhow::Error>(req.payload)
            }
        })
        .with_queue_capacity(512)
    };
    let dispatcher = Dispatcher::new(factory, AnyRegion);
    dispatcher
        .add_instance(&InstanceDescriptor::new("only", "us"))
        .unwrap();

    let mut joins = Vec::new();
    for n in 0..200u32 {
        let dispatcher = dispatcher.clone();
        joins.push(tokio::spawn(async move {
            dispatcher
                .submit_and_wait(format!("song{}", n % 7), "key", n.to_be_bytes().to_vec())
                .await
        }));
    }

    for (n, join) in joins.into_iter().enumerate() {
        let result = join.await.unwrap();
        assert!(result.success, "task {n} failed: {:?}", result.error);
        assert_eq!(result.data, (n as u32).to_be_bytes());
    }
    assert_eq!(calls.load(Ordering::Relaxed), 200);
}

#[tokio::test]
async fn processed_key_sticks_to_its_instance() {
    init_logging();
    let dispatcher = Dispatcher::new(echo_factory(), AnyRegion);
    let failures = dispatcher.add_instances(&[
        InstanceDescriptor::new("w1", "us"),
        InstanceDescriptor::new("w2", "us"),
        InstanceDescriptor::new("w3", "us"),
    ]);
    assert!(failures.is_empty());

    // Every instance is idle, so the first one takes the first key.
    let result = dispatcher.submit_and_wait("song1", "k", Vec::new()).await;
    assert_eq!(result.into_result().unwrap(), b"song1:k");
    let selection = dispatcher.route("song1").unwrap();
    assert_eq!(selection.instance.id(), "w1");
    assert_eq!(selection.tier, SelectionTier::Affinity);

    // A new key prefers the next idle instance over the warm one.
    dispatcher.submit_and_wait("song2", "k", Vec::new()).await;
    let selection = dispatcher.route("song2").unwrap();
    assert_eq!(selection.instance.id(), "w2");

    let metrics = dispatcher.instance_metrics();
    assert_eq!(metrics.len(), 3);
    assert_eq!(metrics[0].last_adam_id.as_deref(), Some("song1"));
    assert_eq!(metrics[1].last_adam_id.as_deref(), Some("song2"));
    assert_eq!(metrics[2].last_adam_id, None);
    let json = serde_json::to_value(&metrics[0]).unwrap();
    assert_eq!(json["instance_id"], "w1");
    assert_eq!(json["processed"], 1);
}

#[tokio::test]
async fn region_table_limits_fallback() {
    init_logging();
    let table = RegionTable::new().serve_all("us").serve("jp", ["song-jp"]);
    let dispatcher = Dispatcher::new(echo_factory(), table);
    let failures = dispatcher.add_instances(&[
        InstanceDescriptor::new("us-1", "us"),
        InstanceDescriptor::new("jp-1", "jp"),
    ]);
    assert!(failures.is_empty());

    let selection = dispatcher.route("song-jp").unwrap();
    assert_eq!(selection.instance.id(), "us-1");

    dispatcher.remove_instance("us-1");
    let selection = dispatcher.route("song-jp").unwrap();
    assert_eq!(selection.instance.id(), "jp-1");

    let result = dispatcher.submit_and_wait("song-us", "k", b"raw".to_vec()).await;
    assert!(!result.success);
    assert_eq!(result.data, b"raw");
    assert!(matches!(result.error, Some(DispatchError::NoAvailableInstance)));
}

#[tokio::test]
async fn config_bootstraps_registry() {
    init_logging();
    let config = DispatcherConfig::from_json(
        r#"{
            "queue_capacity": 8,
            "concurrency": 1,
            "instances": [
                {"id": "w1", "region": "us"},
                {"id": "", "region": "us"},
                {"id": "w2", "region": "eu"}
            ]
        }"#,
    )
    .unwrap();
    let factory = WorkerFactory::from_config(&config, |req: TaskRequest| async move {
        Ok::<_, anyhow::Error>(req.payload)
    });
    let dispatcher = Dispatcher::new(factory, AnyRegion);

    let failures = dispatcher.add_instances(&config.instances);
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0].1, DispatchError::Construction { .. }));
    assert_eq!(dispatcher.instance_ids(), vec!["w1", "w2"]);
    assert!(dispatcher.instance_metrics().iter().all(|m| m.capacity == 8));
}

#[tokio::test]
async fn removed_worker_stops_receiving() {
    init_logging();
    let dispatcher = Dispatcher::new(echo_factory(), AnyRegion);
    dispatcher
        .add_instance(&InstanceDescriptor::new("w1", "us"))
        .unwrap();
    dispatcher.submit_and_wait("song1", "k", Vec::new()).await;

    assert!(dispatcher.remove_instance("w1"));
    assert!(dispatcher.is_empty());

    let (task, handle) = Task::new("song1", "k", b"p".to_vec());
    dispatcher.submit(task);
    let result = handle.await;
    assert!(matches!(result.error, Some(DispatchError::NoAvailableInstance)));
}
