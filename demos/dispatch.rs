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

use affinity_dispatcher::Dispatcher;
use affinity_dispatcher::config::DispatcherConfig;
use affinity_dispatcher::instance::InstanceDescriptor;
use affinity_dispatcher::region::RegionTable;
use affinity_dispatcher::task::TaskRequest;
use affinity_dispatcher::worker::WorkerFactory;
use env_logger::Env;
use log::info;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("debug"))
        .format_timestamp(None)
        .init();

    let mut config = DispatcherConfig::from_env()?;
    if config.instances.is_empty() {
        config.instances = vec![
            InstanceDescriptor::new("us-1", "us"),
            InstanceDescriptor::new("us-2", "us"),
            InstanceDescriptor::new("jp-1", "jp"),
        ];
    }

    let factory = WorkerFactory::from_config(&config, |req: TaskRequest| async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        let data: Vec<u8> = req.payload.iter().map(|b| b ^ 0x5a).collect();
        Ok::<_, anyhow::Error>(data)
    });
    let regions = RegionTable::new()
        .serve_all("us")
        .serve("jp", ["1450330588", "1440818839"]);
    let dispatcher = Dispatcher::new(factory, regions);

    for (id, err) in dispatcher.add_instances(&config.instances) {
        info!("skipping instance {}: {}", id, err);
    }

    let adam_ids = ["1440818839", "1450330588", "1440818839", "1626195797", "1450330588"];
    for adam_id in adam_ids {
        let result = dispatcher
            .submit_and_wait(adam_id, "skd://itunes.apple.com/P000000000/s1/e1", b"sample".to_vec())
            .await;
        info!("{} -> success {} ({} bytes)", adam_id, result.success, result.data.len());
    }

    for metrics in dispatcher.instance_metrics() {
        info!("{}", serde_json::to_string(&metrics)?);
    }
    Ok(())
}
