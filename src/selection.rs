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

//! Three-tier instance selection.
//!
//! 1. **Affinity**: the first instance whose last content key equals the
//!    requested one.
//! 2. **Idle**: the first idle instance whose region can serve the key.
//! 3. **Random**: a uniform pick among every instance whose region can serve
//!    the key.
//!
//! Tiers 1 and 2 are first-match in registry order so a content key sticks to
//! the same warm instance. Tier 3 is randomized so busy traffic for a region
//! spreads across all capable instances.

use crate::instance::Instance;
use crate::region::RegionOracle;
use rand::Rng;
use rand::seq::IndexedRandom;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionTier {
    Affinity,
    Idle,
    Random,
}

impl fmt::Display for SelectionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SelectionTier::Affinity => "affinity",
            SelectionTier::Idle => "idle",
            SelectionTier::Random => "random",
        };
        f.write_str(name)
    }
}

#[derive(Clone)]
pub struct Selection {
    pub instance: Arc<dyn Instance>,
    pub tier: SelectionTier,
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("instance", &self.instance.id())
            .field("tier", &self.tier)
            .finish()
    }
}

pub fn select_instance<O, R>(
    instances: &[Arc<dyn Instance>],
    adam_id: &str,
    oracle: &O,
    rng: &mut R,
) -> Option<Selection>
where
    O: RegionOracle + ?Sized,
    R: Rng + ?Sized,
{
    // An empty key would otherwise match every idle instance in tier 1.
    if instances.is_empty() || adam_id.is_empty() {
        return None;
    }

    let pick = |instance: &Arc<dyn Instance>, tier| {
        Some(Selection {
            instance: instance.clone(),
            tier,
        })
    };

    if let Some(inst) = instances
        .iter()
        .find(|inst| inst.last_adam_id().as_deref() == Some(adam_id))
    {
        return pick(inst, SelectionTier::Affinity);
    }

    let capable = |inst: &&Arc<dyn Instance>| oracle.is_available(adam_id, inst.region(), false);

    if let Some(inst) = instances
        .iter()
        .filter(|inst| inst.last_adam_id().is_none())
        .find(capable)
    {
        return pick(inst, SelectionTier::Idle);
    }

    let candidates: Vec<&Arc<dyn Instance>> = instances.iter().filter(capable).collect();
    candidates
        .choose(rng)
        .and_then(|inst| pick(*inst, SelectionTier::Random))
}
