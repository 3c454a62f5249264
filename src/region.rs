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

//! Region capability lookups.

use std::collections::{HashMap, HashSet};

/// Answers whether an instance configured for `region` can serve `adam_id`.
pub trait RegionOracle: Send + Sync {
    fn is_available(&self, adam_id: &str, region: &str, strict: bool) -> bool;
}

impl<F> RegionOracle for F
where
    F: Fn(&str, &str, bool) -> bool + Send + Sync,
{
    fn is_available(&self, adam_id: &str, region: &str, strict: bool) -> bool {
        self(adam_id, region, strict)
    }
}

/// Every region serves every content key.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnyRegion;

impl RegionOracle for AnyRegion {
    fn is_available(&self, _adam_id: &str, _region: &str, _strict: bool) -> bool {
        true
    }
}

/// Static region capability table.
///
/// A region either serves everything (non-strict lookups only) or an explicit
/// set of content keys. Strict lookups only accept explicit entries.
#[derive(Clone, Debug, Default)]
pub struct RegionTable {
    open: HashSet<String>,
    keys: HashMap<String, HashSet<String>>,
}

impl RegionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve_all(mut self, region: impl Into<String>) -> Self {
        self.open.insert(region.into());
        self
    }

    pub fn serve<I, S>(mut self, region: impl Into<String>, adam_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys
            .entry(region.into())
            .or_default()
            .extend(adam_ids.into_iter().map(Into::into));
        self
    }
}

impl RegionOracle for RegionTable {
    fn is_available(&self, adam_id: &str, region: &str, strict: bool) -> bool {
        let listed = self
            .keys
            .get(region)
            .is_some_and(|keys| keys.contains(adam_id));
        listed || (!strict && self.open.contains(region))
    }
}
