//! Catalog of check groups and deployable workers.
//!
//! The catalog is loaded by two independent requests. Each part has its own
//! status, so a failed worker list never hides checks that loaded fine.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use checkgrid_core::{CheckDefinition, CheckGroup, Worker};

use crate::error::EngineError;

/// One of the two independently loaded halves of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CatalogPart {
    Checks,
    Workers,
}

impl fmt::Display for CatalogPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogPart::Checks => f.write_str("checks"),
            CatalogPart::Workers => f.write_str("workers"),
        }
    }
}

/// Load status of one catalog part.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    NotRequested,
    Loading,
    Loaded,
    Failed(EngineError),
}

/// Immutable catalog published by the loader.
#[derive(Debug, Default)]
pub struct Catalog {
    groups: Vec<CheckGroup>,
    workers: Vec<Worker>,
    checks_status: LoadStatus,
    workers_status: LoadStatus,
    /// check name → (group index, check index)
    index: HashMap<String, (usize, usize)>,
    /// Bumped on every load so stale responses can be told apart.
    generation: u64,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark both parts as loading and return the new load generation.
    pub fn begin_load(&mut self) -> u64 {
        self.generation += 1;
        self.checks_status = LoadStatus::Loading;
        self.workers_status = LoadStatus::Loading;
        self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Publish the grouped checks, sorted for display.
    pub fn publish_groups(&mut self, mut groups: Vec<CheckGroup>) {
        sort_groups(&mut groups);

        self.index.clear();
        for (gi, group) in groups.iter().enumerate() {
            for (ci, check) in group.checks.iter().enumerate() {
                if self.index.insert(check.name.clone(), (gi, ci)).is_some() {
                    warn!(check = %check.name, group = %group.name, "check listed in more than one group");
                }
            }
        }

        info!(
            groups = groups.len(),
            checks = self.index.len(),
            "check catalog loaded"
        );
        self.groups = groups;
        self.checks_status = LoadStatus::Loaded;
    }

    /// Publish the worker list, sorted by name.
    pub fn publish_workers(&mut self, mut workers: Vec<Worker>) {
        workers.sort_by(|a, b| a.lambda_name.cmp(&b.lambda_name));
        info!(workers = workers.len(), "worker list loaded");
        self.workers = workers;
        self.workers_status = LoadStatus::Loaded;
    }

    /// Record a load failure. Previously published data stays visible.
    pub fn fail(&mut self, part: CatalogPart, reason: String) {
        warn!(%part, %reason, "catalog load failed");
        let status = LoadStatus::Failed(EngineError::Load { part, reason });
        match part {
            CatalogPart::Checks => self.checks_status = status,
            CatalogPart::Workers => self.workers_status = status,
        }
    }

    pub fn status(&self, part: CatalogPart) -> &LoadStatus {
        match part {
            CatalogPart::Checks => &self.checks_status,
            CatalogPart::Workers => &self.workers_status,
        }
    }

    /// The load error of `part`, if its last load failed.
    pub fn load_error(&self, part: CatalogPart) -> Option<&EngineError> {
        match self.status(part) {
            LoadStatus::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn groups(&self) -> &[CheckGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&CheckGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    pub fn find_check(&self, name: &str) -> Option<&CheckDefinition> {
        let (gi, ci) = *self.index.get(name)?;
        self.groups.get(gi)?.checks.get(ci)
    }

    /// Catalog checks a worker runs, in the worker's order.
    pub fn checks_for_worker(&self, lambda_name: &str) -> Vec<&CheckDefinition> {
        self.workers
            .iter()
            .find(|w| w.lambda_name == lambda_name)
            .map(|w| {
                w.lambda_checks
                    .iter()
                    .filter_map(|c| self.find_check(&c.check_name))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Groups by name, checks within a group by display title.
fn sort_groups(groups: &mut [CheckGroup]) {
    groups.sort_by(|a, b| a.name.cmp(&b.name));
    for group in groups.iter_mut() {
        group
            .checks
            .sort_by(|a, b| a.display_title().cmp(b.display_title()));
    }
}
