// revcheck-core/src/plan.rs
use std::collections::BTreeSet;

use revcheck_common::model::MetadataSnapshot;
use serde::Serialize;
use tracing::{debug, warn};

use crate::installed::InstalledSet;

/// Partition of a resolved dependency set. Every resolved name lands in
/// exactly one of the three sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallPlan {
    pub to_install: BTreeSet<String>,
    pub unsatisfiable: BTreeSet<String>,
    pub up_to_date: BTreeSet<String>,
}

impl InstallPlan {
    pub fn len(&self) -> usize {
        self.to_install.len() + self.unsatisfiable.len() + self.up_to_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decides what needs installing. A package is (re)installed when it is
/// missing or its installed version is older than the available one; a
/// newer installed version is left alone.
pub fn plan(
    resolved: &BTreeSet<String>,
    installed: &InstalledSet,
    binary_snapshot: &MetadataSnapshot,
) -> InstallPlan {
    let mut plan = InstallPlan::default();
    for name in resolved {
        let Some(record) = binary_snapshot.get(name) else {
            warn!("Dependency '{}' is not available in any repository", name);
            plan.unsatisfiable.insert(name.clone());
            continue;
        };
        match installed.get(name) {
            Some(current) if *current >= record.version => {
                plan.up_to_date.insert(name.clone());
            }
            Some(current) => {
                debug!("{} is stale ({} < {})", name, current, record.version);
                plan.to_install.insert(name.clone());
            }
            None => {
                plan.to_install.insert(name.clone());
            }
        }
    }
    debug!(
        "Install plan: {} to install, {} unsatisfiable, {} up to date",
        plan.to_install.len(),
        plan.unsatisfiable.len(),
        plan.up_to_date.len()
    );
    plan
}
