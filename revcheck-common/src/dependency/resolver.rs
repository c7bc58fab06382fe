// revcheck-common/src/dependency/resolver.rs

use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, trace};

use crate::dependency::{DependencyExt, RelationKind};
use crate::model::snapshot::MetadataSnapshot;

/// Computes the set of packages needed to validate `roots`.
///
/// The roots themselves and their direct strong *and* weak dependencies are
/// taken first; that set is then closed over strong dependencies only.
/// Names missing from `snapshot` are dropped and never expanded, so the
/// result is always a subset of the snapshot.
pub fn resolve<'a, I>(roots: I, snapshot: &MetadataSnapshot) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let direct = direct_dependencies(roots, snapshot);
    debug!("Direct pass produced {} packages", direct.len());
    let closed = strong_closure(direct, snapshot);
    debug!("Strong closure produced {} packages", closed.len());
    closed
}

/// One hop over both relation kinds.
pub fn direct_dependencies<'a, I>(roots: I, snapshot: &MetadataSnapshot) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut result = BTreeSet::new();
    for root in roots {
        let Some(record) = snapshot.get(root) else {
            debug!("Root '{}' is not in the snapshot; dropping it", root);
            continue;
        };
        result.insert(record.name.clone());
        for dep in record
            .dependencies
            .of_kind(RelationKind::Strong)
            .into_iter()
            .chain(record.dependencies.of_kind(RelationKind::Weak))
        {
            if snapshot.contains(&dep.name) {
                result.insert(dep.name.clone());
            } else {
                trace!("'{}' ({} of '{}') not in snapshot", dep.name, dep.kind, root);
            }
        }
    }
    result
}

/// Expands `seed` over strong relations until no new names appear.
pub fn strong_closure(seed: BTreeSet<String>, snapshot: &MetadataSnapshot) -> BTreeSet<String> {
    let mut accumulated = seed;
    let mut queue: VecDeque<String> = accumulated.iter().cloned().collect();

    while let Some(name) = queue.pop_front() {
        let Some(record) = snapshot.get(&name) else {
            continue;
        };
        for dep in record.dependencies.strong() {
            if !snapshot.contains(&dep.name) {
                trace!("'{}' (strong of '{}') not in snapshot", dep.name, name);
                continue;
            }
            if accumulated.insert(dep.name.clone()) {
                queue.push_back(dep.name.clone());
            }
        }
    }
    accumulated
}
